//! Foundation layer: coordinate types and angular math.

pub mod math;
pub mod types;

pub use types::{PlanPoint, WorldPoint, WorldPose, WorldQuat};
