//! Localization: reference-frame estimation against resolved anchors.

pub mod estimator;

pub use estimator::{FrameEstimate, FrameState, ReferenceFrameEstimator};
