//! Coordinate types for the two frames the engine converts between.
//!
//! - **Floorplan frame**: the 2-D coordinate system floorplans are authored
//!   in, arbitrary planar units.
//! - **AR world frame**: the 3-D coordinate system produced by the device's
//!   tracking subsystem, y-up. The planar math uses the (x, z) horizontal
//!   plane; floorplan x maps to world x and floorplan y maps to world z.

use serde::{Deserialize, Serialize};

/// A point in the 2-D floorplan frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanPoint {
    /// X coordinate in floorplan units
    pub x: f32,
    /// Y coordinate in floorplan units
    pub y: f32,
}

impl PlanPoint {
    /// Create a new point.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared distance to another point (avoids sqrt).
    #[inline]
    pub fn distance_squared(&self, other: &PlanPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: &PlanPoint) -> f32 {
        self.distance_squared(other).sqrt()
    }
}

impl Default for PlanPoint {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

/// A position in the AR world frame (meters, y-up).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    /// X coordinate in meters
    pub x: f32,
    /// Y (vertical) coordinate in meters
    pub y: f32,
    /// Z coordinate in meters
    pub z: f32,
}

impl WorldPoint {
    /// Create a new world position.
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared distance in the horizontal (x, z) plane only.
    ///
    /// The vertical axis is discarded: two anchors on different shelves of
    /// the same booth are the same place on the floorplan.
    #[inline]
    pub fn planar_distance_squared(&self, other: &WorldPoint) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }

    /// Planar delta to another point as (dx, dz).
    #[inline]
    pub fn planar_delta(&self, other: &WorldPoint) -> (f32, f32) {
        (other.x - self.x, other.z - self.z)
    }
}

impl Default for WorldPoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

/// Orientation quaternion in the AR world frame.
///
/// Carried through from the tracking subsystem for anchor placement; the
/// planar estimator itself only uses positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldQuat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for WorldQuat {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

/// A full pose in the AR world frame: position plus orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPose {
    /// Position in meters.
    pub position: WorldPoint,
    /// Orientation quaternion.
    pub orientation: WorldQuat,
}

impl WorldPose {
    /// Create a pose at a position with identity orientation.
    #[inline]
    pub fn at(position: WorldPoint) -> Self {
        Self {
            position,
            orientation: WorldQuat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plan_point_distance() {
        let a = PlanPoint::new(0.0, 0.0);
        let b = PlanPoint::new(3.0, 4.0);
        assert_relative_eq!(a.distance(&b), 5.0);
        assert_relative_eq!(a.distance_squared(&b), 25.0);
    }

    #[test]
    fn test_world_planar_distance_ignores_height() {
        let a = WorldPoint::new(0.0, 0.0, 0.0);
        let b = WorldPoint::new(3.0, 10.0, 4.0);
        assert_relative_eq!(a.planar_distance_squared(&b), 25.0);
    }

    #[test]
    fn test_world_planar_delta() {
        let a = WorldPoint::new(1.0, 0.0, 2.0);
        let b = WorldPoint::new(4.0, 5.0, 6.0);
        let (dx, dz) = a.planar_delta(&b);
        assert_relative_eq!(dx, 3.0);
        assert_relative_eq!(dz, 4.0);
    }

    #[test]
    fn test_identity_quat_default() {
        let q = WorldQuat::default();
        assert_relative_eq!(q.w, 1.0);
        assert_relative_eq!(q.x, 0.0);
    }
}
