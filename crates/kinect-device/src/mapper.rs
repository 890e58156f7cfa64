//! Pinhole camera-to-color projection.

use crate::sensor::CoordinateMapper;
use crate::types::{CameraSpacePoint, ColorSpacePoint};

/// Projects camera-space points with fixed color camera intrinsics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeMapper {
    pub focal_x: f32,
    pub focal_y: f32,
    pub center_x: f32,
    pub center_y: f32,
}

impl PinholeMapper {
    /// Nominal intrinsics of the 1920x1080 color camera.
    pub const fn color_camera() -> Self {
        Self {
            focal_x: 1081.37,
            focal_y: 1081.37,
            center_x: 959.5,
            center_y: 539.5,
        }
    }
}

impl Default for PinholeMapper {
    fn default() -> Self {
        Self::color_camera()
    }
}

impl CoordinateMapper for PinholeMapper {
    fn map_camera_point_to_color_space(&self, point: CameraSpacePoint) -> ColorSpacePoint {
        // Camera space is y-up; image space is y-down.
        ColorSpacePoint {
            x: self.center_x + self.focal_x * point.x / point.z,
            y: self.center_y - self.focal_y * point.y / point.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optical_axis_maps_to_center() {
        let mapper = PinholeMapper::color_camera();
        let p = mapper.map_camera_point_to_color_space(CameraSpacePoint::new(0.0, 0.0, 2.0));
        assert_eq!(p, ColorSpacePoint { x: 959.5, y: 539.5 });
    }

    #[test]
    fn test_up_and_right_move_up_and_right() {
        let mapper = PinholeMapper::color_camera();
        let p = mapper.map_camera_point_to_color_space(CameraSpacePoint::new(0.5, 0.5, 1.0));
        assert!(p.x > 959.5);
        assert!(p.y < 539.5);
    }
}
