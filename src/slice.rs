use crate::frame::CoordinateFrame;

use nalgebra::Point3;
use nalgebra::Vector3;

/// A one voxel deep cut through image space at arbitrary orientation.
///
/// The slice occupies `[0, corner]` of its own frame: `width` voxels along
/// local x, `height` voxels along local y and a single voxel along local z.
#[derive(Clone, Debug, PartialEq)]
pub struct Slice {
    pub frame: CoordinateFrame,
    pub voxel_size: Vector3<f64>,
    pub width: usize,
    pub height: usize,
}

impl Slice {
    pub fn new(frame: CoordinateFrame, voxel_size: Vector3<f64>, width: usize, height: usize) -> Self {
        Self {
            frame,
            voxel_size,
            width,
            height,
        }
    }

    /// Far corner of the slice in its own frame.
    pub fn corner(&self) -> Point3<f64> {
        Point3::new(
            self.width as f64 * self.voxel_size.x,
            self.height as f64 * self.voxel_size.y,
            self.voxel_size.z,
        )
    }

    /// Local z of the plane all samples are taken on.
    #[inline]
    pub fn mid_depth(&self) -> f64 {
        self.voxel_size.z / 2.0
    }

    /// Local position of the center of pixel `(x, y)` on the mid-depth plane.
    #[inline]
    pub fn pixel_center(&self, x: usize, y: usize) -> Point3<f64> {
        Point3::new(
            (x as f64 + 0.5) * self.voxel_size.x,
            (y as f64 + 0.5) * self.voxel_size.y,
            self.mid_depth(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
