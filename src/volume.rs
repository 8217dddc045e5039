use crate::enums::Orientation;
use crate::frame::CoordinateFrame;
use crate::slice::Slice;

use nalgebra::Point3;
use nalgebra::Vector3;
use ndarray::Array3;
use ndarray::Array5;
use ndarray::Axis;
use thiserror::Error;

/// Integer address of a voxel: three spatial indices plus gate and time frame.
///
/// The same type carries grid dimensions, in which case each field is the
/// number of voxels along that axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Voxel {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub g: usize,
    pub t: usize,
}

impl Voxel {
    /// Voxel in the first gate of the first frame.
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z, g: 0, t: 0 }
    }

    pub const fn at_frame(mut self, g: usize, t: usize) -> Self {
        self.g = g;
        self.t = t;
        self
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum VolumeError {
    #[error("Voxel size must be finite and positive, got {0:?}")]
    InvalidVoxelSize(Vector3<f64>),

    #[error("Volume has no voxels")]
    EmptyVolume,
}

/// Read access to a scalar image volume.
pub trait VolumeAccess {
    /// Number of voxels along each axis.
    fn dim(&self) -> Voxel;

    /// Physical size of a voxel along x, y and z.
    fn voxel_size(&self) -> Vector3<f64>;

    fn coord_frame(&self) -> &CoordinateFrame;

    /// Value at `voxel`. Callers check [`VolumeAccess::includes_voxel`] first.
    fn value_at(&self, voxel: Voxel) -> f32;

    fn includes_voxel(&self, voxel: Voxel) -> bool {
        let dim = self.dim();
        voxel.x < dim.x && voxel.y < dim.y && voxel.z < dim.z && voxel.g < dim.g && voxel.t < dim.t
    }
}

/// In-memory volume, stored `(t, g, z, y, x)`.
#[derive(Clone, Debug)]
pub struct Volume {
    pub data: Array5<f32>,
    pub voxel_size: Vector3<f64>,
    pub frame: CoordinateFrame,
}

impl Volume {
    /// Single frame, single gate volume from `(z, y, x)` data.
    pub fn new(data: Array3<f32>, voxel_size: Vector3<f64>) -> Result<Self, VolumeError> {
        Self::from_frames(data.insert_axis(Axis(0)).insert_axis(Axis(0)), voxel_size)
    }

    /// Volume from `(t, g, z, y, x)` data.
    pub fn from_frames(data: Array5<f32>, voxel_size: Vector3<f64>) -> Result<Self, VolumeError> {
        if voxel_size.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(VolumeError::InvalidVoxelSize(voxel_size));
        }
        if data.is_empty() {
            return Err(VolumeError::EmptyVolume);
        }
        Ok(Self {
            data,
            voxel_size,
            frame: CoordinateFrame::identity(),
        })
    }

    pub fn with_frame(mut self, frame: CoordinateFrame) -> Self {
        self.frame = frame;
        self
    }

    pub fn dim(&self) -> Voxel {
        let (t, g, z, y, x) = self.data.dim();
        Voxel { x, y, z, g, t }
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array5<f32> {
        &self.data
    }

    /// Get a mutable reference to the underlying data
    pub fn data_mut(&mut self) -> &mut Array5<f32> {
        &mut self.data
    }

    /// Far corner of the volume in its own frame.
    pub fn corner(&self) -> Point3<f64> {
        let dim = self.dim();
        Point3::new(
            dim.x as f64 * self.voxel_size.x,
            dim.y as f64 * self.voxel_size.y,
            dim.z as f64 * self.voxel_size.z,
        )
    }

    /// The voxel (first gate and frame) under a base space point, if any.
    pub fn voxel_at_point(&self, base: &Point3<f64>) -> Option<Voxel> {
        let local = self.frame.to_local(base);
        let dim = self.dim();
        let index = |value: f64, size: f64, len: usize| {
            let i = (value / size).floor();
            (i >= 0.0 && i < len as f64).then_some(i as usize)
        };
        Some(Voxel::new(
            index(local.x, self.voxel_size.x, dim.x)?,
            index(local.y, self.voxel_size.y, dim.y)?,
            index(local.z, self.voxel_size.z, dim.z)?,
        ))
    }

    /// One voxel thick slice through the volume, perpendicular to one of its
    /// axes. Returns `None` if `index` is past the end of that axis.
    pub fn slice_from_axis(&self, index: usize, orientation: Orientation) -> Option<Slice> {
        if !self.is_valid_index(index, &orientation) {
            return None;
        }
        let dim = self.dim();
        let vs = self.voxel_size;
        let axis = |i| self.frame.axis(i);

        // (slice x, slice y, normal) as volume axis indices
        let (u, v, n) = match orientation {
            // Looking down Z-axis: X is width, Y is height
            Orientation::Axial => (0, 1, 2),
            // Looking down Y-axis: X is width, Z is height
            Orientation::Coronal => (0, 2, 1),
            // Looking down X-axis: Y is width, Z is height
            Orientation::Sagittal => (1, 2, 0),
        };
        let lens = [dim.x, dim.y, dim.z];

        let mut local_offset = Point3::origin();
        local_offset[n] = index as f64 * vs[n];
        let frame = CoordinateFrame::new(
            self.frame.to_base(&local_offset),
            [axis(u), axis(v), axis(n)],
        );
        Some(Slice::new(
            frame,
            Vector3::new(vs[u], vs[v], vs[n]),
            lens[u],
            lens[v],
        ))
    }

    fn is_valid_index(&self, index: usize, orientation: &Orientation) -> bool {
        let dim = self.dim();
        let max_index = match orientation {
            Orientation::Axial => dim.z,
            Orientation::Coronal => dim.y,
            Orientation::Sagittal => dim.x,
        };
        index < max_index
    }
}

impl VolumeAccess for Volume {
    fn dim(&self) -> Voxel {
        Volume::dim(self)
    }

    fn voxel_size(&self) -> Vector3<f64> {
        self.voxel_size
    }

    fn coord_frame(&self) -> &CoordinateFrame {
        &self.frame
    }

    #[inline]
    fn value_at(&self, voxel: Voxel) -> f32 {
        self.data[[voxel.t, voxel.g, voxel.z, voxel.y, voxel.x]]
    }
}
