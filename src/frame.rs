use nalgebra::Matrix3;
use nalgebra::Point3;
use nalgebra::Rotation3;
use nalgebra::Vector3;

/// Affine mapping between a local space and the base (world) space.
///
/// The frame is an offset point plus three orthonormal axes, all expressed in
/// base space. A local point `p` sits at `offset + p.x * x + p.y * y + p.z * z`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateFrame {
    offset: Point3<f64>,
    /// Columns are the x, y and z axes.
    axes: Matrix3<f64>,
}

impl Default for CoordinateFrame {
    fn default() -> Self {
        Self::identity()
    }
}

impl CoordinateFrame {
    pub fn identity() -> Self {
        Self {
            offset: Point3::origin(),
            axes: Matrix3::identity(),
        }
    }

    /// Build a frame from an offset and three axes. The axes are normalized
    /// and are expected to be mutually orthogonal.
    pub fn new(offset: Point3<f64>, axes: [Vector3<f64>; 3]) -> Self {
        let [x, y, z] = axes;
        Self {
            offset,
            axes: Matrix3::from_columns(&[x.normalize(), y.normalize(), z.normalize()]),
        }
    }

    pub fn offset(&self) -> Point3<f64> {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Point3<f64>) {
        self.offset = offset;
    }

    pub fn with_offset(mut self, offset: Point3<f64>) -> Self {
        self.offset = offset;
        self
    }

    /// Axis `index` (0 = x, 1 = y, 2 = z) in base space.
    pub fn axis(&self, index: usize) -> Vector3<f64> {
        self.axes.column(index).into_owned()
    }

    /// Rotate the axes about the frame's own offset.
    pub fn rotated(&self, rotation: &Rotation3<f64>) -> Self {
        Self {
            offset: self.offset,
            axes: rotation.matrix() * self.axes,
        }
    }

    #[inline]
    pub fn to_base(&self, local: &Point3<f64>) -> Point3<f64> {
        self.offset + self.axes * local.coords
    }

    #[inline]
    pub fn to_local(&self, base: &Point3<f64>) -> Point3<f64> {
        // Orthonormal axes: the inverse is the transpose
        Point3::from(self.axes.tr_mul(&(base - self.offset)))
    }
}

/// Move `point` from the local space of `from` into the local space of `to`.
#[inline]
pub fn transform_point(
    point: &Point3<f64>,
    from: &CoordinateFrame,
    to: &CoordinateFrame,
) -> Point3<f64> {
    to.to_local(&from.to_base(point))
}
