use nalgebra::Point3;
use nalgebra::Vector3;

/// `(z, y, x)` index into a voxel grid, matching ndarray's axis order.
pub type Idx3d = (usize, usize, usize);

/// Tight integer bounding box of a voxel set. Both corners are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoxelBounds {
    pub min: Idx3d,
    pub max: Idx3d,
}

impl VoxelBounds {
    /// Bounds holding a single voxel.
    pub fn at(idx: Idx3d) -> Self {
        Self { min: idx, max: idx }
    }

    pub fn expand_to_contain(&mut self, (z, y, x): Idx3d) {
        self.min = (self.min.0.min(z), self.min.1.min(y), self.min.2.min(x));
        self.max = (self.max.0.max(z), self.max.1.max(y), self.max.2.max(x));
    }

    /// Grid shape needed to hold the bounds, `max - min + 1` per axis.
    pub fn shape(&self) -> Idx3d {
        (
            self.max.0 - self.min.0 + 1,
            self.max.1 - self.min.1 + 1,
            self.max.2 - self.min.2 + 1,
        )
    }

    pub fn contains(&self, (z, y, x): Idx3d) -> bool {
        (self.min.0..=self.max.0).contains(&z)
            && (self.min.1..=self.max.1).contains(&y)
            && (self.min.2..=self.max.2).contains(&x)
    }
}

/// Offset `idx` by `(dz, dy, dx)`, returning `None` when the result leaves a
/// grid of the given shape.
#[inline]
pub fn offset_within(
    (z, y, x): Idx3d,
    (dz, dy, dx): (isize, isize, isize),
    shape: Idx3d,
) -> Option<Idx3d> {
    let z = z.checked_add_signed(dz).filter(|&v| v < shape.0)?;
    let y = y.checked_add_signed(dy).filter(|&v| v < shape.1)?;
    let x = x.checked_add_signed(dx).filter(|&v| v < shape.2)?;
    Some((z, y, x))
}

/// Voxel `(z, y, x)` holding a local point, `None` below the origin or for
/// NaN coordinates.
#[inline]
pub fn voxel_index(local: &Point3<f64>, voxel_size: &Vector3<f64>) -> Option<Idx3d> {
    let index = |value: f64, size: f64| {
        let i = (value / size).floor();
        // false for NaN
        (i >= 0.0).then_some(i as usize)
    };
    Some((
        index(local.z, voxel_size.z)?,
        index(local.y, voxel_size.y)?,
        index(local.x, voxel_size.x)?,
    ))
}

/// The eight corners of the box spanned by the origin and `corner`.
pub fn box_corners(corner: &Point3<f64>) -> [Point3<f64>; 8] {
    let mut corners = [Point3::origin(); 8];
    for (i, c) in corners.iter_mut().enumerate() {
        c.x = if i & 1 == 0 { 0.0 } else { corner.x };
        c.y = if i & 2 == 0 { 0.0 } else { corner.y };
        c.z = if i & 4 == 0 { 0.0 } else { corner.z };
    }
    corners
}

/// Component-wise minimum and maximum of a point set, `None` when empty.
pub fn real_bounds<I>(points: I) -> Option<(Point3<f64>, Point3<f64>)>
where
    I: IntoIterator<Item = Point3<f64>>,
{
    points.into_iter().fold(None, |acc, p| match acc {
        None => Some((p, p)),
        Some((lo, hi)) => Some((lo.inf(&p), hi.sup(&p))),
    })
}
