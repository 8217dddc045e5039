use crate::bounds::voxel_index;
use crate::enums::Processor;
use crate::enums::RasterMode;
use crate::enums::RoiType;
use crate::frame::CoordinateFrame;
use crate::isocontour::IsocontourMask;
use crate::isocontour::SegmentationOptions;
use crate::rasterizer;
use crate::rasterizer::IntersectionMask;
use crate::rasterizer::MaskPlacement;
use crate::shape::IntersectionPolyline;
use crate::shape::ParametricShape;
use crate::slice::Slice;
use crate::volume::Voxel;
use crate::volume::VolumeAccess;

use nalgebra::Point3;
use nalgebra::Vector3;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum RoiError {
    #[error("A {0} ROI has no isocontour")]
    NotIsocontour(RoiType),

    #[error("A {0} ROI is not a parametric shape")]
    NotParametric(RoiType),

    #[error("ROI has not been drawn")]
    Undrawn,

    #[error("Seed voxel {0:?} holds NaN")]
    NanSeed(Voxel),

    #[error("Voxel {voxel:?} lies outside a grid of {dim:?}")]
    VoxelOutOfBounds { voxel: Voxel, dim: Voxel },

    #[error("Extent must be finite, got {0:?}")]
    InvalidExtent(Vector3<f64>),
}

/// Geometry of an ROI on a slice.
#[derive(Clone, Debug, PartialEq)]
pub enum Intersection {
    /// Outline of a parametric shape.
    Line(IntersectionPolyline),
    /// Raster of an isocontour.
    Mask(IntersectionMask),
}

/// A region of interest.
///
/// Every ROI lives in its own coordinate frame and spans `[0, corner]` of it.
/// Parametric shapes are fully described by that box; isocontours carry a
/// classified voxel mask covering the same box. An ROI without extent or mask
/// is *undrawn* and every query on it comes back empty.
#[derive(Clone, Debug)]
pub struct Roi {
    name: String,
    roi_type: RoiType,
    frame: CoordinateFrame,
    corner: Vector3<f64>,
    voxel_size: Vector3<f64>,
    isocontour: Option<IsocontourMask>,
    processor: Processor,
}

impl Roi {
    pub fn new(name: impl Into<String>, roi_type: RoiType) -> Self {
        Self {
            name: name.into(),
            roi_type,
            frame: CoordinateFrame::identity(),
            corner: Vector3::zeros(),
            voxel_size: Vector3::repeat(1.0),
            isocontour: None,
            processor: Processor::default(),
        }
    }

    /// Parametric shape spanning `[0, corner]` of `frame`.
    pub fn parametric(
        name: impl Into<String>,
        roi_type: RoiType,
        frame: CoordinateFrame,
        corner: Vector3<f64>,
    ) -> Result<Self, RoiError> {
        let mut roi = Self::new(name, roi_type).with_frame(frame);
        roi.set_corner(corner)?;
        Ok(roi)
    }

    pub fn with_frame(mut self, frame: CoordinateFrame) -> Self {
        self.frame = frame;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roi_type(&self) -> RoiType {
        self.roi_type
    }

    pub fn frame(&self) -> &CoordinateFrame {
        &self.frame
    }

    /// Move or rotate the ROI. Isocontour masks move with it.
    pub fn set_frame(&mut self, frame: CoordinateFrame) {
        self.frame = frame;
    }

    /// Far corner of the ROI in its own frame.
    pub fn corner(&self) -> Vector3<f64> {
        self.corner
    }

    /// Voxel size of the isocontour mask.
    pub fn voxel_size(&self) -> Vector3<f64> {
        self.voxel_size
    }

    pub fn isocontour(&self) -> Option<&IsocontourMask> {
        self.isocontour.as_ref()
    }

    /// Processor used to rasterize isocontour slices.
    pub fn set_processor(&mut self, processor: Processor) {
        self.processor = processor;
    }

    /// Set the extent of a parametric shape. A zero component leaves the ROI
    /// undrawn.
    pub fn set_corner(&mut self, corner: Vector3<f64>) -> Result<(), RoiError> {
        if !self.roi_type.is_parametric() {
            return Err(RoiError::NotParametric(self.roi_type));
        }
        if corner.iter().any(|c| !c.is_finite()) {
            return Err(RoiError::InvalidExtent(corner));
        }
        self.corner = corner;
        Ok(())
    }

    pub fn is_undrawn(&self) -> bool {
        if self.roi_type.is_isocontour() {
            self.isocontour.is_none()
        } else {
            self.corner.iter().any(|c| *c == 0.0)
        }
    }

    /// Drop any extent or mask.
    pub fn clear(&mut self) {
        self.corner = Vector3::zeros();
        self.isocontour = None;
    }

    fn shape(&self) -> Option<ParametricShape> {
        if self.is_undrawn() {
            return None;
        }
        ParametricShape::new(self.roi_type, &self.corner)
    }

    /// Membership of a point given in the ROI's own frame.
    ///
    /// Isocontours answer by nearest voxel lookup; boundary and interior
    /// cells are both members.
    pub fn shape_membership(&self, point: &Point3<f64>) -> bool {
        if let Some(mask) = &self.isocontour {
            return voxel_index(point, &self.voxel_size)
                .is_some_and(|idx| mask.get(idx).is_included());
        }
        self.shape().is_some_and(|shape| shape.contains(point))
    }

    /// Membership of a base space point.
    pub fn contains_point(&self, base: &Point3<f64>) -> bool {
        self.shape_membership(&self.frame.to_local(base))
    }

    /// Outline of a parametric ROI on `slice`, in slice coordinates. `None`
    /// for isocontours, undrawn ROIs and slices that miss the shape.
    pub fn get_intersection_line(&self, slice: &Slice) -> Option<IntersectionPolyline> {
        self.shape()?.intersection_line(&self.frame, slice)
    }

    /// Filled raster of an isocontour on `slice`. `None` for parametric
    /// shapes, undrawn ROIs and slices the mask does not reach.
    pub fn get_slice(&self, slice: &Slice) -> Option<IntersectionMask> {
        self.rasterize(slice, RasterMode::Fill)
    }

    /// Outline raster of an isocontour on `slice`: boundary cells, closed off
    /// along the edge of the covered window for planar masks.
    pub fn get_outline(&self, slice: &Slice) -> Option<IntersectionMask> {
        self.rasterize(slice, RasterMode::Outline)
    }

    fn rasterize(&self, slice: &Slice, mode: RasterMode) -> Option<IntersectionMask> {
        let mask = self.isocontour.as_ref()?;
        let corner = Point3::from(self.corner);
        let placement = MaskPlacement {
            mask,
            frame: &self.frame,
            voxel_size: &self.voxel_size,
            corner: &corner,
        };
        rasterizer::rasterize(&placement, slice, mode, self.processor)
    }

    /// Whatever geometry suits the ROI type: a polyline for parametric
    /// shapes, the filled raster for isocontours.
    pub fn get_intersection(&self, slice: &Slice) -> Option<Intersection> {
        if self.roi_type.is_parametric() {
            self.get_intersection_line(slice).map(Intersection::Line)
        } else {
            self.get_slice(slice).map(Intersection::Mask)
        }
    }

    /// Redefine an isocontour ROI as the region grown from `seed` in `volume`.
    ///
    /// A seed outside the volume or holding NaN is rejected and the ROI keeps
    /// its previous mask.
    pub fn set_isocontour<V: VolumeAccess + ?Sized>(
        &mut self,
        volume: &V,
        seed: Voxel,
    ) -> Result<(), RoiError> {
        self.set_isocontour_with(volume, seed, &SegmentationOptions::default())
    }

    pub fn set_isocontour_with<V: VolumeAccess + ?Sized>(
        &mut self,
        volume: &V,
        seed: Voxel,
        options: &SegmentationOptions,
    ) -> Result<(), RoiError> {
        let connectivity = self
            .roi_type
            .connectivity()
            .ok_or(RoiError::NotIsocontour(self.roi_type))?;
        if !volume.includes_voxel(seed) {
            return Err(RoiError::VoxelOutOfBounds {
                voxel: seed,
                dim: volume.dim(),
            });
        }
        if volume.value_at(seed).is_nan() {
            return Err(RoiError::NanSeed(seed));
        }

        let mask = IsocontourMask::segment(volume, seed, connectivity, options);

        let voxel_size = volume.voxel_size();
        let origin = mask.origin();
        let (dz, dy, dx) = mask.dim();
        let min = Point3::new(
            origin.x as f64 * voxel_size.x,
            origin.y as f64 * voxel_size.y,
            origin.z as f64 * voxel_size.z,
        );
        let frame = volume.coord_frame();

        self.frame = frame.with_offset(frame.to_base(&min));
        self.voxel_size = voxel_size;
        self.corner = Vector3::new(dx as f64, dy as f64, dz as f64).component_mul(&voxel_size);
        self.isocontour = Some(mask);
        debug!(name = %self.name, corner = ?self.corner, "Set isocontour");
        Ok(())
    }

    /// Clear the cube (or square, for 2D isocontours) of half-width `radius`
    /// around mask voxel `voxel`, and reclassify the cells bordering it.
    pub fn erase_area(&mut self, voxel: Voxel, radius: usize) -> Result<(), RoiError> {
        let roi_type = self.roi_type;
        if !roi_type.is_isocontour() {
            return Err(RoiError::NotIsocontour(roi_type));
        }
        let mask = self.isocontour.as_mut().ok_or(RoiError::Undrawn)?;

        let (dz, dy, dx) = mask.dim();
        if voxel.x >= dx || voxel.y >= dy || voxel.z >= dz {
            return Err(RoiError::VoxelOutOfBounds {
                voxel,
                dim: Voxel::new(dx, dy, dz),
            });
        }
        mask.erase((voxel.z, voxel.y, voxel.x), radius);
        Ok(())
    }

    /// [`Roi::erase_area`] around the mask voxel under a base space point.
    pub fn erase_at_point(&mut self, base: &Point3<f64>, radius: usize) -> Result<(), RoiError> {
        let local = self.frame.to_local(base);
        if let Some((z, y, x)) = voxel_index(&local, &self.voxel_size) {
            return self.erase_area(Voxel::new(x, y, z), radius);
        }
        if !self.roi_type.is_isocontour() {
            return Err(RoiError::NotIsocontour(self.roi_type));
        }
        // below the mask origin or NaN, reported against the mask shape
        let (dz, dy, dx) = self.isocontour.as_ref().ok_or(RoiError::Undrawn)?.dim();
        Err(RoiError::VoxelOutOfBounds {
            voxel: Voxel::default(),
            dim: Voxel::new(dx, dy, dz),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::MaskValue;
    use crate::volume::Volume;
    use ndarray::Array3;

    fn blob_volume() -> Volume {
        // 3x3 bright block at x, y in 2..5 on planes 1..4
        let data = Array3::from_shape_fn((5, 8, 8), |(z, y, x)| {
            let inside = (1..4).contains(&z) && (2..5).contains(&y) && (2..5).contains(&x);
            if inside { 3.0 } else { 1.0 }
        });
        Volume::new(data, Vector3::new(1.0, 1.0, 2.0))
            .unwrap()
            .with_frame(CoordinateFrame::identity().with_offset(Point3::new(10.0, 0.0, 0.0)))
    }

    #[test]
    fn new_rois_are_undrawn() {
        for roi_type in [
            RoiType::Box,
            RoiType::Cylinder,
            RoiType::Ellipsoid,
            RoiType::Isocontour2D,
            RoiType::Isocontour3D,
        ] {
            let roi = Roi::new("roi", roi_type);
            assert!(roi.is_undrawn());
            assert!(!roi.shape_membership(&Point3::origin()));
        }
    }

    #[test]
    fn parametric_corner_draws_the_roi() {
        let mut roi = Roi::new("box", RoiType::Box);
        roi.set_corner(Vector3::new(2.0, 2.0, 0.0)).unwrap();
        assert!(roi.is_undrawn());
        roi.set_corner(Vector3::new(2.0, 2.0, 1.0)).unwrap();
        assert!(!roi.is_undrawn());
        assert!(roi.shape_membership(&Point3::new(1.0, 1.0, 0.5)));

        roi.clear();
        assert!(roi.is_undrawn());
    }

    #[test]
    fn corner_is_rejected_for_isocontours() {
        let mut roi = Roi::new("iso", RoiType::Isocontour3D);
        assert_eq!(
            roi.set_corner(Vector3::repeat(1.0)),
            Err(RoiError::NotParametric(RoiType::Isocontour3D))
        );
        let mut roi = Roi::new("box", RoiType::Box);
        assert!(matches!(
            roi.set_corner(Vector3::new(f64::NAN, 1.0, 1.0)),
            Err(RoiError::InvalidExtent(_))
        ));
    }

    #[test]
    fn isocontour_geometry_follows_the_mask() {
        let volume = blob_volume();
        let mut roi = Roi::new("iso", RoiType::Isocontour3D);
        roi.set_isocontour(&volume, Voxel::new(3, 3, 2)).unwrap();

        assert!(!roi.is_undrawn());
        assert_eq!(roi.isocontour().unwrap().dim(), (3, 3, 3));
        assert_eq!(roi.frame().offset(), Point3::new(12.0, 2.0, 2.0));
        assert_eq!(roi.corner(), Vector3::new(3.0, 3.0, 6.0));
        assert_eq!(roi.voxel_size(), Vector3::new(1.0, 1.0, 2.0));

        assert!(roi.contains_point(&Point3::new(13.5, 3.5, 4.0)));
        assert!(!roi.contains_point(&Point3::new(11.5, 3.5, 4.0)));
        assert!(!roi.contains_point(&Point3::new(13.5, 3.5, 8.5)));
    }

    #[test]
    fn planar_isocontour_is_one_plane_deep() {
        let volume = blob_volume();
        let mut roi = Roi::new("iso", RoiType::Isocontour2D);
        roi.set_isocontour(&volume, Voxel::new(2, 4, 3)).unwrap();

        let mask = roi.isocontour().unwrap();
        assert_eq!(mask.dim(), (1, 3, 3));
        assert_eq!(mask.origin(), Voxel::new(2, 2, 3));
        assert_eq!(mask.interior_count(), 1);
        assert_eq!(roi.frame().offset(), Point3::new(12.0, 2.0, 6.0));
        assert_eq!(roi.corner(), Vector3::new(3.0, 3.0, 2.0));
    }

    #[test]
    fn bad_seed_leaves_the_roi_untouched() {
        let volume = blob_volume();
        let mut roi = Roi::new("iso", RoiType::Isocontour3D);
        roi.set_isocontour(&volume, Voxel::new(3, 3, 2)).unwrap();
        let before = roi.isocontour().cloned();

        let err = roi.set_isocontour(&volume, Voxel::new(8, 0, 0)).unwrap_err();
        assert!(matches!(err, RoiError::VoxelOutOfBounds { .. }));
        let err = roi
            .set_isocontour(&volume, Voxel::new(0, 0, 0).at_frame(0, 1))
            .unwrap_err();
        assert!(matches!(err, RoiError::VoxelOutOfBounds { .. }));
        assert_eq!(roi.isocontour().cloned(), before);

        let mut shape = Roi::new("box", RoiType::Box);
        assert_eq!(
            shape.set_isocontour(&volume, Voxel::new(3, 3, 2)),
            Err(RoiError::NotIsocontour(RoiType::Box))
        );
    }

    #[test]
    fn erase_checks_preconditions() {
        let volume = blob_volume();
        let mut roi = Roi::new("iso", RoiType::Isocontour3D);
        assert_eq!(roi.erase_area(Voxel::new(0, 0, 0), 1), Err(RoiError::Undrawn));

        roi.set_isocontour(&volume, Voxel::new(3, 3, 2)).unwrap();
        assert!(matches!(
            roi.erase_area(Voxel::new(3, 0, 0), 1),
            Err(RoiError::VoxelOutOfBounds { .. })
        ));
        assert_eq!(roi.isocontour().unwrap().included_count(), 27);

        let mut shape = Roi::new("box", RoiType::Box);
        assert_eq!(
            shape.erase_area(Voxel::new(0, 0, 0), 1),
            Err(RoiError::NotIsocontour(RoiType::Box))
        );
    }

    #[test]
    fn erase_at_point_maps_into_the_mask() {
        let volume = blob_volume();
        let mut roi = Roi::new("iso", RoiType::Isocontour3D);
        roi.set_isocontour(&volume, Voxel::new(3, 3, 2)).unwrap();

        roi.erase_at_point(&Point3::new(13.5, 3.5, 3.0), 0).unwrap();
        let mask = roi.isocontour().unwrap();
        assert_eq!(mask.get((0, 1, 1)), MaskValue::Excluded);
        assert_eq!(mask.included_count(), 26);

        assert!(matches!(
            roi.erase_at_point(&Point3::new(0.0, 0.0, 0.0), 0),
            Err(RoiError::VoxelOutOfBounds { .. })
        ));
    }

    #[test]
    fn intersection_dispatches_on_type() {
        let volume = blob_volume();
        let slice = volume.slice_from_axis(2, crate::enums::Orientation::Axial).unwrap();

        let mut iso = Roi::new("iso", RoiType::Isocontour3D);
        iso.set_isocontour(&volume, Voxel::new(3, 3, 2)).unwrap();
        assert!(matches!(iso.get_intersection(&slice), Some(Intersection::Mask(_))));
        assert!(iso.get_intersection_line(&slice).is_none());

        let shape = Roi::parametric(
            "box",
            RoiType::Box,
            CoordinateFrame::identity().with_offset(Point3::new(11.0, 1.0, 3.0)),
            Vector3::new(4.0, 4.0, 4.0),
        )
        .unwrap();
        assert!(matches!(shape.get_intersection(&slice), Some(Intersection::Line(_))));
        assert!(shape.get_slice(&slice).is_none());
    }

    #[test]
    fn nan_points_are_never_members() {
        let data = Array3::from_elem((1, 5, 5), 1.0);
        let volume = Volume::new(data, Vector3::repeat(1.0)).unwrap();
        let mut roi = Roi::new("iso", RoiType::Isocontour2D);
        roi.set_isocontour(&volume, Voxel::new(2, 2, 0)).unwrap();
        assert!(roi.shape_membership(&Point3::new(0.5, 0.5, 0.5)));

        let nan = f64::NAN;
        assert!(!roi.shape_membership(&Point3::new(nan, nan, nan)));
        assert!(!roi.shape_membership(&Point3::new(0.5, nan, 0.5)));
        assert!(!roi.contains_point(&Point3::new(nan, 0.5, 0.5)));

        assert!(matches!(
            roi.erase_at_point(&Point3::new(nan, nan, nan), 0),
            Err(RoiError::VoxelOutOfBounds { .. })
        ));
        assert_eq!(roi.isocontour().unwrap().included_count(), 25);
    }

    #[test]
    fn nan_seed_is_rejected() {
        let mut data = Array3::from_elem((1, 4, 4), 2.0);
        data[[0, 1, 1]] = f32::NAN;
        let volume = Volume::new(data, Vector3::repeat(1.0)).unwrap();

        let mut roi = Roi::new("iso", RoiType::Isocontour2D);
        assert_eq!(
            roi.set_isocontour(&volume, Voxel::new(1, 1, 0)),
            Err(RoiError::NanSeed(Voxel::new(1, 1, 0)))
        );
        assert!(roi.is_undrawn());

        // NaN voxels next to a valid seed are left out of the region
        roi.set_isocontour(&volume, Voxel::new(0, 0, 0)).unwrap();
        let mask = roi.isocontour().unwrap();
        assert_eq!(mask.included_count(), 15);
        assert_eq!(mask.get((0, 1, 1)), MaskValue::Excluded);
    }

    #[test]
    fn unbounded_erase_radius_clears_the_mask() {
        let data = Array3::from_elem((1, 5, 5), 1.0);
        let volume = Volume::new(data, Vector3::repeat(1.0)).unwrap();
        let mut roi = Roi::new("iso", RoiType::Isocontour2D);
        roi.set_isocontour(&volume, Voxel::new(2, 2, 0)).unwrap();

        roi.erase_area(Voxel::new(2, 2, 0), usize::MAX).unwrap();
        let mask = roi.isocontour().unwrap();
        assert_eq!(mask.included_count(), 0);
        assert_eq!(mask.dim(), (1, 5, 5));
        assert!(!roi.is_undrawn());
    }
}
