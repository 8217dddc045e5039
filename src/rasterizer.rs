use crate::bounds::box_corners;
use crate::bounds::real_bounds;
use crate::bounds::voxel_index;
use crate::enums::Connectivity;
use crate::enums::MaskValue;
use crate::enums::Processor;
use crate::enums::RasterMode;
use crate::frame::CoordinateFrame;
use crate::frame::transform_point;
use crate::isocontour::IsocontourMask;
use crate::slice::Slice;

use image::GrayImage;
use image::ImageBuffer;
use nalgebra::Point3;
use nalgebra::Vector3;
use ndarray::Array2;
use ndarray::Zip;
use rayon::prelude::*;
use tracing::trace;

/// Keeps corners that land on a voxel edge from spilling into the next voxel.
const EDGE_TOLERANCE: f64 = 1e-9;

/// Byte raster of an ROI on a slice, placed on the slice's voxel grid.
///
/// Pixels hold `1` for inside and `0` for outside. The raster's frame is the
/// slice frame moved to the first covered pixel, so pixel `(x, y)` of the
/// raster is pixel `(start.0 + x, start.1 + y)` of the slice.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionMask {
    data: Array2<u8>,
    frame: CoordinateFrame,
    voxel_size: Vector3<f64>,
    start: (usize, usize),
}

impl IntersectionMask {
    /// Raster stored `(y, x)`.
    pub fn data(&self) -> &Array2<u8> {
        &self.data
    }

    /// `(width, height)` in pixels.
    pub fn dim(&self) -> (usize, usize) {
        let (height, width) = self.data.dim();
        (width, height)
    }

    /// First covered slice pixel as `(x, y)`.
    pub fn start(&self) -> (usize, usize) {
        self.start
    }

    pub fn frame(&self) -> &CoordinateFrame {
        &self.frame
    }

    pub fn voxel_size(&self) -> Vector3<f64> {
        self.voxel_size
    }

    /// Far corner of the raster in its own frame.
    pub fn corner(&self) -> Point3<f64> {
        let (width, height) = self.dim();
        Point3::new(
            width as f64 * self.voxel_size.x,
            height as f64 * self.voxel_size.y,
            self.voxel_size.z,
        )
    }

    pub fn is_inside(&self, x: usize, y: usize) -> bool {
        self.data.get((y, x)).is_some_and(|&v| v != 0)
    }

    pub fn inside_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Inside pixels as raster `(x, y)`, row by row.
    pub fn iter_inside(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.data
            .indexed_iter()
            .filter(|(_, v)| **v != 0)
            .map(|((y, x), _)| (x, y))
    }

    /// Base space position of the center of raster pixel `(x, y)`.
    pub fn pixel_center(&self, x: usize, y: usize) -> Point3<f64> {
        self.frame.to_base(&Point3::new(
            (x as f64 + 0.5) * self.voxel_size.x,
            (y as f64 + 0.5) * self.voxel_size.y,
            self.voxel_size.z / 2.0,
        ))
    }

    /// Grayscale image with inside pixels white.
    pub fn to_image(&self) -> Option<GrayImage> {
        let (width, height) = self.dim();
        let pixel_data: Vec<u8> = self
            .data
            .par_iter()
            .map(|&v| if v != 0 { u8::MAX } else { 0 })
            .collect();
        ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
    }
}

/// Pixel window of a slice covered by an ROI's bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SliceOverlap {
    /// `(x, y)` of the first covered pixel.
    pub start: (usize, usize),
    /// `(width, height)` of the window.
    pub dim: (usize, usize),
}

/// Window of `slice` covered by the box `[0, roi_corner]` of `roi_frame`, or
/// `None` when the slice's sampling plane misses the box.
pub(crate) fn slice_overlap(
    roi_frame: &CoordinateFrame,
    roi_corner: &Point3<f64>,
    slice: &Slice,
) -> Option<SliceOverlap> {
    if slice.is_empty() {
        return None;
    }
    let corners = box_corners(roi_corner).map(|c| transform_point(&c, roi_frame, &slice.frame));
    let (lo, hi) = real_bounds(corners)?;

    let z = slice.mid_depth();
    if z < lo.z || z > hi.z {
        return None;
    }

    let span = |lo: f64, hi: f64, size: f64, len: usize| {
        let len = len as f64;
        let first = (lo / size + EDGE_TOLERANCE).floor().clamp(0.0, len) as usize;
        let last = (hi / size - EDGE_TOLERANCE).ceil().clamp(0.0, len) as usize;
        (first, last.saturating_sub(first))
    };
    let (x0, width) = span(lo.x, hi.x, slice.voxel_size.x, slice.width);
    let (y0, height) = span(lo.y, hi.y, slice.voxel_size.y, slice.height);

    (width > 0 && height > 0).then_some(SliceOverlap {
        start: (x0, y0),
        dim: (width, height),
    })
}

/// Geometry of an isocontour ROI as needed for rasterization.
pub(crate) struct MaskPlacement<'a> {
    pub mask: &'a IsocontourMask,
    pub frame: &'a CoordinateFrame,
    pub voxel_size: &'a Vector3<f64>,
    pub corner: &'a Point3<f64>,
}

/// Sample `placement` at every pixel center of the overlapping slice window.
pub(crate) fn rasterize(
    placement: &MaskPlacement<'_>,
    slice: &Slice,
    mode: RasterMode,
    processor: Processor,
) -> Option<IntersectionMask> {
    let overlap = slice_overlap(placement.frame, placement.corner, slice)?;
    trace!(?overlap, ?mode, "Rasterizing isocontour");

    let (x0, y0) = overlap.start;
    let (width, height) = overlap.dim;
    let planar = placement.mask.connectivity() == Connectivity::Planar;

    let pixel = |(y, x): (usize, usize), px: &mut u8| {
        let view = slice.pixel_center(x0 + x, y0 + y);
        let local = transform_point(&view, &slice.frame, placement.frame);
        let Some(idx) = voxel_index(&local, placement.voxel_size) else {
            return;
        };
        let on_edge = y == 0 || y == height - 1 || x == 0 || x == width - 1;
        let inside = match (mode, placement.mask.get(idx)) {
            (_, MaskValue::Excluded) => false,
            (RasterMode::Fill, MaskValue::Interior) => true,
            (RasterMode::Outline, MaskValue::Boundary) => true,
            // 3D classification already accounts for through-plane neighbours
            (RasterMode::Fill, MaskValue::Boundary) => planar && on_edge,
            (RasterMode::Outline, MaskValue::Interior) => planar && on_edge,
        };
        *px = u8::from(inside);
    };

    let mut data = Array2::<u8>::zeros((height, width));
    match processor {
        Processor::Serial => Zip::indexed(&mut data).for_each(pixel),
        Processor::Rayon => Zip::indexed(&mut data).par_for_each(pixel),
    }

    let vs = slice.voxel_size;
    let origin = Point3::new(x0 as f64 * vs.x, y0 as f64 * vs.y, 0.0);
    Some(IntersectionMask {
        data,
        frame: slice.frame.with_offset(slice.frame.to_base(&origin)),
        voxel_size: vs,
        start: overlap.start,
    })
}
