//! # Volume-ROI library
//!
//! This crate provides region of interest (ROI) geometry and isocontour
//! segmentation for multi-dimensional scalar image volumes (3D space, gate and
//! time).
//!
//! An ROI is either a parametric shape or an isocontour:
//!  - Box
//!  - Cylinder
//!  - Ellipsoid
//!  - 2D isocontour (grown inside one plane, 8-connected)
//!  - 3D isocontour (grown through the volume, 26-connected)
//!
//! ROIs are queried against arbitrarily oriented slices. Parametric shapes
//! return a closed outline traced by a row scan of the slice, isocontours a
//! byte raster sampled from their classified voxel mask. Membership of single
//! points can be tested for every ROI type, which is what statistics code
//! needs.
//!
//! Isocontours are grown from a seed voxel with an explicit work stack, so
//! large connected regions never exhaust the call stack. Per-voxel
//! classification and slice rasterization run on the rayon pool unless a
//! [`Processor::Serial`] is requested.
//!
//! # Roadmap
//!
//!  - Threshold ranges (below / between) for isocontours
//!  - Interpolated (non nearest-voxel) slice rasters
//!
//! # Examples
//!
//! ## Growing an isocontour and slicing it
//!
//! Segment a bright block from a synthetic volume, then rasterize it on the
//! axial slice through the block's center.
//!
//! ```
//! # use volume_roi::{Orientation, Roi, RoiType, Volume, Voxel};
//! # use nalgebra::Vector3;
//! # use ndarray::Array3;
//! let data = Array3::from_shape_fn((8, 16, 16), |(z, y, x)| {
//!     if (2..6).contains(&z) && (4..12).contains(&y) && (4..12).contains(&x) { 5.0 } else { 0.0 }
//! });
//! let volume = Volume::new(data, Vector3::repeat(1.0)).expect("should be a valid volume");
//!
//! let mut roi = Roi::new("block", RoiType::Isocontour3D);
//! roi.set_isocontour(&volume, Voxel::new(8, 8, 4))
//!     .expect("seed should be inside the volume");
//!
//! let slice = volume
//!     .slice_from_axis(4, Orientation::Axial)
//!     .expect("slice index should be inside the volume");
//! let mask = roi.get_slice(&slice).expect("slice should cross the region");
//! assert_eq!(mask.dim(), (8, 8));
//! assert_eq!(mask.inside_count(), 36);
//! ```

pub mod bounds;
pub mod enums;
pub mod frame;
pub mod isocontour;
pub mod rasterizer;
pub mod roi;
pub mod shape;
pub mod slice;
pub mod volume;

pub use enums::{Connectivity, MaskValue, Orientation, Processor, RasterMode, RoiType};
pub use frame::{CoordinateFrame, transform_point};
pub use isocontour::{IsocontourMask, SegmentationOptions};
pub use rasterizer::IntersectionMask;
pub use roi::{Intersection, Roi, RoiError};
pub use shape::IntersectionPolyline;
pub use slice::Slice;
pub use volume::{Volume, VolumeAccess, VolumeError, Voxel};
