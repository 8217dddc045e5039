use std::fmt;

/// The closed set of ROI shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoiType {
    Box,
    Cylinder,
    Ellipsoid,
    /// Threshold region grown inside a single plane of the volume.
    Isocontour2D,
    /// Threshold region grown through the whole volume.
    Isocontour3D,
}

impl RoiType {
    pub fn is_parametric(&self) -> bool {
        matches!(self, Self::Box | Self::Cylinder | Self::Ellipsoid)
    }

    pub fn is_isocontour(&self) -> bool {
        !self.is_parametric()
    }

    /// Neighbourhood used for region growing and edge classification, `None`
    /// for parametric shapes.
    pub fn connectivity(&self) -> Option<Connectivity> {
        match self {
            Self::Isocontour2D => Some(Connectivity::Planar),
            Self::Isocontour3D => Some(Connectivity::Volumetric),
            _ => None,
        }
    }
}

impl fmt::Display for RoiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Box => "box",
            Self::Cylinder => "cylinder",
            Self::Ellipsoid => "ellipsoid",
            Self::Isocontour2D => "2D isocontour",
            Self::Isocontour3D => "3D isocontour",
        };
        f.write_str(name)
    }
}

/// Classification of a single isocontour mask cell.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MaskValue {
    #[default]
    Excluded = 0,
    /// Included, with at least one excluded neighbour.
    Boundary = 1,
    /// Included, with every neighbour included.
    Interior = 2,
}

impl MaskValue {
    #[inline]
    pub fn is_included(&self) -> bool {
        !matches!(self, Self::Excluded)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    /// 8 in-plane neighbours.
    Planar,
    /// 26 neighbours.
    Volumetric,
}

impl Connectivity {
    pub fn neighbour_count(&self) -> usize {
        match self {
            Self::Planar => 8,
            Self::Volumetric => 26,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Processor {
    Serial,
    #[default]
    Rayon,
}

/// Pixel rule used when rasterizing an isocontour mask onto a slice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RasterMode {
    /// Interior cells, plus boundary cells on the scanned region's edge for
    /// planar masks.
    #[default]
    Fill,
    /// Boundary cells, plus interior cells on the scanned region's edge for
    /// planar masks, giving a closed outline.
    Outline,
}
