use std::collections::VecDeque;

use crate::enums::RoiType;
use crate::frame::CoordinateFrame;
use crate::frame::transform_point;
use crate::slice::Slice;

use nalgebra::Point2;
use nalgebra::Point3;
use nalgebra::Vector3;

/// Closed outline of a parametric ROI on a slice plane, in the slice's local
/// coordinates. The last point repeats the first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IntersectionPolyline {
    points: Vec<Point2<f64>>,
}

impl IntersectionPolyline {
    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.points.len() > 1 && self.points.first() == self.points.last()
    }

    /// The outline moved into base space, on the slice's sampling plane.
    pub fn to_base(&self, slice: &Slice) -> Vec<Point3<f64>> {
        let z = slice.mid_depth();
        self.points
            .iter()
            .map(|p| slice.frame.to_base(&Point3::new(p.x, p.y, z)))
            .collect()
    }
}

/// Box, cylinder or ellipsoid spanning `[0, corner]` of its ROI frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ParametricShape {
    kind: RoiType,
    min: Point3<f64>,
    max: Point3<f64>,
    center: Point3<f64>,
    radius: Vector3<f64>,
    height: f64,
}

impl ParametricShape {
    /// `None` for isocontour types.
    pub(crate) fn new(kind: RoiType, corner: &Vector3<f64>) -> Option<Self> {
        if !kind.is_parametric() {
            return None;
        }
        let origin = Point3::origin();
        let far = Point3::from(*corner);
        Some(Self {
            kind,
            min: origin.inf(&far),
            max: origin.sup(&far),
            center: Point3::from(corner * 0.5),
            radius: corner * 0.5,
            height: corner.z.abs(),
        })
    }

    /// Membership of a point given in the ROI's local frame.
    pub(crate) fn contains(&self, p: &Point3<f64>) -> bool {
        let d = p - self.center;
        match self.kind {
            RoiType::Box => {
                (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
            }
            RoiType::Cylinder => {
                let rx = d.x / self.radius.x;
                let ry = d.y / self.radius.y;
                rx * rx + ry * ry <= 1.0 && d.z.abs() <= self.height / 2.0
            }
            RoiType::Ellipsoid => {
                let r = d.component_div(&self.radius);
                r.norm_squared() <= 1.0
            }
            RoiType::Isocontour2D | RoiType::Isocontour3D => false,
        }
    }

    /// Row-scan the slice and trace where the shape's boundary crosses it.
    ///
    /// Samples are taken at pixel centers on the slice's mid-depth plane. An
    /// entry is pushed to the front of the outline and an exit to the back, so
    /// for a convex shape the rows chain into a single closed loop.
    pub(crate) fn intersection_line(
        &self,
        roi_frame: &CoordinateFrame,
        slice: &Slice,
    ) -> Option<IntersectionPolyline> {
        let step = slice.voxel_size.x;
        let mut points = VecDeque::new();

        for iy in 0..slice.height {
            if slice.width == 0 {
                continue;
            }
            let mut prev_in = false;
            let mut entered_last = false;
            let mut last = slice.pixel_center(0, iy);

            for ix in 0..slice.width {
                let view = slice.pixel_center(ix, iy);
                let inside = self.contains(&transform_point(&view, &slice.frame, roi_frame));

                entered_last = inside && !prev_in;
                if entered_last {
                    points.push_front(Point2::new(view.x, view.y));
                } else if !inside && prev_in {
                    // the previous sample was the last one inside
                    points.push_back(Point2::new(view.x - step, view.y));
                }
                prev_in = inside;
                last = view;
            }

            // a row entered on its last sample already has that vertex
            if prev_in && !entered_last {
                points.push_back(Point2::new(last.x, last.y));
            }
        }

        let first = *points.front()?;
        points.push_back(first);
        Some(IntersectionPolyline {
            points: points.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;
    use nalgebra::Vector3;

    fn slice(width: usize, height: usize, z: f64) -> Slice {
        let frame = CoordinateFrame::identity().with_offset(Point3::new(0.0, 0.0, z - 0.5));
        Slice::new(frame, Vector3::repeat(1.0), width, height)
    }

    #[test]
    fn box_membership_is_inclusive() {
        let shape = ParametricShape::new(RoiType::Box, &Vector3::new(4.0, 4.0, 2.0)).unwrap();
        assert!(shape.contains(&Point3::new(0.0, 0.0, 0.0)));
        assert!(shape.contains(&Point3::new(4.0, 4.0, 2.0)));
        assert!(shape.contains(&Point3::new(2.0, 1.0, 1.0)));
        assert!(!shape.contains(&Point3::new(4.1, 1.0, 1.0)));
        assert!(!shape.contains(&Point3::new(1.0, 1.0, -0.1)));
    }

    #[test]
    fn box_with_negative_corner() {
        let shape = ParametricShape::new(RoiType::Box, &Vector3::new(-2.0, 2.0, 2.0)).unwrap();
        assert!(shape.contains(&Point3::new(-1.0, 1.0, 1.0)));
        assert!(!shape.contains(&Point3::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn cylinder_membership() {
        let shape = ParametricShape::new(RoiType::Cylinder, &Vector3::new(4.0, 2.0, 6.0)).unwrap();
        // center (2, 1, 3), radii (2, 1), height 6
        assert!(shape.contains(&Point3::new(2.0, 1.0, 0.0)));
        assert!(shape.contains(&Point3::new(4.0, 1.0, 6.0)));
        assert!(!shape.contains(&Point3::new(3.9, 1.9, 3.0)));
        assert!(!shape.contains(&Point3::new(2.0, 1.0, 6.1)));
    }

    #[test]
    fn ellipsoid_membership() {
        let shape = ParametricShape::new(RoiType::Ellipsoid, &Vector3::new(4.0, 4.0, 8.0)).unwrap();
        assert!(shape.contains(&Point3::new(2.0, 2.0, 4.0)));
        assert!(shape.contains(&Point3::new(2.0, 2.0, 8.0)));
        assert!(!shape.contains(&Point3::new(2.0, 2.0, 8.01)));
        assert!(!shape.contains(&Point3::new(3.5, 3.5, 4.0)));
    }

    #[test]
    fn isocontour_is_not_parametric() {
        assert!(ParametricShape::new(RoiType::Isocontour2D, &Vector3::repeat(1.0)).is_none());
    }

    #[test]
    fn box_outline_is_a_rectangle() {
        let shape = ParametricShape::new(RoiType::Box, &Vector3::new(4.0, 4.0, 2.0)).unwrap();
        let line = shape
            .intersection_line(&CoordinateFrame::identity(), &slice(8, 8, 1.0))
            .unwrap();

        assert!(line.is_closed());
        // 4 rows, one entry and one exit each, plus the closing point
        assert_eq!(line.len(), 9);
        for corner in [(0.5, 0.5), (3.5, 0.5), (3.5, 3.5), (0.5, 3.5)] {
            assert!(line.points().contains(&Point2::new(corner.0, corner.1)));
        }
        for p in line.points() {
            assert!(p.x == 0.5 || p.x == 3.5);
            assert!((0.5..=3.5).contains(&p.y));
        }
    }

    #[test]
    fn row_clipped_by_slice_edge_still_exits() {
        let shape = ParametricShape::new(RoiType::Box, &Vector3::new(4.0, 4.0, 2.0)).unwrap();
        let line = shape
            .intersection_line(&CoordinateFrame::identity(), &slice(2, 1, 1.0))
            .unwrap();
        assert_eq!(
            line.points(),
            &[Point2::new(0.5, 0.5), Point2::new(1.5, 0.5), Point2::new(0.5, 0.5)]
        );
    }

    #[test]
    fn row_entered_on_its_last_sample_has_one_vertex() {
        // only the last column's centers (x = 7.5) fall inside the box
        let roi_frame = CoordinateFrame::identity().with_offset(Point3::new(7.2, 0.0, 0.0));
        let shape = ParametricShape::new(RoiType::Box, &Vector3::new(1.8, 4.0, 2.0)).unwrap();
        let line = shape.intersection_line(&roi_frame, &slice(8, 4, 1.0)).unwrap();

        // 4 rows of one vertex each, plus the closing point
        assert_eq!(line.len(), 5);
        assert!(line.is_closed());
        assert!(line.points().windows(2).all(|w| w[0] != w[1]));
        assert!(line.points().iter().all(|p| p.x == 7.5));
    }

    #[test]
    fn slice_missing_the_shape_gives_nothing() {
        let shape = ParametricShape::new(RoiType::Ellipsoid, &Vector3::new(4.0, 4.0, 2.0)).unwrap();
        assert!(
            shape
                .intersection_line(&CoordinateFrame::identity(), &slice(8, 8, 5.0))
                .is_none()
        );
        assert!(
            shape
                .intersection_line(&CoordinateFrame::identity(), &slice(0, 8, 1.0))
                .is_none()
        );
    }

    #[test]
    fn ellipsoid_vertices_sit_on_membership_flips() {
        let corner = Vector3::new(10.0, 6.0, 4.0);
        let shape = ParametricShape::new(RoiType::Ellipsoid, &corner).unwrap();
        let roi_frame = CoordinateFrame::identity()
            .with_offset(Point3::new(3.0, 2.0, -1.0))
            .rotated(&Rotation3::from_axis_angle(&Vector3::z_axis(), 0.3));
        let slice = slice(20, 20, 1.0);
        let line = shape.intersection_line(&roi_frame, &slice).unwrap();
        assert!(line.is_closed());

        let inside = |x: f64, y: f64| {
            let p = Point3::new(x, y, slice.mid_depth());
            shape.contains(&transform_point(&p, &slice.frame, &roi_frame))
        };
        for p in line.points() {
            assert!(inside(p.x, p.y));
            // one of the horizontal neighbours is outside
            assert!(!inside(p.x - 1.0, p.y) || !inside(p.x + 1.0, p.y));
        }
    }
}
