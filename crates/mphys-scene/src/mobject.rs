//! Renderable mobjects.
//!
//! A mobject is a kind plus a list of anchor points in scene coordinates.
//! Transforms act on the points directly, so a rotation is cumulative: the
//! mobject does not remember an absolute angle, it can only report one
//! through [`Mobject::orientation`].

use std::f64::consts::{PI, TAU};

use crate::error::SceneError;
use crate::math::{rotate_point, signed_angle, BoundingBox2, Point2, Vec2};
use crate::scene::MobjectId;

/// Stroke width given to lines when none is specified.
pub const DEFAULT_STROKE_WIDTH: f64 = 4.0;

/// Geometric kind of a mobject.
#[derive(Debug, Clone, PartialEq)]
pub enum MobjectKind {
    /// Circle. Points are `[center, rim marker]`; the marker tracks rotation.
    Circle {
        /// Radius.
        radius: f64,
    },
    /// Straight line. Points are `[start, end]`.
    Line {
        /// Stroke width.
        stroke_width: f64,
    },
    /// Rectangle. Points are the corners `[UR, UL, DL, DR]` before rotation.
    Rectangle,
    /// Regular polygon. Points are the vertices, counter-clockwise.
    RegularPolygon {
        /// Number of sides.
        sides: usize,
    },
    /// Arbitrary closed polygon.
    Polygon,
    /// Open free-form path.
    Path,
    /// Group of other mobjects. Has no points of its own.
    Group {
        /// Grouped mobjects.
        children: Vec<MobjectId>,
    },
}

/// A renderable object in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Mobject {
    kind: MobjectKind,
    points: Vec<Point2>,
}

impl Mobject {
    /// Circle of `radius` around `center`.
    pub fn circle(center: Point2, radius: f64) -> Self {
        Self {
            kind: MobjectKind::Circle { radius },
            points: vec![center, center + Vec2::new(radius, 0.0)],
        }
    }

    /// Line from `start` to `end` with the default stroke width.
    pub fn line(start: Point2, end: Point2) -> Self {
        Self {
            kind: MobjectKind::Line {
                stroke_width: DEFAULT_STROKE_WIDTH,
            },
            points: vec![start, end],
        }
    }

    /// Axis-aligned rectangle centred on `center`.
    pub fn rectangle(center: Point2, width: f64, height: f64) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self {
            kind: MobjectKind::Rectangle,
            points: vec![
                center + Vec2::new(hw, hh),
                center + Vec2::new(-hw, hh),
                center + Vec2::new(-hw, -hh),
                center + Vec2::new(hw, -hh),
            ],
        }
    }

    /// Axis-aligned square centred on `center`.
    pub fn square(center: Point2, side: f64) -> Self {
        Self::rectangle(center, side, side)
    }

    /// Regular polygon with `sides` vertices on a circle of `radius`.
    ///
    /// The bottom edge is horizontal in the canonical orientation.
    pub fn regular_polygon(center: Point2, sides: usize, radius: f64) -> Result<Self, SceneError> {
        if sides < 3 {
            return Err(SceneError::InvalidShape(format!(
                "a regular polygon needs at least 3 sides, got {sides}"
            )));
        }
        let start = if sides % 2 == 0 {
            PI / 2.0 - PI / sides as f64
        } else {
            PI / 2.0
        };
        let points = (0..sides)
            .map(|k| {
                let a = start + TAU * k as f64 / sides as f64;
                center + Vec2::new(a.cos(), a.sin()) * radius
            })
            .collect();
        Ok(Self {
            kind: MobjectKind::RegularPolygon { sides },
            points,
        })
    }

    /// Equilateral triangle with the apex up.
    pub fn triangle(center: Point2, radius: f64) -> Self {
        let start = PI / 2.0;
        let points = (0..3)
            .map(|k| {
                let a = start + TAU * k as f64 / 3.0;
                center + Vec2::new(a.cos(), a.sin()) * radius
            })
            .collect();
        Self {
            kind: MobjectKind::RegularPolygon { sides: 3 },
            points,
        }
    }

    /// Closed polygon through `vertices`.
    pub fn polygon(vertices: Vec<Point2>) -> Result<Self, SceneError> {
        if vertices.len() < 3 {
            return Err(SceneError::InvalidShape(format!(
                "a polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        Ok(Self {
            kind: MobjectKind::Polygon,
            points: vertices,
        })
    }

    /// Open path through `points`.
    pub fn path(points: Vec<Point2>) -> Result<Self, SceneError> {
        if points.is_empty() {
            return Err(SceneError::InvalidShape("a path needs at least one point".into()));
        }
        Ok(Self {
            kind: MobjectKind::Path,
            points,
        })
    }

    pub(crate) fn group(children: Vec<MobjectId>) -> Self {
        Self {
            kind: MobjectKind::Group { children },
            points: Vec::new(),
        }
    }

    /// Set the stroke width of a line. Other kinds are returned unchanged.
    pub fn with_stroke_width(mut self, width: f64) -> Self {
        if let MobjectKind::Line { stroke_width } = &mut self.kind {
            *stroke_width = width;
        }
        self
    }

    /// Rotate about the centre, builder style.
    pub fn rotated(mut self, angle: f64) -> Self {
        if let Some(center) = self.center() {
            self.rotate_about(angle, &center);
        }
        self
    }

    /// The kind of this mobject.
    pub fn kind(&self) -> &MobjectKind {
        &self.kind
    }

    /// Anchor points in scene coordinates.
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Whether this mobject is a group.
    pub fn is_group(&self) -> bool {
        matches!(self.kind, MobjectKind::Group { .. })
    }

    /// Bounding box of the mobject. `None` for groups.
    pub fn bounding_box(&self) -> Option<BoundingBox2> {
        match self.kind {
            MobjectKind::Circle { radius } => {
                let c = self.points[0];
                let r = Vec2::new(radius.abs(), radius.abs());
                Some(BoundingBox2 {
                    min: c - r,
                    max: c + r,
                })
            }
            MobjectKind::Group { .. } => None,
            _ => BoundingBox2::from_points(&self.points),
        }
    }

    /// Centre of the mobject.
    ///
    /// Lines and polygonal kinds use the mean of their vertices, which moves
    /// with the shape under rotation. Paths use their bounding box centre.
    pub fn center(&self) -> Option<Point2> {
        match self.kind {
            MobjectKind::Circle { .. } => Some(self.points[0]),
            MobjectKind::Line { .. }
            | MobjectKind::Rectangle
            | MobjectKind::RegularPolygon { .. }
            | MobjectKind::Polygon => {
                let sum = self
                    .points
                    .iter()
                    .fold(Vec2::zeros(), |acc, p| acc + p.coords);
                Some(Point2::from(sum / self.points.len() as f64))
            }
            MobjectKind::Path => self.bounding_box().map(|b| b.center()),
            MobjectKind::Group { .. } => None,
        }
    }

    /// Translate all points by `delta`.
    pub fn shift(&mut self, delta: &Vec2) {
        for p in &mut self.points {
            *p += delta;
        }
    }

    /// Rotate all points about `about` by `angle` radians.
    pub fn rotate_about(&mut self, angle: f64, about: &Point2) {
        for p in &mut self.points {
            *p = rotate_point(p, about, angle);
        }
    }

    /// Start point of a line.
    pub fn start(&self) -> Option<Point2> {
        match self.kind {
            MobjectKind::Line { .. } => Some(self.points[0]),
            _ => None,
        }
    }

    /// End point of a line.
    pub fn end(&self) -> Option<Point2> {
        match self.kind {
            MobjectKind::Line { .. } => Some(self.points[1]),
            _ => None,
        }
    }

    /// Move the endpoints of a line.
    pub(crate) fn set_start_and_end(&mut self, start: Point2, end: Point2) -> bool {
        match self.kind {
            MobjectKind::Line { .. } => {
                self.points[0] = start;
                self.points[1] = end;
                true
            }
            _ => false,
        }
    }

    /// First edge `v0 - v1` of the same kind in its canonical orientation.
    fn reference_edge(&self) -> Option<Vec2> {
        let canonical = match self.kind {
            MobjectKind::Rectangle => Self::rectangle(Point2::origin(), 2.0, 1.0),
            MobjectKind::RegularPolygon { sides } => {
                Self::regular_polygon(Point2::origin(), sides, 1.0).ok()?
            }
            _ => return None,
        };
        Some(canonical.points[0] - canonical.points[1])
    }

    /// Absolute orientation recovered from the geometry, in `(-PI, PI]`.
    ///
    /// Rectangles and regular polygons compare their first edge with the
    /// canonical shape's first edge. Lines report their direction, circles
    /// the direction of their rim marker. Everything else reports 0.
    pub fn orientation(&self) -> f64 {
        match self.kind {
            MobjectKind::Line { .. } | MobjectKind::Circle { .. } => {
                let d = self.points[1] - self.points[0];
                d.y.atan2(d.x)
            }
            MobjectKind::Rectangle | MobjectKind::RegularPolygon { .. } => self
                .reference_edge()
                .map(|reference| signed_angle(&reference, &(self.points[0] - self.points[1])))
                .unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn test_rectangle_corners_and_center() {
        let rect = Mobject::rectangle(Point2::new(1.0, 1.0), 4.0, 2.0);
        assert_eq!(rect.points()[0], Point2::new(3.0, 2.0));
        assert_eq!(rect.points()[2], Point2::new(-1.0, 0.0));
        assert_eq!(rect.center(), Some(Point2::new(1.0, 1.0)));
        assert_relative_eq!(rect.orientation(), 0.0);
    }

    #[test]
    fn test_orientation_follows_rotation() {
        let rect = Mobject::square(Point2::origin(), 1.0).rotated(FRAC_PI_4);
        assert_relative_eq!(rect.orientation(), FRAC_PI_4, epsilon = 1e-12);

        let tri = Mobject::triangle(Point2::origin(), 1.0).rotated(-0.3);
        assert_relative_eq!(tri.orientation(), -0.3, epsilon = 1e-12);

        let hex = Mobject::regular_polygon(Point2::origin(), 6, 1.0)
            .unwrap()
            .rotated(0.2);
        assert_relative_eq!(hex.orientation(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_line_and_circle_orientation() {
        let line = Mobject::line(Point2::new(0.0, 0.0), Point2::new(0.0, 2.0));
        assert_relative_eq!(line.orientation(), PI / 2.0);
        assert_eq!(line.start(), Some(Point2::origin()));

        let circle = Mobject::circle(Point2::new(2.0, 2.0), 0.5).rotated(1.0);
        assert_relative_eq!(circle.orientation(), 1.0, epsilon = 1e-12);
        assert_eq!(circle.center(), Some(Point2::new(2.0, 2.0)));
    }

    #[test]
    fn test_regular_polygon_bottom_edge_is_flat() {
        for sides in 3..9 {
            let poly = Mobject::regular_polygon(Point2::origin(), sides, 1.0).unwrap();
            let lowest = poly
                .points()
                .iter()
                .map(|p| p.y)
                .fold(f64::INFINITY, f64::min);
            let on_bottom = poly
                .points()
                .iter()
                .filter(|p| (p.y - lowest).abs() < 1e-9)
                .count();
            assert_eq!(on_bottom, 2, "{sides} sides");
        }
    }

    #[test]
    fn test_triangle_center_is_stable_under_rotation() {
        let tri = Mobject::triangle(Point2::new(1.0, -1.0), 1.0);
        let c = tri.center().unwrap();
        assert_relative_eq!(c.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.y, -1.0, epsilon = 1e-12);

        let turned = tri.rotated(0.7).center().unwrap();
        assert_relative_eq!(turned.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(turned.y, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_shapes() {
        assert!(Mobject::regular_polygon(Point2::origin(), 2, 1.0).is_err());
        assert!(Mobject::polygon(vec![Point2::origin(), Point2::new(1.0, 0.0)]).is_err());
        assert!(Mobject::path(Vec::new()).is_err());
    }

    #[test]
    fn test_stroke_width_only_touches_lines() {
        let line = Mobject::line(Point2::origin(), Point2::new(1.0, 0.0)).with_stroke_width(8.0);
        assert_eq!(line.kind(), &MobjectKind::Line { stroke_width: 8.0 });

        let circle = Mobject::circle(Point2::origin(), 1.0).with_stroke_width(8.0);
        assert_eq!(circle.kind(), &MobjectKind::Circle { radius: 1.0 });
    }
}
