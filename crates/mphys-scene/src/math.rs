//! Planar math types for the scene graph.
//!
//! Thin wrappers around nalgebra for points, vectors, bounding boxes and
//! angle helpers. Everything here is f64 in scene units.

use nalgebra::Vector2;
use std::f64::consts::{PI, TAU};

/// A point in the scene plane.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in the scene plane.
pub type Vec2 = Vector2<f64>;

/// Rotate a vector counter-clockwise by `angle` radians.
pub fn rotate_vec(v: &Vec2, angle: f64) -> Vec2 {
    let (s, c) = angle.sin_cos();
    Vec2::new(c * v.x - s * v.y, s * v.x + c * v.y)
}

/// Rotate `p` about `about` by `angle` radians.
pub fn rotate_point(p: &Point2, about: &Point2, angle: f64) -> Point2 {
    about + rotate_vec(&(p - about), angle)
}

/// Signed angle that rotates `from` onto `to`, in `(-PI, PI]`.
///
/// Returns 0 when either vector is zero.
pub fn signed_angle(from: &Vec2, to: &Vec2) -> f64 {
    if from.norm_squared() == 0.0 || to.norm_squared() == 0.0 {
        return 0.0;
    }
    let cross = from.x * to.y - from.y * to.x;
    let dot = from.dot(to);
    cross.atan2(dot)
}

/// Wrap an angle into `(-PI, PI]`.
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle.rem_euclid(TAU);
    if a > PI {
        a -= TAU;
    }
    a
}

/// Axis-aligned bounding box in the scene plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox2 {
    /// Lower-left corner.
    pub min: Point2,
    /// Upper-right corner.
    pub max: Point2,
}

impl BoundingBox2 {
    /// Box enclosing all `points`, or `None` when there are none.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bbox = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        Some(bbox)
    }

    /// Smallest box enclosing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: Point2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Centre of the box.
    pub fn center(&self) -> Point2 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Extent along X.
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Extent along Y.
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Half of the width and height.
    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) / 2.0
    }
}
