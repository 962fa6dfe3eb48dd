//! Lenses and the light rays they refract.
//!
//! A lens sits on a horizontal optical axis through its centre. Converging
//! lenses (positive focal length) are the overlap of two circles; diverging
//! lenses are a square with a circular bite taken out of each side. Rays are
//! polylines that grow a pair of segments for every lens they cross.

use std::f64::consts::{PI, TAU};

use mphys_ir::{LensDef, RayDef};
use mphys_scene::math::{rotate_vec, signed_angle};
use mphys_scene::{Point2, Vec2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FieldError, Result};

/// Refractive index of glass, the default for lenses.
pub const GLASS_INDEX: f64 = 1.52;

/// Length of a fresh ray and of each segment leaving a lens.
pub const DEFAULT_RAY_LENGTH: f64 = 5.0;

/// Scale between the focal length and the radius of curvature.
const FOCAL_SCALE: f64 = 50.0 / 7.0;

/// Half the side of a diverging lens, as a fraction of its radius.
const HALF_SIDE_RATIO: f64 = 0.7;

/// Crossings this close to the start of a segment belong to the surface the
/// segment starts on.
const SURFACE_EPS: f64 = 1e-9;

/// Refraction angle for light entering a medium of relative index `n`.
/// Angles are measured from the surface normal, in radians.
pub fn snell(incidence: f64, n: f64) -> f64 {
    (incidence.sin() / n).asin()
}

/// Angle of light leaving a medium of relative index `n`, given its angle
/// inside. NaN past the critical angle.
pub fn antisnell(refraction: f64, n: f64) -> f64 {
    (refraction.sin() * n).asin()
}

#[derive(Debug, Clone, Copy)]
enum Surface {
    /// Arc of radius `Lens::radius`, swept counter-clockwise from `start`.
    Arc {
        center: Point2,
        start: f64,
        sweep: f64,
    },
    /// Straight rim of a diverging lens.
    Flat { a: Point2, b: Point2 },
}

#[derive(Debug, Clone, Copy)]
struct Crossing {
    t: f64,
    point: Point2,
    normal: Vec2,
}

/// A lens with its axis along X.
#[derive(Debug, Clone, PartialEq)]
pub struct Lens {
    focal_length: f64,
    thickness: f64,
    index: f64,
    radius: f64,
    center: Point2,
}

impl Lens {
    /// Lens centred on the origin.
    ///
    /// `focal_length` is positive for a converging lens and negative for a
    /// diverging one; `thickness` is the width at the waist (converging) or
    /// between the two bites (diverging). Both surfaces share a radius of
    /// `(n - 1) * |f| * sqrt(50 d / 7 n)`.
    pub fn new(focal_length: f64, thickness: f64, index: f64) -> Result<Self> {
        if !focal_length.is_finite() || focal_length == 0.0 {
            return Err(FieldError::InvalidLens(format!(
                "focal length must be finite and non-zero, got {focal_length}"
            )));
        }
        if !thickness.is_finite() || thickness <= 0.0 {
            return Err(FieldError::InvalidLens(format!(
                "thickness must be > 0, got {thickness}"
            )));
        }
        if !index.is_finite() || index <= 1.0 {
            return Err(FieldError::InvalidLens(format!(
                "refractive index must be > 1, got {index}"
            )));
        }

        let scaled = FOCAL_SCALE * focal_length * focal_length;
        let radius = ((index - 1.0).powi(2) * scaled * thickness / index).sqrt();
        let half = thickness / 2.0;
        let fits = if focal_length > 0.0 {
            radius > half
        } else {
            // Each bite has to leave through the top and bottom rims.
            radius - (radius.powi(2) - (HALF_SIDE_RATIO * radius).powi(2)).sqrt() + half
                < HALF_SIDE_RATIO * radius
        };
        if !fits {
            return Err(FieldError::InvalidLens(format!(
                "thickness {thickness} is too large for focal length {focal_length}"
            )));
        }

        Ok(Self {
            focal_length,
            thickness,
            index,
            radius,
            center: Point2::origin(),
        })
    }

    /// Lens described in a document.
    pub fn from_def(def: &LensDef) -> Result<Self> {
        let mut lens = Self::new(
            def.focal_length,
            def.thickness,
            def.index.unwrap_or(GLASS_INDEX),
        )?;
        lens.shift(&Vec2::new(def.center.x, def.center.y));
        Ok(lens)
    }

    /// Move the lens by `by`.
    pub fn shift(&mut self, by: &Vec2) {
        self.center += *by;
    }

    /// Centre of the lens.
    pub fn center(&self) -> Point2 {
        self.center
    }

    /// Signed focal length.
    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    /// Width at the waist.
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// Refractive index.
    pub fn index(&self) -> f64 {
        self.index
    }

    /// Radius of curvature of both surfaces.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// True for a positive focal length.
    pub fn is_converging(&self) -> bool {
        self.focal_length > 0.0
    }

    /// Centres of curvature of the left (front) and right (back) surfaces.
    pub fn centers_of_curvature(&self) -> (Point2, Point2) {
        let offset = if self.is_converging() {
            self.radius - self.thickness / 2.0
        } else {
            -(self.radius + self.thickness / 2.0)
        };
        (
            self.center + Vec2::new(offset, 0.0),
            self.center - Vec2::new(offset, 0.0),
        )
    }

    fn surfaces(&self) -> Vec<Surface> {
        let (front, back) = self.centers_of_curvature();
        if self.is_converging() {
            let half_angle = ((self.radius - self.thickness / 2.0) / self.radius).acos();
            return vec![
                Surface::Arc {
                    center: front,
                    start: PI - half_angle,
                    sweep: 2.0 * half_angle,
                },
                Surface::Arc {
                    center: back,
                    start: -half_angle,
                    sweep: 2.0 * half_angle,
                },
            ];
        }

        let half_side = HALF_SIDE_RATIO * self.radius;
        let half_angle = HALF_SIDE_RATIO.asin();
        let reach = self.radius * half_angle.cos();
        let (left, right) = (front.x + reach, back.x - reach);
        let (top, bottom) = (self.center.y + half_side, self.center.y - half_side);
        vec![
            Surface::Arc {
                center: front,
                start: -half_angle,
                sweep: 2.0 * half_angle,
            },
            Surface::Arc {
                center: back,
                start: PI - half_angle,
                sweep: 2.0 * half_angle,
            },
            Surface::Flat {
                a: Point2::new(left, top),
                b: Point2::new(right, top),
            },
            Surface::Flat {
                a: Point2::new(right, bottom),
                b: Point2::new(left, bottom),
            },
        ]
    }

    /// Closed outline, `segments` chords per curved surface.
    pub fn outline(&self, segments: usize) -> Vec<Point2> {
        let segments = segments.max(1);
        let mut points: Vec<Point2> = Vec::with_capacity(2 * segments + 2);
        for surface in self.surfaces() {
            if let Surface::Arc {
                center,
                start,
                sweep,
            } = surface
            {
                points.extend((0..=segments).map(|i| {
                    let angle = start + sweep * i as f64 / segments as f64;
                    center + Vec2::new(angle.cos(), angle.sin()) * self.radius
                }));
            }
        }
        points.dedup_by(|a, b| (*a - *b).norm() < SURFACE_EPS);
        if points.len() > 1 && (points[0] - points[points.len() - 1]).norm() < SURFACE_EPS {
            points.pop();
        }
        points
    }

    /// Points where the segment `from`-`to` crosses the lens boundary,
    /// nearest `from` first.
    pub fn intersection(&self, from: &Point2, to: &Point2) -> Vec<Point2> {
        self.crossings(from, to).into_iter().map(|c| c.point).collect()
    }

    fn crossings(&self, from: &Point2, to: &Point2) -> Vec<Crossing> {
        let mut found = Vec::new();
        for surface in self.surfaces() {
            match surface {
                Surface::Arc {
                    center,
                    start,
                    sweep,
                } => {
                    for t in circle_hits(from, to, &center, self.radius) {
                        let point = from + (to - from) * t;
                        let offset = point - center;
                        let along = (offset.y.atan2(offset.x) - start).rem_euclid(TAU);
                        if along <= sweep + SURFACE_EPS || along >= TAU - SURFACE_EPS {
                            found.push(Crossing {
                                t,
                                point,
                                normal: offset / self.radius,
                            });
                        }
                    }
                }
                Surface::Flat { a, b } => {
                    if let Some(t) = segment_hit(from, to, &a, &b) {
                        let edge = b - a;
                        found.push(Crossing {
                            t,
                            point: from + (to - from) * t,
                            normal: Vec2::new(-edge.y, edge.x).normalize(),
                        });
                    }
                }
            }
        }
        found.retain(|c| c.t > SURFACE_EPS);
        found.sort_by(|a, b| a.t.total_cmp(&b.t));
        found.dedup_by(|a, b| (a.point - b.point).norm() < SURFACE_EPS);
        found
    }
}

/// Parameters in `[0, 1]` where the segment meets the circle.
fn circle_hits(from: &Point2, to: &Point2, center: &Point2, radius: f64) -> Vec<f64> {
    let d = to - from;
    let f = from - center;
    let a = d.norm_squared();
    let b = 2.0 * f.dot(&d);
    let c = f.norm_squared() - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if a == 0.0 || disc < 0.0 {
        return Vec::new();
    }
    let root = disc.sqrt();
    [(-b - root) / (2.0 * a), (-b + root) / (2.0 * a)]
        .into_iter()
        .filter(|t| (0.0..=1.0).contains(t))
        .collect()
}

/// Parameter along `p1`-`p2` where it crosses `q1`-`q2`.
fn segment_hit(p1: &Point2, p2: &Point2, q1: &Point2, q2: &Point2) -> Option<f64> {
    let r = p2 - p1;
    let s = q2 - q1;
    let denom = r.x * s.y - r.y * s.x;
    if denom.abs() < 1e-15 {
        return None;
    }
    let w = q1 - p1;
    let t = (w.x * s.y - w.y * s.x) / denom;
    let u = (w.x * r.y - w.y * r.x) / denom;
    ((0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)).then_some(t)
}

/// `normal` flipped, if needed, to point the way `dir` travels.
fn along(normal: &Vec2, dir: &Vec2) -> Vec2 {
    if normal.dot(dir) < 0.0 {
        -*normal
    } else {
        *normal
    }
}

fn refract_in(dir: &Vec2, normal: &Vec2, n: f64) -> Vec2 {
    let axis = along(normal, dir);
    rotate_vec(&axis, snell(signed_angle(&axis, dir), n))
}

/// `None` on total internal reflection.
fn refract_out(dir: &Vec2, normal: &Vec2, n: f64) -> Option<Vec2> {
    let axis = along(normal, dir);
    let incidence = signed_angle(&axis, dir);
    if incidence.sin().abs() >= 1.0 / n {
        return None;
    }
    Some(rotate_vec(&axis, antisnell(incidence, n)))
}

/// A ray of light.
#[derive(Debug, Clone, PartialEq)]
pub struct Ray {
    points: Vec<Point2>,
    length: f64,
    trapped: bool,
}

impl Ray {
    /// Ray of `length` from `start` along `direction`.
    pub fn new(start: Point2, direction: Vec2, length: f64) -> Result<Self> {
        let norm = direction.norm();
        if !norm.is_finite() || norm == 0.0 {
            return Err(FieldError::InvalidRay(format!(
                "direction must be non-zero, got ({}, {})",
                direction.x, direction.y
            )));
        }
        if !length.is_finite() || length <= 0.0 {
            return Err(FieldError::InvalidRay(format!("length must be > 0, got {length}")));
        }
        Ok(Self {
            points: vec![start, start + direction / norm * length],
            length,
            trapped: false,
        })
    }

    /// Ray described in a document.
    pub fn from_def(def: &RayDef) -> Result<Self> {
        Self::new(
            Point2::new(def.start.x, def.start.y),
            Vec2::new(def.direction.x, def.direction.y),
            def.length.unwrap_or(DEFAULT_RAY_LENGTH),
        )
    }

    /// Vertices of the ray, from its start.
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Where the ray ends.
    pub fn end(&self) -> Point2 {
        self.points[self.points.len() - 1]
    }

    /// Unit direction of the last segment.
    pub fn direction(&self) -> Vec2 {
        let (from, to) = self.last_segment();
        (to - from).normalize()
    }

    /// True once the ray has been caught by total internal reflection.
    /// A trapped ray ends on the inside of a lens surface.
    pub fn is_trapped(&self) -> bool {
        self.trapped
    }

    fn last_segment(&self) -> (Point2, Point2) {
        let n = self.points.len();
        (self.points[n - 2], self.points[n - 1])
    }

    /// Send the ray through `lenses`.
    ///
    /// Lenses are visited in the order the ray currently meets them; lenses
    /// it misses go last, in the order given. Each lens crossed replaces the
    /// free end of the ray with the entry point, the exit point and a new
    /// segment of the ray's length.
    pub fn propagate(&mut self, lenses: &[Lens]) {
        for lens in self.sort_lenses(lenses) {
            if self.trapped {
                break;
            }
            self.pass_through(lens);
        }
    }

    fn sort_lenses<'a>(&self, lenses: &'a [Lens]) -> Vec<&'a Lens> {
        let (from, to) = self.last_segment();
        let mut keyed: Vec<(f64, &Lens)> = lenses
            .iter()
            .map(|lens| {
                let distance = lens
                    .crossings(&from, &to)
                    .first()
                    .map_or(f64::INFINITY, |c| (c.point - from).norm());
                (distance, lens)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        keyed.into_iter().map(|(_, lens)| lens).collect()
    }

    fn pass_through(&mut self, lens: &Lens) {
        let (from, to) = self.last_segment();
        let Some(entry) = lens.crossings(&from, &to).into_iter().next() else {
            return;
        };
        let inside = refract_in(&self.direction(), &entry.normal, lens.index);
        let far = entry.point + inside * 2.0 * (lens.radius + lens.thickness);
        let Some(exit) = lens.crossings(&entry.point, &far).into_iter().next() else {
            return;
        };

        let last = self.points.len() - 1;
        self.points[last] = entry.point;
        self.points.push(exit.point);
        match refract_out(&inside, &exit.normal, lens.index) {
            Some(out) => self.points.push(exit.point + out * self.length),
            None => {
                debug!(x = exit.point.x, y = exit.point.y, "ray trapped in lens");
                self.trapped = true;
            }
        }
    }

    /// Serializable copy of the ray's path.
    pub fn traced(&self) -> TracedRay {
        TracedRay {
            points: self.points.iter().map(|p| [p.x, p.y]).collect(),
            trapped: self.trapped,
        }
    }
}

/// Path of a propagated ray.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracedRay {
    /// Vertices from the start of the ray.
    pub points: Vec<[f64; 2]>,
    /// Whether the ray ended inside a lens.
    pub trapped: bool,
}

/// Propagate every ray through every lens.
pub fn trace(lenses: &[Lens], rays: &mut [Ray]) {
    for ray in rays.iter_mut() {
        ray.propagate(lenses);
    }
    debug!(lenses = lenses.len(), rays = rays.len(), "traced rays");
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn horizontal(y: f64) -> Ray {
        Ray::new(Point2::new(-5.0, y), Vec2::new(1.0, 0.0), 8.0).unwrap()
    }

    #[test]
    fn test_snell_and_antisnell() {
        let inside = snell(0.5, GLASS_INDEX);
        assert!(inside < 0.5);
        assert_relative_eq!(antisnell(inside, GLASS_INDEX), 0.5, epsilon = 1e-12);
        assert_relative_eq!(snell(-0.3, GLASS_INDEX), -snell(0.3, GLASS_INDEX));
        assert!(antisnell(1.0, GLASS_INDEX).is_nan());
    }

    #[test]
    fn test_lens_curvature() {
        let lens = Lens::new(5.0, 1.0, GLASS_INDEX).unwrap();
        let radius = 0.52 * 5.0 * (50.0 / (7.0 * 1.52_f64)).sqrt();
        assert_relative_eq!(lens.radius(), radius, epsilon = 1e-12);

        let (front, back) = lens.centers_of_curvature();
        assert_relative_eq!(front.x, radius - 0.5, epsilon = 1e-12);
        assert_relative_eq!(back.x, -(radius - 0.5), epsilon = 1e-12);

        let mut lens = Lens::new(-5.0, 1.0, GLASS_INDEX).unwrap();
        assert!(!lens.is_converging());
        lens.shift(&Vec2::new(2.0, 1.0));
        let (front, back) = lens.centers_of_curvature();
        assert_relative_eq!(front.x, 2.0 - (radius + 0.5), epsilon = 1e-12);
        assert_relative_eq!(back.x, 2.0 + radius + 0.5, epsilon = 1e-12);
        assert_eq!(front.y, 1.0);
    }

    #[test]
    fn test_lens_rejects_bad_parameters() {
        assert!(Lens::new(0.0, 1.0, GLASS_INDEX).is_err());
        assert!(Lens::new(5.0, 0.0, GLASS_INDEX).is_err());
        assert!(Lens::new(5.0, 1.0, 1.0).is_err());
        // radius ~0.11 cannot hold a waist of 1
        assert!(matches!(
            Lens::new(0.1, 1.0, GLASS_INDEX),
            Err(FieldError::InvalidLens(_))
        ));
        assert!(Lens::new(-0.1, 1.0, GLASS_INDEX).is_err());
    }

    #[test]
    fn test_outline_spans_the_waist() {
        let lens = Lens::new(5.0, 1.0, GLASS_INDEX).unwrap();
        let outline = lens.outline(32);
        assert_eq!(outline.len(), 64);

        let top = outline.iter().map(|p| p.y).fold(f64::MIN, f64::max);
        let half_height = (lens.radius().powi(2) - (lens.radius() - 0.5).powi(2)).sqrt();
        assert_relative_eq!(top, half_height, epsilon = 1e-9);
        let right = outline.iter().map(|p| p.x).fold(f64::MIN, f64::max);
        assert_relative_eq!(right, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_intersection_sorted_from_start() {
        let lens = Lens::new(5.0, 1.0, GLASS_INDEX).unwrap();
        let hits = lens.intersection(&Point2::new(-5.0, 1.0), &Point2::new(5.0, 1.0));
        let x = lens.radius() - 0.5 - (lens.radius().powi(2) - 1.0).sqrt();
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0].x, x, epsilon = 1e-9);
        assert_relative_eq!(hits[1].x, -x, epsilon = 1e-9);

        let hits = lens.intersection(&Point2::new(5.0, 1.0), &Point2::new(-5.0, 1.0));
        assert_relative_eq!(hits[0].x, -x, epsilon = 1e-9);

        assert!(lens
            .intersection(&Point2::new(-5.0, 5.0), &Point2::new(5.0, 5.0))
            .is_empty());
    }

    #[test]
    fn test_converging_lens_bends_toward_axis() {
        let lens = Lens::new(5.0, 1.0, GLASS_INDEX).unwrap();

        let mut ray = horizontal(1.0);
        ray.propagate(std::slice::from_ref(&lens));
        assert_eq!(ray.points().len(), 4);
        assert!(!ray.is_trapped());
        assert!(ray.points()[1].x < 0.0 && ray.points()[2].x > 0.0);
        assert!(ray.direction().y < 0.0);
        assert_relative_eq!((ray.end() - ray.points()[2]).norm(), 8.0, epsilon = 1e-9);

        // The outgoing segment crosses the axis behind the lens.
        let (a, b) = (ray.points()[2], ray.end());
        let crossing = a.x - a.y * (b.x - a.x) / (b.y - a.y);
        assert!(crossing > 0.5 && crossing < 8.0, "{crossing}");

        let mut on_axis = horizontal(0.0);
        on_axis.propagate(&[lens]);
        assert_eq!(on_axis.points().len(), 4);
        assert_relative_eq!(on_axis.direction().y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(on_axis.end().x, 8.5, epsilon = 1e-9);
    }

    #[test]
    fn test_diverging_lens_bends_away_from_axis() {
        let lens = Lens::new(-5.0, 1.0, GLASS_INDEX).unwrap();
        let mut ray = horizontal(1.0);
        ray.propagate(&[lens]);

        assert_eq!(ray.points().len(), 4);
        let inside = ray.points()[2] - ray.points()[1];
        assert!(inside.y > 0.0);
        assert!(ray.direction().y > inside.normalize().y);
    }

    #[test]
    fn test_total_internal_reflection_has_no_exit_segment() {
        let lens = Lens::new(1.0, 1.0, GLASS_INDEX).unwrap();
        let mut ray = Ray::new(Point2::new(-3.0, 0.8), Vec2::new(1.0, 0.0), 8.0).unwrap();
        ray.propagate(&[lens]);

        assert!(ray.is_trapped());
        assert_eq!(ray.points().len(), 3);
        let end = ray.end();
        assert!(end.x > 0.0 && end.y < 0.8);

        let traced = ray.traced();
        assert!(traced.trapped);
        assert_eq!(traced.points.len(), 3);
    }

    #[test]
    fn test_missed_lens_leaves_ray_alone() {
        let lens = Lens::new(5.0, 1.0, GLASS_INDEX).unwrap();
        let mut ray = horizontal(5.0);
        let before = ray.clone();
        ray.propagate(&[lens]);
        assert_eq!(ray, before);
    }

    #[test]
    fn test_lenses_visited_in_path_order() {
        let mut converging = Lens::new(5.0, 1.0, GLASS_INDEX).unwrap();
        converging.shift(&Vec2::new(1.5, 0.0));
        let mut diverging = Lens::new(-5.0, 1.0, GLASS_INDEX).unwrap();
        diverging.shift(&Vec2::new(-1.5, 0.0));

        let mut rays = vec![horizontal(1.0), horizontal(6.0)];
        trace(&[converging, diverging], &mut rays);

        let points = rays[0].points();
        assert_eq!(points.len(), 6);
        assert!(points[1].x < -1.5);
        assert!(points[3].x > 0.5);
        assert!(rays[0].direction().y < 0.0);
        assert_eq!(rays[1].points().len(), 2);
    }

    #[test]
    fn test_from_defs() {
        let lens = Lens::from_def(&LensDef {
            focal_length: 5.0,
            thickness: 1.0,
            index: None,
            center: mphys_ir::Vec2::new(1.0, 0.0),
        })
        .unwrap();
        assert_eq!(lens.index(), GLASS_INDEX);
        assert_eq!(lens.center(), Point2::new(1.0, 0.0));

        let ray = Ray::from_def(&RayDef {
            start: mphys_ir::Vec2::new(0.0, 0.0),
            direction: mphys_ir::Vec2::new(0.0, 2.0),
            length: None,
        })
        .unwrap();
        assert_relative_eq!(ray.end().y, DEFAULT_RAY_LENGTH);

        assert!(Ray::from_def(&RayDef {
            start: mphys_ir::Vec2::new(0.0, 0.0),
            direction: mphys_ir::Vec2::new(0.0, 0.0),
            length: None,
        })
        .is_err());
    }
}
