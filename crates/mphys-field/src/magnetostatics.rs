//! Currents, bar magnets, wires and their magnetic field.
//!
//! Every source is reduced to straight current elements and summed with the
//! Biot–Savart law, `dB = I dl × r / |r|³`. Currents piercing the plane are
//! infinitesimal elements along ±z.

use mphys_ir::MagneticSourceDef;
use mphys_scene::math::rotate_vec;
use mphys_scene::{Point2, Vec2};
use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::error::{FieldError, Result};
use crate::field::VectorField;

/// Distance from a source element within which the field is zero.
pub const SOURCE_CUTOFF: f64 = 0.1;

/// Spacing of the current samples along a bar magnet.
pub const BAR_SAMPLE_SPACING: f64 = 0.1;

/// Default bar magnet height.
pub const DEFAULT_BAR_HEIGHT: f64 = 2.0;

/// Default bar magnet width.
pub const DEFAULT_BAR_WIDTH: f64 = 1.0;

/// Default number of wire segments.
pub const DEFAULT_WIRE_SAMPLES: u32 = 16;

/// Direction of a current perpendicular to the plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentDirection {
    /// Into the plane, along -z.
    In,
    /// Out of the plane, along +z.
    Out,
}

impl CurrentDirection {
    /// Parse a direction vector. Only `(0, 0, -1)` and `(0, 0, 1)` are valid.
    pub fn from_vector(v: [f64; 3]) -> Result<Self> {
        match v {
            [x, y, z] if x == 0.0 && y == 0.0 && z == 1.0 => Ok(Self::Out),
            [x, y, z] if x == 0.0 && y == 0.0 && z == -1.0 => Ok(Self::In),
            _ => Err(FieldError::InvalidCurrentDirection(v)),
        }
    }

    /// +1 for out of the plane, -1 for into it.
    pub fn sign(self) -> f64 {
        match self {
            Self::Out => 1.0,
            Self::In => -1.0,
        }
    }
}

/// A straight current through the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Current {
    /// Where the current pierces the plane.
    pub point: Point2,
    /// Strength.
    pub magnitude: f64,
    /// Flow direction.
    pub direction: CurrentDirection,
}

impl Current {
    /// Current of `magnitude` at `point`.
    pub fn new(point: Point2, magnitude: f64, direction: CurrentDirection) -> Self {
        Self {
            point,
            magnitude,
            direction,
        }
    }
}

/// A bar magnet, modelled as two sheets of opposing currents along its sides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarMagnet {
    center: Point2,
    north: Vec2,
    height: f64,
    width: f64,
}

impl BarMagnet {
    /// Magnet centred on `center` with its north pole along `north`.
    pub fn new(center: Point2, north: Vec2, height: f64, width: f64) -> Result<Self> {
        let length = north.norm();
        if !length.is_finite() || length == 0.0 {
            return Err(FieldError::InvalidSource(
                "bar magnet needs a non-zero north direction".into(),
            ));
        }
        if !(height > 0.0 && width > 0.0) {
            return Err(FieldError::InvalidSource(format!(
                "bar magnet size must be positive, got {height} x {width}"
            )));
        }
        Ok(Self {
            center,
            north: north / length,
            height,
            width,
        })
    }

    /// Default-sized magnet with north pointing up.
    pub fn upright(center: Point2) -> Self {
        Self {
            center,
            north: Vec2::new(0.0, 1.0),
            height: DEFAULT_BAR_HEIGHT,
            width: DEFAULT_BAR_WIDTH,
        }
    }

    /// Centre of the magnet.
    pub fn center(&self) -> Point2 {
        self.center
    }

    /// Unit south-to-north direction.
    pub fn north(&self) -> Vec2 {
        self.north
    }

    /// Equivalent currents: one pair per sample along the magnet.
    ///
    /// Currents on the side to the left of north flow out of the plane, those
    /// on the right flow in, so the field inside points north.
    pub fn currents(&self) -> Vec<Current> {
        let angle = self.north.y.atan2(self.north.x) + std::f64::consts::FRAC_PI_2;
        let count = (self.height / BAR_SAMPLE_SPACING + 1e-9).floor() as usize + 1;
        let mut currents = Vec::with_capacity(count * 2);
        for k in 0..count {
            let along = -self.height / 2.0 + k as f64 * BAR_SAMPLE_SPACING;
            for (side, direction) in [(1.0, CurrentDirection::Out), (-1.0, CurrentDirection::In)] {
                let local = Vec2::new(side * self.width / 2.0, along);
                currents.push(Current::new(
                    self.center + rotate_vec(&local, angle),
                    1.0,
                    direction,
                ));
            }
        }
        currents
    }
}

/// A current-carrying wire along a polyline in space.
#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    points: Vec<Point3<f64>>,
    current: f64,
    samples: u32,
}

impl Wire {
    /// Wire through `points` carrying `current`, split into `samples`
    /// segments of equal arc length for the field integral.
    pub fn new(points: Vec<Point3<f64>>, current: f64, samples: u32) -> Result<Self> {
        if points.len() < 2 {
            return Err(FieldError::InvalidSource(
                "a wire needs at least two points".into(),
            ));
        }
        if samples == 0 {
            return Err(FieldError::InvalidSource(
                "a wire needs at least one sample".into(),
            ));
        }
        let wire = Self {
            points,
            current,
            samples,
        };
        if wire.length() == 0.0 {
            return Err(FieldError::InvalidSource("wire has zero length".into()));
        }
        Ok(wire)
    }

    /// Current through the wire.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Total length of the polyline.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
    }

    /// Point at arc-length fraction `t` in `[0, 1]`.
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        let mut remaining = t.clamp(0.0, 1.0) * self.length();
        for w in self.points.windows(2) {
            let segment = (w[1] - w[0]).norm();
            if remaining <= segment && segment > 0.0 {
                return w[0] + (w[1] - w[0]) * (remaining / segment);
            }
            remaining -= segment;
        }
        self.points[self.points.len() - 1]
    }

    /// Consecutive sample points `(start, end)` along the wire.
    pub fn segments(&self) -> Vec<(Point3<f64>, Point3<f64>)> {
        let n = self.samples as usize;
        let points: Vec<Point3<f64>> = (0..=n).map(|i| self.point_at(i as f64 / n as f64)).collect();
        points.windows(2).map(|w| (w[0], w[1])).collect()
    }
}

/// Any source of magnetic field.
#[derive(Debug, Clone, PartialEq)]
pub enum MagneticSource {
    /// Current through the plane.
    Current(Current),
    /// Bar magnet.
    BarMagnet(BarMagnet),
    /// Wire.
    Wire(Wire),
}

impl TryFrom<&MagneticSourceDef> for MagneticSource {
    type Error = FieldError;

    fn try_from(def: &MagneticSourceDef) -> Result<Self> {
        match def {
            MagneticSourceDef::Current {
                point,
                magnitude,
                direction,
            } => Ok(Self::Current(Current::new(
                Point2::new(point.x, point.y),
                *magnitude,
                CurrentDirection::from_vector([direction.x, direction.y, direction.z])?,
            ))),
            MagneticSourceDef::BarMagnet {
                center,
                north,
                height,
                width,
            } => Ok(Self::BarMagnet(BarMagnet::new(
                Point2::new(center.x, center.y),
                Vec2::new(north.x, north.y),
                height.unwrap_or(DEFAULT_BAR_HEIGHT),
                width.unwrap_or(DEFAULT_BAR_WIDTH),
            )?)),
            MagneticSourceDef::Wire {
                points,
                current,
                samples,
            } => Ok(Self::Wire(Wire::new(
                points.iter().map(|p| Point3::new(p.x, p.y, p.z)).collect(),
                *current,
                samples.unwrap_or(DEFAULT_WIRE_SAMPLES),
            )?)),
        }
    }
}

/// A straight current element.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Element {
    start: Point3<f64>,
    dl: Vector3<f64>,
    current: f64,
}

/// Magnetic field of a set of sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MagneticField {
    elements: Vec<Element>,
}

impl MagneticField {
    /// Field of `sources`.
    pub fn new(sources: &[MagneticSource]) -> Self {
        let mut field = Self::default();
        for source in sources {
            match source {
                MagneticSource::Current(current) => field.push_current(current),
                MagneticSource::BarMagnet(magnet) => {
                    for current in magnet.currents() {
                        field.push_current(&current);
                    }
                }
                MagneticSource::Wire(wire) => {
                    for (start, end) in wire.segments() {
                        field.elements.push(Element {
                            start,
                            dl: end - start,
                            current: wire.current(),
                        });
                    }
                }
            }
        }
        debug!(elements = field.elements.len(), "built magnetic field");
        field
    }

    /// Field of the sources in a document.
    pub fn from_defs(defs: &[MagneticSourceDef]) -> Result<Self> {
        let sources = defs
            .iter()
            .map(MagneticSource::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(&sources))
    }

    fn push_current(&mut self, current: &Current) {
        self.elements.push(Element {
            start: Point3::new(current.point.x, current.point.y, 0.0),
            dl: Vector3::new(0.0, 0.0, current.direction.sign()),
            current: current.magnitude,
        });
    }

    /// Number of current elements.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Field at a point in space. Zero within [`SOURCE_CUTOFF`] of any element.
    pub fn value_at_3d(&self, p: &Point3<f64>) -> Vector3<f64> {
        let mut b = Vector3::zeros();
        for element in &self.elements {
            let r = p - element.start;
            let dist = r.norm();
            if dist < SOURCE_CUTOFF {
                return Vector3::zeros();
            }
            b += element.dl.cross(&r) * element.current / dist.powi(3);
        }
        b
    }
}

impl VectorField for MagneticField {
    fn value_at(&self, p: &Point2) -> Vec2 {
        let b = self.value_at_3d(&Point3::new(p.x, p.y, 0.0));
        Vec2::new(b.x, b.y)
    }
}
