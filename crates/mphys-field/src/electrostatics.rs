//! Point charges and their electric field.

use mphys_ir::ChargeDef;
use mphys_scene::{Point2, Vec2};

use crate::error::{FieldError, Result};
use crate::field::VectorField;

/// Squared per-axis distance below which a charge is treated as coincident
/// with the field point.
pub const FIELD_CUTOFF: f64 = 0.05;

/// Squared per-axis distance below which another charge exerts no force.
pub const FORCE_CUTOFF: f64 = 0.01;

/// A point charge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Charge {
    /// Signed magnitude.
    pub magnitude: f64,
    /// Position.
    pub point: Point2,
}

impl Charge {
    /// Charge of `magnitude` at `point`.
    pub fn new(magnitude: f64, point: Point2) -> Self {
        Self { magnitude, point }
    }

    /// Drawn radius: grows with the magnitude up to 0.24.
    pub fn radius(&self) -> f64 {
        let m = self.magnitude.abs();
        (if m < 2.0 { m * 0.4 } else { 0.8 }) * 0.3
    }
}

impl From<&ChargeDef> for Charge {
    fn from(def: &ChargeDef) -> Self {
        Self::new(def.magnitude, Point2::new(def.point.x, def.point.y))
    }
}

/// Force arrow on a charge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Force {
    /// Arrow origin on the rim of the charge.
    pub origin: Point2,
    /// Force vector.
    pub vector: Vec2,
}

/// Electric field of a set of point charges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElectricField {
    charges: Vec<Charge>,
}

impl ElectricField {
    /// Field of `charges`.
    pub fn new(charges: Vec<Charge>) -> Self {
        Self { charges }
    }

    /// Field of the charges in a document.
    pub fn from_defs(defs: &[ChargeDef]) -> Self {
        Self::new(defs.iter().map(Charge::from).collect())
    }

    /// The charges.
    pub fn charges(&self) -> &[Charge] {
        &self.charges
    }

    /// Force on charge `index` from every other charge.
    ///
    /// Charges closer than [`FORCE_CUTOFF`] on both axes are ignored. The
    /// arrow starts on the charge's rim, pointing along the force.
    pub fn force_on(&self, index: usize) -> Result<Force> {
        let charge = self
            .charges
            .get(index)
            .ok_or(FieldError::UnknownCharge(index))?;

        let mut vector = Vec2::zeros();
        for (i, other) in self.charges.iter().enumerate() {
            if i == index {
                continue;
            }
            let r = charge.point - other.point;
            if r.x * r.x > FORCE_CUTOFF || r.y * r.y > FORCE_CUTOFF {
                vector += r * other.magnitude / r.norm().powi(3);
            }
        }

        let length = vector.norm();
        let origin = if length > 0.0 {
            charge.point + vector / length * charge.radius()
        } else {
            charge.point
        };
        Ok(Force { origin, vector })
    }
}

impl VectorField for ElectricField {
    /// Coulomb field summed over all charges; zero close to any charge.
    fn value_at(&self, p: &Point2) -> Vec2 {
        let mut value = Vec2::zeros();
        for charge in &self.charges {
            let r = p - charge.point;
            let (x2, y2) = (r.x * r.x, r.y * r.y);
            if x2 <= FIELD_CUTOFF && y2 <= FIELD_CUTOFF {
                return Vec2::zeros();
            }
            value += r * charge.magnitude / (x2 + y2).powf(1.5);
        }
        value
    }
}
