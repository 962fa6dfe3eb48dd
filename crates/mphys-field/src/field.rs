//! Vector fields and grid sampling.

use mphys_scene::{Point2, Vec2};
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result};

/// A field that assigns a vector to every point of the plane.
pub trait VectorField {
    /// Field value at `p`.
    fn value_at(&self, p: &Point2) -> Vec2;
}

/// One sampled field vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSample {
    /// Sample position.
    pub point: [f64; 2],
    /// Field value.
    pub value: [f64; 2],
}

/// Evenly spaced coordinates from `range.0` to `range.1` inclusive.
pub(crate) fn axis(range: (f64, f64), step: f64) -> Result<Vec<f64>> {
    let (lo, hi) = range;
    if !step.is_finite() || step <= 0.0 {
        return Err(FieldError::InvalidGrid(format!("step must be > 0, got {step}")));
    }
    if !lo.is_finite() || !hi.is_finite() || lo > hi {
        return Err(FieldError::InvalidGrid(format!(
            "range must be finite and ordered, got [{lo}, {hi}]"
        )));
    }
    let count = ((hi - lo) / step + 1e-9).floor() as usize + 1;
    Ok((0..count).map(|i| lo + i as f64 * step).collect())
}

/// Sample `field` on a grid, row by row from the bottom.
pub fn sample_grid<F: VectorField + ?Sized>(
    field: &F,
    x_range: (f64, f64),
    y_range: (f64, f64),
    step: f64,
) -> Result<Vec<FieldSample>> {
    let xs = axis(x_range, step)?;
    let ys = axis(y_range, step)?;
    let mut samples = Vec::with_capacity(xs.len() * ys.len());
    for y in &ys {
        for x in &xs {
            let p = Point2::new(*x, *y);
            let v = field.value_at(&p);
            samples.push(FieldSample {
                point: [p.x, p.y],
                value: [v.x, v.y],
            });
        }
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Uniform;

    impl VectorField for Uniform {
        fn value_at(&self, p: &Point2) -> Vec2 {
            Vec2::new(p.x, 1.0)
        }
    }

    #[test]
    fn test_grid_covers_both_ends() {
        let samples = sample_grid(&Uniform, (-1.0, 1.0), (0.0, 1.0), 0.5).unwrap();
        assert_eq!(samples.len(), 5 * 3);
        assert_eq!(samples[0].point, [-1.0, 0.0]);
        assert_eq!(samples[4].point, [1.0, 0.0]);
        assert_eq!(samples[14].point, [1.0, 1.0]);
        assert_eq!(samples[14].value, [1.0, 1.0]);
    }

    #[test]
    fn test_axis_tolerates_rounding() {
        let xs = axis((0.0, 0.3), 0.1).unwrap();
        assert_eq!(xs.len(), 4);
    }

    #[test]
    fn test_invalid_grids() {
        assert!(sample_grid(&Uniform, (0.0, 1.0), (0.0, 1.0), 0.0).is_err());
        assert!(sample_grid(&Uniform, (1.0, 0.0), (0.0, 1.0), 0.1).is_err());
        assert!(matches!(
            sample_grid(&Uniform, (0.0, f64::NAN), (0.0, 1.0), 0.1),
            Err(FieldError::InvalidGrid(_))
        ));
    }
}
