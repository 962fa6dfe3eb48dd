//! Travelling and standing waves.
//!
//! Waves are pure height functions of position and time. A [`WaveClock`]
//! supplies the time: it only advances while started, so stopping the clock
//! freezes the surface.

use std::f64::consts::{PI, TAU};

use mphys_scene::Point2;
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result};
use crate::field::axis;

/// Time source for waves.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaveClock {
    time: f64,
    running: bool,
}

impl WaveClock {
    /// A stopped clock at time 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the clock advance.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Freeze the clock.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether the clock advances.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Advance by `dt` if running.
    pub fn advance(&mut self, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(FieldError::InvalidTimeStep(dt));
        }
        if self.running {
            self.time += dt;
        }
        Ok(())
    }
}

/// A height function over the plane.
pub trait Wave {
    /// Height at `p` and `time`.
    fn height(&self, p: &Point2, time: f64) -> f64;
}

/// Shape of a travelling wave.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveParams {
    /// Distance between crests.
    pub wavelength: f64,
    /// Time for one full oscillation.
    pub period: f64,
    /// Peak height.
    pub amplitude: f64,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            wavelength: 1.0,
            period: 1.0,
            amplitude: 0.1,
        }
    }
}

impl WaveParams {
    /// Validate parameters.
    pub fn validate(&self) -> Result<()> {
        if !(self.wavelength.is_finite() && self.wavelength > 0.0) {
            return Err(FieldError::InvalidWave(format!(
                "wavelength must be > 0, got {}",
                self.wavelength
            )));
        }
        if !(self.period.is_finite() && self.period > 0.0) {
            return Err(FieldError::InvalidWave(format!(
                "period must be > 0, got {}",
                self.period
            )));
        }
        Ok(())
    }

    fn phase(&self, distance: f64, time: f64) -> f64 {
        TAU / self.wavelength * distance - TAU * time / self.period
    }
}

/// Circular waves spreading from one or more sources.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialWave {
    sources: Vec<Point2>,
    params: WaveParams,
}

impl RadialWave {
    /// Waves from `sources`.
    pub fn new(sources: Vec<Point2>, params: WaveParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { sources, params })
    }
}

impl Wave for RadialWave {
    fn height(&self, p: &Point2, time: f64) -> f64 {
        self.sources
            .iter()
            .map(|s| self.params.amplitude * self.params.phase((p - s).norm(), time).sin())
            .sum()
    }
}

/// Plane waves travelling along +x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearWave {
    params: WaveParams,
}

impl LinearWave {
    /// Plane wave with `params`.
    pub fn new(params: WaveParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }
}

impl Wave for LinearWave {
    fn height(&self, p: &Point2, time: f64) -> f64 {
        self.params.amplitude * self.params.phase(p.x, time).sin()
    }
}

/// A standing wave on a string centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandingWave {
    /// Harmonic number.
    pub n: u32,
    /// String length.
    pub length: f64,
    /// Time for one full oscillation.
    pub period: f64,
    /// Peak displacement.
    pub amplitude: f64,
}

impl Default for StandingWave {
    fn default() -> Self {
        Self {
            n: 2,
            length: 4.0,
            period: 1.0,
            amplitude: 1.0,
        }
    }
}

impl StandingWave {
    /// Validate parameters.
    pub fn validate(&self) -> Result<()> {
        if self.n == 0 {
            return Err(FieldError::InvalidWave("harmonic number must be >= 1".into()));
        }
        if !(self.length.is_finite() && self.length > 0.0) {
            return Err(FieldError::InvalidWave(format!(
                "length must be > 0, got {}",
                self.length
            )));
        }
        if !(self.period.is_finite() && self.period > 0.0) {
            return Err(FieldError::InvalidWave(format!(
                "period must be > 0, got {}",
                self.period
            )));
        }
        Ok(())
    }

    /// Displacement at `x`; zero beyond the string ends.
    pub fn displacement(&self, x: f64, time: f64) -> f64 {
        let t = x + self.length / 2.0;
        if !(0.0..=self.length).contains(&t) {
            return 0.0;
        }
        self.amplitude
            * (self.n as f64 * PI * t / self.length).sin()
            * (TAU * time / self.period).cos()
    }

    /// `samples + 1` points along the string.
    pub fn profile(&self, time: f64, samples: usize) -> Vec<Point2> {
        let samples = samples.max(1);
        (0..=samples)
            .map(|i| {
                let x = -self.length / 2.0 + self.length * i as f64 / samples as f64;
                Point2::new(x, self.displacement(x, time))
            })
            .collect()
    }
}

impl Wave for StandingWave {
    fn height(&self, p: &Point2, time: f64) -> f64 {
        self.displacement(p.x, time)
    }
}

/// Heights of `wave` on a grid as `[x, y, z]`, row by row from the bottom.
pub fn sample_heights<W: Wave + ?Sized>(
    wave: &W,
    time: f64,
    x_range: (f64, f64),
    y_range: (f64, f64),
    step: f64,
) -> Result<Vec<[f64; 3]>> {
    let xs = axis(x_range, step)?;
    let ys = axis(y_range, step)?;
    let mut out = Vec::with_capacity(xs.len() * ys.len());
    for y in &ys {
        for x in &xs {
            let p = Point2::new(*x, *y);
            out.push([*x, *y, wave.height(&p, time)]);
        }
    }
    Ok(out)
}
