#![warn(missing_docs)]

//! Electromagnetic fields, waves and optics for mphys scenes.
//!
//! Fields implement [`VectorField`] and can be sampled on a grid with
//! [`sample_grid`]. Waves are height functions driven by a [`WaveClock`].
//! Rays are bent through [`Lens`]es with [`Ray::propagate`].
//!
//! # Example
//!
//! ```
//! use mphys_field::{sample_grid, Charge, ElectricField};
//! use mphys_scene::Point2;
//!
//! let field = ElectricField::new(vec![
//!     Charge::new(-1.0, Point2::new(-1.0, -1.0)),
//!     Charge::new(2.0, Point2::new(1.0, -1.0)),
//! ]);
//! let samples = sample_grid(&field, (-2.0, 2.0), (-2.0, 2.0), 0.5).unwrap();
//! assert_eq!(samples.len(), 81);
//! ```

pub mod electrostatics;
pub mod error;
pub mod field;
pub mod magnetostatics;
pub mod optics;
pub mod wave;

pub use electrostatics::{Charge, ElectricField, Force};
pub use error::{FieldError, Result};
pub use field::{sample_grid, FieldSample, VectorField};
pub use magnetostatics::{
    BarMagnet, Current, CurrentDirection, MagneticField, MagneticSource, Wire,
};
pub use optics::{antisnell, snell, trace, Lens, Ray, TracedRay};
pub use wave::{
    sample_heights, LinearWave, RadialWave, StandingWave, Wave, WaveClock, WaveParams,
};
