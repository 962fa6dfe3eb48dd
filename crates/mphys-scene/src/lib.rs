#![warn(missing_docs)]

//! 2D scene graph for the mphys physics plugins.
//!
//! Mobjects are plain geometry (circles, lines, rectangles, polygons, paths
//! and groups) held in an arena keyed by [`MobjectId`]. The scene exposes the
//! handful of operations the physics layer needs: centre, absolute move,
//! relative rotation, vertices and line endpoints.
//!
//! # Example
//!
//! ```
//! use mphys_scene::{Mobject, Point2, Scene};
//!
//! let mut scene = Scene::new();
//! let square = scene.add(Mobject::square(Point2::new(0.0, 1.0), 1.0));
//! scene.rotate(square, 0.5).unwrap();
//! scene.rotate(square, 0.25).unwrap();
//! assert!((scene.orientation(square).unwrap() - 0.75).abs() < 1e-9);
//! ```

pub mod error;
pub mod math;
pub mod mobject;
pub mod scene;

pub use error::{Result, SceneError};
pub use math::{normalize_angle, BoundingBox2, Point2, Vec2};
pub use mobject::{Mobject, MobjectKind, DEFAULT_STROKE_WIDTH};
pub use scene::{MobjectId, Scene};
