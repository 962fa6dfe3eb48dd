#![warn(missing_docs)]

//! Rigid-body physics for mphys scenes using Rapier 2D.
//!
//! Mobjects are bound to bodies in a [`SimulationSpace`]. Once per frame the
//! [`StepScheduler`] steps the space and copies every awake dynamic body's
//! pose back onto its mobject. Static mobjects get colliders on a shared fixed
//! body and never move.
//!
//! # Features
//!
//! - Circle, line, rectangle and polygon colliders derived from scene geometry
//! - Multiplicative friction and restitution between colliders
//! - Sleeping bodies that stop moving and stop syncing
//! - Pin-jointed pendulums with rods redrawn every frame
//! - Whole scenes loaded from an [`mphys_ir::SceneDocument`]
//!
//! # Example
//!
//! ```
//! use mphys_rigid::{DynamicMaterial, SpaceScene, StaticMaterial};
//! use mphys_scene::{Mobject, Point2, Vec2};
//!
//! let mut scene = SpaceScene::new(Vec2::new(0.0, -9.81));
//! let ball = scene.add(Mobject::circle(Point2::new(0.0, 3.0), 0.5));
//! let ground = scene.add(Mobject::line(Point2::new(-4.0, -3.5), Point2::new(4.0, -3.5)));
//!
//! scene.make_static_body(&[ground], &StaticMaterial::default()).unwrap();
//! scene.make_rigid_body(&[ball], &DynamicMaterial::default()).unwrap();
//! scene.wait(1.0).unwrap();
//!
//! assert!(scene.scene().center(ball).unwrap().y < 3.0);
//! ```

mod binding;
mod colliders;
mod error;
mod pendulum;
mod scheduler;
mod space;
mod space_scene;

pub use binding::{Binding, BindingId, Bindings, BodyKind};
pub use colliders::{
    build_shape, derive_geometry, ColliderGeometry, DynamicMaterial, GeometryKind,
    StaticMaterial, SEGMENT_THICKNESS_OFFSET,
};
pub use error::{PhysicsError, Result};
pub use pendulum::{
    MultiPendulum, PendulumId, PendulumStyle, SinglePendulumParams, DEFAULT_BOB_RADIUS,
    DEFAULT_PIVOT, DEFAULT_SINGLE_BOB_RADIUS,
};
pub use scheduler::{sync_binding, PinRef, StepScheduler, Updater, UpdaterId};
pub use space::{
    BodyPose, FallbackPolicy, PinAnchor, PinJoint, SimulationSpace, SpaceConfig, DEFAULT_FPS,
    DEFAULT_GRAVITY, DEFAULT_SLEEP_TIME_THRESHOLD,
};
pub use space_scene::{BodySnapshot, Frame, SpaceScene};
