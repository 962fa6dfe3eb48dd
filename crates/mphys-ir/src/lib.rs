#![warn(missing_docs)]

//! Scene documents for the mphys physics plugins.
//!
//! A document names the mobjects of a 2D scene and says which physics each of
//! them takes part in: falling rigid bodies, static walls, pendulums, charges
//! and magnetic sources. Lenses and light rays sit alongside them.
//!
//! The document is purely declarative: it holds no engine handles and no
//! simulation state. Turning it into a running simulation is the job of `mphys-rigid`.

use serde::{Deserialize, Serialize};

/// Name used to reference a mobject from other parts of the document.
pub type MobjectName = String;

/// 2D vector with f64 components (scene units).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
}

impl Vec2 {
    /// Vector of `x` and `y` scene units.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 3D vector with f64 components, used for out-of-plane quantities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Vector of `x`, `y` and `z` scene units; `z` points out of the plane.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

fn default_stroke_width() -> f64 {
    4.0
}

fn default_true() -> bool {
    true
}

/// Geometry of a mobject.
///
/// Rotations are in radians, counter-clockwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShapeDef {
    /// Circle around a centre.
    Circle {
        /// Centre of the circle.
        center: Vec2,
        /// Radius.
        radius: f64,
    },
    /// Straight line between two points.
    Line {
        /// Start point.
        start: Vec2,
        /// End point.
        end: Vec2,
        /// Stroke width; also sets the collision thickness.
        #[serde(default = "default_stroke_width")]
        stroke_width: f64,
    },
    /// Axis-aligned rectangle, optionally rotated about its centre.
    Rectangle {
        /// Centre of the rectangle.
        center: Vec2,
        /// Width along X before rotation.
        width: f64,
        /// Height along Y before rotation.
        height: f64,
        /// Rotation about the centre.
        #[serde(default)]
        rotation: f64,
    },
    /// Square, optionally rotated about its centre.
    Square {
        /// Centre of the square.
        center: Vec2,
        /// Side length.
        side: f64,
        /// Rotation about the centre.
        #[serde(default)]
        rotation: f64,
    },
    /// Regular polygon inscribed in a circle.
    RegularPolygon {
        /// Centre of the circumscribed circle.
        center: Vec2,
        /// Number of sides (at least 3).
        sides: u32,
        /// Circumradius.
        radius: f64,
        /// Rotation about the centre.
        #[serde(default)]
        rotation: f64,
    },
    /// Arbitrary closed polygon.
    Polygon {
        /// Vertices in scene coordinates.
        vertices: Vec<Vec2>,
    },
    /// Open free-form path.
    Path {
        /// Points in scene coordinates.
        points: Vec<Vec2>,
    },
    /// Group of other mobjects.
    Group {
        /// Names of the grouped mobjects; they must be declared earlier.
        children: Vec<MobjectName>,
    },
}

/// A named mobject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobjectDef {
    /// Unique name.
    pub id: MobjectName,
    /// Geometry.
    #[serde(flatten)]
    pub shape: ShapeDef,
}

/// Mobjects that fall and collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyDef {
    /// Mobjects to make rigid.
    pub mobjects: Vec<MobjectName>,
    /// Restitution (defaults to 0.8).
    pub elasticity: Option<f64>,
    /// Density (defaults to 1).
    pub density: Option<f64>,
    /// Friction (defaults to 0.8).
    pub friction: Option<f64>,
}

/// Mobjects that stay in place but collide with rigid bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticBodyDef {
    /// Mobjects (or groups) to make static.
    pub mobjects: Vec<MobjectName>,
    /// Restitution (defaults to 1).
    pub elasticity: Option<f64>,
    /// Friction (defaults to 0.8).
    pub friction: Option<f64>,
}

/// A pendulum built and bound by the scene loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PendulumDef {
    /// A single bob hanging from a pivot.
    Single {
        /// Name prefix for the generated mobjects.
        id: MobjectName,
        /// Rod length (defaults to 3.5).
        length: Option<f64>,
        /// Initial deviation from the vertical, in radians (defaults to 0.3).
        initial_theta: Option<f64>,
        /// Pivot (defaults to (0, 2)).
        pivot: Option<Vec2>,
        /// Bob radius (defaults to 0.25).
        bob_radius: Option<f64>,
        /// Start swinging right away.
        #[serde(default = "default_true")]
        swing: bool,
    },
    /// A chain of bobs hanging from a pivot.
    Multi {
        /// Name prefix for the generated mobjects.
        id: MobjectName,
        /// Initial bob positions, from the pivot outwards.
        bobs: Vec<Vec2>,
        /// Pivot (defaults to (0, 2)).
        pivot: Option<Vec2>,
        /// Bob radius (defaults to 0.1).
        bob_radius: Option<f64>,
        /// Start swinging right away.
        #[serde(default = "default_true")]
        swing: bool,
    },
}

/// A point charge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargeDef {
    /// Signed magnitude.
    pub magnitude: f64,
    /// Position.
    pub point: Vec2,
}

/// A source of magnetic field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MagneticSourceDef {
    /// Straight current perpendicular to the scene plane.
    Current {
        /// Where the current pierces the plane.
        point: Vec2,
        /// Strength of the current.
        magnitude: f64,
        /// Direction; only `(0, 0, 1)` (out) and `(0, 0, -1)` (in) are valid.
        direction: Vec3,
    },
    /// Bar magnet.
    BarMagnet {
        /// Centre of the magnet.
        center: Vec2,
        /// South-to-north direction.
        north: Vec2,
        /// Length along the north direction (defaults to 2).
        height: Option<f64>,
        /// Width (defaults to 1).
        width: Option<f64>,
    },
    /// Current-carrying wire following a polyline.
    Wire {
        /// Polyline vertices.
        points: Vec<Vec3>,
        /// Current through the wire.
        current: f64,
        /// Number of segments used for the field integral (defaults to 16).
        samples: Option<u32>,
    },
}

/// A lens on a horizontal optical axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LensDef {
    /// Positive for converging, negative for diverging.
    pub focal_length: f64,
    /// Width at the waist.
    pub thickness: f64,
    /// Refractive index (defaults to glass, 1.52).
    #[serde(default)]
    pub index: Option<f64>,
    /// Centre of the lens.
    #[serde(default)]
    pub center: Vec2,
}

/// A light ray sent through the document's lenses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayDef {
    /// Start point.
    pub start: Vec2,
    /// Direction; need not be normalized.
    pub direction: Vec2,
    /// Initial length, and length of each segment leaving a lens (defaults to 5).
    #[serde(default)]
    pub length: Option<f64>,
}

/// Simulation space settings. Missing values take the engine defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpaceDef {
    /// Gravity vector.
    pub gravity: Option<Vec2>,
    /// Seconds of rest before a body falls asleep.
    pub sleep_time_threshold: Option<f64>,
    /// Frame rate used by `wait`.
    pub fps: Option<f64>,
    /// Approximate unsupported geometry with its bounding box.
    #[serde(default)]
    pub bounding_box_fallback: bool,
}

/// An mphys scene document, stored as `.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Format version string (e.g. "0.1").
    pub version: String,
    /// Space settings.
    #[serde(default)]
    pub space: SpaceDef,
    /// Mobjects in declaration order.
    #[serde(default)]
    pub mobjects: Vec<MobjectDef>,
    /// Rigid body declarations.
    #[serde(default)]
    pub rigid_bodies: Vec<RigidBodyDef>,
    /// Static body declarations.
    #[serde(default)]
    pub static_bodies: Vec<StaticBodyDef>,
    /// Pendulums.
    #[serde(default)]
    pub pendulums: Vec<PendulumDef>,
    /// Point charges for the electric field.
    #[serde(default)]
    pub charges: Vec<ChargeDef>,
    /// Sources for the magnetic field.
    #[serde(default)]
    pub magnetic_sources: Vec<MagneticSourceDef>,
    /// Lenses.
    #[serde(default)]
    pub lenses: Vec<LensDef>,
    /// Rays traced through the lenses.
    #[serde(default)]
    pub rays: Vec<RayDef>,
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            space: SpaceDef::default(),
            mobjects: Vec::new(),
            rigid_bodies: Vec::new(),
            static_bodies: Vec::new(),
            pendulums: Vec::new(),
            charges: Vec::new(),
            magnetic_sources: Vec::new(),
            lenses: Vec::new(),
            rays: Vec::new(),
        }
    }
}

impl SceneDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a mobject by name.
    pub fn mobject(&self, name: &str) -> Option<&MobjectDef> {
        self.mobjects.iter().find(|m| m.id == name)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
