//! A scene that owns a simulation space.
//!
//! [`SpaceScene`] ties the scene graph, the physics space, the bindings and
//! the frame scheduler together, and loads all of them from a
//! [`SceneDocument`].

use std::collections::HashMap;

use mphys_ir::{PendulumDef, SceneDocument, ShapeDef};
use mphys_scene::{Mobject, MobjectId, Point2, Scene, SceneError, Vec2};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::{debug, info};

use crate::binding::{BindingId, Bindings, BodyKind};
use crate::colliders::{DynamicMaterial, StaticMaterial};
use crate::error::{PhysicsError, Result};
use crate::pendulum::{
    MultiPendulum, PendulumId, PendulumStyle, SinglePendulumParams, DEFAULT_BOB_RADIUS,
    DEFAULT_PIVOT, DEFAULT_SINGLE_BOB_RADIUS,
};
use crate::scheduler::StepScheduler;
use crate::space::{FallbackPolicy, SimulationSpace, SpaceConfig};

/// Pose of one dynamic body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    /// Document name of the mobject, if it has one.
    pub name: Option<String>,
    /// Body position.
    pub position: [f64; 2],
    /// Body angle in radians.
    pub angle: f64,
    /// Whether the body is asleep.
    pub sleeping: bool,
}

/// State of every dynamic body after a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Frames run so far.
    pub frame: u64,
    /// Simulated seconds so far.
    pub time: f64,
    /// Dynamic bodies in binding order.
    pub bodies: Vec<BodySnapshot>,
}

/// Scene with physics.
#[derive(Debug)]
pub struct SpaceScene {
    scene: Scene,
    space: SimulationSpace,
    bindings: Bindings,
    scheduler: StepScheduler,
    pendulums: SlotMap<PendulumId, MultiPendulum>,
    by_name: HashMap<String, MobjectId>,
    names: HashMap<MobjectId, String>,
    pendulum_names: HashMap<String, PendulumId>,
    frame: u64,
}

impl SpaceScene {
    /// Create an empty scene with the given gravity.
    pub fn new(gravity: Vec2) -> Self {
        Self::from_space(SimulationSpace::create(gravity))
    }

    /// Create an empty scene from validated settings.
    pub fn with_config(config: SpaceConfig) -> Result<Self> {
        Ok(Self::from_space(SimulationSpace::with_config(config)?))
    }

    fn from_space(space: SimulationSpace) -> Self {
        let mut scheduler = StepScheduler::new();
        scheduler.attach_step();
        Self {
            scene: Scene::new(),
            space,
            bindings: Bindings::new(),
            scheduler,
            pendulums: SlotMap::with_key(),
            by_name: HashMap::new(),
            names: HashMap::new(),
            pendulum_names: HashMap::new(),
            frame: 0,
        }
    }

    /// Build a scene, its bodies and its pendulums from a document.
    pub fn from_document(doc: &SceneDocument) -> Result<Self> {
        let defaults = SpaceConfig::default();
        let config = SpaceConfig {
            gravity: doc
                .space
                .gravity
                .map(|g| [g.x, g.y])
                .unwrap_or(defaults.gravity),
            sleep_time_threshold: doc
                .space
                .sleep_time_threshold
                .unwrap_or(defaults.sleep_time_threshold),
            fps: doc.space.fps.unwrap_or(defaults.fps),
            fallback: if doc.space.bounding_box_fallback {
                FallbackPolicy::BoundingBox
            } else {
                FallbackPolicy::Reject
            },
        };
        let mut this = Self::with_config(config)?;

        for def in &doc.mobjects {
            let id = match &def.shape {
                ShapeDef::Group { children } => {
                    let members = this.resolve_all(children)?;
                    this.scene.add_group(members)?
                }
                shape => this.scene.add(build_mobject(shape)?),
            };
            this.register(&def.id, id)?;
        }

        for def in &doc.static_bodies {
            let defaults = StaticMaterial::default();
            let material = StaticMaterial {
                elasticity: def.elasticity.unwrap_or(defaults.elasticity),
                friction: def.friction.unwrap_or(defaults.friction),
            };
            let ids = this.resolve_all(&def.mobjects)?;
            this.make_static_body(&ids, &material)?;
        }

        for def in &doc.rigid_bodies {
            let defaults = DynamicMaterial::default();
            let material = DynamicMaterial {
                elasticity: def.elasticity.unwrap_or(defaults.elasticity),
                density: def.density.unwrap_or(defaults.density),
                friction: def.friction.unwrap_or(defaults.friction),
            };
            let ids = this.resolve_all(&def.mobjects)?;
            this.make_rigid_body(&ids, &material)?;
        }

        for def in &doc.pendulums {
            this.load_pendulum(def)?;
        }

        info!(
            mobjects = this.scene.len(),
            bindings = this.bindings.len(),
            pendulums = this.pendulums.len(),
            "loaded scene document"
        );
        Ok(this)
    }

    fn load_pendulum(&mut self, def: &PendulumDef) -> Result<PendulumId> {
        let (name, id, swing) = match def {
            PendulumDef::Single {
                id,
                length,
                initial_theta,
                pivot,
                bob_radius,
                swing,
            } => {
                let defaults = SinglePendulumParams::default();
                let params = SinglePendulumParams {
                    length: length.unwrap_or(defaults.length),
                    initial_theta: initial_theta.unwrap_or(defaults.initial_theta),
                    pivot: pivot.map(|p| [p.x, p.y]).unwrap_or(defaults.pivot),
                };
                let style = PendulumStyle {
                    bob_radius: bob_radius.unwrap_or(DEFAULT_SINGLE_BOB_RADIUS),
                    ..PendulumStyle::single()
                };
                (id, self.add_single_pendulum(&params, style)?, *swing)
            }
            PendulumDef::Multi {
                id,
                bobs,
                pivot,
                bob_radius,
                swing,
            } => {
                let positions: Vec<Point2> = bobs.iter().map(|b| Point2::new(b.x, b.y)).collect();
                let pivot = pivot
                    .map(|p| Point2::new(p.x, p.y))
                    .unwrap_or(Point2::new(DEFAULT_PIVOT[0], DEFAULT_PIVOT[1]));
                let style = PendulumStyle {
                    bob_radius: bob_radius.unwrap_or(DEFAULT_BOB_RADIUS),
                    ..PendulumStyle::default()
                };
                (id, self.add_pendulum(&positions, pivot, style)?, *swing)
            }
        };

        if self.pendulum_names.insert(name.clone(), id).is_some() {
            return Err(PhysicsError::DuplicateMobject(name.clone()));
        }
        let pendulum = &self.pendulums[id];
        let group = pendulum.group();
        let bobs = pendulum.bobs().to_vec();
        let rods = pendulum.rods().to_vec();
        self.register(name, group)?;
        for (i, bob) in bobs.iter().enumerate() {
            self.register(&format!("{name}.bob{i}"), *bob)?;
        }
        for (i, rod) in rods.iter().enumerate() {
            self.register(&format!("{name}.rod{i}"), *rod)?;
        }

        if swing {
            self.make_rigid_body(&bobs, &DynamicMaterial::default())?;
            self.start_swinging(id)?;
        }
        Ok(id)
    }

    fn register(&mut self, name: &str, id: MobjectId) -> Result<()> {
        if self.by_name.contains_key(name) {
            return Err(PhysicsError::DuplicateMobject(name.to_string()));
        }
        self.by_name.insert(name.to_string(), id);
        self.names.insert(id, name.to_string());
        Ok(())
    }

    fn resolve_all(&self, names: &[String]) -> Result<Vec<MobjectId>> {
        names
            .iter()
            .map(|name| {
                self.lookup(name)
                    .ok_or_else(|| PhysicsError::MissingMobject(name.clone()))
            })
            .collect()
    }

    /// The scene graph.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The scene graph, for adding or moving mobjects.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// The simulation space.
    pub fn space(&self) -> &SimulationSpace {
        &self.space
    }

    /// The simulation space, for direct body control.
    pub fn space_mut(&mut self) -> &mut SimulationSpace {
        &mut self.space
    }

    /// Mobject bindings.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Frame updaters.
    pub fn scheduler(&self) -> &StepScheduler {
        &self.scheduler
    }

    /// Frames run so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Add a mobject.
    pub fn add(&mut self, mobject: Mobject) -> MobjectId {
        self.scene.add(mobject)
    }

    /// Add a mobject under a unique name.
    pub fn add_named(&mut self, name: &str, mobject: Mobject) -> Result<MobjectId> {
        if self.by_name.contains_key(name) {
            return Err(PhysicsError::DuplicateMobject(name.to_string()));
        }
        let id = self.scene.add(mobject);
        self.register(name, id)?;
        Ok(id)
    }

    /// Id of a named mobject.
    pub fn lookup(&self, name: &str) -> Option<MobjectId> {
        self.by_name.get(name).copied()
    }

    /// Name of a mobject, if it has one.
    pub fn name_of(&self, id: MobjectId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Give each mobject a dynamic body and sync it every frame.
    pub fn make_rigid_body(
        &mut self,
        mobjects: &[MobjectId],
        material: &DynamicMaterial,
    ) -> Result<Vec<BindingId>> {
        let mut ids = Vec::with_capacity(mobjects.len());
        for mobject in mobjects {
            let binding =
                self.bindings
                    .bind_dynamic(&mut self.space, &self.scene, *mobject, material)?;
            self.scheduler.attach_sync(binding);
            ids.push(binding);
        }
        Ok(ids)
    }

    /// Give each mobject, or each member of a group, a static collider.
    pub fn make_static_body(
        &mut self,
        mobjects: &[MobjectId],
        material: &StaticMaterial,
    ) -> Result<Vec<BindingId>> {
        let mut ids = Vec::new();
        for mobject in mobjects {
            ids.extend(
                self.bindings
                    .bind_static(&mut self.space, &self.scene, *mobject, material)?,
            );
        }
        Ok(ids)
    }

    /// Put the bodies of each mobject to sleep.
    pub fn stop_rigidity(&mut self, mobjects: &[MobjectId]) -> Result<usize> {
        let mut slept = 0;
        for mobject in mobjects {
            slept += self
                .bindings
                .unbind_to_sleep(&mut self.space, &self.scene, *mobject)?;
        }
        Ok(slept)
    }

    /// Add a pendulum with bobs at `positions`.
    pub fn add_pendulum(
        &mut self,
        positions: &[Point2],
        pivot: Point2,
        style: PendulumStyle,
    ) -> Result<PendulumId> {
        let pendulum = MultiPendulum::new(&mut self.scene, positions, pivot, style)?;
        Ok(self.pendulums.insert(pendulum))
    }

    /// Add a single-bob pendulum.
    pub fn add_single_pendulum(
        &mut self,
        params: &SinglePendulumParams,
        style: PendulumStyle,
    ) -> Result<PendulumId> {
        let pendulum = MultiPendulum::single(&mut self.scene, params, style)?;
        Ok(self.pendulums.insert(pendulum))
    }

    /// Look up a pendulum.
    pub fn pendulum(&self, id: PendulumId) -> Option<&MultiPendulum> {
        self.pendulums.get(id)
    }

    /// Look up a pendulum by its document name.
    pub fn pendulum_named(&self, name: &str) -> Option<PendulumId> {
        self.pendulum_names.get(name).copied()
    }

    /// Start a pendulum swinging. Its bobs must be rigid bodies.
    pub fn start_swinging(&mut self, id: PendulumId) -> Result<()> {
        let pendulum = self
            .pendulums
            .get_mut(id)
            .ok_or(PhysicsError::MissingPendulum)?;
        pendulum.start_swinging(&mut self.space, &self.bindings, &mut self.scheduler)
    }

    /// Stop a pendulum swinging.
    pub fn end_swinging(&mut self, id: PendulumId) -> Result<()> {
        let pendulum = self
            .pendulums
            .get_mut(id)
            .ok_or(PhysicsError::MissingPendulum)?;
        pendulum.end_swinging(
            &mut self.space,
            &self.scene,
            &mut self.bindings,
            &mut self.scheduler,
        )
    }

    /// Run one frame of `dt` seconds.
    pub fn advance_frame(&mut self, dt: f64) -> Result<()> {
        self.scheduler
            .run_frame(dt, &mut self.space, &mut self.scene, &mut self.bindings)?;
        self.frame += 1;
        Ok(())
    }

    /// Run frames at the configured rate for `seconds`.
    ///
    /// Returns the number of frames run.
    pub fn wait(&mut self, seconds: f64) -> Result<u64> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(PhysicsError::InvalidTimeStep(seconds));
        }
        let fps = self.space.config().fps;
        let frames = (seconds * fps).round() as u64;
        for _ in 0..frames {
            self.advance_frame(1.0 / fps)?;
        }
        debug!(seconds, frames, "waited");
        Ok(frames)
    }

    /// Poses of all dynamic bodies.
    pub fn snapshot(&self) -> Frame {
        let bodies = self
            .bindings
            .iter()
            .filter(|(_, b)| b.kind == BodyKind::Dynamic)
            .filter_map(|(_, b)| {
                let pose = self.space.body_pose(b.body)?;
                Some(BodySnapshot {
                    name: self.names.get(&b.mobject).cloned(),
                    position: [pose.position.x, pose.position.y],
                    angle: pose.angle,
                    sleeping: self.space.is_sleeping(b.body).unwrap_or(false),
                })
            })
            .collect();
        Frame {
            frame: self.frame,
            time: self.space.elapsed(),
            bodies,
        }
    }
}

fn point(v: &mphys_ir::Vec2) -> Point2 {
    Point2::new(v.x, v.y)
}

fn build_mobject(shape: &ShapeDef) -> Result<Mobject> {
    let mobject = match shape {
        ShapeDef::Circle { center, radius } => Mobject::circle(point(center), *radius),
        ShapeDef::Line {
            start,
            end,
            stroke_width,
        } => Mobject::line(point(start), point(end)).with_stroke_width(*stroke_width),
        ShapeDef::Rectangle {
            center,
            width,
            height,
            rotation,
        } => Mobject::rectangle(point(center), *width, *height).rotated(*rotation),
        ShapeDef::Square {
            center,
            side,
            rotation,
        } => Mobject::square(point(center), *side).rotated(*rotation),
        ShapeDef::RegularPolygon {
            center,
            sides,
            radius,
            rotation,
        } => Mobject::regular_polygon(point(center), *sides as usize, *radius)?.rotated(*rotation),
        ShapeDef::Polygon { vertices } => Mobject::polygon(vertices.iter().map(point).collect())?,
        ShapeDef::Path { points } => Mobject::path(points.iter().map(point).collect())?,
        ShapeDef::Group { .. } => {
            return Err(SceneError::InvalidShape("groups are built from their members".into()).into())
        }
    };
    Ok(mobject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const FALLING: &str = r#"{
        "version": "0.1",
        "mobjects": [
            { "id": "ball", "type": "Circle", "center": { "x": 0.0, "y": 3.0 }, "radius": 0.5 },
            { "id": "ground", "type": "Line",
              "start": { "x": -4.0, "y": -3.5 }, "end": { "x": 4.0, "y": -3.5 } },
            { "id": "walls", "type": "Group", "children": ["ground"] }
        ],
        "rigid_bodies": [ { "mobjects": ["ball"] } ],
        "static_bodies": [ { "mobjects": ["walls"] } ]
    }"#;

    #[test]
    fn test_falling_circle_comes_to_rest_on_ground() {
        let doc = SceneDocument::from_json(FALLING).unwrap();
        let mut scene = SpaceScene::from_document(&doc).unwrap();
        assert_eq!(scene.wait(20.0).unwrap(), 1200);

        let ball = scene.lookup("ball").unwrap();
        let center = scene.scene().center(ball).unwrap();
        assert_relative_eq!(center.x, 0.0, epsilon = 0.05);
        assert_relative_eq!(center.y, -2.95, epsilon = 0.1);

        let frame = scene.snapshot();
        assert_eq!(frame.frame, 1200);
        assert_relative_eq!(frame.time, 20.0, epsilon = 1e-6);
        assert_eq!(frame.bodies.len(), 1);
        assert_eq!(frame.bodies[0].name.as_deref(), Some("ball"));
    }

    #[test]
    fn test_document_pendulum_swings() {
        let json = r#"{ "version": "0.1",
            "pendulums": [ { "type": "Single", "id": "p" } ] }"#;
        let doc = SceneDocument::from_json(json).unwrap();
        let mut scene = SpaceScene::from_document(&doc).unwrap();

        let id = scene.pendulum_named("p").unwrap();
        assert!(scene.pendulum(id).unwrap().is_swinging());
        let bob = scene.lookup("p.bob0").unwrap();
        assert!(scene.lookup("p.rod0").is_some());

        scene.wait(5.0).unwrap();
        let center = scene.scene().center(bob).unwrap();
        assert_relative_eq!((center - Point2::new(0.0, 2.0)).norm(), 3.5, epsilon = 0.05);

        scene.end_swinging(id).unwrap();
        assert!(scene.snapshot().bodies[0].sleeping);
    }

    #[test]
    fn test_document_errors() {
        let missing = r#"{ "version": "0.1",
            "rigid_bodies": [ { "mobjects": ["ghost"] } ] }"#;
        let doc = SceneDocument::from_json(missing).unwrap();
        assert_eq!(
            SpaceScene::from_document(&doc).unwrap_err(),
            PhysicsError::MissingMobject("ghost".into())
        );

        let duplicate = r#"{ "version": "0.1", "mobjects": [
            { "id": "a", "type": "Circle", "center": { "x": 0.0, "y": 0.0 }, "radius": 1.0 },
            { "id": "a", "type": "Circle", "center": { "x": 1.0, "y": 0.0 }, "radius": 1.0 } ] }"#;
        let doc = SceneDocument::from_json(duplicate).unwrap();
        assert_eq!(
            SpaceScene::from_document(&doc).unwrap_err(),
            PhysicsError::DuplicateMobject("a".into())
        );

        let bad_space = r#"{ "version": "0.1", "space": { "fps": -1.0 } }"#;
        let doc = SceneDocument::from_json(bad_space).unwrap();
        assert!(matches!(
            SpaceScene::from_document(&doc),
            Err(PhysicsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_path_needs_fallback() {
        let json = r#"{ "version": "0.1",
            "space": { "bounding_box_fallback": BOX },
            "mobjects": [ { "id": "squiggle", "type": "Path", "points": [
                { "x": 0.0, "y": 0.0 }, { "x": 1.0, "y": 1.0 }, { "x": 2.0, "y": 0.0 } ] } ],
            "rigid_bodies": [ { "mobjects": ["squiggle"] } ] }"#;

        let strict = SceneDocument::from_json(&json.replace("BOX", "false")).unwrap();
        assert!(matches!(
            SpaceScene::from_document(&strict),
            Err(PhysicsError::UnsupportedGeometry { .. })
        ));

        let lenient = SceneDocument::from_json(&json.replace("BOX", "true")).unwrap();
        let scene = SpaceScene::from_document(&lenient).unwrap();
        assert_eq!(scene.bindings().len(), 1);
    }

    #[test]
    fn test_stop_rigidity_freezes_bodies() {
        let mut scene = SpaceScene::new(Vec2::new(0.0, -9.81));
        let square = scene
            .add_named("box", Mobject::square(Point2::new(0.0, 2.0), 1.0))
            .unwrap();
        scene
            .make_rigid_body(&[square], &DynamicMaterial::default())
            .unwrap();
        scene.wait(0.5).unwrap();

        assert_eq!(scene.stop_rigidity(&[square]).unwrap(), 1);
        let frozen = scene.scene().center(square).unwrap();
        scene.wait(0.5).unwrap();
        assert_eq!(scene.scene().center(square).unwrap(), frozen);
        assert_eq!(scene.name_of(square), Some("box"));
        assert!(matches!(
            scene.add_named("box", Mobject::circle(Point2::origin(), 1.0)),
            Err(PhysicsError::DuplicateMobject(_))
        ));
    }

    #[test]
    fn test_wait_rejects_negative_time() {
        let mut scene = SpaceScene::new(Vec2::new(0.0, -9.81));
        assert!(scene.wait(-1.0).is_err());
        assert_eq!(scene.wait(0.0).unwrap(), 0);
    }
}
