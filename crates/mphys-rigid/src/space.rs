//! The simulation space: a Rapier 2D world plus the settings it was built with.

use mphys_scene::{Point2, Vec2};
use nalgebra::{Isometry2, Vector2};
use rapier2d::dynamics::{
    CCDSolver, CoefficientCombineRule, ImpulseJointHandle, ImpulseJointSet,
    IntegrationParameters, IslandManager, MultibodyJointSet, RevoluteJointBuilder,
    RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};
use rapier2d::geometry::{
    BroadPhaseMultiSap, ColliderBuilder, ColliderHandle, ColliderSet, NarrowPhase,
};
use rapier2d::parry::shape::{ShapeType, SharedShape};
use rapier2d::pipeline::{PhysicsPipeline, QueryPipeline};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::colliders::{DynamicMaterial, StaticMaterial};
use crate::error::{PhysicsError, Result};

/// Standard gravity pointing down the Y axis.
pub const DEFAULT_GRAVITY: [f64; 2] = [0.0, -9.81];

/// Seconds a body must stay at rest before it falls asleep.
pub const DEFAULT_SLEEP_TIME_THRESHOLD: f64 = 5.0;

/// Frames per second of the scene clock.
pub const DEFAULT_FPS: f64 = 60.0;

/// What to do with geometry that has no dedicated collider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Fail with [`PhysicsError::UnsupportedGeometry`].
    #[default]
    Reject,
    /// Approximate with the axis-aligned bounding box.
    BoundingBox,
}

/// Settings for a [`SimulationSpace`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceConfig {
    /// Gravity vector.
    pub gravity: [f64; 2],
    /// Seconds at rest before a body sleeps.
    pub sleep_time_threshold: f64,
    /// Frames per second used by scene waits.
    pub fps: f64,
    /// Collider policy for paths and groups.
    pub fallback: FallbackPolicy,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            sleep_time_threshold: DEFAULT_SLEEP_TIME_THRESHOLD,
            fps: DEFAULT_FPS,
            fallback: FallbackPolicy::Reject,
        }
    }
}

impl SpaceConfig {
    /// Validate settings, returning an error for values the engine cannot use.
    pub fn validate(&self) -> Result<()> {
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(PhysicsError::InvalidConfig(format!(
                "gravity must be finite, got {:?}",
                self.gravity
            )));
        }
        if !self.sleep_time_threshold.is_finite() || self.sleep_time_threshold < 0.0 {
            return Err(PhysicsError::InvalidConfig(format!(
                "sleep_time_threshold must be >= 0, got {}",
                self.sleep_time_threshold
            )));
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(PhysicsError::InvalidConfig(format!(
                "fps must be > 0, got {}",
                self.fps
            )));
        }
        Ok(())
    }
}

/// World position and angle of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPose {
    /// Position of the body origin.
    pub position: Point2,
    /// Angle in radians.
    pub angle: f64,
}

/// One end of a pin joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PinAnchor {
    /// A fixed point in the world.
    Fixed(Point2),
    /// The origin of another body.
    Body(RigidBodyHandle),
}

/// A pin joint holding two anchors at a fixed distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinJoint {
    /// Joint handle in the space.
    pub handle: ImpulseJointHandle,
    /// Body on the anchor side. A fixed body for [`PinAnchor::Fixed`].
    pub anchor_body: RigidBodyHandle,
    /// The pinned body.
    pub body: RigidBodyHandle,
    /// Distance between the anchors when the joint was created.
    pub length: f64,
}

/// A 2D physics world.
///
/// Renderables never live here. The space only holds bodies, colliders and
/// joints; [`crate::Bindings`] connects them to scene mobjects.
pub struct SimulationSpace {
    pipeline: PhysicsPipeline,
    gravity: Vector2<f32>,
    integration_params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,

    static_anchor: RigidBodyHandle,
    config: SpaceConfig,
    elapsed: f64,
}

impl std::fmt::Debug for SimulationSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationSpace")
            .field("config", &self.config)
            .field("elapsed", &self.elapsed)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .field("joints", &self.impulse_joints.len())
            .finish()
    }
}

impl SimulationSpace {
    /// Create a space with the given gravity and default settings.
    pub fn create(gravity: Vec2) -> Self {
        Self::build(SpaceConfig {
            gravity: [gravity.x, gravity.y],
            ..SpaceConfig::default()
        })
    }

    /// Create a space from validated settings.
    pub fn with_config(config: SpaceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SpaceConfig) -> Self {
        let mut bodies = RigidBodySet::new();
        let static_anchor = bodies.insert(RigidBodyBuilder::fixed().build());
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: Vector2::new(config.gravity[0] as f32, config.gravity[1] as f32),
            integration_params: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            static_anchor,
            config,
            elapsed: 0.0,
        }
    }

    /// Settings the space was built with.
    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    /// Current gravity.
    pub fn gravity(&self) -> Vec2 {
        Vec2::new(self.config.gravity[0], self.config.gravity[1])
    }

    /// Set gravity vector.
    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.config.gravity = [gravity.x, gravity.y];
        self.gravity = Vector2::new(gravity.x as f32, gravity.y as f32);
    }

    /// Fixed body at the origin that carries every static collider.
    pub fn static_anchor(&self) -> RigidBodyHandle {
        self.static_anchor
    }

    /// Simulated seconds so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Number of bodies, the static anchor and pin anchors included.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of colliders.
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// Number of joints.
    pub fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// A zero step leaves every body where it is.
    pub fn step(&mut self, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(PhysicsError::InvalidTimeStep(dt));
        }
        if dt == 0.0 {
            return Ok(());
        }
        self.integration_params.dt = dt as f32;

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
        self.elapsed += dt;
        trace!(dt, elapsed = self.elapsed, "stepped space");
        Ok(())
    }

    /// Insert a dynamic body with one collider.
    pub(crate) fn insert_dynamic(
        &mut self,
        pose: BodyPose,
        shape: SharedShape,
        material: &DynamicMaterial,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let mut body = RigidBodyBuilder::dynamic()
            .translation(to_physics_vec(&pose.position.coords))
            .rotation(pose.angle as f32)
            .build();
        body.activation_mut().time_until_sleep = self.config.sleep_time_threshold as f32;
        let handle = self.bodies.insert(body);

        let collider = ColliderBuilder::new(shape)
            .density(material.density as f32)
            .restitution(material.elasticity as f32)
            .friction(material.friction as f32)
            .restitution_combine_rule(CoefficientCombineRule::Multiply)
            .friction_combine_rule(CoefficientCombineRule::Multiply)
            .build();
        let collider = self
            .colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        (handle, collider)
    }

    /// Attach a static collider placed at `pose` to the static anchor.
    pub(crate) fn insert_static(
        &mut self,
        pose: BodyPose,
        shape: SharedShape,
        material: &StaticMaterial,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::new(shape)
            .position(Isometry2::new(
                to_physics_vec(&pose.position.coords),
                pose.angle as f32,
            ))
            .restitution(material.elasticity as f32)
            .friction(material.friction as f32)
            .restitution_combine_rule(CoefficientCombineRule::Multiply)
            .friction_combine_rule(CoefficientCombineRule::Multiply)
            .build();
        self.colliders
            .insert_with_parent(collider, self.static_anchor, &mut self.bodies)
    }

    /// Position and angle of a body.
    pub fn body_pose(&self, handle: RigidBodyHandle) -> Option<BodyPose> {
        let body = self.bodies.get(handle)?;
        let t = body.translation();
        Some(BodyPose {
            position: Point2::new(t.x as f64, t.y as f64),
            angle: body.rotation().angle() as f64,
        })
    }

    /// Whether a body is asleep.
    pub fn is_sleeping(&self, handle: RigidBodyHandle) -> Option<bool> {
        self.bodies.get(handle).map(|b| b.is_sleeping())
    }

    /// Put a body to sleep. It stays put until woken.
    pub fn sleep(&mut self, handle: RigidBodyHandle) -> Result<()> {
        let body = self
            .bodies
            .get_mut(handle)
            .ok_or(PhysicsError::MissingBody)?;
        body.sleep();
        Ok(())
    }

    /// Wake a sleeping body.
    pub fn wake(&mut self, handle: RigidBodyHandle) -> Result<()> {
        let body = self
            .bodies
            .get_mut(handle)
            .ok_or(PhysicsError::MissingBody)?;
        body.wake_up(true);
        Ok(())
    }

    /// Linear velocity of a body.
    pub fn linear_velocity(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        let v = self.bodies.get(handle)?.linvel();
        Some(Vec2::new(v.x as f64, v.y as f64))
    }

    /// Angular velocity of a body in radians per second.
    pub fn angular_velocity(&self, handle: RigidBodyHandle) -> Option<f64> {
        Some(self.bodies.get(handle)?.angvel() as f64)
    }

    /// Set the linear and angular velocity of a body, waking it.
    pub fn set_velocity(&mut self, handle: RigidBodyHandle, linvel: Vec2, angvel: f64) -> Result<()> {
        let body = self
            .bodies
            .get_mut(handle)
            .ok_or(PhysicsError::MissingBody)?;
        body.set_linvel(to_physics_vec(&linvel), true);
        body.set_angvel(angvel as f32, true);
        Ok(())
    }

    /// Shape type of a collider.
    pub fn collider_shape_type(&self, handle: ColliderHandle) -> Option<ShapeType> {
        self.colliders.get(handle).map(|c| c.shape().shape_type())
    }

    /// Pin `body` to `anchor`, keeping their current distance.
    ///
    /// A [`PinAnchor::Fixed`] point gets its own fixed body. The joint lets
    /// both sides rotate freely about the anchor point.
    pub fn pin_joint(&mut self, anchor: PinAnchor, body: RigidBodyHandle) -> Result<PinJoint> {
        let body_position = *self
            .bodies
            .get(body)
            .ok_or(PhysicsError::MissingBody)?
            .position();

        let (anchor_body, anchor_world) = match anchor {
            PinAnchor::Fixed(point) => {
                let handle = self.bodies.insert(
                    RigidBodyBuilder::fixed()
                        .translation(to_physics_vec(&point.coords))
                        .build(),
                );
                (handle, to_physics_vec(&point.coords))
            }
            PinAnchor::Body(handle) => {
                let other = self.bodies.get(handle).ok_or(PhysicsError::MissingBody)?;
                (handle, *other.translation())
            }
        };

        let local_anchor2 =
            body_position.inverse_transform_point(&nalgebra::Point2::from(anchor_world));
        let joint = RevoluteJointBuilder::new()
            .local_anchor1(nalgebra::Point2::origin())
            .local_anchor2(local_anchor2)
            .build();
        let handle = self.impulse_joints.insert(anchor_body, body, joint, true);
        let length = (anchor_world - body_position.translation.vector).norm() as f64;

        trace!(length, "created pin joint");
        Ok(PinJoint {
            handle,
            anchor_body,
            body,
            length,
        })
    }
}

fn to_physics_vec(v: &Vec2) -> Vector2<f32> {
    Vector2::new(v.x as f32, v.y as f32)
}
