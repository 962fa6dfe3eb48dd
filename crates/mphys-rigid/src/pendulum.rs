//! Pendulums built from pin joints.
//!
//! A pendulum is a chain of circular bobs hung from a fixed pivot, with a rod
//! line drawn along each link. The bobs must be bound as dynamic bodies
//! before the pendulum starts swinging; the rods are purely visual.

use mphys_scene::{MobjectId, Mobject, Point2, Scene, Vec2, DEFAULT_STROKE_WIDTH};
use rapier2d::dynamics::RigidBodyHandle;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use tracing::info;

use crate::binding::{Bindings, BodyKind};
use crate::error::{PhysicsError, Result};
use crate::scheduler::{PinRef, StepScheduler, Updater, UpdaterId};
use crate::space::{PinAnchor, PinJoint, SimulationSpace};

new_key_type! {
    /// Identifier of a pendulum in a [`crate::SpaceScene`].
    pub struct PendulumId;
}

/// Pivot used when none is given.
pub const DEFAULT_PIVOT: [f64; 2] = [0.0, 2.0];

/// Bob radius of multi-bob pendulums.
pub const DEFAULT_BOB_RADIUS: f64 = 0.1;

/// Bob radius of single pendulums.
pub const DEFAULT_SINGLE_BOB_RADIUS: f64 = 0.25;

/// Look of a pendulum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendulumStyle {
    /// Radius of each bob.
    pub bob_radius: f64,
    /// Stroke width of each rod.
    pub rod_stroke_width: f64,
}

impl Default for PendulumStyle {
    fn default() -> Self {
        Self {
            bob_radius: DEFAULT_BOB_RADIUS,
            rod_stroke_width: DEFAULT_STROKE_WIDTH,
        }
    }
}

impl PendulumStyle {
    /// Style of a single pendulum: one larger bob.
    pub fn single() -> Self {
        Self {
            bob_radius: DEFAULT_SINGLE_BOB_RADIUS,
            ..Self::default()
        }
    }
}

/// Parameters of a single-bob pendulum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SinglePendulumParams {
    /// Rod length.
    pub length: f64,
    /// Starting angle from the downward vertical, in radians.
    pub initial_theta: f64,
    /// Pivot point.
    pub pivot: [f64; 2],
}

impl Default for SinglePendulumParams {
    fn default() -> Self {
        Self {
            length: 3.5,
            initial_theta: 0.3,
            pivot: DEFAULT_PIVOT,
        }
    }
}

impl SinglePendulumParams {
    /// Bob position for these parameters.
    pub fn bob_position(&self) -> Point2 {
        let pivot = Point2::new(self.pivot[0], self.pivot[1]);
        pivot + Vec2::new(self.initial_theta.sin(), -self.initial_theta.cos()) * self.length
    }
}

/// A chain of bobs hung from a pivot.
#[derive(Debug, Clone)]
pub struct MultiPendulum {
    pivot: Point2,
    bobs: Vec<MobjectId>,
    rods: Vec<MobjectId>,
    bob_group: MobjectId,
    rod_group: MobjectId,
    group: MobjectId,
    joints: Vec<PinJoint>,
    rod_updaters: Vec<UpdaterId>,
}

impl MultiPendulum {
    /// Add bobs at `positions` and rods linking `pivot` to the first bob and
    /// each bob to the next.
    pub fn new(
        scene: &mut Scene,
        positions: &[Point2],
        pivot: Point2,
        style: PendulumStyle,
    ) -> Result<Self> {
        if positions.is_empty() {
            return Err(PhysicsError::InvalidPendulum(
                "a pendulum needs at least one bob".into(),
            ));
        }
        if !style.bob_radius.is_finite() || style.bob_radius <= 0.0 {
            return Err(PhysicsError::InvalidPendulum(format!(
                "bob radius must be > 0, got {}",
                style.bob_radius
            )));
        }

        let bobs: Vec<MobjectId> = positions
            .iter()
            .map(|p| scene.add(Mobject::circle(*p, style.bob_radius)))
            .collect();
        let rods: Vec<MobjectId> = std::iter::once(&pivot)
            .chain(positions.iter())
            .zip(positions.iter())
            .map(|(a, b)| {
                scene.add(Mobject::line(*a, *b).with_stroke_width(style.rod_stroke_width))
            })
            .collect();
        let rod_group = scene.add_group(rods.clone())?;
        let bob_group = scene.add_group(bobs.clone())?;
        let group = scene.add_group(vec![rod_group, bob_group])?;

        Ok(Self {
            pivot,
            bobs,
            rods,
            bob_group,
            rod_group,
            group,
            joints: Vec::new(),
            rod_updaters: Vec::new(),
        })
    }

    /// Single pendulum from `params`.
    pub fn single(
        scene: &mut Scene,
        params: &SinglePendulumParams,
        style: PendulumStyle,
    ) -> Result<Self> {
        if !params.length.is_finite() || params.length <= 0.0 {
            return Err(PhysicsError::InvalidPendulum(format!(
                "length must be > 0, got {}",
                params.length
            )));
        }
        let pivot = Point2::new(params.pivot[0], params.pivot[1]);
        Self::new(scene, &[params.bob_position()], pivot, style)
    }

    /// The pivot point.
    pub fn pivot(&self) -> Point2 {
        self.pivot
    }

    /// Bob circles, first hung from the pivot.
    pub fn bobs(&self) -> &[MobjectId] {
        &self.bobs
    }

    /// Rod lines. Rod `i` ends at bob `i`.
    pub fn rods(&self) -> &[MobjectId] {
        &self.rods
    }

    /// Group of all bobs.
    pub fn bob_group(&self) -> MobjectId {
        self.bob_group
    }

    /// Group of all rods.
    pub fn rod_group(&self) -> MobjectId {
        self.rod_group
    }

    /// Group of rods and bobs.
    pub fn group(&self) -> MobjectId {
        self.group
    }

    /// Pin joints, created the first time the pendulum swings.
    pub fn joints(&self) -> &[PinJoint] {
        &self.joints
    }

    /// Whether rods are being redrawn each frame.
    pub fn is_swinging(&self) -> bool {
        !self.rod_updaters.is_empty()
    }

    /// Pin the bobs together and start redrawing the rods every frame.
    ///
    /// Every bob must already be bound as a dynamic body. The joints keep the
    /// distances the bobs have now.
    pub fn start_swinging(
        &mut self,
        space: &mut SimulationSpace,
        bindings: &Bindings,
        scheduler: &mut StepScheduler,
    ) -> Result<()> {
        if self.is_swinging() {
            return Err(PhysicsError::AlreadySwinging);
        }

        let bodies = self
            .bobs
            .iter()
            .map(|bob| -> Result<RigidBodyHandle> {
                let binding = bindings.require(*bob)?;
                match binding.kind {
                    BodyKind::Dynamic => Ok(binding.body),
                    kind => Err(PhysicsError::AlreadyBound { mobject: *bob, kind }),
                }
            })
            .collect::<Result<Vec<RigidBodyHandle>>>()?;

        if self.joints.is_empty() {
            let mut anchor = PinAnchor::Fixed(self.pivot);
            for body in &bodies {
                self.joints.push(space.pin_joint(anchor, *body)?);
                anchor = PinAnchor::Body(*body);
            }
        }
        for body in &bodies {
            space.wake(*body)?;
        }

        let mut from = PinRef::Fixed(self.pivot);
        for (rod, body) in self.rods.iter().zip(&bodies) {
            let to = PinRef::Body(*body);
            self.rod_updaters
                .push(scheduler.attach(Updater::RedrawRod { rod: *rod, from, to }));
            from = to;
        }

        info!(bobs = self.bobs.len(), "pendulum started swinging");
        Ok(())
    }

    /// Stop redrawing the rods and put the bobs to sleep.
    pub fn end_swinging(
        &mut self,
        space: &mut SimulationSpace,
        scene: &Scene,
        bindings: &mut Bindings,
        scheduler: &mut StepScheduler,
    ) -> Result<()> {
        if !self.is_swinging() {
            return Err(PhysicsError::NotSwinging);
        }
        for id in self.rod_updaters.drain(..) {
            scheduler.remove(id);
        }
        bindings.unbind_to_sleep(space, scene, self.bob_group)?;
        info!(bobs = self.bobs.len(), "pendulum stopped swinging");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colliders::DynamicMaterial;
    use approx::assert_relative_eq;

    struct Rig {
        space: SimulationSpace,
        scene: Scene,
        bindings: Bindings,
        scheduler: StepScheduler,
    }

    impl Rig {
        fn new() -> Self {
            let mut scheduler = StepScheduler::new();
            scheduler.attach_step();
            Self {
                space: SimulationSpace::create(Vec2::new(0.0, -9.81)),
                scene: Scene::new(),
                bindings: Bindings::new(),
                scheduler,
            }
        }

        fn bind_bobs(&mut self, pendulum: &MultiPendulum) {
            for bob in pendulum.bobs() {
                let id = self
                    .bindings
                    .bind_dynamic(&mut self.space, &self.scene, *bob, &DynamicMaterial::default())
                    .unwrap();
                self.scheduler.attach_sync(id);
            }
        }

        fn start(&mut self, pendulum: &mut MultiPendulum) {
            pendulum
                .start_swinging(&mut self.space, &self.bindings, &mut self.scheduler)
                .unwrap();
        }

        fn run(&mut self, frames: usize) {
            for _ in 0..frames {
                self.scheduler
                    .run_frame(1.0 / 60.0, &mut self.space, &mut self.scene, &mut self.bindings)
                    .unwrap();
            }
        }
    }

    #[test]
    fn test_single_pendulum_layout() {
        let mut scene = Scene::new();
        let params = SinglePendulumParams::default();
        let pendulum = MultiPendulum::single(&mut scene, &params, PendulumStyle::single()).unwrap();

        let bob = scene.center(pendulum.bobs()[0]).unwrap();
        assert_relative_eq!(bob.x, 3.5 * 0.3_f64.sin(), epsilon = 1e-12);
        assert_relative_eq!(bob.y, 2.0 - 3.5 * 0.3_f64.cos(), epsilon = 1e-12);
        assert_relative_eq!((bob - pendulum.pivot()).norm(), 3.5, epsilon = 1e-12);

        let rod = scene.mobject(pendulum.rods()[0]).unwrap();
        assert_eq!(rod.start(), Some(Point2::new(0.0, 2.0)));
        assert_eq!(rod.end(), Some(bob));
        assert_eq!(scene.leaves(pendulum.group()).unwrap().len(), 2);
    }

    #[test]
    fn test_multi_pendulum_links() {
        let mut scene = Scene::new();
        let pendulum = MultiPendulum::new(
            &mut scene,
            &[Point2::new(1.0, 0.0), Point2::new(-1.0, 0.0)],
            Point2::new(0.0, 2.0),
            PendulumStyle::default(),
        )
        .unwrap();
        assert_eq!(pendulum.bobs().len(), 2);
        assert_eq!(pendulum.rods().len(), 2);

        let second = scene.mobject(pendulum.rods()[1]).unwrap();
        assert_eq!(second.start(), Some(Point2::new(1.0, 0.0)));
        assert_eq!(second.end(), Some(Point2::new(-1.0, 0.0)));
    }

    #[test]
    fn test_invalid_pendulums() {
        let mut scene = Scene::new();
        assert!(matches!(
            MultiPendulum::new(&mut scene, &[], Point2::origin(), PendulumStyle::default()),
            Err(PhysicsError::InvalidPendulum(_))
        ));
        let params = SinglePendulumParams {
            length: 0.0,
            ..SinglePendulumParams::default()
        };
        assert!(MultiPendulum::single(&mut scene, &params, PendulumStyle::single()).is_err());
    }

    #[test]
    fn test_start_requires_bound_bobs() {
        let mut rig = Rig::new();
        let mut pendulum = MultiPendulum::single(
            &mut rig.scene,
            &SinglePendulumParams::default(),
            PendulumStyle::single(),
        )
        .unwrap();
        let bob = pendulum.bobs()[0];
        assert_eq!(
            pendulum.start_swinging(&mut rig.space, &rig.bindings, &mut rig.scheduler),
            Err(PhysicsError::NotBound(bob))
        );
        assert!(!pendulum.is_swinging());
    }

    #[test]
    fn test_single_pendulum_keeps_its_length() {
        let mut rig = Rig::new();
        let mut pendulum = MultiPendulum::single(
            &mut rig.scene,
            &SinglePendulumParams::default(),
            PendulumStyle::single(),
        )
        .unwrap();
        rig.bind_bobs(&pendulum);
        rig.start(&mut pendulum);
        assert_relative_eq!(pendulum.joints()[0].length, 3.5, epsilon = 1e-4);

        let start = rig.scene.center(pendulum.bobs()[0]).unwrap();
        rig.run(600);

        let bob = rig.scene.center(pendulum.bobs()[0]).unwrap();
        assert_ne!(bob, start);
        assert_relative_eq!((bob - pendulum.pivot()).norm(), 3.5, epsilon = 0.05);

        let rod = rig.scene.mobject(pendulum.rods()[0]).unwrap();
        let end = rod.end().unwrap();
        assert_relative_eq!(end.x, bob.x, epsilon = 1e-9);
        assert_relative_eq!(end.y, bob.y, epsilon = 1e-9);
    }

    #[test]
    fn test_double_pendulum_keeps_link_lengths() {
        let mut rig = Rig::new();
        let mut pendulum = MultiPendulum::new(
            &mut rig.scene,
            &[Point2::new(1.0, 0.0), Point2::new(-1.0, 0.0)],
            Point2::new(0.0, 2.0),
            PendulumStyle::default(),
        )
        .unwrap();
        rig.bind_bobs(&pendulum);
        rig.start(&mut pendulum);
        rig.run(300);

        let a = rig.scene.center(pendulum.bobs()[0]).unwrap();
        let b = rig.scene.center(pendulum.bobs()[1]).unwrap();
        assert_relative_eq!((a - pendulum.pivot()).norm(), 5.0_f64.sqrt(), epsilon = 0.1);
        assert_relative_eq!((b - a).norm(), 2.0, epsilon = 0.1);
    }

    #[test]
    fn test_swing_lifecycle() {
        let mut rig = Rig::new();
        let mut pendulum = MultiPendulum::single(
            &mut rig.scene,
            &SinglePendulumParams::default(),
            PendulumStyle::single(),
        )
        .unwrap();
        rig.bind_bobs(&pendulum);
        rig.start(&mut pendulum);
        assert_eq!(
            pendulum.start_swinging(&mut rig.space, &rig.bindings, &mut rig.scheduler),
            Err(PhysicsError::AlreadySwinging)
        );
        rig.run(30);

        pendulum
            .end_swinging(&mut rig.space, &rig.scene, &mut rig.bindings, &mut rig.scheduler)
            .unwrap();
        assert!(!pendulum.is_swinging());
        // Step and one sync updater remain.
        assert_eq!(rig.scheduler.len(), 2);

        let bob = pendulum.bobs()[0];
        let body = rig.bindings.require(bob).unwrap().body;
        assert_eq!(rig.space.is_sleeping(body), Some(true));
        let rod_end = rig.scene.mobject(pendulum.rods()[0]).unwrap().end();
        rig.run(30);
        assert_eq!(rig.scene.mobject(pendulum.rods()[0]).unwrap().end(), rod_end);

        assert_eq!(
            pendulum.end_swinging(&mut rig.space, &rig.scene, &mut rig.bindings, &mut rig.scheduler),
            Err(PhysicsError::NotSwinging)
        );

        rig.start(&mut pendulum);
        assert_eq!(rig.space.joint_count(), 1);
        assert_eq!(rig.space.is_sleeping(body), Some(false));
    }
}
