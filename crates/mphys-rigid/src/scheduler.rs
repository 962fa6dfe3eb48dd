//! Per-frame updaters.
//!
//! The scheduler runs its updaters in attachment order once per frame. The
//! space step is attached first, so every sync and rod redraw sees the
//! positions of the current frame.

use mphys_scene::math::normalize_angle;
use mphys_scene::{MobjectId, Point2, Scene};
use rapier2d::dynamics::RigidBodyHandle;
use slotmap::{new_key_type, SlotMap};

use crate::binding::{BindingId, Bindings, BodyKind};
use crate::error::{PhysicsError, Result};
use crate::space::SimulationSpace;

new_key_type! {
    /// Identifier of an attached [`Updater`].
    pub struct UpdaterId;
}

/// End of a rod: a fixed point or a body's origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PinRef {
    /// Fixed world point.
    Fixed(Point2),
    /// Current position of a body.
    Body(RigidBodyHandle),
}

/// Work done once per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Updater {
    /// Advance the space by the frame time.
    StepSpace,
    /// Copy a body's pose onto its mobject.
    SyncBody(BindingId),
    /// Redraw a line between two pins.
    RedrawRod {
        /// The rod line.
        rod: MobjectId,
        /// Start of the rod.
        from: PinRef,
        /// End of the rod.
        to: PinRef,
    },
}

/// Ordered list of updaters.
#[derive(Debug, Default)]
pub struct StepScheduler {
    updaters: SlotMap<UpdaterId, Updater>,
    order: Vec<UpdaterId>,
}

impl StepScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attached updaters.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Updaters in run order.
    pub fn iter(&self) -> impl Iterator<Item = (UpdaterId, &Updater)> {
        self.order.iter().map(|id| (*id, &self.updaters[*id]))
    }

    /// Attach an updater at the end of the frame.
    pub fn attach(&mut self, updater: Updater) -> UpdaterId {
        let id = self.updaters.insert(updater);
        self.order.push(id);
        id
    }

    fn find(&self, updater: &Updater) -> Option<UpdaterId> {
        self.iter().find(|(_, u)| *u == updater).map(|(id, _)| id)
    }

    /// Attach the space step unless it is already attached.
    pub fn attach_step(&mut self) -> UpdaterId {
        self.find(&Updater::StepSpace)
            .unwrap_or_else(|| self.attach(Updater::StepSpace))
    }

    /// Attach a body sync unless it is already attached.
    pub fn attach_sync(&mut self, binding: BindingId) -> UpdaterId {
        let updater = Updater::SyncBody(binding);
        match self.find(&updater) {
            Some(id) => id,
            None => self.attach(updater),
        }
    }

    /// Detach an updater.
    pub fn remove(&mut self, id: UpdaterId) -> Option<Updater> {
        let updater = self.updaters.remove(id)?;
        self.order.retain(|other| *other != id);
        Some(updater)
    }

    /// Run every updater once with frame time `dt`.
    pub fn run_frame(
        &self,
        dt: f64,
        space: &mut SimulationSpace,
        scene: &mut Scene,
        bindings: &mut Bindings,
    ) -> Result<()> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(PhysicsError::InvalidTimeStep(dt));
        }
        for (_, updater) in self.iter() {
            match updater {
                Updater::StepSpace => space.step(dt)?,
                Updater::SyncBody(binding) => sync_binding(space, scene, bindings, *binding)?,
                Updater::RedrawRod { rod, from, to } => {
                    let start = resolve_pin(space, from)?;
                    let end = resolve_pin(space, to)?;
                    scene.put_start_and_end_on(*rod, start, end)?;
                }
            }
        }
        Ok(())
    }
}

fn resolve_pin(space: &SimulationSpace, pin: &PinRef) -> Result<Point2> {
    match pin {
        PinRef::Fixed(point) => Ok(*point),
        PinRef::Body(handle) => space
            .body_pose(*handle)
            .map(|pose| pose.position)
            .ok_or(PhysicsError::MissingBody),
    }
}

/// Copy a dynamic body's pose onto its mobject.
///
/// The rotation is applied as the change since the last sync, because scene
/// rotations accumulate. The position is applied as an absolute move.
/// Sleeping bodies and static bindings are left alone.
pub fn sync_binding(
    space: &SimulationSpace,
    scene: &mut Scene,
    bindings: &mut Bindings,
    id: BindingId,
) -> Result<()> {
    let binding = bindings.get_mut(id).ok_or(PhysicsError::MissingBinding)?;
    if binding.kind == BodyKind::Static {
        return Ok(());
    }
    if space.is_sleeping(binding.body) == Some(true) {
        return Ok(());
    }
    let pose = space
        .body_pose(binding.body)
        .ok_or(PhysicsError::MissingBody)?;

    let delta = normalize_angle(pose.angle - binding.last_synced_angle);
    if delta != 0.0 {
        scene.rotate(binding.mobject, delta)?;
    }
    scene.move_to(binding.mobject, &pose.position)?;
    binding.last_synced_angle = pose.angle;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colliders::DynamicMaterial;
    use approx::assert_relative_eq;
    use mphys_scene::{Mobject, Vec2};

    struct Rig {
        space: SimulationSpace,
        scene: Scene,
        bindings: Bindings,
        scheduler: StepScheduler,
    }

    impl Rig {
        fn new(gravity: Vec2) -> Self {
            let mut scheduler = StepScheduler::new();
            scheduler.attach_step();
            Self {
                space: SimulationSpace::create(gravity),
                scene: Scene::new(),
                bindings: Bindings::new(),
                scheduler,
            }
        }

        fn bind(&mut self, mobject: Mobject) -> (MobjectId, BindingId) {
            let id = self.scene.add(mobject);
            let binding = self
                .bindings
                .bind_dynamic(&mut self.space, &self.scene, id, &DynamicMaterial::default())
                .unwrap();
            self.scheduler.attach_sync(binding);
            (id, binding)
        }

        fn frame(&mut self, dt: f64) {
            self.scheduler
                .run_frame(dt, &mut self.space, &mut self.scene, &mut self.bindings)
                .unwrap();
        }
    }

    #[test]
    fn test_zero_dt_frame_changes_nothing() {
        let mut rig = Rig::new(Vec2::new(0.0, -9.81));
        let shapes = vec![
            Mobject::circle(Point2::new(0.0, 3.0), 0.5).rotated(0.2),
            Mobject::line(Point2::new(-1.0, 1.0), Point2::new(1.0, 1.5)),
            Mobject::rectangle(Point2::new(2.0, 0.0), 1.0, 0.5).rotated(0.3),
            Mobject::triangle(Point2::new(-2.0, 0.0), 0.5).rotated(-0.4),
            Mobject::polygon(vec![
                Point2::new(3.0, 3.0),
                Point2::new(4.0, 3.0),
                Point2::new(4.5, 4.0),
                Point2::new(3.0, 4.0),
            ])
            .unwrap(),
        ];
        let ids: Vec<MobjectId> = shapes.into_iter().map(|m| rig.bind(m).0).collect();
        let before: Vec<(Point2, f64)> = ids
            .iter()
            .map(|id| {
                (
                    rig.scene.center(*id).unwrap(),
                    rig.scene.orientation(*id).unwrap(),
                )
            })
            .collect();

        rig.frame(0.0);

        for (id, (center, angle)) in ids.iter().zip(before) {
            let after = rig.scene.center(*id).unwrap();
            assert_relative_eq!(after.x, center.x, epsilon = 1e-5);
            assert_relative_eq!(after.y, center.y, epsilon = 1e-5);
            assert_relative_eq!(rig.scene.orientation(*id).unwrap(), angle, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_rotation_sync_is_relative() {
        let mut rig = Rig::new(Vec2::zeros());
        let (square, binding) = rig.bind(Mobject::square(Point2::origin(), 1.0).rotated(0.3));
        let body = rig.bindings.get(binding).unwrap().body;
        rig.space.set_velocity(body, Vec2::zeros(), 1.0).unwrap();

        rig.frame(0.1);
        let body_angle = rig.space.body_pose(body).unwrap().angle;
        assert_relative_eq!(body_angle, 0.4, epsilon = 1e-4);
        assert_relative_eq!(rig.scene.orientation(square).unwrap(), body_angle, epsilon = 1e-5);

        rig.frame(0.1);
        let body_angle = rig.space.body_pose(body).unwrap().angle;
        assert_relative_eq!(body_angle, 0.5, epsilon = 1e-4);
        assert_relative_eq!(rig.scene.orientation(square).unwrap(), body_angle, epsilon = 1e-5);
    }

    #[test]
    fn test_position_follows_body() {
        let mut rig = Rig::new(Vec2::new(0.0, -9.81));
        let (ball, binding) = rig.bind(Mobject::circle(Point2::new(0.0, 3.0), 0.5));
        for _ in 0..30 {
            rig.frame(1.0 / 60.0);
        }
        let body = rig.bindings.get(binding).unwrap().body;
        let pose = rig.space.body_pose(body).unwrap();
        let center = rig.scene.center(ball).unwrap();
        assert!(center.y < 3.0);
        assert_relative_eq!(center.x, pose.position.x, epsilon = 1e-9);
        assert_relative_eq!(center.y, pose.position.y, epsilon = 1e-9);
    }

    #[test]
    fn test_sleeping_body_is_not_synced() {
        let mut rig = Rig::new(Vec2::new(0.0, -9.81));
        let (ball, _) = rig.bind(Mobject::circle(Point2::new(0.0, 3.0), 0.5));
        for _ in 0..10 {
            rig.frame(1.0 / 60.0);
        }
        rig.bindings
            .unbind_to_sleep(&mut rig.space, &rig.scene, ball)
            .unwrap();
        let frozen = rig.scene.center(ball).unwrap();

        for _ in 0..60 {
            rig.frame(1.0 / 60.0);
        }
        assert_eq!(rig.scene.center(ball).unwrap(), frozen);
    }

    #[test]
    fn test_rod_follows_pins() {
        let mut rig = Rig::new(Vec2::new(0.0, -9.81));
        let (_, binding) = rig.bind(Mobject::circle(Point2::new(1.0, 0.0), 0.1));
        let body = rig.bindings.get(binding).unwrap().body;
        let rod = rig
            .scene
            .add(Mobject::line(Point2::new(0.0, 2.0), Point2::new(1.0, 0.0)));
        rig.scheduler.attach(Updater::RedrawRod {
            rod,
            from: PinRef::Fixed(Point2::new(0.0, 2.0)),
            to: PinRef::Body(body),
        });

        rig.frame(1.0 / 60.0);
        let end = rig.scene.mobject(rod).unwrap().end().unwrap();
        assert_eq!(end, rig.space.body_pose(body).unwrap().position);
        assert_eq!(
            rig.scene.mobject(rod).unwrap().start(),
            Some(Point2::new(0.0, 2.0))
        );
    }

    #[test]
    fn test_attach_is_idempotent_and_ordered() {
        let mut scheduler = StepScheduler::new();
        let step = scheduler.attach_step();
        assert_eq!(scheduler.attach_step(), step);

        let sync = scheduler.attach_sync(BindingId::default());
        assert_eq!(scheduler.attach_sync(BindingId::default()), sync);
        assert_eq!(scheduler.len(), 2);
        assert_eq!(scheduler.iter().next().map(|(id, _)| id), Some(step));

        assert_eq!(
            scheduler.remove(sync),
            Some(Updater::SyncBody(BindingId::default()))
        );
        assert_eq!(scheduler.remove(sync), None);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_negative_frame_time_is_rejected() {
        let mut rig = Rig::new(Vec2::zeros());
        assert_eq!(
            rig.scheduler
                .run_frame(-1.0, &mut rig.space, &mut rig.scene, &mut rig.bindings),
            Err(PhysicsError::InvalidTimeStep(-1.0))
        );
    }
}
