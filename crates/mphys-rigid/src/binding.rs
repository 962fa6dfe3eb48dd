//! Bindings between scene mobjects and physics bodies.
//!
//! Each bound mobject has exactly one [`Binding`]. Dynamic bindings own a
//! body; static bindings share the space's static anchor and only own their
//! collider.

use std::collections::HashMap;

use mphys_scene::{MobjectId, Scene};
use rapier2d::dynamics::RigidBodyHandle;
use rapier2d::geometry::ColliderHandle;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use tracing::debug;

use crate::colliders::{build_shape, derive_geometry, DynamicMaterial, GeometryKind, StaticMaterial};
use crate::error::{PhysicsError, Result};
use crate::space::SimulationSpace;

new_key_type! {
    /// Identifier of a [`Binding`].
    pub struct BindingId;
}

/// How a body moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    /// Moved by the simulation; its mobject follows it.
    Dynamic,
    /// Never moves.
    Static,
}

/// Association of one mobject with its body and collider.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// The bound mobject.
    pub mobject: MobjectId,
    /// The body. For static bindings this is the space's static anchor.
    pub body: RigidBodyHandle,
    /// The collider.
    pub collider: ColliderHandle,
    /// Body kind.
    pub kind: BodyKind,
    /// Collider geometry in the body frame.
    pub geometry: GeometryKind,
    /// Body angle applied to the mobject by the last sync.
    pub last_synced_angle: f64,
}

/// Arena of bindings indexed by mobject.
#[derive(Debug, Default)]
pub struct Bindings {
    arena: SlotMap<BindingId, Binding>,
    by_mobject: HashMap<MobjectId, BindingId>,
}

impl Bindings {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether no mobject is bound.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Look up a binding.
    pub fn get(&self, id: BindingId) -> Option<&Binding> {
        self.arena.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: BindingId) -> Option<&mut Binding> {
        self.arena.get_mut(id)
    }

    /// Binding id of a mobject, if bound.
    pub fn binding_id(&self, mobject: MobjectId) -> Option<BindingId> {
        self.by_mobject.get(&mobject).copied()
    }

    /// Binding of a mobject, if bound.
    pub fn binding_of(&self, mobject: MobjectId) -> Option<&Binding> {
        self.binding_id(mobject).and_then(|id| self.arena.get(id))
    }

    /// Binding of a mobject, failing with [`PhysicsError::NotBound`].
    pub fn require(&self, mobject: MobjectId) -> Result<&Binding> {
        self.binding_of(mobject)
            .ok_or(PhysicsError::NotBound(mobject))
    }

    /// Iterate over bindings in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.arena.iter()
    }

    /// Give a mobject a dynamic body.
    ///
    /// Binding an already dynamic mobject returns the existing binding and
    /// wakes its body if it was put to sleep.
    pub fn bind_dynamic(
        &mut self,
        space: &mut SimulationSpace,
        scene: &Scene,
        mobject: MobjectId,
        material: &DynamicMaterial,
    ) -> Result<BindingId> {
        material.validate()?;

        if let Some(id) = self.binding_id(mobject) {
            let binding = &self.arena[id];
            if binding.kind != BodyKind::Dynamic {
                return Err(PhysicsError::AlreadyBound {
                    mobject,
                    kind: binding.kind,
                });
            }
            if space.is_sleeping(binding.body) == Some(true) {
                space.wake(binding.body)?;
                debug!(?mobject, "woke rebound body");
            }
            return Ok(id);
        }

        let geometry = derive_geometry(scene, mobject, space.config().fallback)?;
        let shape = build_shape(&geometry.kind, mobject)?;
        let (body, collider) = space.insert_dynamic(geometry.pose, shape, material);

        let id = self.arena.insert(Binding {
            mobject,
            body,
            collider,
            kind: BodyKind::Dynamic,
            geometry: geometry.kind,
            last_synced_angle: geometry.pose.angle,
        });
        self.by_mobject.insert(mobject, id);
        debug!(?mobject, ?material, "bound dynamic body");
        Ok(id)
    }

    /// Give a mobject static colliders.
    ///
    /// Groups are expanded: every leaf gets its own collider on the static
    /// anchor. Leaves that are already static are left alone.
    pub fn bind_static(
        &mut self,
        space: &mut SimulationSpace,
        scene: &Scene,
        mobject: MobjectId,
        material: &StaticMaterial,
    ) -> Result<Vec<BindingId>> {
        material.validate()?;

        let mut ids = Vec::new();
        for leaf in scene.leaves(mobject)? {
            if let Some(id) = self.binding_id(leaf) {
                let kind = self.arena[id].kind;
                if kind != BodyKind::Static {
                    return Err(PhysicsError::AlreadyBound {
                        mobject: leaf,
                        kind,
                    });
                }
                ids.push(id);
                continue;
            }

            let geometry = derive_geometry(scene, leaf, space.config().fallback)?;
            let shape = build_shape(&geometry.kind, leaf)?;
            let collider = space.insert_static(geometry.pose, shape, material);
            let id = self.arena.insert(Binding {
                mobject: leaf,
                body: space.static_anchor(),
                collider,
                kind: BodyKind::Static,
                geometry: geometry.kind,
                last_synced_angle: geometry.pose.angle,
            });
            self.by_mobject.insert(leaf, id);
            debug!(mobject = ?leaf, ?material, "bound static collider");
            ids.push(id);
        }
        Ok(ids)
    }

    /// Put the dynamic bodies of a mobject, or of every member of a group, to
    /// sleep.
    ///
    /// Returns how many bodies were put to sleep. Fails with
    /// [`PhysicsError::NotBound`] when nothing under `mobject` is bound.
    pub fn unbind_to_sleep(
        &mut self,
        space: &mut SimulationSpace,
        scene: &Scene,
        mobject: MobjectId,
    ) -> Result<usize> {
        let mut found = false;
        let mut slept = 0;
        for id in scene.descendants(mobject)? {
            let Some(binding) = self.binding_of(id) else {
                continue;
            };
            found = true;
            if binding.kind == BodyKind::Dynamic {
                space.sleep(binding.body)?;
                slept += 1;
            }
        }
        if !found {
            return Err(PhysicsError::NotBound(mobject));
        }
        debug!(?mobject, slept, "put bodies to sleep");
        Ok(slept)
    }
}
