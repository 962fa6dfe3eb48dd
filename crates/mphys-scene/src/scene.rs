//! The scene graph: an arena of mobjects with stable ids.

use std::collections::HashSet;

use slotmap::{new_key_type, SlotMap};

use crate::error::{Result, SceneError};
use crate::math::{BoundingBox2, Point2, Vec2};
use crate::mobject::{Mobject, MobjectKind};

new_key_type! {
    /// Stable identifier of a mobject within a [`Scene`].
    pub struct MobjectId;
}

/// A collection of mobjects.
///
/// Groups reference their members by id, so every transform that can reach a
/// group goes through the scene rather than through a single [`Mobject`].
#[derive(Debug, Default, Clone)]
pub struct Scene {
    mobjects: SlotMap<MobjectId, Mobject>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mobject and return its id.
    pub fn add(&mut self, mobject: Mobject) -> MobjectId {
        self.mobjects.insert(mobject)
    }

    /// Add a group of existing mobjects.
    pub fn add_group(&mut self, children: Vec<MobjectId>) -> Result<MobjectId> {
        if let Some(missing) = children.iter().find(|id| !self.mobjects.contains_key(**id)) {
            return Err(SceneError::UnknownMobject(*missing));
        }
        Ok(self.mobjects.insert(Mobject::group(children)))
    }

    /// Number of mobjects, groups included.
    pub fn len(&self) -> usize {
        self.mobjects.len()
    }

    /// Whether the scene holds no mobjects.
    pub fn is_empty(&self) -> bool {
        self.mobjects.is_empty()
    }

    /// Whether `id` names a mobject in this scene.
    pub fn contains(&self, id: MobjectId) -> bool {
        self.mobjects.contains_key(id)
    }

    /// Look up a mobject.
    pub fn get(&self, id: MobjectId) -> Option<&Mobject> {
        self.mobjects.get(id)
    }

    /// Look up a mobject, failing if it does not exist.
    pub fn mobject(&self, id: MobjectId) -> Result<&Mobject> {
        self.mobjects.get(id).ok_or(SceneError::UnknownMobject(id))
    }

    fn mobject_mut(&mut self, id: MobjectId) -> Result<&mut Mobject> {
        self.mobjects.get_mut(id).ok_or(SceneError::UnknownMobject(id))
    }

    /// Iterate over all mobjects.
    pub fn iter(&self) -> impl Iterator<Item = (MobjectId, &Mobject)> {
        self.mobjects.iter()
    }

    /// Direct members of a group; empty for leaves.
    pub fn children(&self, id: MobjectId) -> Result<&[MobjectId]> {
        match self.mobject(id)?.kind() {
            MobjectKind::Group { children } => Ok(children),
            _ => Ok(&[]),
        }
    }

    /// All non-group mobjects reachable from `id`, each listed once.
    ///
    /// A leaf is its own only leaf.
    pub fn leaves(&self, id: MobjectId) -> Result<Vec<MobjectId>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.mobject(current)?.kind() {
                MobjectKind::Group { children } => {
                    stack.extend(children.iter().rev().copied());
                }
                _ => {
                    if seen.insert(current) {
                        out.push(current);
                    }
                }
            }
        }
        Ok(out)
    }

    /// `id` followed by every mobject reachable from it, groups included.
    pub fn descendants(&self, id: MobjectId) -> Result<Vec<MobjectId>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current)?.iter().rev().copied());
        }
        Ok(out)
    }

    /// Bounding box of a mobject or of all leaves of a group.
    pub fn bounding_box(&self, id: MobjectId) -> Result<BoundingBox2> {
        let mobject = self.mobject(id)?;
        if let Some(bbox) = mobject.bounding_box() {
            return Ok(bbox);
        }
        self.leaves(id)?
            .into_iter()
            .filter_map(|leaf| self.mobjects.get(leaf).and_then(Mobject::bounding_box))
            .reduce(|a, b| a.union(&b))
            .ok_or(SceneError::EmptyGroup(id))
    }

    /// Centre of a mobject; for groups, the centre of their bounding box.
    pub fn center(&self, id: MobjectId) -> Result<Point2> {
        match self.mobject(id)?.center() {
            Some(center) => Ok(center),
            None => Ok(self.bounding_box(id)?.center()),
        }
    }

    /// Translate a mobject (and every member of a group) by `delta`.
    pub fn shift(&mut self, id: MobjectId, delta: &Vec2) -> Result<()> {
        for leaf in self.leaves(id)? {
            self.mobject_mut(leaf)?.shift(delta);
        }
        Ok(())
    }

    /// Move a mobject so that its centre lands on `point`.
    pub fn move_to(&mut self, id: MobjectId, point: &Point2) -> Result<()> {
        let delta = point - self.center(id)?;
        self.shift(id, &delta)
    }

    /// Rotate a mobject about its centre by `angle` radians.
    ///
    /// Rotations accumulate: rotating by `a` then by `b` equals rotating by
    /// `a + b`.
    pub fn rotate(&mut self, id: MobjectId, angle: f64) -> Result<()> {
        let about = self.center(id)?;
        for leaf in self.leaves(id)? {
            self.mobject_mut(leaf)?.rotate_about(angle, &about);
        }
        Ok(())
    }

    /// Place the endpoints of a line.
    pub fn put_start_and_end_on(&mut self, id: MobjectId, start: Point2, end: Point2) -> Result<()> {
        if self.mobject_mut(id)?.set_start_and_end(start, end) {
            Ok(())
        } else {
            Err(SceneError::NotALine(id))
        }
    }

    /// Absolute orientation of a mobject, see [`Mobject::orientation`].
    pub fn orientation(&self, id: MobjectId) -> Result<f64> {
        Ok(self.mobject(id)?.orientation())
    }
}
