use std::collections::VecDeque;

use bevy::prelude::*;
use bevy_avatar_animation_core::{
    animator::AvatarAnimator,
    config::AvatarConfig,
    errors::AvatarIssue,
    rig::{Rig, RigId},
};

/// An animated character. Load a rig into it with
/// [`AvatarAnimator::load_character`]; the plugin ticks it and copies the pose onto the
/// entities listed in [`AvatarRigEntities`].
#[derive(Component, Deref, DerefMut, Default)]
pub struct Avatar {
    animator: AvatarAnimator,
}

impl Avatar {
    pub fn new(config: AvatarConfig) -> Self {
        Self {
            animator: AvatarAnimator::new(config),
        }
    }

    pub fn from_animator(animator: AvatarAnimator) -> Self {
        Self { animator }
    }

    pub fn animator(&self) -> &AvatarAnimator {
        &self.animator
    }

    pub fn animator_mut(&mut self) -> &mut AvatarAnimator {
        &mut self.animator
    }
}

/// Entity for each rig node, by node index. Inserted automatically by name lookup below the
/// avatar entity, and looked up again whenever the avatar loads another rig or nothing matched
/// yet.
#[derive(Component, Debug, Default, Clone, Reflect)]
#[reflect(Component, Default)]
pub struct AvatarRigEntities {
    /// Rig the indices below refer to.
    pub rig: Option<RigId>,
    pub nodes: Vec<Option<Entity>>,
}

impl AvatarRigEntities {
    /// Matches rig nodes to entities by exact name. The first entity with a given name wins.
    pub fn resolve<'a>(rig: &Rig, named: impl IntoIterator<Item = (Entity, &'a str)>) -> Self {
        let mut nodes = vec![None; rig.len()];
        for (entity, name) in named {
            if let Some(index) = rig.find(name)
                && nodes[index].is_none()
            {
                nodes[index] = Some(entity);
            }
        }
        Self {
            rig: Some(rig.id()),
            nodes,
        }
    }

    pub fn is_bound_to(&self, rig: &Rig) -> bool {
        self.rig == Some(rig.id())
    }

    /// Stale bindings and empty ones, e.g. a scene whose children were not spawned yet, are
    /// resolved again.
    pub fn needs_rebind(&self, rig: &Rig) -> bool {
        !self.is_bound_to(rig) || self.bound_count() == 0
    }

    pub fn get(&self, node: usize) -> Option<Entity> {
        self.nodes.get(node).copied().flatten()
    }

    pub fn bound_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }
}

/// Issues drained from every avatar, most recent last.
#[derive(Resource, Debug, Default)]
pub struct AvatarIssueReport {
    pub recent: VecDeque<(Entity, AvatarIssue)>,
    pub total: usize,
    pub capacity: usize,
}

impl AvatarIssueReport {
    pub const DEFAULT_CAPACITY: usize = 128;

    pub fn push(&mut self, entity: Entity, issue: AvatarIssue) {
        let capacity = if self.capacity == 0 {
            Self::DEFAULT_CAPACITY
        } else {
            self.capacity
        };
        while self.recent.len() >= capacity {
            self.recent.pop_front();
        }
        self.recent.push_back((entity, issue));
        self.total += 1;
    }

    pub fn for_entity(&self, entity: Entity) -> impl Iterator<Item = &AvatarIssue> {
        self.recent
            .iter()
            .filter(move |(e, _)| *e == entity)
            .map(|(_, issue)| issue)
    }
}
