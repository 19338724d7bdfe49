use bevy::{
    app::{App, Plugin, PostUpdate},
    ecs::{
        intern::Interned,
        schedule::{IntoScheduleConfigs, ScheduleLabel, SystemSet},
    },
    transform::TransformSystems,
};
use bevy_avatar_animation_core::{
    action::{LoopMode, PlaybackState},
    animation_clip::{ClipOrigin, Interpolation, TrackProperty},
    correction::{Correction, CorrectionKind},
    playback::ControlMode,
    rig::{NodeKind, RigId},
};

use crate::avatar::{
    AvatarIssueReport, AvatarRigEntities, bind_rig_entities, report_avatar_issues,
    sync_rig_entities, tick_avatars,
};

/// Drives every [`Avatar`](crate::avatar::Avatar) in the world.
pub struct AvatarAnimationPlugin {
    pub schedule: Interned<dyn ScheduleLabel>,
}

impl Default for AvatarAnimationPlugin {
    fn default() -> Self {
        Self {
            schedule: PostUpdate.intern(),
        }
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, SystemSet)]
pub enum AvatarAnimationSet {
    /// Maps rig nodes of newly loaded avatars to entities.
    Bind,
    /// Advances playback, runs the safety pass and expression transitions.
    Animate,
    /// Writes rig state back to entities and collects issues.
    Sync,
}

impl Plugin for AvatarAnimationPlugin {
    fn build(&self, app: &mut App) {
        self.register_types(app);
        app.init_resource::<AvatarIssueReport>();

        app.configure_sets(
            self.schedule,
            (
                AvatarAnimationSet::Bind,
                AvatarAnimationSet::Animate,
                AvatarAnimationSet::Sync,
            )
                .chain()
                .before(TransformSystems::Propagate),
        );

        app.add_systems(
            self.schedule,
            bind_rig_entities.in_set(AvatarAnimationSet::Bind),
        )
        .add_systems(
            self.schedule,
            tick_avatars.in_set(AvatarAnimationSet::Animate),
        )
        .add_systems(
            self.schedule,
            (sync_rig_entities, report_avatar_issues)
                .chain()
                .in_set(AvatarAnimationSet::Sync),
        );
    }
}

impl AvatarAnimationPlugin {
    fn register_types(&self, app: &mut App) {
        app //
            .register_type::<AvatarRigEntities>()
            .register_type::<RigId>()
            .register_type::<NodeKind>()
            .register_type::<ClipOrigin>()
            .register_type::<Interpolation>()
            .register_type::<TrackProperty>()
            .register_type::<LoopMode>()
            .register_type::<PlaybackState>()
            .register_type::<ControlMode>()
            .register_type::<Correction>()
            .register_type::<CorrectionKind>();
    }
}
