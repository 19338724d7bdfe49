//! # Bevy Avatar Animation
//!
//! **Bevy Avatar Animation** plays animation clips of unknown origin on a character rig, for
//! [Bevy](https://bevyengine.org/).
//!
//! ## Introduction
//!
//! Characters and animation libraries rarely agree on bone names. An [`Avatar`] takes a
//! [`Rig`] and two pools of clips:
//! - *retargeted* clips, authored for some other skeleton (Mixamo, Biped, namespaced exports).
//!   Their tracks are renamed onto the rig through exact names, a bone alias table and finally a
//!   fuzzy substring match. Foreign translation and scale tracks are dropped, as they are the
//!   usual cause of characters sliding away or collapsing.
//! - *embedded* clips, which shipped with the character.
//!
//! Retargeted clips are preferred; embedded ones are only used when no retargeted clip survives.
//! When neither pool has anything usable, a gentle breathing motion is synthesized so the
//! character never looks frozen.
//!
//! One action plays at a time. With no explicit request the avatar rotates through its idle
//! actions on a timer:
//! ```ignore
//!     avatar.request_action(Some("Wave"));
//!     // ...later
//!     avatar.request_action(None); // back to idling
//!     avatar.set_expression("happy", Some(0.4));
//! ```
//!
//! Every tick a safety pass checks skinned meshes for visibility, scale and position drift and
//! repairs them. Facial expressions are adapted to whatever blend shapes the rig exports and
//! blended independently of the skeletal animation.
//!
//! ## Configuration
//!
//! All tuning lives in [`AvatarConfig`], which can be loaded from RON:
//! ```ron
//! (
//!     idle: (actions: ["Idle", "Breathing"], period_secs: 10.0),
//!     playback: (crossfade_secs: 0.3),
//!     retargeting: (aliases: {"Bip01_Pelvis": ["Hips"]}),
//! )
//! ```
//!
//! ## Setup
//!
//! Add [`AvatarAnimationPlugin`] and spawn an [`Avatar`] on the root of the character's scene.
//! Rig nodes are matched to descendant entities by [`Name`] once the avatar has a rig loaded,
//! and again whenever it loads another one. Each frame the pose is copied to their `Transform`
//! and `Visibility`, and facial blend-shape weights to the `MorphWeights` of skinned meshes.
//!
//! [`Avatar`]: crate::avatar::Avatar
//! [`Rig`]: bevy_avatar_animation_core::rig::Rig
//! [`AvatarConfig`]: bevy_avatar_animation_core::config::AvatarConfig
//! [`AvatarAnimationPlugin`]: crate::plugin::AvatarAnimationPlugin
//! [`Name`]: bevy::ecs::name::Name

pub mod avatar;
pub mod plugin;

pub use bevy_avatar_animation_core as core;

pub mod prelude {
    pub use super::avatar::{Avatar, AvatarIssueReport, AvatarRigEntities};
    pub use super::plugin::{AvatarAnimationPlugin, AvatarAnimationSet};
    pub use bevy_avatar_animation_core::prelude::*;
}
