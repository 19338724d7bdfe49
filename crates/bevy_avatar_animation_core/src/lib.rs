//! Engine-independent core of `bevy_avatar_animation`.
//!
//! An [`AvatarAnimator`](animator::AvatarAnimator) takes a [`Rig`](rig::Rig) and two pools of
//! clips, decides which pool to trust, and from then on plays one action at a time on the rig,
//! keeps the rig from collapsing under bad tracks and blends facial expressions.
//!
//! Everything here is plain data driven through [`AvatarAnimator::tick`](animator::AvatarAnimator::tick),
//! so it can be tested without an `App`.

pub mod action;
pub mod animation_clip;
pub mod animator;
pub mod config;
pub mod correction;
pub mod errors;
pub mod expression;
pub mod interpolation;
pub mod playback;
pub mod retargeting;
pub mod rig;
pub mod source;

pub mod prelude {
    pub use super::action::{Action, ActionRegistry, LoopMode, PlaybackState};
    pub use super::animation_clip::{Clip, ClipOrigin, Interpolation, Keyframes, Track};
    pub use super::animator::AvatarAnimator;
    pub use super::config::AvatarConfig;
    pub use super::errors::{AvatarIssue, ConfigError, IssueLog};
    pub use super::expression::{ExpressionCatalog, NEUTRAL};
    pub use super::playback::ControlMode;
    pub use super::rig::{BlendShapeTable, NodeKind, Rig, RigId};
    pub use super::source::ClipSources;
}
