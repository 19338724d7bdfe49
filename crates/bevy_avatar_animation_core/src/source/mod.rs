//! Decides which clip source drives an avatar.
//!
//! Sources are tried in priority order: clips retargeted from a foreign library, clips embedded
//! in the character asset, then a procedural fallback. The first source that yields at least one
//! bindable clip wins; lower sources are not consulted.

pub mod fallback;

use bevy::log::{debug, info};

use crate::{
    action::ActionRegistry,
    animation_clip::{Clip, ClipOrigin},
    config::FallbackConfig,
    errors::{AvatarIssue, IssueLog},
    retargeting::{BoneAliasTable, BoneResolver, filter_foreign_tracks},
    rig::Rig,
};

/// Raw clips handed over by the host, before any selection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClipSources {
    /// Clips authored for another skeleton, usually a shared animation library.
    pub retargeted: Vec<Clip>,
    /// Clips that shipped with the character.
    pub embedded: Vec<Clip>,
}

impl ClipSources {
    pub fn new(retargeted: Vec<Clip>, embedded: Vec<Clip>) -> Self {
        Self {
            retargeted,
            embedded,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.retargeted.is_empty() && self.embedded.is_empty()
    }
}

/// What a strategy gets to look at.
pub struct SourceContext<'a> {
    pub rig: &'a Rig,
    pub aliases: &'a BoneAliasTable,
    pub fallback: &'a FallbackConfig,
    pub issues: &'a mut IssueLog,
}

/// One rung of the selection ladder.
pub trait ClipSourceStrategy: Send + Sync {
    fn origin(&self) -> ClipOrigin;

    /// Usable clips from this source, tagged with [`Self::origin`]. An empty list means the
    /// source has nothing to offer.
    fn produce(&self, sources: &ClipSources, ctx: &mut SourceContext) -> Vec<Clip>;
}

pub struct RetargetedSource;

impl ClipSourceStrategy for RetargetedSource {
    fn origin(&self) -> ClipOrigin {
        ClipOrigin::Retargeted
    }

    fn produce(&self, sources: &ClipSources, ctx: &mut SourceContext) -> Vec<Clip> {
        let resolver = BoneResolver::new(ctx.rig, ctx.aliases);
        let mut clips = vec![];

        for clip in &sources.retargeted {
            let clip = clip.clone().with_origin(ClipOrigin::Retargeted);
            let name = clip.name().to_string();
            let Some(mut clip) = resolver.retarget_clip(clip, ctx.issues) else {
                ctx.issues.report(AvatarIssue::UnusableClip {
                    clip: name,
                    origin: ClipOrigin::Retargeted,
                });
                continue;
            };
            filter_foreign_tracks(&mut clip, ctx.issues);
            if clip.is_usable() {
                clips.push(clip);
            } else {
                ctx.issues.report(AvatarIssue::UnusableClip {
                    clip: name,
                    origin: ClipOrigin::Retargeted,
                });
            }
        }

        clips
    }
}

pub struct EmbeddedSource;

impl ClipSourceStrategy for EmbeddedSource {
    fn origin(&self) -> ClipOrigin {
        ClipOrigin::Embedded
    }

    fn produce(&self, sources: &ClipSources, ctx: &mut SourceContext) -> Vec<Clip> {
        sources
            .embedded
            .iter()
            .filter_map(|clip| {
                if clip.is_usable() {
                    Some(clip.clone().with_origin(ClipOrigin::Embedded))
                } else {
                    ctx.issues.report(AvatarIssue::UnusableClip {
                        clip: clip.name().to_string(),
                        origin: ClipOrigin::Embedded,
                    });
                    None
                }
            })
            .collect()
    }
}

pub struct SynthesizedSource;

impl ClipSourceStrategy for SynthesizedSource {
    fn origin(&self) -> ClipOrigin {
        ClipOrigin::Synthesized
    }

    fn produce(&self, _: &ClipSources, ctx: &mut SourceContext) -> Vec<Clip> {
        let clip = fallback::pick_animatable_node(ctx.rig)
            .and_then(|node| Some((node, fallback::breathing_clip(ctx.rig, node, ctx.fallback)?)));

        match clip {
            Some((node, clip)) => {
                ctx.issues.report(AvatarIssue::FallbackSynthesized {
                    clip: clip.name().to_string(),
                    node: ctx.rig.bones()[node].name().to_string(),
                });
                vec![clip]
            }
            None => {
                ctx.issues.report(AvatarIssue::NoAnimatableNode);
                vec![]
            }
        }
    }
}

/// Ordered list of strategies.
pub struct SourceSelector {
    strategies: Vec<Box<dyn ClipSourceStrategy>>,
}

impl Default for SourceSelector {
    fn default() -> Self {
        Self {
            strategies: vec![
                Box::new(RetargetedSource),
                Box::new(EmbeddedSource),
                Box::new(SynthesizedSource),
            ],
        }
    }
}

impl SourceSelector {
    pub fn new(strategies: Vec<Box<dyn ClipSourceStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn origins(&self) -> impl Iterator<Item = ClipOrigin> + '_ {
        self.strategies.iter().map(|s| s.origin())
    }

    /// Binds the clips of the first strategy that produces anything bindable. Returns an empty
    /// registry when every strategy comes up empty.
    pub fn select(&self, sources: &ClipSources, ctx: &mut SourceContext) -> ActionRegistry {
        for strategy in &self.strategies {
            let origin = strategy.origin();
            let clips = strategy.produce(sources, ctx);
            if clips.is_empty() {
                debug!("no {origin:?} clips available");
                continue;
            }

            let registry = ActionRegistry::bind(origin, clips, ctx.rig, ctx.issues);
            if !registry.is_empty() {
                info!("bound {} {origin:?} clips", registry.len());
                return registry;
            }
        }

        ActionRegistry::default()
    }
}
