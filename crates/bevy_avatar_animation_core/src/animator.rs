use bevy::log::{debug, info, warn};

use crate::{
    action::{ActionRegistry, PoseBlender},
    animation_clip::ClipOrigin,
    config::AvatarConfig,
    correction::{SafetyCorrector, SafetyRules},
    errors::{AvatarIssue, ConfigError, IssueLog},
    expression::{AdaptedCatalog, ExpressionBlender, ExpressionCatalog},
    playback::{ControlMode, PlaybackController},
    retargeting::BoneAliasTable,
    rig::Rig,
    source::{ClipSources, SourceContext, SourceSelector},
};

/// Drives one avatar: picks its clips, plays them, keeps the rig presentable and blends its
/// facial expressions.
///
/// No operation returns an error. Problems are logged and kept in [`Self::issues`]; the worst
/// outcome is an avatar standing in its rest pose.
pub struct AvatarAnimator {
    config: AvatarConfig,
    aliases: BoneAliasTable,
    selector: SourceSelector,
    catalog: ExpressionCatalog,
    rig: Option<Rig>,
    sources: ClipSources,
    adapted: AdaptedCatalog,
    registry: ActionRegistry,
    controller: PlaybackController,
    blender: ExpressionBlender,
    pose: PoseBlender,
    safety: SafetyCorrector,
    issues: IssueLog,
}

impl Default for AvatarAnimator {
    fn default() -> Self {
        Self::new(AvatarConfig::default())
    }
}

impl AvatarAnimator {
    /// Builds an animator. A config whose alias patterns do not compile falls back to the
    /// builtin aliases; use [`Self::try_new`] to reject it instead.
    pub fn new(config: AvatarConfig) -> Self {
        let aliases = config.alias_table().unwrap_or_else(|err| {
            warn!("{err}, using builtin bone aliases only");
            BoneAliasTable::builtin()
        });
        Self::with_parts(config, aliases)
    }

    pub fn try_new(config: AvatarConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let aliases = config.alias_table()?;
        Ok(Self::with_parts(config, aliases))
    }

    fn with_parts(config: AvatarConfig, aliases: BoneAliasTable) -> Self {
        Self {
            aliases,
            selector: SourceSelector::default(),
            catalog: ExpressionCatalog::canonical(),
            rig: None,
            sources: ClipSources::default(),
            adapted: AdaptedCatalog::default(),
            registry: ActionRegistry::default(),
            controller: PlaybackController::new(&config),
            blender: ExpressionBlender::default(),
            pose: PoseBlender::default(),
            safety: SafetyCorrector::default(),
            issues: IssueLog::new(
                config.reporting.issue_log_capacity,
                config.reporting.quiet_track_warnings,
            ),
            config,
        }
    }

    /// Replaces the expression catalog. Takes effect on the next character load.
    pub fn with_catalog(mut self, catalog: ExpressionCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_selector(mut self, selector: SourceSelector) -> Self {
        debug!(
            "clip source order: {:?}",
            selector.origins().collect::<Vec<_>>()
        );
        self.selector = selector;
        self
    }

    pub fn config(&self) -> &AvatarConfig {
        &self.config
    }

    /// Installs a character. Loading the same rig again only rebuilds the actions when the
    /// clip sources changed; a different rig replaces everything about the previous one.
    pub fn load_character(&mut self, rig: Rig, sources: ClipSources) {
        if self.rig.as_ref().is_some_and(|r| r.id() == rig.id()) {
            debug!("rig {:?} already loaded", rig.id());
            self.set_clip_sources(sources);
            return;
        }

        self.unload();
        self.adapted = AdaptedCatalog::adapt(&self.catalog, rig.blend_shapes());
        info!("loading rig {:?} with {} nodes", rig.id(), rig.len());
        self.rig = Some(rig);
        self.sources = sources;
        self.rebuild_registry();
    }

    /// Swaps the clip pool of the loaded rig, e.g. once clips that were still downloading
    /// arrive. The previous actions are disposed first. Identical sources are ignored.
    pub fn set_clip_sources(&mut self, sources: ClipSources) {
        if sources == self.sources {
            return;
        }
        self.sources = sources;
        if self.rig.is_some() {
            self.rebuild_registry();
        }
    }

    /// Drops the rig and everything bound to it.
    pub fn unload(&mut self) {
        self.controller.reset();
        self.registry.dispose();
        self.blender.reset();
        self.adapted = AdaptedCatalog::default();
        self.sources = ClipSources::default();
        self.rig = None;
    }

    fn rebuild_registry(&mut self) {
        self.registry.dispose();
        let Some(rig) = &mut self.rig else {
            return;
        };
        // A new clip set starts from the rest pose.
        rig.reset_to_rest();
        let rig = &*rig;

        let mut registry = self.selector.select(
            &self.sources,
            &mut SourceContext {
                rig,
                aliases: &self.aliases,
                fallback: &self.config.fallback,
                issues: &mut self.issues,
            },
        );
        self.controller
            .install(&mut registry, &self.config.idle.actions);
        self.registry = registry;
    }

    /// Plays `name` exclusively, or releases back to idle with `None`.
    pub fn request_action(&mut self, name: Option<&str>) {
        self.controller
            .request_action(name, &mut self.registry, &mut self.issues);
    }

    /// Blends towards expression `name` over `duration` seconds, or the configured default.
    pub fn set_expression(&mut self, name: &str, duration: Option<f32>) {
        let Some(rig) = &mut self.rig else {
            self.issues
                .report(AvatarIssue::NoBlendShapes(name.to_string()));
            return;
        };
        let duration = duration.unwrap_or(self.config.expression.default_duration_secs);
        self.blender
            .set_expression(name, duration, rig, &self.adapted, &mut self.issues);
    }

    /// Advances everything by `delta` seconds: idle timer, pose, safety pass, expression.
    pub fn tick(&mut self, delta: f32) {
        let Some(rig) = &mut self.rig else {
            return;
        };
        let delta = if delta.is_finite() { delta.max(0.) } else { 0. };

        self.controller.update(delta, &mut self.registry);
        self.registry.advance(delta);
        self.pose.apply(&self.registry, rig);

        if !self.registry.is_empty() {
            let constraint = self
                .controller
                .explicit_action()
                .and_then(|name| self.config.constraint_for(name));
            let rules = SafetyRules::new(&self.config.safety, constraint);
            self.safety.run(rig, &rules);
        }

        self.blender.tick(delta, rig);
    }

    pub fn list_available_actions(&self) -> Vec<String> {
        self.registry.names().map(str::to_string).collect()
    }

    /// The action currently in control: the explicit one, else the active idle action.
    pub fn current_action(&self) -> Option<&str> {
        self.controller.current_action()
    }

    pub fn current_expression(&self) -> Option<&str> {
        self.blender.current()
    }

    pub fn control_mode(&self) -> ControlMode {
        self.controller.mode()
    }

    pub fn idle_index(&self) -> Option<usize> {
        self.controller.idle_index()
    }

    pub fn active_origin(&self) -> Option<ClipOrigin> {
        self.registry.origin()
    }

    /// A loaded rig that nothing can animate.
    pub fn is_static(&self) -> bool {
        self.rig.is_some() && self.registry.is_empty()
    }

    pub fn rig(&self) -> Option<&Rig> {
        self.rig.as_ref()
    }

    pub fn rig_mut(&mut self) -> Option<&mut Rig> {
        self.rig.as_mut()
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn adapted_catalog(&self) -> &AdaptedCatalog {
        &self.adapted
    }

    pub fn safety(&self) -> &SafetyCorrector {
        &self.safety
    }

    pub fn issues(&self) -> &IssueLog {
        &self.issues
    }

    pub fn drain_issues(&mut self) -> Vec<AvatarIssue> {
        self.issues.drain()
    }
}
