use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    errors::ConfigError,
    retargeting::{AliasPatternSerial, BoneAliasTable},
};

/// Everything tunable about an avatar. Passed to [`AvatarAnimator::new`] once; nothing here is
/// read from process-wide state.
///
/// Every field has a default, so a RON file only needs the settings it changes:
/// ```ron
/// (
///     idle: (actions: ["Idle", "Stretch"], period_secs: 8.0),
///     safety: (action_constraints: {"Jump": VerticalClamp(min: -0.05, max: 0.4)}),
/// )
/// ```
///
/// [`AvatarAnimator::new`]: crate::animator::AvatarAnimator::new
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    pub idle: IdleConfig,
    pub playback: PlaybackConfig,
    pub expression: ExpressionConfig,
    pub safety: SafetyConfig,
    pub retargeting: RetargetingConfig,
    pub fallback: FallbackConfig,
    pub reporting: ReportingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Idle action names, most preferred first. Names missing from the registry are skipped.
    pub actions: Vec<String>,
    /// Seconds between idle rotations.
    pub period_secs: f32,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            actions: vec!["Idle".into(), "Breathing".into(), "LookAround".into()],
            period_secs: 12.,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Fade duration when one action supersedes another. Zero switches instantly.
    pub crossfade_secs: f32,
    pub time_scale: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            crossfade_secs: 0.25,
            time_scale: 1.,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionConfig {
    /// Transition length used when `set_expression` is called without one.
    pub default_duration_secs: f32,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: 0.5,
        }
    }
}

/// Extra per-tick constraint attached to one named action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActionConstraint {
    /// Keeps skinned nodes' vertical position inside `[min, max]` while the action is explicit.
    VerticalClamp { min: f32, max: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Any scale axis below this counts as collapsed.
    pub min_scale: f32,
    /// Largest horizontal offset a skinned node may drift before being snapped back.
    pub max_horizontal: f32,
    /// Clip-specific exceptions, keyed by action name.
    pub action_constraints: IndexMap<String, ActionConstraint>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            min_scale: 1e-3,
            max_horizontal: 2.,
            action_constraints: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetargetingConfig {
    /// Extra foreign name to rig name candidates, tried before the builtin ones.
    pub aliases: IndexMap<String, Vec<String>>,
    pub patterns: Vec<AliasPatternSerial>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub clip_name: String,
    /// Relative scale swing of the breathing motion.
    pub amplitude: f32,
    pub period_secs: f32,
    /// Keyframes per period.
    pub samples: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            clip_name: "ProceduralBreathing".into(),
            amplitude: 0.015,
            period_secs: 3.,
            samples: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Log dropped/filtered tracks at debug instead of warn. Foreign clips can produce a lot.
    pub quiet_track_warnings: bool,
    pub issue_log_capacity: usize,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            quiet_track_warnings: false,
            issue_log_capacity: 256,
        }
    }
}

impl AvatarConfig {
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::de::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_ron_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = ron::de::from_bytes(bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let period = self.idle.period_secs;
        if !(period.is_finite() && period > 0.) {
            return Err(ConfigError::IdlePeriod(self.idle.period_secs));
        }
        for (field, value) in [
            ("playback.crossfade_secs", self.playback.crossfade_secs),
            ("expression.default_duration_secs", self.expression.default_duration_secs),
            ("fallback.period_secs", self.fallback.period_secs),
        ] {
            if !(value.is_finite() && value >= 0.) {
                return Err(ConfigError::NegativeDuration { field, value });
            }
        }
        for (action, constraint) in &self.safety.action_constraints {
            let ActionConstraint::VerticalClamp { min, max } = *constraint;
            if !(min <= max) {
                return Err(ConfigError::EmptyClampRange {
                    action: action.clone(),
                    min,
                    max,
                });
            }
        }
        self.alias_table().map(|_| ())
    }

    /// Builtin aliases with the configured ones merged in front.
    pub fn alias_table(&self) -> Result<BoneAliasTable, ConfigError> {
        let mut table = BoneAliasTable::builtin();
        table.extend_from_config(&self.retargeting.aliases, &self.retargeting.patterns)?;
        Ok(table)
    }

    pub fn constraint_for(&self, action: &str) -> Option<ActionConstraint> {
        self.safety.action_constraints.get(action).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ron_keeps_defaults() {
        let config = AvatarConfig::from_ron_str(
            r#"(
                idle: (actions: ["Idle", "Stretch"], period_secs: 8.0),
                safety: (action_constraints: {"Jump": VerticalClamp(min: -0.05, max: 0.4)}),
                retargeting: (patterns: [(pattern: "^cc_(?P<bone>.+)$", replacement: "$bone")]),
            )"#,
        )
        .unwrap();

        assert_eq!(config.idle.actions, vec!["Idle", "Stretch"]);
        assert_eq!(config.idle.period_secs, 8.);
        assert_eq!(config.playback, PlaybackConfig::default());
        assert_eq!(
            config.constraint_for("Jump"),
            Some(ActionConstraint::VerticalClamp { min: -0.05, max: 0.4 })
        );
        assert!(config.alias_table().unwrap().candidates("cc_Hips").any(|c| c == "Hips"));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(matches!(
            AvatarConfig::from_ron_str("(idle: (period_secs: 0.0))"),
            Err(ConfigError::IdlePeriod(_))
        ));
        assert!(matches!(
            AvatarConfig::from_ron_str("(idle: (period_secs: inf))"),
            Err(ConfigError::IdlePeriod(_))
        ));
        assert!(matches!(
            AvatarConfig::from_ron_str("(expression: (default_duration_secs: inf))"),
            Err(ConfigError::NegativeDuration { .. })
        ));
        assert!(matches!(
            AvatarConfig::from_ron_str("(playback: (crossfade_secs: -1.0))"),
            Err(ConfigError::NegativeDuration { .. })
        ));
        assert!(matches!(
            AvatarConfig::from_ron_str("(retargeting: (patterns: [(pattern: \"(\", replacement: \"\")]))"),
            Err(ConfigError::AliasPattern { .. })
        ));
        assert!(matches!(
            AvatarConfig::from_ron_str(
                "(safety: (action_constraints: {\"Jump\": VerticalClamp(min: 1.0, max: 0.0)}))"
            ),
            Err(ConfigError::EmptyClampRange { .. })
        ));
        assert!(matches!(
            AvatarConfig::from_ron_str("(idle: 3)"),
            Err(ConfigError::Ron(_))
        ));
    }
}
