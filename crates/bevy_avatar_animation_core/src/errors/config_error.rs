use thiserror::Error;

/// Errors produced while building an [`AvatarConfig`](crate::config::AvatarConfig).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not parse RON: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid bone alias pattern {pattern:?}: {source}")]
    AliasPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("idle period must be finite and positive, got {0}")]
    IdlePeriod(f32),
    #[error("{field} must be finite and not negative, got {value}")]
    NegativeDuration { field: &'static str, value: f32 },
    #[error("vertical clamp of action {action:?} has min {min} above max {max}")]
    EmptyClampRange { action: String, min: f32, max: f32 },
}
