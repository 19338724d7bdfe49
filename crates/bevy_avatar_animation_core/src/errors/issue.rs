use std::collections::VecDeque;

use bevy::log::{Level, debug, warn};
use thiserror::Error;

use crate::animation_clip::ClipOrigin;

/// Non-fatal problems noticed while loading or driving an avatar.
///
/// None of these ever cross the public interface as a `Result`: they are logged
/// when raised and collected into an [`IssueLog`] for the host to inspect.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AvatarIssue {
    #[error("clip {clip:?}: no rig bone matches track {track:?}, track dropped")]
    UnmatchedTrack { clip: String, track: String },
    #[error("clip {clip:?}: foreign track {track:?} moves or scales the rig, track dropped")]
    FilteredTrack { clip: String, track: String },
    #[error("clip {clip:?} ({origin:?}) has no usable tracks left, clip excluded")]
    UnusableClip { clip: String, origin: ClipOrigin },
    #[error("no retargeted or embedded clip survived, synthesized fallback {clip:?} on node {node:?}")]
    FallbackSynthesized { clip: String, node: String },
    #[error("no animatable node found, avatar stays in its static pose")]
    NoAnimatableNode,
    #[error("requested action {0:?} is not available")]
    UnknownAction(String),
    #[error("requested expression {0:?} is not in the catalog")]
    UnknownExpression(String),
    #[error("expression {0:?} has no blend shapes on this rig")]
    NoMatchingBlendShapes(String),
    #[error("rig exposes no blend shapes, expression {0:?} ignored")]
    NoBlendShapes(String),
}

impl AvatarIssue {
    /// Track-level issues are the noisy ones: a foreign clip can drop dozens of them.
    pub fn is_track_level(&self) -> bool {
        matches!(
            self,
            AvatarIssue::UnmatchedTrack { .. } | AvatarIssue::FilteredTrack { .. }
        )
    }
}

/// Bounded side channel of [`AvatarIssue`]s. Oldest entries are dropped first.
#[derive(Debug, Clone)]
pub struct IssueLog {
    entries: VecDeque<AvatarIssue>,
    capacity: usize,
    quiet_track_warnings: bool,
    total: usize,
}

impl Default for IssueLog {
    fn default() -> Self {
        Self::new(256, false)
    }
}

impl IssueLog {
    pub fn new(capacity: usize, quiet_track_warnings: bool) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
            quiet_track_warnings,
            total: 0,
        }
    }

    /// Level `issue` is logged at. Quiet logs demote track-level issues to debug.
    pub fn log_level(&self, issue: &AvatarIssue) -> Level {
        if self.quiet_track_warnings && issue.is_track_level() {
            Level::DEBUG
        } else {
            Level::WARN
        }
    }

    /// Logs the issue and keeps it for later inspection.
    pub fn report(&mut self, issue: AvatarIssue) {
        if self.log_level(&issue) == Level::DEBUG {
            debug!("{issue}");
        } else {
            warn!("{issue}");
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(issue);
        self.total += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = &AvatarIssue> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of issues reported since creation, including evicted ones.
    pub fn total_reported(&self) -> usize {
        self.total
    }

    pub fn drain(&mut self) -> Vec<AvatarIssue> {
        self.entries.drain(..).collect()
    }

    pub fn contains(&self, predicate: impl Fn(&AvatarIssue) -> bool) -> bool {
        self.entries.iter().any(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_issues_are_evicted() {
        let mut log = IssueLog::new(2, true);
        log.report(AvatarIssue::UnknownAction("a".into()));
        log.report(AvatarIssue::UnknownAction("b".into()));
        log.report(AvatarIssue::UnknownAction("c".into()));

        assert_eq!(log.len(), 2);
        assert_eq!(log.total_reported(), 3);
        assert_eq!(
            log.drain(),
            vec![
                AvatarIssue::UnknownAction("b".into()),
                AvatarIssue::UnknownAction("c".into())
            ]
        );
        assert!(log.is_empty());
    }

    #[test]
    fn quiet_logs_demote_only_track_issues() {
        let unmatched = AvatarIssue::UnmatchedTrack {
            clip: "Wave".into(),
            track: "Tail.rotation".into(),
        };
        let filtered = AvatarIssue::FilteredTrack {
            clip: "Wave".into(),
            track: "Hips.translation".into(),
        };
        let unknown = AvatarIssue::UnknownAction("Dance".into());

        let quiet = IssueLog::new(8, true);
        assert_eq!(quiet.log_level(&unmatched), Level::DEBUG);
        assert_eq!(quiet.log_level(&filtered), Level::DEBUG);
        assert_eq!(quiet.log_level(&unknown), Level::WARN);

        let loud = IssueLog::new(8, false);
        assert_eq!(loud.log_level(&unmatched), Level::WARN);
        assert_eq!(loud.log_level(&unknown), Level::WARN);
    }
}
