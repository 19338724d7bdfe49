use crate::{
    animation_clip::{Clip, TrackProperty},
    errors::{AvatarIssue, IssueLog},
};

/// Drops translation and scale tracks from clips authored for a foreign skeleton.
///
/// Foreign translation/scale data assumes the source skeleton's proportions and is the usual
/// cause of a sunken, stretched or vanished character. Only rotations are kept. Embedded and
/// synthesized clips are left untouched.
///
/// Returns the number of dropped tracks. Running it twice is a no-op the second time.
pub fn filter_foreign_tracks(clip: &mut Clip, issues: &mut IssueLog) -> usize {
    if !clip.origin().is_foreign() {
        return 0;
    }

    let clip_name = clip.name().to_string();
    let before = clip.tracks().len();

    clip.tracks_mut().retain(|track| {
        let keep = is_safe_property(track.property());
        if !keep {
            issues.report(AvatarIssue::FilteredTrack {
                clip: clip_name.clone(),
                track: track.name(),
            });
        }
        keep
    });

    before - clip.tracks().len()
}

pub fn is_safe_property(property: TrackProperty) -> bool {
    matches!(property, TrackProperty::Rotation)
}
