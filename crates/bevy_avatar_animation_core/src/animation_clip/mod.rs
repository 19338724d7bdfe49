use std::fmt::Display;

use bevy::{
    math::{Quat, Vec3},
    reflect::{Reflect, std_traits::ReflectDefault},
};
use serde::{Deserialize, Serialize};

use crate::interpolation::InterpolateLinear;

/// Interpolation method to use between keyframes.
#[derive(Reflect, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[reflect(Default)]
pub enum Interpolation {
    /// Linear interpolation between the two closest keyframes (spherical for rotations).
    #[default]
    Linear,
    /// Step interpolation, the value of the start keyframe is used.
    Step,
}

/// Where a clip came from. Declaration order is priority order, highest first.
#[derive(Reflect, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClipOrigin {
    /// Authored for a foreign skeleton and renamed onto this rig.
    Retargeted,
    /// Shipped inside the character asset itself.
    Embedded,
    /// Generated procedurally when nothing else is usable.
    Synthesized,
}

impl ClipOrigin {
    /// Tracks of foreign clips cannot be trusted to respect this rig's proportions.
    pub fn is_foreign(&self) -> bool {
        matches!(self, ClipOrigin::Retargeted)
    }
}

#[derive(Reflect, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackProperty {
    Rotation,
    Translation,
    Scale,
}

impl TrackProperty {
    /// Accepts the property spellings used by the common exporters.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "rotation" | "quaternion" => Some(Self::Rotation),
            "translation" | "position" => Some(Self::Translation),
            "scale" => Some(Self::Scale),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rotation => "rotation",
            Self::Translation => "translation",
            Self::Scale => "scale",
        }
    }
}

/// `bone.property` address of a track.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrackTarget {
    pub bone: String,
    pub property: TrackProperty,
}

impl TrackTarget {
    /// Splits a `bone.property` name at its last dot, so bone names may themselves contain dots.
    pub fn parse(name: &str) -> Option<Self> {
        let (bone, property) = name.rsplit_once('.')?;
        if bone.is_empty() {
            return None;
        }
        Some(Self {
            bone: bone.to_string(),
            property: TrackProperty::parse(property)?,
        })
    }
}

impl Display for TrackTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.bone, self.property.as_str())
    }
}

/// Keyframe values of a track. The variant decides the animated property.
#[derive(Clone, Debug, PartialEq)]
pub enum Keyframes {
    Rotation(Vec<Quat>),
    Translation(Vec<Vec3>),
    Scale(Vec<Vec3>),
}

impl Keyframes {
    pub fn property(&self) -> TrackProperty {
        match self {
            Keyframes::Rotation(_) => TrackProperty::Rotation,
            Keyframes::Translation(_) => TrackProperty::Translation,
            Keyframes::Scale(_) => TrackProperty::Scale,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Keyframes::Rotation(v) => v.len(),
            Keyframes::Translation(v) | Keyframes::Scale(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single sampled value of one track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackSample {
    Rotation(Quat),
    Translation(Vec3),
    Scale(Vec3),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    bone: String,
    times: Vec<f32>,
    keyframes: Keyframes,
    interpolation: Interpolation,
}

impl Track {
    /// Builds a track. Times and values are truncated to the shorter of the two.
    pub fn new(bone: impl Into<String>, mut times: Vec<f32>, mut keyframes: Keyframes) -> Self {
        let len = times.len().min(keyframes.len());
        times.truncate(len);
        match &mut keyframes {
            Keyframes::Rotation(v) => v.truncate(len),
            Keyframes::Translation(v) | Keyframes::Scale(v) => v.truncate(len),
        }

        Self {
            bone: bone.into(),
            times,
            keyframes,
            interpolation: Interpolation::Linear,
        }
    }

    pub fn rotation(bone: impl Into<String>, times: Vec<f32>, values: Vec<Quat>) -> Self {
        Self::new(bone, times, Keyframes::Rotation(values))
    }

    pub fn translation(bone: impl Into<String>, times: Vec<f32>, values: Vec<Vec3>) -> Self {
        Self::new(bone, times, Keyframes::Translation(values))
    }

    pub fn scale(bone: impl Into<String>, times: Vec<f32>, values: Vec<Vec3>) -> Self {
        Self::new(bone, times, Keyframes::Scale(values))
    }

    /// Builds a track from an exporter-style `bone.property` name and flat values: four floats
    /// (x, y, z, w) per rotation keyframe, three per translation or scale keyframe.
    ///
    /// Returns `None` when the name does not parse. Trailing floats that do not fill a whole
    /// keyframe are ignored.
    pub fn from_name(name: &str, times: Vec<f32>, values: &[f32]) -> Option<Self> {
        let target = TrackTarget::parse(name)?;
        let keyframes = match target.property {
            TrackProperty::Rotation => Keyframes::Rotation(
                values.chunks_exact(4).map(Quat::from_slice).collect(),
            ),
            TrackProperty::Translation => {
                Keyframes::Translation(values.chunks_exact(3).map(Vec3::from_slice).collect())
            }
            TrackProperty::Scale => {
                Keyframes::Scale(values.chunks_exact(3).map(Vec3::from_slice).collect())
            }
        };
        Some(Self::new(target.bone, times, keyframes))
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn bone(&self) -> &str {
        &self.bone
    }

    /// Points the track at another bone. Used by retargeting once a match is found.
    pub fn set_bone(&mut self, bone: impl Into<String>) {
        self.bone = bone.into();
    }

    pub fn property(&self) -> TrackProperty {
        self.keyframes.property()
    }

    pub fn target(&self) -> TrackTarget {
        TrackTarget {
            bone: self.bone.clone(),
            property: self.property(),
        }
    }

    /// `bone.property` name of this track.
    pub fn name(&self) -> String {
        self.target().to_string()
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    pub fn keyframes(&self) -> &Keyframes {
        &self.keyframes
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.)
    }

    /// Samples the track, holding the first/last keyframe outside the keyed range.
    pub fn sample(&self, time: f32) -> Option<TrackSample> {
        let (prev, next, f) = self.segment(time)?;

        Some(match &self.keyframes {
            Keyframes::Rotation(v) => TrackSample::Rotation(self.mix(&v[prev], &v[next], f)),
            Keyframes::Translation(v) => TrackSample::Translation(self.mix(&v[prev], &v[next], f)),
            Keyframes::Scale(v) => TrackSample::Scale(self.mix(&v[prev], &v[next], f)),
        })
    }

    fn mix<T: InterpolateLinear + Copy>(&self, prev: &T, next: &T, f: f32) -> T {
        match self.interpolation {
            Interpolation::Linear => prev.interpolate_linear(next, f),
            Interpolation::Step => *prev,
        }
    }

    fn segment(&self, time: f32) -> Option<(usize, usize, f32)> {
        let last = self.times.len().checked_sub(1)?;
        let next = self.times.partition_point(|t| *t <= time);
        if next == 0 {
            return Some((0, 0, 0.));
        }
        if next > last {
            return Some((last, last, 0.));
        }

        let prev = next - 1;
        let (t0, t1) = (self.times[prev], self.times[next]);
        let f = if t1 > t0 { (time - t0) / (t1 - t0) } else { 0. };

        Some((prev, next, f))
    }
}

/// Named, fixed-duration set of tracks.
#[derive(Clone, Debug, PartialEq)]
pub struct Clip {
    name: String,
    duration: f32,
    origin: ClipOrigin,
    tracks: Vec<Track>,
}

impl Clip {
    /// Creates a clip whose duration is the latest keyframe time across its tracks.
    pub fn new(name: impl Into<String>, origin: ClipOrigin, tracks: Vec<Track>) -> Self {
        let duration = tracks.iter().map(Track::end_time).fold(0., f32::max);
        Self {
            name: name.into(),
            duration,
            origin,
            tracks,
        }
    }

    pub fn with_origin(mut self, origin: ClipOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_duration(mut self, duration_sec: f32) -> Self {
        self.duration = duration_sec.max(0.);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Duration of the clip, represented in seconds.
    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn origin(&self) -> ClipOrigin {
        self.origin
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut Vec<Track> {
        &mut self.tracks
    }

    /// A clip without tracks cannot animate anything.
    pub fn is_usable(&self) -> bool {
        self.tracks.iter().any(|t| !t.is_empty())
    }

    pub fn track_names(&self) -> Vec<String> {
        self.tracks.iter().map(Track::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_names_split_at_last_dot() {
        let target = TrackTarget::parse("mixamorig:Hips.position").unwrap();
        assert_eq!(target.bone, "mixamorig:Hips");
        assert_eq!(target.property, TrackProperty::Translation);

        let dotted = TrackTarget::parse("Armature.001.quaternion").unwrap();
        assert_eq!(dotted.bone, "Armature.001");
        assert_eq!(dotted.property, TrackProperty::Rotation);
        assert_eq!(dotted.to_string(), "Armature.001.rotation");

        assert!(TrackTarget::parse("Hips.morphTargetInfluences").is_none());
        assert!(TrackTarget::parse(".scale").is_none());
        assert!(TrackTarget::parse("Hips").is_none());
    }

    #[test]
    fn tracks_build_from_exported_names() {
        let track = Track::from_name(
            "mixamorigHips.position",
            vec![0., 1.],
            &[0., 0., 0., 0., 1., 0., 9.],
        )
        .unwrap();
        assert_eq!(track.name(), "mixamorigHips.translation");
        assert_eq!(track.sample(1.), Some(TrackSample::Translation(Vec3::Y)));

        let track = Track::from_name("Head.quaternion", vec![0.], &[0., 0., 0., 1.]).unwrap();
        assert_eq!(track.sample(0.), Some(TrackSample::Rotation(Quat::IDENTITY)));

        assert!(Track::from_name("Head.morphTargetInfluences", vec![0.], &[1.]).is_none());
    }

    #[test]
    fn sampling_interpolates_and_holds_ends() {
        let track = Track::translation(
            "Hips",
            vec![0., 1., 2.],
            vec![Vec3::ZERO, Vec3::X, Vec3::new(3., 0., 0.)],
        );

        assert_eq!(track.sample(-1.), Some(TrackSample::Translation(Vec3::ZERO)));
        assert_eq!(track.sample(0.5), Some(TrackSample::Translation(Vec3::new(0.5, 0., 0.))));
        assert_eq!(track.sample(1.5), Some(TrackSample::Translation(Vec3::new(2., 0., 0.))));
        assert_eq!(track.sample(9.), Some(TrackSample::Translation(Vec3::new(3., 0., 0.))));

        let step = track.with_interpolation(Interpolation::Step);
        assert_eq!(step.sample(1.9), Some(TrackSample::Translation(Vec3::X)));
    }

    #[test]
    fn mismatched_lengths_are_truncated() {
        let track = Track::scale("Hips", vec![0., 1., 2.], vec![Vec3::ONE]);
        assert_eq!(track.times(), &[0.]);
        assert_eq!(track.keyframes().len(), 1);
        assert!(Track::scale("Hips", vec![], vec![]).sample(0.).is_none());
    }

    #[test]
    fn clip_duration_follows_longest_track() {
        let clip = Clip::new(
            "Wave",
            ClipOrigin::Embedded,
            vec![
                Track::rotation("Arm", vec![0., 1.5], vec![Quat::IDENTITY; 2]),
                Track::rotation("Hand", vec![0., 2.5], vec![Quat::IDENTITY; 2]),
            ],
        );
        assert_eq!(clip.duration(), 2.5);
        assert!(clip.is_usable());
        assert!(!Clip::new("Empty", ClipOrigin::Embedded, vec![]).is_usable());
    }
}
