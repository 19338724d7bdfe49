//! Renaming of foreign clip tracks onto the bones of the loaded [`Rig`].
//!
//! Only [`NodeKind::Bone`] nodes are targets. Resolution order for a foreign bone name, first
//! hit wins:
//! 1. exact name of a rig bone,
//! 2. an alias from the [`BoneAliasTable`] that names a rig bone, following chained rewrites,
//! 3. case-insensitive substring containment in either direction.

mod alias;
mod filter;

pub use alias::*;
pub use filter::*;

use bevy::{
    log::debug,
    platform::collections::{HashMap, HashSet},
};

use crate::{
    animation_clip::{Clip, TrackTarget},
    errors::{AvatarIssue, IssueLog},
    rig::{NodeKind, Rig},
};

/// Outcome of resolving one foreign bone name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoneMatch {
    Exact(usize),
    Alias(usize),
    Fuzzy(usize),
    Unmatched,
}

impl BoneMatch {
    pub fn index(&self) -> Option<usize> {
        match self {
            BoneMatch::Exact(i) | BoneMatch::Alias(i) | BoneMatch::Fuzzy(i) => Some(*i),
            BoneMatch::Unmatched => None,
        }
    }
}

pub struct BoneResolver<'a> {
    rig: &'a Rig,
    aliases: &'a BoneAliasTable,
    bones: HashMap<&'a str, usize>,
    lowercase_names: Vec<(usize, String)>,
}

impl<'a> BoneResolver<'a> {
    pub fn new(rig: &'a Rig, aliases: &'a BoneAliasTable) -> Self {
        let mut bones = HashMap::new();
        let mut lowercase_names = Vec::new();
        for (index, bone) in rig.bones().iter().enumerate() {
            if bone.kind() != NodeKind::Bone {
                continue;
            }
            bones.entry(bone.name()).or_insert(index);
            lowercase_names.push((index, bone.name().to_lowercase()));
        }

        Self {
            rig,
            aliases,
            bones,
            lowercase_names,
        }
    }

    pub fn rig(&self) -> &Rig {
        self.rig
    }

    fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.get(name).copied()
    }

    pub fn resolve(&self, foreign: &str) -> BoneMatch {
        if let Some(index) = self.find_bone(foreign) {
            return BoneMatch::Exact(index);
        }

        if let Some(index) = self
            .aliases
            .candidates(foreign)
            .find_map(|candidate| self.find_bone(&candidate))
        {
            return BoneMatch::Alias(index);
        }

        self.fuzzy(foreign)
            .map(BoneMatch::Fuzzy)
            .unwrap_or(BoneMatch::Unmatched)
    }

    /// Among the bones whose lowercased name contains, or is contained in, the lowercased
    /// foreign name, picks the one closest in length. Ties go to the earlier bone.
    fn fuzzy(&self, foreign: &str) -> Option<usize> {
        let foreign = foreign.to_lowercase();
        if foreign.is_empty() {
            return None;
        }

        self.lowercase_names
            .iter()
            .filter(|(_, name)| {
                !name.is_empty() && (foreign.contains(name.as_str()) || name.contains(&foreign))
            })
            .min_by_key(|(index, name)| (name.len().abs_diff(foreign.len()), *index))
            .map(|(index, _)| *index)
    }

    /// Renames every track of `clip` onto rig bones, dropping the tracks that match nothing.
    ///
    /// Returns `None` when no track survives. When two foreign tracks land on the same bone
    /// property, the first one is kept.
    pub fn retarget_clip(&self, mut clip: Clip, issues: &mut IssueLog) -> Option<Clip> {
        let clip_name = clip.name().to_string();
        let mut seen: HashSet<TrackTarget> = HashSet::default();

        clip.tracks_mut().retain_mut(|track| {
            let resolved = self.resolve(track.bone());
            let Some(index) = resolved.index() else {
                issues.report(AvatarIssue::UnmatchedTrack {
                    clip: clip_name.clone(),
                    track: track.name(),
                });
                return false;
            };

            if !matches!(resolved, BoneMatch::Exact(_)) {
                let bone_name = self.rig.bones()[index].name();
                debug!(
                    "clip {clip_name:?}: {:?} retargeted to {bone_name:?} ({resolved:?})",
                    track.bone()
                );
                track.set_bone(bone_name);
            }

            if !seen.insert(track.target()) {
                debug!("clip {clip_name:?}: duplicate track {} ignored", track.name());
                return false;
            }
            true
        });

        clip.is_usable().then_some(clip)
    }
}

#[cfg(test)]
mod tests {
    use bevy::{math::Quat, transform::components::Transform};

    use super::*;
    use crate::animation_clip::{ClipOrigin, Track};

    fn rig(names: &[&str]) -> Rig {
        let mut rig = Rig::new();
        let mut parent = None;
        for name in names {
            parent = Some(rig.add_bone(*name, parent));
        }
        rig
    }

    #[test]
    fn exact_beats_alias_beats_fuzzy() {
        let rig = rig(&["Hips", "Spine", "Head", "mixamorigHead"]);
        let aliases = BoneAliasTable::builtin();
        let resolver = BoneResolver::new(&rig, &aliases);

        assert_eq!(resolver.resolve("mixamorigHead"), BoneMatch::Exact(3));
        assert_eq!(resolver.resolve("mixamorigHips"), BoneMatch::Alias(0));
        assert_eq!(resolver.resolve("CC_Base_Spine"), BoneMatch::Fuzzy(1));
        assert_eq!(resolver.resolve("Tail"), BoneMatch::Unmatched);
    }

    #[test]
    fn fuzzy_prefers_closest_length_then_bone_order() {
        let rig = rig(&["Spine", "Spine1", "Spine2", "LeftHand", "LeftHandIndex1"]);
        let aliases = BoneAliasTable::empty();
        let resolver = BoneResolver::new(&rig, &aliases);

        assert_eq!(resolver.resolve("vendor_spine1"), BoneMatch::Fuzzy(1));
        assert_eq!(resolver.resolve("spin"), BoneMatch::Fuzzy(0));
        assert_eq!(resolver.resolve("Char_LeftHand"), BoneMatch::Fuzzy(3));
        assert_eq!(resolver.resolve(""), BoneMatch::Unmatched);
    }

    #[test]
    fn prefixed_exports_skip_container_nodes() {
        let mut rig = Rig::new();
        let armature = rig.add_node("Armature", None, NodeKind::Group, Transform::IDENTITY);
        let hips = rig.add_bone("Hips", Some(armature));
        rig.add_bone("Head", Some(hips));
        rig.add_node("Body", Some(armature), NodeKind::SkinnedMesh, Transform::IDENTITY);
        let aliases = BoneAliasTable::builtin();
        let resolver = BoneResolver::new(&rig, &aliases);

        assert_eq!(resolver.resolve("Armature|mixamorig:Hips"), BoneMatch::Alias(1));
        assert_eq!(resolver.resolve("Armature/mixamorigHead"), BoneMatch::Alias(2));
        assert_eq!(resolver.resolve("Armature"), BoneMatch::Unmatched);
        assert_eq!(resolver.resolve("Body"), BoneMatch::Unmatched);
        assert_eq!(resolver.resolve("Armature|Tail"), BoneMatch::Unmatched);
    }

    #[test]
    fn resolution_is_deterministic() {
        let rig = rig(&["Hips", "Spine", "Head"]);
        let aliases = BoneAliasTable::builtin();
        let resolver = BoneResolver::new(&rig, &aliases);
        let first = resolver.resolve("Bip01 Spine");
        for _ in 0..10 {
            assert_eq!(resolver.resolve("Bip01 Spine"), first);
        }
    }

    #[test]
    fn retarget_renames_and_drops() {
        let rig = rig(&["Hips", "Spine", "Head"]);
        let aliases = BoneAliasTable::builtin();
        let resolver = BoneResolver::new(&rig, &aliases);
        let mut issues = IssueLog::default();
        let clip = Clip::new(
            "Wave",
            ClipOrigin::Retargeted,
            vec![
                Track::rotation("mixamorigHips", vec![0.], vec![Quat::IDENTITY]),
                Track::rotation("mixamorig:Hips", vec![0.], vec![Quat::IDENTITY]),
                Track::rotation("mixamorigTail", vec![0.], vec![Quat::IDENTITY]),
            ],
        );

        let clip = resolver.retarget_clip(clip, &mut issues).unwrap();
        assert_eq!(clip.track_names(), vec!["Hips.rotation"]);
        assert_eq!(issues.len(), 1);
        assert!(issues.contains(|i| matches!(i, AvatarIssue::UnmatchedTrack { track, .. } if track == "mixamorigTail.rotation")));
    }

    #[test]
    fn clip_without_matches_is_unusable() {
        let rig = rig(&["Hips"]);
        let aliases = BoneAliasTable::builtin();
        let resolver = BoneResolver::new(&rig, &aliases);
        let clip = Clip::new(
            "Tail wag",
            ClipOrigin::Retargeted,
            vec![Track::rotation("Tail", vec![0.], vec![Quat::IDENTITY])],
        );
        assert!(resolver.retarget_clip(clip, &mut IssueLog::default()).is_none());
    }
}
