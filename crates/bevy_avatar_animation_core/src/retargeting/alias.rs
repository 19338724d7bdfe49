use bevy::platform::collections::{HashMap, HashSet};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Mixamo bone suffixes and the names the same joint usually carries on other humanoid exports.
const MIXAMO_HUMANOID: &[(&str, &[&str])] = &[
    ("Hips", &["Hips", "hips", "Pelvis"]),
    ("Spine", &["Spine", "spine"]),
    ("Spine1", &["Spine1", "Chest", "chest"]),
    ("Spine2", &["Spine2", "UpperChest", "upperChest"]),
    ("Neck", &["Neck", "neck"]),
    ("Head", &["Head", "head"]),
    ("LeftShoulder", &["LeftShoulder", "leftShoulder"]),
    ("LeftArm", &["LeftArm", "LeftUpperArm", "leftUpperArm"]),
    ("LeftForeArm", &["LeftForeArm", "LeftLowerArm", "leftLowerArm"]),
    ("LeftHand", &["LeftHand", "leftHand"]),
    ("RightShoulder", &["RightShoulder", "rightShoulder"]),
    ("RightArm", &["RightArm", "RightUpperArm", "rightUpperArm"]),
    ("RightForeArm", &["RightForeArm", "RightLowerArm", "rightLowerArm"]),
    ("RightHand", &["RightHand", "rightHand"]),
    ("LeftUpLeg", &["LeftUpLeg", "LeftUpperLeg", "leftUpperLeg"]),
    ("LeftLeg", &["LeftLeg", "LeftLowerLeg", "leftLowerLeg"]),
    ("LeftFoot", &["LeftFoot", "leftFoot"]),
    ("LeftToeBase", &["LeftToeBase", "LeftToes", "leftToes"]),
    ("RightUpLeg", &["RightUpLeg", "RightUpperLeg", "rightUpperLeg"]),
    ("RightLeg", &["RightLeg", "RightLowerLeg", "rightLowerLeg"]),
    ("RightFoot", &["RightFoot", "rightFoot"]),
    ("RightToeBase", &["RightToeBase", "RightToes", "rightToes"]),
];

const MIXAMO_PREFIXES: &[&str] = &["mixamorig", "mixamorig:", "mixamorig_"];

/// Rewrites are chained at most this many times.
const MAX_REWRITE_DEPTH: usize = 4;

/// Prefix conventions stripped when no explicit alias applies.
const BUILTIN_PATTERNS: &[(&str, &str)] = &[
    (r"^mixamorig\d*[:_]?(?P<bone>.+)$", "$bone"),
    (r"^Bip0?0?1[ _](?P<bone>.+)$", "$bone"),
    (r"^(?:Armature|Root)[|/:](?P<bone>.+)$", "$bone"),
    (r"^[A-Za-z0-9_]+:(?P<bone>.+)$", "$bone"),
];

/// Serializable form of an [`AliasPattern`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasPatternSerial {
    pub pattern: String,
    pub replacement: String,
}

/// Regex rewrite of a foreign bone name, e.g. stripping a vendor prefix.
#[derive(Debug, Clone)]
pub struct AliasPattern {
    pattern: String,
    replacement: String,
    regex: Regex,
}

impl AliasPattern {
    pub fn new(
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let pattern = pattern.into();
        let regex = Regex::new(&pattern).map_err(|source| ConfigError::AliasPattern {
            pattern: pattern.clone(),
            source,
        })?;
        Ok(Self {
            pattern,
            replacement: replacement.into(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn rewrite(&self, input: &str) -> Option<String> {
        let captures = self.regex.captures(input)?;
        let mut out = String::new();
        captures.expand(&self.replacement, &mut out);
        (!out.is_empty() && out != input).then_some(out)
    }
}

impl TryFrom<AliasPatternSerial> for AliasPattern {
    type Error = ConfigError;

    fn try_from(value: AliasPatternSerial) -> Result<Self, Self::Error> {
        Self::new(value.pattern, value.replacement)
    }
}

impl From<&AliasPattern> for AliasPatternSerial {
    fn from(value: &AliasPattern) -> Self {
        Self {
            pattern: value.pattern.clone(),
            replacement: value.replacement.clone(),
        }
    }
}

/// Static mapping from foreign naming conventions to candidate rig bone names.
#[derive(Debug, Clone, Default)]
pub struct BoneAliasTable {
    exact: HashMap<String, Vec<String>>,
    patterns: Vec<AliasPattern>,
}

impl BoneAliasTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Mixamo humanoid names plus the usual vendor prefix rewrites.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (suffix, candidates) in MIXAMO_HUMANOID {
            for prefix in MIXAMO_PREFIXES {
                table.insert(
                    format!("{prefix}{suffix}"),
                    candidates.iter().map(|c| c.to_string()),
                );
            }
        }
        for (pattern, replacement) in BUILTIN_PATTERNS {
            // The builtin patterns are known to compile
            if let Ok(pattern) = AliasPattern::new(*pattern, *replacement) {
                table.patterns.push(pattern);
            }
        }
        table
    }

    /// Adds candidates for `foreign`. Candidates already present keep their position.
    pub fn insert(&mut self, foreign: impl Into<String>, candidates: impl IntoIterator<Item = String>) {
        let entry = self.exact.entry(foreign.into()).or_default();
        for candidate in candidates {
            if !entry.contains(&candidate) {
                entry.push(candidate);
            }
        }
    }

    pub fn push_pattern(&mut self, pattern: AliasPattern) {
        self.patterns.push(pattern);
    }

    /// Merges user-configured aliases on top of this table. User patterns are tried first.
    pub fn extend_from_config(
        &mut self,
        aliases: &IndexMap<String, Vec<String>>,
        patterns: &[AliasPatternSerial],
    ) -> Result<(), ConfigError> {
        for (foreign, candidates) in aliases {
            self.insert(foreign.clone(), candidates.iter().cloned());
        }
        let mut user_patterns = patterns
            .iter()
            .cloned()
            .map(AliasPattern::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        user_patterns.append(&mut self.patterns);
        self.patterns = user_patterns;
        Ok(())
    }

    /// Candidate rig names for a foreign bone, most specific first: explicit aliases, then
    /// pattern rewrites in table order.
    ///
    /// Every candidate is expanded again, breadth first, so stacked prefixes such as
    /// `Armature|mixamorig:Hips` reach `Hips`. Each name appears once.
    pub fn candidates(&self, foreign: &str) -> impl Iterator<Item = String> {
        let mut seen: HashSet<String> = HashSet::default();
        seen.insert(foreign.to_string());
        let mut found = Vec::new();
        let mut level = vec![foreign.to_string()];

        for _ in 0..MAX_REWRITE_DEPTH {
            let mut next = Vec::new();
            for name in &level {
                for candidate in self.rewrites(name) {
                    if seen.insert(candidate.clone()) {
                        next.push(candidate);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            found.extend(next.iter().cloned());
            level = next;
        }

        found.into_iter()
    }

    fn rewrites<'a>(&'a self, name: &'a str) -> impl Iterator<Item = String> + 'a {
        self.exact
            .get(name)
            .into_iter()
            .flatten()
            .cloned()
            .chain(self.patterns.iter().filter_map(move |p| p.rewrite(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_knows_mixamo_humanoid() {
        let table = BoneAliasTable::builtin();
        let candidates: Vec<_> = table.candidates("mixamorig:LeftArm").collect();
        assert_eq!(candidates[..3], ["LeftArm", "LeftUpperArm", "leftUpperArm"]);
    }

    #[test]
    fn patterns_strip_vendor_prefixes() {
        let table = BoneAliasTable::builtin();
        assert!(table.candidates("mixamorig5:LeftHandIndex1").any(|c| c == "LeftHandIndex1"));
        assert!(table.candidates("Bip01 Pelvis").any(|c| c == "Pelvis"));
        assert!(table.candidates("Armature|Neck").any(|c| c == "Neck"));
        assert_eq!(table.candidates("Neck").count(), 0);
    }

    #[test]
    fn rewrites_chain_through_stacked_prefixes() {
        let table = BoneAliasTable::builtin();
        let candidates: Vec<_> = table.candidates("Armature|mixamorig:Hips").collect();

        assert_eq!(candidates[0], "mixamorig:Hips");
        assert!(candidates.iter().any(|c| c == "Hips"));
        let unique: HashSet<_> = candidates.iter().collect();
        assert_eq!(unique.len(), candidates.len());
    }

    #[test]
    fn user_config_is_merged_in_front() {
        let mut table = BoneAliasTable::builtin();
        let mut aliases = IndexMap::new();
        aliases.insert("Bone_Root".to_string(), vec!["Hips".to_string()]);
        table
            .extend_from_config(
                &aliases,
                &[AliasPatternSerial {
                    pattern: r"^rig_(?P<bone>.+)$".into(),
                    replacement: "$bone".into(),
                }],
            )
            .unwrap();

        assert_eq!(table.candidates("Bone_Root").next().as_deref(), Some("Hips"));
        assert_eq!(table.candidates("rig_Spine").next().as_deref(), Some("Spine"));
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        assert!(matches!(
            AliasPattern::new("(unclosed", "$1"),
            Err(ConfigError::AliasPattern { .. })
        ));
    }
}
