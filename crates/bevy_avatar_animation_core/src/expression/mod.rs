//! Facial expressions as sparse blend-shape targets.
//!
//! The canonical [`ExpressionCatalog`] uses ARKit-style shape names. Rigs export all sorts of
//! names, so on every rig load the catalog is turned into an [`AdaptedCatalog`]: targets the rig
//! lacks are dropped, and expressions left empty are rebuilt from name fragments the rig does
//! have.

mod blender;

pub use blender::ExpressionBlender;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::rig::BlendShapeTable;

/// The rest face. Adapts to an empty target set on every rig, which blends everything to zero.
pub const NEUTRAL: &str = "neutral";

/// Fallback rule: every blend shape whose lowercase name contains all `fragments` gets `weight`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FragmentHint {
    pub fragments: Vec<String>,
    pub weight: f32,
}

impl FragmentHint {
    pub fn new(fragments: &[&str], weight: f32) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_lowercase()).collect(),
            weight,
        }
    }

    fn matches(&self, lowercase_name: &str) -> bool {
        !self.fragments.is_empty() && self.fragments.iter().all(|f| lowercase_name.contains(f.as_str()))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    /// Blend-shape name to target weight in `[0, 1]`.
    pub targets: IndexMap<String, f32>,
    /// Tried in order when none of `targets` exist on the rig.
    #[serde(default)]
    pub hints: Vec<FragmentHint>,
}

impl Expression {
    pub fn new(targets: &[(&str, f32)], hints: Vec<FragmentHint>) -> Self {
        Self {
            targets: targets
                .iter()
                .map(|(name, weight)| (name.to_string(), weight.clamp(0., 1.)))
                .collect(),
            hints,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpressionCatalog {
    pub expressions: IndexMap<String, Expression>,
}

impl Default for ExpressionCatalog {
    fn default() -> Self {
        Self::canonical()
    }
}

impl ExpressionCatalog {
    pub fn canonical() -> Self {
        let h = FragmentHint::new;
        let expressions = [
            (NEUTRAL, Expression::default()),
            (
                "happy",
                Expression::new(
                    &[
                        ("mouthSmileLeft", 0.8),
                        ("mouthSmileRight", 0.8),
                        ("cheekSquintLeft", 0.3),
                        ("cheekSquintRight", 0.3),
                        ("eyeSquintLeft", 0.2),
                        ("eyeSquintRight", 0.2),
                    ],
                    vec![
                        h(&["happy"], 1.),
                        h(&["joy"], 1.),
                        h(&["smile"], 0.8),
                        h(&["fun"], 0.8),
                        h(&["cheek", "squint"], 0.3),
                    ],
                ),
            ),
            (
                "sad",
                Expression::new(
                    &[
                        ("mouthFrownLeft", 0.7),
                        ("mouthFrownRight", 0.7),
                        ("browInnerUp", 0.6),
                        ("mouthLowerDownLeft", 0.2),
                        ("mouthLowerDownRight", 0.2),
                    ],
                    vec![
                        h(&["sad"], 1.),
                        h(&["sorrow"], 1.),
                        h(&["frown"], 0.7),
                        h(&["brow", "inner", "up"], 0.6),
                    ],
                ),
            ),
            (
                "surprised",
                Expression::new(
                    &[
                        ("eyeWideLeft", 0.8),
                        ("eyeWideRight", 0.8),
                        ("browInnerUp", 0.7),
                        ("browOuterUpLeft", 0.6),
                        ("browOuterUpRight", 0.6),
                        ("jawOpen", 0.5),
                    ],
                    vec![
                        h(&["surprise"], 1.),
                        h(&["eye", "wide"], 0.8),
                        h(&["brow", "up"], 0.6),
                        h(&["jaw", "open"], 0.5),
                        h(&["mouth", "open"], 0.5),
                    ],
                ),
            ),
            (
                "angry",
                Expression::new(
                    &[
                        ("browDownLeft", 0.8),
                        ("browDownRight", 0.8),
                        ("noseSneerLeft", 0.5),
                        ("noseSneerRight", 0.5),
                        ("mouthPressLeft", 0.4),
                        ("mouthPressRight", 0.4),
                    ],
                    vec![
                        h(&["angry"], 1.),
                        h(&["anger"], 1.),
                        h(&["brow", "down"], 0.8),
                        h(&["sneer"], 0.5),
                        h(&["mouth", "press"], 0.4),
                    ],
                ),
            ),
            (
                "relaxed",
                Expression::new(
                    &[
                        ("mouthSmileLeft", 0.3),
                        ("mouthSmileRight", 0.3),
                        ("eyeSquintLeft", 0.3),
                        ("eyeSquintRight", 0.3),
                    ],
                    vec![
                        h(&["relax"], 1.),
                        h(&["smile"], 0.3),
                        h(&["eye", "squint"], 0.3),
                    ],
                ),
            ),
            (
                "thinking",
                Expression::new(
                    &[
                        ("browDownLeft", 0.3),
                        ("browInnerUp", 0.3),
                        ("mouthPucker", 0.4),
                        ("eyeLookUpLeft", 0.4),
                        ("eyeLookUpRight", 0.4),
                    ],
                    vec![
                        h(&["think"], 1.),
                        h(&["pucker"], 0.4),
                        h(&["eye", "look", "up"], 0.4),
                        h(&["brow", "down"], 0.3),
                    ],
                ),
            ),
        ];

        Self {
            expressions: expressions
                .into_iter()
                .map(|(name, expression)| (name.to_string(), expression))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Expression> {
        self.expressions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.expressions.keys().map(String::as_str)
    }
}

/// An expression resolved against one rig: dense indices into its weight array.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdaptedExpression {
    targets: Vec<(usize, f32)>,
    synthesized: bool,
}

impl AdaptedExpression {
    pub fn targets(&self) -> &[(usize, f32)] {
        &self.targets
    }

    /// Built from fragment hints rather than exact names.
    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }

    /// Dense target vector: listed indices get their weight, every other index zero.
    pub fn dense(&self, len: usize) -> Vec<f32> {
        let mut out = vec![0.; len];
        for &(index, weight) in &self.targets {
            if let Some(slot) = out.get_mut(index) {
                *slot = weight;
            }
        }
        out
    }
}

/// Catalog resolved against a rig's [`BlendShapeTable`]. Never changes after construction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdaptedCatalog {
    expressions: IndexMap<String, AdaptedExpression>,
}

impl AdaptedCatalog {
    /// Pure function of the catalog and the table. Without a table, only `neutral` survives
    /// (empty).
    pub fn adapt(catalog: &ExpressionCatalog, table: Option<&BlendShapeTable>) -> Self {
        let lowercase_names: Vec<String> = table
            .map(|t| t.names().map(str::to_lowercase).collect())
            .unwrap_or_default();

        let expressions = catalog
            .expressions
            .iter()
            .map(|(name, expression)| {
                let adapted = match table {
                    _ if name == NEUTRAL => AdaptedExpression::default(),
                    Some(table) => adapt_expression(expression, table, &lowercase_names),
                    None => AdaptedExpression::default(),
                };
                (name.clone(), adapted)
            })
            .collect();

        Self { expressions }
    }

    pub fn get(&self, name: &str) -> Option<&AdaptedExpression> {
        self.expressions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.expressions.keys().map(String::as_str)
    }

    /// Whether `name` moves at least one blend shape on this rig, or is the neutral face.
    pub fn is_supported(&self, name: &str) -> bool {
        name == NEUTRAL || self.get(name).is_some_and(|e| !e.targets.is_empty())
    }
}

fn adapt_expression(
    expression: &Expression,
    table: &BlendShapeTable,
    lowercase_names: &[String],
) -> AdaptedExpression {
    let mut targets: Vec<(usize, f32)> = expression
        .targets
        .iter()
        .filter_map(|(name, weight)| Some((table.index_of(name)?, *weight)))
        .collect();
    if !targets.is_empty() {
        targets.sort_by_key(|(index, _)| *index);
        targets.dedup_by_key(|(index, _)| *index);
        return AdaptedExpression {
            targets,
            synthesized: false,
        };
    }

    // First matching hint wins for each shape.
    let targets = lowercase_names
        .iter()
        .enumerate()
        .filter_map(|(index, name)| {
            let hint = expression.hints.iter().find(|h| h.matches(name))?;
            Some((index, hint.weight.clamp(0., 1.)))
        })
        .collect::<Vec<_>>();
    let synthesized = !targets.is_empty();
    AdaptedExpression {
        targets,
        synthesized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_names_are_kept_and_missing_ones_dropped() {
        let table = BlendShapeTable::new(["jawOpen", "mouthSmileLeft", "blink"]);
        let adapted = AdaptedCatalog::adapt(&ExpressionCatalog::canonical(), Some(&table));

        let happy = adapted.get("happy").unwrap();
        assert_eq!(happy.targets(), &[(1, 0.8)]);
        assert!(!happy.is_synthesized());
        assert_eq!(adapted.get("surprised").unwrap().targets(), &[(0, 0.5)]);
    }

    #[test]
    fn empty_expressions_are_rebuilt_from_fragments() {
        let table = BlendShapeTable::new(["Fcl_MTH_Joy", "Fcl_BRW_Angry", "Fcl_EYE_Close"]);
        let adapted = AdaptedCatalog::adapt(&ExpressionCatalog::canonical(), Some(&table));

        let happy = adapted.get("happy").unwrap();
        assert!(happy.is_synthesized());
        assert_eq!(happy.targets(), &[(0, 1.)]);
        assert_eq!(adapted.get("angry").unwrap().targets(), &[(1, 1.)]);
        assert!(!adapted.is_supported("sad"));
        assert!(adapted.is_supported(NEUTRAL));
    }

    #[test]
    fn adaptation_does_not_touch_the_catalog() {
        let catalog = ExpressionCatalog::canonical();
        let table = BlendShapeTable::new(["smile"]);
        let first = AdaptedCatalog::adapt(&catalog, Some(&table));
        let second = AdaptedCatalog::adapt(&catalog, Some(&table));

        assert_eq!(first, second);
        assert_eq!(catalog, ExpressionCatalog::canonical());
        assert!(AdaptedCatalog::adapt(&catalog, None).get("happy").unwrap().targets().is_empty());
    }
}
