//! Detects and repairs skinned nodes that a bad track made invisible, collapsed or pushed away.
//!
//! Detection is a pure pass over the rig that fills a list of [`Correction`]s; applying them is
//! a separate step. Both reuse their buffers, so a steady-state tick allocates nothing.

use bevy::{
    log::trace,
    math::{Vec2, Vec3},
    reflect::Reflect,
};

use crate::{
    config::{ActionConstraint, SafetyConfig},
    rig::Rig,
};

#[derive(Reflect, Clone, Copy, Debug, PartialEq)]
pub enum CorrectionKind {
    ForceVisible,
    ResetScale,
    ClampHorizontal,
    ClampVertical { min: f32, max: f32 },
}

#[derive(Reflect, Clone, Copy, Debug, PartialEq)]
pub struct Correction {
    pub node: usize,
    pub kind: CorrectionKind,
}

/// Thresholds for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SafetyRules {
    pub min_scale: f32,
    pub max_horizontal: f32,
    /// Extra constraint of the explicit action currently playing, if it has one.
    pub constraint: Option<ActionConstraint>,
}

impl SafetyRules {
    pub fn new(config: &SafetyConfig, constraint: Option<ActionConstraint>) -> Self {
        Self {
            min_scale: config.min_scale,
            max_horizontal: config.max_horizontal,
            constraint,
        }
    }
}

impl Default for SafetyRules {
    fn default() -> Self {
        Self::new(&SafetyConfig::default(), None)
    }
}

/// Clears `out` and pushes one correction per violation found on the rig's skinned nodes.
///
/// Non-finite values count as violations.
pub fn detect_violations(rig: &Rig, rules: &SafetyRules, out: &mut Vec<Correction>) {
    out.clear();

    for node in rig.skinned_nodes() {
        let bone = &rig.bones()[node];
        let transform = &bone.transform;
        let mut push = |kind| out.push(Correction { node, kind });

        if !bone.visible {
            push(CorrectionKind::ForceVisible);
        }
        if !(transform.scale.min_element() >= rules.min_scale) {
            push(CorrectionKind::ResetScale);
        }
        let horizontal = Vec2::new(transform.translation.x, transform.translation.z).length();
        if !(horizontal <= rules.max_horizontal) {
            push(CorrectionKind::ClampHorizontal);
        }
        if let Some(ActionConstraint::VerticalClamp { min, max }) = rules.constraint
            && min <= max
        {
            let y = transform.translation.y;
            if !(min..=max).contains(&y) {
                push(CorrectionKind::ClampVertical { min, max });
            }
        }
    }
}

/// Convenience wrapper around [`detect_violations`] that allocates its result.
pub fn detect(rig: &Rig, rules: &SafetyRules) -> Vec<Correction> {
    let mut out = vec![];
    detect_violations(rig, rules, &mut out);
    out
}

pub fn apply_corrections(rig: &mut Rig, corrections: &[Correction]) {
    for correction in corrections {
        let Some(bone) = rig.bone_mut(correction.node) else {
            continue;
        };
        match correction.kind {
            CorrectionKind::ForceVisible => bone.visible = true,
            CorrectionKind::ResetScale => bone.transform.scale = Vec3::ONE,
            CorrectionKind::ClampHorizontal => {
                bone.transform.translation.x = 0.;
                bone.transform.translation.z = 0.;
            }
            CorrectionKind::ClampVertical { min, max } => {
                let y = bone.transform.translation.y;
                bone.transform.translation.y = if y.is_finite() {
                    y.clamp(min, max)
                } else {
                    0_f32.clamp(min, max)
                };
            }
        }
    }
}

/// Owns the scratch buffer and runs detect then apply.
#[derive(Debug, Default)]
pub struct SafetyCorrector {
    buffer: Vec<Correction>,
    total: u64,
}

impl SafetyCorrector {
    /// Runs one pass and returns how many corrections were applied.
    pub fn run(&mut self, rig: &mut Rig, rules: &SafetyRules) -> usize {
        detect_violations(rig, rules, &mut self.buffer);
        if self.buffer.is_empty() {
            return 0;
        }

        apply_corrections(rig, &self.buffer);
        self.total += self.buffer.len() as u64;
        trace!("applied {} safety corrections", self.buffer.len());
        self.buffer.len()
    }

    /// Corrections from the last pass.
    pub fn last(&self) -> &[Correction] {
        &self.buffer
    }

    pub fn total_applied(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use bevy::transform::components::Transform;

    use super::*;
    use crate::rig::NodeKind;

    fn rig() -> Rig {
        let mut rig = Rig::new();
        let root = rig.add_node("Scene", None, NodeKind::Group, Transform::IDENTITY);
        rig.add_node("Body", Some(root), NodeKind::SkinnedMesh, Transform::IDENTITY);
        rig
    }

    #[test]
    fn collapsed_hidden_node_recovers_in_one_pass() {
        let mut rig = rig();
        let body = &mut rig.bones_mut()[1];
        body.transform.scale = Vec3::ZERO;
        body.visible = false;

        let mut corrector = SafetyCorrector::default();
        assert_eq!(corrector.run(&mut rig, &SafetyRules::default()), 2);
        assert_eq!(rig.bones()[1].transform.scale, Vec3::ONE);
        assert!(rig.bones()[1].visible);
        assert_eq!(corrector.run(&mut rig, &SafetyRules::default()), 0);
    }

    #[test]
    fn detection_only_looks_at_skinned_nodes() {
        let mut rig = rig();
        rig.bones_mut()[0].transform.translation = Vec3::new(10., 0., 0.);
        rig.bones_mut()[1].transform.translation = Vec3::new(3., 0.5, 4.);

        let found = detect(&rig, &SafetyRules::default());
        assert_eq!(
            found,
            vec![Correction {
                node: 1,
                kind: CorrectionKind::ClampHorizontal
            }]
        );
        // Detection never mutates.
        assert_eq!(rig.bones()[1].transform.translation.x, 3.);
    }

    #[test]
    fn vertical_clamp_applies_only_with_a_constraint() {
        let mut rig = rig();
        rig.bones_mut()[1].transform.translation.y = 1.;
        let mut rules = SafetyRules::default();
        assert!(detect(&rig, &rules).is_empty());

        rules.constraint = Some(ActionConstraint::VerticalClamp { min: -0.1, max: 0.3 });
        SafetyCorrector::default().run(&mut rig, &rules);
        assert_eq!(rig.bones()[1].transform.translation.y, 0.3);
    }

    #[test]
    fn nan_translation_is_cleared() {
        let mut rig = rig();
        rig.bones_mut()[1].transform.translation = Vec3::new(f32::NAN, 0., 0.);
        SafetyCorrector::default().run(&mut rig, &SafetyRules::default());
        assert_eq!(rig.bones()[1].transform.translation, Vec3::ZERO);
    }
}
