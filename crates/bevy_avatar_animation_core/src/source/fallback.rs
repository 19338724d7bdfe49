use std::f32::consts::TAU;

use bevy::math::Vec3;

use crate::{
    animation_clip::{Clip, ClipOrigin, Track},
    config::FallbackConfig,
    rig::Rig,
};

const CONTAINER_WORDS: [&str; 3] = ["avatar", "rig", "skeleton"];

/// Picks the node the procedural fallback animates: the first skinned mesh, otherwise a node
/// whose name reads like a character container, otherwise the root.
pub fn pick_animatable_node(rig: &Rig) -> Option<usize> {
    if let Some(index) = rig.skinned_nodes().next() {
        return Some(index);
    }

    rig.bones()
        .iter()
        .position(|bone| is_container_name(bone.name()))
        .or_else(|| rig.root())
}

fn is_container_name(name: &str) -> bool {
    name_words(name).any(|word| CONTAINER_WORDS.contains(&word.as_str()))
}

/// Splits `CharacterRig`, `rig_root` or `Avatar.001` into lowercase words.
fn name_words(name: &str) -> impl Iterator<Item = String> + '_ {
    let mut words = vec![];
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_numeric();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words.into_iter()
}

/// Builds a looping breathing clip: a small scale oscillation around the node's rest scale.
///
/// The last keyframe repeats the first one so the loop is seamless.
pub fn breathing_clip(rig: &Rig, node: usize, config: &FallbackConfig) -> Option<Clip> {
    let bone = rig.bone(node)?;
    let rest_scale = bone.rest().scale;
    let samples = config.samples.max(2);
    let period = if config.period_secs > 0. {
        config.period_secs
    } else {
        FallbackConfig::default().period_secs
    };

    let (times, values): (Vec<f32>, Vec<Vec3>) = (0..=samples)
        .map(|i| {
            let phase = i as f32 / samples as f32;
            let swing = if i == samples { 0. } else { (phase * TAU).sin() };
            (phase * period, rest_scale * (1. + config.amplitude * swing))
        })
        .unzip();

    Some(
        Clip::new(
            config.clip_name.clone(),
            ClipOrigin::Synthesized,
            vec![Track::scale(bone.name(), times, values)],
        )
        .with_duration(period),
    )
}
