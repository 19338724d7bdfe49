use bevy::math::{Quat, Vec3};

use super::ActionRegistry;
use crate::{animation_clip::TrackSample, rig::Rig};

#[derive(Clone, Copy, Debug)]
struct Accumulator {
    rotation: Quat,
    rotation_weight: f32,
    translation: Vec3,
    translation_weight: f32,
    scale: Vec3,
    scale_weight: f32,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            rotation: Quat::IDENTITY,
            rotation_weight: 0.,
            translation: Vec3::ZERO,
            translation_weight: 0.,
            scale: Vec3::ZERO,
            scale_weight: 0.,
        }
    }
}

impl Accumulator {
    fn add(&mut self, sample: TrackSample, weight: f32) {
        match sample {
            TrackSample::Rotation(rotation) => {
                self.rotation_weight += weight;
                if self.rotation_weight == weight {
                    self.rotation = rotation;
                } else {
                    self.rotation = self.rotation.slerp(rotation, weight / self.rotation_weight);
                }
            }
            TrackSample::Translation(translation) => {
                self.translation += translation * weight;
                self.translation_weight += weight;
            }
            TrackSample::Scale(scale) => {
                self.scale += scale * weight;
                self.scale_weight += weight;
            }
        }
    }
}

/// Blends every contributing action into the rig pose.
///
/// Channels that receive less than full weight are completed with the bone's rest value, so a
/// crossfade never pulls a bone towards zero. Channels no action touches are left as they are.
#[derive(Debug, Default)]
pub struct PoseBlender {
    scratch: Vec<Accumulator>,
}

impl PoseBlender {
    pub fn apply(&mut self, registry: &ActionRegistry, rig: &mut Rig) {
        self.scratch.clear();
        self.scratch.resize(rig.len(), Accumulator::default());

        for (_, action) in registry.iter().filter(|(_, a)| a.is_contributing()) {
            let weight = action.effective_weight();
            let time = action.time();
            for (track, binding) in action.clip().tracks().iter().zip(action.bindings()) {
                let Some(index) = *binding else { continue };
                let Some(sample) = track.sample(time) else { continue };
                self.scratch[index].add(sample, weight);
            }
        }

        for (bone, acc) in rig.bones_mut().iter_mut().zip(&self.scratch) {
            let rest = bone.rest();
            if acc.rotation_weight > 0. {
                bone.transform.rotation = if acc.rotation_weight < 1. {
                    rest.rotation.slerp(acc.rotation, acc.rotation_weight)
                } else {
                    acc.rotation
                };
            }
            if acc.translation_weight > 0. {
                bone.transform.translation = complete(
                    rest.translation,
                    acc.translation,
                    acc.translation_weight,
                );
            }
            if acc.scale_weight > 0. {
                bone.transform.scale = complete(rest.scale, acc.scale, acc.scale_weight);
            }
        }
    }
}

fn complete(rest: Vec3, weighted_sum: Vec3, total: f32) -> Vec3 {
    if total < 1. {
        rest * (1. - total) + weighted_sum
    } else {
        weighted_sum / total
    }
}

#[cfg(test)]
mod tests {
    use bevy::transform::components::Transform;

    use super::*;
    use crate::{
        animation_clip::{Clip, ClipOrigin, Track},
        errors::IssueLog,
        rig::NodeKind,
    };

    #[test]
    fn half_weight_blends_with_rest() {
        let mut rig = Rig::new();
        rig.add_node(
            "Hips",
            None,
            NodeKind::Bone,
            Transform::from_xyz(0., 1., 0.),
        );
        let clip = Clip::new(
            "Lift",
            ClipOrigin::Embedded,
            vec![Track::translation(
                "Hips",
                vec![0., 1.],
                vec![Vec3::new(0., 3., 0.); 2],
            )],
        );
        let mut registry =
            ActionRegistry::bind(ClipOrigin::Embedded, vec![clip], &rig, &mut IssueLog::default());
        let action = registry.get_mut("Lift").unwrap();
        action.play(0.);
        action.set_weight(0.5);

        PoseBlender::default().apply(&registry, &mut rig);
        assert!((rig.bones()[0].transform.translation.y - 2.).abs() < 1e-5);
    }

    #[test]
    fn untouched_bones_keep_their_transform() {
        let mut rig = Rig::new();
        let hips = rig.add_bone("Hips", None);
        rig.add_bone("Head", Some(hips));
        rig.bones_mut()[1].transform.translation = Vec3::X;
        let clip = Clip::new(
            "Turn",
            ClipOrigin::Embedded,
            vec![Track::rotation(
                "Hips",
                vec![0., 1.],
                vec![Quat::from_rotation_y(1.); 2],
            )],
        );
        let mut registry =
            ActionRegistry::bind(ClipOrigin::Embedded, vec![clip], &rig, &mut IssueLog::default());
        registry.play_exclusive("Turn", 0.);

        PoseBlender::default().apply(&registry, &mut rig);
        assert_eq!(rig.bones()[1].transform.translation, Vec3::X);
        assert!(rig.bones()[0].transform.rotation.angle_between(Quat::from_rotation_y(1.)) < 1e-4);
    }
}
