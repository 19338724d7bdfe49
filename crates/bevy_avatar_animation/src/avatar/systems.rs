use bevy::{prelude::*, mesh::morph::MorphWeights};

use super::{Avatar, AvatarIssueReport, AvatarRigEntities};

/// Finds the entities of the loaded rig among the avatar's descendants, by `Name`. Runs again
/// after a different rig is loaded, and while no node has matched yet.
pub fn bind_rig_entities(
    mut commands: Commands,
    avatars: Query<(Entity, &Avatar, Option<&AvatarRigEntities>)>,
    children: Query<&Children>,
    names: Query<&Name>,
) {
    for (entity, avatar, current) in &avatars {
        let Some(rig) = avatar.rig() else {
            continue;
        };
        if current.is_some_and(|current| !current.needs_rebind(rig)) {
            continue;
        }

        let named = std::iter::once(entity)
            .chain(children.iter_descendants(entity))
            .filter_map(|e| names.get(e).ok().map(|name| (e, name.as_str())));
        let bound = AvatarRigEntities::resolve(rig, named);
        if bound.bound_count() > 0 || current.is_none_or(|current| !current.is_bound_to(rig)) {
            debug!(
                "avatar {entity}: bound {} of {} rig nodes",
                bound.bound_count(),
                rig.len()
            );
        }
        commands.entity(entity).insert(bound);
    }
}

pub fn tick_avatars(time: Res<Time>, mut avatars: Query<&mut Avatar>) {
    let delta = time.delta_secs();
    for mut avatar in &mut avatars {
        avatar.tick(delta);
    }
}

/// Copies node transforms and visibility from each rig onto its entities, and the blend-shape
/// weights onto the morph weights of its skinned meshes.
pub fn sync_rig_entities(
    avatars: Query<(&Avatar, &AvatarRigEntities)>,
    mut targets: Query<(&mut Transform, Option<&mut Visibility>)>,
    mut morphs: Query<&mut MorphWeights>,
) {
    for (avatar, entities) in &avatars {
        let Some(rig) = avatar.rig() else {
            continue;
        };
        if !entities.is_bound_to(rig) {
            continue;
        }
        let blend_weights = rig.blend_shapes().map(|table| table.weights());

        for (index, bone) in rig.bones().iter().enumerate() {
            let Some(entity) = entities.get(index) else {
                continue;
            };
            if bone.is_skinned()
                && let Some(weights) = blend_weights
                && let Ok(mut morph_weights) = morphs.get_mut(entity)
            {
                apply_morph_weights(&mut morph_weights, weights);
            }

            let Ok((mut transform, visibility)) = targets.get_mut(entity) else {
                continue;
            };
            if *transform != bone.transform {
                *transform = bone.transform;
            }
            if let Some(mut visibility) = visibility {
                let wanted = if bone.visible {
                    Visibility::Inherited
                } else {
                    Visibility::Hidden
                };
                visibility.set_if_neq(wanted);
            }
        }
    }
}

/// Copies as many weights as both sides have. Unchanged weights do not trigger change detection.
fn apply_morph_weights(morph_weights: &mut Mut<MorphWeights>, weights: &[f32]) {
    let len = morph_weights.weights().len().min(weights.len());
    if morph_weights.weights()[..len] == weights[..len] {
        return;
    }
    morph_weights.weights_mut()[..len].copy_from_slice(&weights[..len]);
}

pub fn report_avatar_issues(
    mut avatars: Query<(Entity, &mut Avatar)>,
    mut report: ResMut<AvatarIssueReport>,
) {
    for (entity, mut avatar) in &mut avatars {
        if avatar.issues().is_empty() {
            continue;
        }
        for issue in avatar.drain_issues() {
            report.push(entity, issue);
        }
    }
}
