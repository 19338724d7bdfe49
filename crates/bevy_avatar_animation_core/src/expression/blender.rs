use bevy::log::debug;

use super::AdaptedCatalog;
use crate::{
    errors::{AvatarIssue, IssueLog},
    interpolation::{InterpolateLinear, easing::eased_progress},
    rig::Rig,
};

#[derive(Clone, Debug)]
struct Transition {
    start: Vec<f32>,
    target: Vec<f32>,
    elapsed: f32,
    duration: f32,
}

/// Eases the rig's blend-shape weights towards one expression at a time.
///
/// Only the blender writes the weights. Starting a new expression captures whatever the weights
/// are right now, so an interrupted transition continues smoothly from where it was.
#[derive(Clone, Debug, Default)]
pub struct ExpressionBlender {
    transition: Option<Transition>,
    current: Option<String>,
}

impl ExpressionBlender {
    /// Name of the last accepted expression.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Starts a transition to `name`. Returns false, reporting why, when the request is ignored.
    pub fn set_expression(
        &mut self,
        name: &str,
        duration: f32,
        rig: &mut Rig,
        catalog: &AdaptedCatalog,
        issues: &mut IssueLog,
    ) -> bool {
        let Some(table) = rig.blend_shapes_mut() else {
            issues.report(AvatarIssue::NoBlendShapes(name.to_string()));
            return false;
        };
        let Some(expression) = catalog.get(name) else {
            issues.report(AvatarIssue::UnknownExpression(name.to_string()));
            return false;
        };
        if !catalog.is_supported(name) {
            issues.report(AvatarIssue::NoMatchingBlendShapes(name.to_string()));
            return false;
        }

        debug!("expression {name:?} over {duration}s");
        self.transition = Some(Transition {
            start: table.weights().to_vec(),
            target: expression.dense(table.len()),
            elapsed: 0.,
            duration: duration.max(0.),
        });
        self.current = Some(name.to_string());
        self.step(0., table.weights_mut());
        true
    }

    /// Advances the transition in flight, if any.
    pub fn tick(&mut self, delta: f32, rig: &mut Rig) {
        if self.transition.is_none() {
            return;
        }
        match rig.blend_shapes_mut() {
            Some(table) => self.step(delta, table.weights_mut()),
            None => self.transition = None,
        }
    }

    fn step(&mut self, delta: f32, weights: &mut [f32]) {
        let Some(transition) = &mut self.transition else {
            return;
        };
        transition.elapsed += delta;
        let progress = eased_progress(transition.elapsed, transition.duration);

        let blended = transition
            .start
            .interpolate_linear(&transition.target, progress);
        for (weight, value) in weights.iter_mut().zip(blended) {
            *weight = value;
        }

        if progress >= 1. {
            self.transition = None;
        }
    }

    /// Drops the transition and the current name, leaving weights where they are.
    pub fn reset(&mut self) {
        self.transition = None;
        self.current = None;
    }
}
