mod pose;

pub use pose::PoseBlender;

use bevy::{
    log::debug,
    reflect::{Reflect, std_traits::ReflectDefault},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    animation_clip::{Clip, ClipOrigin},
    errors::{AvatarIssue, IssueLog},
    interpolation::easing::eased_progress,
    rig::Rig,
};

#[derive(Reflect, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[reflect(Default)]
pub enum LoopMode {
    /// Wrap around at the end of the clip, forever.
    #[default]
    Repeat,
    /// Hold the last frame and stop.
    Once,
}

#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[reflect(Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    /// Superseded by another action; still blended in until its weight reaches zero.
    FadingOut,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct WeightFade {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
}

impl WeightFade {
    fn current(&self) -> f32 {
        self.from + (self.to - self.from) * eased_progress(self.elapsed, self.duration)
    }

    fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// A clip bound to the current rig, plus its playback state.
#[derive(Clone, Debug)]
pub struct Action {
    clip: Clip,
    /// Rig node index for each track of `clip`, resolved once at bind time.
    bindings: Vec<Option<usize>>,
    weight: f32,
    effective_weight: f32,
    time_scale: f32,
    loop_mode: LoopMode,
    state: PlaybackState,
    time: f32,
    finished: bool,
    fade: Option<WeightFade>,
}

impl Action {
    /// Binds `clip` to `rig` by exact bone name. Returns `None` when no track lands on a node.
    pub fn bind(clip: Clip, rig: &Rig) -> Option<Self> {
        let bindings: Vec<Option<usize>> = clip
            .tracks()
            .iter()
            .map(|track| rig.find(track.bone()))
            .collect();
        if bindings.iter().all(Option::is_none) {
            return None;
        }

        Some(Self {
            clip,
            bindings,
            weight: 1.,
            effective_weight: 0.,
            time_scale: 1.,
            loop_mode: LoopMode::Repeat,
            state: PlaybackState::Stopped,
            time: 0.,
            finished: false,
            fade: None,
        })
    }

    pub fn name(&self) -> &str {
        self.clip.name()
    }

    pub fn clip(&self) -> &Clip {
        &self.clip
    }

    pub fn origin(&self) -> ClipOrigin {
        self.clip.origin()
    }

    pub(crate) fn bindings(&self) -> &[Option<usize>] {
        &self.bindings
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Only an action that is playing and not on its way out counts as running.
    pub fn is_running(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Whether the action still has any influence on the pose.
    pub fn is_contributing(&self) -> bool {
        self.state != PlaybackState::Stopped && self.effective_weight > 0.
    }

    /// A [`LoopMode::Once`] action that reached its end.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight.clamp(0., 1.);
        if self.fade.is_none() && self.state == PlaybackState::Playing {
            self.effective_weight = self.weight;
        }
    }

    /// Weight after fades, the one used for blending.
    pub fn effective_weight(&self) -> f32 {
        self.effective_weight
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale;
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn set_loop_mode(&mut self, loop_mode: LoopMode) {
        self.loop_mode = loop_mode;
    }

    /// Rewinds and starts the action, fading in over `fade_in` seconds.
    pub fn play(&mut self, fade_in: f32) {
        self.time = 0.;
        self.finished = false;
        self.state = PlaybackState::Playing;
        if fade_in > 0. {
            self.effective_weight = 0.;
            self.fade = Some(WeightFade {
                from: 0.,
                to: self.weight,
                elapsed: 0.,
                duration: fade_in,
            });
        } else {
            self.fade = None;
            self.effective_weight = self.weight;
        }
    }

    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.effective_weight = 0.;
        self.fade = None;
    }

    /// Releases the action, letting its weight ease to zero over `duration` seconds.
    pub fn fade_out(&mut self, duration: f32) {
        match self.state {
            PlaybackState::Stopped => {}
            _ if duration <= 0. || self.effective_weight <= 0. => self.stop(),
            PlaybackState::FadingOut => {}
            PlaybackState::Playing => {
                self.state = PlaybackState::FadingOut;
                self.fade = Some(WeightFade {
                    from: self.effective_weight,
                    to: 0.,
                    elapsed: 0.,
                    duration,
                });
            }
        }
    }

    /// Advances local time and fades by `delta` seconds.
    pub fn advance(&mut self, delta: f32) {
        if self.state == PlaybackState::Stopped {
            return;
        }

        let duration = self.clip.duration();
        self.time += delta * self.time_scale;
        if self.time.is_nan() {
            self.time = 0.;
        }
        match self.loop_mode {
            LoopMode::Repeat if duration > 0. && self.time.is_finite() => {
                self.time = self.time.rem_euclid(duration)
            }
            LoopMode::Repeat => self.time = 0.,
            LoopMode::Once => {
                if self.time >= duration {
                    self.time = duration;
                    self.finished = true;
                } else if self.time < 0. {
                    self.time = 0.;
                    self.finished = true;
                }
            }
        }

        if let Some(fade) = &mut self.fade {
            fade.elapsed += delta;
            self.effective_weight = fade.current();
            if fade.is_done() {
                self.fade = None;
                if self.state == PlaybackState::FadingOut {
                    self.stop();
                }
            }
        }
    }
}

/// Playable actions keyed by clip name, in binding order.
#[derive(Clone, Debug, Default)]
pub struct ActionRegistry {
    actions: IndexMap<String, Action>,
    origin: Option<ClipOrigin>,
}

impl ActionRegistry {
    /// Binds every clip to `rig`. Clips that bind no track are reported and left out, and a
    /// clip name seen twice keeps its first clip.
    pub fn bind(origin: ClipOrigin, clips: Vec<Clip>, rig: &Rig, issues: &mut IssueLog) -> Self {
        let mut actions = IndexMap::new();
        for clip in clips {
            let name = clip.name().to_string();
            if actions.contains_key(&name) {
                debug!("clip {name:?} bound twice, keeping the first one");
                continue;
            }
            match Action::bind(clip, rig) {
                Some(action) => {
                    actions.insert(name, action);
                }
                None => issues.report(AvatarIssue::UnusableClip { clip: name, origin }),
            }
        }

        let origin = (!actions.is_empty()).then_some(origin);
        Self { actions, origin }
    }

    /// Which clip source the actions come from, `None` when empty.
    pub fn origin(&self) -> Option<ClipOrigin> {
        self.origin
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Action> {
        self.actions.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Action> {
        self.actions.get_mut(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Action)> {
        self.actions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Action)> {
        self.actions.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn running(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|(_, a)| a.is_running()).map(|(n, _)| n)
    }

    /// Plays `name` and releases every other action. Returns false if `name` is unknown.
    pub fn play_exclusive(&mut self, name: &str, crossfade: f32) -> bool {
        if !self.contains(name) {
            return false;
        }
        for (key, action) in self.actions.iter_mut() {
            if key == name {
                action.play(crossfade);
            } else {
                action.fade_out(crossfade);
            }
        }
        true
    }

    pub fn release_all(&mut self, fade: f32) {
        for action in self.actions.values_mut() {
            action.fade_out(fade);
        }
    }

    pub fn stop_all(&mut self) {
        for action in self.actions.values_mut() {
            action.stop();
        }
    }

    pub fn advance(&mut self, delta: f32) {
        for action in self.actions.values_mut() {
            action.advance(delta);
        }
    }

    /// Stops and drops every action.
    pub fn dispose(&mut self) {
        self.stop_all();
        self.actions.clear();
        self.origin = None;
    }
}

#[cfg(test)]
mod tests {
    use bevy::math::Quat;

    use super::*;
    use crate::animation_clip::Track;

    fn rig() -> Rig {
        let mut rig = Rig::new();
        let hips = rig.add_bone("Hips", None);
        rig.add_bone("Head", Some(hips));
        rig
    }

    fn clip(name: &str, bone: &str) -> Clip {
        Clip::new(
            name,
            ClipOrigin::Embedded,
            vec![Track::rotation(bone, vec![0., 2.], vec![Quat::IDENTITY; 2])],
        )
    }

    #[test]
    fn binding_skips_clips_without_rig_bones() {
        let mut issues = IssueLog::default();
        let registry = ActionRegistry::bind(
            ClipOrigin::Embedded,
            vec![clip("Wave", "Head"), clip("Wag", "Tail"), clip("Wave", "Hips")],
            &rig(),
            &mut issues,
        );

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Wave"]);
        assert_eq!(registry.origin(), Some(ClipOrigin::Embedded));
        assert!(issues.contains(|i| matches!(i, AvatarIssue::UnusableClip { clip, .. } if clip == "Wag")));
    }

    #[test]
    fn play_exclusive_leaves_one_running() {
        let mut registry = ActionRegistry::bind(
            ClipOrigin::Embedded,
            vec![clip("A", "Head"), clip("B", "Hips")],
            &rig(),
            &mut IssueLog::default(),
        );

        assert!(registry.play_exclusive("A", 0.25));
        assert!(registry.play_exclusive("B", 0.25));
        assert_eq!(registry.running().collect::<Vec<_>>(), vec!["B"]);
        assert_eq!(registry.get("A").unwrap().state(), PlaybackState::FadingOut);
        assert!(!registry.play_exclusive("C", 0.25));
    }

    #[test]
    fn fade_out_stops_after_its_duration() {
        let mut action = Action::bind(clip("A", "Head"), &rig()).unwrap();
        action.play(0.);
        assert_eq!(action.effective_weight(), 1.);

        action.fade_out(0.5);
        action.advance(0.25);
        assert!((action.effective_weight() - 0.5).abs() < 1e-5);
        action.advance(0.25);
        assert_eq!(action.state(), PlaybackState::Stopped);
        assert!(!action.is_contributing());
    }

    #[test]
    fn repeat_wraps_and_once_clamps() {
        let mut action = Action::bind(clip("A", "Head"), &rig()).unwrap();
        action.play(0.);
        action.advance(2.5);
        assert!((action.time() - 0.5).abs() < 1e-5);

        action.set_loop_mode(LoopMode::Once);
        action.play(0.);
        action.advance(3.);
        assert_eq!(action.time(), 2.);
        assert!(action.is_finished());
    }

    #[test]
    fn overflowing_time_restarts_the_loop() {
        let mut action = Action::bind(clip("A", "Head"), &rig()).unwrap();
        action.set_time_scale(4.);
        action.play(0.);
        action.advance(f32::MAX);
        assert_eq!(action.time(), 0.);
        action.advance(0.25);
        assert!((action.time() - 1.).abs() < 1e-5);
    }
}
