//! Decides which single action plays.
//!
//! The controller is in one of two modes. `Explicit` plays whatever the host asked for until it
//! is released. `Idle` plays one idle action at a time and rotates to the next one every idle
//! period, as long as there is more than one to rotate through.

mod idle;

pub use idle::*;

use bevy::{
    log::{debug, info},
    reflect::Reflect,
};

use crate::{
    action::ActionRegistry,
    config::AvatarConfig,
    errors::{AvatarIssue, IssueLog},
};

#[derive(Reflect, Clone, Debug, PartialEq, Eq)]
pub enum ControlMode {
    Explicit(String),
    Idle(usize),
}

#[derive(Clone, Debug)]
pub struct PlaybackController {
    explicit: Option<String>,
    idle_index: usize,
    pool: IdlePool,
    scheduler: IdleScheduler,
    crossfade: f32,
    time_scale: f32,
}

impl PlaybackController {
    pub fn new(config: &AvatarConfig) -> Self {
        Self {
            explicit: None,
            idle_index: 0,
            pool: IdlePool::default(),
            scheduler: IdleScheduler::new(config.idle.period_secs),
            crossfade: config.playback.crossfade_secs.max(0.),
            time_scale: config.playback.time_scale,
        }
    }

    pub fn mode(&self) -> ControlMode {
        match &self.explicit {
            Some(name) => ControlMode::Explicit(name.clone()),
            None => ControlMode::Idle(self.idle_index),
        }
    }

    /// Name of the explicitly requested action, without allocating.
    pub fn explicit_action(&self) -> Option<&str> {
        self.explicit.as_deref()
    }

    pub fn pool(&self) -> &IdlePool {
        &self.pool
    }

    pub fn idle_index(&self) -> Option<usize> {
        self.explicit.is_none().then_some(self.idle_index)
    }

    pub fn is_idle_timer_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// The action the controller wants playing, if any.
    pub fn current_action(&self) -> Option<&str> {
        match &self.explicit {
            Some(name) => Some(name),
            None => self.pool.get(self.idle_index),
        }
    }

    /// Takes over a freshly bound registry. An explicit action that still exists keeps playing,
    /// otherwise the controller goes back to idle, keeping its index when still valid.
    pub fn install(&mut self, registry: &mut ActionRegistry, idle_actions: &[String]) {
        for (_, action) in registry.iter_mut() {
            action.set_time_scale(self.time_scale);
        }
        self.pool = IdlePool::build(idle_actions, registry);
        if self.idle_index >= self.pool.len() {
            self.idle_index = 0;
        }
        debug!("idle pool: {:?}", self.pool.names());

        match self.explicit.clone() {
            Some(name) if registry.contains(&name) => {
                self.scheduler.cancel();
                registry.play_exclusive(&name, 0.);
            }
            _ => {
                self.explicit = None;
                self.enter_idle(registry, 0.);
            }
        }
    }

    /// `Some(name)` plays `name` exclusively from its start. `None` releases back to idle.
    /// An unknown name is reported and changes nothing.
    pub fn request_action(
        &mut self,
        name: Option<&str>,
        registry: &mut ActionRegistry,
        issues: &mut IssueLog,
    ) {
        match name {
            Some(name) => {
                if !registry.contains(name) {
                    issues.report(AvatarIssue::UnknownAction(name.to_string()));
                    return;
                }
                info!("playing action {name:?}");
                self.scheduler.cancel();
                self.explicit = Some(name.to_string());
                registry.play_exclusive(name, self.crossfade);
            }
            None => self.release(registry),
        }
    }

    fn release(&mut self, registry: &mut ActionRegistry) {
        if self.explicit.take().is_none() {
            return;
        }
        debug!("explicit action released, back to idle {}", self.idle_index);
        self.enter_idle(registry, self.crossfade);
    }

    fn enter_idle(&mut self, registry: &mut ActionRegistry, fade: f32) {
        match self.pool.get(self.idle_index) {
            Some(name) => {
                registry.play_exclusive(name, fade);
            }
            None => registry.release_all(fade),
        }

        if self.pool.len() > 1 {
            self.scheduler.start();
        } else {
            self.scheduler.cancel();
        }
    }

    /// Runs the idle timer. A one-shot explicit action that finished releases back to idle.
    pub fn update(&mut self, delta: f32, registry: &mut ActionRegistry) {
        if self.explicit.is_some() {
            let finished = self
                .explicit
                .as_deref()
                .and_then(|name| registry.get(name))
                .is_some_and(|a| a.is_finished());
            if finished {
                self.release(registry);
            }
            return;
        }

        let rotations = self.scheduler.tick(delta) as usize;
        if rotations == 0 || self.pool.len() < 2 {
            return;
        }
        self.idle_index = (self.idle_index + rotations) % self.pool.len();
        if let Some(name) = self.pool.get(self.idle_index) {
            debug!("idle rotation to {name:?}");
            registry.play_exclusive(name, self.crossfade);
        }
    }

    /// Forgets everything about the previous rig.
    pub fn reset(&mut self) {
        self.explicit = None;
        self.idle_index = 0;
        self.pool = IdlePool::default();
        self.scheduler.cancel();
    }
}
