//! Headless playback of a scenario
//!
//! A [`Stage`] owns an [`AnimationRuntime`] and an in-memory property
//! store standing in for a host scene. Targets are created by name the
//! first time a scenario mentions them.

use anyhow::{Context, Result};
use glide_animation::{AnimationRuntime, EaseMode, Easing, Loops, Sequence, Transition, Tween};
use glide_core::{PropertyAccessor, PropertyStore, TargetRef};
use indexmap::{IndexMap, IndexSet};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

use crate::config::{Scenario, SequenceConfig, StepKind, TweenConfig};

/// A runtime plus the scene it animates
pub struct Stage {
    runtime: AnimationRuntime,
    store: Rc<RefCell<PropertyStore<f32>>>,
    targets: IndexMap<String, TargetRef>,
    /// `(target, property)` pairs reported each frame, in first-seen order
    channels: IndexSet<(String, String)>,
}

impl Stage {
    /// Build the scene and start every tween and sequence in the scenario
    pub fn build(scenario: &Scenario) -> Result<Self> {
        let mut stage = Self {
            runtime: AnimationRuntime::with_config(scenario.runtime.clone()),
            store: PropertyStore::new().shared(),
            targets: IndexMap::new(),
            channels: IndexSet::new(),
        };

        for (name, properties) in &scenario.targets {
            let target = stage.target(name);
            for (property, value) in properties {
                stage.store.borrow_mut().insert(target, property, *value);
                stage.channels.insert((name.clone(), property.clone()));
            }
        }

        for config in &scenario.tweens {
            let tween = stage.make_tween(config)?;
            stage
                .runtime
                .start(tween)
                .with_context(|| format!("Failed to start tween '{}'", config.label()))?;
        }

        for (index, config) in scenario.sequences.iter().enumerate() {
            let sequence = stage
                .make_sequence(config, index)
                .with_context(|| format!("Failed to build {}", config.label(index)))?;
            stage.runtime.start_sequence(sequence);
        }

        info!(
            "Stage ready: {} targets, {} tweens, {} sequences",
            stage.targets.len(),
            stage.runtime.active_count(),
            stage.runtime.sequence_count()
        );
        Ok(stage)
    }

    fn target(&mut self, name: &str) -> TargetRef {
        if let Some(target) = self.targets.get(name) {
            return *target;
        }
        let target = self.store.borrow_mut().spawn();
        self.targets.insert(name.to_string(), target);
        target
    }

    fn make_tween(&mut self, config: &TweenConfig) -> Result<Tween<f32>> {
        let label = config.label();
        let transition: Transition = config
            .transition
            .parse()
            .with_context(|| format!("Tween '{}' has a bad transition", label))?;
        let mode: EaseMode = config
            .ease
            .parse()
            .with_context(|| format!("Tween '{}' has a bad ease mode", label))?;

        let target = self.target(&config.target);
        self.channels
            .insert((config.target.clone(), config.property.clone()));

        let mut tween = self
            .runtime
            .tween::<f32>()
            .to(config.to)
            .duration(config.duration)
            .easing(Easing::new(transition, mode))
            .delay(config.delay)
            .speed(config.speed)
            .loop_mode(config.loop_mode)
            .bind(target, config.property.clone(), self.store.clone());

        tween = match Loops::from_count(config.loops) {
            Loops::Finite(n) => tween.loops(n),
            Loops::Infinite => tween.infinite(),
        };
        if let Some(from) = config.from {
            tween = tween.from(from);
        }
        if config.relative {
            tween = tween.relative();
        }
        if let Some(group) = &config.group {
            tween = tween.group(group.clone());
        }

        Ok(tween.on_complete(move || info!("Tween '{}' complete", label)))
    }

    fn make_sequence(&mut self, config: &SequenceConfig, index: usize) -> Result<Sequence> {
        let mut sequence = Sequence::new();

        for (step, step_config) in config.steps.iter().enumerate() {
            let step = step + 1;
            let tween = match (&step_config.tween, step_config.kind) {
                (Some(tween), StepKind::Append | StepKind::Join | StepKind::Insert | StepKind::Prepend) => {
                    Some(self.make_tween(tween)?)
                }
                _ => None,
            };

            match (step_config.kind, tween) {
                (StepKind::Append, Some(tween)) => {
                    sequence.append(tween)?;
                }
                (StepKind::Join, Some(tween)) => {
                    sequence.join(tween)?;
                }
                (StepKind::Prepend, Some(tween)) => {
                    sequence.prepend(tween)?;
                }
                (StepKind::Insert, Some(tween)) => {
                    let at = step_config
                        .at
                        .with_context(|| format!("Step {} needs `at`", step))?;
                    sequence.insert(at, tween)?;
                }
                (StepKind::Interval, _) => {
                    let seconds = step_config
                        .seconds
                        .with_context(|| format!("Step {} needs `seconds`", step))?;
                    sequence.append_interval(seconds)?;
                }
                (StepKind::Callback, _) => {
                    let message = step_config
                        .message
                        .clone()
                        .unwrap_or_else(|| format!("step {} reached", step));
                    let callback = move || info!("{}", message);
                    match step_config.at {
                        Some(at) => sequence.insert_callback(at, callback)?,
                        None => sequence.append_callback(callback)?,
                    };
                }
                (kind, None) => anyhow::bail!("Step {} ({:?}) needs a tween", step, kind),
            }
        }

        let label = config.label(index);
        sequence.on_complete(move || info!("Sequence '{}' complete", label));
        Ok(sequence)
    }

    /// Advance the scene by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        self.runtime.tick(dt);
    }

    /// Whether every tween and sequence has finished
    pub fn is_idle(&self) -> bool {
        !self.runtime.has_active_animations()
    }

    /// Current value of a property, if it has been written
    pub fn value(&self, target: &str, property: &str) -> Option<f32> {
        let target = *self.targets.get(target)?;
        self.store.borrow().get(target, property)
    }

    /// One line with every reported property
    pub fn format_frame(&self, frame: u64, time: f32) -> String {
        let mut line = format!("{:>5} {:>8.3}s", frame, time);
        for (target, property) in &self.channels {
            match self.value(target, property) {
                Some(value) => line.push_str(&format!("  {}.{}={:.3}", target, property, value)),
                None => line.push_str(&format!("  {}.{}=-", target, property)),
            }
        }
        line
    }

    pub fn runtime(&self) -> &AnimationRuntime {
        &self.runtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(stage: &mut Stage, seconds: f32, fps: u32) {
        let frames = (seconds * fps as f32).round() as u32;
        for _ in 0..frames {
            stage.tick(1.0 / fps as f32);
        }
    }

    #[test]
    fn test_starter_plays_to_completion() {
        let scenario = Scenario::parse(Scenario::starter()).unwrap();
        let mut stage = Stage::build(&scenario).unwrap();
        assert!(!stage.is_idle());

        play(&mut stage, 3.0, 60);

        assert!(stage.is_idle());
        assert!((stage.value("box", "opacity").unwrap() - 1.0).abs() < 1e-4);
        assert!((stage.value("box", "x").unwrap() - 120.0).abs() < 1e-3);
        // Four ping-pong plays end back at the start value
        assert!((stage.value("dot", "scale").unwrap() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_linear_tween_values() {
        let scenario = Scenario::parse(
            r#"
            [[tween]]
            target = "a"
            property = "x"
            from = 0.0
            to = 10.0
            duration = 2.0
            "#,
        )
        .unwrap();
        let mut stage = Stage::build(&scenario).unwrap();

        stage.tick(0.5);
        assert_eq!(stage.value("a", "x"), Some(2.5));
        assert!(stage.format_frame(1, 0.5).contains("a.x=2.500"));
    }

    #[test]
    fn test_bad_transition_is_reported() {
        let scenario = Scenario::parse(
            r#"
            [[tween]]
            target = "a"
            property = "x"
            from = 0.0
            to = 1.0
            duration = 1.0
            transition = "wobble"
            "#,
        )
        .unwrap();

        let err = Stage::build(&scenario).err().unwrap();
        assert!(err.to_string().contains("bad transition"));
    }

    #[test]
    fn test_invalid_duration_fails_start() {
        let scenario = Scenario::parse(
            r#"
            [[tween]]
            name = "broken"
            target = "a"
            property = "x"
            from = 0.0
            to = 1.0
            duration = 0.0
            "#,
        )
        .unwrap();

        let err = Stage::build(&scenario).err().unwrap();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_sequence_steps() {
        let scenario = Scenario::parse(
            r#"
            [[sequence]]
            [[sequence.step]]
            kind = "append"
            tween = { target = "a", property = "x", from = 0.0, to = 1.0, duration = 1.0 }

            [[sequence.step]]
            kind = "join"
            tween = { target = "a", property = "y", from = 0.0, to = 2.0, duration = 1.0 }

            [[sequence.step]]
            kind = "insert"
            at = 0.5
            tween = { target = "b", property = "x", from = 0.0, to = 1.0, duration = 0.5 }
            "#,
        )
        .unwrap();
        let mut stage = Stage::build(&scenario).unwrap();

        stage.tick(0.75);
        assert_eq!(stage.value("a", "y"), Some(1.5));
        assert_eq!(stage.value("b", "x"), Some(0.5));

        stage.tick(0.25);
        assert!(stage.is_idle());
        assert_eq!(stage.runtime().sequence_count(), 0);
    }
}
