//! Scenario file handling

use anyhow::{Context, Result};
use glide_animation::{LoopMode, RuntimeConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// A scenario file (glide.toml)
#[derive(Debug, Deserialize, Serialize)]
pub struct Scenario {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    /// Initial property values, keyed by target name then property
    #[serde(default)]
    pub targets: BTreeMap<String, BTreeMap<String, f32>>,
    #[serde(default, rename = "tween")]
    pub tweens: Vec<TweenConfig>,
    #[serde(default, rename = "sequence")]
    pub sequences: Vec<SequenceConfig>,
}

/// Playback settings
#[derive(Debug, Deserialize, Serialize)]
pub struct PlaybackConfig {
    /// Ticks per second
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Seconds to play; plays until idle when absent
    #[serde(default)]
    pub duration: Option<f32>,
}

fn default_fps() -> u32 {
    60
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            duration: None,
        }
    }
}

/// One tween on a scalar property
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TweenConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub target: String,
    pub property: String,
    /// Start value; read from the target when absent
    #[serde(default)]
    pub from: Option<f32>,
    pub to: f32,
    pub duration: f32,
    #[serde(default = "default_transition")]
    pub transition: String,
    #[serde(default = "default_ease")]
    pub ease: String,
    #[serde(default)]
    pub delay: f32,
    /// Number of plays, 0 for infinite
    #[serde(default = "default_loops")]
    pub loops: u32,
    #[serde(default)]
    pub loop_mode: LoopMode,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default)]
    pub relative: bool,
    #[serde(default)]
    pub group: Option<String>,
}

fn default_transition() -> String {
    "linear".to_string()
}

fn default_ease() -> String {
    "in".to_string()
}

fn default_loops() -> u32 {
    1
}

fn default_speed() -> f32 {
    1.0
}

impl TweenConfig {
    /// Name used in logs
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{}.{}", self.target, self.property),
        }
    }
}

/// A sequence timeline
#[derive(Debug, Deserialize, Serialize)]
pub struct SequenceConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "step")]
    pub steps: Vec<StepConfig>,
}

/// How a step is placed on its sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Append,
    Join,
    Insert,
    Prepend,
    Interval,
    Callback,
}

/// One sequence step
#[derive(Debug, Deserialize, Serialize)]
pub struct StepConfig {
    pub kind: StepKind,
    /// Tween for append, join, insert and prepend steps
    #[serde(default)]
    pub tween: Option<TweenConfig>,
    /// Absolute time for insert steps and timed callbacks
    #[serde(default)]
    pub at: Option<f32>,
    /// Length of an interval step
    #[serde(default)]
    pub seconds: Option<f32>,
    /// Logged when a callback step fires
    #[serde(default)]
    pub message: Option<String>,
}

/// Structural problems found after parsing
#[derive(Error, Debug, PartialEq)]
pub enum ScenarioError {
    #[error("step {step} of sequence '{sequence}' ({kind:?}) needs a tween")]
    MissingTween {
        sequence: String,
        step: usize,
        kind: StepKind,
    },

    #[error("step {step} of sequence '{sequence}' needs `at`")]
    MissingTime { sequence: String, step: usize },

    #[error("step {step} of sequence '{sequence}' needs `seconds`")]
    MissingSeconds { sequence: String, step: usize },

    #[error("playback fps must be at least 1")]
    ZeroFps,
}

impl SequenceConfig {
    pub fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("sequence #{}", index + 1),
        }
    }
}

impl Scenario {
    /// Load a scenario from a file, or from glide.toml inside a directory
    pub fn load(path: &Path) -> Result<Self> {
        let scenario_path = if path.is_dir() {
            path.join("glide.toml")
        } else {
            path.to_path_buf()
        };

        if !scenario_path.exists() {
            anyhow::bail!(
                "No scenario found at {}. Run `glide init` to create one.",
                scenario_path.display()
            );
        }

        let content = fs::read_to_string(&scenario_path)
            .with_context(|| format!("Failed to read {}", scenario_path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to load {}", scenario_path.display()))
    }

    /// Parse and check a scenario from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content).context("Invalid scenario TOML")?;
        scenario.check()?;
        Ok(scenario)
    }

    fn check(&self) -> std::result::Result<(), ScenarioError> {
        if self.playback.fps == 0 {
            return Err(ScenarioError::ZeroFps);
        }
        for (index, sequence) in self.sequences.iter().enumerate() {
            let name = sequence.label(index);
            for (step, config) in sequence.steps.iter().enumerate() {
                let step = step + 1;
                match config.kind {
                    StepKind::Append | StepKind::Join | StepKind::Prepend | StepKind::Insert
                        if config.tween.is_none() =>
                    {
                        return Err(ScenarioError::MissingTween {
                            sequence: name,
                            step,
                            kind: config.kind,
                        });
                    }
                    StepKind::Insert if config.at.is_none() => {
                        return Err(ScenarioError::MissingTime {
                            sequence: name,
                            step,
                        });
                    }
                    StepKind::Interval if config.seconds.is_none() => {
                        return Err(ScenarioError::MissingSeconds {
                            sequence: name,
                            step,
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Starter scenario written by `glide init`
    pub fn starter() -> &'static str {
        STARTER
    }
}

const STARTER: &str = r#"# Glide scenario
#
# Play it with `glide run glide.toml`.

[runtime]
pool_capacity = 1000
cancel_on_invalid_target = false

[playback]
fps = 60
duration = 3.0

[targets.box]
x = 0.0
opacity = 0.0

# Fade in while sliding right
[[tween]]
name = "fade-in"
target = "box"
property = "opacity"
to = 1.0
duration = 0.5
transition = "sine"
ease = "out"

[[tween]]
name = "slide"
target = "box"
property = "x"
to = 120.0
duration = 1.0
transition = "back"
ease = "out"
relative = true
group = "intro"

# Pulse a second target after a short pause
[[sequence]]
name = "pulse"

[[sequence.step]]
kind = "interval"
seconds = 1.0

[[sequence.step]]
kind = "append"
tween = { target = "dot", property = "scale", from = 1.0, to = 1.5, duration = 0.25, transition = "quad", ease = "in_out", loops = 4, loop_mode = "ping_pong" }

[[sequence.step]]
kind = "callback"
message = "pulse finished"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_parses() {
        let scenario = Scenario::parse(Scenario::starter()).unwrap();
        assert_eq!(scenario.playback.fps, 60);
        assert_eq!(scenario.playback.duration, Some(3.0));
        assert_eq!(scenario.tweens.len(), 2);
        assert_eq!(scenario.sequences[0].steps.len(), 3);
        assert_eq!(scenario.targets["box"]["x"], 0.0);

        let pulse = scenario.sequences[0].steps[1].tween.as_ref().unwrap();
        assert_eq!(pulse.loop_mode, LoopMode::PingPong);
        assert_eq!(pulse.loops, 4);
    }

    #[test]
    fn test_defaults() {
        let scenario = Scenario::parse(
            r#"
            [[tween]]
            target = "a"
            property = "x"
            to = 1.0
            duration = 2.0
            "#,
        )
        .unwrap();

        let tween = &scenario.tweens[0];
        assert_eq!(tween.transition, "linear");
        assert_eq!(tween.ease, "in");
        assert_eq!(tween.loops, 1);
        assert_eq!(tween.speed, 1.0);
        assert_eq!(tween.label(), "a.x");
        assert_eq!(scenario.runtime, RuntimeConfig::default());
        assert_eq!(scenario.playback.fps, 60);
    }

    #[test]
    fn test_runtime_section() {
        let scenario = Scenario::parse(
            r#"
            [runtime]
            pool_capacity = 8
            max_delta = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(scenario.runtime.pool_capacity, 8);
        assert_eq!(scenario.runtime.max_delta, Some(0.1));
        assert!(!scenario.runtime.cancel_on_invalid_target);
    }

    #[test]
    fn test_step_without_tween_is_rejected() {
        let err = Scenario::parse(
            r#"
            [[sequence]]
            name = "broken"

            [[sequence.step]]
            kind = "join"
            "#,
        )
        .unwrap_err();

        let cause = err.downcast_ref::<ScenarioError>().unwrap();
        assert_eq!(
            *cause,
            ScenarioError::MissingTween {
                sequence: "broken".to_string(),
                step: 1,
                kind: StepKind::Join,
            }
        );
    }

    #[test]
    fn test_interval_needs_seconds() {
        let err = Scenario::parse(
            r#"
            [[sequence]]
            [[sequence.step]]
            kind = "interval"
            "#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("needs `seconds`"));
    }

    #[test]
    fn test_unknown_step_kind() {
        let result = Scenario::parse(
            r#"
            [[sequence]]
            [[sequence.step]]
            kind = "teleport"
            "#,
        );
        assert!(result.is_err());
    }
}
