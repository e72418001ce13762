//! Runtime configuration

use crate::pool::DEFAULT_POOL_CAPACITY;

/// Settings for an [`AnimationRuntime`](crate::runtime::AnimationRuntime)
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RuntimeConfig {
    /// Free tweens retained per value type
    pub pool_capacity: usize,
    /// Default for tweens that do not choose: cancel instead of skipping
    /// the apply when the bound target becomes invalid
    pub cancel_on_invalid_target: bool,
    /// Upper bound on a single tick's delta, in seconds
    pub max_delta: Option<f32>,
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    pub fn with_cancel_on_invalid_target(mut self, cancel: bool) -> Self {
        self.cancel_on_invalid_target = cancel;
        self
    }

    pub fn with_max_delta(mut self, seconds: f32) -> Self {
        self.max_delta = Some(seconds);
        self
    }

    /// Clamp a tick delta to the configured bounds
    pub fn clamp_delta(&self, dt: f32) -> f32 {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        match self.max_delta {
            Some(max) if max >= 0.0 => dt.min(max),
            _ => dt,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            pool_capacity: DEFAULT_POOL_CAPACITY,
            cancel_on_invalid_target: false,
            max_delta: None,
        }
    }
}
