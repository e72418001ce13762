//! Animation error types

use glide_core::TargetRef;
use thiserror::Error;

/// Errors reported by tween and sequence operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TweenError {
    /// Duration is zero, negative, or not finite
    #[error("invalid duration {0}: must be positive and finite")]
    InvalidDuration(f32),

    /// No interpolation function was configured
    #[error("no interpolator configured")]
    MissingInterpolator,

    /// No start value, and no bound property to read one from
    #[error("no start value configured and no bound property to read it from")]
    MissingStartValue,

    /// No end value configured
    #[error("no end value configured")]
    MissingEndValue,

    /// Relative tween without an offset function
    #[error("relative tween has no offset function")]
    MissingOffset,

    /// The bound target is no longer valid
    #[error("target {0:?} is no longer valid")]
    InvalidTarget(TargetRef),

    /// Finite loop count below one
    #[error("loop count must be at least 1, got {0} (use infinite loops for unbounded repetition)")]
    InvalidLoopCount(u32),

    /// Speed scale is negative or not finite
    #[error("invalid speed scale {0}: must be finite and non-negative")]
    InvalidSpeedScale(f32),

    /// Delay is negative or not finite
    #[error("invalid delay {0}: must be finite and non-negative")]
    InvalidDelay(f32),

    /// A sequence step was rejected
    #[error("invalid sequence step: {0}")]
    InvalidStep(String),

    /// Operation on a handle that is not (or no longer) active
    #[error("animation is not active")]
    NotActive,
}

/// Error taxonomy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad configuration detected at configure/start time
    Configuration,
    /// Invalid argument rejected synchronously, state unchanged
    Argument,
    /// Host reports the target is gone
    InvalidTarget,
    /// Handle is not in a state that allows the operation
    State,
}

impl TweenError {
    /// Category this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            TweenError::InvalidDuration(_)
            | TweenError::MissingInterpolator
            | TweenError::MissingStartValue
            | TweenError::MissingEndValue
            | TweenError::MissingOffset => ErrorKind::Configuration,
            TweenError::InvalidLoopCount(_)
            | TweenError::InvalidSpeedScale(_)
            | TweenError::InvalidDelay(_)
            | TweenError::InvalidStep(_) => ErrorKind::Argument,
            TweenError::InvalidTarget(_) => ErrorKind::InvalidTarget,
            TweenError::NotActive => ErrorKind::State,
        }
    }
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, TweenError>;
