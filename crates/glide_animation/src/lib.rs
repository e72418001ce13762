//! Glide Animation Engine
//!
//! Frame-driven tweening for any host that can read and write properties.
//!
//! # Features
//!
//! - **Easing**: 12 transition shapes (plus cubic bezier) in four ease modes
//! - **Clips**: deterministic A-to-B interpolation advanced by explicit deltas
//! - **Tweens**: delay, speed, looping, ping-pong, pause, relative values,
//!   callbacks and property bindings
//! - **Pooling**: finished tweens are recycled per value type
//! - **Groups**: tag tweens and pause, resume, kill or complete them together
//! - **Sequences**: append, join, insert and prepend steps on a timeline
//!
//! # Example
//!
//! ```rust
//! use glide_animation::{AnimationRuntime, EaseMode, Transition};
//! use glide_core::{PropertyAccessor, PropertyStore};
//!
//! let store = PropertyStore::<f32>::new().shared();
//! let node = store.borrow_mut().spawn();
//!
//! let mut runtime = AnimationRuntime::new();
//! let tween = runtime
//!     .tween::<f32>()
//!     .from(0.0)
//!     .to(10.0)
//!     .duration(2.0)
//!     .transition(Transition::Linear)
//!     .ease_mode(EaseMode::In)
//!     .bind(node, "x", store.clone());
//! runtime.start(tween).unwrap();
//!
//! runtime.tick(0.5);
//! assert_eq!(store.borrow().get(node, "x"), Some(2.5));
//! ```

pub mod callbacks;
pub mod clip;
pub mod config;
pub mod easing;
pub mod error;
pub mod pool;
pub mod registry;
pub mod runtime;
pub mod sequence;
pub mod tween;

pub use callbacks::CallbackId;
pub use clip::{lerp_interpolator, Clip, ClipStep, Interpolator};
pub use config::RuntimeConfig;
pub use easing::{ease, EaseMode, Easing, Transition, UnknownEasing};
pub use error::{ErrorKind, Result, TweenError};
pub use pool::{Pool, PoolSet, Poolable, Release, DEFAULT_POOL_CAPACITY};
pub use registry::{Registry, TweenId};
pub use runtime::AnimationRuntime;
pub use sequence::{Sequence, SequenceId, SequenceState};
pub use tween::{Advance, Animation, LoopMode, Loops, PropertyBinding, Tween, TweenState};
