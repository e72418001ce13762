//! Glide Core
//!
//! Host-facing primitives shared by the Glide animation engine:
//!
//! - **Animatable values**: `Vec2`, `Vec3`, `Color`, plus the `Interpolate`
//!   and `Offset` traits used for blending and relative tweens
//! - **Targets**: opaque `TargetRef` handles to host objects
//! - **Property access**: the `PropertyAccessor` capability a host implements,
//!   and an in-memory `PropertyStore` for headless playback
//!
//! # Example
//!
//! ```rust
//! use glide_core::{Interpolate, PropertyAccessor, PropertyStore};
//!
//! let mut store = PropertyStore::<f32>::new();
//! let node = store.spawn();
//! store.set(node, "opacity", 0.0_f32.lerp(&1.0, 0.5));
//!
//! assert_eq!(store.get(node, "opacity"), Some(0.5));
//! ```

pub mod target;
pub mod value;

pub use target::{PropertyAccessor, PropertyStore, SharedAccessor, TargetRef};
pub use value::{Color, Interpolate, Offset, Vec2, Vec3};
