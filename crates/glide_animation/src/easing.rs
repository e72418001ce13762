//! Easing functions for animations
//!
//! An [`Easing`] pairs a [`Transition`] (the shape of the curve) with an
//! [`EaseMode`] (which end of the curve the shape applies to). Every
//! transition is written in its "in" form by [`Transition::shape`]; the
//! other modes are derived from it.

use std::f32::consts::PI;
use std::str::FromStr;
use thiserror::Error;

/// Overshoot constant for [`Transition::Back`]
const BACK_OVERSHOOT: f32 = 1.70158;
/// Bounce segment constants
const BOUNCE_N1: f32 = 7.5625;
const BOUNCE_D1: f32 = 2.75;

/// Shape of an easing curve
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Transition {
    #[default]
    Linear,
    Sine,
    Quad,
    Cubic,
    Quart,
    Quint,
    Expo,
    Circ,
    Elastic,
    Back,
    Bounce,
    Spring,
    /// CSS-style cubic bezier through (x1, y1) and (x2, y2)
    CubicBezier(f32, f32, f32, f32),
}

/// Which end(s) of the curve the transition shapes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EaseMode {
    #[default]
    In,
    Out,
    InOut,
    OutIn,
}

impl Transition {
    /// All named transitions (excludes the parameterised bezier)
    pub const ALL: [Transition; 12] = [
        Transition::Linear,
        Transition::Sine,
        Transition::Quad,
        Transition::Cubic,
        Transition::Quart,
        Transition::Quint,
        Transition::Expo,
        Transition::Circ,
        Transition::Elastic,
        Transition::Back,
        Transition::Bounce,
        Transition::Spring,
    ];

    /// Evaluate the "in" form of this transition at normalized time `t`
    ///
    /// The result is 0.0 at `t = 0` and 1.0 at `t = 1`, but may leave
    /// that range in between (Back, Elastic, Spring overshoot).
    pub fn shape(&self, t: f32) -> f32 {
        match self {
            Transition::Linear => t,
            Transition::Sine => 1.0 - (t * PI / 2.0).cos(),
            Transition::Quad => t * t,
            Transition::Cubic => t * t * t,
            Transition::Quart => t * t * t * t,
            Transition::Quint => t * t * t * t * t,
            Transition::Expo => {
                if t <= 0.0 {
                    0.0
                } else {
                    2f32.powf(10.0 * t - 10.0)
                }
            }
            Transition::Circ => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
            Transition::Elastic => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    let c4 = (2.0 * PI) / 3.0;
                    -(2f32.powf(10.0 * t - 10.0)) * ((10.0 * t - 10.75) * c4).sin()
                }
            }
            Transition::Back => {
                let c3 = BACK_OVERSHOOT + 1.0;
                c3 * t * t * t - BACK_OVERSHOOT * t * t
            }
            Transition::Bounce => 1.0 - bounce_out(1.0 - t),
            Transition::Spring => {
                1.0 - (t * PI * (0.2 + 2.5 * t * t * t)).cos() * (1.0 - t).max(0.0).powf(2.2)
            }
            Transition::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
        }
    }

    /// Whether the curve leaves 0.0..=1.0 between its endpoints
    pub fn overshoots(&self) -> bool {
        matches!(
            self,
            Transition::Elastic | Transition::Back | Transition::Bounce | Transition::Spring
        )
    }
}

impl EaseMode {
    pub const ALL: [EaseMode; 4] = [EaseMode::In, EaseMode::Out, EaseMode::InOut, EaseMode::OutIn];

    /// Apply this mode to a transition at normalized time `t`
    pub fn apply(&self, transition: Transition, t: f32) -> f32 {
        match self {
            EaseMode::In => transition.shape(t),
            EaseMode::Out => 1.0 - transition.shape(1.0 - t),
            EaseMode::InOut => {
                if t < 0.5 {
                    transition.shape(2.0 * t) / 2.0
                } else {
                    1.0 - transition.shape(2.0 * (1.0 - t)) / 2.0
                }
            }
            EaseMode::OutIn => {
                if t < 0.5 {
                    (1.0 - transition.shape(1.0 - 2.0 * t)) / 2.0
                } else {
                    transition.shape(2.0 * t - 1.0) / 2.0 + 0.5
                }
            }
        }
    }
}

/// Evaluate `mode` applied to `transition` at normalized time `t`
pub fn ease(mode: EaseMode, transition: Transition, t: f32) -> f32 {
    mode.apply(transition, t)
}

/// Easing function: a transition shape and the mode it is applied with
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Easing {
    pub transition: Transition,
    #[cfg_attr(feature = "serde", serde(default))]
    pub mode: EaseMode,
}

impl Easing {
    pub const LINEAR: Easing = Easing::new(Transition::Linear, EaseMode::In);

    pub const fn new(transition: Transition, mode: EaseMode) -> Self {
        Self { transition, mode }
    }

    pub const fn ease_in(transition: Transition) -> Self {
        Self::new(transition, EaseMode::In)
    }

    pub const fn ease_out(transition: Transition) -> Self {
        Self::new(transition, EaseMode::Out)
    }

    pub const fn ease_in_out(transition: Transition) -> Self {
        Self::new(transition, EaseMode::InOut)
    }

    pub const fn ease_out_in(transition: Transition) -> Self {
        Self::new(transition, EaseMode::OutIn)
    }

    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f32) -> f32 {
        self.mode.apply(self.transition, t)
    }
}

fn bounce_out(t: f32) -> f32 {
    if t < 1.0 / BOUNCE_D1 {
        BOUNCE_N1 * t * t
    } else if t < 2.0 / BOUNCE_D1 {
        let t = t - 1.5 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.75
    } else if t < 2.5 / BOUNCE_D1 {
        let t = t - 2.25 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.984375
    }
}

/// Cubic bezier easing calculation (matches CSS spec / browser implementations).
///
/// Uses Newton-Raphson with binary-search fallback for robustness.
/// Computes in f64 internally to avoid f32 precision jitter.
fn cubic_bezier_ease(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    let x = t as f64;
    let (x1, y1, x2, y2) = (x1 as f64, y1 as f64, x2 as f64, y2 as f64);

    let mut p = x;
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - x;
        if err.abs() < 1e-7 {
            return bezier_sample(p, y1, y2) as f32;
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-7 {
            break;
        }
        p -= err / slope;
    }

    // Binary search fallback (always converges)
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = x;
    for _ in 0..20 {
        let val = bezier_sample(p, x1, x2);
        if (val - x).abs() < 1e-7 {
            break;
        }
        if val < x {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2) as f32
}

/// B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³, in Horner form
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}

// ============================================================================
// Name parsing (used by scenario files and the CLI)
// ============================================================================

/// Error returned when a transition or mode name is not recognised
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("unknown easing name '{0}'")]
pub struct UnknownEasing(pub String);

impl FromStr for Transition {
    type Err = UnknownEasing;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = match s.to_ascii_lowercase().as_str() {
            "linear" => Transition::Linear,
            "sine" => Transition::Sine,
            "quad" => Transition::Quad,
            "cubic" => Transition::Cubic,
            "quart" => Transition::Quart,
            "quint" => Transition::Quint,
            "expo" => Transition::Expo,
            "circ" => Transition::Circ,
            "elastic" => Transition::Elastic,
            "back" => Transition::Back,
            "bounce" => Transition::Bounce,
            "spring" => Transition::Spring,
            _ => return Err(UnknownEasing(s.to_string())),
        };
        Ok(t)
    }
}

impl FromStr for EaseMode {
    type Err = UnknownEasing;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let m = match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "in" => EaseMode::In,
            "out" => EaseMode::Out,
            "in_out" | "inout" => EaseMode::InOut,
            "out_in" | "outin" => EaseMode::OutIn,
            _ => return Err(UnknownEasing(s.to_string())),
        };
        Ok(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_endpoints_for_every_transition_and_mode() {
        for transition in Transition::ALL {
            for mode in EaseMode::ALL {
                let start = ease(mode, transition, 0.0);
                let end = ease(mode, transition, 1.0);
                assert!(start.abs() < EPS, "{transition:?}/{mode:?} at 0 = {start}");
                assert!((end - 1.0).abs() < EPS, "{transition:?}/{mode:?} at 1 = {end}");
            }
        }
    }

    #[test]
    fn test_in_out_and_out_in_meet_at_midpoint() {
        for transition in Transition::ALL {
            let a = ease(EaseMode::InOut, transition, 0.5);
            let b = ease(EaseMode::OutIn, transition, 0.5);
            assert!((a - b).abs() < EPS, "{transition:?}: {a} != {b}");
        }
    }

    #[test]
    fn test_known_values() {
        assert!((Transition::Quad.shape(0.5) - 0.25).abs() < EPS);
        assert!((Transition::Cubic.shape(0.5) - 0.125).abs() < EPS);
        assert!((ease(EaseMode::Out, Transition::Quad, 0.5) - 0.75).abs() < EPS);
        assert!((ease(EaseMode::InOut, Transition::Cubic, 0.25) - 0.0625).abs() < EPS);
        assert!((Transition::Sine.shape(0.5) - (1.0 - (PI / 4.0).cos())).abs() < EPS);
    }

    #[test]
    fn test_back_overshoots_below_zero() {
        let min = (1..100)
            .map(|i| Transition::Back.shape(i as f32 / 100.0))
            .fold(f32::MAX, f32::min);
        assert!(min < 0.0);
    }

    #[test]
    fn test_elastic_out_overshoots_above_one() {
        let max = (1..100)
            .map(|i| ease(EaseMode::Out, Transition::Elastic, i as f32 / 100.0))
            .fold(f32::MIN, f32::max);
        assert!(max > 1.0);
    }

    #[test]
    fn test_bounce_segments_are_continuous() {
        for edge in [1.0 / BOUNCE_D1, 2.0 / BOUNCE_D1, 2.5 / BOUNCE_D1] {
            let before = bounce_out(edge - 1e-4);
            let after = bounce_out(edge + 1e-4);
            assert!((before - after).abs() < 1e-2);
        }
        assert!((bounce_out(1.0) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_cubic_bezier_linear_control_points() {
        let linear = Transition::CubicBezier(0.0, 0.0, 1.0, 1.0);
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            assert!((linear.shape(t) - t).abs() < 1e-4);
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Bounce".parse::<Transition>(), Ok(Transition::Bounce));
        assert_eq!("in-out".parse::<EaseMode>(), Ok(EaseMode::InOut));
        assert_eq!("out_in".parse::<EaseMode>(), Ok(EaseMode::OutIn));
        assert!("wobble".parse::<Transition>().is_err());
    }
}
