//! Easing curves for opacity transitions
//!
//! Names follow the css timing-function keywords a light's `easing` setting
//! carries. Unknown names fall back to the default curve.

use crate::constants::defaults;

/// A resolved easing curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    Ease,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Easing {
    /// Resolve a css timing-function keyword. Unknown names use the
    /// default curve rather than failing.
    pub fn from_name(name: &str) -> Easing {
        match name.trim() {
            "linear" => Easing::Linear,
            "ease" => Easing::Ease,
            "ease-in" => Easing::EaseIn,
            "ease-out" => Easing::EaseOut,
            "ease-in-out" => Easing::EaseInOut,
            _ => Self::from_name(defaults::EASING),
        }
    }

    /// Map normalized time t (0..=1) onto eased progress
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => linear(t),
            // css `ease` front-loads like ease-out but keeps a soft start;
            // the in-out curve is the closest cubic stand-in
            Easing::Ease => ease_in_out(t),
            Easing::EaseIn => ease_in_cubic(t),
            Easing::EaseOut => ease_out_cubic(t),
            Easing::EaseInOut => ease_in_out(t),
        }
    }
}

/// Ease-in-out cubic function
#[inline]
pub fn ease_in_out(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Ease-out cubic function
#[inline]
pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

/// Ease-in cubic function
#[inline]
pub fn ease_in_cubic(t: f64) -> f64 {
    t * t * t
}

/// Linear interpolation (no easing)
#[inline]
pub fn linear(t: f64) -> f64 {
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_in_out() {
        // Start at 0
        assert!((ease_in_out(0.0) - 0.0).abs() < 0.001);
        // End at 1
        assert!((ease_in_out(1.0) - 1.0).abs() < 0.001);
        // Midpoint at 0.5
        assert!((ease_in_out(0.5) - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_ease_out_cubic() {
        assert!((ease_out_cubic(0.0) - 0.0).abs() < 0.001);
        assert!((ease_out_cubic(1.0) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_linear() {
        assert!((linear(0.0) - 0.0).abs() < 0.001);
        assert!((linear(0.5) - 0.5).abs() < 0.001);
        assert!((linear(1.0) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_from_name_known() {
        assert_eq!(Easing::from_name("ease-out"), Easing::EaseOut);
        assert_eq!(Easing::from_name(" linear "), Easing::Linear);
    }

    #[test]
    fn test_from_name_unknown_falls_back() {
        assert_eq!(Easing::from_name("bounce"), Easing::EaseOut);
        assert_eq!(Easing::from_name(""), Easing::EaseOut);
    }

    #[test]
    fn test_apply_clamps_time() {
        assert_eq!(Easing::Linear.apply(-1.0), 0.0);
        assert_eq!(Easing::Linear.apply(2.0), 1.0);
    }
}
