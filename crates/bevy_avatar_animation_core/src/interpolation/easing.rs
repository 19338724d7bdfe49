/// Cubic ease-in-out. Input is clamped to `[0, 1]`.
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0., 1.);
    if t < 0.5 {
        4. * t * t * t
    } else {
        1. - (-2. * t + 2.).powi(3) / 2.
    }
}

/// Progress of a transition of `duration` seconds after `elapsed` seconds, eased.
/// Zero-length transitions are complete immediately.
pub fn eased_progress(elapsed: f32, duration: f32) -> f32 {
    if duration <= 0. {
        return 1.;
    }
    ease_in_out_cubic(elapsed / duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_is_symmetric_and_pinned_at_ends() {
        assert_eq!(ease_in_out_cubic(0.), 0.);
        assert_eq!(ease_in_out_cubic(1.), 1.);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
        let a = ease_in_out_cubic(0.2);
        let b = ease_in_out_cubic(0.8);
        assert!((a + b - 1.).abs() < 1e-6);
        assert_eq!(ease_in_out_cubic(-3.), 0.);
        assert_eq!(ease_in_out_cubic(7.), 1.);
    }

    #[test]
    fn zero_duration_is_done() {
        assert_eq!(eased_progress(0., 0.), 1.);
        assert!(eased_progress(0.1, 1.) < 0.1);
    }
}
