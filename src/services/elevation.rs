// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Elevation smoothing and gain calculation.

/// Smooths raw elevations and computes total gain with hysteresis.
#[derive(Debug, Clone, Copy)]
pub struct ElevationProcessor {
    window: usize,
    up_threshold: f64,
    down_threshold: f64,
}

impl ElevationProcessor {
    /// `window` should be odd; even windows are reduced by one.
    pub fn new(window: usize, up_threshold: f64, down_threshold: f64) -> Self {
        Self {
            window: odd_at_most(window.max(1)),
            up_threshold,
            down_threshold,
        }
    }

    /// Moving average with reflected ends; output has the input's length.
    ///
    /// The input is padded with `x[w-1]..x[1]` on the left and
    /// `x[n-2]..x[n-w]` on the right, convolved with a flat window, and
    /// `w/2` samples are trimmed from each end of the result.
    pub fn smooth(&self, raw: &[f64]) -> Vec<f64> {
        let n = raw.len();
        let w = odd_at_most(self.window.min(n));
        if w <= 1 {
            return raw.to_vec();
        }

        let mut padded = Vec::with_capacity(n + 2 * (w - 1));
        padded.extend((1..w).rev().map(|i| raw[i]));
        padded.extend_from_slice(raw);
        padded.extend((n - w..n - 1).rev().map(|i| raw[i]));

        // valid convolution with ones(w)/w
        let mut conv = Vec::with_capacity(padded.len() - w + 1);
        let mut sum: f64 = padded[..w].iter().sum();
        conv.push(sum / w as f64);
        for i in w..padded.len() {
            sum += padded[i] - padded[i - w];
            conv.push(sum / w as f64);
        }

        // conv has n + w - 1 samples
        let trim = w / 2;
        conv[trim..trim + n].to_vec()
    }

    /// Total ascent, rounded to an integer.
    ///
    /// An ascent counts once it has risen at least `up_threshold` from the
    /// preceding low, and is credited when the elevation later drops at
    /// least `down_threshold` below the peak, or when the sequence ends.
    pub fn gain(&self, elevations: &[f64]) -> i64 {
        let Some(&first) = elevations.first() else {
            return 0;
        };

        let mut total = 0.0;
        let mut low = first;
        let mut high = first;
        let mut climbing = false;

        for &e in &elevations[1..] {
            if climbing {
                if e > high {
                    high = e;
                } else if high - e >= self.down_threshold {
                    total += high - low;
                    low = e;
                    high = e;
                    climbing = false;
                }
            } else if e < low {
                low = e;
            } else if e - low >= self.up_threshold {
                high = e;
                climbing = true;
            }
        }

        if climbing {
            total += high - low;
        }

        total.round() as i64
    }
}

fn odd_at_most(n: usize) -> usize {
    if n % 2 == 0 {
        n.saturating_sub(1)
    } else {
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> ElevationProcessor {
        ElevationProcessor::new(5, 8.0, 8.0)
    }

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_smooth_constant_is_identity() {
        let raw = vec![42.0; 17];
        assert!(close(&processor().smooth(&raw), &raw));
    }

    #[test]
    fn test_smooth_preserves_length() {
        for n in 0..12 {
            let raw: Vec<f64> = (0..n).map(|i| (i * i) as f64).collect();
            assert_eq!(processor().smooth(&raw).len(), n);
        }
    }

    #[test]
    fn test_smooth_reflect_padding_values() {
        // w = 3: padded = [x2, x1, x0, x1, x2, x3, x2, x1]
        let p = ElevationProcessor::new(3, 8.0, 8.0);
        let out = p.smooth(&[0.0, 3.0, 6.0, 9.0]);
        let expected = [(3.0 + 0.0 + 3.0) / 3.0, 3.0, 6.0, (6.0 + 9.0 + 6.0) / 3.0];
        assert!(close(&out, &expected), "{:?}", out);
    }

    #[test]
    fn test_smooth_linear_interior_unchanged() {
        let raw: Vec<f64> = (0..20).map(|i| i as f64 * 2.0).collect();
        let out = processor().smooth(&raw);
        for i in 2..18 {
            assert!((out[i] - raw[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_smooth_short_track_uses_smaller_window() {
        let out = processor().smooth(&[1.0, 2.0]);
        assert!(close(&out, &[1.0, 2.0]));
        let out = processor().smooth(&[0.0, 3.0, 6.0]);
        assert!(close(&out, &[2.0, 3.0, 4.0]));
    }

    #[test]
    fn test_window_of_one_returns_input() {
        let p = ElevationProcessor::new(1, 8.0, 8.0);
        assert!(close(&p.smooth(&[1.0, 9.0, 4.0]), &[1.0, 9.0, 4.0]));
    }

    #[test]
    fn test_gain_flat_is_zero() {
        assert_eq!(processor().gain(&[100.0; 50]), 0);
    }

    #[test]
    fn test_gain_monotonic_climb() {
        let climb: Vec<f64> = (0..=40).map(|i| 100.0 + i as f64 * 1.5).collect();
        assert_eq!(processor().gain(&climb), 60);
    }

    #[test]
    fn test_gain_ignores_noise_below_threshold() {
        let noisy: Vec<f64> = (0..100)
            .map(|i| if i % 2 == 0 { 100.0 } else { 105.0 })
            .collect();
        assert_eq!(processor().gain(&noisy), 0);
    }

    #[test]
    fn test_gain_two_hills() {
        let profile = [100.0, 110.0, 120.0, 105.0, 100.0, 115.0, 130.0, 125.0];
        // hill one: 100 -> 120, confirmed by the drop to 105
        // hill two: 100 -> 130, credited at the end while still within the down threshold
        assert_eq!(processor().gain(&profile), 50);
    }

    #[test]
    fn test_gain_rounds() {
        let p = ElevationProcessor::new(1, 1.0, 1.0);
        assert_eq!(p.gain(&[0.0, 10.6]), 11);
        assert_eq!(p.gain(&[]), 0);
    }
}
