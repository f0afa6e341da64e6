//! Generators for synthetic time axes and validity masks.

use chrono::{DateTime, Duration, Utc};

/// A regularly spaced time axis.
pub fn regular_times(start: DateTime<Utc>, step: Duration, count: usize) -> Vec<DateTime<Utc>> {
    (0..count).map(|i| start + step * i as i32).collect()
}

/// A `height * width` frame that is finite inside the given rectangle and
/// NaN outside it.
///
/// `valid` is (top, left, rect_height, rect_width). Finite pixels carry
/// `row * 1000 + col` so reads are easy to verify.
pub fn masked_frame(
    height: usize,
    width: usize,
    valid: (usize, usize, usize, usize),
) -> Vec<f32> {
    let (top, left, rect_h, rect_w) = valid;
    let mut data = vec![f32::NAN; height * width];
    for row in top..(top + rect_h).min(height) {
        for col in left..(left + rect_w).min(width) {
            data[row * width + col] = (row * 1000 + col) as f32;
        }
    }
    data
}

/// An all-NaN frame.
pub fn nan_frame(height: usize, width: usize) -> Vec<f32> {
    vec![f32::NAN; height * width]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_regular_times() {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let times = regular_times(start, Duration::minutes(5), 3);
        assert_eq!(times.len(), 3);
        assert_eq!(times[2] - times[0], Duration::minutes(10));
    }

    #[test]
    fn test_masked_frame() {
        let frame = masked_frame(4, 4, (1, 1, 2, 2));
        assert!(frame[0].is_nan());
        assert_eq!(frame[5], 1001.0);
        assert_eq!(frame[10], 2002.0);
        assert!(frame[15].is_nan());
    }
}
