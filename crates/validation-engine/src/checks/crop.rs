//! Maximal all-valid rectangle search.
//!
//! Given a combined validity mask, finds the axis-aligned rectangle that
//! maximizes the shorter side (then area) using the row-histogram
//! largest-rectangle technique: per row, each column tracks its run of
//! consecutive valid rows, and a monotonic stack solves the histogram in
//! linear time. Total cost is linear in the number of pixels.

use serde::Serialize;

/// An axis-aligned pixel window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub top: usize,
    pub left: usize,
    pub height: usize,
    pub width: usize,
}

impl Window {
    /// The shorter side.
    pub fn min_dim(&self) -> usize {
        self.height.min(self.width)
    }
}

/// Find the valid rectangle maximizing (shorter side, area).
///
/// The scan visits rows top-down and pops the histogram stack left-to-right,
/// and a candidate only replaces the incumbent when strictly better, so the
/// returned window is deterministic: among equals, the one with the smallest
/// row index and then the smallest column index wins.
///
/// Returns `None` for an all-invalid mask.
pub fn largest_valid_window(mask: &[bool], height: usize, width: usize) -> Option<Window> {
    debug_assert_eq!(mask.len(), height * width);
    if height == 0 || width == 0 {
        return None;
    }

    let mut run_heights = vec![0usize; width];
    let mut best: Option<((usize, usize), Window)> = None;

    for row in 0..height {
        for col in 0..width {
            run_heights[col] = if mask[row * width + col] {
                run_heights[col] + 1
            } else {
                0
            };
        }

        // Largest rectangle in histogram with a monotonic stack; the
        // sentinel pass at col == width flushes the stack.
        let mut stack: Vec<usize> = Vec::with_capacity(width);
        for col in 0..=width {
            let current = if col < width { run_heights[col] } else { 0 };
            while let Some(&top_idx) = stack.last() {
                if run_heights[top_idx] <= current {
                    break;
                }
                stack.pop();
                let rect_height = run_heights[top_idx];
                let rect_left = stack.last().map_or(0, |&i| i + 1);
                let rect_width = col - rect_left;
                if rect_height == 0 || rect_width == 0 {
                    continue;
                }
                let window = Window {
                    top: row + 1 - rect_height,
                    left: rect_left,
                    height: rect_height,
                    width: rect_width,
                };
                let key = (window.min_dim(), rect_height * rect_width);
                if best.as_ref().map_or(true, |(incumbent, _)| key > *incumbent) {
                    best = Some((key, window));
                }
            }
            stack.push(col);
        }
    }

    best.map(|(_, window)| window)
}

/// AND `frame_valid` into `mask` in place.
pub fn intersect_mask(mask: &mut [bool], frame_valid: impl Fn(usize) -> bool) {
    for (i, bit) in mask.iter_mut().enumerate() {
        *bit = *bit && frame_valid(i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with_rect(
        height: usize,
        width: usize,
        rect: (usize, usize, usize, usize),
    ) -> Vec<bool> {
        let (top, left, h, w) = rect;
        let mut mask = vec![false; height * width];
        for row in top..top + h {
            for col in left..left + w {
                mask[row * width + col] = true;
            }
        }
        mask
    }

    #[test]
    fn test_single_square_found() {
        let mask = mask_with_rect(400, 400, (30, 50, 300, 300));
        let window = largest_valid_window(&mask, 400, 400).unwrap();
        assert_eq!(
            window,
            Window {
                top: 30,
                left: 50,
                height: 300,
                width: 300
            }
        );
        assert!(window.min_dim() >= 256);
    }

    #[test]
    fn test_undersized_region_reports_its_size() {
        let mask = mask_with_rect(300, 300, (10, 10, 255, 255));
        let window = largest_valid_window(&mask, 300, 300).unwrap();
        assert_eq!(window.min_dim(), 255);
    }

    #[test]
    fn test_all_invalid_yields_none() {
        let mask = vec![false; 64 * 64];
        assert!(largest_valid_window(&mask, 64, 64).is_none());
    }

    #[test]
    fn test_prefers_larger_min_dim_over_area() {
        // A 4x12 strip (area 48) loses to a 6x6 square (area 36).
        let mut mask = mask_with_rect(20, 20, (0, 0, 4, 12));
        for row in 10..16 {
            for col in 10..16 {
                mask[row * 20 + col] = true;
            }
        }
        let window = largest_valid_window(&mask, 20, 20).unwrap();
        assert_eq!((window.height, window.width), (6, 6));
        assert_eq!((window.top, window.left), (10, 10));
    }

    #[test]
    fn test_deterministic_tie_break() {
        // Two identical 5x5 squares; the topmost-leftmost one must win,
        // and reruns must agree.
        let mut mask = mask_with_rect(20, 20, (2, 2, 5, 5));
        for row in 12..17 {
            for col in 12..17 {
                mask[row * 20 + col] = true;
            }
        }
        let first = largest_valid_window(&mask, 20, 20).unwrap();
        let second = largest_valid_window(&mask, 20, 20).unwrap();
        assert_eq!(first, second);
        assert_eq!((first.top, first.left), (2, 2));
    }

    #[test]
    fn test_irregular_region() {
        // An L-shape: the largest square sits in the thick arm.
        let mut mask = mask_with_rect(12, 12, (0, 0, 12, 4));
        for row in 8..12 {
            for col in 0..12 {
                mask[row * 12 + col] = true;
            }
        }
        let window = largest_valid_window(&mask, 12, 12).unwrap();
        assert_eq!(window.min_dim(), 4);
    }

    #[test]
    fn test_intersect_mask() {
        let mut mask = vec![true; 4];
        intersect_mask(&mut mask, |i| i % 2 == 0);
        assert_eq!(mask, vec![true, false, true, false]);
        intersect_mask(&mut mask, |_| true);
        assert_eq!(mask, vec![true, false, true, false]);
    }
}
