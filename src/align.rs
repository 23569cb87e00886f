//! Cross-frame entity alignment
//!
//! Restricts two consecutive frames to their common entity set and sorts
//! both by entity id so position/value at index i refer to the same entity
//! in both frames. That per-index correspondence is the correctness
//! condition the renderer's interpolation depends on.

use crate::frame::Frame;
use std::collections::HashSet;

/// Two frames restricted to the same entity subset, index-parallel,
/// sorted by entity id ascending. Buffers are fresh owned copies, never
/// views into the source frames.
#[derive(Debug, Clone)]
pub struct AlignedPair {
    /// The shared entity ids, ascending
    pub entities: Vec<String>,
    pub current_positions: Vec<[f32; 3]>,
    pub current_values: Vec<f32>,
    pub next_positions: Vec<[f32; 3]>,
    pub next_values: Vec<f32>,
}

impl AlignedPair {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Align two frames on their common entities. `None` means the entity
/// sets do not intersect; the caller skips this frame pair (time-series
/// entity sets legitimately drift, this is not an error).
pub fn align(current: &Frame, next: &Frame) -> Option<AlignedPair> {
    let next_set: HashSet<&String> = next.entities.iter().collect();
    let common: HashSet<&String> = current
        .entities
        .iter()
        .filter(|e| next_set.contains(*e))
        .collect();

    if common.is_empty() {
        return None;
    }

    let (entities, current_positions, current_values) = sorted_subset(current, &common);
    let (_, next_positions, next_values) = sorted_subset(next, &common);

    Some(AlignedPair {
        entities,
        current_positions,
        current_values,
        next_positions,
        next_values,
    })
}

/// Rows of `frame` whose entity is in `keep`, sorted by entity id
/// ascending, copied into fresh contiguous buffers
fn sorted_subset(
    frame: &Frame,
    keep: &HashSet<&String>,
) -> (Vec<String>, Vec<[f32; 3]>, Vec<f32>) {
    let mut rows: Vec<usize> = (0..frame.entities.len())
        .filter(|&i| keep.contains(&frame.entities[i]))
        .collect();
    rows.sort_by(|&a, &b| frame.entities[a].cmp(&frame.entities[b]));

    let entities = rows.iter().map(|&i| frame.entities[i].clone()).collect();
    let positions = rows
        .iter()
        .map(|&i| {
            [
                frame.positions[[i, 0]],
                frame.positions[[i, 1]],
                frame.positions[[i, 2]],
            ]
        })
        .collect();
    let values = rows.iter().map(|&i| frame.values[i]).collect();

    (entities, positions, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn frame(entities: &[&str]) -> Frame {
        let n = entities.len();
        let mut positions = Array2::zeros((n, 3));
        for i in 0..n {
            positions[[i, 0]] = i as f32;
        }
        Frame {
            positions,
            values: (0..n).map(|i| i as f32 / 10.0).collect(),
            entities: entities.iter().map(|s| s.to_string()).collect(),
            color_label: String::new(),
            x_label: String::new(),
            y_label: String::new(),
            z_label: String::new(),
        }
    }

    #[test]
    fn test_align_intersection_sorted() {
        let current = frame(&["AAPL", "MSFT", "GOOG"]);
        let next = frame(&["MSFT", "GOOG", "AMZN"]);

        let pair = align(&current, &next).unwrap();
        assert_eq!(pair.len(), 2);
        assert_eq!(pair.entities, vec!["GOOG".to_string(), "MSFT".to_string()]);
        assert_eq!(pair.current_positions.len(), 2);
        assert_eq!(pair.next_positions.len(), 2);

        // GOOG is row 2 in current, row 1 in next
        assert_eq!(pair.current_positions[0][0], 2.0);
        assert_eq!(pair.next_positions[0][0], 1.0);
        assert_eq!(pair.current_values[1], 0.1);
    }

    #[test]
    fn test_align_no_common_entities() {
        let current = frame(&["AAPL", "MSFT"]);
        let next = frame(&["TSLA", "NVDA"]);
        assert!(align(&current, &next).is_none());
    }

    #[test]
    fn test_align_identical_sets() {
        let current = frame(&["B", "A", "C"]);
        let next = frame(&["C", "B", "A"]);
        let pair = align(&current, &next).unwrap();
        assert_eq!(pair.entities, vec!["A".to_string(), "B".to_string(), "C".to_string()]);
    }
}
