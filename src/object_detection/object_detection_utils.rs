use crate::annotations::bounding_box::BoundingBox;
use crate::error::{DetectionError, Result};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Reads a file with the class names into a vector so that the number ids
/// which come directly from the inference session can be given meaning.
pub fn read_classes_txt_file(filepath: &Path) -> Result<Vec<String>> {
    let names = BufReader::new(File::open(filepath)?)
        .lines()
        .collect::<io::Result<Vec<String>>>()?;
    Ok(names)
}

/// Validates a class-name table against the class count the model declares.
/// A mismatch is fatal at setup time, long before any tensor is decoded.
pub fn check_class_names(num_classes: usize, class_names: &[String]) -> Result<()> {
    if class_names.len() != num_classes {
        return Err(DetectionError::ClassCountMismatch {
            expected: num_classes,
            actual: class_names.len(),
        });
    }
    Ok(())
}

/// Non maximum suppression is a way of removing duplicate detections.
///
/// Greedy and class-agnostic: indices are visited in descending-score order
/// (ties keep their original relative order), each accepted index suppresses
/// every remaining box overlapping it with IoU strictly above the threshold.
/// Returns the surviving indices into the input slices, in acceptance order.
/// Callers wanting per-class suppression partition the inputs by class first.
pub fn nms(boxes: &[BoundingBox], scores: &[f32], iou_threshold: f32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; boxes.len()];
    for (position, &index) in order.iter().enumerate() {
        if suppressed[index] {
            continue;
        }
        keep.push(index);
        for &other in &order[position + 1..] {
            if suppressed[other] {
                continue;
            }
            if boxes[index].intersection_over_union(&boxes[other]) > iou_threshold {
                suppressed[other] = true;
            }
        }
    }
    keep
}

/// Index of the largest value in a slice, first occurrence winning ties.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (index, &value) in values.iter().enumerate() {
        if value > best_value {
            best = index;
            best_value = value;
        }
    }
    best
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Deterministic per-class color chart for mask compositing and rendering.
pub fn generate_color_chart(num_classes: usize, seed: u64) -> Vec<[u8; 3]> {
    let mut state = seed | 1;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state % 256) as u8
    };
    (0..num_classes).map(|_| [next(), next(), next()]).collect()
}
