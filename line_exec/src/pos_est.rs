//! # Position estimation
//!
//! Converts a set of line detections into a continuous estimate of where the
//! line is relative to the centre of the sensor array.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use util::maths;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Estimated position of the line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionEstimate {
    /// Offset of the line from the array centre, in the same units as the
    /// sensor weights. Negative means the line is to the left.
    pub offset: f64,

    /// False if no sensor saw the line, in which case `offset` is the last
    /// known offset.
    pub detected: bool,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Estimate the line position from a reading.
///
/// The offset is the mean of the weights of every detecting sensor, so two
/// sensors placed symmetrically about the centre cancel out to exactly zero.
/// If nothing is detected `last_offset` is returned unchanged with
/// `detected == false`.
///
/// Sensors without a weight are ignored, [`crate::loop_ctrl::LoopConfig`]
/// guarantees the lengths match in the loop.
pub fn estimate(reading: &[bool], weights: &[f64], last_offset: f64) -> PositionEstimate {
    let detected_weights = reading
        .iter()
        .zip(weights.iter())
        .filter(|&(&d, _)| d)
        .map(|(_, &w)| w);

    match maths::mean(detected_weights) {
        Some(offset) => PositionEstimate {
            offset,
            detected: true
        },
        None => PositionEstimate {
            offset: last_offset,
            detected: false
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const WEIGHTS: [f64; 8] = [-7.0, -5.0, -3.0, -1.0, 1.0, 3.0, 5.0, 7.0];

    fn reading(indices: &[usize]) -> Vec<bool> {
        (0..WEIGHTS.len()).map(|i| indices.contains(&i)).collect()
    }

    #[test]
    fn test_symmetric_detection() {
        let est = estimate(&reading(&[3, 4]), &WEIGHTS, 5.0);
        assert_eq!(est, PositionEstimate { offset: 0.0, detected: true });

        let est = estimate(&reading(&[0, 3, 4, 7]), &WEIGHTS, 5.0);
        assert_eq!(est.offset, 0.0);
    }

    #[test]
    fn test_weighted_mean() {
        assert_eq!(estimate(&reading(&[0]), &WEIGHTS, 0.0).offset, -7.0);
        assert_eq!(estimate(&reading(&[5, 6]), &WEIGHTS, 0.0).offset, 4.0);
        assert_eq!(estimate(&reading(&[1, 2, 3]), &WEIGHTS, 0.0).offset, -3.0);
    }

    #[test]
    fn test_line_lost() {
        let est = estimate(&reading(&[]), &WEIGHTS, -3.5);
        assert_eq!(est, PositionEstimate { offset: -3.5, detected: false });
    }
}
