//! # Sensor array
//!
//! Wraps the raw [`SensorSource`] and turns its logic levels into line
//! detections. Faults are never passed on, a failed or malformed read is seen
//! by the rest of the loop as a reading with no detections.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use serde::{Deserialize, Serialize};

// Internal
use comms_if::eqpt::{SensorError, SensorSource};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Line detections, leftmost sensor first, `true` when the sensor is over
/// the line.
pub type SensorReading = Vec<bool>;

/// Reads the line sensors through a [`SensorSource`].
pub struct SensorArray<S: SensorSource> {
    source: S,

    num_sensors: usize,

    detect_level: DetectLevel,

    /// Total number of faulty reads
    fault_count: u64,

    /// Number of consecutive faulty reads
    num_consec_faults: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The logic level a sensor outputs when it is over the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectLevel {
    Low,
    High
}

/// A reason a read was discarded.
#[derive(Debug, Clone, PartialEq)]
enum ReadFault {
    Source(SensorError),
    WrongLength(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DetectLevel {
    fn default() -> Self {
        // Reflectance modules pull their output low over a dark line
        DetectLevel::Low
    }
}

impl DetectLevel {
    /// Returns true if the raw level means the sensor is over the line.
    pub fn is_detection(&self, level_high: bool) -> bool {
        match self {
            DetectLevel::Low => !level_high,
            DetectLevel::High => level_high
        }
    }
}

impl<S: SensorSource> SensorArray<S> {

    /// Create a new array of `num_sensors` sensors read from `source`.
    pub fn new(source: S, num_sensors: usize, detect_level: DetectLevel) -> Self {
        Self {
            source,
            num_sensors,
            detect_level,
            fault_count: 0,
            num_consec_faults: 0,
        }
    }

    /// Read the array.
    ///
    /// Always returns `num_sensors` values. If the source fails, or returns the
    /// wrong number of levels, the fault is counted and no sensor is reported
    /// as detecting.
    pub fn read(&mut self) -> SensorReading {
        let fault = match self.source.read_all() {
            Ok(levels) if levels.len() == self.num_sensors => {
                if self.num_consec_faults > 0 {
                    info!(
                        "Sensor array recovered after {} faulty reads",
                        self.num_consec_faults
                    );
                    self.num_consec_faults = 0;
                }

                return levels
                    .into_iter()
                    .map(|l| self.detect_level.is_detection(l))
                    .collect()
            },
            Ok(levels) => ReadFault::WrongLength(levels.len()),
            Err(e) => ReadFault::Source(e)
        };

        self.fault_count += 1;
        self.num_consec_faults += 1;

        // Only report the start of a run of faults, otherwise a disconnected
        // array floods the log at the loop rate
        if self.num_consec_faults == 1 {
            match fault {
                ReadFault::Source(e) => warn!("Sensor array read failed: {}", e),
                ReadFault::WrongLength(n) => warn!(
                    "Sensor array returned {} levels, expected {}",
                    n,
                    self.num_sensors
                )
            }
        }

        vec![false; self.num_sensors]
    }

    /// Number of sensors in the array.
    pub fn num_sensors(&self) -> usize {
        self.num_sensors
    }

    /// Total number of faulty reads since the array was created.
    pub fn fault_count(&self) -> u64 {
        self.fault_count
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::VecDeque;

    /// Source replaying a list of canned reads.
    struct CannedSource(VecDeque<Result<Vec<bool>, SensorError>>);

    impl SensorSource for CannedSource {
        fn read_all(&mut self) -> Result<Vec<bool>, SensorError> {
            self.0
                .pop_front()
                .unwrap_or(Err(SensorError::DeviceUnavailable("empty".into())))
        }
    }

    fn levels(bits: &[u8]) -> Vec<bool> {
        bits.iter().map(|b| *b != 0).collect()
    }

    #[test]
    fn test_detect_low() {
        let src = CannedSource(vec![Ok(levels(&[1, 1, 1, 0, 0, 1, 1, 1]))].into());
        let mut array = SensorArray::new(src, 8, DetectLevel::Low);

        assert_eq!(
            array.read(),
            vec![false, false, false, true, true, false, false, false]
        );
        assert_eq!(array.fault_count(), 0);
    }

    #[test]
    fn test_detect_high() {
        let src = CannedSource(vec![Ok(levels(&[1, 0, 0]))].into());
        let mut array = SensorArray::new(src, 3, DetectLevel::High);

        assert_eq!(array.read(), vec![true, false, false]);
    }

    #[test]
    fn test_faults_read_as_no_detection() {
        let src = CannedSource(vec![
            Err(SensorError::ReadFailed(2)),
            Ok(levels(&[0, 0])),
            Ok(levels(&[0, 0, 0, 0])),
        ].into());
        let mut array = SensorArray::new(src, 4, DetectLevel::Low);

        assert_eq!(array.read(), vec![false; 4]);
        assert_eq!(array.read(), vec![false; 4]);
        assert_eq!(array.fault_count(), 2);

        assert_eq!(array.read(), vec![true; 4]);
        assert_eq!(array.fault_count(), 2);
    }
}
