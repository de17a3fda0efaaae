//! Telemetry sinks available to the executable

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

// Internal
use comms_if::tm::{TmPacket, TmSink, TmSinkError};
use util::archive::{ArchiveError, Archiver};

use super::debug_line;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Appends each packet as one line of JSON to a file.
pub struct JsonFileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

/// Logs a one line summary of each packet at `DEBUG`.
#[derive(Debug, Default)]
pub struct LogSink;

/// Archives each packet as a row of a CSV file.
pub struct CsvArchiveSink {
    archiver: Archiver,
}

/// Flat form of a [`TmPacket`] for the CSV archive.
#[derive(Serialize)]
struct TmRecord<'a> {
    time_s: f64,
    cycle: u64,
    sensors: String,
    left_duty: u16,
    right_duty: u16,
    offset: f64,
    detected: bool,
    turn: f64,
    base_speed: u16,
    state: &'a str,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JsonFileSink {
    /// Open (or create) the file at `path`, appending to anything already in it.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, TmSinkError> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(TmSinkError::WriteError)?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TmSink for JsonFileSink {
    fn send(&mut self, packet: &TmPacket) -> Result<(), TmSinkError> {
        let line = serde_json::to_string(packet)
            .map_err(|e| TmSinkError::SerializationError(format!("{}", e)))?;

        writeln!(self.writer, "{}", line).map_err(TmSinkError::WriteError)?;
        self.writer.flush().map_err(TmSinkError::WriteError)
    }
}

impl TmSink for LogSink {
    fn send(&mut self, packet: &TmPacket) -> Result<(), TmSinkError> {
        debug!("[TM {:8.3} s] {} | {}", packet.time_s, debug_line(packet), packet.state);
        Ok(())
    }
}

impl CsvArchiveSink {
    pub fn new(archiver: Archiver) -> Self {
        Self { archiver }
    }
}

impl TmSink for CsvArchiveSink {
    fn send(&mut self, packet: &TmPacket) -> Result<(), TmSinkError> {
        let sensors: String = packet.sensors
            .iter()
            .map(|&d| if d { '1' } else { '0' })
            .collect();

        self.archiver
            .serialise(TmRecord {
                time_s: packet.time_s,
                cycle: packet.cycle,
                sensors,
                left_duty: packet.left_duty,
                right_duty: packet.right_duty,
                offset: packet.offset,
                detected: packet.detected,
                turn: packet.turn,
                base_speed: packet.base_speed,
                state: &packet.state,
            })
            .map_err(|e| match e {
                ArchiveError::FlushError(io) => TmSinkError::WriteError(io),
                e => TmSinkError::SerializationError(format!("{}", e))
            })
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
