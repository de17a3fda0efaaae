//! # Line tracer script interpreter module
//!
//! This module provides an interpreter for line tracer scripts, allowing
//! telecommands to be executed at set times without an operator.
//!
//! A script is a text file of `<time_s>: <tc_json>;` entries, for example:
//!
//! ```text
//! 0.5: {"type": "FOLLOW_LINE"};
//! 30.0: {"type": "STOP"};
//! ```
//!
//! Anything which doesn't match that pattern (such as `#` comments) is ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use comms_if::tc::{Tc, TcParseError};
use crate::session::get_elapsed_seconds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
#[derive(Debug)]
pub struct Command {
    /// The time the command is supposed to execute at
    exec_time_s: f64,

    /// The Telecommand to run
    tc: Tc
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending_tcs` to
/// acquire a list of telecommands that need executing.
#[derive(Debug)]
pub struct ScriptInterpreter {
    script_path: PathBuf,
    cmds: VecDeque<Command>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid TC at {0} s: {1}")]
    InvalidTc(f64, TcParseError),

    #[error("Script pattern failed to build: {0}")]
    PatternError(regex::Error),
}

#[derive(Debug, PartialEq)]
pub enum PendingTcs {
    None,
    Some(Vec<Tc>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());

        // Check that the script file exists.
        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        // Load the script into a string
        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        let mut si = Self::parse(&script)?;
        si.script_path = path;

        Ok(si)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn parse(script: &str) -> Result<Self, ScriptError> {

        // Empty queue of commands
        let mut tc_queue: VecDeque<Command> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(ScriptError::PatternError)?;

        for cap in re.captures_iter(script) {
            let time_str = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
            let tc_str = cap.get(3).map(|m| m.as_str()).unwrap_or_default();

            // Parse the exec time
            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            // Parse the TC from the payload. The scripts contain JSON only.
            let tc = Tc::from_json(tc_str)
                .map_err(|e| ScriptError::InvalidTc(exec_time_s, e))?;

            tc_queue.push_back(Command {
                exec_time_s,
                tc
            });
        }

        if tc_queue.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        // Scripts are allowed to list commands out of order
        tc_queue
            .make_contiguous()
            .sort_by(|a, b| a.exec_time_s.total_cmp(&b.exec_time_s));

        Ok(ScriptInterpreter {
            script_path: PathBuf::new(),
            cmds: tc_queue
        })
    }

    /// Return the pending TCs at the current session time.
    ///
    /// # Panics
    /// - If the session has not been initialised.
    pub fn get_pending_tcs(&mut self) -> PendingTcs {
        self.get_pending_tcs_at(get_elapsed_seconds())
    }

    /// Return a vector of TCs due at or before `current_time_s`, `None` if
    /// no TCs need executing now, or `EndOfScript` once every TC has been
    /// returned.
    pub fn get_pending_tcs_at(&mut self, current_time_s: f64) -> PendingTcs {

        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.cmds.is_empty() {
            return PendingTcs::EndOfScript
        }

        let mut tc_vec: Vec<Tc> = vec![];

        // Pop from the head while it's due
        while let Some(cmd) = self.cmds.front() {
            if cmd.exec_time_s > current_time_s {
                break
            }

            if let Some(cmd) = self.cmds.pop_front() {
                tc_vec.push(cmd.tc);
            }
        }

        if tc_vec.is_empty() {
            PendingTcs::None
        }
        else {
            PendingTcs::Some(tc_vec)
        }
    }

    /// Get the number of TCs remaining in the script
    pub fn get_num_tcs(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64
        }
    }

    /// Path the script was loaded from, empty if it was loaded from a string.
    pub fn script_path(&self) -> &Path {
        &self.script_path
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
