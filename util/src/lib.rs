//! Utility library for the Line Tracer Software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
pub mod cycle;
pub mod host;
pub mod logger;
pub mod maths;
pub mod params;
pub mod session;
pub mod script_interpreter;
pub mod time;
