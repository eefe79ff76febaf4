//! Traffic Controller Library
//!
//! Simulates the lights of a single intersection serving its directions round-robin,
//! with an optional interactive command line on top.

pub mod command_line;
pub mod simulation;
