//! Integration tests for the processor module
//!
//! Tests the day-range driver against small input trees built in temporary
//! directories.

pub mod caching;
pub mod fixtures;
