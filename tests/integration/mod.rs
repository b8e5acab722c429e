//! Integration test suite for stallwatch.
//!
//! These tests drive the public pipeline end to end: registry in, analysis
//! result out. No file system or clock access happens outside the config
//! round-trip test, which uses a temporary directory.
//!
//! # Test Categories
//!
//! - `scenario`: Worked scenarios over realistic task sets
//! - `properties`: Property-based checks over generated graphs


mod properties;
mod scenario;
