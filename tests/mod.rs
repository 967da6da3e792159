//! Test organization for the mate-arena chess service
//!
//! This module organizes tests into logical groupings:
//! - `common`: Shared test utilities and helpers
//! - `unit`: Unit tests for individual components
//! - `integration`: Coordinator flows across sessions, matchmaking and storage
//! - `storage`: Storage layer tests for SQLite operations

pub mod integration;
pub mod storage;
