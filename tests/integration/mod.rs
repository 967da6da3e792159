//! Integration tests for the mate-arena service
//!
//! These tests drive the coordinator end to end with in-memory
//! collaborators, plus the command line binary.


// Queue pairing, range widening and timeouts
pub mod matchmaking_flow;

// Rematch proposal, acceptance and expiry
pub mod rematch_flow;

// Disconnects, reconnects and identity resolution
pub mod connections;

// Command line binary
pub mod cli_commands;
