//! Storage layer tests against real SQLite files in temporary directories
