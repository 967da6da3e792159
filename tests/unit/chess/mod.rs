pub mod cell;
pub mod engine;
