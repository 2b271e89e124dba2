// Threatline CLI library
//
// The binary in main.rs only routes and reports errors; everything it runs lives here so the
// integration tests can drive the same code paths.

pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod report;
pub mod router;
pub mod scanner;
