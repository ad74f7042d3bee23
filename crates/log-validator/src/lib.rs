// Module structure for the log validator.

// Core
pub mod line;
pub mod tail;
pub mod metrics;
pub mod error;

// Modes
pub mod service;
pub mod batch;

// Process plumbing
pub mod conf;
pub mod runtime;
pub mod cli;
