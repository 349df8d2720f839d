//! Command line client for OpenCPU servers.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
