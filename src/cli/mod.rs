//! CLI module for the experiment engine
//!
//! Provides subcommands for running the service:
//! - `serve`: run the HTTP API server

pub mod serve;

use clap::{Parser, Subcommand};

/// PulseBridge Experiments - A/B experiment engine for marketing campaigns
#[derive(Parser)]
#[command(name = "pulsebridge-experiments")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,
}
