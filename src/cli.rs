use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "portward", version, about = "Kubernetes port-forward session supervisor")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Use a specific settings file (default: ~/.portward/settings.json)
    #[arg(short = 'f', long = "file", global = true)]
    pub settings_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Forward the configured services until interrupted
    Start {
        /// Specific services to forward (forward all if empty)
        services: Vec<String>,
    },
    /// List services visible in the cluster
    Services,
    /// Show the current and available kubectl contexts
    Contexts,
    /// Write a starter settings file
    Init,
    /// Check the settings file for problems
    Validate,
}
