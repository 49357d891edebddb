// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors

mod cameras;
mod controls;
mod error;
mod fw_version;
mod metadata;
mod stream;
mod utils;

use clap::{Parser, Subcommand};
use error::result_to_exit_code;
use std::process::ExitCode;

/// D4XX CLI - RealSense depth camera validation tool
#[derive(Parser)]
#[command(name = "d4xx")]
#[command(version)]
#[command(about = "D4XX CLI - RealSense depth camera validation tool")]
#[command(long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (use RUST_LOG=debug for more)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output results in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List discovered D4XX cameras and their nodes
    Cameras(cameras::Args),

    /// List controls of a camera node, optionally setting one first
    Controls(controls::Args),

    /// Read the camera firmware version
    FwVersion(fw_version::Args),

    /// Stream a node and check frame rate and sequence numbers
    Stream(stream::Args),

    /// Capture depth metadata and check layout, counter and CRC
    Metadata(metadata::Args),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Cameras(args) => cameras::execute(args, cli.json),
        Commands::Controls(args) => controls::execute(args, cli.json),
        Commands::FwVersion(args) => fw_version::execute(args, cli.json),
        Commands::Stream(args) => stream::execute(args, cli.json),
        Commands::Metadata(args) => metadata::execute(args, cli.json),
    };

    result_to_exit_code(result)
}

/// Initialize env_logger based on verbosity flags
fn init_logging(verbose: bool, quiet: bool) {
    let env = env_logger::Env::default();

    let env = if quiet {
        env.default_filter_or("error")
    } else if verbose {
        env.default_filter_or("debug")
    } else {
        env.default_filter_or("info")
    };

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .init();

    log::debug!("Logging initialized");
}
