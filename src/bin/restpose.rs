//! RestPose CLI binary.

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use restpose::cli::{args::*, commands::*};

fn init_tracing(args: &RestPoseArgs) {
    // RUST_LOG is honoured only when asking for extra verbosity.
    let filter = match args.verbosity() {
        0 => EnvFilter::new("off"),
        1 => EnvFilter::new("warn"),
        2 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        _ => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = RestPoseArgs::parse();
    init_tracing(&args);

    if let Err(e) = execute_command(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
