mod commands;

use crate::commands::{
    handle_connections, handle_connectors, handle_delete, handle_download, handle_save,
    handle_test, handle_update, handle_upload, ConnectorsArgs, DeleteArgs, DownloadArgs, SaveArgs,
    TestArgs, UpdateArgs, UploadArgs,
};

use clap::{Parser, Subcommand};
use common::error::StudioError;
use std::path::PathBuf;
use time::macros::format_description;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "studio")]
pub struct Cli {
    #[arg(
        long = "config-path",
        short = 'c',
        help = "path to config file",
        global = true
    )]
    pub config_path: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// List the connector catalog
    Connectors(ConnectorsArgs),
    /// List saved connections and their claim state
    Connections,
    /// Test connector credentials without saving
    Test(TestArgs),
    /// Test and save connector credentials
    Save(SaveArgs),
    /// Partially update a saved connection
    Update(UpdateArgs),
    /// Delete a saved connection
    Delete(DeleteArgs),
    /// Download the local agent archive
    Download(DownloadArgs),
    /// Upload a batch of dataset files
    Upload(UploadArgs),
}

fn run_cmd(func: Result<(), StudioError>) {
    if let Err(e) = func {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let time_format =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:2]");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_timer(fmt::time::LocalTime::new(time_format))
                .with_target(false)
                .with_level(true)
                .with_thread_names(false)
                .with_line_number(false)
                .with_file(false)
                .with_span_events(fmt::format::FmtSpan::NONE)
                .compact(),
        )
        .with(filter)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Cmd::Connectors(args) => run_cmd(handle_connectors(&args)),
        Cmd::Connections => run_cmd(handle_connections(cli.config_path.clone())),
        Cmd::Test(args) => run_cmd(handle_test(args, cli.config_path.clone())),
        Cmd::Save(args) => run_cmd(handle_save(args, cli.config_path.clone())),
        Cmd::Update(args) => run_cmd(handle_update(args, cli.config_path.clone())),
        Cmd::Delete(args) => run_cmd(handle_delete(args, cli.config_path.clone())),
        Cmd::Download(args) => run_cmd(handle_download(args, cli.config_path.clone())),
        Cmd::Upload(args) => run_cmd(handle_upload(args, cli.config_path.clone())),
    }
}
