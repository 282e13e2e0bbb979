//! An Elasticsearch index template updating, reindexing and cleanup tool.
//!
//! Rolling out a mapping change safely takes more than pushing the new
//! template: documents live in a concrete, timestamped index and reach
//! searchers through an alias. Each `reindex` run pushes the template,
//! creates a fresh index, copies the existing documents into it and swaps
//! the alias over; `cleanup` later prunes the generations that fall out of
//! the retention window.
//!
//! Everything is plain sequential administration against the cluster's
//! admin API: every call completes before the next starts, and the first
//! failure aborts the run with a non-zero exit. There are no retries and
//! no rollback; a failed run leaves whatever the last successful step
//! produced.
use anyhow::Result;
use clap::{Arg, Command};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod cluster;
mod command;
mod provision;
mod remote;
mod report;
mod retention;
mod rotate;
mod template;

use command::{cleanup, reindex, update_alias};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    init_tracing(matches.occurrences_of("verbose"));

    // Delegate to the subcommand, or print the help menu and exit.
    match matches.subcommand() {
        Some(("reindex", args)) => reindex::run(args).await,
        Some(("cleanup", args)) => cleanup::run(args).await,
        Some(("update-alias", args)) => update_alias::run(args).await,
        _ => build_cli().print_help().map_err(Into::into),
    }
}

/// Creates the argument parser for the tool.
///
/// Connection parameters are global, so they can sit before or after the
/// subcommand, and each falls back to an environment variable when the
/// flag is absent.
fn build_cli<'a>() -> Command<'a> {
    Command::new("")
        // package metadata from cargo
        .name(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        // connection parameters, shared by every subcommand
        .args(&[
            Arg::new("url")
                .help("Elasticsearch URL to connect to")
                .long("url")
                .env("ESROTATE_URL")
                .takes_value(true)
                .default_value("http://localhost:9200")
                .global(true),
            Arg::new("username")
                .help("Elasticsearch basic auth username")
                .long("username")
                .env("ESROTATE_USERNAME")
                .takes_value(true)
                .global(true),
            Arg::new("password")
                .help("Elasticsearch basic auth password")
                .long("password")
                .env("ESROTATE_PASSWORD")
                .takes_value(true)
                .global(true),
            Arg::new("skip-verify")
                .help("Skip TLS certificate verification")
                .long("skip-verify")
                .env("ESROTATE_SKIP_VERIFY")
                .global(true),
            Arg::new("verbose")
                .help("Enable diagnostic logging (repeat for more detail)")
                .short('v')
                .long("verbose")
                .multiple_occurrences(true)
                .global(true),
        ])
        // attach all commands
        .subcommand(reindex::cmd())
        .subcommand(cleanup::cmd())
        .subcommand(update_alias::cmd())
        .arg_required_else_help(true)
}

/// Installs a diagnostics subscriber sized to the verbosity count.
///
/// Progress lines go to stdout through the reporter; this layer carries
/// warnings and debug detail on stderr, so piping the progress output
/// stays clean.
fn init_tracing(verbosity: u64) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    // a second init (e.g. in tests) keeps the first subscriber
    let _ = tracing::subscriber::set_global_default(subscriber);
}
