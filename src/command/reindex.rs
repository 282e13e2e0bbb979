//! Reindex command module.
//!
//! This command runs the full rotation for one template file or a directory
//! of them: push each template, create a fresh timestamped index, copy the
//! currently aliased documents over and swap the alias. Items run strictly
//! one after another, and the first failure aborts the run.
use std::path::Path;

use anyhow::{bail, Result};
use clap::{Arg, ArgMatches, Command};

use crate::command;
use crate::provision::{self, ProvisionOptions};
use crate::remote;
use crate::report::Console;
use crate::rotate::{self, RemoteSource, RotateOptions};

/// Returns the definition for this command in the CLI.
pub fn cmd<'a>() -> Command<'a> {
    Command::new("reindex")
        .about("Update index templates, create fresh indices and rotate aliases onto them")
        .args(&[
            // templates: +required
            Arg::new("templates")
                .help("A template file, or a directory of template files")
                .value_name("FILE|DIR")
                .required(true),
            // --bulk-indexing
            Arg::new("bulk-indexing")
                .help("Disable refresh and replicas while documents are copied, restoring them afterwards")
                .long("bulk-indexing"),
            // --dest-index [generated]
            Arg::new("dest-index")
                .help("Use this destination index instead of generating a timestamped one")
                .long("dest-index")
                .takes_value(true),
            // --extra-suffix
            Arg::new("extra-suffix")
                .help("Extra suffix appended after the timestamp (ignored with --dest-index)")
                .long("extra-suffix")
                .takes_value(true),
            // --version-external
            Arg::new("version-external")
                .help("Copy with external versioning, so only missing or newer documents overwrite")
                .long("version-external"),
            // --no-update-alias
            Arg::new("no-update-alias")
                .help("Leave the alias and the bulk-indexing settings untouched")
                .long("no-update-alias"),
            // --from-remote [local alias lookup]
            Arg::new("from-remote")
                .help("Copy documents from this remote cluster instead of the locally aliased index")
                .long("from-remote")
                .value_name("URL")
                .takes_value(true),
            Arg::new("remote-username")
                .help("Basic auth username for the remote cluster")
                .long("remote-username")
                .takes_value(true)
                .requires("from-remote"),
            Arg::new("remote-password")
                .help("Basic auth password for the remote cluster")
                .long("remote-password")
                .takes_value(true)
                .requires("from-remote"),
            // --reindex-host-allocation, e.g. 'es-reindex-*'
            Arg::new("reindex-host-allocation")
                .help("Pin the new index to this node pattern while documents are copied")
                .long("reindex-host-allocation")
                .value_name("PATTERN")
                .takes_value(true),
            // --dest-host-allocation, e.g. 'es-data-*'
            Arg::new("dest-host-allocation")
                .help("Pin the new index to this node pattern once the rotation completes")
                .long("dest-host-allocation")
                .value_name("PATTERN")
                .takes_value(true),
        ])
}

/// Executes the `reindex` command.
pub async fn run(args: &ArgMatches) -> Result<()> {
    let target = Path::new(args.value_of("templates").expect("guaranteed by CLI"));

    let provision_options = ProvisionOptions {
        dest_index: args.value_of("dest-index").map(str::to_owned),
        extra_suffix: args.value_of("extra-suffix").map(str::to_owned),
        bulk_indexing: args.is_present("bulk-indexing"),
    };

    let rotate_options = RotateOptions {
        version_external: args.is_present("version-external"),
        no_update_alias: args.is_present("no-update-alias"),
        remote: args.value_of("from-remote").map(|url| RemoteSource {
            url: url.to_owned(),
            username: args.value_of("remote-username").map(str::to_owned),
            password: args.value_of("remote-password").map(str::to_owned),
        }),
    };

    // malformed argument combinations are rejected before any cluster call
    if target.is_dir() && provision_options.dest_index.is_some() {
        bail!("--dest-index is not supported with a directory of templates");
    }

    if let Some(source) = &rotate_options.remote {
        remote::parse_cluster(&source.url)?;
    }

    let client = command::connect(args)?;
    let reporter = Console;

    if target.is_dir() {
        let provisioned =
            provision::provision_dir(&client, &reporter, target, &provision_options).await?;

        return rotate::rotate_all(&client, &reporter, &provisioned, &rotate_options).await;
    }

    let provisioned =
        provision::provision_file(&client, &reporter, target, &provision_options).await?;

    if let Some(pattern) = args.value_of("reindex-host-allocation") {
        rotate::set_host_allocation(&client, &reporter, &provisioned.index, pattern).await?;
    }

    rotate::rotate_one(
        &client,
        &reporter,
        &provisioned.alias,
        &provisioned.index,
        &rotate_options,
    )
    .await?;

    if let Some(pattern) = args.value_of("dest-host-allocation") {
        rotate::set_host_allocation(&client, &reporter, &provisioned.index, pattern).await?;
    }

    Ok(())
}
