//! Subcommand modules, one per administrative workflow.
use anyhow::Result;
use clap::ArgMatches;
use elasticsearch::Elasticsearch;

use crate::remote::{self, Connection};

pub mod cleanup;
pub mod reindex;
pub mod update_alias;

/// Builds a client from the global connection arguments.
pub(crate) fn connect(args: &ArgMatches) -> Result<Elasticsearch> {
    remote::create_client(&Connection {
        url: args.value_of("url").expect("guaranteed by CLI"),
        username: args.value_of("username"),
        password: args.value_of("password"),
        skip_verify: args.is_present("skip-verify"),
    })
}
