//! Update-alias command module.
//!
//! Swaps an alias onto a destination index without copying documents or
//! touching settings. Useful for promoting an index that was provisioned
//! with `--no-update-alias`, or for rolling an alias back by hand.
use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

use crate::command;
use crate::report::Console;
use crate::rotate;

/// Returns the definition for this command in the CLI.
pub fn cmd<'a>() -> Command<'a> {
    Command::new("update-alias")
        .about("Swap an index alias to another index")
        .args(&[
            // --alias: +required
            Arg::new("alias")
                .help("Name of the alias")
                .long("alias")
                .takes_value(true)
                .required(true),
            // --dest-index: +required
            Arg::new("dest-index")
                .help("Name of the destination index")
                .long("dest-index")
                .takes_value(true)
                .required(true),
        ])
}

/// Executes the `update-alias` command.
pub async fn run(args: &ArgMatches) -> Result<()> {
    let alias = args.value_of("alias").expect("guaranteed by CLI");
    let dest_index = args.value_of("dest-index").expect("guaranteed by CLI");

    let client = command::connect(args)?;

    rotate::update_alias(&client, &Console, alias, dest_index).await
}
