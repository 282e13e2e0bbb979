//! Cleanup command module.
//!
//! Applies the retention window to the index generations behind one
//! template file, or a directory of them.
use std::path::Path;

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

use crate::command;
use crate::report::Console;
use crate::retention;
use crate::template;

/// Returns the definition for this command in the CLI.
pub fn cmd<'a>() -> Command<'a> {
    Command::new("cleanup")
        .about("Delete old indices, leaving only the newest generations")
        .args(&[
            // templates: +required
            Arg::new("templates")
                .help("A template file, or a directory of template files")
                .value_name("FILE|DIR")
                .required(true),
            // --max-history [2]
            Arg::new("max-history")
                .help("Number of index generations to keep, including the current one")
                .long("max-history")
                .takes_value(true)
                .default_value("2"),
        ])
}

/// Executes the `cleanup` command.
pub async fn run(args: &ArgMatches) -> Result<()> {
    let target = Path::new(args.value_of("templates").expect("guaranteed by CLI"));
    let max_history = args.value_of_t::<usize>("max-history")?;

    let client = command::connect(args)?;
    let reporter = Console;

    if target.is_dir() {
        return retention::cleanup_all(&client, &reporter, target, max_history).await;
    }

    let name = template::template_name(target)?;
    retention::cleanup_one(&client, &reporter, &name, max_history).await
}
