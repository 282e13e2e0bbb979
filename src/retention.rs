//! Retention cleanup: keep the last N generations of an index family.
//!
//! Every rotation leaves the previous index behind; this pass deletes the
//! generations that have fallen out of the retention window. Timestamped
//! suffixes make lexicographic order chronological, so "oldest" is simply
//! "sorts first".
use std::path::Path;

use anyhow::{Context, Result};
use elasticsearch::Elasticsearch;

use crate::cluster;
use crate::report::{Action, Category, Reporter};
use crate::template;

/// Deletes every index prefixed by `name` except the newest `max_history`.
///
/// A `max_history` of zero removes every generation, including the one the
/// alias currently serves.
pub async fn cleanup_one(
    client: &Elasticsearch,
    reporter: &dyn Reporter,
    name: &str,
    max_history: usize,
) -> Result<()> {
    let matches = matching(cluster::index_names(client).await?, name);

    for index in expired(&matches, max_history) {
        cluster::delete_index(client, index).await?;
        reporter.record(Category::Index, Action::Deleted, index);
    }

    Ok(())
}

/// Applies the retention window for every template in a directory, aborting
/// the whole batch on the first failed deletion.
pub async fn cleanup_all(
    client: &Elasticsearch,
    reporter: &dyn Reporter,
    dir: &Path,
    max_history: usize,
) -> Result<()> {
    for path in template::template_files(dir)? {
        let name = template::template_name(&path)?;

        cleanup_one(client, reporter, &name, max_history)
            .await
            .with_context(|| format!("failed cleaning up indices for {}", name))?;
    }

    Ok(())
}

/// The indices belonging to an index family, sorted oldest first.
fn matching(names: Vec<String>, prefix: &str) -> Vec<String> {
    let mut matches: Vec<String> = names
        .into_iter()
        .filter(|name| name.starts_with(prefix))
        .collect();

    matches.sort();
    matches
}

/// The slice of sorted matches falling outside the retention window.
fn expired(matches: &[String], max_history: usize) -> &[String] {
    &matches[..matches.len().saturating_sub(max_history)]
}

#[cfg(test)]
mod tests {
    use super::{expired, matching};

    fn indices(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    #[test]
    fn matching_filters_on_prefix_and_sorts_oldest_first() {
        let names = indices(&[
            "twitter-2024-03-09-04-05-06",
            "logs-2024-01-01-00-00-00",
            "twitter-2023-12-31-23-59-59",
        ]);

        assert_eq!(
            matching(names, "twitter"),
            indices(&["twitter-2023-12-31-23-59-59", "twitter-2024-03-09-04-05-06"])
        );
    }

    #[test]
    fn keeps_the_newest_generations() {
        let matches = indices(&["i1", "i2", "i3", "i4", "i5"]);

        assert_eq!(expired(&matches, 2), &matches[..3]);
    }

    #[test]
    fn zero_history_deletes_every_match() {
        let matches = indices(&["i1", "i2", "i3", "i4", "i5"]);

        assert_eq!(expired(&matches, 0), &matches[..]);
    }

    #[test]
    fn a_window_larger_than_the_matches_deletes_nothing() {
        let matches = indices(&["i1", "i2"]);

        assert!(expired(&matches, 5).is_empty());
    }
}
