//! Template updates and timestamped index creation.
//!
//! The first phase of a rotation: push the template definition, derive the
//! destination index name and make sure the index exists. The resulting
//! alias-to-index pairs feed the reindex phase.
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use elasticsearch::Elasticsearch;

use crate::cluster;
use crate::report::{Action, Category, Reporter};
use crate::template::{self, IndexTemplate};

/// Index names must sort chronologically and cannot contain colons, so the
/// timestamp is hyphen-separated throughout.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Flags controlling the provisioning phase.
#[derive(Debug, Default)]
pub struct ProvisionOptions {
    /// Explicit destination index, instead of a generated timestamped name.
    pub dest_index: Option<String>,
    /// Extra suffix appended after the timestamp. Ignored with `dest_index`.
    pub extra_suffix: Option<String>,
    /// Tune the new index for write throughput until the rotation restores
    /// the template settings.
    pub bulk_indexing: bool,
}

/// An alias paired with the index the current run created for it.
#[derive(Clone, Debug, PartialEq)]
pub struct Provisioned {
    pub alias: String,
    pub index: String,
}

/// Provisions a single template file.
///
/// Pushes the template body under the file's base name, then creates the
/// destination index unless it already exists; an existing index counts as
/// provisioned, so re-running against an explicit `--dest-index` is safe.
pub async fn provision_file(
    client: &Elasticsearch,
    reporter: &dyn Reporter,
    path: &Path,
    options: &ProvisionOptions,
) -> Result<Provisioned> {
    let template = IndexTemplate::from_path(path)?;

    cluster::put_template(client, &template.name, &template.body).await?;
    reporter.record(Category::Template, Action::Updated, &template.name);

    let index = match &options.dest_index {
        Some(index) => index.clone(),
        None => timestamped(&template.name, Utc::now(), options.extra_suffix.as_deref()),
    };

    if cluster::index_exists(client, &index).await? {
        reporter.note(&format!("index {} already exists, skipping creation", index));
    } else {
        cluster::create_index(client, &index).await?;
        reporter.record(Category::Index, Action::Created, &index);
    }

    if options.bulk_indexing {
        cluster::put_index_settings(client, &index, template::bulk_mode_body()).await?;
        reporter.record(
            Category::Settings,
            Action::Updated,
            &format!("{} for bulk indexing", index),
        );
    }

    Ok(Provisioned {
        alias: template.name,
        index,
    })
}

/// Provisions every template in a directory, aborting the whole batch on
/// the first failure.
pub async fn provision_dir(
    client: &Elasticsearch,
    reporter: &dyn Reporter,
    dir: &Path,
    options: &ProvisionOptions,
) -> Result<Vec<Provisioned>> {
    let mut provisioned = Vec::new();

    for path in template::template_files(dir)? {
        let entry = provision_file(client, reporter, &path, options)
            .await
            .with_context(|| {
                format!("failed creating new index from template {}", path.display())
            })?;

        provisioned.push(entry);
    }

    Ok(provisioned)
}

/// Derives the timestamped destination index name for a template.
fn timestamped(name: &str, now: DateTime<Utc>, extra_suffix: Option<&str>) -> String {
    let stamp = now.format(TIMESTAMP_FORMAT);

    match extra_suffix {
        Some(suffix) => format!("{}-{}-{}", name, stamp, suffix),
        None => format!("{}-{}", name, stamp),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::timestamped;

    #[test]
    fn index_names_carry_a_hyphenated_utc_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 4, 5, 6).unwrap();

        assert_eq!(timestamped("twitter", now, None), "twitter-2024-03-09-04-05-06");
    }

    #[test]
    fn extra_suffix_lands_after_the_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 4, 5, 6).unwrap();

        assert_eq!(
            timestamped("twitter", now, Some("blue")),
            "twitter-2024-03-09-04-05-06-blue"
        );
    }

    #[test]
    fn later_timestamps_sort_after_earlier_ones() {
        let first = timestamped("twitter", Utc.with_ymd_and_hms(2024, 3, 9, 4, 5, 6).unwrap(), None);
        let second = timestamped("twitter", Utc.with_ymd_and_hms(2024, 11, 9, 4, 5, 6).unwrap(), None);

        assert!(first < second);
    }
}
