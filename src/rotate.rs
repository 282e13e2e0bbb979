//! The reindex-and-alias-swap phase of a rotation.
//!
//! Given an alias and the index the provisioner just created, this module
//! copies whatever documents the alias currently serves into the new index,
//! restores the write-path settings the provisioner tuned, and moves the
//! alias over in a single atomic call. An absent alias is first-time
//! provisioning: the copy is skipped and the alias is simply added.
use anyhow::{Context, Result};
use elasticsearch::Elasticsearch;
use serde_json::{json, Value};

use crate::cluster;
use crate::provision::Provisioned;
use crate::report::{Action, Category, Reporter};
use crate::template;

/// Socket timeout for copies pulled from a remote cluster.
const REMOTE_SOCKET_TIMEOUT: &str = "1m";

/// A remote cluster to copy documents from instead of the local alias.
#[derive(Debug)]
pub struct RemoteSource {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Flags controlling the reindex-and-swap phase.
#[derive(Debug, Default)]
pub struct RotateOptions {
    /// Only write documents that are absent or older on the destination.
    pub version_external: bool,
    /// Leave the alias and the bulk-indexing settings untouched.
    pub no_update_alias: bool,
    /// Copy from this remote cluster instead of the locally aliased index.
    pub remote: Option<RemoteSource>,
}

/// Runs the reindex-and-swap phase for a single alias.
pub async fn rotate_one(
    client: &Elasticsearch,
    reporter: &dyn Reporter,
    alias: &str,
    new_index: &str,
    options: &RotateOptions,
) -> Result<()> {
    let current = cluster::indices_for_alias(client, alias).await?;

    if let Some(remote) = &options.remote {
        // The remote cluster is the data source, so the copy happens even
        // when the local alias does not exist yet.
        let body = remote_reindex_body(remote, alias, new_index, options.version_external);
        let total = cluster::reindex(client, alias, new_index, body).await?;

        reporter.record(
            Category::Documents,
            Action::Reindexed,
            &format!("{} from {} at {} to {}", total, alias, remote.url, new_index),
        );
    } else {
        match &current {
            Some(indices) => {
                // Sensible naming means a single index, but an alias can
                // legitimately map to several; every one is copied.
                for index in indices {
                    let body = local_reindex_body(index, new_index, options.version_external);
                    let total = cluster::reindex(client, index, new_index, body).await?;

                    reporter.record(
                        Category::Documents,
                        Action::Reindexed,
                        &format!("{} from {} to {}", total, index, new_index),
                    );
                }
            }
            None => reporter.note(&format!(
                "alias {} not found, provisioning from scratch",
                alias
            )),
        }
    }

    if options.no_update_alias {
        return Ok(());
    }

    // Undo the bulk-indexing tuning using whatever the template declares;
    // null resets a setting to the cluster default.
    let settings = cluster::template_settings(client, alias).await?;
    cluster::put_index_settings(client, new_index, template::steady_state_body(&settings)).await?;

    reporter.record(
        Category::Settings,
        Action::Updated,
        &format!("{} restored from template {}", new_index, alias),
    );

    swap_alias(
        client,
        reporter,
        alias,
        current.as_deref().unwrap_or_default(),
        new_index,
    )
    .await
}

/// Runs the reindex-and-swap phase for every provisioned alias, aborting on
/// the first failure.
pub async fn rotate_all(
    client: &Elasticsearch,
    reporter: &dyn Reporter,
    provisioned: &[Provisioned],
    options: &RotateOptions,
) -> Result<()> {
    for entry in provisioned {
        rotate_one(client, reporter, &entry.alias, &entry.index, options)
            .await
            .with_context(|| {
                format!(
                    "failed reindexing to {} and adding to alias {}",
                    entry.index, entry.alias
                )
            })?;
    }

    Ok(())
}

/// Points an alias at a destination index, detaching every index it
/// currently serves. Backs the `update-alias` command.
pub async fn update_alias(
    client: &Elasticsearch,
    reporter: &dyn Reporter,
    alias: &str,
    dest_index: &str,
) -> Result<()> {
    let current = cluster::indices_for_alias(client, alias).await?;

    if current.is_none() {
        reporter.note(&format!("alias {} not found, adding it to {}", alias, dest_index));
    }

    swap_alias(
        client,
        reporter,
        alias,
        current.as_deref().unwrap_or_default(),
        dest_index,
    )
    .await
}

/// Pins an index's shards to a node-name pattern, e.g. `es-reindex-*`.
pub async fn set_host_allocation(
    client: &Elasticsearch,
    reporter: &dyn Reporter,
    index: &str,
    pattern: &str,
) -> Result<()> {
    let body = json!({
        "index": {
            "routing": { "allocation": { "include": { "_name": pattern } } }
        }
    });

    cluster::put_index_settings(client, index, body).await?;
    reporter.record(
        Category::Settings,
        Action::Updated,
        &format!("{} allocated to {}", index, pattern),
    );

    Ok(())
}

/// Moves an alias from its current indices onto a single new index.
///
/// Every removal and the addition travel in one `_aliases` call, so the
/// alias either moves entirely or not at all; there is no window where it
/// points at both generations or at none.
async fn swap_alias(
    client: &Elasticsearch,
    reporter: &dyn Reporter,
    alias: &str,
    current: &[String],
    new_index: &str,
) -> Result<()> {
    cluster::update_aliases(client, alias, swap_actions(alias, current, new_index)).await?;

    for index in current {
        reporter.record(
            Category::Alias,
            Action::Removed,
            &format!("{} from {}", index, alias),
        );
    }

    reporter.record(
        Category::Alias,
        Action::Added,
        &format!("{} to {}", new_index, alias),
    );

    Ok(())
}

/// Builds the `_aliases` actions moving an alias onto `new_index`.
fn swap_actions(alias: &str, current: &[String], new_index: &str) -> Value {
    let mut actions = Vec::with_capacity(current.len() + 1);

    for index in current {
        actions.push(json!({
            "remove": { "index": index, "alias": alias }
        }));
    }

    actions.push(json!({
        "add": { "index": new_index, "alias": alias }
    }));

    Value::Array(actions)
}

/// Builds the body for a local index-to-index copy.
fn local_reindex_body(source: &str, dest: &str, version_external: bool) -> Value {
    let mut body = json!({
        "conflicts": "proceed",
        "source": { "index": source },
        "dest": { "index": dest }
    });

    if version_external {
        body["dest"]["version_type"] = json!("external");
    }

    body
}

/// Builds the body for a copy pulled from a remote cluster. The remote
/// descriptor replaces the local alias lookup entirely.
fn remote_reindex_body(
    remote: &RemoteSource,
    source: &str,
    dest: &str,
    version_external: bool,
) -> Value {
    let mut body = local_reindex_body(source, dest, version_external);

    let mut descriptor = json!({
        "host": remote.url,
        "socket_timeout": REMOTE_SOCKET_TIMEOUT
    });

    if let Some(username) = &remote.username {
        descriptor["username"] = json!(username);
    }
    if let Some(password) = &remote.password {
        descriptor["password"] = json!(password);
    }

    body["source"]["remote"] = descriptor;
    body
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{local_reindex_body, remote_reindex_body, swap_actions, RemoteSource};

    #[test]
    fn swap_removes_every_current_index_and_adds_exactly_one() {
        let current = vec!["twitter-2024-01".to_owned(), "twitter-2024-02".to_owned()];

        let actions = swap_actions("twitter", &current, "twitter-2024-03");

        assert_eq!(
            actions,
            json!([
                { "remove": { "index": "twitter-2024-01", "alias": "twitter" } },
                { "remove": { "index": "twitter-2024-02", "alias": "twitter" } },
                { "add": { "index": "twitter-2024-03", "alias": "twitter" } }
            ])
        );
    }

    #[test]
    fn swap_without_current_indices_is_a_plain_add() {
        let actions = swap_actions("twitter", &[], "twitter-2024-03");

        assert_eq!(
            actions,
            json!([
                { "add": { "index": "twitter-2024-03", "alias": "twitter" } }
            ])
        );
    }

    #[test]
    fn local_copies_proceed_on_version_conflicts() {
        let body = local_reindex_body("twitter-old", "twitter-new", false);

        assert_eq!(
            body,
            json!({
                "conflicts": "proceed",
                "source": { "index": "twitter-old" },
                "dest": { "index": "twitter-new" }
            })
        );
    }

    #[test]
    fn external_versioning_marks_the_destination() {
        let body = local_reindex_body("twitter-old", "twitter-new", true);

        assert_eq!(body["dest"]["version_type"], json!("external"));
    }

    #[test]
    fn remote_copies_carry_the_descriptor_and_socket_timeout() {
        let remote = RemoteSource {
            url: "https://old-cluster:9200".to_owned(),
            username: Some("elastic".to_owned()),
            password: Some("hunter2".to_owned()),
        };

        let body = remote_reindex_body(&remote, "twitter", "twitter-new", false);

        assert_eq!(
            body["source"],
            json!({
                "index": "twitter",
                "remote": {
                    "host": "https://old-cluster:9200",
                    "socket_timeout": "1m",
                    "username": "elastic",
                    "password": "hunter2"
                }
            })
        );
    }

    #[test]
    fn remote_credentials_are_optional() {
        let remote = RemoteSource {
            url: "https://old-cluster:9200".to_owned(),
            username: None,
            password: None,
        };

        let body = remote_reindex_body(&remote, "twitter", "twitter-new", false);

        assert!(body["source"]["remote"].get("username").is_none());
        assert!(body["source"]["remote"].get("password").is_none());
    }
}
