//! Thin operations layer over the Elasticsearch client.
//!
//! One function per administrative call. Each function owns the status
//! handling for its call: unexpected statuses become errors carrying the
//! operation and target name, expected "not found" responses surface as
//! regular values, and unacknowledged responses are logged rather than
//! treated as failures.
use anyhow::{Context, Result};
use elasticsearch::cat::CatIndicesParts;
use elasticsearch::http::response::Response;
use elasticsearch::http::StatusCode;
use elasticsearch::indices::{
    IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesGetAliasParts,
    IndicesGetTemplateParts, IndicesPutSettingsParts, IndicesPutTemplateParts,
};
use elasticsearch::Elasticsearch;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::template::IndexSettings;

/// Pushes a template body under the given name, replacing any previous
/// version the cluster stores.
pub async fn put_template(client: &Elasticsearch, name: &str, body: &Value) -> Result<()> {
    let response = client
        .indices()
        .put_template(IndicesPutTemplateParts::Name(name))
        .body(body)
        .send()
        .await
        .and_then(|response| response.error_for_status_code())
        .with_context(|| format!("failed updating index template {}", name))?;

    if !acknowledged(response).await? {
        warn!("update of template {} not acknowledged", name);
    }

    Ok(())
}

/// Reads the settings block of the cluster-stored template.
pub async fn template_settings(client: &Elasticsearch, name: &str) -> Result<IndexSettings> {
    let response = client
        .indices()
        .get_template(IndicesGetTemplateParts::Name(&[name]))
        .send()
        .await
        .and_then(|response| response.error_for_status_code())
        .with_context(|| format!("failed to retrieve index template {}", name))?;

    let body = response
        .json::<Value>()
        .await
        .with_context(|| format!("failed to retrieve index template {}", name))?;

    // Keyed by template name:
    // { "twitter": { "index_patterns": [...], "settings": { "index": {...} } } }
    Ok(body
        .get(name)
        .map(IndexSettings::from_template_body)
        .unwrap_or_default())
}

/// Whether an index with this exact name exists.
pub async fn index_exists(client: &Elasticsearch, index: &str) -> Result<bool> {
    let response = client
        .indices()
        .exists(IndicesExistsParts::Index(&[index]))
        .send()
        .await
        .with_context(|| format!("failed checking for index {}", index))?;

    if response.status_code() == StatusCode::NOT_FOUND {
        return Ok(false);
    }

    response
        .error_for_status_code()
        .with_context(|| format!("failed checking for index {}", index))?;

    Ok(true)
}

/// Creates an index, inheriting its schema from the matching template.
pub async fn create_index(client: &Elasticsearch, index: &str) -> Result<()> {
    let response = client
        .indices()
        .create(IndicesCreateParts::Index(index))
        .send()
        .await
        .and_then(|response| response.error_for_status_code())
        .with_context(|| format!("failed creating index {}", index))?;

    if !acknowledged(response).await? {
        warn!("creation of index {} not acknowledged", index);
    }

    Ok(())
}

/// Deletes an index outright.
pub async fn delete_index(client: &Elasticsearch, index: &str) -> Result<()> {
    let response = client
        .indices()
        .delete(IndicesDeleteParts::Index(&[index]))
        .send()
        .await
        .and_then(|response| response.error_for_status_code())
        .with_context(|| format!("failed deleting index {}", index))?;

    if !acknowledged(response).await? {
        warn!("deletion of index {} not acknowledged", index);
    }

    Ok(())
}

/// Applies a settings body to an existing index.
pub async fn put_index_settings(client: &Elasticsearch, index: &str, body: Value) -> Result<()> {
    let response = client
        .indices()
        .put_settings(IndicesPutSettingsParts::Index(&[index]))
        .body(body)
        .send()
        .await
        .and_then(|response| response.error_for_status_code())
        .with_context(|| format!("failed updating settings for index {}", index))?;

    if !acknowledged(response).await? {
        warn!("settings update for index {} not acknowledged", index);
    }

    Ok(())
}

/// The indices currently attached to an alias, or `None` when the alias
/// does not exist. Absence is normal control flow: it means a first-time
/// rotation with nothing to copy.
pub async fn indices_for_alias(
    client: &Elasticsearch,
    alias: &str,
) -> Result<Option<Vec<String>>> {
    let response = client
        .indices()
        .get_alias(IndicesGetAliasParts::Name(&[alias]))
        .send()
        .await
        .with_context(|| format!("failed trying to lookup alias {}", alias))?;

    if response.status_code() == StatusCode::NOT_FOUND {
        debug!("alias {} does not exist", alias);
        return Ok(None);
    }

    let body = response
        .error_for_status_code()
        .with_context(|| format!("failed trying to lookup alias {}", alias))?
        .json::<Value>()
        .await
        .with_context(|| format!("failed trying to lookup alias {}", alias))?;

    // Response keys are the index names:
    // { "index1": { "aliases": { "alias": {} } }, ... }
    let mut indices = body
        .as_object()
        .map(|object| object.keys().cloned().collect::<Vec<_>>())
        .unwrap_or_default();

    indices.sort();
    Ok(Some(indices))
}

/// Applies a set of alias actions in one atomic `_aliases` call.
pub async fn update_aliases(client: &Elasticsearch, alias: &str, actions: Value) -> Result<()> {
    let response = client
        .indices()
        .update_aliases()
        .body(json!({ "actions": actions }))
        .send()
        .await
        .and_then(|response| response.error_for_status_code())
        .with_context(|| format!("failed updating alias {}", alias))?;

    if !acknowledged(response).await? {
        warn!("update of alias {} not acknowledged", alias);
    }

    Ok(())
}

/// Runs a reindex with the given body, returning the copied document count.
///
/// The destination is refreshed on completion so the copied documents are
/// visible as soon as the call returns.
pub async fn reindex(
    client: &Elasticsearch,
    source: &str,
    dest: &str,
    body: Value,
) -> Result<u64> {
    let response = client
        .reindex()
        .refresh(true)
        .body(body)
        .send()
        .await
        .and_then(|response| response.error_for_status_code())
        .with_context(|| format!("failed reindexing from {} to {}", source, dest))?;

    let body = response
        .json::<Value>()
        .await
        .with_context(|| format!("failed reindexing from {} to {}", source, dest))?;

    Ok(body.get("total").and_then(Value::as_u64).unwrap_or_default())
}

/// Every index name in the cluster.
pub async fn index_names(client: &Elasticsearch) -> Result<Vec<String>> {
    let response = client
        .cat()
        .indices(CatIndicesParts::None)
        .format("json")
        .h(&["index"])
        .send()
        .await
        .and_then(|response| response.error_for_status_code())
        .context("could not get index names")?;

    let body = response
        .json::<Value>()
        .await
        .context("could not get index names")?;

    let names = body
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row.get("index").and_then(Value::as_str))
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Ok(names)
}

/// Pulls the `acknowledged` flag out of an admin response body.
async fn acknowledged(response: Response) -> Result<bool> {
    let body = response.json::<Value>().await?;

    Ok(body
        .get("acknowledged")
        .and_then(Value::as_bool)
        .unwrap_or(false))
}
