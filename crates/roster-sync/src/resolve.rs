//! Map domain titles to marketing-service identifiers.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use futures::future::try_join_all;
use roster_core::marketing::{FieldNameMap, GroupId, MarketingClient, RemoteGroup};
use tracing::info;

use crate::{Error, Result};

/// Split `required` into titles that already have a group and titles that
/// do not. Duplicate titles in `existing` resolve to the first group.
pub fn match_groups<'a>(
  required: &'a BTreeSet<String>,
  existing: &[RemoteGroup],
) -> (BTreeMap<String, GroupId>, Vec<&'a String>) {
  let mut by_title: HashMap<&str, &GroupId> = HashMap::new();
  for group in existing {
    by_title.entry(group.title.as_str()).or_insert(&group.id);
  }

  let mut resolved = BTreeMap::new();
  let mut missing = Vec::new();
  for title in required {
    match by_title.get(title.as_str()) {
      Some(&id) => {
        resolved.insert(title.clone(), id.clone());
      }
      None => missing.push(title),
    }
  }
  (resolved, missing)
}

/// Resolve every required group title to a group id, creating groups that do
/// not exist yet.
///
/// Each missing title is created exactly once, and every creation is awaited
/// before the mapping is returned. The result covers `required` only.
pub async fn resolve_group_ids<M: MarketingClient>(
  client: &M,
  required: &BTreeSet<String>,
  existing: &[RemoteGroup],
) -> Result<BTreeMap<String, GroupId>> {
  let (mut resolved, missing) = match_groups(required, existing);

  let created = try_join_all(missing.into_iter().map(|title| async move {
    let id = client.create_group(title).await.map_err(Error::marketing)?;
    info!(%title, group_id = %id, "created group");
    Ok::<_, Error>((title.clone(), id))
  }))
  .await?;
  resolved.extend(created);

  Ok(resolved)
}

/// Like [`resolve_group_ids`], but stands in a placeholder id for every
/// missing group instead of creating it.
pub fn planned_group_ids(
  required: &BTreeSet<String>,
  existing: &[RemoteGroup],
) -> BTreeMap<String, GroupId> {
  let (mut resolved, missing) = match_groups(required, existing);
  for title in missing {
    info!(%title, "dry run, not creating group");
    resolved.insert(title.clone(), GroupId::new(format!("new:{title}")));
  }
  resolved
}

/// Index every custom field by title.
pub async fn resolve_field_names<M: MarketingClient>(
  client: &M,
) -> Result<FieldNameMap> {
  let fields = client.get_fields().await.map_err(Error::marketing)?;
  Ok(
    fields
      .into_iter()
      .map(|field| (field.title, field.field_name))
      .collect(),
  )
}
