//! Per-group state transitions.
//!
//! A pass fans out one task per entity group; steps inside a group are
//! strictly sequential (create before publish before persist), groups are
//! independent. A remote failure fails only its group; a local write
//! failure fails the whole pass. The pass always drains every group task
//! before returning.

use crate::error::{Error, Result};
use crate::model::{group_rows, EntityGroup, PublishStatus};
use crate::remote::EntryClient;
use crate::storage::{ColumnFilter, SyncTable};
use crate::sync::{Operation, Outcome, RunStats};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;

/// Drives one reconciliation pass.
#[derive(Debug, Clone)]
pub struct Reconciler {
    table: Arc<Mutex<SyncTable>>,
    client: Arc<EntryClient>,
    mapping: Arc<BTreeMap<String, String>>,
    common_id_field: String,
}

impl Reconciler {
    /// Assemble an engine from its collaborators.
    ///
    /// `common_id_field` is the remote field carrying the local common id;
    /// the insert idempotence guard scans it.
    #[must_use]
    pub fn new(
        table: SyncTable,
        client: EntryClient,
        mapping: BTreeMap<String, String>,
        common_id_field: String,
    ) -> Self {
        Self {
            table: Arc::new(Mutex::new(table)),
            client: Arc::new(client),
            mapping: Arc::new(mapping),
            common_id_field,
        }
    }

    fn table(&self) -> Result<std::sync::MutexGuard<'_, SyncTable>> {
        self.table
            .lock()
            .map_err(|_| Error::Other("table lock poisoned".to_string()))
    }

    /// Run one pass of `operation` over the candidate rows.
    ///
    /// The candidate predicate is the operation's base filter ANDed with
    /// the optional caller filter; `purge_locale` hard-deletes matching
    /// rows of one locale before the pass. Remote failures are tallied in
    /// the returned stats; the pass itself only errors on local failures.
    ///
    /// # Errors
    ///
    /// Returns a database error when the select, the purge, or any
    /// write-back fails.
    pub async fn run(
        &self,
        operation: Operation,
        filter: Option<&ColumnFilter>,
        purge_locale: Option<&str>,
    ) -> Result<RunStats> {
        let base = operation.base_filter();
        let mut stats = RunStats::default();

        let groups = {
            let table = self.table()?;
            if let Some(locale) = purge_locale {
                stats.purged = table.purge_locale(base, filter, locale)?;
                tracing::info!(locale, purged = stats.purged, "purged locale rows");
            }
            group_rows(table.load_rows(base, filter)?)
        };
        stats.groups = groups.len();
        tracing::info!(
            operation = operation.as_str(),
            groups = stats.groups,
            "starting reconciliation pass"
        );

        let mut tasks = JoinSet::new();
        for group in groups {
            let engine = self.clone();
            tasks.spawn(async move {
                let common_id = group.common_id().clone();
                let result = engine.process_group(operation, group).await;
                (common_id, result)
            });
        }

        // Drain every task before surfacing errors: sibling groups keep
        // their isolation even when one hits a local failure.
        let mut local_failure = None;
        while let Some(joined) = tasks.join_next().await {
            let (common_id, result) = joined
                .map_err(|e| Error::Other(format!("group task failed to complete: {e}")))?;
            match result {
                Ok(Outcome::Applied) => {
                    stats.applied += 1;
                    tracing::info!(%common_id, operation = operation.as_str(), "group applied");
                }
                Ok(Outcome::Skipped) => {
                    stats.skipped += 1;
                    tracing::info!(%common_id, operation = operation.as_str(), "group skipped");
                }
                Err(e @ Error::Database(_)) => {
                    tracing::error!(%common_id, operation = operation.as_str(), error = %e,
                        "local write failed");
                    local_failure.get_or_insert(e);
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::error!(%common_id, operation = operation.as_str(), error = %e,
                        "group failed");
                }
            }
        }

        if let Some(e) = local_failure {
            return Err(e);
        }
        Ok(stats)
    }

    async fn process_group(&self, operation: Operation, group: EntityGroup) -> Result<Outcome> {
        match operation {
            Operation::Insert => self.insert_group(&group).await,
            Operation::Update => self.update_group(&group).await,
            Operation::Delete => self.delete_group(&group).await,
            Operation::Publish => self.publish_group(&group).await,
            Operation::Draft => self.draft_group(&group).await,
        }
    }

    /// Create the remote entry for a group without one.
    ///
    /// Re-run guard: if any existing remote entry already references this
    /// group's common id, the group is skipped, making repeated insert
    /// passes idempotent.
    async fn insert_group(&self, group: &EntityGroup) -> Result<Outcome> {
        let entries = self.client.list_entries().await?;
        let already_present = entries.iter().any(|entry| {
            entry
                .fields
                .get(&self.common_id_field)
                .is_some_and(|locales| locales.values().any(|v| v == group.common_id()))
        });
        if already_present {
            return Ok(Outcome::Skipped);
        }

        let (entry_id, mut version) = self.client.create(group, &self.mapping).await?;
        if group.any_published() {
            version = self.client.publish(&entry_id, &version).await?;
        }

        let table = self.table()?;
        for row in group.rows() {
            table.write_remote_link(row.pk, &entry_id, &version)?;
        }
        Ok(Outcome::Applied)
    }

    /// Re-send the full field map, then settle the publish state.
    ///
    /// Publish / unpublish refusals are expected (state already correct)
    /// and swallowed; the stored version still advances.
    async fn update_group(&self, group: &EntityGroup) -> Result<Outcome> {
        let Some((entry_id, version)) = linked(group) else {
            // update's candidate filter admits every row; unlinked groups
            // have nothing remote to update
            return Ok(Outcome::Skipped);
        };

        let mut version = self
            .client
            .update(group, &self.mapping, &entry_id, &version)
            .await?;

        if group.any_published() {
            match self.client.publish(&entry_id, &version).await {
                Ok(v) => version = v,
                Err(e) => {
                    tracing::warn!(%entry_id, error = %e, "publish after update refused, assuming already published");
                }
            }
        } else {
            match self.client.unpublish(&entry_id, &version).await {
                Ok(v) => version = v,
                Err(e) => {
                    tracing::warn!(%entry_id, error = %e, "unpublish after update refused, assuming already draft");
                }
            }
        }

        let table = self.table()?;
        for row in group.rows() {
            table.write_remote_link(row.pk, &entry_id, &version)?;
        }
        Ok(Outcome::Applied)
    }

    /// Composite unpublish-then-delete, then clear the local link.
    async fn delete_group(&self, group: &EntityGroup) -> Result<Outcome> {
        let Some((entry_id, version)) = linked(group) else {
            return Ok(Outcome::Skipped);
        };

        self.client.delete(&entry_id, &version).await?;

        let table = self.table()?;
        for row in group.rows() {
            table.clear_remote_link(row.pk)?;
        }
        Ok(Outcome::Applied)
    }

    /// Publish the entry; a refusal means it already is.
    async fn publish_group(&self, group: &EntityGroup) -> Result<Outcome> {
        let Some((entry_id, version)) = linked(group) else {
            return Ok(Outcome::Skipped);
        };

        let version = match self.client.publish(&entry_id, &version).await {
            Ok(v) => v,
            Err(e) => {
                tracing::info!(%entry_id, error = %e, "publish refused, assuming already published");
                return Ok(Outcome::Skipped);
            }
        };

        let table = self.table()?;
        for row in group.rows() {
            table.write_status(row.pk, &version, PublishStatus::Published)?;
        }
        Ok(Outcome::Applied)
    }

    /// Unpublish the entry; a refusal means it already is draft.
    async fn draft_group(&self, group: &EntityGroup) -> Result<Outcome> {
        let Some((entry_id, version)) = linked(group) else {
            return Ok(Outcome::Skipped);
        };

        let version = match self.client.unpublish(&entry_id, &version).await {
            Ok(v) => v,
            Err(e) => {
                tracing::info!(%entry_id, error = %e, "unpublish refused, assuming already draft");
                return Ok(Outcome::Skipped);
            }
        };

        let table = self.table()?;
        for row in group.rows() {
            table.write_status(row.pk, &version, PublishStatus::Draft)?;
        }
        Ok(Outcome::Applied)
    }
}

/// The group's remote link, when both the entry id and version are known.
fn linked(group: &EntityGroup) -> Option<(String, String)> {
    let entry_id = group.entry_id()?.to_string();
    let version = group.entry_version()?.to_string();
    Some((entry_id, version))
}
