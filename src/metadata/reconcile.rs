/// Index reconciliation
///
/// Rebuilds the version index, latest version pointers and event index from a
/// full scan of the primary tables. Primary rows are the ground truth; derived
/// rows that disagree are rewritten or deleted. Writers keep running while a pass
/// is in progress, so a derived row is only deleted or a pointer lowered after a
/// point read of the primary row confirms the scan is still accurate. Intended to
/// run from an administrative job, not on request paths.

use crate::{
    error::MetadataResult,
    metadata::{
        event_handlers::EventHandlerRegistry,
        index::{EventIndex, LatestVersionPointer, VersionIndex},
        workflow_defs::WorkflowDefStore,
    },
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Repairs applied by one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub versions_added: usize,
    pub versions_removed: usize,
    pub pointers_repaired: usize,
    pub event_entries_added: usize,
    pub event_entries_removed: usize,
}

impl ReconcileReport {
    /// True when the derived state already matched the primary tables
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    workflow_defs: WorkflowDefStore,
    versions: VersionIndex,
    latest: LatestVersionPointer,
    event_handlers: EventHandlerRegistry,
    by_event: EventIndex,
}

impl Reconciler {
    pub fn new(
        workflow_defs: WorkflowDefStore,
        versions: VersionIndex,
        latest: LatestVersionPointer,
        event_handlers: EventHandlerRegistry,
        by_event: EventIndex,
    ) -> Self {
        Self {
            workflow_defs,
            versions,
            latest,
            event_handlers,
            by_event,
        }
    }

    /// Reconcile every derived table
    pub async fn run(&self) -> MetadataResult<ReconcileReport> {
        let mut report = ReconcileReport::default();
        self.reconcile_workflow_indexes(&mut report).await?;
        self.reconcile_event_index(&mut report).await?;

        if report.is_clean() {
            tracing::info!("Reconciliation found no drift");
        } else {
            tracing::warn!("Reconciliation repaired drift: {:?}", report);
        }
        Ok(report)
    }

    async fn reconcile_workflow_indexes(&self, report: &mut ReconcileReport) -> MetadataResult<()> {
        let mut live: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
        for (name, version) in self.workflow_defs.primary_keys().await? {
            live.entry(name).or_default().insert(version);
        }

        // Writers may run between the scans; every repair re-reads the primary row
        let indexed = self.versions.snapshot().await?;
        for (name, versions) in &indexed {
            let expected = live.get(name);
            for version in versions {
                if expected.is_some_and(|set| set.contains(version)) {
                    continue;
                }
                if self.workflow_defs.get(name, *version).await?.is_some() {
                    tracing::debug!("Keeping index entry {}:{} written during reconciliation", name, version);
                    continue;
                }
                self.versions.remove(name, *version).await?;
                report.versions_removed += 1;
            }
        }
        for (name, versions) in &live {
            let present = indexed.get(name);
            for version in versions {
                if present.is_some_and(|set| set.contains(version)) {
                    continue;
                }
                if self.workflow_defs.get(name, *version).await?.is_none() {
                    continue;
                }
                self.versions.add(name, *version).await?;
                report.versions_added += 1;
            }
        }

        let pointers = self.latest.snapshot().await?;
        let names: BTreeSet<&String> = pointers.keys().chain(live.keys()).collect();
        for name in names {
            let scanned = live.get(name).and_then(|set| set.iter().max().copied());
            let pointed = pointers.get(name).copied();
            if pointed == scanned {
                continue;
            }
            let expected = self.live_max_version(name, live.get(name)).await?;
            if pointed != expected {
                self.latest.reset(name, expected).await?;
                report.pointers_repaired += 1;
            }
        }
        Ok(())
    }

    /// Maximum version whose primary row exists right now, considering both the
    /// earlier primary scan and the current version index
    async fn live_max_version(
        &self,
        name: &str,
        scanned: Option<&BTreeSet<u32>>,
    ) -> MetadataResult<Option<u32>> {
        let mut candidates: BTreeSet<u32> = self.versions.versions(name).await?.into_iter().collect();
        if let Some(scanned) = scanned {
            candidates.extend(scanned.iter().copied());
        }
        for version in candidates.into_iter().rev() {
            if self.workflow_defs.get(name, version).await?.is_some() {
                return Ok(Some(version));
            }
        }
        Ok(None)
    }

    async fn reconcile_event_index(&self, report: &mut ReconcileReport) -> MetadataResult<()> {
        let live: BTreeMap<(String, String), bool> = self
            .event_handlers
            .get_all()
            .await?
            .into_iter()
            .map(|handler| ((handler.event, handler.name), handler.active))
            .collect();

        let mut indexed: BTreeMap<(String, String), bool> = BTreeMap::new();
        for (event, entry) in self.by_event.snapshot().await? {
            indexed.insert((event, entry.name), entry.active);
        }

        for (event, name) in indexed.keys() {
            if live.contains_key(&(event.clone(), name.clone())) {
                continue;
            }
            let current = self.event_handlers.get(name).await?;
            if current.is_some_and(|handler| handler.event == *event) {
                tracing::debug!("Keeping index entry {} for {} written during reconciliation", name, event);
                continue;
            }
            self.by_event.remove(event, name).await?;
            report.event_entries_removed += 1;
        }
        for ((event, name), active) in &live {
            let key = (event.clone(), name.clone());
            if indexed.get(&key) == Some(active) {
                continue;
            }
            // Index from the current record, not the scanned one
            let Some(current) = self.event_handlers.get(name).await? else {
                continue;
            };
            if current.event != *event {
                continue;
            }
            self.by_event.add(event, name, current.active).await?;
            report.event_entries_added += 1;
        }
        Ok(())
    }
}
