//! Snapshot exporter - the privileged background traversal.
//!
//! The exporter walks the shadow view group by group and serializes what it
//! sees. Before reading each group it reconciles the shadow against the
//! membership it captured when the episode began:
//! - entities the live loop despawned since are put back
//! - entities spawned since, and hidden kinds, are taken out
//!
//! Both happen inside one `edit_shadow` batch per group and neither reaches
//! the live collection.

use crate::error::SimError;
use crate::world::{EntityKind, SimEntity};
use serde::{Deserialize, Serialize};
use shadowmap_core::ShadowView;
use shadowmap_env::{enter, scope, CallerContext, ScopedContext, SubsystemId};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

/// Exporter configuration.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Kinds to leave out of the export
    pub hidden_kinds: Vec<EntityKind>,
    
    /// Entities written between yields to the live loop
    pub yield_every: usize,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            hidden_kinds: Vec::new(),
            yield_every: 4,
        }
    }
}

/// Membership captured at the start of an episode, by kind.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Tick the view was created on
    pub tick: u64,
    
    /// Members per kind, ascending by ID
    pub groups: BTreeMap<EntityKind, Vec<SimEntity>>,
}

impl Snapshot {
    /// All captured IDs.
    pub fn ids(&self) -> BTreeSet<u64> {
        self.groups.values().flatten().map(|e| e.id).collect()
    }
    
    /// Total captured entities.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
    
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One exported group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupExport {
    pub kind: EntityKind,
    pub entities: Vec<SimEntity>,
}

/// Complete export of one traversal episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotExport {
    /// Tick the snapshot was taken on
    pub snapshot_tick: u64,
    
    /// Exported groups, in [`EntityKind::ALL`] order
    pub groups: Vec<GroupExport>,
    
    /// Shadow-only adds performed during reconciliation
    pub reintroduced: usize,
    
    /// Shadow-only removes performed during reconciliation
    pub hidden: usize,
}

impl SnapshotExport {
    /// Creates a new export container.
    pub fn new(snapshot_tick: u64) -> Self {
        Self {
            snapshot_tick,
            groups: Vec::new(),
            reintroduced: 0,
            hidden: 0,
        }
    }
    
    /// All exported IDs.
    pub fn ids(&self) -> BTreeSet<u64> {
        self.groups
            .iter()
            .flat_map(|g| g.entities.iter().map(|e| e.id))
            .collect()
    }
    
    /// Total exported entities, counting duplicates.
    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.entities.len()).sum()
    }
    
    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// The privileged subsystem.
#[derive(Debug, Clone)]
pub struct SnapshotExporter {
    id: SubsystemId,
    config: ExporterConfig,
}

impl SnapshotExporter {
    pub fn new(id: SubsystemId, config: ExporterConfig) -> Self {
        Self { id, config }
    }
    
    /// A caller context that treats this exporter as privileged.
    pub fn context(&self) -> ScopedContext {
        ScopedContext::for_subsystem(self.id)
    }
    
    /// Records the shadow's membership as this episode's snapshot.
    pub fn capture<C: CallerContext>(&self, view: &ShadowView<SimEntity, C>, tick: u64) -> Snapshot {
        let _guard = enter(self.id);
        let mut snapshot = Snapshot {
            tick,
            groups: BTreeMap::new(),
        };
        for kind in EntityKind::ALL {
            let mut members = view.group(&kind);
            members.sort_by_key(|e| e.id);
            snapshot.groups.insert(kind, members);
        }
        debug!(exporter = %self.id, tick, entities = snapshot.len(), "snapshot captured");
        snapshot
    }
    
    /// Walks the view inside a task-local traversal scope, yielding to other
    /// tasks between batches.
    pub async fn run<C: CallerContext>(
        &self,
        view: Arc<ShadowView<SimEntity, C>>,
        snapshot: Snapshot,
    ) -> SnapshotExport {
        scope(self.id, async move {
            let mut export = SnapshotExport::new(snapshot.tick);
            for kind in EntityKind::ALL {
                let members = self.reconcile(&view, kind, &snapshot, &mut export);
                let mut group = GroupExport {
                    kind,
                    entities: Vec::with_capacity(members.len()),
                };
                for batch in members.chunks(self.config.yield_every.max(1)) {
                    group.entities.extend_from_slice(batch);
                    tokio::task::yield_now().await;
                }
                export.groups.push(group);
            }
            self.finish(export)
        })
        .await
    }
    
    /// Walks the view on the current thread under a thread-local frame.
    pub fn run_blocking<C: CallerContext>(
        &self,
        view: &ShadowView<SimEntity, C>,
        snapshot: &Snapshot,
    ) -> SnapshotExport {
        let _guard = enter(self.id);
        let mut export = SnapshotExport::new(snapshot.tick);
        for kind in EntityKind::ALL {
            let members = self.reconcile(view, kind, snapshot, &mut export);
            let mut group = GroupExport {
                kind,
                entities: Vec::with_capacity(members.len()),
            };
            for batch in members.chunks(self.config.yield_every.max(1)) {
                group.entities.extend_from_slice(batch);
                std::thread::yield_now();
            }
            export.groups.push(group);
        }
        self.finish(export)
    }
    
    /// Brings the shadow's `kind` group back to the snapshot and returns it.
    ///
    /// The passes and the final read share one shadow lock, so a live edit
    /// on another thread lands either before or after the whole group.
    fn reconcile<C: CallerContext>(
        &self,
        view: &ShadowView<SimEntity, C>,
        kind: EntityKind,
        snapshot: &Snapshot,
        export: &mut SnapshotExport,
    ) -> Vec<SimEntity> {
        let wanted: &[SimEntity] = if self.config.hidden_kinds.contains(&kind) {
            &[]
        } else {
            snapshot.groups.get(&kind).map(Vec::as_slice).unwrap_or(&[])
        };
        let wanted_ids: HashSet<u64> = wanted.iter().map(|e| e.id).collect();
        
        view.edit_shadow(|shadow| {
            let unwanted: Vec<SimEntity> = shadow
                .group(&kind)
                .filter(|e| !wanted_ids.contains(&e.id))
                .cloned()
                .collect();
            for entity in &unwanted {
                if shadow.remove(entity) {
                    export.hidden += 1;
                }
            }
            for entity in wanted {
                if shadow.add(entity.clone()) {
                    export.reintroduced += 1;
                }
            }
            
            let mut members: Vec<SimEntity> = shadow.group(&kind).cloned().collect();
            members.sort_by_key(|e| e.id);
            trace!(%kind, members = members.len(), "group reconciled");
            members
        })
    }
    
    fn finish(&self, export: SnapshotExport) -> SnapshotExport {
        debug!(
            exporter = %self.id,
            exported = export.total(),
            reintroduced = export.reintroduced,
            hidden = export.hidden,
            "export finished"
        );
        export
    }
}
