//! Scenario runner - drives one live loop against one background export.

use crate::error::SimError;
use crate::exporter::{Snapshot, SnapshotExport, SnapshotExporter};
use crate::scenarios::ScenarioId;
use crate::world::{EntityKind, LiveWorld, SimEntity};

use shadowmap_core::{Membership, ShadowView};
use shadowmap_env::{CallerContext, ScopedContext, SubsystemId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,
    
    /// Seed used
    pub seed: u64,
    
    /// Whether scenario passed all assertions
    pub passed: bool,
    
    /// Total ticks executed
    pub total_ticks: u64,
    
    /// Ticks the live loop ran while the export was in flight
    pub episode_ticks: u64,
    
    /// Number of living entities at end
    pub final_entity_count: usize,
    
    /// Failure message if any
    pub failure_reason: Option<String>,
    
    /// Metrics collected during run
    pub metrics: EpisodeMetrics,
    
    /// The export produced by the traversal, if it finished
    pub export: Option<SnapshotExport>,
}

/// Metrics collected during one traversal episode.
#[derive(Debug, Clone, Default)]
pub struct EpisodeMetrics {
    /// Entities captured in the snapshot
    pub snapshot_size: usize,
    
    /// Entities written by the exporter
    pub exported: usize,
    
    /// Shadow-only adds by the exporter
    pub reintroduced: usize,
    
    /// Shadow-only removes by the exporter
    pub hidden: usize,
    
    /// Live spawns during the episode
    pub live_spawned: usize,
    
    /// Live despawns during the episode
    pub live_despawned: usize,
    
    /// Shadow/live disagreement when the view was dropped
    pub final_divergence: usize,
}

/// Everything an episode starts from.
struct Setup {
    world: LiveWorld,
    exporter: SnapshotExporter,
    view: Arc<ShadowView<SimEntity, ScopedContext>>,
    snapshot: Snapshot,
}

struct Episode {
    world: LiveWorld,
    episode_ticks: u64,
    metrics: EpisodeMetrics,
    export: SnapshotExport,
}

/// Runs interleaving scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,
    
    /// Ticks before the view is created
    warmup_ticks: u64,
    
    /// Upper bound on live ticks while the export runs
    max_episode_ticks: u64,
    
    /// Ticks after the view is dropped
    cooldown_ticks: u64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            warmup_ticks: 10,
            max_episode_ticks: 500,
            cooldown_ticks: 10,
        }
    }
    
    /// Sets the warmup length.
    pub fn with_warmup(mut self, ticks: u64) -> Self {
        self.warmup_ticks = ticks;
        self
    }
    
    /// Sets the episode tick limit.
    pub fn with_episode_limit(mut self, ticks: u64) -> Self {
        self.max_episode_ticks = ticks;
        self
    }
    
    /// Sets the cooldown length.
    pub fn with_cooldown(mut self, ticks: u64) -> Self {
        self.cooldown_ticks = ticks;
        self
    }
    
    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        
        let outcome = if scenario.is_threaded() {
            self.run_threaded(scenario)
        } else {
            self.run_cooperative(scenario)
        };
        
        match outcome {
            Ok(episode) => ScenarioResult {
                scenario,
                seed: self.seed,
                passed: true,
                total_ticks: episode.world.tick_count(),
                episode_ticks: episode.episode_ticks,
                final_entity_count: episode.world.entity_count(),
                failure_reason: None,
                metrics: episode.metrics,
                export: Some(episode.export),
            },
            Err(e) => ScenarioResult {
                scenario,
                seed: self.seed,
                passed: false,
                total_ticks: 0,
                episode_ticks: 0,
                final_entity_count: 0,
                failure_reason: Some(e.to_string()),
                metrics: EpisodeMetrics::default(),
                export: None,
            },
        }
    }
    
    /// Live loop and exporter as tasks on one thread; they interleave only
    /// at yield points, so a seed fixes the whole run.
    fn run_cooperative(&self, scenario: ScenarioId) -> Result<Episode, SimError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        runtime.block_on(self.cooperative_episode(scenario))
    }
    
    async fn cooperative_episode(&self, scenario: ScenarioId) -> Result<Episode, SimError> {
        let Setup {
            mut world,
            exporter,
            view,
            snapshot,
        } = self.begin(scenario)?;
        let expected = expected_ids(&snapshot, &scenario.exporter_config().hidden_kinds);
        let mut metrics = EpisodeMetrics {
            snapshot_size: snapshot.len(),
            ..Default::default()
        };
        
        let task = {
            let view = Arc::clone(&view);
            tokio::spawn(async move { exporter.run(view, snapshot).await })
        };
        
        let mut episode_ticks = 0;
        while !task.is_finished() && episode_ticks < self.max_episode_ticks {
            self.live_tick(&mut world, &view, &mut metrics)?;
            episode_ticks += 1;
            tokio::task::yield_now().await;
        }
        if !task.is_finished() {
            warn!(episode_ticks, "episode limit reached; live loop pauses for the export");
        }
        
        let export = task.await.map_err(SimError::runtime)?;
        self.end(&mut world, view, &export, &mut metrics)?;
        
        let exported = export.ids();
        if exported != expected {
            return Err(SimError::invariant(format!(
                "exported {} entities, snapshot promised {}",
                exported.len(),
                expected.len()
            )));
        }
        if export.total() != exported.len() {
            return Err(SimError::invariant("exporter wrote an entity twice"));
        }
        
        self.cool_down(&mut world)?;
        Ok(Episode {
            world,
            episode_ticks,
            metrics,
            export,
        })
    }
    
    /// Exporter on an OS thread, live loop on this one. Interleaving is up
    /// to the scheduler, but each group is reconciled under one shadow lock,
    /// so the export must still match the snapshot exactly.
    fn run_threaded(&self, scenario: ScenarioId) -> Result<Episode, SimError> {
        let Setup {
            mut world,
            exporter,
            view,
            snapshot,
        } = self.begin(scenario)?;
        let mut metrics = EpisodeMetrics {
            snapshot_size: snapshot.len(),
            ..Default::default()
        };
        
        let expected = expected_ids(&snapshot, &scenario.exporter_config().hidden_kinds);
        
        let traversal = {
            let view = Arc::clone(&view);
            std::thread::Builder::new()
                .name("snapshot-exporter".into())
                .spawn(move || exporter.run_blocking(&view, &snapshot))?
        };
        
        let mut episode_ticks = 0;
        while !traversal.is_finished() && episode_ticks < self.max_episode_ticks {
            self.live_tick(&mut world, &view, &mut metrics)?;
            episode_ticks += 1;
        }
        
        let export = traversal
            .join()
            .map_err(|_| SimError::runtime("exporter thread panicked"))?;
        self.end(&mut world, view, &export, &mut metrics)?;
        
        let exported = export.ids();
        if exported != expected {
            return Err(SimError::invariant(format!(
                "exported {} entities, snapshot promised {}",
                exported.len(),
                expected.len()
            )));
        }
        if export.total() != exported.len() {
            return Err(SimError::invariant("exporter wrote an entity twice"));
        }
        
        self.cool_down(&mut world)?;
        Ok(Episode {
            world,
            episode_ticks,
            metrics,
            export,
        })
    }
    
    fn begin(&self, scenario: ScenarioId) -> Result<Setup, SimError> {
        let mut world = LiveWorld::new(scenario.world_config(self.seed));
        for _ in 0..self.warmup_ticks {
            world.tick();
        }
        world.verify()?;
        
        let exporter = SnapshotExporter::new(
            SubsystemId::from_seed(self.seed),
            scenario.exporter_config(),
        );
        let view = Arc::new(ShadowView::create(world.entities().clone(), exporter.context())?);
        let snapshot = exporter.capture(&view, world.tick_count());
        if snapshot.is_empty() {
            warn!(scenario = %scenario, "snapshot is empty, nothing to export");
        }
        
        let captured: Vec<u64> = snapshot.ids().into_iter().collect();
        if captured != world.ledger_ids() {
            return Err(SimError::invariant("snapshot differs from the live world at creation"));
        }
        
        Ok(Setup {
            world,
            exporter,
            view,
            snapshot,
        })
    }
    
    /// One live tick through the view, then a normal read that must see
    /// exactly the live world.
    fn live_tick<C: CallerContext>(
        &self,
        world: &mut LiveWorld,
        view: &ShadowView<SimEntity, C>,
        metrics: &mut EpisodeMetrics,
    ) -> Result<(), SimError> {
        let report = world.tick_with(view);
        metrics.live_spawned += report.spawned.len();
        metrics.live_despawned += report.despawned.len();
        
        let mut seen: Vec<u64> = view.members().into_iter().map(|e| e.id).collect();
        seen.sort_unstable();
        if seen != world.ledger_ids() {
            return Err(SimError::invariant(format!(
                "live loop read {} entities on tick {}, expected {}",
                seen.len(),
                report.tick,
                world.entity_count()
            )));
        }
        Ok(())
    }
    
    fn end<C: CallerContext>(
        &self,
        world: &mut LiveWorld,
        view: Arc<ShadowView<SimEntity, C>>,
        export: &SnapshotExport,
        metrics: &mut EpisodeMetrics,
    ) -> Result<(), SimError> {
        metrics.exported = export.total();
        metrics.reintroduced = export.reintroduced;
        metrics.hidden = export.hidden;
        metrics.final_divergence = view.divergence().len();
        
        debug!(
            snapshot = metrics.snapshot_size,
            exported = metrics.exported,
            reintroduced = metrics.reintroduced,
            hidden = metrics.hidden,
            divergence = metrics.final_divergence,
            "episode finished"
        );
        
        // Dropping the view discards every shadow-only edit
        drop(view);
        world.verify()
    }
    
    fn cool_down(&self, world: &mut LiveWorld) -> Result<(), SimError> {
        for _ in 0..self.cooldown_ticks {
            world.tick();
        }
        world.verify()
    }
}

fn expected_ids(snapshot: &Snapshot, hidden_kinds: &[EntityKind]) -> BTreeSet<u64> {
    snapshot
        .groups
        .iter()
        .filter(|(kind, _)| !hidden_kinds.contains(kind))
        .flat_map(|(_, members)| members.iter().map(|e| e.id))
        .collect()
}
