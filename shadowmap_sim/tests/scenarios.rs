//! End-to-end scenario runs across seeds.

use proptest::prelude::*;
use shadowmap_core::ShadowView;
use shadowmap_env::SubsystemId;
use shadowmap_sim::scenarios::ScenarioId;
use shadowmap_sim::{ExporterConfig, LiveWorld, ScenarioRunner, SimConfig, SnapshotExporter};
use std::sync::Arc;

#[test]
fn all_scenarios_pass_default_seed() {
    let runner = ScenarioRunner::new(42);
    for scenario in ScenarioId::all() {
        let result = runner.run(scenario);
        assert!(
            result.passed,
            "{} failed: {:?}",
            scenario,
            result.failure_reason
        );
    }
}

#[test]
fn short_episode_limit_still_completes_export() {
    let result = ScenarioRunner::new(9)
        .with_episode_limit(1)
        .run(ScenarioId::DespawnStorm);
    
    assert!(result.passed, "{:?}", result.failure_reason);
    assert_eq!(result.episode_ticks, 1);
}

#[test]
fn world_survives_interleaved_export() {
    let mut world = LiveWorld::new(SimConfig {
        seed: 1,
        initial_entities: 30,
        max_spawns_per_tick: 3,
        max_despawns_per_tick: 3,
    });
    let exporter = SnapshotExporter::new(SubsystemId::from_seed(1), ExporterConfig::default());
    let view = Arc::new(ShadowView::create(world.entities().clone(), exporter.context()).unwrap());
    let snapshot = exporter.capture(&view, world.tick_count());
    
    // Live loop runs a few ticks between snapshot and export
    for _ in 0..5 {
        world.tick_with(&view);
    }
    let export = exporter.run_blocking(&view, &snapshot);
    
    assert_eq!(export.ids(), snapshot.ids());
    assert!(world.verify().is_ok());
    assert_eq!(view.len(), world.entity_count());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]
    
    #[test]
    fn cooperative_scenarios_pass_any_seed(seed in any::<u64>(), pick in 0usize..4) {
        let scenario = [
            ScenarioId::Steady,
            ScenarioId::DespawnStorm,
            ScenarioId::SpawnFlood,
            ScenarioId::HiddenKinds,
        ][pick];
        
        let result = ScenarioRunner::new(seed).with_warmup(3).run(scenario);
        prop_assert!(result.passed, "{} seed={} failed: {:?}", scenario, seed, result.failure_reason);
    }
}
