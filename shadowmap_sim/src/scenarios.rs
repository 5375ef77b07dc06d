//! Interleaving scenarios for the shadow view.

use crate::exporter::ExporterConfig;
use crate::world::{EntityKind, SimConfig};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SHD-001: light churn while the exporter walks
    Steady,
    
    /// SHD-002: the live loop despawns faster than the exporter writes
    DespawnStorm,
    
    /// SHD-003: the live loop spawns faster than the exporter writes
    SpawnFlood,
    
    /// SHD-004: the exporter hides one kind from its own view
    HiddenKinds,
    
    /// SHD-005: exporter on its own OS thread, heavy churn
    Threaded,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Steady,
            ScenarioId::DespawnStorm,
            ScenarioId::SpawnFlood,
            ScenarioId::HiddenKinds,
            ScenarioId::Threaded,
        ]
    }
    
    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Steady => "steady",
            ScenarioId::DespawnStorm => "despawn_storm",
            ScenarioId::SpawnFlood => "spawn_flood",
            ScenarioId::HiddenKinds => "hidden_kinds",
            ScenarioId::Threaded => "threaded",
        }
    }
    
    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Steady => "60 entities, up to 2 spawns/despawns per tick",
            ScenarioId::DespawnStorm => "120 entities, up to 8 despawns per tick; exporter reintroduces",
            ScenarioId::SpawnFlood => "40 entities, up to 10 spawns per tick; exporter hides newcomers",
            ScenarioId::HiddenKinds => "pedestrians hidden from the export, never from the world",
            ScenarioId::Threaded => "exporter on an OS thread, 200 entities, 6/6 churn",
        }
    }
    
    /// Returns true if the exporter runs on its own OS thread.
    pub fn is_threaded(&self) -> bool {
        matches!(self, ScenarioId::Threaded)
    }
    
    /// World configuration for this scenario.
    pub fn world_config(&self, seed: u64) -> SimConfig {
        let (initial_entities, max_spawns_per_tick, max_despawns_per_tick) = match self {
            ScenarioId::Steady => (60, 2, 2),
            ScenarioId::DespawnStorm => (120, 1, 8),
            ScenarioId::SpawnFlood => (40, 10, 1),
            ScenarioId::HiddenKinds => (80, 4, 4),
            ScenarioId::Threaded => (200, 6, 6),
        };
        SimConfig {
            seed,
            initial_entities,
            max_spawns_per_tick,
            max_despawns_per_tick,
        }
    }
    
    /// Exporter configuration for this scenario.
    pub fn exporter_config(&self) -> ExporterConfig {
        match self {
            ScenarioId::HiddenKinds => ExporterConfig {
                hidden_kinds: vec![EntityKind::Pedestrian],
                ..Default::default()
            },
            ScenarioId::DespawnStorm => ExporterConfig {
                yield_every: 2,
                ..Default::default()
            },
            _ => ExporterConfig::default(),
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;
    
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "steady" | "shd-001" => Ok(ScenarioId::Steady),
            "despawn_storm" | "despawnstorm" | "shd-002" => Ok(ScenarioId::DespawnStorm),
            "spawn_flood" | "spawnflood" | "shd-003" => Ok(ScenarioId::SpawnFlood),
            "hidden_kinds" | "hiddenkinds" | "shd-004" => Ok(ScenarioId::HiddenKinds),
            "threaded" | "shd-005" => Ok(ScenarioId::Threaded),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
        assert_eq!("SHD-002".parse::<ScenarioId>(), Ok(ScenarioId::DespawnStorm));
        assert!("nope".parse::<ScenarioId>().is_err());
    }
    
    #[test]
    fn test_only_hidden_kinds_hides() {
        for scenario in ScenarioId::all() {
            let hides = !scenario.exporter_config().hidden_kinds.is_empty();
            assert_eq!(hides, scenario == ScenarioId::HiddenKinds);
        }
    }
}
