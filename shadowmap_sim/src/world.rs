//! LiveWorld - the live loop that owns the authoritative entity collection.

use crate::error::SimError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use shadowmap_core::{Authoritative, Grouped, Membership};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Entity class, used as the group key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Drone,
    Vehicle,
    Pedestrian,
}

impl EntityKind {
    /// All kinds, in export order.
    pub const ALL: [EntityKind; 3] = [EntityKind::Drone, EntityKind::Vehicle, EntityKind::Pedestrian];
    
    /// Returns the kind name.
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Drone => "drone",
            EntityKind::Vehicle => "vehicle",
            EntityKind::Pedestrian => "pedestrian",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;
    
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drone" => Ok(EntityKind::Drone),
            "vehicle" => Ok(EntityKind::Vehicle),
            "pedestrian" => Ok(EntityKind::Pedestrian),
            _ => Err(format!("Unknown entity kind: {}", s)),
        }
    }
}

/// An entity handle in the simulated world.
///
/// Identity is the `id` alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEntity {
    /// Unique entity ID
    pub id: u64,
    
    /// Entity class
    pub kind: EntityKind,
    
    /// Tick on which the live loop spawned this entity
    pub spawned_tick: u64,
}

impl PartialEq for SimEntity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SimEntity {}

impl Hash for SimEntity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Grouped for SimEntity {
    type Key = EntityKind;
    
    fn group_key(&self) -> EntityKind {
        self.kind
    }
}

/// Configuration for the live world.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,
    
    /// Entities present before the first tick
    pub initial_entities: usize,
    
    /// Upper bound on spawns per tick
    pub max_spawns_per_tick: usize,
    
    /// Upper bound on despawns per tick
    pub max_despawns_per_tick: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            initial_entities: 60,
            max_spawns_per_tick: 2,
            max_despawns_per_tick: 2,
        }
    }
}

/// What one tick changed.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    pub spawned: Vec<SimEntity>,
    pub despawned: Vec<SimEntity>,
}

/// The live loop: mutates the authoritative collection every tick and keeps
/// its own ledger of which entities are alive.
pub struct LiveWorld {
    /// Configuration
    config: SimConfig,
    
    /// RNG for spawn/despawn decisions
    rng: ChaCha8Rng,
    
    /// Ground truth shared with any shadow view
    entities: Authoritative<SimEntity>,
    
    /// Independent record of living entities, by ID
    ledger: BTreeMap<u64, SimEntity>,
    
    /// Next entity ID
    next_id: u64,
    
    /// Current tick count
    tick_count: u64,
}

impl LiveWorld {
    /// Creates a world and spawns the initial entities.
    pub fn new(config: SimConfig) -> Self {
        // Keep world RNG apart from the seed used for subsystem ids
        let world_seed = config.seed.wrapping_mul(0x9e3779b97f4a7c15);
        
        let mut world = Self {
            rng: ChaCha8Rng::seed_from_u64(world_seed),
            entities: Authoritative::new(),
            ledger: BTreeMap::new(),
            next_id: 0,
            tick_count: 0,
            config,
        };
        
        let handle = world.entities.clone();
        for _ in 0..world.config.initial_entities {
            let entity = world.next_entity();
            handle.add(entity.clone());
            world.ledger.insert(entity.id, entity);
        }
        
        world
    }
    
    /// Advances one tick, mutating the authoritative collection directly.
    pub fn tick(&mut self) -> TickReport {
        let handle = self.entities.clone();
        self.tick_with(&handle)
    }
    
    /// Advances one tick, mutating through `membership`.
    ///
    /// During a traversal episode `membership` is the shadow view, so every
    /// edit lands in both the live collection and the shadow.
    pub fn tick_with<M: Membership<SimEntity>>(&mut self, membership: &M) -> TickReport {
        self.tick_count += 1;
        let mut report = TickReport {
            tick: self.tick_count,
            ..Default::default()
        };
        
        // Despawn random living entities; sort for a seed-stable choice
        let mut candidates = membership.members();
        candidates.sort_by_key(|e| e.id);
        let despawns = self
            .rng
            .gen_range(0..=self.config.max_despawns_per_tick)
            .min(candidates.len());
        for _ in 0..despawns {
            let idx = self.rng.gen_range(0..candidates.len());
            let entity = candidates.swap_remove(idx);
            if membership.remove(&entity) {
                self.ledger.remove(&entity.id);
                report.despawned.push(entity);
            }
        }
        
        let spawns = self.rng.gen_range(0..=self.config.max_spawns_per_tick);
        for _ in 0..spawns {
            let entity = self.next_entity();
            if membership.add(entity.clone()) {
                self.ledger.insert(entity.id, entity.clone());
                report.spawned.push(entity);
            }
        }
        
        report
    }
    
    fn next_entity(&mut self) -> SimEntity {
        let id = self.next_id;
        self.next_id += 1;
        let kind = EntityKind::ALL[self.rng.gen_range(0..EntityKind::ALL.len())];
        SimEntity {
            id,
            kind,
            spawned_tick: self.tick_count,
        }
    }
    
    /// Checks the authoritative collection against the ledger.
    pub fn verify(&self) -> Result<(), SimError> {
        let mut live: Vec<u64> = self.entities.members().into_iter().map(|e| e.id).collect();
        live.sort_unstable();
        let expected: Vec<u64> = self.ledger.keys().copied().collect();
        
        if live != expected {
            return Err(SimError::invariant(format!(
                "authoritative collection holds {} entities, ledger holds {}",
                live.len(),
                expected.len()
            )));
        }
        Ok(())
    }
    
    /// The authoritative collection.
    pub fn entities(&self) -> &Authoritative<SimEntity> {
        &self.entities
    }
    
    /// IDs of living entities, ascending.
    pub fn ledger_ids(&self) -> Vec<u64> {
        self.ledger.keys().copied().collect()
    }
    
    /// Number of IDs handed out so far.
    pub fn ids_issued(&self) -> u64 {
        self.next_id
    }
    
    /// Returns the current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
    
    /// Returns the number of living entities.
    pub fn entity_count(&self) -> usize {
        self.ledger.len()
    }
}
