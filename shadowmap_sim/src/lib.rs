//! ShadowMap Deterministic Simulation Harness
//!
//! This crate runs the one interleaving a shadow view exists for: a live
//! loop mutating the world every tick while a background exporter walks a
//! snapshot of it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ScenarioRunner                          │
//! │                                                              │
//! │  ┌────────────┐  add/remove   ┌──────────────┐               │
//! │  │ LiveWorld  │──────────────►│  ShadowView  │               │
//! │  │ (normal)   │◄── reads ─────│  shadow copy │               │
//! │  └─────┬──────┘    live       └──────▲───────┘               │
//! │        │                             │ shadow_add/remove     │
//! │        ▼                             │ reads shadow          │
//! │  ┌────────────┐               ┌──────┴─────────┐             │
//! │  │Authoritative◄── wraps ─────│SnapshotExporter│             │
//! │  └────────────┘               │ (privileged)   │             │
//! │                               └────────────────┘             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use shadowmap_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::DespawnStorm);
//! assert!(result.passed);
//! ```

mod error;
mod exporter;
mod runner;
pub mod scenarios;
mod world;

pub use error::SimError;
pub use exporter::{ExporterConfig, GroupExport, Snapshot, SnapshotExport, SnapshotExporter};
pub use runner::{EpisodeMetrics, ScenarioResult, ScenarioRunner};
pub use world::{EntityKind, LiveWorld, SimConfig, SimEntity, TickReport};
