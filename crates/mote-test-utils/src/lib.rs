//! Test fixtures for Mote development.
//!
//! Provides small geometries ([`unit_box`], [`folded_pair`]), ready-made
//! models and configurations, and [`RecordingHooks`], an
//! [`OutputHooks`] implementation that keeps everything it is told.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use mote_engine::{IterationReport, OutputHooks, ReactionReport, Snapshot, WallHit};

pub use fixtures::*;

/// Per-iteration summary captured by [`RecordingHooks`].
#[derive(Clone, Debug, PartialEq)]
pub struct IterationRecord {
    pub iteration: u64,
    pub time: f64,
    pub molecules: usize,
    pub species_totals: Vec<i64>,
}

/// Hooks that record every report.
#[derive(Debug, Default)]
pub struct RecordingHooks {
    pub iterations: Vec<IterationRecord>,
    pub outputs: Vec<IterationRecord>,
    pub wall_hits: Vec<WallHit>,
    pub reactions: Vec<ReactionReport>,
    pub checkpoints: Vec<Snapshot>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }
}

fn record(report: &IterationReport<'_>) -> IterationRecord {
    IterationRecord {
        iteration: report.iteration,
        time: report.time,
        molecules: report.molecules.len(),
        species_totals: report.counters.species_totals().to_vec(),
    }
}

impl OutputHooks for RecordingHooks {
    fn on_iteration(&mut self, report: &IterationReport<'_>) {
        self.iterations.push(record(report));
    }

    fn on_wall_hit(&mut self, hit: &WallHit) {
        self.wall_hits.push(*hit);
    }

    fn on_periodic_output(&mut self, report: &IterationReport<'_>) {
        self.outputs.push(record(report));
    }

    fn on_reaction(&mut self, reaction: &ReactionReport) {
        self.reactions.push(reaction.clone());
    }

    fn emergency_checkpoint(&mut self, snapshot: &Snapshot) {
        self.checkpoints.push(snapshot.clone());
    }
}
