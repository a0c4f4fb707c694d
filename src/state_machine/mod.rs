// Phase state machine for sub-task sequencing
//
// A task's work is split into an ordered table of phases. The sequencer walks that table
// one bundle per call, tracking first/last call and lineage, and can be checkpointed and
// restored between calls.

pub mod bundle;
pub mod errors;
pub mod events;
pub mod generator;
pub mod phase_sequencer;
pub mod phases;
pub mod plan;

// Re-export main types for convenient access
pub use bundle::{group_by_phase, InputBundle, PhaseGroup};
pub use errors::{SequencerError, SequencerResult};
pub use events::SequencerEvent;
pub use generator::{BatchPhase, BundlePayload, PhaseGenerator, SideDataFn, SidePhase};
pub use phase_sequencer::{PhaseContext, PhaseSequencer, SequencerCheckpoint};
pub use phases::Phase;
pub use plan::{PhasePlan, PhaseSource, PhaseSpec};
