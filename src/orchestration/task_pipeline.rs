use super::dispatcher::{SubTaskDispatcher, SubTaskResult};
use super::errors::{DispatchResult, OrchestrationError, OrchestrationResult};
use super::result_assembler::{AssembledResults, ResultAssembler};
use crate::config::SequencerConfig;
use crate::events::EventPublisher;
use crate::lineage::{ProvenanceRecord, ProvenanceSink};
use crate::logging::{log_bundle_operation, log_error};
use crate::models::{ProducerId, WorkItem};
use crate::state_machine::{
    InputBundle, Phase, PhaseSequencer, SequencerError, SequencerEvent,
};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::future::BoxFuture;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Summary of a task driven to completion
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub task_id: i64,
    pub bundle_count: usize,
    pub results: AssembledResults,
    /// Keys of work items the store could not satisfy
    pub unsatisfiable_items: Vec<String>,
    pub cumulative_lineage: BTreeSet<ProducerId>,
}

type InFlight = BoxFuture<'static, (usize, DispatchResult<SubTaskResult>)>;

/// Drives one task's sequencer to completion.
///
/// Bundles are pulled from the sequencer in order and dispatched with at most
/// `max_in_flight_bundles` outstanding. Per-bundle lineage is persisted before a bundle is
/// dispatched; the cumulative record is persisted once all results are in.
pub struct TaskPipeline<W: WorkItem> {
    task_id: i64,
    sequencer: PhaseSequencer<W>,
    dispatcher: Arc<dyn SubTaskDispatcher<W>>,
    provenance: Arc<dyn ProvenanceSink>,
    events: EventPublisher,
    config: SequencerConfig,
}

impl<W: WorkItem> TaskPipeline<W> {
    pub fn new(
        task_id: i64,
        sequencer: PhaseSequencer<W>,
        dispatcher: Arc<dyn SubTaskDispatcher<W>>,
        provenance: Arc<dyn ProvenanceSink>,
        events: EventPublisher,
        config: SequencerConfig,
    ) -> Self {
        Self {
            task_id,
            sequencer,
            dispatcher,
            provenance,
            events,
            config,
        }
    }

    pub fn task_id(&self) -> i64 {
        self.task_id
    }

    #[instrument(skip(self), fields(task_id = self.task_id))]
    pub async fn run(mut self) -> OrchestrationResult<TaskOutcome> {
        let task_id = self.task_id;
        let max_in_flight = self.config.max_in_flight_bundles.max(1);
        let mut in_flight: FuturesUnordered<InFlight> = FuturesUnordered::new();
        let mut assembler = ResultAssembler::new();
        let mut current_phase: Option<Phase> = None;
        let mut unsatisfiable_items = Vec::new();

        info!(
            task_id = task_id,
            phases = ?self.sequencer.phases(),
            max_in_flight = max_in_flight,
            dispatcher = self.dispatcher.description(),
            "Starting task pipeline"
        );

        while !self.sequencer.is_done() || !in_flight.is_empty() {
            while !self.sequencer.is_done() && in_flight.len() < max_in_flight {
                let bundle = match self.next_bundle_with_retry().await {
                    Ok(bundle) => bundle,
                    Err(e) => return Err(self.abort("next_bundle", e)),
                };

                if current_phase != Some(bundle.phase) {
                    current_phase = Some(bundle.phase);
                    self.events
                        .publish_sequencer_event(&SequencerEvent::PhaseEntered {
                            task_id,
                            phase: bundle.phase,
                            bundle_index: bundle.index,
                        });
                }

                let unsatisfiable = bundle.unsatisfiable_keys();
                if !unsatisfiable.is_empty() {
                    self.events
                        .publish_sequencer_event(&SequencerEvent::WorkItemsUnsatisfiable {
                            task_id,
                            phase: bundle.phase,
                            bundle_index: bundle.index,
                            item_keys: unsatisfiable.clone(),
                        });
                    unsatisfiable_items.extend(unsatisfiable);
                }

                let record =
                    ProvenanceRecord::for_bundle(task_id, bundle.index, bundle.lineage.clone());
                let persisted = self.provenance.persist(record).await;
                if let Err(e) = persisted {
                    let error = OrchestrationError::provenance(task_id, e);
                    return Err(self.abort("persist_bundle_lineage", error));
                }

                self.events
                    .publish_sequencer_event(&SequencerEvent::BundleEmitted {
                        task_id,
                        phase: bundle.phase,
                        bundle_index: bundle.index,
                        item_count: bundle.items().len(),
                        last_call: bundle.last_call,
                    });

                log_bundle_operation(
                    "dispatch",
                    Some(task_id),
                    Some(bundle.index),
                    Some(&bundle.phase.to_string()),
                    "dispatched",
                    Some(bundle.payload.kind()),
                );

                assembler.expect(bundle.index, bundle.phase);
                in_flight.push(self.dispatch(bundle));
            }

            if let Some((index, result)) = in_flight.next().await {
                let result = match result {
                    Ok(result) => result,
                    Err(e) => {
                        debug!(task_id = task_id, bundle_index = index, "Dispatch failed");
                        return Err(self.abort("dispatch", OrchestrationError::dispatch(task_id, e)));
                    }
                };
                debug!(task_id = task_id, bundle_index = index, "Received sub-task result");
                if let Err(e) = assembler.accept(result) {
                    return Err(self.abort("accept_result", OrchestrationError::assembly(task_id, e)));
                }
            }
        }

        let cumulative_lineage = self.sequencer.lineage().cumulative();
        if self.config.persist_cumulative_lineage {
            let record = ProvenanceRecord::for_task(task_id, cumulative_lineage.clone());
            let persisted = self.provenance.persist(record).await;
            if let Err(e) = persisted {
                let error = OrchestrationError::provenance(task_id, e);
                return Err(self.abort("persist_task_lineage", error));
            }
        }

        let bundle_count = self.sequencer.bundles_emitted();
        let results = match assembler.finish() {
            Ok(results) => results,
            Err(e) => {
                return Err(self.abort("assemble_results", OrchestrationError::assembly(task_id, e)))
            }
        };

        self.events
            .publish_sequencer_event(&SequencerEvent::SequenceCompleted {
                task_id,
                bundle_count,
            });

        info!(
            task_id = task_id,
            bundle_count = bundle_count,
            unsatisfiable = unsatisfiable_items.len(),
            producers = cumulative_lineage.len(),
            "Task pipeline completed"
        );

        Ok(TaskOutcome {
            task_id,
            bundle_count,
            results,
            unsatisfiable_items,
            cumulative_lineage,
        })
    }

    /// Pull the next bundle, repeating the call after retryable failures
    async fn next_bundle_with_retry(&mut self) -> OrchestrationResult<InputBundle<W>> {
        let mut attempt = 0;
        loop {
            match self.sequencer.next_bundle().await {
                Ok(bundle) => return Ok(bundle),
                Err(e) if e.is_retryable() && attempt < self.config.retry_attempts => {
                    attempt += 1;
                    warn!(
                        task_id = self.task_id,
                        attempt = attempt,
                        error = %e,
                        "Retrying bundle after retryable failure"
                    );
                }
                Err(e) => return Err(self.sequencer_error(e)),
            }
        }
    }

    /// Stop the sequence after a failure and log it
    fn abort(&mut self, operation: &str, error: OrchestrationError) -> OrchestrationError {
        self.sequencer.abandon();
        let context = format!("task_id={}", self.task_id);
        log_error("task_pipeline", operation, &error.to_string(), Some(&context));
        error
    }

    fn sequencer_error(&self, error: SequencerError) -> OrchestrationError {
        OrchestrationError::sequencer(self.task_id, error)
    }

    fn dispatch(&self, bundle: InputBundle<W>) -> InFlight {
        let dispatcher = Arc::clone(&self.dispatcher);
        let task_id = self.task_id;
        Box::pin(async move {
            let index = bundle.index;
            (index, dispatcher.dispatch(task_id, bundle).await)
        })
    }
}

/// Run independent task pipelines in parallel, one tokio task each.
///
/// Results come back in the order the pipelines were given.
pub async fn run_pipelines_concurrently<W: WorkItem>(
    pipelines: Vec<TaskPipeline<W>>,
) -> Vec<OrchestrationResult<TaskOutcome>> {
    let handles: Vec<(i64, tokio::task::JoinHandle<OrchestrationResult<TaskOutcome>>)> = pipelines
        .into_iter()
        .map(|pipeline| (pipeline.task_id(), tokio::spawn(pipeline.run())))
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (task_id, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(OrchestrationError::aborted(task_id, e.to_string())),
        };
        outcomes.push(outcome);
    }
    outcomes
}
