//! Verification jobs
//!
//! A job owns one worker thread draining a bounded queue of property
//! groups in submission order, with at most one solver process at a time.
//! After a cancellation or a failed group the remaining groups are reported
//! as cancelled without being run.

use crate::api::Solver;
use crate::cancel::CancellationToken;
use crate::error::{nested_messages, Result, SolverError};
use crate::result::{RunStatus, SolverResult};
use crossbeam::channel::{bounded, Sender};
use redcomp_contracts::{compose, generate, Mode, Script};
use redcomp_core::ComponentModel;
use std::thread::{self, JoinHandle};
use tracing::{error, info};

/// Default number of groups that may wait in the queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// A named script whose properties are decided together
#[derive(Debug, Clone)]
pub struct PropertyGroup {
    pub name: String,
    pub script: Script,
}

impl PropertyGroup {
    pub fn new(name: impl Into<String>, script: Script) -> Self {
        Self {
            name: name.into(),
            script,
        }
    }

    /// Group named after the kind of check the script performs
    pub fn from_script(script: Script) -> Self {
        let name = match &script.mode {
            Mode::Composition => "System Contract".to_string(),
            Mode::Diagnosis { target } => format!("Component Diagnosis ({})", target),
        };
        Self::new(name, script)
    }

    /// Compose `model` and generate its script, diagnosing `target` if given
    pub fn from_model(model: &ComponentModel, target: Option<&str>) -> Result<Self> {
        let composed = compose(model, target)?;
        Ok(Self::from_script(generate(&composed)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupStatus {
    Completed,
    Cancelled,
    /// Causal chain of the failure
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct GroupOutcome {
    pub name: String,
    pub status: GroupStatus,
    pub result: SolverResult,
}

/// Outcomes of every group of a job, in submission order
#[derive(Debug, Clone, Default)]
pub struct JobReport {
    pub outcomes: Vec<GroupOutcome>,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == GroupStatus::Completed)
    }

    pub fn outcome(&self, name: &str) -> Option<&GroupOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }
}

/// A running verification job
pub struct VerificationJob {
    sender: Sender<PropertyGroup>,
    worker: JoinHandle<Vec<GroupOutcome>>,
    cancel: CancellationToken,
}

impl VerificationJob {
    /// Start the worker thread; at most `capacity` groups wait in the queue
    pub fn start(solver: Solver, capacity: usize, cancel: CancellationToken) -> Result<Self> {
        let (sender, receiver) = bounded::<PropertyGroup>(capacity.max(1));
        let token = cancel.clone();
        let worker = thread::Builder::new()
            .name("redcomp-job".to_string())
            .spawn(move || {
                let mut outcomes = Vec::new();
                let mut stopped = false;
                for group in receiver.iter() {
                    let outcome = if stopped || token.is_cancelled() {
                        skipped(group)
                    } else {
                        let outcome = run_group(&solver, group, token.clone());
                        stopped = outcome.status != GroupStatus::Completed;
                        outcome
                    };
                    outcomes.push(outcome);
                }
                outcomes
            })?;
        Ok(Self {
            sender,
            worker,
            cancel,
        })
    }

    /// Queue a group, blocking while the queue is full
    pub fn submit(&self, group: PropertyGroup) -> Result<()> {
        info!(group = %group.name, "queueing property group");
        self.sender
            .send(group)
            .map_err(|_| SolverError::QueueClosed)
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Close the queue and wait for every queued group
    pub fn finish(self) -> Result<JobReport> {
        drop(self.sender);
        let outcomes = self
            .worker
            .join()
            .map_err(|_| SolverError::WorkerPanicked)?;
        Ok(JobReport { outcomes })
    }
}

/// Run `groups` one after another on a fresh job
pub fn verify(
    solver: Solver,
    groups: impl IntoIterator<Item = PropertyGroup>,
    cancel: CancellationToken,
) -> Result<JobReport> {
    let job = VerificationJob::start(solver, DEFAULT_QUEUE_CAPACITY, cancel)?;
    for group in groups {
        job.submit(group)?;
    }
    job.finish()
}

fn run_group(solver: &Solver, group: PropertyGroup, cancel: CancellationToken) -> GroupOutcome {
    info!(group = %group.name, properties = group.script.properties.len(), "running property group");
    let shared = SolverResult::new(group.name.clone(), &group.script.properties).shared();
    let run = solver.execute(&group.script, &shared, cancel);
    let result = shared.lock().clone();

    let status = match run {
        Ok(()) if result.status() == RunStatus::Cancelled => GroupStatus::Cancelled,
        Ok(()) => GroupStatus::Completed,
        Err(err) => {
            let message = nested_messages(&err);
            error!(group = %group.name, %message, "property group failed");
            GroupStatus::Failed(message)
        }
    };
    GroupOutcome {
        name: group.name,
        status,
        result,
    }
}

fn skipped(group: PropertyGroup) -> GroupOutcome {
    info!(group = %group.name, "skipping property group");
    let mut result = SolverResult::new(group.name.clone(), &group.script.properties);
    result.cancel();
    GroupOutcome {
        name: group.name,
        status: GroupStatus::Cancelled,
        result,
    }
}
