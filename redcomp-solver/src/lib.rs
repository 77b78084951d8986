//! Redlog solver front-end for redcomp
//!
//! Runs generated scripts through an external Redlog executable and reads
//! its output back into typed, per-property results:
//! - [`api`]: process invocation, timeouts and cancellation
//! - [`output`]: demarcation of the output stream into labelled bands
//! - [`document`]: the intermediate XML results document and its parser
//! - [`job`]: a bounded queue of property groups drained by one worker

pub mod api;
pub mod cancel;
pub mod document;
pub mod error;
pub mod job;
pub mod output;
pub mod result;

pub use api::{Solver, SolverConfig};
pub use cancel::CancellationToken;
pub use error::{nested_messages, Result, SolverError};
pub use job::{verify, GroupOutcome, GroupStatus, JobReport, PropertyGroup, VerificationJob};
pub use result::{
    Counterexample, PropertyResult, ResultEvent, RunStatus, SharedResult, Signal, SolverResult,
    Verdict,
};
