//! Interrupt handling
//!
//! Ctrl-C cancels the running verification job instead of killing the
//! process, so the solver is stopped and the partial report still printed.

use anyhow::Result;
use redcomp_solver::CancellationToken;
use std::future::Future;
use std::io;
use std::thread;
use tracing::{debug, warn};

/// Cancel `token` on Ctrl-C
pub fn cancel_on_interrupt(token: CancellationToken) -> Result<()> {
    cancel_on(tokio::signal::ctrl_c(), token)
}

/// Cancel `token` once `signal` resolves, listening on a background thread
pub fn cancel_on<F>(signal: F, token: CancellationToken) -> Result<()>
where
    F: Future<Output = io::Result<()>> + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    thread::Builder::new()
        .name("redcomp-signal".to_string())
        .spawn(move || match runtime.block_on(signal) {
            Ok(()) => {
                warn!("interrupted, cancelling verification");
                token.cancel();
            }
            Err(err) => debug!(error = %err, "not listening for interrupts"),
        })?;
    Ok(())
}
