//! Solver process orchestration
//!
//! One call runs one script: the script and its results document live in a
//! scoped temporary directory, the solver's merged output is demarcated on
//! a reader thread that appends each property to the results document as
//! soon as its verdict bands are complete, and a second thread parses the
//! document into the shared [`SolverResult`](crate::result::SolverResult).
//!
//! On Unix the solver runs in a process group of its own, so stopping it
//! also stops whatever it forked.

use crate::cancel::CancellationToken;
use crate::document::{DocumentParser, DocumentWriter};
use crate::error::{Result, SolverError};
use crate::output::{display_strongest, extract_counterexample, read_output_with, SolverOutput};
use crate::result::{PropertyResult, ResultEvent, SharedResult, Verdict};
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use redcomp_contracts::{Band, PropertyInfo, Script};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// How long a stopped run waits for its output stream to close
const DRAIN_GRACE: Duration = Duration::from_secs(2);
const SCRIPT_FILE: &str = "script.red";
const DOCUMENT_FILE: &str = "script.red.xml";

/// How the solver is invoked
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Solver executable, looked up on `PATH` when relative
    pub executable: PathBuf,

    /// Arguments placed before the script path
    pub args: Vec<String>,

    /// Parent of the per-run temporary directories
    pub temp_dir: Option<PathBuf>,

    /// Leave scripts and results documents behind for inspection
    pub keep_temp_files: bool,

    /// Wall-clock limit per script
    pub timeout: Option<Duration>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("redcsl"),
            args: Vec::new(),
            temp_dir: None,
            keep_temp_files: false,
            timeout: None,
        }
    }
}

impl SolverConfig {
    /// Limit each run to `seconds`, which must be positive
    pub fn with_timeout(mut self, seconds: u64) -> Result<Self> {
        if seconds == 0 {
            return Err(SolverError::InvalidTimeout);
        }
        self.timeout = Some(Duration::from_secs(seconds));
        Ok(self)
    }
}

enum Exit {
    Finished(ExitStatus),
    Cancelled,
    TimedOut(Duration),
}

/// Demarcated output and the number of properties written to the document
struct Transcript {
    output: SolverOutput,
    written: usize,
}

/// Runs scripts through the external solver
#[derive(Debug, Clone, Default)]
pub struct Solver {
    config: SolverConfig,
    events: Option<Sender<ResultEvent>>,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            events: None,
        }
    }

    /// Send progress notifications to `events`
    pub fn with_events(mut self, events: Sender<ResultEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Run `script`, filling `result` as output arrives.
    ///
    /// Cancellation is not an error: the process is stopped and `result` is
    /// marked cancelled.
    pub fn execute(
        &self,
        script: &Script,
        result: &SharedResult,
        cancel: CancellationToken,
    ) -> Result<()> {
        let workspace = self.workspace()?;
        let script_path = workspace.path().join(SCRIPT_FILE);
        let document_path = workspace.path().join(DOCUMENT_FILE);
        fs::write(&script_path, &script.text)?;

        let group = {
            let mut result = result.lock();
            result.start();
            result.name.clone()
        };
        self.notify(ResultEvent::Started {
            group: group.clone(),
        });

        let parser = {
            let result = Arc::clone(result);
            let events = self.events.clone();
            let group = group.clone();
            DocumentParser::spawn(document_path.clone(), move |property| {
                debug!(property = %property.name, verdict = %property.verdict, "property decided");
                result.lock().set_property(property.clone());
                if let Some(events) = &events {
                    let _ = events.send(ResultEvent::Property {
                        group: group.clone(),
                        result: property,
                    });
                }
            })?
        };

        let run = self.run(script, &script_path, &document_path, result, &cancel);
        let parsed = parser.finish();
        let outcome = run.and_then(|written| {
            let found = parsed?;
            match written {
                Some(written) if written != found => Err(SolverError::ResultCount {
                    expected: written,
                    found,
                    text: result.lock().text.clone(),
                }),
                _ => Ok(()),
            }
        });

        let status = {
            let mut result = result.lock();
            if cancel.is_cancelled() {
                result.cancel();
            } else if outcome.is_err() {
                result.fail();
            } else {
                result.done();
            }
            result.status()
        };
        info!(%group, ?status, "solver run finished");
        self.notify(ResultEvent::Finished { group, status });

        if self.config.keep_temp_files {
            let kept = workspace.into_path();
            info!(path = %kept.display(), "keeping temporary files");
        }
        outcome
    }

    fn workspace(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("redcomp-");
        let dir = match &self.config.temp_dir {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    /// Run the solver process; returns the number of properties written to
    /// the results document, or `None` when the run was cancelled
    fn run(
        &self,
        script: &Script,
        script_path: &Path,
        document_path: &Path,
        result: &SharedResult,
        cancel: &CancellationToken,
    ) -> Result<Option<usize>> {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let (reader, writer) = io::pipe()?;
        let mut child = {
            let mut command = Command::new(&self.config.executable);
            command
                .args(&self.config.args)
                .arg(script_path)
                .stdin(Stdio::null())
                .stdout(writer.try_clone()?)
                .stderr(writer);
            #[cfg(unix)]
            {
                use std::os::unix::process::CommandExt;
                command.process_group(0);
            }
            info!(
                executable = %self.config.executable.display(),
                script = %script_path.display(),
                "starting solver"
            );
            command.spawn().map_err(|source| SolverError::Spawn {
                executable: self.config.executable.display().to_string(),
                source,
            })?
        };

        // The reader is never joined: a stream held open by a stray
        // descendant must not keep a stopped run waiting.
        let (sender, receiver) = channel::bounded(1);
        {
            let script = script.clone();
            let document_path = document_path.to_path_buf();
            thread::Builder::new()
                .name("redcomp-output".to_string())
                .spawn(move || {
                    let transcript = transcribe(BufReader::new(reader), &script, &document_path);
                    let _ = sender.send(transcript);
                })?;
        }

        match self.wait(&mut child, cancel)? {
            Exit::Cancelled => {
                drain(&receiver);
                Ok(None)
            }
            Exit::TimedOut(limit) => {
                drain(&receiver);
                Err(SolverError::Timeout(limit))
            }
            Exit::Finished(status) => {
                let Transcript { output, written } =
                    receiver.recv().map_err(|_| SolverError::WorkerPanicked)??;
                record_bands(result, script, &output);
                if !status.success() {
                    let code = status.code().unwrap_or(-1);
                    warn!(code, written, "solver terminated abnormally");
                    return Err(SolverError::AbnormalTermination {
                        code,
                        text: output.transcript,
                    });
                }
                if let Some(band) = missing_band(script, &output) {
                    return Err(SolverError::MissingBand {
                        band: band.to_string(),
                        text: output.transcript,
                    });
                }
                Ok(Some(written))
            }
        }
    }

    fn wait(&self, child: &mut Child, cancel: &CancellationToken) -> Result<Exit> {
        let started = Instant::now();
        loop {
            let polled = child.try_wait();
            match polled {
                Ok(Some(status)) => {
                    debug!(?status, "solver exited");
                    return Ok(Exit::Finished(status));
                }
                Ok(None) => {}
                Err(err) => {
                    stop(child)?;
                    return Err(err.into());
                }
            }
            if cancel.is_cancelled() {
                info!("cancelling solver run");
                stop(child)?;
                return Ok(Exit::Cancelled);
            }
            if let Some(limit) = self.config.timeout {
                if started.elapsed() >= limit {
                    warn!(?limit, "solver timed out");
                    stop(child)?;
                    return Ok(Exit::TimedOut(limit));
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn notify(&self, event: ResultEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

/// Kill the process if it is still alive, then reap it
fn stop(child: &mut Child) -> io::Result<()> {
    if child.try_wait()?.is_none() {
        kill(child)?;
    }
    child.wait()?;
    Ok(())
}

/// Kill the whole process group the solver leads
#[cfg(unix)]
fn kill(child: &mut Child) -> io::Result<()> {
    let group = child.id() as libc::pid_t;
    // SAFETY: kill(2) takes plain integers; the unreaped child keeps the
    // group id from being reused.
    if unsafe { libc::kill(-group, libc::SIGKILL) } == 0 {
        return Ok(());
    }
    debug!(error = %io::Error::last_os_error(), "process group kill failed");
    child.kill()
}

#[cfg(not(unix))]
fn kill(child: &mut Child) -> io::Result<()> {
    child.kill()
}

/// Give the reader of a stopped run a moment to see the end of its stream
fn drain(receiver: &channel::Receiver<Result<Transcript>>) {
    match receiver.recv_timeout(DRAIN_GRACE) {
        Ok(Ok(transcript)) => debug!(written = transcript.written, "output drained"),
        Ok(Err(err)) => debug!(error = %err, "output reader failed after stop"),
        Err(RecvTimeoutError::Timeout) => {
            warn!(grace = ?DRAIN_GRACE, "solver output still open, leaving reader behind")
        }
        Err(RecvTimeoutError::Disconnected) => warn!("output reader exited without a transcript"),
    }
}

/// Demarcate the solver output, appending every property to the results
/// document once all of its verdict bands are in
fn transcribe(reader: impl BufRead, script: &Script, document_path: &Path) -> Result<Transcript> {
    let mut document = DocumentWriter::begin(File::create(document_path)?)?;
    let mut written = BTreeSet::new();
    let output = read_output_with(reader, |band, output| {
        let (Band::Property(name) | Band::BaseStep(name) | Band::InductiveStep(name)) = band
        else {
            return Ok(());
        };
        if written.contains(name) {
            return Ok(());
        }
        let Some(info) = script.properties.iter().find(|p| &p.name == name) else {
            warn!(property = %name, "band for an unknown property");
            return Ok(());
        };
        if let Some(property) = property_result(script, info, output) {
            document.write_property(&property)?;
            written.insert(name.clone());
        }
        Ok(())
    })?;
    document.end()?;
    Ok(Transcript {
        output,
        written: written.len(),
    })
}

/// Copy the diagnostic bands and the formatted verdict bands into `result`
fn record_bands(result: &SharedResult, script: &Script, output: &SolverOutput) {
    let text = |band: &Band| output.band(band).map(|b| b.text());
    let mut verification = String::new();
    for band in &script.bands {
        if matches!(
            band,
            Band::Property(_) | Band::BaseStep(_) | Band::InductiveStep(_)
        ) {
            if let Some(body) = text(band) {
                verification.push_str(&format!("{}\n{}\n", band, body));
            }
        }
    }

    let mut result = result.lock();
    result.initial_constraint = text(&Band::InitialConstraint);
    result.strongest_property = text(&Band::StrongestProperty).map(|t| display_strongest(&t));
    result.weakest_property = text(&Band::WeakestProperty);
    result.text = verification;
}

/// First verdict band the output lacks
fn missing_band(script: &Script, output: &SolverOutput) -> Option<Band> {
    script
        .properties
        .iter()
        .flat_map(|property| script.verdict_bands(&property.name))
        .find(|band| output.band(band).is_none())
}

/// Verdict of one property, once every one of its bands is present
fn property_result(
    script: &Script,
    property: &PropertyInfo,
    output: &SolverOutput,
) -> Option<PropertyResult> {
    let mut texts = Vec::new();
    let mut runtime = 0.0;
    for band in script.verdict_bands(&property.name) {
        let found = output.band(&band)?;
        runtime += found.runtime.unwrap_or(0.0);
        texts.push(found.text());
    }

    let verdicts: Vec<Verdict> = texts.iter().map(|t| Verdict::from_band_text(t)).collect();
    let verdict = match verdicts.as_slice() {
        [single] => *single,
        [base, step] => Verdict::from_induction(*base, *step),
        _ => Verdict::Unknown,
    };
    let counterexample = match (verdict, texts.first()) {
        (Verdict::Falsifiable, Some(text)) => Some(extract_counterexample(text, &script.renaming)),
        _ => None,
    };
    debug!(property = %property.name, %verdict, runtime, "property verdict");
    Some(PropertyResult {
        name: property.name.clone(),
        verdict,
        runtime,
        counterexample,
    })
}
