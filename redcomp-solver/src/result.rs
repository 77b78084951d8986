//! Typed verification results

use parking_lot::Mutex;
use redcomp_contracts::PropertyInfo;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Outcome of checking one property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Falsifiable,
    Unknown,
}

impl Verdict {
    /// Read the verdict printed by `rlqea`: `true` is valid, `unknown` is
    /// unknown and anything else is falsifiable
    pub fn from_band_text(text: &str) -> Verdict {
        let text: String = text.chars().filter(|&c| c != '{').collect();
        let text = text.trim_start();
        if text.starts_with("true") {
            Verdict::Valid
        } else if text.starts_with("unknown") {
            Verdict::Unknown
        } else {
            Verdict::Falsifiable
        }
    }

    /// Combine the base and inductive step of a temporal proof
    pub fn from_induction(base: Verdict, step: Verdict) -> Verdict {
        match (base, step) {
            (Verdict::Falsifiable, _) => Verdict::Falsifiable,
            (Verdict::Valid, Verdict::Valid) => Verdict::Valid,
            _ => Verdict::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Valid => "valid",
            Verdict::Falsifiable => "falsifiable",
            Verdict::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "valid" => Ok(Verdict::Valid),
            "falsifiable" => Ok(Verdict::Falsifiable),
            "unknown" => Ok(Verdict::Unknown),
            other => Err(format!("Unknown property answer: {}", other)),
        }
    }
}

/// Values of one variable over time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signal {
    pub name: String,

    /// Value text by time step
    pub values: BTreeMap<usize, String>,
}

impl Signal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn value(&self, time: usize) -> Option<&str> {
        self.values.get(&time).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counterexample {
    pub signals: BTreeMap<String, Signal>,
}

impl Counterexample {
    /// Number of time steps covered by any signal
    pub fn length(&self) -> usize {
        self.signals
            .values()
            .filter_map(|s| s.values.keys().next_back())
            .max()
            .map_or(0, |last| last + 1)
    }

    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.get(name)
    }

    pub fn signal_mut(&mut self, name: &str) -> &mut Signal {
        self.signals
            .entry(name.to_string())
            .or_insert_with(|| Signal::new(name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyResult {
    pub name: String,

    pub verdict: Verdict,

    /// Solver time in seconds
    pub runtime: f64,

    /// Present for falsifiable properties
    pub counterexample: Option<Counterexample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Waiting,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// Result of one property group.
///
/// Created empty, filled in while solver output streams in, and left alone
/// once the run has finished.
#[derive(Debug, Clone)]
pub struct SolverResult {
    pub name: String,

    status: RunStatus,

    /// Property name, display name and outcome, in script order
    properties: Vec<(PropertyInfo, Option<PropertyResult>)>,

    pub initial_constraint: Option<String>,

    pub strongest_property: Option<String>,

    pub weakest_property: Option<String>,

    /// Formatted verification bands
    pub text: String,
}

pub type SharedResult = Arc<Mutex<SolverResult>>;

impl SolverResult {
    pub fn new(name: impl Into<String>, properties: &[PropertyInfo]) -> Self {
        Self {
            name: name.into(),
            status: RunStatus::Waiting,
            properties: properties.iter().map(|p| (p.clone(), None)).collect(),
            initial_constraint: None,
            strongest_property: None,
            weakest_property: None,
            text: String::new(),
        }
    }

    pub fn shared(self) -> SharedResult {
        Arc::new(Mutex::new(self))
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn start(&mut self) {
        self.status = RunStatus::Running;
    }

    pub fn done(&mut self) {
        if self.status == RunStatus::Running {
            self.status = RunStatus::Completed;
        }
    }

    pub fn cancel(&mut self) {
        self.status = RunStatus::Cancelled;
    }

    pub fn fail(&mut self) {
        self.status = RunStatus::Failed;
    }

    /// Record the outcome of a property; `false` if the name is not part of
    /// this result
    pub fn set_property(&mut self, result: PropertyResult) -> bool {
        match self
            .properties
            .iter_mut()
            .find(|(info, _)| info.name.eq_ignore_ascii_case(&result.name))
        {
            Some((_, slot)) => {
                *slot = Some(result);
                true
            }
            None => false,
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyResult> {
        self.properties
            .iter()
            .find(|(info, _)| info.name == name)
            .and_then(|(_, result)| result.as_ref())
    }

    /// Property outcome looked up by its display name
    pub fn property_by_display(&self, display: &str) -> Option<&PropertyResult> {
        self.properties
            .iter()
            .find(|(info, _)| info.display == display)
            .and_then(|(_, result)| result.as_ref())
    }

    pub fn properties(&self) -> impl Iterator<Item = (&PropertyInfo, Option<&PropertyResult>)> {
        self.properties
            .iter()
            .map(|(info, result)| (info, result.as_ref()))
    }

    /// Number of properties with an outcome
    pub fn decided(&self) -> usize {
        self.properties.iter().filter(|(_, r)| r.is_some()).count()
    }
}

/// Notification sent to listeners while a job runs
#[derive(Debug, Clone, PartialEq)]
pub enum ResultEvent {
    Started { group: String },
    Property { group: String, result: PropertyResult },
    Finished { group: String, status: RunStatus },
}
