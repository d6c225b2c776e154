//! Resolution journey: every step of one lookup, in order.
//!
//! Steps are kept so a finished run can be inspected, and each step's line
//! is echoed to stdout as it happens when `echo` is on. Those stdout lines
//! are the program's output contract; diagnostics go through `tracing`.

use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::iterative::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Query,
    QueryFailed,
    NoUsableAnswer,
    NsExtracted,
    NsResolved,
    NsFailed,
    Referral,
    Answer,
    Failed,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Query => "QUERY",
            Action::QueryFailed => "QUERY_FAILED",
            Action::NoUsableAnswer => "NO_ANSWER",
            Action::NsExtracted => "NS_EXTRACTED",
            Action::NsResolved => "NS_RESOLVED",
            Action::NsFailed => "NS_FAILED",
            Action::Referral => "REFERRAL",
            Action::Answer => "ANSWER",
            Action::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct JourneyStep {
    pub stage: Stage,
    pub action: Action,
    pub detail: String,
    pub timestamp_ms: u64, // since start
}

#[derive(Debug)]
pub struct Journey {
    qname: String,
    steps: Vec<JourneyStep>,
    lines: Vec<String>,
    started_at: Instant,
    echo: bool,
}

impl Journey {
    pub fn new(qname: &str, echo: bool) -> Self {
        Self {
            qname: qname.to_string(),
            steps: Vec::new(),
            lines: Vec::new(),
            started_at: Instant::now(),
            echo,
        }
    }

    /// Journey that only records; nothing is printed.
    pub fn quiet(qname: &str) -> Self {
        Self::new(qname, false)
    }

    /// Print a progress line without recording a step.
    pub fn say(&mut self, line: impl Into<String>) {
        let line = line.into();
        if self.echo {
            println!("{}", line);
        }
        self.lines.push(line);
    }

    /// Record a step; `line` is what the user sees for it.
    pub fn add_step(&mut self, stage: Stage, action: Action, detail: impl Into<String>, line: impl Into<String>) {
        let step = JourneyStep {
            stage,
            action,
            detail: detail.into(),
            timestamp_ms: self.started_at.elapsed().as_millis() as u64,
        };
        debug!("🗺️ {} +{}ms [{}] {} {}", self.qname, step.timestamp_ms, step.stage, step.action, step.detail);
        self.steps.push(step);
        self.say(line);
    }

    pub fn steps(&self) -> &[JourneyStep] {
        &self.steps
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stages of the steps in order, one entry per step.
    pub fn stages(&self) -> Vec<Stage> {
        self.steps.iter().map(|s| s.stage).collect()
    }

    pub fn count(&self, action: Action) -> usize {
        self.steps.iter().filter(|s| s.action == action).count()
    }
}
