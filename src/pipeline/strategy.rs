//! Conversion strategies and the ordered fallback runner.
//!
//! Every way of producing an output document implements `ConversionStrategy`
//! and reports a tagged `StrategyOutcome`. A job's fallback chain is a plain
//! ordered list; `run_chain` tries each entry at most once and stops at the
//! first verified success.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::pipeline::orchestrator::ConversionJob;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Where a strategy left its result.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A file inside the job's working directory.
    File(PathBuf),
    /// Bytes only (in-memory jobs).
    Bytes(Vec<u8>),
}

/// What a successful strategy produced.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub payload: Payload,
    /// Name of the strategy that produced it.
    pub strategy: &'static str,
    /// True when a lower-fidelity path produced the content.
    pub degraded: bool,
}

impl ConversionOutput {
    /// Existence and non-zero size check. Runs before any success is reported.
    pub fn verify(&self) -> Result<(), StrategyFailure> {
        match &self.payload {
            Payload::File(path) => {
                let meta = std::fs::metadata(path)
                    .map_err(|_| StrategyFailure::OutputMissing(path.display().to_string()))?;
                if !meta.is_file() {
                    return Err(StrategyFailure::OutputMissing(path.display().to_string()));
                }
                if meta.len() == 0 {
                    return Err(StrategyFailure::OutputEmpty(path.display().to_string()));
                }
                Ok(())
            }
            Payload::Bytes(bytes) if bytes.is_empty() => {
                Err(StrategyFailure::OutputEmpty("in-memory payload".into()))
            }
            Payload::Bytes(_) => Ok(()),
        }
    }

    /// Package rendered bytes: a file in the job directory when there is one,
    /// otherwise an in-memory payload.
    pub fn emit(
        job: &ConversionJob,
        bytes: Vec<u8>,
        strategy: &'static str,
        degraded: bool,
    ) -> Result<Self, StrategyFailure> {
        let payload = match job.output_path() {
            Some(path) => {
                std::fs::write(&path, &bytes)?;
                Payload::File(path)
            }
            None => Payload::Bytes(bytes),
        };
        Ok(Self {
            payload,
            strategy,
            degraded,
        })
    }
}

#[derive(Error, Debug)]
pub enum StrategyFailure {
    #[error("Conversion tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("Conversion tool failed: {0}")]
    ToolFailed(String),

    #[error("Output file missing: {0}")]
    OutputMissing(String),

    #[error("Output file is empty: {0}")]
    OutputEmpty(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Document rendering failed: {0}")]
    Render(String),

    #[error("Strategy panicked: {0}")]
    Panicked(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tagged result of one strategy attempt.
#[derive(Debug)]
pub enum StrategyOutcome {
    Success(ConversionOutput),
    Fail(StrategyFailure),
}

impl From<Result<ConversionOutput, StrategyFailure>> for StrategyOutcome {
    fn from(result: Result<ConversionOutput, StrategyFailure>) -> Self {
        match result {
            Ok(output) => Self::Success(output),
            Err(failure) => Self::Fail(failure),
        }
    }
}

/// One way of turning a job's input into an output document.
pub trait ConversionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Primary strategies are tried first; everything after is a fallback.
    fn is_primary(&self) -> bool {
        false
    }

    fn run(&self, job: &ConversionJob) -> StrategyOutcome;
}

/// One failed attempt, as kept for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub strategy: &'static str,
    pub cause: String,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.cause)
    }
}

/// Every strategy in the chain failed.
#[derive(Debug, Clone)]
pub struct ChainExhausted {
    pub attempts: Vec<Attempt>,
}

impl ChainExhausted {
    /// Cause of the last attempt, which is what the user sees.
    pub fn last_cause(&self) -> &str {
        self.attempts
            .last()
            .map(|a| a.cause.as_str())
            .unwrap_or("no conversion strategy configured")
    }
}

// ═══════════════════════════════════════════════════════════
// Runner
// ═══════════════════════════════════════════════════════════

/// Try `strategies` in order, each at most once.
///
/// `on_attempt` is called before each strategy runs so the caller can track
/// job state. A panic inside a strategy becomes a `Panicked` failure.
pub fn run_chain<F>(
    strategies: &[Box<dyn ConversionStrategy>],
    job: &ConversionJob,
    mut on_attempt: F,
) -> Result<ConversionOutput, ChainExhausted>
where
    F: FnMut(&dyn ConversionStrategy),
{
    let mut attempts = Vec::with_capacity(strategies.len());

    for strategy in strategies {
        on_attempt(strategy.as_ref());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| strategy.run(job)))
            .unwrap_or_else(|panic| StrategyOutcome::Fail(StrategyFailure::Panicked(panic_message(&panic))));

        let failure = match outcome {
            StrategyOutcome::Success(output) => match output.verify() {
                Ok(()) => {
                    tracing::info!(
                        job_id = %job.id,
                        strategy = strategy.name(),
                        degraded = output.degraded,
                        "Strategy succeeded"
                    );
                    return Ok(output);
                }
                Err(failure) => failure,
            },
            StrategyOutcome::Fail(failure) => failure,
        };

        tracing::warn!(
            job_id = %job.id,
            strategy = strategy.name(),
            error = %failure,
            "Strategy failed, trying next"
        );
        attempts.push(Attempt {
            strategy: strategy.name(),
            cause: failure.to_string(),
        });
    }

    Err(ChainExhausted { attempts })
}

pub(crate) fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into())
}
