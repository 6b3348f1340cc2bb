//! Conversion orchestrator.
//!
//! Per job: dispatch on the extension, acquire a verified working directory,
//! stage the upload, run the direction's strategy chain (office tool first,
//! then the format-specific fallback), read the result, clean up.
//!
//! State machine:
//! `Uploaded → DirectoryAcquired → Converting(primary) → Done`
//! `                             ↘ Converting(fallback) → Done | Failed`

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::config::ConverterConfig;
use crate::pipeline::extraction::ExtractionChain;
use crate::pipeline::format::{header_safe_file_name, output_file_name, Direction};
use crate::pipeline::layout::LayoutStrategy;
use crate::pipeline::office::{OfficeStrategy, PROFILE_DIR_NAME};
use crate::pipeline::reconstruct::ReconstructionStrategy;
use crate::pipeline::strategy::{run_chain, Attempt, ConversionStrategy, Payload};
use crate::pipeline::workdir::{
    default_candidates, resolve, EnvSnapshot, OsFs, ScratchFs, WorkdirError, WorkingDirectory,
};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// One conversion request. Owned by the orchestrator for its whole lifetime.
#[derive(Debug)]
pub struct ConversionJob {
    pub id: Uuid,
    pub original_name: String,
    pub direction: Direction,
    /// Uploaded bytes.
    pub source: Vec<u8>,
    /// Staged copy of `source`, only for on-disk jobs.
    pub input_path: Option<PathBuf>,
    pub workdir: WorkingDirectory,
}

impl ConversionJob {
    pub fn new(
        original_name: impl Into<String>,
        direction: Direction,
        source: Vec<u8>,
        workdir: WorkingDirectory,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_name: original_name.into(),
            direction,
            source,
            input_path: None,
            workdir,
        }
    }

    /// Name of the staged input inside the job directory (no path separators).
    fn staged_name(&self) -> String {
        header_safe_file_name(&self.original_name)
    }

    /// Write the upload into the job directory. No-op for in-memory jobs.
    pub fn stage(&mut self) -> io::Result<()> {
        if let Some(dir) = self.workdir.path() {
            let path = dir.join(self.staged_name());
            std::fs::write(&path, &self.source)?;
            self.input_path = Some(path);
        }
        Ok(())
    }

    /// Where fallback strategies write their result: `<staged stem>.<target ext>`,
    /// the same name the office tool produces.
    pub fn output_path(&self) -> Option<PathBuf> {
        let dir = self.workdir.path()?;
        Some(dir.join(output_file_name(&self.staged_name(), self.direction)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Uploaded,
    DirectoryAcquired,
    Converting { stage: Stage, strategy: &'static str },
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uploaded => write!(f, "uploaded"),
            Self::DirectoryAcquired => write!(f, "directory_acquired"),
            Self::Converting { stage: Stage::Primary, strategy } => write!(f, "converting(primary:{strategy})"),
            Self::Converting { stage: Stage::Fallback, strategy } => write!(f, "converting(fallback:{strategy})"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The converted document, read fully into memory.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    /// Strategy that produced the file.
    pub strategy: &'static str,
    pub degraded: bool,
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Unsupported file format: {0}. Accepted formats: .doc, .docx, .pdf")]
    UnsupportedFormat(String),

    #[error(transparent)]
    NoWritableLocation(#[from] WorkdirError),

    #[error("Could not stage the uploaded file: {0}")]
    Staging(io::Error),

    #[error("Conversion failed: {last_cause}")]
    Exhausted {
        attempts: Vec<Attempt>,
        last_cause: String,
    },

    #[error("Converted file could not be read: {0}")]
    ReadFailure(String),
}

// ═══════════════════════════════════════════════════════════
// Converter
// ═══════════════════════════════════════════════════════════

/// Runs conversion jobs. Holds no per-job state; share it behind an `Arc`.
pub struct Converter {
    config: ConverterConfig,
    fs: Arc<dyn ScratchFs>,
    env: EnvSnapshot,
    word_to_pdf: Vec<Box<dyn ConversionStrategy>>,
    pdf_to_word: Vec<Box<dyn ConversionStrategy>>,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        Self::with_environment(config, Arc::new(OsFs), EnvSnapshot::capture())
    }

    /// Same as `new` with an injected filesystem and environment.
    pub fn with_environment(config: ConverterConfig, fs: Arc<dyn ScratchFs>, env: EnvSnapshot) -> Self {
        let word_to_pdf: Vec<Box<dyn ConversionStrategy>> = vec![
            Box::new(OfficeStrategy::new(config.office.clone())),
            Box::new(LayoutStrategy::new(config.layout.clone())),
        ];
        let pdf_to_word: Vec<Box<dyn ConversionStrategy>> = vec![
            Box::new(OfficeStrategy::new(config.office.clone())),
            Box::new(ReconstructionStrategy::new(
                ExtractionChain::default(),
                config.heading_rules.clone(),
            )),
        ];
        Self {
            config,
            fs,
            env,
            word_to_pdf,
            pdf_to_word,
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Whether the office executable is currently locatable.
    pub fn office_available(&self) -> bool {
        OfficeStrategy::new(self.config.office.clone()).locate().is_some()
    }

    fn chain(&self, direction: Direction) -> &[Box<dyn ConversionStrategy>] {
        match direction {
            Direction::WordToPdf => &self.word_to_pdf,
            Direction::PdfToWord => &self.pdf_to_word,
        }
    }

    /// Convert one uploaded document. Blocking; call from a blocking context.
    pub fn convert(&self, original_name: &str, source: Vec<u8>) -> Result<ConversionResult, ConversionError> {
        let direction = Direction::from_file_name(original_name)
            .ok_or_else(|| ConversionError::UnsupportedFormat(original_name.to_string()))?;

        let job_id = Uuid::new_v4();
        log_state(job_id, &JobState::Uploaded);
        tracing::info!(
            job_id = %job_id,
            file_name = %original_name,
            direction = %direction,
            size = source.len(),
            "Conversion job started"
        );

        let candidates = default_candidates(&self.config, &self.env);
        let workdir = match resolve(&candidates, self.fs.as_ref(), &self.env) {
            Ok(workdir) => workdir,
            Err(e) => {
                log_state(job_id, &JobState::Failed);
                tracing::error!(job_id = %job_id, error = %e, "Conversion job failed");
                return Err(e.into());
            }
        };

        let mut job = ConversionJob::new(original_name, direction, source, workdir);
        job.id = job_id;

        if let Err(e) = job.stage() {
            cleanup(&job, None);
            log_state(job.id, &JobState::Failed);
            return Err(ConversionError::Staging(e));
        }
        log_state(job.id, &JobState::DirectoryAcquired);
        tracing::debug!(job_id = %job.id, in_memory = job.workdir.is_in_memory(), "Working directory ready");

        let result = self.run(&job);
        let produced = result.as_ref().ok().and_then(|(payload, ..)| match payload {
            Payload::File(path) => Some(path.clone()),
            Payload::Bytes(_) => None,
        });

        let outcome = result.and_then(|(payload, strategy, degraded)| {
            let bytes = read_payload(payload)?;
            Ok(ConversionResult {
                file_name: output_file_name(&job.original_name, direction),
                mime_type: direction.target_mime(),
                bytes,
                strategy,
                degraded,
            })
        });

        cleanup(&job, produced.as_deref());

        match &outcome {
            Ok(res) => {
                log_state(job.id, &JobState::Done);
                tracing::info!(
                    job_id = %job.id,
                    strategy = res.strategy,
                    degraded = res.degraded,
                    size = res.bytes.len(),
                    "Conversion job finished"
                );
            }
            Err(e) => {
                log_state(job.id, &JobState::Failed);
                tracing::error!(job_id = %job.id, error = %e, "Conversion job failed");
            }
        }
        outcome
    }

    fn run(&self, job: &ConversionJob) -> Result<(Payload, &'static str, bool), ConversionError> {
        let output = run_chain(self.chain(job.direction), job, |strategy| {
            let stage = if strategy.is_primary() {
                Stage::Primary
            } else {
                Stage::Fallback
            };
            log_state(
                job.id,
                &JobState::Converting {
                    stage,
                    strategy: strategy.name(),
                },
            );
        })
        .map_err(|exhausted| ConversionError::Exhausted {
            last_cause: exhausted.last_cause().to_string(),
            attempts: exhausted.attempts,
        })?;

        Ok((output.payload, output.strategy, output.degraded))
    }
}

fn log_state(job_id: Uuid, state: &JobState) {
    tracing::info!(job_id = %job_id, state = %state, "Job state");
}

/// Read the result into memory. A zero-byte result is never returned.
fn read_payload(payload: Payload) -> Result<Vec<u8>, ConversionError> {
    let bytes = match payload {
        Payload::File(path) => std::fs::read(&path)
            .map_err(|e| ConversionError::ReadFailure(format!("{}: {e}", path.display())))?,
        Payload::Bytes(bytes) => bytes,
    };
    if bytes.is_empty() {
        return Err(ConversionError::ReadFailure("converted file is empty".into()));
    }
    Ok(bytes)
}

// ═══════════════════════════════════════════════════════════
// Cleanup
// ═══════════════════════════════════════════════════════════

/// Best-effort removal of every job artifact, then the job directory itself.
/// Failures are logged, never returned. Safe to call more than once.
pub fn cleanup(job: &ConversionJob, produced: Option<&Path>) {
    let Some(dir) = job.workdir.path() else {
        return;
    };

    let mut files: Vec<PathBuf> = Vec::new();
    files.extend(job.input_path.clone());
    files.extend(job.output_path());
    files.extend(produced.map(Path::to_path_buf));
    files.dedup();

    for file in &files {
        if let Err(e) = remove_file_if_exists(file) {
            tracing::warn!(job_id = %job.id, path = %file.display(), error = %e, "Could not delete job file");
        }
    }

    let profile = dir.join(PROFILE_DIR_NAME);
    if profile.exists() {
        if let Err(e) = std::fs::remove_dir_all(&profile) {
            tracing::warn!(job_id = %job.id, path = %profile.display(), error = %e, "Could not delete office profile");
        }
    }

    match std::fs::remove_dir(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(job_id = %job.id, path = %dir.display(), error = %e, "Job directory not removed");
        }
    }
}

/// Delete a file, treating "already gone" as success.
fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
