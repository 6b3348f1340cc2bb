//! External office-suite strategy (headless LibreOffice).
//!
//! Highest-fidelity path for both directions. A missing executable is an
//! expected `ToolUnavailable`, distinct from `ToolFailed` (found but the run
//! errored or timed out).

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use crate::config::OfficeConfig;
use crate::pipeline::format::Direction;
use crate::pipeline::orchestrator::ConversionJob;
use crate::pipeline::strategy::{
    ConversionOutput, ConversionStrategy, Payload, StrategyFailure, StrategyOutcome,
};

pub const OFFICE_STRATEGY: &str = "libreoffice";

/// Executable names probed on `PATH`, in order.
const EXECUTABLE_NAMES: [&str; 2] = ["libreoffice", "soffice"];

/// Per-job office profile, removed during cleanup.
pub const PROFILE_DIR_NAME: &str = ".office-profile";

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const SCAN_LIMIT: usize = 256;

pub struct OfficeStrategy {
    config: OfficeConfig,
}

impl OfficeStrategy {
    pub fn new(config: OfficeConfig) -> Self {
        Self { config }
    }

    /// Lightweight "locate the executable" probe. No process is spawned.
    pub fn locate(&self) -> Option<PathBuf> {
        if self.config.disabled {
            return None;
        }
        match &self.config.binary {
            Some(bin) => is_executable(bin).then(|| bin.clone()),
            None => find_on_path(&EXECUTABLE_NAMES),
        }
    }

    fn convert(&self, job: &ConversionJob) -> Result<ConversionOutput, StrategyFailure> {
        if self.config.disabled {
            return Err(StrategyFailure::ToolUnavailable("disabled by configuration".into()));
        }
        let Some(outdir) = job.workdir.path() else {
            return Err(StrategyFailure::ToolUnavailable(
                "no on-disk working directory".into(),
            ));
        };
        let Some(executable) = self.locate() else {
            return Err(StrategyFailure::ToolUnavailable(
                "libreoffice/soffice not found".into(),
            ));
        };
        let input = job
            .input_path
            .as_deref()
            .ok_or_else(|| StrategyFailure::ToolFailed("input was not staged to disk".into()))?;
        match std::fs::metadata(input) {
            Ok(meta) if meta.len() > 0 => {}
            _ => {
                return Err(StrategyFailure::ToolFailed(format!(
                    "input file missing or empty: {}",
                    input.display()
                )))
            }
        }

        let profile = outdir.join(PROFILE_DIR_NAME);
        std::fs::create_dir_all(&profile)?;
        let stderr_log = profile.join("stderr.log");

        let mut command = Command::new(&executable);
        command
            .args(office_args(job.direction, outdir, &profile, input))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(File::create(&stderr_log).map(Stdio::from).unwrap_or_else(|_| Stdio::null()));
        // The launcher forks its worker; a fresh group lets a timeout reach both.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        tracing::info!(
            job_id = %job.id,
            executable = %executable.display(),
            direction = %job.direction,
            "Running office conversion"
        );

        let mut child = command
            .spawn()
            .map_err(|e| StrategyFailure::ToolFailed(format!("could not start {}: {e}", executable.display())))?;

        let deadline = Instant::now() + self.config.timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    kill_tree(&mut child);
                    tracing::warn!(job_id = %job.id, pid = child.id(), "Office conversion timed out, process group killed");
                    return Err(StrategyFailure::ToolFailed(format!(
                        "timed out after {}s",
                        self.config.timeout.as_secs_f32()
                    )));
                }
                None => std::thread::sleep(POLL_INTERVAL),
            }
        };

        if !status.success() {
            let detail = std::fs::read_to_string(&stderr_log)
                .map(|s| tail(&s, 400))
                .unwrap_or_default();
            return Err(StrategyFailure::ToolFailed(format!("exited with {status} {detail}").trim_end().to_string()));
        }

        let produced = locate_output(outdir, input, job.direction.target_extension())?;
        let output = ConversionOutput {
            payload: Payload::File(produced),
            strategy: OFFICE_STRATEGY,
            degraded: false,
        };
        output.verify()?;
        Ok(output)
    }
}

impl ConversionStrategy for OfficeStrategy {
    fn name(&self) -> &'static str {
        OFFICE_STRATEGY
    }

    fn is_primary(&self) -> bool {
        true
    }

    fn run(&self, job: &ConversionJob) -> StrategyOutcome {
        self.convert(job).into()
    }
}

/// Batch command line: headless, private profile, target format, output dir.
pub fn office_args(direction: Direction, outdir: &Path, profile: &Path, input: &Path) -> Vec<String> {
    let mut args = vec![
        format!("-env:UserInstallation={}", file_url(profile)),
        "--headless".to_string(),
    ];
    if direction == Direction::PdfToWord {
        args.push("--infilter=writer_pdf_import".to_string());
    }
    args.push("--convert-to".to_string());
    args.push(direction.target_extension().to_string());
    args.push("--outdir".to_string());
    args.push(outdir.display().to_string());
    args.push(input.display().to_string());
    args
}

/// The tool names its output `<input stem>.<ext>`; when that is absent,
/// scan the directory for any other file with the target extension.
fn locate_output(outdir: &Path, input: &Path, ext: &str) -> Result<PathBuf, StrategyFailure> {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let expected = outdir.join(format!("{stem}.{ext}"));
    if expected.is_file() {
        return Ok(expected);
    }

    let mut found: Vec<PathBuf> = std::fs::read_dir(outdir)?
        .take(SCAN_LIMIT)
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p != input)
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        })
        .collect();
    found.sort();

    match found.into_iter().next() {
        Some(path) => {
            tracing::warn!(
                expected = %expected.display(),
                found = %path.display(),
                "Office output had an unexpected name"
            );
            Ok(path)
        }
        None => Err(StrategyFailure::OutputMissing(expected.display().to_string())),
    }
}

/// Kill the tool's whole process group, then reap the direct child.
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: the group was created for this child by `process_group(0)` and
    // the unreaped leader keeps its id from being reused.
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
        let _ = child.kill();
    }
    let _ = child.wait();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    let dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();
    names
        .iter()
        .flat_map(|name| dirs.iter().map(move |dir| dir.join(name)))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn file_url(path: &Path) -> String {
    let raw = path.display().to_string().replace('\\', "/").replace(' ', "%20");
    if raw.starts_with('/') {
        format!("file://{raw}")
    } else {
        format!("file:///{raw}")
    }
}

fn tail(s: &str, max_chars: usize) -> String {
    let trimmed = s.trim();
    let count = trimmed.chars().count();
    trimmed.chars().skip(count.saturating_sub(max_chars)).collect()
}
