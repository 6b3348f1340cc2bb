//! Working-directory resolver.
//!
//! Finds a scratch directory that is *actually* writable by walking an
//! ordered list of candidate descriptors and probing each one with a real
//! create + write + delete. Permission bits are never trusted on their own:
//! container sandboxes and read-only mounts routinely report writable modes
//! for directories that reject writes.
//!
//! Resolution is a pure function of (candidates, filesystem, environment
//! snapshot). Nothing here touches process-wide state, so tests inject a fake
//! `ScratchFs` and a hand-built `EnvSnapshot`.
//!
//! Default candidate order:
//! 1. operator-configured base directory (`DOCSHIFT_TEMP_DIR`)
//! 2. `<process cwd>/temp-files`
//! 3. OS scratch locations (`/tmp`, `/var/tmp`, `~/.tmp`, OS temp, `/run/user/<uid>`, `/dev/shm`)
//! 4. in-memory sentinel (no filesystem at all, when allowed)
//! 5. privileged remediation of the shared temp root (root only)

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::{ConverterConfig, PROCESS_SCRATCH_FOLDER, SCRATCH_FOLDER};

/// Name of the throwaway file used to verify writability.
pub const PROBE_FILE_NAME: &str = ".docshift-probe";
const PROBE_PAYLOAD: &[u8] = b"docshift write probe";

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Where a job may put its files.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkingDirectory {
    /// A verified-writable per-job directory.
    OnDisk(ScratchDir),
    /// No writable location was found; callers must stay in byte buffers.
    InMemory,
}

impl WorkingDirectory {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::OnDisk(dir) => Some(&dir.path),
            Self::InMemory => None,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, Self::InMemory)
    }
}

/// A per-job directory that passed the write probe at acquisition time.
///
/// Liveness is checked once; there is no periodic re-check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScratchDir {
    pub path: PathBuf,
    /// Label of the candidate that produced it.
    pub candidate: String,
    pub verified_at: DateTime<Utc>,
}

/// How a candidate is turned into a working directory.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbePolicy {
    /// Create `<root>/job-…`, probe it.
    Probe,
    /// Hand out the in-memory sentinel. Always succeeds.
    InMemory,
    /// Force permissions on `root`'s parent and `root`, then probe. Root only.
    Remediate,
}

/// One entry in the prioritized cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub label: String,
    pub root: Option<PathBuf>,
    pub policy: ProbePolicy,
}

impl Candidate {
    pub fn probe(label: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            root: Some(root.into()),
            policy: ProbePolicy::Probe,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            label: "in-memory".into(),
            root: None,
            policy: ProbePolicy::InMemory,
        }
    }

    pub fn remediate(label: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            root: Some(root.into()),
            policy: ProbePolicy::Remediate,
        }
    }
}

/// Read-only view of the environment the resolver needs.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    pub user: Option<String>,
    pub uid: Option<u32>,
    pub cwd: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub temp: PathBuf,
}

impl EnvSnapshot {
    /// Capture the current process environment. Every value is optional.
    pub fn capture() -> Self {
        Self {
            user: current_user(),
            uid: effective_uid(),
            cwd: std::env::current_dir().ok(),
            home: dirs::home_dir(),
            temp: std::env::temp_dir(),
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.uid == Some(0)
    }
}

/// Failure of one candidate, kept for the aggregated diagnostic.
#[derive(Debug, Clone)]
pub struct CandidateFailure {
    pub label: String,
    pub path: Option<PathBuf>,
    pub cause: String,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(p) => write!(f, "{} ({}): {}", self.label, p.display(), self.cause),
            None => write!(f, "{}: {}", self.label, self.cause),
        }
    }
}

#[derive(Error, Debug)]
pub enum WorkdirError {
    #[error("Could not create a writable directory anywhere. Diagnostics: {diagnostics}")]
    NoWritableLocation {
        diagnostics: String,
        failures: Vec<CandidateFailure>,
    },
}

// ═══════════════════════════════════════════════════════════
// Filesystem seam
// ═══════════════════════════════════════════════════════════

/// Minimal filesystem surface used by the resolver (allows fakes in tests).
pub trait ScratchFs: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    /// Recursive create, tolerating "already exists". `mode` is a unix permission hint.
    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()>;
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl ScratchFs for OsFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        }
        #[cfg(not(unix))]
        {
            let _ = (path, mode);
            Ok(())
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Candidate list
// ═══════════════════════════════════════════════════════════

/// Build the default prioritized candidate list.
pub fn default_candidates(config: &ConverterConfig, env: &EnvSnapshot) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    if let Some(base) = &config.temp_base_dir {
        candidates.push(Candidate::probe("configured", base.clone()));
    }

    if let Some(cwd) = &env.cwd {
        candidates.push(Candidate::probe("process-dir", cwd.join(PROCESS_SCRATCH_FOLDER)));
    }

    let system: [(&str, Option<PathBuf>); 6] = [
        ("tmp", Some(PathBuf::from("/tmp").join(SCRATCH_FOLDER))),
        ("var-tmp", Some(PathBuf::from("/var/tmp").join(SCRATCH_FOLDER))),
        ("home", env.home.as_ref().map(|h| h.join(".tmp"))),
        ("os-tmp", Some(env.temp.clone())),
        (
            "run-user",
            env.uid
                .map(|uid| PathBuf::from(format!("/run/user/{uid}")).join(SCRATCH_FOLDER)),
        ),
        ("dev-shm", Some(PathBuf::from("/dev/shm").join(SCRATCH_FOLDER))),
    ];
    for (label, root) in system {
        if let Some(root) = root {
            candidates.push(Candidate::probe(label, root));
        }
    }

    if config.allow_in_memory {
        candidates.push(Candidate::in_memory());
    }

    candidates.push(Candidate::remediate(
        "emergency",
        env.temp.join(format!("{SCRATCH_FOLDER}-emergency")),
    ));

    candidates
}

// ═══════════════════════════════════════════════════════════
// Resolution
// ═══════════════════════════════════════════════════════════

/// Walk `candidates` in order and return the first verified location.
///
/// No single candidate failure is fatal; only exhaustion is.
pub fn resolve(
    candidates: &[Candidate],
    fs: &dyn ScratchFs,
    env: &EnvSnapshot,
) -> Result<WorkingDirectory, WorkdirError> {
    let mut failures = Vec::new();

    for candidate in candidates {
        let attempt = match candidate.policy {
            ProbePolicy::InMemory => {
                tracing::warn!("No writable directory found, falling back to in-memory conversion");
                return Ok(WorkingDirectory::InMemory);
            }
            ProbePolicy::Probe => match &candidate.root {
                Some(root) => try_probe(&candidate.label, root, fs),
                None => continue,
            },
            ProbePolicy::Remediate => match &candidate.root {
                Some(root) if env.is_privileged() => {
                    remediate(root, fs);
                    try_probe(&candidate.label, root, fs)
                }
                Some(_) => {
                    failures.push(CandidateFailure {
                        label: candidate.label.clone(),
                        path: candidate.root.clone(),
                        cause: "skipped: process is not privileged".into(),
                    });
                    continue;
                }
                None => continue,
            },
        };

        match attempt {
            Ok(dir) => {
                tracing::info!(
                    candidate = %candidate.label,
                    path = %dir.path.display(),
                    "Working directory acquired"
                );
                return Ok(WorkingDirectory::OnDisk(dir));
            }
            Err(e) => {
                let root = candidate.root.as_deref();
                tracing::warn!(
                    candidate = %candidate.label,
                    path = ?root.map(Path::display),
                    exists = root.map(|r| fs.exists(r)).unwrap_or(false),
                    parent_exists = root
                        .and_then(Path::parent)
                        .map(|p| fs.exists(p))
                        .unwrap_or(false),
                    error = %e,
                    "Working directory candidate rejected"
                );
                failures.push(CandidateFailure {
                    label: candidate.label.clone(),
                    path: candidate.root.clone(),
                    cause: e.to_string(),
                });
            }
        }
    }

    let diagnostics = diagnostics(env, &failures);
    tracing::error!(%diagnostics, "All working directory candidates exhausted");
    Err(WorkdirError::NoWritableLocation {
        diagnostics,
        failures,
    })
}

/// Ensure the root exists, create a unique job subdirectory, and probe it.
fn try_probe(label: &str, root: &Path, fs: &dyn ScratchFs) -> io::Result<ScratchDir> {
    if !fs.exists(root) {
        fs.create_dir_all(root, 0o777)?;
    }

    let dir = root.join(unique_job_name());
    fs.create_dir_all(&dir, 0o777)?;

    let probe = dir.join(PROBE_FILE_NAME);
    fs.write(&probe, PROBE_PAYLOAD)?;
    fs.remove_file(&probe)?;

    Ok(ScratchDir {
        path: std::path::absolute(&dir).unwrap_or(dir),
        candidate: label.to_string(),
        verified_at: Utc::now(),
    })
}

/// Best-effort permission repair. Every failure is swallowed.
fn remediate(root: &Path, fs: &dyn ScratchFs) {
    if let Some(shared) = root.parent() {
        if let Err(e) = fs.set_mode(shared, 0o1777) {
            tracing::debug!(path = %shared.display(), error = %e, "Could not force shared temp mode");
        }
    }
    if let Err(e) = fs.create_dir_all(root, 0o777) {
        tracing::debug!(path = %root.display(), error = %e, "Could not create emergency directory");
    }
    if let Err(e) = fs.set_mode(root, 0o777) {
        tracing::debug!(path = %root.display(), error = %e, "Could not open emergency directory mode");
    }
}

/// `job-<unix millis>-<random>`, unique across concurrent jobs.
pub fn unique_job_name() -> String {
    format!(
        "job-{}-{:08x}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>()
    )
}

fn diagnostics(env: &EnvSnapshot, failures: &[CandidateFailure]) -> String {
    let display = |p: &Option<PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "undefined".into())
    };

    let mut msg = format!(
        "user: {}, uid: {}, process dir: {}, HOME: {}, TEMP: {}",
        env.user.as_deref().unwrap_or("unknown"),
        env.uid
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".into()),
        display(&env.cwd),
        display(&env.home),
        env.temp.display(),
    );

    if !failures.is_empty() {
        msg.push_str("; attempts: ");
        let parts: Vec<String> = failures.iter().map(ToString::to_string).collect();
        msg.push_str(&parts.join("; "));
    }
    msg
}

// ═══════════════════════════════════════════════════════════
// Process identity
// ═══════════════════════════════════════════════════════════

fn current_user() -> Option<String> {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .or_else(|| {
            std::process::Command::new("whoami")
                .output()
                .ok()
                .filter(|o| o.status.success())
                .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Effective uid: `/proc/self` is owned by the process's effective user.
#[cfg(unix)]
fn effective_uid() -> Option<u32> {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata("/proc/self").ok().map(|m| m.uid())
}

#[cfg(not(unix))]
fn effective_uid() -> Option<u32> {
    None
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-memory filesystem that refuses writes under configured prefixes.
    #[derive(Default)]
    struct FakeFs {
        denied: Vec<PathBuf>,
        dirs: Mutex<HashSet<PathBuf>>,
        files: Mutex<HashSet<PathBuf>>,
        ops: Mutex<Vec<String>>,
    }

    impl FakeFs {
        fn denying(prefixes: &[&str]) -> Self {
            Self {
                denied: prefixes.iter().map(PathBuf::from).collect(),
                ..Default::default()
            }
        }

        fn check(&self, path: &Path) -> io::Result<()> {
            if self.denied.iter().any(|d| path.starts_with(d)) {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"))
            } else {
                Ok(())
            }
        }

        fn op_count(&self) -> usize {
            self.ops.lock().unwrap().len()
        }
    }

    impl ScratchFs for FakeFs {
        fn exists(&self, path: &Path) -> bool {
            self.dirs.lock().unwrap().contains(path) || self.files.lock().unwrap().contains(path)
        }

        fn create_dir_all(&self, path: &Path, _mode: u32) -> io::Result<()> {
            self.ops.lock().unwrap().push(format!("mkdir {}", path.display()));
            self.check(path)?;
            self.dirs.lock().unwrap().insert(path.to_path_buf());
            Ok(())
        }

        fn write(&self, path: &Path, _contents: &[u8]) -> io::Result<()> {
            self.ops.lock().unwrap().push(format!("write {}", path.display()));
            self.check(path)?;
            self.files.lock().unwrap().insert(path.to_path_buf());
            Ok(())
        }

        fn remove_file(&self, path: &Path) -> io::Result<()> {
            self.ops.lock().unwrap().push(format!("rm {}", path.display()));
            if self.files.lock().unwrap().remove(path) {
                Ok(())
            } else {
                Err(io::Error::new(io::ErrorKind::NotFound, "missing"))
            }
        }

        fn set_mode(&self, path: &Path, _mode: u32) -> io::Result<()> {
            self.ops.lock().unwrap().push(format!("chmod {}", path.display()));
            self.check(path)
        }
    }

    fn env() -> EnvSnapshot {
        EnvSnapshot {
            user: Some("converter".into()),
            uid: Some(1000),
            cwd: Some(PathBuf::from("/srv/app")),
            home: Some(PathBuf::from("/home/converter")),
            temp: PathBuf::from("/tmp"),
        }
    }

    fn config(base: Option<&str>, in_memory: bool) -> ConverterConfig {
        ConverterConfig {
            temp_base_dir: base.map(PathBuf::from),
            allow_in_memory: in_memory,
            ..Default::default()
        }
    }

    #[test]
    fn configured_base_wins_when_writable() {
        let fs = FakeFs::default();
        let candidates = default_candidates(&config(Some("/data/scratch"), true), &env());
        let wd = resolve(&candidates, &fs, &env()).unwrap();
        match wd {
            WorkingDirectory::OnDisk(dir) => {
                assert_eq!(dir.candidate, "configured");
                assert!(dir.path.starts_with("/data/scratch"));
                assert!(dir
                    .path
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .starts_with("job-"));
            }
            other => panic!("expected on-disk directory, got {other:?}"),
        }
    }

    #[test]
    fn unwritable_base_falls_through_to_process_dir() {
        let fs = FakeFs::denying(&["/data/scratch"]);
        let candidates = default_candidates(&config(Some("/data/scratch"), true), &env());
        let wd = resolve(&candidates, &fs, &env()).unwrap();
        let WorkingDirectory::OnDisk(dir) = wd else {
            panic!("expected on-disk directory");
        };
        assert_eq!(dir.candidate, "process-dir");
        assert!(dir.path.starts_with("/srv/app/temp-files"));
        // The probe file was written and deleted again
        let probe = dir.path.join(PROBE_FILE_NAME);
        assert!(!fs.exists(&probe));
        assert!(fs
            .ops
            .lock()
            .unwrap()
            .contains(&format!("write {}", probe.display())));
    }

    #[test]
    fn probe_write_failure_rejects_candidate_even_if_mkdir_works() {
        // mkdir succeeds but writing inside fails: permission bits lied
        struct ReadOnlyWrites(FakeFs);
        impl ScratchFs for ReadOnlyWrites {
            fn exists(&self, p: &Path) -> bool {
                self.0.exists(p)
            }
            fn create_dir_all(&self, p: &Path, m: u32) -> io::Result<()> {
                self.0.create_dir_all(p, m)
            }
            fn write(&self, p: &Path, c: &[u8]) -> io::Result<()> {
                if p.starts_with("/data") {
                    return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
                }
                self.0.write(p, c)
            }
            fn remove_file(&self, p: &Path) -> io::Result<()> {
                self.0.remove_file(p)
            }
            fn set_mode(&self, p: &Path, m: u32) -> io::Result<()> {
                self.0.set_mode(p, m)
            }
        }

        let fs = ReadOnlyWrites(FakeFs::default());
        let candidates = default_candidates(&config(Some("/data"), true), &env());
        let WorkingDirectory::OnDisk(dir) = resolve(&candidates, &fs, &env()).unwrap() else {
            panic!("expected on-disk directory");
        };
        assert_eq!(dir.candidate, "process-dir");
    }

    #[test]
    fn all_denied_without_memory_reports_user_and_cwd() {
        let fs = FakeFs::denying(&["/"]);
        let candidates = default_candidates(&config(Some("/data/scratch"), false), &env());
        let err = resolve(&candidates, &fs, &env()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("user: converter"), "{msg}");
        assert!(msg.contains("process dir: /srv/app"), "{msg}");
        assert!(msg.contains("HOME: /home/converter"), "{msg}");
        assert!(msg.contains("TEMP: /tmp"), "{msg}");
        let WorkdirError::NoWritableLocation { failures, .. } = err;
        // Every filesystem candidate left a trace, plus the skipped emergency step
        assert_eq!(failures.len(), 9);
        assert_eq!(failures.last().unwrap().label, "emergency");
    }

    #[test]
    fn all_denied_with_memory_returns_sentinel() {
        let fs = FakeFs::denying(&["/"]);
        let candidates = default_candidates(&config(None, true), &env());
        let wd = resolve(&candidates, &fs, &env()).unwrap();
        assert!(wd.is_in_memory());
        assert!(wd.path().is_none());
    }

    #[test]
    fn remediation_only_runs_when_privileged() {
        let fs = FakeFs::denying(&["/srv", "/var", "/home", "/run", "/dev", "/tmp/docshift"]);
        let mut root_env = env();
        root_env.uid = Some(0);

        // Without the bare /tmp candidate only the emergency step can succeed
        let filtered: Vec<Candidate> = default_candidates(&config(None, false), &root_env)
            .into_iter()
            .filter(|c| c.label != "os-tmp")
            .collect();

        let WorkingDirectory::OnDisk(dir) = resolve(&filtered, &fs, &root_env).unwrap() else {
            panic!("expected emergency directory");
        };
        assert_eq!(dir.candidate, "emergency");
        assert!(dir.path.starts_with("/tmp/docshift-emergency"));
        assert!(fs.ops.lock().unwrap().iter().any(|op| op == "chmod /tmp"));

        // Unprivileged: the same list is exhausted
        assert!(resolve(&filtered, &fs, &env()).is_err());
    }

    #[test]
    fn remediation_failures_are_swallowed() {
        let fs = FakeFs::denying(&["/"]);
        let mut root_env = env();
        root_env.uid = Some(0);
        let candidates = vec![Candidate::remediate("emergency", "/tmp/docshift-emergency")];
        let err = resolve(&candidates, &fs, &root_env).unwrap_err();
        assert!(err.to_string().contains("emergency"));
    }

    #[test]
    fn candidates_without_home_or_uid_are_skipped() {
        let mut bare = env();
        bare.home = None;
        bare.uid = None;
        bare.cwd = None;
        let labels: Vec<String> = default_candidates(&config(None, true), &bare)
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(labels, ["tmp", "var-tmp", "os-tmp", "dev-shm", "in-memory", "emergency"]);
    }

    #[test]
    fn default_order_matches_priority() {
        let labels: Vec<String> = default_candidates(&config(Some("/base"), true), &env())
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(
            labels,
            [
                "configured",
                "process-dir",
                "tmp",
                "var-tmp",
                "home",
                "os-tmp",
                "run-user",
                "dev-shm",
                "in-memory",
                "emergency"
            ]
        );
    }

    #[test]
    fn job_names_are_unique() {
        let names: HashSet<String> = (0..500).map(|_| unique_job_name()).collect();
        assert_eq!(names.len(), 500);
    }

    #[test]
    fn real_filesystem_probe_leaves_empty_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let candidates = vec![Candidate::probe("configured", tmp.path().join("base"))];
        let WorkingDirectory::OnDisk(dir) = resolve(&candidates, &OsFs, &env()).unwrap() else {
            panic!("expected on-disk directory");
        };
        assert!(dir.path.is_dir());
        assert!(dir.path.is_absolute());
        assert_eq!(std::fs::read_dir(&dir.path).unwrap().count(), 0);
    }

    #[test]
    fn real_filesystem_base_that_is_a_file_falls_through() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let candidates = vec![
            Candidate::probe("configured", blocker.clone()),
            Candidate::probe("process-dir", tmp.path().join("temp-files")),
        ];
        let WorkingDirectory::OnDisk(dir) = resolve(&candidates, &OsFs, &env()).unwrap() else {
            panic!("expected on-disk directory");
        };
        assert_eq!(dir.candidate, "process-dir");
        assert_eq!(std::fs::read_dir(&dir.path).unwrap().count(), 0);
    }

    #[test]
    fn fake_fs_records_no_ops_for_memory_only_list() {
        let fs = FakeFs::default();
        let wd = resolve(&[Candidate::in_memory()], &fs, &env()).unwrap();
        assert!(wd.is_in_memory());
        assert_eq!(fs.op_count(), 0);
    }
}
