//! Handoff to the external high-resolution engine.
//!
//! The engine is a prebuilt program driven only through files: the canonical
//! recipe is written into its runtime directory, the program is started with
//! the recipe path as its last argument, and on success it leaves a rendered
//! STL next to the recipe. This module runs that contract and classifies how a
//! run ended; retrying is left to the caller.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use mesh_kernel::{Solid, Tolerance};
use recipe_types::CanonicalRecipe;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::canonical::save_recipe;
use crate::errors::{EngineFailure, LoadError};
use crate::stl::read_stl;

/// Windows `STATUS_ACCESS_VIOLATION`, seen as 3221225477 unsigned or
/// -1073741819 signed.
pub const ACCESS_VIOLATION: u32 = 0xC000_0005;

/// Stderr lines that mark a native crash even when the exit code does not.
pub const CRASH_SIGNATURES: [&str; 2] = ["Access Violation", "Segmentation fault"];

const SIGSEGV: i32 = 11;
#[cfg(target_os = "linux")]
const SIGBUS: i32 = 7;
#[cfg(not(target_os = "linux"))]
const SIGBUS: i32 = 10;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Where and how to run the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Working directory of the engine; recipe and artifact live here.
    pub runtime_dir: PathBuf,
    pub recipe_file: String,
    /// The artifact the engine must produce.
    pub output_file: String,
    /// Receives the engine's stderr.
    pub log_file: String,
    pub program: String,
    /// Arguments placed before the recipe path.
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            runtime_dir: PathBuf::from("picogk_runner"),
            recipe_file: "recipe_run.json".to_string(),
            output_file: "render.stl".to_string(),
            log_file: "engine_stderr.log".to_string(),
            program: "dotnet".to_string(),
            args: vec!["run".to_string(), "--".to_string()],
            timeout_ms: 120_000,
        }
    }
}

impl EngineConfig {
    /// Run `program args...` inside `runtime_dir`.
    pub fn with_command(
        runtime_dir: impl Into<PathBuf>,
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            runtime_dir: runtime_dir.into(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn recipe_path(&self) -> PathBuf {
        self.runtime_dir.join(&self.recipe_file)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.runtime_dir.join(&self.output_file)
    }

    pub fn log_path(&self) -> PathBuf {
        self.runtime_dir.join(&self.log_file)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// A successful engine run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineRun {
    pub recipe_path: PathBuf,
    pub artifact_path: PathBuf,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

impl EngineRun {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished - self.started
    }

    /// Read the rendered artifact back as a solid.
    pub fn load_artifact(&self, tolerance: &Tolerance) -> Result<Solid, LoadError> {
        read_stl(&self.artifact_path, tolerance)
    }
}

/// Write `recipe`, run the engine on it, and wait for the artifact.
///
/// A run that outlives the configured timeout is killed. Any stale artifact
/// from an earlier run is removed first so it cannot be mistaken for output.
#[instrument(skip_all, fields(program = %config.program, steps = recipe.steps.len()))]
pub fn run_engine(config: &EngineConfig, recipe: &CanonicalRecipe) -> Result<EngineRun, EngineFailure> {
    fs::create_dir_all(&config.runtime_dir)
        .map_err(|e| EngineFailure::io(&config.runtime_dir, &e))?;

    let recipe_path = config.recipe_path();
    save_recipe(&recipe_path, recipe).map_err(|e| EngineFailure::Io {
        path: recipe_path.clone(),
        reason: e.to_string(),
    })?;

    let artifact_path = config.artifact_path();
    match fs::remove_file(&artifact_path) {
        Ok(()) => debug!(path = %artifact_path.display(), "removed stale artifact"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(EngineFailure::io(&artifact_path, &e)),
    }

    let log_path = config.log_path();
    let log = File::create(&log_path).map_err(|e| EngineFailure::io(&log_path, &e))?;

    let started = Utc::now();
    // The child runs inside the runtime directory, so it gets the bare name.
    let mut child = Command::new(&config.program)
        .args(&config.args)
        .arg(&config.recipe_file)
        .current_dir(&config.runtime_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(log))
        .spawn()
        .map_err(|e| EngineFailure::Launch {
            program: config.program.clone(),
            reason: e.to_string(),
        })?;
    info!(pid = child.id(), "engine started");

    let deadline = Instant::now() + config.timeout();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                warn!(timeout_ms = config.timeout_ms, "engine timed out, killing it");
                if let Err(e) = child.kill() {
                    warn!(error = %e, "failed to kill engine");
                }
                if let Err(e) = child.wait() {
                    warn!(error = %e, "failed to reap engine");
                }
                return Err(EngineFailure::Timeout {
                    after_ms: config.timeout_ms,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(EngineFailure::io(&config.runtime_dir, &e)),
        }
    };
    let finished = Utc::now();

    let stderr = read_log(&log_path);
    classify_exit(status.code(), exit_signal(&status), &stderr)?;

    if !artifact_path.is_file() {
        return Err(EngineFailure::MissingArtifact {
            path: artifact_path,
        });
    }

    let run = EngineRun {
        recipe_path,
        artifact_path,
        started,
        finished,
    };
    info!(elapsed_ms = run.elapsed().num_milliseconds(), "engine finished");
    Ok(run)
}

/// Sort an exit into success or a failure category.
///
/// Exit code 0 is success regardless of stderr. Otherwise a native memory
/// fault is recognized by the Windows access-violation code, a SIGSEGV or
/// SIGBUS termination, or a crash signature in stderr.
pub fn classify_exit(code: Option<i32>, signal: Option<i32>, stderr: &str) -> Result<(), EngineFailure> {
    if code == Some(0) {
        return Ok(());
    }

    let fault_code = code.is_some_and(|c| c as u32 == ACCESS_VIOLATION);
    let fault_signal = signal.is_some_and(|s| s == SIGSEGV || s == SIGBUS);
    let fault_text = CRASH_SIGNATURES.iter().any(|sig| stderr.contains(sig));

    if fault_code || fault_signal || fault_text {
        warn!(?code, ?signal, "engine crashed with a native memory fault");
        Err(EngineFailure::NativeMemoryFault { code, signal })
    } else {
        warn!(?code, ?signal, "engine failed");
        Err(EngineFailure::NonZeroExit { code, signal })
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

fn read_log(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read engine log");
            String::new()
        }
    }
}
