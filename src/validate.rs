//! Terraform validation pipeline
//!
//! Materializes the draft as `main.tf` in the shared working directory, runs
//! `terraform init` and then `terraform validate`, and reports a verdict.
//! The verdict message is opaque diagnostic text passed through unchanged so
//! the user (and the correction prompt) see the compiler's own error format.

use crate::util::{run_command_with_timeout, CancelFlag, CommandRun};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Fixed source file name inside the working directory.
pub const SOURCE_FILE: &str = "main.tf";

/// Lock file guarding the working directory against concurrent validations.
const LOCK_FILE: &str = ".terranaut.lock";

/// Outcome of one validation attempt. Meaningful only against the exact
/// draft content that was validated.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub succeeded: bool,
    pub message: String,
    pub ran_at: DateTime<Utc>,
}

impl Verdict {
    fn success(message: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            message: message.into(),
            ran_at: Utc::now(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            message: message.into(),
            ran_at: Utc::now(),
        }
    }
}

/// Two concurrent validations against one directory race on file contents
/// and on terraform's own lock files, so the directory is exclusively
/// locked for the whole init+validate sequence.
struct WorkdirLock {
    file: fs::File,
}

impl WorkdirLock {
    fn acquire(workdir: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(workdir.join(LOCK_FILE))
            .with_context(|| format!("Failed to open lock file in {}", workdir.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock {}", workdir.display()))?;
        Ok(Self { file })
    }
}

impl Drop for WorkdirLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

fn describe_interrupted(run: &CommandRun, step: &str, timeout: Duration) -> Option<Verdict> {
    if run.cancelled {
        return Some(Verdict::failure(format!("`terraform {}` was cancelled.", step)));
    }
    if run.timed_out {
        return Some(Verdict::failure(format!(
            "`terraform {}` timed out after {}s. Raise the validation timeout if the step legitimately needs longer.",
            step,
            timeout.as_secs()
        )));
    }
    None
}

/// Validate `source` with the given terraform executable.
///
/// Strictly ordered: write the file, `init`, then `validate`. A failed init
/// skips validate entirely, because validate results against a broken
/// initialize state are meaningless.
pub fn validate(
    source: &str,
    workdir: &Path,
    terraform: &Path,
    timeout: Duration,
    cancel: &CancelFlag,
) -> Result<Verdict> {
    fs::create_dir_all(workdir)
        .with_context(|| format!("Failed to create working directory {}", workdir.display()))?;

    let _lock = WorkdirLock::acquire(workdir)?;

    fs::write(workdir.join(SOURCE_FILE), source)
        .with_context(|| format!("Failed to write {} in {}", SOURCE_FILE, workdir.display()))?;

    // init downloads provider plugins; it needs the same bound as validate
    // so a stuck network fetch cannot hang the session.
    let mut init_cmd = Command::new(terraform);
    init_cmd.args(["init", "-no-color", "-upgrade"]).current_dir(workdir);
    let init_run = run_command_with_timeout(&mut init_cmd, timeout, cancel)?;

    if let Some(verdict) = describe_interrupted(&init_run, "init", timeout) {
        return Ok(verdict);
    }
    if !init_run.success() {
        return Ok(Verdict::failure(format!(
            "initialize failed:\n{}",
            init_run.stderr
        )));
    }

    let mut validate_cmd = Command::new(terraform);
    validate_cmd.args(["validate", "-no-color"]).current_dir(workdir);
    let validate_run = run_command_with_timeout(&mut validate_cmd, timeout, cancel)?;

    if let Some(verdict) = describe_interrupted(&validate_run, "validate", timeout) {
        return Ok(verdict);
    }
    if validate_run.success() {
        Ok(Verdict::success(
            "Validation successful: the configuration is valid.",
        ))
    } else {
        Ok(Verdict::failure(validate_run.stderr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Install a fake terraform script that logs each subcommand to
    /// `calls.log` and behaves per the embedded case arms.
    #[cfg(unix)]
    fn fake_terraform(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("terraform");
        let script = format!(
            "#!/bin/sh\necho \"$1\" >> \"$(dirname \"$0\")/calls.log\"\n{}\n",
            body
        );
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    fn calls(dir: &Path) -> Vec<String> {
        fs::read_to_string(dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn test_success_runs_init_then_validate() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = fake_terraform(tmp.path(), "exit 0");
        let workdir = tmp.path().join("work");

        let verdict = validate(
            "resource \"null_resource\" \"a\" {}",
            &workdir,
            &tool,
            Duration::from_secs(5),
            &CancelFlag::new(),
        )
        .unwrap();

        assert!(verdict.succeeded);
        assert_eq!(calls(tmp.path()), vec!["init", "validate"]);
        let written = fs::read_to_string(workdir.join(SOURCE_FILE)).unwrap();
        assert_eq!(written, "resource \"null_resource\" \"a\" {}");
    }

    #[cfg(unix)]
    #[test]
    fn test_init_failure_skips_validate() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = fake_terraform(
            tmp.path(),
            "if [ \"$1\" = init ]; then echo 'network unreachable' >&2; exit 1; fi\nexit 0",
        );
        let workdir = tmp.path().join("work");

        let verdict = validate(
            "{}",
            &workdir,
            &tool,
            Duration::from_secs(5),
            &CancelFlag::new(),
        )
        .unwrap();

        assert!(!verdict.succeeded);
        assert!(verdict.message.starts_with("initialize failed:"));
        assert!(verdict.message.contains("network unreachable"));
        assert_eq!(calls(tmp.path()), vec!["init"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_failure_passes_stderr_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = fake_terraform(
            tmp.path(),
            "if [ \"$1\" = validate ]; then printf 'Error: Unsupported block type\\n' >&2; exit 1; fi\nexit 0",
        );
        let workdir = tmp.path().join("work");

        let verdict = validate(
            "bogus {}",
            &workdir,
            &tool,
            Duration::from_secs(5),
            &CancelFlag::new(),
        )
        .unwrap();

        assert!(!verdict.succeeded);
        assert_eq!(verdict.message, "Error: Unsupported block type\n");
        // init ran (and its side effect is observable) before validate
        assert_eq!(calls(tmp.path()), vec!["init", "validate"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_source_file_overwritten_each_run() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = fake_terraform(tmp.path(), "exit 0");
        let workdir = tmp.path().join("work");

        validate("first", &workdir, &tool, Duration::from_secs(5), &CancelFlag::new()).unwrap();
        validate("second", &workdir, &tool, Duration::from_secs(5), &CancelFlag::new()).unwrap();

        let written = fs::read_to_string(workdir.join(SOURCE_FILE)).unwrap();
        assert_eq!(written, "second");
    }

    #[cfg(unix)]
    #[test]
    fn test_stuck_init_times_out() {
        let tmp = tempfile::tempdir().unwrap();
        // exec so the kill reaches the sleeping process itself
        let tool = fake_terraform(tmp.path(), "exec sleep 30");
        let workdir = tmp.path().join("work");

        let verdict = validate(
            "{}",
            &workdir,
            &tool,
            Duration::from_millis(200),
            &CancelFlag::new(),
        )
        .unwrap();

        assert!(!verdict.succeeded);
        assert!(verdict.message.contains("timed out"));
        assert_eq!(calls(tmp.path()), vec!["init"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_cancelled_before_start() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = fake_terraform(tmp.path(), "exec sleep 30");
        let workdir = tmp.path().join("work");
        let cancel = CancelFlag::new();
        cancel.cancel();

        let verdict = validate("{}", &workdir, &tool, Duration::from_secs(30), &cancel).unwrap();

        assert!(!verdict.succeeded);
        assert!(verdict.message.contains("cancelled"));
    }
}
