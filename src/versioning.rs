//! Snapshot and publish steps: DVC registration and git push of the output.
//!
//! Both steps shell out to external tools and stop at the first failing
//! command. A command that cannot be started, or exits non-zero, becomes a
//! [`StepError`] carrying the program, its arguments and trimmed stderr.
//!
//! | Step | Directory | Commands |
//! |------|-----------|----------|
//! | snapshot | output file's directory | `dvc add <file>`, `dvc commit <file> -f`, `dvc push` |
//! | publish | repository directory | `git add <files>`, `git diff --staged --quiet`, `git commit -m <msg>` (only if staged), `git push -u <remote> <branch>` |

use crate::config::PipelineConfig;
use crate::errors::StepError;
use crate::utils::truncate_for_log;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Fluent builder for one external command.
#[derive(Debug, Default, Clone)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.cwd = Some(path.into());
        self
    }

    fn joined_args(&self) -> String {
        self.args.join(" ")
    }

    /// Run to completion and capture output, whatever the exit status.
    async fn output(&self) -> Result<Output, StepError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        debug!(program = %self.program, args = %self.joined_args(), cwd = ?self.cwd, "Running command");
        cmd.output().await.map_err(|source| StepError::Spawn {
            program: self.program.clone(),
            args: self.joined_args(),
            source,
        })
    }

    /// Run and return the exit code (`None` if killed by a signal).
    pub async fn status_code(&self) -> Result<Option<i32>, StepError> {
        Ok(self.output().await?.status.code())
    }

    /// Run and fail unless the command exits successfully.
    pub async fn run(&self) -> Result<(), StepError> {
        let output = self.output().await?;
        if !output.status.success() {
            return Err(self.failure(&output));
        }
        Ok(())
    }

    fn failure(&self, output: &Output) -> StepError {
        StepError::Command {
            program: self.program.clone(),
            args: self.joined_args(),
            code: output.status.code(),
            stderr: truncate_for_log(String::from_utf8_lossy(&output.stderr).trim(), 500),
        }
    }
}

/// Register the output file with DVC and push it to remote storage.
#[instrument(level = "info", skip_all, fields(dir = %config.output_dir().display()))]
pub async fn snapshot(config: &PipelineConfig) -> Result<(), StepError> {
    let dir = config.output_dir();
    let file = config.output_file_name();
    let dvc = || Cmd::new(config.snapshot.program.as_str()).cwd(dir.as_path());

    dvc().args(["add", file.as_str()]).run().await?;
    dvc().args(["commit", file.as_str(), "-f"]).run().await?;
    dvc().arg("push").run().await?;

    info!(%file, "Output snapshot pushed");
    Ok(())
}

/// What the publish step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOutcome {
    /// `false` when nothing was staged and the commit was skipped.
    pub committed: bool,
}

/// Stage the DVC tracking files, commit if anything changed, and push.
#[instrument(level = "info", skip_all, fields(repo = %config.repo_dir().display()))]
pub async fn publish(config: &PipelineConfig) -> Result<PublishOutcome, StepError> {
    let repo = config.repo_dir();
    let program = config.publish.program.as_str();
    let git = || Cmd::new(program).cwd(repo.as_path());

    git()
        .arg("add")
        .args(config.tracked_files())
        .run()
        .await?;

    let diff = git().args(["diff", "--staged", "--quiet"]);
    let committed = match diff.status_code().await? {
        Some(0) => {
            info!("Nothing staged; skipping commit");
            false
        }
        Some(1) => {
            git()
                .args(["commit", "-m"])
                .arg(config.publish.commit_message.clone())
                .run()
                .await?;
            true
        }
        code => {
            return Err(StepError::Command {
                program: program.to_string(),
                args: "diff --staged --quiet".to_string(),
                code,
                stderr: String::new(),
            });
        }
    };

    git()
        .args(["push", "-u"])
        .arg(config.publish.remote.clone())
        .arg(config.publish.branch.clone())
        .run()
        .await?;

    info!(committed, remote = %config.publish.remote, branch = %config.publish.branch, "Published tracking files");
    Ok(PublishOutcome { committed })
}
