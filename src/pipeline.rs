//! The runner: extract → transform → load → snapshot → publish.
//!
//! Stages hand their output to the next one directly. Extract and transform
//! cannot fail; load, snapshot and publish are wrapped in [`RetryStep`] with
//! the configured retry budget, and a step that exhausts it ends the run
//! before any later step starts.

use crate::config::PipelineConfig;
use crate::errors::{RunFailure, StepError};
use crate::models::{Record, RunReport};
use crate::outputs::csv::write_records;
use crate::outputs::report::write_report;
use crate::retry::{RetryStep, Step};
use crate::scrapers::{build_client, extract};
use crate::transform::transform;
use crate::versioning::{PublishOutcome, publish, snapshot};
use chrono::{Local, Utc};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Writes the filtered records to the output CSV.
struct LoadStep<'a> {
    records: Option<&'a [Record]>,
    path: &'a Path,
}

impl Step for LoadStep<'_> {
    type Output = Option<PathBuf>;

    fn name(&self) -> &'static str {
        "load"
    }

    async fn run(&self) -> Result<Self::Output, StepError> {
        Ok(write_records(self.records, self.path)?)
    }
}

struct SnapshotStep<'a> {
    config: &'a PipelineConfig,
}

impl Step for SnapshotStep<'_> {
    type Output = ();

    fn name(&self) -> &'static str {
        "snapshot"
    }

    async fn run(&self) -> Result<(), StepError> {
        snapshot(self.config).await
    }
}

struct PublishStep<'a> {
    config: &'a PipelineConfig,
}

impl Step for PublishStep<'_> {
    type Output = PublishOutcome;

    fn name(&self) -> &'static str {
        "publish"
    }

    async fn run(&self) -> Result<PublishOutcome, StepError> {
        publish(self.config).await
    }
}

/// Wrap `step` with the configured retry policy.
fn with_retries<T: Step>(config: &PipelineConfig, step: T) -> RetryStep<T> {
    RetryStep::new(step, config.schedule.retries, config.schedule.retry_delay())
}

/// Execute every step once, in order.
///
/// On failure the returned [`RunFailure`] still carries the report filled in
/// up to the failing step, with `error` set.
#[instrument(level = "info", skip_all)]
pub async fn run_once(config: &PipelineConfig) -> Result<RunReport, RunFailure> {
    let t0 = Instant::now();
    let mut report = RunReport {
        started_at: Utc::now().to_rfc3339(),
        ..Default::default()
    };
    info!(started_at = %report.started_at, "Pipeline run starting");

    let outcome = run_steps(config, &mut report).await;
    report.elapsed_ms = t0.elapsed().as_millis();

    match outcome {
        Ok(()) => {
            info!(
                extracted = report.extracted,
                kept = report.kept,
                elapsed_ms = report.elapsed_ms,
                "Pipeline run complete"
            );
            Ok(report)
        }
        Err(error) => {
            report.error = Some(error.to_string());
            Err(RunFailure { report, error })
        }
    }
}

async fn run_steps(config: &PipelineConfig, report: &mut RunReport) -> Result<(), StepError> {
    let client = build_client(config).map_err(StepError::Client)?;

    let extraction = extract(config, &client).await;
    report.extracted = extraction.records.len();
    report.sources = extraction.sources;

    let records = transform(Some(extraction.records));
    report.kept = records.len();

    let load = with_retries(
        config,
        LoadStep {
            records: Some(records.as_slice()),
            path: &config.output_path,
        },
    );
    let Some(written) = load.run().await? else {
        warn!("Nothing was written; skipping snapshot and publish");
        return Ok(());
    };
    report.output_path = Some(written.display().to_string());

    if config.snapshot.enabled {
        with_retries(config, SnapshotStep { config }).run().await?;
        report.snapshot_ran = true;
    } else {
        info!("Snapshot disabled");
    }

    if config.publish.enabled {
        let outcome = with_retries(config, PublishStep { config }).run().await?;
        report.publish_ran = true;
        report.committed = outcome.committed;
    } else {
        info!("Publish disabled");
    }

    Ok(())
}

/// Run on the configured interval until interrupted with Ctrl-C.
pub async fn run_forever(config: &PipelineConfig, report_path: Option<&Path>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for Ctrl-C; scheduler will run until killed");
            std::future::pending::<()>().await;
        }
    };
    run_until(config, report_path, ctrl_c).await;
}

/// Run on the configured interval until `shutdown` completes, returning the
/// number of runs that finished.
///
/// `shutdown` is watched both while a run is in progress and while waiting
/// for the next one; a run it interrupts is abandoned. A failed run is logged
/// and does not stop the loop. The next run starts one interval after the
/// previous one started. When `report_path` is set, the report of every
/// finished run, failed or not, is written there.
#[instrument(level = "info", skip_all, fields(interval_secs = config.schedule.interval_secs))]
pub async fn run_until<F>(config: &PipelineConfig, report_path: Option<&Path>, shutdown: F) -> usize
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut finished = 0;

    loop {
        let started = Instant::now();
        let outcome = tokio::select! {
            outcome = run_once(config) => outcome,
            _ = &mut shutdown => {
                info!("Interrupted during a run; stopping scheduler");
                return finished;
            }
        };
        finished += 1;

        let report = match outcome {
            Ok(report) => {
                info!(kept = report.kept, "Scheduled run succeeded");
                report
            }
            Err(failure) => {
                error!(error = %failure, "Scheduled run failed");
                failure.report
            }
        };
        if let Some(path) = report_path
            && let Err(e) = write_report(path, &report).await
        {
            error!(error = %e, path = %path.display(), "Failed to write run report");
        }

        let wait = config.schedule.interval().saturating_sub(started.elapsed());
        let next = chrono::Duration::from_std(wait)
            .map(|d| (Local::now() + d).to_rfc3339())
            .unwrap_or_default();
        info!(%next, "Waiting for next run");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = &mut shutdown => {
                info!("Interrupted; stopping scheduler");
                return finished;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::csv::read_records;
    use std::time::Duration;
    use tempfile::TempDir;

    fn article(title: &str, description: Option<&str>) -> String {
        let meta = description
            .map(|d| format!(r#"<meta name="description" content="{d}">"#))
            .unwrap_or_default();
        format!("<html><head><title>{title}</title>{meta}</head></html>")
    }

    fn local_config(dir: &TempDir, sources: Vec<String>) -> PipelineConfig {
        let mut config = PipelineConfig {
            sources,
            output_path: dir.path().join("out/output.csv"),
            worker_pool_size: 4,
            request_timeout_secs: 5,
            ..Default::default()
        };
        config.snapshot.enabled = false;
        config.publish.enabled = false;
        config.schedule.retry_delay_secs = 0;
        config
    }

    #[tokio::test]
    async fn test_run_once_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();

        server
            .mock("GET", "/")
            .with_body(r#"<a href="/keep">k</a><a href="/no-desc">n</a><a href="/bare">b</a><a href="/keep2">k2</a>"#)
            .create_async()
            .await;
        server
            .mock("GET", "/keep")
            .with_body(article("Kept", Some("first")))
            .create_async()
            .await;
        server
            .mock("GET", "/no-desc")
            .with_body(article("No description", None))
            .create_async()
            .await;
        server
            .mock("GET", "/bare")
            .with_body("<html></html>")
            .create_async()
            .await;
        server
            .mock("GET", "/keep2")
            .with_body(article("Kept too", Some("second")))
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let config = local_config(&dir, vec![format!("{base}/"), "http://127.0.0.1:1/".to_string()]);

        let report = run_once(&config).await.unwrap();
        assert_eq!(report.extracted, 4);
        assert_eq!(report.kept, 2);
        assert!(report.sources[1].source_failed);
        assert!(!report.snapshot_ran);
        assert!(!report.publish_ran);

        let rows = read_records(&config.output_path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].id, rows[0].title.as_str()), (1, "Kept"));
        assert_eq!((rows[1].id, rows[1].title.as_str()), (4, "Kept too"));
        assert_eq!(rows[1].href, format!("{base}/keep2"));
    }

    #[tokio::test]
    async fn test_run_once_all_sources_down_writes_empty_file() {
        let dir = TempDir::new().unwrap();
        let config = local_config(&dir, vec!["http://127.0.0.1:1/".to_string()]);

        let report = run_once(&config).await.unwrap();
        assert_eq!(report.kept, 0);
        assert_eq!(std::fs::read_to_string(&config.output_path).unwrap(), "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_snapshot_fails_run_after_retries() {
        let dir = TempDir::new().unwrap();
        let mut config = local_config(&dir, vec!["http://127.0.0.1:1/".to_string()]);
        config.snapshot.enabled = true;
        config.snapshot.program = "false".to_string();
        config.publish.enabled = true;
        config.publish.program = dir.path().join("never-run-git").display().to_string();

        let failure = run_once(&config).await.unwrap_err();
        match &failure.error {
            StepError::Command { program, args, .. } => {
                assert_eq!(program, "false");
                assert_eq!(args, "add output.csv");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(failure.report.output_path.is_some());
        assert!(!failure.report.snapshot_ran);
        assert!(!failure.report.publish_ran);
        assert_eq!(failure.report.error, Some(failure.error.to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_once_records_publish_commit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let git = dir.path().join("git");
        std::fs::write(&git, "#!/bin/sh\nif [ \"$1\" = diff ]; then exit 1; fi\n").unwrap();
        std::fs::set_permissions(&git, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = local_config(&dir, vec!["http://127.0.0.1:1/".to_string()]);
        config.publish.enabled = true;
        config.publish.program = git.display().to_string();
        config.publish.repo_dir = Some(dir.path().to_path_buf());

        let report = run_once(&config).await.unwrap();
        assert!(report.publish_ran);
        assert!(report.committed);
        assert_eq!(report.error, None);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_run_in_progress() {
        // Accepts connections into the backlog but never answers, so the
        // homepage request hangs until the client timeout.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let dir = TempDir::new().unwrap();
        let mut config = local_config(&dir, vec![format!("http://{addr}/")]);
        config.request_timeout_secs = 60;
        let report_path = dir.path().join("report.json");

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = tx.send(());
        });
        let shutdown = async {
            let _ = rx.await;
        };

        let finished = tokio::time::timeout(
            Duration::from_secs(10),
            run_until(&config, Some(&report_path), shutdown),
        )
        .await
        .expect("scheduler kept running after shutdown");

        assert_eq!(finished, 0);
        assert!(!report_path.exists());
        assert!(!config.output_path.exists());
        drop(listener);
    }

    #[tokio::test]
    async fn test_shutdown_while_waiting_writes_report_of_each_run() {
        let dir = TempDir::new().unwrap();
        let mut config = local_config(&dir, vec!["http://127.0.0.1:1/".to_string()]);
        config.schedule.interval_secs = 3600;
        let report_path = dir.path().join("reports/last.json");

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let shutdown = async {
            let _ = rx.await;
        };
        let watcher = {
            let report_path = report_path.clone();
            async move {
                while !report_path.exists() {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                let _ = tx.send(());
            }
        };

        let (finished, ()) = tokio::time::timeout(
            Duration::from_secs(10),
            futures::future::join(run_until(&config, Some(&report_path), shutdown), watcher),
        )
        .await
        .expect("scheduler did not stop while waiting");

        assert_eq!(finished, 1);
        let report: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(report.kept, 0);
        assert!(report.sources[0].source_failed);
        assert_eq!(report.error, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_scheduled_run_still_writes_report() {
        let dir = TempDir::new().unwrap();
        let mut config = local_config(&dir, vec!["http://127.0.0.1:1/".to_string()]);
        config.snapshot.enabled = true;
        config.snapshot.program = "false".to_string();
        config.schedule.retries = 0;
        config.schedule.interval_secs = 3600;
        let report_path = dir.path().join("report.json");

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let shutdown = async {
            let _ = rx.await;
        };
        let watcher = {
            let report_path = report_path.clone();
            async move {
                while !report_path.exists() {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                let _ = tx.send(());
            }
        };

        let (finished, ()) = tokio::time::timeout(
            Duration::from_secs(10),
            futures::future::join(run_until(&config, Some(&report_path), shutdown), watcher),
        )
        .await
        .expect("scheduler did not stop while waiting");

        assert_eq!(finished, 1);
        let report: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert!(!report.snapshot_ran);
        assert!(report.error.unwrap().contains("`false add output.csv`"));
    }
}
