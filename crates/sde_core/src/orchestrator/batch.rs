//! Batch runner: state machine and per-file job sequencing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::ValidatedSettings;
use crate::discovery;
use crate::executor::{self, ExecOutcome};
use crate::logging::{JobLogger, LogCallback, LogConfig};
use crate::models::{BatchReport, BatchState, JobResult, SourceFile};
use crate::plan::build_plan;
use crate::probe::{self, ProbeError};

use super::BatchError;

/// Callback receiving each pushed log line from any job.
pub type LineCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback receiving each job result as it completes.
///
/// Completion order may differ from report order when concurrency is
/// enabled; the report itself is always in discovery order.
pub type ResultCallback = Box<dyn Fn(&JobResult) + Send + Sync>;

/// Handle for cancelling a running batch.
///
/// Cancellation is cooperative at job boundaries; the in-flight encode
/// process is additionally killed by the executor.
#[derive(Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create an un-cancelled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Runs one batch over a root directory.
///
/// Single-use: `run` moves the state machine Idle → Running →
/// (Completed | Cancelled), and terminal states do not transition
/// further. A new batch requires a new runner (and so a fresh report).
pub struct BatchRunner {
    /// Root directory to scan; also anchors output and log folders.
    root: PathBuf,
    /// Validated settings for every job in the batch.
    settings: ValidatedSettings,
    /// Current lifecycle state.
    state: BatchState,
    /// Shared cancellation flag.
    cancel: CancelHandle,
    /// Optional push sink for job log lines.
    line_callback: Option<LineCallback>,
    /// Optional push sink for completed job results.
    result_callback: Option<ResultCallback>,
}

impl BatchRunner {
    /// Create a runner in the Idle state.
    pub fn new(root: impl Into<PathBuf>, settings: ValidatedSettings) -> Self {
        Self {
            root: root.into(),
            settings,
            state: BatchState::Idle,
            cancel: CancelHandle::new(),
            line_callback: None,
            result_callback: None,
        }
    }

    /// Attach a push sink for job log lines.
    pub fn with_line_callback(mut self, callback: LineCallback) -> Self {
        self.line_callback = Some(callback);
        self
    }

    /// Attach a push sink for completed job results.
    pub fn with_result_callback(mut self, callback: ResultCallback) -> Self {
        self.result_callback = Some(callback);
        self
    }

    /// Get a handle that can cancel this batch from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Run the batch to a terminal state.
    ///
    /// Discovery failures abort before any job and are the only errors
    /// this returns besides reuse of a non-Idle runner. Everything that
    /// goes wrong per file lands in the report instead. An empty
    /// discovery result completes immediately with an empty report.
    pub fn run(&mut self) -> Result<BatchReport, BatchError> {
        if self.state != BatchState::Idle {
            return Err(BatchError::NotIdle { state: self.state });
        }

        let subfolder = self.settings.settings().output.subfolder.clone();
        let files = discovery::scan(&self.root, &subfolder)?;

        let mut report = BatchReport::new();

        if files.is_empty() {
            tracing::info!("no eligible files under {}", self.root.display());
            self.state = BatchState::Completed;
            report.finalize();
            return Ok(report);
        }

        self.state = BatchState::Running;
        let log_dir = self
            .root
            .join(&self.settings.settings().logging.logs_folder);

        let max_jobs = self
            .settings
            .settings()
            .execution
            .max_concurrent_jobs
            .clamp(1, files.len());

        if max_jobs == 1 {
            self.run_sequential(&files, &log_dir, &mut report);
        } else {
            self.run_pooled(&files, &log_dir, max_jobs, &mut report);
        }

        self.state = if self.cancel.is_cancelled() {
            BatchState::Cancelled
        } else {
            BatchState::Completed
        };
        report.finalize();

        let summary = report.summary();
        tracing::info!(
            "batch {}: {} succeeded, {} skipped, {} failed of {} attempted",
            self.state,
            summary.succeeded,
            summary.skipped,
            summary.failed,
            summary.total
        );

        Ok(report)
    }

    /// Default scheduling: one job at a time, in discovery order.
    fn run_sequential(&self, files: &[SourceFile], log_dir: &Path, report: &mut BatchReport) {
        for (i, file) in files.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!("batch cancelled at file {}/{}", i + 1, files.len());
                break;
            }

            tracing::info!("processing file {}/{}: {}", i + 1, files.len(), file.file_name());

            match self.process_file(file, log_dir) {
                Some(result) => {
                    self.notify(&result);
                    report.push(result);
                }
                // In-flight job terminated by cancellation: no entry.
                None => break,
            }
        }
    }

    /// Bounded worker pool. Results land in per-file slots and are
    /// appended in discovery order whatever the completion order was.
    fn run_pooled(
        &self,
        files: &[SourceFile],
        log_dir: &Path,
        max_jobs: usize,
        report: &mut BatchReport,
    ) {
        let next = AtomicUsize::new(0);
        let slots: Vec<Mutex<Option<JobResult>>> =
            files.iter().map(|_| Mutex::new(None)).collect();

        std::thread::scope(|scope| {
            for _ in 0..max_jobs {
                scope.spawn(|| loop {
                    if self.cancel.is_cancelled() {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    if index >= files.len() {
                        break;
                    }
                    if let Some(result) = self.process_file(&files[index], log_dir) {
                        self.notify(&result);
                        *slots[index].lock() = Some(result);
                    }
                });
            }
        });

        for slot in slots {
            if let Some(result) = slot.into_inner() {
                report.push(result);
            }
        }
    }

    /// Probe → plan → execute for one file, converting every error into
    /// a JobResult at this boundary. `None` means the job was cut short
    /// by cancellation and contributes no report entry.
    fn process_file(&self, file: &SourceFile, log_dir: &Path) -> Option<JobResult> {
        let settings = self.settings.settings();

        let logger = match JobLogger::new(
            file.stem(),
            log_dir,
            LogConfig::from(&settings.logging),
            self.job_log_callback(),
        ) {
            Ok(logger) => logger,
            Err(e) => {
                return Some(JobResult::failed(
                    file.path.clone(),
                    format!("failed to create job log: {}", e),
                ));
            }
        };

        logger.info(&format!("processing {}", file.file_name()));

        let audio = match probe::probe(&settings.execution.ffprobe_path, &file.path) {
            Ok(info) => info,
            Err(ProbeError::NoAudioStream(_)) => {
                logger.warn("no audio stream, skipping");
                return Some(JobResult::skipped(file.path.clone(), "no audio stream"));
            }
            Err(e) => {
                logger.error(&format!("probe failed: {}", e));
                return Some(JobResult::failed(
                    file.path.clone(),
                    format!("probe failed: {}", e),
                ));
            }
        };

        logger.info(&format!("audio stream: {}", audio.describe()));

        let plan = build_plan(file, &audio, &self.settings, &self.root);

        match executor::run(&plan, &self.settings, &logger, &self.cancel) {
            ExecOutcome::Completed(result) => Some(result),
            ExecOutcome::Cancelled => None,
        }
    }

    /// Wrap the shared line callback for one job's logger.
    fn job_log_callback(&self) -> Option<LogCallback> {
        self.line_callback.as_ref().map(|callback| {
            let callback = Arc::clone(callback);
            Box::new(move |line: &str| callback(line)) as LogCallback
        })
    }

    /// Push a completed result to the observability sink.
    fn notify(&self, result: &JobResult) {
        if let Some(ref callback) = self.result_callback {
            callback(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{validate, Settings};
    use crate::models::JobOutcome;
    use std::fs;
    use tempfile::tempdir;

    #[cfg(unix)]
    mod stub_tools {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::{Path, PathBuf};

        /// Write an executable shell stub into `dir`.
        pub fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            let mut perms = fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).unwrap();
            path
        }

        /// Stand-in probe: reports a stereo aac stream, except for files
        /// whose name contains "noaudio", which get an empty stream list.
        pub fn fake_ffprobe(dir: &Path) -> PathBuf {
            write_stub(
                dir,
                "fake-ffprobe",
                r#"case "$@" in
  *noaudio*) echo '{"streams":[]}' ;;
  *) echo '{"streams":[{"codec_name":"aac","bit_rate":"192000","channels":2,"sample_rate":"48000"}],"format":{"duration":"10.0"}}' ;;
esac"#,
            )
        }

        /// Stand-in encoder: writes a byte to its final argument.
        pub fn fake_ffmpeg(dir: &Path) -> PathBuf {
            write_stub(
                dir,
                "fake-ffmpeg",
                r#"for last in "$@"; do :; done
echo encoded > "$last""#,
            )
        }

        /// Stand-in encoder that always fails.
        pub fn broken_ffmpeg(dir: &Path) -> PathBuf {
            write_stub(dir, "broken-ffmpeg", "echo 'simulated encode error' >&2\nexit 1")
        }
    }

    fn touch(path: &Path) {
        fs::write(path, b"stub").unwrap();
    }

    #[cfg(unix)]
    fn stubbed_settings(tool_dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.execution.ffprobe_path = stub_tools::fake_ffprobe(tool_dir)
            .to_string_lossy()
            .to_string();
        settings.execution.ffmpeg_path = stub_tools::fake_ffmpeg(tool_dir)
            .to_string_lossy()
            .to_string();
        settings
    }

    #[test]
    fn empty_directory_completes_with_empty_report() {
        let dir = tempdir().unwrap();
        let settings = validate(Settings::default()).unwrap();
        let mut runner = BatchRunner::new(dir.path(), settings);

        let report = runner.run().unwrap();

        assert_eq!(runner.state(), BatchState::Completed);
        assert!(report.results.is_empty());
        assert!(report.is_finalized());
    }

    #[test]
    fn missing_root_is_fatal_before_any_job() {
        let settings = validate(Settings::default()).unwrap();
        let mut runner = BatchRunner::new("/nonexistent/video/root", settings);

        assert!(matches!(runner.run(), Err(BatchError::Discovery(_))));
        assert_eq!(runner.state(), BatchState::Idle);
    }

    #[test]
    fn runner_is_single_use() {
        let dir = tempdir().unwrap();
        let settings = validate(Settings::default()).unwrap();
        let mut runner = BatchRunner::new(dir.path(), settings);

        runner.run().unwrap();
        assert!(matches!(runner.run(), Err(BatchError::NotIdle { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn mixed_batch_isolates_the_bad_file() {
        let dir = tempdir().unwrap();
        let tools = tempdir().unwrap();

        touch(&dir.path().join("a.mkv"));
        touch(&dir.path().join("b.mkv"));
        touch(&dir.path().join("c_noaudio.mkv"));
        touch(&dir.path().join("d.mkv"));
        touch(&dir.path().join("e.mkv"));

        let settings = validate(stubbed_settings(tools.path())).unwrap();
        let mut runner = BatchRunner::new(dir.path(), settings);
        let report = runner.run().unwrap();

        assert_eq!(runner.state(), BatchState::Completed);
        assert_eq!(report.results.len(), 5);

        // Discovery order is sorted order.
        let names: Vec<String> = report
            .results
            .iter()
            .map(|r| r.input_path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.mkv", "b.mkv", "c_noaudio.mkv", "d.mkv", "e.mkv"]);

        let summary = report.summary();
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(report.results[2].outcome, JobOutcome::Skipped);

        // Outputs landed under the subfolder.
        assert!(dir.path().join("processed/a_enhanced.mkv").exists());
        assert!(!dir.path().join("processed/c_noaudio_enhanced.mkv").exists());
    }

    #[test]
    #[cfg(unix)]
    fn encode_failure_does_not_abort_the_batch() {
        let dir = tempdir().unwrap();
        let tools = tempdir().unwrap();

        touch(&dir.path().join("a.mkv"));
        touch(&dir.path().join("b.mkv"));

        let mut settings = stubbed_settings(tools.path());
        settings.execution.ffmpeg_path = stub_tools::broken_ffmpeg(tools.path())
            .to_string_lossy()
            .to_string();

        let settings = validate(settings).unwrap();
        let mut runner = BatchRunner::new(dir.path(), settings);
        let report = runner.run().unwrap();

        assert_eq!(report.results.len(), 2);
        assert!(report
            .results
            .iter()
            .all(|r| r.outcome == JobOutcome::Failed));
        assert!(report.results[0].detail.contains("exit code 1"));
    }

    #[test]
    #[cfg(unix)]
    fn cancel_after_first_result_leaves_one_entry() {
        let dir = tempdir().unwrap();
        let tools = tempdir().unwrap();

        touch(&dir.path().join("a.mkv"));
        touch(&dir.path().join("b.mkv"));
        touch(&dir.path().join("c.mkv"));

        let settings = validate(stubbed_settings(tools.path())).unwrap();
        let mut runner = BatchRunner::new(dir.path(), settings);

        let handle = runner.cancel_handle();
        runner = runner.with_result_callback(Box::new(move |_| handle.cancel()));

        let report = runner.run().unwrap();

        assert_eq!(runner.state(), BatchState::Cancelled);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].outcome, JobOutcome::Success);
    }

    #[test]
    #[cfg(unix)]
    fn cancelled_before_start_attempts_nothing() {
        let dir = tempdir().unwrap();
        let tools = tempdir().unwrap();
        touch(&dir.path().join("a.mkv"));

        let settings = validate(stubbed_settings(tools.path())).unwrap();
        let mut runner = BatchRunner::new(dir.path(), settings);
        runner.cancel_handle().cancel();

        let report = runner.run().unwrap();

        assert_eq!(runner.state(), BatchState::Cancelled);
        assert!(report.results.is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn pooled_batch_reports_in_discovery_order() {
        let dir = tempdir().unwrap();
        let tools = tempdir().unwrap();

        touch(&dir.path().join("a.mkv"));
        touch(&dir.path().join("b.mkv"));
        touch(&dir.path().join("c.mkv"));

        let mut settings = stubbed_settings(tools.path());
        settings.execution.max_concurrent_jobs = 2;

        let settings = validate(settings).unwrap();
        let mut runner = BatchRunner::new(dir.path(), settings);
        let report = runner.run().unwrap();

        assert_eq!(report.results.len(), 3);
        let names: Vec<String> = report
            .results
            .iter()
            .map(|r| r.input_path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.mkv", "b.mkv", "c.mkv"]);
        assert_eq!(report.summary().succeeded, 3);
    }

    #[test]
    #[cfg(unix)]
    fn line_callback_receives_pushed_log_lines() {
        use std::sync::atomic::AtomicUsize;

        let dir = tempdir().unwrap();
        let tools = tempdir().unwrap();
        touch(&dir.path().join("a.mkv"));

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let settings = validate(stubbed_settings(tools.path())).unwrap();
        let mut runner = BatchRunner::new(dir.path(), settings).with_line_callback(Arc::new(
            move |_line: &str| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            },
        ));

        runner.run().unwrap();
        assert!(count.load(Ordering::SeqCst) > 0);
    }
}
