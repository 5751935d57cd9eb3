//! Encode job execution.
//!
//! Invokes the external encode engine with a built plan: video stream
//! copied untouched, audio re-encoded through the filter graph, all
//! processing threads available to the engine. Tool output is streamed
//! line-by-line into the job logger (never buffered whole), progress
//! ticks are scaled against the probed duration, and the outcome is
//! classified from the exit status plus the state of the output file.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};

use crate::config::ValidatedSettings;
use crate::logging::JobLogger;
use crate::models::{EncodePlan, JobResult};
use crate::orchestrator::CancelHandle;

/// Result of attempting one encode.
#[derive(Debug)]
pub enum ExecOutcome {
    /// The job ran to a classification; Skipped and Failed included.
    Completed(JobResult),
    /// The job was terminated by batch cancellation before finishing.
    /// It contributes no report entry.
    Cancelled,
}

/// Execute one encode plan.
///
/// Side effects: creates the output subfolder if absent (idempotent) and
/// writes exactly one output file. An existing output is never replaced
/// silently: without the overwrite option the job is Skipped and the
/// existing file left untouched.
pub fn run(
    plan: &EncodePlan,
    settings: &ValidatedSettings,
    logger: &JobLogger,
    cancel: &CancelHandle,
) -> ExecOutcome {
    let settings = settings.settings();

    if cancel.is_cancelled() {
        return ExecOutcome::Cancelled;
    }

    if plan.output_path.exists() && !settings.output.overwrite {
        logger.info(&format!(
            "output already exists, skipping: {}",
            plan.output_path.display()
        ));
        return ExecOutcome::Completed(JobResult::skipped(
            plan.input_path.clone(),
            format!("output already exists: {}", plan.output_path.display()),
        ));
    }

    if let Some(parent) = plan.output_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            return ExecOutcome::Completed(JobResult::failed(
                plan.input_path.clone(),
                format!("failed to create output folder {}: {}", parent.display(), e),
            ));
        }
    }

    logger.clear_tail();

    if let Some(from) = &plan.codec_substituted_from {
        logger.warn(&format!(
            "source codec '{}' cannot be preserved, encoding to '{}'",
            from, plan.audio_codec
        ));
    }

    let mut cmd = Command::new(&settings.execution.ffmpeg_path);
    cmd.arg("-nostdin")
        .arg("-i")
        .arg(&plan.input_path)
        .args(["-c:v", "copy"])
        .arg("-c:a")
        .arg(&plan.audio_codec)
        .arg("-b:a")
        .arg(plan.bitrate_arg());
    if !plan.filters.is_empty() {
        cmd.arg("-af").arg(plan.filters.to_expression());
    }
    // The engine parallelizes the encode across all cores itself.
    cmd.args(["-threads", "0"]);
    cmd.args(["-progress", "pipe:1"]);
    if settings.output.overwrite {
        cmd.arg("-y");
    }
    cmd.arg(&plan.output_path);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    logger.command(&render_command(&cmd));

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ExecOutcome::Completed(JobResult::failed(
                plan.input_path.clone(),
                format!(
                    "encode tool '{}' could not be started: {}",
                    settings.execution.ffmpeg_path, e
                ),
            ));
        }
    };

    let stderr = child.stderr.take();
    let stdout = child.stdout.take();

    let status = std::thread::scope(|scope| {
        // Stream the engine's log output into the bounded tail buffer.
        if let Some(stderr) = stderr {
            scope.spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    if !line.is_empty() {
                        logger.output_line(&line, true);
                    }
                }
            });
        }

        // Progress key=value stream; also our cancellation poll point.
        if let Some(stdout) = stdout {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if cancel.is_cancelled() {
                    terminate(&mut child, logger);
                    break;
                }
                if let Some(percent) = parse_progress_line(&line, plan.duration_secs) {
                    logger.progress(percent);
                }
            }
        }

        child.wait()
    });

    if cancel.is_cancelled() {
        logger.warn("encode terminated by cancellation");
        return ExecOutcome::Cancelled;
    }

    let status = match status {
        Ok(status) => status,
        Err(e) => {
            return ExecOutcome::Completed(JobResult::failed(
                plan.input_path.clone(),
                format!("failed waiting for encode tool: {}", e),
            ));
        }
    };

    if status.success() && output_is_usable(&plan.output_path) {
        logger.success(&format!("wrote {}", plan.output_path.display()));
        ExecOutcome::Completed(JobResult::success(
            plan.input_path.clone(),
            plan.output_path.clone(),
        ))
    } else {
        let header = if status.success() {
            "encode tool exited cleanly but produced no usable output".to_string()
        } else {
            format!(
                "encode tool failed with exit code {}",
                status.code().unwrap_or(-1)
            )
        };
        logger.error(&header);
        ExecOutcome::Completed(JobResult::failed(
            plan.input_path.clone(),
            logger.diagnostic(&header),
        ))
    }
}

/// Ask the in-flight engine process to stop.
fn terminate(child: &mut Child, logger: &JobLogger) {
    if let Err(e) = child.kill() {
        // Process may already have exited.
        logger.debug(&format!("terminate: {}", e));
    }
}

/// Output must exist and be non-empty to count as produced.
fn output_is_usable(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// Parse one `-progress pipe:1` line into a percentage.
///
/// The `out_time_ms` key carries microseconds despite its name; it is
/// scaled against the probed duration when one is known. `progress=end`
/// always maps to 100%.
fn parse_progress_line(line: &str, duration_secs: Option<f64>) -> Option<u32> {
    let line = line.trim();
    if line == "progress=end" {
        return Some(100);
    }
    let micros: f64 = line.strip_prefix("out_time_ms=")?.parse().ok()?;
    let duration = duration_secs.filter(|d| *d > 0.0)?;

    let percent = (micros / 1_000_000.0 / duration * 100.0).clamp(0.0, 99.0);
    Some(percent as u32)
}

/// Render a command line for the job log.
fn render_command(cmd: &Command) -> String {
    let mut rendered = cmd.get_program().to_string_lossy().to_string();
    for arg in cmd.get_args() {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{validate, Settings};
    use crate::logging::LogConfig;
    use crate::models::{AudioStreamInfo, SourceFile};
    use crate::plan::build_plan;
    use tempfile::tempdir;

    fn plan_for(root: &Path, settings: &ValidatedSettings) -> EncodePlan {
        let input = root.join("movie.mkv");
        fs::write(&input, b"stub").unwrap();
        let file = SourceFile::new(input);
        let audio = AudioStreamInfo {
            codec_name: "aac".to_string(),
            bit_rate: Some(192_000),
            channels: Some(2),
            sample_rate: Some(48_000),
            duration_secs: Some(100.0),
        };
        build_plan(&file, &audio, settings, root)
    }

    fn test_logger(dir: &Path) -> JobLogger {
        JobLogger::new("movie", dir, LogConfig::default(), None).unwrap()
    }

    #[test]
    fn existing_output_is_skipped_and_untouched() {
        let dir = tempdir().unwrap();
        let settings = validate(Settings::default()).unwrap();
        let plan = plan_for(dir.path(), &settings);

        fs::create_dir_all(plan.output_path.parent().unwrap()).unwrap();
        fs::write(&plan.output_path, b"previous run").unwrap();

        let outcome = run(&plan, &settings, &test_logger(dir.path()), &CancelHandle::new());

        match outcome {
            ExecOutcome::Completed(result) => {
                assert_eq!(result.outcome, crate::models::JobOutcome::Skipped);
                assert!(result.detail.contains("already exists"));
            }
            ExecOutcome::Cancelled => panic!("not cancelled"),
        }
        assert_eq!(fs::read(&plan.output_path).unwrap(), b"previous run");
    }

    #[test]
    fn cancelled_before_start_spawns_nothing() {
        let dir = tempdir().unwrap();
        let settings = validate(Settings::default()).unwrap();
        let plan = plan_for(dir.path(), &settings);

        let cancel = CancelHandle::new();
        cancel.cancel();

        let outcome = run(&plan, &settings, &test_logger(dir.path()), &cancel);
        assert!(matches!(outcome, ExecOutcome::Cancelled));
        // Returned before the output folder side effect.
        assert!(!plan.output_path.parent().unwrap().exists());
    }

    #[test]
    fn missing_tool_is_a_failed_result() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.execution.ffmpeg_path = "definitely-not-a-real-encode-tool".to_string();
        let settings = validate(settings).unwrap();
        let plan = plan_for(dir.path(), &settings);

        let outcome = run(&plan, &settings, &test_logger(dir.path()), &CancelHandle::new());

        match outcome {
            ExecOutcome::Completed(result) => {
                assert_eq!(result.outcome, crate::models::JobOutcome::Failed);
                assert!(result.detail.contains("could not be started"));
            }
            ExecOutcome::Cancelled => panic!("not cancelled"),
        }
    }

    #[test]
    #[cfg(unix)]
    fn clean_exit_without_output_is_failed() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.execution.ffmpeg_path = "true".to_string();
        let settings = validate(settings).unwrap();
        let plan = plan_for(dir.path(), &settings);

        let outcome = run(&plan, &settings, &test_logger(dir.path()), &CancelHandle::new());

        match outcome {
            ExecOutcome::Completed(result) => {
                assert_eq!(result.outcome, crate::models::JobOutcome::Failed);
                assert!(result.detail.contains("no usable output"));
            }
            ExecOutcome::Cancelled => panic!("not cancelled"),
        }
        // The output folder side effect still happened.
        assert!(plan.output_path.parent().unwrap().exists());
    }

    #[test]
    #[cfg(unix)]
    fn nonzero_exit_is_failed_with_exit_code() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.execution.ffmpeg_path = "false".to_string();
        let settings = validate(settings).unwrap();
        let plan = plan_for(dir.path(), &settings);

        let outcome = run(&plan, &settings, &test_logger(dir.path()), &CancelHandle::new());

        match outcome {
            ExecOutcome::Completed(result) => {
                assert_eq!(result.outcome, crate::models::JobOutcome::Failed);
                assert!(result.detail.contains("exit code 1"));
            }
            ExecOutcome::Cancelled => panic!("not cancelled"),
        }
    }

    #[test]
    fn progress_lines_scale_against_duration() {
        assert_eq!(
            parse_progress_line("out_time_ms=50000000", Some(100.0)),
            Some(50)
        );
        assert_eq!(parse_progress_line("progress=end", Some(100.0)), Some(100));
        assert_eq!(parse_progress_line("progress=end", None), Some(100));
        // Unknown duration: ticks are unusable, end still reports.
        assert_eq!(parse_progress_line("out_time_ms=50000000", None), None);
        assert_eq!(parse_progress_line("frame=42", Some(100.0)), None);
        // Never reports a tick as done before the tool says so.
        assert_eq!(
            parse_progress_line("out_time_ms=200000000", Some(100.0)),
            Some(99)
        );
    }

    #[test]
    fn render_command_joins_program_and_args() {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-i", "in.mkv", "-c:v", "copy"]);
        assert_eq!(render_command(&cmd), "ffmpeg -i in.mkv -c:v copy");
    }
}
