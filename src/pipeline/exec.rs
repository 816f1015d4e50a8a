//! Subprocess execution: spawn a resolved tool, capture its merged output,
//! and map the exit status to a typed outcome.
//!
//! The runner is async — callers await a completion rather than blocking a
//! thread — and owns both output pipes for the lifetime of the child. Both
//! pipes are drained to EOF *before* the exit status is collected, so a
//! chatty child can never deadlock against a full pipe while the parent
//! waits for it to exit.
//!
//! There is no retry, timeout, or cancellation here: one invocation, one
//! outcome. Whether to run again with different options is the caller's
//! decision.

use crate::error::{SqueezeError, TerminationKind};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Run `program` with `args`, overlaying `env` on the inherited environment
/// (overlay wins on collision). Success is exit status zero; everything else
/// is a typed failure carrying the captured diagnostic text.
pub async fn run_tool(
    program: &Path,
    args: &[String],
    env: &BTreeMap<String, String>,
) -> Result<(), SqueezeError> {
    debug!("spawning {} {}", program.display(), args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SqueezeError::LaunchFailed {
            program: program.to_path_buf(),
            source: e,
        })?;

    // Pipes are taken before waiting; spawn() with Stdio::piped guarantees
    // they exist.
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| SqueezeError::Internal("child stdout was not captured".into()))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| SqueezeError::Internal("child stderr was not captured".into()))?;

    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();
    let (out_read, err_read) = tokio::join!(
        stdout.read_to_end(&mut out_buf),
        stderr.read_to_end(&mut err_buf)
    );
    if let Err(e) = out_read.and(err_read) {
        warn!("error draining output of {}: {e}", program.display());
    }

    let status = child
        .wait()
        .await
        .map_err(|e| SqueezeError::Internal(format!("wait on child failed: {e}")))?;

    // One shared sink: stdout first, then stderr.
    out_buf.extend_from_slice(&err_buf);
    let log = String::from_utf8_lossy(&out_buf).trim().to_string();

    if status.success() {
        if !log.is_empty() {
            debug!("{} output: {log}", tool_name(program));
        }
        return Ok(());
    }

    let (code, kind) = classify_status(&status);
    Err(SqueezeError::ProcessFailed {
        tool: tool_name(program).to_string(),
        code,
        kind,
        log,
    })
}

fn tool_name(program: &Path) -> &str {
    program
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("tool")
}

#[cfg(unix)]
fn classify_status(status: &std::process::ExitStatus) -> (i32, TerminationKind) {
    use std::os::unix::process::ExitStatusExt;
    match status.code() {
        Some(code) => (code, TerminationKind::Exit),
        // No exit code on unix means signal termination.
        None => (status.signal().unwrap_or(-1), TerminationKind::Signal),
    }
}

#[cfg(not(unix))]
fn classify_status(status: &std::process::ExitStatus) -> (i32, TerminationKind) {
    (status.code().unwrap_or(-1), TerminationKind::Exit)
}
