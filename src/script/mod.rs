/*!
 * Script Runner
 * Executes helper programs, collecting stdout under a wall-clock deadline
 *
 * The child runs in its own process group and is always killed and reaped
 * before the call returns, on every exit path.
 */

use crate::core::errors::ScriptError;
use log::{debug, error};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::{setpgid, Pid};
use std::io::Read;
use std::os::fd::AsFd;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Cap on a single poll slice; the deadline is re-checked between slices.
const POLL_SLICE_MS: u16 = 500;

fn validate(script_type: &str, path: &str) -> Result<(), ScriptError> {
    if path.is_empty() {
        return Err(ScriptError::NoScript);
    }
    if !path.starts_with('/') {
        return Err(ScriptError::NotAbsolute {
            script_type: script_type.to_string(),
            path: path.to_string(),
        });
    }
    let executable = std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false);
    if !executable {
        return Err(ScriptError::NotExecutable {
            script_type: script_type.to_string(),
            path: path.to_string(),
        });
    }
    Ok(())
}

fn spawn(path: &str, args: &[&str], capture: bool) -> Result<Child, ScriptError> {
    let mut cmd = Command::new(path);
    cmd.args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .stdout(if capture { Stdio::piped() } else { Stdio::null() });

    // Own process group, so the whole helper tree can be killed at once
    unsafe {
        cmd.pre_exec(|| {
            setpgid(Pid::from_raw(0), Pid::from_raw(0)).map_err(std::io::Error::from)
        });
    }

    cmd.spawn().map_err(|source| ScriptError::Spawn {
        path: path.to_string(),
        source,
    })
}

/// Execute a helper program and return its stdout.
///
/// `script_type` names the role of the program for diagnostics (for
/// example "StartStageIn"). With `max_wait` set, stdout is read in a poll
/// loop honouring the deadline; on expiry whatever arrived so far is
/// returned and the overrun is logged. With `max_wait` of `None` the
/// program is fire-and-forget: no pipe is attached and the child is
/// reaped in the background.
pub fn run_script(
    script_type: &str,
    path: &str,
    args: &[&str],
    max_wait: Option<Duration>,
) -> Result<String, ScriptError> {
    validate(script_type, path)?;

    let max_wait = match max_wait {
        Some(wait) => wait,
        None => {
            let mut child = spawn(path, args, false)?;
            std::thread::spawn(move || {
                let _ = child.wait();
            });
            return Ok(String::new());
        }
    };

    let mut child = spawn(path, args, true)?;
    let mut output = Vec::new();

    if let Some(mut stdout) = child.stdout.take() {
        let deadline = Instant::now() + max_wait;
        let mut chunk = [0u8; 4096];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                error!("{}: {} timeout", script_type, path);
                break;
            }
            let slice_ms = remaining.as_millis().min(POLL_SLICE_MS as u128) as u16;

            let fd = stdout.as_fd();
            let mut fds = [PollFd::new(fd, PollFlags::POLLIN | PollFlags::POLLHUP)];
            match poll(&mut fds, PollTimeout::from(slice_ms)) {
                Ok(0) => continue, // slice expired, re-check the deadline
                Ok(_) => {}
                Err(nix::errno::Errno::EINTR) => continue,
                Err(errno) => {
                    error!("{}: poll({}): {}", script_type, path, errno);
                    break;
                }
            }
            let readable = fds[0]
                .revents()
                .map(|ev| ev.contains(PollFlags::POLLIN))
                .unwrap_or(false);
            if !readable {
                break; // hangup with nothing left to read
            }

            match stdout.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => output.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("{}: read({}): {}", script_type, path, e);
                    break;
                }
            }
        }
    }

    // Kill the process group and reap the child on every path
    let pgid = Pid::from_raw(child.id() as i32);
    if let Err(errno) = killpg(pgid, Signal::SIGKILL) {
        if errno != nix::errno::Errno::ESRCH {
            debug!("{}: killpg: {}", script_type, errno);
        }
    }
    let _ = child.wait();

    Ok(String::from_utf8_lossy(&output).into_owned())
}
