//! Scoped subprocess execution.
//!
//! Engines are told their own time limit on the command line; the deadline
//! here is a backstop for engines that ignore it. Output is drained on
//! separate threads so a chatty solver can never block on a full pipe.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Result, StsError};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const MIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub wall: Duration,
    /// The backstop fired and the process was killed.
    pub killed: bool,
    pub exit_code: Option<i32>,
}

/// Kills the child on drop so an early return never leaks a solver.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn drain(stream: Option<impl Read + Send + 'static>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut s) = stream {
            let _ = s.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

pub fn run(argv: &[String], budget: Duration, solver: &str) -> Result<ProcessOutput> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| StsError::Config("empty command line".to_string()))?;

    let start = Instant::now();
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StsError::Unavailable {
                    solver: solver.to_string(),
                }
            } else {
                StsError::Io(e)
            }
        })?;
    let mut guard = ChildGuard {
        child,
        reaped: false,
    };
    let out = drain(guard.child.stdout.take());
    let err = drain(guard.child.stderr.take());

    // Grace past the engine's own limit, so it can still print its answer.
    let grace = Duration::from_millis(budget.as_millis() as u64 / 20).max(MIN_GRACE);
    let deadline = start + budget + grace;

    let mut killed = false;
    let exit_status = loop {
        if let Some(status) = guard.child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            debug!(solver, "budget exhausted, killing solver");
            let _ = guard.child.kill();
            killed = true;
            break guard.child.wait()?;
        }
        thread::sleep(POLL_INTERVAL);
    };
    guard.reaped = true;

    let stdout = out.join().unwrap_or_default();
    let stderr = err.join().unwrap_or_default();
    let wall = start.elapsed();
    debug!(
        solver,
        wall_ms = wall.as_millis() as u64,
        killed,
        code = exit_status.code(),
        "solver finished"
    );
    Ok(ProcessOutput {
        stdout,
        stderr,
        wall,
        killed,
        exit_code: exit_status.code(),
    })
}
