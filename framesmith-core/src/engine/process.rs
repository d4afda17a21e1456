//! Launching engine processes and streaming their output line by line.
//!
//! The child keeps running while the caller handles earlier lines: stdout and
//! stderr are drained by reader threads into a channel, and the consumer only
//! blocks while waiting for the next line or for process exit. A deadline on
//! that wait gives callers a timeout; a timed-out process is killed and
//! reported exactly like a non-zero exit.

use super::classifier::{ProgressClassifier, ProgressEvent};
use crate::error::{CoreError, CoreResult, command_start_error, command_wait_error};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// A fully described engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
}

impl EngineCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(&mut self, arg: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.arg(arg);
        }
        self
    }

    pub fn current_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Returns the value following `flag`, if present.
    pub fn arg_value(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Result of waiting for the next output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    Line(String),
    Eof,
    TimedOut,
}

/// A running engine process.
pub trait EngineProcess {
    /// Waits for the next line of output, up to `deadline` if one is given.
    fn next_line(&mut self, deadline: Option<Instant>) -> LineRead;

    /// Terminates the process. Killing an already finished process is not an error.
    fn kill(&mut self) -> CoreResult<()>;

    /// Waits for exit and returns the exit code (`None` when killed by a signal).
    fn wait(&mut self) -> CoreResult<Option<i32>>;
}

/// Something that can start an [`EngineProcess`].
pub trait ProcessSpawner {
    type Process: EngineProcess;

    fn spawn(&self, command: &EngineCommand) -> CoreResult<Self::Process>;
}

/// [`EngineProcess`] backed by `std::process::Child`.
pub struct StdProcess {
    name: String,
    child: Child,
    lines: Receiver<String>,
}

impl StdProcess {
    fn start(command: &EngineCommand) -> CoreResult<Self> {
        let name = command
            .program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| command.program.display().to_string());

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| command_start_error(&name, e))?;

        let (tx, rx) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, tx);
        }

        Ok(Self {
            name,
            child,
            lines: rx,
        })
    }
}

fn spawn_line_reader<R: Read + Send + 'static>(stream: R, tx: Sender<String>) {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        let mut forwarding = true;
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    if forwarding && tx.send(decode_line(&buf)).is_err() {
                        // Keep draining so the child never blocks on a full pipe.
                        forwarding = false;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("Stopped reading engine output: {e}");
                    break;
                }
            }
        }
    });
}

/// Decodes one raw output line, replacing invalid UTF-8 and dropping the line ending.
fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    while end > 0 && matches!(raw[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

impl EngineProcess for StdProcess {
    fn next_line(&mut self, deadline: Option<Instant>) -> LineRead {
        match deadline {
            None => self.lines.recv().map_or(LineRead::Eof, LineRead::Line),
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return LineRead::TimedOut;
                }
                match self.lines.recv_timeout(remaining) {
                    Ok(line) => LineRead::Line(line),
                    Err(RecvTimeoutError::Timeout) => LineRead::TimedOut,
                    Err(RecvTimeoutError::Disconnected) => LineRead::Eof,
                }
            }
        }
    }

    fn kill(&mut self) -> CoreResult<()> {
        match self.child.kill() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(command_wait_error(&self.name, e)),
        }
    }

    fn wait(&mut self) -> CoreResult<Option<i32>> {
        self.child
            .wait()
            .map(|status| status.code())
            .map_err(|e| command_wait_error(&self.name, e))
    }
}

/// Spawns engines as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdProcessSpawner;

impl ProcessSpawner for StdProcessSpawner {
    type Process = StdProcess;

    fn spawn(&self, command: &EngineCommand) -> CoreResult<Self::Process> {
        StdProcess::start(command)
    }
}

/// Counters collected over one engine invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub lines: u64,
    pub ticks: u64,
}

/// Runs one engine invocation to completion, classifying every output line.
///
/// `on_event` sees each event in output order. The first fatal event stops
/// processing: the child is terminated and the classified error returned. A
/// non-zero exit without a fatal event, or running past `timeout`, yields
/// [`CoreError::EngineExit`].
pub fn run_engine<S, F>(
    spawner: &S,
    command: &EngineCommand,
    engine_name: &str,
    classifier: &dyn ProgressClassifier,
    timeout: Option<Duration>,
    mut on_event: F,
) -> CoreResult<RunSummary>
where
    S: ProcessSpawner,
    F: FnMut(&ProgressEvent),
{
    log::debug!("Running {engine_name}: {command}");
    let mut process = spawner.spawn(command)?;
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut summary = RunSummary::default();

    loop {
        match process.next_line(deadline) {
            LineRead::Line(line) => {
                summary.lines += 1;
                let event = classifier.classify(&line);
                match &event {
                    ProgressEvent::Tick => summary.ticks += 1,
                    ProgressEvent::Info(text) if text.starts_with('[') => {
                        log::info!(target: "framesmith::engine", "{text}");
                    }
                    ProgressEvent::Info(text) => {
                        log::debug!(target: "framesmith::engine", "{text}");
                    }
                    ProgressEvent::Error(kind, message) => {
                        on_event(&event);
                        log::error!("{engine_name} reported {kind}: {message}");
                        terminate(&mut process, engine_name);
                        return Err(CoreError::Engine {
                            engine: engine_name.to_string(),
                            kind: *kind,
                            message: message.clone(),
                        });
                    }
                }
                on_event(&event);
            }
            LineRead::Eof => break,
            LineRead::TimedOut => {
                log::error!(
                    "{engine_name} did not finish within {}s, terminating it",
                    timeout.map_or(0, |t| t.as_secs())
                );
                terminate(&mut process, engine_name);
                return Err(CoreError::EngineExit {
                    engine: engine_name.to_string(),
                    code: None,
                });
            }
        }
    }

    match process.wait()? {
        Some(0) => {
            log::debug!(
                "{engine_name} finished: {} lines, {} frames",
                summary.lines,
                summary.ticks
            );
            Ok(summary)
        }
        code => {
            log::error!("{engine_name} exited unsuccessfully ({code:?})");
            Err(CoreError::EngineExit {
                engine: engine_name.to_string(),
                code,
            })
        }
    }
}

fn terminate<P: EngineProcess>(process: &mut P, engine_name: &str) {
    if let Err(e) = process.kill() {
        log::warn!("Failed to terminate {engine_name}: {e}");
    }
    if let Err(e) = process.wait() {
        log::warn!("Failed to reap {engine_name}: {e}");
    }
}

/// Convenience for building a command rooted at the binary's own directory,
/// which is where the ncnn engines look for their model folders.
pub fn command_in_binary_dir(program: &Path) -> EngineCommand {
    let mut command = EngineCommand::new(program);
    if let Some(parent) = program.parent().filter(|p| !p.as_os_str().is_empty()) {
        command.current_dir(parent);
    }
    command
}
