//! Progress reporting API
//!
//! The core library reports stage transitions and per-frame progress through
//! a globally registered [`ProgressReporter`], without knowing how (or
//! whether) the frontend draws it. When no reporter is registered every call
//! is a no-op, which is what the tests rely on.

use crate::pipeline::Stage;
use std::sync::{LazyLock, Mutex};

/// Severity of a free-form message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Receiver of progress information from the core.
pub trait ProgressReporter: Send + Sync {
    /// A pipeline stage begins.
    fn stage_started(&self, stage: Stage, detail: &str);

    /// A measurable unit of work begins; `total` is the expected number of ticks if known.
    fn progress_started(&self, label: &str, total: Option<u64>);

    /// One more frame is done.
    fn progress_tick(&self);

    /// Absolute position, for tools that report a running count.
    fn progress_position(&self, position: u64);

    /// The current unit of work ended.
    fn progress_finished(&self);

    fn message(&self, level: MessageLevel, text: &str);
}

static PROGRESS_REPORTER: LazyLock<Mutex<Option<Box<dyn ProgressReporter>>>> =
    LazyLock::new(|| Mutex::new(None));

/// Set the global progress reporter
pub fn set_progress_reporter(reporter: Box<dyn ProgressReporter>) {
    if let Ok(mut r) = PROGRESS_REPORTER.lock() {
        *r = Some(reporter);
    }
}

/// Remove the global progress reporter
pub fn clear_progress_reporter() {
    if let Ok(mut r) = PROGRESS_REPORTER.lock() {
        *r = None;
    }
}

#[inline]
fn with_reporter<F>(f: F)
where
    F: FnOnce(&dyn ProgressReporter),
{
    if let Ok(guard) = PROGRESS_REPORTER.lock() {
        if let Some(reporter) = guard.as_ref() {
            f(reporter.as_ref());
        }
    }
}

pub fn stage_started(stage: Stage, detail: &str) {
    with_reporter(|r| r.stage_started(stage, detail));
}

pub fn progress_started(label: &str, total: Option<u64>) {
    with_reporter(|r| r.progress_started(label, total));
}

pub fn progress_tick() {
    with_reporter(|r| r.progress_tick());
}

pub fn progress_position(position: u64) {
    with_reporter(|r| r.progress_position(position));
}

pub fn progress_finished() {
    with_reporter(|r| r.progress_finished());
}

pub fn info(text: &str) {
    with_reporter(|r| r.message(MessageLevel::Info, text));
}

pub fn success(text: &str) {
    with_reporter(|r| r.message(MessageLevel::Success, text));
}

pub fn warning(text: &str) {
    with_reporter(|r| r.message(MessageLevel::Warning, text));
}

pub fn error(text: &str) {
    with_reporter(|r| r.message(MessageLevel::Error, text));
}
