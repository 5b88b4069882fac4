//! The reporting port every source logs through.
//!
//! Sources never write diagnostics themselves. Each one holds a
//! [`SharedReporter`] handed to it at construction and reports:
//!
//! - sink errors and dropped items at [`Level::Warning`];
//! - panics from sinks, hooks, mappers and poll functions at [`Level::Error`];
//! - start and close at [`Level::Info`];
//! - sink and hook registration at [`Level::Debug`];
//! - per-item dispatch at [`Level::Verbose`].
//!
//! The default reporter, [`TracingReporter`], forwards to `tracing` and drops
//! everything below `Warning`.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::error::Error;
use crate::util::lock;

/// Severity of a report, ordered from `Verbose` to `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Level {
    /// Intent, once per item handled
    Verbose,
    /// State changes such as registrations or a growing error count
    Debug,
    /// Source status changes and handled errors
    Info,
    /// A sink or mapper returned an error and an item was discarded
    Warning,
    /// A sink, hook, mapper or poll function panicked
    Error,
}

impl Level {
    /// Every level, lowest first.
    pub const ALL: [Level; 5] = [
        Level::Verbose,
        Level::Debug,
        Level::Info,
        Level::Warning,
        Level::Error,
    ];

    fn name(self) -> &'static str {
        match self {
            Level::Verbose => "Verbose",
            Level::Debug => "Debug",
            Level::Info => "Info",
            Level::Warning => "Warning",
            Level::Error => "Error",
        }
    }
}

/// Right-padded to seven characters so log columns line up.
impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<7}", self.name())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Level::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::invalid_config(format!("unknown log level `{}`", wanted)))
    }
}

/// Opaque identity of a source, carried on every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(u64);

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

impl SourceId {
    pub(crate) fn next() -> Self {
        SourceId(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source-{}", self.0)
    }
}

/// Receives diagnostics from sources.
///
/// `message` is lazily formatted: implementations that drop a level should
/// say so in [`Reporter::enabled`] so the message is never rendered.
pub trait Reporter: Send + Sync + 'static {
    /// Whether reports at `level` are wanted at all.
    fn enabled(&self, _level: Level) -> bool {
        true
    }

    /// Handle one report.
    fn report(&self, level: Level, source: SourceId, message: fmt::Arguments<'_>);
}

/// Reporter shared between a source and the operators derived from it.
pub type SharedReporter = Arc<dyn Reporter>;

/// Forwards reports to `tracing`, mapping `Verbose` to `TRACE`.
#[derive(Debug, Clone, Copy)]
pub struct TracingReporter {
    min_level: Level,
}

impl TracingReporter {
    /// Reporter that keeps `min_level` and everything above it.
    pub fn new(min_level: Level) -> Self {
        Self { min_level }
    }

    /// The lowest level this reporter forwards.
    pub fn min_level(&self) -> Level {
        self.min_level
    }
}

impl Default for TracingReporter {
    fn default() -> Self {
        Self::new(Level::Warning)
    }
}

impl Reporter for TracingReporter {
    fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }

    fn report(&self, level: Level, source: SourceId, message: fmt::Arguments<'_>) {
        match level {
            Level::Verbose => tracing::trace!(source = %source, "{}", message),
            Level::Debug => tracing::debug!(source = %source, "{}", message),
            Level::Info => tracing::info!(source = %source, "{}", message),
            Level::Warning => tracing::warn!(source = %source, "{}", message),
            Level::Error => tracing::error!(source = %source, "{}", message),
        }
    }
}

/// Adapts a closure into a [`Reporter`] that receives every level.
pub struct FnReporter<F> {
    f: F,
}

impl<F> FnReporter<F>
where
    F: Fn(Level, SourceId, fmt::Arguments<'_>) + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Reporter for FnReporter<F>
where
    F: Fn(Level, SourceId, fmt::Arguments<'_>) + Send + Sync + 'static,
{
    fn report(&self, level: Level, source: SourceId, message: fmt::Arguments<'_>) {
        (self.f)(level, source, message)
    }
}

/// One report captured by a [`MemoryReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub level: Level,
    pub source: SourceId,
    pub message: String,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.level, self.source, self.message)
    }
}

/// Keeps every report in memory. Useful for tests and for surfacing
/// pipeline diagnostics in another channel.
#[derive(Debug, Clone, Default)]
pub struct MemoryReporter {
    records: Arc<Mutex<Vec<Record>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the reports received so far.
    pub fn records(&self) -> Vec<Record> {
        lock(&self.records).clone()
    }

    /// Whether a report at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        lock(&self.records)
            .iter()
            .any(|record| record.level == level && record.message.contains(needle))
    }

    /// Number of reports at `level`.
    pub fn count(&self, level: Level) -> usize {
        lock(&self.records)
            .iter()
            .filter(|record| record.level == level)
            .count()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, level: Level, source: SourceId, message: fmt::Arguments<'_>) {
        lock(&self.records).push(Record {
            level,
            source,
            message: message.to_string(),
        });
    }
}
