use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use log::{debug, error, info, trace, warn};
use serde_json::Value;
use tracing_appender::non_blocking::WorkerGuard;
use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::modimpl::config::{Environment, LogLevel};

pub const HTTP_TARGET: &str = "http";
pub const ROTATE_AT_BYTES: u64 = 5 * 1024 * 1024;
pub const ERROR_LOG_FILES: usize = 2;
pub const ALL_LOG_FILES: usize = 3;

/// Development is chatty, everything else only reports problems.
pub fn default_level(environment: Environment) -> LogLevel {
    match environment {
        Environment::Development => LogLevel::Info,
        Environment::Production | Environment::Test => LogLevel::Warn,
    }
}

/// `http` has no tracing counterpart, so it takes DEBUG and pushes `debug` down to TRACE.
pub fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Http => LevelFilter::DEBUG,
        LogLevel::Debug => LevelFilter::TRACE,
    }
}

/// Keeps the background log writers alive; dropping it flushes them.
pub struct LogGuard {
    _workers: Vec<WorkerGuard>,
}

/// Filter for the console and file sinks.
///
/// `directives` (normally `RUST_LOG`) wins when it parses; otherwise the
/// environment's default minimum applies.
pub fn env_filter(environment: Environment, directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(level_filter(default_level(environment)).to_string()))
}

/// Console layer plus the optional error-only and all-levels file layers.
pub fn build_subscriber<C, E, A>(
    filter: EnvFilter,
    console: C,
    error_writer: Option<E>,
    all_writer: Option<A>,
) -> impl Subscriber + Send + Sync + 'static
where
    C: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    E: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    A: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(fmt::layer()
            .with_writer(console)
            .with_thread_ids(true)
            .with_line_number(true)
        )
        .with(filter)
        .with(error_writer.map(|w| fmt::layer()
            .with_writer(w)
            .with_ansi(false)
            .with_filter(LevelFilter::ERROR)))
        .with(all_writer.map(|w| fmt::layer()
            .with_writer(w)
            .with_ansi(false)))
}

/// Installs the global subscriber: console plus `error.log` and `all.log` under `log_dir`.
///
/// File sinks that cannot be opened are skipped and reported once on the
/// console. A subscriber that is already installed is left in place.
pub fn init_logging(environment: Environment, log_dir: &Path) -> LogGuard {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = env_filter(environment, directives.as_deref());

    let mut workers = Vec::new();
    let mut problems = Vec::new();

    let mut open_sink = |name: &str, keep: usize| match open_log_file(log_dir, name, keep) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            workers.push(guard);
            Some(writer)
        }
        Err(e) => {
            problems.push(format!("{}: {}", log_dir.join(name).display(), e));
            None
        }
    };
    let error_writer = open_sink("error.log", ERROR_LOG_FILES);
    let all_writer = open_sink("all.log", ALL_LOG_FILES);

    let result = build_subscriber(filter, io::stdout, error_writer, all_writer).try_init();

    if result.is_err() {
        trace!("Global log subscriber already installed, keeping it");
    }
    for problem in problems {
        warn!("❗ File logging disabled for {}", problem);
    }
    info!("🖹 Logger Initialized");

    LogGuard { _workers: workers }
}

fn open_log_file(log_dir: &Path, name: &str, keep: usize) -> io::Result<RotatingFile> {
    fs::create_dir_all(log_dir)?;
    RotatingFile::open(log_dir.join(name), ROTATE_AT_BYTES, keep)
}

/// Append-only file that rolls over once it reaches a size limit.
///
/// `name` is always the live file; older generations are `name.1`, `name.2`,
/// ... up to `keep - 1`, the oldest being discarded.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    keep: usize,
    file: File,
    written: u64,
}

impl RotatingFile {
    pub fn open(path: PathBuf, max_bytes: u64, keep: usize) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self { path, max_bytes, keep: keep.max(1), file, written })
    }

    fn generation(&self, n: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.keep == 1 {
            self.file = OpenOptions::new().create(true).write(true).truncate(true).open(&self.path)?;
        } else {
            for n in (1..self.keep - 1).rev() {
                let from = self.generation(n);
                if from.exists() {
                    fs::rename(&from, self.generation(n + 1))?;
                }
            }
            fs::rename(&self.path, self.generation(1))?;
            self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        }
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            // On failure keep appending to the current handle; retry after another max_bytes.
            let _ = self.rotate();
            self.written = 0;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn render(message: &str, meta: Option<&Value>) -> String {
    match meta {
        Some(meta) if !meta.is_null() => format!("{} {}", message, meta),
        _ => message.to_string(),
    }
}

/// Leveled logging entry points taking optional structured metadata.
///
/// Records go through the `log` facade, which never fails the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

impl Logger {
    pub fn error(&self, message: &str, meta: Option<&Value>) {
        error!("{}", render(message, meta));
    }

    pub fn warn(&self, message: &str, meta: Option<&Value>) {
        warn!("{}", render(message, meta));
    }

    pub fn info(&self, message: &str, meta: Option<&Value>) {
        info!("{}", render(message, meta));
    }

    pub fn http(&self, message: &str, meta: Option<&Value>) {
        debug!(target: HTTP_TARGET, "{}", render(message, meta));
    }

    pub fn debug(&self, message: &str, meta: Option<&Value>) {
        trace!("{}", render(message, meta));
    }
}

/// Line sink for access-log producers; forwards each line at `http` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpLogWriter {
    logger: Logger,
}

impl HttpLogWriter {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn write(&self, line: &str) {
        let line = line.trim_end();
        if !line.is_empty() {
            self.logger.http(line, None);
        }
    }
}
