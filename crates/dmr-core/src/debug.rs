//! Logging setup for binaries and tests.
//!
//! Libraries only emit `tracing` events; subscribers are installed here,
//! once per process. An optional verbose log file runs through
//! `tracing-appender`'s non-blocking writer, whose guard must be kept
//! alive by the caller.

use core::fmt;
use std::fs::OpenOptions;
use std::sync::Once;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt as tracingfmt;
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

static INIT_LOG: Once = Once::new();

/// Formatter printing `LEVEL file:line: message` with the location
/// column padded so messages line up.
struct AlignedFormatter;

impl<S, N> FormatEvent<S, N> for AlignedFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let (color, reset) = match *metadata.level() {
            tracing::Level::ERROR => ("\x1b[31m", "\x1b[0m"),
            tracing::Level::WARN => ("\x1b[33m", "\x1b[0m"),
            tracing::Level::INFO => ("\x1b[32m", "\x1b[0m"),
            tracing::Level::DEBUG => ("\x1b[34m", "\x1b[0m"),
            tracing::Level::TRACE => ("\x1b[35m", "\x1b[0m"),
        };

        // Trim the path down to crate-relative: ".../src/foo/bar.rs" ->
        // "foo/bar.rs".
        let file = metadata.file().unwrap_or("unknown");
        let short = match file.find("/src/") {
            Some(idx) => &file[idx + 5..],
            None => file,
        };

        let location = format!(
            "{}{:<5}{} {}:{}:",
            color,
            metadata.level(),
            reset,
            short,
            metadata.line().unwrap_or(0)
        );

        write!(writer, "{:<50} ", location)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Maximum verbosity, for unit and integration tests.
pub fn setup_logging_verbose() {
    setup_logging(EnvFilter::new("trace"), None);
}

/// Default logging to stdout plus, optionally, a verbose log file.
/// Keep the returned guard alive or file logging stops.
pub fn setup_logging_default(verbose_logfile: Option<String>) -> Option<WorkerGuard> {
    let logfile = verbose_logfile.map(|f| (f, EnvFilter::new("debug")));
    setup_logging(default_stdout_filter(), logfile)
}

pub fn default_stdout_filter() -> EnvFilter {
    EnvFilter::new("info")
        // The link logs every keepalive at debug; keep stdout calm.
        .add_directive("dmr_entities::homebrew=info".parse().unwrap())
        .add_directive("dmr_entities::terminal=debug".parse().unwrap())
}

fn setup_logging(stdout_filter: EnvFilter, outfile: Option<(String, EnvFilter)>) -> Option<WorkerGuard> {
    if let Some((path, file_filter)) = outfile {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .expect("failed to open log file");
        let (file_writer, guard) = tracing_appender::non_blocking(file);

        INIT_LOG.call_once(|| {
            let file_layer = tracingfmt::layer()
                .event_format(AlignedFormatter)
                .with_writer(file_writer)
                .with_ansi(false);
            let stdout_layer = tracingfmt::layer().event_format(AlignedFormatter);
            tracing_subscriber::registry()
                .with(file_layer.with_filter(file_filter))
                .with(stdout_layer.with_filter(stdout_filter))
                .init();
        });
        Some(guard)
    } else {
        INIT_LOG.call_once(|| {
            let stdout_layer = tracingfmt::layer().event_format(AlignedFormatter);
            tracing_subscriber::registry()
                .with(stdout_layer.with_filter(stdout_filter))
                .init();
        });
        None
    }
}
