use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    EnvFilter, Layer,
};

/// Target used for operator-facing spam loop events.
pub const SPAM_EVENT_TARGET: &str = "spam_event";

/// Console + hourly rolling file logging.
///
/// Console shows spam events at INFO (DEBUG when `verbose`) and everything
/// else at WARN; `RUST_LOG` overrides the console filter. The file keeps
/// spam events at DEBUG. The returned guard must be kept alive by the caller.
pub fn setup_logger(verbose: bool) -> Option<WorkerGuard> {
    if std::fs::create_dir_all("logs").is_err() {
        return setup_console_only(verbose);
    }

    let file_appender = tracing_appender::rolling::hourly("logs", "spam");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = tracing_subscriber::filter::Targets::new()
        .with_target(SPAM_EVENT_TARGET, Level::DEBUG)
        .with_default(Level::WARN);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_filter(verbose));

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();

    installed.ok().map(|_| guard)
}

fn setup_console_only(verbose: bool) -> Option<WorkerGuard> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .event_format(TerminalFormatter)
        .with_filter(console_filter(verbose));
    let _ = tracing_subscriber::registry().with(console_layer).try_init();
    None
}

fn console_filter(verbose: bool) -> EnvFilter {
    let spam_level = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{}={}", SPAM_EVENT_TARGET, spam_level)))
}

// --- Formatters ---

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn event_message(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor {
        message: String::new(),
    };
    event.record(&mut visitor);
    visitor.message
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let msg = event_message(event);
        let time = Local::now().format("%H:%M:%S");
        let style = match *event.metadata().level() {
            Level::ERROR => Style::new().fg(Color::LightRed).bold(),
            Level::WARN => Style::new().fg(Color::Yellow),
            Level::DEBUG | Level::TRACE => Style::new().dimmed(),
            Level::INFO => Style::new(),
        };

        if writer.has_ansi_escapes() {
            let time_style = Style::new().fg(Color::DarkGray);
            write!(
                writer,
                "{} {}",
                time_style.paint(time.to_string()),
                style.paint(msg)
            )?;
        } else {
            write!(writer, "{} {}", time, msg)?;
        }
        writeln!(writer)
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let metadata = event.metadata();

        write!(
            writer,
            "{} [{}] {}: ",
            timestamp,
            metadata.level(),
            metadata.target()
        )?;
        writeln!(writer, "{}", event_message(event))
    }
}
