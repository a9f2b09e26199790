use std::{
    collections::HashMap,
    fmt::Write as _,
    fs::OpenOptions,
    path::{Path, PathBuf},
};
use nu_ansi_term::{Color, Style};
use serde::Deserialize;
use termcolor::ColorChoice;
use tracing::{field::Visit, Level};
use tracing_log::NormalizeEvent;
use tracing_subscriber::{
    filter::{FilterFn, LevelFilter},
    fmt::FormatEvent,
    prelude::*,
};

use crate::{prelude::*, args::Args};


/// Logging configuration.
#[derive(Debug, confique::Config)]
pub(crate) struct LogConfig {
    /// Minimum log level per module path prefix. A message is emitted if the
    /// entry with the longest prefix of its module path allows its level.
    /// Messages from modules without any matching entry are dropped. Levels:
    /// "off", "error", "warn", "info", "debug" and "trace".
    ///
    /// Example: general info messages, everything from the HTTP layer,
    /// nothing from the store, and debug messages of the `hyper` library.
    ///
    ///    [log]
    ///    filters.bookshelf = "info"
    ///    filters."bookshelf::http" = "trace"
    ///    filters."bookshelf::store" = "off"
    ///    filters.hyper = "debug"
    #[config(default = { "bookshelf": "debug" })]
    pub(crate) filters: Filters,

    /// Optional file to append log messages to. `${cmd}` is replaced by the
    /// name of the subcommand, e.g. "/var/log/bookshelf-${cmd}.log".
    pub(crate) file: Option<PathBuf>,

    /// Whether to write log messages to stdout.
    #[config(default = true)]
    pub(crate) stdout: bool,

    /// Whether to log all headers of incoming HTTP requests at 'trace' level.
    #[config(default = false)]
    pub(crate) log_http_headers: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "HashMap<String, String>")]
pub(crate) struct Filters(HashMap<String, LevelFilter>);

impl TryFrom<HashMap<String, String>> for Filters {
    type Error = String;
    fn try_from(value: HashMap<String, String>) -> Result<Self, Self::Error> {
        value.into_iter()
            .map(|(target_prefix, level)| Ok((target_prefix, parse_level_filter(&level)?)))
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

impl Filters {
    /// Whether an event with the given target and level passes. The entry
    /// with the longest matching prefix decides.
    fn enabled(&self, target: &str, level: &Level) -> bool {
        self.0.iter()
            .filter(|(target_prefix, _)| target.starts_with(target_prefix.as_str()))
            .max_by_key(|(target_prefix, _)| target_prefix.len())
            .is_some_and(|(_, level_filter)| level <= level_filter)
    }

    fn max_level(&self) -> LevelFilter {
        self.0.values().max().copied().unwrap_or(LevelFilter::OFF)
    }
}

fn parse_level_filter(s: &str) -> Result<LevelFilter, String> {
    match s {
        "off" => Ok(LevelFilter::OFF),
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" => Ok(LevelFilter::WARN),
        "error" => Ok(LevelFilter::ERROR),
        other => Err(format!("invalid log level '{other}'")),
    }
}

/// Installs our own logger globally. Must only be called once!
pub(crate) fn init(config: &LogConfig, args: &Args, cmd: &str) -> Result<()> {
    let filters = config.filters.clone();
    let max_level = filters.max_level();
    let filter = FilterFn::new(move |metadata| filters.enabled(metadata.target(), metadata.level()))
        .with_max_level_hint(max_level);

    let stdout_output = config.stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .event_format(EventFormatter(args.color))
            .with_writer(std::io::stdout)
    });

    let file_output = match &config.file {
        None => None,
        Some(path) => {
            let file = open_log_file(path, cmd)?;
            let layer = tracing_subscriber::fmt::layer()
                .event_format(EventFormatter(args.color))
                .with_writer(file)
                .with_ansi(args.color == ColorChoice::Always);
            Some(layer)
        }
    };

    // This also forwards messages from crates using `log` instead of `tracing`.
    tracing_subscriber::registry()
        .with(filter)
        .with(file_output)
        .with(stdout_output)
        .try_init()
        .context("failed to install global logger")?;

    Ok(())
}

fn open_log_file(path: &Path, cmd: &str) -> Result<std::fs::File> {
    use std::io::Write;

    let path = path.to_str()
        .ok_or_else(|| anyhow!("log file path is not valid UTF-8"))?
        .replace("${cmd}", cmd);
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
        .with_context(|| format!("failed to open/create log file '{path}'"))?;

    // Separates runs of the process.
    file.write_all(b"\n").context("could not write to log file")?;
    Ok(file)
}

/// Prints `<time> <level> <target> | <message>  <key>=<value> ...`, each event
/// on one line.
#[derive(Clone, Copy)]
struct EventFormatter(ColorChoice);

impl<S, N> FormatEvent<S, N> for EventFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let ansi = self.0 == ColorChoice::Always
            || (writer.has_ansi_escapes() && self.0 != ColorChoice::Never);
        let paint = |style: Style, text: &dyn std::fmt::Display| -> String {
            if ansi { style.paint(text.to_string()).to_string() } else { text.to_string() }
        };

        let normalized = event.normalized_metadata();
        let metadata = normalized.as_ref().unwrap_or(event.metadata());
        let level = *metadata.level();
        let body = body_style(level);

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S.%3f");
        write!(
            writer,
            "{} {} {} {}",
            paint(Style::new().dimmed(), &time),
            paint(level_style(level), &format!("{level:5}")),
            paint(Style::new().dimmed(), &format!("{} |", metadata.target())),
            paint(body, &fields.message),
        )?;
        for (name, value) in &fields.rest {
            write!(writer, "  {}{}", paint(body.italic(), name), paint(body, &format!("={value}")))?;
        }

        writeln!(writer)
    }
}

fn level_style(level: Level) -> Style {
    match level {
        Level::ERROR => Color::Red.bold(),
        Level::WARN => Color::Yellow.bold(),
        Level::INFO => Color::Green.normal(),
        Level::DEBUG => Color::Blue.normal(),
        Level::TRACE => Color::Magenta.normal(),
    }
}

fn body_style(level: Level) -> Style {
    match level {
        Level::ERROR => Color::Red.normal(),
        Level::WARN => Color::Yellow.normal(),
        Level::INFO => Style::new(),
        Level::DEBUG => Style::new().dimmed(),
        Level::TRACE => Color::DarkGray.normal(),
    }
}

/// Gathers the message and all other fields of an event. Fields added by
/// `tracing-log` are skipped.
#[derive(Default)]
struct FieldCollector {
    message: String,
    rest: Vec<(&'static str, String)>,
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.record(field.name(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.record(field.name(), value.to_owned());
    }
}

impl FieldCollector {
    fn record(&mut self, name: &'static str, value: String) {
        match name {
            "message" => self.message = value,
            name if name.starts_with("log.") => {}
            name => self.rest.push((name, value)),
        }
    }
}
