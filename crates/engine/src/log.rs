//! Engine log sink.
//!
//! Every engine writes to its own file through a `tracing` dispatcher. The
//! dispatcher is made the thread default on the worker thread and around
//! engine lifecycle work, and can be promoted to the process default.

mod debugger;

use core::fmt::{Display, Write as _};
use std::{fs::OpenOptions, sync::Mutex};

use tracing::{Dispatch, debug, error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::fmt::MakeWriter;

use crate::{
    config::{LoggingConfig, expand_env},
    registry::HostModule,
};

/// Longest host message written to the log, in bytes.
pub const MAX_MESSAGE_LEN: usize = 1000;

#[cfg(debug_assertions)]
const MAX_LEVEL: LevelFilter = LevelFilter::DEBUG;
#[cfg(not(debug_assertions))]
const MAX_LEVEL: LevelFilter = LevelFilter::INFO;

/// Severity of a host message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Clone)]
pub struct LogSink {
    dispatch: Dispatch,
}

impl LogSink {
    /// Open the log file named in `config` for appending, falling back to a sink discarding everything.
    ///
    /// Engines may share one file, so existing content is kept.
    pub fn open(config: &LoggingConfig, module: HostModule) -> Self {
        let path = expand_env(&config.file_path);
        let dispatch = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => create_dispatch(Mutex::new(file), module),
            Err(err) => {
                warn!("cannot open log file {path}. err: {err:?}");
                Dispatch::none()
            }
        };

        if config.enabled && tracing::dispatcher::set_global_default(dispatch.clone()).is_err() {
            warn!("process default log sink already set");
        }

        Self { dispatch }
    }

    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    #[inline]
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    pub fn write(&self, level: LogLevel, message: &str, fields: &[(&str, &dyn Display)]) {
        let line = if fields.is_empty() {
            message.to_string()
        } else {
            format!("{message} {}", format_fields(fields))
        };
        let line = truncate(&line);

        self.scope(|| match level {
            LogLevel::Debug => debug!(target: "indicium::host", "{line}"),
            LogLevel::Info => info!(target: "indicium::host", "{line}"),
            LogLevel::Warning => warn!(target: "indicium::host", "{line}"),
            LogLevel::Error => error!(target: "indicium::host", "{line}"),
        });
    }
}

#[cfg_attr(not(all(windows, debug_assertions)), allow(unused_variables))]
fn create_dispatch<W>(writer: W, module: HostModule) -> Dispatch
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    #[cfg(all(windows, debug_assertions))]
    let writer = {
        use tracing_subscriber::fmt::writer::MakeWriterExt;

        writer.and(debugger::DebuggerMakeWriter::new(module))
    };

    Dispatch::new(
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_thread_ids(true)
            .with_target(true)
            .with_max_level(MAX_LEVEL)
            .with_writer(writer)
            .finish(),
    )
}

/// Cut `message` to at most [`MAX_MESSAGE_LEN`] bytes on a char boundary.
pub fn truncate(message: &str) -> &str {
    if message.len() <= MAX_MESSAGE_LEN {
        return message;
    }

    let mut end = MAX_MESSAGE_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }

    &message[..end]
}

fn format_fields(fields: &[(&str, &dyn Display)]) -> String {
    let mut out = String::new();
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        _ = write!(out, "{key}={value}");
    }

    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn short_messages_are_kept() {
        assert_eq!(truncate("hello"), "hello");
    }

    #[test]
    fn long_messages_are_cut_on_char_boundary() {
        let message = "é".repeat(MAX_MESSAGE_LEN);
        let cut = truncate(&message);
        assert!(cut.len() <= MAX_MESSAGE_LEN);
        assert_eq!(cut.len() % 2, 0);

        let ascii = "a".repeat(MAX_MESSAGE_LEN + 10);
        assert_eq!(truncate(&ascii).len(), MAX_MESSAGE_LEN);
    }

    #[test]
    fn fields_are_rendered_as_pairs() {
        let frames = 3;
        assert_eq!(
            format_fields(&[("frames", &frames), ("api", &"d3d11")]),
            "frames=3 api=d3d11"
        );
        assert_eq!(format_fields(&[]), "");
    }

    #[test]
    fn file_sink_receives_host_messages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.log");

        let sink = LogSink::open(
            &LoggingConfig {
                enabled: false,
                file_path: path.to_string_lossy().into_owned(),
            },
            HostModule::new(0x1000),
        );
        sink.write(LogLevel::Warning, "swap chain lost", &[("frame", &12)]);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("swap chain lost"));
        assert!(content.contains("frame=12"));
        assert!(content.contains("indicium::host"));
    }

    #[test]
    fn unopenable_file_falls_back_to_noop() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LogSink::open(
            &LoggingConfig {
                enabled: false,
                file_path: dir.path().join("missing/dir/engine.log").to_string_lossy().into_owned(),
            },
            HostModule::new(0x1000),
        );

        sink.write(LogLevel::Error, "dropped", &[]);
    }

    #[test]
    fn engines_sharing_a_file_keep_each_others_lines() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            enabled: false,
            file_path: dir.path().join("shared.log").to_string_lossy().into_owned(),
        };

        let first = LogSink::open(&config, HostModule::new(0x1000));
        first.write(LogLevel::Info, "first engine line one", &[]);

        let second = LogSink::open(&config, HostModule::new(0x2000));
        second.write(LogLevel::Info, "second engine line", &[]);
        first.write(LogLevel::Info, "first engine line two", &[]);

        let content = fs::read_to_string(dir.path().join("shared.log")).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("first engine line one"));
        assert!(lines[1].ends_with("second engine line"));
        assert!(lines[2].ends_with("first engine line two"));
    }
}
