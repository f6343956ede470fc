//! Tracing subscriber setup

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::domain::model::{LogFormat, LoggingSettings};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over a configured `level` unless `forced` is set, as it
/// is for a level given on the command line. Calling this twice is harmless.
///
/// With `[logging].file` set, events are also appended to that file. The
/// returned guard flushes it and must live until the process exits.
pub fn init_logging(settings: &LoggingSettings, forced: bool) -> io::Result<Option<WorkerGuard>> {
    let filter = if forced {
        EnvFilter::try_new(&settings.level)
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&settings.level))
    }
    .unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers = vec![format_layer(settings.format, io::stderr, true)];
    let guard = match &settings.file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(open_log_file(path)?);
            layers.push(format_layer(settings.format, writer, false));
            Some(guard)
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();
    Ok(guard)
}

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer).with_ansi(ansi);
    match format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Open `path` for appending, creating missing parent directories
fn open_log_file(path: &Path) -> io::Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
