use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. With a log file, `info` and above go to
/// the file; otherwise only warnings reach stderr so the fake terminal stays
/// readable. `RUST_LOG` directives apply on top of either default.
pub fn init(log_file: Option<&Path>) {
    let file = log_file.and_then(|path| match open_log_file(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Warning: cannot open log file {}: {}", path.display(), e);
            None
        }
    });

    match file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter(tracing::Level::INFO))
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter(tracing::Level::WARN))
            .with_writer(io::stderr)
            .init(),
    }
}

fn filter(default_level: tracing::Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

pub fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
