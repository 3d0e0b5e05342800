use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use std::path::PathBuf;
use std::fs;
use std::sync::Mutex;

/// Initialize the logging system
pub fn init_logging(verbose: bool, log_file: Option<PathBuf>) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = build_filter(verbose, rust_log.as_deref())?;

    let fmt_layer = fmt::layer().with_target(true);

    // If a log file is specified, write to it as well
    if let Some(log_file) = log_file {
        if let Some(parent) = log_file.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = fs::File::create(log_file)?;
        let file_layer = fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }

    Ok(())
}

/// Filter for this crate at info (debug when verbose). A `RUST_LOG` value
/// supplies the default for other targets, otherwise they log at warn.
fn build_filter(verbose: bool, rust_log: Option<&str>) -> Result<EnvFilter> {
    let level = if verbose { "debug" } else { "info" };
    let base = match rust_log {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::new("warn"),
    };

    Ok(base
        .add_directive(format!("bfs_crawler={}", level).parse()?)
        .add_directive(format!("crawler={}", level).parse()?))
}

/// Create a default log file path
pub fn default_log_file() -> PathBuf {
    let mut path = if let Some(proj_dirs) = directories::ProjectDirs::from("com", "bfs-crawler", "bfs-crawler") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from("./logs")
    };

    path.push("crawler.log");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_default_level_is_kept() {
        let filter = build_filter(false, Some("trace")).unwrap().to_string();

        assert!(filter.contains("trace"));
        assert!(!filter.contains("warn"));
        assert!(filter.contains("bfs_crawler=info"));
    }

    #[test]
    fn other_targets_default_to_warn() {
        let filter = build_filter(true, None).unwrap().to_string();

        assert!(filter.contains("warn"));
        assert!(filter.contains("bfs_crawler=debug"));
    }
}
