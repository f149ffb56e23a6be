use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "localchat=info";

/// Where log output goes
pub enum LogTarget {
    /// Append to a file; the TUI owns the terminal
    File(PathBuf),
    Stderr,
}

/// Default log file: `<cache_dir>/localchat/localchat.log`
pub fn default_log_file() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?;

    Ok(cache_dir.join("localchat").join("localchat.log"))
}

/// Build the log filter. `RUST_LOG` replaces the built-in default, and
/// `--log-level` directives are layered on top of either.
fn filter(rust_log: Option<&str>, log_level: Option<&str>) -> Result<EnvFilter> {
    let mut filter = rust_log
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE));

    if let Some(level) = log_level {
        for directive in level.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            let directive: Directive = directive
                .parse()
                .map_err(|e| anyhow!("Invalid log directive {:?}: {}", directive, e))?;
            filter = filter.add_directive(directive);
        }
    }

    Ok(filter)
}

pub fn init(target: LogTarget, log_level: Option<&str>) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let builder = tracing_subscriber::fmt().with_env_filter(filter(rust_log.as_deref(), log_level)?);

    match target {
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow!("Failed to install logger: {}", e))?;
        }
        LogTarget::Stderr => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow!("Failed to install logger: {}", e))?;
        }
    }

    Ok(())
}
