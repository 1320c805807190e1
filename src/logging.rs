use std::io;
use std::path::PathBuf;

use time::macros::format_description;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;

const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Scripts own the terminal while the editor runs, so diagnostics go to a
/// log file instead of stderr. `BADRED_LOG_DIR` overrides the location;
/// `RUST_LOG` filters as usual.
pub fn init_logging() -> io::Result<()> {
    let log_dir = log_dir()?;
    std::fs::create_dir_all(&log_dir)?;

    let appender = tracing_appender::rolling::never(&log_dir, format!("{}.log", APP_NAME));
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_timer(timer)
        .with_writer(appender)
        .with_ansi(false)
        .init();

    Ok(())
}

fn log_dir() -> io::Result<PathBuf> {
    if let Some(dir) = std::env::var_os("BADRED_LOG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let base = platform_state_dir().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "no home directory to place the log file under; set BADRED_LOG_DIR",
        )
    })?;
    Ok(base.join(APP_NAME).join("logs"))
}

fn platform_state_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        return std::env::var_os("LOCALAPPDATA").map(PathBuf::from);
    }
    if cfg!(target_os = "macos") {
        return std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join("Library").join("Logs"));
    }
    std::env::var_os("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".local").join("state"))
        })
}
