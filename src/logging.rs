//! Logger setup.
//!
//! Verbosity comes from `DAILYWORK_LOG` (env_logger filter syntax), default
//! `warn`. The terminal UI owns the screen, so it logs to a file instead.

use std::fs::{self, OpenOptions};
use std::path::Path;

use env_logger::{Builder, Env, Target};

use crate::error::Result;

pub const LOG_ENV: &str = "DAILYWORK_LOG";
pub const LOG_FILE: &str = "dailywork.log";

fn builder() -> Builder {
    Builder::from_env(Env::new().filter_or(LOG_ENV, "warn"))
}

/// Logs to stderr. Safe to call more than once.
pub fn init_cli() {
    let _ = builder().target(Target::Stderr).try_init();
}

/// Logs to `dailywork.log` inside `dir`, appending.
pub fn init_file(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))?;
    let _ = builder()
        .target(Target::Pipe(Box::new(file)))
        .write_style(env_logger::WriteStyle::Never)
        .try_init();
    Ok(())
}
