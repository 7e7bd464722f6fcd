//! Logging setup and the `output.txt` run summary

use color_eyre::eyre::{Result, WrapErr};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::{
    fmt::format::Writer, fmt::layer, fmt::time::FormatTime, layer::SubscriberExt,
    util::SubscriberInitExt, Registry,
};

/// UTC wall-clock time of day, HH:MM:SS.
struct UtcClock;

fn write_time_of_day(w: &mut impl fmt::Write, since_epoch: u64) -> fmt::Result {
    let of_day = since_epoch % 86_400;
    write!(w, "{:02}:{:02}:{:02}", of_day / 3600, of_day / 60 % 60, of_day % 60)
}

impl FormatTime for UtcClock {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        write_time_of_day(w, since_epoch)
    }
}

/// Install the global subscriber.
///
/// Records go to `log_path` without colour codes, or to stdout when no path is
/// given or the file cannot be created.
pub fn init_logging(log_path: Option<&Path>) {
    let log_file = log_path.and_then(|path| match File::create(path) {
        Ok(file) => Some((path, file)),
        Err(err) => {
            eprintln!("cannot create log file {}: {err}; logging to stdout", path.display());
            None
        }
    });
    let base = layer().with_timer(UtcClock).with_target(false);
    match log_file {
        Some((path, file)) => {
            Registry::default()
                .with(base.with_writer(Mutex::new(file)).with_ansi(false))
                .init();
            info!("logging to {}", path.display());
        }
        None => Registry::default()
            .with(base.with_writer(std::io::stdout))
            .init(),
    }
}

const RULE: &str = "------------------------------------------------------------";
const DOUBLE_RULE: &str = "============================================================";

/// Human-readable record of one run, kept next to the result tables
pub struct RunSummary {
    file: File,
}

impl RunSummary {
    pub fn create(path: &Path) -> Result<Self> {
        let mut file = File::create(path)
            .wrap_err_with(|| format!("Unable to create summary file: {}", path.display()))?;
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        writeln!(file, "{DOUBLE_RULE}")?;
        writeln!(file, "Started at {} s since the Unix epoch", since_epoch.as_secs())?;
        Ok(RunSummary { file })
    }

    pub fn ranges(&mut self, temperatures: (f64, f64), pressures: (f64, f64)) -> Result<()> {
        writeln!(self.file, "{RULE}")?;
        writeln!(
            self.file,
            " Desired T range:    {:6.2} to {:6.2}  K",
            temperatures.0, temperatures.1
        )?;
        writeln!(
            self.file,
            " Desired P range:    {:6.2} to {:6.2}  GPa",
            pressures.0, pressures.1
        )?;
        writeln!(self.file, "{RULE}")?;
        Ok(())
    }

    pub fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.file, "{text}")?;
        Ok(())
    }

    pub fn finish(mut self, elapsed_seconds: f64) -> Result<()> {
        writeln!(self.file, "{RULE}")?;
        writeln!(self.file, "Total elapsed time is: {:8.2} seconds", elapsed_seconds)?;
        writeln!(self.file, "{DOUBLE_RULE}")?;
        Ok(())
    }
}
