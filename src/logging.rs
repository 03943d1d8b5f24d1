//! Logging setup: colored console output plus an optional plain log file

use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Logger writing colored lines to the console and plain lines to an
/// optional log file. The file always receives every level; the console is
/// gated by the verbose flag.
pub struct LeapLogger {
    console_level: LevelFilter,
    file_writer: Option<Mutex<Box<dyn Write + Send>>>,
}

impl LeapLogger {
    pub fn new(verbose: bool, log_file: Option<&Path>) -> Result<Self, std::io::Error> {
        let console_level = if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };

        let file_writer = match log_file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(path)?;
                Some(Mutex::new(Box::new(file) as Box<dyn Write + Send>))
            }
            None => None,
        };

        Ok(LeapLogger {
            console_level,
            file_writer,
        })
    }

    fn level_tag(level: Level) -> ColoredString {
        match level {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN".yellow().bold(),
            Level::Info => "INFO".green().bold(),
            Level::Debug => "DEBUG".blue().bold(),
            Level::Trace => "TRACE".purple().bold(),
        }
    }
}

impl log::Log for LeapLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.file_writer.is_some() || metadata.level() <= self.console_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let level = record.level();

        if level <= self.console_level {
            let line = format!(
                "[{} {} {}] {}",
                timestamp.to_string().dimmed(),
                Self::level_tag(level),
                record.target().cyan(),
                record.args()
            );
            if level <= Level::Warn {
                eprintln!("{}", line);
            } else {
                println!("{}", line);
            }
        }

        if let Some(ref file_writer) = self.file_writer {
            if let Ok(mut writer) = file_writer.lock() {
                let _ = writeln!(
                    writer,
                    "[{} {} {}] {}",
                    timestamp,
                    level,
                    record.target(),
                    record.args()
                );
            }
        }
    }

    fn flush(&self) {
        if let Some(ref file_writer) = self.file_writer {
            if let Ok(mut writer) = file_writer.lock() {
                let _ = writer.flush();
            }
        }
    }
}

/// Install the logger as the global logging facade.
pub fn init_logger(verbose: bool, log_file: Option<&Path>) -> Result<(), anyhow::Error> {
    let logger = LeapLogger::new(verbose, log_file)
        .map_err(|e| anyhow::anyhow!("Failed to create logger: {}", e))?;

    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| anyhow::anyhow!("Failed to set logger: {}", e))?;
    log::set_max_level(LevelFilter::Debug);

    Ok(())
}

/// Log a terminal-coordinate change on one transcript end.
pub fn log_boundary_change(transcript_id: &str, end_label: &str, original: u64, new_pos: u64) {
    log::debug!(
        target: "leap::extend",
        "EXTEND: Transcript={}, End={}, {}->{} ({} bp)",
        transcript_id,
        end_label,
        original,
        new_pos,
        original.abs_diff(new_pos)
    );
}

/// Note an empty stage result; empty outputs are written, never a crash.
pub fn log_empty_result(stage: &str, what: &str) {
    log::warn!(
        target: "leap::empty",
        "{}: no {} produced; writing empty output",
        stage,
        what
    );
}
