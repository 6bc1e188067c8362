use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

/// Append-only log file that is reopened if something deletes it while the
/// process is running.
struct ReopeningLogFile {
    path: PathBuf,
    file: File,
}

impl ReopeningLogFile {
    fn open(path: PathBuf) -> io::Result<Self> {
        let file = open_append(&path)?;
        Ok(Self { path, file })
    }
}

impl Write for ReopeningLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.path.exists() {
            self.file = open_append(&self.path)?;
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Keep only the newer half of a log that grew past `max_log_size`, starting
/// at the first complete line.
fn trim_log_file_if_oversized(log_path: &Path, max_log_size: u64) {
    let too_big = std::fs::metadata(log_path).is_ok_and(|meta| meta.len() > max_log_size);
    if !too_big {
        return;
    }
    let Ok(contents) = std::fs::read(log_path) else {
        return;
    };

    let midpoint = contents.len() / 2;
    let tail = &contents[midpoint..];
    let tail = tail
        .iter()
        .position(|&byte| byte == b'\n')
        .map_or(tail, |newline| &tail[newline + 1..]);

    if let Err(error) = std::fs::write(log_path, tail) {
        eprintln!("warning: cannot trim log file {}: {error}", log_path.display());
    }
}

fn log_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("appcast")
        .build()
}

/// Log to `log_path`, and to stderr as well when `verbose` is set.
pub fn init_logging(log_path: &Path, verbose: bool, max_log_size: u64) {
    trim_log_file_if_oversized(log_path, max_log_size);

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::with_capacity(2);
    if verbose {
        loggers.push(TermLogger::new(
            LevelFilter::Debug,
            log_config(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    match ReopeningLogFile::open(log_path.to_path_buf()) {
        Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Debug, log_config(), file)),
        Err(error) => eprintln!("warning: cannot open log file {}: {error}", log_path.display()),
    }

    if !loggers.is_empty() && CombinedLogger::init(loggers).is_err() {
        eprintln!("warning: a logger was already installed");
    }

    set_debug_logging(verbose);
    log::debug!("Logging to {}", log_path.display());
}

pub fn set_debug_logging(enabled: bool) {
    log::set_max_level(if enabled {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::{ReopeningLogFile, set_debug_logging, trim_log_file_if_oversized};

    #[test]
    fn log_file_is_reopened_after_deletion() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("logs").join("appcast.log");
        let mut file =
            ReopeningLogFile::open(log_path.clone()).expect("log file should be created");

        file.write_all(b"first line\n")
            .expect("initial write should succeed");
        std::fs::remove_file(&log_path).expect("log file should be removable");
        file.write_all(b"second line\n")
            .expect("write after deletion should recreate the file");

        let contents = std::fs::read_to_string(&log_path).expect("log file should be readable");
        assert_eq!(contents, "second line\n");
    }

    #[test]
    fn oversized_log_keeps_whole_lines_from_the_newer_half() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("appcast.log");
        std::fs::write(&log_path, "line-1\nline-2\nline-3\nline-4\nline-5\n")
            .expect("log file should be written");

        trim_log_file_if_oversized(&log_path, 10);

        let trimmed = std::fs::read_to_string(&log_path).expect("log file should be readable");
        assert_eq!(trimmed, "line-4\nline-5\n");
    }

    #[test]
    fn small_log_is_left_alone() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("appcast.log");
        std::fs::write(&log_path, "line-1\n").expect("log file should be written");

        trim_log_file_if_oversized(&log_path, 1024);

        let contents = std::fs::read_to_string(&log_path).expect("log file should be readable");
        assert_eq!(contents, "line-1\n");
    }

    #[test]
    fn debug_flag_switches_global_level() {
        set_debug_logging(true);
        assert_eq!(log::max_level(), log::LevelFilter::Debug);

        set_debug_logging(false);
        assert_eq!(log::max_level(), log::LevelFilter::Info);
    }
}
