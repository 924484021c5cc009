//! File writer running on its own thread.

use crate::error::{LoggingError, Result};
use crate::log_message::LogMessage;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::thread;

pub(crate) struct LogWriter {
    out: BufWriter<File>,
}

impl LogWriter {
    /// Opens (or creates) the log file in append mode.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    fn write(&mut self, message: &LogMessage) {
        let written = self
            .out
            .write_all(message.format().as_bytes())
            .and_then(|_| self.out.flush());
        if let Err(e) = written {
            eprintln!("log write failed: {}", e);
        }
    }

    /// Drains the channel until every sender has been dropped.
    pub fn run(mut self, receiver: Receiver<LogMessage>) {
        for message in receiver {
            self.write(&message);
        }
    }
}

/// Opens `path` and starts a writer thread consuming `receiver`.
pub(crate) fn spawn_writer(path: &Path, receiver: Receiver<LogMessage>) -> Result<()> {
    let writer = LogWriter::open(path)?;
    thread::Builder::new()
        .name("log-writer".to_string())
        .spawn(move || writer.run(receiver))
        .map_err(|e| LoggingError::Writer(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_level::LogLevel;
    use std::fs;
    use std::sync::mpsc::channel;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("writer.log");

        assert!(LogWriter::open(&path).is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_open_fails_for_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("writer.log");

        assert!(matches!(LogWriter::open(&path), Err(LoggingError::Io(_))));
    }

    #[test]
    fn test_writer_thread_drains_channel() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("writer.log");
        let (sender, receiver) = channel();

        spawn_writer(&path, receiver).unwrap();
        sender
            .send(LogMessage::new(LogLevel::Info, Some("Encoder"), "packet out"))
            .unwrap();
        drop(sender);
        thread::sleep(Duration::from_millis(100));

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("[Encoder]: packet out"));
    }
}
