//! File logging.
//!
//! env_logger writes into an unbounded channel. A pingora background service
//! drains the channel into the configured log file.

use std::{
    io::{self, Write},
    path::Path,
    str::FromStr,
};

use async_trait::async_trait;
use env_logger::Builder;
use log::LevelFilter;
use pingora::{
    server::{ListenFds, ShutdownWatch},
    services::Service,
};
use tokio::{
    fs::{create_dir_all, metadata, File, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
};

use crate::config;

pub struct AsyncWriter {
    sender: UnboundedSender<Vec<u8>>,
}

impl Write for AsyncWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sender
            .send(buf.to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct Logger {
    sender: UnboundedSender<Vec<u8>>,
    receiver: UnboundedReceiver<Vec<u8>>,
    config: config::Log,
}

impl Logger {
    pub fn new(config: config::Log) -> Self {
        let (sender, receiver) = unbounded_channel::<Vec<u8>>();
        Self {
            sender,
            receiver,
            config,
        }
    }

    fn create_async_writer(&self) -> AsyncWriter {
        AsyncWriter {
            sender: self.sender.clone(),
        }
    }

    /// Configured level, `info` when it does not parse
    pub fn level(&self) -> LevelFilter {
        LevelFilter::from_str(&self.config.level).unwrap_or_else(|_| {
            eprintln!("Unknown log level '{}', using info", self.config.level);
            LevelFilter::Info
        })
    }

    pub fn init_env_logger(&self) {
        let writer = self.create_async_writer();
        Builder::from_env(env_logger::Env::default())
            .filter(None, self.level())
            .target(env_logger::Target::Pipe(Box::new(writer)))
            .init();
    }

    async fn open(&self) -> io::Result<BufWriter<File>> {
        let path = Path::new(&self.config.path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && metadata(parent).await.is_err() {
                create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await?;
        Ok(BufWriter::new(file))
    }
}

#[async_trait]
impl Service for Logger {
    async fn start_service(&mut self, _fds: Option<ListenFds>, mut shutdown: ShutdownWatch) {
        let mut file = match self.open().await {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Failed to open log file {}: {e}", self.config.path);
                return;
            }
        };

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        log::info!("Shutdown signal received, stopping write log");
                        break;
                    }
                },

                data = self.receiver.recv() => {
                    match data {
                        Some(data) => {
                            if let Err(e) = file.write_all(&data).await {
                                eprintln!("Failed to write to log file: {e}");
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        // drain what was logged during shutdown
        while let Ok(data) = self.receiver.try_recv() {
            if let Err(e) = file.write_all(&data).await {
                eprintln!("Failed to write to log file: {e}");
                break;
            }
        }

        if let Err(e) = file.flush().await {
            eprintln!("Failed to flush log file: {e}");
        }
    }

    fn name(&self) -> &'static str {
        "log sync"
    }

    fn threads(&self) -> Option<usize> {
        Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger(level: &str) -> Logger {
        Logger::new(config::Log {
            path: "/tmp/pinglegacy-test/legacy.log".to_string(),
            level: level.to_string(),
        })
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!(logger("debug").level(), LevelFilter::Debug);
        assert_eq!(logger("WARN").level(), LevelFilter::Warn);
        assert_eq!(logger("loud").level(), LevelFilter::Info);
    }

    #[test]
    fn test_writer_forwards_to_channel() {
        let mut logger = logger("info");
        let mut writer = logger.create_async_writer();

        writer.write_all(b"hello\n").unwrap();
        assert_eq!(logger.receiver.try_recv().unwrap(), b"hello\n".to_vec());
    }
}
