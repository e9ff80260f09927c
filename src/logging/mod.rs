use std::io::{self, Write};

use async_trait::async_trait;
use env_logger::Builder;
use log::LevelFilter;
use pingora::{
    server::{ListenFds, ShutdownWatch},
    services::Service,
};
use tokio::{
    fs::{create_dir_all, metadata, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
};

use crate::config;

/// Log level for the configured debug flag. `RUST_LOG` still overrides it.
pub fn level_filter(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn builder(level: LevelFilter) -> Builder {
    let mut builder = Builder::new();
    builder
        .filter(None, level)
        .parse_env(env_logger::Env::default());
    builder
}

/// Log to stderr when no log file is configured.
pub fn init_stderr_logger(level: LevelFilter) {
    builder(level).init();
}

pub struct AsyncWriter {
    sender: UnboundedSender<Vec<u8>>,
}

impl Write for AsyncWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let data = buf.to_vec();
        self.sender.send(data).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// File sink: env_logger writes into a channel, this service drains it into the file.
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

    pub fn init_env_logger(&self, level: LevelFilter) {
        let writer = self.create_async_writer();
        builder(level)
            .target(env_logger::Target::Pipe(Box::new(writer)))
            .init();
    }

    async fn open_log_file(&self) -> io::Result<BufWriter<tokio::fs::File>> {
        let log_file_path = &self.config.path;

        if let Some(parent) = std::path::Path::new(log_file_path).parent() {
            if !parent.as_os_str().is_empty() && metadata(parent).await.is_err() {
                create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(log_file_path)
            .await?;
        Ok(BufWriter::new(file))
    }
}

#[async_trait]
impl Service for Logger {
    async fn start_service(&mut self, _fds: Option<ListenFds>, mut shutdown: ShutdownWatch) {
        let mut file = match self.open_log_file().await {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", self.config.path, e);
                return;
            }
        };

        loop {
            tokio::select! {
                biased;
                // Shutdown signal handling
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
                                eprintln!("Failed to write to log file: {}", e);
                            }
                        }
                        None => {
                            break;
                        }
                    }
                }
            }
        }

        // drain what was logged before shutdown
        while let Ok(data) = self.receiver.try_recv() {
            if file.write_all(&data).await.is_err() {
                break;
            }
        }

        if let Err(e) = file.flush().await {
            eprintln!("Failed to flush log file: {}", e);
        }
    }

    fn name(&self) -> &'static str {
        "log sync"
    }

    fn threads(&self) -> Option<usize> {
        Some(1)
    }
}
