use std::path::{Path, PathBuf};
use std::time::Duration;
use reqwest::Client;
use crate::error::{Error, Result};

/// Bytes written per cancellation check while streaming a body.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone)]
pub struct DownloadConfiguration {
    pub chunk_size: usize,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub user_agent: Option<String>,
    /// Base directory for relative destinations.
    pub output_dir: Option<PathBuf>,
    pub create_dir: bool,
    pub overwrite_existing: bool,
    /// Let `BatchDownloader::finish` turn Ctrl-C into a cancellation.
    pub handle_interrupt: bool,
}

pub struct DownloadConfigurationBuilder {
    config: DownloadConfiguration,
}

impl DownloadConfigurationBuilder {
    fn new(config: DownloadConfiguration) -> Self {
        Self {
            config
        }
    }

    pub fn set_chunk_size(mut self, chunk_size: usize) -> DownloadConfigurationBuilder {
        self.config.chunk_size = chunk_size;
        self
    }

    pub fn set_timeout(mut self, timeout: Duration) -> DownloadConfigurationBuilder {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn set_connect_timeout(mut self, connect_timeout: Duration) -> DownloadConfigurationBuilder {
        self.config.connect_timeout = Some(connect_timeout);
        self
    }

    pub fn set_user_agent(mut self, user_agent: impl Into<String>) -> DownloadConfigurationBuilder {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    pub fn set_output_dir(mut self, output_dir: impl Into<PathBuf>) -> DownloadConfigurationBuilder {
        self.config.output_dir = Some(output_dir.into());
        self
    }

    pub fn create_dir(mut self, create: bool) -> DownloadConfigurationBuilder {
        self.config.create_dir = create;
        self
    }

    pub fn set_overwrite_existing(mut self, overwrite_existing: bool) -> DownloadConfigurationBuilder {
        self.config.overwrite_existing = overwrite_existing;
        self
    }

    pub fn set_handle_interrupt(mut self, handle_interrupt: bool) -> DownloadConfigurationBuilder {
        self.config.handle_interrupt = handle_interrupt;
        self
    }

    pub fn build(self) -> Result<DownloadConfiguration> {
        self.validate()
    }

    fn validate(self) -> Result<DownloadConfiguration> {
        if self.config.chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be greater than zero".to_string()));
        }

        if self.config.timeout == Some(Duration::ZERO) {
            return Err(Error::Configuration("timeout must be greater than zero".to_string()));
        }

        Ok(self.config)
    }
}

impl DownloadConfiguration {
    pub fn new() -> DownloadConfigurationBuilder {
        DownloadConfigurationBuilder::new(DownloadConfiguration::default())
    }

    /// Resolves a destination against `output_dir`. Absolute paths are kept as they are.
    pub fn resolve_output_file(&self, output_file: impl AsRef<Path>) -> PathBuf {
        let output_file = output_file.as_ref();
        match &self.output_dir {
            Some(output_dir) if output_file.is_relative() => output_dir.join(output_file),
            _ => output_file.to_path_buf(),
        }
    }

    pub fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        builder
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))
    }
}

impl Default for DownloadConfiguration {
    fn default() -> Self {
        DownloadConfiguration {
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: None,
            connect_timeout: None,
            user_agent: None,
            output_dir: None,
            create_dir: true,
            overwrite_existing: true,
            handle_interrupt: true,
        }
    }
}
