use std::sync::Arc;
use crate::error::{Error, Result};
use crate::task::TaskInfo;

/// Receives every task failure that escaped a task body, including panics.
pub type ErrorHandler = Arc<dyn Fn(&TaskInfo, &Error) + Send + Sync>;

#[derive(Clone)]
pub struct PoolConfiguration {
    pub num_workers: usize,
    /// Bound the queue to `num_workers` entries and block `submit` while it is full.
    pub blocking_submit: bool,
    /// Run tasks inline on the submitting thread when there is a single worker.
    pub optimize: bool,
    pub error_handler: Option<ErrorHandler>,
    pub thread_name: String,
    /// Listen for Ctrl-C from `start` until the pool is stopped and cancel the run when it arrives.
    pub handle_interrupt: bool,
}

pub struct PoolConfigurationBuilder {
    config: PoolConfiguration,
}

impl PoolConfigurationBuilder {
    fn new(config: PoolConfiguration) -> Self {
        Self {
            config
        }
    }

    pub fn set_num_workers(mut self, num_workers: usize) -> PoolConfigurationBuilder {
        self.config.num_workers = num_workers;
        self
    }

    pub fn set_blocking_submit(mut self, blocking_submit: bool) -> PoolConfigurationBuilder {
        self.config.blocking_submit = blocking_submit;
        self
    }

    pub fn set_optimize(mut self, optimize: bool) -> PoolConfigurationBuilder {
        self.config.optimize = optimize;
        self
    }

    pub fn set_error_handler<F>(mut self, handler: F) -> PoolConfigurationBuilder
    where
        F: Fn(&TaskInfo, &Error) + Send + Sync + 'static,
    {
        self.config.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn set_thread_name(mut self, thread_name: impl Into<String>) -> PoolConfigurationBuilder {
        self.config.thread_name = thread_name.into();
        self
    }

    pub fn set_handle_interrupt(mut self, handle_interrupt: bool) -> PoolConfigurationBuilder {
        self.config.handle_interrupt = handle_interrupt;
        self
    }

    pub fn build(self) -> Result<PoolConfiguration> {
        self.validate()
    }

    fn validate(self) -> Result<PoolConfiguration> {
        if self.config.num_workers < 1 {
            return Err(Error::Configuration(format!(
                "invalid num_workers: {}",
                self.config.num_workers
            )));
        }

        Ok(self.config)
    }
}

impl PoolConfiguration {
    pub fn new() -> PoolConfigurationBuilder {
        let config = PoolConfiguration {
            num_workers: 1,
            blocking_submit: true,
            optimize: true,
            error_handler: None,
            thread_name: "download-worker".to_string(),
            handle_interrupt: false,
        };
        PoolConfigurationBuilder::new(config)
    }

    pub fn with_workers(num_workers: usize) -> Result<PoolConfiguration> {
        PoolConfiguration::new().set_num_workers(num_workers).build()
    }

    /// Whether `start` selects the inline strategy instead of spawning workers.
    pub fn runs_inline(&self) -> bool {
        self.num_workers == 1 && self.optimize
    }

    /// Capacity of the task queue, `None` for unbounded.
    pub fn queue_capacity(&self) -> Option<usize> {
        match self.blocking_submit {
            true => Some(self.num_workers),
            false => None,
        }
    }
}
