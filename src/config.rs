/// Settings for a dedicated worker pool built by
/// [`RayonDispatcher::with_config`](crate::dispatcher::RayonDispatcher::with_config).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads; `0` lets rayon pick.
    pub num_threads: usize,
    /// Worker threads are named `{prefix}-{index}`.
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            thread_name_prefix: "dispatch-worker".to_owned(),
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

/// Per-queue settings.
///
/// The label tags the queue's log events and names its alarm thread
/// (`{label}-alarm`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub label: String,
}

impl QueueConfig {
    pub(crate) const SERIAL: &'static str = "serial";
    pub(crate) const CONCURRENT: &'static str = "concurrent";
    pub(crate) const MAIN: &'static str = "main";

    /// Config with the given label.
    #[must_use]
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::labeled(Self::SERIAL)
    }
}
