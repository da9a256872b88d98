//! Presenter configuration

use std::time::Duration;

/// Tuning knobs for a presenter
///
/// Every blocking point of the present path is bounded by one of these
/// values; nothing waits forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenterConfig {
    /// Maximum number of swapchain recreations a single `present` call may
    /// perform while the surface keeps reporting out-of-date
    pub max_surface_retries: u32,

    /// Timeout for acquiring the next swapchain image
    pub acquire_timeout: Duration,

    /// Timeout for waiting on a back buffer's fence
    pub fence_timeout: Duration,
}

impl PresenterConfig {
    /// Default number of recreations per present call
    pub const DEFAULT_MAX_SURFACE_RETRIES: u32 = 5;

    /// Default acquire / fence timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn with_max_surface_retries(mut self, retries: u32) -> Self {
        self.max_surface_retries = retries;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn with_fence_timeout(mut self, timeout: Duration) -> Self {
        self.fence_timeout = timeout;
        self
    }
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            max_surface_retries: Self::DEFAULT_MAX_SURFACE_RETRIES,
            acquire_timeout: Self::DEFAULT_TIMEOUT,
            fence_timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}
