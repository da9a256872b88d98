//! Error types for the swapchain bridge
//!
//! Recoverable surface conditions (suboptimal / out-of-date swapchains) are
//! not errors: they travel as [`SurfaceStatus`](crate::device::SurfaceStatus)
//! values and are handled inside the pipeline. Everything here reaches the
//! caller.

use std::fmt;

/// Result type for swapchain bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Swapchain bridge errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan call failure, producer API failure)
    BackendError(String),

    /// No compatible memory type could satisfy an allocation
    OutOfMemory,

    /// Invalid resource handle or resource creation failure
    InvalidResource(String),

    /// Construction of a presenter object failed
    InitializationFailed(String),

    /// Caller passed an out-of-range or malformed argument
    InvalidArgument(String),

    /// None of the candidate formats is supported by the surface
    UnsupportedFormat(String),

    /// Entry point accepted but not implemented (present regions, gamma)
    NotImplemented(&'static str),

    /// The surface stayed out of date after the bounded number of recreations
    SurfaceLost(String),

    /// A bounded GPU wait expired, or the device reported loss
    DeviceLost(String),

    /// A dynamically resolved entry point is missing
    CapabilityUnavailable(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            Error::NotImplemented(what) => write!(f, "Not implemented: {}", what),
            Error::SurfaceLost(msg) => write!(f, "Surface lost: {}", msg),
            Error::DeviceLost(msg) => write!(f, "Device lost: {}", msg),
            Error::CapabilityUnavailable(name) => write!(f, "Capability unavailable: {}", name),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
