/*!
# Swapchain Bridge

Presents images rendered by a Direct3D 12 style producer (vkd3d) through a
Vulkan-style presentation API.

The producer only ever sees a ring of back buffers it can render into. Each
`present` blits the current back buffer into an acquired swapchain image and
queues it for display, recreating the swapchain when the surface changes.

## Architecture

- **SurfaceManager**: Window surface ownership
- **SwapchainController**: Format / mode / extent negotiation, acquire and present
- **BackBufferRing**: Producer-visible images, their memory and per-buffer command state
- **FramePresentationPipeline**: The per-frame blit, submit and present state machine
- **Presenter**: Producer-facing swap chain facade

Backends implement the `PresentDevice` and `ResourceBridge` traits.
*/

// Internal modules
mod error;
pub mod log;
pub mod config;
pub mod device;
pub mod presenter;

// Main bridge namespace module
pub mod bridge {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration
    pub use crate::config::PresenterConfig;

    // Producer-facing facade
    pub use crate::presenter::Presenter;

    // Logging sub-module (types and functions, macros are exported at the crate root)
    pub mod log {
        pub use crate::log::{
            Logger, LogEntry, LogSeverity, DefaultLogger, set_logger, reset_logger, log,
            log_detailed,
        };
    }

    // Backend seam
    pub mod device {
        pub use crate::device::*;
    }

    // Presenter components
    pub mod presenter {
        pub use crate::presenter::*;
    }
}
