/// Presenter components, from the window surface up to the producer facade

pub mod desc;
pub mod resource_bridge;
pub mod surface;
pub mod swapchain;
pub mod back_buffer;
pub mod pipeline;
pub mod presenter;

pub use desc::*;
pub use resource_bridge::*;
pub use surface::SurfaceManager;
pub use swapchain::{
    pick_format, pick_image_count, pick_image_extent, pick_present_mode, SwapImage,
    SwapchainController, SyncPair,
};
pub use back_buffer::{BackBuffer, BackBufferRing};
pub use pipeline::FramePresentationPipeline;
pub use presenter::Presenter;
