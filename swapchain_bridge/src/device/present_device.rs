/// PresentDevice trait - the presentation API as seen by the presenter components
///
/// Backends (Vulkan via ash, the test mock) implement this trait. Handles are
/// plain `Copy` values; ownership of the underlying objects is tracked by the
/// components that create them, never by the handles.

use std::fmt::Debug;
use std::time::Duration;

use crate::device::{
    DeviceInfo, Extent2D, Format, ImageDesc, ImageLayout, MemoryRequirements, MemoryType,
    PresentMode, SurfaceCapabilities, SurfaceFormat, SurfaceStatus, WindowTarget,
};
use crate::error::Result;

/// Swapchain creation parameters after negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainCreateDesc {
    pub format: SurfaceFormat,
    pub present_mode: PresentMode,
    pub image_extent: Extent2D,
    pub min_image_count: u32,
}

/// Presentation API device
pub trait PresentDevice: Send + Sync {
    type Queue: Copy + Debug;
    type Adapter: Copy + Debug;
    type Surface: Copy + Debug;
    type Swapchain: Copy + Debug;
    type Image: Copy + PartialEq + Debug;
    type ImageView: Copy + Debug;
    type Semaphore: Copy + PartialEq + Debug;
    type Fence: Copy + PartialEq + Debug;
    type Memory: Copy + Debug;
    type CommandPool: Copy + Debug;
    type CommandBuffer: Copy + Debug;

    /// Queue and adapter this device presents with
    fn device_info(&self) -> DeviceInfo<Self::Queue, Self::Adapter>;

    /// Block until all GPU work on the device has completed
    fn wait_idle(&self) -> Result<()>;

    // ===== SURFACE =====

    fn create_surface(&self, target: &WindowTarget) -> Result<Self::Surface>;

    fn destroy_surface(&self, surface: Self::Surface);

    fn surface_capabilities(&self, surface: Self::Surface) -> Result<SurfaceCapabilities>;

    /// Supported formats; formats the bridge cannot express are skipped
    fn surface_formats(&self, surface: Self::Surface) -> Result<Vec<SurfaceFormat>>;

    fn surface_present_modes(&self, surface: Self::Surface) -> Result<Vec<PresentMode>>;

    // ===== SWAPCHAIN =====

    fn create_swapchain(
        &self,
        surface: Self::Surface,
        desc: &SwapchainCreateDesc,
    ) -> Result<Self::Swapchain>;

    fn destroy_swapchain(&self, swapchain: Self::Swapchain);

    fn swapchain_images(&self, swapchain: Self::Swapchain) -> Result<Vec<Self::Image>>;

    fn create_image_view(&self, image: Self::Image, format: Format) -> Result<Self::ImageView>;

    fn destroy_image_view(&self, view: Self::ImageView);

    /// Acquire the next presentable image, signaling `signal` once it is usable
    ///
    /// A timeout is reported as `Error::DeviceLost`. `OutOfDate` carries no
    /// valid index.
    fn acquire_next_image(
        &self,
        swapchain: Self::Swapchain,
        signal: Self::Semaphore,
        timeout: Duration,
    ) -> Result<(u32, SurfaceStatus)>;

    /// Queue `image_index` for presentation after `wait` is signaled
    fn queue_present(
        &self,
        swapchain: Self::Swapchain,
        image_index: u32,
        wait: Self::Semaphore,
    ) -> Result<SurfaceStatus>;

    // ===== SYNCHRONIZATION =====

    fn create_semaphore(&self) -> Result<Self::Semaphore>;

    fn destroy_semaphore(&self, semaphore: Self::Semaphore);

    fn create_fence(&self, signaled: bool) -> Result<Self::Fence>;

    fn destroy_fence(&self, fence: Self::Fence);

    /// Wait for `fence`; expiry is reported as `Error::DeviceLost`
    fn wait_for_fence(&self, fence: Self::Fence, timeout: Duration) -> Result<()>;

    fn reset_fence(&self, fence: Self::Fence) -> Result<()>;

    // ===== BACK BUFFER RESOURCES =====

    fn create_image(&self, desc: &ImageDesc) -> Result<Self::Image>;

    fn destroy_image(&self, image: Self::Image);

    fn image_memory_requirements(&self, image: Self::Image) -> MemoryRequirements;

    /// Memory types of the adapter, indexed like `memory_type_bits`
    fn memory_types(&self) -> Vec<MemoryType>;

    /// Dedicated allocation of `size` bytes from `memory_type` for `image`
    fn allocate_image_memory(
        &self,
        image: Self::Image,
        size: u64,
        memory_type: u32,
    ) -> Result<Self::Memory>;

    fn free_memory(&self, memory: Self::Memory);

    fn bind_image_memory(&self, image: Self::Image, memory: Self::Memory) -> Result<()>;

    fn create_command_pool(&self) -> Result<Self::CommandPool>;

    fn destroy_command_pool(&self, pool: Self::CommandPool);

    fn reset_command_pool(&self, pool: Self::CommandPool) -> Result<()>;

    /// Allocate one primary command buffer; freed with its pool
    fn allocate_command_buffer(&self, pool: Self::CommandPool) -> Result<Self::CommandBuffer>;

    // ===== RECORDING AND SUBMISSION =====

    /// Begin one-time-submit recording
    fn begin_command_buffer(&self, cmd: Self::CommandBuffer) -> Result<()>;

    fn end_command_buffer(&self, cmd: Self::CommandBuffer) -> Result<()>;

    /// Full-subresource color layout transition of `image`
    fn cmd_image_barrier(
        &self,
        cmd: Self::CommandBuffer,
        image: Self::Image,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    );

    /// Nearest-filtered blit of `src` (full `src_extent`, transfer-src layout)
    /// into `dst` (full `dst_extent`, transfer-dst layout)
    fn cmd_blit_image(
        &self,
        cmd: Self::CommandBuffer,
        src: Self::Image,
        src_extent: Extent2D,
        dst: Self::Image,
        dst_extent: Extent2D,
    );

    /// Submit `cmd` on the shared queue, waiting `wait` at all-commands,
    /// signaling `signal` and `fence` on completion
    fn queue_submit(
        &self,
        cmd: Self::CommandBuffer,
        wait: Self::Semaphore,
        signal: Self::Semaphore,
        fence: Self::Fence,
    ) -> Result<()>;
}
