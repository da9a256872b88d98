/// Plain data types shared by the backend seam and the presenter components

use bitflags::bitflags;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};

use crate::error::{Error, Result};

/// 2D extent in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Clamp each dimension into `[min, max]`
    pub fn clamp(self, min: Extent2D, max: Extent2D) -> Self {
        Self {
            width: self.width.clamp(min.width, max.width.max(min.width)),
            height: self.height.clamp(min.height, max.height.max(min.height)),
        }
    }
}

/// Presentation-side image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Format {
    R8G8B8A8_UNORM,
    B8G8R8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_SRGB,
    A2B10G10R10_UNORM_PACK32,
    A2R10G10B10_UNORM_PACK32,
    R16G16B16A16_SFLOAT,
}

/// Color space of a surface format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    SrgbNonlinear,
    ExtendedSrgbLinear,
    Hdr10St2084,
}

/// Format + color space pair, as reported by the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceFormat {
    pub format: Format,
    pub color_space: ColorSpace,
}

impl SurfaceFormat {
    pub const fn srgb_nonlinear(format: Format) -> Self {
        Self { format, color_space: ColorSpace::SrgbNonlinear }
    }
}

/// Policy governing when a presented image becomes visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentMode {
    /// No vsync, tearing allowed
    Immediate,
    /// Vsync, newest image replaces the queued one
    Mailbox,
    /// Vsync, always available
    Fifo,
    /// Vsync unless the frame is late
    FifoRelaxed,
}

impl PresentMode {
    /// The mode every conforming implementation must support
    pub const GUARANTEED: PresentMode = PresentMode::Fifo;
}

/// Surface limits reported by the presentation API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    /// 0 means no upper limit
    pub max_image_count: u32,
    /// `None` when the surface size is determined by the swapchain extent
    pub current_extent: Option<Extent2D>,
    pub min_image_extent: Extent2D,
    pub max_image_extent: Extent2D,
}

/// Outcome of an acquire or present that did not hard-fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStatus {
    /// Image matches the surface exactly
    Optimal,
    /// Usable, but the swapchain should be recreated
    Suboptimal,
    /// Unusable; the swapchain must be recreated before the next acquire
    OutOfDate,
}

/// Image layouts used by the present blit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    Undefined,
    TransferSrc,
    TransferDst,
    PresentSrc,
}

bitflags! {
    /// Image usage flags for back buffer creation
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const COLOR_ATTACHMENT = 1 << 0;
        const SAMPLED          = 1 << 1;
        const TRANSFER_SRC     = 1 << 2;
        const TRANSFER_DST     = 1 << 3;
        const STORAGE          = 1 << 4;
    }
}

bitflags! {
    /// Memory type property flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryPropertyFlags: u32 {
        const DEVICE_LOCAL  = 1 << 0;
        const HOST_VISIBLE  = 1 << 1;
        const HOST_COHERENT = 1 << 2;
        const HOST_CACHED   = 1 << 3;
    }
}

/// 2D single-mip, single-layer image description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    pub extent: Extent2D,
    pub format: Format,
    pub usage: ImageUsage,
}

/// Memory requirements of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRequirements {
    pub size: u64,
    /// Bit `i` set means memory type `i` is compatible
    pub memory_type_bits: u32,
}

/// One memory type of the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub property_flags: MemoryPropertyFlags,
}

/// Queue / adapter binding supplied by the device provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo<Q, A> {
    pub queue_family: u32,
    pub queue: Q,
    pub adapter: A,
}

/// Raw handles of the window a surface is created for
#[derive(Debug, Clone, Copy)]
pub struct WindowTarget {
    pub display: RawDisplayHandle,
    pub window: RawWindowHandle,
}

impl WindowTarget {
    pub fn new(display: RawDisplayHandle, window: RawWindowHandle) -> Self {
        Self { display, window }
    }

    /// Capture the raw handles of any windowing-library window
    pub fn from_window<W>(window: &W) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + ?Sized,
    {
        let display = window
            .display_handle()
            .map_err(|e| Error::InitializationFailed(format!("Display handle unavailable: {}", e)))?
            .as_raw();
        let window = window
            .window_handle()
            .map_err(|e| Error::InitializationFailed(format!("Window handle unavailable: {}", e)))?
            .as_raw();
        Ok(Self { display, window })
    }
}
