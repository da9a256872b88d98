/// Swap chain descriptions, on both sides of the bridge

use bitflags::bitflags;

use crate::device::{Extent2D, Format, PresentMode, SurfaceFormat};
use crate::error::{Error, Result};

/// Maximum number of format / present mode candidates in a PresenterDesc
pub const MAX_CANDIDATES: usize = 4;

// ============================================================================
// Producer side
// ============================================================================

/// Back buffer formats the producing API may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum BufferFormat {
    R8G8B8A8_UNORM,
    R8G8B8A8_UNORM_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_UNORM_SRGB,
    R10G10B10A2_UNORM,
    R16G16B16A16_FLOAT,
    /// Any other producer format, by raw value
    Other(u32),
}

impl BufferFormat {
    /// Presentation-side format of the back buffer image
    pub fn image_format(self) -> Option<Format> {
        match self {
            BufferFormat::R8G8B8A8_UNORM => Some(Format::R8G8B8A8_UNORM),
            BufferFormat::R8G8B8A8_UNORM_SRGB => Some(Format::R8G8B8A8_SRGB),
            BufferFormat::B8G8R8A8_UNORM => Some(Format::B8G8R8A8_UNORM),
            BufferFormat::B8G8R8A8_UNORM_SRGB => Some(Format::B8G8R8A8_SRGB),
            BufferFormat::R10G10B10A2_UNORM => Some(Format::A2B10G10R10_UNORM_PACK32),
            BufferFormat::R16G16B16A16_FLOAT => Some(Format::R16G16B16A16_SFLOAT),
            BufferFormat::Other(_) => None,
        }
    }

    /// Swapchain format candidates, in priority order
    pub fn surface_format_candidates(self) -> Vec<SurfaceFormat> {
        let formats: &[Format] = match self {
            BufferFormat::R8G8B8A8_UNORM | BufferFormat::B8G8R8A8_UNORM => {
                &[Format::R8G8B8A8_UNORM, Format::B8G8R8A8_UNORM]
            }
            BufferFormat::R8G8B8A8_UNORM_SRGB | BufferFormat::B8G8R8A8_UNORM_SRGB => {
                &[Format::R8G8B8A8_SRGB, Format::B8G8R8A8_SRGB]
            }
            BufferFormat::R10G10B10A2_UNORM => {
                &[Format::A2B10G10R10_UNORM_PACK32, Format::A2R10G10B10_UNORM_PACK32]
            }
            BufferFormat::R16G16B16A16_FLOAT => &[Format::R16G16B16A16_SFLOAT],
            BufferFormat::Other(raw) => {
                crate::bridge_warn!("bridge::presenter", "Unknown back buffer format: {}", raw);
                &[]
            }
        };

        formats.iter().copied().map(SurfaceFormat::srgb_nonlinear).collect()
    }
}

bitflags! {
    /// Producer-side buffer usage
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const SHADER_INPUT         = 0x010;
        const RENDER_TARGET_OUTPUT = 0x020;
        const BACK_BUFFER          = 0x040;
        const SHARED               = 0x080;
        const READ_ONLY            = 0x100;
        const DISCARD_ON_PRESENT   = 0x200;
        const UNORDERED_ACCESS     = 0x400;
    }
}

bitflags! {
    /// Flags passed to `Presenter::present`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PresentFlags: u32 {
        /// Report status only, present nothing
        const TEST            = 0x001;
        const DO_NOT_SEQUENCE = 0x002;
        const RESTART         = 0x004;
        const DO_NOT_WAIT     = 0x008;
        const ALLOW_TEARING   = 0x200;
    }
}

/// Logical swap chain description owned by the presenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapChainDesc {
    pub width: u32,
    pub height: u32,
    pub format: BufferFormat,
    pub buffer_count: u32,
    pub buffer_usage: BufferUsage,
}

impl SwapChainDesc {
    pub fn extent(&self) -> Extent2D {
        Extent2D::new(self.width, self.height)
    }

    /// Reject descriptions no back buffer ring can be built for
    pub fn validate(&self) -> Result<()> {
        if self.buffer_count == 0 {
            return Err(Error::InvalidArgument("buffer_count must be at least 1".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidArgument(format!(
                "back buffer extent {}x{} is empty", self.width, self.height
            )));
        }
        if self.format.image_format().is_none() {
            return Err(Error::UnsupportedFormat(format!("{:?}", self.format)));
        }
        Ok(())
    }
}

/// Rectangle in back buffer coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Partial-presentation hints; accepted, never honored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresentParameters {
    pub dirty_rects: Vec<Rect>,
    pub scroll_rect: Option<Rect>,
    pub scroll_offset: Option<(i32, i32)>,
}

impl PresentParameters {
    /// True when the parameters ask for anything beyond a full present
    pub fn is_partial(&self) -> bool {
        !self.dirty_rects.is_empty() || self.scroll_rect.is_some() || self.scroll_offset.is_some()
    }
}

/// One gamma ramp control point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GammaControlPoint {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

/// Present mode candidates for a vsync setting, in priority order
pub fn present_mode_candidates(vsync: bool) -> Vec<PresentMode> {
    if vsync {
        vec![PresentMode::Fifo]
    } else {
        vec![PresentMode::Immediate, PresentMode::Mailbox, PresentMode::FifoRelaxed]
    }
}

// ============================================================================
// Presentation side
// ============================================================================

/// Requested swapchain shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenterDesc {
    pub image_extent: Extent2D,
    pub image_count: u32,
    /// Candidate formats, highest priority first (at most MAX_CANDIDATES)
    pub formats: Vec<SurfaceFormat>,
    /// Candidate present modes, highest priority first (at most MAX_CANDIDATES)
    pub present_modes: Vec<PresentMode>,
}

impl PresenterDesc {
    /// Build the swapchain request for a producer description and vsync setting
    pub fn from_swap_chain_desc(desc: &SwapChainDesc, vsync: bool) -> Self {
        Self {
            image_extent: desc.extent(),
            image_count: desc.buffer_count,
            formats: desc.format.surface_format_candidates(),
            present_modes: present_mode_candidates(vsync),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.formats.len() > MAX_CANDIDATES {
            return Err(Error::InvalidArgument(format!(
                "{} format candidates given, at most {} allowed",
                self.formats.len(), MAX_CANDIDATES
            )));
        }
        if self.present_modes.len() > MAX_CANDIDATES {
            return Err(Error::InvalidArgument(format!(
                "{} present mode candidates given, at most {} allowed",
                self.present_modes.len(), MAX_CANDIDATES
            )));
        }
        Ok(())
    }
}

/// Negotiated swapchain shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenterInfo {
    pub format: SurfaceFormat,
    pub present_mode: PresentMode,
    pub image_extent: Extent2D,
    pub image_count: u32,
}
