/// Conversions between bridge types and Vulkan / DXGI values

use ash::vk;
use swapchain_bridge::bridge::device::{
    ColorSpace, Extent2D, Format, ImageLayout, ImageUsage, MemoryPropertyFlags, PresentMode,
    SurfaceFormat,
};
use swapchain_bridge::bridge::presenter::BufferFormat;

pub fn format_to_vk(format: Format) -> vk::Format {
    match format {
        Format::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        Format::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        Format::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        Format::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        Format::A2B10G10R10_UNORM_PACK32 => vk::Format::A2B10G10R10_UNORM_PACK32,
        Format::A2R10G10B10_UNORM_PACK32 => vk::Format::A2R10G10B10_UNORM_PACK32,
        Format::R16G16B16A16_SFLOAT => vk::Format::R16G16B16A16_SFLOAT,
    }
}

pub fn format_from_vk(format: vk::Format) -> Option<Format> {
    match format {
        vk::Format::R8G8B8A8_UNORM => Some(Format::R8G8B8A8_UNORM),
        vk::Format::B8G8R8A8_UNORM => Some(Format::B8G8R8A8_UNORM),
        vk::Format::R8G8B8A8_SRGB => Some(Format::R8G8B8A8_SRGB),
        vk::Format::B8G8R8A8_SRGB => Some(Format::B8G8R8A8_SRGB),
        vk::Format::A2B10G10R10_UNORM_PACK32 => Some(Format::A2B10G10R10_UNORM_PACK32),
        vk::Format::A2R10G10B10_UNORM_PACK32 => Some(Format::A2R10G10B10_UNORM_PACK32),
        vk::Format::R16G16B16A16_SFLOAT => Some(Format::R16G16B16A16_SFLOAT),
        _ => None,
    }
}

pub fn color_space_to_vk(color_space: ColorSpace) -> vk::ColorSpaceKHR {
    match color_space {
        ColorSpace::SrgbNonlinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ColorSpace::ExtendedSrgbLinear => vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
        ColorSpace::Hdr10St2084 => vk::ColorSpaceKHR::HDR10_ST2084_EXT,
    }
}

pub fn color_space_from_vk(color_space: vk::ColorSpaceKHR) -> Option<ColorSpace> {
    match color_space {
        vk::ColorSpaceKHR::SRGB_NONLINEAR => Some(ColorSpace::SrgbNonlinear),
        vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT => Some(ColorSpace::ExtendedSrgbLinear),
        vk::ColorSpaceKHR::HDR10_ST2084_EXT => Some(ColorSpace::Hdr10St2084),
        _ => None,
    }
}

/// Surface format, if both halves are expressible
pub fn surface_format_from_vk(format: &vk::SurfaceFormatKHR) -> Option<SurfaceFormat> {
    Some(SurfaceFormat {
        format: format_from_vk(format.format)?,
        color_space: color_space_from_vk(format.color_space)?,
    })
}

pub fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
    }
}

pub fn present_mode_from_vk(mode: vk::PresentModeKHR) -> Option<PresentMode> {
    match mode {
        vk::PresentModeKHR::IMMEDIATE => Some(PresentMode::Immediate),
        vk::PresentModeKHR::MAILBOX => Some(PresentMode::Mailbox),
        vk::PresentModeKHR::FIFO => Some(PresentMode::Fifo),
        vk::PresentModeKHR::FIFO_RELAXED => Some(PresentMode::FifoRelaxed),
        _ => None,
    }
}

pub fn layout_to_vk(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::TransferSrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ImageLayout::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

/// Access mask and pipeline stage of the work touching an image in `layout`
pub fn layout_scope(layout: ImageLayout) -> (vk::AccessFlags, vk::PipelineStageFlags) {
    match layout {
        ImageLayout::Undefined => (vk::AccessFlags::empty(), vk::PipelineStageFlags::TOP_OF_PIPE),
        ImageLayout::TransferSrc => (vk::AccessFlags::TRANSFER_READ, vk::PipelineStageFlags::TRANSFER),
        ImageLayout::TransferDst => (vk::AccessFlags::TRANSFER_WRITE, vk::PipelineStageFlags::TRANSFER),
        ImageLayout::PresentSrc => (vk::AccessFlags::empty(), vk::PipelineStageFlags::BOTTOM_OF_PIPE),
    }
}

pub fn image_usage_to_vk(usage: ImageUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(ImageUsage::COLOR_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(ImageUsage::SAMPLED) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(ImageUsage::TRANSFER_SRC) {
        flags |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(ImageUsage::TRANSFER_DST) {
        flags |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    if usage.contains(ImageUsage::STORAGE) {
        flags |= vk::ImageUsageFlags::STORAGE;
    }
    flags
}

pub fn memory_flags_from_vk(flags: vk::MemoryPropertyFlags) -> MemoryPropertyFlags {
    let mut result = MemoryPropertyFlags::empty();
    if flags.contains(vk::MemoryPropertyFlags::DEVICE_LOCAL) {
        result |= MemoryPropertyFlags::DEVICE_LOCAL;
    }
    if flags.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) {
        result |= MemoryPropertyFlags::HOST_VISIBLE;
    }
    if flags.contains(vk::MemoryPropertyFlags::HOST_COHERENT) {
        result |= MemoryPropertyFlags::HOST_COHERENT;
    }
    if flags.contains(vk::MemoryPropertyFlags::HOST_CACHED) {
        result |= MemoryPropertyFlags::HOST_CACHED;
    }
    result
}

pub fn extent_to_vk(extent: Extent2D) -> vk::Extent2D {
    vk::Extent2D { width: extent.width, height: extent.height }
}

pub fn extent_from_vk(extent: vk::Extent2D) -> Extent2D {
    Extent2D::new(extent.width, extent.height)
}

/// Far corner of a full-image blit region
pub fn extent_to_offset(extent: Extent2D) -> vk::Offset3D {
    vk::Offset3D { x: extent.width as i32, y: extent.height as i32, z: 1 }
}

/// `DXGI_FORMAT` value of a back buffer format
pub fn buffer_format_to_dxgi(format: BufferFormat) -> u32 {
    match format {
        BufferFormat::R16G16B16A16_FLOAT => 10,
        BufferFormat::R10G10B10A2_UNORM => 24,
        BufferFormat::R8G8B8A8_UNORM => 28,
        BufferFormat::R8G8B8A8_UNORM_SRGB => 29,
        BufferFormat::B8G8R8A8_UNORM => 87,
        BufferFormat::B8G8R8A8_UNORM_SRGB => 91,
        BufferFormat::Other(raw) => raw,
    }
}

/// Back buffer format of a `DXGI_FORMAT` value
pub fn buffer_format_from_dxgi(format: u32) -> BufferFormat {
    match format {
        10 => BufferFormat::R16G16B16A16_FLOAT,
        24 => BufferFormat::R10G10B10A2_UNORM,
        28 => BufferFormat::R8G8B8A8_UNORM,
        29 => BufferFormat::R8G8B8A8_UNORM_SRGB,
        87 => BufferFormat::B8G8R8A8_UNORM,
        91 => BufferFormat::B8G8R8A8_UNORM_SRGB,
        raw => BufferFormat::Other(raw),
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
