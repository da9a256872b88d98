/// Back buffer ring - producer-visible images and their per-buffer GPU state
///
/// Each back buffer owns a dedicated image allocation, a command pool with a
/// single primary command buffer, and a fence guarding that command buffer.
/// The fence is created signaled and is signaled iff no GPU work uses the
/// buffer.

use std::sync::Arc;

use crate::device::{
    ImageDesc, ImageUsage, MemoryPropertyFlags, MemoryType, PresentDevice,
};
use crate::error::{Error, Result};
use crate::presenter::{BufferUsage, ImportDesc, ResourceBridge, SwapChainDesc};
use crate::{bridge_debug, bridge_error, bridge_warn};

/// Compatible memory types in allocation order: device-local first, then the rest
pub fn memory_type_candidates(types: &[MemoryType], memory_type_bits: u32) -> Vec<u32> {
    let compatible = |index: &u32| *index < 32 && memory_type_bits & (1 << *index) != 0;
    let device_local =
        |index: &u32| types[*index as usize].property_flags.contains(MemoryPropertyFlags::DEVICE_LOCAL);

    let indices = 0..types.len() as u32;
    let mut candidates: Vec<u32> = indices.clone().filter(compatible).filter(device_local).collect();
    candidates.extend(indices.filter(compatible).filter(|i| !device_local(i)));
    candidates
}

/// Image usage of a back buffer for the producer's buffer usage
pub fn back_buffer_usage(usage: BufferUsage) -> ImageUsage {
    let mut flags = ImageUsage::COLOR_ATTACHMENT
        | ImageUsage::SAMPLED
        | ImageUsage::TRANSFER_SRC
        | ImageUsage::TRANSFER_DST;
    if usage.contains(BufferUsage::UNORDERED_ACCESS) {
        flags |= ImageUsage::STORAGE;
    }
    flags
}

// ============================================================================
// BackBuffer
// ============================================================================

/// One producer-visible render target
pub struct BackBuffer<D: PresentDevice, B: ResourceBridge<D>> {
    pub image: D::Image,
    pub memory: D::Memory,
    pub command_pool: D::CommandPool,
    pub command_buffer: D::CommandBuffer,
    pub fence: D::Fence,
    resource: B::Resource,
}

impl<D: PresentDevice, B: ResourceBridge<D>> BackBuffer<D, B> {
    /// Producer resource wrapping this buffer's image
    pub fn resource(&self) -> &B::Resource {
        &self.resource
    }

    fn destroy(self, device: &D, bridge: &B) {
        bridge.release(self.resource);
        device.destroy_command_pool(self.command_pool);
        device.destroy_fence(self.fence);
        device.destroy_image(self.image);
        device.free_memory(self.memory);
    }
}

/// Objects of a back buffer under construction
struct PendingBackBuffer<D: PresentDevice> {
    image: Option<D::Image>,
    memory: Option<D::Memory>,
    command_pool: Option<D::CommandPool>,
    fence: Option<D::Fence>,
}

impl<D: PresentDevice> PendingBackBuffer<D> {
    fn destroy(self, device: &D) {
        if let Some(pool) = self.command_pool {
            device.destroy_command_pool(pool);
        }
        if let Some(fence) = self.fence {
            device.destroy_fence(fence);
        }
        if let Some(image) = self.image {
            device.destroy_image(image);
        }
        if let Some(memory) = self.memory {
            device.free_memory(memory);
        }
    }
}

fn allocate_image_memory<D: PresentDevice>(device: &D, image: D::Image) -> Result<D::Memory> {
    let requirements = device.image_memory_requirements(image);
    let candidates = memory_type_candidates(&device.memory_types(), requirements.memory_type_bits);

    for memory_type in candidates {
        match device.allocate_image_memory(image, requirements.size, memory_type) {
            Ok(memory) => return Ok(memory),
            Err(e) => {
                bridge_debug!(
                    "bridge::back_buffer",
                    "Allocation of {} bytes from memory type {} failed: {}",
                    requirements.size, memory_type, e
                );
            }
        }
    }

    bridge_error!(
        "bridge::back_buffer",
        "No memory type could hold a {} byte back buffer (type bits {:#x})",
        requirements.size, requirements.memory_type_bits
    );
    Err(Error::OutOfMemory)
}

fn create_back_buffer<D: PresentDevice, B: ResourceBridge<D>>(
    device: &D,
    bridge: &B,
    desc: &SwapChainDesc,
    pending: &mut PendingBackBuffer<D>,
) -> Result<BackBuffer<D, B>> {
    let format = desc
        .format
        .image_format()
        .ok_or_else(|| Error::UnsupportedFormat(format!("{:?}", desc.format)))?;

    let image = device.create_image(&ImageDesc {
        extent: desc.extent(),
        format,
        usage: back_buffer_usage(desc.buffer_usage),
    })?;
    pending.image = Some(image);

    let memory = allocate_image_memory(device, image)?;
    pending.memory = Some(memory);
    device.bind_image_memory(image, memory)?;

    let command_pool = device.create_command_pool()?;
    pending.command_pool = Some(command_pool);
    let command_buffer = device.allocate_command_buffer(command_pool)?;

    let fence = device.create_fence(true)?;
    pending.fence = Some(fence);

    let resource = bridge.import(image, &ImportDesc {
        extent: desc.extent(),
        format: desc.format,
        unordered_access: desc.buffer_usage.contains(BufferUsage::UNORDERED_ACCESS),
    })?;

    *pending = PendingBackBuffer { image: None, memory: None, command_pool: None, fence: None };
    Ok(BackBuffer { image, memory, command_pool, command_buffer, fence, resource })
}

// ============================================================================
// BackBufferRing
// ============================================================================

/// Ring of back buffers presented in order
pub struct BackBufferRing<D: PresentDevice, B: ResourceBridge<D>> {
    device: Arc<D>,
    bridge: Arc<B>,
    buffers: Vec<BackBuffer<D, B>>,
    index: usize,
}

impl<D: PresentDevice, B: ResourceBridge<D>> BackBufferRing<D, B> {
    pub fn new(device: Arc<D>, bridge: Arc<B>, desc: &SwapChainDesc) -> Result<Self> {
        let mut ring = Self { device, bridge, buffers: Vec::new(), index: 0 };
        ring.create_back_buffers(desc)?;
        Ok(ring)
    }

    /// Create `desc.buffer_count` back buffers
    ///
    /// On failure every buffer created so far is destroyed and the ring is
    /// left empty.
    pub fn create_back_buffers(&mut self, desc: &SwapChainDesc) -> Result<()> {
        desc.validate()?;
        if !self.buffers.is_empty() {
            self.destroy_back_buffers()?;
        }

        for i in 0..desc.buffer_count {
            let mut pending = PendingBackBuffer { image: None, memory: None, command_pool: None, fence: None };
            match create_back_buffer(&*self.device, &*self.bridge, desc, &mut pending) {
                Ok(buffer) => self.buffers.push(buffer),
                Err(e) => {
                    bridge_error!(
                        "bridge::back_buffer",
                        "Failed to create back buffer {} of {}: {}",
                        i, desc.buffer_count, e
                    );
                    pending.destroy(&self.device);
                    self.release_all();
                    return Err(e);
                }
            }
        }

        self.index = 0;
        bridge_debug!(
            "bridge::back_buffer",
            "Created {} back buffers ({}x{} {:?})",
            desc.buffer_count, desc.width, desc.height, desc.format
        );
        Ok(())
    }

    /// Wait for the GPU, then release and destroy every back buffer
    pub fn destroy_back_buffers(&mut self) -> Result<()> {
        if self.buffers.is_empty() {
            return Ok(());
        }
        self.device.wait_idle()?;
        self.release_all();
        Ok(())
    }

    fn release_all(&mut self) {
        for buffer in self.buffers.drain(..) {
            buffer.destroy(&self.device, &self.bridge);
        }
        self.index = 0;
    }

    pub fn current(&self) -> Option<&BackBuffer<D, B>> {
        self.buffers.get(self.index)
    }

    pub fn get(&self, index: usize) -> Option<&BackBuffer<D, B>> {
        self.buffers.get(index)
    }

    /// Index of the back buffer the next present will show
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Replace the current buffer's fence with a signaled one
    ///
    /// Only valid while no GPU work is pending on the buffer.
    pub fn restore_current_fence(&mut self) -> Result<()> {
        let Some(buffer) = self.buffers.get_mut(self.index) else {
            return Ok(());
        };
        let fence = self.device.create_fence(true)?;
        self.device.destroy_fence(std::mem::replace(&mut buffer.fence, fence));
        Ok(())
    }

    pub fn advance(&mut self) {
        if !self.buffers.is_empty() {
            self.index = (self.index + 1) % self.buffers.len();
        }
    }

    pub fn bridge(&self) -> &Arc<B> {
        &self.bridge
    }
}

impl<D: PresentDevice, B: ResourceBridge<D>> Drop for BackBufferRing<D, B> {
    fn drop(&mut self) {
        if let Err(e) = self.destroy_back_buffers() {
            bridge_warn!("bridge::back_buffer", "wait_idle failed during teardown: {}", e);
            self.release_all();
        }
    }
}

#[cfg(test)]
#[path = "back_buffer_tests.rs"]
mod tests;
