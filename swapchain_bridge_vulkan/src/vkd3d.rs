/// Vkd3dContext - the producer's D3D12 device and command queue
///
/// Holds one COM reference on both objects for its lifetime, and the loader
/// used to reach the Vulkan objects behind them.

use std::ffi::c_void;
use std::sync::Arc;

use ash::vk;
use swapchain_bridge::bridge::{Error, Result};
use swapchain_bridge::{bridge_error, bridge_trace};

use crate::vkd3d_loader::Vkd3dLoader;
use crate::vkd3d_types::{com_add_ref, com_release};

/// Borrowed `ID3D12Device` pointer handed back to the producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct D3D12Device(pub *mut c_void);

pub struct Vkd3dContext {
    loader: Arc<Vkd3dLoader>,
    device: *mut c_void,
    queue: *mut c_void,
}

// SAFETY: D3D12 devices and command queues are free-threaded; the Vulkan
// queue behind `queue` is only touched under vkd3d's queue lock.
unsafe impl Send for Vkd3dContext {}
unsafe impl Sync for Vkd3dContext {}

impl Vkd3dContext {
    /// Wrap a vkd3d `ID3D12Device` and one of its `ID3D12CommandQueue`s
    ///
    /// # Safety
    ///
    /// `device` and `queue` must be live vkd3d objects, `queue` created from
    /// `device`, both owned by the library behind `loader`.
    pub unsafe fn new(loader: Arc<Vkd3dLoader>, device: *mut c_void, queue: *mut c_void) -> Result<Self> {
        if device.is_null() || queue.is_null() {
            return Err(Error::InvalidArgument("null D3D12 device or queue".to_string()));
        }

        com_add_ref(device);
        com_add_ref(queue);
        Ok(Self { loader, device, queue })
    }

    pub fn loader(&self) -> &Arc<Vkd3dLoader> {
        &self.loader
    }

    pub fn d3d12_device(&self) -> D3D12Device {
        D3D12Device(self.device)
    }

    pub(crate) fn device_ptr(&self) -> *mut c_void {
        self.device
    }

    pub fn vk_instance(&self) -> Result<vk::Instance> {
        // SAFETY: device is kept alive by our reference
        unsafe { self.loader.get_vk_instance(self.device) }
    }

    pub fn vk_device(&self) -> Result<vk::Device> {
        // SAFETY: as above
        unsafe { self.loader.get_vk_device(self.device) }
    }

    pub fn vk_physical_device(&self) -> Result<vk::PhysicalDevice> {
        // SAFETY: as above
        unsafe { self.loader.get_vk_physical_device(self.device) }
    }

    pub fn queue_family_index(&self) -> Result<u32> {
        // SAFETY: queue is kept alive by our reference
        unsafe { self.loader.get_vk_queue_family_index(self.queue) }
    }

    /// Lock the shared Vulkan queue until the guard is dropped
    pub fn lock_queue(&self) -> Result<QueueGuard<'_>> {
        // SAFETY: queue is kept alive by our reference
        let queue = unsafe { self.loader.acquire_vk_queue(self.queue) }?;
        bridge_trace!("bridge::vulkan::queue", "Locked queue {:?}", queue);
        Ok(QueueGuard { context: self, queue })
    }
}

impl Drop for Vkd3dContext {
    fn drop(&mut self) {
        // SAFETY: releases the references taken in new()
        unsafe {
            com_release(self.queue);
            com_release(self.device);
        }
    }
}

/// Exclusive access to the Vulkan queue shared with the producer
pub struct QueueGuard<'a> {
    context: &'a Vkd3dContext,
    queue: vk::Queue,
}

impl QueueGuard<'_> {
    pub fn queue(&self) -> vk::Queue {
        self.queue
    }
}

impl Drop for QueueGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: pairs with the acquire in lock_queue()
        if let Err(e) = unsafe { self.context.loader.release_vk_queue(self.context.queue) } {
            bridge_error!("bridge::vulkan::queue", "Failed to release queue: {}", e);
        }
    }
}
