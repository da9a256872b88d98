/// VulkanDevice - PresentDevice implementation over the Vulkan objects behind vkd3d
///
/// The instance, device and queue belong to vkd3d: they are loaded, never
/// created or destroyed here. Every use of the queue happens under vkd3d's
/// queue lock.

use std::sync::Arc;
use std::time::Duration;

use ash::vk;
use ash::vk::Handle;
use swapchain_bridge::bridge::device::{
    DeviceInfo, Extent2D, Format, ImageDesc, ImageLayout, MemoryRequirements, MemoryType,
    PresentDevice, PresentMode, SurfaceCapabilities, SurfaceFormat, SurfaceStatus,
    SwapchainCreateDesc, WindowTarget,
};
use swapchain_bridge::bridge::{Error, Result};
use swapchain_bridge::{bridge_debug, bridge_err, bridge_error, bridge_info};

use crate::vkd3d::Vkd3dContext;
use crate::vulkan_format::{
    color_space_to_vk, extent_from_vk, extent_to_offset, extent_to_vk, format_to_vk,
    image_usage_to_vk, layout_scope, layout_to_vk, memory_flags_from_vk, present_mode_from_vk,
    present_mode_to_vk, surface_format_from_vk,
};

const COLOR_RANGE: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0,
    level_count: 1,
    base_array_layer: 0,
    layer_count: 1,
};

const COLOR_LAYERS: vk::ImageSubresourceLayers = vk::ImageSubresourceLayers {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    mip_level: 0,
    base_array_layer: 0,
    layer_count: 1,
};

/// Map a failed Vulkan call onto the bridge error it stands for
pub(crate) fn vk_error(what: &str, result: vk::Result) -> Error {
    match result {
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
            bridge_error!("bridge::vulkan", "{}: {:?}", what, result);
            Error::OutOfMemory
        }
        vk::Result::TIMEOUT | vk::Result::NOT_READY | vk::Result::ERROR_DEVICE_LOST => {
            bridge_error!("bridge::vulkan", "{}: {:?}", what, result);
            Error::DeviceLost(format!("{}: {:?}", what, result))
        }
        vk::Result::ERROR_SURFACE_LOST_KHR => {
            bridge_error!("bridge::vulkan", "{}: {:?}", what, result);
            Error::SurfaceLost(format!("{}: {:?}", what, result))
        }
        _ => bridge_err!("bridge::vulkan", "{}: {:?}", what, result),
    }
}

fn timeout_ns(timeout: Duration) -> u64 {
    timeout.as_nanos().min(u64::MAX as u128) as u64
}

/// Vulkan presentation device sharing vkd3d's device and queue
pub struct VulkanDevice {
    context: Arc<Vkd3dContext>,
    entry: ash::Entry,
    instance: ash::Instance,
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    queue_family: u32,
    queue: vk::Queue,
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,
    memory_types: Vec<MemoryType>,
}

impl VulkanDevice {
    /// Load the Vulkan device behind `context`
    pub fn new(context: Arc<Vkd3dContext>) -> Result<Self> {
        let vk_instance = context.vk_instance()?;
        let vk_device = context.vk_device()?;
        let physical_device = context.vk_physical_device()?;
        let queue_family = context.queue_family_index()?;
        let queue = context.lock_queue()?.queue();

        if vk_instance == vk::Instance::null() || vk_device == vk::Device::null() {
            return Err(Error::InitializationFailed("vkd3d returned null Vulkan handles".to_string()));
        }

        // SAFETY: vkd3d keeps the Vulkan library, instance and device alive
        // for as long as `context` holds its device reference.
        let (entry, instance, device) = unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                bridge_error!("bridge::vulkan", "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;
            let instance = ash::Instance::load(entry.static_fn(), vk_instance);
            let device = ash::Device::load(instance.fp_v1_0(), vk_device);
            (entry, instance, device)
        };

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

        // SAFETY: physical_device belongs to instance
        let memory_properties = unsafe { instance.get_physical_device_memory_properties(physical_device) };
        let memory_types = memory_properties
            .memory_types_as_slice()
            .iter()
            .map(|memory_type| MemoryType { property_flags: memory_flags_from_vk(memory_type.property_flags) })
            .collect::<Vec<_>>();

        bridge_info!(
            "bridge::vulkan",
            "Vulkan device {:#x} (queue family {}, {} memory types)",
            vk_device.as_raw(), queue_family, memory_types.len()
        );

        Ok(Self {
            context,
            entry,
            instance,
            device,
            physical_device,
            queue_family,
            queue,
            surface_loader,
            swapchain_loader,
            memory_types,
        })
    }
}

impl PresentDevice for VulkanDevice {
    type Queue = vk::Queue;
    type Adapter = vk::PhysicalDevice;
    type Surface = vk::SurfaceKHR;
    type Swapchain = vk::SwapchainKHR;
    type Image = vk::Image;
    type ImageView = vk::ImageView;
    type Semaphore = vk::Semaphore;
    type Fence = vk::Fence;
    type Memory = vk::DeviceMemory;
    type CommandPool = vk::CommandPool;
    type CommandBuffer = vk::CommandBuffer;

    fn device_info(&self) -> DeviceInfo<vk::Queue, vk::PhysicalDevice> {
        DeviceInfo {
            queue_family: self.queue_family,
            queue: self.queue,
            adapter: self.physical_device,
        }
    }

    fn wait_idle(&self) -> Result<()> {
        let guard = self.context.lock_queue()?;
        // SAFETY: the queue is externally synchronized by the guard
        unsafe { self.device.queue_wait_idle(guard.queue()) }
            .map_err(|e| vk_error("Failed to wait for queue idle", e))
    }

    // ===== SURFACE =====

    fn create_surface(&self, target: &WindowTarget) -> Result<vk::SurfaceKHR> {
        // SAFETY: the window handles outlive the surface per WindowTarget's contract
        let surface = unsafe {
            ash_window::create_surface(&self.entry, &self.instance, target.display, target.window, None)
        }
        .map_err(|e| {
            bridge_error!("bridge::vulkan", "Failed to create surface: {:?}", e);
            Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
        })?;

        // SAFETY: surface was created from this instance
        let supported = unsafe {
            self.surface_loader
                .get_physical_device_surface_support(self.physical_device, self.queue_family, surface)
        };
        match supported {
            Ok(true) => Ok(surface),
            Ok(false) => {
                self.destroy_surface(surface);
                bridge_error!("bridge::vulkan", "Queue family {} cannot present to the surface", self.queue_family);
                Err(Error::InitializationFailed(format!(
                    "Queue family {} cannot present to the surface", self.queue_family
                )))
            }
            Err(e) => {
                self.destroy_surface(surface);
                Err(vk_error("Failed to query surface support", e))
            }
        }
    }

    fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        // SAFETY: the swapchain built on this surface is already destroyed
        unsafe { self.surface_loader.destroy_surface(surface, None) };
    }

    fn surface_capabilities(&self, surface: vk::SurfaceKHR) -> Result<SurfaceCapabilities> {
        // SAFETY: surface was created from this instance
        let caps = unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, surface)
        }
        .map_err(|e| vk_error("Failed to query surface capabilities", e))?;

        // u32::MAX extent means the swapchain decides the surface size
        let current_extent = if caps.current_extent.width == u32::MAX {
            None
        } else {
            Some(extent_from_vk(caps.current_extent))
        };

        Ok(SurfaceCapabilities {
            min_image_count: caps.min_image_count,
            max_image_count: caps.max_image_count,
            current_extent,
            min_image_extent: extent_from_vk(caps.min_image_extent),
            max_image_extent: extent_from_vk(caps.max_image_extent),
        })
    }

    fn surface_formats(&self, surface: vk::SurfaceKHR) -> Result<Vec<SurfaceFormat>> {
        // SAFETY: surface was created from this instance
        let formats = unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(self.physical_device, surface)
        }
        .map_err(|e| vk_error("Failed to query surface formats", e))?;

        Ok(formats.iter().filter_map(surface_format_from_vk).collect())
    }

    fn surface_present_modes(&self, surface: vk::SurfaceKHR) -> Result<Vec<PresentMode>> {
        // SAFETY: surface was created from this instance
        let modes = unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(self.physical_device, surface)
        }
        .map_err(|e| vk_error("Failed to query present modes", e))?;

        Ok(modes.into_iter().filter_map(present_mode_from_vk).collect())
    }

    // ===== SWAPCHAIN =====

    fn create_swapchain(
        &self,
        surface: vk::SurfaceKHR,
        desc: &SwapchainCreateDesc,
    ) -> Result<vk::SwapchainKHR> {
        // SAFETY: surface was created from this instance
        let caps = unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, surface)
        }
        .map_err(|e| vk_error("Failed to query surface capabilities", e))?;

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(desc.min_image_count)
            .image_format(format_to_vk(desc.format.format))
            .image_color_space(color_space_to_vk(desc.format.color_space))
            .image_extent(extent_to_vk(desc.image_extent))
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode_to_vk(desc.present_mode))
            .clipped(true);

        // SAFETY: create_info only references locals
        let swapchain = unsafe { self.swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(|e| vk_error("Failed to create swapchain", e))?;

        bridge_debug!(
            "bridge::vulkan",
            "Created swapchain {:#x}: {}x{} {:?} {:?}",
            swapchain.as_raw(), desc.image_extent.width, desc.image_extent.height,
            desc.format.format, desc.present_mode
        );
        Ok(swapchain)
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        // SAFETY: callers wait for the queue before destroying
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) };
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>> {
        // SAFETY: swapchain is live
        unsafe { self.swapchain_loader.get_swapchain_images(swapchain) }
            .map_err(|e| vk_error("Failed to get swapchain images", e))
    }

    fn create_image_view(&self, image: vk::Image, format: Format) -> Result<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format_to_vk(format))
            .components(vk::ComponentMapping::default())
            .subresource_range(COLOR_RANGE);

        // SAFETY: image is a live swapchain image
        unsafe { self.device.create_image_view(&create_info, None) }
            .map_err(|e| vk_error("Failed to create image view", e))
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        // SAFETY: no command buffer in flight references the view
        unsafe { self.device.destroy_image_view(view, None) };
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
        timeout: Duration,
    ) -> Result<(u32, SurfaceStatus)> {
        // SAFETY: swapchain and semaphore are live; acquire does not touch the queue
        let result = unsafe {
            self.swapchain_loader
                .acquire_next_image(swapchain, timeout_ns(timeout), signal, vk::Fence::null())
        };

        match result {
            Ok((index, false)) => Ok((index, SurfaceStatus::Optimal)),
            Ok((index, true)) => Ok((index, SurfaceStatus::Suboptimal)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok((0, SurfaceStatus::OutOfDate)),
            Err(e) => Err(vk_error("Failed to acquire swapchain image", e)),
        }
    }

    fn queue_present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<SurfaceStatus> {
        let swapchains = [swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let guard = self.context.lock_queue()?;
        // SAFETY: the queue is externally synchronized by the guard
        let result = unsafe { self.swapchain_loader.queue_present(guard.queue(), &present_info) };
        drop(guard);

        match result {
            Ok(false) => Ok(SurfaceStatus::Optimal),
            Ok(true) => Ok(SurfaceStatus::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(SurfaceStatus::OutOfDate),
            Err(e) => Err(vk_error("Failed to present swapchain image", e)),
        }
    }

    // ===== SYNCHRONIZATION =====

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        // SAFETY: plain object creation
        unsafe { self.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
            .map_err(|e| vk_error("Failed to create semaphore", e))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        // SAFETY: no pending operation waits on or signals the semaphore
        unsafe { self.device.destroy_semaphore(semaphore, None) };
    }

    fn create_fence(&self, signaled: bool) -> Result<vk::Fence> {
        let flags = if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        // SAFETY: plain object creation
        unsafe { self.device.create_fence(&vk::FenceCreateInfo::default().flags(flags), None) }
            .map_err(|e| vk_error("Failed to create fence", e))
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        // SAFETY: the fence is not part of a pending submission
        unsafe { self.device.destroy_fence(fence, None) };
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout: Duration) -> Result<()> {
        // SAFETY: fence is live
        unsafe { self.device.wait_for_fences(&[fence], true, timeout_ns(timeout)) }
            .map_err(|e| vk_error("Failed to wait for back buffer fence", e))
    }

    fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        // SAFETY: fence is signaled, so no submission uses it
        unsafe { self.device.reset_fences(&[fence]) }
            .map_err(|e| vk_error("Failed to reset back buffer fence", e))
    }

    // ===== BACK BUFFER RESOURCES =====

    fn create_image(&self, desc: &ImageDesc) -> Result<vk::Image> {
        let create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format_to_vk(desc.format))
            .extent(vk::Extent3D { width: desc.extent.width, height: desc.extent.height, depth: 1 })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(image_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        // SAFETY: plain object creation
        unsafe { self.device.create_image(&create_info, None) }
            .map_err(|e| vk_error("Failed to create back buffer image", e))
    }

    fn destroy_image(&self, image: vk::Image) {
        // SAFETY: the image's last use has completed
        unsafe { self.device.destroy_image(image, None) };
    }

    fn image_memory_requirements(&self, image: vk::Image) -> MemoryRequirements {
        // SAFETY: image is live
        let requirements = unsafe { self.device.get_image_memory_requirements(image) };
        MemoryRequirements {
            size: requirements.size,
            memory_type_bits: requirements.memory_type_bits,
        }
    }

    fn memory_types(&self) -> Vec<MemoryType> {
        self.memory_types.clone()
    }

    fn allocate_image_memory(&self, image: vk::Image, size: u64, memory_type: u32) -> Result<vk::DeviceMemory> {
        let mut dedicated = vk::MemoryDedicatedAllocateInfo::default().image(image);
        let allocate_info = vk::MemoryAllocateInfo::default()
            .allocation_size(size)
            .memory_type_index(memory_type)
            .push_next(&mut dedicated);

        // SAFETY: allocate_info only references locals
        unsafe { self.device.allocate_memory(&allocate_info, None) }
            .map_err(|e| vk_error("Failed to allocate back buffer memory", e))
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        // SAFETY: the image bound to the memory is already destroyed
        unsafe { self.device.free_memory(memory, None) };
    }

    fn bind_image_memory(&self, image: vk::Image, memory: vk::DeviceMemory) -> Result<()> {
        // SAFETY: memory is a dedicated allocation for image
        unsafe { self.device.bind_image_memory(image, memory, 0) }
            .map_err(|e| vk_error("Failed to bind back buffer memory", e))
    }

    fn create_command_pool(&self) -> Result<vk::CommandPool> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::TRANSIENT)
            .queue_family_index(self.queue_family);

        // SAFETY: plain object creation
        unsafe { self.device.create_command_pool(&create_info, None) }
            .map_err(|e| vk_error("Failed to create command pool", e))
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        // SAFETY: no command buffer from the pool is pending
        unsafe { self.device.destroy_command_pool(pool, None) };
    }

    fn reset_command_pool(&self, pool: vk::CommandPool) -> Result<()> {
        // SAFETY: the pool's fence was waited on
        unsafe { self.device.reset_command_pool(pool, vk::CommandPoolResetFlags::empty()) }
            .map_err(|e| vk_error("Failed to reset command pool", e))
    }

    fn allocate_command_buffer(&self, pool: vk::CommandPool) -> Result<vk::CommandBuffer> {
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        // SAFETY: pool is live
        let buffers = unsafe { self.device.allocate_command_buffers(&allocate_info) }
            .map_err(|e| vk_error("Failed to allocate command buffer", e))?;
        buffers
            .into_iter()
            .next()
            .ok_or_else(|| bridge_err!("bridge::vulkan", "Command buffer allocation returned nothing"))
    }

    // ===== RECORDING AND SUBMISSION =====

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        // SAFETY: cmd's pool was reset
        unsafe { self.device.begin_command_buffer(cmd, &begin_info) }
            .map_err(|e| vk_error("Failed to begin command buffer", e))
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        // SAFETY: cmd is recording
        unsafe { self.device.end_command_buffer(cmd) }
            .map_err(|e| vk_error("Failed to end command buffer", e))
    }

    fn cmd_image_barrier(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    ) {
        let (src_access, src_stage) = layout_scope(old_layout);
        let (dst_access, dst_stage) = layout_scope(new_layout);

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(layout_to_vk(old_layout))
            .new_layout(layout_to_vk(new_layout))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(COLOR_RANGE)
            .src_access_mask(src_access)
            .dst_access_mask(dst_access);

        // SAFETY: cmd is recording
        unsafe {
            self.device.cmd_pipeline_barrier(
                cmd,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[], &[], &[barrier],
            );
        }
    }

    fn cmd_blit_image(
        &self,
        cmd: vk::CommandBuffer,
        src: vk::Image,
        src_extent: Extent2D,
        dst: vk::Image,
        dst_extent: Extent2D,
    ) {
        let region = vk::ImageBlit {
            src_subresource: COLOR_LAYERS,
            src_offsets: [vk::Offset3D { x: 0, y: 0, z: 0 }, extent_to_offset(src_extent)],
            dst_subresource: COLOR_LAYERS,
            dst_offsets: [vk::Offset3D { x: 0, y: 0, z: 0 }, extent_to_offset(dst_extent)],
        };

        // SAFETY: cmd is recording; src is in transfer-src layout via vkd3d's present state
        unsafe {
            self.device.cmd_blit_image(
                cmd,
                src,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
                vk::Filter::NEAREST,
            );
        }
    }

    fn queue_submit(
        &self,
        cmd: vk::CommandBuffer,
        wait: vk::Semaphore,
        signal: vk::Semaphore,
        fence: vk::Fence,
    ) -> Result<()> {
        let wait_semaphores = [wait];
        let wait_stages = [vk::PipelineStageFlags::ALL_COMMANDS];
        let command_buffers = [cmd];
        let signal_semaphores = [signal];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        let guard = self.context.lock_queue()?;
        // SAFETY: the queue is externally synchronized by the guard
        unsafe { self.device.queue_submit(guard.queue(), &[submit_info], fence) }
            .map_err(|e| vk_error("Failed to submit present blit", e))
    }
}
