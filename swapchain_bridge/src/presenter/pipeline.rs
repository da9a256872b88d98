/// FramePresentationPipeline - moves the current back buffer onto the screen
///
/// One `present` call:
/// 1. recreates the swapchain when the vsync setting changed
/// 2. acquires a swapchain image, recreating while the surface is out of date
/// 3. waits for the current back buffer's fence, then resets its pool
/// 4. records transition, blit and transition into the acquired image
/// 5. resets the fence and submits, waiting on the acquire semaphore
/// 6. presents, waiting on the submission
/// 7. advances the back buffer ring

use std::sync::Arc;

use crate::config::PresenterConfig;
use crate::device::{ImageLayout, PresentDevice, SurfaceStatus, WindowTarget};
use crate::error::{Error, Result};
use crate::presenter::{
    BackBufferRing, PresenterDesc, PresenterInfo, ResourceBridge, SwapChainDesc,
    SwapchainController, SyncPair,
};
use crate::{bridge_debug, bridge_err, bridge_error, bridge_info, bridge_trace, bridge_warn};

pub struct FramePresentationPipeline<D: PresentDevice, B: ResourceBridge<D>> {
    // Back buffers go before the swapchain on drop
    ring: BackBufferRing<D, B>,
    controller: SwapchainController<D>,
    device: Arc<D>,
    config: PresenterConfig,
    desc: SwapChainDesc,
    vsync: bool,
}

impl<D: PresentDevice, B: ResourceBridge<D>> FramePresentationPipeline<D, B> {
    /// Create the swapchain, then the back buffers
    pub fn new(
        device: Arc<D>,
        bridge: Arc<B>,
        target: &WindowTarget,
        desc: SwapChainDesc,
        config: PresenterConfig,
    ) -> Result<Self> {
        desc.validate()?;
        let vsync = true;

        let controller = SwapchainController::new(
            device.clone(),
            target,
            PresenterDesc::from_swap_chain_desc(&desc, vsync),
            config,
        )?;
        let ring = BackBufferRing::new(device.clone(), bridge, &desc)?;

        Ok(Self { ring, controller, device, config, desc, vsync })
    }

    /// Present the current back buffer
    ///
    /// A non-zero `sync_interval` requests vsync.
    pub fn present(&mut self, sync_interval: u32) -> Result<()> {
        let vsync = sync_interval != 0;
        if vsync != self.vsync {
            bridge_debug!("bridge::presenter", "Vsync {} -> {}", self.vsync, vsync);
            let previous = self.vsync;
            self.vsync = vsync;
            if let Err(e) = self.recreate_swap_chain() {
                self.vsync = previous;
                return Err(e);
            }
        }

        if self.ring.is_empty() {
            self.ring.create_back_buffers(&self.desc)?;
        }

        let mut replayed = false;
        loop {
            let (index, sync) = self.acquire()?;
            let presented = self
                .record_and_submit(index, sync)
                .and_then(|()| self.controller.present_image(sync.present));

            let status = match presented {
                Ok(status) => status,
                Err(e) => {
                    if !matches!(e, Error::DeviceLost(_)) {
                        self.abandon_frame();
                    }
                    return Err(e);
                }
            };

            match status {
                SurfaceStatus::Optimal => break,
                SurfaceStatus::Suboptimal => {
                    bridge_debug!("bridge::presenter", "Present reported suboptimal surface");
                    self.recreate_swap_chain()?;
                    break;
                }
                SurfaceStatus::OutOfDate => {
                    self.recreate_swap_chain()?;
                    if replayed {
                        return Err(Error::SurfaceLost(
                            "surface out of date after replaying the frame".to_string(),
                        ));
                    }
                    bridge_debug!("bridge::presenter", "Present reported out-of-date surface, replaying frame");
                    replayed = true;
                }
            }
        }

        bridge_trace!("bridge::presenter", "Presented back buffer {}", self.ring.index());
        self.ring.advance();
        Ok(())
    }

    /// Apply a new swap chain description
    ///
    /// Back buffers are destroyed before the swapchain is recreated and
    /// rebuilt after it, all before this call returns. Back buffers are
    /// rebuilt even when the recreation fails; the next `present` retries it.
    pub fn change_properties(&mut self, desc: SwapChainDesc) -> Result<()> {
        desc.validate()?;
        bridge_info!(
            "bridge::presenter",
            "Changing swap chain properties: {}x{} {:?}, {} buffers",
            desc.width, desc.height, desc.format, desc.buffer_count
        );

        self.ring.destroy_back_buffers()?;
        self.desc = desc;
        let recreated = self.recreate_swap_chain();
        self.ring.create_back_buffers(&self.desc)?;
        recreated
    }

    pub fn desc(&self) -> &SwapChainDesc {
        &self.desc
    }

    pub fn info(&self) -> PresenterInfo {
        self.controller.info()
    }

    /// Producer resource of back buffer `index`
    pub fn image(&self, index: u32) -> Option<&B::Resource> {
        self.ring.get(index as usize).map(|buffer| buffer.resource())
    }

    /// Index of the back buffer the next present will show
    pub fn image_index(&self) -> u32 {
        self.ring.index() as u32
    }

    pub fn vsync(&self) -> bool {
        self.vsync
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    pub fn bridge(&self) -> &Arc<B> {
        self.ring.bridge()
    }

    pub fn recreation_count(&self) -> u64 {
        self.controller.recreation_count()
    }

    fn recreate_swap_chain(&mut self) -> Result<()> {
        let desc = PresenterDesc::from_swap_chain_desc(&self.desc, self.vsync);
        self.controller.recreate_swap_chain(&desc)
    }

    /// Acquire an image, recreating the swapchain while it is out of date
    /// or missing after a failed recreation
    fn acquire(&mut self) -> Result<(u32, SyncPair<D::Semaphore>)> {
        let mut recreations = 0;
        loop {
            if self.controller.is_available() {
                let sync = self.controller.sync_semaphores()?;
                let (index, status) = self.controller.acquire_next_image(sync.acquire)?;
                match status {
                    SurfaceStatus::Optimal => return Ok((index, sync)),
                    SurfaceStatus::Suboptimal => {
                        bridge_trace!("bridge::presenter", "Acquired image {} from a suboptimal swapchain", index);
                        return Ok((index, sync));
                    }
                    SurfaceStatus::OutOfDate => {}
                }
            } else {
                bridge_debug!("bridge::presenter", "No swapchain, recreating before acquire");
            }

            if recreations >= self.config.max_surface_retries {
                bridge_warn!(
                    "bridge::presenter",
                    "Surface still out of date after {} recreations",
                    recreations
                );
                return Err(Error::SurfaceLost(format!(
                    "surface out of date after {} recreations", recreations
                )));
            }
            recreations += 1;
            self.recreate_swap_chain()?;
        }
    }

    /// Drop a frame that failed after its image was acquired
    ///
    /// The new swapchain generation discards the acquired image and its
    /// signaled semaphore. The current fence is replaced by a signaled one
    /// since no work will ever signal the old one.
    fn abandon_frame(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            bridge_error!("bridge::presenter", "Failed to wait for idle after a failed frame: {}", e);
            return;
        }
        if let Err(e) = self.ring.restore_current_fence() {
            bridge_error!("bridge::presenter", "Failed to restore back buffer fence: {}", e);
        }
        if let Err(e) = self.recreate_swap_chain() {
            bridge_warn!("bridge::presenter", "Swapchain recreation after a failed frame failed: {}", e);
        }
    }

    fn record_and_submit(&self, index: u32, sync: SyncPair<D::Semaphore>) -> Result<()> {
        let target = self
            .controller
            .image(index)
            .ok_or_else(|| bridge_err!("bridge::presenter", "No swapchain image {}", index))?;
        let target_extent = self.controller.info().image_extent;
        let buffer = self
            .ring
            .current()
            .ok_or_else(|| Error::InvalidResource("no back buffers".to_string()))?;
        let device = &*self.device;

        device.wait_for_fence(buffer.fence, self.config.fence_timeout)?;
        device.reset_command_pool(buffer.command_pool)?;

        let cmd = buffer.command_buffer;
        device.begin_command_buffer(cmd)?;
        device.cmd_image_barrier(cmd, target.image, ImageLayout::Undefined, ImageLayout::TransferDst);
        device.cmd_blit_image(cmd, buffer.image, self.desc.extent(), target.image, target_extent);
        device.cmd_image_barrier(cmd, target.image, ImageLayout::TransferDst, ImageLayout::PresentSrc);
        device.end_command_buffer(cmd)?;

        // Unsignaled only once work that signals it is about to be queued
        device.reset_fence(buffer.fence)?;
        device.queue_submit(cmd, sync.acquire, sync.present, buffer.fence)
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
