/// SwapchainController - swapchain negotiation, acquire / present and recreation

use std::sync::Arc;

use crate::config::PresenterConfig;
use crate::device::{
    Extent2D, PresentDevice, PresentMode, SurfaceCapabilities, SurfaceFormat, SurfaceStatus,
    SwapchainCreateDesc, WindowTarget,
};
use crate::error::{Error, Result};
use crate::presenter::{PresenterDesc, PresenterInfo, SurfaceManager};
use crate::{bridge_debug, bridge_error, bridge_info, bridge_trace, bridge_warn};

/// One swapchain image and its view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapImage<I, V> {
    pub image: I,
    pub view: V,
}

/// Semaphores used by one acquire / present round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPair<S> {
    /// Signaled by the acquire, waited on by the blit submission
    pub acquire: S,
    /// Signaled by the blit submission, waited on by the present
    pub present: S,
}

// ============================================================================
// Negotiation
// ============================================================================

/// First candidate the surface supports
pub fn pick_format(candidates: &[SurfaceFormat], supported: &[SurfaceFormat]) -> Result<SurfaceFormat> {
    candidates
        .iter()
        .find(|candidate| supported.contains(candidate))
        .copied()
        .ok_or_else(|| {
            Error::UnsupportedFormat(format!(
                "none of {:?} is supported by the surface ({:?})",
                candidates, supported
            ))
        })
}

/// First candidate the surface supports, FIFO otherwise
pub fn pick_present_mode(candidates: &[PresentMode], supported: &[PresentMode]) -> PresentMode {
    candidates
        .iter()
        .find(|candidate| supported.contains(candidate))
        .copied()
        .unwrap_or(PresentMode::GUARANTEED)
}

/// Surface-imposed extent if any, else the desired extent within limits
pub fn pick_image_extent(desired: Extent2D, caps: &SurfaceCapabilities) -> Extent2D {
    match caps.current_extent {
        Some(extent) => extent,
        None => desired.clamp(caps.min_image_extent, caps.max_image_extent),
    }
}

/// Desired image count within limits (`max_image_count == 0` is uncapped)
pub fn pick_image_count(desired: u32, caps: &SurfaceCapabilities) -> u32 {
    let count = desired.max(caps.min_image_count);
    if caps.max_image_count == 0 {
        count
    } else {
        count.min(caps.max_image_count)
    }
}

// ============================================================================
// Swapchain objects
// ============================================================================

/// Objects tied to one swapchain generation, torn down together
struct SwapchainObjects<D: PresentDevice> {
    swapchain: Option<D::Swapchain>,
    images: Vec<SwapImage<D::Image, D::ImageView>>,
    sync_pairs: Vec<SyncPair<D::Semaphore>>,
}

impl<D: PresentDevice> SwapchainObjects<D> {
    fn empty() -> Self {
        Self { swapchain: None, images: Vec::new(), sync_pairs: Vec::new() }
    }

    /// Create a swapchain generation, leaving whatever was built in `self` on failure
    fn build(
        &mut self,
        device: &D,
        surface: D::Surface,
        desc: &PresenterDesc,
    ) -> Result<PresenterInfo> {
        let caps = device.surface_capabilities(surface)?;
        let formats = device.surface_formats(surface)?;
        let present_modes = device.surface_present_modes(surface)?;

        let format = pick_format(&desc.formats, &formats).map_err(|e| {
            bridge_error!("bridge::swapchain", "No usable surface format: {}", e);
            e
        })?;
        let present_mode = pick_present_mode(&desc.present_modes, &present_modes);
        if !desc.present_modes.contains(&present_mode) {
            bridge_warn!(
                "bridge::swapchain",
                "None of the present modes {:?} is supported, using {:?}",
                desc.present_modes, present_mode
            );
        }

        let create_desc = SwapchainCreateDesc {
            format,
            present_mode,
            image_extent: pick_image_extent(desc.image_extent, &caps),
            min_image_count: pick_image_count(desc.image_count, &caps),
        };
        let swapchain = device.create_swapchain(surface, &create_desc)?;
        self.swapchain = Some(swapchain);

        for image in device.swapchain_images(swapchain)? {
            let view = device.create_image_view(image, format.format)?;
            self.images.push(SwapImage { image, view });
        }

        for _ in 0..self.images.len() {
            let acquire = device.create_semaphore()?;
            let present = match device.create_semaphore() {
                Ok(semaphore) => semaphore,
                Err(e) => {
                    device.destroy_semaphore(acquire);
                    return Err(e);
                }
            };
            self.sync_pairs.push(SyncPair { acquire, present });
        }

        Ok(PresenterInfo {
            format,
            present_mode,
            image_extent: create_desc.image_extent,
            image_count: self.images.len() as u32,
        })
    }

    fn destroy(&mut self, device: &D) {
        for pair in self.sync_pairs.drain(..) {
            device.destroy_semaphore(pair.acquire);
            device.destroy_semaphore(pair.present);
        }
        for image in self.images.drain(..) {
            device.destroy_image_view(image.view);
        }
        if let Some(swapchain) = self.swapchain.take() {
            device.destroy_swapchain(swapchain);
        }
    }
}

// ============================================================================
// SwapchainController
// ============================================================================

/// Owner of the swapchain of one surface
///
/// The surface outlives every swapchain generation. Sync pairs are used
/// round-robin: the slot advances each time an acquired image is presented.
pub struct SwapchainController<D: PresentDevice> {
    device: Arc<D>,
    config: PresenterConfig,
    desc: PresenterDesc,
    info: PresenterInfo,
    objects: SwapchainObjects<D>,
    sync_index: usize,
    acquired: Option<u32>,
    recreation_count: u64,
    surface: SurfaceManager<D>,
}

impl<D: PresentDevice> SwapchainController<D> {
    /// Create the surface and a first swapchain for `desc`
    ///
    /// Nothing is left alive on failure, the surface included.
    pub fn new(
        device: Arc<D>,
        target: &WindowTarget,
        desc: PresenterDesc,
        config: PresenterConfig,
    ) -> Result<Self> {
        desc.validate()?;
        let surface = SurfaceManager::new(device.clone(), target)?;

        let mut objects = SwapchainObjects::<D>::empty();
        let info = match objects.build(&*device, surface.surface(), &desc) {
            Ok(info) => info,
            Err(e) => {
                objects.destroy(&*device);
                bridge_error!("bridge::swapchain", "Failed to create swapchain: {}", e);
                return Err(e);
            }
        };

        bridge_info!(
            "bridge::swapchain",
            "Swapchain created: {:?} {:?}, {}x{}, {} images",
            info.format.format, info.present_mode,
            info.image_extent.width, info.image_extent.height, info.image_count
        );

        Ok(Self {
            device,
            config,
            desc,
            info,
            objects,
            sync_index: 0,
            acquired: None,
            recreation_count: 0,
            surface,
        })
    }

    /// Replace the swapchain with one negotiated for `desc`, keeping the surface
    ///
    /// On failure the controller has no swapchain until the next successful
    /// recreation.
    pub fn recreate_swap_chain(&mut self, desc: &PresenterDesc) -> Result<()> {
        desc.validate()?;
        self.device.wait_idle()?;

        self.objects.destroy(&*self.device);
        self.sync_index = 0;
        self.acquired = None;
        self.recreation_count += 1;
        self.desc = desc.clone();

        match self.objects.build(&*self.device, self.surface.surface(), &self.desc) {
            Ok(info) => {
                if info != self.info {
                    bridge_info!(
                        "bridge::swapchain",
                        "Swapchain recreated: {:?} {:?}, {}x{}, {} images",
                        info.format.format, info.present_mode,
                        info.image_extent.width, info.image_extent.height, info.image_count
                    );
                } else {
                    bridge_debug!("bridge::swapchain", "Swapchain recreated with unchanged parameters");
                }
                self.info = info;
                Ok(())
            }
            Err(e) => {
                self.objects.destroy(&*self.device);
                bridge_error!("bridge::swapchain", "Failed to recreate swapchain: {}", e);
                Err(e)
            }
        }
    }

    /// Acquire the next image, signaling `signal` once it can be written
    pub fn acquire_next_image(&mut self, signal: D::Semaphore) -> Result<(u32, SurfaceStatus)> {
        let swapchain = self.current_swapchain()?;
        let (index, status) = self
            .device
            .acquire_next_image(swapchain, signal, self.config.acquire_timeout)?;

        if status == SurfaceStatus::OutOfDate {
            bridge_debug!("bridge::swapchain", "Acquire reported out-of-date surface");
            return Ok((index, status));
        }
        if index as usize >= self.objects.images.len() {
            return Err(crate::bridge_err!(
                "bridge::swapchain",
                "Acquired image index {} out of range ({} images)",
                index, self.objects.images.len()
            ));
        }

        bridge_trace!("bridge::swapchain", "Acquired image {} ({:?})", index, status);
        self.acquired = Some(index);
        Ok((index, status))
    }

    /// Present the acquired image once `wait` is signaled, then advance the sync slot
    pub fn present_image(&mut self, wait: D::Semaphore) -> Result<SurfaceStatus> {
        let swapchain = self.current_swapchain()?;
        let index = self
            .acquired
            .take()
            .ok_or_else(|| Error::InvalidResource("no swapchain image acquired".to_string()))?;

        let status = self.device.queue_present(swapchain, index, wait)?;
        self.sync_index = (self.sync_index + 1) % self.objects.sync_pairs.len().max(1);

        bridge_trace!("bridge::swapchain", "Presented image {} ({:?})", index, status);
        Ok(status)
    }

    /// False after a failed recreation, until the next successful one
    pub fn is_available(&self) -> bool {
        self.objects.swapchain.is_some()
    }

    /// Semaphores of the current sync slot
    pub fn sync_semaphores(&self) -> Result<SyncPair<D::Semaphore>> {
        self.objects
            .sync_pairs
            .get(self.sync_index)
            .copied()
            .ok_or_else(|| Error::SurfaceLost("swapchain unavailable".to_string()))
    }

    pub fn image(&self, index: u32) -> Option<SwapImage<D::Image, D::ImageView>> {
        self.objects.images.get(index as usize).copied()
    }

    pub fn info(&self) -> PresenterInfo {
        self.info
    }

    /// Number of recreations since construction
    pub fn recreation_count(&self) -> u64 {
        self.recreation_count
    }

    fn current_swapchain(&self) -> Result<D::Swapchain> {
        self.objects
            .swapchain
            .ok_or_else(|| Error::SurfaceLost("swapchain unavailable".to_string()))
    }
}

impl<D: PresentDevice> Drop for SwapchainController<D> {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            bridge_warn!("bridge::swapchain", "wait_idle failed during teardown: {}", e);
        }
        self.objects.destroy(&*self.device);
        bridge_debug!("bridge::swapchain", "Swapchain destroyed");
    }
}

#[cfg(test)]
#[path = "swapchain_tests.rs"]
mod tests;
