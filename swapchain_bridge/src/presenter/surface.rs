/// SurfaceManager - owns the platform surface of one window

use std::sync::Arc;

use crate::device::{PresentDevice, WindowTarget};
use crate::error::Result;
use crate::{bridge_debug, bridge_error};

/// Native surface bound to a window
///
/// Created once per presenter and destroyed when dropped. Swapchains are
/// recreated against the same surface.
pub struct SurfaceManager<D: PresentDevice> {
    device: Arc<D>,
    surface: D::Surface,
}

impl<D: PresentDevice> SurfaceManager<D> {
    pub fn new(device: Arc<D>, target: &WindowTarget) -> Result<Self> {
        let surface = device.create_surface(target).map_err(|e| {
            bridge_error!("bridge::surface", "Failed to create surface: {}", e);
            e
        })?;
        bridge_debug!("bridge::surface", "Created surface {:?}", surface);

        Ok(Self { device, surface })
    }

    pub fn surface(&self) -> D::Surface {
        self.surface
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }
}

impl<D: PresentDevice> Drop for SurfaceManager<D> {
    fn drop(&mut self) {
        bridge_debug!("bridge::surface", "Destroying surface {:?}", self.surface);
        self.device.destroy_surface(self.surface);
    }
}
