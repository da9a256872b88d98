/*!
# Swapchain Bridge - Vulkan / vkd3d Backend

Presents the output of a vkd3d `ID3D12Device` through a Vulkan swapchain.

vkd3d is loaded at runtime with `libloading`; the Vulkan instance, device and
queue are the ones vkd3d created, reached through ash. Back buffers are
Vulkan images wrapped as `ID3D12Resource`s by `vkd3d_create_image_resource`.

# Example

```no_run
use std::sync::Arc;
use swapchain_bridge::bridge::PresenterConfig;
use swapchain_bridge::bridge::device::WindowTarget;
use swapchain_bridge::bridge::presenter::{BufferFormat, BufferUsage, PresentFlags, SwapChainDesc};
use swapchain_bridge_vulkan::{create_swap_chain, Vkd3dLoader};

# fn run(d3d12_device: *mut std::ffi::c_void, queue: *mut std::ffi::c_void, target: WindowTarget)
# -> swapchain_bridge::bridge::Result<()> {
let loader = Arc::new(Vkd3dLoader::load()?);
let desc = SwapChainDesc {
    width: 1280,
    height: 720,
    format: BufferFormat::B8G8R8A8_UNORM,
    buffer_count: 2,
    buffer_usage: BufferUsage::RENDER_TARGET_OUTPUT,
};
let mut presenter = unsafe {
    create_swap_chain(loader, d3d12_device, queue, &target, desc, PresenterConfig::default())?
};
presenter.present(1, PresentFlags::empty(), None)?;
# Ok(())
# }
```
*/

mod vkd3d;
mod vkd3d_loader;
mod vkd3d_types;
mod vulkan_bridge;
mod vulkan_device;
mod vulkan_format;

use std::ffi::c_void;
use std::sync::Arc;

use swapchain_bridge::bridge::device::WindowTarget;
use swapchain_bridge::bridge::presenter::{Presenter, SwapChainDesc};
use swapchain_bridge::bridge::{PresenterConfig, Result};
use swapchain_bridge::{bridge_info, bridge_warn};

pub use vkd3d::{D3D12Device, QueueGuard, Vkd3dContext};
pub use vkd3d_loader::{Vkd3dLoader, VKD3D_LIBRARY_NAME};
pub use vulkan_bridge::{Vkd3dResource, Vkd3dResourceBridge};
pub use vulkan_device::VulkanDevice;
pub use vulkan_format::{buffer_format_from_dxgi, buffer_format_to_dxgi};

/// Swap chain presenting a vkd3d device through Vulkan
pub type VulkanPresenter = Presenter<VulkanDevice, Vkd3dResourceBridge>;

/// Create a swap chain for `command_queue` presenting to `target`
///
/// # Safety
///
/// `d3d12_device` must be a live vkd3d `ID3D12Device` created by the library
/// behind `loader`, and `command_queue` one of its direct command queues. The
/// window behind `target` must outlive the returned presenter.
pub unsafe fn create_swap_chain(
    loader: Arc<Vkd3dLoader>,
    d3d12_device: *mut c_void,
    command_queue: *mut c_void,
    target: &WindowTarget,
    desc: SwapChainDesc,
    config: PresenterConfig,
) -> Result<VulkanPresenter> {
    check_format_mapping(&loader, &desc);

    let context = Arc::new(Vkd3dContext::new(loader, d3d12_device, command_queue)?);
    let device = Arc::new(VulkanDevice::new(Arc::clone(&context))?);
    let bridge = Arc::new(Vkd3dResourceBridge::new(context));

    let presenter = Presenter::create(device, bridge, target, desc, config)?;
    let info = presenter.info();
    bridge_info!(
        "bridge::vulkan",
        "Swap chain created: {:?} {:?}, {} images",
        info.format.format, info.present_mode, info.image_count
    );
    Ok(presenter)
}

/// Warn when vkd3d would view the back buffer with another Vulkan format
fn check_format_mapping(loader: &Vkd3dLoader, desc: &SwapChainDesc) {
    let Some(expected) = desc.format.image_format().map(vulkan_format::format_to_vk) else {
        return;
    };
    let dxgi = buffer_format_to_dxgi(desc.format);
    match loader.get_vk_format(dxgi) {
        Ok(actual) if actual != expected => bridge_warn!(
            "bridge::vulkan",
            "DXGI format {} maps to {:?} in vkd3d, back buffers use {:?}",
            dxgi, actual, expected
        ),
        Ok(_) => {}
        Err(e) => bridge_warn!("bridge::vulkan", "Cannot check back buffer format: {}", e),
    }
}
