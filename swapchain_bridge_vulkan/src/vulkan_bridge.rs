/// Vkd3dResourceBridge - wraps swapchain back buffer images as D3D12 resources

use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;

use ash::vk;
use swapchain_bridge::bridge::presenter::{ImportDesc, ResourceBridge};
use swapchain_bridge::bridge::{Error, Result};
use swapchain_bridge::{bridge_error, bridge_trace};

use crate::vkd3d::{D3D12Device, Vkd3dContext};
use crate::vkd3d_types::{
    com_release, Hresult, Vkd3dImageResourceCreateInfo, D3D12_RESOURCE_DESC, DXGI_SAMPLE_DESC,
    D3D12_RESOURCE_DIMENSION_TEXTURE2D, D3D12_RESOURCE_FLAG_ALLOW_RENDER_TARGET,
    D3D12_RESOURCE_FLAG_ALLOW_UNORDERED_ACCESS, D3D12_RESOURCE_STATE_COPY_SOURCE,
    D3D12_TEXTURE_LAYOUT_UNKNOWN, VKD3D_RESOURCE_INITIAL_STATE_TRANSITION,
    VKD3D_RESOURCE_PRESENT_STATE_TRANSITION, VKD3D_STRUCTURE_TYPE_IMAGE_RESOURCE_CREATE_INFO,
};
use crate::vulkan_device::VulkanDevice;
use crate::vulkan_format::buffer_format_to_dxgi;

/// `ID3D12Resource` wrapping one back buffer, holding one vkd3d reference
#[derive(Debug)]
pub struct Vkd3dResource {
    resource: *mut c_void,
}

// SAFETY: D3D12 resources are free-threaded
unsafe impl Send for Vkd3dResource {}
unsafe impl Sync for Vkd3dResource {}

impl Vkd3dResource {
    /// Borrowed `ID3D12Resource` pointer
    pub fn as_ptr(&self) -> *mut c_void {
        self.resource
    }
}

/// D3D12 description of an imported back buffer
pub fn resource_desc(desc: &ImportDesc) -> D3D12_RESOURCE_DESC {
    let mut flags = D3D12_RESOURCE_FLAG_ALLOW_RENDER_TARGET;
    if desc.unordered_access {
        flags |= D3D12_RESOURCE_FLAG_ALLOW_UNORDERED_ACCESS;
    }

    D3D12_RESOURCE_DESC {
        dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
        alignment: 0,
        width: desc.extent.width as u64,
        height: desc.extent.height,
        depth_or_array_size: 1,
        mip_levels: 1,
        format: buffer_format_to_dxgi(desc.format),
        sample_desc: DXGI_SAMPLE_DESC { count: 1, quality: 0 },
        layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
        flags,
    }
}

fn failed(hr: Hresult) -> bool {
    hr < 0
}

/// vkd3d side of the bridge
pub struct Vkd3dResourceBridge {
    context: Arc<Vkd3dContext>,
}

impl Vkd3dResourceBridge {
    pub fn new(context: Arc<Vkd3dContext>) -> Self {
        Self { context }
    }
}

impl ResourceBridge<VulkanDevice> for Vkd3dResourceBridge {
    type Resource = Vkd3dResource;
    type ProducerDevice = D3D12Device;

    fn import(&self, image: vk::Image, desc: &ImportDesc) -> Result<Vkd3dResource> {
        let create_info = Vkd3dImageResourceCreateInfo {
            ty: VKD3D_STRUCTURE_TYPE_IMAGE_RESOURCE_CREATE_INFO,
            next: ptr::null(),
            vk_image: image,
            desc: resource_desc(desc),
            flags: VKD3D_RESOURCE_INITIAL_STATE_TRANSITION | VKD3D_RESOURCE_PRESENT_STATE_TRANSITION,
            present_state: D3D12_RESOURCE_STATE_COPY_SOURCE,
        };

        let loader = self.context.loader();
        let mut resource: *mut c_void = ptr::null_mut();
        // SAFETY: the device is kept alive by the context; create_info only
        // references locals
        let hr = unsafe { loader.create_image_resource(self.context.device_ptr(), &create_info, &mut resource) }?;
        if failed(hr) || resource.is_null() {
            bridge_error!("bridge::vulkan::bridge", "vkd3d_create_image_resource failed: {:#010x}", hr);
            return Err(Error::InvalidResource(format!(
                "vkd3d_create_image_resource failed: {:#010x}", hr
            )));
        }

        // Trade the transient COM reference for an internal one, so the
        // producer releasing every public reference cannot free the image
        // SAFETY: resource was just created and holds a COM reference
        let incref = unsafe {
            let incref = loader.resource_incref(resource);
            com_release(resource);
            incref
        };
        incref?;

        bridge_trace!("bridge::vulkan::bridge", "Imported image {:?} as resource {:?}", image, resource);
        Ok(Vkd3dResource { resource })
    }

    fn release(&self, resource: Vkd3dResource) {
        // SAFETY: resource holds the reference taken in import()
        if let Err(e) = unsafe { self.context.loader().resource_decref(resource.resource) } {
            bridge_error!("bridge::vulkan::bridge", "Failed to release resource {:?}: {}", resource.resource, e);
        }
    }

    fn producer_device(&self) -> D3D12Device {
        self.context.d3d12_device()
    }
}
