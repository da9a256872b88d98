/// C types shared with vkd3d (vkd3d.h / d3d12.h subset)

use std::ffi::c_void;

use ash::vk;

/// COM result code; negative values are failures
pub type Hresult = i32;

pub const VKD3D_STRUCTURE_TYPE_IMAGE_RESOURCE_CREATE_INFO: u32 = 2;

pub const VKD3D_RESOURCE_INITIAL_STATE_TRANSITION: u32 = 0x1;
pub const VKD3D_RESOURCE_PRESENT_STATE_TRANSITION: u32 = 0x2;

pub const D3D12_RESOURCE_DIMENSION_TEXTURE2D: u32 = 3;
pub const D3D12_TEXTURE_LAYOUT_UNKNOWN: u32 = 0;
pub const D3D12_RESOURCE_FLAG_ALLOW_RENDER_TARGET: u32 = 0x1;
pub const D3D12_RESOURCE_FLAG_ALLOW_UNORDERED_ACCESS: u32 = 0x4;
pub const D3D12_RESOURCE_STATE_COPY_SOURCE: u32 = 0x800;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub struct DXGI_SAMPLE_DESC {
    pub count: u32,
    pub quality: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub struct D3D12_RESOURCE_DESC {
    pub dimension: u32,
    pub alignment: u64,
    pub width: u64,
    pub height: u32,
    pub depth_or_array_size: u16,
    pub mip_levels: u16,
    pub format: u32,
    pub sample_desc: DXGI_SAMPLE_DESC,
    pub layout: u32,
    pub flags: u32,
}

/// `struct vkd3d_image_resource_create_info`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Vkd3dImageResourceCreateInfo {
    pub ty: u32,
    pub next: *const c_void,
    pub vk_image: vk::Image,
    pub desc: D3D12_RESOURCE_DESC,
    pub flags: u32,
    pub present_state: u32,
}

#[repr(C)]
struct IUnknownVtbl {
    query_interface: unsafe extern "system" fn(*mut c_void, *const c_void, *mut *mut c_void) -> Hresult,
    add_ref: unsafe extern "system" fn(*mut c_void) -> u32,
    release: unsafe extern "system" fn(*mut c_void) -> u32,
}

#[repr(C)]
struct IUnknown {
    vtbl: *const IUnknownVtbl,
}

/// `IUnknown::AddRef`
///
/// # Safety
///
/// `object` must be a live COM object.
pub unsafe fn com_add_ref(object: *mut c_void) -> u32 {
    let unknown = object as *mut IUnknown;
    ((*(*unknown).vtbl).add_ref)(object)
}

/// `IUnknown::Release`
///
/// # Safety
///
/// `object` must be a live COM object on which the caller owns a reference.
pub unsafe fn com_release(object: *mut c_void) -> u32 {
    let unknown = object as *mut IUnknown;
    ((*(*unknown).vtbl).release)(object)
}
