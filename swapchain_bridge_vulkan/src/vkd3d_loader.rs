/// Vkd3dLoader - dynamically resolved vkd3d entry points
///
/// The library is opened once and every entry point is resolved eagerly.
/// A missing symbol is logged when the library is loaded; calling it later
/// fails with `Error::CapabilityUnavailable` instead of crashing.

use std::ffi::c_void;

use ash::vk;
use libloading::Library;
use swapchain_bridge::bridge::{Error, Result};
use swapchain_bridge::{bridge_debug, bridge_error, bridge_info};

use crate::vkd3d_types::{Hresult, Vkd3dImageResourceCreateInfo};

/// Default soname of the vkd3d library
pub const VKD3D_LIBRARY_NAME: &str = "libvkd3d.so.1";

type PfnGetVkDevice = unsafe extern "C" fn(device: *mut c_void) -> vk::Device;
type PfnGetVkPhysicalDevice = unsafe extern "C" fn(device: *mut c_void) -> vk::PhysicalDevice;
type PfnInstanceFromDevice = unsafe extern "C" fn(device: *mut c_void) -> *mut c_void;
type PfnInstanceGetVkInstance = unsafe extern "C" fn(instance: *mut c_void) -> vk::Instance;
type PfnGetVkQueueFamilyIndex = unsafe extern "C" fn(queue: *mut c_void) -> u32;
type PfnAcquireVkQueue = unsafe extern "C" fn(queue: *mut c_void) -> vk::Queue;
type PfnReleaseVkQueue = unsafe extern "C" fn(queue: *mut c_void);
type PfnCreateImageResource = unsafe extern "C" fn(
    device: *mut c_void,
    create_info: *const Vkd3dImageResourceCreateInfo,
    resource: *mut *mut c_void,
) -> Hresult;
type PfnResourceIncref = unsafe extern "C" fn(resource: *mut c_void) -> u32;
type PfnResourceDecref = unsafe extern "C" fn(resource: *mut c_void) -> u32;
type PfnGetVkFormat = unsafe extern "C" fn(dxgi_format: u32) -> vk::Format;

/// Resolve `name` from `library`, logging when it is missing
///
/// # Safety
///
/// `T` must be the function pointer type of the exported symbol.
unsafe fn symbol<T: Copy>(library: &Library, library_name: &str, name: &'static str) -> Option<T> {
    match library.get::<T>(name.as_bytes()) {
        Ok(sym) => Some(*sym),
        Err(e) => {
            bridge_error!("bridge::vulkan::loader", "{}: {} = null ({})", library_name, name, e);
            None
        }
    }
}

fn require<T: Copy>(function: Option<T>, name: &'static str) -> Result<T> {
    function.ok_or(Error::CapabilityUnavailable(name))
}

/// vkd3d library handle and its resolved entry points
pub struct Vkd3dLoader {
    library_name: String,

    get_vk_device: Option<PfnGetVkDevice>,
    get_vk_physical_device: Option<PfnGetVkPhysicalDevice>,
    instance_from_device: Option<PfnInstanceFromDevice>,
    instance_get_vk_instance: Option<PfnInstanceGetVkInstance>,

    get_vk_queue_family_index: Option<PfnGetVkQueueFamilyIndex>,
    acquire_vk_queue: Option<PfnAcquireVkQueue>,
    release_vk_queue: Option<PfnReleaseVkQueue>,

    create_image_resource: Option<PfnCreateImageResource>,
    resource_incref: Option<PfnResourceIncref>,
    resource_decref: Option<PfnResourceDecref>,

    get_vk_format: Option<PfnGetVkFormat>,

    /// Keeps the resolved entry points valid; dropped last
    _library: Library,
}

impl Vkd3dLoader {
    /// Load the system vkd3d library
    pub fn load() -> Result<Self> {
        Self::load_from(VKD3D_LIBRARY_NAME)
    }

    /// Load vkd3d from `path`
    pub fn load_from(path: &str) -> Result<Self> {
        // SAFETY: vkd3d has no library constructors with preconditions
        let library = unsafe { Library::new(path) }.map_err(|e| {
            bridge_error!("bridge::vulkan::loader", "{}: Failed to load library: {}", path, e);
            Error::InitializationFailed(format!("{}: Failed to load library: {}", path, e))
        })?;

        // SAFETY: every type matches the vkd3d.h prototype of its symbol
        let loader = unsafe {
            Self {
                get_vk_device: symbol(&library, path, "vkd3d_get_vk_device"),
                get_vk_physical_device: symbol(&library, path, "vkd3d_get_vk_physical_device"),
                instance_from_device: symbol(&library, path, "vkd3d_instance_from_device"),
                instance_get_vk_instance: symbol(&library, path, "vkd3d_instance_get_vk_instance"),
                get_vk_queue_family_index: symbol(&library, path, "vkd3d_get_vk_queue_family_index"),
                acquire_vk_queue: symbol(&library, path, "vkd3d_acquire_vk_queue"),
                release_vk_queue: symbol(&library, path, "vkd3d_release_vk_queue"),
                create_image_resource: symbol(&library, path, "vkd3d_create_image_resource"),
                resource_incref: symbol(&library, path, "vkd3d_resource_incref"),
                resource_decref: symbol(&library, path, "vkd3d_resource_decref"),
                get_vk_format: symbol(&library, path, "vkd3d_get_vk_format"),
                library_name: path.to_string(),
                _library: library,
            }
        };

        let missing = loader.missing_symbols();
        if missing.is_empty() {
            bridge_info!("bridge::vulkan::loader", "Loaded {}", path);
        } else {
            bridge_info!(
                "bridge::vulkan::loader",
                "Loaded {} with {} unresolved entry points",
                path, missing.len()
            );
        }
        Ok(loader)
    }

    pub fn library_name(&self) -> &str {
        &self.library_name
    }

    /// Names of the entry points the library does not export
    pub fn missing_symbols(&self) -> Vec<&'static str> {
        let resolved = [
            ("vkd3d_get_vk_device", self.get_vk_device.is_some()),
            ("vkd3d_get_vk_physical_device", self.get_vk_physical_device.is_some()),
            ("vkd3d_instance_from_device", self.instance_from_device.is_some()),
            ("vkd3d_instance_get_vk_instance", self.instance_get_vk_instance.is_some()),
            ("vkd3d_get_vk_queue_family_index", self.get_vk_queue_family_index.is_some()),
            ("vkd3d_acquire_vk_queue", self.acquire_vk_queue.is_some()),
            ("vkd3d_release_vk_queue", self.release_vk_queue.is_some()),
            ("vkd3d_create_image_resource", self.create_image_resource.is_some()),
            ("vkd3d_resource_incref", self.resource_incref.is_some()),
            ("vkd3d_resource_decref", self.resource_decref.is_some()),
            ("vkd3d_get_vk_format", self.get_vk_format.is_some()),
        ];
        resolved
            .iter()
            .filter(|(_, found)| !found)
            .map(|(name, _)| *name)
            .collect()
    }

    // ===== DEVICE QUERIES =====
    //
    // SAFETY (all methods below): the pointer arguments must be live vkd3d
    // objects of the type named by the parameter.

    pub unsafe fn get_vk_device(&self, device: *mut c_void) -> Result<vk::Device> {
        Ok(require(self.get_vk_device, "vkd3d_get_vk_device")?(device))
    }

    pub unsafe fn get_vk_physical_device(&self, device: *mut c_void) -> Result<vk::PhysicalDevice> {
        Ok(require(self.get_vk_physical_device, "vkd3d_get_vk_physical_device")?(device))
    }

    /// Vulkan instance of the vkd3d instance owning `device`
    pub unsafe fn get_vk_instance(&self, device: *mut c_void) -> Result<vk::Instance> {
        let instance_from_device = require(self.instance_from_device, "vkd3d_instance_from_device")?;
        let get_vk_instance = require(self.instance_get_vk_instance, "vkd3d_instance_get_vk_instance")?;

        let instance = instance_from_device(device);
        if instance.is_null() {
            return Err(Error::InitializationFailed("vkd3d device has no instance".to_string()));
        }
        Ok(get_vk_instance(instance))
    }

    // ===== QUEUE ACCESS =====

    pub unsafe fn get_vk_queue_family_index(&self, queue: *mut c_void) -> Result<u32> {
        Ok(require(self.get_vk_queue_family_index, "vkd3d_get_vk_queue_family_index")?(queue))
    }

    /// Lock the Vulkan queue behind `queue`; pair with `release_vk_queue`
    pub unsafe fn acquire_vk_queue(&self, queue: *mut c_void) -> Result<vk::Queue> {
        // Both halves must exist before the queue gets locked
        require(self.release_vk_queue, "vkd3d_release_vk_queue")?;
        Ok(require(self.acquire_vk_queue, "vkd3d_acquire_vk_queue")?(queue))
    }

    pub unsafe fn release_vk_queue(&self, queue: *mut c_void) -> Result<()> {
        require(self.release_vk_queue, "vkd3d_release_vk_queue")?(queue);
        Ok(())
    }

    // ===== RESOURCES =====

    /// Wrap a Vulkan image as a D3D12 resource
    ///
    /// On success `resource` holds one COM reference.
    pub unsafe fn create_image_resource(
        &self,
        device: *mut c_void,
        create_info: &Vkd3dImageResourceCreateInfo,
        resource: &mut *mut c_void,
    ) -> Result<Hresult> {
        let create = require(self.create_image_resource, "vkd3d_create_image_resource")?;
        Ok(create(device, create_info, resource))
    }

    pub unsafe fn resource_incref(&self, resource: *mut c_void) -> Result<u32> {
        Ok(require(self.resource_incref, "vkd3d_resource_incref")?(resource))
    }

    pub unsafe fn resource_decref(&self, resource: *mut c_void) -> Result<u32> {
        Ok(require(self.resource_decref, "vkd3d_resource_decref")?(resource))
    }

    /// Vulkan format vkd3d uses for a DXGI format
    pub fn get_vk_format(&self, dxgi_format: u32) -> Result<vk::Format> {
        let get_vk_format = require(self.get_vk_format, "vkd3d_get_vk_format")?;
        // SAFETY: plain table lookup, no pointer arguments
        Ok(unsafe { get_vk_format(dxgi_format) })
    }
}

impl Drop for Vkd3dLoader {
    fn drop(&mut self) {
        bridge_debug!("bridge::vulkan::loader", "Unloading {}", self.library_name);
    }
}
