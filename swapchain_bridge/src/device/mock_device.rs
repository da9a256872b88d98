/// Mock presentation device and resource bridge for unit tests (no GPU required)
///
/// The mock keeps every live object in a table so tests can check for leaks,
/// records the calls that matter for ordering checks, and lets tests script
/// acquire/present outcomes and inject failures.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use raw_window_handle::{
    RawDisplayHandle, RawWindowHandle, XlibDisplayHandle, XlibWindowHandle,
};

use crate::device::{
    DeviceInfo, Extent2D, Format, ImageDesc, ImageLayout, MemoryPropertyFlags,
    MemoryRequirements, MemoryType, PresentDevice, PresentMode, SurfaceCapabilities,
    SurfaceFormat, SurfaceStatus, SwapchainCreateDesc, WindowTarget,
};
use crate::error::{Error, Result};
use crate::log::{LogEntry, Logger};
use crate::presenter::{ImportDesc, ResourceBridge};

/// Mock handle type for every object kind
pub type Handle = u64;

/// Size reported for every mock image allocation
pub const MOCK_IMAGE_SIZE: u64 = 640 * 480 * 4;

// ============================================================================
// Recorded calls
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    CreateSwapchain(SwapchainCreateDesc),
    DestroySwapchain(Handle),
    WaitIdle,
    Acquire { signal: Handle },
    WaitFence { fence: Handle, blocked: bool },
    ResetFence(Handle),
    ResetPool(Handle),
    Begin(Handle),
    Barrier { image: Handle, old: ImageLayout, new: ImageLayout },
    Blit { src: Handle, src_extent: Extent2D, dst: Handle, dst_extent: Extent2D },
    End(Handle),
    Submit { cmd: Handle, wait: Handle, signal: Handle, fence: Handle },
    Present { image_index: u32, wait: Handle },
    Allocate { memory_type: u32, ok: bool },
}

/// Scripted result of one acquire call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Status(SurfaceStatus),
    Timeout,
}

// ============================================================================
// Mock state
// ============================================================================

#[derive(Debug, Default)]
struct LiveObjects {
    surfaces: HashSet<Handle>,
    swapchains: HashMap<Handle, Vec<Handle>>,
    views: HashSet<Handle>,
    semaphores: HashSet<Handle>,
    fences: HashMap<Handle, bool>,
    images: HashSet<Handle>,
    memories: HashSet<Handle>,
    pools: HashSet<Handle>,
}

impl LiveObjects {
    fn count(&self) -> usize {
        self.surfaces.len()
            + self.swapchains.len()
            + self.views.len()
            + self.semaphores.len()
            + self.fences.len()
            + self.images.len()
            + self.memories.len()
            + self.pools.len()
    }
}

#[derive(Debug)]
pub struct MockState {
    next_handle: Handle,
    live: LiveObjects,
    pub calls: Vec<MockCall>,

    pub capabilities: SurfaceCapabilities,
    pub formats: Vec<SurfaceFormat>,
    pub present_modes: Vec<PresentMode>,
    pub memory_types: Vec<MemoryType>,
    /// Bits of compatible memory types reported for every image
    pub image_memory_type_bits: u32,
    /// Memory types whose allocations fail
    pub failing_memory_types: HashSet<u32>,
    /// Extra images the driver adds on top of the requested count
    pub extra_swapchain_images: u32,

    pub acquire_script: VecDeque<AcquireOutcome>,
    pub present_script: VecDeque<SurfaceStatus>,
    /// Unsignaled fences complete when waited on; otherwise the wait times out
    pub gpu_completes_on_wait: bool,

    /// Operation name -> number of successful calls before it starts failing
    pub fail_after: HashMap<&'static str, usize>,
    op_counts: HashMap<&'static str, usize>,

    last_image_index: HashMap<Handle, u32>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            next_handle: 1,
            live: LiveObjects::default(),
            calls: Vec::new(),
            capabilities: SurfaceCapabilities {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: None,
                min_image_extent: Extent2D::new(1, 1),
                max_image_extent: Extent2D::new(4096, 4096),
            },
            formats: vec![
                SurfaceFormat::srgb_nonlinear(Format::B8G8R8A8_UNORM),
                SurfaceFormat::srgb_nonlinear(Format::B8G8R8A8_SRGB),
            ],
            present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox],
            memory_types: vec![
                MemoryType { property_flags: MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT },
                MemoryType { property_flags: MemoryPropertyFlags::DEVICE_LOCAL },
                MemoryType { property_flags: MemoryPropertyFlags::DEVICE_LOCAL | MemoryPropertyFlags::HOST_VISIBLE },
            ],
            image_memory_type_bits: 0b111,
            failing_memory_types: HashSet::new(),
            extra_swapchain_images: 0,
            acquire_script: VecDeque::new(),
            present_script: VecDeque::new(),
            gpu_completes_on_wait: true,
            fail_after: HashMap::new(),
            op_counts: HashMap::new(),
            last_image_index: HashMap::new(),
        }
    }
}

impl MockState {
    pub fn live_surfaces(&self) -> usize {
        self.live.surfaces.len()
    }

    fn handle(&mut self) -> Handle {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Count one call of `op`, failing once its budget is exhausted
    fn check(&mut self, op: &'static str) -> Result<()> {
        let count = self.op_counts.entry(op).or_insert(0);
        *count += 1;
        match self.fail_after.get(op) {
            Some(&allowed) if *count > allowed => {
                Err(Error::BackendError(format!("mock: {} failed", op)))
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// MockDevice
// ============================================================================

#[derive(Debug, Default)]
pub struct MockDevice {
    state: Mutex<MockState>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable access to the mock configuration and recorded calls
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Number of objects created and not yet destroyed
    pub fn live_object_count(&self) -> usize {
        self.state().live.count()
    }

    pub fn live_fence_count(&self) -> usize {
        self.state().live.fences.len()
    }

    pub fn live_image_count(&self) -> usize {
        self.state().live.images.len()
    }

    pub fn live_semaphore_count(&self) -> usize {
        self.state().live.semaphores.len()
    }

    pub fn is_fence_signaled(&self, fence: Handle) -> bool {
        self.state().live.fences.get(&fence).copied().unwrap_or(false)
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn count_calls(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }
}

impl PresentDevice for MockDevice {
    type Queue = Handle;
    type Adapter = Handle;
    type Surface = Handle;
    type Swapchain = Handle;
    type Image = Handle;
    type ImageView = Handle;
    type Semaphore = Handle;
    type Fence = Handle;
    type Memory = Handle;
    type CommandPool = Handle;
    type CommandBuffer = Handle;

    fn device_info(&self) -> DeviceInfo<Handle, Handle> {
        DeviceInfo { queue_family: 0, queue: 0xA0, adapter: 0xAD }
    }

    fn wait_idle(&self) -> Result<()> {
        let mut state = self.state();
        state.check("wait_idle")?;
        for signaled in state.live.fences.values_mut() {
            *signaled = true;
        }
        state.calls.push(MockCall::WaitIdle);
        Ok(())
    }

    fn create_surface(&self, _target: &WindowTarget) -> Result<Handle> {
        let mut state = self.state();
        state.check("create_surface")?;
        let handle = state.handle();
        state.live.surfaces.insert(handle);
        Ok(handle)
    }

    fn destroy_surface(&self, surface: Handle) {
        assert!(self.state().live.surfaces.remove(&surface), "double surface destroy");
    }

    fn surface_capabilities(&self, _surface: Handle) -> Result<SurfaceCapabilities> {
        let mut state = self.state();
        state.check("surface_capabilities")?;
        Ok(state.capabilities)
    }

    fn surface_formats(&self, _surface: Handle) -> Result<Vec<SurfaceFormat>> {
        Ok(self.state().formats.clone())
    }

    fn surface_present_modes(&self, _surface: Handle) -> Result<Vec<PresentMode>> {
        Ok(self.state().present_modes.clone())
    }

    fn create_swapchain(&self, surface: Handle, desc: &SwapchainCreateDesc) -> Result<Handle> {
        let mut state = self.state();
        state.check("create_swapchain")?;
        assert!(state.live.surfaces.contains(&surface), "swapchain on dead surface");
        let image_count = desc.min_image_count + state.extra_swapchain_images;
        let images: Vec<Handle> = (0..image_count).map(|_| state.handle()).collect();
        let handle = state.handle();
        state.live.swapchains.insert(handle, images);
        state.calls.push(MockCall::CreateSwapchain(*desc));
        Ok(handle)
    }

    fn destroy_swapchain(&self, swapchain: Handle) {
        let mut state = self.state();
        assert!(state.live.swapchains.remove(&swapchain).is_some(), "double swapchain destroy");
        state.last_image_index.remove(&swapchain);
        state.calls.push(MockCall::DestroySwapchain(swapchain));
    }

    fn swapchain_images(&self, swapchain: Handle) -> Result<Vec<Handle>> {
        self.state()
            .live
            .swapchains
            .get(&swapchain)
            .cloned()
            .ok_or_else(|| Error::InvalidResource("mock: unknown swapchain".to_string()))
    }

    fn create_image_view(&self, _image: Handle, _format: Format) -> Result<Handle> {
        let mut state = self.state();
        state.check("create_image_view")?;
        let handle = state.handle();
        state.live.views.insert(handle);
        Ok(handle)
    }

    fn destroy_image_view(&self, view: Handle) {
        assert!(self.state().live.views.remove(&view), "double view destroy");
    }

    fn acquire_next_image(
        &self,
        swapchain: Handle,
        signal: Handle,
        _timeout: Duration,
    ) -> Result<(u32, SurfaceStatus)> {
        let mut state = self.state();
        state.check("acquire_next_image")?;
        state.calls.push(MockCall::Acquire { signal });
        let outcome = state
            .acquire_script
            .pop_front()
            .unwrap_or(AcquireOutcome::Status(SurfaceStatus::Optimal));

        let status = match outcome {
            AcquireOutcome::Timeout => {
                return Err(Error::DeviceLost("mock: acquire timed out".to_string()));
            }
            AcquireOutcome::Status(status) => status,
        };
        if status == SurfaceStatus::OutOfDate {
            return Ok((0, status));
        }

        let image_count = state.live.swapchains.get(&swapchain).map_or(0, |i| i.len()) as u32;
        let index = match state.last_image_index.get(&swapchain) {
            Some(&last) => (last + 1) % image_count.max(1),
            None => 0,
        };
        state.last_image_index.insert(swapchain, index);
        Ok((index, status))
    }

    fn queue_present(&self, _swapchain: Handle, image_index: u32, wait: Handle) -> Result<SurfaceStatus> {
        let mut state = self.state();
        state.check("queue_present")?;
        state.calls.push(MockCall::Present { image_index, wait });
        Ok(state.present_script.pop_front().unwrap_or(SurfaceStatus::Optimal))
    }

    fn create_semaphore(&self) -> Result<Handle> {
        let mut state = self.state();
        state.check("create_semaphore")?;
        let handle = state.handle();
        state.live.semaphores.insert(handle);
        Ok(handle)
    }

    fn destroy_semaphore(&self, semaphore: Handle) {
        assert!(self.state().live.semaphores.remove(&semaphore), "double semaphore destroy");
    }

    fn create_fence(&self, signaled: bool) -> Result<Handle> {
        let mut state = self.state();
        state.check("create_fence")?;
        let handle = state.handle();
        state.live.fences.insert(handle, signaled);
        Ok(handle)
    }

    fn destroy_fence(&self, fence: Handle) {
        assert!(self.state().live.fences.remove(&fence).is_some(), "double fence destroy");
    }

    fn wait_for_fence(&self, fence: Handle, _timeout: Duration) -> Result<()> {
        let mut state = self.state();
        let completes = state.gpu_completes_on_wait;
        let signaled = state
            .live
            .fences
            .get_mut(&fence)
            .ok_or_else(|| Error::InvalidResource("mock: unknown fence".to_string()))?;

        if *signaled {
            state.calls.push(MockCall::WaitFence { fence, blocked: false });
            return Ok(());
        }
        if !completes {
            return Err(Error::DeviceLost("mock: fence wait timed out".to_string()));
        }
        *signaled = true;
        state.calls.push(MockCall::WaitFence { fence, blocked: true });
        Ok(())
    }

    fn reset_fence(&self, fence: Handle) -> Result<()> {
        let mut state = self.state();
        state.check("reset_fence")?;
        if let Some(signaled) = state.live.fences.get_mut(&fence) {
            *signaled = false;
        }
        state.calls.push(MockCall::ResetFence(fence));
        Ok(())
    }

    fn create_image(&self, _desc: &ImageDesc) -> Result<Handle> {
        let mut state = self.state();
        state.check("create_image")?;
        let handle = state.handle();
        state.live.images.insert(handle);
        Ok(handle)
    }

    fn destroy_image(&self, image: Handle) {
        assert!(self.state().live.images.remove(&image), "double image destroy");
    }

    fn image_memory_requirements(&self, _image: Handle) -> MemoryRequirements {
        MemoryRequirements {
            size: MOCK_IMAGE_SIZE,
            memory_type_bits: self.state().image_memory_type_bits,
        }
    }

    fn memory_types(&self) -> Vec<MemoryType> {
        self.state().memory_types.clone()
    }

    fn allocate_image_memory(&self, _image: Handle, _size: u64, memory_type: u32) -> Result<Handle> {
        let mut state = self.state();
        if state.failing_memory_types.contains(&memory_type) {
            state.calls.push(MockCall::Allocate { memory_type, ok: false });
            return Err(Error::OutOfMemory);
        }
        state.calls.push(MockCall::Allocate { memory_type, ok: true });
        let handle = state.handle();
        state.live.memories.insert(handle);
        Ok(handle)
    }

    fn free_memory(&self, memory: Handle) {
        assert!(self.state().live.memories.remove(&memory), "double memory free");
    }

    fn bind_image_memory(&self, _image: Handle, _memory: Handle) -> Result<()> {
        self.state().check("bind_image_memory")
    }

    fn create_command_pool(&self) -> Result<Handle> {
        let mut state = self.state();
        state.check("create_command_pool")?;
        let handle = state.handle();
        state.live.pools.insert(handle);
        Ok(handle)
    }

    fn destroy_command_pool(&self, pool: Handle) {
        assert!(self.state().live.pools.remove(&pool), "double pool destroy");
    }

    fn reset_command_pool(&self, pool: Handle) -> Result<()> {
        let mut state = self.state();
        state.check("reset_command_pool")?;
        state.calls.push(MockCall::ResetPool(pool));
        Ok(())
    }

    fn allocate_command_buffer(&self, _pool: Handle) -> Result<Handle> {
        let mut state = self.state();
        state.check("allocate_command_buffer")?;
        Ok(state.handle())
    }

    fn begin_command_buffer(&self, cmd: Handle) -> Result<()> {
        let mut state = self.state();
        state.check("begin_command_buffer")?;
        state.calls.push(MockCall::Begin(cmd));
        Ok(())
    }

    fn end_command_buffer(&self, cmd: Handle) -> Result<()> {
        let mut state = self.state();
        state.check("end_command_buffer")?;
        state.calls.push(MockCall::End(cmd));
        Ok(())
    }

    fn cmd_image_barrier(&self, _cmd: Handle, image: Handle, old: ImageLayout, new: ImageLayout) {
        self.state().calls.push(MockCall::Barrier { image, old, new });
    }

    fn cmd_blit_image(
        &self,
        _cmd: Handle,
        src: Handle,
        src_extent: Extent2D,
        dst: Handle,
        dst_extent: Extent2D,
    ) {
        self.state().calls.push(MockCall::Blit { src, src_extent, dst, dst_extent });
    }

    fn queue_submit(&self, cmd: Handle, wait: Handle, signal: Handle, fence: Handle) -> Result<()> {
        let mut state = self.state();
        state.check("queue_submit")?;
        match state.live.fences.get_mut(&fence) {
            Some(signaled) => {
                assert!(!*signaled, "submitting with a signaled fence");
            }
            None => panic!("submit with unknown fence"),
        }
        state.calls.push(MockCall::Submit { cmd, wait, signal, fence });
        Ok(())
    }
}

// ============================================================================
// MockBridge
// ============================================================================

/// Producer resource handed out by MockBridge (deliberately not Clone)
#[derive(Debug, PartialEq, Eq)]
pub struct MockResource {
    pub id: u64,
    pub image: Handle,
}

#[derive(Debug, Default)]
pub struct MockBridgeState {
    next_id: u64,
    /// Resource id -> (increfs, decrefs)
    pub refcounts: HashMap<u64, (u32, u32)>,
    /// Transient references dropped during import
    pub transient_releases: u32,
    /// Imports allowed before import starts failing
    pub fail_after: Option<usize>,
    imports: usize,
}

#[derive(Debug, Default)]
pub struct MockBridge {
    state: Mutex<MockBridgeState>,
}

impl MockBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockBridgeState> {
        self.state.lock().unwrap()
    }

    /// Resources whose reference count is not back to zero
    pub fn outstanding(&self) -> usize {
        self.state().refcounts.values().filter(|(inc, dec)| inc != dec).count()
    }
}

impl ResourceBridge<MockDevice> for MockBridge {
    type Resource = MockResource;
    type ProducerDevice = &'static str;

    fn import(&self, image: Handle, _desc: &ImportDesc) -> Result<MockResource> {
        let mut state = self.state();
        if let Some(allowed) = state.fail_after {
            if state.imports >= allowed {
                return Err(Error::InvalidResource("mock: import failed".to_string()));
            }
        }
        state.imports += 1;
        state.next_id += 1;
        let id = state.next_id;
        state.refcounts.insert(id, (1, 0));
        state.transient_releases += 1;
        Ok(MockResource { id, image })
    }

    fn release(&self, resource: MockResource) {
        let mut state = self.state();
        let counts = state.refcounts.get_mut(&resource.id).expect("release of unknown resource");
        counts.1 += 1;
    }

    fn producer_device(&self) -> &'static str {
        "mock-producer-device"
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Window target with dummy Xlib handles
pub fn mock_window() -> WindowTarget {
    WindowTarget::new(
        RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0)),
        RawWindowHandle::Xlib(XlibWindowHandle::new(1)),
    )
}

/// Logger capturing entries for verification
pub struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CaptureLogger {
    pub fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}
