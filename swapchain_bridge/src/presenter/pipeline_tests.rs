/// Unit tests for FramePresentationPipeline.
///
/// Every scenario runs against the mock device: fences start signaled, a
/// submission unsignals its fence, and waiting on an unsignaled fence is
/// recorded as blocking.

use crate::config::PresenterConfig;
use crate::device::mock_device::{
    mock_window, AcquireOutcome, MockBridge, MockCall, MockDevice,
};
use crate::device::{Extent2D, ImageLayout, PresentMode, SurfaceStatus};
use crate::error::Error;
use crate::presenter::pipeline::FramePresentationPipeline;
use crate::presenter::{BufferFormat, BufferUsage, SwapChainDesc};
use std::sync::Arc;

type Pipeline = FramePresentationPipeline<MockDevice, MockBridge>;

fn desc(width: u32, height: u32, count: u32) -> SwapChainDesc {
    SwapChainDesc {
        width,
        height,
        format: BufferFormat::B8G8R8A8_UNORM,
        buffer_count: count,
        buffer_usage: BufferUsage::RENDER_TARGET_OUTPUT | BufferUsage::BACK_BUFFER,
    }
}

fn setup_with(config: PresenterConfig) -> (Arc<MockDevice>, Arc<MockBridge>, Pipeline) {
    let device = Arc::new(MockDevice::new());
    let bridge = Arc::new(MockBridge::new());
    let pipeline = FramePresentationPipeline::new(
        device.clone(),
        bridge.clone(),
        &mock_window(),
        desc(640, 480, 2),
        config,
    )
    .unwrap();
    device.clear_calls();
    (device, bridge, pipeline)
}

fn setup() -> (Arc<MockDevice>, Arc<MockBridge>, Pipeline) {
    setup_with(PresenterConfig::default())
}

fn fence_waits(device: &MockDevice) -> Vec<MockCall> {
    device
        .calls()
        .into_iter()
        .filter(|c| matches!(c, MockCall::WaitFence { .. }))
        .collect()
}

fn count_acquires(device: &MockDevice) -> usize {
    device.count_calls(|c| matches!(c, MockCall::Acquire { .. }))
}

fn count_presents(device: &MockDevice) -> usize {
    device.count_calls(|c| matches!(c, MockCall::Present { .. }))
}

// ============================================================================
// FRAME SEQUENCE TESTS
// ============================================================================

#[test]
fn test_present_records_blit_between_transitions() {
    let (device, _bridge, mut pipeline) = setup();
    let sync = pipeline.controller.sync_semaphores().unwrap();
    let target = pipeline.controller.image(0).unwrap().image;
    let buffer = pipeline.ring.get(0).unwrap();
    let (source, fence, pool, cmd) = (buffer.image, buffer.fence, buffer.command_pool, buffer.command_buffer);

    pipeline.present(1).unwrap();

    assert_eq!(device.calls(), vec![
        MockCall::Acquire { signal: sync.acquire },
        MockCall::WaitFence { fence, blocked: false },
        MockCall::ResetPool(pool),
        MockCall::Begin(cmd),
        MockCall::Barrier { image: target, old: ImageLayout::Undefined, new: ImageLayout::TransferDst },
        MockCall::Blit {
            src: source,
            src_extent: Extent2D::new(640, 480),
            dst: target,
            dst_extent: Extent2D::new(640, 480),
        },
        MockCall::Barrier { image: target, old: ImageLayout::TransferDst, new: ImageLayout::PresentSrc },
        MockCall::End(cmd),
        MockCall::ResetFence(fence),
        MockCall::Submit { cmd, wait: sync.acquire, signal: sync.present, fence },
        MockCall::Present { image_index: 0, wait: sync.present },
    ]);
}

#[test]
fn test_two_buffer_scenario() {
    let (device, _bridge, mut pipeline) = setup();
    let fence0 = pipeline.ring.get(0).unwrap().fence;
    let fence1 = pipeline.ring.get(1).unwrap().fence;

    pipeline.present(1).unwrap();
    assert_eq!(fence_waits(&device), vec![MockCall::WaitFence { fence: fence0, blocked: false }]);
    assert_eq!(pipeline.image_index(), 1);

    pipeline.present(1).unwrap();
    pipeline.present(1).unwrap();

    assert_eq!(fence_waits(&device), vec![
        MockCall::WaitFence { fence: fence0, blocked: false },
        MockCall::WaitFence { fence: fence1, blocked: false },
        MockCall::WaitFence { fence: fence0, blocked: true },
    ]);
    assert_eq!(pipeline.image_index(), 1);
}

#[test]
fn test_ring_order() {
    let device = Arc::new(MockDevice::new());
    let bridge = Arc::new(MockBridge::new());
    let mut pipeline = FramePresentationPipeline::new(
        device, bridge, &mock_window(), desc(320, 240, 3), PresenterConfig::default(),
    )
    .unwrap();

    let mut order = Vec::new();
    for _ in 0..7 {
        order.push(pipeline.image_index());
        pipeline.present(1).unwrap();
    }

    assert_eq!(order, vec![0, 1, 2, 0, 1, 2, 0]);
}

#[test]
fn test_back_buffer_is_blitted_to_swapchain_extent() {
    let (device, _bridge, mut pipeline) = setup();
    device.state().capabilities.current_extent = Some(Extent2D::new(1024, 768));
    pipeline.change_properties(desc(640, 480, 2)).unwrap();
    device.clear_calls();

    pipeline.present(1).unwrap();

    let blit = device
        .calls()
        .into_iter()
        .find(|c| matches!(c, MockCall::Blit { .. }))
        .unwrap();
    match blit {
        MockCall::Blit { src_extent, dst_extent, .. } => {
            assert_eq!(src_extent, Extent2D::new(640, 480));
            assert_eq!(dst_extent, Extent2D::new(1024, 768));
        }
        _ => unreachable!(),
    }
}

// ============================================================================
// SURFACE RECOVERY TESTS
// ============================================================================

#[test]
fn test_acquire_out_of_date_twice_recreates_twice() {
    let (device, _bridge, mut pipeline) = setup();
    {
        let mut state = device.state();
        state.acquire_script.push_back(AcquireOutcome::Status(SurfaceStatus::OutOfDate));
        state.acquire_script.push_back(AcquireOutcome::Status(SurfaceStatus::OutOfDate));
    }

    pipeline.present(1).unwrap();

    assert_eq!(pipeline.recreation_count(), 2);
    assert_eq!(count_acquires(&device), 3);
    assert_eq!(count_presents(&device), 1);
    assert_eq!(pipeline.image_index(), 1);
}

#[test]
fn test_persistent_out_of_date_is_surface_lost() {
    let (device, _bridge, mut pipeline) = setup();
    device.state().acquire_script.extend(
        std::iter::repeat(AcquireOutcome::Status(SurfaceStatus::OutOfDate)).take(100),
    );

    let result = pipeline.present(1);

    assert!(matches!(result, Err(Error::SurfaceLost(_))));
    assert_eq!(pipeline.recreation_count(), u64::from(PresenterConfig::DEFAULT_MAX_SURFACE_RETRIES));
    assert_eq!(count_acquires(&device), 6);
    assert_eq!(count_presents(&device), 0);
    assert_eq!(pipeline.image_index(), 0);
}

#[test]
fn test_retry_cap_is_configurable() {
    let (device, _bridge, mut pipeline) = setup_with(PresenterConfig::default().with_max_surface_retries(1));
    device.state().acquire_script.extend(
        std::iter::repeat(AcquireOutcome::Status(SurfaceStatus::OutOfDate)).take(100),
    );

    assert!(matches!(pipeline.present(1), Err(Error::SurfaceLost(_))));
    assert_eq!(pipeline.recreation_count(), 1);
    assert_eq!(count_acquires(&device), 2);
}

#[test]
fn test_suboptimal_acquire_proceeds() {
    let (device, _bridge, mut pipeline) = setup();
    device.state().acquire_script.push_back(AcquireOutcome::Status(SurfaceStatus::Suboptimal));

    pipeline.present(1).unwrap();

    assert_eq!(pipeline.recreation_count(), 0);
    assert_eq!(count_presents(&device), 1);
}

#[test]
fn test_suboptimal_present_recreates_once() {
    let (device, _bridge, mut pipeline) = setup();
    device.state().present_script.push_back(SurfaceStatus::Suboptimal);

    pipeline.present(1).unwrap();

    assert_eq!(pipeline.recreation_count(), 1);
    assert_eq!(count_presents(&device), 1);
    assert_eq!(pipeline.image_index(), 1);
}

#[test]
fn test_out_of_date_present_replays_frame_once() {
    let (device, _bridge, mut pipeline) = setup();
    device.state().present_script.push_back(SurfaceStatus::OutOfDate);

    pipeline.present(1).unwrap();

    assert_eq!(pipeline.recreation_count(), 1);
    assert_eq!(count_acquires(&device), 2);
    assert_eq!(count_presents(&device), 2);
    assert_eq!(device.count_calls(|c| matches!(c, MockCall::Submit { .. })), 2);
    assert_eq!(pipeline.image_index(), 1);
}

#[test]
fn test_out_of_date_present_twice_is_surface_lost() {
    let (device, _bridge, mut pipeline) = setup();
    {
        let mut state = device.state();
        state.present_script.push_back(SurfaceStatus::OutOfDate);
        state.present_script.push_back(SurfaceStatus::OutOfDate);
    }

    let result = pipeline.present(1);

    assert!(matches!(result, Err(Error::SurfaceLost(_))));
    assert_eq!(pipeline.recreation_count(), 2);
    assert_eq!(pipeline.image_index(), 0);

    // The recreated swapchain is usable again
    pipeline.present(1).unwrap();
    assert_eq!(pipeline.image_index(), 1);
}

// ============================================================================
// VSYNC / TIMEOUT TESTS
// ============================================================================

#[test]
fn test_vsync_change_recreates_with_new_mode() {
    let (device, _bridge, mut pipeline) = setup();
    assert_eq!(pipeline.info().present_mode, PresentMode::Fifo);

    pipeline.present(0).unwrap();
    assert!(!pipeline.vsync());
    assert_eq!(pipeline.info().present_mode, PresentMode::Mailbox);

    pipeline.present(0).unwrap();
    assert_eq!(pipeline.recreation_count(), 1);

    pipeline.present(2).unwrap();
    assert_eq!(pipeline.info().present_mode, PresentMode::Fifo);
    assert_eq!(pipeline.recreation_count(), 2);
    assert_eq!(count_presents(&device), 3);
}

#[test]
fn test_fence_timeout_is_device_lost() {
    let (device, _bridge, mut pipeline) = setup();
    device.state().gpu_completes_on_wait = false;

    pipeline.present(1).unwrap();
    pipeline.present(1).unwrap();
    let result = pipeline.present(1);

    assert!(matches!(result, Err(Error::DeviceLost(_))));
    assert_eq!(pipeline.image_index(), 0);
}

// ============================================================================
// FAILURE RECOVERY TESTS
// ============================================================================

fn acquire_signals(device: &MockDevice) -> Vec<u64> {
    device
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            MockCall::Acquire { signal } => Some(signal),
            _ => None,
        })
        .collect()
}

#[test]
fn test_failed_vsync_recreation_is_retried() {
    let (device, _bridge, mut pipeline) = setup();
    device.state().fail_after.insert("create_swapchain", 1);

    assert!(matches!(pipeline.present(0), Err(Error::BackendError(_))));
    assert!(pipeline.vsync());
    assert_eq!(count_presents(&device), 0);

    device.state().fail_after.remove("create_swapchain");
    pipeline.present(0).unwrap();

    assert!(!pipeline.vsync());
    assert_eq!(pipeline.info().present_mode, PresentMode::Mailbox);
    assert_eq!(pipeline.recreation_count(), 2);
    assert_eq!(count_presents(&device), 1);
}

#[test]
fn test_missing_swapchain_is_recreated_before_acquire() {
    let (device, _bridge, mut pipeline) = setup();
    {
        let mut state = device.state();
        state.present_script.push_back(SurfaceStatus::Suboptimal);
        state.fail_after.insert("create_swapchain", 1);
    }

    assert!(pipeline.present(1).is_err());
    assert_eq!(pipeline.recreation_count(), 1);

    device.state().fail_after.remove("create_swapchain");
    pipeline.present(1).unwrap();
    pipeline.present(1).unwrap();

    assert_eq!(pipeline.recreation_count(), 2);
    assert_eq!(count_presents(&device), 3);
}

#[test]
fn test_recreation_failure_in_acquire_is_reported() {
    let (device, _bridge, mut pipeline) = setup_with(PresenterConfig::default().with_max_surface_retries(2));
    {
        let mut state = device.state();
        state.present_script.push_back(SurfaceStatus::Suboptimal);
        state.fail_after.insert("create_swapchain", 1);
    }
    assert!(pipeline.present(1).is_err());

    // The recreation attempted before acquiring fails too
    assert!(matches!(pipeline.present(1), Err(Error::BackendError(_))));
    assert_eq!(pipeline.recreation_count(), 2);
    assert_eq!(count_acquires(&device), 1);
}

#[test]
fn test_failed_recording_leaves_buffer_usable() {
    let (device, _bridge, mut pipeline) = setup();
    {
        let mut state = device.state();
        state.gpu_completes_on_wait = false;
        state.fail_after.insert("begin_command_buffer", 0);
    }

    assert!(matches!(pipeline.present(1), Err(Error::BackendError(_))));
    assert!(device.is_fence_signaled(pipeline.ring.get(0).unwrap().fence));
    assert_eq!(pipeline.image_index(), 0);

    device.state().fail_after.remove("begin_command_buffer");
    pipeline.present(1).unwrap();

    let signals = acquire_signals(&device);
    assert_eq!(signals.len(), 2);
    assert_ne!(signals[0], signals[1]);
    assert_eq!(pipeline.image_index(), 1);
}

#[test]
fn test_failed_submit_restores_signaled_fence() {
    let (device, _bridge, mut pipeline) = setup();
    {
        let mut state = device.state();
        state.gpu_completes_on_wait = false;
        state.fail_after.insert("queue_submit", 0);
    }

    assert!(matches!(pipeline.present(1), Err(Error::BackendError(_))));
    assert!(device.is_fence_signaled(pipeline.ring.get(0).unwrap().fence));
    assert_eq!(device.live_fence_count(), 2);

    device.state().fail_after.remove("queue_submit");
    pipeline.present(1).unwrap();
    assert_eq!(fence_waits(&device).len(), 2);
    assert!(fence_waits(&device).iter().all(|w| matches!(w, MockCall::WaitFence { blocked: false, .. })));
}

#[test]
fn test_failed_property_change_recovers_on_present() {
    let (device, bridge, mut pipeline) = setup();
    device.state().fail_after.insert("create_swapchain", 1);

    let result = pipeline.change_properties(desc(800, 600, 3));

    assert!(matches!(result, Err(Error::BackendError(_))));
    assert_eq!(pipeline.desc().buffer_count, 3);
    assert!(pipeline.image(2).is_some());
    assert_eq!(bridge.outstanding(), 3);

    device.state().fail_after.remove("create_swapchain");
    pipeline.present(1).unwrap();
    assert_eq!(pipeline.info().image_extent, Extent2D::new(800, 600));
    assert_eq!(pipeline.image_index(), 1);
}

// ============================================================================
// PROPERTY CHANGE / TEARDOWN TESTS
// ============================================================================

#[test]
fn test_change_properties_rebuilds_everything() {
    let (device, bridge, mut pipeline) = setup();
    pipeline.present(1).unwrap();

    pipeline.change_properties(desc(800, 600, 3)).unwrap();

    assert_eq!(pipeline.desc().buffer_count, 3);
    assert_eq!(pipeline.image_index(), 0);
    assert!(pipeline.image(2).is_some());
    assert_eq!(pipeline.info().image_extent, Extent2D::new(800, 600));
    assert_eq!(pipeline.info().image_count, 3);
    assert_eq!(bridge.outstanding(), 3);
    assert_eq!(bridge.state().refcounts.len(), 5);
    assert_eq!(device.live_fence_count(), 3);
}

#[test]
fn test_change_properties_rejects_invalid_desc() {
    let (device, bridge, mut pipeline) = setup();
    let live = device.live_object_count();

    let result = pipeline.change_properties(desc(800, 600, 0));

    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(pipeline.desc().buffer_count, 2);
    assert_eq!(device.live_object_count(), live);
    assert_eq!(bridge.outstanding(), 2);
}

#[test]
fn test_drop_releases_everything() {
    let (device, bridge, mut pipeline) = setup();
    pipeline.present(1).unwrap();
    pipeline.present(1).unwrap();

    drop(pipeline);

    assert_eq!(device.live_object_count(), 0);
    assert_eq!(bridge.outstanding(), 0);
}

#[test]
fn test_construction_failure_leaks_nothing() {
    let device = Arc::new(MockDevice::new());
    let bridge = Arc::new(MockBridge::new());
    bridge.state().fail_after = Some(1);

    let result = FramePresentationPipeline::new(
        device.clone(), bridge.clone(), &mock_window(), desc(640, 480, 2), PresenterConfig::default(),
    );

    assert!(result.is_err());
    assert_eq!(device.live_object_count(), 0);
    assert_eq!(bridge.outstanding(), 0);
}
