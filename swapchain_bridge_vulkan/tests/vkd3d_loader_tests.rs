//! Integration tests for the vkd3d loader
//!
//! Tests marked #[ignore] need libvkd3d installed.
//!
//! Run with: cargo test --test vkd3d_loader_tests -- --ignored

use ash::vk;
use swapchain_bridge::bridge::presenter::BufferFormat;
use swapchain_bridge::bridge::Error;
use swapchain_bridge_vulkan::{buffer_format_to_dxgi, Vkd3dLoader, VKD3D_LIBRARY_NAME};

// ============================================================================
// LOADING TESTS
// ============================================================================

#[test]
fn test_load_from_missing_path() {
    match Vkd3dLoader::load_from("/nonexistent/libvkd3d.so.1") {
        Err(Error::InitializationFailed(msg)) => assert!(msg.contains("libvkd3d")),
        other => panic!("expected InitializationFailed, got {:?}", other.map(|_| ())),
    }
}

#[test]
#[ignore] // Requires libvkd3d
fn test_load_resolves_every_symbol() {
    let loader = Vkd3dLoader::load().unwrap();

    assert_eq!(loader.library_name(), VKD3D_LIBRARY_NAME);
    assert!(loader.missing_symbols().is_empty(), "missing: {:?}", loader.missing_symbols());
}

// ============================================================================
// FORMAT TESTS
// ============================================================================

#[test]
#[ignore] // Requires libvkd3d
fn test_vkd3d_agrees_on_back_buffer_formats() {
    let loader = Vkd3dLoader::load().unwrap();

    let formats = [
        BufferFormat::R8G8B8A8_UNORM,
        BufferFormat::R8G8B8A8_UNORM_SRGB,
        BufferFormat::B8G8R8A8_UNORM,
        BufferFormat::B8G8R8A8_UNORM_SRGB,
        BufferFormat::R16G16B16A16_FLOAT,
    ];
    let expected = [
        vk::Format::R8G8B8A8_UNORM,
        vk::Format::R8G8B8A8_SRGB,
        vk::Format::B8G8R8A8_UNORM,
        vk::Format::B8G8R8A8_SRGB,
        vk::Format::R16G16B16A16_SFLOAT,
    ];

    for (format, expected) in formats.into_iter().zip(expected) {
        assert_eq!(loader.get_vk_format(buffer_format_to_dxgi(format)), Ok(expected), "{:?}", format);
    }
}

#[test]
#[ignore] // Requires libvkd3d
fn test_unknown_dxgi_format() {
    let loader = Vkd3dLoader::load().unwrap();
    assert_eq!(loader.get_vk_format(0), Ok(vk::Format::UNDEFINED));
}
