/// Presenter - the swap chain object handed to the producing API
///
/// Thin facade over `FramePresentationPipeline`. Partial presentation and
/// gamma ramps are not supported: the corresponding calls fail with
/// `Error::NotImplemented` and are reported once per presenter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::PresenterConfig;
use crate::device::{PresentDevice, WindowTarget};
use crate::error::{Error, Result};
use crate::presenter::{
    FramePresentationPipeline, GammaControlPoint, PresentFlags, PresentParameters,
    PresenterInfo, Rect, ResourceBridge, SwapChainDesc,
};
use crate::{bridge_error, bridge_info, bridge_warn};

pub struct Presenter<D: PresentDevice, B: ResourceBridge<D>> {
    pipeline: FramePresentationPipeline<D, B>,
    present_region_reported: AtomicBool,
    gamma_control_reported: AtomicBool,
    present_parameters_reported: AtomicBool,
}

impl<D: PresentDevice, B: ResourceBridge<D>> Presenter<D, B> {
    /// Create a presenter for `target`
    ///
    /// # Arguments
    ///
    /// * `device` - Presentation device sharing its queue with the producer
    /// * `bridge` - Wraps back buffer images as producer resources
    /// * `target` - Window to present to
    /// * `desc` - Producer-side swap chain description
    /// * `config` - Retry and timeout limits
    pub fn create(
        device: Arc<D>,
        bridge: Arc<B>,
        target: &WindowTarget,
        desc: SwapChainDesc,
        config: PresenterConfig,
    ) -> Result<Self> {
        let pipeline = FramePresentationPipeline::new(device, bridge, target, desc, config)?;
        bridge_info!(
            "bridge::presenter",
            "Presenter created: {}x{} {:?}, {} back buffers",
            desc.width, desc.height, desc.format, desc.buffer_count
        );

        Ok(Self {
            pipeline,
            present_region_reported: AtomicBool::new(false),
            gamma_control_reported: AtomicBool::new(false),
            present_parameters_reported: AtomicBool::new(false),
        })
    }

    pub fn desc(&self) -> SwapChainDesc {
        *self.pipeline.desc()
    }

    /// Negotiated swapchain shape
    pub fn info(&self) -> PresenterInfo {
        self.pipeline.info()
    }

    pub fn change_properties(&mut self, desc: SwapChainDesc) -> Result<()> {
        self.pipeline.change_properties(desc)
    }

    /// Producer resource of back buffer `index`
    pub fn image(&self, index: u32) -> Result<&B::Resource> {
        self.pipeline.image(index).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "back buffer {} out of range ({} buffers)",
                index, self.pipeline.desc().buffer_count
            ))
        })
    }

    /// Index of the back buffer the producer should render into next
    pub fn image_index(&self) -> u32 {
        self.pipeline.image_index()
    }

    /// Present the current back buffer
    ///
    /// `PresentFlags::TEST` only reports status. Partial-presentation
    /// parameters are ignored and the whole frame is presented.
    pub fn present(
        &mut self,
        sync_interval: u32,
        flags: PresentFlags,
        parameters: Option<&PresentParameters>,
    ) -> Result<()> {
        if flags.contains(PresentFlags::TEST) {
            return Ok(());
        }

        if let Some(parameters) = parameters.filter(|p| p.is_partial()) {
            if !self.present_parameters_reported.swap(true, Ordering::Relaxed) {
                bridge_warn!(
                    "bridge::presenter",
                    "Partial presentation not supported, presenting full frame ({} dirty rects)",
                    parameters.dirty_rects.len()
                );
            }
        }

        self.pipeline.present(sync_interval)
    }

    pub fn set_present_region(&self, _region: &Rect) -> Result<()> {
        Self::not_implemented(&self.present_region_reported, "Presenter::set_present_region")
    }

    pub fn set_gamma_control(&self, _points: &[GammaControlPoint]) -> Result<()> {
        Self::not_implemented(&self.gamma_control_reported, "Presenter::set_gamma_control")
    }

    /// Adapter the presentation device runs on
    pub fn adapter(&self) -> D::Adapter {
        self.pipeline.device().device_info().adapter
    }

    /// Producer device the back buffers belong to
    pub fn device(&self) -> B::ProducerDevice {
        self.pipeline.bridge().producer_device()
    }

    fn not_implemented(reported: &AtomicBool, what: &'static str) -> Result<()> {
        if !reported.swap(true, Ordering::Relaxed) {
            bridge_error!("bridge::presenter", "{}: Not implemented", what);
        }
        Err(Error::NotImplemented(what))
    }
}

#[cfg(test)]
#[path = "presenter_tests.rs"]
mod tests;
