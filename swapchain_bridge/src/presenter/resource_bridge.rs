/// ResourceBridge trait - exposes presentation-API images to the producing API
///
/// Ownership contract:
/// - `import` returns a resource carrying exactly one owning reference.
///   Any transient reference the producer hands out during creation is
///   dropped inside `import`.
/// - `release` consumes the resource and drops that reference. Since the
///   resource type is not `Clone`, a resource can be released at most once,
///   and the pipeline releases every resource it imported.
/// - The raw image handle never crosses to the producer outside `import`.

use std::fmt::Debug;

use crate::device::{Extent2D, PresentDevice};
use crate::error::Result;
use crate::presenter::BufferFormat;

/// Description of the producer-side resource wrapping a back buffer image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportDesc {
    pub extent: Extent2D,
    pub format: BufferFormat,
    /// Producer may bind the resource for unordered access
    pub unordered_access: bool,
}

/// Producer-side view of presentation-API images
pub trait ResourceBridge<D: PresentDevice>: Send + Sync {
    /// Producer resource holding one owning reference
    type Resource: Debug;

    /// Producer device handle, handed out by `Presenter::device`
    type ProducerDevice: Clone + Debug;

    /// Wrap `image` as a producer resource
    fn import(&self, image: D::Image, desc: &ImportDesc) -> Result<Self::Resource>;

    /// Drop the owning reference taken by `import`
    fn release(&self, resource: Self::Resource);

    fn producer_device(&self) -> Self::ProducerDevice;
}
