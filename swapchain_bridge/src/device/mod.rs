/// Backend seam: the presentation device trait and its plain data types

pub mod types;
pub mod present_device;

#[cfg(test)]
pub mod mock_device;

pub use types::*;
pub use present_device::*;
