//! The core module holds the device seam every cache in this crate is built on.
//!
//! - [`traits::DeviceInterface`] lists the Vulkan calls the caches need.
//! - [`device::Device`] implements it on top of an `ash::Device`.
//! - [`error::Error`] is the error type returned throughout the crate.

pub mod device;
pub mod error;
pub mod traits;
