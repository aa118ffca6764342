//! Exposes the deimos error type

use std::ffi::NulError;
use std::sync::PoisonError;

use ash::vk;
use thiserror::Error;

/// Error type that deimos can return.
#[derive(Error, Debug)]
pub enum Error {
    /// Could not convert rust string to C-String because it has null bytes
    #[error("Invalid C string")]
    InvalidString(NulError),
    /// Generic Vulkan error type.
    #[error("Vulkan error: `{0}`")]
    VkError(vk::Result),
    /// A descriptor pool ran out of space, and a freshly grabbed pool could not satisfy the request either.
    #[error("Descriptor pool exhausted twice in a row: `{0}`")]
    AllocationExhausted(vk::Result),
    /// Creating a Vulkan object failed. This is never retried.
    #[error("Failed to create {object}: `{result}`")]
    DeviceObjectCreation {
        /// Kind of object that was being created
        object: &'static str,
        /// Error code returned by the driver
        result: vk::Result,
    },
    /// Poisoned mutex
    #[error("Poisoned mutex")]
    PoisonError,
    /// Failed to spawn a worker thread for the task scheduler.
    #[error("Failed to spawn worker thread: `{0}`")]
    ThreadSpawn(std::io::Error),
    /// Tried to submit work to a task scheduler that is shutting down or stopped.
    #[error("Task scheduler is not running")]
    SchedulerStopped,
    /// Tried to build a framebuffer without specifying the render pass it is used with.
    #[error("No render pass given for framebuffer")]
    NoRenderPass,
    /// Tried to create a framebuffer with no attachments.
    #[error("Framebuffer needs at least one attachment")]
    NoAttachments,
    /// A frame index outside of the configured frames in flight was requested.
    #[error("Frame index {0} out of range for {1} frames in flight")]
    InvalidFrameIndex(usize, usize),
    /// Uncategorized error.
    #[error("Uncategorized error: `{0}`")]
    Uncategorized(&'static str),
}

impl Error {
    /// Wrap a driver error returned while creating a Vulkan object.
    pub(crate) fn creation(object: &'static str) -> impl FnOnce(vk::Result) -> Error {
        move |result| Error::DeviceObjectCreation {
            object,
            result,
        }
    }
}

impl From<NulError> for Error {
    fn from(value: NulError) -> Self {
        Error::InvalidString(value)
    }
}

impl From<vk::Result> for Error {
    fn from(value: vk::Result) -> Self {
        Error::VkError(value)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::PoisonError
    }
}
