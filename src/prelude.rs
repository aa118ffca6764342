//! Re-exports the most commonly used types and traits.

pub use ash::vk;

pub use crate::core::device::Device;
pub use crate::core::error::Error;

pub use crate::descriptor::allocator::{DescriptorAllocator, PoolSizes, DEFAULT_POOL_CAPACITY};
pub use crate::descriptor::builder::DescriptorBuilder;
pub use crate::descriptor::layout_cache::{BindingDescription, LayoutCache, LayoutKey};

pub use crate::framebuffer::attachment::{AttachmentIdentity, FramebufferKey, RenderPassInfo};
pub use crate::framebuffer::builder::FramebufferBuilder;
pub use crate::framebuffer::cache::FramebufferCache;

pub use crate::sync::task::{Task, TaskCompletionCallback};
pub use crate::sync::task_scheduler::{SchedulerState, TaskScheduler};

pub use crate::context::settings::{ContextBuilder, ContextSettings, DEFAULT_FRAMES_IN_FLIGHT};
pub use crate::context::RendererContext;

pub use crate::util::deferred_delete::DeletionQueue;

/// Re-exports all traits, so they can be imported under a namespace.
pub mod traits {
    pub use crate::core::traits::*;
}

pub use traits::*;
