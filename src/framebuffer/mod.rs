//! Framebuffer caching.
//!
//! Framebuffers are requested through a [`FramebufferCache`](cache::FramebufferCache), either directly or through a
//! [`FramebufferBuilder`](builder::FramebufferBuilder). Requests with the same attachments, sizes, formats and render pass
//! compatibility return the same `VkFramebuffer`. Attachment order matters.
//!
//! Framebuffers are never invalidated automatically. Whenever an attachment is resized or destroyed, call
//! [`FramebufferCache::delete_related`](cache::FramebufferCache::delete_related). After the swapchain was recreated,
//! call [`FramebufferCache::resize_swapchain`](cache::FramebufferCache::resize_swapchain).

pub mod attachment;
pub mod builder;
pub mod cache;
