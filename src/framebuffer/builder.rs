//! Fluent interface to request framebuffers from a [`FramebufferCache`].

use anyhow::Result;
use ash::vk;

use crate::core::traits::DeviceInterface;
use crate::framebuffer::attachment::{AttachmentIdentity, RenderPassInfo};
use crate::framebuffer::cache::FramebufferCache;
use crate::Error;

/// Collects attachments for a framebuffer and looks it up in a [`FramebufferCache`].
/// # Example
/// ```ignore
/// use deimos::prelude::*;
///
/// let framebuffer = FramebufferBuilder::begin(&cache)
///     .render_pass(RenderPassInfo::new(lighting_pass))
///     .attachment(AttachmentIdentity::new(hdr_view, width, height, vk::Format::R16G16B16A16_SFLOAT))
///     .build()?;
/// ```
#[derive(Derivative)]
#[derivative(Debug)]
pub struct FramebufferBuilder<'a, D: DeviceInterface> {
    #[derivative(Debug = "ignore")]
    cache: &'a FramebufferCache<D>,
    render_pass: Option<RenderPassInfo>,
    attachments: Vec<AttachmentIdentity>,
    targets_swapchain: bool,
    track_only: bool,
}

impl<'a, D: DeviceInterface> FramebufferBuilder<'a, D> {
    /// Start building a framebuffer from the given cache.
    pub fn begin(cache: &'a FramebufferCache<D>) -> Self {
        Self {
            cache,
            render_pass: None,
            attachments: vec![],
            targets_swapchain: false,
            track_only: false,
        }
    }

    /// Set the render pass this framebuffer is used with.
    pub fn render_pass(mut self, info: RenderPassInfo) -> Self {
        self.render_pass = Some(info);
        self
    }

    /// Append an attachment. Attachments must be added in the order the render pass declares them.
    pub fn attachment(mut self, attachment: AttachmentIdentity) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Append a swapchain image as an attachment. This marks the framebuffer as targeting the swapchain.
    pub fn swapchain_attachment(mut self, attachment: AttachmentIdentity) -> Self {
        self.attachments.push(attachment);
        self.targets_swapchain = true;
        self
    }

    /// Only register the attachments for invalidation tracking, without creating a framebuffer.
    pub fn track_only(mut self) -> Self {
        self.track_only = true;
        self
    }

    /// Look up or create the framebuffer.
    /// # Errors
    /// - Fails with [`Error::NoRenderPass`] if no render pass was set.
    /// - Fails for every reason [`FramebufferCache::create_framebuffer`] can fail.
    pub fn build(self) -> Result<vk::Framebuffer> {
        let render_pass = self.render_pass.ok_or(Error::NoRenderPass)?;
        self.cache.create_framebuffer(
            &render_pass,
            self.attachments.as_slice(),
            self.targets_swapchain,
            self.track_only,
        )
    }
}
