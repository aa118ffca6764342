//! Identity of framebuffer attachments and render passes, used as framebuffer cache keys.

use ash::vk;

/// Identifies a single framebuffer attachment by the image view it refers to and the dimensions and format
/// of that view.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AttachmentIdentity {
    /// The image view bound to the attachment slot.
    pub view: vk::ImageView,
    /// Width of the attachment in pixels.
    pub width: u32,
    /// Height of the attachment in pixels.
    pub height: u32,
    /// Format of the image view.
    pub format: vk::Format,
}

impl AttachmentIdentity {
    /// Create a new attachment identity.
    pub fn new(view: vk::ImageView, width: u32, height: u32, format: vk::Format) -> Self {
        Self {
            view,
            width,
            height,
            format,
        }
    }

    /// Size of this attachment.
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }
}

/// The render pass a framebuffer is created for.
///
/// Framebuffers can be shared between compatible render passes. Two render passes given the same
/// `compatibility` tag are considered compatible, and will share cached framebuffers.
/// By default the tag is the raw render pass handle, so no two render passes share framebuffers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RenderPassInfo {
    /// The render pass used when a new framebuffer has to be created.
    pub handle: vk::RenderPass,
    /// Render pass compatibility tag.
    pub compatibility: u64,
    /// Amount of array layers in the framebuffer.
    pub layers: u32,
}

impl RenderPassInfo {
    /// Create render pass info for a single-layer framebuffer, tagged by the render pass handle.
    pub fn new(handle: vk::RenderPass) -> Self {
        use ash::vk::Handle;
        Self {
            handle,
            compatibility: handle.as_raw(),
            layers: 1,
        }
    }

    /// Override the compatibility tag.
    pub fn with_compatibility(mut self, tag: u64) -> Self {
        self.compatibility = tag;
        self
    }

    /// Set the amount of array layers. Clamped to at least one.
    pub fn with_layers(mut self, layers: u32) -> Self {
        self.layers = layers.max(1);
        self
    }
}

/// Structural identity of a framebuffer. Attachment order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FramebufferKey {
    /// Attachments in the order the render pass expects them.
    pub attachments: Vec<AttachmentIdentity>,
    /// Render pass compatibility tag.
    pub compatibility: u64,
    /// Amount of array layers.
    pub layers: u32,
    /// Whether one of the attachments is a swapchain image.
    pub targets_swapchain: bool,
}

impl FramebufferKey {
    /// Build a key from a render pass and its attachments.
    pub fn new(render_pass: &RenderPassInfo, attachments: &[AttachmentIdentity], targets_swapchain: bool) -> Self {
        Self {
            attachments: attachments.to_vec(),
            compatibility: render_pass.compatibility,
            layers: render_pass.layers,
            targets_swapchain,
        }
    }

    /// True if any attachment refers to this image view.
    pub fn references(&self, view: vk::ImageView) -> bool {
        self.attachments.iter().any(|attachment| attachment.view == view)
    }

    /// Largest extent every attachment can accommodate, or `None` if there are no attachments.
    pub fn extent(&self) -> Option<vk::Extent2D> {
        self.attachments
            .iter()
            .map(AttachmentIdentity::extent)
            .reduce(|a, b| vk::Extent2D {
                width: a.width.min(b.width),
                height: a.height.min(b.height),
            })
    }
}
