//! Defines traits for core

use std::ffi::{CStr, CString};

use anyhow::Result;
use ash::prelude::VkResult;
use ash::vk;

use crate::Error;

/// The set of Vulkan calls the caches and allocators in this crate are built on.
///
/// [`Device`](crate::Device) implements this with real Vulkan calls. Any other implementation
/// (for example an in-memory device for testing) can be plugged into every cache by
/// using it as the `D` type parameter.
///
/// All methods returning a [`VkResult`] must return the raw driver result, so callers can
/// react to specific error codes like [`vk::Result::ERROR_OUT_OF_POOL_MEMORY`].
pub trait DeviceInterface: Clone + Send + Sync + 'static {
    /// Create a new `VkDescriptorSetLayout` from a list of bindings.
    fn create_descriptor_set_layout(&self, bindings: &[vk::DescriptorSetLayoutBinding]) -> VkResult<vk::DescriptorSetLayout>;

    /// Destroy a `VkDescriptorSetLayout` previously created with [`DeviceInterface::create_descriptor_set_layout`].
    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout);

    /// Create a new `VkDescriptorPool` that can hold at most `max_sets` descriptor sets.
    fn create_descriptor_pool(&self, sizes: &[vk::DescriptorPoolSize], max_sets: u32) -> VkResult<vk::DescriptorPool>;

    /// Return every descriptor set allocated from this pool back to it.
    fn reset_descriptor_pool(&self, pool: vk::DescriptorPool) -> VkResult<()>;

    /// Destroy a `VkDescriptorPool`, implicitly freeing all sets allocated from it.
    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool);

    /// Allocate a single descriptor set with the given layout from a pool.
    fn allocate_descriptor_set(&self, pool: vk::DescriptorPool, layout: vk::DescriptorSetLayout) -> VkResult<vk::DescriptorSet>;

    /// Issue a batch of descriptor writes.
    /// # Safety
    /// * Every buffer and image info pointer inside `writes` must be valid for the duration of the call.
    /// * No descriptor set written to may be in use by the GPU.
    unsafe fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet]);

    /// Create a `VkFramebuffer` compatible with `render_pass`.
    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
        layers: u32,
    ) -> VkResult<vk::Framebuffer>;

    /// Destroy a `VkFramebuffer`
    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);

    /// Attach a debug name to a raw Vulkan object. The default implementation does nothing.
    fn set_debug_name(&self, _object_type: vk::ObjectType, _handle: u64, _name: &CStr) -> Result<()> {
        Ok(())
    }
}

/// Naming helpers available on every [`DeviceInterface`]
pub trait Nameable: DeviceInterface {
    /// Set the name of any given compatible object for debugging purposes
    /// # Errors
    /// - Fails with [`Error::InvalidString`] if `name` contains a nul byte.
    fn set_name<H: vk::Handle>(&self, object: H, name: &str) -> Result<()> {
        let name = CString::new(name).map_err(Error::from)?;
        self.set_debug_name(H::TYPE, object.as_raw(), &name)
    }
}

impl<D: DeviceInterface> Nameable for D {}
