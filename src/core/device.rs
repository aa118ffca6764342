//! Wrapper around a `VkDevice` implementing [`DeviceInterface`].

use std::ffi::CStr;
use std::ops::Deref;
use std::sync::Arc;

use anyhow::Result;
use ash::prelude::VkResult;
use ash::vk;

use crate::core::traits::DeviceInterface;

#[derive(Derivative)]
#[derivative(Debug)]
struct DeviceInner {
    #[derivative(Debug = "ignore")]
    handle: ash::Device,
    #[derivative(Debug = "ignore")]
    debug_utils: Option<ash::extensions::ext::DebugUtils>,
}

/// Wrapper around a `VkDevice`. Internal state is wrapped in an `Arc<DeviceInner>`, so this is safe
/// to clone.
///
/// The `VkDevice` itself is created by whoever sets up the instance and window, so this wrapper
/// never destroys it. Keep the device alive until every cache using this wrapper was dropped.
#[derive(Debug, Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl Device {
    /// Wrap an existing logical device.
    pub fn new(handle: ash::Device) -> Self {
        Self {
            inner: Arc::new(DeviceInner {
                handle,
                debug_utils: None,
            }),
        }
    }

    /// Wrap an existing logical device and load `VK_EXT_debug_utils` so objects created through
    /// this device get debug names. The extension must be enabled on `instance`.
    pub fn with_debug_utils(entry: &ash::Entry, instance: &ash::Instance, handle: ash::Device) -> Self {
        let debug_utils = ash::extensions::ext::DebugUtils::new(entry, instance);
        Self {
            inner: Arc::new(DeviceInner {
                handle,
                debug_utils: Some(debug_utils),
            }),
        }
    }

    /// Get unsafe access to the underlying VkDevice handle
    /// # Safety
    /// * The caller should not call `vkDestroyDevice` on this while caches still use it.
    pub unsafe fn handle(&self) -> ash::Device {
        self.inner.handle.clone()
    }

    /// Whether debug names will be forwarded to the driver.
    pub fn has_debug_utils(&self) -> bool {
        self.inner.debug_utils.is_some()
    }
}

impl Deref for Device {
    type Target = ash::Device;

    fn deref(&self) -> &Self::Target {
        &self.inner.handle
    }
}

impl DeviceInterface for Device {
    fn create_descriptor_set_layout(&self, bindings: &[vk::DescriptorSetLayoutBinding]) -> VkResult<vk::DescriptorSetLayout> {
        let info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(bindings).build();
        unsafe { self.inner.handle.create_descriptor_set_layout(&info, None) }
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        unsafe { self.inner.handle.destroy_descriptor_set_layout(layout, None) }
    }

    fn create_descriptor_pool(&self, sizes: &[vk::DescriptorPoolSize], max_sets: u32) -> VkResult<vk::DescriptorPool> {
        let info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets)
            .pool_sizes(sizes)
            .build();
        unsafe { self.inner.handle.create_descriptor_pool(&info, None) }
    }

    fn reset_descriptor_pool(&self, pool: vk::DescriptorPool) -> VkResult<()> {
        unsafe {
            self.inner
                .handle
                .reset_descriptor_pool(pool, vk::DescriptorPoolResetFlags::empty())
        }
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        unsafe { self.inner.handle.destroy_descriptor_pool(pool, None) }
    }

    fn allocate_descriptor_set(&self, pool: vk::DescriptorPool, layout: vk::DescriptorSetLayout) -> VkResult<vk::DescriptorSet> {
        let info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(pool)
            .set_layouts(std::slice::from_ref(&layout))
            .build();
        let sets = unsafe { self.inner.handle.allocate_descriptor_sets(&info)? };
        sets.first().copied().ok_or(vk::Result::ERROR_UNKNOWN)
    }

    unsafe fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet]) {
        self.inner.handle.update_descriptor_sets(writes, &[]);
    }

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
        layers: u32,
    ) -> VkResult<vk::Framebuffer> {
        let info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(layers)
            .build();
        unsafe { self.inner.handle.create_framebuffer(&info, None) }
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.inner.handle.destroy_framebuffer(framebuffer, None) }
    }

    fn set_debug_name(&self, object_type: vk::ObjectType, handle: u64, name: &CStr) -> Result<()> {
        let Some(debug_utils) = &self.inner.debug_utils else {
            return Ok(());
        };
        let name_info = vk::DebugUtilsObjectNameInfoEXT::builder()
            .object_type(object_type)
            .object_handle(handle)
            .object_name(name)
            .build();

        unsafe {
            Ok(debug_utils.set_debug_utils_object_name(self.inner.handle.handle(), &name_info)?)
        }
    }
}
