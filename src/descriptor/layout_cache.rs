//! Deduplicates descriptor set layouts by their structure.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use ash::vk;

use crate::core::traits::{DeviceInterface, Nameable};
use crate::Error;

/// Describes a single binding slot inside a descriptor set layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BindingDescription {
    /// Binding slot index, `layout(binding = N)` in GLSL.
    pub binding: u32,
    /// Kind of resource bound to this slot.
    pub ty: vk::DescriptorType,
    /// Array size of the binding. Always at least one.
    pub count: u32,
    /// Shader stages that can access this binding.
    pub stages: vk::ShaderStageFlags,
}

impl BindingDescription {
    /// Create a new binding description. A `count` of zero is bumped to one.
    pub fn new(binding: u32, ty: vk::DescriptorType, count: u32, stages: vk::ShaderStageFlags) -> Self {
        Self {
            binding,
            ty,
            count: count.max(1),
            stages,
        }
    }

    fn to_vk(&self) -> vk::DescriptorSetLayoutBinding {
        vk::DescriptorSetLayoutBinding::builder()
            .binding(self.binding)
            .descriptor_type(self.ty)
            .descriptor_count(self.count)
            .stage_flags(self.stages)
            .build()
    }

    fn sort_key(&self) -> (u32, i32, u32, u32) {
        (self.binding, self.ty.as_raw(), self.count, self.stages.as_raw())
    }
}

/// Canonical form of a list of bindings: sorted ascending by slot index.
/// Two keys compare equal if and only if their sorted bindings are equal field by field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutKey {
    bindings: Vec<BindingDescription>,
}

impl LayoutKey {
    /// Build a canonical key from bindings in any order.
    pub fn new(bindings: &[BindingDescription]) -> Self {
        let mut bindings = bindings.to_vec();
        let sorted = bindings.windows(2).all(|pair| pair[0].binding < pair[1].binding);
        if !sorted {
            bindings.sort_by_key(BindingDescription::sort_key);
        }
        Self {
            bindings,
        }
    }

    /// The canonical, sorted bindings of this key.
    pub fn bindings(&self) -> &[BindingDescription] {
        self.bindings.as_slice()
    }
}

/// A descriptor set layout owned by a [`LayoutCache`]. Destroyed when the cache is dropped.
#[derive(Derivative)]
#[derivative(Debug)]
struct DescriptorSetLayout<D: DeviceInterface> {
    #[derivative(Debug = "ignore")]
    device: D,
    handle: vk::DescriptorSetLayout,
}

impl<D: DeviceInterface> DescriptorSetLayout<D> {
    fn new(device: D, key: &LayoutKey) -> Result<Self> {
        let bindings = key.bindings.iter().map(BindingDescription::to_vk).collect::<Vec<_>>();
        let handle = device
            .create_descriptor_set_layout(bindings.as_slice())
            .map_err(Error::creation("descriptor set layout"))?;
        #[cfg(feature = "log-objects")]
        trace!("Created new VkDescriptorSetLayout {handle:p}");
        if let Err(e) = device.set_name(handle, "LayoutCache::layout") {
            warn!("Failed to name descriptor set layout: {e}");
        }
        Ok(Self {
            device,
            handle,
        })
    }
}

impl<D: DeviceInterface> Drop for DescriptorSetLayout<D> {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkDescriptorSetLayout {:p}", self.handle);
        self.device.destroy_descriptor_set_layout(self.handle);
    }
}

/// Maps descriptor set layout descriptions to unique `VkDescriptorSetLayout` handles.
///
/// The cache is meant to be shared by every thread and every frame in flight. All lookups go through a single
/// mutex. Layouts are never evicted, they live until the cache is dropped or [`LayoutCache::shutdown`] is called.
///
/// # Example
/// ```ignore
/// use deimos::prelude::*;
///
/// let cache = LayoutCache::new(device.clone());
/// let layout = cache.get_or_create(&[
///     BindingDescription::new(1, vk::DescriptorType::SAMPLER, 1, vk::ShaderStageFlags::FRAGMENT),
///     BindingDescription::new(0, vk::DescriptorType::UNIFORM_BUFFER, 1, vk::ShaderStageFlags::FRAGMENT),
/// ])?;
/// ```
#[derive(Derivative)]
#[derivative(Debug)]
pub struct LayoutCache<D: DeviceInterface> {
    #[derivative(Debug = "ignore")]
    device: D,
    layouts: Mutex<HashMap<LayoutKey, DescriptorSetLayout<D>>>,
}

impl<D: DeviceInterface> LayoutCache<D> {
    /// Create a new empty layout cache.
    pub fn new(device: D) -> Self {
        Self {
            device,
            layouts: Mutex::new(HashMap::new()),
        }
    }

    /// Get the layout matching `bindings`, creating it if no structurally equal layout was requested before.
    /// The order of `bindings` does not matter.
    /// # Errors
    /// - Fails with [`Error::DeviceObjectCreation`] if the driver could not create the layout. This is not retried.
    /// - Fails with [`Error::PoisonError`] if another thread panicked while holding the cache lock.
    pub fn get_or_create(&self, bindings: &[BindingDescription]) -> Result<vk::DescriptorSetLayout> {
        let key = LayoutKey::new(bindings);
        let mut layouts = self.layouts.lock().map_err(|_| Error::PoisonError)?;
        if let Some(layout) = layouts.get(&key) {
            return Ok(layout.handle);
        }

        debug!("Creating descriptor set layout with {} bindings", key.bindings.len());
        let layout = DescriptorSetLayout::new(self.device.clone(), &key)?;
        let handle = layout.handle;
        layouts.insert(key, layout);
        Ok(handle)
    }

    /// Number of unique layouts held by the cache.
    /// # Errors
    /// - Fails with [`Error::PoisonError`] if a thread panicked while holding the cache lock.
    pub fn len(&self) -> Result<usize> {
        Ok(self.layouts.lock().map_err(|_| Error::PoisonError)?.len())
    }

    /// True if no layout was created yet.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Destroy every cached layout. Handles obtained from this cache are invalid afterwards.
    pub fn shutdown(self) {
        match self.len() {
            Ok(count) => info!("Destroying {count} cached descriptor set layouts"),
            Err(e) => warn!("Destroying cached descriptor set layouts: {e}"),
        }
        drop(self);
    }
}
