//! The descriptor builder accumulates bindings and turns them into a layout, a descriptor set and its writes in one call.

use anyhow::Result;
use ash::vk;

use crate::core::traits::DeviceInterface;
use crate::descriptor::allocator::DescriptorAllocator;
use crate::descriptor::layout_cache::{BindingDescription, LayoutCache};

/// Where the resource info of a deferred write lives. Infos are referenced by index, since the
/// owning vectors may reallocate while more bindings are added.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum WriteSource {
    Buffer(usize),
    Image(usize),
}

#[derive(Debug, Copy, Clone)]
struct DeferredWrite {
    binding: u32,
    ty: vk::DescriptorType,
    source: WriteSource,
    count: u32,
}

/// Builds a descriptor set layout and a descriptor set from a list of bindings.
/// The layout is looked up in a shared [`LayoutCache`], the set is allocated from a
/// (frame-local) [`DescriptorAllocator`].
///
/// A builder is consumed by [`DescriptorBuilder::build`] or [`DescriptorBuilder::build_layout`], so it can only be used once.
/// # Example
/// ```ignore
/// use deimos::prelude::*;
///
/// let (set, layout) = DescriptorBuilder::begin(&layout_cache, &mut allocator)
///     .bind_buffer(0, camera_buffer_info, vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::VERTEX)
///     .bind_image(1, Some(albedo_info), vk::DescriptorType::COMBINED_IMAGE_SAMPLER, vk::ShaderStageFlags::FRAGMENT, 1)
///     .build_with_layout()?;
/// ```
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DescriptorBuilder<'a, D: DeviceInterface> {
    #[derivative(Debug = "ignore")]
    cache: &'a LayoutCache<D>,
    #[derivative(Debug = "ignore")]
    allocator: &'a mut DescriptorAllocator<D>,
    bindings: Vec<BindingDescription>,
    writes: Vec<DeferredWrite>,
    buffer_infos: Vec<vk::DescriptorBufferInfo>,
    image_infos: Vec<vk::DescriptorImageInfo>,
}

impl<'a, D: DeviceInterface> DescriptorBuilder<'a, D> {
    /// Start building a descriptor set using the given layout cache and allocator.
    pub fn begin(cache: &'a LayoutCache<D>, allocator: &'a mut DescriptorAllocator<D>) -> Self {
        Self {
            cache,
            allocator,
            bindings: vec![],
            writes: vec![],
            buffer_infos: vec![],
            image_infos: vec![],
        }
    }

    /// Bind a buffer to the given slot.
    pub fn bind_buffer(
        mut self,
        binding: u32,
        info: vk::DescriptorBufferInfo,
        ty: vk::DescriptorType,
        stages: vk::ShaderStageFlags,
    ) -> Self {
        self.bindings.push(BindingDescription::new(binding, ty, 1, stages));
        self.writes.push(DeferredWrite {
            binding,
            ty,
            source: WriteSource::Buffer(self.buffer_infos.len()),
            count: 1,
        });
        self.buffer_infos.push(info);
        self
    }

    /// Bind an image to the given slot. The binding is declared with `count` array elements.
    ///
    /// Passing `None` only declares the binding in the layout without writing to it, which is useful to
    /// obtain a layout before the resource exists. If an image is given, it is written to array element zero.
    pub fn bind_image(
        mut self,
        binding: u32,
        info: Option<vk::DescriptorImageInfo>,
        ty: vk::DescriptorType,
        stages: vk::ShaderStageFlags,
        count: u32,
    ) -> Self {
        self.bindings.push(BindingDescription::new(binding, ty, count, stages));
        if let Some(info) = info {
            self.writes.push(DeferredWrite {
                binding,
                ty,
                source: WriteSource::Image(self.image_infos.len()),
                count: 1,
            });
            self.image_infos.push(info);
        }
        self
    }

    /// Bind an array of images to the given slot, writing every element.
    /// An empty slice declares a single-element binding without writing to it.
    pub fn bind_image_array(
        mut self,
        binding: u32,
        infos: &[vk::DescriptorImageInfo],
        ty: vk::DescriptorType,
        stages: vk::ShaderStageFlags,
    ) -> Self {
        self.bindings.push(BindingDescription::new(binding, ty, infos.len() as u32, stages));
        if !infos.is_empty() {
            self.writes.push(DeferredWrite {
                binding,
                ty,
                source: WriteSource::Image(self.image_infos.len()),
                count: infos.len() as u32,
            });
            self.image_infos.extend_from_slice(infos);
        }
        self
    }

    /// Get the layout for the bindings declared so far, without allocating a descriptor set.
    /// # Errors
    /// Fails if the layout had to be created and creation failed.
    pub fn build_layout(self) -> Result<vk::DescriptorSetLayout> {
        self.cache.get_or_create(self.bindings.as_slice())
    }

    /// Build the layout, allocate a descriptor set with it and write every bound resource to the set.
    /// # Errors
    /// - Fails if the layout could not be created.
    /// - Fails if the descriptor set could not be allocated. In this case nothing is written.
    pub fn build_with_layout(self) -> Result<(vk::DescriptorSet, vk::DescriptorSetLayout)> {
        let layout = self.cache.get_or_create(self.bindings.as_slice())?;
        let set = self.allocator.allocate(layout)?;

        let writes = self
            .writes
            .iter()
            .map(|write| {
                let info = vk::WriteDescriptorSet::builder()
                    .dst_set(set)
                    .dst_binding(write.binding)
                    .dst_array_element(0)
                    .descriptor_type(write.ty);
                let count = write.count as usize;
                let info = match write.source {
                    WriteSource::Buffer(index) => info.buffer_info(&self.buffer_infos[index..index + count]),
                    WriteSource::Image(index) => info.image_info(&self.image_infos[index..index + count]),
                };
                info.build()
            })
            .collect::<Vec<_>>();

        if !writes.is_empty() {
            // SAFETY: All info pointers point into self.buffer_infos and self.image_infos, which outlive this call.
            // The set was just allocated so it cannot be in use.
            unsafe {
                self.allocator.device().update_descriptor_sets(writes.as_slice());
            }
        }

        Ok((set, layout))
    }

    /// Same as [`DescriptorBuilder::build_with_layout`], but discards the layout.
    pub fn build(self) -> Result<vk::DescriptorSet> {
        self.build_with_layout().map(|(set, _)| set)
    }
}
