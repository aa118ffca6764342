//! This module handles everything related to descriptor sets.
//!
//! - [`LayoutCache`](layout_cache::LayoutCache) deduplicates descriptor set layouts. Two descriptions with the same bindings
//! always yield the same `VkDescriptorSetLayout`, regardless of the order the bindings were declared in.
//! One cache is shared by the whole renderer.
//! - [`DescriptorAllocator`](allocator::DescriptorAllocator) allocates descriptor sets from pools that are recycled in bulk.
//! Use one allocator per frame in flight, and reset it once that frame's GPU work has finished.
//! - [`DescriptorBuilder`](builder::DescriptorBuilder) ties both together: bind resources to slots and get back a
//! fully written descriptor set.
//!
//! # Example
//!
//! ```ignore
//! use deimos::prelude::*;
//!
//! let layouts = LayoutCache::new(device.clone());
//! let mut allocator = DescriptorAllocator::with_defaults(device.clone());
//!
//! let set = DescriptorBuilder::begin(&layouts, &mut allocator)
//!     // In GLSL this would be a descriptor
//!     // layout(set = X, binding = 0) uniform sampler2D tex;
//!     .bind_image(0, Some(image_info), vk::DescriptorType::COMBINED_IMAGE_SAMPLER, vk::ShaderStageFlags::FRAGMENT, 1)
//!     .build()?;
//!
//! // Once the GPU is done with this frame
//! allocator.reset_pools()?;
//! ```

pub mod allocator;
pub mod builder;
pub mod layout_cache;
