//! Hands out descriptor sets from a growable list of recyclable descriptor pools.

use anyhow::Result;
use ash::vk;

use crate::core::traits::{DeviceInterface, Nameable};
use crate::Error;

/// Default amount of descriptor sets a single pool is sized for.
pub const DEFAULT_POOL_CAPACITY: u32 = 1000;

/// Relative weight of each descriptor type when sizing a new pool.
/// A weight of `2.0` with a capacity of 1000 sets reserves room for 2000 descriptors of that type.
#[derive(Debug, Clone)]
pub struct PoolSizes {
    /// Descriptor type and its weight relative to the pool capacity.
    pub sizes: Vec<(vk::DescriptorType, f32)>,
}

impl Default for PoolSizes {
    fn default() -> Self {
        Self {
            sizes: vec![
                (vk::DescriptorType::SAMPLER, 0.5),
                (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 4.0),
                (vk::DescriptorType::SAMPLED_IMAGE, 4.0),
                (vk::DescriptorType::STORAGE_IMAGE, 1.0),
                (vk::DescriptorType::UNIFORM_TEXEL_BUFFER, 1.0),
                (vk::DescriptorType::STORAGE_TEXEL_BUFFER, 1.0),
                (vk::DescriptorType::UNIFORM_BUFFER, 2.0),
                (vk::DescriptorType::STORAGE_BUFFER, 2.0),
                (vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC, 1.0),
                (vk::DescriptorType::STORAGE_BUFFER_DYNAMIC, 1.0),
                (vk::DescriptorType::INPUT_ATTACHMENT, 0.5),
            ],
        }
    }
}

impl PoolSizes {
    /// Compute the absolute descriptor counts for a pool holding `capacity` sets.
    /// Every type gets room for at least one descriptor.
    pub fn to_vk(&self, capacity: u32) -> Vec<vk::DescriptorPoolSize> {
        self.sizes
            .iter()
            .map(|(ty, weight)| vk::DescriptorPoolSize {
                ty: *ty,
                descriptor_count: ((weight * capacity as f32) as u32).max(1),
            })
            .collect()
    }
}

/// Memory pool for descriptor sets
#[derive(Derivative)]
#[derivative(Debug)]
struct DescriptorPool<D: DeviceInterface> {
    #[derivative(Debug = "ignore")]
    device: D,
    handle: vk::DescriptorPool,
}

impl<D: DeviceInterface> DescriptorPool<D> {
    fn new(device: D, sizes: &PoolSizes, capacity: u32) -> Result<Self> {
        let pool_sizes = sizes.to_vk(capacity);
        let handle = device
            .create_descriptor_pool(pool_sizes.as_slice(), capacity)
            .map_err(Error::creation("descriptor pool"))?;
        #[cfg(feature = "log-objects")]
        trace!("Created new VkDescriptorPool {handle:p}");
        if let Err(e) = device.set_name(handle, "DescriptorAllocator::pool") {
            warn!("Failed to name descriptor pool: {e}");
        }
        Ok(Self {
            device,
            handle,
        })
    }
}

impl<D: DeviceInterface> Drop for DescriptorPool<D> {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkDescriptorPool {:p}", self.handle);
        self.device.destroy_descriptor_pool(self.handle);
    }
}

/// Allocates descriptor sets from a list of pools that are recycled in bulk.
///
/// Pools with outstanding allocations live in the `used` list, and move to the `free` list
/// when [`DescriptorAllocator::reset_pools`] is called. New pools are only created when the
/// `free` list is empty. The most recently grabbed pool is the one allocations are served from.
///
/// Every frame in flight should own its own allocator, so resetting the pools of frame `i` never
/// invalidates sets that frame `i + 1` is still using. Because both [`DescriptorAllocator::allocate`] and
/// [`DescriptorAllocator::reset_pools`] take `&mut self`, a reset can never overlap with an allocation on the same allocator.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DescriptorAllocator<D: DeviceInterface> {
    #[derivative(Debug = "ignore")]
    device: D,
    sizes: PoolSizes,
    capacity: u32,
    used: Vec<DescriptorPool<D>>,
    free: Vec<DescriptorPool<D>>,
}

impl<D: DeviceInterface> DescriptorAllocator<D> {
    /// Create an allocator. No pool is created until the first allocation.
    /// `capacity` is the amount of sets each pool can hold, and is clamped to at least one.
    pub fn new(device: D, sizes: PoolSizes, capacity: u32) -> Self {
        Self {
            device,
            sizes,
            capacity: capacity.max(1),
            used: vec![],
            free: vec![],
        }
    }

    /// Create an allocator with the default pool sizes and [`DEFAULT_POOL_CAPACITY`].
    pub fn with_defaults(device: D) -> Self {
        Self::new(device, PoolSizes::default(), DEFAULT_POOL_CAPACITY)
    }

    /// Make a pool current by reusing a free pool, or creating a new one if there are none left.
    fn grab_pool(&mut self) -> Result<vk::DescriptorPool> {
        let pool = match self.free.pop() {
            Some(pool) => pool,
            None => {
                debug!("Creating new descriptor pool (capacity: {} sets)", self.capacity);
                DescriptorPool::new(self.device.clone(), &self.sizes, self.capacity)?
            }
        };
        let handle = pool.handle;
        self.used.push(pool);
        Ok(handle)
    }

    /// Allocate a descriptor set with the given layout.
    ///
    /// If the current pool is fragmented or out of memory, a new pool is grabbed and the allocation
    /// is retried exactly once.
    /// # Errors
    /// - Fails with [`Error::AllocationExhausted`] if the retry on a fresh pool failed as well.
    /// - Fails with [`Error::VkError`] on any other allocation failure.
    /// - Fails with [`Error::DeviceObjectCreation`] if a new pool had to be created and creation failed.
    pub fn allocate(&mut self, layout: vk::DescriptorSetLayout) -> Result<vk::DescriptorSet> {
        let pool = match self.used.last() {
            Some(pool) => pool.handle,
            None => self.grab_pool()?,
        };

        match self.device.allocate_descriptor_set(pool, layout) {
            Ok(set) => Ok(set),
            Err(result @ (vk::Result::ERROR_FRAGMENTED_POOL | vk::Result::ERROR_OUT_OF_POOL_MEMORY)) => {
                debug!("Descriptor pool exhausted ({result}), retrying on another pool");
                let pool = self.grab_pool()?;
                self.device.allocate_descriptor_set(pool, layout).map_err(|result| {
                    error!("Descriptor set allocation failed on a fresh pool: {result}");
                    Error::AllocationExhausted(result).into()
                })
            }
            Err(result) => {
                error!("Descriptor set allocation failed: {result}");
                Err(Error::VkError(result).into())
            }
        }
    }

    /// Reset every used pool and make it available for reuse. All descriptor sets allocated since the
    /// last reset become invalid.
    ///
    /// Every pool is moved to the free list even if resetting one of them fails, in which case the first error is returned.
    pub fn reset_pools(&mut self) -> Result<()> {
        let mut result = Ok(());
        for pool in self.used.drain(..) {
            if let Err(e) = self.device.reset_descriptor_pool(pool.handle) {
                if result.is_ok() {
                    result = Err(Error::VkError(e));
                }
            }
            self.free.push(pool);
        }
        Ok(result?)
    }

    /// Destroy every pool owned by this allocator.
    pub fn cleanup(self) {
        drop(self);
    }

    /// The device this allocator allocates from.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Amount of descriptor sets a single pool is sized for.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Handles of the pools with allocations outstanding since the last reset, oldest first.
    pub fn used_pools(&self) -> Vec<vk::DescriptorPool> {
        self.used.iter().map(|pool| pool.handle).collect()
    }

    /// Handles of the pools available for reuse.
    pub fn free_pools(&self) -> Vec<vk::DescriptorPool> {
        self.free.iter().map(|pool| pool.handle).collect()
    }

    /// Number of pools with allocations outstanding.
    pub fn used_pool_count(&self) -> usize {
        self.used.len()
    }

    /// Number of pools available for reuse.
    pub fn free_pool_count(&self) -> usize {
        self.free.len()
    }
}
