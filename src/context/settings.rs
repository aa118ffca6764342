//! Exposes the settings used to create a [`RendererContext`](crate::RendererContext).

use crate::descriptor::allocator::{PoolSizes, DEFAULT_POOL_CAPACITY};

/// The default number of frames in flight. A frame in-flight is a frame that is rendering on the GPU or scheduled to do so.
/// With two frames in flight, we can prepare a frame on the CPU while one frame is rendering on the GPU.
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;

/// Settings used to initialize a [`RendererContext`](crate::RendererContext).
#[derive(Debug, Clone)]
pub struct ContextSettings {
    /// Number of frames in flight. Each frame gets its own descriptor allocator.
    pub frames_in_flight: usize,
    /// Number of worker threads spawned by the task scheduler.
    pub worker_threads: usize,
    /// Amount of descriptor sets each descriptor pool is sized for.
    pub descriptor_pool_capacity: u32,
    /// Relative amount of descriptors of each type in a descriptor pool.
    pub pool_sizes: PoolSizes,
    /// Amount of frames an evicted framebuffer is kept alive before it is destroyed.
    pub deferred_delete_frames: u32,
}

impl Default for ContextSettings {
    fn default() -> Self {
        let worker_threads = std::thread::available_parallelism()
            .map(|count| count.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1);
        Self {
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            worker_threads,
            descriptor_pool_capacity: DEFAULT_POOL_CAPACITY,
            pool_sizes: PoolSizes::default(),
            deferred_delete_frames: DEFAULT_FRAMES_IN_FLIGHT as u32 + 1,
        }
    }
}

/// The context builder is a convenience struct to easily create [`ContextSettings`].
///
/// For information about each of the fields, see [`ContextSettings`]
/// # Example
/// ```
/// # use deimos::*;
/// let settings = ContextBuilder::new()
///     .frames_in_flight(3)
///     .worker_threads(4)
///     .descriptor_pool_capacity(500)
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ContextBuilder {
    inner: ContextSettings,
    deferred_delete_frames: Option<u32>,
}

impl ContextBuilder {
    /// Create a new context builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of frames in flight. Clamped to at least one.
    pub fn frames_in_flight(mut self, count: usize) -> Self {
        self.inner.frames_in_flight = count.max(1);
        self
    }

    /// Sets the number of task scheduler worker threads. Clamped to at least one.
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.inner.worker_threads = count.max(1);
        self
    }

    /// Sets the amount of descriptor sets a single descriptor pool can hold.
    pub fn descriptor_pool_capacity(mut self, capacity: u32) -> Self {
        self.inner.descriptor_pool_capacity = capacity.max(1);
        self
    }

    /// Sets the relative descriptor type weights used to size descriptor pools.
    pub fn pool_sizes(mut self, sizes: PoolSizes) -> Self {
        self.inner.pool_sizes = sizes;
        self
    }

    /// Sets how many frames evicted framebuffers are kept alive.
    /// Defaults to one more than the number of frames in flight.
    pub fn deferred_delete_frames(mut self, frames: u32) -> Self {
        self.deferred_delete_frames = Some(frames.max(1));
        self
    }

    /// Build the resulting context settings.
    pub fn build(mut self) -> ContextSettings {
        self.inner.deferred_delete_frames = self
            .deferred_delete_frames
            .unwrap_or(self.inner.frames_in_flight as u32 + 1);
        self.inner
    }
}
