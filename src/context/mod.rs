//! The renderer context owns every cache, the per-frame descriptor allocators and the task scheduler.
//!
//! Render passes receive the context by reference instead of reaching for global state. Destruction order is fixed:
//! the task scheduler is stopped first so no task can touch a cache that is being destroyed, then framebuffers,
//! descriptor pools and finally descriptor set layouts are released.
//!
//! # Example
//!
//! ```ignore
//! use deimos::prelude::*;
//!
//! let settings = ContextBuilder::new().frames_in_flight(2).worker_threads(4).build();
//! let mut ctx = RendererContext::new(Device::new(ash_device), &settings)?;
//!
//! loop {
//!     // Wait for this frame's fence first, then recycle its descriptor pools.
//!     ctx.next_frame()?;
//!     let set = {
//!         let mut allocator = ctx.frame_allocator()?;
//!         DescriptorBuilder::begin(ctx.layouts(), &mut allocator)
//!             .bind_buffer(0, camera_info, vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::VERTEX)
//!             .build()?
//!     };
//!     // Record passes in parallel
//!     ctx.scheduler().add_task_list_and_wait(record_tasks)?;
//! }
//! ```

pub mod settings;

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;

use crate::core::traits::DeviceInterface;
use crate::descriptor::allocator::DescriptorAllocator;
use crate::descriptor::layout_cache::LayoutCache;
use crate::framebuffer::cache::FramebufferCache;
use crate::sync::task_scheduler::TaskScheduler;
use crate::{ContextSettings, Device, Error};

/// Explicit owner of all shared rendering state.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct RendererContext<D: DeviceInterface = Device> {
    // Field order is drop order.
    scheduler: TaskScheduler,
    framebuffers: Arc<FramebufferCache<D>>,
    descriptor_allocators: Vec<Mutex<DescriptorAllocator<D>>>,
    layouts: Arc<LayoutCache<D>>,
    current_frame: usize,
    #[derivative(Debug = "ignore")]
    device: D,
}

impl<D: DeviceInterface> RendererContext<D> {
    /// Create all caches, one descriptor allocator per frame in flight, and spawn the task scheduler.
    /// # Errors
    /// Fails if the worker threads could not be spawned.
    pub fn new(device: D, settings: &ContextSettings) -> Result<Self> {
        let frames = settings.frames_in_flight.max(1);
        let descriptor_allocators = (0..frames)
            .map(|_| {
                Mutex::new(DescriptorAllocator::new(
                    device.clone(),
                    settings.pool_sizes.clone(),
                    settings.descriptor_pool_capacity,
                ))
            })
            .collect();

        let ctx = Self {
            scheduler: TaskScheduler::new(settings.worker_threads)?,
            framebuffers: Arc::new(FramebufferCache::new(device.clone(), settings.deferred_delete_frames)),
            descriptor_allocators,
            layouts: Arc::new(LayoutCache::new(device.clone())),
            current_frame: 0,
            device,
        };
        info!(
            "Created renderer context with {frames} frames in flight and {} worker threads",
            ctx.scheduler.worker_count()
        );
        Ok(ctx)
    }

    /// Advance to the next frame in flight. This resets that frame's descriptor pools and ticks the framebuffer
    /// deletion queue.
    ///
    /// The caller must make sure the GPU finished every command buffer submitted the last time this frame index was used.
    /// # Errors
    /// If resetting the descriptor pools fails, the frame index still advances and the deletion queue is still ticked
    /// before the reset error is returned.
    pub fn next_frame(&mut self) -> Result<()> {
        let next = (self.current_frame + 1) % self.descriptor_allocators.len();
        self.current_frame = next;
        let reset = self
            .descriptor_allocator(next)
            .and_then(|mut allocator| allocator.reset_pools());
        self.framebuffers.next_frame()?;
        reset
    }

    /// Index of the current frame in flight.
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Number of frames in flight.
    pub fn frames_in_flight(&self) -> usize {
        self.descriptor_allocators.len()
    }

    /// Lock the descriptor allocator of the current frame.
    pub fn frame_allocator(&self) -> Result<MutexGuard<'_, DescriptorAllocator<D>>> {
        self.descriptor_allocator(self.current_frame)
    }

    /// Lock the descriptor allocator of a specific frame in flight.
    /// # Errors
    /// Fails with [`Error::InvalidFrameIndex`] if `frame` is not smaller than the number of frames in flight.
    pub fn descriptor_allocator(&self, frame: usize) -> Result<MutexGuard<'_, DescriptorAllocator<D>>> {
        let allocator = self
            .descriptor_allocators
            .get(frame)
            .ok_or(Error::InvalidFrameIndex(frame, self.descriptor_allocators.len()))?;
        Ok(allocator.lock().map_err(|_| Error::PoisonError)?)
    }

    /// The shared descriptor set layout cache.
    pub fn layouts(&self) -> &Arc<LayoutCache<D>> {
        &self.layouts
    }

    /// The shared framebuffer cache.
    pub fn framebuffers(&self) -> &Arc<FramebufferCache<D>> {
        &self.framebuffers
    }

    /// The task scheduler used for parallel command recording.
    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// The device all caches were created with.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Stop the task scheduler and release every cached object. The device must be idle.
    pub fn shutdown(mut self) {
        self.scheduler.shutdown();
        info!("Shutting down renderer context");
    }
}
