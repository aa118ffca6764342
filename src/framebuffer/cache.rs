//! Deduplicates framebuffers by the attachments and render pass they are created for.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use ash::vk;

use crate::core::traits::{DeviceInterface, Nameable};
use crate::framebuffer::attachment::{AttachmentIdentity, FramebufferKey, RenderPassInfo};
use crate::util::deferred_delete::DeletionQueue;
use crate::Error;

/// A framebuffer owned by a [`FramebufferCache`].
#[derive(Derivative)]
#[derivative(Debug)]
struct Framebuffer<D: DeviceInterface> {
    #[derivative(Debug = "ignore")]
    device: D,
    handle: vk::Framebuffer,
}

impl<D: DeviceInterface> Framebuffer<D> {
    fn new(device: D, render_pass: &RenderPassInfo, key: &FramebufferKey) -> Result<Self> {
        let extent = key.extent().ok_or(Error::NoAttachments)?;
        let views = key.attachments.iter().map(|attachment| attachment.view).collect::<Vec<_>>();
        let handle = device
            .create_framebuffer(render_pass.handle, views.as_slice(), extent, key.layers)
            .map_err(Error::creation("framebuffer"))?;
        #[cfg(feature = "log-objects")]
        trace!("Created new VkFramebuffer {handle:p}");
        if let Err(e) = device.set_name(handle, "FramebufferCache::framebuffer") {
            warn!("Failed to name framebuffer: {e}");
        }
        Ok(Self {
            device,
            handle,
        })
    }
}

impl<D: DeviceInterface> Drop for Framebuffer<D> {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkFramebuffer {:p}", self.handle);
        self.device.destroy_framebuffer(self.handle);
    }
}

#[derive(Debug)]
struct FramebufferCacheInner<D: DeviceInterface> {
    framebuffers: HashMap<FramebufferKey, Framebuffer<D>>,
    tracked: HashSet<FramebufferKey>,
    deletion_queue: DeletionQueue<Framebuffer<D>>,
    swapchain_extent: Option<vk::Extent2D>,
}

impl<D: DeviceInterface> FramebufferCacheInner<D> {
    /// Remove every entry matching the predicate. Real framebuffers go to the deletion queue.
    fn evict(&mut self, predicate: impl Fn(&FramebufferKey) -> bool) -> usize {
        let keys = self
            .framebuffers
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect::<Vec<_>>();
        for key in &keys {
            if let Some(framebuffer) = self.framebuffers.remove(key) {
                self.deletion_queue.push(framebuffer);
            }
        }
        let tracked_before = self.tracked.len();
        self.tracked.retain(|key| !predicate(key));
        keys.len() + (tracked_before - self.tracked.len())
    }
}

/// Caches `VkFramebuffer` objects by their attachments, render pass compatibility and whether they target the swapchain.
///
/// There is no automatic invalidation: whenever an attachment is resized or destroyed, call
/// [`FramebufferCache::delete_related`] with its image view. Evicted framebuffers are not destroyed immediately,
/// since a command buffer that is still executing may reference them. They are destroyed after
/// a fixed amount of calls to [`FramebufferCache::next_frame`].
///
/// # Example
/// ```ignore
/// use deimos::prelude::*;
///
/// let cache = FramebufferCache::new(device.clone(), 3);
/// let framebuffer = cache.create_framebuffer(
///     &RenderPassInfo::new(gbuffer_pass),
///     &[
///         AttachmentIdentity::new(albedo_view, 1920, 1080, vk::Format::R8G8B8A8_UNORM),
///         AttachmentIdentity::new(depth_view, 1920, 1080, vk::Format::D32_SFLOAT),
///     ],
///     false,
///     false,
/// )?;
/// // The depth buffer was resized
/// cache.delete_related(depth_view)?;
/// ```
#[derive(Derivative)]
#[derivative(Debug)]
pub struct FramebufferCache<D: DeviceInterface> {
    #[derivative(Debug = "ignore")]
    device: D,
    inner: Mutex<FramebufferCacheInner<D>>,
}

impl<D: DeviceInterface> FramebufferCache<D> {
    /// Create an empty framebuffer cache. Evicted framebuffers are kept alive for `deferred_delete_frames`
    /// calls to [`FramebufferCache::next_frame`].
    pub fn new(device: D, deferred_delete_frames: u32) -> Self {
        Self {
            device,
            inner: Mutex::new(FramebufferCacheInner {
                framebuffers: HashMap::new(),
                tracked: HashSet::new(),
                deletion_queue: DeletionQueue::new(deferred_delete_frames),
                swapchain_extent: None,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, FramebufferCacheInner<D>>> {
        Ok(self.inner.lock().map_err(|_| Error::PoisonError)?)
    }

    /// Get the framebuffer for a render pass and a list of attachments, creating it if it is not cached yet.
    ///
    /// With `resource_track_only` set, no framebuffer is created. The attachment set is only registered so that
    /// [`FramebufferCache::delete_related`] reports it, and [`vk::Framebuffer::null()`] is returned. Tracking-only
    /// registrations are kept apart from real framebuffers, so they never shadow a real framebuffer with the same key.
    /// # Errors
    /// - Fails with [`Error::NoAttachments`] if `attachments` is empty.
    /// - Fails with [`Error::DeviceObjectCreation`] if creating the framebuffer failed.
    pub fn create_framebuffer(
        &self,
        render_pass: &RenderPassInfo,
        attachments: &[AttachmentIdentity],
        targets_swapchain: bool,
        resource_track_only: bool,
    ) -> Result<vk::Framebuffer> {
        if attachments.is_empty() {
            return Err(Error::NoAttachments.into());
        }

        let key = FramebufferKey::new(render_pass, attachments, targets_swapchain);
        let mut inner = self.lock()?;
        if resource_track_only {
            inner.tracked.insert(key);
            return Ok(vk::Framebuffer::null());
        }

        if let Some(framebuffer) = inner.framebuffers.get(&key) {
            return Ok(framebuffer.handle);
        }

        debug!("Creating new framebuffer with {} attachments", key.attachments.len());
        let framebuffer = Framebuffer::new(self.device.clone(), render_pass, &key)?;
        let handle = framebuffer.handle;
        inner.framebuffers.insert(key, framebuffer);
        Ok(handle)
    }

    /// Evict every entry that references the given image view. Must be called whenever an attachment is
    /// resized or destroyed. Returns the amount of evicted entries, including tracking-only registrations.
    pub fn delete_related(&self, view: vk::ImageView) -> Result<usize> {
        let mut inner = self.lock()?;
        let count = inner.evict(|key| key.references(view));
        if count > 0 {
            debug!("Evicted {count} framebuffers referencing image view {view:?}");
        }
        Ok(count)
    }

    /// Evict every entry that targets the swapchain. Call this after the swapchain was recreated with a new size.
    /// Returns the amount of evicted entries.
    pub fn resize_swapchain(&self, width: u32, height: u32) -> Result<usize> {
        let mut inner = self.lock()?;
        inner.swapchain_extent = Some(vk::Extent2D {
            width,
            height,
        });
        let count = inner.evict(|key| key.targets_swapchain);
        info!("Swapchain resized to {width}x{height}, evicted {count} framebuffers");
        Ok(count)
    }

    /// Advance the deferred deletion queue by one frame, destroying framebuffers that were evicted long enough ago.
    pub fn next_frame(&self) -> Result<()> {
        self.lock()?.deletion_queue.next_frame();
        Ok(())
    }

    /// The swapchain size given to the last [`FramebufferCache::resize_swapchain`] call.
    pub fn swapchain_extent(&self) -> Result<Option<vk::Extent2D>> {
        Ok(self.lock()?.swapchain_extent)
    }

    /// Number of cached framebuffers.
    /// # Errors
    /// - Fails with [`Error::PoisonError`] if a thread panicked while holding the cache lock.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.framebuffers.len())
    }

    /// True if no framebuffers are cached.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.framebuffers.is_empty())
    }

    /// Number of tracking-only registrations.
    pub fn tracked_len(&self) -> Result<usize> {
        Ok(self.lock()?.tracked.len())
    }

    /// Number of evicted framebuffers waiting to be destroyed.
    pub fn pending_deletions(&self) -> Result<usize> {
        Ok(self.lock()?.deletion_queue.len())
    }

    /// Destroy every framebuffer, including ones waiting for deferred deletion.
    /// The device must be idle.
    pub fn cleanup(self) {
        let Ok(mut inner) = self.lock() else {
            warn!("Framebuffer cache lock poisoned during cleanup");
            return;
        };
        info!("Destroying {} cached framebuffers", inner.framebuffers.len());
        if !inner.deletion_queue.is_empty() {
            debug!("Flushing {} framebuffers pending deletion", inner.deletion_queue.len());
            inner.deletion_queue.clear();
        }
        inner.framebuffers.clear();
    }
}
