#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use ash::prelude::VkResult;
use ash::vk;
use ash::vk::Handle;

use deimos::prelude::*;

/// Bookkeeping for a descriptor pool created by the mock device.
#[derive(Debug, Copy, Clone)]
pub struct PoolRecord {
    pub max_sets: u32,
    pub allocated: u32,
    pub resets: u32,
}

/// A layout binding without its immutable sampler pointer, so it can be stored across threads.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LayoutBindingRecord {
    pub binding: u32,
    pub ty: vk::DescriptorType,
    pub count: u32,
    pub stages: vk::ShaderStageFlags,
}

/// Parameters a framebuffer was created with.
#[derive(Debug, Clone)]
pub struct FramebufferRecord {
    pub render_pass: vk::RenderPass,
    pub attachments: Vec<vk::ImageView>,
    pub extent: vk::Extent2D,
    pub layers: u32,
}

/// A single descriptor write, with its resource infos copied out of the raw pointers.
#[derive(Debug, Clone)]
pub struct WriteRecord {
    pub set: vk::DescriptorSet,
    pub binding: u32,
    pub array_element: u32,
    pub ty: vk::DescriptorType,
    pub count: u32,
    pub buffers: Vec<vk::DescriptorBufferInfo>,
    pub images: Vec<vk::DescriptorImageInfo>,
}

#[derive(Debug, Default)]
struct MockState {
    next_handle: AtomicU64,
    layouts: Mutex<HashMap<u64, Vec<LayoutBindingRecord>>>,
    layouts_created: AtomicUsize,
    layouts_destroyed: AtomicUsize,
    pools: Mutex<HashMap<u64, PoolRecord>>,
    pools_created: AtomicUsize,
    pools_destroyed: AtomicUsize,
    framebuffers: Mutex<HashMap<u64, FramebufferRecord>>,
    framebuffers_created: AtomicUsize,
    framebuffers_destroyed: AtomicUsize,
    writes: Mutex<Vec<WriteRecord>>,
    update_calls: AtomicUsize,
    allocation_failures: Mutex<VecDeque<vk::Result>>,
    layout_failures: Mutex<VecDeque<vk::Result>>,
    framebuffer_failures: Mutex<VecDeque<vk::Result>>,
    reset_failures: Mutex<VecDeque<vk::Result>>,
    panic_on_layout: AtomicBool,
    names: Mutex<HashMap<u64, (vk::ObjectType, String)>>,
}

/// In-memory device that hands out unique handles and records every call.
/// Descriptor pools enforce their `max_sets` limit, like a real driver would.
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    state: Arc<MockState>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handle(&self) -> u64 {
        self.state.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Make the next allocations fail with the given results, in order.
    pub fn fail_allocations(&self, results: &[vk::Result]) {
        self.state.allocation_failures.lock().unwrap().extend(results.iter().copied());
    }

    pub fn fail_next_layout(&self, result: vk::Result) {
        self.state.layout_failures.lock().unwrap().push_back(result);
    }

    /// Make the next layout creation panic, as a broken driver call would.
    pub fn panic_next_layout(&self) {
        self.state.panic_on_layout.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_framebuffer(&self, result: vk::Result) {
        self.state.framebuffer_failures.lock().unwrap().push_back(result);
    }

    pub fn fail_next_reset(&self, result: vk::Result) {
        self.state.reset_failures.lock().unwrap().push_back(result);
    }

    pub fn layouts_created(&self) -> usize {
        self.state.layouts_created.load(Ordering::Relaxed)
    }

    pub fn layouts_destroyed(&self) -> usize {
        self.state.layouts_destroyed.load(Ordering::Relaxed)
    }

    pub fn layout_bindings(&self, layout: vk::DescriptorSetLayout) -> Option<Vec<LayoutBindingRecord>> {
        self.state.layouts.lock().unwrap().get(&layout.as_raw()).cloned()
    }

    pub fn pools_created(&self) -> usize {
        self.state.pools_created.load(Ordering::Relaxed)
    }

    pub fn pools_destroyed(&self) -> usize {
        self.state.pools_destroyed.load(Ordering::Relaxed)
    }

    pub fn pool(&self, pool: vk::DescriptorPool) -> Option<PoolRecord> {
        self.state.pools.lock().unwrap().get(&pool.as_raw()).copied()
    }

    pub fn framebuffers_created(&self) -> usize {
        self.state.framebuffers_created.load(Ordering::Relaxed)
    }

    pub fn framebuffers_destroyed(&self) -> usize {
        self.state.framebuffers_destroyed.load(Ordering::Relaxed)
    }

    pub fn framebuffer(&self, framebuffer: vk::Framebuffer) -> Option<FramebufferRecord> {
        self.state
            .framebuffers
            .lock()
            .unwrap()
            .get(&framebuffer.as_raw())
            .cloned()
    }

    pub fn is_framebuffer_alive(&self, framebuffer: vk::Framebuffer) -> bool {
        self.framebuffer(framebuffer).is_some()
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state.writes.lock().unwrap().clone()
    }

    pub fn update_calls(&self) -> usize {
        self.state.update_calls.load(Ordering::Relaxed)
    }

    /// Debug name attached to a handle, with the object type it was given for.
    pub fn name_of<H: Handle>(&self, object: H) -> Option<(vk::ObjectType, String)> {
        self.state.names.lock().unwrap().get(&object.as_raw()).cloned()
    }
}

impl DeviceInterface for MockDevice {
    fn create_descriptor_set_layout(&self, bindings: &[vk::DescriptorSetLayoutBinding]) -> VkResult<vk::DescriptorSetLayout> {
        if self.state.panic_on_layout.swap(false, Ordering::SeqCst) {
            panic!("descriptor set layout creation panicked");
        }
        if let Some(result) = self.state.layout_failures.lock().unwrap().pop_front() {
            return Err(result);
        }
        let raw = self.next_handle();
        let records = bindings
            .iter()
            .map(|binding| LayoutBindingRecord {
                binding: binding.binding,
                ty: binding.descriptor_type,
                count: binding.descriptor_count,
                stages: binding.stage_flags,
            })
            .collect();
        self.state.layouts.lock().unwrap().insert(raw, records);
        self.state.layouts_created.fetch_add(1, Ordering::Relaxed);
        Ok(vk::DescriptorSetLayout::from_raw(raw))
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        let removed = self.state.layouts.lock().unwrap().remove(&layout.as_raw());
        assert!(removed.is_some(), "descriptor set layout {layout:?} destroyed twice");
        self.state.layouts_destroyed.fetch_add(1, Ordering::Relaxed);
    }

    fn create_descriptor_pool(&self, _sizes: &[vk::DescriptorPoolSize], max_sets: u32) -> VkResult<vk::DescriptorPool> {
        let raw = self.next_handle();
        self.state.pools.lock().unwrap().insert(
            raw,
            PoolRecord {
                max_sets,
                allocated: 0,
                resets: 0,
            },
        );
        self.state.pools_created.fetch_add(1, Ordering::Relaxed);
        Ok(vk::DescriptorPool::from_raw(raw))
    }

    fn reset_descriptor_pool(&self, pool: vk::DescriptorPool) -> VkResult<()> {
        let mut pools = self.state.pools.lock().unwrap();
        let record = pools
            .get_mut(&pool.as_raw())
            .expect("reset of unknown descriptor pool");
        record.allocated = 0;
        record.resets += 1;
        match self.state.reset_failures.lock().unwrap().pop_front() {
            Some(result) => Err(result),
            None => Ok(()),
        }
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        let removed = self.state.pools.lock().unwrap().remove(&pool.as_raw());
        assert!(removed.is_some(), "descriptor pool {pool:?} destroyed twice");
        self.state.pools_destroyed.fetch_add(1, Ordering::Relaxed);
    }

    fn allocate_descriptor_set(&self, pool: vk::DescriptorPool, _layout: vk::DescriptorSetLayout) -> VkResult<vk::DescriptorSet> {
        if let Some(result) = self.state.allocation_failures.lock().unwrap().pop_front() {
            return Err(result);
        }
        let mut pools = self.state.pools.lock().unwrap();
        let record = pools
            .get_mut(&pool.as_raw())
            .expect("allocation from unknown descriptor pool");
        if record.allocated >= record.max_sets {
            return Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY);
        }
        record.allocated += 1;
        drop(pools);
        Ok(vk::DescriptorSet::from_raw(self.next_handle()))
    }

    unsafe fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet]) {
        self.state.update_calls.fetch_add(1, Ordering::Relaxed);
        let mut recorded = self.state.writes.lock().unwrap();
        for write in writes {
            let count = write.descriptor_count as usize;
            let buffers = if write.p_buffer_info.is_null() {
                vec![]
            } else {
                std::slice::from_raw_parts(write.p_buffer_info, count).to_vec()
            };
            let images = if write.p_image_info.is_null() {
                vec![]
            } else {
                std::slice::from_raw_parts(write.p_image_info, count).to_vec()
            };
            recorded.push(WriteRecord {
                set: write.dst_set,
                binding: write.dst_binding,
                array_element: write.dst_array_element,
                ty: write.descriptor_type,
                count: write.descriptor_count,
                buffers,
                images,
            });
        }
    }

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
        layers: u32,
    ) -> VkResult<vk::Framebuffer> {
        if let Some(result) = self.state.framebuffer_failures.lock().unwrap().pop_front() {
            return Err(result);
        }
        let raw = self.next_handle();
        self.state.framebuffers.lock().unwrap().insert(
            raw,
            FramebufferRecord {
                render_pass,
                attachments: attachments.to_vec(),
                extent,
                layers,
            },
        );
        self.state.framebuffers_created.fetch_add(1, Ordering::Relaxed);
        Ok(vk::Framebuffer::from_raw(raw))
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        let removed = self.state.framebuffers.lock().unwrap().remove(&framebuffer.as_raw());
        assert!(removed.is_some(), "framebuffer {framebuffer:?} destroyed twice");
        self.state.framebuffers_destroyed.fetch_add(1, Ordering::Relaxed);
    }

    fn set_debug_name(&self, object_type: vk::ObjectType, handle: u64, name: &CStr) -> Result<()> {
        self.state
            .names
            .lock()
            .unwrap()
            .insert(handle, (object_type, name.to_string_lossy().into_owned()));
        Ok(())
    }
}

/// Enable logging for a test. Safe to call from every test, only the first call installs the logger.
pub fn init_logging() {
    let _ = pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// Creates a mock device ready for automated tests
pub fn make_device() -> MockDevice {
    init_logging();
    MockDevice::new()
}

pub fn image_view(raw: u64) -> vk::ImageView {
    vk::ImageView::from_raw(raw)
}

pub fn render_pass(raw: u64) -> vk::RenderPass {
    vk::RenderPass::from_raw(raw)
}

pub fn buffer_info(raw: u64, offset: u64, range: u64) -> vk::DescriptorBufferInfo {
    vk::DescriptorBufferInfo {
        buffer: vk::Buffer::from_raw(raw),
        offset,
        range,
    }
}

pub fn image_info(view: u64) -> vk::DescriptorImageInfo {
    vk::DescriptorImageInfo {
        sampler: vk::Sampler::null(),
        image_view: image_view(view),
        image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    }
}
