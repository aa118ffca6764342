use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use deimos::prelude::*;

mod framework;

fn make_context(device: &framework::MockDevice, frames: usize) -> Result<RendererContext<framework::MockDevice>> {
    let settings = ContextBuilder::new()
        .frames_in_flight(frames)
        .worker_threads(2)
        .descriptor_pool_capacity(8)
        .build();
    RendererContext::new(device.clone(), &settings)
}

fn uniform_layout(ctx: &RendererContext<framework::MockDevice>) -> Result<vk::DescriptorSetLayout> {
    ctx.layouts().get_or_create(&[BindingDescription::new(
        0,
        vk::DescriptorType::UNIFORM_BUFFER,
        1,
        vk::ShaderStageFlags::VERTEX,
    )])
}

#[test]
pub fn settings_defaults() {
    let settings = ContextSettings::default();
    assert_eq!(settings.frames_in_flight, DEFAULT_FRAMES_IN_FLIGHT);
    assert!(settings.worker_threads >= 1);
    assert_eq!(settings.descriptor_pool_capacity, DEFAULT_POOL_CAPACITY);

    let settings = ContextBuilder::new().frames_in_flight(3).build();
    assert_eq!(settings.deferred_delete_frames, 4);
    let settings = ContextBuilder::new().frames_in_flight(0).deferred_delete_frames(7).build();
    assert_eq!(settings.frames_in_flight, 1);
    assert_eq!(settings.deferred_delete_frames, 7);
}

#[test]
pub fn frames_cycle() -> Result<()> {
    let device = framework::make_device();
    let mut ctx = make_context(&device, 3)?;
    assert_eq!(ctx.frames_in_flight(), 3);
    assert_eq!(ctx.current_frame(), 0);
    let mut seen = vec![];
    for _ in 0..6 {
        ctx.next_frame()?;
        seen.push(ctx.current_frame());
    }
    assert_eq!(seen, vec![1, 2, 0, 1, 2, 0]);
    Ok(())
}

#[test]
pub fn next_frame_resets_only_that_frame() -> Result<()> {
    let device = framework::make_device();
    let mut ctx = make_context(&device, 2)?;
    let layout = uniform_layout(&ctx)?;

    ctx.frame_allocator()?.allocate(layout)?;
    ctx.next_frame()?;
    ctx.frame_allocator()?.allocate(layout)?;

    // Frame 0 still has its allocations while frame 1 is recorded
    assert_eq!(ctx.descriptor_allocator(0)?.used_pool_count(), 1);
    assert_eq!(ctx.descriptor_allocator(1)?.used_pool_count(), 1);

    ctx.next_frame()?;
    assert_eq!(ctx.current_frame(), 0);
    assert_eq!(ctx.descriptor_allocator(0)?.used_pool_count(), 0);
    assert_eq!(ctx.descriptor_allocator(0)?.free_pool_count(), 1);
    assert_eq!(ctx.descriptor_allocator(1)?.used_pool_count(), 1);
    Ok(())
}

#[test]
pub fn invalid_frame_index() -> Result<()> {
    let device = framework::make_device();
    let ctx = make_context(&device, 2)?;
    let err = ctx.descriptor_allocator(2).expect_err("frame 2 does not exist");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidFrameIndex(2, 2))));
    Ok(())
}

#[test]
pub fn next_frame_ticks_framebuffer_deletion() -> Result<()> {
    let device = framework::make_device();
    let mut ctx = make_context(&device, 2)?;
    let pass = RenderPassInfo::new(framework::render_pass(1));
    let view = framework::image_view(5);
    let framebuffer = ctx.framebuffers().create_framebuffer(
        &pass,
        &[AttachmentIdentity::new(view, 64, 64, vk::Format::R8G8B8A8_UNORM)],
        false,
        false,
    )?;
    ctx.framebuffers().delete_related(view)?;

    // Kept alive for frames_in_flight + 1 frames
    for _ in 0..2 {
        ctx.next_frame()?;
        assert!(device.is_framebuffer_alive(framebuffer));
    }
    ctx.next_frame()?;
    assert!(!device.is_framebuffer_alive(framebuffer));
    Ok(())
}

#[test]
pub fn failed_reset_still_ticks_framebuffer_deletion() -> Result<()> {
    let device = framework::make_device();
    let mut ctx = make_context(&device, 2)?;
    let layout = uniform_layout(&ctx)?;
    let view = framework::image_view(5);
    let framebuffer = ctx.framebuffers().create_framebuffer(
        &RenderPassInfo::new(framework::render_pass(1)),
        &[AttachmentIdentity::new(view, 64, 64, vk::Format::R8G8B8A8_UNORM)],
        false,
        false,
    )?;
    ctx.framebuffers().delete_related(view)?;

    ctx.frame_allocator()?.allocate(layout)?;
    ctx.next_frame()?;
    ctx.frame_allocator()?.allocate(layout)?;

    device.fail_next_reset(vk::Result::ERROR_DEVICE_LOST);
    let err = ctx.next_frame().expect_err("pool reset should fail");
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::VkError(vk::Result::ERROR_DEVICE_LOST))
    ));
    assert_eq!(ctx.current_frame(), 0);
    assert_eq!(ctx.descriptor_allocator(0)?.used_pool_count(), 0);
    assert_eq!(ctx.descriptor_allocator(0)?.free_pool_count(), 1);
    assert_eq!(ctx.framebuffers().pending_deletions()?, 1);
    assert!(device.is_framebuffer_alive(framebuffer));

    // Third tick, the failed call above counted as the second one
    ctx.next_frame()?;
    assert!(!device.is_framebuffer_alive(framebuffer));
    assert_eq!(ctx.framebuffers().pending_deletions()?, 0);
    Ok(())
}

#[test]
pub fn parallel_recording_through_context() -> Result<()> {
    let device = framework::make_device();
    let ctx = make_context(&device, 2)?;
    let layouts = ctx.layouts().clone();
    let created = Arc::new(AtomicU32::new(0));

    let tasks = (0..8)
        .map(|i| {
            let layouts = layouts.clone();
            let created = created.clone();
            Task::new(move || {
                let binding = BindingDescription::new(
                    i % 2,
                    vk::DescriptorType::UNIFORM_BUFFER,
                    1,
                    vk::ShaderStageFlags::VERTEX,
                );
                if layouts.get_or_create(&[binding]).is_ok() {
                    created.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect::<Vec<_>>();
    ctx.scheduler().add_task_list_and_wait(tasks)?;

    assert_eq!(created.load(Ordering::SeqCst), 8);
    assert_eq!(layouts.len()?, 2);
    Ok(())
}

#[test]
pub fn shutdown_releases_everything() -> Result<()> {
    let device = framework::make_device();
    let ctx = make_context(&device, 2)?;
    uniform_layout(&ctx)?;
    let layout = uniform_layout(&ctx)?;
    ctx.frame_allocator()?.allocate(layout)?;
    ctx.framebuffers().create_framebuffer(
        &RenderPassInfo::new(framework::render_pass(1)),
        &[AttachmentIdentity::new(framework::image_view(1), 64, 64, vk::Format::R8G8B8A8_UNORM)],
        false,
        false,
    )?;
    ctx.shutdown();

    assert_eq!(device.layouts_destroyed(), device.layouts_created());
    assert_eq!(device.pools_destroyed(), device.pools_created());
    assert_eq!(device.framebuffers_destroyed(), device.framebuffers_created());
    Ok(())
}
