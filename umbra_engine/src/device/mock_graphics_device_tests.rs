/// Tests for MockGraphicsDevice
///
/// The mock is the foundation of every render-graph test, so its
/// bookkeeping is checked here.

use super::*;
use crate::device::BufferUsage;

// ============================================================================
// Tests: Object creation
// ============================================================================

#[test]
fn test_ids_are_unique() {
    let device = MockGraphicsDevice::new();
    let a = device.create_semaphore().unwrap();
    let b = device.create_semaphore().unwrap();
    assert_ne!(id_of(a.as_any()), id_of(b.as_any()));
    assert_eq!(device.log.lock().unwrap().created_count("semaphore"), 2);
}

#[test]
fn test_mapped_buffer_update() {
    let device = MockGraphicsDevice::new();
    let buffer = device.create_buffer(&BufferDesc::uniform(8)).unwrap();
    buffer.update(4, &[1, 2, 3, 4]).unwrap();
    let mock = buffer.as_any().downcast_ref::<MockBuffer>().unwrap();
    assert_eq!(*mock.data.lock().unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
}

#[test]
fn test_device_local_buffer_rejects_update() {
    let device = MockGraphicsDevice::new();
    let buffer = device.create_buffer(&BufferDesc::device_local(8, BufferUsage::Vertex)).unwrap();
    assert!(buffer.update(0, &[1]).is_err());
}

#[test]
fn test_buffer_update_out_of_bounds() {
    let device = MockGraphicsDevice::new();
    let buffer = device.create_buffer(&BufferDesc::staging(4)).unwrap();
    assert!(buffer.update(2, &[0; 4]).is_err());
}

#[test]
fn test_texture_size_checked() {
    let device = MockGraphicsDevice::new();
    let desc = TextureDesc { width: 1, height: 1, format: TextureFormat::R8G8B8A8_UNORM };
    assert!(device.create_texture(&desc, &[255; 4]).is_ok());
    assert!(device.create_texture(&desc, &[255; 3]).is_err());
}

#[test]
fn test_descriptor_pool_capacity() {
    let device = MockGraphicsDevice::new();
    let pool = device
        .create_descriptor_pool(&DescriptorPoolDesc { uniform_buffers: 1, combined_image_samplers: 0, max_sets: 1 })
        .unwrap();
    let layout = device
        .create_descriptor_set_layout(&DescriptorSetLayoutDesc { bindings: vec![] })
        .unwrap();
    assert!(device.allocate_descriptor_set(&pool, &layout).is_ok());
    assert_eq!(device.allocate_descriptor_set(&pool, &layout).err(), Some(Error::OutOfMemory));
}

// ============================================================================
// Tests: Command recording
// ============================================================================

#[test]
fn test_command_list_records_in_order() {
    let device = MockGraphicsDevice::new();
    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    cmd.set_viewport(Viewport::full(4, 2)).unwrap();
    cmd.draw_indexed(DrawIndexed::range(6, 3)).unwrap();
    cmd.end().unwrap();

    let mock = mock_commands(cmd.as_ref());
    assert_eq!(
        mock.commands,
        vec!["begin", "set_viewport(0, 0, 4, 2)", "draw_indexed(3, 1, 6, 0, 0)", "end"]
    );
}

#[test]
fn test_begin_resets_recording() {
    let device = MockGraphicsDevice::new();
    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    cmd.end_render_pass().unwrap();
    cmd.end().unwrap();
    cmd.begin().unwrap();
    cmd.end().unwrap();
    assert_eq!(mock_commands(cmd.as_ref()).commands, vec!["begin", "end"]);
}

#[test]
fn test_end_without_begin_fails() {
    let device = MockGraphicsDevice::new();
    let mut cmd = device.create_command_list().unwrap();
    assert!(cmd.end().is_err());
}

#[test]
fn test_copy_buffer_copies_contents() {
    let device = MockGraphicsDevice::new();
    let src = device.create_buffer(&BufferDesc::staging(4)).unwrap();
    let dst = device.create_buffer(&BufferDesc::device_local(4, BufferUsage::Index)).unwrap();
    src.update(0, &[9, 8, 7, 6]).unwrap();

    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    cmd.copy_buffer(&src, &dst, 4).unwrap();
    cmd.end().unwrap();

    let dst = dst.as_any().downcast_ref::<MockBuffer>().unwrap();
    assert_eq!(*dst.data.lock().unwrap(), vec![9, 8, 7, 6]);
}

// ============================================================================
// Tests: Submission log
// ============================================================================

#[test]
fn test_submission_records_semaphores() {
    let device = MockGraphicsDevice::new();
    let cmd = device.create_command_list().unwrap();
    let wait = device.create_semaphore().unwrap();
    let signal = device.create_semaphore().unwrap();

    device
        .submit(&Submission {
            command_list: cmd.as_ref(),
            wait: Some((wait.as_ref(), PipelineStages::COLOR_ATTACHMENT_OUTPUT)),
            signal: Some(signal.as_ref()),
        })
        .unwrap();

    let log = device.log.lock().unwrap();
    assert_eq!(
        log.submissions,
        vec![MockSubmission {
            command_list: id_of(cmd.as_any()),
            wait: Some(id_of(wait.as_any())),
            wait_stage: Some(PipelineStages::COLOR_ATTACHMENT_OUTPUT),
            signal: Some(id_of(signal.as_any())),
        }]
    );
}

#[test]
fn test_swapchain_shares_log() {
    let device = MockGraphicsDevice::new();
    let mut swapchain = device.create_swapchain(64, 32, 2);
    let semaphore = device.create_semaphore().unwrap();

    assert_eq!(swapchain.acquire_next_image(semaphore.as_ref()).unwrap(), (0, false));
    assert_eq!(swapchain.acquire_next_image(semaphore.as_ref()).unwrap(), (1, false));
    assert_eq!(swapchain.acquire_next_image(semaphore.as_ref()).unwrap(), (0, false));
    swapchain.present(0, semaphore.as_ref()).unwrap();

    let log = device.log.lock().unwrap();
    assert_eq!(log.acquires.len(), 3);
    assert_eq!(log.presents, vec![(0, id_of(semaphore.as_any()))]);
    assert_eq!(swapchain.extent(), (64, 32));
}
