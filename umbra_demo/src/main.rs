//! Umbra demo - deferred shading with shadow-casting spot lights
//!
//! Controls:
//! - F1: toggle the G-buffer debug display
//! - F2: toggle SSAO
//! - L: attach light 0 to the camera
//! - P: pause light updates
//! - WASD: move, left mouse drag: look around
//!
//! Run: cargo run -p umbra_demo --release [asset_dir]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use umbra_engine::umbra::{DeferredRenderer, Error, RendererConfig, Result};
use umbra_engine::umbra::render::ImageTextureLoader;
use umbra_engine::umbra::scene::{CameraMovement, ObjImporter};
use umbra_engine::{engine_error, engine_info, engine_warn};
use umbra_engine_renderer_vulkan::umbra::VulkanDevice;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

struct App {
    config: RendererConfig,
    // Renderer before window: GPU objects go before the surface they present to
    renderer: Option<DeferredRenderer>,
    window: Option<Window>,
    movement: CameraMovement,
    dragging: bool,
    last_cursor: Option<PhysicalPosition<f64>>,
    last_frame: Instant,
}

impl App {
    fn new(config: RendererConfig) -> Self {
        Self {
            config,
            renderer: None,
            window: None,
            movement: CameraMovement::default(),
            dragging: false,
            last_cursor: None,
            last_frame: Instant::now(),
        }
    }

    fn create_renderer(&self, window: &Window) -> Result<DeferredRenderer> {
        let size = window.inner_size();
        let device = VulkanDevice::new(window, &self.config)?;
        let swapchain = device.create_swapchain(window, size.width, size.height, self.config.vsync)?;

        let mut renderer = DeferredRenderer::new(
            Arc::new(device),
            Box::new(swapchain),
            self.config.clone(),
            Box::new(ImageTextureLoader),
            Box::new(ObjImporter::new()),
        )?;
        renderer.prepare()?;
        Ok(renderer)
    }

    fn handle_key(&mut self, event: &KeyEvent) -> Result<()> {
        let PhysicalKey::Code(code) = event.physical_key else {
            return Ok(());
        };
        let pressed = event.state == ElementState::Pressed;

        match code {
            KeyCode::KeyW => self.movement.forward = pressed,
            KeyCode::KeyS => self.movement.backward = pressed,
            KeyCode::KeyA => self.movement.left = pressed,
            KeyCode::KeyD => self.movement.right = pressed,
            _ => {}
        }

        if !pressed || event.repeat {
            return Ok(());
        }
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        match code {
            KeyCode::F1 => {
                renderer.toggle_debug_display()?;
                self.update_title();
            }
            KeyCode::F2 => renderer.toggle_ssao()?,
            KeyCode::KeyL => renderer.toggle_attach_light(),
            KeyCode::KeyP => renderer.toggle_pause(),
            _ => {}
        }
        Ok(())
    }

    /// No text overlay: the debug quadrant captions go to the title bar
    fn update_title(&self) {
        let (Some(window), Some(renderer)) = (self.window.as_ref(), self.renderer.as_ref()) else {
            return;
        };
        let labels = renderer.overlay_labels();
        if labels.is_empty() {
            window.set_title(&self.config.app_name);
        } else {
            let captions: Vec<&str> = labels.iter().map(|label| label.text).collect();
            window.set_title(&format!("{} - {}", self.config.app_name, captions.join(" | ")));
        }
    }

    fn redraw(&mut self) -> Result<()> {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let (Some(window), Some(renderer)) = (self.window.as_ref(), self.renderer.as_mut()) else {
            return Ok(());
        };
        renderer.update_camera(delta, self.movement)?;

        match renderer.render_frame() {
            // Swapchain went stale between frames: skip this one and rebuild
            Err(Error::NotReady(reason)) => {
                engine_warn!("umbra::demo", "Skipping frame: {}", reason);
                let size = window.inner_size();
                renderer.resize(size.width, size.height)
            }
            result => result,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Error) {
        engine_error!("umbra::demo", "{}", error);
        self.renderer = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(self.config.app_name.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => window,
            Err(e) => {
                self.fail(event_loop, Error::InitializationFailed(format!("Failed to create window: {}", e)));
                return;
            }
        };

        match self.create_renderer(&window) {
            Ok(renderer) => {
                engine_info!("umbra::demo", "Renderer ready");
                self.renderer = Some(renderer);
                self.window = Some(window);
                self.last_frame = Instant::now();
                self.update_title();
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let result = match event {
            WindowEvent::CloseRequested => {
                self.renderer = None;
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(size) => match self.renderer.as_mut() {
                Some(renderer) => renderer.resize(size.width, size.height),
                None => Ok(()),
            },
            WindowEvent::KeyboardInput { event, .. } => {
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    self.renderer = None;
                    event_loop.exit();
                    Ok(())
                } else {
                    self.handle_key(&event)
                }
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.dragging = state == ElementState::Pressed;
                Ok(())
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.last_cursor.replace(position);
                match (self.dragging, previous, self.renderer.as_mut()) {
                    (true, Some(previous), Some(renderer)) => renderer.rotate_camera(
                        (position.x - previous.x) as f32,
                        (position.y - previous.y) as f32,
                    ),
                    _ => Ok(()),
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => Ok(()),
        };

        if let Err(e) = result {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

fn main() {
    let mut config = RendererConfig {
        width: 1280,
        height: 720,
        ..RendererConfig::default()
    };
    if let Some(asset_dir) = std::env::args().nth(1) {
        config.asset_dir = PathBuf::from(&asset_dir);
        config.shader_dir = config.asset_dir.join("shaders");
    }

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            engine_error!("umbra::demo", "Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    if let Err(e) = event_loop.run_app(&mut app) {
        engine_error!("umbra::demo", "Event loop error: {}", e);
        std::process::exit(1);
    }
}
