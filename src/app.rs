//! Viewer application and session lifecycle
//!
//! `ViewerApp` owns the event loop; `ViewerSession` owns everything else
//! for the session lifetime: probed capabilities, window, render engine,
//! scene, overlay, and the one asset load. The startup sequence is gated
//! by the session state machine: probe → initialize → ready → load.

use std::path::PathBuf;
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes},
};

use crate::{
    assets::{
        loader::{instantiate, AssetLoader, DecodedAsset, LoadEvent},
        normalize::normalize_objects,
    },
    error::ViewerError,
    gfx::{
        camera::{camera_controller::CameraController, camera_utils::CameraManager},
        environment::{CubemapData, ENVIRONMENT_MAP_SIZE},
        render_engine::RenderEngine,
        scene::Scene,
        OrbitCamera,
    },
    probe::probe,
    session::{SessionPhase, SessionState},
    ui::{StatusOverlay, UiManager},
};

/// Well-known location of the viewed model, relative to the working directory
pub const DEFAULT_MODEL_PATH: &str = "assets/model.glb";

pub struct ViewerApp {
    event_loop: Option<EventLoop<()>>,
    session: ViewerSession,
}

/// All per-session state, owned for the process lifetime
pub struct ViewerSession {
    model_path: PathBuf,
    state: SessionState,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    ui_manager: Option<UiManager>,
    overlay: StatusOverlay,
    scene: Scene,
    loader: Option<AssetLoader>,
}

impl ViewerApp {
    /// Creates a viewer for the model at `model_path`
    pub fn new(model_path: impl Into<PathBuf>) -> Result<Self, ViewerError> {
        let event_loop =
            EventLoop::new().map_err(|e| ViewerError::Initialization(e.to_string()))?;

        Ok(Self {
            event_loop: Some(event_loop),
            session: ViewerSession::new(model_path.into()),
        })
    }

    /// Run the viewer (consumes self and starts the event loop)
    pub fn run(mut self) -> Result<(), ViewerError> {
        let event_loop = self.event_loop.take().expect("Event loop already consumed");
        event_loop.set_control_flow(ControlFlow::Poll);

        event_loop
            .run_app(&mut self.session)
            .map_err(|e| ViewerError::Initialization(e.to_string()))
    }
}

impl ViewerSession {
    fn new(model_path: PathBuf) -> Self {
        let camera = OrbitCamera::new(1.0);
        let controller = CameraController::new(0.005, 0.1);
        let scene = Scene::new(CameraManager::new(camera, controller));

        Self {
            model_path,
            state: SessionState::new(),
            window: None,
            render_engine: None,
            ui_manager: None,
            overlay: StatusOverlay::new(),
            scene,
            loader: None,
        }
    }

    /// Routes a failure to the reporter and the state machine
    fn fail(&mut self, error: &ViewerError) {
        self.overlay.report(&error.to_string());
        if error.is_fatal() {
            self.state.advance(SessionPhase::Failed);
        }
    }

    /// Resize reactor: surface size, camera aspect, overlay display size
    fn handle_resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Some(engine) = self.render_engine.as_mut() {
            engine.resize(width, height);
        }
        self.scene
            .camera_manager
            .camera
            .resize_projection(width, height);
        if let Some(ui_manager) = self.ui_manager.as_mut() {
            ui_manager.update_display_size(width, height);
        }
    }

    /// Applies one loader event on the event-loop thread
    fn handle_load_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Progress(fraction) => {
                log::debug!("asset load {:.0}%", fraction * 100.0);
                self.overlay.set_progress(fraction);
            }
            LoadEvent::Loaded(asset) => {
                self.loader = None;
                self.overlay.clear_progress();
                self.install_asset(*asset);
            }
            LoadEvent::Failed(message) => {
                self.loader = None;
                self.overlay.clear_progress();
                // Non-fatal: the lit scene keeps rendering without the asset.
                self.fail(&ViewerError::AssetLoad(message));
                self.state.advance(SessionPhase::Ready);
            }
        }
    }

    /// Normalizes and attaches a decoded asset, all within this turn
    ///
    /// By the time this returns the scene holds the complete, normalized
    /// asset; no frame can observe a partial attachment.
    fn install_asset(&mut self, asset: DecodedAsset) {
        let name = asset.name.clone();
        let (mut objects, materials) = instantiate(asset);

        match normalize_objects(&mut objects) {
            Some(report) => log::info!(
                "normalized '{}': offset ({:.2}, {:.2}, {:.2}), scale {:.3}",
                name,
                report.offset.x,
                report.offset.y,
                report.offset.z,
                report.scale
            ),
            None => log::warn!("asset '{}' contains no geometry to normalize", name),
        }

        self.scene.attach_objects(objects, materials);

        if let Some(engine) = self.render_engine.as_ref() {
            let device = engine.device_arc();
            let queue = engine.queue_arc();
            self.scene.init_gpu_resources(&device, &queue);
        }

        if let Some(window) = &self.window {
            window.set_title(&format!("plinth - {}", name));
        }

        self.state.advance(SessionPhase::AssetReady);
        log::info!("asset '{}' attached", name);
    }

    /// One frame: drain loader events, advance damping, draw
    fn frame(&mut self) {
        let events = match self.loader.as_mut() {
            Some(loader) => loader.poll(),
            None => Vec::new(),
        };
        for event in events {
            self.handle_load_event(event);
        }

        if !self.state.can_render() {
            return;
        }

        // Exactly one damping step per frame, interacting or not.
        self.scene.update();

        let Some(engine) = self.render_engine.as_mut() else {
            return;
        };
        engine.update(
            self.scene.camera_manager.camera.uniform,
            &self.scene.lighting,
        );

        let device = engine.device_arc();
        let queue = engine.queue_arc();
        self.scene
            .material_manager
            .update_all_gpu_resources(&device, &queue);

        let Some(window) = self.window.clone() else {
            return;
        };

        if let Some(ui_manager) = self.ui_manager.as_mut() {
            let overlay = &self.overlay;
            engine.render_frame(
                &self.scene,
                Some(
                    |device: &wgpu::Device,
                     queue: &wgpu::Queue,
                     encoder: &mut wgpu::CommandEncoder,
                     view: &wgpu::TextureView| {
                        ui_manager.draw(device, queue, encoder, &window, view, |ui| {
                            overlay.draw(ui)
                        });
                    },
                ),
            );
        } else {
            engine.render_frame(
                &self.scene,
                None::<
                    fn(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
                >,
            );
        }
    }
}

impl ApplicationHandler for ViewerSession {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        // Capability probe gates all further initialization.
        self.state.advance(SessionPhase::Probing);
        let capabilities = match probe() {
            Ok(capabilities) => capabilities,
            Err(error) => {
                self.fail(&error);
                event_loop.exit();
                return;
            }
        };
        self.scene
            .material_manager
            .set_anisotropy(capabilities.max_sampler_anisotropy);

        self.state.advance(SessionPhase::Initializing);

        let window = match event_loop.create_window(
            WindowAttributes::default()
                .with_title("plinth")
                .with_inner_size(winit::dpi::LogicalSize::new(1280, 800)),
        ) {
            Ok(window) => Arc::new(window),
            Err(error) => {
                self.fail(&ViewerError::Initialization(error.to_string()));
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        let (width, height) = window.inner_size().into();
        self.scene
            .camera_manager
            .camera
            .resize_projection(width, height);

        // Environment map is generated once, before the engine consumes it.
        let environment = CubemapData::room_preset(ENVIRONMENT_MAP_SIZE);

        let window_clone = window.clone();
        let engine = match pollster::block_on(async move {
            RenderEngine::new(window_clone, width, height, &capabilities, &environment).await
        }) {
            Ok(engine) => engine,
            Err(error) => {
                self.fail(&error);
                event_loop.exit();
                return;
            }
        };

        // Default material and fallback textures
        {
            let device = engine.device_arc();
            let queue = engine.queue_arc();
            self.scene.init_gpu_resources(&device, &queue);
        }

        let mut ui_manager = UiManager::new(
            engine.device(),
            engine.queue(),
            engine.surface_format(),
            &window,
        );
        ui_manager.update_display_size(width, height);

        self.ui_manager = Some(ui_manager);
        self.render_engine = Some(engine);
        self.state.advance(SessionPhase::Ready);

        // The one asset load of the session, off the event-loop thread.
        self.state.advance(SessionPhase::LoadingAsset);
        log::info!("loading model from {}", self.model_path.display());
        self.loader = Some(AssetLoader::spawn(self.model_path.clone()));
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };

        // Overlay input first
        if let Some(ui_manager) = self.ui_manager.as_mut() {
            let ui_event: winit::event::Event<()> = winit::event::Event::WindowEvent {
                window_id,
                event: event.clone(),
            };
            if ui_manager.handle_input(&window, &ui_event) {
                window.request_redraw();
                return;
            }
        }

        match event {
            WindowEvent::KeyboardInput {
                event: key_event, ..
            } => {
                if matches!(
                    key_event.physical_key,
                    winit::keyboard::PhysicalKey::Code(winit::keyboard::KeyCode::Escape)
                ) {
                    event_loop.exit();
                    return;
                }
                self.scene.camera_manager.process_keyboard_event(&key_event);
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.handle_resize(width, height);
            }
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                self.frame();
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: winit::event::DeviceEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };

        // Don't orbit the camera while the overlay has the pointer.
        if let Some(ui_manager) = self.ui_manager.as_ref() {
            let io = ui_manager.context.io();
            if io.want_capture_mouse || io.want_capture_keyboard {
                return;
            }
        }

        self.scene.camera_manager.process_event(&event, window);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // Continuous redraw; winit coalesces, so this never double-schedules.
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::loader::{DecodedAsset, DecodedPrimitive};
    use crate::assets::normalize::world_aabb;
    use cgmath::{InnerSpace, Matrix4, SquareMatrix};

    fn session_in_phase(phase_chain: &[SessionPhase]) -> ViewerSession {
        let mut session = ViewerSession::new(PathBuf::from("assets/model.glb"));
        for &phase in phase_chain {
            assert!(session.state.advance(phase));
        }
        session
    }

    fn loading_session() -> ViewerSession {
        session_in_phase(&[
            SessionPhase::Probing,
            SessionPhase::Initializing,
            SessionPhase::Ready,
            SessionPhase::LoadingAsset,
        ])
    }

    fn triangle_asset() -> DecodedAsset {
        DecodedAsset {
            name: "synthetic".to_string(),
            primitives: vec![DecodedPrimitive {
                name: "tri".to_string(),
                positions: vec![8.0, 4.0, -6.0, 12.0, 6.0, -6.0, 8.0, 6.0, 2.0],
                normals: vec![],
                uvs: vec![],
                indices: vec![0, 1, 2],
                material_index: None,
                transform: Matrix4::identity(),
            }],
            materials: vec![],
        }
    }

    #[test]
    fn fatal_failure_reports_once_and_blocks_rendering() {
        let mut session = session_in_phase(&[SessionPhase::Probing]);

        session.fail(&ViewerError::CapabilityUnavailable(
            "no adapter".to_string(),
        ));

        assert_eq!(session.state.phase(), SessionPhase::Failed);
        let message = session.overlay.message().unwrap();
        assert!(message.contains("no compatible graphics adapter"));
        assert!(!session.state.can_render());
        // A stray frame request is a no-op, not a panic.
        session.frame();
    }

    #[test]
    fn load_failure_keeps_the_scene_and_the_loop() {
        let mut session = loading_session();
        let objects_before = session.scene.object_count();

        session.handle_load_event(LoadEvent::Failed("decode error".to_string()));

        assert_eq!(session.scene.object_count(), objects_before);
        assert!(session.overlay.message().unwrap().contains("decode error"));
        assert_eq!(session.state.phase(), SessionPhase::Ready);
        assert!(session.state.can_render());
        session.frame();
    }

    #[test]
    fn loaded_asset_is_normalized_before_attachment() {
        let mut session = loading_session();

        session.handle_load_event(LoadEvent::Loaded(Box::new(triangle_asset())));

        assert_eq!(session.state.phase(), SessionPhase::AssetReady);
        assert_eq!(session.scene.object_count(), 1);
        // The scene never holds the un-normalized asset.
        let aabb = world_aabb(&session.scene.objects).unwrap();
        assert!(aabb.center().magnitude() < 1e-4);
        assert!((aabb.max_extent() - 3.0).abs() < 1e-4);
    }

    #[test]
    fn progress_events_update_the_overlay_only() {
        let mut session = loading_session();

        session.handle_load_event(LoadEvent::Progress(0.42));

        assert_eq!(session.overlay.progress(), Some(0.42));
        assert_eq!(session.state.phase(), SessionPhase::LoadingAsset);
        assert_eq!(session.scene.object_count(), 0);
    }

    #[test]
    fn resize_before_gpu_init_still_updates_the_camera() {
        let mut session = session_in_phase(&[]);
        session.handle_resize(1600, 900);
        let aspect = session.scene.camera_manager.camera.aspect;
        assert!((aspect - 1600.0 / 900.0).abs() < 1e-6);

        // Idempotent under repetition.
        session.handle_resize(1600, 900);
        assert!((session.scene.camera_manager.camera.aspect - aspect).abs() < 1e-6);

        // Zero-sized events are ignored.
        session.handle_resize(0, 900);
        assert!((session.scene.camera_manager.camera.aspect - aspect).abs() < 1e-6);
    }
}
