use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::backend::WgpuBackend;
use crate::device::{Gpu, GpuInit};
use crate::input::platform::translate_window_event;
use crate::pipeline::{FrameOrchestrator, FrameOutcome};
use crate::time::FrameClock;

/// Window options for [`Runtime::run`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    /// Initial inner size in physical pixels.
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
    /// End the run after this many presented frames.
    pub max_frames: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "tandem".to_string(),
            width: 800,
            height: 600,
            resizable: true,
            max_frames: None,
        }
    }
}

/// Entry point for the windowed runtime.
///
/// A thin adapter: it owns the winit event loop and window, forwards input to
/// the orchestrator and calls `on_frame` once per redraw.
pub struct Runtime;

impl Runtime {
    pub fn run(
        config: RuntimeConfig,
        gpu_init: GpuInit,
        orchestrator: FrameOrchestrator<WgpuBackend>,
    ) -> Result<()> {
        let mut state = AppState::new(config, gpu_init, orchestrator);
        EventLoop::new()
            .context("cannot open the platform event loop")?
            .run_app(&mut state)
            .context("event loop stopped with an error")?;

        state.shutdown();
        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct Session {
    window: Arc<Window>,
    backend: WgpuBackend,
    clock: FrameClock,
}

struct AppState {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    orchestrator: FrameOrchestrator<WgpuBackend>,

    session: Option<Session>,
    failure: Option<anyhow::Error>,
    exit_requested: bool,
}

impl AppState {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, orchestrator: FrameOrchestrator<WgpuBackend>) -> Self {
        Self {
            config,
            gpu_init,
            orchestrator,
            session: None,
            failure: None,
            exit_requested: false,
        }
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        if self.failure.is_none() {
            self.failure = Some(err);
        }
        self.request_exit(event_loop);
    }

    fn shutdown(&mut self) {
        if let Some(session) = self.session.as_mut() {
            self.orchestrator.on_shutdown(&mut session.backend);
        }
    }

    fn start_session(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_resizable(self.config.resizable);

        let window = Arc::new(event_loop.create_window(attrs).context("failed to create window")?);
        let gpu = pollster::block_on(Gpu::connect(window.clone(), &self.gpu_init))
            .context("GPU initialization failed")?;

        let session = self.session.insert(Session {
            window: window.clone(),
            backend: WgpuBackend::new(window, gpu),
            clock: FrameClock::new(),
        });

        self.orchestrator.on_init(&mut session.backend)?;
        session.clock.reset();
        session.window.request_redraw();
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(session) = self.session.as_mut() else { return };

        let ft = session.clock.tick();
        match self.orchestrator.on_frame(&mut session.backend, ft.dt) {
            FrameOutcome::Presented => {
                let done = self
                    .config
                    .max_frames
                    .is_some_and(|max| self.orchestrator.frames_presented() >= max);
                if done {
                    log::info!("frame limit reached");
                    self.request_exit(event_loop);
                }
            }
            FrameOutcome::Skipped | FrameOutcome::Inactive => {}
            FrameOutcome::Fatal => {
                self.fail(event_loop, anyhow!("the surface became unusable"));
            }
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_none() {
            if let Err(e) = self.start_session(event_loop) {
                self.fail(event_loop, e);
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            return event_loop.exit();
        }
        // Every redraw advances the simulation, so keep them coming.
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(session) = &self.session {
            session.window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if self.exit_requested {
            return event_loop.exit();
        }

        let cursor = self.orchestrator.pointer().cursor();
        if let Some(input) = translate_window_event(cursor, &event) {
            self.orchestrator.on_event(&input);
        }

        match event {
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::CloseRequested => self.request_exit(event_loop),
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(session) = self.session.as_mut() {
                    let size = session.window.inner_size();
                    session.backend.resize(size);
                    session.window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}
