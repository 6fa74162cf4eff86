use std::ffi::CStr;
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context as _};
use egui_glow::Painter;
use glow::HasContext;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextAttributesBuilder, PossiblyCurrentContext};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, WindowSurface};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::{Window, WindowId};

use egui_winit::State as EguiState;

use animlab::{
    chat::ChatWidget,
    config::Config,
    editor::{CodeEditor, Editor},
    exercises,
    frame::RenderLoop,
    gui::{self, Gui, GuiAction},
    loader::AssetLoader,
    renderer::GlowRenderer,
    script::ScriptExecutor,
    session::{ExerciseSession, SessionState},
    viewport::Viewport,
};

/// Everything that only exists while the window is up. Fields drop in
/// order, so GL resources go before the context and window.
struct Graphics {
    renderer: GlowRenderer,
    egui_painter: Painter,
    egui_state: EguiState,
    egui_context: egui::Context,

    gl: Arc<glow::Context>,
    context: PossiblyCurrentContext,
    surface: Surface<WindowSurface>,
    window: Window,
}

struct App {
    config: Config,
    graphics: Option<Graphics>,

    session: ExerciseSession<CodeEditor>,
    gui: Gui,
    chat: ChatWidget,
    loader: AssetLoader,
    render_loop: RenderLoop,
}

impl App {
    fn new(config: Config) -> anyhow::Result<Self> {
        let state = SessionState::new(config.baseline.clone(), 1280, 800);
        let mut session = ExerciseSession::new(
            state,
            CodeEditor::new(),
            Box::new(ScriptExecutor::new()),
            exercises::CATALOG,
        );
        session.select_exercise(config.exercise);

        let loader = AssetLoader::new();
        loader
            .request_model(&config.baseline.asset_path)
            .context("Failed to queue the model load")?;

        Ok(Self {
            gui: Gui::new(config.baseline.name),
            config,
            graphics: None,
            session,
            chat: ChatWidget::new(),
            loader,
            render_loop: RenderLoop::new(),
        })
    }

    fn poll_background(&mut self) {
        for (path, result) in self.loader.poll_loaded() {
            match result {
                Ok(model) => {
                    if let Some(graphics) = self.graphics.as_mut() {
                        if let Err(e) = graphics.renderer.upload_model(&model) {
                            log::error!("Could not upload {}: {}", path.display(), e);
                        }
                    }
                    self.session.on_model_loaded(&model);
                }
                Err(e) => self.session.on_load_failed(&e),
            }
        }

        self.chat.poll(&mut self.session.transcript);
    }

    fn redraw(&mut self) -> anyhow::Result<()> {
        self.poll_background();

        let Some(graphics) = self.graphics.as_mut() else {
            return Ok(());
        };
        let window = &graphics.window;
        let physical_size = window.inner_size();

        // Run the UI code
        let raw_input = graphics.egui_state.take_egui_input(window);
        let (full_output, actions) = self.gui.update(
            raw_input,
            &graphics.egui_context,
            physical_size.height,
            &mut self.session,
            self.render_loop.fps(),
        );
        graphics
            .egui_state
            .handle_platform_output(window, full_output.platform_output);

        for action in actions {
            apply_action(
                action,
                &mut self.session,
                &self.chat,
                &mut self.gui,
                &self.config.snippet_dir,
            );
        }

        if let Some(viewport) = self.gui.viewport() {
            if viewport != graphics.renderer.viewport() {
                graphics.renderer.set_viewport(viewport);
                let (width, height) = viewport.size();
                self.session.state.resize(width, height);
            }
        }

        unsafe {
            graphics.gl.clear_color(0.0, 0.0, 0.0, 1.0);
            graphics
                .gl
                .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }

        self.render_loop
            .tick(&mut self.session.state, &mut graphics.renderer);

        // Paint the egui UI over the scene
        let clipped_primitives = graphics
            .egui_context
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        graphics.egui_painter.paint_and_update_textures(
            [physical_size.width, physical_size.height],
            full_output.pixels_per_point,
            &clipped_primitives,
            &full_output.textures_delta,
        );

        graphics
            .surface
            .swap_buffers(&graphics.context)
            .context("Failed to swap buffers")?;

        window.request_redraw();
        Ok(())
    }
}

fn apply_action(
    action: GuiAction,
    session: &mut ExerciseSession<CodeEditor>,
    chat: &ChatWidget,
    gui: &mut Gui,
    snippet_dir: &Path,
) {
    match action {
        GuiAction::SelectExercise(index) => session.select_exercise(index),
        GuiAction::Run => {
            if let Err(e) = session.execute() {
                gui.show_error(e.to_string());
            }
        }
        GuiAction::RevealSolution => {
            session.reveal_solution();
        }
        GuiAction::SaveSnippet => {
            let path = gui::snippet_path(snippet_dir, session.state.selected_exercise);
            gui::save_snippet(path, session.editor.text());
        }
        GuiAction::SendChat(message) => chat.send(&mut session.transcript, &message),
    }
}

#[cfg(target_os = "windows")]
fn display_preference(window: &Window) -> anyhow::Result<DisplayApiPreference> {
    Ok(DisplayApiPreference::Wgl(Some(window.window_handle()?.as_raw())))
}

#[cfg(target_os = "macos")]
fn display_preference(_window: &Window) -> anyhow::Result<DisplayApiPreference> {
    Ok(DisplayApiPreference::Cgl)
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn display_preference(_window: &Window) -> anyhow::Result<DisplayApiPreference> {
    Ok(DisplayApiPreference::Egl)
}

fn create_graphics(event_loop: &ActiveEventLoop, config: &Config) -> anyhow::Result<Graphics> {
    let window = event_loop
        .create_window(
            Window::default_attributes()
                .with_title(format!("Animation Lab ({})", config.baseline.name))
                .with_inner_size(LogicalSize::new(1280.0, 800.0)),
        )
        .context("Failed to create window")?;

    // Get platform-specific handles to the display and window
    let raw_display = window.display_handle()?.as_raw();
    let raw_window = window.window_handle()?.as_raw();

    let display = unsafe { Display::new(raw_display, display_preference(&window)?) }
        .context("Failed to create GL display")?;

    let template = ConfigTemplateBuilder::new()
        .with_depth_size(24)
        .compatible_with_native_window(raw_window)
        .build();
    let gl_config = unsafe { display.find_configs(template) }
        .context("Failed to query GL configs")?
        .next()
        .ok_or_else(|| anyhow!("No GL config matches the window"))?;

    let physical_size = window.inner_size();
    let width = NonZeroU32::new(physical_size.width.max(1)).unwrap_or(NonZeroU32::MIN);
    let height = NonZeroU32::new(physical_size.height.max(1)).unwrap_or(NonZeroU32::MIN);

    let surface_attributes =
        SurfaceAttributesBuilder::<WindowSurface>::new().build(raw_window, width, height);
    let context_attributes = ContextAttributesBuilder::new().build(Some(raw_window));

    let surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes) }
        .context("Failed to create window surface")?;
    let context = unsafe { display.create_context(&gl_config, &context_attributes) }
        .context("Failed to create GL context")?
        .make_current(&surface)
        .context("Failed to make the GL context current")?;

    let gl = unsafe {
        Arc::new(glow::Context::from_loader_function_cstr(|name: &CStr| {
            display.get_proc_address(name) as *const _
        }))
    };

    let viewport = Viewport::full(physical_size.width, physical_size.height);
    let renderer = GlowRenderer::new(gl.clone(), viewport).context("Failed to set up renderer")?;

    let egui_context = egui::Context::default();
    let egui_painter = Painter::new(gl.clone(), "", None, false)
        .map_err(|e| anyhow!("Failed to create egui painter: {}", e))?;
    let egui_state = EguiState::new(
        egui_context.clone(),
        egui_context.viewport_id(),
        &window,
        Some(window.scale_factor() as f32),
        None,
        None,
    );

    log::info!(
        "Window ready ({}x{})",
        physical_size.width,
        physical_size.height
    );

    Ok(Graphics {
        window,
        surface,
        context,
        gl,
        renderer,
        egui_context,
        egui_painter,
        egui_state,
    })
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.graphics.is_some() {
            return;
        }

        match create_graphics(event_loop, &self.config) {
            Ok(graphics) => {
                graphics.window.request_redraw();
                self.graphics = Some(graphics);
            }
            Err(e) => {
                log::error!("Could not start graphics: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(graphics) = self.graphics.as_mut() else {
            return;
        };

        // give egui any winit events
        let response = graphics
            .egui_state
            .on_window_event(&graphics.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let (Some(width), Some(height)) =
                    (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
                {
                    graphics.surface.resize(&graphics.context, width, height);
                }
                self.session.state.resize(size.width, size.height);
                graphics.window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    log::error!("Frame failed: {:#}", e);
                    event_loop.exit();
                }
            }
            _ => {
                if response.repaint {
                    graphics.window.request_redraw();
                }
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut graphics) = self.graphics.take() {
            graphics.egui_painter.destroy();
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_args(std::env::args_os()).unwrap_or_else(|e| e.exit());
    log::info!(
        "Starting with {} ({})",
        config.baseline.name,
        config.baseline.asset_path.display()
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
