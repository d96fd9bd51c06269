use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use panel::{FieldPanel, PanelCommand};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::canvas::CanvasSize;
use crate::gpu::RenderState;
use crate::intake::{ImageIntake, IntakeOutcome};
use crate::types::RendererConfig;

#[derive(Debug)]
pub(crate) enum ViewerEvent {
    Intake(IntakeOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyOutcome {
    Handled,
    Ignored,
    Exit,
}

/// Aggregates the render state, the field panel and image intake for the
/// single viewer window.
struct ViewerWindow {
    // Dropped before `window`; the surface borrows its handles.
    state: RenderState,
    intake: ImageIntake,
    panel: FieldPanel,
    window: Arc<Window>,
    title: String,
    shift: bool,
}

impl ViewerWindow {
    fn new(
        window: Arc<Window>,
        config: &RendererConfig,
        panel: FieldPanel,
        proxy: EventLoopProxy<ViewerEvent>,
    ) -> Result<Self> {
        let mut state = RenderState::new(window.as_ref(), window.inner_size(), config)?;
        state.set_uniforms(
            panel
                .seed_uniforms()
                .into_iter()
                .map(|update| (update.uniform, update.value)),
        );

        let intake = ImageIntake::spawn(move |outcome| {
            if proxy.send_event(ViewerEvent::Intake(outcome)).is_err() {
                debug!("event loop closed before image intake finished");
            }
        })?;

        let mut viewer = Self {
            state,
            intake,
            panel,
            window,
            title: config.title.clone(),
            shift: false,
        };
        let canvas = viewer.state.canvas();
        viewer.request_canvas(canvas);
        viewer.refresh_title();
        Ok(viewer)
    }

    fn refresh_title(&self) {
        self.window
            .set_title(&format!("{} | {}", self.title, self.panel.status_line()));
    }

    /// Asks the window to match the canvas. Sizes applied synchronously are
    /// forwarded straight to the renderer; otherwise a `Resized` follows.
    fn request_canvas(&mut self, canvas: CanvasSize) {
        let requested: PhysicalSize<u32> = canvas.into();
        if let Some(actual) = self.window.request_inner_size(requested) {
            if actual != requested {
                debug!(
                    requested_width = requested.width,
                    requested_height = requested.height,
                    actual_width = actual.width,
                    actual_height = actual.height,
                    "window manager adjusted canvas size"
                );
            }
            if CanvasSize::from(actual) != self.state.canvas() {
                self.state.resize_canvas(actual.into());
            }
        }
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        let canvas = CanvasSize::from(size);
        if canvas != self.state.canvas() {
            self.state.resize_canvas(canvas);
        }
        self.window.request_redraw();
    }

    fn handle_intake(&mut self, outcome: IntakeOutcome) {
        match outcome {
            IntakeOutcome::Decoded(image) => {
                let canvas = self.state.update_image(&image);
                info!(
                    path = %image.path.display(),
                    width = image.width(),
                    height = image.height(),
                    canvas_width = canvas.width,
                    canvas_height = canvas.height,
                    "image loaded"
                );
                self.request_canvas(canvas);
                self.window.request_redraw();
            }
            IntakeOutcome::Failed { path, error } => {
                warn!(path = %path.display(), %error, "failed to load image");
            }
        }
    }

    fn submit_image(&self, path: PathBuf) {
        info!(path = %path.display(), "queued image");
        self.intake.submit(path);
    }

    fn handle_key(&mut self, key: &Key) -> KeyOutcome {
        if matches!(key, Key::Named(NamedKey::F5)) {
            self.reload_shaders();
            return KeyOutcome::Handled;
        }
        let Some(command) = panel_command(key, self.shift) else {
            return KeyOutcome::Ignored;
        };
        if command == PanelCommand::Cancel && !self.panel.is_editing() {
            return KeyOutcome::Exit;
        }
        if let Some(update) = self.panel.apply(command) {
            debug!(uniform = %update.uniform, value = update.value, "field changed");
            self.state
                .set_uniforms([(update.uniform.as_str(), update.value)]);
        }
        self.refresh_title();
        self.window.request_redraw();
        KeyOutcome::Handled
    }

    fn reload_shaders(&mut self) {
        match self.state.reload_program() {
            Ok(()) => {
                self.state.set_uniforms(
                    self.panel
                        .fields()
                        .iter()
                        .map(|field| (field.uniform(), field.value())),
                );
                info!("shaders reloaded");
                self.window.request_redraw();
            }
            Err(err) => {
                error!(error = %err, "shader reload failed; keeping previous program");
            }
        }
    }

    fn redraw(&mut self) -> bool {
        match self.state.render_frame() {
            Ok(()) => true,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.state.recover_surface();
                self.window.request_redraw();
                true
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("surface out of memory; closing viewer");
                false
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; retrying next frame");
                self.window.request_redraw();
                true
            }
            Err(other) => {
                warn!(error = ?other, "surface error; retrying next frame");
                self.window.request_redraw();
                true
            }
        }
    }
}

/// Maps a pressed key to a panel command. F5 and window-level keys are
/// handled by the caller.
fn panel_command(key: &Key, shift: bool) -> Option<PanelCommand> {
    match key {
        Key::Named(named) => match named {
            NamedKey::Tab if shift => Some(PanelCommand::FocusPrevious),
            NamedKey::Tab | NamedKey::ArrowDown => Some(PanelCommand::FocusNext),
            NamedKey::ArrowUp => Some(PanelCommand::FocusPrevious),
            NamedKey::ArrowRight => Some(PanelCommand::Increment { coarse: shift }),
            NamedKey::ArrowLeft => Some(PanelCommand::Decrement { coarse: shift }),
            NamedKey::Enter => Some(PanelCommand::Commit),
            NamedKey::Backspace => Some(PanelCommand::Erase),
            NamedKey::Escape => Some(PanelCommand::Cancel),
            NamedKey::F1 => Some(PanelCommand::ToggleGroup(0)),
            NamedKey::F2 => Some(PanelCommand::ToggleGroup(1)),
            NamedKey::F3 => Some(PanelCommand::ToggleGroup(2)),
            NamedKey::F4 => Some(PanelCommand::ToggleGroup(3)),
            _ => None,
        },
        Key::Character(text) => {
            let mut chars = text.as_str().chars();
            let ch = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            match ch {
                'r' | 'R' => Some(PanelCommand::Reset),
                ch if ch.is_ascii_digit() || matches!(ch, '.' | '-' | '+' | 'e' | 'E') => {
                    Some(PanelCommand::Type(ch))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

pub(crate) fn run(config: RendererConfig, panel: FieldPanel) -> Result<()> {
    let event_loop = EventLoopBuilder::<ViewerEvent>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create viewer window: {err}"))?;
    let window = Arc::new(window);

    let mut viewer = ViewerWindow::new(window, &config, panel, event_loop.create_proxy())?;
    if let Some(path) = config.initial_image.clone() {
        viewer.submit_image(path);
    }
    viewer.window.request_redraw();

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);
            match event {
                Event::UserEvent(ViewerEvent::Intake(outcome)) => viewer.handle_intake(outcome),
                Event::WindowEvent { window_id, event } if window_id == viewer.window.id() => {
                    match event {
                        WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                        WindowEvent::Resized(size) => viewer.handle_resize(size),
                        WindowEvent::ModifiersChanged(modifiers) => {
                            viewer.shift = modifiers.state().shift_key();
                        }
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.state == ElementState::Pressed
                                && viewer.handle_key(&event.logical_key) == KeyOutcome::Exit
                            {
                                elwt.exit();
                            }
                        }
                        WindowEvent::DroppedFile(path) => viewer.submit_image(path),
                        WindowEvent::RedrawRequested => {
                            if !viewer.redraw() {
                                elwt.exit();
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(key: NamedKey) -> Key {
        Key::Named(key)
    }

    fn character(text: &str) -> Key {
        Key::Character(text.into())
    }

    #[test]
    fn navigation_keys_move_focus() {
        assert_eq!(panel_command(&named(NamedKey::Tab), false), Some(PanelCommand::FocusNext));
        assert_eq!(panel_command(&named(NamedKey::Tab), true), Some(PanelCommand::FocusPrevious));
        assert_eq!(panel_command(&named(NamedKey::ArrowDown), false), Some(PanelCommand::FocusNext));
        assert_eq!(panel_command(&named(NamedKey::ArrowUp), true), Some(PanelCommand::FocusPrevious));
    }

    #[test]
    fn arrows_step_with_shift_for_coarse() {
        assert_eq!(
            panel_command(&named(NamedKey::ArrowRight), false),
            Some(PanelCommand::Increment { coarse: false })
        );
        assert_eq!(
            panel_command(&named(NamedKey::ArrowLeft), true),
            Some(PanelCommand::Decrement { coarse: true })
        );
    }

    #[test]
    fn numeric_characters_start_typed_entry() {
        for text in ["0", "7", ".", "-", "+", "e"] {
            let expected = text.chars().next().map(PanelCommand::Type);
            assert_eq!(panel_command(&character(text), false), expected, "{text}");
        }
        assert_eq!(panel_command(&character("x"), false), None);
        assert_eq!(panel_command(&character("12"), false), None);
    }

    #[test]
    fn editing_and_group_keys() {
        assert_eq!(panel_command(&character("r"), false), Some(PanelCommand::Reset));
        assert_eq!(panel_command(&named(NamedKey::Enter), false), Some(PanelCommand::Commit));
        assert_eq!(panel_command(&named(NamedKey::Escape), false), Some(PanelCommand::Cancel));
        assert_eq!(panel_command(&named(NamedKey::Backspace), false), Some(PanelCommand::Erase));
        assert_eq!(panel_command(&named(NamedKey::F3), false), Some(PanelCommand::ToggleGroup(2)));
        assert_eq!(panel_command(&named(NamedKey::F5), false), None);
    }
}
