// src/orchestrator.rs
//! Drives the render loop: waits for one window event at a time, repaints
//! exposed regions and decides when to stop. Everything platform-specific sits
//! behind the `Session` trait, so the loop runs unchanged against a mock.

use crate::{
    error::RenderError,
    platform::{Session, WindowEvent},
    renderer::Renderer,
};
use anyhow::Context;

/// State of the render loop after an event cycle.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LoopState {
    /// Keep waiting for events.
    Running,
    /// A key press, a closed connection or a fatal error ended the loop.
    /// No further events are consumed.
    Terminating,
}

/// Owns the loop state and borrows the session for the lifetime of the loop.
pub struct AppOrchestrator<'a> {
    session: &'a mut dyn Session,
    pub renderer: Renderer,
    surface_width: u16,
    surface_height: u16,
    state: LoopState,
    regions_rendered: usize,
}

impl<'a> AppOrchestrator<'a> {
    /// Creates an orchestrator that starts with the session's current surface size.
    pub fn new(session: &'a mut dyn Session, renderer: Renderer) -> Self {
        let (surface_width, surface_height) = session.surface_size();
        AppOrchestrator {
            session,
            renderer,
            surface_width,
            surface_height,
            state: LoopState::Running,
            regions_rendered: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn surface_size(&self) -> (u16, u16) {
        (self.surface_width, self.surface_height)
    }

    /// Number of exposed regions repainted so far.
    pub fn regions_rendered(&self) -> usize {
        self.regions_rendered
    }

    /// Consumes exactly one event (none once terminating) and acts on it.
    ///
    /// Transient errors are logged and the loop keeps running. A fatal error
    /// moves the loop to `Terminating` and is returned.
    pub fn process_event_cycle(&mut self) -> Result<LoopState, RenderError> {
        if self.state == LoopState::Terminating {
            log::trace!("Orchestrator: already terminating, no event consumed.");
            return Ok(LoopState::Terminating);
        }

        let outcome = self
            .session
            .wait_for_event()
            .and_then(|event| self.handle_event(event));

        match outcome {
            Ok(state) => {
                self.state = state;
                Ok(state)
            }
            Err(e) if e.is_fatal() => {
                log::error!("Orchestrator: fatal error, terminating: {}", e);
                self.state = LoopState::Terminating;
                Err(e)
            }
            Err(e) => {
                log::warn!("Orchestrator: {}; continuing.", e);
                Ok(LoopState::Running)
            }
        }
    }

    fn handle_event(&mut self, event: WindowEvent) -> Result<LoopState, RenderError> {
        log::debug!("Orchestrator: Handling WindowEvent: {:?}", event);
        match event {
            WindowEvent::RegionExposed(region) => {
                let report = self.renderer.render_region(
                    &mut *self.session,
                    region,
                    self.surface_width,
                    self.surface_height,
                )?;
                self.regions_rendered += 1;
                log::info!(
                    "Drawn {} poly points in {} requests for region {}x{}+{}+{}",
                    report.stable_points,
                    report.dispatches,
                    region.width,
                    region.height,
                    region.x,
                    region.y
                );
                Ok(LoopState::Running)
            }
            WindowEvent::StructureChanged { width, height } => {
                log::debug!(
                    "Orchestrator: surface size {}x{} -> {}x{}",
                    self.surface_width,
                    self.surface_height,
                    width,
                    height
                );
                self.surface_width = width;
                self.surface_height = height;
                Ok(LoopState::Running)
            }
            WindowEvent::KeyPressed { keycode } => {
                log::info!("Orchestrator: key {} pressed, exiting.", keycode);
                Ok(LoopState::Terminating)
            }
            WindowEvent::KeyReleased { .. } => Ok(LoopState::Running),
            WindowEvent::ConnectionClosed => {
                log::info!("Orchestrator: connection closed, exiting.");
                Ok(LoopState::Terminating)
            }
        }
    }

    /// Runs event cycles until the loop terminates.
    pub fn run(&mut self) -> Result<(), RenderError> {
        log::info!(
            "Orchestrator: entering event loop ({}x{} surface).",
            self.surface_width,
            self.surface_height
        );
        while self.process_event_cycle()? == LoopState::Running {}
        log::info!(
            "Orchestrator: event loop finished after {} repainted regions.",
            self.regions_rendered
        );
        Ok(())
    }
}

/// Runs the loop over `session`, then releases the session whatever the
/// loop's outcome.
pub fn run_session(session: &mut dyn Session, renderer: Renderer) -> anyhow::Result<()> {
    let loop_result = AppOrchestrator::new(session, renderer).run();
    if let Err(e) = &loop_result {
        log::error!("Event loop ended with an error: {}", e);
    }

    log::info!("Shutting down session...");
    session.cleanup().context("Failed to release session")?;
    loop_result.context("Render loop failed")?;
    Ok(())
}
