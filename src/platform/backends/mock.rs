// src/platform/backends/mock.rs

use crate::error::RenderError;
use crate::platform::backends::{Point, WindowEvent};
use crate::platform::platform_trait::{DrawDispatcher, EventSource, Session};
use anyhow::Result;
use std::collections::VecDeque;

/// Scripted session for tests: replays queued events and records every
/// dispatched batch.
pub struct MockSession {
    width: u16,
    height: u16,
    max_points: usize,
    events: VecDeque<Result<WindowEvent, RenderError>>,
    dispatch_failures: VecDeque<RenderError>,
    dispatched: Vec<Vec<Point>>,
    events_consumed: usize,
    cleaned_up: bool,
}

impl MockSession {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            max_points: usize::MAX,
            events: VecDeque::new(),
            dispatch_failures: VecDeque::new(),
            dispatched: Vec::new(),
            events_consumed: 0,
            cleaned_up: false,
        }
    }

    /// Caps the points accepted per request, like a negotiated protocol limit.
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn push_event(&mut self, event: WindowEvent) {
        self.events.push_back(Ok(event));
    }

    pub fn push_error(&mut self, error: RenderError) {
        self.events.push_back(Err(error));
    }

    /// Makes the next dispatch fail with `error`.
    pub fn fail_next_dispatch(&mut self, error: RenderError) {
        self.dispatch_failures.push_back(error);
    }

    pub fn dispatched_batches(&self) -> &[Vec<Point>] {
        &self.dispatched
    }

    pub fn dispatched_points(&self) -> usize {
        self.dispatched.iter().map(Vec::len).sum()
    }

    pub fn events_consumed(&self) -> usize {
        self.events_consumed
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn cleaned_up(&self) -> bool {
        self.cleaned_up
    }
}

impl EventSource for MockSession {
    fn wait_for_event(&mut self) -> Result<WindowEvent, RenderError> {
        self.events_consumed += 1;
        // An exhausted script behaves like a server that hung up.
        self.events
            .pop_front()
            .unwrap_or(Ok(WindowEvent::ConnectionClosed))
    }
}

impl DrawDispatcher for MockSession {
    fn dispatch_points(&mut self, points: &[Point]) -> Result<(), RenderError> {
        if let Some(error) = self.dispatch_failures.pop_front() {
            return Err(error);
        }
        assert!(
            points.len() <= self.max_points,
            "dispatch of {} points exceeds the limit of {}",
            points.len(),
            self.max_points
        );
        self.dispatched.push(points.to_vec());
        Ok(())
    }

    fn max_points_per_request(&self) -> usize {
        self.max_points
    }
}

impl Session for MockSession {
    fn surface_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn cleanup(&mut self) -> Result<()> {
        self.cleaned_up = true;
        Ok(())
    }
}
