// src/batch.rs

//! Bounded point buffer in front of a `DrawDispatcher`.
//!
//! Points accumulate until the buffer is full or the caller flushes at the end
//! of a region. No dispatch ever carries more than `capacity` points and no
//! added point is silently lost.

use crate::error::RenderError;
use crate::platform::{DrawDispatcher, Point};
use log::trace;

/// Default number of points per draw request.
pub const DEFAULT_BATCH_CAPACITY: usize = 4096;

pub struct PointBatcher<'a, D: DrawDispatcher + ?Sized> {
    dispatcher: &'a mut D,
    points: Vec<Point>,
    capacity: usize,
    dispatches: usize,
    points_dispatched: usize,
}

impl<'a, D: DrawDispatcher + ?Sized> PointBatcher<'a, D> {
    /// Creates an empty batcher. A capacity of zero is raised to one.
    pub fn new(dispatcher: &'a mut D, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            dispatcher,
            points: Vec::with_capacity(capacity),
            capacity,
            dispatches: 0,
            points_dispatched: 0,
        }
    }

    /// Appends a point, flushing first when the batch is already full.
    ///
    /// If that flush fails the error is returned, the pending batch is kept
    /// intact and `point` is not appended.
    pub fn add(&mut self, point: Point) -> Result<(), RenderError> {
        if self.points.len() >= self.capacity {
            self.flush()?;
        }
        self.points.push(point);
        Ok(())
    }

    /// Dispatches the pending points in one request and empties the batch.
    ///
    /// Flushing an empty batch issues no request. On failure the points stay
    /// pending so the caller may retry or `reset`.
    pub fn flush(&mut self) -> Result<(), RenderError> {
        if self.points.is_empty() {
            trace!("PointBatcher: flush on empty batch, nothing to dispatch");
            return Ok(());
        }
        self.dispatcher.dispatch_points(&self.points)?;
        self.dispatches += 1;
        self.points_dispatched += self.points.len();
        trace!(
            "PointBatcher: dispatched {} points (request #{})",
            self.points.len(),
            self.dispatches
        );
        self.points.clear();
        Ok(())
    }

    /// Discards pending points without dispatching them.
    pub fn reset(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of successful dispatch requests so far.
    pub fn dispatches(&self) -> usize {
        self.dispatches
    }

    /// Number of points delivered by successful dispatches so far.
    pub fn points_dispatched(&self) -> usize {
        self.points_dispatched
    }
}
