// src/platform/backends/x11/event.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

//! Blocking event retrieval for the X11 session.
//!
//! Xlib reports protocol errors through a process-wide callback, so they are
//! queued here and surfaced by the next `wait_for_event` or draw request.
//! Xlib only reads the socket after a peek has shown data is waiting, so a
//! server that closes cleanly is reported as `ConnectionClosed` rather than
//! reaching Xlib's fatal I/O handler.

use super::connection::Connection;
use super::window::{clamp_dimension, Window};
use crate::error::RenderError;
use crate::platform::backends::{Rect, WindowEvent};

use libc::c_int;
use log::{debug, error, info, trace, warn};
use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::io;
use std::mem;
use std::sync::Mutex;
use x11::xlib;

/// `QueuedAfterReading` mode of `XEventsQueued` (Xlib.h); the x11 crate does not export it.
const QUEUED_AFTER_READING: c_int = 1;

/// Protocol errors not yet handed to the caller, as `(error_code, request_code)`.
static PROTOCOL_ERRORS: Lazy<Mutex<VecDeque<(u8, u8)>>> =
    Lazy::new(|| Mutex::new(VecDeque::new()));

unsafe extern "C" fn queue_protocol_error(
    _display: *mut xlib::Display,
    event: *mut xlib::XErrorEvent,
) -> c_int {
    if event.is_null() {
        return 0;
    }
    // SAFETY: Xlib passes a valid error event for the duration of the callback.
    let (error_code, request_code) = unsafe { ((*event).error_code, (*event).request_code) };
    warn!(
        "X protocol error: error_code={}, request_code={}",
        error_code, request_code
    );
    push_protocol_error(error_code, request_code);
    0
}

unsafe extern "C" fn report_io_error(_display: *mut xlib::Display) -> c_int {
    // Xlib terminates the process once this returns.
    error!("Fatal I/O error on the X connection; the server went away.");
    0
}

/// Routes Xlib's error callbacks into this module.
pub fn install_error_handlers() {
    // SAFETY: both handlers are `extern "C"` functions with the signatures Xlib expects.
    unsafe {
        xlib::XSetErrorHandler(Some(queue_protocol_error));
        xlib::XSetIOErrorHandler(Some(report_io_error));
    }
    debug!("X error handlers installed.");
}

fn push_protocol_error(error_code: u8, request_code: u8) {
    match PROTOCOL_ERRORS.lock() {
        Ok(mut queue) => queue.push_back((error_code, request_code)),
        Err(poisoned) => poisoned.into_inner().push_back((error_code, request_code)),
    }
}

/// Pops the oldest queued protocol error, if any.
pub fn take_protocol_error() -> Option<RenderError> {
    let next = match PROTOCOL_ERRORS.lock() {
        Ok(mut queue) => queue.pop_front(),
        Err(poisoned) => poisoned.into_inner().pop_front(),
    };
    next.map(|(error_code, request_code)| RenderError::Protocol {
        error_code,
        request_code,
    })
}

/// What a readiness check on the X socket found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketState {
    /// Bytes are waiting to be read.
    Readable,
    /// The peer closed the connection cleanly.
    Closed,
    /// Nothing to read right now.
    Idle,
}

/// Blocks until the next event the session cares about.
///
/// Queued protocol errors are returned first. A cleanly closed socket yields
/// `Ok(WindowEvent::ConnectionClosed)`; socket failures are fatal
/// `RenderError::Connection` errors.
pub fn wait_for_event(
    connection: &Connection,
    window: &mut Window,
) -> Result<WindowEvent, RenderError> {
    let display = connection.display();
    let fd = connection
        .event_fd()
        .ok_or_else(|| RenderError::Connection("X display is closed".to_string()))?;

    loop {
        if let Some(err) = take_protocol_error() {
            return Err(err);
        }

        // SAFETY: valid display. XQLength only inspects Xlib's local queue.
        if unsafe { xlib::XQLength(display) } > 0 {
            let mut xevent: xlib::XEvent = unsafe { mem::zeroed() };
            // SAFETY: at least one event is queued, so XNextEvent returns immediately.
            unsafe { xlib::XNextEvent(display, &mut xevent) };
            if let Some(event) = translate_event(&xevent, window) {
                return Ok(event);
            }
            continue;
        }

        if flush_and_check_queue(&mut XlibQueue(display)) {
            continue;
        }
        wait_readable(fd)?;
        match peek_socket(fd)? {
            SocketState::Closed => {
                debug!("X server closed the connection.");
                return Ok(WindowEvent::ConnectionClosed);
            }
            SocketState::Readable => {
                // SAFETY: valid display; the socket holds data, so this does not block.
                unsafe { xlib::XEventsQueued(display, QUEUED_AFTER_READING) };
            }
            SocketState::Idle => {}
        }
    }
}

/// The two Xlib queue operations `wait_for_event` performs before blocking.
trait EventQueue {
    /// Events already in Xlib's local queue.
    fn queued(&self) -> c_int;
    /// Sends buffered requests to the server.
    fn flush(&mut self);
}

struct XlibQueue(*mut xlib::Display);

impl EventQueue for XlibQueue {
    fn queued(&self) -> c_int {
        // SAFETY: the display is open for the duration of `wait_for_event`.
        unsafe { xlib::XQLength(self.0) }
    }

    fn flush(&mut self) {
        // SAFETY: as above.
        unsafe { xlib::XFlush(self.0) };
    }
}

/// Flushes pending requests and reports whether events are now queued.
///
/// Flushing can move events the transport already read (for example during
/// the `XSync` of a draw request) into Xlib's queue; blocking in `poll` then
/// would wait on a socket that has nothing left to deliver.
fn flush_and_check_queue<Q: EventQueue>(queue: &mut Q) -> bool {
    queue.flush();
    queue.queued() > 0
}

/// Blocks in `poll` until `fd` is readable or hung up.
fn wait_readable(fd: c_int) -> Result<(), RenderError> {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    loop {
        // SAFETY: `pollfd` is a valid array of one element for the duration of the call.
        let ready = unsafe { libc::poll(&mut pollfd, 1, -1) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(RenderError::Connection(format!(
                "poll on X connection failed: {}",
                err
            )));
        }
        return check_revents(pollfd.revents);
    }
}

fn check_revents(revents: libc::c_short) -> Result<(), RenderError> {
    if revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
        return Err(RenderError::Connection(format!(
            "X connection socket reported an error (revents={:#x})",
            revents
        )));
    }
    Ok(())
}

/// Peeks one byte to tell a clean close from pending data.
fn peek_socket(fd: c_int) -> Result<SocketState, RenderError> {
    let mut byte = 0u8;
    // SAFETY: `byte` is a valid one-byte buffer; MSG_PEEK leaves the data for Xlib.
    let received = unsafe {
        libc::recv(
            fd,
            &mut byte as *mut u8 as *mut libc::c_void,
            1,
            libc::MSG_PEEK | libc::MSG_DONTWAIT,
        )
    };
    if received < 0 {
        let err = io::Error::last_os_error();
        return match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Ok(SocketState::Idle),
            _ => Err(RenderError::Connection(format!(
                "reading X connection failed: {}",
                err
            ))),
        };
    }
    Ok(classify_peek(received))
}

fn classify_peek(received: isize) -> SocketState {
    if received == 0 {
        SocketState::Closed
    } else {
        SocketState::Readable
    }
}

/// Maps an X event onto a `WindowEvent`; events the session ignores yield `None`.
fn translate_event(xevent: &xlib::XEvent, window: &mut Window) -> Option<WindowEvent> {
    // SAFETY: `type_` is the discriminant shared by every XEvent variant.
    let event_type = unsafe { xevent.type_ };

    match event_type {
        xlib::Expose => {
            // SAFETY: discriminant checked.
            let expose = unsafe { xevent.expose };
            let region = Rect::new(
                clamp_dimension(expose.x),
                clamp_dimension(expose.y),
                clamp_dimension(expose.width),
                clamp_dimension(expose.height),
            );
            debug!("XEvent: Expose {:?} (count {})", region, expose.count);
            Some(WindowEvent::RegionExposed(region))
        }
        xlib::ConfigureNotify => {
            // SAFETY: discriminant checked.
            let configure = unsafe { xevent.configure };
            let width = clamp_dimension(configure.width);
            let height = clamp_dimension(configure.height);
            if window.update_dimensions(width, height) {
                debug!("XEvent: ConfigureNotify, window now {}x{}", width, height);
                Some(WindowEvent::StructureChanged { width, height })
            } else {
                trace!("XEvent: ConfigureNotify without size change, ignoring");
                None
            }
        }
        xlib::KeyPress => {
            // SAFETY: discriminant checked.
            let keycode = unsafe { xevent.key.keycode };
            debug!("XEvent: KeyPress (keycode {})", keycode);
            Some(WindowEvent::KeyPressed { keycode })
        }
        xlib::KeyRelease => {
            // SAFETY: discriminant checked.
            let keycode = unsafe { xevent.key.keycode };
            trace!("XEvent: KeyRelease (keycode {})", keycode);
            Some(WindowEvent::KeyReleased { keycode })
        }
        xlib::ClientMessage => {
            // SAFETY: discriminant checked.
            let message = unsafe { xevent.client_message };
            if message.message_type == window.protocols_atom()
                && message.data.as_longs()[0] as xlib::Atom == window.wm_delete_window_atom()
            {
                info!("XEvent: WM_DELETE_WINDOW received, closing.");
                Some(WindowEvent::ConnectionClosed)
            } else {
                trace!("XEvent: unrelated ClientMessage, ignoring");
                None
            }
        }
        xlib::DestroyNotify => {
            info!("XEvent: DestroyNotify received, closing.");
            Some(WindowEvent::ConnectionClosed)
        }
        other => {
            trace!("XEvent: type {} ignored", other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_hand_out_queued_protocol_errors_in_order() {
        while take_protocol_error().is_some() {}

        push_protocol_error(8, 64);
        push_protocol_error(9, 65);

        assert!(matches!(
            take_protocol_error(),
            Some(RenderError::Protocol {
                error_code: 8,
                request_code: 64
            })
        ));
        assert!(matches!(
            take_protocol_error(),
            Some(RenderError::Protocol {
                error_code: 9,
                request_code: 65
            })
        ));
        assert!(take_protocol_error().is_none());
    }

    #[test]
    fn it_should_treat_an_empty_peek_as_a_clean_close() {
        assert_eq!(classify_peek(0), SocketState::Closed);
        assert_eq!(classify_peek(1), SocketState::Readable);
    }

    #[test]
    fn it_should_fail_on_socket_errors_only() {
        assert!(check_revents(libc::POLLIN).is_ok());
        assert!(check_revents(libc::POLLHUP).is_ok());
        assert!(matches!(
            check_revents(libc::POLLERR),
            Err(RenderError::Connection(_))
        ));
        assert!(matches!(
            check_revents(libc::POLLNVAL),
            Err(RenderError::Connection(_))
        ));
    }

    #[test]
    fn it_should_detect_a_peer_that_closed_its_socket() {
        let mut fds = [0 as c_int; 2];
        // SAFETY: `fds` has room for the two descriptors socketpair writes.
        let rc = unsafe { libc::socketpair(libc::AF_UNIX, libc::SOCK_STREAM, 0, fds.as_mut_ptr()) };
        assert_eq!(rc, 0);

        assert_eq!(peek_socket(fds[0]).unwrap(), SocketState::Idle);
        // SAFETY: closing a descriptor we own.
        unsafe { libc::close(fds[1]) };
        wait_readable(fds[0]).unwrap();
        assert_eq!(peek_socket(fds[0]).unwrap(), SocketState::Closed);
        // SAFETY: closing a descriptor we own.
        unsafe { libc::close(fds[0]) };
    }

    const PROTOCOLS: xlib::Atom = 300;
    const WM_DELETE: xlib::Atom = 301;

    fn test_window() -> Window {
        Window::detached(200, 150, PROTOCOLS, WM_DELETE)
    }

    fn expose(x: c_int, y: c_int, width: c_int, height: c_int) -> xlib::XEvent {
        // SAFETY: all-zero is a valid XExposeEvent.
        let mut expose: xlib::XExposeEvent = unsafe { mem::zeroed() };
        expose.type_ = xlib::Expose;
        expose.x = x;
        expose.y = y;
        expose.width = width;
        expose.height = height;
        xlib::XEvent { expose }
    }

    fn configure(width: c_int, height: c_int) -> xlib::XEvent {
        // SAFETY: all-zero is a valid XConfigureEvent.
        let mut configure: xlib::XConfigureEvent = unsafe { mem::zeroed() };
        configure.type_ = xlib::ConfigureNotify;
        configure.width = width;
        configure.height = height;
        xlib::XEvent { configure }
    }

    fn key(event_type: c_int, keycode: u32) -> xlib::XEvent {
        // SAFETY: all-zero is a valid XKeyEvent.
        let mut key: xlib::XKeyEvent = unsafe { mem::zeroed() };
        key.type_ = event_type;
        key.keycode = keycode;
        xlib::XEvent { key }
    }

    fn client_message(message_type: xlib::Atom, first_long: xlib::Atom) -> xlib::XEvent {
        // SAFETY: all-zero is a valid XClientMessageEvent.
        let mut client_message: xlib::XClientMessageEvent = unsafe { mem::zeroed() };
        client_message.type_ = xlib::ClientMessage;
        client_message.message_type = message_type;
        client_message.format = 32;
        client_message.data.set_long(0, first_long as libc::c_long);
        xlib::XEvent { client_message }
    }

    #[test]
    fn it_should_translate_exposures_into_clamped_regions() {
        let mut window = test_window();
        assert_eq!(
            translate_event(&expose(10, 20, 30, 40), &mut window),
            Some(WindowEvent::RegionExposed(Rect::new(10, 20, 30, 40)))
        );
        assert_eq!(
            translate_event(&expose(-5, 0, 100_000, 8), &mut window),
            Some(WindowEvent::RegionExposed(Rect::new(0, 0, u16::MAX, 8)))
        );
    }

    #[test]
    fn it_should_report_structure_changes_only_when_the_size_changes() {
        let mut window = test_window();
        assert_eq!(translate_event(&configure(200, 150), &mut window), None);
        assert_eq!(
            translate_event(&configure(320, 240), &mut window),
            Some(WindowEvent::StructureChanged {
                width: 320,
                height: 240
            })
        );
        assert_eq!(window.current_dimensions_pixels(), (320, 240));
        assert_eq!(translate_event(&configure(320, 240), &mut window), None);
    }

    #[test]
    fn it_should_keep_keycodes_of_presses_and_releases() {
        let mut window = test_window();
        assert_eq!(
            translate_event(&key(xlib::KeyPress, 24), &mut window),
            Some(WindowEvent::KeyPressed { keycode: 24 })
        );
        assert_eq!(
            translate_event(&key(xlib::KeyRelease, 38), &mut window),
            Some(WindowEvent::KeyReleased { keycode: 38 })
        );
    }

    #[test]
    fn it_should_close_on_wm_delete_window() {
        let mut window = test_window();
        assert_eq!(
            translate_event(&client_message(PROTOCOLS, WM_DELETE), &mut window),
            Some(WindowEvent::ConnectionClosed)
        );
        assert_eq!(
            translate_event(&client_message(PROTOCOLS, 999), &mut window),
            None
        );
        assert_eq!(
            translate_event(&client_message(777, WM_DELETE), &mut window),
            None
        );
    }

    #[test]
    fn it_should_close_on_destroy_notify() {
        let mut window = test_window();
        // SAFETY: all-zero is a valid XDestroyWindowEvent.
        let mut destroy: xlib::XDestroyWindowEvent = unsafe { mem::zeroed() };
        destroy.type_ = xlib::DestroyNotify;
        let event = xlib::XEvent {
            destroy_window: destroy,
        };
        assert_eq!(
            translate_event(&event, &mut window),
            Some(WindowEvent::ConnectionClosed)
        );
    }

    #[test]
    fn it_should_skip_unrelated_events() {
        let mut window = test_window();
        // SAFETY: all-zero is a valid XAnyEvent.
        let mut any: xlib::XAnyEvent = unsafe { mem::zeroed() };
        any.type_ = xlib::MapNotify;
        assert_eq!(translate_event(&xlib::XEvent { any }, &mut window), None);
    }

    /// Holds events the transport has read but Xlib has not queued yet.
    struct FakeQueue {
        in_transport: c_int,
        queued: c_int,
        flushes: usize,
    }

    impl EventQueue for FakeQueue {
        fn queued(&self) -> c_int {
            self.queued
        }

        fn flush(&mut self) {
            self.flushes += 1;
            self.queued += self.in_transport;
            self.in_transport = 0;
        }
    }

    #[test]
    fn it_should_not_block_when_flushing_queues_an_event() {
        let mut queue = FakeQueue {
            in_transport: 1,
            queued: 0,
            flushes: 0,
        };
        assert_eq!(queue.queued(), 0);
        assert!(flush_and_check_queue(&mut queue));
        assert_eq!(queue.flushes, 1);
    }

    #[test]
    fn it_should_block_when_nothing_is_queued_after_flushing() {
        let mut queue = FakeQueue {
            in_transport: 0,
            queued: 0,
            flushes: 0,
        };
        assert!(!flush_and_check_queue(&mut queue));
        assert_eq!(queue.flushes, 1);
    }
}
