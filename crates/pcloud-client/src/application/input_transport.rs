//! InputTransport: local input events to input-channel messages.
//!
//! # Rules (for beginners)
//!
//! | Event            | When it is sent                                   |
//! |------------------|---------------------------------------------------|
//! | pointer move     | at most once per frame, latest position wins      |
//! | button down/up   | immediately                                       |
//! | key down         | immediately, auto-repeat and held keys suppressed |
//! | key up           | immediately                                       |
//! | wheel            | immediately, deltas verbatim                      |
//! | controller state | on each frame poll, only if it changed            |
//!
//! Nothing is queued.  While the channel is not open every event is dropped,
//! and a failed send is dropped too: stale input is worse than lost input.
//!
//! Pointer coordinates arrive relative to the display element's top-left
//! corner in pixels and are mapped onto the picture by [`Viewport::map`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use pcloud_core::domain::viewport::{PointerPosition, Viewport};
use pcloud_core::protocol::{GamepadState, InputMessage};
use tracing::debug;

use super::peer::InputChannel;

/// A local input event, as the windowing layer reports it.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalInput {
    PointerMove { x: f64, y: f64 },
    PointerDown { button: u8, x: f64, y: f64 },
    PointerUp { button: u8, x: f64, y: f64 },
    Wheel { dx: f64, dy: f64 },
    /// `repeat` is set for auto-repeat events generated while a key is held.
    KeyDown { code: String, repeat: bool },
    KeyUp { code: String },
}

/// Source of controller snapshots, polled once per frame.
pub trait GamepadSource: Send + Sync {
    /// The first connected controller, or `None`.
    fn poll(&self) -> Option<GamepadState>;
}

/// Per-session input multiplexer.
pub struct InputTransport {
    channel: Arc<dyn InputChannel>,
    viewport: Viewport,
    epoch: Instant,
    pending_move: Option<PointerPosition>,
    held_keys: HashSet<String>,
    /// Serialised form of the last controller state that was sent.
    last_gamepad: Option<String>,
    calibration: Option<Vec<f64>>,
}

impl InputTransport {
    pub fn new(channel: Arc<dyn InputChannel>, viewport: Viewport) -> Self {
        Self {
            channel,
            viewport,
            epoch: Instant::now(),
            pending_move: None,
            held_keys: HashSet::new(),
            last_gamepad: None,
            calibration: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_open()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Updates element size, stream size, or fit mode.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Handles one local event.
    pub async fn handle(&mut self, event: LocalInput) {
        match event {
            LocalInput::PointerMove { x, y } => {
                self.pending_move = Some(self.viewport.map(x, y));
            }
            LocalInput::PointerDown { button, x, y } => {
                self.flush_frame().await;
                let p = self.viewport.map(x, y);
                let ts = self.ts();
                self.send(InputMessage::MouseDown {
                    button,
                    x: p.x,
                    y: p.y,
                    ts,
                })
                .await;
            }
            LocalInput::PointerUp { button, x, y } => {
                self.flush_frame().await;
                let p = self.viewport.map(x, y);
                let ts = self.ts();
                self.send(InputMessage::MouseUp {
                    button,
                    x: p.x,
                    y: p.y,
                    ts,
                })
                .await;
            }
            LocalInput::Wheel { dx, dy } => {
                let ts = self.ts();
                self.send(InputMessage::MouseWheel { dx, dy, ts }).await;
            }
            LocalInput::KeyDown { code, repeat } => {
                if repeat || !self.held_keys.insert(code.clone()) {
                    return;
                }
                let ts = self.ts();
                self.send(InputMessage::KeyDown { key: code, ts }).await;
            }
            LocalInput::KeyUp { code } => {
                self.held_keys.remove(&code);
                let ts = self.ts();
                self.send(InputMessage::KeyUp { key: code, ts }).await;
            }
        }
    }

    /// Sends the latest pointer position of this frame, if any.
    pub async fn flush_frame(&mut self) {
        if let Some(p) = self.pending_move.take() {
            let ts = self.ts();
            self.send(InputMessage::MouseMoveAbs {
                x: p.x,
                y: p.y,
                inside: p.inside,
                ts,
            })
            .await;
        }
    }

    /// Sends `state` if it differs from the last controller state sent.
    ///
    /// Axes are normalised against the calibration baseline first, so
    /// sensor noise below the rounding step does not count as a change.
    pub async fn poll_gamepad(&mut self, state: Option<GamepadState>) {
        let Some(state) = state else {
            self.last_gamepad = None;
            return;
        };
        if !self.channel.is_open() {
            return;
        }

        let state = state.normalized(self.calibration.as_deref());
        let Ok(serialized) = serde_json::to_string(&state) else {
            return;
        };
        if self.last_gamepad.as_deref() == Some(serialized.as_str()) {
            return;
        }
        self.last_gamepad = Some(serialized);

        let ts = self.ts();
        self.send(InputMessage::Gamepad { state, ts }).await;
    }

    /// Captures `state`'s axes as the zero reading for later polls.
    pub fn calibrate(&mut self, state: &GamepadState) {
        debug!("controller {} calibrated on {} axes", state.index, state.axes.len());
        self.calibration = Some(state.axes.clone());
        self.last_gamepad = None;
    }

    pub fn clear_calibration(&mut self) {
        self.calibration = None;
        self.last_gamepad = None;
    }

    fn ts(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    async fn send(&self, message: InputMessage) {
        if !self.channel.is_open() {
            return;
        }
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                debug!("dropping unserialisable {} message: {e}", message.kind());
                return;
            }
        };
        if let Err(e) = self.channel.send_text(text).await {
            debug!("dropped {} message: {e}", message.kind());
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
