//! SessionController: the composition root of a streaming session.
//!
//! The controller owns at most one [`SessionHandle`].  `connect` always ends
//! the previous session first, and because both `connect` and `end` take
//! `&mut self` no two lifecycle operations can overlap.
//!
//! # Connect sequence
//!
//! ```text
//! Resolving ──(not found, wake enabled)──► Waking ──► Resolving (with retries)
//!     │                                                   │
//!     └───────────────────────┬───────────────────────────┘
//!                             ▼
//!                        Negotiating ──► Connected ──► InputChannelOpen
//! ```
//!
//! A direct target (a server URL) skips the resolve and wake steps.
//!
//! Observers registered with [`on_stats`](SessionController::on_stats) and
//! [`on_status_change`](SessionController::on_status_change) are called from
//! the runtime's worker threads and must not block.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pcloud_core::domain::viewport::Viewport;
use pcloud_core::{MacAddress, MacError, SessionConfig, StatsReading};
use thiserror::Error;
use tracing::info;

use super::input_transport::{GamepadSource, InputTransport, LocalInput};
use super::negotiate_session::{NegotiationError, SessionNegotiator, SessionState};
use super::peer::{MediaSink, PeerSession, PeerSetup};
use super::periodic::PeriodicTask;
use super::resolve_host::{Resolution, Resolver};
use super::retry::RetryPolicy;
use super::telemetry::{spawn_telemetry, StatsObserver, TELEMETRY_PERIOD};
use super::wake_host::{WakeError, WakeSignaler};

/// Default controller polling and pointer flush rate.
pub const DEFAULT_FRAME_RATE_HZ: u32 = 120;

/// Lifecycle events reported to status observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Resolving,
    Waking,
    Negotiating,
    Connected,
    InputChannelOpen,
    Disconnected,
    Failed(String),
}

/// Receives every status change.
pub type StatusObserver = Arc<dyn Fn(&SessionStatus) + Send + Sync>;

/// Where to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectTarget {
    /// A known signaling base URL; no discovery.
    Direct { server: String },
    /// A host identified by MAC; resolved (and optionally woken) first.
    Host {
        mac: String,
        port: u16,
        ip_hint: Option<Ipv4Addr>,
        wake: bool,
    },
}

/// Per-session options that are not part of the negotiated config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    pub setup: PeerSetup,
    pub viewport: Viewport,
    pub frame_rate_hz: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            setup: PeerSetup::default(),
            viewport: Viewport::new(1920.0, 1080.0, Default::default()),
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
        }
    }
}

/// Why `connect` failed.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid MAC address: {0}")]
    InvalidMac(#[from] MacError),

    #[error("host {mac} was not found on the local network")]
    HostNotFound { mac: MacAddress },

    #[error(transparent)]
    Wake(#[from] WakeError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
}

/// The running parts of one active session.
pub struct SessionHandle {
    peer: Arc<dyn PeerSession>,
    config: SessionConfig,
    input: Arc<tokio::sync::Mutex<InputTransport>>,
    telemetry: PeriodicTask,
    frame_loop: PeriodicTask,
}

impl SessionHandle {
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn peer(&self) -> &Arc<dyn PeerSession> {
        &self.peer
    }
}

type Observers<T> = Arc<Mutex<Vec<T>>>;

fn snapshot<T: Clone>(observers: &Observers<T>) -> Vec<T> {
    observers
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

fn notify(observers: &Observers<StatusObserver>, status: SessionStatus) {
    for observer in snapshot(observers) {
        observer(&status);
    }
}

/// Owns the single active session.
pub struct SessionController {
    resolver: Arc<Resolver>,
    waker: WakeSignaler,
    negotiator: SessionNegotiator,
    sink: Arc<dyn MediaSink>,
    gamepads: Option<Arc<dyn GamepadSource>>,
    stats_observers: Observers<StatsObserver>,
    status_observers: Observers<StatusObserver>,
    active: Option<SessionHandle>,
}

impl SessionController {
    pub fn new(
        resolver: Arc<Resolver>,
        waker: WakeSignaler,
        negotiator: SessionNegotiator,
        sink: Arc<dyn MediaSink>,
    ) -> Self {
        Self {
            resolver,
            waker,
            negotiator,
            sink,
            gamepads: None,
            stats_observers: Arc::default(),
            status_observers: Arc::default(),
            active: None,
        }
    }

    /// Polls `source` once per frame for controller state.
    pub fn with_gamepads(mut self, source: Arc<dyn GamepadSource>) -> Self {
        self.gamepads = Some(source);
        self
    }

    pub fn on_stats(&self, observer: impl Fn(StatsReading) + Send + Sync + 'static) {
        self.stats_observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Arc::new(observer));
    }

    pub fn on_status_change(&self, observer: impl Fn(&SessionStatus) + Send + Sync + 'static) {
        self.status_observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Arc::new(observer));
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&SessionHandle> {
        self.active.as_ref()
    }

    pub fn negotiation_state(&self) -> SessionState {
        self.negotiator.state()
    }

    /// Starts a session, replacing any active one.
    ///
    /// For a [`ConnectTarget::Host`], `config.server` is replaced with
    /// `http://{resolved ip}:{port}`.
    pub async fn connect(
        &mut self,
        target: ConnectTarget,
        mut config: SessionConfig,
        options: SessionOptions,
    ) -> Result<(), SessionError> {
        self.end().await;

        let result = self.establish(target, &mut config, options).await;
        if let Err(e) = &result {
            notify(&self.status_observers, SessionStatus::Failed(e.to_string()));
        }
        result
    }

    async fn establish(
        &mut self,
        target: ConnectTarget,
        config: &mut SessionConfig,
        options: SessionOptions,
    ) -> Result<(), SessionError> {
        match target {
            ConnectTarget::Direct { server } => config.server = server,
            ConnectTarget::Host {
                mac,
                port,
                ip_hint,
                wake,
            } => {
                let mac = MacAddress::parse(&mac)?;
                let ip = self.locate(&mac, port, ip_hint, wake).await?;
                config.server = format!("http://{ip}:{port}");
            }
        }

        notify(&self.status_observers, SessionStatus::Negotiating);
        let negotiated = self
            .negotiator
            .negotiate(config.clone(), options.setup, Arc::clone(&self.sink))
            .await?;
        notify(&self.status_observers, SessionStatus::Connected);

        let input = Arc::new(tokio::sync::Mutex::new(InputTransport::new(
            negotiated.peer.input_channel(),
            options.viewport,
        )));

        let stats_observers = Arc::clone(&self.stats_observers);
        let telemetry = spawn_telemetry(
            Arc::clone(&negotiated.peer),
            Arc::new(move |reading: StatsReading| {
                for observer in snapshot(&stats_observers) {
                    observer(reading);
                }
            }),
            TELEMETRY_PERIOD,
        );
        let frame_loop = self.spawn_frame_loop(Arc::clone(&input), options.frame_rate_hz);

        info!("session with {} established", negotiated.config.server);
        self.active = Some(SessionHandle {
            peer: negotiated.peer,
            config: negotiated.config,
            input,
            telemetry,
            frame_loop,
        });
        Ok(())
    }

    /// Single attempt first; on a miss, optionally wake and then retry.
    async fn locate(
        &self,
        mac: &MacAddress,
        port: u16,
        hint: Option<Ipv4Addr>,
        wake: bool,
    ) -> Result<Ipv4Addr, SessionError> {
        notify(&self.status_observers, SessionStatus::Resolving);
        if let Resolution::Found { ip, .. } = self.resolver.resolve_with(mac, port, hint, RetryPolicy::once()).await {
            return Ok(ip);
        }

        if wake {
            notify(&self.status_observers, SessionStatus::Waking);
            self.waker.wake_mac(mac).await?;
            notify(&self.status_observers, SessionStatus::Resolving);
        }

        let policy = self.resolver.config().retry;
        match self.resolver.resolve_with(mac, port, hint, policy).await {
            Resolution::Found { ip, .. } => Ok(ip),
            Resolution::NotFound => Err(SessionError::HostNotFound { mac: *mac }),
        }
    }

    fn spawn_frame_loop(&self, input: Arc<tokio::sync::Mutex<InputTransport>>, frame_rate_hz: u32) -> PeriodicTask {
        let period = Duration::from_secs_f64(1.0 / f64::from(frame_rate_hz.max(1)));
        let gamepads = self.gamepads.clone();
        let status_observers = Arc::clone(&self.status_observers);
        let announced = Arc::new(AtomicBool::new(false));

        PeriodicTask::spawn("frame", period, move || {
            let input = Arc::clone(&input);
            let gamepads = gamepads.clone();
            let status_observers = Arc::clone(&status_observers);
            let announced = Arc::clone(&announced);
            async move {
                let mut input = input.lock().await;
                if input.is_open() && !announced.swap(true, Ordering::AcqRel) {
                    notify(&status_observers, SessionStatus::InputChannelOpen);
                }
                input.flush_frame().await;
                if let Some(source) = &gamepads {
                    input.poll_gamepad(source.poll()).await;
                }
            }
        })
    }

    /// Forwards a local input event to the active session, if any.
    pub async fn send_input(&self, event: LocalInput) {
        if let Some(handle) = &self.active {
            handle.input.lock().await.handle(event).await;
        }
    }

    /// Updates the display geometry used for pointer mapping.
    pub async fn set_viewport(&self, viewport: Viewport) {
        if let Some(handle) = &self.active {
            handle.input.lock().await.set_viewport(viewport);
        }
    }

    /// Takes the current controller reading as the zero baseline.
    ///
    /// Returns `false` if there is no session or no controller.
    pub async fn calibrate_gamepad(&self) -> bool {
        let (Some(handle), Some(source)) = (&self.active, &self.gamepads) else {
            return false;
        };
        let Some(state) = source.poll() else {
            return false;
        };
        handle.input.lock().await.calibrate(&state);
        true
    }

    /// Tears down the active session.  A no-op without one.
    ///
    /// When this returns, the telemetry and frame loops have stopped, the
    /// host was told (best-effort), and the peer connection is closed.
    pub async fn end(&mut self) {
        let Some(handle) = self.active.take() else {
            return;
        };
        info!("ending session with {}", handle.config.server);
        handle.telemetry.stop().await;
        handle.frame_loop.stop().await;
        self.negotiator.teardown(handle.peer.as_ref(), &handle.config).await;
        notify(&self.status_observers, SessionStatus::Disconnected);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
