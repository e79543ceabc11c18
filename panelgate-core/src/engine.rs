//! Engine facade: one controller connection with reconnects.
//!
//! [`Engine::run`] owns the socket, dispatcher and transfer engine.
//! [`EngineHandle`] is the cloneable side used by the UI to send panel
//! input and to request shutdown.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bridge::UiBridge;
use crate::codec::AnetCodec;
use crate::device::{DeviceRegistry, PanelIdentity};
use crate::dispatch::Dispatcher;
use crate::error::GateError;
use crate::frame::DEFAULT_MAX_BODY;
use crate::header::Origin;
use crate::message::{Address, Body, ChannelRef, Command, Level, LevelValue, MessageCode, Text};
use crate::network::connector::{Connector, DEFAULT_CONNECT_TIMEOUT, retry_delay};
use crate::network::queue::{OutboundQueue, OutboundReceiver, outbound_queue};
use crate::network::session::{DEFAULT_READ_TIMEOUT, Session};
use crate::state::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use crate::state::{self, LinkPhase, RetryDecision, RetryPolicy};
use crate::transfer::{
    Decompressor, Directory, FsDirectory, GzipDecompressor, TransferConfig, TransferEngine,
};

/// Default controller TCP port.
pub const DEFAULT_CONTROLLER_PORT: u16 = 1319;

// ── EngineConfig ─────────────────────────────────────────────────

/// Everything one engine needs to reach and impersonate a panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub host: String,
    pub port: u16,
    /// Controller system number.
    pub system: u16,
    /// Panel device number.
    pub device: u16,
    /// Port used for UI-originated input.
    pub panel_port: u16,
    pub identity: PanelIdentity,
    pub transfer: TransferConfig,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Failed connect cycles before the engine stops.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub max_body: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_CONTROLLER_PORT,
            system: 1,
            device: 10001,
            panel_port: 1,
            identity: PanelIdentity::default(),
            transfer: TransferConfig::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_retries: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_body: DEFAULT_MAX_BODY,
        }
    }
}

impl EngineConfig {
    pub fn origin(&self) -> Origin {
        Origin {
            system: self.system,
            device: self.device,
        }
    }
}

// ── Engine ───────────────────────────────────────────────────────

/// Protocol engine for one controller.
pub struct Engine {
    config: EngineConfig,
    connector: Connector,
    dispatcher: Dispatcher,
    queue: OutboundQueue,
    outbound: OutboundReceiver,
    phase: watch::Sender<LinkPhase>,
    cancel: CancellationToken,
}

impl Engine {
    /// Engine with the filesystem-backed directory and gzip collaborators.
    pub fn new(config: EngineConfig, ui: Arc<dyn UiBridge>) -> Self {
        Self::with_collaborators(
            config,
            ui,
            Box::new(FsDirectory),
            Box::new(GzipDecompressor),
        )
    }

    pub fn with_collaborators(
        config: EngineConfig,
        ui: Arc<dyn UiBridge>,
        directory: Box<dyn Directory>,
        decompressor: Box<dyn Decompressor>,
    ) -> Self {
        let (queue, outbound) = outbound_queue();
        let transfer = TransferEngine::new(&config.transfer, directory, decompressor, ui.clone());
        let dispatcher = Dispatcher::new(
            config.origin(),
            DeviceRegistry::new(&config.identity),
            transfer,
            ui,
            queue.clone(),
        );
        let connector = Connector::new(config.host.clone(), config.port, config.connect_timeout);
        let (phase, _) = watch::channel(LinkPhase::Disconnected);

        Self {
            config,
            connector,
            dispatcher,
            queue,
            outbound,
            phase,
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            queue: self.queue.clone(),
            origin: self.config.origin(),
            port: self.config.panel_port,
            phase: self.phase.subscribe(),
            cancel: self.cancel.clone(),
        }
    }

    /// Connect, serve and reconnect until shut down.
    ///
    /// Returns `Ok` after a shutdown request and
    /// [`GateError::ConnectionExhausted`] when the retry budget is spent.
    pub async fn run(mut self) -> Result<(), GateError> {
        let mut retry = RetryPolicy::new(self.config.max_retries, self.config.retry_delay);
        info!(
            host = %self.config.host,
            port = self.config.port,
            system = self.config.system,
            device = self.config.device,
            "engine starting"
        );

        while !self.cancel.is_cancelled() {
            state::publish(&self.phase, LinkPhase::begin_connect)?;
            let stream = match self.connector.connect(&self.cancel).await {
                Ok(stream) => stream,
                Err(GateError::Cancelled) => break,
                Err(e) => {
                    self.phase.send_modify(LinkPhase::disconnect);
                    warn!(attempt = retry.failures() + 1, "connect cycle failed: {e}");
                    match retry.record_failure() {
                        RetryDecision::RetryAfter(delay) => {
                            if retry_delay(delay, &self.cancel).await.is_err() {
                                break;
                            }
                            continue;
                        }
                        RetryDecision::Exhausted { attempts } => {
                            error!(attempts, "giving up on controller");
                            self.cancel.cancel();
                            return Err(GateError::ConnectionExhausted { attempts });
                        }
                    }
                }
            };

            retry.record_success();
            state::publish(&self.phase, LinkPhase::connected)?;
            let local_ip = stream
                .local_addr()
                .map(local_ipv4)
                .unwrap_or(Ipv4Addr::UNSPECIFIED);
            self.dispatcher.reset(local_ip);
            let stale = self.outbound.discard_pending();
            if stale > 0 {
                debug!(stale, "discarded commands queued while disconnected");
            }

            let session = Session::new(
                stream,
                AnetCodec::new(self.config.max_body),
                &mut self.dispatcher,
                &mut self.outbound,
                &self.phase,
                self.config.read_timeout,
            );
            let result = session.run(&self.cancel).await;
            self.phase.send_modify(LinkPhase::disconnect);

            match result {
                Ok(()) => break,
                Err(e) => {
                    warn!("connection lost: {e}");
                    if retry_delay(self.config.retry_delay, &self.cancel)
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }

        self.phase.send_modify(LinkPhase::disconnect);
        info!("engine stopped");
        Ok(())
    }
}

fn local_ipv4(addr: SocketAddr) -> Ipv4Addr {
    match addr.ip() {
        IpAddr::V4(ip) => ip,
        IpAddr::V6(ip) => ip.to_ipv4_mapped().unwrap_or(Ipv4Addr::UNSPECIFIED),
    }
}

// ── EngineHandle ─────────────────────────────────────────────────

/// Cloneable handle for UI-originated traffic and shutdown.
///
/// Commands pushed while disconnected are discarded when the next
/// connection starts.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    queue: OutboundQueue,
    origin: Origin,
    port: u16,
    phase: watch::Receiver<LinkPhase>,
    cancel: CancellationToken,
}

impl EngineHandle {
    /// Button press on `channel`.
    pub fn push(&self, channel: u16) -> Result<(), GateError> {
        self.channel(MessageCode::Push, channel)
    }

    pub fn release(&self, channel: u16) -> Result<(), GateError> {
        self.channel(MessageCode::Release, channel)
    }

    pub fn channel_on(&self, channel: u16) -> Result<(), GateError> {
        self.channel(MessageCode::ChannelOn, channel)
    }

    pub fn channel_off(&self, channel: u16) -> Result<(), GateError> {
        self.channel(MessageCode::ChannelOff, channel)
    }

    pub fn level(&self, level: u16, value: LevelValue) -> Result<(), GateError> {
        let body = Body::Level(Level {
            address: self.address(),
            level,
            value,
        });
        self.send(MessageCode::PanelLevel, self.port, body)
    }

    pub fn string(&self, content: &str) -> Result<(), GateError> {
        let body = Body::Text(Text::new(self.address(), content));
        self.send(MessageCode::PanelString, self.port, body)
    }

    pub fn command(&self, content: &str) -> Result<(), GateError> {
        let body = Body::Text(Text::new(self.address(), content));
        self.send(MessageCode::PanelCommand, self.port, body)
    }

    /// Queue an arbitrary message from the panel.
    pub fn send(&self, code: MessageCode, port: u16, body: Body) -> Result<(), GateError> {
        let header = self.origin.header(code.value(), port);
        self.queue.push(Command::new(header, body))
    }

    /// Current link phase.
    pub fn phase(&self) -> LinkPhase {
        *self.phase.borrow()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn channel(&self, code: MessageCode, channel: u16) -> Result<(), GateError> {
        let body = Body::Channel(ChannelRef {
            address: self.address(),
            channel,
        });
        self.send(code, self.port, body)
    }

    fn address(&self) -> Address {
        Address::new(self.origin.device, self.port, self.origin.system)
    }
}
