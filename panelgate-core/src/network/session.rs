//! One connected session: read, dispatch, flush.
//!
//! A single task owns the socket and selects over cancellation, the next
//! frame, the outbound queue and the inactivity deadline. Every frame is
//! dispatched completely and the resulting replies are flushed before the
//! next read is polled. A flush is itself bounded by the read timeout and
//! yields to cancellation, so a peer that stops reading cannot stall the
//! engine.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::codec::AnetCodec;
use crate::dispatch::Dispatcher;
use crate::error::GateError;
use crate::frame::Frame;
use crate::message::Command;
use crate::network::queue::OutboundReceiver;
use crate::state::{self, LinkPhase};

/// Default inactivity deadline while connected.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Borrowed engine parts a session drives.
pub struct Session<'a> {
    framed: Framed<TcpStream, AnetCodec>,
    dispatcher: &'a mut Dispatcher,
    outbound: &'a mut OutboundReceiver,
    phase: &'a watch::Sender<LinkPhase>,
    read_timeout: Duration,
    sequence: u16,
}

impl<'a> Session<'a> {
    pub fn new(
        stream: TcpStream,
        codec: AnetCodec,
        dispatcher: &'a mut Dispatcher,
        outbound: &'a mut OutboundReceiver,
        phase: &'a watch::Sender<LinkPhase>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            framed: Framed::new(stream, codec),
            dispatcher,
            outbound,
            phase,
            read_timeout,
            sequence: 0,
        }
    }

    /// Run until cancelled (`Ok`) or the connection fails (`Err`).
    pub async fn run(mut self, cancel: &CancellationToken) -> Result<(), GateError> {
        let deadline = tokio::time::sleep(self.read_timeout);
        tokio::pin!(deadline);

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                frame = self.framed.next() => match frame {
                    Some(Ok(frame)) => {
                        deadline.as_mut().reset(Instant::now() + self.read_timeout);
                        self.on_frame(frame)?;
                        self.flush(None, cancel).await?;
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        return Err(GateError::Io(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "controller closed the connection",
                        )));
                    }
                },
                command = self.outbound.recv() => match command {
                    Some(command) => self.flush(Some(command), cancel).await?,
                    None => return Err(GateError::ChannelClosed),
                },
                _ = &mut deadline => return Err(GateError::Timeout(self.read_timeout)),
            }
        }
    }

    fn on_frame(&mut self, frame: Frame) -> Result<(), GateError> {
        self.transition(LinkPhase::begin_read)?;
        trace!(mc = frame.mc(), seq = frame.header().sequence, len = frame.body().len(), "frame in");

        let result = Command::from_frame(&frame).and_then(|command| match command {
            Some(command) => self.dispatcher.dispatch(command),
            None => {
                debug!(mc = frame.mc(), "skipping unknown message code");
                Ok(())
            }
        });
        match result {
            Err(e) if !e.is_fatal() => warn!(mc = frame.mc(), "frame skipped: {e}"),
            other => other?,
        }
        self.transition(LinkPhase::idle)
    }

    /// Write `first` and everything already queued, then flush the socket.
    ///
    /// Fails with [`GateError::Timeout`] when the flush does not complete
    /// within one read timeout. Returns `Ok` early on cancellation; the caller
    /// sees the cancelled token on its next iteration.
    async fn flush(
        &mut self,
        first: Option<Command>,
        cancel: &CancellationToken,
    ) -> Result<(), GateError> {
        let limit = self.read_timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(()),
            written = tokio::time::timeout(limit, self.write_pending(first)) => match written {
                Ok(result) => result,
                Err(_) => {
                    warn!(?limit, "controller stopped reading");
                    Err(GateError::Timeout(limit))
                }
            },
        }
    }

    async fn write_pending(&mut self, first: Option<Command>) -> Result<(), GateError> {
        let mut pending = first.or_else(|| self.outbound.try_recv());
        if pending.is_none() {
            return Ok(());
        }
        self.transition(LinkPhase::begin_write)?;

        while let Some(mut command) = pending {
            self.sequence = self.sequence.wrapping_add(1);
            command.header.sequence = self.sequence;
            match command.to_frame() {
                Ok(frame) => {
                    trace!(mc = frame.mc(), seq = self.sequence, "frame out");
                    self.framed.feed(frame).await?;
                }
                Err(e) => warn!(mc = command.header.mc, "dropping outbound command: {e}"),
            }
            pending = self.outbound.try_recv();
        }
        self.framed.flush().await?;
        self.transition(LinkPhase::idle)
    }

    fn transition(
        &self,
        step: impl FnOnce(&mut LinkPhase) -> Result<(), GateError>,
    ) -> Result<(), GateError> {
        state::publish(self.phase, step)
    }
}
