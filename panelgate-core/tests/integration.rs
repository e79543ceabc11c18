//! Integration tests: a fake controller on localhost drives a real engine
//! through the handshake, queries, file transfer and reconnects.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use panelgate_core::device::serial_from;
use panelgate_core::header::{SEPARATOR, SEPARATOR_BURST};
use panelgate_core::message::{Address, ChannelRef, FileTransfer, Text};
use panelgate_core::{
    AnetCodec, Body, Command, DeviceRegistry, Engine, EngineConfig, EngineHandle, Frame,
    GateError, Message, MessageCode, Origin, PanelIdentity, RecordingBridge, TransferConfig,
    TransferNotice,
};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

const STEP: Duration = Duration::from_secs(5);

// ── Helpers ──────────────────────────────────────────────────────

/// The controller end of one connection.
struct Controller {
    framed: Framed<TcpStream, AnetCodec>,
}

impl Controller {
    async fn accept(listener: &TcpListener) -> Self {
        let (stream, _) = tokio::time::timeout(STEP, listener.accept())
            .await
            .expect("engine did not connect")
            .unwrap();
        Self {
            framed: Framed::new(stream, AnetCodec::default()),
        }
    }

    async fn send(&mut self, code: MessageCode, body: Body) {
        let origin = Origin {
            system: 1,
            device: 10001,
        };
        let command = Command::new(origin.header(code.value(), 1), body);
        self.framed.send(command.to_frame().unwrap()).await.unwrap();
    }

    async fn recv_frame(&mut self) -> Frame {
        tokio::time::timeout(STEP, self.framed.next())
            .await
            .expect("no frame from engine")
            .expect("engine closed the connection")
            .unwrap()
    }

    async fn recv(&mut self) -> Command {
        let frame = self.recv_frame().await;
        Command::from_frame(&frame).unwrap().unwrap()
    }

    async fn recv_codes(&mut self, n: usize) -> Vec<u16> {
        let mut codes = Vec::with_capacity(n);
        for _ in 0..n {
            codes.push(self.recv().await.header.mc);
        }
        codes
    }

    /// Ping and wait for the pong, proving the session loop is live.
    async fn sync(&mut self) -> Command {
        self.send(
            MessageCode::Ping,
            Body::Target {
                device: 10001,
                system: 1,
            },
        )
        .await;
        let pong = self.recv().await;
        assert_eq!(pong.header.mc, 0x0581);
        pong
    }

    async fn handshake(&mut self) {
        self.send(
            MessageCode::RequestDeviceInfo,
            Body::Target {
                device: 10001,
                system: 1,
            },
        )
        .await;
        assert_eq!(self.recv_codes(2).await, vec![0x0097, 0x0097]);
        for _ in 0..2 {
            self.send(MessageCode::DeviceInfo, peer_info("")).await;
        }
        assert_eq!(
            self.recv_codes(6).await,
            vec![0x0090, 0x0091, 0x0092, 0x0093, 0x0094, 0x0098]
        );
    }
}

fn peer_info(serial: &str) -> Body {
    let mut info = DeviceRegistry::new(&PanelIdentity::default())
        .panel()
        .clone();
    info.name = "NI-700".into();
    info.serial = serial_from(serial);
    Body::DeviceInfo(info)
}

struct Harness {
    listener: TcpListener,
    handle: EngineHandle,
    ui: Arc<RecordingBridge>,
    task: JoinHandle<Result<(), GateError>>,
    assets: tempfile::TempDir,
}

async fn start() -> Harness {
    start_with(Duration::from_secs(120)).await
}

async fn start_with(read_timeout: Duration) -> Harness {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let assets = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        port: listener.local_addr().unwrap().port(),
        retry_delay: Duration::from_millis(20),
        connect_timeout: Duration::from_secs(2),
        read_timeout,
        transfer: TransferConfig {
            asset_root: assets.path().to_path_buf(),
            ..Default::default()
        },
        ..Default::default()
    };
    let ui = Arc::new(RecordingBridge::new());
    let engine = Engine::new(config, ui.clone());
    let handle = engine.handle();
    let task = tokio::spawn(engine.run());
    Harness {
        listener,
        handle,
        ui,
        task,
        assets,
    }
}

impl Harness {
    async fn stop(self) {
        self.handle.shutdown();
        let result = tokio::time::timeout(STEP, self.task)
            .await
            .expect("engine did not stop")
            .unwrap();
        assert!(result.is_ok());
    }
}

/// Queue far more outbound text than the socket buffers can hold.
fn flood(handle: &EngineHandle) {
    let line = "x".repeat(1000);
    for _ in 0..20_000 {
        handle.string(&line).unwrap();
    }
}

fn file(function: u16, data: Vec<u8>) -> Body {
    Body::FileTransfer(FileTransfer::new(0x0004, function, data))
}

fn dir(function: u16, data: &str) -> Body {
    let mut bytes = data.as_bytes().to_vec();
    bytes.push(0);
    Body::FileTransfer(FileTransfer::new(0x0000, function, bytes))
}

fn transfer_of(command: &Command) -> &FileTransfer {
    match &command.body {
        Body::FileTransfer(ft) => ft,
        other => panic!("expected a transfer envelope, got {other:?}"),
    }
}

// ── Handshake ────────────────────────────────────────────────────

#[tokio::test]
async fn test_handshake_sequence() {
    let h = start().await;
    let mut ctl = Controller::accept(&h.listener).await;

    ctl.send(
        MessageCode::RequestDeviceInfo,
        Body::Target {
            device: 10001,
            system: 1,
        },
    )
    .await;
    let first = ctl.recv_frame().await;
    let second = ctl.recv_frame().await;
    assert_eq!(first.header().separator, SEPARATOR_BURST);
    assert_eq!(second.header().separator, SEPARATOR);
    assert_eq!(first.header().device2, 10001);

    match Command::from_frame(&first).unwrap().unwrap().body {
        Body::DeviceInfo(info) => {
            assert_eq!(info.object_id, 0);
            assert_eq!(info.address, Ipv4Addr::LOCALHOST);
        }
        other => panic!("unexpected {other:?}"),
    }

    ctl.send(MessageCode::DeviceInfo, peer_info("")).await;
    ctl.send(MessageCode::DeviceInfo, peer_info("")).await;
    assert_eq!(
        ctl.recv_codes(6).await,
        vec![0x0090, 0x0091, 0x0092, 0x0093, 0x0094, 0x0098]
    );

    // Further device info is ignored; the next reply is the pong.
    ctl.send(MessageCode::DeviceInfo, peer_info("")).await;
    ctl.sync().await;

    assert!(h.handle.phase().is_connected());
    h.stop().await;
}

#[tokio::test]
async fn test_outbound_sequence_increases() {
    let h = start().await;
    let mut ctl = Controller::accept(&h.listener).await;

    ctl.send(
        MessageCode::RequestDeviceInfo,
        Body::Target {
            device: 10001,
            system: 1,
        },
    )
    .await;
    let a = ctl.recv_frame().await.header().sequence;
    let b = ctl.recv_frame().await.header().sequence;
    let c = ctl.sync().await.header.sequence;
    assert_eq!((a, b, c), (1, 2, 3));

    h.stop().await;
}

// ── Queries and keep-alive ───────────────────────────────────────

#[tokio::test]
async fn test_system_query_and_ping() {
    let h = start().await;
    let mut ctl = Controller::accept(&h.listener).await;

    ctl.send(
        MessageCode::RequestChannelCount,
        Body::Query(Address::new(10001, 1, 1)),
    )
    .await;
    let reply = ctl.recv().await;
    assert_eq!(reply.header.mc, 0x0091);
    assert_eq!(
        reply.body,
        Body::Count {
            address: Address::new(10001, 1, 1),
            count: 0x0f75
        }
    );

    let pong = ctl.sync().await;
    match pong.body {
        Body::Pong(p) => {
            assert_eq!(p.address, Ipv4Addr::LOCALHOST);
            assert_eq!(p.device_id, 0x0149);
        }
        other => panic!("unexpected {other:?}"),
    }

    h.stop().await;
}

#[tokio::test]
async fn test_unknown_message_code_is_skipped() {
    let h = start().await;
    let mut ctl = Controller::accept(&h.listener).await;

    let origin = Origin {
        system: 1,
        device: 10001,
    };
    let frame = Frame::new(origin.header(0x0333, 1), vec![1u8, 2, 3].into()).unwrap();
    ctl.framed.send(frame).await.unwrap();

    ctl.sync().await;
    h.stop().await;
}

// ── Channel and text delivery ────────────────────────────────────

#[tokio::test]
async fn test_channel_and_command_delivery() {
    let h = start().await;
    let mut ctl = Controller::accept(&h.listener).await;
    let addr = Address::new(10001, 1, 1);

    ctl.send(
        MessageCode::OutputOn,
        Body::Channel(ChannelRef {
            address: addr,
            channel: 12,
        }),
    )
    .await;
    ctl.send(MessageCode::Command, Body::Text(Text::new(addr, "^TXT-1,0,Hel")))
        .await;
    ctl.send(MessageCode::Command, Body::Text(Text::new(addr, "lo")))
        .await;
    ctl.sync().await;

    let events = h.ui.take();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], Message::Channel { on: true, .. }));
    match &events[2] {
        Message::Text {
            text, continued, ..
        } => {
            assert_eq!(text.content, "^TXT-1,0,Hello");
            assert!(*continued);
        }
        other => panic!("unexpected {other:?}"),
    }

    h.stop().await;
}

#[tokio::test]
async fn test_handle_input_reaches_controller() {
    let h = start().await;
    let mut ctl = Controller::accept(&h.listener).await;
    ctl.handshake().await;

    h.handle.push(7).unwrap();
    h.handle.release(7).unwrap();
    h.handle.string("hello").unwrap();

    let push = ctl.recv().await;
    assert_eq!(push.header.mc, 0x0084);
    assert_eq!(
        push.body,
        Body::Channel(ChannelRef {
            address: Address::new(10001, 1, 1),
            channel: 7
        })
    );
    assert_eq!(ctl.recv_codes(2).await, vec![0x0085, 0x008b]);

    h.stop().await;
}

// ── File transfer ────────────────────────────────────────────────

#[tokio::test]
async fn test_file_receive() {
    let h = start().await;
    let mut ctl = Controller::accept(&h.listener).await;

    ctl.send(MessageCode::FileTransfer, dir(0x0105, "AMXPanel/images"))
        .await;
    let ack = ctl.recv().await;
    assert_eq!(transfer_of(&ack), &FileTransfer::new(0, 0x0105, vec![0x00, 0x01]));
    assert!(h.assets.path().join("images").is_dir());

    let content = b"not really a png".to_vec();
    let mut announce = (content.len() as u32).to_be_bytes().to_vec();
    announce.extend_from_slice(b"AMXPanel/images/logo.png\0");
    ctl.send(MessageCode::FileTransfer, file(0x0102, announce)).await;
    let accept = ctl.recv().await;
    assert_eq!(transfer_of(&accept).function, 0x0103);
    assert_eq!(&transfer_of(&accept).data[..], &2000u16.to_be_bytes());

    let mut chunk = (content.len() as u16).to_be_bytes().to_vec();
    chunk.extend_from_slice(&content);
    ctl.send(MessageCode::FileTransfer, file(0x0003, chunk)).await;
    assert_eq!(transfer_of(&ctl.recv().await).function, 0x0002);

    ctl.send(MessageCode::FileTransfer, file(0x0004, Vec::new()))
        .await;
    assert_eq!(transfer_of(&ctl.recv().await).function, 0x0005);

    ctl.send(MessageCode::FileTransfer, file(0x0007, Vec::new()))
        .await;
    ctl.sync().await;

    let written = std::fs::read(h.assets.path().join("images/logo.png")).unwrap();
    assert_eq!(written, content);
    let events = h.ui.take();
    assert!(
        events
            .iter()
            .any(|m| matches!(m, Message::Transfer(TransferNotice::Receiving { percent: 100, .. })))
    );
    assert_eq!(
        events.last(),
        Some(&Message::Transfer(TransferNotice::Finished))
    );

    h.stop().await;
}

#[tokio::test]
async fn test_unknown_transfer_function_gets_no_reply() {
    let h = start().await;
    let mut ctl = Controller::accept(&h.listener).await;

    ctl.send(MessageCode::FileTransfer, file(0x0f0f, vec![1, 2]))
        .await;
    // The pong is the very next frame.
    ctl.sync().await;

    h.stop().await;
}

// ── Reconnects ───────────────────────────────────────────────────

#[tokio::test]
async fn test_reconnect_after_controller_drop() {
    let h = start().await;
    let mut ctl = Controller::accept(&h.listener).await;
    ctl.handshake().await;
    drop(ctl);

    let mut ctl = Controller::accept(&h.listener).await;
    ctl.handshake().await;
    h.stop().await;
}

#[tokio::test]
async fn test_bad_sync_drops_connection() {
    let h = start().await;
    let mut ctl = Controller::accept(&h.listener).await;
    ctl.sync().await;

    ctl.framed.get_mut().write_all(&[0x03, 0x00, 0x13]).await.unwrap();
    let closed = tokio::time::timeout(STEP, ctl.framed.next())
        .await
        .expect("engine kept the bad connection open");
    assert!(!matches!(closed, Some(Ok(_))));

    let mut ctl = Controller::accept(&h.listener).await;
    ctl.sync().await;
    h.stop().await;
}

// ── Deadlines ────────────────────────────────────────────────────

#[tokio::test]
async fn test_silent_controller_is_dropped() {
    let h = start_with(Duration::from_millis(300)).await;
    let mut ctl = Controller::accept(&h.listener).await;

    let closed = tokio::time::timeout(STEP, ctl.framed.next())
        .await
        .expect("engine kept the silent connection open");
    assert!(!matches!(closed, Some(Ok(_))));

    let mut ctl = Controller::accept(&h.listener).await;
    ctl.sync().await;
    h.stop().await;
}

#[tokio::test]
async fn test_stalled_writer_reconnects() {
    let h = start_with(Duration::from_secs(1)).await;
    let mut stalled = Controller::accept(&h.listener).await;
    stalled.sync().await;

    // The controller stops reading while the panel keeps sending.
    flood(&h.handle);

    let mut ctl = Controller::accept(&h.listener).await;
    ctl.sync().await;
    drop(stalled);
    h.stop().await;
}

#[tokio::test]
async fn test_shutdown_interrupts_stalled_write() {
    let h = start().await;
    let mut stalled = Controller::accept(&h.listener).await;
    stalled.sync().await;

    flood(&h.handle);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(h.handle.phase().is_connected());

    h.stop().await;
    drop(stalled);
}
