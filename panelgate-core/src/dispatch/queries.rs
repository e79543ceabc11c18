//! Fixed answers to the controller's system queries.

use crate::message::{Address, Body, LEVEL_TYPES, MessageCode};

pub const PORT_COUNT: u16 = 1;
pub const CHANNEL_COUNT: u16 = 0x0f75;
pub const LEVEL_COUNT: u16 = 0x000d;
/// String and command buffers hold 16-bit characters.
pub const TEXT_SIZE_TYPE: u8 = 0x02;
pub const STRING_SIZE: u16 = 0x00c7;
pub const COMMAND_SIZE: u16 = 0x00c7;
pub const STATUS_CODE: u16 = 0;
pub const STATUS_TEXT: &str = "Normal";

/// Reply code and body for a system query, addressed like the request.
pub fn answer(code: MessageCode, body: &Body) -> Option<(MessageCode, Body)> {
    use MessageCode as M;
    let reply = match (code, body) {
        (M::RequestPortCount, Body::Target { device, system }) => (
            M::PortCount,
            Body::PortCount {
                device: *device,
                system: *system,
                count: PORT_COUNT,
            },
        ),
        (M::RequestChannelCount, Body::Query(address)) => (
            M::ChannelCount,
            Body::Count {
                address: *address,
                count: CHANNEL_COUNT,
            },
        ),
        (M::RequestLevelCount, Body::Query(address)) => (
            M::LevelCount,
            Body::Count {
                address: *address,
                count: LEVEL_COUNT,
            },
        ),
        (M::RequestStringSize, Body::Query(address)) => (
            M::StringSize,
            Body::Size {
                address: *address,
                kind: TEXT_SIZE_TYPE,
                size: STRING_SIZE,
            },
        ),
        (M::RequestCommandSize, Body::Query(address)) => (
            M::CommandSize,
            Body::Size {
                address: *address,
                kind: TEXT_SIZE_TYPE,
                size: COMMAND_SIZE,
            },
        ),
        (M::RequestLevelSize, Body::LevelQuery { address, level }) => (
            M::LevelSize,
            Body::LevelSize {
                address: *address,
                level: *level,
                types: LEVEL_TYPES.to_vec(),
            },
        ),
        (M::RequestStatus, Body::Query(address)) => (
            M::StatusCode,
            Body::Status {
                address: *address,
                code: STATUS_CODE,
                text: STATUS_TEXT.into(),
            },
        ),
        _ => return None,
    };
    Some(reply)
}

/// The five count replies sent unprompted once the handshake completes.
pub fn count_burst(panel: Address) -> [(MessageCode, Body); 5] {
    [
        (
            MessageCode::PortCount,
            Body::PortCount {
                device: panel.device,
                system: panel.system,
                count: PORT_COUNT,
            },
        ),
        (
            MessageCode::ChannelCount,
            Body::Count {
                address: panel,
                count: CHANNEL_COUNT,
            },
        ),
        (
            MessageCode::LevelCount,
            Body::Count {
                address: panel,
                count: LEVEL_COUNT,
            },
        ),
        (
            MessageCode::StringSize,
            Body::Size {
                address: panel,
                kind: TEXT_SIZE_TYPE,
                size: STRING_SIZE,
            },
        ),
        (
            MessageCode::CommandSize,
            Body::Size {
                address: panel,
                kind: TEXT_SIZE_TYPE,
                size: COMMAND_SIZE,
            },
        ),
    ]
}
