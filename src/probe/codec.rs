// Packet encoding for the status handshake. Every packet is framed as
// VarInt length, VarInt packet id, payload.

use super::ProbeError;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

pub const HANDSHAKE_PACKET: i32 = 0x00;
pub const PING_PACKET: i32 = 0x01;
pub const NEXT_STATE_STATUS: i32 = 1;
pub const MAX_PACKET_LEN: i32 = 1 << 16;

pub fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !0x7F == 0 {
            buf.push(value as u8);
            return;
        }
        buf.push(((value & 0x7F) | 0x80) as u8);
        value >>= 7;
    }
}

/// Accumulates VarInt bytes one at a time, so sync and async readers
/// decode the same way.
#[derive(Debug, Default)]
pub struct VarIntDecoder {
    value: u32,
    read: u32,
}

impl VarIntDecoder {
    /// Returns the value once the final byte arrives.
    pub fn push(&mut self, byte: u8) -> Result<Option<i32>, ProbeError> {
        self.value |= u32::from(byte & 0x7F) << (7 * self.read);
        self.read += 1;
        if byte & 0x80 == 0 {
            return Ok(Some(self.value as i32));
        }
        if self.read == 5 {
            return Err(ProbeError::Protocol("VarInt too long".to_string()));
        }
        Ok(None)
    }
}

pub fn read_varint(cursor: &mut Cursor<&[u8]>) -> Result<i32, ProbeError> {
    let mut decoder = VarIntDecoder::default();
    loop {
        let byte = cursor
            .read_u8()
            .map_err(|_| ProbeError::Protocol("truncated VarInt".to_string()))?;
        if let Some(value) = decoder.push(byte)? {
            return Ok(value);
        }
    }
}

pub fn frame(body: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(body.len() + 5);
    write_varint(&mut packet, body.len() as i32);
    packet.extend_from_slice(body);
    packet
}

pub fn handshake_packet(protocol_version: i32, host: &str, port: u16) -> Result<Vec<u8>, ProbeError> {
    let mut body = Vec::with_capacity(host.len() + 16);
    write_varint(&mut body, HANDSHAKE_PACKET);
    write_varint(&mut body, protocol_version);
    write_varint(&mut body, host.len() as i32);
    body.extend_from_slice(host.as_bytes());
    body.write_u16::<BigEndian>(port)?;
    write_varint(&mut body, NEXT_STATE_STATUS);
    Ok(frame(&body))
}

/// Ping and pong share a layout: packet 0x01 carrying an i64 token.
pub fn ping_packet(token: i64) -> Result<Vec<u8>, ProbeError> {
    let mut body = Vec::with_capacity(9);
    write_varint(&mut body, PING_PACKET);
    body.write_i64::<BigEndian>(token)?;
    Ok(frame(&body))
}

/// Extracts the token from an unframed ping/pong body.
pub fn parse_ping(body: &[u8]) -> Result<i64, ProbeError> {
    let mut cursor = Cursor::new(body);
    let packet_id = read_varint(&mut cursor)?;
    if packet_id != PING_PACKET {
        return Err(ProbeError::Protocol(format!("expected pong, got packet 0x{:02X}", packet_id)));
    }
    cursor
        .read_i64::<BigEndian>()
        .map_err(|_| ProbeError::Protocol("truncated pong".to_string()))
}
