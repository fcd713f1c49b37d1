//! RB3Enhanced event protocol decoder
//!
//! The game mod broadcasts one event per UDP datagram:
//!
//! ```text
//! ┌──────────────┬─────────┬──────┬────────┬──────────┬──────────────────────┐
//! │ Magic (4)    │ Ver (1) │ Type │ Length │ Platform │ Payload (Length)     │
//! │ 0x52423345 BE│ 0       │ (1)  │ (1)    │ (1)      │ UTF-8, NUL padded    │
//! └──────────────┴─────────┴──────┴────────┴──────────┴──────────────────────┘
//! ```
//!
//! Decoding is pure: no I/O, no state.

use thiserror::Error;

/// "RB3E" in ASCII
pub const EVENTS_MAGIC: u32 = 0x5242_3345;

/// Only supported protocol version
pub const EVENTS_PROTOCOL_VERSION: u8 = 0;

/// Header size in bytes
pub const HEADER_LEN: usize = 8;

/// Reasons a datagram is not an event we understand (MalformedPacket)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Packet too short: {0} bytes (need at least 8)")]
    TooShort(usize),

    #[error("Wrong magic 0x{0:08X} (expected 0x52423345)")]
    BadMagic(u32),

    #[error("Unsupported protocol version {0} (expected 0)")]
    BadVersion(u8),
}

/// Event type carried in header byte 5
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Alive,
    State,
    SongName,
    SongArtist,
    /// Any type this decoder does not know yet; forwarded, not dropped
    Unknown(u8),
}

impl From<u8> for EventKind {
    fn from(value: u8) -> Self {
        match value {
            0 => EventKind::Alive,
            1 => EventKind::State,
            2 => EventKind::SongName,
            3 => EventKind::SongArtist,
            other => EventKind::Unknown(other),
        }
    }
}

/// One decoded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub payload: String,
}

/// Raw header fields, exposed for packet diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: u32,
    pub version: u8,
    pub event_type: u8,
    pub payload_len: u8,
    pub platform: u8,
}

impl Header {
    /// Read the header without validating it
    pub fn parse(datagram: &[u8]) -> Result<Self, DecodeError> {
        if datagram.len() < HEADER_LEN {
            return Err(DecodeError::TooShort(datagram.len()));
        }

        Ok(Self {
            magic: u32::from_be_bytes([datagram[0], datagram[1], datagram[2], datagram[3]]),
            version: datagram[4],
            event_type: datagram[5],
            payload_len: datagram[6],
            platform: datagram[7],
        })
    }
}

/// Decode a datagram into an [`Event`]
///
/// The declared payload length may exceed what was actually received; the
/// payload is then whatever bytes are present. Trailing NULs are stripped
/// and invalid UTF-8 is replaced rather than rejected.
pub fn decode(datagram: &[u8]) -> Result<Event, DecodeError> {
    let header = Header::parse(datagram)?;

    if header.magic != EVENTS_MAGIC {
        return Err(DecodeError::BadMagic(header.magic));
    }
    if header.version != EVENTS_PROTOCOL_VERSION {
        return Err(DecodeError::BadVersion(header.version));
    }

    let end = (HEADER_LEN + header.payload_len as usize).min(datagram.len());
    let mut payload = &datagram[HEADER_LEN..end];
    while let [rest @ .., 0] = payload {
        payload = rest;
    }

    Ok(Event {
        kind: EventKind::from(header.event_type),
        payload: String::from_utf8_lossy(payload).into_owned(),
    })
}

/// Numeric value of a State event payload
///
/// All-digit text is parsed as a number; otherwise the code point of the
/// first character is used; an empty payload is 0. The game mod has sent
/// both forms, so both must keep working.
pub fn state_value(payload: &str) -> u32 {
    if !payload.is_empty() && payload.chars().all(|c| c.is_ascii_digit()) {
        // Saturate absurdly long digit strings; they are neither menu nor in-game
        return payload.parse().unwrap_or(u32::MAX);
    }

    payload.chars().next().map(u32::from).unwrap_or(0)
}
