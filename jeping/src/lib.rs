#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
//! `jeping` implements the Minecraft Java Edition [Server List Ping] protocol
//! and renders the server's message of the day.
//!
//! A query performs the handshake, reads the status document and measures
//! latency with a separate ping/pong exchange, so the reported latency does
//! not include the time spent transferring a large status payload.
//!
//! The main API surface is [`get_status`], with [`query_status`] as the raw
//! variant returning the undecoded status JSON. The server description is a
//! [`Chat`] value that can be rendered as plain text or with ANSI colors.
//!
//! [Server List Ping]: https://wiki.vg/Server_List_Ping

pub mod chat;
pub mod color;
pub mod varint;

mod java;

use std::fmt;

pub use chat::{Chat, Component};
pub use color::{Color, NamedColor, Palette, RgbColor};
pub use java::{
    DEFAULT_PORT, Java, JavaResponse, PROTOCOL_VERSION, Packet, Player, Players, Transport,
    Version, exchange, get_status, query_status, read_frame,
};
pub use varint::VarInt;

/// Errors that can occur when pinging a server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not connect to {address}: {source}")]
    Connection {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out while {0}")]
    TimedOut(Phase),
    #[error("an invalid address was provided")]
    InvalidAddress,
    #[error("protocol error while {phase}: {source}")]
    Protocol {
        phase: Phase,
        #[source]
        source: ProtocolError,
    },
    #[error("a JSON error occurred: {0}")]
    Json(#[from] serde_json::Error),
}

/// Broad classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server could not be reached, or stopped answering in time.
    Connection,
    /// The server answered with bytes that do not follow the protocol.
    Protocol,
    /// The status document could not be decoded.
    Format,
}

impl Error {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } | Self::TimedOut(_) | Self::InvalidAddress => {
                ErrorKind::Connection
            }
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Json(_) => ErrorKind::Format,
        }
    }

    /// Wraps a failure that happened during `phase`.
    ///
    /// I/O timeouts are reported as [`Error::TimedOut`] so the caller can tell
    /// a slow server apart from a broken one.
    pub(crate) fn during(phase: Phase, source: ProtocolError) -> Self {
        if let ProtocolError::Io(e) = &source {
            if matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ) {
                return Self::TimedOut(phase);
            }
        }
        Self::Protocol { phase, source }
    }
}

/// Low-level failures while reading or writing packets.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("VarInt too long")]
    VarIntTooLong,
    #[error("invalid length {0}")]
    InvalidLength(i32),
    #[error("length was negative or too large")]
    LengthOutOfRange(#[from] std::num::TryFromIntError),
    #[error("string is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("unexpected packet ID {found:#04x}, expected {expected:#04x}")]
    UnexpectedPacketId { expected: i32, found: i32 },
    #[error("an I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
}

/// The step of a query an error happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Handshake,
    StatusRequest,
    StatusResponse,
    Ping,
    Pong,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Handshake => "sending the handshake",
            Self::StatusRequest => "requesting status",
            Self::StatusResponse => "reading the status response",
            Self::Ping => "sending the ping",
            Self::Pong => "reading the pong",
        })
    }
}
