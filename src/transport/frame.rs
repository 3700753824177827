//! Frame header encoding and decoding.
//!
//! Every decrypted datagram starts with a one-byte command tag followed by
//! tag-specific fields. All integers are little-endian.
//!
//! ```text
//! +--------+-------------------------------------------+
//! | Tag    | Fields                                    |
//! +--------+-------------------------------------------+
//! | 0x01   | Identification (32)                       |  ClientHandshake
//! | 0x02   | Tunnel addr (LE32) | Peer addr (LE32)     |  ServerHandshake
//! | 0x03   | Identification (32) | IP packet ...       |  ClientData
//! | 0x04   | IP packet ...                             |  ServerData
//! +--------+-------------------------------------------+
//! ```

use std::net::Ipv4Addr;

use crate::core::{
    ByteBuffer, CMD_CLIENT_DATA, CMD_CLIENT_HANDSHAKE, CMD_SERVER_DATA, CMD_SERVER_HANDSHAKE,
    CMD_UNKNOWN, IDENTIFICATION_SIZE,
};

/// Size constants for each header layout.
pub mod sizes {
    use crate::core::IDENTIFICATION_SIZE;

    /// Command tag.
    pub const TAG_SIZE: usize = 1;
    /// ClientHandshake and ClientData headers.
    pub const CLIENT_HEADER_SIZE: usize = TAG_SIZE + IDENTIFICATION_SIZE;
    /// ServerHandshake header (two IPv4 addresses).
    pub const SERVER_HANDSHAKE_SIZE: usize = TAG_SIZE + 4 + 4;
    /// ServerData header.
    pub const SERVER_DATA_SIZE: usize = TAG_SIZE;
}

/// Command tag carried in the first byte of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandType {
    /// Unrecognized tag.
    Unknown = CMD_UNKNOWN,
    /// Handshake request.
    ClientHandshake = CMD_CLIENT_HANDSHAKE,
    /// Handshake response.
    ServerHandshake = CMD_SERVER_HANDSHAKE,
    /// Client IP packet.
    ClientData = CMD_CLIENT_DATA,
    /// Server IP packet.
    ServerData = CMD_SERVER_DATA,
}

impl CommandType {
    /// Parse a command tag. Unrecognized bytes map to [`CommandType::Unknown`].
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            CMD_CLIENT_HANDSHAKE => Self::ClientHandshake,
            CMD_SERVER_HANDSHAKE => Self::ServerHandshake,
            CMD_CLIENT_DATA => Self::ClientData,
            CMD_SERVER_DATA => Self::ServerData,
            _ => Self::Unknown,
        }
    }

    /// Convert to the wire byte.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// 32-byte client identification (SHA-256 of the username).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identification([u8; IDENTIFICATION_SIZE]);

impl Identification {
    /// Create an identification from bytes.
    pub fn from_bytes(bytes: [u8; IDENTIFICATION_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the identification as bytes.
    pub fn as_bytes(&self) -> &[u8; IDENTIFICATION_SIZE] {
        &self.0
    }

    /// All-zero identification (for testing).
    pub fn zero() -> Self {
        Self([0u8; IDENTIFICATION_SIZE])
    }
}

impl AsRef<[u8]> for Identification {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Identification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Identification(")?;
        for b in &self.0[..4] {
            write!(f, "{b:02x}")?;
        }
        write!(f, "..)")
    }
}

/// A decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// Handshake request.
    ClientHandshake {
        /// Who is asking.
        identification: Identification,
    },
    /// Handshake response.
    ServerHandshake {
        /// Tunnel-side address, as decoded from LE32.
        tunnel_addr: u32,
        /// Peer address, as decoded from LE32.
        peer_addr: u32,
    },
    /// Client data; the IP packet follows the header.
    ClientData {
        /// Who is sending.
        identification: Identification,
    },
    /// Server data; the IP packet follows the tag.
    ServerData,
}

impl Header {
    /// Command tag for this header.
    pub fn command(&self) -> CommandType {
        match self {
            Header::ClientHandshake { .. } => CommandType::ClientHandshake,
            Header::ServerHandshake { .. } => CommandType::ServerHandshake,
            Header::ClientData { .. } => CommandType::ClientData,
            Header::ServerData => CommandType::ServerData,
        }
    }

    /// Serialized length in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Header::ClientHandshake { .. } | Header::ClientData { .. } => {
                sizes::CLIENT_HEADER_SIZE
            }
            Header::ServerHandshake { .. } => sizes::SERVER_HANDSHAKE_SIZE,
            Header::ServerData => sizes::SERVER_DATA_SIZE,
        }
    }

    /// Append the serialized header to `buf`.
    pub fn encode(&self, buf: &mut ByteBuffer) {
        buf.insert_back(&[self.command().as_byte()]);
        match self {
            Header::ClientHandshake { identification }
            | Header::ClientData { identification } => {
                buf.insert_back(identification.as_bytes());
            }
            Header::ServerHandshake {
                tunnel_addr,
                peer_addr,
            } => {
                buf.insert_back(&tunnel_addr.to_le_bytes());
                buf.insert_back(&peer_addr.to_le_bytes());
            }
            Header::ServerData => {}
        }
    }

    /// Serialize into a fresh buffer.
    pub fn to_bytes(&self) -> ByteBuffer {
        let mut buf = ByteBuffer::new();
        self.encode(&mut buf);
        buf
    }
}

/// Convert a decoded LE32 address into an [`Ipv4Addr`].
///
/// The wire carries the dotted-quad octets in order, so the address is the
/// little-endian byte view of the decoded value.
pub fn ipv4_from_wire(addr: u32) -> Ipv4Addr {
    Ipv4Addr::from(addr.to_le_bytes())
}

/// Convert an [`Ipv4Addr`] into the value carried as LE32 on the wire.
pub fn ipv4_to_wire(addr: Ipv4Addr) -> u32 {
    u32::from_le_bytes(addr.octets())
}

/// Result of [`parse_header`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedHeader {
    /// Tag found in the first byte.
    pub command: CommandType,
    /// Bytes examined. For a complete header this is its exact length.
    pub consumed: usize,
    /// The header, when all of its fields were present.
    pub header: Option<Header>,
}

impl ParsedHeader {
    /// Returns `true` if every field of the header was present.
    pub fn is_complete(&self) -> bool {
        self.header.is_some()
    }
}

/// Decode the frame header at the start of `data`.
///
/// Never fails: an empty input consumes nothing, an unknown tag consumes one
/// byte and is never complete, and a known tag with missing fields consumes
/// only the tag.
pub fn parse_header(data: &[u8]) -> ParsedHeader {
    let Some(&tag) = data.first() else {
        return ParsedHeader {
            command: CommandType::Unknown,
            consumed: 0,
            header: None,
        };
    };
    let command = CommandType::from_byte(tag);
    let fields = &data[sizes::TAG_SIZE..];

    let header = match command {
        CommandType::ClientHandshake => {
            read_identification(fields).map(|identification| Header::ClientHandshake {
                identification,
            })
        }
        CommandType::ClientData => {
            read_identification(fields).map(|identification| Header::ClientData { identification })
        }
        CommandType::ServerHandshake if fields.len() >= 8 => Some(Header::ServerHandshake {
            tunnel_addr: u32::from_le_bytes([fields[0], fields[1], fields[2], fields[3]]),
            peer_addr: u32::from_le_bytes([fields[4], fields[5], fields[6], fields[7]]),
        }),
        CommandType::ServerHandshake => None,
        CommandType::ServerData => Some(Header::ServerData),
        CommandType::Unknown => None,
    };

    ParsedHeader {
        command,
        consumed: header.map_or(sizes::TAG_SIZE, |h| h.encoded_len()),
        header,
    }
}

fn read_identification(fields: &[u8]) -> Option<Identification> {
    let bytes: [u8; IDENTIFICATION_SIZE] = fields.get(..IDENTIFICATION_SIZE)?.try_into().ok()?;
    Some(Identification::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_id() -> Identification {
        let mut bytes = [0u8; IDENTIFICATION_SIZE];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = 0xA0 ^ i as u8;
        }
        Identification::from_bytes(bytes)
    }

    #[test]
    fn test_command_type_roundtrip() {
        for t in [
            CommandType::ClientHandshake,
            CommandType::ServerHandshake,
            CommandType::ClientData,
            CommandType::ServerData,
        ] {
            assert_eq!(CommandType::from_byte(t.as_byte()), t);
        }
        assert_eq!(CommandType::from_byte(0x00), CommandType::Unknown);
        assert_eq!(CommandType::from_byte(0xFF), CommandType::Unknown);
    }

    #[test]
    fn test_header_roundtrip_every_tag() {
        let headers = [
            (Header::ClientHandshake { identification: sample_id() }, 33),
            (
                Header::ServerHandshake {
                    tunnel_addr: 0x0100_000A,
                    peer_addr: 0x0200_000A,
                },
                9,
            ),
            (Header::ClientData { identification: sample_id() }, 33),
            (Header::ServerData, 1),
        ];
        for (header, len) in headers {
            let bytes = header.to_bytes();
            assert_eq!(bytes.len(), len);
            assert_eq!(header.encoded_len(), len);

            let parsed = parse_header(&bytes);
            assert_eq!(parsed.command, header.command());
            assert_eq!(parsed.consumed, len);
            assert!(parsed.is_complete());
            assert_eq!(parsed.header, Some(header));
        }
    }

    #[test]
    fn test_client_handshake_layout() {
        let bytes = Header::ClientHandshake { identification: sample_id() }.to_bytes();
        assert_eq!(bytes[0], CMD_CLIENT_HANDSHAKE);
        assert_eq!(&bytes[1..], sample_id().as_bytes());
    }

    #[test]
    fn test_server_handshake_is_little_endian() {
        let wire = [CMD_SERVER_HANDSHAKE, 10, 8, 0, 1, 10, 8, 0, 2];
        let parsed = parse_header(&wire);
        let Some(Header::ServerHandshake {
            tunnel_addr,
            peer_addr,
        }) = parsed.header
        else {
            panic!("expected server handshake, got {parsed:?}");
        };
        assert_eq!(tunnel_addr, 0x0100_080A);
        assert_eq!(ipv4_from_wire(tunnel_addr), Ipv4Addr::new(10, 8, 0, 1));
        assert_eq!(ipv4_from_wire(peer_addr), Ipv4Addr::new(10, 8, 0, 2));
        assert_eq!(ipv4_to_wire(Ipv4Addr::new(10, 8, 0, 1)), tunnel_addr);
    }

    #[test]
    fn test_trailing_payload_is_not_consumed() {
        let mut buf = Header::ClientData { identification: sample_id() }.to_bytes();
        buf.insert_back(&[0x45, 0x00, 0x00, 0x14]);
        let parsed = parse_header(&buf);
        assert_eq!(parsed.consumed, 33);
        assert!(parsed.is_complete());

        let wire = [CMD_SERVER_DATA, 0x45, 0x00];
        let parsed = parse_header(&wire);
        assert_eq!(parsed.consumed, 1);
        assert_eq!(parsed.header, Some(Header::ServerData));
    }

    #[test]
    fn test_incomplete_headers() {
        let parsed = parse_header(&[CMD_CLIENT_HANDSHAKE; 20]);
        assert_eq!(parsed.command, CommandType::ClientHandshake);
        assert_eq!(parsed.consumed, 1);
        assert!(!parsed.is_complete());

        let parsed = parse_header(&[CMD_SERVER_HANDSHAKE, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(parsed.command, CommandType::ServerHandshake);
        assert_eq!(parsed.consumed, 1);
        assert!(!parsed.is_complete());

        let parsed = parse_header(&[CMD_CLIENT_DATA]);
        assert_eq!(parsed.consumed, 1);
        assert!(!parsed.is_complete());
    }

    #[test]
    fn test_unknown_tag_never_complete() {
        for wire in [&[0x00u8][..], &[0x07, 1, 2, 3][..], &[0xFF; 64][..]] {
            let parsed = parse_header(wire);
            assert_eq!(parsed.command, CommandType::Unknown);
            assert_eq!(parsed.consumed, 1);
            assert!(!parsed.is_complete());
        }
    }

    #[test]
    fn test_empty_input() {
        let parsed = parse_header(&[]);
        assert_eq!(parsed.consumed, 0);
        assert!(!parsed.is_complete());
    }
}
