//! Sync message types
//!
//! Implements the two fixed-size messages of the BCI2000 time protocol.

use crate::core::{
    SYNC_HEADER_SIZE, SYNC_MAGIC, SYNC_REQUEST_SIZE, SYNC_RESPONSE_SIZE, SYNC_TYPE_REQUEST,
    SYNC_TYPE_RESPONSE, SyncError, SyncResult,
};

/// Message type byte following the magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Client asks for the time server's clock.
    Request = SYNC_TYPE_REQUEST,
    /// Time server answers with its receive and send times.
    Response = SYNC_TYPE_RESPONSE,
}

impl MessageType {
    /// Parse a message type from a byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SYNC_TYPE_REQUEST => Some(Self::Request),
            SYNC_TYPE_RESPONSE => Some(Self::Response),
            _ => None,
        }
    }

    /// Convert the message type to its byte representation.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Exact wire size of a message of this type.
    pub fn wire_size(self) -> usize {
        match self {
            Self::Request => SYNC_REQUEST_SIZE,
            Self::Response => SYNC_RESPONSE_SIZE,
        }
    }
}

/// Sync message.
///
/// Wire format (all integers big-endian):
/// ```text
/// Request  (7 bytes):  +0 Magic (4) | +4 Type 0x01 | +5 Listen Port (2)
/// Response (21 bytes): +0 Magic (4) | +4 Type 0x02 | +5 Recv Time ns (8) | +13 Send Time ns (8)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMessage {
    /// Client request; the server replies to `listen_port`.
    Request {
        /// UDP port of the client's listener.
        listen_port: u16,
    },
    /// Time server response.
    Response {
        /// When the server received the request, server clock, ns.
        remote_recv_time: i64,
        /// When the server sent this response, server clock, ns.
        remote_send_time: i64,
    },
}

impl SyncMessage {
    /// Get the message type.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Request { .. } => MessageType::Request,
            Self::Response { .. } => MessageType::Response,
        }
    }

    /// Total wire size.
    pub fn wire_size(&self) -> usize {
        self.message_type().wire_size()
    }

    /// Encode to wire format.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_size());
        buf.extend_from_slice(&SYNC_MAGIC.to_be_bytes());
        buf.push(self.message_type().as_byte());
        match *self {
            Self::Request { listen_port } => {
                buf.extend_from_slice(&listen_port.to_be_bytes());
            }
            Self::Response {
                remote_recv_time,
                remote_send_time,
            } => {
                buf.extend_from_slice(&remote_recv_time.to_be_bytes());
                buf.extend_from_slice(&remote_send_time.to_be_bytes());
            }
        }
        buf
    }

    /// Decode a message that must be of type `expected`.
    ///
    /// Checks, in order: header present, magic, type, exact length.
    pub fn decode(data: &[u8], expected: MessageType) -> SyncResult<Self> {
        if data.len() < SYNC_HEADER_SIZE {
            return Err(SyncError::TooShort {
                expected: SYNC_HEADER_SIZE,
                actual: data.len(),
            });
        }

        let magic = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        if magic != SYNC_MAGIC {
            return Err(SyncError::BadMagic {
                expected: SYNC_MAGIC,
                actual: magic,
            });
        }

        if MessageType::from_byte(data[4]) != Some(expected) {
            return Err(SyncError::UnexpectedType {
                expected: expected.as_byte(),
                actual: data[4],
            });
        }

        if data.len() != expected.wire_size() {
            return Err(SyncError::BadLength {
                expected: expected.wire_size(),
                actual: data.len(),
            });
        }

        let body = &data[SYNC_HEADER_SIZE..];
        Ok(match expected {
            MessageType::Request => Self::Request {
                listen_port: u16::from_be_bytes([body[0], body[1]]),
            },
            MessageType::Response => Self::Response {
                remote_recv_time: read_i64(&body[0..8]),
                remote_send_time: read_i64(&body[8..16]),
            },
        })
    }

    /// Decode a time server response into `(remote_recv_time, remote_send_time)`.
    pub fn decode_response(data: &[u8]) -> SyncResult<(i64, i64)> {
        match Self::decode(data, MessageType::Response)? {
            Self::Response {
                remote_recv_time,
                remote_send_time,
            } => Ok((remote_recv_time, remote_send_time)),
            Self::Request { .. } => Err(SyncError::UnexpectedType {
                expected: SYNC_TYPE_RESPONSE,
                actual: SYNC_TYPE_REQUEST,
            }),
        }
    }
}

fn read_i64(bytes: &[u8]) -> i64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    i64::from_be_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;

    fn response_bytes(recv: i64, send: i64) -> Vec<u8> {
        SyncMessage::Response {
            remote_recv_time: recv,
            remote_send_time: send,
        }
        .encode()
    }

    #[test]
    fn test_request_wire_format() {
        let encoded = SyncMessage::Request { listen_port: 12122 }.encode();
        assert_eq!(hex::encode(&encoded), "bc12bc12012f5a");
        assert_eq!(encoded.len(), SYNC_REQUEST_SIZE);
    }

    #[test]
    fn test_response_wire_format() {
        let encoded = response_bytes(0x0102, 0x0a0b0c);
        assert_eq!(
            hex::encode(&encoded),
            "bc12bc1202000000000000010200000000000a0b0c"
        );
        assert_eq!(encoded.len(), SYNC_RESPONSE_SIZE);
    }

    #[test]
    fn test_decode_response() {
        let data = hex::decode("bc12bc120200000000000003e800000000000007d0").unwrap();
        assert_eq!(SyncMessage::decode_response(&data).unwrap(), (1000, 2000));
    }

    #[test]
    fn test_decode_request() {
        let data = SyncMessage::Request { listen_port: 40000 }.encode();
        assert_eq!(
            SyncMessage::decode(&data, MessageType::Request).unwrap(),
            SyncMessage::Request { listen_port: 40000 }
        );
    }

    #[test]
    fn test_wrong_magic_rejected() {
        let mut data = response_bytes(1, 2);
        data[0] = 0x12;

        let err = SyncMessage::decode_response(&data).unwrap_err();
        assert!(matches!(err, SyncError::BadMagic { actual: 0x12_12bc12, .. }));
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    }

    #[test]
    fn test_wrong_type_rejected() {
        let mut data = response_bytes(1, 2);
        data[4] = SYNC_TYPE_REQUEST;

        let err = SyncMessage::decode_response(&data).unwrap_err();
        assert!(matches!(
            err,
            SyncError::UnexpectedType {
                expected: 0x02,
                actual: 0x01
            }
        ));
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);

        data[4] = 0x7f;
        assert!(SyncMessage::decode_response(&data).is_err());
    }

    #[test]
    fn test_truncated_rejected() {
        let data = response_bytes(1, 2);

        let err = SyncMessage::decode_response(&data[..SYNC_RESPONSE_SIZE - 1]).unwrap_err();
        assert!(matches!(err, SyncError::BadLength { expected: 21, actual: 20 }));
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);

        let err = SyncMessage::decode_response(&data[..3]).unwrap_err();
        assert!(matches!(err, SyncError::TooShort { .. }));
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    }

    #[test]
    fn test_oversized_rejected() {
        let mut data = response_bytes(1, 2);
        data.push(0);

        let err = SyncMessage::decode_response(&data).unwrap_err();
        assert!(matches!(err, SyncError::BadLength { actual: 22, .. }));
    }
}
