// Copyright (C) 2018-2019, Cloudflare, Inc.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above copyright
//       notice, this list of conditions and the following disclaimer in the
//       documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS
// IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO,
// THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! The wire envelope carried by every UDP datagram between sender and
//! receiver: a fixed-size header plus a fixed-size payload.

use crate::error::WireError;

/// Fixed application payload size, in bytes (spec.md §6).
pub const PAYLOAD_LEN: usize = 1424;

/// Leading payload byte marking background cross-traffic.
pub const BACKGROUND_TAG: u8 = b'b';

/// Leading payload byte used for ordinary data datagrams.
pub const DATA_TAG: u8 = b'c';

const FLAG_IS_ACK: u8 = 0b0000_0001;
const FLAG_IS_BACKGROUND: u8 = 0b0000_0010;

const DATA_HEADER_LEN: usize = 8 + 8 + 1; // seq + send_ts + flags
const ACK_HEADER_LEN: usize = DATA_HEADER_LEN + 8 + 8; // + ack_seq + ack_recv_ts

/// One wire datagram: either a data datagram or an ack, distinguished by
/// `kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub sequence_number: u64,
    pub send_timestamp_ms: u64,
    pub kind: MessageKind,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Data { background: bool },
    Ack { ack_sequence_number: u64, ack_recv_timestamp_ms: u64 },
}

impl Message {
    /// A new data datagram carrying a fixed-size, tag-prefixed payload.
    pub fn new_data(sequence_number: u64, send_timestamp_ms: u64, background: bool) -> Self {
        let tag = if background { BACKGROUND_TAG } else { DATA_TAG };
        let mut payload = vec![tag; PAYLOAD_LEN];
        payload[0] = tag;

        Message {
            sequence_number,
            send_timestamp_ms,
            kind: MessageKind::Data { background },
            payload,
        }
    }

    /// Turn a received data datagram into its ack, per
    /// `original_source/datagrump/receiver.cc`'s `transform_into_ack`: the
    /// ack echoes the original send timestamp and carries its own receive
    /// timestamp plus a receiver-local ack sequence number.
    pub fn into_ack(self, ack_sequence_number: u64, ack_recv_timestamp_ms: u64) -> Self {
        Message {
            sequence_number: self.sequence_number,
            send_timestamp_ms: self.send_timestamp_ms,
            kind: MessageKind::Ack { ack_sequence_number, ack_recv_timestamp_ms },
            payload: self.payload,
        }
    }

    /// Whether the payload is tagged as background cross-traffic. Checked
    /// against the payload's leading byte rather than `kind` so it still
    /// reads correctly after [`Message::into_ack`] has overwritten `kind`.
    pub fn is_background(&self) -> bool {
        self.payload.first() == Some(&BACKGROUND_TAG)
    }

    pub fn is_ack(&self) -> bool {
        matches!(self.kind, MessageKind::Ack { .. })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ACK_HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&self.sequence_number.to_be_bytes());
        buf.extend_from_slice(&self.send_timestamp_ms.to_be_bytes());

        match self.kind {
            MessageKind::Data { background } => {
                let flags = if background { FLAG_IS_BACKGROUND } else { 0 };
                buf.push(flags);
            },
            MessageKind::Ack { ack_sequence_number, ack_recv_timestamp_ms } => {
                buf.push(FLAG_IS_ACK);
                buf.extend_from_slice(&ack_sequence_number.to_be_bytes());
                buf.extend_from_slice(&ack_recv_timestamp_ms.to_be_bytes());
            },
        }

        buf.extend_from_slice(&self.payload);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < DATA_HEADER_LEN {
            return Err(WireError::TooShort { got: buf.len(), need: DATA_HEADER_LEN });
        }

        let sequence_number = u64::from_be_bytes(buf[0..8].try_into().unwrap());
        let send_timestamp_ms = u64::from_be_bytes(buf[8..16].try_into().unwrap());
        let flags = buf[16];

        let (kind, header_len) = if flags & FLAG_IS_ACK != 0 {
            if buf.len() < ACK_HEADER_LEN {
                return Err(WireError::TooShort { got: buf.len(), need: ACK_HEADER_LEN });
            }
            let ack_sequence_number = u64::from_be_bytes(buf[17..25].try_into().unwrap());
            let ack_recv_timestamp_ms = u64::from_be_bytes(buf[25..33].try_into().unwrap());
            (MessageKind::Ack { ack_sequence_number, ack_recv_timestamp_ms }, ACK_HEADER_LEN)
        } else {
            let background = flags & FLAG_IS_BACKGROUND != 0;
            (MessageKind::Data { background }, DATA_HEADER_LEN)
        };

        let payload = buf[header_len..].to_vec();

        Ok(Message { sequence_number, send_timestamp_ms, kind, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_datagram_round_trips() {
        let msg = Message::new_data(42, 1000, false);
        let encoded = msg.encode();
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(decoded, msg);
        assert!(!decoded.is_background());
        assert!(!decoded.is_ack());
    }

    #[test]
    fn background_datagram_round_trips_and_is_tagged() {
        let msg = Message::new_data(0, 500, true);
        let encoded = msg.encode();
        let decoded = Message::decode(&encoded).unwrap();
        assert!(decoded.is_background());
        assert_eq!(decoded.payload[0], BACKGROUND_TAG);
    }

    #[test]
    fn ack_round_trips() {
        let data = Message::new_data(7, 1000, false);
        let ack = data.into_ack(3, 1050);
        let encoded = ack.encode();
        let decoded = Message::decode(&encoded).unwrap();
        assert!(decoded.is_ack());
        match decoded.kind {
            MessageKind::Ack { ack_sequence_number, ack_recv_timestamp_ms } => {
                assert_eq!(ack_sequence_number, 3);
                assert_eq!(ack_recv_timestamp_ms, 1050);
            },
            _ => panic!("expected an ack"),
        }
    }

    #[test]
    fn decode_rejects_a_truncated_buffer() {
        let err = Message::decode(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, WireError::TooShort { .. }));
    }
}
