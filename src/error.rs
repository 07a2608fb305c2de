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

//! Error taxonomy for the wire and I/O boundary.
//!
//! The congestion-control core (`recovery::Controller`) never fails: every
//! pathological input is clamped per spec. These types exist only for the
//! ambient layer around it — malformed datagrams and socket I/O.

use thiserror::Error;

/// A malformed or truncated datagram.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("datagram too short: got {got} bytes, need at least {need}")]
    TooShort { got: usize, need: usize },
}

/// Errors surfaced by the sender binary's event loop.
#[derive(Debug, Error)]
pub enum SenderError {
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("received a malformed datagram: {0}")]
    Wire(#[from] WireError),

    #[error("received a message that is not an ack")]
    NotAnAck,
}

/// Errors surfaced by the receiver binary's event loop.
#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("received a malformed datagram: {0}")]
    Wire(#[from] WireError),
}
