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

//! Congestion-controlled UDP receiver. Re-expresses
//! `original_source/datagrump/receiver.cc`'s accept-and-ack loop as an
//! `mio` readiness loop.

use std::time::Instant;

use clap::Parser;
use mio::net::UdpSocket;
use mio::Events;
use mio::Interest;
use mio::Poll;
use mio::Token;

use windctl::config::ReceiverConfig;
use windctl::error::ReceiverError;
use windctl::throughput::bps_to_mbps;
use windctl::throughput::ThroughputTracker;
use windctl::wire::Message;
use windctl::wire::PAYLOAD_LEN;

const SOCKET: Token = Token(0);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cfg = ReceiverConfig::parse();
    if cfg.debug {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let addr = format!("0.0.0.0:{}", cfg.port).parse()?;
    let mut socket = UdpSocket::bind(addr)?;
    log::info!("listening on {}", socket.local_addr()?);

    let mut poll = Poll::new()?;
    poll.registry().register(&mut socket, SOCKET, Interest::READABLE)?;
    let mut events = Events::with_capacity(16);

    let start = Instant::now();
    let now_ms = || start.elapsed().as_millis() as u64;

    let mut ack_sequence_number: u64 = 0;
    let mut tracker = ThroughputTracker::new(now_ms());
    let mut buf = [0u8; PAYLOAD_LEN + 64];

    loop {
        poll.poll(&mut events, None)?;

        for event in events.iter() {
            if event.token() != SOCKET || !event.is_readable() {
                continue;
            }

            loop {
                let (len, peer) = match socket.recv_from(&mut buf) {
                    Ok(v) => v,
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                    Err(e) => return Err(ReceiverError::from(e).into()),
                };

                let recv_ts = now_ms();
                let msg = Message::decode(&buf[..len]).map_err(ReceiverError::from)?;
                let background = msg.is_background();

                if !background {
                    let bits = (msg.payload.len() * 8) as u64;
                    if let Some(bps) = tracker.update(bits, recv_ts) {
                        log::info!("average throughput: {:.3} Mbps", bps_to_mbps(bps));
                    }
                }

                // The ack sequence counter only advances for data
                // datagrams: the sender ignores acks of background
                // datagrams entirely (they never reach its controller), so
                // giving them a counter value would only create gaps in the
                // data-ack sequence the sender actually tracks.
                let ack = msg.into_ack(ack_sequence_number, recv_ts);
                if !background {
                    ack_sequence_number += 1;
                }
                socket.send_to(&ack.encode(), peer)?;
            }
        }
    }
}
