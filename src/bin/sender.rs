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

//! Congestion-controlled UDP sender. Re-expresses
//! `original_source/datagrump/sender.cc`'s `DatagrumpSender::loop` as an
//! `mio` readiness loop: send-if-open, recv-ack, inject-background.

use std::net::ToSocketAddrs;
use std::time::Duration;
use std::time::Instant;

use clap::Parser;
use mio::net::UdpSocket;
use mio::Events;
use mio::Interest;
use mio::Poll;
use mio::Token;

use windctl::config::SenderConfig;
use windctl::error::SenderError;
use windctl::wire::Message;
use windctl::wire::PAYLOAD_LEN;
use windctl::Controller;

const SOCKET: Token = Token(0);
const TOGGLE_PERIOD: Duration = Duration::from_secs(10);

/// Nominal on-wire packet size used only for the background-rate
/// calculation, matching `sender.cc`'s `PACKET_SIZE_BITS` (1500 bytes, a
/// typical Ethernet MTU) rather than the 1424-byte application payload.
const PACKET_SIZE_BITS: u64 = 1500 * 8;

struct Sender {
    socket: UdpSocket,
    controller: Controller,

    sequence_number: u64,
    next_ack_expected: u64,

    bg_period: Option<Duration>,
    bg_send_at: Instant,
    bg_toggle_at: Instant,
    bg_active: bool,

    start: Instant,
}

impl Sender {
    fn window_is_open(&self) -> bool {
        self.sequence_number - self.next_ack_expected < self.controller.window_size() as u64
    }

    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn send_datagram(&mut self, after_timeout: bool) -> Result<(), SenderError> {
        let seq = self.sequence_number;
        self.sequence_number += 1;

        let send_ts = self.now_ms();
        let msg = Message::new_data(seq, send_ts, false);
        self.socket.send(&msg.encode())?;

        self.controller.datagram_was_sent(seq, send_ts, after_timeout);
        Ok(())
    }

    fn inject_bg_packet(&mut self) -> Result<(), SenderError> {
        let send_ts = self.now_ms();
        let msg = Message::new_data(0, send_ts, true);
        self.socket.send(&msg.encode())?;
        Ok(())
    }

    fn maybe_send_background(&mut self) -> Result<(), SenderError> {
        let Some(period) = self.bg_period else { return Ok(()) };

        let now = Instant::now();
        if now > self.bg_send_at && self.bg_active {
            self.inject_bg_packet()?;
            self.bg_send_at = now + period;
        }
        if now > self.bg_toggle_at {
            self.bg_active = !self.bg_active;
            self.bg_toggle_at = now + TOGGLE_PERIOD;
            log::debug!("background traffic is: {}", if self.bg_active { "on" } else { "off" });
        }
        Ok(())
    }

    fn got_ack(&mut self, recv_ts: u64, ack: Message) -> Result<(), SenderError> {
        if !ack.is_ack() {
            return Err(SenderError::NotAnAck);
        }

        // The receiver acks background datagrams too (for a clean wire
        // round trip), but they never carried a real sequence number and
        // must not perturb the controller's sequence-gap bookkeeping.
        if ack.is_background() {
            return Ok(());
        }

        let (ack_sequence_number, ack_recv_timestamp_ms) = match ack.kind {
            windctl::wire::MessageKind::Ack { ack_sequence_number, ack_recv_timestamp_ms } => {
                (ack_sequence_number, ack_recv_timestamp_ms)
            },
            windctl::wire::MessageKind::Data { .. } => unreachable!("checked by is_ack above"),
        };

        self.next_ack_expected = self.next_ack_expected.max(ack_sequence_number + 1);

        self.controller.ack_received(
            ack_sequence_number,
            ack.send_timestamp_ms,
            ack_recv_timestamp_ms,
            recv_ts,
        );

        Ok(())
    }

    fn run(&mut self) -> Result<(), SenderError> {
        let mut poll = Poll::new()?;
        poll.registry().register(&mut self.socket, SOCKET, Interest::READABLE | Interest::WRITABLE)?;

        let mut events = Events::with_capacity(16);
        let mut buf = [0u8; PAYLOAD_LEN + 64];

        loop {
            let timeout = Duration::from_millis(self.controller.timeout_ms() as u64);
            poll.poll(&mut events, Some(timeout))?;

            if events.is_empty() {
                self.send_datagram(true)?;
            }

            for event in events.iter() {
                if event.token() != SOCKET {
                    continue;
                }

                if event.is_writable() && self.window_is_open() {
                    self.send_datagram(false)?;
                }

                if event.is_readable() {
                    loop {
                        match self.socket.recv(&mut buf) {
                            Ok(len) => {
                                let recv_ts = self.now_ms();
                                let ack = Message::decode(&buf[..len])?;
                                self.got_ack(recv_ts, ack)?;
                            },
                            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                            Err(e) => return Err(e.into()),
                        }
                    }
                }
            }

            self.maybe_send_background()?;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cfg = SenderConfig::parse();
    if cfg.debug {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let remote = (cfg.host.as_str(), cfg.port)
        .to_socket_addrs()?
        .next()
        .ok_or("could not resolve remote address")?;

    let local = if remote.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
    let mut socket = UdpSocket::bind(local.parse()?)?;
    socket.connect(remote)?;

    // 1 Mbps == 1 bit/us, matching sender.cc's `PACKET_SIZE_BITS / bg_rate`.
    let bg_period = if cfg.bg_rate_mbps > 0 {
        Some(Duration::from_micros(PACKET_SIZE_BITS / cfg.bg_rate_mbps as u64))
    } else {
        None
    };

    log::info!(
        "sending to {} (bg_rate={}Mbps, variant={:?})",
        remote,
        cfg.bg_rate_mbps,
        cfg.variant()
    );

    let now = Instant::now();
    let mut sender = Sender {
        socket,
        controller: Controller::new(cfg.debug, cfg.variant()),
        sequence_number: 0,
        next_ack_expected: 0,
        bg_period,
        bg_send_at: now,
        bg_toggle_at: now + TOGGLE_PERIOD,
        bg_active: false,
        start: now,
    };

    sender.run()?;
    Ok(())
}
