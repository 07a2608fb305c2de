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

//! CLI configuration for the `windctl-sender` and `windctl-receiver`
//! binaries, grounded in `original_source/datagrump/sender.cc`'s hand-rolled
//! positional-argument parsing (`sender HOST PORT [bg_rate_mbps] [debug]
//! [tcp]`).

use clap::Parser;

use crate::recovery::Variant;

/// `windctl-sender HOST PORT [bg_rate_mbps] [debug] [tcp]`.
#[derive(Debug, Parser)]
#[command(name = "windctl-sender", about = "Congestion-controlled UDP sender")]
pub struct SenderConfig {
    /// Remote host to send datagrams to.
    pub host: String,

    /// Remote port to send datagrams to.
    pub port: u16,

    /// Background cross-traffic rate, in Mbps. 0 disables injection.
    #[arg(default_value_t = 10)]
    pub bg_rate_mbps: u32,

    /// Raise the log filter to `debug` for the `windctl` target.
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// Select the EwmaForecast/AIMD variant (no delay window). Omit for
    /// CompoundTcp.
    #[arg(long, default_value_t = false)]
    pub tcp: bool,
}

impl SenderConfig {
    pub fn variant(&self) -> Variant {
        if self.tcp {
            Variant::EwmaForecast
        } else {
            Variant::CompoundTcp
        }
    }
}

/// `windctl-receiver PORT`.
#[derive(Debug, Parser)]
#[command(name = "windctl-receiver", about = "Congestion-controlled UDP receiver")]
pub struct ReceiverConfig {
    /// Local port to listen on.
    pub port: u16,

    /// Raise the log filter to `debug` for the `windctl` target.
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tcp_flag_selects_ewma_forecast() {
        let cfg = SenderConfig {
            host: "localhost".into(),
            port: 9090,
            bg_rate_mbps: 10,
            debug: false,
            tcp: true,
        };
        assert_eq!(cfg.variant(), Variant::EwmaForecast);
    }

    #[test]
    fn absent_tcp_flag_selects_compound_tcp() {
        let cfg = SenderConfig {
            host: "localhost".into(),
            port: 9090,
            bg_rate_mbps: 10,
            debug: false,
            tcp: false,
        };
        assert_eq!(cfg.variant(), Variant::CompoundTcp);
    }
}
