// Copyright (C) 2024, Cloudflare, Inc.
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

use std::ops::Deref;
use std::ops::DerefMut;
use std::time::Duration;

use crate::congestion::CycleOutcome;
use crate::congestion::Fast;
use crate::socket::CongState;
use crate::Config;
use crate::TcpSocketState;

pub(crate) const MSS: u32 = 1000;

const INITIAL_WINDOW_SEGMENTS: u32 = 10;

/// Drives a [`Fast`] instance the way a host transport does: every ACK
/// advances the left edge by one segment, feeds an RTT sample and offers the
/// window a chance to grow.
pub(crate) struct TestSender {
    cc: Fast,
    pub(crate) sock: TcpSocketState,
}

impl TestSender {
    pub(crate) fn new(cfg: Config) -> Self {
        TestSender::with_cc(Fast::new(cfg).unwrap())
    }

    pub(crate) fn with_cc(cc: Fast) -> Self {
        TestSender {
            cc,
            sock: TcpSocketState::new(MSS, INITIAL_WINDOW_SEGMENTS).unwrap(),
        }
    }

    pub(crate) fn set_window(
        &mut self, cwnd_segments: u32, ssthresh_segments: u32,
    ) {
        self.sock.cwnd = cwnd_segments * MSS;
        self.sock.ssthresh = ssthresh_segments.saturating_mul(MSS);
    }

    pub(crate) fn send_segments(&mut self, n: u32) {
        self.sock.on_sent(n * MSS);
    }

    pub(crate) fn set_state(&mut self, state: CongState) {
        self.cc.on_state_changed(&self.sock, state);
    }

    pub(crate) fn sample_rtt(&mut self, rtt: Duration) {
        self.cc.on_ack_sampled(rtt, 1);
    }

    pub(crate) fn ack_segments(
        &mut self, n: u32, rtt: Duration,
    ) -> Vec<CycleOutcome> {
        let mut outcomes = Vec::with_capacity(n as usize);

        for _ in 0..n {
            let seq = self.sock.last_acked_sequence + MSS;
            self.sock.on_acked(seq);

            self.cc.on_ack_sampled(rtt, 1);
            outcomes.push(self.cc.on_window_grow(&mut self.sock, 1));
        }

        outcomes
    }

    /// Acks everything in flight, then sends a full window.
    pub(crate) fn round_trip(&mut self, rtt: Duration) -> Vec<CycleOutcome> {
        let in_flight = self.sock.bytes_in_flight() / MSS;
        let outcomes = self.ack_segments(in_flight, rtt);

        let cwnd = self.sock.cwnd / MSS;
        self.send_segments(cwnd);

        outcomes
    }

    /// Applies the loss response the way a host entering recovery does.
    pub(crate) fn lose(&mut self) {
        let ssthresh = self.cc.on_loss(self.sock.cwnd, MSS, self.sock.ssthresh);

        self.sock.ssthresh = ssthresh;
        self.sock.cwnd = ssthresh;

        self.set_state(CongState::Recovery);
    }
}

impl Deref for TestSender {
    type Target = Fast;

    fn deref(&self) -> &Self::Target {
        &self.cc
    }
}

impl DerefMut for TestSender {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.cc
    }
}
