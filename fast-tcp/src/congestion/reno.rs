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

//! NewReno window growth.
//!
//! Used standalone, and as the fallback FAST TCP delegates to whenever its
//! own control law does not apply.

use std::cmp;
use std::time::Duration;

use crate::socket::CongState;
use crate::socket::SocketState;

use super::CongestionOps;

/// Standard slow start and additive increase, as a capability other
/// algorithms delegate to.
pub trait BaselineIncrease: std::fmt::Debug {
    /// Grows the window by one segment if at least one segment was acked.
    /// Returns the acked segments not consumed by slow start.
    fn slow_start(
        &mut self, sock: &mut dyn SocketState, segments_acked: u32,
    ) -> u32;

    /// Grows the window by one segment per window's worth of acked segments.
    fn congestion_avoidance(
        &mut self, sock: &mut dyn SocketState, segments_acked: u32,
    );

    /// Slow start below ssthresh, congestion avoidance at or above it.
    fn increase_window(
        &mut self, sock: &mut dyn SocketState, mut segments_acked: u32,
    ) {
        if sock.in_slow_start() {
            segments_acked = self.slow_start(sock, segments_acked);
        }

        if !sock.in_slow_start() {
            self.congestion_avoidance(sock, segments_acked);
        }
    }
}

/// NewReno congestion control.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct NewReno {
    /// Segments acked in congestion avoidance since the last increase.
    cwnd_cnt: u32,
}

impl NewReno {
    pub fn new() -> Self {
        NewReno::default()
    }
}

impl BaselineIncrease for NewReno {
    fn slow_start(
        &mut self, sock: &mut dyn SocketState, segments_acked: u32,
    ) -> u32 {
        if segments_acked == 0 {
            return 0;
        }

        let cwnd = sock.cwnd().saturating_add(sock.segment_size());
        sock.set_cwnd(cwnd);

        trace!("slow start: cwnd={} ssthresh={}", cwnd, sock.ssthresh());

        segments_acked - 1
    }

    fn congestion_avoidance(
        &mut self, sock: &mut dyn SocketState, segments_acked: u32,
    ) {
        let w = cmp::max(sock.cwnd_in_segments(), 1);

        // Leftover credit from a window that has since shrunk.
        if self.cwnd_cnt >= w {
            self.cwnd_cnt = 0;
            sock.set_cwnd(sock.cwnd().saturating_add(sock.segment_size()));
        }

        self.cwnd_cnt = self.cwnd_cnt.saturating_add(segments_acked);

        if self.cwnd_cnt >= w {
            let delta = self.cwnd_cnt / w;
            self.cwnd_cnt -= delta * w;

            let cwnd = sock
                .cwnd()
                .saturating_add(delta.saturating_mul(sock.segment_size()));
            sock.set_cwnd(cwnd);

            trace!(
                "congestion avoidance: cwnd={} ssthresh={}",
                cwnd,
                sock.ssthresh()
            );
        }
    }
}

impl CongestionOps for NewReno {
    fn name(&self) -> &'static str {
        "TcpNewReno"
    }

    fn pkts_acked(
        &mut self, _sock: &dyn SocketState, _segments_acked: u32,
        _rtt: Duration,
    ) {
    }

    fn congestion_state_set(
        &mut self, _sock: &dyn SocketState, _new_state: CongState,
    ) {
    }

    fn increase_window(
        &mut self, sock: &mut dyn SocketState, segments_acked: u32,
    ) {
        BaselineIncrease::increase_window(self, sock, segments_acked);
    }

    fn ssthresh(&self, sock: &dyn SocketState, bytes_in_flight: u32) -> u32 {
        cmp::max(
            sock.segment_size().saturating_mul(2),
            bytes_in_flight / 2,
        )
    }

    fn fork(&self) -> Box<dyn CongestionOps> {
        Box::new(self.clone())
    }
}

impl std::fmt::Debug for NewReno {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "cwnd_cnt={}", self.cwnd_cnt)
    }
}
