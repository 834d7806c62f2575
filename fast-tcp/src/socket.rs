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

//! The boundary between the congestion control core and the host transport.
//!
//! The host owns the congestion window, the slow start threshold and the
//! sequence space. Algorithms read and write them through [`SocketState`]
//! and never keep their own copies.

use crate::seq::SeqNum;
use crate::ConfigError;
use crate::Result;

/// Congestion states the host transport moves a flow through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CongState {
    /// Normal operation, no loss or reordering suspected.
    Open,

    /// Duplicate ACKs or SACKs seen, no loss declared yet.
    Disorder,

    /// The window was reduced in response to an ECN echo.
    Cwr,

    /// Fast recovery after a loss.
    Recovery,

    /// Recovery after a retransmission timeout.
    Loss,
}

impl CongState {
    pub fn is_open(self) -> bool {
        self == CongState::Open
    }
}

/// Accessors the host transport exposes to congestion control.
///
/// Windows and thresholds are in bytes.
pub trait SocketState {
    fn cwnd(&self) -> u32;

    fn ssthresh(&self) -> u32;

    fn segment_size(&self) -> u32;

    /// The sequence number of the next byte the sender will transmit.
    fn next_tx_sequence(&self) -> SeqNum;

    /// The highest sequence number cumulatively acknowledged so far.
    fn last_acked_sequence(&self) -> SeqNum;

    fn set_cwnd(&mut self, cwnd: u32);

    fn set_ssthresh(&mut self, ssthresh: u32);

    /// The congestion window in whole segments. Zero if the host reports a
    /// zero segment size.
    fn cwnd_in_segments(&self) -> u32 {
        self.cwnd().checked_div(self.segment_size()).unwrap_or(0)
    }

    fn in_slow_start(&self) -> bool {
        self.cwnd() < self.ssthresh()
    }
}

/// A plain [`SocketState`] for hosts without their own transmission control
/// block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpSocketState {
    /// Congestion window, in bytes.
    pub cwnd: u32,

    /// Slow start threshold, in bytes.
    pub ssthresh: u32,

    /// Next sequence number to transmit.
    pub next_tx_sequence: SeqNum,

    /// Highest cumulatively acknowledged sequence number.
    pub last_acked_sequence: SeqNum,

    segment_size: u32,
}

impl TcpSocketState {
    /// Creates a socket state with an initial window of
    /// `initial_cwnd_segments` and an unbounded slow start threshold.
    ///
    /// A zero `segment_size` is rejected with
    /// [`ConfigError::ZeroSegmentSize`].
    pub fn new(segment_size: u32, initial_cwnd_segments: u32) -> Result<Self> {
        if segment_size == 0 {
            return Err(ConfigError::ZeroSegmentSize.into());
        }

        Ok(TcpSocketState {
            cwnd: segment_size.saturating_mul(initial_cwnd_segments),
            ssthresh: u32::MAX,
            next_tx_sequence: SeqNum::default(),
            last_acked_sequence: SeqNum::default(),
            segment_size,
        })
    }

    /// Starts the sequence space at `isn` instead of zero.
    pub fn with_initial_sequence(mut self, isn: SeqNum) -> Self {
        self.next_tx_sequence = isn;
        self.last_acked_sequence = isn;
        self
    }

    /// Records `bytes` transmitted.
    pub fn on_sent(&mut self, bytes: u32) {
        self.next_tx_sequence += bytes;
    }

    /// Records a cumulative acknowledgement up to `seq`. Acknowledgements
    /// that do not advance the left edge are ignored.
    pub fn on_acked(&mut self, seq: SeqNum) {
        if seq > self.last_acked_sequence {
            self.last_acked_sequence = seq;
        }
    }

    /// Bytes sent but not yet acknowledged.
    pub fn bytes_in_flight(&self) -> u32 {
        self.next_tx_sequence - self.last_acked_sequence
    }
}

impl SocketState for TcpSocketState {
    fn cwnd(&self) -> u32 {
        self.cwnd
    }

    fn ssthresh(&self) -> u32 {
        self.ssthresh
    }

    fn segment_size(&self) -> u32 {
        self.segment_size
    }

    fn next_tx_sequence(&self) -> SeqNum {
        self.next_tx_sequence
    }

    fn last_acked_sequence(&self) -> SeqNum {
        self.last_acked_sequence
    }

    fn set_cwnd(&mut self, cwnd: u32) {
        self.cwnd = cwnd;
    }

    fn set_ssthresh(&mut self, ssthresh: u32) {
        self.ssthresh = ssthresh;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn zero_segment_size_rejected() {
        assert_eq!(
            TcpSocketState::new(0, 10),
            Err(Error::InvalidConfig(ConfigError::ZeroSegmentSize))
        );
    }

    #[test]
    fn sequence_tracking() {
        let mut sock = TcpSocketState::new(1000, 10)
            .unwrap()
            .with_initial_sequence(SeqNum(u32::MAX - 999));

        assert_eq!(sock.cwnd, 10_000);
        assert_eq!(sock.cwnd_in_segments(), 10);
        assert!(sock.in_slow_start());

        sock.on_sent(3000);
        assert_eq!(sock.next_tx_sequence, SeqNum(2000));
        assert_eq!(sock.bytes_in_flight(), 3000);

        sock.on_acked(SeqNum(1000));
        assert_eq!(sock.bytes_in_flight(), 1000);

        // Stale ACK does not move the left edge back.
        sock.on_acked(SeqNum(u32::MAX));
        assert_eq!(sock.last_acked_sequence, SeqNum(1000));
    }

    #[test]
    fn only_open_is_open() {
        assert!(CongState::Open.is_open());

        for state in [
            CongState::Disorder,
            CongState::Cwr,
            CongState::Recovery,
            CongState::Loss,
        ] {
            assert!(!state.is_open());
        }
    }
}
