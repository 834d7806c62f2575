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

use std::time::Duration;

/// RTT statistics over the lifetime of a flow and over the current
/// measurement cycle.
#[derive(Clone, PartialEq, Eq)]
pub struct RttSampler {
    /// Smallest RTT ever observed. Approximates the propagation delay.
    base_rtt: Duration,

    min_rtt_in_cycle: Duration,

    rtt_sum_in_cycle: Duration,

    rtt_sample_count: u32,
}

impl std::fmt::Debug for RttSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "base_rtt={:?} ", self.base_rtt().unwrap_or_default())?;
        write!(f, "min_rtt_in_cycle={:?} ", self.min_rtt_in_cycle)?;
        write!(f, "rtt_sample_count={}", self.rtt_sample_count)?;

        Ok(())
    }
}

impl Default for RttSampler {
    fn default() -> Self {
        RttSampler::new()
    }
}

impl RttSampler {
    pub fn new() -> Self {
        RttSampler {
            base_rtt: Duration::MAX,

            min_rtt_in_cycle: Duration::MAX,

            rtt_sum_in_cycle: Duration::ZERO,

            rtt_sample_count: 0,
        }
    }

    /// Folds in one RTT sample. A zero sample carries no information and is
    /// dropped. Returns whether the sample was taken.
    pub fn on_sample(&mut self, rtt: Duration) -> bool {
        if rtt.is_zero() {
            return false;
        }

        self.base_rtt = self.base_rtt.min(rtt);
        self.min_rtt_in_cycle = self.min_rtt_in_cycle.min(rtt);
        self.rtt_sum_in_cycle = self.rtt_sum_in_cycle.saturating_add(rtt);
        self.rtt_sample_count = self.rtt_sample_count.saturating_add(1);

        true
    }

    /// Starts a new measurement cycle. The base RTT survives.
    pub fn reset_cycle(&mut self) {
        self.min_rtt_in_cycle = Duration::MAX;
        self.rtt_sum_in_cycle = Duration::ZERO;
        self.rtt_sample_count = 0;
    }

    /// The smallest RTT seen on the flow, or `None` before the first sample.
    pub fn base_rtt(&self) -> Option<Duration> {
        (self.base_rtt != Duration::MAX).then_some(self.base_rtt)
    }

    /// The smallest RTT seen in the current cycle.
    pub fn min_rtt_in_cycle(&self) -> Option<Duration> {
        (self.min_rtt_in_cycle != Duration::MAX)
            .then_some(self.min_rtt_in_cycle)
    }

    /// The mean RTT of the current cycle.
    pub fn mean_rtt_in_cycle(&self) -> Option<Duration> {
        if self.rtt_sample_count == 0 {
            return None;
        }

        Some(self.rtt_sum_in_cycle / self.rtt_sample_count)
    }

    pub fn sample_count(&self) -> u32 {
        self.rtt_sample_count
    }
}
