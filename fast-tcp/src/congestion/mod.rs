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

use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;

use crate::socket::CongState;
use crate::socket::SocketState;
use crate::Config;
use crate::Error;
use crate::Result;

pub use self::fast::loss_ssthresh;
pub use self::fast::CycleOutcome;
pub use self::fast::CycleReport;
pub use self::fast::DelayEstimate;
pub use self::fast::Fast;
pub use self::fast::FastMode;
pub use self::reno::BaselineIncrease;
pub use self::reno::NewReno;
pub use self::rtt::RttSampler;

/// Available congestion control algorithms.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Algorithm {
    /// NewReno slow start and additive increase. `newreno` in a string form.
    NewReno,
    /// Delay-based FAST TCP (default). `fast` in a string form.
    #[default]
    Fast,
}

impl FromStr for Algorithm {
    type Err = Error;

    /// Converts a string to `Algorithm`.
    ///
    /// If `name` is not valid, `Error::UnknownAlgorithm` is returned.
    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        match name {
            "newreno" | "reno" => Ok(Algorithm::NewReno),
            "fast" => Ok(Algorithm::Fast),

            _ => Err(Error::UnknownAlgorithm(name.to_string())),
        }
    }
}

/// The hooks a host transport drives a congestion control algorithm
/// through.
///
/// All hooks for one flow must be called from one thread of control at a
/// time; separate flows own separate instances and need no locking.
pub trait CongestionOps: Debug + Send {
    /// Human readable name of the algorithm.
    fn name(&self) -> &'static str;

    /// Called on every ACK that yields an RTT sample.
    fn pkts_acked(
        &mut self, sock: &dyn SocketState, segments_acked: u32, rtt: Duration,
    );

    /// Called when the host moves the flow to a new congestion state.
    fn congestion_state_set(
        &mut self, sock: &dyn SocketState, new_state: CongState,
    );

    /// Called when the host allows the window to grow, after
    /// `segments_acked` newly acknowledged segments.
    fn increase_window(
        &mut self, sock: &mut dyn SocketState, segments_acked: u32,
    );

    /// Returns the slow start threshold to use after a loss.
    fn ssthresh(&self, sock: &dyn SocketState, bytes_in_flight: u32) -> u32;

    /// Returns an independent copy for a duplicated connection.
    fn fork(&self) -> Box<dyn CongestionOps>;
}

/// Observes window decisions without the host having to poll.
///
/// Forks of an algorithm report to the same observer.
pub trait WindowObserver: Send + Sync {
    fn on_cwnd_change(&self, _old: u32, _new: u32) {}

    fn on_ssthresh_change(&self, _old: u32, _new: u32) {}

    /// Called at the end of every measurement cycle.
    fn on_cycle(&self, _report: &CycleReport) {}
}

/// Returns a congestion control algorithm configured from `cfg`.
pub fn new_congestion_control(
    algo: Algorithm, cfg: &Config,
) -> Result<Box<dyn CongestionOps>> {
    debug!("congestion control initialized: {:?}", algo);

    Ok(match algo {
        Algorithm::NewReno => Box::new(NewReno::new()),
        Algorithm::Fast => Box::new(Fast::new(cfg.clone())?),
    })
}

mod fast;
mod reno;
mod rtt;

#[cfg(test)]
mod test_sender;
