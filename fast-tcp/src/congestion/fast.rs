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

//! FAST TCP Congestion Control
//!
//! A delay-based window update that uses queueing delay, the gap between the
//! RTT observed over a cycle and the smallest RTT ever observed, as its
//! congestion signal. Once per RTT the window is steered towards
//!
//! ```text
//! w = (1 - gamma) * w + gamma * (w_prev * base_rtt / avg_rtt + alpha)
//! ```
//!
//! which at equilibrium keeps `alpha` packets queued along the path.
//!
//! Reference: Jin, Wei and Low, "FAST TCP: Motivation, Architecture,
//! Algorithms, Performance", IEEE INFOCOM 2004.

use std::cmp;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AvgRttSource;
use crate::config::ControlLaw;
use crate::seq::SeqNum;
use crate::socket::CongState;
use crate::socket::SocketState;
use crate::Config;
use crate::Result;

use super::reno::BaselineIncrease;
use super::reno::NewReno;
use super::rtt::RttSampler;
use super::CongestionOps;
use super::WindowObserver;

/// Cycles with this many RTT samples or fewer are not trusted, since delayed
/// ACKs can leave a cycle with one or two unrepresentative samples.
const MIN_RTT_SAMPLES: u32 = 2;

/// The window the control law never targets below, in segments.
const MIN_TARGET_SEGMENTS: f64 = 2.0;

/// Whether the delay-based control law is in effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FastMode {
    /// The host is recovering from loss, NewReno growth applies.
    #[default]
    Disabled,

    /// The flow is in the open state and measured per cycle.
    Enabled,
}

/// What a call to [`Fast::on_window_grow`] did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CycleOutcome {
    /// FAST mode is off, the baseline grew the window.
    Baseline,

    /// The current cycle has not been fully acknowledged yet. Nothing
    /// changed.
    Pending,

    /// The cycle ended without enough usable RTT samples, the baseline grew
    /// the window.
    InsufficientSamples,

    /// Queueing delay was below the MI threshold. The window grew by slow
    /// start or by one segment.
    MultiplicativeIncrease,

    /// The control law ran. `new_cwnd_segments` is only applied outside of
    /// slow start.
    ControlLaw {
        target_segments: f64,
        new_cwnd_segments: f64,
    },

    /// Queue occupancy was inside the target band. Nothing changed.
    Stable,
}

/// The delay statistics of one completed cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DelayEstimate {
    pub base_rtt: Duration,

    pub avg_rtt: Duration,

    /// `avg_rtt - base_rtt`, never negative.
    pub queueing_delay: Duration,

    /// Previous cycle's window in segments times the queueing delay in
    /// seconds.
    pub queue_occupancy: f64,

    /// `alpha * avg_rtt` in seconds.
    pub alpha_time: f64,

    /// `beta * avg_rtt` in seconds.
    pub beta_time: f64,
}

impl DelayEstimate {
    /// Returns `None` when either RTT is zero.
    pub fn new(
        base_rtt: Duration, avg_rtt: Duration, previous_cwnd_segments: f64,
        cfg: &Config,
    ) -> Option<Self> {
        if base_rtt.is_zero() || avg_rtt.is_zero() {
            warn!(
                "refusing delay estimate base_rtt={:?} avg_rtt={:?}",
                base_rtt, avg_rtt
            );

            return None;
        }

        let queueing_delay = avg_rtt.saturating_sub(base_rtt);
        let avg_rtt_secs = avg_rtt.as_secs_f64();

        Some(DelayEstimate {
            base_rtt,
            avg_rtt,
            queueing_delay,
            queue_occupancy: previous_cwnd_segments *
                queueing_delay.as_secs_f64(),
            alpha_time: f64::from(cfg.alpha()) * avg_rtt_secs,
            beta_time: f64::from(cfg.beta()) * avg_rtt_secs,
        })
    }

    /// Whether the estimated occupancy lies outside `[alpha, beta)`.
    pub fn outside_band(&self) -> bool {
        self.queue_occupancy < self.alpha_time ||
            self.queue_occupancy >= self.beta_time
    }

    /// The equilibrium window `previous * base_rtt / avg_rtt + alpha`, in
    /// segments, clamped to at least two segments.
    pub fn target_segments(
        &self, previous_cwnd_segments: f64, alpha: u32,
    ) -> f64 {
        let ratio = self.base_rtt.as_secs_f64() / self.avg_rtt.as_secs_f64();

        (previous_cwnd_segments * ratio + f64::from(alpha))
            .max(MIN_TARGET_SEGMENTS)
    }
}

/// Reported to a [`WindowObserver`] at the end of every cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,

    /// `None` when the cycle fell back to the baseline.
    pub estimate: Option<DelayEstimate>,

    pub cwnd: u32,

    pub ssthresh: u32,
}

/// The slow start threshold after a loss: no more than one segment below
/// the current window, no less than two segments.
pub fn loss_ssthresh(cwnd: u32, segment_size: u32, ssthresh: u32) -> u32 {
    cmp::max(
        cmp::min(ssthresh, cwnd.saturating_sub(segment_size)),
        segment_size.saturating_mul(2),
    )
}

/// FAST TCP congestion control state for one flow.
///
/// Growth outside of the open state, and within cycles that did not
/// collect enough RTT samples, is delegated to the baseline `B`.
pub struct Fast<B = NewReno> {
    cfg: Config,

    rtt: RttSampler,

    mode: FastMode,

    /// The host's next sequence number when the current cycle started. The
    /// cycle ends once everything up to it is acknowledged.
    cycle_right_edge: SeqNum,

    /// Window in segments at the end of the previous cycle.
    previous_cwnd_segments: f64,

    baseline: B,

    observer: Option<Arc<dyn WindowObserver>>,

    trace_id: String,
}

impl Fast<NewReno> {
    /// Creates FAST TCP state falling back to NewReno.
    ///
    /// Fails if `cfg` does not pass [`Config::validate()`].
    pub fn new(cfg: Config) -> Result<Self> {
        Fast::with_baseline(cfg, NewReno::new())
    }
}

impl<B: BaselineIncrease> Fast<B> {
    /// Creates FAST TCP state falling back to `baseline`.
    pub fn with_baseline(cfg: Config, baseline: B) -> Result<Self> {
        cfg.validate()?;

        Ok(Fast {
            cfg,

            rtt: RttSampler::new(),

            mode: FastMode::Disabled,

            cycle_right_edge: SeqNum::default(),

            previous_cwnd_segments: 0.0,

            baseline,

            observer: None,

            trace_id: String::new(),
        })
    }

    /// Reports window changes and cycle results to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn WindowObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Prefixes log lines with `trace_id`.
    pub fn with_trace_id(mut self, trace_id: &str) -> Self {
        self.trace_id = trace_id.to_string();
        self
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn mode(&self) -> FastMode {
        self.mode
    }

    pub fn base_rtt(&self) -> Option<Duration> {
        self.rtt.base_rtt()
    }

    pub fn min_rtt_in_cycle(&self) -> Option<Duration> {
        self.rtt.min_rtt_in_cycle()
    }

    pub fn rtt_sample_count(&self) -> u32 {
        self.rtt.sample_count()
    }

    pub fn cycle_right_edge(&self) -> SeqNum {
        self.cycle_right_edge
    }

    pub fn previous_cwnd_segments(&self) -> f64 {
        self.previous_cwnd_segments
    }

    pub fn baseline(&self) -> &B {
        &self.baseline
    }

    /// Takes one RTT sample. Zero samples are dropped.
    pub fn on_ack_sampled(&mut self, rtt: Duration, segments_acked: u32) {
        trace!(
            "{} on_ack_sampled rtt={:?} segments_acked={}",
            self.trace_id,
            rtt,
            segments_acked
        );

        if !self.rtt.on_sample(rtt) {
            return;
        }

        trace!("{} {:?}", self.trace_id, self.rtt);
    }

    /// Enables FAST mode when the flow enters the open state, disables it
    /// for every other state.
    pub fn on_state_changed(
        &mut self, sock: &dyn SocketState, new_state: CongState,
    ) {
        trace!("{} on_state_changed {:?}", self.trace_id, new_state);

        if new_state.is_open() {
            self.enable(sock);
        } else {
            self.disable();
        }
    }

    /// Starts a fresh measurement cycle at the host's next sequence number.
    pub fn enable(&mut self, sock: &dyn SocketState) {
        self.mode = FastMode::Enabled;
        self.cycle_right_edge = sock.next_tx_sequence();
        self.rtt.reset_cycle();
        self.previous_cwnd_segments = cwnd_segments(sock);

        debug!(
            "{} fast enabled right_edge={} cwnd_segments={}",
            self.trace_id, self.cycle_right_edge, self.previous_cwnd_segments
        );
    }

    /// Stops applying the control law. RTT statistics are kept.
    pub fn disable(&mut self) {
        if self.mode == FastMode::Enabled {
            debug!("{} fast disabled", self.trace_id);
        }

        self.mode = FastMode::Disabled;
    }

    /// Grows or steers the window after `segments_acked` segments were
    /// acknowledged. The control law runs at most once per cycle.
    pub fn on_window_grow(
        &mut self, sock: &mut dyn SocketState, segments_acked: u32,
    ) -> CycleOutcome {
        trace!(
            "{} on_window_grow segments_acked={} cwnd={} ssthresh={}",
            self.trace_id,
            segments_acked,
            sock.cwnd(),
            sock.ssthresh()
        );

        let prev_cwnd = sock.cwnd();
        let prev_ssthresh = sock.ssthresh();

        let (outcome, estimate) = self.grow(sock, segments_acked);

        self.notify(sock, prev_cwnd, prev_ssthresh);

        if !matches!(outcome, CycleOutcome::Baseline | CycleOutcome::Pending) {
            if let Some(observer) = &self.observer {
                observer.on_cycle(&CycleReport {
                    outcome,
                    estimate,
                    cwnd: sock.cwnd(),
                    ssthresh: sock.ssthresh(),
                });
            }
        }

        outcome
    }

    /// Returns the slow start threshold to use after a loss, regardless of
    /// mode.
    pub fn on_loss(
        &self, current_cwnd: u32, segment_size: u32, current_ssthresh: u32,
    ) -> u32 {
        let ssthresh =
            loss_ssthresh(current_cwnd, segment_size, current_ssthresh);

        debug!(
            "{} on_loss cwnd={} ssthresh={} -> {}",
            self.trace_id, current_cwnd, current_ssthresh, ssthresh
        );

        ssthresh
    }

    fn grow(
        &mut self, sock: &mut dyn SocketState, segments_acked: u32,
    ) -> (CycleOutcome, Option<DelayEstimate>) {
        if self.mode == FastMode::Disabled {
            self.baseline.increase_window(sock, segments_acked);

            return (CycleOutcome::Baseline, None);
        }

        if sock.last_acked_sequence() < self.cycle_right_edge {
            return (CycleOutcome::Pending, None);
        }

        self.cycle_right_edge = sock.next_tx_sequence();

        let estimate = match self.estimate() {
            Some(estimate) => estimate,

            None => {
                debug!(
                    "{} {} rtt samples, falling back to baseline",
                    self.trace_id,
                    self.rtt.sample_count()
                );

                self.baseline.increase_window(sock, segments_acked);
                self.rtt.reset_cycle();

                return (CycleOutcome::InsufficientSamples, None);
            },
        };

        debug!("{} cycle finished {:?}", self.trace_id, estimate);

        let outcome = match self.cfg.control_law() {
            ControlLaw::Banded
                if estimate.queueing_delay < self.cfg.mi_threshold() =>
            {
                if sock.in_slow_start() {
                    self.baseline.slow_start(sock, segments_acked);
                } else {
                    let cwnd = sock.cwnd().saturating_add(sock.segment_size());
                    sock.set_cwnd(cwnd);
                }

                CycleOutcome::MultiplicativeIncrease
            },

            ControlLaw::Banded if !estimate.outside_band() =>
                CycleOutcome::Stable,

            ControlLaw::Banded | ControlLaw::Equilibrium =>
                self.apply_control_law(sock, &estimate, segments_acked),
        };

        self.previous_cwnd_segments = cwnd_segments(sock);
        self.rtt.reset_cycle();

        debug!(
            "{} {:?} cwnd={} ssthresh={}",
            self.trace_id,
            outcome,
            sock.cwnd(),
            sock.ssthresh()
        );

        (outcome, Some(estimate))
    }

    /// Delay statistics of the cycle that just ended, if they can be
    /// trusted.
    fn estimate(&self) -> Option<DelayEstimate> {
        if self.rtt.sample_count() <= MIN_RTT_SAMPLES {
            return None;
        }

        let avg_rtt = match self.cfg.avg_rtt_source() {
            AvgRttSource::CycleMin => self.rtt.min_rtt_in_cycle(),
            AvgRttSource::CycleMean => self.rtt.mean_rtt_in_cycle(),
        }?;

        DelayEstimate::new(
            self.rtt.base_rtt()?,
            avg_rtt,
            self.previous_cwnd_segments,
            &self.cfg,
        )
    }

    fn apply_control_law(
        &mut self, sock: &mut dyn SocketState, estimate: &DelayEstimate,
        segments_acked: u32,
    ) -> CycleOutcome {
        let target_segments = estimate
            .target_segments(self.previous_cwnd_segments, self.cfg.alpha());

        let gamma = self.cfg.gamma();
        let new_cwnd_segments =
            (1.0 - gamma) * cwnd_segments(sock) + gamma * target_segments;

        trace!(
            "{} control law target={} new_cwnd={}",
            self.trace_id,
            target_segments,
            new_cwnd_segments
        );

        if sock.in_slow_start() {
            self.baseline.slow_start(sock, segments_acked);
        } else {
            // Saturates at u32::MAX.
            let cwnd =
                (new_cwnd_segments * f64::from(sock.segment_size())) as u32;
            sock.set_cwnd(cwnd);
        }

        let floor = (u64::from(sock.cwnd()) * 3 / 4) as u32;
        let ssthresh = cmp::max(sock.ssthresh(), floor);
        sock.set_ssthresh(ssthresh);

        CycleOutcome::ControlLaw {
            target_segments,
            new_cwnd_segments,
        }
    }

    fn notify(
        &self, sock: &dyn SocketState, prev_cwnd: u32, prev_ssthresh: u32,
    ) {
        let observer = match &self.observer {
            Some(observer) => observer,
            None => return,
        };

        if sock.cwnd() != prev_cwnd {
            observer.on_cwnd_change(prev_cwnd, sock.cwnd());
        }

        if sock.ssthresh() != prev_ssthresh {
            observer.on_ssthresh_change(prev_ssthresh, sock.ssthresh());
        }
    }
}

impl<B: BaselineIncrease + Clone> Fast<B> {
    /// Returns an independent copy of the full state for a duplicated flow.
    pub fn fork(&self) -> Self {
        Fast {
            cfg: self.cfg.clone(),
            rtt: self.rtt.clone(),
            mode: self.mode,
            cycle_right_edge: self.cycle_right_edge,
            previous_cwnd_segments: self.previous_cwnd_segments,
            baseline: self.baseline.clone(),
            observer: self.observer.clone(),
            trace_id: self.trace_id.clone(),
        }
    }
}

impl<B> CongestionOps for Fast<B>
where
    B: BaselineIncrease + Clone + Send + 'static,
{
    fn name(&self) -> &'static str {
        "TcpFast"
    }

    fn pkts_acked(
        &mut self, _sock: &dyn SocketState, segments_acked: u32, rtt: Duration,
    ) {
        self.on_ack_sampled(rtt, segments_acked);
    }

    fn congestion_state_set(
        &mut self, sock: &dyn SocketState, new_state: CongState,
    ) {
        self.on_state_changed(sock, new_state);
    }

    fn increase_window(
        &mut self, sock: &mut dyn SocketState, segments_acked: u32,
    ) {
        self.on_window_grow(sock, segments_acked);
    }

    fn ssthresh(&self, sock: &dyn SocketState, _bytes_in_flight: u32) -> u32 {
        self.on_loss(sock.cwnd(), sock.segment_size(), sock.ssthresh())
    }

    fn fork(&self) -> Box<dyn CongestionOps> {
        Box::new(Fast::fork(self))
    }
}

impl<B: BaselineIncrease> std::fmt::Debug for Fast<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "mode={:?} ", self.mode)?;
        write!(f, "{:?} ", self.rtt)?;
        write!(f, "cycle_right_edge={} ", self.cycle_right_edge)?;
        write!(f, "previous_cwnd_segments={} ", self.previous_cwnd_segments)?;
        write!(f, "baseline={{{:?}}}", self.baseline)?;

        Ok(())
    }
}

fn cwnd_segments(sock: &dyn SocketState) -> f64 {
    match sock.segment_size() {
        0 => 0.0,
        mss => f64::from(sock.cwnd()) / f64::from(mss),
    }
}
