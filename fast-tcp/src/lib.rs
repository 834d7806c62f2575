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

//! Delay-based FAST TCP congestion control.
//!
//! fast-tcp implements the window decision a congestion control module
//! contributes to a TCP sender. It does not send packets, keep timers or
//! detect loss: the host transport does, and calls into this crate at a
//! handful of well-defined points.
//!
//! ## Driving the algorithm
//!
//! The host owns the congestion window, slow start threshold and sequence
//! space, and exposes them through the [`SocketState`] trait (or uses the
//! provided [`TcpSocketState`]):
//!
//! ```
//! use std::time::Duration;
//!
//! use fast_tcp::CongState;
//! use fast_tcp::Config;
//! use fast_tcp::Fast;
//! use fast_tcp::TcpSocketState;
//!
//! let mut sock = TcpSocketState::new(1448, 10)?;
//! let mut fast = Fast::new(Config::new())?;
//!
//! // The flow enters normal operation.
//! sock.on_sent(10 * 1448);
//! fast.on_state_changed(&sock, CongState::Open);
//!
//! // On every ACK: feed the RTT sample, then let the window grow.
//! sock.on_acked(sock.last_acked_sequence + 1448);
//! fast.on_ack_sampled(Duration::from_millis(42), 1);
//! fast.on_window_grow(&mut sock, 1);
//!
//! // On loss the host asks for a new threshold.
//! let ssthresh = fast.on_loss(sock.cwnd, 1448, sock.ssthresh);
//! assert!(ssthresh >= 2 * 1448);
//! # Ok::<(), fast_tcp::Error>(())
//! ```
//!
//! Hosts that switch algorithms at runtime can go through the
//! [`CongestionOps`] trait object returned by [`new_congestion_control()`]
//! instead.
//!
//! ## Logging
//!
//! Hook invocations are logged at `trace` level and control law decisions at
//! `debug` level through the [`log`] facade.
//!
//! [`log`]: https://docs.rs/log

#[macro_use]
extern crate log;

mod config;
mod error;
mod seq;
mod socket;

pub mod congestion;

pub use crate::config::AvgRttSource;
pub use crate::config::Config;
pub use crate::config::ControlLaw;

pub use crate::error::ConfigError;
pub use crate::error::Error;
pub use crate::error::Result;

pub use crate::seq::SeqNum;

pub use crate::socket::CongState;
pub use crate::socket::SocketState;
pub use crate::socket::TcpSocketState;

pub use crate::congestion::new_congestion_control;
pub use crate::congestion::Algorithm;
pub use crate::congestion::BaselineIncrease;
pub use crate::congestion::CongestionOps;
pub use crate::congestion::CycleOutcome;
pub use crate::congestion::Fast;
pub use crate::congestion::FastMode;
pub use crate::congestion::NewReno;
pub use crate::congestion::WindowObserver;
