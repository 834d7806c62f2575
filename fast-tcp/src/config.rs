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

use serde::Deserialize;
use serde::Serialize;
use serde_with::serde_as;
use serde_with::DurationMilliSeconds;

use crate::ConfigError;
use crate::Result;

/// Which control law runs at the end of each measurement cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlLaw {
    /// Multiplicative increase below the MI threshold, window update only
    /// when queue occupancy leaves the `[alpha, beta)` band (default).
    #[default]
    Banded,

    /// Always steer towards the equilibrium window, without MI mode or the
    /// occupancy band.
    Equilibrium,
}

/// How the per-cycle RTT fed into the control law is derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvgRttSource {
    /// The minimum sample of the cycle (default). Underestimates queueing
    /// delay, biasing the window towards growth.
    #[default]
    CycleMin,

    /// The arithmetic mean of the cycle's samples.
    CycleMean,
}

/// FAST TCP tunables, fixed for the lifetime of a flow.
///
/// Deserializes from any serde format; omitted fields take their defaults
/// and `mi_threshold` is given in milliseconds:
///
/// ```
/// let cfg: fast_tcp::Config =
///     serde_json::from_str(r#"{ "alpha": 100, "mi_threshold": 5 }"#)?;
///
/// assert_eq!(cfg.alpha(), 100);
/// assert_eq!(cfg.beta(), 400);
/// assert_eq!(cfg.mi_threshold(), std::time::Duration::from_millis(5));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Target number of packets buffered in the path.
    ///
    /// Defaults to 200.
    #[serde(default = "Config::default_alpha")]
    alpha: u32,

    /// Upper bound of the queue occupancy band, in packets.
    ///
    /// Defaults to 400.
    #[serde(default = "Config::default_beta")]
    beta: u32,

    /// Weight of the target window in the smoothed update.
    ///
    /// Defaults to 0.5.
    #[serde(default = "Config::default_gamma")]
    gamma: f64,

    /// Queueing delay below which the window grows multiplicatively.
    ///
    /// Defaults to 10ms.
    #[serde(default = "Config::default_mi_threshold")]
    #[serde_as(as = "DurationMilliSeconds")]
    mi_threshold: Duration,

    #[serde(default)]
    control_law: ControlLaw,

    #[serde(default)]
    avg_rtt_source: AvgRttSource,
}

impl Config {
    /// Creates a config object with default values.
    pub fn new() -> Self {
        Config {
            alpha: Self::default_alpha(),
            beta: Self::default_beta(),
            gamma: Self::default_gamma(),
            mi_threshold: Self::default_mi_threshold(),
            control_law: ControlLaw::default(),
            avg_rtt_source: AvgRttSource::default(),
        }
    }

    /// The configuration of the simpler equilibrium-only control law, with
    /// its own default `alpha` of 250 packets.
    pub fn equilibrium() -> Self {
        Config {
            alpha: 250,
            beta: 250,
            control_law: ControlLaw::Equilibrium,
            ..Config::new()
        }
    }

    fn default_alpha() -> u32 {
        200
    }

    fn default_beta() -> u32 {
        400
    }

    fn default_gamma() -> f64 {
        0.5
    }

    fn default_mi_threshold() -> Duration {
        Duration::from_millis(10)
    }

    pub fn alpha(&self) -> u32 {
        self.alpha
    }

    pub fn beta(&self) -> u32 {
        self.beta
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn mi_threshold(&self) -> Duration {
        self.mi_threshold
    }

    pub fn control_law(&self) -> ControlLaw {
        self.control_law
    }

    pub fn avg_rtt_source(&self) -> AvgRttSource {
        self.avg_rtt_source
    }

    /// Sets the target number of packets buffered in the path.
    ///
    /// The default value is `200`.
    pub fn set_alpha(&mut self, v: u32) {
        self.alpha = v;
    }

    /// Sets the upper bound of the queue occupancy band.
    ///
    /// The default value is `400`. Must not be smaller than `alpha`.
    pub fn set_beta(&mut self, v: u32) {
        self.beta = v;
    }

    /// Sets the smoothing weight of the target window.
    ///
    /// The default value is `0.5`. Must lie in `[0, 1]`.
    pub fn set_gamma(&mut self, v: f64) {
        self.gamma = v;
    }

    /// Sets the multiplicative increase threshold.
    ///
    /// The default value is 10ms.
    pub fn set_mi_threshold(&mut self, v: Duration) {
        self.mi_threshold = v;
    }

    pub fn set_control_law(&mut self, v: ControlLaw) {
        self.control_law = v;
    }

    pub fn set_avg_rtt_source(&mut self, v: AvgRttSource) {
        self.avg_rtt_source = v;
    }

    /// Checks the tunables are consistent with each other.
    pub fn validate(&self) -> Result<()> {
        if self.beta < self.alpha {
            return Err(ConfigError::BetaBelowAlpha {
                alpha: self.alpha,
                beta: self.beta,
            }
            .into());
        }

        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(ConfigError::GammaOutOfRange(self.gamma).into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
