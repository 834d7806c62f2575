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

/// A specialized [`Result`] type for fast-tcp operations.
///
/// [`Result`]: https://doc.rust-lang.org/std/result/enum.Result.html
pub type Result<T> = std::result::Result<T, Error>;

/// A congestion control error.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// The supplied configuration was rejected before the flow could send
    /// any data.
    #[error("invalid congestion control configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The congestion control algorithm name is not known.
    #[error("unknown congestion control algorithm {0:?}")]
    UnknownAlgorithm(String),
}

/// The reason a [`Config`] or socket state was rejected.
///
/// [`Config`]: crate::Config
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `beta` is smaller than `alpha`.
    #[error("beta ({beta}) must not be smaller than alpha ({alpha})")]
    BetaBelowAlpha { alpha: u32, beta: u32 },

    /// `gamma` is NaN or outside of `[0, 1]`.
    #[error("gamma ({0}) must lie in [0, 1]")]
    GammaOutOfRange(f64),

    /// The segment size is zero.
    #[error("segment size must be positive")]
    ZeroSegmentSize,
}
