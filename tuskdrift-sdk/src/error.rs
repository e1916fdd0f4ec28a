// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Umbrella error type for the facade crate, following
//! `agentreplay-client`'s single `#[from]`-per-subsystem error enum.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error(transparent)]
    Core(#[from] tuskdrift_core::CoreError),

    #[error(transparent)]
    Export(#[from] tuskdrift_export::ExportError),

    #[error(transparent)]
    Transport(#[from] tuskdrift_transport::TransportError),

    #[error(transparent)]
    Transform(#[from] tuskdrift_transform::TransformError),

    #[error(transparent)]
    Http(#[from] tuskdrift_http::HttpDriverError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("malformed x-td-env-vars header: {0}")]
    InvalidEnvHeader(String),
}

pub type Result<T> = std::result::Result<T, SdkError>;
