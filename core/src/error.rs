/*
 * error.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Curlew, an HTTP client library.
 *
 * Curlew is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Curlew is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Curlew.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Pre-flight configuration errors.
//!
//! These are the only failures an executor returns to its caller. Everything that goes wrong
//! once a transfer has started is captured in the response instead (see `response::TransferError`).

use std::path::PathBuf;

use crate::response::error::codes;

/// Problems found in a request spec or in client configuration before any byte is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("request URI is not set")]
    MissingUri,

    #[error("invalid request URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid request method: {0:?}")]
    InvalidMethod(String),

    #[error("invalid header name: {0:?}")]
    InvalidHeader(String),

    #[error("a {0} request cannot carry a body")]
    UnexpectedBody(&'static str),

    #[error("cannot read CA bundle {path}: {reason}")]
    CaBundle { path: PathBuf, reason: String },

    #[error("invalid defaults file {path}: {reason}")]
    Defaults { path: PathBuf, reason: String },
}

impl ConfigError {
    /// Transfer error code used when this error has to be reported inside a response
    /// (batch entries never abort their siblings).
    pub fn transfer_code(&self) -> i64 {
        match self {
            ConfigError::UnsupportedScheme(_) => codes::UNSUPPORTED_PROTOCOL,
            ConfigError::CaBundle { .. } => codes::SSL_CACERT_BADFILE,
            ConfigError::MissingUri | ConfigError::InvalidUri { .. } => codes::URL_MALFORMAT,
            _ => codes::FAILED_INIT,
        }
    }
}
