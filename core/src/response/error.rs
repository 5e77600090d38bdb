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

//! Transfer errors carried inside a response.

use std::fmt;
use std::io;

/// Numeric transfer codes. Values follow libcurl's `CURLcode` numbering so callers porting
/// code that switched on those numbers keep working.
pub mod codes {
    pub const UNSUPPORTED_PROTOCOL: i64 = 1;
    pub const FAILED_INIT: i64 = 2;
    pub const URL_MALFORMAT: i64 = 3;
    pub const COULDNT_RESOLVE_PROXY: i64 = 5;
    pub const COULDNT_RESOLVE_HOST: i64 = 6;
    pub const COULDNT_CONNECT: i64 = 7;
    pub const WEIRD_SERVER_REPLY: i64 = 8;
    pub const OPERATION_TIMEDOUT: i64 = 28;
    pub const SSL_CONNECT_ERROR: i64 = 35;
    pub const ABORTED_BY_CALLBACK: i64 = 42;
    pub const TOO_MANY_REDIRECTS: i64 = 47;
    pub const GOT_NOTHING: i64 = 52;
    pub const SEND_ERROR: i64 = 55;
    pub const RECV_ERROR: i64 = 56;
    pub const BAD_CONTENT_ENCODING: i64 = 61;
    pub const SSL_CACERT_BADFILE: i64 = 77;
}

/// Where the error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The exchange could not be completed (network, timeout, TLS, protocol).
    Transport,
    /// The exchange completed but the status code is not 2xx.
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferError {
    code: i64,
    message: String,
    kind: ErrorKind,
}

impl TransferError {
    pub fn transport(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            kind: ErrorKind::Transport,
        }
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self {
            code: i64::from(code),
            message: message.into(),
            kind: ErrorKind::Status,
        }
    }

    /// Map an I/O error from the socket layer to a transfer code.
    pub fn from_io(err: &io::Error) -> Self {
        let code = match err.kind() {
            io::ErrorKind::TimedOut => codes::OPERATION_TIMEDOUT,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::ConnectionAborted => codes::COULDNT_CONNECT,
            io::ErrorKind::BrokenPipe | io::ErrorKind::WriteZero => codes::SEND_ERROR,
            io::ErrorKind::InvalidData => codes::WEIRD_SERVER_REPLY,
            io::ErrorKind::Unsupported => codes::UNSUPPORTED_PROTOCOL,
            _ => codes::RECV_ERROR,
        };
        Self::transport(code, err.to_string())
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_transport(&self) -> bool {
        self.kind == ErrorKind::Transport
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Transport => write!(f, "transfer failed ({}): {}", self.code, self.message),
            ErrorKind::Status => write!(f, "HTTP {} {}", self.code, self.message),
        }
    }
}

impl std::error::Error for TransferError {}
