/*
 * status.rs
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

//! Status-description lookup, injected into response assembly.

/// Resolves an HTTP status code to a human-readable description.
pub trait StatusLookup: Send + Sync {
    /// Description for `code`, or `None` if the lookup does not know it.
    fn describe(&self, code: u16) -> Option<String>;
}

/// Canonical reason phrases from the IANA registry (via the `http` crate).
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalReasons;

impl StatusLookup for CanonicalReasons {
    fn describe(&self, code: u16) -> Option<String> {
        http::StatusCode::from_u16(code)
            .ok()
            .and_then(|status| status.canonical_reason())
            .map(str::to_string)
    }
}

impl<F> StatusLookup for F
where
    F: Fn(u16) -> Option<String> + Send + Sync,
{
    fn describe(&self, code: u16) -> Option<String> {
        self(code)
    }
}
