// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-request identity: [`SessionResolver`] for the principal,
//! [`CookieSettings`] for the cookies that carry it, and [`ClientInfo`] for
//! where the request came from.

pub mod client_info;
pub mod cookies;
pub mod resolver;

pub use client_info::ClientInfo;
pub use cookies::{CookieSettings, DEFAULT_IMPERSONATION_COOKIE_NAME, DEFAULT_SESSION_COOKIE_NAME};
pub use resolver::{ResolvedSession, SessionResolver};
