// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operator impersonation: an elevated operator temporarily holds a user
//! session, with every start and end written to the audit log.

pub mod coordinator;
pub mod error;
pub mod types;

pub use coordinator::ImpersonationCoordinator;
pub use error::{ImpersonationError, ImpersonationResult};
pub use types::{EndOutcome, ImpersonationStatus, StartImpersonation, StartedImpersonation};
