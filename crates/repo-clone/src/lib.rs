// Copyright 2026 Autofix Tools Contributors
// SPDX-License-Identifier: Apache-2.0

//! Customer repository clone tool.
//!
//! Captures the headers of an SSO-authenticated browser session, lists a
//! Cloud Manager program's repositories through SSG, picks the customer's
//! main repository and runs its clone command into a central directory.

pub mod capture;
pub mod clone;
pub mod config;
pub mod filter;
pub mod repos;
pub mod workflow;

pub use capture::{AuthHeaders, CaptureTarget, ChromiumCapture, HeaderSource, StaticHeaders};
pub use config::CloneConfig;
pub use filter::{filter_repositories, MatchRule, RepoMatch};
pub use repos::{Repository, SsgClient};
pub use workflow::{run, Cloned};
