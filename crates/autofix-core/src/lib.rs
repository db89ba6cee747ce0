// Copyright 2026 Autofix Tools Contributors
// SPDX-License-Identifier: Apache-2.0

//! Autofix core: shared plumbing for the operator automation tools.
//!
//! Configuration resolution, console output, interactive prompts and the
//! authenticated JSON transport used by both `a11y-autofix` and
//! `customer-repo-clone`.

pub mod config;
pub mod error;
pub mod http;
pub mod output;
pub mod prompt;

pub use config::Settings;
pub use error::{OpsError, Result, SRE_ROLE_HINT};
pub use http::{join_url, ApiClient};
pub use prompt::{choose_index, confirm, Prompter, ScriptedPrompter, TerminalPrompter};
