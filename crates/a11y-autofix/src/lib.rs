// Copyright 2026 Autofix Tools Contributors
// SPDX-License-Identifier: Apache-2.0

//! A11y autofix requestor.
//!
//! Finds a Spacecat accessibility suggestion for a site, uploads a source
//! archive of the local repository to S3 and queues a remediation request on
//! SQS once the operator confirms the message.

pub mod archive;
pub mod catalog;
pub mod config;
pub mod fakes;
pub mod message;
pub mod model;
pub mod queue;
pub mod select;
pub mod storage;
pub mod workflow;

pub use catalog::SpacecatClient;
pub use config::{AutofixConfig, AwsCredentials};
pub use message::{IssueEntry, WorkRequest};
pub use model::{Opportunity, Site, Suggestion, ValidSuggestion};
pub use queue::{MessageQueue, SqsQueue};
pub use storage::{ObjectStore, S3ObjectStore};
pub use workflow::{run, Backends, Dispatched, WorkflowArgs};
