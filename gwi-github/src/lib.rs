//! gwi GitHub - issue tracker and project board integration
//!
//! All remote calls go through the `gh` CLI. This crate provides issue and
//! pull request operations plus the GitHub Projects status synchronizer.

mod client;
mod error;
mod graphql;
pub mod issues;
pub mod pr;
pub mod projects;

pub use client::GhClient;
pub use error::{Error, Result};
pub use issues::{Issue, IssueState};
pub use pr::{CheckStatus, PrState, PrSummary, PullRequest};
pub use projects::{BoardStatus, BoardUpdate, FieldCache, ProjectBoard, ProjectField, ProjectItem};
