#![doc = "leetcode-tracker-core: core push pipeline for leetcode-tracker."]

//! This crate contains the business logic for publishing accepted solutions
//! to a hosted repository: the content-store client, repository provisioning,
//! artifact upload, stats and README maintenance, and the push orchestrator.
//! Network transport lives behind [`contract::RemoteApi`]; the concrete
//! GitHub client is in the `leetcode-tracker` crate.
//!
//! # Usage
//! Build a [`push::PushOrchestrator`] from a `RemoteApi`, a
//! `KeyValueStore` and an `IdentityExchange`, then feed it
//! [`command::Command`]s or call `push` directly.

pub mod artifacts;
pub mod command;
pub mod content_store;
pub mod contract;
pub mod identity;
pub mod pending;
pub mod provision;
pub mod push;
pub mod readme;
pub mod stats;
pub mod status;
pub mod submission;
#[cfg(any(test, feature = "test-export-mocks"))]
pub mod testkit;
