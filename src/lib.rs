//! leetcode-tracker: GitHub transport, persisted identity, configuration and
//! the command line around `leetcode-tracker-core`.

pub mod cli;
pub mod github;
pub mod load_config;
pub mod oauth;
pub mod storage;
