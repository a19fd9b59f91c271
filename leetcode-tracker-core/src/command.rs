//! Inbound messages from the capture layer and the replies they produce.
//!
//! On the wire a command is `{"type": "<TAG>", "payload": ...}`, with the
//! payload omitted for commands that carry none.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::contract::{IdentityExchange, KeyValueStore, RemoteApi};
use crate::push::{PushOrchestrator, PushReport, PushState};
use crate::submission::Submission;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    /// A solution was accepted; park it until the user decides.
    #[serde(rename = "LEETCODE_ACCEPTED")]
    SubmissionAccepted(Submission),
    #[serde(rename = "USER_CONFIRMED_PUSH")]
    PushConfirmed,
    #[serde(rename = "USER_DENIED_PUSH")]
    PushDenied,
    #[serde(rename = "GET_PENDING_PROBLEM")]
    GetPendingSubmission,
    /// OAuth redirect finished with `code`.
    #[serde(rename = "LOGIN_GITHUB")]
    LoginRequested { code: String },
    #[serde(rename = "LOGOUT")]
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reply {
    Captured { slug: String },
    Pending(Option<Submission>),
    Pushed(PushReport),
    NothingPending,
    PushFailed { failed_in: PushState, message: String },
    Discarded { slug: Option<String> },
    LoggedIn { username: String },
    LoginFailed { message: String },
    LoggedOut,
    LogoutFailed { message: String },
}

impl<A, S, X> PushOrchestrator<A, S, X>
where
    A: RemoteApi,
    S: KeyValueStore,
    X: IdentityExchange,
{
    pub async fn dispatch(&self, command: Command) -> Reply {
        match command {
            Command::SubmissionAccepted(submission) => {
                let slug = submission.slug.clone();
                self.capture(submission);
                Reply::Captured { slug }
            }
            Command::PushConfirmed => match self.confirm().await {
                Ok(Some(report)) => Reply::Pushed(report),
                Ok(None) => Reply::NothingPending,
                Err(failure) => Reply::PushFailed {
                    failed_in: failure.failed_in,
                    message: failure.source.to_string(),
                },
            },
            Command::PushDenied => Reply::Discarded {
                slug: self.deny().map(|submission| submission.slug),
            },
            Command::GetPendingSubmission => {
                Reply::Pending(self.pending().map(|pending| pending.submission))
            }
            Command::LoginRequested { code } => match self.login(&code).await {
                Ok(identity) => Reply::LoggedIn {
                    username: identity.username,
                },
                Err(e) => Reply::LoginFailed {
                    message: e.to_string(),
                },
            },
            Command::Logout => match self.logout().await {
                Ok(()) => {
                    info!("Logged out");
                    Reply::LoggedOut
                }
                Err(e) => Reply::LogoutFailed {
                    message: e.to_string(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_commands_parse_without_payload() {
        let command: Command = serde_json::from_str(r#"{"type":"USER_CONFIRMED_PUSH"}"#).unwrap();
        assert_eq!(command, Command::PushConfirmed);
        let command: Command = serde_json::from_str(r#"{"type":"GET_PENDING_PROBLEM"}"#).unwrap();
        assert_eq!(command, Command::GetPendingSubmission);
    }

    #[test]
    fn login_carries_code() {
        let command: Command =
            serde_json::from_str(r#"{"type":"LOGIN_GITHUB","payload":{"code":"abc"}}"#).unwrap();
        assert_eq!(
            command,
            Command::LoginRequested {
                code: "abc".into()
            }
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(serde_json::from_str::<Command>(r#"{"type":"CAPTURE_SCREENSHOT"}"#).is_err());
    }

    #[test]
    fn replies_are_tagged() {
        let value = serde_json::to_value(Reply::Discarded { slug: None }).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "DISCARDED", "payload": {"slug": null}})
        );
        let value = serde_json::to_value(Reply::LoggedOut).unwrap();
        assert_eq!(value, serde_json::json!({"type": "LOGGED_OUT"}));
    }
}
