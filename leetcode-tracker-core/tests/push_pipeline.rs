use chrono::NaiveDate;
use leetcode_tracker_core::command::{Command, Reply};
use leetcode_tracker_core::contract::{KeyValueStore, MockIdentityExchange, RepoRef};
use leetcode_tracker_core::identity::{Identity, MemoryStore, TOKEN_KEY};
use leetcode_tracker_core::provision::{Provisioned, RepositorySettings};
use leetcode_tracker_core::push::{PushError, PushOrchestrator, PushState};
use leetcode_tracker_core::stats::StatsDocument;
use leetcode_tracker_core::status::PushStatus;
use leetcode_tracker_core::submission::Submission;
use leetcode_tracker_core::testkit::{InMemoryRemote, RemoteCall};

type Orchestrator = PushOrchestrator<InMemoryRemote, MemoryStore, MockIdentityExchange>;

fn fixed_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn two_sum() -> Submission {
    Submission {
        title: "Two Sum".into(),
        slug: "two-sum".into(),
        difficulty: Some("Easy".into()),
        topics: vec!["Array".into()],
        url: "https://leetcode.com/problems/two-sum/".into(),
        question_content: None,
        code: "...".into(),
        language: "python".into(),
        screenshot: None,
    }
}

fn repo() -> RepoRef {
    RepoRef::new("octocat", "leetcode-tracker")
}

async fn logged_in(remote: InMemoryRemote) -> Orchestrator {
    let store = MemoryStore::new();
    let orchestrator = PushOrchestrator::new(
        remote,
        store,
        MockIdentityExchange::new(),
        RepositorySettings::default(),
    )
    .with_clock(fixed_date);
    orchestrator
        .identities()
        .set_identity(Identity::new("tok", "octocat"))
        .await
        .unwrap();
    orchestrator
}

#[tokio::test]
async fn two_sum_against_empty_repository() {
    let remote = InMemoryRemote::new();
    let orchestrator = logged_in(remote.clone()).await;

    let report = orchestrator.push(&two_sum()).await.expect("push should succeed");

    assert_eq!(report.state, PushState::Done);
    assert_eq!(report.provisioned, Provisioned::Created);
    assert_eq!(report.repository, "octocat/leetcode-tracker");
    assert_eq!(
        report.stats,
        StatsDocument {
            easy: 1,
            medium: 0,
            hard: 0,
            total: 1
        }
    );

    // Seeds first, then artifacts, stats, README.
    assert_eq!(
        remote.put_paths(),
        vec![
            "README.md",
            "stats/summary.json",
            "problems/Easy/two-sum/meta.json",
            "problems/Easy/two-sum/solution.py",
            "stats/summary.json",
            "README.md",
        ]
    );

    let repo = repo();
    let stats: StatsDocument =
        serde_json::from_str(&remote.file_text(&repo, "stats/summary.json").unwrap()).unwrap();
    assert_eq!(stats, report.stats);

    let readme = remote.file_text(&repo, "README.md").unwrap();
    assert!(readme.contains("| Easy | 1 |"));
    assert!(readme.contains("| **Total** | **1** |"));
    assert!(readme.contains("2024-06-01"));

    let meta: serde_json::Value = serde_json::from_str(
        &remote
            .file_text(&repo, "problems/Easy/two-sum/meta.json")
            .unwrap(),
    )
    .unwrap();
    assert_eq!(meta["date"], "2024-06-01");
    assert_eq!(meta["difficulty"], "Easy");
}

#[tokio::test]
async fn second_push_accumulates_and_does_not_reprovision() {
    let remote = InMemoryRemote::new();
    let orchestrator = logged_in(remote.clone()).await;

    orchestrator.push(&two_sum()).await.unwrap();
    let hard = Submission {
        slug: "median-of-two-sorted-arrays".into(),
        title: "Median of Two Sorted Arrays".into(),
        difficulty: Some("HARD".into()),
        language: "cpp".into(),
        ..two_sum()
    };
    let report = orchestrator.push(&hard).await.unwrap();

    assert_eq!(report.provisioned, Provisioned::AlreadyPresent);
    assert_eq!(remote.create_repository_calls(), 1);
    assert_eq!(
        report.stats,
        StatsDocument {
            easy: 1,
            medium: 0,
            hard: 1,
            total: 2
        }
    );
    assert!(remote
        .paths(&repo())
        .contains(&"problems/Hard/median-of-two-sorted-arrays/solution.cpp".to_string()));
}

#[tokio::test]
async fn resubmitting_same_problem_updates_files_in_place() {
    let remote = InMemoryRemote::new();
    let orchestrator = logged_in(remote.clone()).await;

    orchestrator.push(&two_sum()).await.unwrap();
    let again = Submission {
        code: "class Solution: better".into(),
        ..two_sum()
    };
    orchestrator.push(&again).await.expect("update should succeed");

    assert_eq!(
        remote
            .file_text(&repo(), "problems/Easy/two-sum/solution.py")
            .as_deref(),
        Some("class Solution: better")
    );
}

#[tokio::test]
async fn failure_mid_upload_stops_before_stats() {
    let remote = InMemoryRemote::new();
    remote.fail_put_on("problems/Easy/two-sum/solution.py");
    let orchestrator = logged_in(remote.clone()).await;

    let failure = orchestrator.push(&two_sum()).await.unwrap_err();
    assert_eq!(failure.state, PushState::Failed);
    assert_eq!(failure.failed_in, PushState::UploadingArtifacts);
    assert!(failure.to_string().contains("uploading artifacts"));
    assert!(matches!(failure.source, PushError::ContentStore(_)));

    // meta.json stays; stats still hold the seeded zeros.
    let repo = repo();
    assert!(remote
        .paths(&repo)
        .contains(&"problems/Easy/two-sum/meta.json".to_string()));
    let stats: StatsDocument =
        serde_json::from_str(&remote.file_text(&repo, "stats/summary.json").unwrap()).unwrap();
    assert_eq!(stats, StatsDocument::default());
    assert_eq!(orchestrator.status().current(), PushStatus::Failed);
}

#[tokio::test]
async fn provisioning_error_aborts_before_any_write() {
    let remote = InMemoryRemote::new();
    remote.fail_repository_lookup();
    let orchestrator = logged_in(remote.clone()).await;

    let failure = orchestrator.push(&two_sum()).await.unwrap_err();
    assert_eq!(failure.state, PushState::Failed);
    assert_eq!(failure.failed_in, PushState::Provisioning);
    assert!(matches!(failure.source, PushError::Provision(_)));
    assert!(remote.put_paths().is_empty());
}

#[tokio::test]
async fn missing_token_aborts_without_remote_calls() {
    let remote = InMemoryRemote::new();
    let orchestrator = PushOrchestrator::new(
        remote.clone(),
        MemoryStore::new(),
        MockIdentityExchange::new(),
        RepositorySettings::default(),
    );

    let failure = orchestrator.push(&two_sum()).await.unwrap_err();
    assert_eq!(failure.failed_in, PushState::Idle);
    assert!(matches!(failure.source, PushError::NotAuthenticated));
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn unknown_difficulty_aborts_without_remote_calls() {
    let remote = InMemoryRemote::new();
    let orchestrator = logged_in(remote.clone()).await;
    let weird = Submission {
        difficulty: Some("Extreme".into()),
        ..two_sum()
    };

    let failure = orchestrator.push(&weird).await.unwrap_err();
    assert!(matches!(failure.source, PushError::Difficulty(_)));
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn unsafe_slugs_are_rejected_before_any_remote_call() {
    let remote = InMemoryRemote::new();
    let orchestrator = logged_in(remote.clone()).await;

    for slug in ["..", ".", "a/b", "a?b", "c#d", "50%", "two sum", "Two-Sum", "-x", "x--y"] {
        let submission = Submission {
            slug: slug.into(),
            ..two_sum()
        };
        let failure = orchestrator.push(&submission).await.unwrap_err();
        assert_eq!(failure.state, PushState::Failed, "{slug}");
        assert_eq!(failure.failed_in, PushState::Idle, "{slug}");
        assert!(
            matches!(failure.source, PushError::InvalidSubmission(_)),
            "{slug}: {:?}",
            failure.source
        );
    }
    assert!(remote.calls().is_empty());
    assert!(remote.paths(&repo()).is_empty());
}

#[tokio::test]
async fn token_only_identity_fetches_and_caches_username() {
    let remote = InMemoryRemote::new().with_user("octocat");
    let store = MemoryStore::new();
    store
        .set(TOKEN_KEY, serde_json::Value::String("tok".into()))
        .await
        .unwrap();
    let orchestrator = PushOrchestrator::new(
        remote.clone(),
        store,
        MockIdentityExchange::new(),
        RepositorySettings::default(),
    );

    orchestrator.push(&two_sum()).await.unwrap();
    assert_eq!(remote.calls()[0], RemoteCall::GetAuthenticatedUser);
    assert_eq!(
        orchestrator.identities().get_username().await.unwrap(),
        Some("octocat".to_string())
    );

    // Cached now: no second lookup.
    remote.clear_calls();
    orchestrator.push(&two_sum()).await.unwrap();
    assert!(!remote.calls().contains(&RemoteCall::GetAuthenticatedUser));
}

#[tokio::test]
async fn confirm_pushes_pending_then_becomes_a_no_op() {
    let remote = InMemoryRemote::new();
    let orchestrator = logged_in(remote.clone()).await;

    assert_eq!(
        orchestrator
            .dispatch(Command::SubmissionAccepted(two_sum()))
            .await,
        Reply::Captured {
            slug: "two-sum".into()
        }
    );
    assert_eq!(
        orchestrator.dispatch(Command::GetPendingSubmission).await,
        Reply::Pending(Some(two_sum()))
    );

    match orchestrator.dispatch(Command::PushConfirmed).await {
        Reply::Pushed(report) => assert_eq!(report.stats.total, 1),
        other => panic!("expected Pushed, got {other:?}"),
    }
    assert_eq!(
        orchestrator.dispatch(Command::GetPendingSubmission).await,
        Reply::Pending(None)
    );

    let puts_before = remote.put_paths().len();
    assert_eq!(
        orchestrator.dispatch(Command::PushConfirmed).await,
        Reply::NothingPending
    );
    assert_eq!(remote.put_paths().len(), puts_before);
}

#[tokio::test]
async fn failed_confirm_keeps_submission_pending() {
    let remote = InMemoryRemote::new();
    remote.fail_repository_lookup();
    let orchestrator = logged_in(remote).await;

    orchestrator.capture(two_sum());
    match orchestrator.dispatch(Command::PushConfirmed).await {
        Reply::PushFailed { failed_in, .. } => assert_eq!(failed_in, PushState::Provisioning),
        other => panic!("expected PushFailed, got {other:?}"),
    }
    assert!(orchestrator.pending().is_some());
}

#[tokio::test]
async fn deny_drops_pending_submission() {
    let remote = InMemoryRemote::new();
    let orchestrator = logged_in(remote.clone()).await;

    orchestrator.capture(two_sum());
    assert_eq!(
        orchestrator.dispatch(Command::PushDenied).await,
        Reply::Discarded {
            slug: Some("two-sum".into())
        }
    );
    assert_eq!(
        orchestrator.dispatch(Command::PushConfirmed).await,
        Reply::NothingPending
    );
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn second_capture_overwrites_the_first() {
    let orchestrator = logged_in(InMemoryRemote::new()).await;
    orchestrator.capture(two_sum());
    let three_sum = Submission {
        slug: "3sum".into(),
        title: "3Sum".into(),
        difficulty: Some("Medium".into()),
        ..two_sum()
    };
    orchestrator.capture(three_sum.clone());

    match orchestrator.dispatch(Command::PushConfirmed).await {
        Reply::Pushed(report) => {
            assert!(report
                .written
                .contains(&"problems/Medium/3sum/meta.json".to_string()));
            assert_eq!(report.stats.medium, 1);
            assert_eq!(report.stats.easy, 0);
        }
        other => panic!("expected Pushed, got {other:?}"),
    }
}

#[tokio::test]
async fn login_stores_identity_and_logout_clears_it() {
    let remote = InMemoryRemote::new().with_user("octocat");
    let mut exchange = MockIdentityExchange::new();
    exchange
        .expect_exchange_code()
        .withf(|code| code == "oauth-code")
        .times(1)
        .returning(|_| Ok("fresh-token".to_string()));
    let orchestrator = PushOrchestrator::new(
        remote,
        MemoryStore::new(),
        exchange,
        RepositorySettings::default(),
    );

    assert_eq!(
        orchestrator
            .dispatch(Command::LoginRequested {
                code: "oauth-code".into()
            })
            .await,
        Reply::LoggedIn {
            username: "octocat".into()
        }
    );
    assert_eq!(
        orchestrator.identities().get_identity().await.unwrap(),
        Some(Identity::new("fresh-token", "octocat"))
    );

    assert_eq!(orchestrator.dispatch(Command::Logout).await, Reply::LoggedOut);
    assert!(orchestrator.identities().get_identity().await.unwrap().is_none());
}

#[tokio::test]
async fn failed_exchange_stores_nothing() {
    let mut exchange = MockIdentityExchange::new();
    exchange
        .expect_exchange_code()
        .returning(|_| Err("no access_token in response".into()));
    let orchestrator = PushOrchestrator::new(
        InMemoryRemote::new(),
        MemoryStore::new(),
        exchange,
        RepositorySettings::default(),
    );

    match orchestrator
        .dispatch(Command::LoginRequested { code: "bad".into() })
        .await
    {
        Reply::LoginFailed { message } => assert!(message.contains("access_token")),
        other => panic!("expected LoginFailed, got {other:?}"),
    }
    assert!(orchestrator.identities().get_token().await.unwrap().is_none());
}
