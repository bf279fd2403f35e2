//! End-to-end runs of the nuke driver against the fake cloud

mod test_utils;

use gcp_nuke::config::{ConfigError, NukeConfig};
use gcp_nuke::nuke::{ItemState, Nuke, NukeParameters};
use gcp_nuke::prompt::Confirm;
use gcp_nuke::NukeError;
use gcp_nuke_test_utils::{FakeCloud, FakeSpec, RemoveBehavior, all_capabilities, test_project};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{BUCKET, INSTANCE, registry, reporter};

/// Answers every confirmation with the same text
#[derive(Clone)]
struct Answer {
    text: &'static str,
    asked: Arc<AtomicUsize>,
}

impl Answer {
    fn new(text: &'static str) -> Self {
        Self {
            text,
            asked: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl Confirm for Answer {
    fn read_answer(&self) -> io::Result<String> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.to_string())
    }
}

const CONFIG: &str = r#"
project-restricted-list: [prod]
projects:
  dev:
    filters:
      Bucket:
        - keep-me
  prod: {}
"#;

fn config() -> NukeConfig {
    serde_yaml::from_str(CONFIG).unwrap()
}

fn cloud() -> FakeCloud {
    let cloud = FakeCloud::new();
    cloud.add(BUCKET, FakeSpec::new("logs"));
    cloud.add(BUCKET, FakeSpec::new("keep-me"));
    cloud.add(INSTANCE, FakeSpec::new("web-1"));
    cloud
}

fn real_run() -> NukeParameters {
    NukeParameters {
        no_dry_run: true,
        pass_delay: Duration::ZERO,
        ..Default::default()
    }
}

fn nuke(cloud: &FakeCloud, parameters: NukeParameters, project: &str, answer: &Answer) -> Nuke {
    Nuke::new(
        parameters,
        config(),
        Arc::new(registry(cloud, all_capabilities())),
        test_project(project),
    )
    .with_confirm(answer.clone())
    .with_reporter(reporter())
}

#[tokio::test]
async fn test_dry_run_removes_nothing() {
    let cloud = cloud();
    let answer = Answer::new("dev");
    let nuke = nuke(&cloud, NukeParameters::default(), "dev", &answer);

    let report = nuke.run().await.unwrap();

    assert!(report.removal.is_none());
    assert_eq!(report.queue.count(&[ItemState::New]), 2);
    assert_eq!(report.queue.count(&[ItemState::Filtered]), 1);
    assert_eq!(cloud.remove_calls("logs"), 0);
    assert_eq!(answer.asked(), 1);
    assert_eq!(nuke.project().client_count(), 0);
}

#[tokio::test]
async fn test_real_run_removes_everything_not_filtered() {
    let cloud = cloud();
    let answer = Answer::new("dev");
    let nuke = nuke(&cloud, real_run(), "dev", &answer);

    let report = nuke.run().await.unwrap();

    assert_eq!(report.removal.map(|r| r.passes), Some(3));
    assert_eq!(report.queue.count(&[ItemState::Finished]), 2);
    assert!(cloud.contains(BUCKET, "keep-me"));
    assert!(!cloud.contains(BUCKET, "logs"));
    assert!(!cloud.contains(INSTANCE, "web-1"));
    assert_eq!(answer.asked(), 2);
    assert_eq!(nuke.project().client_count(), 0);
}

#[tokio::test]
async fn test_nothing_to_delete() {
    let cloud = FakeCloud::new();
    cloud.add(BUCKET, FakeSpec::new("keep-me"));
    let answer = Answer::new("dev");
    let nuke = nuke(&cloud, real_run(), "dev", &answer);

    let report = nuke.run().await.unwrap();

    assert!(report.removal.is_none());
    assert_eq!(answer.asked(), 1);
    assert_eq!(cloud.remove_calls("keep-me"), 0);
}

#[tokio::test]
async fn test_wrong_answer_aborts_before_scan() {
    let cloud = cloud();
    let answer = Answer::new("prod");
    let nuke = nuke(&cloud, real_run(), "dev", &answer);

    let err = nuke.run().await.unwrap_err();

    assert!(matches!(err, NukeError::Aborted));
    assert_eq!(cloud.list_calls(BUCKET), 0);
}

#[tokio::test]
async fn test_restricted_project_rejected() {
    let cloud = cloud();
    let answer = Answer::new("prod");
    let nuke = nuke(&cloud, real_run(), "prod", &answer);

    let err = nuke.run().await.unwrap_err();

    assert!(matches!(
        err,
        NukeError::Config(ConfigError::RestrictedProject(ref p)) if p == "prod"
    ));
    assert_eq!(answer.asked(), 0);
    assert_eq!(cloud.list_calls(BUCKET), 0);
}

#[tokio::test]
async fn test_unknown_project_rejected() {
    let cloud = cloud();
    let answer = Answer::new("staging");
    let nuke = nuke(&cloud, real_run(), "staging", &answer);

    let err = nuke.run().await.unwrap_err();

    assert!(matches!(err, NukeError::Config(ConfigError::UnknownProject(_))));
}

#[tokio::test]
async fn test_force_sleep_too_short_for_real_run() {
    let cloud = cloud();
    let answer = Answer::new("dev");
    let parameters = NukeParameters {
        force: true,
        force_sleep: Duration::from_secs(1),
        ..real_run()
    };
    let nuke = nuke(&cloud, parameters, "dev", &answer);

    let err = nuke.run().await.unwrap_err();

    assert!(matches!(
        err,
        NukeError::Config(ConfigError::ForceSleepTooShort { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_force_skips_confirmation() {
    let cloud = cloud();
    let answer = Answer::new("wrong");
    let parameters = NukeParameters {
        force: true,
        ..real_run()
    };
    let nuke = nuke(&cloud, parameters, "dev", &answer);

    let report = nuke.run().await.unwrap();

    assert!(report.removal.is_some());
    assert_eq!(answer.asked(), 0);
}

#[tokio::test]
async fn test_stalled_run_still_closes_clients() {
    let cloud = FakeCloud::new();
    cloud.add(BUCKET, FakeSpec::new("logs").with_behavior(RemoveBehavior::Fail));
    let answer = Answer::new("dev");
    let nuke = nuke(&cloud, real_run(), "dev", &answer);

    let err = nuke.run().await.unwrap_err();

    assert!(matches!(err, NukeError::Stalled { passes: 2, .. }));
    assert_eq!(nuke.project().client_count(), 0);
}
