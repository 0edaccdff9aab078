use httpmock::prelude::*;
use review_moderation::{
    Backend, ConfiguredInvoker, ModerationOrchestrator, ModerationSettings, ProcessSettings,
    Recommendation, RemoteSettings, TomlConfig,
};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn remote_orchestrator(server: &MockServer) -> ModerationOrchestrator<ConfiguredInvoker> {
    let settings = ModerationSettings::new(Backend::Remote(
        RemoteSettings::new(server.url("/predict")).with_timeout(Duration::from_secs(5)),
    ));
    ModerationOrchestrator::from_settings(&settings).unwrap()
}

#[tokio::test]
async fn test_remote_reject_scenario() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/predict");
            then.status(200)
                .json_body(serde_json::json!({"label": 2, "probability": 0.77}));
        })
        .await;

    let decision = remote_orchestrator(&server)
        .moderate("Ужасный товар, полное разочарование!")
        .await;

    assert_eq!(decision.recommendation, Recommendation::Reject);
    assert_eq!(decision.confidence_score, 0.77);
    assert_eq!(decision.original_text, "Ужасный товар, полное разочарование!");
}

#[tokio::test]
async fn test_remote_empty_object_scenario() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/predict");
            then.status(200).json_body(serde_json::json!({}));
        })
        .await;

    let decision = remote_orchestrator(&server).moderate("Обычный товар").await;

    assert_eq!(decision.recommendation, Recommendation::ManualReview);
    assert_eq!(decision.confidence_score, 0.0);
}

#[tokio::test]
async fn test_remote_unavailable_is_fail_safe() {
    let server = MockServer::start_async().await;
    let predict_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/predict");
            then.status(503);
        })
        .await;

    let settings = ModerationSettings::new(Backend::Remote(
        RemoteSettings::new(server.url("/predict")).with_timeout(Duration::from_secs(5)),
    ))
    .with_retries(2, Duration::from_millis(10));
    let orchestrator = ModerationOrchestrator::from_settings(&settings).unwrap();

    let decision = orchestrator.moderate("text").await;

    assert!(decision.is_fail_safe());
    predict_mock.assert_hits_async(3).await;
}

#[cfg(unix)]
mod process_backend {
    use super::*;

    fn orchestrator_for(script: &str, deadline: Duration) -> (TempDir, ModerationOrchestrator<ConfiguredInvoker>) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("run_model.sh"), script).unwrap();
        let settings = ModerationSettings::new(Backend::Process(
            ProcessSettings::new("run_model.sh", dir.path())
                .with_interpreter("sh")
                .with_deadline(deadline),
        ));
        let orchestrator = ModerationOrchestrator::from_settings(&settings).unwrap();
        (dir, orchestrator)
    }

    #[tokio::test]
    async fn test_approve_scenario() {
        let (_dir, orchestrator) = orchestrator_for(
            "printf '{\\n    \"label\": 1,\\n    \"probability\": 0.92\\n}\\n'\n",
            Duration::from_secs(10),
        );

        let decision = orchestrator.moderate("Отличный продукт!").await;

        assert_eq!(decision.recommendation, Recommendation::Approve);
        assert_eq!(decision.confidence_score, 0.92);
    }

    #[tokio::test]
    async fn test_exit_code_one_scenario() {
        let (_dir, orchestrator) =
            orchestrator_for("echo 'model crashed' >&2\nexit 1\n", Duration::from_secs(10));

        let decision = orchestrator.moderate("text").await;

        assert_eq!(decision.recommendation, Recommendation::ManualReview);
        assert_eq!(decision.confidence_score, 0.0);
    }

    #[tokio::test]
    async fn test_deadline_scenario() {
        let deadline = Duration::from_millis(500);
        let (_dir, orchestrator) = orchestrator_for("exec sleep 30\n", deadline);

        let started = Instant::now();
        let decision = orchestrator.moderate("text").await;

        assert!(started.elapsed() < deadline + Duration::from_secs(3));
        assert_eq!(decision.recommendation, Recommendation::ManualReview);
        assert_eq!(decision.confidence_score, 0.0);
    }

    #[tokio::test]
    async fn test_non_json_output_is_fail_safe() {
        let (_dir, orchestrator) = orchestrator_for(
            "echo 'Traceback (most recent call last):'\n",
            Duration::from_secs(10),
        );

        let decision = orchestrator.moderate("text").await;

        assert!(decision.is_fail_safe());
    }

    #[test]
    fn test_missing_script_prevents_startup() {
        let dir = TempDir::new().unwrap();
        let settings = ModerationSettings::new(Backend::Process(ProcessSettings::new(
            "run_model.py",
            dir.path(),
        )));

        let err = match ModerationOrchestrator::from_settings(&settings) {
            Ok(_) => panic!("startup should fail without a model script"),
            Err(e) => e,
        };
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_toml_configured_process_backend() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("run_model.sh"),
            "printf '{\"label\": 0, \"probability\": 0.51}'\n",
        )
        .unwrap();

        let toml_content = format!(
            r#"
[service]
name = "moderation-test"

[model]
backend = "process"
timeout_seconds = 10

[model.process]
script_path = "run_model.sh"
working_directory = "{}"
interpreter = "sh"
"#,
            dir.path().display()
        );

        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        let orchestrator = ModerationOrchestrator::from_config(&config).unwrap();
        tokio_test::assert_ok!(orchestrator.check_ready().await);

        let decision = orchestrator.moderate("Обычный товар, ничего особенного").await;

        assert_eq!(decision.recommendation, Recommendation::ManualReview);
        assert_eq!(decision.confidence_score, 0.51);
    }
}
