use async_trait::async_trait;
use intake_bot::core::Presenter;
use intake_bot::{
    InMemorySessionStore, InboundEvent, IntakeBot, IntakeEngine, IntakeError, IntakeState,
    LocalStorage, OutboundAction, PersistenceSink, Result, TomlConfig,
};
use std::sync::Mutex;
use tempfile::TempDir;

const TINY_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

#[derive(Default)]
struct RecordingPresenter {
    sent: Mutex<Vec<OutboundAction>>,
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn present(&self, action: OutboundAction) -> Result<()> {
        self.sent.lock().unwrap().push(action);
        Ok(())
    }
}

struct FailingPresenter;

#[async_trait]
impl Presenter for FailingPresenter {
    async fn present(&self, _action: OutboundAction) -> Result<()> {
        Err(IntakeError::DeliveryFailure {
            message: "chat unavailable".to_string(),
        })
    }
}

fn config_for(dir: &TempDir) -> TomlConfig {
    let toml_content = format!(
        r#"
[bot]
name = "dispatch-test"
web_app_url = "https://sign.example.com/pad"

[storage]
signatures_dir = '{0}/sig'
records_dir = '{0}/rec'
"#,
        dir.path().display()
    );
    TomlConfig::from_toml_str(&toml_content).unwrap()
}

#[tokio::test]
async fn test_dispatch_delivers_every_reply_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_for(&temp_dir);
    let engine = IntakeEngine::from_config(
        LocalStorage::default(),
        InMemorySessionStore::new(),
        &config,
    );
    let bot = IntakeBot::new(engine, RecordingPresenter::default());

    let events = vec![
        InboundEvent::text("9", "/start"),
        InboundEvent::text("9", "Ivanov Ivan"),
        InboundEvent::text("9", "15.05.1990"),
        InboundEvent::text("9", "+77071234567"),
        InboundEvent::text("9", "123456789012"),
    ];
    for event in events {
        bot.dispatch(event).await.unwrap();
    }

    let state = bot
        .dispatch(InboundEvent::signature(
            "9",
            serde_json::json!({"type": "signature_saved", "image": TINY_PNG, "timestamp": 1700000000000u64})
                .to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(state, Some(IntakeState::Completed));

    let sent = bot.presenter().sent.lock().unwrap();
    assert_eq!(sent.len(), 6);
    assert!(matches!(sent[0], OutboundAction::SendText { .. }));
    match &sent[4] {
        OutboundAction::ShowSignatureButton { url, .. } => {
            assert_eq!(url, "https://sign.example.com/pad")
        }
        other => panic!("expected the signature button, got {:?}", other),
    }
    assert!(matches!(sent[5], OutboundAction::SendPhoto { .. }));

    assert!(temp_dir
        .path()
        .join("sig/signature_9_1700000000000.png")
        .exists());
    assert!(temp_dir
        .path()
        .join("rec/user_data_9_1700000000000.json")
        .exists());
}

#[tokio::test]
async fn test_delivery_failure_is_reported_after_state_change() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_string_lossy());
    let sink = PersistenceSink::new(storage, "signatures", "records");
    let engine = IntakeEngine::new(InMemorySessionStore::new(), sink, "https://sign.example.com");
    let bot = IntakeBot::new(engine, FailingPresenter);

    let err = bot
        .dispatch(InboundEvent::text("9", "/start"))
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::DeliveryFailure { .. }));
    assert_eq!(
        bot.engine().state_of(&"9".into()),
        Some(IntakeState::AwaitingName)
    );
}
