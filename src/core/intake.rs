use crate::core::messages;
use crate::core::persistence::PersistenceSink;
use crate::domain::model::{
    InboundEvent, IntakeState, OutboundAction, StepOutcome, UserId, UserSession,
};
use crate::domain::ports::{ConfigProvider, SessionStore, Storage};
use crate::utils::error::{IntakeError, Result};
use crate::utils::validation::{
    parse_signature_payload, validate_birth_date, validate_fio, validate_iin, validate_phone,
    validate_user_id,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
    Help,
    Unknown(String),
}

impl Command {
    /// Returns `None` for plain text. `/start@my_bot` style suffixes are
    /// accepted.
    pub fn parse(text: &str) -> Option<Command> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        Some(match name {
            "start" => Command::Start,
            "cancel" => Command::Cancel,
            "help" => Command::Help,
            other => Command::Unknown(other.to_string()),
        })
    }
}

/// The five-step intake state machine.
///
/// Each inbound event runs under a per-user lock, so events of one user are
/// applied one at a time while different users proceed independently.
pub struct IntakeEngine<S: Storage, St: SessionStore> {
    sessions: St,
    sink: PersistenceSink<S>,
    web_app_url: String,
    user_locks: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S: Storage, St: SessionStore> IntakeEngine<S, St> {
    pub fn new(sessions: St, sink: PersistenceSink<S>, web_app_url: impl Into<String>) -> Self {
        Self {
            sessions,
            sink,
            web_app_url: web_app_url.into(),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config<C: ConfigProvider>(storage: S, sessions: St, config: &C) -> Self {
        let sink = PersistenceSink::from_config(storage, config);
        Self::new(sessions, sink, config.web_app_url())
    }

    pub fn sessions(&self) -> &St {
        &self.sessions
    }

    /// Current state of a user's intake, `None` if none is in progress.
    pub fn state_of(&self, user_id: &UserId) -> Option<IntakeState> {
        self.sessions.get(user_id).map(|s| s.state)
    }

    pub async fn handle(&self, event: InboundEvent) -> StepOutcome {
        let user_id = event.user_id().clone();
        if let Err(e) = validate_user_id(&user_id) {
            tracing::warn!("Ignoring event: {}", e);
            return StepOutcome {
                state: None,
                actions: vec![OutboundAction::SendText {
                    user_id,
                    text: e.user_friendly_message(),
                }],
            };
        }
        let lock = self.user_lock(&user_id);

        let outcome = {
            let _guard = lock.lock().await;
            match event {
                InboundEvent::TextMessage { text, .. } => match Command::parse(&text) {
                    Some(Command::Start) => self.start(&user_id),
                    Some(Command::Cancel) => self.cancel(&user_id),
                    Some(Command::Help) => self.reply(&user_id, messages::HELP),
                    Some(Command::Unknown(name)) => {
                        tracing::debug!("Unknown command /{} from user {}", name, user_id);
                        self.reply(&user_id, messages::UNKNOWN_COMMAND)
                    }
                    None => self.accept_text(&user_id, &text),
                },
                InboundEvent::SignaturePayload { json_string, .. } => {
                    self.accept_signature(&user_id, &json_string).await
                }
            }
        };

        drop(lock);
        self.release_user_lock(&user_id);
        outcome
    }

    fn user_lock(&self, user_id: &UserId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.user_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(user_id.clone()).or_default().clone()
    }

    fn release_user_lock(&self, user_id: &UserId) {
        let mut locks = self.user_locks.lock().unwrap_or_else(PoisonError::into_inner);
        // the map holds the last reference once no event for this user is in flight
        if locks
            .get(user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(user_id);
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_users(&self) -> usize {
        self.user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn start(&self, user_id: &UserId) -> StepOutcome {
        if let Some(previous) = self.sessions.remove(user_id) {
            tracing::info!(
                "🔄 User {} restarted intake, discarding progress at {}",
                user_id,
                previous.state
            );
        } else {
            tracing::info!("▶️ User {} started intake", user_id);
        }
        self.sessions.put(UserSession::new(user_id.clone()));
        self.reply_in(user_id, IntakeState::AwaitingName, messages::WELCOME)
    }

    fn cancel(&self, user_id: &UserId) -> StepOutcome {
        if let Some(session) = self.sessions.remove(user_id) {
            tracing::info!("⏹️ User {} cancelled intake at {}", user_id, session.state);
        }
        self.reply_in(user_id, IntakeState::Cancelled, messages::CANCELLED)
    }

    fn accept_text(&self, user_id: &UserId, text: &str) -> StepOutcome {
        let Some(mut session) = self.sessions.get(user_id) else {
            return self.reply(user_id, messages::NOT_STARTED);
        };
        let state = session.state;

        let validated = match state {
            IntakeState::AwaitingName => validate_fio(text),
            IntakeState::AwaitingBirthDate => validate_birth_date(text),
            IntakeState::AwaitingPhone => validate_phone(text),
            IntakeState::AwaitingNationalId => validate_iin(text),
            IntakeState::AwaitingSignature => {
                return self.signature_prompt(user_id, messages::prompt(state).to_string());
            }
            IntakeState::Completed | IntakeState::Cancelled => {
                self.sessions.remove(user_id);
                return self.reply(user_id, messages::NOT_STARTED);
            }
        };

        match validated {
            Ok(value) => {
                session.accept(value.clone());
                let next = session.state;
                self.sessions.put(session);
                tracing::info!("➡️ User {}: {} -> {}", user_id, state, next);

                let text = messages::accepted(state, &value, next);
                if next == IntakeState::AwaitingSignature {
                    self.signature_prompt(user_id, text)
                } else {
                    self.reply_in(user_id, next, &text)
                }
            }
            Err(e) => {
                tracing::warn!("User {} rejected at {}: {}", user_id, state, e);
                self.reply_in(user_id, state, &e.user_friendly_message())
            }
        }
    }

    async fn accept_signature(&self, user_id: &UserId, json: &str) -> StepOutcome {
        let Some(session) = self.sessions.get(user_id) else {
            return self.reply(user_id, messages::NOT_STARTED);
        };
        if session.state != IntakeState::AwaitingSignature {
            tracing::debug!(
                "Ignoring signature from user {} at {}",
                user_id,
                session.state
            );
            return self.reply_in(user_id, session.state, messages::prompt(session.state));
        }

        match self.complete(&session, json).await {
            Ok(actions) => {
                self.sessions.remove(user_id);
                StepOutcome {
                    state: Some(IntakeState::Completed),
                    actions,
                }
            }
            Err(e) => {
                let text = match e {
                    IntakeError::MalformedSignaturePayload { .. } => {
                        tracing::warn!("Signature from user {} not accepted: {}", user_id, e);
                        e.user_friendly_message()
                    }
                    _ => {
                        tracing::error!("❌ Signature handling failed for user {}: {}", user_id, e);
                        messages::SIGNATURE_SAVE_FAILED.to_string()
                    }
                };
                self.reply_in(user_id, IntakeState::AwaitingSignature, &text)
            }
        }
    }

    async fn complete(&self, session: &UserSession, json: &str) -> Result<Vec<OutboundAction>> {
        let submission = parse_signature_payload(json)?;
        let saved = self.sink.persist(session, &submission).await?;
        tracing::info!("✅ User {} completed intake", session.user_id);

        Ok(vec![OutboundAction::SendPhoto {
            user_id: session.user_id.clone(),
            caption: messages::completed(&saved),
            image_bytes: saved.image_bytes,
        }])
    }

    fn signature_prompt(&self, user_id: &UserId, text: String) -> StepOutcome {
        StepOutcome {
            state: Some(IntakeState::AwaitingSignature),
            actions: vec![OutboundAction::ShowSignatureButton {
                user_id: user_id.clone(),
                text,
                url: self.web_app_url.clone(),
            }],
        }
    }

    fn reply_in(&self, user_id: &UserId, state: IntakeState, text: &str) -> StepOutcome {
        StepOutcome {
            state: Some(state),
            actions: vec![OutboundAction::SendText {
                user_id: user_id.clone(),
                text: text.to_string(),
            }],
        }
    }

    /// Reply that leaves the intake state as it is.
    fn reply(&self, user_id: &UserId, text: &str) -> StepOutcome {
        StepOutcome {
            state: self.state_of(user_id),
            actions: vec![OutboundAction::SendText {
                user_id: user_id.clone(),
                text: text.to_string(),
            }],
        }
    }
}
