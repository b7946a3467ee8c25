use crate::utils::error::{IntakeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier assigned by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntakeState {
    AwaitingName,
    AwaitingBirthDate,
    AwaitingPhone,
    AwaitingNationalId,
    AwaitingSignature,
    Completed,
    Cancelled,
}

impl IntakeState {
    /// The state reached after the current step is accepted. Terminal states
    /// have no successor.
    pub fn next(self) -> Option<IntakeState> {
        match self {
            IntakeState::AwaitingName => Some(IntakeState::AwaitingBirthDate),
            IntakeState::AwaitingBirthDate => Some(IntakeState::AwaitingPhone),
            IntakeState::AwaitingPhone => Some(IntakeState::AwaitingNationalId),
            IntakeState::AwaitingNationalId => Some(IntakeState::AwaitingSignature),
            IntakeState::AwaitingSignature => Some(IntakeState::Completed),
            IntakeState::Completed | IntakeState::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, IntakeState::Completed | IntakeState::Cancelled)
    }
}

impl fmt::Display for IntakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntakeState::AwaitingName => "awaiting_name",
            IntakeState::AwaitingBirthDate => "awaiting_birth_date",
            IntakeState::AwaitingPhone => "awaiting_phone",
            IntakeState::AwaitingNationalId => "awaiting_national_id",
            IntakeState::AwaitingSignature => "awaiting_signature",
            IntakeState::Completed => "completed",
            IntakeState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// In-progress answers of one user. Fields are filled in order as each step
/// is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub user_id: UserId,
    pub state: IntakeState,
    pub fio: Option<String>,
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub iin: Option<String>,
}

impl UserSession {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            state: IntakeState::AwaitingName,
            fio: None,
            birth_date: None,
            phone: None,
            iin: None,
        }
    }

    /// Stores the accepted value for the current step and advances.
    pub fn accept(&mut self, value: String) {
        match self.state {
            IntakeState::AwaitingName => self.fio = Some(value),
            IntakeState::AwaitingBirthDate => self.birth_date = Some(value),
            IntakeState::AwaitingPhone => self.phone = Some(value),
            IntakeState::AwaitingNationalId => self.iin = Some(value),
            _ => return,
        }
        if let Some(next) = self.state.next() {
            self.state = next;
        }
    }
}

/// Validated parts of a signature message, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSubmission {
    pub image: String,
    pub timestamp: Option<String>,
}

/// Decoded signature image and the timestamp that names its files.
#[derive(Debug, Clone)]
pub struct SignatureArtifact {
    pub bytes: Vec<u8>,
    pub timestamp: String,
}

/// The persisted snapshot. Field order is the key order of the JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub fio: String,
    pub birth_date: String,
    pub phone: String,
    pub iin: String,
    pub signature_file: String,
    pub timestamp: String,
}

impl IntakeRecord {
    pub fn from_session(
        session: &UserSession,
        signature_file: String,
        timestamp: String,
    ) -> Result<Self> {
        if session.state != IntakeState::AwaitingSignature {
            return Err(IntakeError::IncompleteSession {
                field: format!("state is {}", session.state),
            });
        }

        fn required(field: &str, value: &Option<String>) -> Result<String> {
            value.clone().ok_or_else(|| IntakeError::IncompleteSession {
                field: field.to_string(),
            })
        }

        Ok(Self {
            fio: required("fio", &session.fio)?,
            birth_date: required("birth_date", &session.birth_date)?,
            phone: required("phone", &session.phone)?,
            iin: required("iin", &session.iin)?,
            signature_file,
            timestamp,
        })
    }
}

/// Locations written by the persistence sink for one completed intake.
#[derive(Debug, Clone)]
pub struct PersistedIntake {
    pub record: IntakeRecord,
    pub image_path: String,
    pub record_path: String,
    pub image_bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    TextMessage { user_id: UserId, text: String },
    SignaturePayload { user_id: UserId, json_string: String },
}

impl InboundEvent {
    pub fn text(user_id: impl Into<UserId>, text: impl Into<String>) -> Self {
        InboundEvent::TextMessage {
            user_id: user_id.into(),
            text: text.into(),
        }
    }

    pub fn signature(user_id: impl Into<UserId>, json_string: impl Into<String>) -> Self {
        InboundEvent::SignaturePayload {
            user_id: user_id.into(),
            json_string: json_string.into(),
        }
    }

    pub fn user_id(&self) -> &UserId {
        match self {
            InboundEvent::TextMessage { user_id, .. } => user_id,
            InboundEvent::SignaturePayload { user_id, .. } => user_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundAction {
    SendText {
        user_id: UserId,
        text: String,
    },
    SendPhoto {
        user_id: UserId,
        image_bytes: Vec<u8>,
        caption: String,
    },
    /// Prompt text with a button that opens the signature drawing surface.
    ShowSignatureButton {
        user_id: UserId,
        text: String,
        url: String,
    },
}

impl OutboundAction {
    pub fn user_id(&self) -> &UserId {
        match self {
            OutboundAction::SendText { user_id, .. }
            | OutboundAction::SendPhoto { user_id, .. }
            | OutboundAction::ShowSignatureButton { user_id, .. } => user_id,
        }
    }
}

/// Result of handling one inbound event. `state` is `None` when the user has
/// no intake in progress and the event did not start one.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub state: Option<IntakeState>,
    pub actions: Vec<OutboundAction>,
}
