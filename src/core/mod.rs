pub mod bot;
pub mod intake;
pub mod messages;
pub mod persistence;
pub mod session_store;

pub use crate::domain::model::{
    InboundEvent, IntakeRecord, IntakeState, OutboundAction, StepOutcome, UserId, UserSession,
};
pub use crate::domain::ports::{ConfigProvider, Presenter, SessionStore, Storage};
pub use crate::utils::error::Result;
