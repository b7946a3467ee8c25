pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{console::ConsolePresenter, storage::LocalStorage};
pub use crate::core::{
    bot::IntakeBot, intake::IntakeEngine, persistence::PersistenceSink,
    session_store::InMemorySessionStore,
};
pub use domain::model::{InboundEvent, IntakeRecord, IntakeState, OutboundAction, UserId};
pub use utils::error::{IntakeError, Result};
