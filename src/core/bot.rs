use crate::core::intake::IntakeEngine;
use crate::domain::model::{InboundEvent, IntakeState};
use crate::domain::ports::{Presenter, SessionStore, Storage};
use crate::utils::error::Result;

/// Connects the intake engine to a transport: every action produced for an
/// event is handed to the presenter in order.
pub struct IntakeBot<S: Storage, St: SessionStore, P: Presenter> {
    engine: IntakeEngine<S, St>,
    presenter: P,
}

impl<S: Storage, St: SessionStore, P: Presenter> IntakeBot<S, St, P> {
    pub fn new(engine: IntakeEngine<S, St>, presenter: P) -> Self {
        Self { engine, presenter }
    }

    pub fn engine(&self) -> &IntakeEngine<S, St> {
        &self.engine
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Handles one event and delivers the replies. A failed delivery is not
    /// retried; the state change it reports has already been applied.
    pub async fn dispatch(&self, event: InboundEvent) -> Result<Option<IntakeState>> {
        let user_id = event.user_id().clone();
        let outcome = self.engine.handle(event).await;
        tracing::debug!(
            "User {} now at {:?}, {} action(s) to deliver",
            user_id,
            outcome.state,
            outcome.actions.len()
        );

        for action in outcome.actions {
            if let Err(e) = self.presenter.present(action).await {
                tracing::error!("❌ Failed to deliver reply to user {}: {}", user_id, e);
                return Err(e);
            }
        }

        Ok(outcome.state)
    }
}
