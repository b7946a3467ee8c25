use crate::domain::model::{InboundEvent, OutboundAction};
use crate::domain::ports::Presenter;
use crate::utils::error::{IntakeError, Result};
use async_trait::async_trait;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Marks a console line as a signature payload: `<user_id> !sig <json>`.
pub const SIGNATURE_MARKER: &str = "!sig";

/// Parses `<user_id> <text>` lines typed into the console transport.
pub fn parse_console_line(line: &str) -> Option<InboundEvent> {
    let line = line.trim();
    let (user_id, rest) = line.split_once(char::is_whitespace)?;
    let rest = rest.trim_start();
    if rest.is_empty() {
        return None;
    }

    match rest.strip_prefix(SIGNATURE_MARKER) {
        Some(json) if json.starts_with(char::is_whitespace) => {
            Some(InboundEvent::signature(user_id, json.trim()))
        }
        _ => Some(InboundEvent::text(user_id, rest)),
    }
}

/// Renders outbound actions as plain text.
pub struct ConsolePresenter<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConsolePresenter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

fn render(action: &OutboundAction) -> String {
    match action {
        OutboundAction::SendText { user_id, text } => format!("[to {}] {}", user_id, text),
        OutboundAction::SendPhoto {
            user_id,
            image_bytes,
            caption,
        } => format!(
            "[to {}] 🖼️ photo ({} bytes)\n{}",
            user_id,
            image_bytes.len(),
            caption
        ),
        OutboundAction::ShowSignatureButton { user_id, text, url } => {
            format!("[to {}] {}\n[✍️ Sign] -> {}", user_id, text, url)
        }
    }
}

#[async_trait]
impl<W: Write + Send> Presenter for ConsolePresenter<W> {
    async fn present(&self, action: OutboundAction) -> Result<()> {
        let rendered = render(&action);
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{}", rendered)
            .and_then(|_| out.flush())
            .map_err(|e| IntakeError::DeliveryFailure {
                message: e.to_string(),
            })
    }
}
