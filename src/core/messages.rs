//! Chat texts sent to the user.

use crate::domain::model::{IntakeState, PersistedIntake};

pub const WELCOME: &str = "👋 Welcome!\n\n\
    I will help you fill in the form.\n\
    To begin, please enter your full name:";

pub const CANCELLED: &str = "❌ Operation cancelled. Send /start to begin again.";

pub const NOT_STARTED: &str = "Send /start to fill in the form.";

pub const UNKNOWN_COMMAND: &str = "Unknown command. Send /help to see what I can do.";

pub const SIGNATURE_SAVE_FAILED: &str = "❌ Failed to save the signature. Please try again.";

pub const HELP: &str = "🤖 Form intake bot\n\n\
    Commands:\n\
    /start - Start filling in the form\n\
    /cancel - Cancel the current form\n\
    /help - Show this help\n\n\
    The bot collects:\n\
    • Full name\n\
    • Date of birth\n\
    • Phone\n\
    • IIN\n\
    • Signature (via the signature app)\n\n\
    All data is stored locally as JSON files.";

/// Prompt shown while waiting in `state`.
pub fn prompt(state: IntakeState) -> &'static str {
    match state {
        IntakeState::AwaitingName => "Please enter your full name:",
        IntakeState::AwaitingBirthDate => {
            "📅 Now enter your date of birth as DD.MM.YYYY\nFor example: 15.05.1990"
        }
        IntakeState::AwaitingPhone => "📱 Now enter your phone number as +7XXXXXXXXXX:",
        IntakeState::AwaitingNationalId => "🆔 Now enter your IIN (12 digits):",
        IntakeState::AwaitingSignature => {
            "📝 Now you need to sign.\nPress the button below to open the signature app:"
        }
        IntakeState::Completed | IntakeState::Cancelled => NOT_STARTED,
    }
}

/// Echo of an accepted value, followed by the prompt for the next step.
pub fn accepted(state: IntakeState, value: &str, next: IntakeState) -> String {
    let label = match state {
        IntakeState::AwaitingName => "Full name",
        IntakeState::AwaitingBirthDate => "Date of birth",
        IntakeState::AwaitingPhone => "Phone",
        IntakeState::AwaitingNationalId => "IIN",
        _ => "Value",
    };
    format!("✅ {}: {}\n\n{}", label, value, prompt(next))
}

pub fn completed(saved: &PersistedIntake) -> String {
    let record = &saved.record;
    format!(
        "✅ All data saved!\n\n\
         👤 Full name: {}\n\
         📅 Date of birth: {}\n\
         📱 Phone: {}\n\
         🆔 IIN: {}\n\
         📄 Data saved to: {}\n\
         ✍️ Signature saved to: {}\n\n\
         Thank you for filling in the form! 🙏",
        record.fio,
        record.birth_date,
        record.phone,
        record.iin,
        saved.record_path,
        saved.image_path
    )
}
