use crate::domain::model::{SignatureSubmission, UserId};
use crate::utils::error::{IntakeError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use url::Url;

pub const MIN_FIO_CHARS: usize = 3;
pub const BIRTH_DATE_FORMAT: &str = "%d.%m.%Y";
pub const PHONE_PREFIX: &str = "+7";
pub const PHONE_LENGTH: usize = 12;
pub const IIN_LENGTH: usize = 12;
pub const SIGNATURE_SAVED_TAG: &str = "signature_saved";

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// True for non-empty values made of ASCII alphanumerics, `-` and `_`.
pub fn is_filename_safe(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// User ids become part of artifact file names.
pub fn validate_user_id(user_id: &UserId) -> Result<()> {
    if !is_filename_safe(user_id.as_str()) {
        return Err(IntakeError::UnsafeUserId {
            user_id: user_id.to_string(),
        });
    }
    Ok(())
}

/// Full name: at least three characters after trimming.
pub fn validate_fio(raw: &str) -> Result<String> {
    let fio = raw.trim();
    if fio.chars().count() < MIN_FIO_CHARS {
        return Err(IntakeError::rejected(
            "fio",
            "Please enter a valid full name (at least 3 characters):",
        ));
    }
    Ok(fio.to_string())
}

/// Birth date in exactly `DD.MM.YYYY`. The value must be a real calendar
/// date; there is no range check, so future dates pass.
pub fn validate_birth_date(raw: &str) -> Result<String> {
    let date = raw.trim();
    let reject = || {
        IntakeError::rejected(
            "birth_date",
            "Invalid date format. Enter the date as DD.MM.YYYY:",
        )
    };

    let bytes = date.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            2 | 5 => *b == b'.',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(reject());
    }

    NaiveDate::parse_from_str(date, BIRTH_DATE_FORMAT).map_err(|_| reject())?;
    Ok(date.to_string())
}

pub fn validate_phone(raw: &str) -> Result<String> {
    let phone = raw.trim();
    let valid = phone.len() == PHONE_LENGTH
        && phone
            .strip_prefix(PHONE_PREFIX)
            .map(|rest| rest.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false);
    if !valid {
        return Err(IntakeError::rejected(
            "phone",
            "Invalid phone format. Enter the number as +7XXXXXXXXXX:",
        ));
    }
    Ok(phone.to_string())
}

/// National identifier (IIN): exactly twelve ASCII digits.
pub fn validate_iin(raw: &str) -> Result<String> {
    let iin = raw.trim();
    if iin.len() != IIN_LENGTH || !iin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IntakeError::rejected(
            "iin",
            "IIN must contain exactly 12 digits:",
        ));
    }
    Ok(iin.to_string())
}

#[derive(Debug, Deserialize)]
struct SignatureMessage {
    #[serde(rename = "type")]
    kind: Option<String>,
    image: Option<String>,
    timestamp: Option<serde_json::Value>,
}

/// Parses the JSON sent by the drawing surface. Only the tag and the
/// presence of image data are checked here; Base64 decoding happens when the
/// signature is persisted.
pub fn parse_signature_payload(json: &str) -> Result<SignatureSubmission> {
    let message: SignatureMessage = serde_json::from_str(json)
        .map_err(|e| IntakeError::malformed(format!("invalid JSON: {}", e)))?;

    match message.kind.as_deref() {
        Some(SIGNATURE_SAVED_TAG) => {}
        Some(other) => return Err(IntakeError::malformed(format!("unexpected type '{}'", other))),
        None => return Err(IntakeError::malformed("missing type")),
    }

    let image = match message.image {
        Some(image) if !image.trim().is_empty() => image,
        _ => return Err(IntakeError::malformed("empty image")),
    };

    let timestamp = match message.timestamp {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => None,
        Some(serde_json::Value::String(s)) => Some(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) if n.is_u64() => Some(n.to_string()),
        Some(other) => {
            return Err(IntakeError::malformed(format!(
                "unsupported timestamp {}",
                other
            )))
        }
    };

    // the timestamp ends up in file names
    if let Some(ts) = &timestamp {
        if !is_filename_safe(ts) {
            return Err(IntakeError::malformed(format!(
                "timestamp '{}' is not filename safe",
                ts
            )));
        }
    }

    Ok(SignatureSubmission { image, timestamp })
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(IntakeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(IntakeError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(IntakeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(IntakeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(IntakeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(IntakeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}
