use crate::domain::model::{
    IntakeRecord, PersistedIntake, SignatureArtifact, SignatureSubmission, UserId, UserSession,
};
use crate::domain::ports::{ConfigProvider, Storage};
use crate::utils::error::Result;
use crate::utils::validation::validate_user_id;
use base64::{engine::general_purpose, Engine as _};
use std::path::Path;

/// Removes a `data:image/<subtype>;base64,` prefix if present.
pub fn strip_data_url_prefix(image: &str) -> &str {
    let Some(rest) = image.strip_prefix("data:image/") else {
        return image;
    };
    let Some(idx) = rest.find(";base64,") else {
        return image;
    };
    let subtype = &rest[..idx];
    let recognized = !subtype.is_empty()
        && subtype
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if recognized {
        &rest[idx + ";base64,".len()..]
    } else {
        image
    }
}

/// Decodes the submitted image. Falls back to the current epoch milliseconds
/// when the drawing surface sent no timestamp.
pub fn decode_signature(submission: &SignatureSubmission) -> Result<SignatureArtifact> {
    let encoded = strip_data_url_prefix(submission.image.trim());
    let bytes = general_purpose::STANDARD.decode(encoded)?;
    let timestamp = submission
        .timestamp
        .clone()
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().to_string());
    Ok(SignatureArtifact { bytes, timestamp })
}

fn staging_path(path: &str) -> String {
    let path = Path::new(path);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
        .to_string_lossy()
        .into_owned()
}

/// Writes the signature image and the JSON record of a completed intake.
pub struct PersistenceSink<S: Storage> {
    storage: S,
    signatures_dir: String,
    records_dir: String,
}

impl<S: Storage> PersistenceSink<S> {
    pub fn new(
        storage: S,
        signatures_dir: impl Into<String>,
        records_dir: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            signatures_dir: signatures_dir.into(),
            records_dir: records_dir.into(),
        }
    }

    pub fn from_config<C: ConfigProvider>(storage: S, config: &C) -> Self {
        Self::new(storage, config.signatures_dir(), config.records_dir())
    }

    pub fn image_path(&self, user_id: &UserId, timestamp: &str) -> String {
        Path::new(&self.signatures_dir)
            .join(format!("signature_{}_{}.png", user_id, timestamp))
            .to_string_lossy()
            .into_owned()
    }

    pub fn record_path(&self, user_id: &UserId, timestamp: &str) -> String {
        Path::new(&self.records_dir)
            .join(format!("user_data_{}_{}.json", user_id, timestamp))
            .to_string_lossy()
            .into_owned()
    }

    /// Decodes the signature, then writes the image followed by the record.
    /// Nothing is written when decoding fails or when either target file
    /// already exists. If the record cannot be written the image is removed
    /// again, so a record never points at a missing image and a failed
    /// attempt leaves no files behind. A crash between the two writes can
    /// still leave an orphaned image.
    pub async fn persist(
        &self,
        session: &UserSession,
        submission: &SignatureSubmission,
    ) -> Result<PersistedIntake> {
        validate_user_id(&session.user_id)?;
        let artifact = decode_signature(submission)?;
        let image_path = self.image_path(&session.user_id, &artifact.timestamp);
        let record_path = self.record_path(&session.user_id, &artifact.timestamp);

        // earlier submissions are never replaced
        for path in [&image_path, &record_path] {
            if self.storage.exists(path).await? {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!("{} already exists", path),
                )
                .into());
            }
        }

        let record =
            IntakeRecord::from_session(session, image_path.clone(), artifact.timestamp.clone())?;
        let json = serde_json::to_string_pretty(&record)?;

        self.write_staged(&image_path, &artifact.bytes).await?;
        tracing::debug!("Signature image written to {}", image_path);

        if let Err(e) = self.write_staged(&record_path, json.as_bytes()).await {
            if let Err(cleanup) = self.storage.remove_file(&image_path).await {
                tracing::warn!("Could not remove orphaned image {}: {}", image_path, cleanup);
            }
            return Err(e);
        }

        tracing::info!(
            "💾 Intake persisted for user {}: {} ({} bytes), {}",
            session.user_id,
            image_path,
            artifact.bytes.len(),
            record_path
        );

        Ok(PersistedIntake {
            record,
            image_path,
            record_path,
            image_bytes: artifact.bytes,
        })
    }

    async fn write_staged(&self, path: &str, data: &[u8]) -> Result<()> {
        let staging = staging_path(path);
        let written = match self.storage.write_file(&staging, data).await {
            Ok(()) => self.storage.rename(&staging, path).await,
            Err(e) => Err(e),
        };
        if written.is_err() {
            if let Err(cleanup) = self.storage.remove_file(&staging).await {
                tracing::warn!("Could not remove staging file {}: {}", staging, cleanup);
            }
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::IntakeState;
    use crate::utils::error::IntakeError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStorage {
        files: Mutex<HashMap<String, Vec<u8>>>,
        fail_writes_containing: Option<&'static str>,
        fail_renames: bool,
        fail_removes: bool,
    }

    impl Storage for MemoryStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            if let Some(pattern) = self.fail_writes_containing {
                if path.contains(pattern) {
                    return Err(std::io::Error::other("disk full").into());
                }
            }
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn rename(&self, from: &str, to: &str) -> Result<()> {
            if self.fail_renames {
                return Err(std::io::Error::other("rename refused").into());
            }
            let mut files = self.files.lock().unwrap();
            let data = files
                .remove(from)
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
            files.insert(to.to_string(), data);
            Ok(())
        }

        async fn remove_file(&self, path: &str) -> Result<()> {
            if self.fail_removes {
                return Err(std::io::Error::other("remove refused").into());
            }
            self.files.lock().unwrap().remove(path);
            Ok(())
        }

        async fn exists(&self, path: &str) -> Result<bool> {
            Ok(self.files.lock().unwrap().contains_key(path))
        }
    }

    fn complete_session() -> UserSession {
        UserSession {
            user_id: UserId::from("42"),
            state: IntakeState::AwaitingSignature,
            fio: Some("Ivanov Ivan".to_string()),
            birth_date: Some("15.05.1990".to_string()),
            phone: Some("+77071234567".to_string()),
            iin: Some("123456789012".to_string()),
        }
    }

    fn submission(image: &str) -> SignatureSubmission {
        SignatureSubmission {
            image: image.to_string(),
            timestamp: Some("1700000000000".to_string()),
        }
    }

    #[test]
    fn test_strip_data_url_prefix() {
        assert_eq!(strip_data_url_prefix("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url_prefix("data:image/jpeg;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url_prefix("AAAA"), "AAAA");
        assert_eq!(
            strip_data_url_prefix("data:text/plain;base64,AAAA"),
            "data:text/plain;base64,AAAA"
        );
    }

    #[test]
    fn test_decode_signature_uses_current_time_without_timestamp() {
        let artifact = decode_signature(&SignatureSubmission {
            image: "data:image/png;base64,iVBORw0KGgo=".to_string(),
            timestamp: None,
        })
        .unwrap();
        assert_eq!(&artifact.bytes[1..4], b"PNG");
        assert!(artifact.timestamp.parse::<i64>().unwrap() > 0);
    }

    #[test]
    fn test_paths_are_derived_from_user_and_timestamp() {
        let sink = PersistenceSink::new(MemoryStorage::default(), "signatures", "records");
        let user = UserId::from("42");
        assert_eq!(
            sink.image_path(&user, "1700000000000"),
            "signatures/signature_42_1700000000000.png"
        );
        assert_eq!(
            sink.record_path(&user, "1700000000000"),
            "records/user_data_42_1700000000000.json"
        );
    }

    #[test]
    fn test_persist_writes_image_and_record() {
        let sink = PersistenceSink::new(MemoryStorage::default(), "signatures", "records");
        let saved = tokio_test::block_on(
            sink.persist(&complete_session(), &submission("data:image/png;base64,iVBORw0KGgo=")),
        )
        .unwrap();

        let files = sink.storage.files.lock().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[&saved.image_path], saved.image_bytes);

        let record: IntakeRecord = serde_json::from_slice(&files[&saved.record_path]).unwrap();
        assert_eq!(record.signature_file, saved.image_path);
        assert_eq!(record.timestamp, "1700000000000");
    }

    #[test]
    fn test_decode_failure_writes_nothing() {
        let sink = PersistenceSink::new(MemoryStorage::default(), "signatures", "records");
        let err = tokio_test::block_on(sink.persist(&complete_session(), &submission("not*base64")))
            .unwrap_err();
        assert!(matches!(err, IntakeError::DecodeFailure(_)));
        assert!(sink.storage.files.lock().unwrap().is_empty());
    }

    #[test]
    fn test_record_write_failure_removes_image() {
        let storage = MemoryStorage {
            fail_writes_containing: Some("user_data_"),
            ..Default::default()
        };
        let sink = PersistenceSink::new(storage, "signatures", "records");
        let err = tokio_test::block_on(sink.persist(&complete_session(), &submission("iVBORw0KGgo=")))
            .unwrap_err();
        assert!(matches!(err, IntakeError::PersistenceIoFailure(_)));
        assert!(sink.storage.files.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_staging_cleanup_keeps_original_error() {
        let storage = MemoryStorage {
            fail_renames: true,
            fail_removes: true,
            ..Default::default()
        };
        let sink = PersistenceSink::new(storage, "signatures", "records");
        let err = tokio_test::block_on(sink.persist(&complete_session(), &submission("iVBORw0KGgo=")))
            .unwrap_err();
        match err {
            IntakeError::PersistenceIoFailure(e) => assert_eq!(e.to_string(), "rename refused"),
            other => panic!("expected an IO failure, got {:?}", other),
        }
        // the staged image could not be removed and is left behind
        let files = sink.storage.files.lock().unwrap();
        assert_eq!(
            files.keys().collect::<Vec<_>>(),
            vec!["signatures/.signature_42_1700000000000.png.tmp"]
        );
    }

    #[test]
    fn test_existing_artifacts_are_not_replaced() {
        let sink = PersistenceSink::new(MemoryStorage::default(), "signatures", "records");
        let committed = b"earlier signature".to_vec();
        sink.storage.files.lock().unwrap().insert(
            "signatures/signature_42_1700000000000.png".to_string(),
            committed.clone(),
        );

        let err = tokio_test::block_on(sink.persist(&complete_session(), &submission("iVBORw0KGgo=")))
            .unwrap_err();
        assert!(matches!(err, IntakeError::PersistenceIoFailure(_)));
        assert!(err.is_recoverable());

        let files = sink.storage.files.lock().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files["signatures/signature_42_1700000000000.png"], committed);
    }

    #[test]
    fn test_unsafe_user_id_is_never_persisted() {
        let sink = PersistenceSink::new(MemoryStorage::default(), "signatures", "records");
        let mut session = complete_session();
        session.user_id = UserId::from("x/../../../escaped");

        let err = tokio_test::block_on(sink.persist(&session, &submission("iVBORw0KGgo=")))
            .unwrap_err();
        assert!(matches!(err, IntakeError::UnsafeUserId { .. }));
        assert!(sink.storage.files.lock().unwrap().is_empty());
    }

    #[test]
    fn test_incomplete_session_is_never_persisted() {
        let sink = PersistenceSink::new(MemoryStorage::default(), "signatures", "records");
        let mut session = complete_session();
        session.iin = None;
        let err = tokio_test::block_on(sink.persist(&session, &submission("iVBORw0KGgo=")))
            .unwrap_err();
        assert!(matches!(err, IntakeError::IncompleteSession { .. }));
        assert!(sink.storage.files.lock().unwrap().is_empty());
    }
}
