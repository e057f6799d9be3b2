//! Pairing file import.
//!
//! The host exports a small JSON file when a client is paired with it.  The
//! import is the only way a pairing record comes into existence.

use std::path::{Path, PathBuf};

use pcloud_core::{PairingError, PairingRecord};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PairingImportError {
    #[error("cannot read pairing file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pairing file {path} rejected: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: PairingError,
    },
}

/// Reads and validates the pairing file at `path`.
pub fn import_pairing_file(path: &Path) -> Result<PairingRecord, PairingImportError> {
    let text = std::fs::read_to_string(path).map_err(|source| PairingImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let record = PairingRecord::from_json(&text).map_err(|source| PairingImportError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    info!("imported pairing for {} from {}", record.display_name(), path.display());
    Ok(record)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn write_temp(content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("pcloud_pairing_{}.json", Uuid::new_v4()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_valid_file_imports() {
        // Arrange
        let path = write_temp(
            r#"{"device_id":"dev-1","broker":"wss://b.example","mac":"aa:bb:cc:dd:ee:ff","port":8443,"extra":1}"#,
        );

        // Act
        let record = import_pairing_file(&path).unwrap();

        // Assert
        assert_eq!(record.device_id, "dev-1");
        assert_eq!(record.port, Some(8443));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_broker_is_rejected() {
        let path = write_temp(r#"{"device_id":"dev-1"}"#);

        let result = import_pairing_file(&path);

        assert!(matches!(
            result,
            Err(PairingImportError::Invalid {
                source: PairingError::MissingField("broker"),
                ..
            })
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = import_pairing_file(Path::new("/nonexistent/pairing.json"));
        assert!(matches!(result, Err(PairingImportError::Io { .. })));
    }
}
