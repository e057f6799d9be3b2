//! PairingStore: imported pairing records.
//!
//! Records are created only by import and are immutable afterwards; to
//! change one, remove it and import the new file.  `device_id` is unique.

use std::sync::{Mutex, MutexGuard};

use pcloud_core::{HostProfile, HostProfileError, PairingRecord, DEFAULT_PORT};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PairingStoreError {
    #[error("device {0} is already paired; remove it first")]
    Duplicate(String),

    #[error("no pairing for device {0}")]
    NotFound(String),

    #[error("pairing for {0} carries no MAC address")]
    NoMac(String),

    #[error(transparent)]
    Profile(#[from] HostProfileError),
}

#[derive(Debug, Default)]
pub struct PairingStore {
    records: Mutex<Vec<PairingRecord>>,
}

impl PairingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<PairingRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PairingRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores an imported record.
    pub fn add(&self, record: PairingRecord) -> Result<(), PairingStoreError> {
        let mut records = self.lock();
        if records.iter().any(|r| r.device_id == record.device_id) {
            return Err(PairingStoreError::Duplicate(record.device_id));
        }
        records.push(record);
        Ok(())
    }

    pub fn remove(&self, device_id: &str) -> Result<PairingRecord, PairingStoreError> {
        let mut records = self.lock();
        let index = records
            .iter()
            .position(|r| r.device_id == device_id)
            .ok_or_else(|| PairingStoreError::NotFound(device_id.to_string()))?;
        Ok(records.remove(index))
    }

    pub fn get(&self, device_id: &str) -> Option<PairingRecord> {
        self.lock().iter().find(|r| r.device_id == device_id).cloned()
    }

    pub fn list(&self) -> Vec<PairingRecord> {
        self.lock().clone()
    }
}

/// Builds a host profile from a pairing record that carries a MAC.
pub fn profile_from_pairing(record: &PairingRecord) -> Result<HostProfile, PairingStoreError> {
    let mac = record
        .mac
        .ok_or_else(|| PairingStoreError::NoMac(record.device_id.clone()))?;
    let port = record.port.unwrap_or(DEFAULT_PORT);
    Ok(HostProfile::new(record.display_name(), &mac.to_string(), port)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn record(device_id: &str, mac: Option<&str>) -> PairingRecord {
        let mac = mac.map(|m| format!(r#","mac":"{m}""#)).unwrap_or_default();
        PairingRecord::from_json(&format!(
            r#"{{"device_id":"{device_id}","broker":"wss://broker.example/ws","name":"Desk"{mac}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_duplicate_device_is_rejected() {
        // Arrange
        let store = PairingStore::new();
        store.add(record("dev-1", None)).unwrap();

        // Act
        let result = store.add(record("dev-1", None));

        // Assert
        assert_eq!(result, Err(PairingStoreError::Duplicate("dev-1".to_string())));
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_remove_then_reimport() {
        let store = PairingStore::new();
        store.add(record("dev-1", None)).unwrap();

        store.remove("dev-1").unwrap();
        store.add(record("dev-1", Some("aa:bb:cc:dd:ee:ff"))).unwrap();

        assert!(store.get("dev-1").unwrap().mac.is_some());
        assert!(matches!(store.remove("dev-2"), Err(PairingStoreError::NotFound(_))));
    }

    #[test]
    fn test_profile_from_pairing_uses_name_mac_and_default_port() {
        let profile = profile_from_pairing(&record("dev-1", Some("aa-bb-cc-dd-ee-ff"))).unwrap();

        assert_eq!(profile.name, "Desk");
        assert_eq!(profile.mac.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(profile.port, DEFAULT_PORT);
        assert_eq!(profile.ip, None);
    }

    #[test]
    fn test_profile_requires_mac() {
        assert!(matches!(
            profile_from_pairing(&record("dev-1", None)),
            Err(PairingStoreError::NoMac(_))
        ));
    }
}
