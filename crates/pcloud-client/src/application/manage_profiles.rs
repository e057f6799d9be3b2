//! AddressBook: the in-memory list of known hosts.
//!
//! The book is shared between the CLI commands, the background re-resolver,
//! and the liveness refresher, so every method takes `&self` and locks an
//! internal mutex for the duration of one short, non-async operation.
//!
//! # One resolution per profile
//!
//! Before resolving a profile a task must [`claim`](AddressBook::claim) it,
//! and [`release`](AddressBook::release) it afterwards.  A claim fails while
//! another is outstanding, which is what keeps two resolutions for the same
//! host from running at once.

use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard};

use pcloud_core::{HostId, HostProfile, HostProfileError, MacAddress};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AddressBookError {
    #[error("no host profile with id {0}")]
    NotFound(HostId),

    #[error(transparent)]
    Profile(#[from] HostProfileError),
}

#[derive(Debug, Default)]
pub struct AddressBook {
    profiles: Mutex<Vec<HostProfile>>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a book from persisted profiles.
    pub fn from_profiles(profiles: Vec<HostProfile>) -> Self {
        Self {
            profiles: Mutex::new(profiles),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<HostProfile>> {
        self.profiles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update<T>(
        &self,
        id: HostId,
        f: impl FnOnce(&mut HostProfile) -> Result<T, HostProfileError>,
    ) -> Result<T, AddressBookError> {
        let mut profiles = self.lock();
        let profile = profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(AddressBookError::NotFound(id))?;
        Ok(f(profile)?)
    }

    /// Validates and stores a new profile.
    pub fn add(&self, name: &str, mac: &str, port: u16) -> Result<HostProfile, AddressBookError> {
        let profile = HostProfile::new(name, mac, port)?;
        debug!("adding host {} ({})", profile.name, profile.mac);
        self.lock().push(profile.clone());
        Ok(profile)
    }

    pub fn remove(&self, id: HostId) -> Result<HostProfile, AddressBookError> {
        let mut profiles = self.lock();
        let index = profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or(AddressBookError::NotFound(id))?;
        Ok(profiles.remove(index))
    }

    pub fn rename(&self, id: HostId, name: &str) -> Result<(), AddressBookError> {
        self.update(id, |p| {
            p.rename(name);
            Ok(())
        })
    }

    /// Replaces the MAC; a different MAC clears the cached IP and liveness.
    pub fn change_mac(&self, id: HostId, mac: &str) -> Result<(), AddressBookError> {
        self.update(id, |p| p.change_mac(mac))
    }

    pub fn change_port(&self, id: HostId, port: u32) -> Result<(), AddressBookError> {
        self.update(id, |p| p.change_port(port))
    }

    /// Sets a manual IP, or clears it to return to auto-resolve.
    pub fn set_ip(&self, id: HostId, ip: Option<Ipv4Addr>) -> Result<(), AddressBookError> {
        self.update(id, |p| {
            p.set_ip(ip);
            Ok(())
        })
    }

    pub fn set_online(&self, id: HostId, online: bool) -> Result<(), AddressBookError> {
        self.update(id, |p| {
            p.online = online;
            Ok(())
        })
    }

    pub fn get(&self, id: HostId) -> Option<HostProfile> {
        self.lock().iter().find(|p| p.id == id).cloned()
    }

    /// Every profile, in insertion order.
    pub fn list(&self) -> Vec<HostProfile> {
        self.lock().clone()
    }

    /// Finds a profile by id, MAC, or case-insensitive name, in that order.
    pub fn find(&self, query: &str) -> Option<HostProfile> {
        let profiles = self.lock();
        if let Ok(id) = query.parse::<HostId>() {
            if let Some(p) = profiles.iter().find(|p| p.id == id) {
                return Some(p.clone());
            }
        }
        if let Ok(mac) = MacAddress::parse(query) {
            if let Some(p) = profiles.iter().find(|p| p.mac == mac) {
                return Some(p.clone());
            }
        }
        profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(query.trim()))
            .cloned()
    }

    /// Claims `id` for a resolution attempt and returns a copy of it.
    ///
    /// Returns `None` if the profile is gone or already being resolved.
    pub fn claim(&self, id: HostId) -> Option<HostProfile> {
        let mut profiles = self.lock();
        let profile = profiles.iter_mut().find(|p| p.id == id)?;
        if profile.try_begin_resolve() {
            Some(profile.clone())
        } else {
            debug!("{} is already being resolved", profile.name);
            None
        }
    }

    /// Releases a claim, recording `found` if the attempt succeeded.
    ///
    /// The result is dropped if the MAC changed while the attempt ran, since
    /// it then belongs to a different machine.
    pub fn release(&self, id: HostId, mac: MacAddress, found: Option<Ipv4Addr>) {
        let mut profiles = self.lock();
        let Some(profile) = profiles.iter_mut().find(|p| p.id == id) else {
            return;
        };
        profile.finish_resolve();
        match found {
            Some(ip) if profile.mac == mac => profile.apply_resolution(ip),
            Some(_) => debug!("discarding stale resolution for {}", profile.name),
            None => profile.online = false,
        }
    }

    /// Ids of profiles with no cached address and no resolution in flight.
    pub fn pending_resolution(&self) -> Vec<HostId> {
        self.lock()
            .iter()
            .filter(|p| p.needs_resolution() && !p.is_resolving())
            .map(|p| p.id)
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
