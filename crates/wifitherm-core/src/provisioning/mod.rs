//! Captive-portal provisioning of the report server
//!
//! Provisioning is a blocking takeover: while the portal waits for the
//! operator, the control loop does nothing else. The portal itself (access
//! point, web form) lives behind [`CaptivePortal`]; this module only decides
//! what to ask for and what to do with the answer.

mod dhcp;
mod dns;
mod form;

pub use dhcp::*;
pub use dns::*;
pub use form::*;

use alloc::string::String;
use alloc::vec::Vec;
use core::future::Future;

use log::{error, info, warn};
use thiserror_no_std::Error;

use crate::app_state::AppError;
use crate::config::{ConfigStorage, ConfigStore, DeviceConfig};
use crate::constants::{DEFAULT_PORT, DEVICE_ID, PORTAL_PARAM_MAX_LEN};

/// A text field shown on the portal form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalParameter {
    /// Form field name
    pub id: &'static str,
    /// Placeholder text shown to the operator
    pub label: &'static str,
    /// Pre-filled value
    pub default: &'static str,
    /// Longest value kept, in characters
    pub max_len: usize,
}

/// Upstream server host name or address.
pub const SERVER_PARAMETER: PortalParameter = PortalParameter {
    id: "server",
    label: "host",
    default: "",
    max_len: PORTAL_PARAM_MAX_LEN,
};

/// Upstream server port; the placeholder shows the fallback port.
pub const PORT_PARAMETER: PortalParameter = PortalParameter {
    id: "port",
    label: "1880",
    default: "",
    max_len: PORTAL_PARAM_MAX_LEN,
};

/// Values submitted through the portal, keyed by parameter id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortalValues {
    values: Vec<(&'static str, String)>,
}

impl PortalValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.values.iter_mut().find(|(key, _)| *key == id) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((id, value)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| *key == id)
            .map(|(_, value)| value.as_str())
    }
}

/// Failures of the captive-portal mechanism.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortalError {
    #[error("Captive portal could not start: {details}")]
    StartFailed { details: &'static str },
    #[error("Captive portal was abandoned")]
    Abandoned,
    #[error("Captive portal I/O failed during {operation}")]
    Io { operation: &'static str },
}

/// Hosts a temporary access point and form, and waits for it to be submitted.
pub trait CaptivePortal {
    /// Block until the operator submits `parameters` on the access point
    /// named `ap_name`.
    fn collect(
        &mut self,
        ap_name: &str,
        parameters: &[PortalParameter],
    ) -> impl Future<Output = Result<PortalValues, PortalError>>;
}

/// The physical input that forces provisioning when asserted.
pub trait ProvisioningTrigger {
    fn is_asserted(&mut self) -> bool;
}

/// Keep at most `max_len` characters of `value`.
pub fn truncate_chars(value: &str, max_len: usize) -> &str {
    match value.char_indices().nth(max_len) {
        Some((index, _)) => &value[..index],
        None => value,
    }
}

/// Runs the captive portal and persists what it collects.
pub struct ProvisioningFlow<P> {
    portal: P,
}

impl<P: CaptivePortal> ProvisioningFlow<P> {
    pub fn new(portal: P) -> Self {
        Self { portal }
    }

    pub fn portal(&self) -> &P {
        &self.portal
    }

    pub fn portal_mut(&mut self) -> &mut P {
        &mut self.portal
    }

    /// Collect host and port from the operator and save them.
    ///
    /// A failed save is logged and the collected configuration is still
    /// returned, so it is used for the rest of this run.
    pub async fn run<S: ConfigStorage>(
        &mut self,
        store: &mut ConfigStore<S>,
    ) -> Result<DeviceConfig, PortalError> {
        info!("Starting captive portal {}", DEVICE_ID);
        let values = self
            .portal
            .collect(DEVICE_ID, &[SERVER_PARAMETER, PORT_PARAMETER])
            .await?;
        info!("Captive portal completed");

        let host = truncate_chars(
            values.get(SERVER_PARAMETER.id).unwrap_or(""),
            SERVER_PARAMETER.max_len,
        );
        let port = truncate_chars(
            values.get(PORT_PARAMETER.id).unwrap_or(""),
            PORT_PARAMETER.max_len,
        );
        info!("Portal host: {}, port: {}", host, port);

        let config = DeviceConfig::from_text(host, port);
        if !config.is_provisioned() {
            warn!("Portal returned no host; provisioning will run again");
        }
        if port.trim().is_empty() {
            info!("No port given, using {}", DEFAULT_PORT);
        }

        if let Err(e) = store.save(&config) {
            error!("Failed to open config file for writing: {}", AppError::from(e));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryStorage, MockPortal};
    use embassy_futures::block_on;

    #[test]
    fn test_collected_values_are_saved() {
        let mut flow = ProvisioningFlow::new(MockPortal::submitting("10.0.0.5", "1880"));
        let mut store = ConfigStore::new(MemoryStorage::default());

        let config = block_on(flow.run(&mut store)).unwrap();

        assert_eq!(config, DeviceConfig::new("10.0.0.5", 1880));
        assert_eq!(store.try_load(), Ok(config));
    }

    #[test]
    fn test_portal_asks_for_server_and_port() {
        let mut flow = ProvisioningFlow::new(MockPortal::submitting("h", "1"));
        let mut store = ConfigStore::new(MemoryStorage::default());

        block_on(flow.run(&mut store)).unwrap();

        let portal = flow.portal();
        assert_eq!(portal.ap_name.as_deref(), Some(DEVICE_ID));
        assert_eq!(portal.asked, [SERVER_PARAMETER, PORT_PARAMETER]);
    }

    #[test]
    fn test_bad_port_falls_back() {
        let mut flow = ProvisioningFlow::new(MockPortal::submitting("10.0.0.5", "zero"));
        let mut store = ConfigStore::new(MemoryStorage::default());

        let config = block_on(flow.run(&mut store)).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_long_values_are_truncated() {
        let long_host = "a".repeat(60);
        let mut flow = ProvisioningFlow::new(MockPortal::submitting(&long_host, "8080"));
        let mut store = ConfigStore::new(MemoryStorage::default());

        let config = block_on(flow.run(&mut store)).unwrap();
        assert_eq!(config.host.len(), PORTAL_PARAM_MAX_LEN);
    }

    #[test]
    fn test_save_failure_keeps_config_in_memory() {
        let mut storage = MemoryStorage::default();
        storage.writable = false;
        let mut store = ConfigStore::new(storage);
        let mut flow = ProvisioningFlow::new(MockPortal::submitting("10.0.0.5", "9000"));

        let config = block_on(flow.run(&mut store)).unwrap();

        assert_eq!(config, DeviceConfig::new("10.0.0.5", 9000));
        assert!(store.storage().record.is_none());
    }

    #[test]
    fn test_portal_failure_is_reported() {
        let mut flow = ProvisioningFlow::new(MockPortal::failing());
        let mut store = ConfigStore::new(MemoryStorage::default());

        assert_eq!(block_on(flow.run(&mut store)), Err(PortalError::Abandoned));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 40), "abc");
    }

    #[test]
    fn test_portal_values_replace_existing() {
        let mut values = PortalValues::new();
        values.insert("server", "a");
        values.insert("server", "b");
        assert_eq!(values.get("server"), Some("b"));
        assert_eq!(values.get("port"), None);
    }
}
