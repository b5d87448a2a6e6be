//! mDNS service advertisement adapter.
//!
//! Advertises `<host>.local` and an `_http._tcp` service on the OTA port
//! so an update can be pushed by name. Uses the ESP-IDF mDNS component
//! on target and is a no-op on simulation targets.
//!
//! Lifecycle is tied to WiFi: start on connect, stop on disconnect.

use log::info;

use crate::config::NetworkConfig;
use crate::error::CommsError;

const MDNS_SERVICE_TYPE: &str = "_http";
const MDNS_SERVICE_PROTO: &str = "_tcp";

/// mDNS advertisement adapter.
pub struct MdnsAdapter {
    hostname: heapless::String<32>,
    port: u16,
    active: bool,
}

impl MdnsAdapter {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            hostname: config.mdns_host.clone(),
            port: config.ota_port,
            active: false,
        }
    }

    /// Whether mDNS is currently advertising.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Start hostname + service advertisement.
    /// Call after WiFi is connected and has an IP.
    pub fn start(&mut self) -> Result<(), CommsError> {
        if self.active {
            return Ok(());
        }
        self.platform_start()?;
        self.active = true;
        info!(
            target: "Core",
            "mDNS: advertising {}.local {}.{}:{} v{}",
            self.hostname,
            MDNS_SERVICE_TYPE,
            MDNS_SERVICE_PROTO,
            self.port,
            env!("CARGO_PKG_VERSION")
        );
        Ok(())
    }

    /// Stop advertisement. Call before WiFi disconnect.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.platform_stop();
        self.active = false;
        info!(target: "Core", "mDNS: stopped");
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&self) -> Result<(), CommsError> {
        use esp_idf_svc::sys::{
            ESP_OK, mdns_hostname_set, mdns_init, mdns_instance_name_set, mdns_service_add,
        };

        let mut hostname_buf = [0u8; 33];
        let hb = self.hostname.as_bytes();
        hostname_buf[..hb.len()].copy_from_slice(hb);

        // SAFETY: all pointers reference NUL-terminated buffers that outlive
        // the calls; the mDNS component copies what it keeps.
        unsafe {
            if mdns_init() != ESP_OK {
                log::error!(target: "Core", "mDNS: mdns_init failed");
                return Err(CommsError::MdnsFailed);
            }
            if mdns_hostname_set(hostname_buf.as_ptr().cast()) != ESP_OK {
                return Err(CommsError::MdnsFailed);
            }
            mdns_instance_name_set(b"Reflow Oven\0".as_ptr().cast());
            let ret = mdns_service_add(
                core::ptr::null(),
                b"_http\0".as_ptr().cast(),
                b"_tcp\0".as_ptr().cast(),
                self.port,
                core::ptr::null_mut(),
                0,
            );
            if ret != ESP_OK {
                log::error!(target: "Core", "mDNS: service_add failed ({})", ret);
                return Err(CommsError::MdnsFailed);
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&self) -> Result<(), CommsError> {
        info!(target: "Core", "mDNS(sim): registered {}.local", self.hostname);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&self) {
        // SAFETY: only called after a successful mdns_init.
        unsafe {
            esp_idf_svc::sys::mdns_free();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&self) {
        info!(target: "Core", "mDNS(sim): unregistered");
    }
}
