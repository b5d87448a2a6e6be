//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`], the boundary for network connectivity.
//! The network only carries firmware updates; nothing here feeds back into
//! the control core.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! On disconnect the adapter waits an exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s) before retrying.
//!
//! ## Services
//!
//! [`link_actions`] tells the main loop what to bring up after each poll.
//! The update server and mDNS start on the first association, whether
//! that happens at boot or on a later reconnect.

use core::fmt;
use log::{error, info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    AlreadyConnected,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::AlreadyConnected => write!(f, "already connected to AP"),
        }
    }
}

impl From<ConnectivityError> for crate::error::Error {
    fn from(_: ConnectivityError) -> Self {
        crate::error::CommsError::WifiConnectFailed.into()
    }
}

pub trait ConnectivityPort {
    fn connect(&mut self, now_ms: u64) -> Result<(), ConnectivityError>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    /// Drive reconnects; call from the main loop.
    fn poll(&mut self, now_ms: u64);
    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;
    fn rssi(&self) -> Option<i8>;
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
}

const INITIAL_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    backoff_secs: u32,
    next_retry_ms: u64,
    last_rssi: Option<i8>,
    #[cfg(target_os = "espidf")]
    wifi: Option<BlockingWifi<EspWifi<'static>>>,
    /// Simulation: number of upcoming connect attempts that fail.
    #[cfg(not(target_os = "espidf"))]
    sim_failures: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_link_up: bool,
}

impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiAdapter {
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_secs: INITIAL_BACKOFF_SECS,
            next_retry_ms: 0,
            last_rssi: None,
            #[cfg(target_os = "espidf")]
            wifi: None,
            #[cfg(not(target_os = "espidf"))]
            sim_failures: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_link_up: false,
        }
    }

    /// Adapter with the credentials baked in at build time
    /// (`WIFI_SSID` / `WIFI_PASS`). Missing credentials leave the
    /// adapter unconfigured; the oven works without a network.
    pub fn from_build_env() -> Self {
        let mut adapter = Self::new();
        match option_env!("WIFI_SSID") {
            Some(ssid) => {
                let pass = option_env!("WIFI_PASS").unwrap_or("");
                if let Err(e) = adapter.set_credentials(ssid, pass) {
                    warn!(target: "Core", "WiFi: build-time credentials rejected: {e}");
                }
            }
            None => info!(target: "Core", "WiFi: no build-time credentials"),
        }
        adapter
    }

    /// Hand over the ESP-IDF driver. Must be called before `connect`.
    #[cfg(target_os = "espidf")]
    pub fn attach(&mut self, wifi: BlockingWifi<EspWifi<'static>>) {
        self.wifi = Some(wifi);
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn has_credentials(&self) -> bool {
        !self.ssid.is_empty()
    }

    /// Seconds the next reconnect waits after a failure.
    pub fn backoff_secs(&self) -> u32 {
        self.backoff_secs
    }

    /// Simulation: make the next `n` connect attempts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim_failures = n;
    }

    /// Simulation: drop the link as if the AP went away.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        self.sim_link_up = false;
    }

    fn schedule_retry(&mut self, attempt: u32, now_ms: u64) {
        self.next_retry_ms = now_ms + u64::from(self.backoff_secs) * 1_000;
        self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
        self.state = WifiState::Reconnecting { attempt };
    }

    fn on_connected(&mut self) {
        self.state = WifiState::Connected;
        self.backoff_secs = INITIAL_BACKOFF_SECS;
        self.last_rssi = self.platform_rssi();
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let Some(wifi) = self.wifi.as_mut() else {
            error!(target: "Core", "WiFi: driver not attached");
            return Err(ConnectivityError::ConnectionFailed);
        };
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        let step = |what: &str, r: Result<(), esp_idf_svc::sys::EspError>| {
            r.map_err(|e| {
                warn!(target: "Core", "WiFi: {what} failed: {e}");
                ConnectivityError::ConnectionFailed
            })
        };
        step("configure", wifi.set_configuration(&config))?;
        if !wifi.is_started().unwrap_or(false) {
            step("start", wifi.start())?;
        }
        step("connect", wifi.connect())?;
        step("netif up", wifi.wait_netif_up())?;
        if let Ok(ip) = wifi.wifi().sta_netif().get_ip_info() {
            info!(target: "Core", "WiFi Ready, IP address: {}", ip.ip);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        if self.sim_failures > 0 {
            self.sim_failures -= 1;
            warn!(target: "Core", "WiFi(sim): simulated connect failure");
            return Err(ConnectivityError::ConnectionFailed);
        }
        self.sim_link_up = true;
        info!(target: "Core", "WiFi(sim): connected to '{}'", self.ssid);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        if let Some(wifi) = self.wifi.as_mut() {
            if let Err(e) = wifi.disconnect() {
                warn!(target: "Core", "WiFi: disconnect failed: {e}");
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        self.sim_link_up = false;
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi
            .as_ref()
            .is_some_and(|w| w.is_connected().unwrap_or(false))
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim_link_up
    }

    #[cfg(target_os = "espidf")]
    fn platform_rssi(&self) -> Option<i8> {
        use esp_idf_svc::sys::{ESP_OK, esp_wifi_sta_get_ap_info, wifi_ap_record_t};

        let mut info = wifi_ap_record_t::default();
        // SAFETY: `info` is a valid out-parameter for the duration of the call.
        let ret = unsafe { esp_wifi_sta_get_ap_info(&mut info) };
        (ret == ESP_OK).then_some(info.rssi)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_rssi(&self) -> Option<i8> {
        self.sim_link_up.then_some(-60)
    }
}

// ───────────────────────────────────────────────────────────────
// Link-driven services
// ───────────────────────────────────────────────────────────────

/// Service changes the main loop applies after polling the link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkActions {
    pub start_mdns: bool,
    pub stop_mdns: bool,
    pub start_update_server: bool,
}

/// mDNS follows the link. The update server starts on the first
/// association and then stays bound across drops.
pub fn link_actions(connected: bool, mdns_active: bool, server_running: bool) -> LinkActions {
    LinkActions {
        start_mdns: connected && !mdns_active,
        stop_mdns: !connected && mdns_active,
        start_update_server: connected && !server_running,
    }
}

// ───────────────────────────────────────────────────────────────
// ConnectivityPort
// ───────────────────────────────────────────────────────────────

impl ConnectivityPort for WifiAdapter {
    fn connect(&mut self, now_ms: u64) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        if self.state == WifiState::Connected {
            return Err(ConnectivityError::AlreadyConnected);
        }

        info!(target: "Core", "WiFi: connecting to '{}'", self.ssid);
        self.state = WifiState::Connecting;

        match self.platform_connect() {
            Ok(()) => {
                self.on_connected();
                info!(target: "Core", "WiFi: connected (RSSI={:?})", self.last_rssi);
                Ok(())
            }
            Err(e) => {
                error!(target: "Core", "WiFi Failed: {}", e);
                self.schedule_retry(0, now_ms);
                Err(e)
            }
        }
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Disconnected;
        self.last_rssi = None;
        info!(target: "Core", "WiFi: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.state == WifiState::Connected && self.platform_is_connected()
    }

    fn poll(&mut self, now_ms: u64) {
        match self.state {
            WifiState::Reconnecting { attempt } if now_ms >= self.next_retry_ms => {
                info!(
                    target: "Core",
                    "WiFi: reconnect attempt {} (backoff {}s)",
                    attempt + 1,
                    self.backoff_secs
                );
                match self.platform_connect() {
                    Ok(()) => {
                        self.on_connected();
                        info!(target: "Core", "WiFi: reconnected (RSSI={:?})", self.last_rssi);
                    }
                    Err(_) => self.schedule_retry(attempt + 1, now_ms),
                }
            }
            WifiState::Connected => {
                if self.platform_is_connected() {
                    self.last_rssi = self.platform_rssi();
                } else {
                    warn!(
                        target: "Core",
                        "{}, entering reconnect",
                        crate::error::Error::from(crate::error::CommsError::WifiDisconnected)
                    );
                    self.last_rssi = None;
                    self.state = WifiState::Reconnecting { attempt: 0 };
                    self.next_retry_ms = now_ms;
                }
            }
            _ => {}
        }
    }

    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid
            .push_str(ssid)
            .map_err(|()| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|()| ConnectivityError::InvalidPassword)?;
        info!(target: "Core", "WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    fn rssi(&self) -> Option<i8> {
        self.last_rssi
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
