//! Reflow Oven Firmware: Main Entry Point
//!
//! Hexagonal architecture around a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   InMemoryConfig  Esp32Time    │
//! │  (Sensor+Actuator) (EventSink)    (ConfigPort)    (ClockPort)  │
//! │  WifiAdapter       MdnsAdapter    ota_server      PanelDisplay │
//! │  (Connectivity)    (_http._tcp)   (POST /update)  (ILI9341)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              OvenService (pure logic)                  │    │
//! │  │  Estimator · Stage FSM · Safety · Slice PWM · Alarm    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  DisplayScheduler (reads StatusSnapshot, never writes back)    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use anyhow::Result;
use display_interface_spi::SPIInterface;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::hal::spi::{SpiDeviceDriver, SpiDriver, SpiDriverConfig, config::Config as SpiConfig};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{error, info, warn};

use reflow::adapters::config_store::InMemoryConfig;
use reflow::adapters::display::{LogDisplay, PanelDisplay};
use reflow::adapters::hardware::{HardwareAdapter, OvenOutputs};
use reflow::adapters::log_sink::LogEventSink;
use reflow::adapters::mdns::MdnsAdapter;
use reflow::adapters::ota_server;
use reflow::adapters::time::Esp32TimeAdapter;
use reflow::adapters::wifi::{ConnectivityPort, WifiAdapter, link_actions};
use reflow::app::events::AppEvent;
use reflow::app::ports::{ClockPort, ConfigPort, EventSink};
use reflow::app::service::OvenService;
use reflow::display::{DisplayPort, DisplayScheduler};
use reflow::drivers::hw_init::{self, Adc1Channel, HwPin};
use reflow::drivers::ili9341::Ili9341;
use reflow::drivers::watchdog::Watchdog;
use reflow::ota::{self, OtaManager, SharedOta};
use reflow::pins;

const WATCHDOG_TIMEOUT_MS: u32 = 5_000;
const TELEMETRY_PERIOD_MS: u64 = 1_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!(target: "Core", "╔══════════════════════════════════════╗");
    info!(target: "Core", "║  Reflow Oven v{:<23}║", env!("CARGO_PKG_VERSION"));
    info!(target: "Core", "╚══════════════════════════════════════╝");

    ota::check_rollback();

    // ── 2. Configuration ──────────────────────────────────────
    let config = InMemoryConfig::default().load()?;

    // ── 3. Hardware ───────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals(config.relay_inverted) {
        error!(target: "I/O", "HAL init failed: {}, halting", e);
        return Err(e.into());
    }
    let outputs = OvenOutputs::new(
        HwPin::new(pins::RELAY_TOP_GPIO),
        HwPin::new(pins::RELAY_BOT_GPIO),
        HwPin::new(pins::BUZZER_GPIO),
        config.relay_inverted,
    )?;
    let mut hw = HardwareAdapter::new(
        Adc1Channel(pins::THERM_ADC1_CHANNEL),
        HwPin::new(pins::BUTTON_GPIO),
        HwPin::new(pins::DOOR_SWITCH_GPIO),
        outputs,
    );
    let watchdog = Watchdog::new(WATCHDOG_TIMEOUT_MS);
    let clock = Esp32TimeAdapter::new();
    let mut sink = LogEventSink::new();
    let peripherals = Peripherals::take()?;

    // ── 4. Display ────────────────────────────────────────────
    // Pins match pins::TFT_*.
    let panel = SpiDriver::new(
        peripherals.spi2,
        peripherals.pins.gpio12,
        peripherals.pins.gpio11,
        None::<AnyIOPin>,
        &SpiDriverConfig::new(),
    )
    .and_then(|bus| {
        SpiDeviceDriver::new(
            bus,
            Some(peripherals.pins.gpio10),
            &SpiConfig::new().baudrate(pins::TFT_SPI_HZ.Hz()),
        )
    })
    .and_then(|spi| Ok(SPIInterface::new(spi, PinDriver::output(peripherals.pins.gpio9)?)));
    let mut screen: Box<dyn DisplayPort> = match panel {
        Ok(bus) => {
            let mut tft = Ili9341::new(bus);
            match tft.init(&mut FreeRtos) {
                Ok(()) => Box::new(PanelDisplay::new(tft)),
                Err(e) => {
                    warn!(target: "Screen", "TFT init failed: {e:?}, logging instead");
                    Box::new(LogDisplay::new())
                }
            }
        }
        Err(e) => {
            warn!(target: "Screen", "TFT bus setup failed: {e}, logging instead");
            Box::new(LogDisplay::new())
        }
    };
    screen.clear();

    info!(target: "Screen", "Waiting for {} ms...", config.boot_delay_ms);
    let boot_start = clock.now_ms();
    while clock.now_ms().saturating_sub(boot_start) < u64::from(config.boot_delay_ms) {
        FreeRtos::delay_ms(10);
        watchdog.feed();
    }

    // ── 5. Network (updates only) ─────────────────────────────
    // Only the HTTP handler locks the manager; the loop reads the monitor.
    let ota: SharedOta = Arc::new(Mutex::new(OtaManager::new()));
    let ota_monitor = ota.lock().map_err(|_| anyhow::anyhow!("OTA lock poisoned"))?.monitor();
    let mut wifi = WifiAdapter::from_build_env();
    let mut mdns = MdnsAdapter::new(&config.network);
    let mut update_server = None;
    let mut update_server_failed = false;

    if wifi.has_credentials() {
        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;
        let driver = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))
            .and_then(|w| BlockingWifi::wrap(w, sysloop));
        match driver {
            Ok(driver) => {
                wifi.attach(driver);
                // A failure schedules a retry; services start on association.
                let _ = wifi.connect(clock.now_ms());
            }
            Err(e) => warn!(target: "Core", "WiFi driver init failed: {e}"),
        }
    }

    // ── 6. Service ────────────────────────────────────────────
    let mut service = OvenService::new(config.clone());
    service.start(&clock, &mut sink);

    let mut display = DisplayScheduler::new(
        config.display_temp_ms,
        config.display_status_ms,
        clock.now_ms(),
    );
    display.request_reset(screen.as_mut());
    let mut last_telemetry_ms = clock.now_ms();

    info!(target: "Core", "System ready. Entering control loop.");

    // ── 7. Control loop ───────────────────────────────────────
    loop {
        service.tick(&mut hw, &clock, &mut sink);
        let now = clock.now_ms();

        display.render(now, &service.status(), ota_monitor.status(), screen.as_mut());

        if now.saturating_sub(last_telemetry_ms) >= TELEMETRY_PERIOD_MS {
            sink.emit(&AppEvent::Telemetry(service.status()));
            last_telemetry_ms = now;
        }

        if ota_monitor.ready_to_reboot() {
            service.shutdown(&mut hw);
            mdns.stop();
            ota::restart();
        }

        if wifi.has_credentials() {
            wifi.poll(now);
            let actions = link_actions(
                wifi.is_connected(),
                mdns.is_active(),
                update_server.is_some() || update_server_failed,
            );
            if actions.start_update_server {
                match ota_server::start(config.network.ota_port, Arc::clone(&ota)) {
                    Ok(server) => update_server = Some(server),
                    Err(e) => {
                        warn!(target: "Core", "OTA server failed: {e:#}");
                        update_server_failed = true;
                    }
                }
            }
            if actions.start_mdns {
                if let Err(e) = mdns.start() {
                    warn!(target: "Core", "mDNS: {e}");
                }
            }
            if actions.stop_mdns {
                mdns.stop();
            }
        }

        watchdog.feed();
        FreeRtos::delay_ms(config.tick_interval_ms);
    }
}
