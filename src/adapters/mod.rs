//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `config_store` | ConfigPort         | Compiled-in config       |
//! | `display`      | DisplayPort        | TFT panel, serial log    |
//! | `hardware`     | SensorPort         | ESP32 ADC, GPIO inputs   |
//! |                | ActuatorPort       | Relays, buzzer           |
//! | `log_sink`     | EventSink          | Serial log output        |
//! | `mdns`         | —                  | ESP-IDF mDNS component   |
//! | `ota_server`   | —                  | ESP-IDF HTTP server      |
//! | `time`         | ClockPort          | ESP32 system timer       |
//! | `wifi`         | ConnectivityPort   | ESP-IDF WiFi STA         |

pub mod config_store;
pub mod display;
pub mod hardware;
pub mod log_sink;
pub mod mdns;
#[cfg(target_os = "espidf")]
pub mod ota_server;
pub mod time;
pub mod wifi;
