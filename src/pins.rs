//! GPIO / peripheral pin assignments for the reflow oven controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Heater relays (SSR modules, active-low inputs on the stock board)
// ---------------------------------------------------------------------------

/// Digital output: top heater element relay.
pub const RELAY_TOP_GPIO: i32 = 5;
/// Digital output: bottom heater element relay.
pub const RELAY_BOT_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Alarm
// ---------------------------------------------------------------------------

/// Digital output: piezo buzzer driver transistor (active HIGH).
pub const BUZZER_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Sensors: Analog (ADC1)
// ---------------------------------------------------------------------------

/// Oven thermistor divider.
/// ADC1 channel 0 (GPIO 1 on ESP32-S3).
pub const THERM_ADC_GPIO: i32 = 1;
/// ADC1 channel number for [`THERM_ADC_GPIO`].
pub const THERM_ADC1_CHANNEL: u32 = 0;

// ---------------------------------------------------------------------------
// Digital inputs
// ---------------------------------------------------------------------------

/// Momentary start button (active-high, internal pull-down).
pub const BUTTON_GPIO: i32 = 16;

/// Door reed switch to ground: LOW = door closed, HIGH = open
/// (internal pull-up).
pub const DOOR_SWITCH_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// ILI9341 TFT (SPI2, write-only)
// ---------------------------------------------------------------------------

/// SPI clock.
pub const TFT_SCLK_GPIO: i32 = 12;
/// SPI data out (MOSI).
pub const TFT_MOSI_GPIO: i32 = 11;
/// Chip select.
pub const TFT_CS_GPIO: i32 = 10;
/// Data/command select.
pub const TFT_DC_GPIO: i32 = 9;
/// Panel SPI clock.
pub const TFT_SPI_HZ: u32 = 26_000_000;
