//! Actuator drivers, input monitors, hardware initialisation.

pub mod button;
pub mod buzzer;
pub mod hw_init;
pub mod ili9341;
pub mod relay;
pub mod watchdog;
