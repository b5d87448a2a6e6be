//! Real-time control loops downstream of the stage controller.

pub mod alarm;
pub mod pwm;
