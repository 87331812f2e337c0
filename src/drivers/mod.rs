//! Output drivers and ESP-IDF peripheral bring-up.

pub mod hw_init;
pub mod hw_timer;
pub mod pwm;
