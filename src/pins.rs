//! GPIO / peripheral pin assignments for the controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Illumination (low-side MOSFET per colour, active HIGH)
// ---------------------------------------------------------------------------

pub const LED_RED_GPIO: i32 = 11;
pub const LED_GREEN_GPIO: i32 = 12;
pub const LED_BLUE_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Starter inhibit (two relay drivers, always driven together)
// ---------------------------------------------------------------------------

pub const STARTER_1_GPIO: i32 = 4;
pub const STARTER_2_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Engine speed
// ---------------------------------------------------------------------------

/// Conditioned ignition pulse, two rising edges per crank revolution.
pub const RPM_INPUT_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// Configuration UART
// ---------------------------------------------------------------------------

/// UART peripheral used by the configuration tool.
pub const UART_PORT: i32 = 1;
pub const UART_TX_GPIO: i32 = 17;
pub const UART_RX_GPIO: i32 = 18;

/// Colour outputs in channel order (red, green, blue).
pub const COLOUR_GPIOS: [i32; 3] = [LED_RED_GPIO, LED_GREEN_GPIO, LED_BLUE_GPIO];
pub const STARTER_GPIOS: [i32; 2] = [STARTER_1_GPIO, STARTER_2_GPIO];
