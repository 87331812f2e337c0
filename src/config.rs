//! System constants and the Configuration Record.
//!
//! The record is the unit of transfer (serial `l`/`g` commands) and of
//! persistence (storage base address).  Its byte layout is fixed and shared
//! with the desktop configuration tool:
//!
//! ```text
//!   0..60    10 × breakpoint  { rpm u16, red u8, green u8, blue u8, reserved u8 }
//!  60..120    5 × dimmer      { rpm_low, rpm_high, rise, high, fall, low : u16 }
//! 120        starter_on_rpm   u16
//! 122        starter_off_rpm  u16
//! 124        break_hysteresis u8
//! 125        dim_hysteresis   u8
//! 126        active_dimmer    u8
//! 127        dimmer_enabled   u8
//! 128        active_breakpoint u8
//! 129        filter_step      u8
//! ```
//!
//! All multi-byte fields are little-endian.

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Tick period of the periodic timer (microseconds).
pub const TICK_PERIOD_US: u64 = 100;

/// Ticks between two RPM edges that correspond to 1 rpm:
/// 10 000 ticks/s × 60 s / 2 edges per revolution.
pub const RPM_TO_NUM: u32 = 300_000;

/// Edge gap (ticks) after which the engine is considered stopped.
pub const MIN_RPM_TICKS: u32 = 3_000;

/// PWM period in ticks.  Duty values are expressed in the same unit.
pub const PWM_PERIOD: u8 = 100;

/// Interval (ticks) of the coarse check: staleness, effect selection.
pub const CHECK_PERIOD: u32 = 1_000;

// ---------------------------------------------------------------------------
// Serial
// ---------------------------------------------------------------------------

/// Capacity of the inbound and outbound byte rings.
pub const IO_BUFFER_SIZE: usize = 150;

pub const UART_BAUD: u32 = 19_200;

// ---------------------------------------------------------------------------
// Record geometry
// ---------------------------------------------------------------------------

pub const BREAKPOINT_COUNT: usize = 10;
pub const DIMMER_COUNT: usize = 5;

const BREAKPOINT_SIZE: usize = 6;
const DIMMER_SIZE: usize = 12;
const DIMMERS_OFFSET: usize = BREAKPOINT_COUNT * BREAKPOINT_SIZE;
const TAIL_OFFSET: usize = DIMMERS_OFFSET + DIMMER_COUNT * DIMMER_SIZE;

/// Size of a serialized [`ConfigRecord`].
pub const RECORD_SIZE: usize = TAIL_OFFSET + 10;

/// Storage address of the persisted record.
pub const STORAGE_BASE: u16 = 0;

/// Upper bound of any colour duty value (percent).
pub const MAX_DUTY: u8 = 100;

/// One RPM-keyed colour node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Breakpoint {
    pub rpm: u16,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    /// Alignment byte of the wire layout, carried through unchanged.
    pub reserved: u8,
}

impl Breakpoint {
    pub const fn new(rpm: u16, red: u8, green: u8, blue: u8) -> Self {
        Self {
            rpm,
            red,
            green,
            blue,
            reserved: 0,
        }
    }

    /// Duty values in channel order (red, green, blue).
    pub fn duties(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }
}

/// An RPM window with a rise → high → fall → low pulse profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dimmer {
    pub rpm_low: u16,
    pub rpm_high: u16,
    pub rise_ticks: u16,
    pub high_ticks: u16,
    pub fall_ticks: u16,
    pub low_ticks: u16,
}

/// The persisted, transferable configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigRecord {
    pub breakpoints: [Breakpoint; BREAKPOINT_COUNT],
    pub dimmers: [Dimmer; DIMMER_COUNT],
    pub starter_on_rpm: u16,
    pub starter_off_rpm: u16,
    pub break_hysteresis: u8,
    pub dim_hysteresis: u8,
    /// `DIMMER_COUNT` means "no dimmer selected".
    pub active_dimmer: u8,
    pub dimmer_enabled: bool,
    /// `BREAKPOINT_COUNT` means "beyond the last node" (outputs dark).
    pub active_breakpoint: u8,
    /// Ticks per one-unit RPM filter step.
    pub filter_step: u8,
}

impl ConfigRecord {
    /// Decode a record, clamping every out-of-range field.
    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        let u16_at = |off: usize| u16::from_le_bytes([bytes[off], bytes[off + 1]]);

        let breakpoints = core::array::from_fn(|i| {
            let off = i * BREAKPOINT_SIZE;
            Breakpoint {
                rpm: u16_at(off),
                red: bytes[off + 2],
                green: bytes[off + 3],
                blue: bytes[off + 4],
                reserved: bytes[off + 5],
            }
        });
        let dimmers = core::array::from_fn(|i| {
            let off = DIMMERS_OFFSET + i * DIMMER_SIZE;
            Dimmer {
                rpm_low: u16_at(off),
                rpm_high: u16_at(off + 2),
                rise_ticks: u16_at(off + 4),
                high_ticks: u16_at(off + 6),
                fall_ticks: u16_at(off + 8),
                low_ticks: u16_at(off + 10),
            }
        });

        let t = TAIL_OFFSET;
        let mut record = Self {
            breakpoints,
            dimmers,
            starter_on_rpm: u16_at(t),
            starter_off_rpm: u16_at(t + 2),
            break_hysteresis: bytes[t + 4],
            dim_hysteresis: bytes[t + 5],
            active_dimmer: bytes[t + 6],
            dimmer_enabled: bytes[t + 7] != 0,
            active_breakpoint: bytes[t + 8],
            filter_step: bytes[t + 9],
        };
        record.sanitize();
        record
    }

    /// Encode into the fixed wire / storage layout.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        let mut put_u16 = |off: usize, v: u16| out[off..off + 2].copy_from_slice(&v.to_le_bytes());

        for (i, bp) in self.breakpoints.iter().enumerate() {
            put_u16(i * BREAKPOINT_SIZE, bp.rpm);
        }
        for (i, d) in self.dimmers.iter().enumerate() {
            let off = DIMMERS_OFFSET + i * DIMMER_SIZE;
            for (k, v) in [
                d.rpm_low,
                d.rpm_high,
                d.rise_ticks,
                d.high_ticks,
                d.fall_ticks,
                d.low_ticks,
            ]
            .into_iter()
            .enumerate()
            {
                put_u16(off + 2 * k, v);
            }
        }
        put_u16(TAIL_OFFSET, self.starter_on_rpm);
        put_u16(TAIL_OFFSET + 2, self.starter_off_rpm);

        for (i, bp) in self.breakpoints.iter().enumerate() {
            let off = i * BREAKPOINT_SIZE;
            out[off + 2] = bp.red;
            out[off + 3] = bp.green;
            out[off + 4] = bp.blue;
            out[off + 5] = bp.reserved;
        }
        let t = TAIL_OFFSET;
        out[t + 4] = self.break_hysteresis;
        out[t + 5] = self.dim_hysteresis;
        out[t + 6] = self.active_dimmer;
        out[t + 7] = u8::from(self.dimmer_enabled);
        out[t + 8] = self.active_breakpoint;
        out[t + 9] = self.filter_step;
        out
    }

    /// Clamp indices to their table length and duties to 0–100.
    pub fn sanitize(&mut self) {
        self.active_breakpoint = self.active_breakpoint.min(BREAKPOINT_COUNT as u8);
        self.active_dimmer = self.active_dimmer.min(DIMMER_COUNT as u8);
        for bp in &mut self.breakpoints {
            bp.red = bp.red.min(MAX_DUTY);
            bp.green = bp.green.min(MAX_DUTY);
            bp.blue = bp.blue.min(MAX_DUTY);
        }
    }

    /// Overlay the built-in demonstration profile.
    ///
    /// Only the fields the profile defines are written; everything else
    /// keeps its current value.
    pub fn apply_demo(&mut self) {
        self.breakpoints[0] = Breakpoint::new(0, 0, 0, 100);
        self.breakpoints[1] = Breakpoint::new(600, 0, 0, 100);
        self.breakpoints[2] = Breakpoint::new(800, 0, 100, 0);
        self.breakpoints[3] = Breakpoint::new(1500, 0, 100, 0);
        self.breakpoints[4] = Breakpoint::new(3000, 100, 0, 0);

        self.dimmers[0] = Dimmer {
            rpm_low: 1000,
            rpm_high: 8000,
            rise_ticks: 50_000,
            high_ticks: 1_000,
            fall_ticks: 50_000,
            low_ticks: 2_000,
        };

        self.break_hysteresis = 20;
        self.dim_hysteresis = 20;
        self.active_breakpoint = 0;
        self.active_dimmer = 0;
        self.dimmer_enabled = true;
        self.filter_step = 1;
    }

    /// Index of the first breakpoint whose RPM is lower than its
    /// predecessor's, if any.
    pub fn first_unordered_breakpoint(&self) -> Option<usize> {
        self.breakpoints
            .windows(2)
            .position(|w| w[1].rpm < w[0].rpm)
            .map(|i| i + 1)
    }
}
