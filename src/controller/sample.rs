//! # Raw Samples
//!
//! What the input collaborator hands over once per control tick: one integer
//! per continuous channel plus a typed snapshot of every discrete line.
//!
//! ## Expander Line Layout
//!
//! Discrete controls sit on a 16-line I/O expander with pull-ups, so a closed
//! switch or pressed button reads **low**:
//!
//! | Bit | Line |
//! |-----|------|
//! | 0-3 | AUX3..AUX6 two-position switches |
//! | 4, 5 | AUX7 line A, line B |
//! | 6, 7 | AUX8 line A, line B |
//! | 8, 9 | Pitch trim up, down |
//! | 10, 11 | Roll trim up, down |
//! | 12, 13 | Yaw trim up, down |
//!
//! Menu buttons are wired directly and arrive separately as [`MenuLines`].

use std::time::Instant;

use super::calibration::{ADC_CENTER, ADC_MIN};
use super::trim::TrimAxis;
use crate::error::Result;
use crate::packet::layout::{NUM_SWITCHES, NUM_THREE_WAY};

/// Expander bit positions.
pub mod port_bits {
    /// First two-position switch (AUX3); AUX4..AUX6 follow.
    pub const AUX3: u8 = 0;
    /// AUX7 line A
    pub const AUX7_A: u8 = 4;
    /// AUX7 line B
    pub const AUX7_B: u8 = 5;
    /// AUX8 line A
    pub const AUX8_A: u8 = 6;
    /// AUX8 line B
    pub const AUX8_B: u8 = 7;
    /// Pitch trim up; down, then roll and yaw pairs follow.
    pub const TRIM_PITCH_UP: u8 = 8;
    /// Pitch trim down
    pub const TRIM_PITCH_DOWN: u8 = 9;
    /// Roll trim up
    pub const TRIM_ROLL_UP: u8 = 10;
    /// Roll trim down
    pub const TRIM_ROLL_DOWN: u8 = 11;
    /// Yaw trim up
    pub const TRIM_YAW_UP: u8 = 12;
    /// Yaw trim down
    pub const TRIM_YAW_DOWN: u8 = 13;
}

/// Port word with every line released (all pulled high).
pub const PORT_IDLE: u16 = 0xFFFF;

/// Electrical level of an active-low input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    /// Pulled to ground: switch closed / button pressed.
    Low,
    /// Pulled up: switch open / button released.
    #[default]
    High,
}

impl Level {
    /// True when the line is pulled low (active).
    #[must_use]
    pub fn is_asserted(self) -> bool {
        self == Level::Low
    }

    /// Level for a logical "pressed" state.
    #[must_use]
    pub fn from_asserted(asserted: bool) -> Self {
        if asserted {
            Level::Low
        } else {
            Level::High
        }
    }

    fn from_port(port: u16, bit: u8) -> Self {
        if port & (1 << bit) == 0 {
            Level::Low
        } else {
            Level::High
        }
    }
}

/// The two lines of a three-position switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreeWayLines {
    pub a: Level,
    pub b: Level,
}

/// Up/down trim buttons for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrimLines {
    pub up: Level,
    pub down: Level,
}

/// Menu navigation buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MenuLines {
    pub up: Level,
    pub down: Level,
    pub select: Level,
}

/// Every discrete line, read once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiscreteInputSnapshot {
    /// AUX3..AUX6
    pub switches: [Level; NUM_SWITCHES],
    /// AUX7, AUX8
    pub three_way: [ThreeWayLines; NUM_THREE_WAY],
    /// Indexed by [`TrimAxis::index`]
    pub trim: [TrimLines; TrimAxis::COUNT],
    /// Menu navigation
    pub menu: MenuLines,
}

impl DiscreteInputSnapshot {
    /// Decodes an expander port word into typed lines.
    ///
    /// # Examples
    ///
    /// ```
    /// use rc_transmitter::controller::sample::{DiscreteInputSnapshot, MenuLines, PORT_IDLE};
    ///
    /// // AUX3 closed, everything else open
    /// let snapshot = DiscreteInputSnapshot::from_port_bits(PORT_IDLE & !0b1, MenuLines::default());
    /// assert!(snapshot.switches[0].is_asserted());
    /// assert!(!snapshot.switches[1].is_asserted());
    /// ```
    #[must_use]
    pub fn from_port_bits(port: u16, menu: MenuLines) -> Self {
        let mut switches = [Level::High; NUM_SWITCHES];
        for (i, switch) in switches.iter_mut().enumerate() {
            *switch = Level::from_port(port, port_bits::AUX3 + i as u8);
        }

        let three_way = [
            ThreeWayLines {
                a: Level::from_port(port, port_bits::AUX7_A),
                b: Level::from_port(port, port_bits::AUX7_B),
            },
            ThreeWayLines {
                a: Level::from_port(port, port_bits::AUX8_A),
                b: Level::from_port(port, port_bits::AUX8_B),
            },
        ];

        let trim = [
            TrimLines {
                up: Level::from_port(port, port_bits::TRIM_PITCH_UP),
                down: Level::from_port(port, port_bits::TRIM_PITCH_DOWN),
            },
            TrimLines {
                up: Level::from_port(port, port_bits::TRIM_ROLL_UP),
                down: Level::from_port(port, port_bits::TRIM_ROLL_DOWN),
            },
            TrimLines {
                up: Level::from_port(port, port_bits::TRIM_YAW_UP),
                down: Level::from_port(port, port_bits::TRIM_YAW_DOWN),
            },
        ];

        Self {
            switches,
            three_way,
            trim,
            menu,
        }
    }
}

/// One reading of every control, taken at `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub throttle: i32,
    pub pitch: i32,
    pub roll: i32,
    pub yaw: i32,
    pub aux1: i32,
    pub aux2: i32,
    pub discrete: DiscreteInputSnapshot,
    pub timestamp: Instant,
}

impl RawSample {
    /// Sticks centered, throttle and pots at minimum, every line released.
    #[must_use]
    pub fn at_rest(timestamp: Instant) -> Self {
        Self {
            throttle: ADC_MIN,
            pitch: ADC_CENTER,
            roll: ADC_CENTER,
            yaw: ADC_CENTER,
            aux1: ADC_MIN,
            aux2: ADC_MIN,
            discrete: DiscreteInputSnapshot::default(),
            timestamp,
        }
    }
}

/// Source of raw control readings.
///
/// Called once per control tick. An error skips the whole tick; nothing
/// partial is ever transmitted.
#[cfg_attr(test, mockall::automock)]
pub trait InputSampler {
    /// Reads every control without blocking.
    fn sample(&mut self, now: Instant) -> Result<RawSample>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_active_low() {
        assert!(Level::Low.is_asserted());
        assert!(!Level::High.is_asserted());
        assert_eq!(Level::default(), Level::High);
        assert_eq!(Level::from_asserted(true), Level::Low);
        assert_eq!(Level::from_asserted(false), Level::High);
    }

    #[test]
    fn test_idle_port_releases_everything() {
        let snapshot = DiscreteInputSnapshot::from_port_bits(PORT_IDLE, MenuLines::default());
        assert_eq!(snapshot, DiscreteInputSnapshot::default());
    }

    #[test]
    fn test_port_bits_switches() {
        // AUX4 and AUX6 closed
        let port = PORT_IDLE & !(1 << 1) & !(1 << 3);
        let snapshot = DiscreteInputSnapshot::from_port_bits(port, MenuLines::default());
        assert_eq!(
            snapshot.switches,
            [Level::High, Level::Low, Level::High, Level::Low]
        );
    }

    #[test]
    fn test_port_bits_three_way() {
        let port = PORT_IDLE & !(1 << port_bits::AUX7_A) & !(1 << port_bits::AUX8_B);
        let snapshot = DiscreteInputSnapshot::from_port_bits(port, MenuLines::default());
        assert!(snapshot.three_way[0].a.is_asserted());
        assert!(!snapshot.three_way[0].b.is_asserted());
        assert!(!snapshot.three_way[1].a.is_asserted());
        assert!(snapshot.three_way[1].b.is_asserted());
    }

    #[test]
    fn test_port_bits_trim() {
        let port = PORT_IDLE & !(1 << port_bits::TRIM_ROLL_DOWN) & !(1 << port_bits::TRIM_YAW_UP);
        let snapshot = DiscreteInputSnapshot::from_port_bits(port, MenuLines::default());
        let roll = snapshot.trim[TrimAxis::Roll.index()];
        let yaw = snapshot.trim[TrimAxis::Yaw.index()];
        let pitch = snapshot.trim[TrimAxis::Pitch.index()];
        assert!(roll.down.is_asserted() && !roll.up.is_asserted());
        assert!(yaw.up.is_asserted() && !yaw.down.is_asserted());
        assert!(!pitch.up.is_asserted() && !pitch.down.is_asserted());
    }

    #[test]
    fn test_menu_lines_pass_through() {
        let menu = MenuLines {
            select: Level::Low,
            ..MenuLines::default()
        };
        let snapshot = DiscreteInputSnapshot::from_port_bits(PORT_IDLE, menu);
        assert_eq!(snapshot.menu, menu);
    }

    #[test]
    fn test_raw_sample_at_rest() {
        let now = Instant::now();
        let sample = RawSample::at_rest(now);
        assert_eq!(sample.pitch, ADC_CENTER);
        assert_eq!(sample.throttle, ADC_MIN);
        assert_eq!(sample.timestamp, now);
    }
}
