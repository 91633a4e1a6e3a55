//! # Menu State Machine
//!
//! Three-button navigation (Up, Down, Select) over the settings screens.
//!
//! The menu only decides where to go next and what the operator asked for.
//! Requests come back as [`MenuCommand`]s that the transmitter carries out,
//! so the menu never touches trim, the receiver table, or the link itself.

use std::time::{Duration, Instant};

use crate::controller::sample::MenuLines;
use crate::controller::trim::{TrimAxis, TrimDirection};

/// Menu navigation button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuButton {
    Up,
    Down,
    Select,
}

impl MenuButton {
    const ALL: [MenuButton; 3] = [MenuButton::Up, MenuButton::Down, MenuButton::Select];
}

/// Main menu entries, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainEntry {
    ReceiverSelect,
    ThrottleMode,
    Trim,
    Calibration,
    InputMonitor,
    SystemInfo,
    SaveExit,
}

impl MainEntry {
    /// Entries in display order
    pub const ALL: [MainEntry; 7] = [
        MainEntry::ReceiverSelect,
        MainEntry::ThrottleMode,
        MainEntry::Trim,
        MainEntry::Calibration,
        MainEntry::InputMonitor,
        MainEntry::SystemInfo,
        MainEntry::SaveExit,
    ];

    /// Text shown for the entry on the main menu
    pub fn label(self) -> &'static str {
        match self {
            MainEntry::ReceiverSelect => "Select Receiver",
            MainEntry::ThrottleMode => "Throttle Mode",
            MainEntry::Trim => "Trim Adjust",
            MainEntry::Calibration => "Calibration",
            MainEntry::InputMonitor => "Input Monitor",
            MainEntry::SystemInfo => "System Info",
            MainEntry::SaveExit => "Save & Exit",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Calibration screen phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    /// Sticks released, waiting for Select to capture centers
    AwaitCenter,
    /// Operator is sweeping every axis to its limits
    Sweeping,
}

/// Current screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    Main { cursor: usize },
    ReceiverSelect { cursor: usize },
    ThrottleMode,
    Trim { axis: TrimAxis },
    Calibration { phase: CalibrationPhase },
    InputMonitor,
    SystemInfo,
}

impl Default for Menu {
    fn default() -> Self {
        Menu::Main { cursor: 0 }
    }
}

/// Something the operator asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    SelectReceiver(usize),
    ToggleThrottleMode,
    AdjustTrim(TrimAxis, TrimDirection),
    CaptureCenter,
    CommitCalibration,
    CancelCalibration,
    SaveSettings,
}

/// What the menu needs to know about the rest of the transmitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuContext {
    pub receiver_count: usize,
    pub current_receiver: usize,
}

impl Menu {
    /// Applies one button press.
    ///
    /// # Returns
    ///
    /// The next screen and, if the press asked for one, a command.
    ///
    /// # Examples
    ///
    /// ```
    /// use rc_transmitter::menu::{Menu, MenuButton, MenuCommand, MenuContext};
    ///
    /// let ctx = MenuContext { receiver_count: 5, current_receiver: 0 };
    /// let (menu, _) = Menu::default().handle(MenuButton::Down, &ctx);
    /// let (menu, command) = menu.handle(MenuButton::Select, &ctx);
    /// assert_eq!(menu, Menu::ThrottleMode);
    /// assert_eq!(command, None);
    ///
    /// let (_, command) = menu.handle(MenuButton::Up, &ctx);
    /// assert_eq!(command, Some(MenuCommand::ToggleThrottleMode));
    /// ```
    #[must_use]
    pub fn handle(self, button: MenuButton, ctx: &MenuContext) -> (Menu, Option<MenuCommand>) {
        match self {
            Menu::Main { cursor } => Self::handle_main(cursor, button, ctx),

            Menu::ReceiverSelect { cursor } => match button {
                MenuButton::Up => (
                    Menu::ReceiverSelect {
                        cursor: wrap_prev(cursor, ctx.receiver_count),
                    },
                    None,
                ),
                MenuButton::Down => (
                    Menu::ReceiverSelect {
                        cursor: wrap_next(cursor, ctx.receiver_count),
                    },
                    None,
                ),
                MenuButton::Select => (
                    back_to(MainEntry::ReceiverSelect),
                    Some(MenuCommand::SelectReceiver(cursor)),
                ),
            },

            Menu::ThrottleMode => match button {
                MenuButton::Up | MenuButton::Down => {
                    (Menu::ThrottleMode, Some(MenuCommand::ToggleThrottleMode))
                }
                MenuButton::Select => (back_to(MainEntry::ThrottleMode), None),
            },

            Menu::Trim { axis } => match button {
                MenuButton::Up => (
                    Menu::Trim { axis },
                    Some(MenuCommand::AdjustTrim(axis, TrimDirection::Up)),
                ),
                MenuButton::Down => (
                    Menu::Trim { axis },
                    Some(MenuCommand::AdjustTrim(axis, TrimDirection::Down)),
                ),
                MenuButton::Select => match axis.next() {
                    Some(next) => (Menu::Trim { axis: next }, None),
                    None => (back_to(MainEntry::Trim), None),
                },
            },

            Menu::Calibration { phase } => match (phase, button) {
                (CalibrationPhase::AwaitCenter, MenuButton::Select) => (
                    Menu::Calibration {
                        phase: CalibrationPhase::Sweeping,
                    },
                    Some(MenuCommand::CaptureCenter),
                ),
                (CalibrationPhase::AwaitCenter, _) => {
                    (back_to(MainEntry::Calibration), Some(MenuCommand::CancelCalibration))
                }
                (CalibrationPhase::Sweeping, MenuButton::Select) => {
                    (back_to(MainEntry::Calibration), Some(MenuCommand::CommitCalibration))
                }
                (CalibrationPhase::Sweeping, _) => {
                    (back_to(MainEntry::Calibration), Some(MenuCommand::CancelCalibration))
                }
            },

            Menu::InputMonitor => match button {
                MenuButton::Select => (back_to(MainEntry::InputMonitor), None),
                _ => (self, None),
            },

            Menu::SystemInfo => match button {
                MenuButton::Select => (back_to(MainEntry::SystemInfo), None),
                _ => (self, None),
            },
        }
    }

    fn handle_main(
        cursor: usize,
        button: MenuButton,
        ctx: &MenuContext,
    ) -> (Menu, Option<MenuCommand>) {
        let entries = MainEntry::ALL.len();
        match button {
            MenuButton::Up => (
                Menu::Main {
                    cursor: wrap_prev(cursor, entries),
                },
                None,
            ),
            MenuButton::Down => (
                Menu::Main {
                    cursor: wrap_next(cursor, entries),
                },
                None,
            ),
            MenuButton::Select => {
                let entry = MainEntry::ALL[cursor.min(entries - 1)];
                match entry {
                    MainEntry::ReceiverSelect => (
                        Menu::ReceiverSelect {
                            cursor: ctx.current_receiver,
                        },
                        None,
                    ),
                    MainEntry::ThrottleMode => (Menu::ThrottleMode, None),
                    MainEntry::Trim => (
                        Menu::Trim {
                            axis: TrimAxis::Pitch,
                        },
                        None,
                    ),
                    MainEntry::Calibration => (
                        Menu::Calibration {
                            phase: CalibrationPhase::AwaitCenter,
                        },
                        None,
                    ),
                    MainEntry::InputMonitor => (Menu::InputMonitor, None),
                    MainEntry::SystemInfo => (Menu::SystemInfo, None),
                    MainEntry::SaveExit => (Menu::default(), Some(MenuCommand::SaveSettings)),
                }
            }
        }
    }

    /// Screen title
    pub fn title(&self) -> &'static str {
        match self {
            Menu::Main { .. } => "Main Menu",
            Menu::ReceiverSelect { .. } => MainEntry::ReceiverSelect.label(),
            Menu::ThrottleMode => MainEntry::ThrottleMode.label(),
            Menu::Trim { .. } => MainEntry::Trim.label(),
            Menu::Calibration { .. } => MainEntry::Calibration.label(),
            Menu::InputMonitor => MainEntry::InputMonitor.label(),
            Menu::SystemInfo => MainEntry::SystemInfo.label(),
        }
    }
}

fn back_to(entry: MainEntry) -> Menu {
    Menu::Main {
        cursor: entry.index(),
    }
}

fn wrap_next(cursor: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        (cursor + 1) % len
    }
}

fn wrap_prev(cursor: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else if cursor == 0 || cursor >= len {
        len - 1
    } else {
        cursor - 1
    }
}

/// Turns sampled menu lines into button presses
///
/// A press fires on the released-to-pressed edge. After any press, every
/// line is ignored for the debounce interval.
#[derive(Debug, Clone)]
pub struct ButtonEdges {
    debounce: Duration,
    last_press: Option<Instant>,
    held: [bool; 3],
}

impl ButtonEdges {
    /// Creates a detector with no buttons held and no lockout running
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            last_press: None,
            held: [false; 3],
        }
    }

    /// Feeds one reading of the menu lines.
    ///
    /// # Returns
    ///
    /// Buttons that were pressed since the previous reading, in Up, Down,
    /// Select order.
    pub fn update(&mut self, lines: MenuLines, now: Instant) -> Vec<MenuButton> {
        if let Some(last) = self.last_press {
            if now.saturating_duration_since(last) < self.debounce {
                return Vec::new();
            }
        }

        let levels = [lines.up, lines.down, lines.select];
        let mut pressed = Vec::new();
        for ((held, level), button) in self.held.iter_mut().zip(levels).zip(MenuButton::ALL) {
            let down = level.is_asserted();
            if down && !*held {
                pressed.push(button);
            }
            *held = down;
        }

        if !pressed.is_empty() {
            self.last_press = Some(now);
        }
        pressed
    }
}
