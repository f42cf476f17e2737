//! Device modes and the transition table of the clock.
//!
//! Everything here is pure: [`transition`] maps the current [`DeviceMode`]
//! and an input [`Event`] to an [`Action`], and the editors hold the draft
//! and cursor while the user reconfigures the clock. Carrying out actions
//! against the chip is the job of [`crate::clock::ClockContext`].
//!
//! # Transition table
//!
//! | Mode                            | Event                  | Action                 |
//! |---------------------------------|------------------------|------------------------|
//! | any                             | `Select(m)`, `m` other | `Enter(m)`             |
//! | `Running`                       | `Press(Mode)`          | `Enter(ConfigureTime)` |
//! | `Running`                       | `Hold(Mode)`           | `Enter(ConfigureAlarm)`|
//! | `ConfigureTime`/`ConfigureAlarm`| `Press(Increment)`     | `Increment`            |
//! | `ConfigureTime`/`ConfigureAlarm`| `Hold(NextField)`      | `NextField`            |
//! | `ConfigureTime`/`ConfigureAlarm`| `Hold(PreviousField)`  | `PreviousField`        |
//! | `ConfigureTime`/`ConfigureAlarm`| `Press(Confirm)`       | `Commit`               |
//! | `ConfigureTime`/`ConfigureAlarm`| `Press(Cancel)`        | `Discard`              |
//! | `Stopwatch`/`Timers`/`RegisterMonitor` | `Press(Cancel)` | `Enter(Running)`       |
//!
//! Everything else is ignored. `Init` leaves on its own on the first tick.

use crate::{Alarm, AlarmField, AlarmSpec, Time, TimeField};

/// What the clock is currently doing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceMode {
    /// Power-on, before the first tick
    Init = 0,
    /// Showing the time
    Running = 1,
    /// Editing a draft of the time
    ConfigureTime = 2,
    /// Editing a draft of alarm 1
    ConfigureAlarm = 3,
    Stopwatch = 4,
    Timers = 5,
    RegisterMonitor = 6,
}

impl DeviceMode {
    /// Decodes a stored mode. Unknown values recover to [`DeviceMode::Init`].
    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => DeviceMode::Init,
            1 => DeviceMode::Running,
            2 => DeviceMode::ConfigureTime,
            3 => DeviceMode::ConfigureAlarm,
            4 => DeviceMode::Stopwatch,
            5 => DeviceMode::Timers,
            6 => DeviceMode::RegisterMonitor,
            _ => {
                warn!("unknown device mode {}, recovering to Init", raw);
                DeviceMode::Init
            }
        }
    }

    /// Modes that are accepted but do nothing yet.
    #[must_use]
    pub fn is_inert(self) -> bool {
        matches!(
            self,
            DeviceMode::Stopwatch | DeviceMode::Timers | DeviceMode::RegisterMonitor
        )
    }

    #[must_use]
    pub fn is_configuring(self) -> bool {
        matches!(self, DeviceMode::ConfigureTime | DeviceMode::ConfigureAlarm)
    }
}

impl From<DeviceMode> for u8 {
    fn from(mode: DeviceMode) -> Self {
        mode as u8
    }
}

/// Logical input of the clock.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    Increment,
    NextField,
    PreviousField,
    Confirm,
    Cancel,
    Mode,
}

/// Debounced input, as produced by the button scanner.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Short press
    Press(Button),
    /// Button still held after `ticks` scan ticks
    Hold { button: Button, ticks: u16 },
    /// Jump straight to a mode
    Select(DeviceMode),
}

impl Event {
    /// Whether the event should reach the transition table.
    ///
    /// A hold counts once every `long_press_ticks` ticks (at the threshold,
    /// then again at each multiple) so that holding a button auto-repeats.
    /// Holds in between are dropped.
    #[must_use]
    pub fn qualifies(&self, long_press_ticks: u16) -> bool {
        match *self {
            Event::Hold { ticks, .. } => {
                ticks != 0 && ticks.checked_rem(long_press_ticks).map_or(true, |r| r == 0)
            }
            Event::Press(_) | Event::Select(_) => true,
        }
    }
}

/// Effect of an event on the clock.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Switch mode, running the entry action of the new mode
    Enter(DeviceMode),
    /// Write the draft to the chip, then enter `Running`
    Commit,
    /// Drop the draft, then enter `Running`
    Discard,
    /// Bump the field under the cursor
    Increment,
    /// Move the cursor forward
    NextField,
    /// Move the cursor back
    PreviousField,
}

/// The transition table. Hold events are taken as long presses; filter them
/// with [`Event::qualifies`] first.
#[must_use]
pub fn transition(mode: DeviceMode, event: Event) -> Option<Action> {
    use Button::*;
    use DeviceMode::*;

    let action = match (mode, event) {
        (_, Event::Select(target)) if target != mode => Action::Enter(target),
        (_, Event::Select(_)) => return None,
        (Running, Event::Press(Mode)) => Action::Enter(ConfigureTime),
        (Running, Event::Hold { button: Mode, .. }) => Action::Enter(ConfigureAlarm),
        (ConfigureTime | ConfigureAlarm, Event::Press(Increment)) => Action::Increment,
        (ConfigureTime | ConfigureAlarm, Event::Hold { button: NextField, .. }) => {
            Action::NextField
        }
        (ConfigureTime | ConfigureAlarm, Event::Hold { button: PreviousField, .. }) => {
            Action::PreviousField
        }
        (ConfigureTime | ConfigureAlarm, Event::Press(Confirm)) => Action::Commit,
        (ConfigureTime | ConfigureAlarm, Event::Press(Cancel)) => Action::Discard,
        (Stopwatch | Timers | RegisterMonitor, Event::Press(Cancel)) => Action::Enter(Running),
        _ => return None,
    };
    Some(action)
}

/// Blink cadence of the field under the cursor: `half_period` ticks
/// visible, then `half_period` ticks hidden.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Blink {
    counter: u16,
    half_period: u16,
}

impl Blink {
    #[must_use]
    pub fn new(half_period: u16) -> Self {
        Self {
            counter: 0,
            half_period,
        }
    }

    /// Advances one tick and tells whether the cursor field is shown during
    /// it. A zero half period never hides it.
    pub fn tick(&mut self) -> bool {
        let visible = self
            .counter
            .checked_div(self.half_period)
            .map_or(true, |n| n % 2 == 0);
        self.counter = self.counter.wrapping_add(1);
        visible
    }

    /// Starts over with the field visible.
    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

/// Draft and cursor of `ConfigureTime`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeEditor {
    draft: Time,
    cursor: TimeField,
    blink: Blink,
}

impl TimeEditor {
    /// Starts editing `draft` at the seconds.
    #[must_use]
    pub fn new(draft: Time, blink_half_period: u16) -> Self {
        Self {
            draft,
            cursor: TimeField::Second,
            blink: Blink::new(blink_half_period),
        }
    }

    #[must_use]
    pub fn draft(&self) -> &Time {
        &self.draft
    }

    #[must_use]
    pub fn cursor(&self) -> TimeField {
        self.cursor
    }

    pub fn increment(&mut self) {
        self.draft.increment(self.cursor);
        self.blink.reset();
    }

    /// Moves forward, staying on the year.
    pub fn next_field(&mut self) {
        if let Some(field) = self.cursor.next() {
            self.cursor = field;
            self.blink.reset();
        }
    }

    /// Moves back, staying on the seconds.
    pub fn previous_field(&mut self) {
        if let Some(field) = self.cursor.previous() {
            self.cursor = field;
            self.blink.reset();
        }
    }

    pub fn blink(&mut self) -> bool {
        self.blink.tick()
    }
}

/// Draft and cursor of `ConfigureAlarm`. Only alarm 1 is edited.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmEditor {
    draft: AlarmSpec,
    cursor: AlarmField,
    blink: Blink,
}

impl AlarmEditor {
    #[must_use]
    pub fn new(draft: AlarmSpec, blink_half_period: u16) -> Self {
        Self {
            draft,
            cursor: AlarmField::Second,
            blink: Blink::new(blink_half_period),
        }
    }

    #[must_use]
    pub fn draft(&self) -> &AlarmSpec {
        &self.draft
    }

    #[must_use]
    pub fn cursor(&self) -> AlarmField {
        self.cursor
    }

    pub fn increment(&mut self) {
        self.draft.increment(self.cursor);
        self.blink.reset();
    }

    pub fn next_field(&mut self) {
        if let Some(field) = self.cursor.next(Alarm::One) {
            self.cursor = field;
            self.blink.reset();
        }
    }

    pub fn previous_field(&mut self) {
        if let Some(field) = self.cursor.previous(Alarm::One) {
            self.cursor = field;
            self.blink.reset();
        }
    }

    pub fn blink(&mut self) -> bool {
        self.blink.tick()
    }
}
