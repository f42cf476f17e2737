//! The clock: driver, current mode and draft in one owner.
//!
//! The host calls [`ClockContext::tick`] on the UI cadence and forwards
//! debounced input to [`ClockContext::handle_event`]. Entry actions (loading a
//! draft, scheduling a full redraw) run when a mode is entered, so a tick
//! only ever does the steady-state work of the current mode.

use embedded_hal::i2c::I2c;

use crate::mode::{transition, Action, AlarmEditor, DeviceMode, Event, TimeEditor};
use crate::{Alarm, AlarmField, AlarmSpec, Error, TemperatureReading, Time, TimeField, DS3231};

/// Receives decoded values to draw. Never sees raw register bytes.
pub trait ClockDisplay {
    /// The running clock. `full_redraw` is set on the first tick after
    /// entering `Running`; later ticks may only redraw what changed.
    fn show_clock(&mut self, time: &Time, temperature: TemperatureReading, full_redraw: bool);

    /// The time draft, with the field under the cursor shown or hidden.
    fn show_time_draft(&mut self, draft: &Time, cursor: TimeField, cursor_visible: bool);

    /// The alarm draft, with the field under the cursor shown or hidden.
    fn show_alarm_draft(&mut self, draft: &AlarmSpec, cursor: AlarmField, cursor_visible: bool);

    /// A mode without its own screen yet.
    fn show_idle(&mut self, mode: DeviceMode);
}

/// Tunables of the clock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// Scan ticks a button must be held to count as a long press
    pub long_press_ticks: u16,
    /// Ticks the field under the cursor stays visible, then hidden
    pub blink_half_period: u16,
    /// Time written on first boot or after the oscillator stopped
    pub seed: Time,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            long_press_ticks: 30,
            blink_half_period: 2,
            seed: Time::default(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Init,
    Running { full_redraw: bool },
    ConfigureTime(TimeEditor),
    ConfigureAlarm(AlarmEditor),
    Idle(DeviceMode),
}

/// Owns the RTC driver and the state of the clock.
pub struct ClockContext<I2C: I2c> {
    rtc: DS3231<I2C>,
    config: ClockConfig,
    state: State,
}

impl<I2C: I2c> ClockContext<I2C> {
    /// Starts in [`DeviceMode::Init`].
    pub fn new(rtc: DS3231<I2C>, config: ClockConfig) -> Self {
        Self {
            rtc,
            config,
            state: State::Init,
        }
    }

    /// Gives the driver back.
    pub fn release(self) -> DS3231<I2C> {
        self.rtc
    }

    #[must_use]
    pub fn current_mode(&self) -> DeviceMode {
        match self.state {
            State::Init => DeviceMode::Init,
            State::Running { .. } => DeviceMode::Running,
            State::ConfigureTime(_) => DeviceMode::ConfigureTime,
            State::ConfigureAlarm(_) => DeviceMode::ConfigureAlarm,
            State::Idle(mode) => mode,
        }
    }

    /// The time editor while in `ConfigureTime`.
    #[must_use]
    pub fn time_editor(&self) -> Option<&TimeEditor> {
        match &self.state {
            State::ConfigureTime(editor) => Some(editor),
            _ => None,
        }
    }

    /// The alarm editor while in `ConfigureAlarm`.
    #[must_use]
    pub fn alarm_editor(&self) -> Option<&AlarmEditor> {
        match &self.state {
            State::ConfigureAlarm(editor) => Some(editor),
            _ => None,
        }
    }

    /// Re-enters a mode saved as a raw value; unknown values give `Init`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry action of the mode fails.
    pub fn restore_mode(&mut self, raw: u8) -> Result<(), Error<I2C::Error>> {
        self.enter(DeviceMode::from_raw(raw))
    }

    /// Advances the clock one UI tick.
    ///
    /// # Errors
    ///
    /// Returns bus and decode errors of the chip accesses of the tick. The
    /// mode is left as it was.
    pub fn tick(&mut self, display: &mut impl ClockDisplay) -> Result<(), Error<I2C::Error>> {
        if matches!(self.state, State::Init) {
            self.first_boot()?;
            return self.enter(DeviceMode::ConfigureTime);
        }
        match &mut self.state {
            State::Init => Ok(()),
            State::Running { full_redraw } => {
                let time = self.rtc.time()?;
                let temperature = self.rtc.temperature()?;
                display.show_clock(&time, temperature, *full_redraw);
                *full_redraw = false;
                Ok(())
            }
            State::ConfigureTime(editor) => {
                let visible = editor.blink();
                display.show_time_draft(editor.draft(), editor.cursor(), visible);
                Ok(())
            }
            State::ConfigureAlarm(editor) => {
                let visible = editor.blink();
                display.show_alarm_draft(editor.draft(), editor.cursor(), visible);
                Ok(())
            }
            State::Idle(mode) => {
                display.show_idle(*mode);
                Ok(())
            }
        }
    }

    /// Feeds one input event through the transition table.
    ///
    /// # Errors
    ///
    /// Returns an error if committing a draft or entering a mode fails. A
    /// failed commit stays in the configure mode with the draft intact.
    pub fn handle_event(&mut self, event: Event) -> Result<(), Error<I2C::Error>> {
        if !event.qualifies(self.config.long_press_ticks) {
            return Ok(());
        }
        let Some(action) = transition(self.current_mode(), event) else {
            return Ok(());
        };
        debug!("mode={:?} event={:?} action={:?}", self.current_mode(), event, action);
        match action {
            Action::Enter(mode) => self.enter(mode),
            Action::Commit => self.commit(),
            Action::Discard => {
                info!("draft discarded");
                self.enter(DeviceMode::Running)
            }
            Action::Increment => {
                match &mut self.state {
                    State::ConfigureTime(editor) => editor.increment(),
                    State::ConfigureAlarm(editor) => editor.increment(),
                    _ => {}
                }
                Ok(())
            }
            Action::NextField => {
                match &mut self.state {
                    State::ConfigureTime(editor) => editor.next_field(),
                    State::ConfigureAlarm(editor) => editor.next_field(),
                    _ => {}
                }
                Ok(())
            }
            Action::PreviousField => {
                match &mut self.state {
                    State::ConfigureTime(editor) => editor.previous_field(),
                    State::ConfigureAlarm(editor) => editor.previous_field(),
                    _ => {}
                }
                Ok(())
            }
        }
    }

    /// Seeds the chip if its time cannot be trusted.
    fn first_boot(&mut self) -> Result<(), Error<I2C::Error>> {
        let stopped = self.rtc.oscillator_stopped()?;
        let decodes = match self.rtc.time() {
            Ok(_) => true,
            Err(Error::Time(_)) => false,
            Err(e) => return Err(e),
        };
        if stopped || !decodes {
            warn!(
                "oscillator stopped={} time decodes={}, seeding the clock",
                stopped, decodes
            );
            self.rtc.set_time(&self.config.seed)?;
            self.rtc.clear_oscillator_stop_flag()?;
        }
        Ok(())
    }

    /// Runs the entry action of `mode` and switches to it.
    fn enter(&mut self, mode: DeviceMode) -> Result<(), Error<I2C::Error>> {
        let state = match mode {
            DeviceMode::Init => State::Init,
            DeviceMode::Running => State::Running { full_redraw: true },
            DeviceMode::ConfigureTime => {
                let draft = match self.rtc.time() {
                    Ok(time) => time,
                    Err(Error::Time(_)) => {
                        warn!("time does not decode, starting from the seed");
                        self.config.seed
                    }
                    Err(e) => return Err(e),
                };
                State::ConfigureTime(TimeEditor::new(draft, self.config.blink_half_period))
            }
            DeviceMode::ConfigureAlarm => {
                let draft = match self.rtc.read_alarm(Alarm::One) {
                    Ok(spec) => spec,
                    Err(Error::Alarm(_)) => {
                        warn!("alarm 1 does not decode, starting from a daily alarm");
                        AlarmSpec::daily(Alarm::One)
                    }
                    Err(e) => return Err(e),
                };
                State::ConfigureAlarm(AlarmEditor::new(draft, self.config.blink_half_period))
            }
            DeviceMode::Stopwatch | DeviceMode::Timers | DeviceMode::RegisterMonitor => {
                State::Idle(mode)
            }
        };
        debug!("entering {:?}", mode);
        self.state = state;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), Error<I2C::Error>> {
        match self.state {
            State::ConfigureTime(editor) => {
                self.rtc.write_time_fields(editor.draft())?;
                info!("time committed: {:?}", editor.draft());
            }
            State::ConfigureAlarm(editor) => {
                self.rtc.set_alarm(editor.draft())?;
                self.rtc.set_alarm_interrupt(Alarm::One, true)?;
                info!("alarm committed: {:?}", editor.draft());
            }
            _ => return Ok(()),
        }
        self.enter(DeviceMode::Running)
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;
    use super::*;
    use crate::mode::Button;
    use crate::{Alarm1Mode, DayOrDate, RegAddr};
    use alloc::vec;
    use alloc::vec::Vec;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};

    const DEVICE_ADDRESS: u8 = 0x68;
    // 2024-03-14 15:30:00, Thursday
    const SAMPLE: [u8; 7] = [0x00, 0x30, 0x15, 0x05, 0x14, 0x03, 0x24];

    #[derive(Debug, PartialEq)]
    enum Shown {
        Clock(Time, bool),
        TimeDraft(Time, TimeField, bool),
        AlarmDraft(AlarmSpec, AlarmField, bool),
        Idle(DeviceMode),
    }

    #[derive(Default)]
    struct RecordingDisplay {
        shown: Vec<Shown>,
    }

    impl ClockDisplay for RecordingDisplay {
        fn show_clock(&mut self, time: &Time, _temperature: TemperatureReading, full_redraw: bool) {
            self.shown.push(Shown::Clock(*time, full_redraw));
        }

        fn show_time_draft(&mut self, draft: &Time, cursor: TimeField, cursor_visible: bool) {
            self.shown.push(Shown::TimeDraft(*draft, cursor, cursor_visible));
        }

        fn show_alarm_draft(&mut self, draft: &AlarmSpec, cursor: AlarmField, cursor_visible: bool) {
            self.shown.push(Shown::AlarmDraft(*draft, cursor, cursor_visible));
        }

        fn show_idle(&mut self, mode: DeviceMode) {
            self.shown.push(Shown::Idle(mode));
        }
    }

    fn read(addr: RegAddr, data: &[u8]) -> I2cTrans {
        I2cTrans::write_read(DEVICE_ADDRESS, vec![addr as u8], data.to_vec())
    }

    fn write(addr: RegAddr, data: &[u8]) -> I2cTrans {
        let mut bytes = vec![addr as u8];
        bytes.extend_from_slice(data);
        I2cTrans::write(DEVICE_ADDRESS, bytes)
    }

    fn setup(expectations: &[I2cTrans]) -> ClockContext<I2cMock> {
        let rtc = DS3231::new(I2cMock::new(expectations), DEVICE_ADDRESS);
        ClockContext::new(rtc, ClockConfig::default())
    }

    fn finish(clock: ClockContext<I2cMock>) {
        clock.release().release().done();
    }

    fn sample() -> Time {
        Time::from_registers(SAMPLE).unwrap()
    }

    fn hold(button: Button) -> Event {
        Event::Hold { button, ticks: 30 }
    }

    /// Init tick on a healthy chip followed by the ConfigureTime entry read.
    fn boot() -> Vec<I2cTrans> {
        vec![
            read(RegAddr::ControlStatus, &[0x00]),
            read(RegAddr::Seconds, &SAMPLE),
            read(RegAddr::Seconds, &SAMPLE),
        ]
    }

    #[test]
    fn test_first_tick_enters_configure_time_at_seconds() {
        let mut clock = setup(&boot());
        let mut display = RecordingDisplay::default();
        assert_eq!(clock.current_mode(), DeviceMode::Init);

        clock.tick(&mut display).unwrap();
        assert_eq!(clock.current_mode(), DeviceMode::ConfigureTime);
        let editor = clock.time_editor().unwrap();
        assert_eq!(editor.cursor(), TimeField::Second);
        assert_eq!(*editor.draft(), sample());
        assert!(display.shown.is_empty());
        finish(clock);
    }

    #[test]
    fn test_first_boot_seeds_stopped_oscillator() {
        let seed = Time::default().to_registers().unwrap();
        let mut clock = setup(&[
            read(RegAddr::ControlStatus, &[0x88]),
            read(RegAddr::Seconds, &SAMPLE),
            write(RegAddr::Seconds, &seed),
            read(RegAddr::ControlStatus, &[0x88]),
            write(RegAddr::ControlStatus, &[0x08]),
            read(RegAddr::Seconds, &seed),
        ]);
        clock.tick(&mut RecordingDisplay::default()).unwrap();
        assert_eq!(*clock.time_editor().unwrap().draft(), Time::default());
        finish(clock);
    }

    #[test]
    fn test_first_boot_seeds_undecodable_time() {
        let seed = Time::default().to_registers().unwrap();
        let garbage = [0xFF; 7];
        let mut clock = setup(&[
            read(RegAddr::ControlStatus, &[0x00]),
            read(RegAddr::Seconds, &garbage),
            write(RegAddr::Seconds, &seed),
            read(RegAddr::ControlStatus, &[0x00]),
            write(RegAddr::ControlStatus, &[0x00]),
            read(RegAddr::Seconds, &seed),
        ]);
        clock.tick(&mut RecordingDisplay::default()).unwrap();
        assert_eq!(clock.current_mode(), DeviceMode::ConfigureTime);
        finish(clock);
    }

    #[test]
    fn test_bus_error_on_first_tick_stays_in_init() {
        let mut clock = setup(&[read(RegAddr::ControlStatus, &[0x00]).with_error(ErrorKind::Other)]);
        assert_eq!(
            clock.tick(&mut RecordingDisplay::default()),
            Err(Error::I2c(ErrorKind::Other))
        );
        assert_eq!(clock.current_mode(), DeviceMode::Init);
        finish(clock);
    }

    #[test]
    fn test_six_next_field_holds_reach_year() {
        let mut clock = setup(&boot());
        clock.tick(&mut RecordingDisplay::default()).unwrap();
        for _ in 0..6 {
            clock.handle_event(hold(Button::NextField)).unwrap();
        }
        assert_eq!(clock.time_editor().unwrap().cursor(), TimeField::Year);
        clock.handle_event(hold(Button::NextField)).unwrap();
        assert_eq!(clock.time_editor().unwrap().cursor(), TimeField::Year);
        finish(clock);
    }

    #[test]
    fn test_short_holds_do_not_move_the_cursor() {
        let mut clock = setup(&boot());
        clock.tick(&mut RecordingDisplay::default()).unwrap();
        for ticks in 1..30 {
            clock
                .handle_event(Event::Hold {
                    button: Button::NextField,
                    ticks,
                })
                .unwrap();
        }
        assert_eq!(clock.time_editor().unwrap().cursor(), TimeField::Second);
        finish(clock);
    }

    #[test]
    fn test_cancel_leaves_chip_untouched() {
        for (position, field) in TimeField::ALL.into_iter().enumerate() {
            let mut clock = setup(&boot());
            clock.tick(&mut RecordingDisplay::default()).unwrap();
            clock.handle_event(Event::Press(Button::Increment)).unwrap();
            for _ in 0..position {
                clock.handle_event(hold(Button::NextField)).unwrap();
            }
            assert_eq!(clock.time_editor().unwrap().cursor(), field);
            clock.handle_event(Event::Press(Button::Increment)).unwrap();
            clock.handle_event(Event::Press(Button::Cancel)).unwrap();
            assert_eq!(clock.current_mode(), DeviceMode::Running);
            // the mock fails on any write
            finish(clock);
        }
    }

    #[test]
    fn test_confirm_writes_draft_field_by_field() {
        let mut expectations = boot();
        expectations.extend([
            write(RegAddr::Seconds, &[0x01]),
            write(RegAddr::Minutes, &[0x30]),
            write(RegAddr::Hours, &[0x15]),
            write(RegAddr::Day, &[0x05]),
            write(RegAddr::Date, &[0x14]),
            read(RegAddr::Month, &[0x03]),
            write(RegAddr::Month, &[0x03]),
            read(RegAddr::Month, &[0x03]),
            write(RegAddr::Month, &[0x03]),
            write(RegAddr::Year, &[0x24]),
        ]);
        let mut clock = setup(&expectations);
        clock.tick(&mut RecordingDisplay::default()).unwrap();
        clock.handle_event(Event::Press(Button::Increment)).unwrap();
        clock.handle_event(Event::Press(Button::Confirm)).unwrap();
        assert_eq!(clock.current_mode(), DeviceMode::Running);
        finish(clock);
    }

    #[test]
    fn test_failed_commit_keeps_the_draft() {
        let mut expectations = boot();
        expectations.push(write(RegAddr::Seconds, &[0x01]).with_error(ErrorKind::Other));
        let mut clock = setup(&expectations);
        clock.tick(&mut RecordingDisplay::default()).unwrap();
        clock.handle_event(Event::Press(Button::Increment)).unwrap();
        assert!(clock.handle_event(Event::Press(Button::Confirm)).is_err());
        assert_eq!(clock.current_mode(), DeviceMode::ConfigureTime);
        assert_eq!(clock.time_editor().unwrap().draft().second, 1);
        finish(clock);
    }

    #[test]
    fn test_configure_time_blinks_the_cursor_field() {
        let mut clock = setup(&boot());
        let mut display = RecordingDisplay::default();
        clock.tick(&mut display).unwrap();
        for _ in 0..4 {
            clock.tick(&mut display).unwrap();
        }
        let visible: Vec<bool> = display
            .shown
            .iter()
            .map(|shown| match shown {
                Shown::TimeDraft(_, TimeField::Second, visible) => *visible,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(visible, [true, true, false, false]);
        finish(clock);
    }

    #[test]
    fn test_running_redraws_fully_once() {
        let mut expectations = boot();
        for _ in 0..2 {
            expectations.push(read(RegAddr::Seconds, &SAMPLE));
            expectations.push(read(RegAddr::MSBTemp, &[0x19, 0x40]));
        }
        let mut clock = setup(&expectations);
        let mut display = RecordingDisplay::default();
        clock.tick(&mut display).unwrap();
        clock.handle_event(Event::Press(Button::Cancel)).unwrap();
        clock.tick(&mut display).unwrap();
        clock.tick(&mut display).unwrap();
        assert_eq!(
            display.shown,
            [Shown::Clock(sample(), true), Shown::Clock(sample(), false)]
        );
        finish(clock);
    }

    #[test]
    fn test_mode_button_from_running_reloads_the_draft() {
        let mut expectations = boot();
        expectations.push(read(RegAddr::Seconds, &SAMPLE));
        let mut clock = setup(&expectations);
        clock.tick(&mut RecordingDisplay::default()).unwrap();
        clock.handle_event(Event::Press(Button::Cancel)).unwrap();
        clock.handle_event(Event::Press(Button::Mode)).unwrap();
        assert_eq!(clock.current_mode(), DeviceMode::ConfigureTime);
        assert_eq!(clock.time_editor().unwrap().cursor(), TimeField::Second);
        finish(clock);
    }

    #[test]
    fn test_configure_alarm_commit() {
        let mut expectations = boot();
        expectations.extend([
            // alarm 1: daily at 06:30:00
            read(RegAddr::Alarm1Seconds, &[0x00, 0x30, 0x06, 0x81]),
            write(RegAddr::Alarm1Seconds, &[0x00, 0x30, 0x07, 0x81]),
            read(RegAddr::Control, &[0x1C]),
            write(RegAddr::Control, &[0x1D]),
        ]);
        let mut clock = setup(&expectations);
        let mut display = RecordingDisplay::default();
        clock.tick(&mut display).unwrap();
        clock.handle_event(Event::Press(Button::Cancel)).unwrap();
        clock.handle_event(hold(Button::Mode)).unwrap();
        assert_eq!(clock.current_mode(), DeviceMode::ConfigureAlarm);

        clock.handle_event(hold(Button::NextField)).unwrap();
        clock.handle_event(hold(Button::NextField)).unwrap();
        clock.handle_event(Event::Press(Button::Increment)).unwrap();
        clock.tick(&mut display).unwrap();
        let expected = AlarmSpec {
            mode: Alarm1Mode::MatchSecondsMinutesHours.into(),
            second: 0,
            minute: 30,
            hour: 7,
            day_or_date: DayOrDate::Date(1),
        };
        assert_eq!(
            display.shown.last(),
            Some(&Shown::AlarmDraft(expected, AlarmField::Hour, true))
        );

        clock.handle_event(Event::Press(Button::Confirm)).unwrap();
        assert_eq!(clock.current_mode(), DeviceMode::Running);
        finish(clock);
    }

    #[test]
    fn test_configure_alarm_falls_back_to_daily() {
        let mut expectations = boot();
        // undefined mask combination
        expectations.push(read(RegAddr::Alarm1Seconds, &[0x80, 0x00, 0x80, 0x01]));
        let mut clock = setup(&expectations);
        clock.tick(&mut RecordingDisplay::default()).unwrap();
        clock.handle_event(Event::Select(DeviceMode::ConfigureAlarm)).unwrap();
        assert_eq!(
            *clock.alarm_editor().unwrap().draft(),
            AlarmSpec::daily(Alarm::One)
        );
        finish(clock);
    }

    #[test]
    fn test_configure_time_falls_back_to_seed() {
        let mut corrupt = SAMPLE;
        corrupt[5] = 0x13;
        let mut expectations = boot();
        expectations.push(read(RegAddr::Seconds, &corrupt));
        let mut clock = setup(&expectations);
        clock.tick(&mut RecordingDisplay::default()).unwrap();
        clock.handle_event(Event::Press(Button::Cancel)).unwrap();
        clock.handle_event(Event::Press(Button::Mode)).unwrap();
        assert_eq!(clock.current_mode(), DeviceMode::ConfigureTime);
        let editor = clock.time_editor().unwrap();
        assert_eq!(*editor.draft(), Time::default());
        assert_eq!(editor.cursor(), TimeField::Second);
        finish(clock);
    }

    #[test]
    fn test_bus_error_entering_configure_time_stays_running() {
        let mut expectations = boot();
        expectations.push(read(RegAddr::Seconds, &SAMPLE).with_error(ErrorKind::Other));
        let mut clock = setup(&expectations);
        clock.tick(&mut RecordingDisplay::default()).unwrap();
        clock.handle_event(Event::Press(Button::Cancel)).unwrap();
        assert_eq!(
            clock.handle_event(Event::Press(Button::Mode)),
            Err(Error::I2c(ErrorKind::Other))
        );
        assert_eq!(clock.current_mode(), DeviceMode::Running);
        finish(clock);
    }

    #[test]
    fn test_inert_mode_shows_idle_until_cancel() {
        let mut clock = setup(&boot());
        let mut display = RecordingDisplay::default();
        clock.tick(&mut display).unwrap();
        clock.handle_event(Event::Select(DeviceMode::Stopwatch)).unwrap();
        clock.handle_event(Event::Press(Button::Increment)).unwrap();
        clock.tick(&mut display).unwrap();
        assert_eq!(display.shown, [Shown::Idle(DeviceMode::Stopwatch)]);
        clock.handle_event(Event::Press(Button::Cancel)).unwrap();
        assert_eq!(clock.current_mode(), DeviceMode::Running);
        finish(clock);
    }

    #[test]
    fn test_restore_mode() {
        let mut clock = setup(&[]);
        clock.restore_mode(5).unwrap();
        assert_eq!(clock.current_mode(), DeviceMode::Timers);
        clock.restore_mode(42).unwrap();
        assert_eq!(clock.current_mode(), DeviceMode::Init);
        clock.restore_mode(1).unwrap();
        assert_eq!(clock.current_mode(), DeviceMode::Running);
        finish(clock);
    }
}
