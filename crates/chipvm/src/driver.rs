use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chipvm_core::{Machine, Quirks, Step, NUM_KEYS, START_ADDRESS, TIMER_HZ};
use typed_builder::TypedBuilder;

use crate::frontend::Frontend;

#[derive(Debug, Clone, TypedBuilder)]
pub struct DriverConfig {
    #[builder(default = 700)]
    pub instructions_per_second: u32,
    #[builder(default = START_ADDRESS)]
    pub load_address: u16,
    /// Width of one pixel in the frontend's units.
    #[builder(default = 1)]
    pub scale: u32,
    /// Stop after this many frames.
    #[builder(default, setter(strip_option))]
    pub max_frames: Option<u64>,
    /// Sleep so each frame lasts 1/60 s.
    #[builder(default = true)]
    pub paced: bool,
    /// Fixed seed for the random byte opcode.
    #[builder(default, setter(strip_option))]
    pub seed: Option<u64>,
    #[builder(default)]
    pub quirks: Quirks,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig::builder().build()
    }
}

impl DriverConfig {
    /// Instruction steps executed per 60 Hz frame.
    pub fn steps_per_frame(&self) -> u32 {
        (self.instructions_per_second / TIMER_HZ).max(1)
    }
}

/// Result of a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    pub steps: u32,
    /// The program is blocked on `FX0A`.
    pub awaiting_key: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub steps: u64,
}

/// Drives a [`Machine`] at two cadences: a batch of instruction steps and
/// then one timer tick, present and input poll per 60 Hz frame.
pub struct Driver {
    machine: Machine,
    config: DriverConfig,
}

impl Driver {
    pub fn new(config: DriverConfig) -> Self {
        let mut machine = Machine::new(config.quirks);
        machine.reset(config.load_address);
        if let Some(seed) = config.seed {
            machine.reseed(seed);
        }
        Self { machine, config }
    }

    pub fn load(&mut self, rom: &[u8]) -> Result<()> {
        self.machine
            .load_program(rom, self.config.load_address)
            .context("failed to load program")
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn run_frame(&mut self, frontend: &mut impl Frontend) -> Result<FrameOutcome> {
        let mut outcome = FrameOutcome {
            steps: 0,
            awaiting_key: false,
        };
        for _ in 0..self.config.steps_per_frame() {
            let step = self.machine.step().with_context(|| {
                format!("machine halted\n{}", self.machine.snapshot())
            })?;
            outcome.steps += 1;
            if let Step::AwaitingKey { .. } = step {
                // Nothing changes until the next input poll.
                outcome.awaiting_key = true;
                break;
            }
        }
        self.machine.tick_timers();

        frontend.set_tone(self.machine.sound_active());
        frontend.present(self.machine.display());
        for event in frontend.poll_events() {
            if event.key >= NUM_KEYS {
                log::warn!("ignoring key index {}", event.key);
                continue;
            }
            self.machine.set_key(event.key, event.pressed);
        }

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("{}", self.machine.snapshot());
        }
        Ok(outcome)
    }

    /// Run frames until the frontend asks to exit, the frame limit is hit,
    /// or the machine fails.
    pub fn run(&mut self, frontend: &mut impl Frontend) -> Result<RunSummary> {
        let frame_time = Duration::from_secs(1) / TIMER_HZ;
        let mut summary = RunSummary::default();
        frontend.init();
        loop {
            if frontend.should_exit()
                || self.config.max_frames.is_some_and(|max| summary.frames >= max)
            {
                break;
            }
            let start = Instant::now();
            let outcome = match self.run_frame(frontend) {
                Ok(outcome) => outcome,
                Err(err) => {
                    log::error!("{:#}", err);
                    frontend.exit();
                    return Err(err);
                }
            };
            summary.frames += 1;
            summary.steps += outcome.steps as u64;

            if self.config.paced {
                let elapsed = start.elapsed();
                if elapsed < frame_time {
                    std::thread::sleep(frame_time - elapsed);
                }
            }
        }
        frontend.exit();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::KeyEvent;
    use chipvm_core::Display;
    use std::collections::VecDeque;

    /// Replays a fixed list of key events, one batch per frame.
    #[derive(Default)]
    struct ScriptedFrontend {
        script: VecDeque<Vec<KeyEvent>>,
        presented: u64,
        tone_frames: u64,
        exit_after: Option<u64>,
    }

    impl Frontend for ScriptedFrontend {
        fn poll_events(&mut self) -> Vec<KeyEvent> {
            self.script.pop_front().unwrap_or_default()
        }

        fn present(&mut self, _display: &Display) {
            self.presented += 1;
        }

        fn set_tone(&mut self, playing: bool) {
            if playing {
                self.tone_frames += 1;
            }
        }

        fn should_exit(&self) -> bool {
            self.exit_after.is_some_and(|n| self.presented >= n)
        }
    }

    fn config() -> DriverConfig {
        DriverConfig::builder()
            .instructions_per_second(600)
            .paced(false)
            .seed(1)
            .build()
    }

    #[test]
    fn steps_per_frame_never_drops_to_zero() {
        assert_eq!(config().steps_per_frame(), 10);
        let slow = DriverConfig::builder().instructions_per_second(30).build();
        assert_eq!(slow.steps_per_frame(), 1);
    }

    #[test]
    fn frame_runs_batch_then_ticks_timers() {
        let mut driver = Driver::new(config());
        // V0 = 5; DT = V0; then spin on a jump to self.
        driver.load(&[0x60, 0x05, 0xF0, 0x15, 0x12, 0x04]).unwrap();
        let mut frontend = ScriptedFrontend::default();
        let outcome = driver.run_frame(&mut frontend).unwrap();
        assert_eq!(outcome.steps, 10);
        assert!(!outcome.awaiting_key);
        assert_eq!(driver.machine().delay_timer(), 4);
        assert_eq!(frontend.presented, 1);
    }

    #[test]
    fn waiting_program_resumes_after_key_event() {
        let mut driver = Driver::new(config());
        // LD V3, K; then spin.
        driver.load(&[0xF3, 0x0A, 0x12, 0x02]).unwrap();
        let mut frontend = ScriptedFrontend::default();
        frontend.script.push_back(vec![]);
        frontend.script.push_back(vec![KeyEvent {
            key: 0x9,
            pressed: true,
        }]);

        let first = driver.run_frame(&mut frontend).unwrap();
        assert!(first.awaiting_key);
        assert_eq!(first.steps, 1);
        let second = driver.run_frame(&mut frontend).unwrap();
        assert!(second.awaiting_key);
        assert_eq!(driver.machine().pc(), 0x200);

        let third = driver.run_frame(&mut frontend).unwrap();
        assert!(!third.awaiting_key);
        assert_eq!(driver.machine().v(3), 0x9);
        assert_eq!(driver.machine().pc(), 0x202);
    }

    #[test]
    fn out_of_range_key_events_are_dropped() {
        let mut driver = Driver::new(config());
        driver.load(&[0x12, 0x00]).unwrap();
        let mut frontend = ScriptedFrontend::default();
        frontend.script.push_back(vec![KeyEvent {
            key: 42,
            pressed: true,
        }]);
        driver.run_frame(&mut frontend).unwrap();
        assert_eq!(driver.machine().keypad().first_down(), None);
    }

    #[test]
    fn run_stops_at_frame_limit_and_reports_tone() {
        let config = DriverConfig::builder()
            .paced(false)
            .max_frames(5)
            .build();
        let mut driver = Driver::new(config);
        // V0 = 3; ST = V0; spin.
        driver.load(&[0x60, 0x03, 0xF0, 0x18, 0x12, 0x04]).unwrap();
        let mut frontend = ScriptedFrontend::default();
        let summary = driver.run(&mut frontend).unwrap();
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.steps, 5 * 11);
        assert_eq!(frontend.tone_frames, 2);
    }

    #[test]
    fn run_stops_when_frontend_exits() {
        let mut driver = Driver::new(config());
        driver.load(&[0x12, 0x00]).unwrap();
        let mut frontend = ScriptedFrontend {
            exit_after: Some(3),
            ..Default::default()
        };
        let summary = driver.run(&mut frontend).unwrap();
        assert_eq!(summary.frames, 3);
    }

    #[test]
    fn machine_errors_stop_the_run() {
        let mut driver = Driver::new(config());
        driver.load(&[0x00, 0xEE]).unwrap();
        let mut frontend = ScriptedFrontend::default();
        let err = driver.run(&mut frontend).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<chipvm_core::MachineError>(),
            Some(chipvm_core::MachineError::StackUnderflow { pc: 0x200 })
        ));
    }

    #[test]
    fn oversized_rom_is_rejected() {
        let mut driver = Driver::new(config());
        assert!(driver.load(&[0u8; 0xE01]).is_err());
    }
}
