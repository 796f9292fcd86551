//! Command scheduling with requirement locking.
//!
//! A [`Command`] declares the subsystems it requires.  The
//! [`CommandScheduler`] runs at most one command per subsystem: scheduling a
//! command that shares a requirement with a running one interrupts the
//! running one first.  A command holds its requirements until it reports
//! [`Command::is_finished`], fails, or is cancelled.
//!
//! [`StopActuator`] is the canonical "hold" command: it zeroes an actuator
//! when it starts and never finishes on its own, so its subsystem stays
//! locked until something else takes it over.
//!
//! # Example
//!
//! ```rust
//! use fieldpose_hal::sim::SimActuator;
//! use fieldpose_runtime::command::{CommandScheduler, StopActuator};
//!
//! let arm = SimActuator::shared("intake_arm");
//! let mut scheduler = CommandScheduler::new();
//!
//! scheduler.schedule(Box::new(StopActuator::new(arm.clone()))).unwrap();
//! scheduler.run();
//! assert!(scheduler.is_scheduled("StopActuator"));
//! assert_eq!(scheduler.requiring("intake_arm"), Some("StopActuator"));
//!
//! scheduler.cancel("StopActuator");
//! assert!(scheduler.requiring("intake_arm").is_none());
//! ```

use std::sync::PoisonError;

use fieldpose_hal::SharedActuator;
use fieldpose_types::VisionError;
use tracing::{debug, info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Command
// ─────────────────────────────────────────────────────────────────────────────

/// A unit of scheduled work bound to one or more subsystems.
pub trait Command: Send {
    fn name(&self) -> &str;

    /// Subsystem ids this command needs exclusive use of.
    fn requirements(&self) -> Vec<String>;

    /// Called once when the command is scheduled.
    fn initialize(&mut self) -> Result<(), VisionError> {
        Ok(())
    }

    /// Called once per scheduler run while the command is active.
    fn execute(&mut self) -> Result<(), VisionError> {
        Ok(())
    }

    /// `true` once the command has completed on its own.
    fn is_finished(&self) -> bool {
        false
    }

    /// Called exactly once when the command leaves the scheduler.
    /// `interrupted` is `false` only for natural completion.
    fn end(&mut self, _interrupted: bool) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Scheduler
// ─────────────────────────────────────────────────────────────────────────────

/// Runs commands while enforcing one command per subsystem.
#[derive(Default)]
pub struct CommandScheduler {
    /// Active commands in schedule order.
    running: Vec<Box<dyn Command>>,
}

impl CommandScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `command`, interrupting any running command that shares a
    /// requirement.
    ///
    /// # Errors
    ///
    /// Propagates a failed [`Command::initialize`]; the command is ended as
    /// interrupted and not scheduled.  Commands it displaced stay
    /// interrupted.
    pub fn schedule(&mut self, mut command: Box<dyn Command>) -> Result<(), VisionError> {
        let wanted = command.requirements();
        let mut i = 0;
        while i < self.running.len() {
            let conflicts = self.running[i]
                .requirements()
                .iter()
                .any(|r| wanted.contains(r));
            if conflicts {
                let mut displaced = self.running.remove(i);
                info!(
                    interrupted = displaced.name(),
                    by = command.name(),
                    "requirement conflict"
                );
                displaced.end(true);
            } else {
                i += 1;
            }
        }

        if let Err(e) = command.initialize() {
            warn!(command = command.name(), error = %e, "command failed to initialize");
            command.end(true);
            return Err(e);
        }
        debug!(command = command.name(), requirements = ?wanted, "command scheduled");
        self.running.push(command);
        Ok(())
    }

    /// One scheduler pass: execute every active command, then retire the
    /// ones that finished or failed.  Returns the names of retired commands.
    pub fn run(&mut self) -> Vec<String> {
        let mut retired = Vec::new();
        let mut i = 0;
        while i < self.running.len() {
            let command = &mut self.running[i];
            let interrupted = match command.execute() {
                Err(e) => {
                    warn!(command = command.name(), error = %e, "command failed");
                    Some(true)
                }
                Ok(()) if command.is_finished() => Some(false),
                Ok(()) => None,
            };
            match interrupted {
                Some(interrupted) => {
                    let mut done = self.running.remove(i);
                    done.end(interrupted);
                    retired.push(done.name().to_string());
                }
                None => i += 1,
            }
        }
        retired
    }

    /// Interrupt the command called `name`.  Returns `false` if it was not
    /// running.
    pub fn cancel(&mut self, name: &str) -> bool {
        let Some(pos) = self.running.iter().position(|c| c.name() == name) else {
            return false;
        };
        let mut command = self.running.remove(pos);
        command.end(true);
        info!(command = name, "command cancelled");
        true
    }

    /// Interrupt every running command.
    pub fn cancel_all(&mut self) {
        for mut command in self.running.drain(..) {
            command.end(true);
        }
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.running.iter().any(|c| c.name() == name)
    }

    /// Name of the command currently holding `subsystem`.
    pub fn requiring(&self, subsystem: &str) -> Option<&str> {
        self.running
            .iter()
            .find(|c| c.requirements().iter().any(|r| r == subsystem))
            .map(|c| c.name())
    }

    /// Active command names in schedule order.
    pub fn scheduled(&self) -> Vec<&str> {
        self.running.iter().map(|c| c.name()).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StopActuator
// ─────────────────────────────────────────────────────────────────────────────

/// Zeroes an actuator on start and holds it until interrupted.
pub struct StopActuator {
    actuator: SharedActuator,
    requirement: String,
}

impl StopActuator {
    pub fn new(actuator: SharedActuator) -> Self {
        let requirement = actuator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .id()
            .to_string();
        Self {
            actuator,
            requirement,
        }
    }
}

impl Command for StopActuator {
    fn name(&self) -> &str {
        "StopActuator"
    }

    fn requirements(&self) -> Vec<String> {
        vec![self.requirement.clone()]
    }

    fn initialize(&mut self) -> Result<(), VisionError> {
        self.actuator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_output(0.0)
    }

    fn end(&mut self, interrupted: bool) {
        debug!(actuator = %self.requirement, interrupted, "stop released");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use fieldpose_hal::Actuator;
    use fieldpose_hal::sim::SimActuator;

    /// Drives an actuator at a fixed output for `ticks` runs, recording how
    /// it ended.
    struct Drive {
        name: String,
        actuator: SharedActuator,
        output: f64,
        ticks: usize,
        ended: Arc<Mutex<Option<bool>>>,
    }

    impl Drive {
        fn new(name: &str, actuator: SharedActuator, ticks: usize) -> (Self, Arc<Mutex<Option<bool>>>) {
            let ended = Arc::new(Mutex::new(None));
            (
                Self {
                    name: name.to_string(),
                    actuator,
                    output: 0.5,
                    ticks,
                    ended: Arc::clone(&ended),
                },
                ended,
            )
        }
    }

    impl Command for Drive {
        fn name(&self) -> &str {
            &self.name
        }

        fn requirements(&self) -> Vec<String> {
            vec![self.actuator.lock().unwrap().id().to_string()]
        }

        fn execute(&mut self) -> Result<(), VisionError> {
            self.ticks = self.ticks.saturating_sub(1);
            self.actuator.lock().unwrap().set_output(self.output)
        }

        fn is_finished(&self) -> bool {
            self.ticks == 0
        }

        fn end(&mut self, interrupted: bool) {
            *self.ended.lock().unwrap() = Some(interrupted);
        }
    }

    /// Fails on the first execute.
    struct Faulty;

    impl Command for Faulty {
        fn name(&self) -> &str {
            "Faulty"
        }

        fn requirements(&self) -> Vec<String> {
            vec!["turret".to_string()]
        }

        fn execute(&mut self) -> Result<(), VisionError> {
            Err(VisionError::HardwareFault {
                component: "turret".to_string(),
                details: "encoder lost".to_string(),
            })
        }
    }

    #[test]
    fn stop_actuator_zeroes_and_never_finishes() {
        let arm = SimActuator::shared("intake_arm");
        arm.lock().unwrap().set_output(0.8).unwrap();

        let mut scheduler = CommandScheduler::new();
        scheduler
            .schedule(Box::new(StopActuator::new(arm.clone())))
            .unwrap();
        assert_eq!(arm.lock().unwrap().output(), 0.0);

        for _ in 0..100 {
            assert!(scheduler.run().is_empty());
        }
        assert!(scheduler.is_scheduled("StopActuator"));
    }

    #[test]
    fn conflicting_schedule_interrupts_holder() {
        let arm = SimActuator::shared("intake_arm");
        let mut scheduler = CommandScheduler::new();

        let (drive, ended) = Drive::new("Deploy", arm.clone(), 10);
        scheduler.schedule(Box::new(drive)).unwrap();
        scheduler.run();
        assert_eq!(arm.lock().unwrap().output(), 0.5);

        scheduler
            .schedule(Box::new(StopActuator::new(arm.clone())))
            .unwrap();
        assert_eq!(*ended.lock().unwrap(), Some(true));
        assert_eq!(arm.lock().unwrap().output(), 0.0);
        assert_eq!(scheduler.scheduled(), vec!["StopActuator"]);
    }

    #[test]
    fn disjoint_requirements_run_side_by_side() {
        let arm = SimActuator::shared("intake_arm");
        let shooter = SimActuator::shared("shooter");
        let mut scheduler = CommandScheduler::new();

        scheduler
            .schedule(Box::new(StopActuator::new(arm.clone())))
            .unwrap();
        let (drive, _) = Drive::new("Spin", shooter.clone(), 3);
        scheduler.schedule(Box::new(drive)).unwrap();

        assert_eq!(scheduler.requiring("intake_arm"), Some("StopActuator"));
        assert_eq!(scheduler.requiring("shooter"), Some("Spin"));
    }

    #[test]
    fn finished_command_ends_uninterrupted_and_releases() {
        let shooter = SimActuator::shared("shooter");
        let mut scheduler = CommandScheduler::new();
        let (drive, ended) = Drive::new("Spin", shooter.clone(), 2);
        scheduler.schedule(Box::new(drive)).unwrap();

        assert!(scheduler.run().is_empty());
        assert_eq!(scheduler.run(), vec!["Spin".to_string()]);
        assert_eq!(*ended.lock().unwrap(), Some(false));
        assert!(scheduler.requiring("shooter").is_none());
    }

    #[test]
    fn cancel_interrupts_by_name() {
        let arm = SimActuator::shared("intake_arm");
        let mut scheduler = CommandScheduler::new();
        let (drive, ended) = Drive::new("Deploy", arm, 10);
        scheduler.schedule(Box::new(drive)).unwrap();

        assert!(!scheduler.cancel("Other"));
        assert!(scheduler.cancel("Deploy"));
        assert_eq!(*ended.lock().unwrap(), Some(true));
        assert!(scheduler.scheduled().is_empty());
    }

    #[test]
    fn failing_command_is_retired() {
        let mut scheduler = CommandScheduler::new();
        scheduler.schedule(Box::new(Faulty)).unwrap();
        assert_eq!(scheduler.run(), vec!["Faulty".to_string()]);
        assert!(!scheduler.is_scheduled("Faulty"));
    }

    #[test]
    fn cancel_all_empties_scheduler() {
        let arm = SimActuator::shared("intake_arm");
        let mut scheduler = CommandScheduler::new();
        let (drive, ended) = Drive::new("Deploy", arm, 10);
        scheduler.schedule(Box::new(drive)).unwrap();
        scheduler.schedule(Box::new(Faulty)).unwrap();
        scheduler.cancel_all();
        assert!(scheduler.scheduled().is_empty());
        assert_eq!(*ended.lock().unwrap(), Some(true));
    }
}
