//! Virtual motion axis
//!
//! Simulates a tilt or tower stage: moves complete instantly, every
//! command is recorded, and stalls, failed homing and driver faults can be
//! injected to exercise the separation error paths.

use heapless::{Deque, Vec};
use tearoff_core::config::{Curve, TiltCurve, TowerCurve};
use tearoff_core::motion::Axis;
use tearoff_core::traits::{AxisDriver, AxisError};

/// Number of commands kept in the trace
pub const MAX_TRACE: usize = 64;

/// Scripted homing results
const MAX_HOME_SCRIPT: usize = 8;

/// Command received by a virtual axis
///
/// Position reads are not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisCommand<C> {
    SetProfile(C),
    MoveRelative(i32),
    MoveAbsolute(i32),
    QueryStall,
    Home,
}

impl<C> AxisCommand<C> {
    /// Check if the command moves the axis
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            AxisCommand::MoveRelative(_) | AxisCommand::MoveAbsolute(_) | AxisCommand::Home
        )
    }
}

/// Simulated axis
#[derive(Debug, Clone)]
pub struct VirtualAxis<C: Curve> {
    position: i32,
    home_position: i32,
    profile: Option<C>,
    bounds: Option<(i32, i32)>,
    /// Downward moves stop here and raise the stall flag
    obstruction: Option<i32>,
    /// Upward moves stop here and raise the stall flag
    ceiling: Option<i32>,
    stall: bool,
    home_script: Deque<bool, MAX_HOME_SCRIPT>,
    fault: Option<(usize, AxisError)>,
    commands: usize,
    trace: Vec<AxisCommand<C>, MAX_TRACE>,
}

/// Virtual tilt axis, positions in microsteps
pub type VirtualTilt = VirtualAxis<TiltCurve>;

/// Virtual tower axis, positions in nanometers
pub type VirtualTower = VirtualAxis<TowerCurve>;

impl<C: Curve> VirtualAxis<C> {
    /// Create an axis standing at `position`, homing to 0
    pub fn new(position: i32) -> Self {
        Self {
            position,
            home_position: 0,
            profile: None,
            bounds: None,
            obstruction: None,
            ceiling: None,
            stall: false,
            home_script: Deque::new(),
            fault: None,
            commands: 0,
            trace: Vec::new(),
        }
    }

    /// Axis this simulation stands in for
    pub fn axis(&self) -> Axis {
        C::AXIS
    }

    /// Reject moves outside `min..=max` with [`AxisError::OutOfBounds`]
    pub fn with_bounds(mut self, min: i32, max: i32) -> Self {
        self.bounds = Some((min, max));
        self
    }

    /// Block downward travel at `position` until the next successful homing
    pub fn obstruct_at(&mut self, position: i32) {
        self.obstruction = Some(position);
    }

    /// Block upward travel at `position` until the next successful homing
    pub fn obstruct_above(&mut self, position: i32) {
        self.ceiling = Some(position);
    }

    /// Raise the stall flag as if the last move had stalled
    pub fn inject_stall(&mut self) {
        self.stall = true;
    }

    /// Queue results for the next homing attempts
    ///
    /// Attempts without a queued result succeed.
    pub fn script_homing(&mut self, results: &[bool]) {
        for &result in results {
            if self.home_script.push_back(result).is_err() {
                break;
            }
        }
    }

    /// Fail the command with the given index (0-based, position reads
    /// included) with `error`
    pub fn fail_command(&mut self, index: usize, error: AxisError) {
        self.fault = Some((index, error));
    }

    pub fn set_position(&mut self, position: i32) {
        self.position = position;
    }

    /// Currently selected curve
    pub fn profile(&self) -> Option<C> {
        self.profile
    }

    /// Recorded commands
    pub fn trace(&self) -> &[AxisCommand<C>] {
        &self.trace
    }

    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    /// Number of recorded motion commands
    pub fn motion_count(&self) -> usize {
        self.trace.iter().filter(|c| c.is_motion()).count()
    }

    fn record(&mut self, command: Option<AxisCommand<C>>) -> Result<(), AxisError> {
        let index = self.commands;
        self.commands += 1;
        if let Some(command) = command {
            // The trace keeps the first MAX_TRACE commands
            let _ = self.trace.push(command);
        }
        match self.fault {
            Some((fault_index, error)) if fault_index == index => Err(error),
            _ => Ok(()),
        }
    }

    fn move_to(&mut self, target: i32) -> Result<(), AxisError> {
        if let Some((min, max)) = self.bounds {
            if target < min || target > max {
                return Err(AxisError::OutOfBounds);
            }
        }
        match (self.obstruction, self.ceiling) {
            (Some(limit), _) if target < limit => {
                self.position = self.position.min(limit);
                self.stall = true;
            }
            (_, Some(limit)) if target > limit => {
                self.position = self.position.max(limit);
                self.stall = true;
            }
            _ => self.position = target,
        }
        Ok(())
    }
}

impl<C: Curve> AxisDriver for VirtualAxis<C> {
    type Curve = C;

    fn set_profile(&mut self, curve: C) -> Result<(), AxisError> {
        self.record(Some(AxisCommand::SetProfile(curve)))?;
        self.profile = Some(curve);
        Ok(())
    }

    fn move_relative(&mut self, steps: i32) -> Result<(), AxisError> {
        self.record(Some(AxisCommand::MoveRelative(steps)))?;
        let target = self.position.saturating_add(steps);
        self.move_to(target)
    }

    fn move_absolute(&mut self, position: i32) -> Result<(), AxisError> {
        self.record(Some(AxisCommand::MoveAbsolute(position)))?;
        self.move_to(position)
    }

    fn position(&mut self) -> Result<i32, AxisError> {
        self.record(None)?;
        Ok(self.position)
    }

    fn query_stall(&mut self) -> Result<bool, AxisError> {
        self.record(Some(AxisCommand::QueryStall))?;
        Ok(core::mem::take(&mut self.stall))
    }

    fn home(&mut self) -> Result<bool, AxisError> {
        self.record(Some(AxisCommand::Home))?;
        let homed = self.home_script.pop_front().unwrap_or(true);
        if homed {
            self.position = self.home_position;
            self.obstruction = None;
            self.ceiling = None;
            self.stall = false;
        }
        Ok(homed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moves_and_trace() {
        let mut tilt = VirtualTilt::new(4928);

        tilt.set_profile(TiltCurve::LayerRelease).unwrap();
        tilt.move_relative(-650).unwrap();
        assert_eq!(tilt.position().unwrap(), 4278);
        tilt.move_absolute(0).unwrap();

        assert_eq!(
            tilt.trace(),
            &[
                AxisCommand::SetProfile(TiltCurve::LayerRelease),
                AxisCommand::MoveRelative(-650),
                AxisCommand::MoveAbsolute(0),
            ]
        );
        assert_eq!(tilt.motion_count(), 2);
        assert_eq!(tilt.profile(), Some(TiltCurve::LayerRelease));
        assert_eq!(tilt.axis(), Axis::Tilt);
    }

    #[test]
    fn test_obstruction_stalls() {
        let mut tilt = VirtualTilt::new(1000);
        tilt.obstruct_at(300);

        tilt.move_absolute(0).unwrap();
        assert_eq!(tilt.position().unwrap(), 300);
        assert!(tilt.query_stall().unwrap());
        // reading clears the flag
        assert!(!tilt.query_stall().unwrap());

        assert!(tilt.home().unwrap());
        tilt.move_absolute(0).unwrap();
        assert_eq!(tilt.position().unwrap(), 0);
    }

    #[test]
    fn test_ceiling_stalls_upward_moves() {
        let mut tilt = VirtualTilt::new(0);
        tilt.obstruct_above(4000);

        tilt.move_absolute(4528).unwrap();
        assert_eq!(tilt.position().unwrap(), 4000);
        assert!(tilt.query_stall().unwrap());

        // downward travel is free
        tilt.move_relative(-1000).unwrap();
        assert_eq!(tilt.position().unwrap(), 3000);
        assert!(!tilt.query_stall().unwrap());

        assert!(tilt.home().unwrap());
        tilt.move_absolute(4928).unwrap();
        assert_eq!(tilt.position().unwrap(), 4928);
    }

    #[test]
    fn test_scripted_homing() {
        let mut tilt = VirtualTilt::new(500);
        tilt.script_homing(&[false, true]);

        assert!(!tilt.home().unwrap());
        assert_eq!(tilt.position().unwrap(), 500);
        assert!(tilt.home().unwrap());
        assert_eq!(tilt.position().unwrap(), 0);
        assert!(tilt.home().unwrap());
    }

    #[test]
    fn test_fault_injection() {
        let mut tower = VirtualTower::new(0);
        tower.fail_command(1, AxisError::CommunicationError);

        assert!(tower.set_profile(TowerCurve::Layer).is_ok());
        assert_eq!(
            tower.move_absolute(50_000),
            Err(AxisError::CommunicationError)
        );
        assert_eq!(tower.position().unwrap(), 0);
    }

    #[test]
    fn test_bounds() {
        let mut tower = VirtualTower::new(0).with_bounds(0, 150_000_000);

        assert_eq!(tower.move_relative(-1), Err(AxisError::OutOfBounds));
        assert!(tower.move_absolute(150_000_000).is_ok());
    }
}
