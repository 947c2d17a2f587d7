//! Layer separation plan
//!
//! The plan is a pure state machine. Each call to [`SeparationPlan::next`]
//! takes the driver feedback for the previously issued command and returns
//! the next command, `Done`, or the error that ended the separation. It
//! never touches hardware, so the complete command sequence of a layer can
//! be checked without drivers.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::error::SeparationError;
use super::phase::SeparationPhase;
use crate::config::{
    LayerSeparationParams, MovingProfile, MovingProfileTable, ProfileError, TiltCurve,
    TiltGeometry, TowerCurve,
};
use crate::motion::{Axis, CycleSplit, SplitStep};
use crate::safety::{StallCheck, StallOutcome, UnstuckProcedure, UnstuckStatus};
use crate::traits::AxisError;

/// Command for an axis driver or the delay source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Command {
    /// Select a tilt hardware curve
    SetTiltProfile(TiltCurve),
    /// Select a tower hardware curve
    SetTowerProfile(TowerCurve),
    /// Blocking relative move
    MoveRelative { axis: Axis, steps: i32 },
    /// Blocking absolute move
    MoveAbsolute { axis: Axis, position: i32 },
    /// Read the axis position, answered with [`Feedback::Position`]
    ReadPosition(Axis),
    /// Read the stall flag, answered with [`Feedback::Stall`]
    QueryStall(Axis),
    /// Home the axis, answered with [`Feedback::Homed`]
    Home(Axis),
    /// Block for the given time
    Wait { ms: u32 },
}

impl Command {
    /// Axis the command is addressed to
    pub fn axis(&self) -> Option<Axis> {
        match *self {
            Command::SetTiltProfile(_) => Some(Axis::Tilt),
            Command::SetTowerProfile(_) => Some(Axis::Tower),
            Command::MoveRelative { axis, .. }
            | Command::MoveAbsolute { axis, .. }
            | Command::ReadPosition(axis)
            | Command::QueryStall(axis)
            | Command::Home(axis) => Some(axis),
            Command::Wait { .. } => None,
        }
    }

    /// Check if the command moves an axis
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            Command::MoveRelative { .. } | Command::MoveAbsolute { .. } | Command::Home(_)
        )
    }
}

/// Result of the previously issued command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Feedback {
    /// Command completed without a value (also used for the first call)
    None,
    /// Answer to [`Command::ReadPosition`]
    Position(i32),
    /// Answer to [`Command::QueryStall`]
    Stall(bool),
    /// Answer to [`Command::Home`]
    Homed(bool),
}

/// Output of [`SeparationPlan::next`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Execute this command and report its feedback
    Command(Command),
    /// Separation finished
    Done,
    /// Separation failed, no further commands follow
    Failed(SeparationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Ack,
    Position,
    Stall,
    Homed,
}

/// Tilt-down and tilt-up profiles resolved from the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TiltMoves {
    down: MovingProfile,
    up: MovingProfile,
}

/// Command sequence of one layer separation
#[derive(Debug, Clone)]
pub struct SeparationPlan {
    params: LayerSeparationParams,
    tilt: Option<TiltMoves>,
    geometry: TiltGeometry,
    next_layer_nm: i32,
    hop_nm: i32,

    phase: SeparationPhase,
    /// Progress inside the current phase
    sub: u16,
    expect: Expect,
    last_axis: Axis,
    split: Option<CycleSplit>,
    position: i32,
    stalled: bool,
    homed: bool,
    /// Tilt is moving back to the checked position after a recovery
    restoring: bool,
    unstuck: UnstuckProcedure,
    stall_recoveries: u8,
    failure: Option<SeparationError>,
}

impl SeparationPlan {
    /// Resolve the profiles of `params` and prepare the sequence
    ///
    /// Fails before any command is issued if the geometry, the parameter
    /// set or one of the resolved tilt profiles is out of range.
    pub fn new(
        table: &MovingProfileTable,
        params: &LayerSeparationParams,
        geometry: TiltGeometry,
        next_layer_nm: i32,
    ) -> Result<Self, ProfileError> {
        geometry.validate()?;
        params.validate()?;
        let hop_nm =
            i32::try_from(params.tower_hop_height_nm).map_err(|_| ProfileError::OutOfRange {
                field: "tower_hop_height_nm",
                value: params.tower_hop_height_nm as i64,
            })?;

        let tilt = match &params.tilt {
            Some(sequence) => {
                let moves = TiltMoves {
                    down: *table.profile_for(Axis::Tilt, sequence.tilt_down)?,
                    up: *table.profile_for(Axis::Tilt, sequence.tilt_up)?,
                };
                moves.down.validate_for(geometry)?;
                moves.up.validate_for(geometry)?;
                Some(moves)
            }
            None => None,
        };

        Ok(Self {
            params: *params,
            tilt,
            geometry,
            next_layer_nm,
            hop_nm,
            phase: SeparationPhase::Idle,
            sub: 0,
            expect: Expect::Ack,
            last_axis: Axis::Tilt,
            split: None,
            position: 0,
            stalled: false,
            homed: false,
            restoring: false,
            unstuck: UnstuckProcedure::new(0),
            stall_recoveries: 0,
            failure: None,
        })
    }

    /// Phase of the last returned step
    pub fn phase(&self) -> SeparationPhase {
        self.phase
    }

    /// Stalls resolved by homing so far
    pub fn stall_recoveries(&self) -> u8 {
        self.stall_recoveries
    }

    /// Resolved tilt-down profile, `None` without tilt
    pub fn tilt_down(&self) -> Option<&MovingProfile> {
        self.tilt.as_ref().map(|t| &t.down)
    }

    /// Resolved tilt-up profile, `None` without tilt
    pub fn tilt_up(&self) -> Option<&MovingProfile> {
        self.tilt.as_ref().map(|t| &t.up)
    }

    /// Check if the tower is raised before the tilt-up
    pub fn hops(&self) -> bool {
        self.hop_nm > 0
    }

    /// Advance the plan
    ///
    /// `feedback` answers the command returned by the previous call.
    pub fn next(&mut self, feedback: Feedback) -> Step {
        if let Some(failure) = &self.failure {
            return Step::Failed(failure.clone());
        }
        if let Err(e) = self.accept(feedback) {
            return self.fail(e);
        }

        loop {
            match self.advance() {
                Ok(Some(command)) => {
                    self.expect = match command {
                        Command::ReadPosition(_) => Expect::Position,
                        Command::QueryStall(_) => Expect::Stall,
                        Command::Home(_) => Expect::Homed,
                        _ => Expect::Ack,
                    };
                    if let Some(axis) = command.axis() {
                        self.last_axis = axis;
                    }
                    trace!("{}: {}", self.phase.as_str(), command);
                    return Step::Command(command);
                }
                Ok(None) if self.phase == SeparationPhase::Done => return Step::Done,
                Ok(None) => {}
                Err(e) => return self.fail(e),
            }
        }
    }

    fn fail(&mut self, error: SeparationError) -> Step {
        self.failure = Some(error.clone());
        Step::Failed(error)
    }

    fn accept(&mut self, feedback: Feedback) -> Result<(), SeparationError> {
        match (self.expect, feedback) {
            (Expect::Ack, Feedback::None) => {}
            (Expect::Position, Feedback::Position(position)) => self.position = position,
            (Expect::Stall, Feedback::Stall(stalled)) => self.stalled = stalled,
            (Expect::Homed, Feedback::Homed(homed)) => self.homed = homed,
            _ => {
                return Err(SeparationError::AxisCommandFailure {
                    axis: self.last_axis,
                    phase: self.phase,
                    error: AxisError::InvalidResponse,
                });
            }
        }
        self.expect = Expect::Ack;
        Ok(())
    }

    fn enter(&mut self, phase: SeparationPhase) {
        debug!("separation phase: {}", phase.as_str());
        self.phase = phase;
        self.sub = 0;
        self.split = None;
        self.restoring = false;
    }

    /// Return the next command of the current phase or move to the next
    /// phase and return `None`
    fn advance(&mut self) -> Result<Option<Command>, SeparationError> {
        let step = self.sub;
        self.sub = self.sub.saturating_add(1);

        match self.phase {
            SeparationPhase::Idle => {
                self.enter(SeparationPhase::SettleAfterExposure);
                Ok(None)
            }
            SeparationPhase::SettleAfterExposure => {
                let delay = self.params.delay_after_exposure_ms;
                if step == 0 && delay > 0 {
                    return Ok(Some(Command::Wait { ms: delay }));
                }
                if self.tilt.is_some() {
                    self.enter(SeparationPhase::TiltDownInitial);
                } else {
                    self.enter(SeparationPhase::TowerPhase);
                }
                Ok(None)
            }
            SeparationPhase::TiltDownInitial => {
                let profile = self.tilt_moves()?.down;
                match step {
                    0 => Ok(Some(Command::SetTiltProfile(profile.initial_profile))),
                    1 if profile.offset_steps > 0 => Ok(Some(Command::MoveRelative {
                        axis: Axis::Tilt,
                        steps: -profile.offset_steps,
                    })),
                    _ => {
                        self.enter(SeparationPhase::TiltDownOffsetWait);
                        Ok(None)
                    }
                }
            }
            SeparationPhase::TiltDownOffsetWait => {
                let delay = self.tilt_moves()?.down.offset_delay_ms;
                if step == 0 && delay > 0 {
                    return Ok(Some(Command::Wait { ms: delay }));
                }
                self.enter(SeparationPhase::TiltDownFinish);
                Ok(None)
            }
            SeparationPhase::TiltDownFinish => {
                if step == 0 {
                    let curve = self.tilt_moves()?.down.finish_profile;
                    return Ok(Some(Command::SetTiltProfile(curve)));
                }
                self.enter(SeparationPhase::TiltDownCycles);
                Ok(None)
            }
            SeparationPhase::TiltDownCycles => {
                let profile = self.tilt_moves()?.down;
                let command = self.cycles(step, TiltGeometry::ZERO, &profile)?;
                if command.is_none() {
                    self.enter(SeparationPhase::StallCheck);
                }
                Ok(command)
            }
            SeparationPhase::StallCheck => {
                let profile = self.tilt_moves()?.down;
                Ok(self.stall_check(
                    step,
                    TiltGeometry::ZERO,
                    &profile,
                    SeparationPhase::Unstuck,
                ))
            }
            SeparationPhase::Unstuck => self.unstuck(step, None),
            SeparationPhase::TowerPhase => match step {
                0 => Ok(Some(Command::SetTowerProfile(self.params.tower_profile))),
                1 if self.hops() => Ok(Some(Command::MoveRelative {
                    axis: Axis::Tower,
                    steps: self.hop_nm,
                })),
                1 => Ok(Some(Command::MoveAbsolute {
                    axis: Axis::Tower,
                    position: self.next_layer_nm,
                })),
                _ => {
                    if self.tilt.is_some() {
                        self.enter(SeparationPhase::TiltUpInitial);
                    } else {
                        self.after_tilt_up();
                    }
                    Ok(None)
                }
            },
            SeparationPhase::TiltUpInitial => {
                let profile = self.tilt_moves()?.up;
                match step {
                    0 => Ok(Some(Command::SetTiltProfile(profile.initial_profile))),
                    1 => {
                        let position = self
                            .geometry
                            .height_steps
                            .checked_sub(profile.offset_steps)
                            .ok_or_else(|| self.out_of_travel())?;
                        Ok(Some(Command::MoveAbsolute {
                            axis: Axis::Tilt,
                            position,
                        }))
                    }
                    _ => {
                        self.enter(SeparationPhase::TiltUpOffsetWait);
                        Ok(None)
                    }
                }
            }
            SeparationPhase::TiltUpOffsetWait => {
                let delay = self.tilt_moves()?.up.offset_delay_ms;
                if step == 0 && delay > 0 {
                    return Ok(Some(Command::Wait { ms: delay }));
                }
                self.enter(SeparationPhase::TiltUpFinish);
                Ok(None)
            }
            SeparationPhase::TiltUpFinish => {
                if step == 0 {
                    let curve = self.tilt_moves()?.up.finish_profile;
                    return Ok(Some(Command::SetTiltProfile(curve)));
                }
                self.enter(SeparationPhase::TiltUpCycles);
                Ok(None)
            }
            SeparationPhase::TiltUpCycles => {
                let profile = self.tilt_moves()?.up;
                let command = self.cycles(step, self.geometry.height_steps, &profile)?;
                if command.is_none() {
                    self.enter(SeparationPhase::TiltUpStallCheck);
                }
                Ok(command)
            }
            SeparationPhase::TiltUpStallCheck => {
                let profile = self.tilt_moves()?.up;
                let target = self.geometry.height_steps;
                Ok(self.stall_check(step, target, &profile, SeparationPhase::TiltUpUnstuck))
            }
            SeparationPhase::TiltUpUnstuck => {
                let target = self.geometry.height_steps;
                self.unstuck(step, Some(target))
            }
            SeparationPhase::TowerLower => {
                if step == 0 {
                    return Ok(Some(Command::MoveAbsolute {
                        axis: Axis::Tower,
                        position: self.next_layer_nm,
                    }));
                }
                self.enter(SeparationPhase::SettleBeforeExposure);
                Ok(None)
            }
            SeparationPhase::SettleBeforeExposure => {
                let delay = self.params.delay_before_exposure_ms;
                if step == 0 && delay > 0 {
                    return Ok(Some(Command::Wait { ms: delay }));
                }
                self.enter(SeparationPhase::Done);
                Ok(None)
            }
            SeparationPhase::Done => Ok(None),
        }
    }

    /// Read the position, then split the way to `target` into sub-moves
    fn cycles(
        &mut self,
        step: u16,
        target: i32,
        profile: &MovingProfile,
    ) -> Result<Option<Command>, SeparationError> {
        if step == 0 {
            return Ok(Some(Command::ReadPosition(Axis::Tilt)));
        }
        if self.split.is_none() {
            let distance = target
                .checked_sub(self.position)
                .ok_or_else(|| self.out_of_travel())?;
            self.split = Some(CycleSplit::new(distance, profile.cycles, profile.delay_ms));
        }
        Ok(self
            .split
            .as_mut()
            .and_then(Iterator::next)
            .map(|s| match s {
                SplitStep::Move(steps) => Command::MoveRelative {
                    axis: Axis::Tilt,
                    steps,
                },
                SplitStep::Wait(ms) => Command::Wait { ms },
            }))
    }

    /// Query the stall flag and position, then compare with `target`
    ///
    /// A failed check enters `unstuck` with the homing budget of `profile`.
    fn stall_check(
        &mut self,
        step: u16,
        target: i32,
        profile: &MovingProfile,
        unstuck: SeparationPhase,
    ) -> Option<Command> {
        match step {
            0 => return Some(Command::QueryStall(Axis::Tilt)),
            1 => return Some(Command::ReadPosition(Axis::Tilt)),
            _ => {}
        }

        let check = StallCheck::new(target, profile.homing_tolerance);
        match check.evaluate(self.stalled, self.position) {
            StallOutcome::Clear => self.leave_tilt_check(),
            StallOutcome::Stalled {
                position,
                deviation,
            } => {
                warn!(
                    "tilt stuck at {} ({} steps from {}), stall flag {}",
                    position,
                    deviation,
                    target,
                    self.stalled
                );
                self.unstuck = UnstuckProcedure::new(profile.homing_cycles);
                self.enter(unstuck);
            }
        }
        None
    }

    /// Home until the tilt is free
    ///
    /// After a recovery the tilt is moved back to `restore`, if given.
    fn unstuck(
        &mut self,
        step: u16,
        restore: Option<i32>,
    ) -> Result<Option<Command>, SeparationError> {
        if self.restoring {
            self.leave_tilt_check();
            return Ok(None);
        }
        if step % 2 == 0 {
            if self.unstuck.is_exhausted() {
                return Err(self.unrecoverable());
            }
            return Ok(Some(Command::Home(Axis::Tilt)));
        }

        match self.unstuck.record(self.homed) {
            UnstuckStatus::Recovered { attempts } => {
                warn!("tilt unstuck after {} homing attempts", attempts);
                self.stall_recoveries = self.stall_recoveries.saturating_add(1);
                if let Some(position) = restore {
                    self.restoring = true;
                    return Ok(Some(Command::MoveAbsolute {
                        axis: Axis::Tilt,
                        position,
                    }));
                }
                self.leave_tilt_check();
                Ok(None)
            }
            UnstuckStatus::Retry => Ok(None),
            UnstuckStatus::Exhausted { .. } => Err(self.unrecoverable()),
        }
    }

    fn leave_tilt_check(&mut self) {
        match self.phase {
            SeparationPhase::StallCheck | SeparationPhase::Unstuck => {
                self.enter(SeparationPhase::TowerPhase)
            }
            _ => self.after_tilt_up(),
        }
    }

    fn after_tilt_up(&mut self) {
        if self.hops() {
            self.enter(SeparationPhase::TowerLower);
        } else {
            self.enter(SeparationPhase::SettleBeforeExposure);
        }
    }

    fn tilt_moves(&self) -> Result<TiltMoves, SeparationError> {
        self.tilt.ok_or(SeparationError::AxisCommandFailure {
            axis: Axis::Tilt,
            phase: self.phase,
            error: AxisError::InvalidResponse,
        })
    }

    fn unrecoverable(&self) -> SeparationError {
        error!(
            "tilt stall unrecoverable after {} homing attempts",
            self.unstuck.attempts()
        );
        SeparationError::TiltStallUnrecoverable {
            phase: self.phase,
            attempts: self.unstuck.attempts(),
        }
    }

    /// Tilt target not representable from the reported position
    fn out_of_travel(&self) -> SeparationError {
        SeparationError::AxisCommandFailure {
            axis: Axis::Tilt,
            phase: self.phase,
            error: AxisError::OutOfBounds,
        }
    }
}
