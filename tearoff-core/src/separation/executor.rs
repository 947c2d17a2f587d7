//! Layer separation executor
//!
//! Drives a [`SeparationPlan`] against the tilt and tower drivers, the delay
//! source and the clock. Abort requests are polled whenever the plan enters
//! a new phase.

use embedded_hal::delay::DelayNs;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::error::SeparationError;
use super::phase::SeparationPhase;
use super::plan::{Command, Feedback, SeparationPlan, Step};
use crate::config::{
    ExposureProfile, Fill, LayerSeparationParams, MovingProfileTable, TiltCurve, TiltGeometry,
    TowerCurve,
};
use crate::motion::Axis;
use crate::safety::{UnstuckProcedure, UnstuckStatus};
use crate::traits::{AbortSignal, AxisDriver, AxisError, Clock, NoAbort};

/// Summary of a completed layer separation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeparationReport {
    /// Wall time of the whole separation
    pub elapsed_ms: u64,
    /// Parameter set that was used
    pub fill: Fill,
    /// Stalls resolved by homing
    pub stall_recoveries: u8,
    /// Expected tilt move time from the profile, 0 without tilt
    pub moves_time_ms: u32,
    /// Tower was raised before the tilt-up
    pub hopped: bool,
}

/// Layer separation executor
///
/// Holds both axes exclusively for its whole lifetime. The profile table
/// and exposure profile are shared read-only.
pub struct LayerSeparator<'a, T, W, D, C, A = NoAbort> {
    table: &'a MovingProfileTable,
    exposure: &'a ExposureProfile,
    geometry: TiltGeometry,
    tilt: T,
    tower: W,
    delay: D,
    clock: C,
    abort: A,
    phase: SeparationPhase,
}

impl<'a, T, W, D, C> LayerSeparator<'a, T, W, D, C, NoAbort>
where
    T: AxisDriver<Curve = TiltCurve>,
    W: AxisDriver<Curve = TowerCurve>,
    D: DelayNs,
    C: Clock,
{
    /// Create an executor with the factory tilt geometry and no abort source
    pub fn new(
        table: &'a MovingProfileTable,
        exposure: &'a ExposureProfile,
        tilt: T,
        tower: W,
        delay: D,
        clock: C,
    ) -> Self {
        Self {
            table,
            exposure,
            geometry: TiltGeometry::default(),
            tilt,
            tower,
            delay,
            clock,
            abort: NoAbort,
            phase: SeparationPhase::Idle,
        }
    }
}

impl<'a, T, W, D, C, A> LayerSeparator<'a, T, W, D, C, A>
where
    T: AxisDriver<Curve = TiltCurve>,
    W: AxisDriver<Curve = TowerCurve>,
    D: DelayNs,
    C: Clock,
    A: AbortSignal,
{
    /// Use a calibrated tilt geometry
    pub fn with_geometry(mut self, geometry: TiltGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Poll `abort` between phases
    pub fn with_abort<S: AbortSignal>(self, abort: S) -> LayerSeparator<'a, T, W, D, C, S> {
        LayerSeparator {
            table: self.table,
            exposure: self.exposure,
            geometry: self.geometry,
            tilt: self.tilt,
            tower: self.tower,
            delay: self.delay,
            clock: self.clock,
            abort,
            phase: self.phase,
        }
    }

    /// Current phase, `Idle` between layers
    pub fn phase(&self) -> SeparationPhase {
        self.phase
    }

    pub fn geometry(&self) -> TiltGeometry {
        self.geometry
    }

    /// Release the axis drivers
    pub fn into_axes(self) -> (T, W) {
        (self.tilt, self.tower)
    }

    /// Separate the layer just exposed and move to the next one
    ///
    /// `area` is the cured area of the exposed layer in mm², `next_layer_nm`
    /// the absolute tower position of the next layer.
    pub fn execute_layer_separation(
        &mut self,
        area: f32,
        next_layer_nm: i32,
    ) -> Result<SeparationReport, SeparationError> {
        let start = self.clock.now_ms();
        let fill = self.exposure.fill_for(area);
        let params = *self.exposure.params(fill);
        debug!(
            "layer separation: area {} mm2, {} fill, next layer {} nm",
            area,
            fill,
            next_layer_nm
        );

        let mut plan = SeparationPlan::new(self.table, &params, self.geometry, next_layer_nm)?;
        let result = self.run(&mut plan, &params);
        self.phase = SeparationPhase::Idle;
        result?;

        let report = SeparationReport {
            elapsed_ms: self.clock.now_ms().saturating_sub(start),
            fill,
            stall_recoveries: plan.stall_recoveries(),
            moves_time_ms: params.tilt.map_or(0, |t| t.moves_time_ms),
            hopped: plan.hops(),
        };
        info!(
            "layer separated in {} ms ({} stall recoveries)",
            report.elapsed_ms,
            report.stall_recoveries
        );
        Ok(report)
    }

    fn run(
        &mut self,
        plan: &mut SeparationPlan,
        params: &LayerSeparationParams,
    ) -> Result<(), SeparationError> {
        let mut feedback = Feedback::None;
        loop {
            match plan.next(feedback) {
                Step::Command(command) => {
                    let phase = plan.phase();
                    if phase != self.phase {
                        self.phase = phase;
                        if self.abort.abort_requested() {
                            return Err(self.cancel(plan, params));
                        }
                    }
                    feedback = self.dispatch(phase, command)?;
                }
                Step::Done => {
                    self.phase = SeparationPhase::Done;
                    return Ok(());
                }
                Step::Failed(e) => {
                    error!("layer separation failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    fn dispatch(
        &mut self,
        phase: SeparationPhase,
        command: Command,
    ) -> Result<Feedback, SeparationError> {
        let axis = command.axis().unwrap_or(Axis::Tilt);
        let result: Result<Feedback, AxisError> = match command {
            Command::SetTiltProfile(curve) => self.tilt.set_profile(curve).map(|_| Feedback::None),
            Command::SetTowerProfile(curve) => {
                self.tower.set_profile(curve).map(|_| Feedback::None)
            }
            Command::MoveRelative { axis, steps } => match axis {
                Axis::Tilt => self.tilt.move_relative(steps),
                Axis::Tower => self.tower.move_relative(steps),
            }
            .map(|_| Feedback::None),
            Command::MoveAbsolute { axis, position } => match axis {
                Axis::Tilt => self.tilt.move_absolute(position),
                Axis::Tower => self.tower.move_absolute(position),
            }
            .map(|_| Feedback::None),
            Command::ReadPosition(axis) => match axis {
                Axis::Tilt => self.tilt.position(),
                Axis::Tower => self.tower.position(),
            }
            .map(Feedback::Position),
            Command::QueryStall(axis) => match axis {
                Axis::Tilt => self.tilt.query_stall(),
                Axis::Tower => self.tower.query_stall(),
            }
            .map(Feedback::Stall),
            Command::Home(axis) => match axis {
                Axis::Tilt => self.tilt.home(),
                Axis::Tower => self.tower.home(),
            }
            .map(Feedback::Homed),
            Command::Wait { ms } => {
                self.delay.delay_ms(ms);
                Ok(Feedback::None)
            }
        };

        result.map_err(|error| {
            error!("{} command failed during {}: {}", axis, phase, error);
            SeparationError::AxisCommandFailure { axis, phase, error }
        })
    }

    /// Bring the tilt to a safe position after an abort request
    fn cancel(
        &mut self,
        plan: &SeparationPlan,
        params: &LayerSeparationParams,
    ) -> SeparationError {
        let phase = self.phase;
        warn!("layer separation cancelled during {}", phase);

        if params.use_tilt() {
            let cycles = plan.tilt_down().map_or(1, |p| p.homing_cycles.max(1));
            let mut homing = UnstuckProcedure::new(cycles);
            loop {
                let homed = match self.tilt.home() {
                    Ok(homed) => homed,
                    Err(e) => {
                        warn!("tilt homing after cancel failed: {}", e);
                        false
                    }
                };
                match homing.record(homed) {
                    UnstuckStatus::Retry => {}
                    UnstuckStatus::Recovered { .. } => break,
                    UnstuckStatus::Exhausted { attempts } => {
                        warn!("tilt not homed after cancel ({} attempts)", attempts);
                        break;
                    }
                }
            }
        }

        SeparationError::Cancelled { phase }
    }
}
