//! Three-compartment physiological simulator for pediatric fluid
//! resuscitation bedside decision support.
//!
//! This crate is the core engine behind a bedside decision-support tool: it
//! builds a per-patient physiological "digital twin" from a validated
//! bedside snapshot, forward-simulates that patient's circulatory,
//! interstitial, cellular, renal, and metabolic response to an IV fluid
//! prescription minute by minute, and watches the run for safety
//! conditions. It does not choose what to give — fluid selection and
//! bolus-volume protocol tables are the responsibility of a surrounding
//! service layer.
//!
//! Four free functions form the public surface, applied in order:
//!
//! 1. [`build_params`] — calibrate a [`PhysiologicalParams`] bundle (plus a
//!    [`Warnings`] provenance report) from a [`PatientInput`].
//! 2. [`init_state`] — compute the T=0 [`SimulationState`].
//! 3. [`step`] — advance one minute (or a smaller `dt`) at a time.
//! 4. [`run`] — drive a full bolus prescription through repeated [`step`]
//!    calls, recording a trajectory and watching for safety stops.
//!
//! The simulator itself (Frank-Starling cardiac mechanics, Starling
//! capillary filtration, renal perfusion autoregulation, osmotic ECF/ICF
//! shifts, and electrolyte/glucose/hemoglobin/lactate mass balance) is a
//! nonlinear, coupled dynamical system; every term is clamped or
//! denominator-guarded so that it remains numerically stable across
//! pathological physiology rather than producing non-finite values (§7 of
//! the governing specification — physiology does not throw).

pub mod calibrate;
pub mod compartment;
pub mod error;
pub mod fluid;
pub mod init;
pub mod math;
pub mod params;
pub mod patient;
pub mod safety;
pub mod sim;
pub mod state;
pub mod warnings;

pub use calibrate::build_params;
pub use error::{CoreError, CoreResult};
pub use fluid::{FluidProperties, FluidTag};
pub use init::init_state;
pub use params::PhysiologicalParams;
pub use patient::{DiagnosisTag, IvSet, OngoingLossSeverity, PatientInput, Sex};
pub use safety::RunTrigger;
pub use sim::step;
pub use state::{SafetyAlerts, SimulationState, TrajectoryPoint};
pub use warnings::Warnings;

use log::info;
use serde::{Deserialize, Serialize};

/// The largest `dt` (in minutes) that [`run`] will hand to a single [`step`]
/// call. If a full-size step would violate an invariant, `run` retries the
/// same wall-clock interval in halved sub-steps until it either converges
/// or reaches [`MIN_DT_MINUTES`].
const MAX_DT_MINUTES: f64 = 1.0;

/// The smallest sub-step `run` will fall back to before accepting whatever
/// [`step`] returns (with `soft_nan` set, if the invariant is still
/// violated at this resolution).
const MIN_DT_MINUTES: f64 = 1.0 / 16.0;

/// Outcome of a full prescription run, as returned by [`run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub final_state: SimulationState,
    /// Safety flags evaluated on `final_state`.
    pub alerts: SafetyAlerts,
    /// Driver-loop triggers observed during the run, in chronological order
    /// (a `PreExistingCongestion` refusal is always the sole entry when
    /// present; abort triggers are always the last entry).
    pub triggers: Vec<String>,
    /// One recorded point per minute, present only when `record` was true.
    pub trajectory: Vec<TrajectoryPoint>,
    /// `final_state.map_mmhg - initial.map_mmhg`.
    pub map_rise_mmhg: f64,
    /// Fraction of the total infused volume that left the vasculature via
    /// the Starling leak over the course of the run (0 when nothing was
    /// infused).
    pub leak_fraction: f64,
    /// Set when the run stopped before `duration_min` elapsed because of a
    /// hard stop or the pre-run guard.
    pub aborted: bool,
}

/// Drives `initial` forward through repeated [`step`] calls for
/// `duration_min` minutes, infusing `volume_ml` of `fluid_tag` at a
/// constant rate spread evenly across that duration.
///
/// Refuses to start (returns `aborted: true` with `triggers` containing the
/// pre-run guard's reason and `final_state` equal to `initial`) when the
/// entry state already shows `p_interstitial_mmhg >= 4`. Otherwise steps
/// minute by minute, halving `dt` (down to [`MIN_DT_MINUTES`]) whenever a
/// step would otherwise report `soft_nan`, and stops early the first time
/// [`safety::hard_stop`] fires. `record` controls whether a
/// [`TrajectoryPoint`] is pushed after every step; callers that only need
/// the final state and alerts can skip the allocation.
pub fn run(
    initial: SimulationState,
    params: &PhysiologicalParams,
    fluid_tag: FluidTag,
    volume_ml: f64,
    duration_min: f64,
    record: bool,
) -> RunOutcome {
    let mut triggers = Vec::new();

    if let Some(trigger) = safety::pre_run_guard(&initial) {
        triggers.push(format!("{:?}", trigger));
        let alerts = safety::evaluate(&initial, params);
        return RunOutcome {
            final_state: initial,
            alerts,
            triggers,
            trajectory: Vec::new(),
            map_rise_mmhg: 0.0,
            leak_fraction: 0.0,
            aborted: true,
        };
    }

    let rate_ml_hr = if duration_min > 0.0 {
        volume_ml / (duration_min / 60.0)
    } else {
        0.0
    };

    let mut state = initial;
    let mut trajectory = Vec::new();
    if record {
        trajectory.push(TrajectoryPoint::from_state(&state));
    }

    let mut elapsed = 0.0;
    let mut total_leaked_ml = 0.0;
    let mut last_reassess_total = 0.0;
    let mut aborted = false;

    while elapsed < duration_min {
        let remaining = duration_min - elapsed;
        let mut dt = MAX_DT_MINUTES.min(remaining);
        let infusing = elapsed < duration_min;
        let rate = if infusing { rate_ml_hr } else { 0.0 };

        let next = loop {
            let candidate = sim::step(&state, params, rate, fluid_tag, dt);
            if !candidate.soft_nan || dt <= MIN_DT_MINUTES {
                break candidate;
            }
            dt /= 2.0;
        };

        total_leaked_ml += next.q_leak_ml_min * dt;
        elapsed += dt;
        for trigger in safety::reassess_triggers(&next, last_reassess_total, params.v_blood_normal_l)
        {
            triggers.push(format!("{:?}", trigger));
        }
        last_reassess_total = next.total_infused_ml;
        state = next;

        if record {
            trajectory.push(TrajectoryPoint::from_state(&state));
        }

        if let Some(trigger) = safety::hard_stop(&state) {
            info!(
                "run aborted at t={:.1} min: {:?}",
                state.t_minutes, trigger
            );
            triggers.push(format!("{:?}", trigger));
            aborted = true;
            break;
        }
    }

    let leak_fraction = if state.total_infused_ml > 0.0 {
        (total_leaked_ml / state.total_infused_ml).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let alerts = safety::evaluate(&state, params);

    RunOutcome {
        map_rise_mmhg: state.map_mmhg - initial.map_mmhg,
        final_state: state,
        alerts,
        triggers,
        trajectory,
        leak_fraction,
        aborted,
    }
}
