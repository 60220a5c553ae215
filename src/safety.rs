//! Safety Supervisor: a stateless classifier over a [`SimulationState`],
//! plus the driver-loop hard stops and pre-run guard that [`crate::run`]
//! enforces around it.
//!
//! The supervisor itself never aborts anything — it only reports. Aborting
//! the simulation is the driver's job (§4.6: "used by the predictor, not the
//! supervisor"), kept separate so a caller that only wants the alert bundle
//! (e.g. to annotate a trajectory after the fact) never pays for the
//! driver's control flow.

use crate::params::PhysiologicalParams;
use crate::state::{SafetyAlerts, SimulationState};

/// Evaluates the fixed boolean risk flags against the current state. Takes
/// the calibrated [`PhysiologicalParams`] for context the state itself does
/// not carry: contractility (SAM weak-heart flag), and the patient's
/// baseline hematocrit/glucose captured at calibration time (dengue leak
/// comparison, presenting-hyperglycemia check) — these never change once
/// calibrated, so they live on params rather than being threaded through as
/// a separate argument.
pub fn evaluate(state: &SimulationState, params: &PhysiologicalParams) -> SafetyAlerts {
    let pulmonary_edema = state.p_interstitial_mmhg > 5.0;
    let volume_overload = state.total_infused_ml > 40.0 * state.weight_kg;

    let mean_fluid_na = if state.total_infused_ml > 0.0 {
        Some(state.total_sodium_load_meq / (state.total_infused_ml / 1000.0))
    } else {
        None
    };
    let cerebral_edema_risk = match mean_fluid_na {
        Some(mean_na) => {
            (mean_na < 130.0 && state.sodium_meq_l > 145.0) || (state.sodium_meq_l - mean_na > 15.0)
        }
        None => false,
    };

    let hypoglycemia = state.glucose_mg_dl < 54.0;
    let hyperglycemia_ketoacidosis_risk = params.baseline_glucose_mg_dl > 250.0
        || (state.lactate_mmol_l > 5.0 && state.glucose_mg_dl > 180.0);

    let sam_weak_heart = params.cardiac_contractility < 0.6 || params.is_sam;
    let dengue_active_leak =
        state.hematocrit_pct > params.baseline_hematocrit_pct || state.q_leak_ml_min > 0.1;
    let hydrocortisone_needed = state.lactate_mmol_l > 7.0;
    let anemia_dilution = state.hemoglobin_g_dl > 4.0 && state.hemoglobin_g_dl < 7.0;

    SafetyAlerts {
        pulmonary_edema,
        volume_overload,
        cerebral_edema_risk,
        hypoglycemia,
        hyperglycemia_ketoacidosis_risk,
        sam_weak_heart,
        anemia_dilution,
        dengue_active_leak,
        hydrocortisone_needed,
    }
}

/// A driver-loop trigger: either a hard stop that aborts the run, a refusal
/// to start, or a soft "stop and reassess" advisory that does not abort.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunTrigger {
    /// The entry state already shows `p_interstitial >= 4`; the run was
    /// refused before any simulation occurred.
    PreExistingCongestion,
    /// The run was aborted mid-flight: `p_interstitial_mmhg > 5`.
    PulmonaryEdemaAbort,
    /// The run was aborted mid-flight: `hematocrit_pct < 20`.
    CriticalHemodilutionAbort,
    /// A non-aborting advisory: cumulative infused volume crossed another
    /// 10 mL/kg multiple. Carries the multiple crossed.
    ReassessVolumeThreshold { ml_per_kg_crossed: u32 },
}

/// Refuses to start a bolus run when the entry state is already
/// dangerously congested.
pub fn pre_run_guard(entry: &SimulationState) -> Option<RunTrigger> {
    if entry.p_interstitial_mmhg >= 4.0 {
        Some(RunTrigger::PreExistingCongestion)
    } else {
        None
    }
}

/// Hard-stop check evaluated after every step by [`crate::run`]. Returns
/// `Some` when the run must abort immediately.
pub fn hard_stop(state: &SimulationState) -> Option<RunTrigger> {
    if state.p_interstitial_mmhg > 5.0 {
        Some(RunTrigger::PulmonaryEdemaAbort)
    } else if state.hematocrit_pct < 20.0 {
        Some(RunTrigger::CriticalHemodilutionAbort)
    } else {
        None
    }
}

/// Soft "reassess" advisory: fires once per each new 10 mL/kg of cumulative
/// infused volume crossed, and once more (independent of the threshold
/// ladder) as soon as cumulative infusion exceeds 80% of the patient's
/// normal blood volume in mL.
pub fn reassess_triggers(
    state: &SimulationState,
    previous_total_ml: f64,
    v_blood_normal_l: f64,
) -> Vec<RunTrigger> {
    let mut triggers = Vec::new();
    let prev_per_kg = previous_total_ml / state.weight_kg / 10.0;
    let now_per_kg = state.total_infused_ml / state.weight_kg / 10.0;
    if now_per_kg.floor() > prev_per_kg.floor() {
        triggers.push(RunTrigger::ReassessVolumeThreshold {
            ml_per_kg_crossed: now_per_kg.floor() as u32 * 10,
        });
    }
    let threshold_ml = 0.8 * v_blood_normal_l * 1000.0;
    if previous_total_ml <= threshold_ml && state.total_infused_ml > threshold_ml {
        triggers.push(RunTrigger::ReassessVolumeThreshold {
            ml_per_kg_crossed: (threshold_ml / state.weight_kg) as u32,
        });
    }
    triggers
}
