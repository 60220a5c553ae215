//! State Initializer: computes the T=0 `SimulationState` from a calibrated
//! patient.

use log::debug;

use crate::compartment::compartment_volumes;
use crate::error::{CoreError, CoreResult};
use crate::params::PhysiologicalParams;
use crate::patient::PatientInput;
use crate::state::SimulationState;

/// No bolus has been given yet; this sentinel is large enough that any
/// "time since last bolus" threshold check treats the patient as never
/// having received one, without using a non-finite value that would need
/// special handling downstream.
const NO_BOLUS_YET_MINUTES: f64 = 10_080.0; // one week

/// Builds the T=0 [`SimulationState`] for a calibrated patient.
///
/// Blood volume is back-calculated from an independently estimated starting
/// CVP (not the solver's `target_cvp_mmhg`, which is a steady-state
/// resistance-balance target rather than a T=0 volume anchor). MAP at T=0
/// is taken directly as the observed value used by the calibrator, not
/// re-derived from the fresh state, to avoid a first-step discontinuity.
///
/// Fails with [`CoreError::DegenerateGeometry`] if the patient's derived
/// intracellular volume is below 0.1 L.
pub fn init_state(input: &PatientInput, params: &PhysiologicalParams) -> CoreResult<SimulationState> {
    let vols = compartment_volumes(input);
    if vols.v_intracellular_l < 0.1 {
        return Err(CoreError::DegenerateGeometry(
            "derived intracellular volume below 0.1 L".into(),
        ));
    }

    let map_obs = match input.diastolic_bp_mmhg {
        Some(dbp) => dbp + (input.systolic_bp_mmhg - dbp) / 3.0,
        None => 0.65 * input.systolic_bp_mmhg,
    };

    let mut co_est = params.max_cardiac_output_l_min * params.cardiac_contractility * 0.75;
    if input.is_septic() {
        co_est *= 1.2;
    }
    let pressure_drop = co_est * params.svr_resistance / 80.0;
    let mut estimated_cvp = (map_obs - pressure_drop).clamp(1.0, 18.0);
    if input.baseline_hepatomegaly {
        estimated_cvp = estimated_cvp.max(10.0);
    }

    let vol_excess_ml = (estimated_cvp - 3.0) * params.venous_compliance_ml_mmhg;
    let v_blood_l = (params.v_blood_normal_l + vol_excess_ml / 1000.0)
        .max(0.35 * params.v_blood_normal_l);

    let edema_ml_per_kg = if params.is_sam {
        15.0
    } else if input.is_septic() {
        5.0
    } else {
        0.0
    };
    let mut v_interstitial_l = params.v_inter_normal_l + (edema_ml_per_kg * params.weight_kg) / 1000.0;

    if estimated_cvp > 8.0 {
        let target_p_interstitial = ((estimated_cvp - 8.0) * 0.5).min(6.0);
        let current_p = (v_interstitial_l - params.v_inter_normal_l) * 1000.0
            / params.interstitial_compliance_ml_mmhg;
        if target_p_interstitial > current_p {
            let extra_ml = (target_p_interstitial - current_p) * params.interstitial_compliance_ml_mmhg;
            v_interstitial_l += extra_ml / 1000.0;
        }
    }
    let p_interstitial_mmhg = ((v_interstitial_l - params.v_inter_normal_l) * 1000.0
        / params.interstitial_compliance_ml_mmhg)
        .max(-2.0);

    let sodium_meq_l = input
        .sodium_meq_l
        .unwrap_or(if params.is_sam { 132.0 } else { 140.0 });
    let potassium_meq_l = if params.is_sam { 3.8 } else { 4.2 };
    let lactate_mmol_l = input.lactate_mmol_l.unwrap_or_else(|| {
        if input.capillary_refill_s > 4.0 {
            6.0
        } else if input.capillary_refill_s > 2.0 {
            3.5
        } else {
            2.0
        }
    });
    let glucose_mg_dl = input
        .glucose_mg_dl
        .unwrap_or(if input.is_septic() { 65.0 } else { 90.0 });
    let hemoglobin_g_dl = input.hemoglobin_g_dl;
    let hematocrit_pct = 3.0 * hemoglobin_g_dl;

    debug!(
        "init_state: v_blood_l={:.3} cvp={:.1} p_interstitial={:.2}",
        v_blood_l, estimated_cvp, p_interstitial_mmhg
    );

    Ok(SimulationState {
        t_minutes: 0.0,
        v_blood_l,
        v_interstitial_l,
        v_intracellular_l: vols.v_intracellular_l,
        map_mmhg: map_obs,
        cvp_mmhg: estimated_cvp,
        pcwp_mmhg: 1.2 * estimated_cvp,
        p_interstitial_mmhg,
        q_infusion_ml_min: 0.0,
        q_leak_ml_min: 0.0,
        q_urine_ml_min: 0.0,
        q_lymph_ml_min: 0.0,
        q_osmotic_ml_min: 0.0,
        sodium_meq_l,
        potassium_meq_l,
        glucose_mg_dl,
        hemoglobin_g_dl,
        hematocrit_pct,
        lactate_mmol_l,
        q_ongoing_loss_ml_min: input.ongoing_losses.ml_per_kg_hr() * input.weight_kg / 60.0,
        q_insensible_loss_ml_min: params.insensible_loss_ml_min,
        total_infused_ml: 0.0,
        total_sodium_load_meq: 0.0,
        bolus_count: 0,
        minutes_since_last_bolus: NO_BOLUS_YET_MINUTES,
        weight_kg: params.weight_kg,
        soft_nan: false,
    })
}
