//! Simulator: the minute-stepper.
//!
//! [`step`] evaluates cardiac (Frank-Starling), Starling capillary, renal,
//! lymphatic, and osmotic derivatives on the incoming state, applies mass
//! balance to the three fluid compartments, updates pressures from the new
//! volumes via compliance relations, re-evaluates cardiac output once more
//! on the updated volumes to produce a lag-free step-final MAP, and updates
//! the tracked metabolites by mass balance. Every call returns a brand new
//! [`SimulationState`]; nothing is mutated in place, matching the
//! "single-threaded, synchronous, strictly functional" concurrency model
//! the whole crate follows.
//!
//! `step` never fails: every division guards its denominator and every
//! invariant-bearing field is clamped before it is returned. A step that
//! would otherwise have produced an out-of-range value instead returns a
//! state with `soft_nan` set and the offending fields clamped back into
//! range; [`crate::safety`] treats that as a fatal condition for the driver
//! loop in [`crate::run`].

use log::warn;

use crate::compartment::preload_efficiency;
use crate::fluid::{self, FluidTag};
use crate::math::logistic;
use crate::params::PhysiologicalParams;
use crate::state::SimulationState;

/// A single minute (or sub-minute, when called with a smaller `dt` to avoid
/// an invariant violation) of forward simulation.
///
/// `infusion_ml_hr` is the ongoing IV rate in mL/hour; `fluid` selects which
/// [`crate::FluidProperties`] table entry supplies its tonicity, oncotic
/// pull, and electrolyte content. `dt` is in minutes.
pub fn step(
    state: &SimulationState,
    params: &PhysiologicalParams,
    infusion_ml_hr: f64,
    fluid_tag: FluidTag,
    dt: f64,
) -> SimulationState {
    let fluid_props = fluid::lookup(fluid_tag);
    let rate_ml_min = infusion_ml_hr / 60.0;

    // --- 1. Cardiac (Frank-Starling), evaluated on the incoming state ---
    let preload_ratio = state.v_blood_l * 1000.0 / params.optimal_preload_ml.max(10.0);
    let preload_eff = preload_efficiency(preload_ratio, params.is_sam, params.cardiac_contractility);

    // --- 2. Afterload and dynamic SVR ---
    // `SimulationState` carries no SVR field of its own (§3's data model is
    // fixed), so "the" SVR from the previous step is reconstructed from the
    // MAP/CVP relation that previous step actually realized, with the
    // afterload term held at 1 for the back-calculation (it is close to 1
    // across the clinically relevant range and this crate is not trying to
    // invert its own afterload curve exactly). That reconstructed value is
    // then relaxed toward a resting target (when the baroreflex is allowed
    // to stand down) or the calibrated baseline (otherwise).
    let normotensive = state.map_mmhg >= params.target_map_mmhg;
    let near_full = preload_ratio >= 1.0;
    let baroreflex_active = normotensive && near_full;

    let co_reference =
        (params.max_cardiac_output_l_min * params.cardiac_contractility * preload_eff).max(0.01);
    let prev_svr_est =
        ((state.map_mmhg - state.cvp_mmhg) * 80.0 / co_reference).clamp(200.0, 20_000.0);
    let relaxed_target_svr = (params.svr_resistance * 0.6).max(200.0);
    let svr_target = if baroreflex_active {
        relaxed_target_svr
    } else {
        params.svr_resistance
    };
    let inertia = if normotensive { 0.999 } else { 0.995 };
    let mut svr = prev_svr_est * inertia + svr_target * (1.0 - inertia);
    svr = svr.clamp(200.0, 20_000.0);
    if params.is_sam {
        // SAM's vasodilatory tendency: resistance never climbs back above
        // its own calibrated baseline, only relaxes toward/below it.
        svr = svr.clamp(params.svr_resistance * 0.5, params.svr_resistance);
    }

    let afterload = {
        let normalized = svr / 1000.0;
        let denom = 1.0 + (normalized - 1.0) * params.afterload_sensitivity;
        (1.0 / denom.max(0.1)).max(0.5)
    };

    // --- 3. Cardiac output & MAP (incoming-state estimate) ---
    let co = params.max_cardiac_output_l_min * params.cardiac_contractility * preload_eff * afterload;
    let map_estimate = (co * svr / 80.0 + state.cvp_mmhg).clamp(30.0, 160.0);

    // --- 4. Starling flux (capillary leak), evaluated on incoming pressures ---
    let pc = params.baseline_capillary_pressure_mmhg * (state.map_mmhg / params.target_map_mmhg);
    let mut pi_c = params.plasma_oncotic_pressure_mmhg * (params.v_blood_normal_l / state.v_blood_l);
    if fluid_props.is_colloid {
        pi_c += 2.0;
    }
    let recruitment_r = if state.map_mmhg < 50.0 {
        2.0
    } else if preload_ratio < 0.8 {
        0.5
    } else {
        1.0
    };
    let recruitment_r = if params.is_sam {
        recruitment_r.min(0.8)
    } else {
        recruitment_r
    };
    let recruitment = params.capillary_recruitment_base * recruitment_r;
    let mut k_f_eff = params.capillary_filtration_k * recruitment;
    if fluid_props.is_colloid && params.reflection_coefficient_sigma < 0.6 {
        k_f_eff *= 0.5;
    }
    let j_leak = (k_f_eff
        * ((pc - state.p_interstitial_mmhg) - params.reflection_coefficient_sigma * (pi_c - 5.0)))
        .max(0.0);

    // --- 5. Lymphatic return ---
    let lymph_drive = (0.2 + ((state.p_interstitial_mmhg + 2.0) / 4.0).max(0.0)).min(3.0);
    let sam_lymph_factor = if params.is_sam { 0.4 } else { 1.0 };
    let j_lymph = lymph_drive * params.lymphatic_drainage_capacity_ml_min * sam_lymph_factor;

    // --- 6. Renal output ---
    let perfusion = state.map_mmhg - state.cvp_mmhg;
    let baseline_gfr = 2.1 * (params.weight_kg / 10.0) * params.renal_maturity_factor;
    let q_urine = if perfusion < 30.0 {
        0.0
    } else if perfusion <= 60.0 {
        baseline_gfr * logistic((perfusion - 45.0) / 5.0)
    } else if perfusion <= 100.0 {
        baseline_gfr
    } else {
        baseline_gfr * (1.0 + 0.01 * (perfusion - 100.0))
    }
    .max(0.0);

    // --- 7. Osmotic shift (ECF <-> ICF) ---
    let tonic_diff = state.sodium_meq_l - fluid_props.sodium_meq_l;
    let mut j_osmotic = (rate_ml_min / 1000.0)
        * tonic_diff
        * (params.osmotic_conductance_k * 0.005)
        * params.intracellular_sodium_bias;
    if fluid_props.glucose_g_l > 0.0 {
        // Dextrose is metabolized intracellularly, leaving free water behind
        // to follow; model as an extra ICF-directed term proportional to the
        // glucose delivered this step.
        j_osmotic += rate_ml_min * (fluid_props.glucose_g_l / 50.0) * 0.5;
    }

    // --- Mass balance (volumes), ml/min fluxes times dt minutes ---
    let q_ongoing_loss = state.q_ongoing_loss_ml_min;
    let q_insensible = params.insensible_loss_ml_min;

    let d_blood_ml =
        (rate_ml_min * fluid_props.vol_distribution_intravascular + j_lymph - j_leak - q_urine
            - 0.25 * q_ongoing_loss)
            * dt;
    let d_inter_ml = (rate_ml_min * (1.0 - fluid_props.vol_distribution_intravascular) + j_leak
        - j_lymph
        - 0.75 * q_ongoing_loss
        - q_insensible
        - j_osmotic)
        * dt;
    let d_icf_ml = j_osmotic * dt;

    let mut v_blood_l = state.v_blood_l + d_blood_ml / 1000.0;
    let mut v_interstitial_l = state.v_interstitial_l + d_inter_ml / 1000.0;
    let mut v_intracellular_l = state.v_intracellular_l + d_icf_ml / 1000.0;

    let mut soft_nan = false;
    let blood_floor = 0.4 * params.v_blood_normal_l;
    if v_blood_l < blood_floor {
        v_blood_l = blood_floor;
        soft_nan = true;
    }
    if v_interstitial_l < 0.1 {
        v_interstitial_l = 0.1;
        soft_nan = true;
    }
    if v_intracellular_l < 0.1 {
        v_intracellular_l = 0.1;
        soft_nan = true;
    }

    // --- Pressures from the updated volumes ---
    let excess_blood_ml = (v_blood_l - params.v_blood_normal_l) * 1000.0;
    let cvp_mmhg = (3.0 + excess_blood_ml / params.venous_compliance_ml_mmhg).clamp(1.0, 25.0);
    let excess_inter_ml = (v_interstitial_l - params.v_inter_normal_l) * 1000.0;
    let p_interstitial_mmhg =
        (excess_inter_ml / params.interstitial_compliance_ml_mmhg).max(-2.0);
    let pcwp_mmhg = 1.2 * cvp_mmhg;

    // --- Re-evaluate cardiac output once on the updated volumes, to avoid
    // a one-step lag between the fresh CVP and the reported MAP ---
    let preload_ratio_new = v_blood_l * 1000.0 / params.optimal_preload_ml.max(10.0);
    let preload_eff_new =
        preload_efficiency(preload_ratio_new, params.is_sam, params.cardiac_contractility);
    let co_new = params.max_cardiac_output_l_min * params.cardiac_contractility * preload_eff_new * afterload;
    let map_candidate = (co_new * svr / 80.0 + cvp_mmhg).clamp(30.0, 160.0);
    let _ = map_estimate; // folded into the blend below, kept for documentation symmetry with §4.5
    let mut map_mmhg = (0.7 * state.map_mmhg + 0.3 * map_candidate).clamp(30.0, 160.0);
    if !map_mmhg.is_finite() {
        map_mmhg = state.map_mmhg.clamp(30.0, 160.0);
        soft_nan = true;
    }

    // --- Metabolite mass balance ---
    let ecf_old_l = (state.v_blood_l + state.v_interstitial_l).max(0.2);
    let ecf_new_l = (v_blood_l + v_interstitial_l).max(0.2);
    let fluid_vol_l = rate_ml_min * dt / 1000.0;
    let urine_vol_l = q_urine * dt / 1000.0;

    let urine_na_conc = urine_sodium_concentration(
        state.sodium_meq_l,
        params.is_sam,
        params.reflection_coefficient_sigma,
    );
    let mass_na_old = state.sodium_meq_l * ecf_old_l;
    let fluid_na_meq = fluid_vol_l * fluid_props.sodium_meq_l;
    let urine_na_meq = urine_vol_l * urine_na_conc;
    let sodium_meq_l =
        ((mass_na_old + fluid_na_meq - urine_na_meq) / ecf_new_l).clamp(110.0, 180.0);

    let mass_k_old = state.potassium_meq_l * ecf_old_l;
    let fluid_k_meq = fluid_vol_l * fluid_props.potassium_meq_l;
    let urine_k_meq = urine_vol_l * 40.0;
    let leaky = params.reflection_coefficient_sigma < 0.6;
    let intracellular_k_leak = if leaky { 0.02 * dt } else { 0.0 };
    let potassium_meq_l = ((mass_k_old + fluid_k_meq - urine_k_meq) / ecf_new_l - intracellular_k_leak)
        .clamp(1.5, 9.0);

    let glucose_stress_factor = if leaky { 1.5 } else { 1.0 };
    let glucose_sam_factor = if params.is_sam { 0.7 } else { 1.0 };
    let consumption_mg =
        params.glucose_utilization_mg_kg_min * params.weight_kg * dt * glucose_stress_factor * glucose_sam_factor;
    let glycosuria_mg = if state.glucose_mg_dl > 180.0 {
        (state.glucose_mg_dl - 180.0) * urine_vol_l * 0.5
    } else {
        0.0
    };
    let stress_gluconeogenesis_mg = if params.is_shock_physiology {
        let base = 3.0 * params.weight_kg * dt;
        if state.glucose_mg_dl > 180.0 {
            base * 1.5
        } else {
            base
        }
    } else {
        0.0
    };
    let fluid_glucose_mg = fluid_vol_l * 1000.0 * fluid_props.glucose_g_l;
    let mass_glucose_old = state.glucose_mg_dl * ecf_old_l * 10.0;
    let mass_glucose_new = (mass_glucose_old + fluid_glucose_mg - consumption_mg - glycosuria_mg
        + stress_gluconeogenesis_mg)
        .max(0.0);
    let glucose_mg_dl = (mass_glucose_new / (ecf_new_l * 10.0)).clamp(10.0, 800.0);

    let mass_hb_old_g = state.hemoglobin_g_dl * state.v_blood_l * 10.0;
    let prbc_mass_g = if matches!(fluid_tag, FluidTag::Prbc) {
        fluid_vol_l * 10.0 * 22.0
    } else {
        0.0
    };
    let hemoglobin_g_dl = ((mass_hb_old_g + prbc_mass_g) / (v_blood_l * 10.0).max(0.01)).max(0.0);
    let mut hematocrit_pct = (3.0 * hemoglobin_g_dl).clamp(5.0, 70.0);
    if hematocrit_pct.is_nan() {
        hematocrit_pct = state.hematocrit_pct;
        soft_nan = true;
    }

    let clearance_k = if params.hepatic_dysfunction {
        0.02
    } else {
        (0.08 * (perfusion / 65.0)).max(0.0)
    };
    let lactate_production = if perfusion < 35.0 { 0.15 * dt } else { 0.0 };
    let lactate_mmol_l =
        (state.lactate_mmol_l - state.lactate_mmol_l * clearance_k * dt + lactate_production)
            .clamp(0.1, 25.0);

    // --- Bolus tracking ---
    let ml_this_step = rate_ml_min * dt;
    let was_flowing = state.q_infusion_ml_min > 0.1;
    let is_flowing = ml_this_step > 0.1;
    let bolus_count = if is_flowing && !was_flowing {
        state.bolus_count + 1
    } else {
        state.bolus_count
    };
    let minutes_since_last_bolus = if is_flowing { 0.0 } else { state.minutes_since_last_bolus + dt };

    if soft_nan {
        warn!(
            "step at t={:.1} clamped an invariant violation; soft_nan set",
            state.t_minutes
        );
    }

    SimulationState {
        t_minutes: state.t_minutes + dt,
        v_blood_l,
        v_interstitial_l,
        v_intracellular_l,
        map_mmhg,
        cvp_mmhg,
        pcwp_mmhg,
        p_interstitial_mmhg,
        q_infusion_ml_min: rate_ml_min,
        q_leak_ml_min: j_leak,
        q_urine_ml_min: q_urine,
        q_lymph_ml_min: j_lymph,
        q_osmotic_ml_min: j_osmotic,
        sodium_meq_l,
        potassium_meq_l,
        glucose_mg_dl,
        hemoglobin_g_dl,
        hematocrit_pct,
        lactate_mmol_l,
        q_ongoing_loss_ml_min: state.q_ongoing_loss_ml_min,
        q_insensible_loss_ml_min: q_insensible,
        total_infused_ml: state.total_infused_ml + ml_this_step,
        total_sodium_load_meq: state.total_sodium_load_meq + fluid_na_meq,
        bolus_count,
        minutes_since_last_bolus,
        weight_kg: state.weight_kg,
        soft_nan,
    }
}

/// Urine sodium concentration (mEq/L), tuned from the plasma level with a
/// SAM-specific conservation cap and a septic/dengue tubular-wasting floor.
fn urine_sodium_concentration(plasma_na: f64, is_sam: bool, sigma: f64) -> f64 {
    let mut conc = if plasma_na > 145.0 {
        100.0
    } else if plasma_na < 130.0 {
        10.0
    } else {
        60.0
    };
    if is_sam {
        conc = conc.min(20.0);
    }
    if sigma < 0.6 {
        conc = conc.max(80.0);
    }
    conc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibrate::build_params;
    use crate::init::init_state;
    use crate::patient::{DiagnosisTag, IvSet, OngoingLossSeverity, PatientInput, Sex};

    fn base_input() -> PatientInput {
        PatientInput {
            age_months: 24.0,
            weight_kg: 10.0,
            sex: Sex::Female,
            height_cm: Some(85.0),
            muac_cm: 14.0,
            temperature_c: 37.0,
            hemoglobin_g_dl: 10.0,
            systolic_bp_mmhg: 90.0,
            diastolic_bp_mmhg: Some(60.0),
            heart_rate_bpm: 120.0,
            capillary_refill_s: 2.0,
            spo2_pct: 98.0,
            respiratory_rate_bpm: 28.0,
            sodium_meq_l: Some(138.0),
            glucose_mg_dl: Some(90.0),
            hematocrit_pct: 33.0,
            albumin_g_dl: Some(4.0),
            lactate_mmol_l: Some(1.5),
            platelets_per_ul: Some(250_000.0),
            diagnosis: DiagnosisTag::SevereDehydration,
            illness_day: None,
            ongoing_losses: OngoingLossSeverity::None,
            baseline_hepatomegaly: false,
            hours_since_last_urine: 1.0,
            iv_set: IvSet(20),
        }
    }

    fn setup() -> (PatientInput, PhysiologicalParams, SimulationState) {
        let input = base_input();
        let (params, _) = build_params(input).unwrap();
        let state = init_state(&input, &params).unwrap();
        (input, params, state)
    }

    #[test]
    fn step_keeps_volumes_within_floors() {
        let (_input, params, state) = setup();
        let next = step(&state, &params, 200.0, FluidTag::RL, 1.0);
        assert!(next.v_blood_l >= 0.4 * params.v_blood_normal_l);
        assert!(next.v_interstitial_l >= 0.1);
        assert!(next.v_intracellular_l >= 0.1);
    }

    #[test]
    fn step_advances_time_by_dt() {
        let (_input, params, state) = setup();
        let next = step(&state, &params, 0.0, FluidTag::RL, 1.0);
        assert_eq!(next.t_minutes, state.t_minutes + 1.0);
    }

    #[test]
    fn crystalloid_infusion_lowers_hematocrit() {
        let (_input, params, mut state) = setup();
        let starting_hct = state.hematocrit_pct;
        for _ in 0..30 {
            state = step(&state, &params, 600.0, FluidTag::RL, 1.0);
        }
        assert!(state.hematocrit_pct < starting_hct);
    }

    #[test]
    fn prbc_infusion_raises_hemoglobin_mass() {
        let (_input, params, state) = setup();
        let mass_before = state.hemoglobin_g_dl * state.v_blood_l;
        let next = step(&state, &params, 200.0, FluidTag::Prbc, 1.0);
        let mass_after = next.hemoglobin_g_dl * next.v_blood_l;
        assert!(mass_after > mass_before);
    }

    #[test]
    fn bolus_count_increments_on_new_infusion_only() {
        let (_input, params, state) = setup();
        let s1 = step(&state, &params, 600.0, FluidTag::RL, 1.0);
        assert_eq!(s1.bolus_count, 1);
        let s2 = step(&s1, &params, 600.0, FluidTag::RL, 1.0);
        assert_eq!(s2.bolus_count, 1);
        let s3 = step(&s2, &params, 0.0, FluidTag::RL, 1.0);
        assert_eq!(s3.minutes_since_last_bolus, 1.0);
        let s4 = step(&s3, &params, 600.0, FluidTag::RL, 1.0);
        assert_eq!(s4.bolus_count, 2);
    }

    #[test]
    fn mass_conservation_holds_within_tolerance() {
        let (_input, params, state) = setup();
        let next = step(&state, &params, 300.0, FluidTag::NS, 1.0);
        let rate_ml_min = 300.0 / 60.0;
        let expected_delta_l = (rate_ml_min - next.q_urine_ml_min - next.q_insensible_loss_ml_min
            - next.q_ongoing_loss_ml_min)
            * 1.0
            / 1000.0;
        let actual_delta_l = (next.v_blood_l + next.v_interstitial_l + next.v_intracellular_l)
            - (state.v_blood_l + state.v_interstitial_l + state.v_intracellular_l);
        assert!((actual_delta_l - expected_delta_l).abs() < 1e-4);
    }
}
