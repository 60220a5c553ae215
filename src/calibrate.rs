//! Parameter Calibrator: builds a [`PhysiologicalParams`] bundle from a
//! validated [`PatientInput`], including the fixed-point SVR back-solver.

use log::{debug, warn};

use crate::compartment::{
    baseline_svr, blood_viscosity, compartment_volumes, contractility, fluid_deficit_fraction,
    insensible_loss_ml_min, oncotic_pressure, preload_efficiency, renal_maturity,
};
use crate::error::{CoreError, CoreResult};
use crate::patient::{DiagnosisTag, PatientInput};
use crate::params::PhysiologicalParams;
use crate::warnings::Warnings;

/// Residual tolerance (dyn·s·cm⁻⁵) for [`svr_fixed_point`]'s non-convergence
/// warning. The iterate below this residual is accepted as converged; above
/// it, the final damped estimate is still used (see that function's doc
/// comment), just logged.
const SVR_CONVERGENCE_TOLERANCE: f64 = 1.0;

/// Diagnoses for which extreme tachypnea is attributed to an acidotic or
/// compensatory drive rather than pulmonary congestion, and therefore
/// should not by itself push the SVR solver into its high-CVP, wet-lung
/// regime.
fn is_dry_lung_diagnosis(diagnosis: DiagnosisTag) -> bool {
    !matches!(diagnosis, DiagnosisTag::UndifferentiatedShock)
}

/// Validates a raw bedside snapshot, builds [`PhysiologicalParams`], and
/// reports which inputs had to be estimated.
///
/// Fails with [`CoreError::InvalidInput`] when a field is out of its
/// physiologically plausible range or a cross-field check fails (e.g.
/// diastolic above systolic). Fails with [`CoreError::CriticalCondition`]
/// when the input itself describes a condition beyond calibration:
/// systolic BP < 40, SpO2 < 80, or hemoglobin < 4 g/dL.
pub fn build_params(input: PatientInput) -> CoreResult<(PhysiologicalParams, Warnings)> {
    validate(&input)?;

    let mut warnings = Warnings::default();
    let is_sam = input.is_sam();
    let is_septic = input.is_septic();

    let vols = compartment_volumes(&input);
    let eta = blood_viscosity(input.hematocrit_pct);
    let mut svr = baseline_svr(
        input.age_months,
        input.weight_kg,
        input.temperature_c,
        eta,
    );
    let contractility_val = contractility(&input);

    let oncotic = oncotic_pressure(input.albumin_g_dl, input.muac_cm, is_septic);
    warnings.albumin_estimated = oncotic.estimated;
    warnings.albumin_uncertainty_g_dl = oncotic.uncertainty_g_dl;

    let (sigma, k_f) = dengue_or_septic_capillary_params(&input);
    let interstitial_compliance = if is_sam {
        30.0
    } else if is_septic && input.spo2_pct < 90.0 {
        40.0
    } else {
        100.0
    };

    let mut afterload_sensitivity = if is_sam || input.temperature_c < 36.0 {
        0.5
    } else {
        0.2
    };

    let tissue_compliance_factor = if is_sam { 0.3 } else { 1.0 };
    let capillary_recruitment_base = if is_sam { 0.7 } else { 1.0 };
    let renal_maturity_factor = renal_maturity(input.age_months, input.hours_since_last_urine);
    let insensible = insensible_loss_ml_min(
        input.weight_kg,
        input.height_cm,
        input.temperature_c,
        input.respiratory_rate_bpm,
    );

    let target_map_mmhg = if input.age_months < 12.0 { 55.0 } else { 65.0 };
    let target_heart_rate_upper_limit = {
        let base = if input.age_months > 12.0 { 160.0 } else { 180.0 };
        let fever_buffer = 15.0 * (input.temperature_c - 37.5).max(0.0);
        (base + fever_buffer).min(220.0)
    };
    let target_respiratory_rate_limit = respiratory_rate_limit(&input);

    let optimal_preload_ml = {
        let base = vols.v_blood_l * 1000.0 * 1.15;
        if input.baseline_hepatomegaly {
            warnings.hepatomegaly_reduced_tolerance = true;
            base * 0.85
        } else {
            base
        }
    };

    // --- SVR back-solver ---
    let map_obs = match input.diastolic_bp_mmhg {
        Some(dbp) => dbp + (input.systolic_bp_mmhg - dbp) / 3.0,
        None => 0.65 * input.systolic_bp_mmhg,
    };

    let deficit = fluid_deficit_fraction(input.diagnosis, input.capillary_refill_s);
    // 1 kg body weight deficit ~= 1 L fluid lost (standard dehydration convention).
    let vol_loss_liters = input.weight_kg * deficit;
    let current_v_blood_est = (vols.v_blood_l - vol_loss_liters * 0.25).max(0.05);

    let mut assumed_cvp = if deficit > 0.0 { 2.0 } else { 5.0 };
    let is_hypoxic = if is_septic {
        input.spo2_pct < 85.0
    } else {
        input.spo2_pct < 90.0
    };
    let is_extreme_tachypnea = input.respiratory_rate_bpm > target_respiratory_rate_limit * 1.4
        && !is_dry_lung_diagnosis(input.diagnosis);

    if is_hypoxic || is_extreme_tachypnea {
        assumed_cvp = assumed_cvp.max(16.0);
        if is_hypoxic {
            warnings.hypoxic_ards_mode = true;
        } else {
            warnings.respiratory_distress_congestion_mode = true;
        }
    } else if input.baseline_hepatomegaly {
        assumed_cvp = assumed_cvp.max(8.0);
    }

    let preload_ratio = current_v_blood_est * 1000.0 / optimal_preload_ml.max(10.0);
    let preload_eff = preload_efficiency(preload_ratio, is_sam, contractility_val);
    let base_co = input.weight_kg * 0.15 * contractility_val * preload_eff;

    let (solved_svr, residual) =
        svr_fixed_point(svr, base_co, afterload_sensitivity, map_obs, assumed_cvp);
    svr = solved_svr;
    if residual > SVR_CONVERGENCE_TOLERANCE {
        warn!(
            "SVR solver did not converge (residual={:.2}); keeping final damped iterate {:.1}",
            residual, svr
        );
    }
    svr = svr.clamp(200.0, 20_000.0);
    if svr > 3000.0 {
        afterload_sensitivity /= 2.0;
    }
    debug!(
        "calibrated svr={:.1} dyn.s.cm-5, map_obs={:.1}, assumed_cvp={:.1}",
        svr, map_obs, assumed_cvp
    );

    if is_sam && !matches!(input.diagnosis, DiagnosisTag::SevereAcuteMalnutrition) {
        warnings.sam_shock_conflict = true;
    }
    if (input.hematocrit_pct - 3.0 * input.hemoglobin_g_dl).abs() > 15.0 {
        warnings.hct_hb_mismatch = true;
    }
    if input.platelets_per_ul.is_none() {
        warnings.platelets_unmeasured = true;
    }
    if input.lactate_mmol_l.is_none() {
        warnings.lactate_estimated = true;
    }
    if input.age_months < 1.0 {
        warnings.neonatal_colloid_caution = true;
    }

    let is_shock_physiology = matches!(
        input.diagnosis,
        DiagnosisTag::SepticShock
            | DiagnosisTag::DengueShock
            | DiagnosisTag::UndifferentiatedShock
    );

    let glucose_baseline = if input.age_months <= 12.0 { 0.15 } else { 0.12 };
    let glucose_utilization_mg_kg_min = if is_septic {
        glucose_baseline * 1.5
    } else {
        glucose_baseline
    };

    let params = PhysiologicalParams {
        v_blood_normal_l: vols.v_blood_l,
        v_inter_normal_l: vols.v_interstitial_l,
        cardiac_contractility: contractility_val,
        max_cardiac_output_l_min: input.weight_kg * 0.15 * 1.5,
        optimal_preload_ml,
        afterload_sensitivity,
        heart_stiffness_k: 1.0,
        svr_resistance: svr,
        capillary_filtration_k: k_f,
        reflection_coefficient_sigma: sigma,
        plasma_oncotic_pressure_mmhg: oncotic.pressure_mmhg,
        baseline_capillary_pressure_mmhg: baseline_capillary_pressure(input.capillary_refill_s),
        blood_viscosity_eta: eta,
        tissue_compliance_factor,
        interstitial_compliance_ml_mmhg: interstitial_compliance,
        capillary_recruitment_base,
        renal_maturity_factor,
        target_map_mmhg,
        target_cvp_mmhg: assumed_cvp,
        target_heart_rate_upper_limit,
        target_respiratory_rate_limit,
        glucose_utilization_mg_kg_min,
        intracellular_sodium_bias: if is_sam { 1.2 } else { 1.0 },
        osmotic_conductance_k: 1.0,
        insensible_loss_ml_min: insensible,
        lymphatic_drainage_capacity_ml_min: input.weight_kg * 0.15,
        venous_compliance_ml_mmhg: input.weight_kg * 15.0,
        is_sam,
        final_starting_blood_volume_l: current_v_blood_est,
        albumin_uncertainty_g_dl: oncotic.uncertainty_g_dl,
        weight_kg: input.weight_kg,
        is_shock_physiology,
        hepatic_dysfunction: is_septic,
        baseline_hematocrit_pct: 3.0 * input.hemoglobin_g_dl,
        baseline_glucose_mg_dl: input
            .glucose_mg_dl
            .unwrap_or(if is_septic { 65.0 } else { 90.0 }),
    };

    Ok((params, warnings))
}

/// Damped midpoint fixed-point iteration for the SVR back-solver (§4.3).
/// 15 iterations, each averaging the current estimate with the value the
/// afterload-adjusted Frank-Starling cardiac output requires to hit
/// `map_obs` at `assumed_cvp`. Convergence is not proven (the spec's own
/// design notes flag this), and in practice the iterate is still climbing
/// geometrically toward its saturation point after 15 steps for many
/// patients. The original (`core_physics.py`'s `final_svr = max(200,
/// min(current_guess_svr, 20000))`) keeps that diverged iterate rather than
/// discarding it, so this does too: the return value is always the final
/// damped estimate (pre-clamp), along with the last residual so the caller
/// can log a non-convergence warning without throwing the iterate away.
fn svr_fixed_point(
    mut svr: f64,
    base_co: f64,
    afterload_sensitivity: f64,
    map_obs: f64,
    assumed_cvp: f64,
) -> (f64, f64) {
    let mut residual = f64::INFINITY;
    for _ in 0..15 {
        let normalized = svr / 1000.0;
        let denom = 1.0 + (normalized - 1.0) * afterload_sensitivity;
        let afterload_factor = (1.0 / denom.max(0.1)).max(0.3);
        let effective_co = base_co * afterload_factor;
        let required_svr = ((map_obs - assumed_cvp) * 80.0) / effective_co.max(0.01);
        residual = (required_svr - svr).abs();
        svr = (svr + required_svr) / 2.0;
    }
    (svr, residual)
}

/// Reflection coefficient (`sigma`) and capillary filtration coefficient
/// (`k_f`) for the Starling flux, keyed on dengue illness day and sepsis.
fn dengue_or_septic_capillary_params(input: &PatientInput) -> (f64, f64) {
    if input.is_septic() {
        return (0.35, 0.035);
    }
    if input.is_dengue() {
        let day = input.illness_day.unwrap_or(1);
        return if day <= 3 {
            (0.9, 0.01)
        } else if day <= 6 {
            (0.3, 0.025)
        } else {
            (0.7, 0.025)
        };
    }
    (0.9, 0.01)
}

/// Baseline hydrostatic capillary pressure (mmHg), from capillary refill
/// time: a longer refill implies a more contracted, lower-pressure
/// capillary bed at baseline.
fn baseline_capillary_pressure(capillary_refill_s: f64) -> f64 {
    if capillary_refill_s > 4.0 {
        15.0
    } else if capillary_refill_s > 2.0 {
        20.0
    } else {
        25.0
    }
}

/// WHO-style severe-tachypnea threshold by age, adjusted toward the
/// patient's own baseline when it already exceeds the severe cutoff.
fn respiratory_rate_limit(input: &PatientInput) -> f64 {
    let severe = if input.age_months < 2.0 {
        60.0
    } else if input.age_months < 12.0 {
        50.0
    } else if input.age_months < 60.0 {
        40.0
    } else {
        30.0
    };
    if input.respiratory_rate_bpm > severe {
        input.respiratory_rate_bpm * 1.15
    } else {
        severe + 10.0
    }
}

fn validate(input: &PatientInput) -> CoreResult<()> {
    if !(input.weight_kg > 0.0 && input.weight_kg <= 150.0) {
        return Err(CoreError::InvalidInput("weight_kg out of range".into()));
    }
    if !(0.0..=216.0).contains(&input.age_months) {
        return Err(CoreError::InvalidInput("age_months out of range".into()));
    }
    if !(5.0..=25.0).contains(&input.muac_cm) {
        return Err(CoreError::InvalidInput("muac_cm out of range".into()));
    }
    if !(25.0..=43.0).contains(&input.temperature_c) {
        return Err(CoreError::InvalidInput("temperature_c out of range".into()));
    }
    if !(input.heart_rate_bpm > 0.0 && input.heart_rate_bpm <= 300.0) {
        return Err(CoreError::InvalidInput("heart_rate_bpm out of range".into()));
    }
    if !(0.0..=15.0).contains(&input.capillary_refill_s) {
        return Err(CoreError::InvalidInput(
            "capillary_refill_s out of range".into(),
        ));
    }
    if !(0.0..=100.0).contains(&input.spo2_pct) {
        return Err(CoreError::InvalidInput("spo2_pct out of range".into()));
    }
    if !(input.respiratory_rate_bpm > 0.0 && input.respiratory_rate_bpm <= 120.0) {
        return Err(CoreError::InvalidInput(
            "respiratory_rate_bpm out of range".into(),
        ));
    }
    if !(input.hematocrit_pct > 0.0 && input.hematocrit_pct <= 80.0) {
        return Err(CoreError::InvalidInput("hematocrit_pct out of range".into()));
    }
    if let Some(dbp) = input.diastolic_bp_mmhg {
        if dbp >= input.systolic_bp_mmhg {
            return Err(CoreError::InvalidInput(
                "diastolic_bp_mmhg must be below systolic".into(),
            ));
        }
    }
    if let Some(na) = input.sodium_meq_l {
        if !(100.0..=200.0).contains(&na) {
            return Err(CoreError::InvalidInput("sodium_meq_l out of range".into()));
        }
    }
    if let Some(glucose) = input.glucose_mg_dl {
        if !(10.0..=1000.0).contains(&glucose) {
            return Err(CoreError::InvalidInput("glucose_mg_dl out of range".into()));
        }
    }
    if input.hours_since_last_urine < 0.0 {
        return Err(CoreError::InvalidInput(
            "hours_since_last_urine cannot be negative".into(),
        ));
    }
    if input.iv_set.0 == 0 {
        return Err(CoreError::InvalidInput("iv_set must be positive".into()));
    }

    if input.systolic_bp_mmhg < 40.0 {
        return Err(CoreError::CriticalCondition(
            "systolic BP below 40 mmHg is beyond calibration".into(),
        ));
    }
    if input.spo2_pct < 80.0 {
        return Err(CoreError::CriticalCondition(
            "SpO2 below 80% is beyond calibration".into(),
        ));
    }
    if input.hemoglobin_g_dl < 4.0 {
        return Err(CoreError::CriticalCondition(
            "hemoglobin below 4 g/dL is beyond calibration".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::{IvSet, OngoingLossSeverity, Sex};

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

    #[test]
    fn builds_params_for_a_plausible_patient() {
        let (params, warnings) = build_params(base_input()).unwrap();
        assert!(params.svr_resistance >= 200.0 && params.svr_resistance <= 20_000.0);
        assert!(params.cardiac_contractility > 0.0);
        assert!(!warnings.albumin_estimated);
    }

    #[test]
    fn rejects_impossible_weight() {
        let mut input = base_input();
        input.weight_kg = -1.0;
        assert!(build_params(input).is_err());
    }

    #[test]
    fn critical_condition_on_profound_hypotension() {
        let mut input = base_input();
        input.systolic_bp_mmhg = 30.0;
        let err = build_params(input).unwrap_err();
        assert!(matches!(err, CoreError::CriticalCondition(_)));
    }

    #[test]
    fn sam_patient_gets_stiff_interstitial_compliance() {
        let mut input = base_input();
        input.muac_cm = 10.0;
        let (params, _) = build_params(input).unwrap();
        assert_eq!(params.interstitial_compliance_ml_mmhg, 30.0);
        assert_eq!(params.tissue_compliance_factor, 0.3);
    }

    #[test]
    fn septic_patient_gets_leaky_capillaries() {
        let mut input = base_input();
        input.diagnosis = DiagnosisTag::SepticShock;
        let (params, _) = build_params(input).unwrap();
        assert_eq!(params.reflection_coefficient_sigma, 0.35);
        assert_eq!(params.capillary_filtration_k, 0.035);
    }

    #[test]
    fn dengue_day5_is_leakier_than_day2() {
        let mut day2 = base_input();
        day2.diagnosis = DiagnosisTag::DengueShock;
        day2.illness_day = Some(2);
        let mut day5 = base_input();
        day5.diagnosis = DiagnosisTag::DengueShock;
        day5.illness_day = Some(5);

        let (p2, _) = build_params(day2).unwrap();
        let (p5, _) = build_params(day5).unwrap();
        assert!(p5.reflection_coefficient_sigma < p2.reflection_coefficient_sigma);
        assert!(p5.capillary_filtration_k > p2.capillary_filtration_k);
    }
}
