use pedsim_core::{DiagnosisTag, IvSet, OngoingLossSeverity, PatientInput, Sex};

/// A plausible 24-month, 10 kg patient with no complicating diagnosis.
/// Individual scenario/regime tests override the fields they care about.
pub fn base_input() -> PatientInput {
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
