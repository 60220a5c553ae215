//! The six literal clinical scenarios a complete engine must reproduce.

mod common;

use common::base_input;
use pedsim_core::{build_params, init_state, run, DiagnosisTag, FluidTag};

#[test_log::test]
fn dengue_leak_exceeds_control_by_at_least_double() {
    let mut dengue = base_input();
    dengue.muac_cm = 14.0;
    dengue.hemoglobin_g_dl = 10.0;
    dengue.systolic_bp_mmhg = 80.0;
    dengue.heart_rate_bpm = 140.0;
    dengue.diagnosis = DiagnosisTag::DengueShock;
    dengue.illness_day = Some(5);

    let control = base_input();

    let (dengue_params, _) = build_params(dengue).unwrap();
    let dengue_initial = init_state(&dengue, &dengue_params).unwrap();
    let dengue_outcome = run(dengue_initial, &dengue_params, FluidTag::RL, 200.0, 60.0, false);

    let (control_params, _) = build_params(control).unwrap();
    let control_initial = init_state(&control, &control_params).unwrap();
    let control_outcome = run(control_initial, &control_params, FluidTag::RL, 200.0, 60.0, false);

    assert!(
        dengue_outcome.leak_fraction >= 2.0 * control_outcome.leak_fraction,
        "dengue leak_fraction={:.3} control leak_fraction={:.3}",
        dengue_outcome.leak_fraction,
        control_outcome.leak_fraction
    );
}

#[test_log::test]
fn dka_glucose_falls_with_saline_and_rises_with_dextrose() {
    let mut input = base_input();
    input.glucose_mg_dl = Some(400.0);

    let (params, _) = build_params(input).unwrap();
    let initial = init_state(&input, &params).unwrap();

    let saline_outcome = run(initial, &params, FluidTag::NS, 200.0, 60.0, false);
    assert!(saline_outcome.final_state.glucose_mg_dl < 400.0);

    let dextrose_outcome = run(initial, &params, FluidTag::D5NS, 200.0, 60.0, false);
    assert!(dextrose_outcome.final_state.glucose_mg_dl > 450.0);
}

#[test_log::test]
fn cerebral_risk_half_ns_in_hyponatremic_septic_patient_shifts_free_water_into_cells() {
    let mut input = base_input();
    input.sodium_meq_l = Some(125.0);
    input.diagnosis = DiagnosisTag::SepticShock;

    let (params, _) = build_params(input).unwrap();
    let initial = init_state(&input, &params).unwrap();
    let outcome = run(initial, &params, FluidTag::HalfNS, 200.0, 60.0, false);

    let delta_icf_ml = (outcome.final_state.v_intracellular_l - initial.v_intracellular_l) * 1000.0;
    assert!(
        delta_icf_ml >= 5.0,
        "delta_icf_ml={:.2}, expected >= 5.0",
        delta_icf_ml
    );
}

#[test_log::test]
fn starling_plateau_second_bolus_raises_map_less_than_the_first() {
    let mut input = base_input();
    input.diagnosis = DiagnosisTag::SepticShock;

    let (params, _) = build_params(input).unwrap();
    let initial = init_state(&input, &params).unwrap();

    let first = run(initial, &params, FluidTag::RL, 100.0, 30.0, false);
    let first_rise = first.final_state.map_mmhg - initial.map_mmhg;

    let second = run(first.final_state, &params, FluidTag::RL, 100.0, 30.0, false);
    let second_rise = second.final_state.map_mmhg - first.final_state.map_mmhg;

    assert!(
        second_rise < first_rise,
        "first_rise={:.2} second_rise={:.2}",
        first_rise,
        second_rise
    );
}

#[test_log::test]
fn anuric_septic_patient_stays_anuric_through_a_saline_bolus() {
    let mut input = base_input();
    input.diagnosis = DiagnosisTag::SepticShock;
    input.hours_since_last_urine = 12.0;

    let (params, _) = build_params(input).unwrap();
    let initial = init_state(&input, &params).unwrap();
    let outcome = run(initial, &params, FluidTag::NS, 200.0, 60.0, false);

    assert!(
        outcome.final_state.q_urine_ml_min < 0.05,
        "q_urine_ml_min={:.4}",
        outcome.final_state.q_urine_ml_min
    );
}

#[test_log::test]
fn sam_twin_develops_more_interstitial_congestion_than_her_well_nourished_sister() {
    let mut sam = base_input();
    sam.muac_cm = 10.5;
    let mut control = base_input();
    control.muac_cm = 15.0;

    let (sam_params, _) = build_params(sam).unwrap();
    let sam_initial = init_state(&sam, &sam_params).unwrap();
    let sam_outcome = run(
        sam_initial,
        &sam_params,
        FluidTag::RL,
        20.0 * sam.weight_kg,
        20.0,
        false,
    );

    let (control_params, _) = build_params(control).unwrap();
    let control_initial = init_state(&control, &control_params).unwrap();
    let control_outcome = run(
        control_initial,
        &control_params,
        FluidTag::RL,
        20.0 * control.weight_kg,
        20.0,
        false,
    );

    assert!(
        sam_outcome.final_state.p_interstitial_mmhg > control_outcome.final_state.p_interstitial_mmhg,
        "sam p_interstitial={:.2} control p_interstitial={:.2}",
        sam_outcome.final_state.p_interstitial_mmhg,
        control_outcome.final_state.p_interstitial_mmhg
    );
}
