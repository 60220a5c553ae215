//! Universal properties from §3/§8: the state invariants, mass conservation,
//! hematocrit/hemoglobin monotonicity, and the Starling-plateau MAP shape
//! must hold for every valid patient, not just the hand-picked scenarios.

mod common;

use common::base_input;
use pedsim_core::{build_params, init_state, run, step, DiagnosisTag, FluidTag, PatientInput};
use rand::Rng;

fn assert_invariants(state: &pedsim_core::SimulationState, params: &pedsim_core::PhysiologicalParams) {
    assert!(state.v_blood_l >= 0.4 * params.v_blood_normal_l - 1e-9);
    assert!(state.v_interstitial_l >= 0.1 - 1e-9);
    assert!(state.v_intracellular_l >= 0.1 - 1e-9);
    assert!((30.0..=160.0).contains(&state.map_mmhg));
    assert!((1.0..=25.0).contains(&state.cvp_mmhg));
    assert!(state.p_interstitial_mmhg >= -2.0 - 1e-9);
    assert!((110.0..=180.0).contains(&state.sodium_meq_l));
    assert!((1.5..=9.0).contains(&state.potassium_meq_l));
    assert!((10.0..=800.0).contains(&state.glucose_mg_dl));
    assert!((5.0..=70.0).contains(&state.hematocrit_pct));
    assert!((0.1..=25.0).contains(&state.lactate_mmol_l));
}

/// Draws a random-but-plausible patient within `build_params`'s own
/// validated ranges (`src/calibrate.rs::validate`), so every draw is
/// guaranteed to calibrate successfully.
fn random_patient(rng: &mut impl Rng) -> PatientInput {
    let mut input = base_input();
    input.age_months = rng.gen_range(1.0..180.0);
    input.weight_kg = rng.gen_range(3.0..60.0);
    input.muac_cm = rng.gen_range(8.0..18.0);
    input.temperature_c = rng.gen_range(35.0..40.5);
    input.hemoglobin_g_dl = rng.gen_range(6.0..14.0);
    input.hematocrit_pct = 3.0 * input.hemoglobin_g_dl;
    input.systolic_bp_mmhg = rng.gen_range(60.0..120.0);
    input.diastolic_bp_mmhg = Some((input.systolic_bp_mmhg - rng.gen_range(20.0..50.0)).max(20.0));
    input.heart_rate_bpm = rng.gen_range(80.0..200.0);
    input.capillary_refill_s = rng.gen_range(1.0..6.0);
    input.spo2_pct = rng.gen_range(85.0..100.0);
    input.respiratory_rate_bpm = rng.gen_range(16.0..60.0);
    input.sodium_meq_l = Some(rng.gen_range(120.0..150.0));
    input.glucose_mg_dl = Some(rng.gen_range(40.0..300.0));
    input.hours_since_last_urine = rng.gen_range(0.0..10.0);
    input.diagnosis = match rng.gen_range(0..5) {
        0 => DiagnosisTag::SevereDehydration,
        1 => DiagnosisTag::SepticShock,
        2 => DiagnosisTag::DengueShock,
        3 => DiagnosisTag::SevereAcuteMalnutrition,
        _ => DiagnosisTag::UndifferentiatedShock,
    };
    if input.diagnosis == DiagnosisTag::DengueShock {
        input.illness_day = Some(rng.gen_range(1..10));
    }
    input
}

#[test_log::test]
fn random_patients_hold_every_invariant_through_a_bolus() {
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let input = random_patient(&mut rng);
        let Ok((params, _)) = build_params(input) else {
            continue;
        };
        let Ok(initial) = init_state(&input, &params) else {
            continue;
        };
        if initial.p_interstitial_mmhg >= 4.0 {
            continue;
        }
        let outcome = run(initial, &params, FluidTag::RL, 20.0 * input.weight_kg, 30.0, true);
        for point_state in &outcome.trajectory {
            assert!((30.0..=160.0).contains(&point_state.map_mmhg));
            assert!((1.0..=25.0).contains(&point_state.cvp_mmhg));
        }
        assert_invariants(&outcome.final_state, &params);
    }
}

#[test_log::test]
fn mass_conservation_holds_to_a_tight_tolerance_over_many_steps() {
    let input = base_input();
    let (params, _) = build_params(input).unwrap();
    let mut state = init_state(&input, &params).unwrap();

    for _ in 0..60 {
        let rate_ml_min = 300.0 / 60.0;
        let next = step(&state, &params, 300.0, FluidTag::RL, 1.0);
        let expected_delta_l = (rate_ml_min
            - next.q_urine_ml_min
            - next.q_insensible_loss_ml_min
            - next.q_ongoing_loss_ml_min)
            / 1000.0;
        let actual_delta_l = (next.v_blood_l + next.v_interstitial_l + next.v_intracellular_l)
            - (state.v_blood_l + state.v_interstitial_l + state.v_intracellular_l);
        assert!(
            (actual_delta_l - expected_delta_l).abs() < 1e-4,
            "t={:.0}: expected_delta_l={:.6} actual_delta_l={:.6}",
            state.t_minutes,
            expected_delta_l,
            actual_delta_l
        );
        state = next;
    }
}

#[test_log::test]
fn crystalloid_monotonically_dilutes_hematocrit() {
    let input = base_input();
    let (params, _) = build_params(input).unwrap();
    let mut state = init_state(&input, &params).unwrap();

    let mut last_hct = state.hematocrit_pct;
    for _ in 0..30 {
        state = step(&state, &params, 400.0, FluidTag::NS, 1.0);
        assert!(state.hematocrit_pct <= last_hct + 1e-9);
        last_hct = state.hematocrit_pct;
    }
}

#[test_log::test]
fn prbc_monotonically_raises_hemoglobin_mass() {
    let input = base_input();
    let (params, _) = build_params(input).unwrap();
    let mut state = init_state(&input, &params).unwrap();

    let mut last_mass = state.hemoglobin_g_dl * state.v_blood_l;
    for _ in 0..20 {
        state = step(&state, &params, 200.0, FluidTag::Prbc, 1.0);
        let mass = state.hemoglobin_g_dl * state.v_blood_l;
        assert!(mass >= last_mass - 1e-9);
        last_mass = mass;
    }
}

#[test_log::test]
fn map_rises_into_an_empty_heart_until_preload_crosses_optimum() {
    let mut input = base_input();
    input.diagnosis = DiagnosisTag::SepticShock;
    input.capillary_refill_s = 5.0;
    let (params, _) = build_params(input).unwrap();
    let mut state = init_state(&input, &params).unwrap();

    let mut last_map = state.map_mmhg;
    for _ in 0..90 {
        let preload_ratio = state.v_blood_l * 1000.0 / params.optimal_preload_ml.max(10.0);
        let next = step(&state, &params, 600.0, FluidTag::RL, 1.0);
        if preload_ratio < 0.8 {
            assert!(
                next.map_mmhg >= last_map - 1e-6,
                "MAP dropped while preload_ratio={:.2} < 0.8",
                preload_ratio
            );
        }
        last_map = next.map_mmhg;
        state = next;
    }
}

#[test_log::test]
fn identical_inputs_produce_bit_for_bit_identical_trajectories() {
    let input = base_input();
    let (params, _) = build_params(input).unwrap();
    let initial = init_state(&input, &params).unwrap();

    let first = run(initial, &params, FluidTag::RL, 200.0, 60.0, true);
    let second = run(initial, &params, FluidTag::RL, 200.0, 60.0, true);

    assert_eq!(first.trajectory.len(), second.trajectory.len());
    for (a, b) in first.trajectory.iter().zip(second.trajectory.iter()) {
        assert_eq!(a.map_mmhg.to_bits(), b.map_mmhg.to_bits());
        assert_eq!(a.cvp_mmhg.to_bits(), b.cvp_mmhg.to_bits());
        assert_eq!(a.glucose_mg_dl.to_bits(), b.glucose_mg_dl.to_bits());
    }
}
