//! Runs one clinical scenario through the full pipeline and charts MAP,
//! CVP, and lung water (interstitial volume) against time, mirroring the
//! plotters-based trajectory charting `mortalsim-test-harness` uses to
//! visualize ODE runs.
//!
//! Run with `cargo run --example trajectory_plot`.

use pedsim_core::{
    build_params, init_state, DiagnosisTag, FluidTag, IvSet, OngoingLossSeverity, PatientInput,
    Sex,
};
use plotters::chart::{ChartBuilder, LabelAreaPosition};
use plotters::prelude::{BitMapBackend, IntoDrawingArea};
use plotters::series::LineSeries;
use plotters::style::full_palette::PURPLE;
use plotters::style::{IntoFont, BLUE, RED, WHITE};

fn scenario() -> PatientInput {
    // A six-month-old with septic shock: the scenario most likely to show a
    // visible capillary leak and a sluggish MAP response to bolus.
    PatientInput {
        age_months: 6.0,
        weight_kg: 7.0,
        sex: Sex::Male,
        height_cm: None,
        muac_cm: 13.0,
        temperature_c: 38.9,
        hemoglobin_g_dl: 10.5,
        systolic_bp_mmhg: 68.0,
        diastolic_bp_mmhg: Some(40.0),
        heart_rate_bpm: 168.0,
        capillary_refill_s: 4.0,
        spo2_pct: 94.0,
        respiratory_rate_bpm: 44.0,
        sodium_meq_l: Some(133.0),
        glucose_mg_dl: Some(72.0),
        hematocrit_pct: 31.0,
        albumin_g_dl: Some(2.8),
        lactate_mmol_l: Some(4.2),
        platelets_per_ul: Some(140_000.0),
        diagnosis: DiagnosisTag::SepticShock,
        illness_day: Some(2),
        ongoing_losses: OngoingLossSeverity::None,
        baseline_hepatomegaly: false,
        hours_since_last_urine: 3.0,
        iv_set: IvSet(60),
    }
}

fn main() {
    simple_logger::SimpleLogger::new().init().expect("logger init");

    let input = scenario();
    let (params, warnings) = build_params(input).expect("valid scenario input");
    log::info!("calibration warnings: {:?}", warnings);

    let initial = init_state(&input, &params).expect("valid initial state");
    let outcome = pedsim_core::run(initial, &params, FluidTag::RL, 140.0, 20.0, true);

    log::info!(
        "run complete: aborted={} map_rise={:.1} mmHg leak_fraction={:.2}",
        outcome.aborted,
        outcome.map_rise_mmhg,
        outcome.leak_fraction
    );
    log::info!("triggers: {:?}", outcome.triggers);
    log::info!("final alerts: {:?}", outcome.alerts);

    let filepath = "trajectory.png";
    let root_area = BitMapBackend::new(filepath, (1280, 720)).into_drawing_area();
    root_area.fill(&WHITE).unwrap();

    let x_end = outcome
        .trajectory
        .last()
        .map(|p| p.t_minutes)
        .unwrap_or(1.0);
    let y_min = 0.0;
    let y_max = outcome
        .trajectory
        .iter()
        .map(|p| p.map_mmhg.max(p.cvp_mmhg).max(p.lung_water_l * 10.0))
        .fold(f64::MIN, f64::max)
        .max(10.0);

    let mut ctx = ChartBuilder::on(&root_area)
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 40)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .caption("Septic shock bolus trajectory", ("sans-serif", 30))
        .build_cartesian_2d(0.0..x_end, y_min..y_max)
        .unwrap();

    ctx.configure_mesh()
        .x_desc("minutes")
        .axis_desc_style(("sans-serif", 20).into_font())
        .draw()
        .unwrap();

    // Red: MAP, blue: CVP, purple: lung water (interstitial volume, scaled
    // x10 so it shares the MAP/CVP axis instead of needing a second scale).
    let map_series = outcome
        .trajectory
        .iter()
        .map(|p| (p.t_minutes, p.map_mmhg));
    ctx.draw_series(LineSeries::new(map_series, RED))
        .expect("draw MAP series");

    let cvp_series = outcome
        .trajectory
        .iter()
        .map(|p| (p.t_minutes, p.cvp_mmhg));
    ctx.draw_series(LineSeries::new(cvp_series, BLUE))
        .expect("draw CVP series");

    let lung_water_series = outcome
        .trajectory
        .iter()
        .map(|p| (p.t_minutes, p.lung_water_l * 10.0));
    ctx.draw_series(LineSeries::new(lung_water_series, PURPLE))
        .expect("draw lung water series");

    root_area.present().expect("write trajectory.png");
    println!("wrote {filepath}");
}
