//! Compartment & Hemodynamics Calculator: pure, deterministic derivations
//! from patient inputs that feed the Parameter Calibrator.

use crate::patient::{DiagnosisTag, PatientInput};

/// Body-water compartment sizes in liters, before any calibration-time
/// adjustment for fluid deficit.
#[derive(Debug, Clone, Copy)]
pub struct CompartmentVolumes {
    pub v_blood_l: f64,
    pub v_interstitial_l: f64,
    pub v_intracellular_l: f64,
}

/// Age-banded total-body-water and extracellular-fluid fractions, before
/// the SAM offset.
fn tbw_ecf_fractions(age_months: f64) -> (f64, f64) {
    if age_months < 1.0 {
        (0.80, 0.45)
    } else if age_months < 12.0 {
        (0.70, 0.30)
    } else {
        (0.60, 0.25)
    }
}

/// Computes the three body-water compartment sizes from weight, age, and
/// SAM status. ECF splits 1:3 into blood (plasma fraction 0.25) and
/// interstitium.
pub fn compartment_volumes(input: &PatientInput) -> CompartmentVolumes {
    let (mut tbw_ratio, mut ecf_ratio) = tbw_ecf_fractions(input.age_months);
    if input.is_sam() {
        tbw_ratio += 0.05;
        ecf_ratio += 0.05;
    }
    let icf_ratio = (tbw_ratio - ecf_ratio).max(0.30);

    let v_intracellular_l = input.weight_kg * icf_ratio;
    let ecf_total_l = input.weight_kg * ecf_ratio;
    let plasma_fraction = 0.25;
    let v_blood_l = ecf_total_l * plasma_fraction;
    let v_interstitial_l = ecf_total_l * (1.0 - plasma_fraction);

    CompartmentVolumes {
        v_blood_l,
        v_interstitial_l,
        v_intracellular_l,
    }
}

/// Blood viscosity relative to water, from hematocrit. Clamped to `[0.8,
/// 3.0]` to keep the SVR and CO terms that multiply by it from blowing up
/// in severe anemia or polycythemia.
pub fn blood_viscosity(hematocrit_pct: f64) -> f64 {
    let eta = if hematocrit_pct >= 20.0 {
        (hematocrit_pct / 45.0).powf(2.5)
    } else {
        1.5 + 0.05 * hematocrit_pct
    };
    eta.clamp(0.8, 3.0)
}

/// Baseline systemic vascular resistance (dyn·s·cm⁻⁵) before calibration
/// against the observed MAP.
pub fn baseline_svr(age_months: f64, weight_kg: f64, temperature_c: f64, eta: f64) -> f64 {
    let base = if age_months < 1.0 {
        1800.0
    } else if age_months < 12.0 {
        1400.0
    } else {
        1000.0
    };
    let size_correction = (10.0 / weight_kg).sqrt();
    let temp_factor = if temperature_c < 36.0 {
        1.5
    } else if temperature_c > 38.5 {
        0.8
    } else {
        1.0
    };
    base * size_correction * eta * temp_factor
}

/// Fraction of normal blood volume assumed lost to the patient's
/// presenting condition, used both to discount cardiac contractility's
/// compensation boost and to seed the SVR solver's estimate of current
/// blood volume.
pub fn fluid_deficit_fraction(diagnosis: DiagnosisTag, capillary_refill_s: f64) -> f64 {
    match diagnosis {
        DiagnosisTag::SevereDehydration => {
            if capillary_refill_s > 4.0 {
                0.15
            } else {
                0.10
            }
        }
        DiagnosisTag::SevereAcuteMalnutrition => 0.08,
        _ => 0.0,
    }
}

/// Baseline cardiac contractility in `[0, 1.5]`, before the per-step
/// Frank-Starling and afterload modulation applied by the simulator.
pub fn contractility(input: &PatientInput) -> f64 {
    let mut c = 1.0;
    let is_sam = input.is_sam();
    if is_sam {
        c *= 0.9;
    }
    if input.is_septic() {
        c *= 0.7;
    }

    let deficit = fluid_deficit_fraction(input.diagnosis, input.capillary_refill_s);
    if deficit >= 0.10 {
        let boost = if is_sam { 1.05 } else { 1.4 };
        c *= boost;
    } else if is_sam && deficit > 0.0 {
        // SAM patients still compensate, just less aggressively than the
        // 1.4x boost given to a non-malnourished child at the same deficit.
        c *= 1.05;
    }

    if let Some(platelets) = input.platelets_per_ul {
        if platelets < 20_000.0 {
            c *= 0.5;
        }
    }

    c.clamp(0.0, 1.5)
}

/// Renal maturity factor in `[0, 1]`: linear ramp from 0.3 at birth to 1.0
/// at 24 months, then flat; scaled down further by documented oliguria.
pub fn renal_maturity(age_months: f64, hours_since_last_urine: f64) -> f64 {
    let maturity = (0.3 + 0.029 * age_months).min(1.0);
    if hours_since_last_urine > 6.0 {
        maturity * 0.1
    } else if hours_since_last_urine > 4.0 {
        maturity * 0.5
    } else {
        maturity
    }
}

/// Body surface area in m^2, via Mosteller when height is known, else the
/// weight-only approximation.
pub fn body_surface_area_m2(weight_kg: f64, height_cm: Option<f64>) -> f64 {
    match height_cm {
        Some(h) => ((weight_kg * h) / 3600.0).sqrt(),
        None => (4.0 * weight_kg + 7.0) / (weight_kg + 90.0),
    }
}

/// Insensible fluid loss, in ml/min, from body surface area, fever, and
/// tachypnea.
pub fn insensible_loss_ml_min(
    weight_kg: f64,
    height_cm: Option<f64>,
    temperature_c: f64,
    respiratory_rate_bpm: f64,
) -> f64 {
    let bsa = body_surface_area_m2(weight_kg, height_cm);
    let mut loss_ml_day = 400.0 * bsa;
    if temperature_c > 38.0 {
        loss_ml_day *= 1.0 + 0.12 * (temperature_c - 38.0);
    }
    if respiratory_rate_bpm > 50.0 {
        loss_ml_day *= 1.10;
    }
    loss_ml_day / 1440.0
}

/// Plasma oncotic pressure (mmHg) from albumin, and the albumin value used
/// to compute it (measured, or estimated from MUAC with an uncertainty
/// band when not measured).
pub struct OncoticResult {
    pub pressure_mmhg: f64,
    pub albumin_g_dl: f64,
    pub estimated: bool,
    pub uncertainty_g_dl: Option<f64>,
}

/// `π = 2.1A + 0.16A^2 + 0.009A^3`. When albumin was not measured, it is
/// estimated from MUAC (SAM → 2.5 g/dL, well-nourished → 4.0 g/dL, linear
/// between), reduced 15% (capped at 3.5) for septic shock, and tagged with
/// an uncertainty of 0.8 g/dL.
pub fn oncotic_pressure(albumin_g_dl: Option<f64>, muac_cm: f64, is_septic: bool) -> OncoticResult {
    let (albumin, estimated, uncertainty) = match albumin_g_dl {
        Some(a) => (a, false, None),
        None => {
            let interp = if muac_cm <= 11.5 {
                2.5
            } else if muac_cm >= 12.5 {
                4.0
            } else {
                2.5 + (muac_cm - 11.5) * (4.0 - 2.5)
            };
            let adjusted = if is_septic {
                (interp * 0.85).min(3.5)
            } else {
                interp
            };
            (adjusted, true, Some(0.8))
        }
    };
    let a = albumin;
    let pressure = 2.1 * a + 0.16 * a * a + 0.009 * a * a * a;
    OncoticResult {
        pressure_mmhg: pressure,
        albumin_g_dl: albumin,
        estimated,
        uncertainty_g_dl: uncertainty,
    }
}

/// Frank-Starling preload efficiency curve, shared by the SVR solver (which
/// needs a steady-state estimate before any state exists) and the
/// minute-stepper (which evaluates it every step on the live state). Both
/// callers use this single definition so the calibrator's estimate of
/// cardiac output is consistent with what the simulator will compute at
/// T=0.
pub fn preload_efficiency(ratio: f64, is_sam: bool, contractility: f64) -> f64 {
    if ratio <= 1.0 {
        if ratio < 0.8 && !is_sam {
            ratio * (1.0 + (0.8 - ratio) * 0.3 * contractility)
        } else {
            ratio
        }
    } else if ratio <= 1.3 {
        1.0
    } else {
        (1.0 - (ratio - 1.3) * 0.3).max(0.85)
    }
}
