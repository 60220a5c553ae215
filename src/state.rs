//! The time-varying state vector and its time-stamped trajectory snapshots.

use serde::{Deserialize, Serialize};

/// Full simulation state at a single point in time.
///
/// Produced at T=0 by [`crate::init_state`], then advanced by
/// [`crate::step`]; every step returns a brand-new value rather than
/// mutating this one in place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationState {
    pub t_minutes: f64,

    // Volumes
    pub v_blood_l: f64,
    pub v_interstitial_l: f64,
    pub v_intracellular_l: f64,

    // Pressures
    pub map_mmhg: f64,
    pub cvp_mmhg: f64,
    pub pcwp_mmhg: f64,
    pub p_interstitial_mmhg: f64,

    // Instantaneous fluxes from the last step
    pub q_infusion_ml_min: f64,
    pub q_leak_ml_min: f64,
    pub q_urine_ml_min: f64,
    pub q_lymph_ml_min: f64,
    pub q_osmotic_ml_min: f64,

    // Metabolites
    pub sodium_meq_l: f64,
    pub potassium_meq_l: f64,
    pub glucose_mg_dl: f64,
    pub hemoglobin_g_dl: f64,
    pub hematocrit_pct: f64,
    pub lactate_mmol_l: f64,

    // Loss rates
    pub q_ongoing_loss_ml_min: f64,
    pub q_insensible_loss_ml_min: f64,

    // Integrators
    pub total_infused_ml: f64,
    pub total_sodium_load_meq: f64,

    // Bolus counters
    pub bolus_count: u32,
    pub minutes_since_last_bolus: f64,

    /// Patient weight at this instant. Tracked on the state (rather than
    /// read only from params) so that a future weight-changing term (not
    /// modeled today) would have somewhere to write; today it is simply
    /// carried forward unchanged from `params.weight_kg`.
    pub weight_kg: f64,

    /// Set when a step would otherwise have violated an invariant; the
    /// offending field has been clamped back into range instead of
    /// propagating a non-finite or impossible value. The Safety Supervisor
    /// treats this as a fatal condition.
    pub soft_nan: bool,
}

/// One recorded instant of a trajectory, as produced by [`crate::run`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub t_minutes: f64,
    pub map_mmhg: f64,
    pub cvp_mmhg: f64,
    pub lung_water_l: f64,
    pub q_leak_ml_min: f64,
    pub q_urine_ml_min: f64,
    pub sodium_meq_l: f64,
    pub potassium_meq_l: f64,
    pub glucose_mg_dl: f64,
    pub hemoglobin_g_dl: f64,
    pub hematocrit_pct: f64,
}

impl TrajectoryPoint {
    pub fn from_state(state: &SimulationState) -> Self {
        TrajectoryPoint {
            t_minutes: state.t_minutes,
            map_mmhg: state.map_mmhg,
            cvp_mmhg: state.cvp_mmhg,
            lung_water_l: state.v_interstitial_l,
            q_leak_ml_min: state.q_leak_ml_min,
            q_urine_ml_min: state.q_urine_ml_min,
            sodium_meq_l: state.sodium_meq_l,
            potassium_meq_l: state.potassium_meq_l,
            glucose_mg_dl: state.glucose_mg_dl,
            hemoglobin_g_dl: state.hemoglobin_g_dl,
            hematocrit_pct: state.hematocrit_pct,
        }
    }
}

/// Closed set of boolean risk flags emitted by the Safety Supervisor.
///
/// Field identifiers are part of the external contract: downstream UIs key
/// directly on these names, so the set is fixed rather than a free-form
/// collection of strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyAlerts {
    pub pulmonary_edema: bool,
    pub volume_overload: bool,
    pub cerebral_edema_risk: bool,
    pub hypoglycemia: bool,
    pub hyperglycemia_ketoacidosis_risk: bool,
    pub sam_weak_heart: bool,
    pub anemia_dilution: bool,
    pub dengue_active_leak: bool,
    pub hydrocortisone_needed: bool,
}
