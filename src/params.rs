//! `PhysiologicalParams`: the per-patient constant bundle produced once by
//! the Parameter Calibrator and never mutated afterward.

use serde::{Deserialize, Serialize};

/// Per-patient physiological constants, calibrated once from a
/// [`crate::PatientInput`] and held fixed for the rest of the simulation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhysiologicalParams {
    // Compartment sizes
    pub v_blood_normal_l: f64,
    pub v_inter_normal_l: f64,

    // Cardiac
    /// In `[0, 1.5]`.
    pub cardiac_contractility: f64,
    pub max_cardiac_output_l_min: f64,
    pub optimal_preload_ml: f64,
    pub afterload_sensitivity: f64,
    pub heart_stiffness_k: f64,

    // Vascular
    /// dyn·s·cm⁻⁵.
    pub svr_resistance: f64,
    pub capillary_filtration_k: f64,
    /// Capillary reflection coefficient, in `[0.3, 0.9]`.
    pub reflection_coefficient_sigma: f64,
    pub plasma_oncotic_pressure_mmhg: f64,
    pub baseline_capillary_pressure_mmhg: f64,
    pub blood_viscosity_eta: f64,

    // Tissue
    pub tissue_compliance_factor: f64,
    pub interstitial_compliance_ml_mmhg: f64,
    pub capillary_recruitment_base: f64,

    // Renal
    /// In `[0, 1]`.
    pub renal_maturity_factor: f64,

    // Targets
    pub target_map_mmhg: f64,
    pub target_cvp_mmhg: f64,
    pub target_heart_rate_upper_limit: f64,
    pub target_respiratory_rate_limit: f64,

    // Metabolic
    pub glucose_utilization_mg_kg_min: f64,
    pub intracellular_sodium_bias: f64,
    pub osmotic_conductance_k: f64,
    pub insensible_loss_ml_min: f64,
    pub lymphatic_drainage_capacity_ml_min: f64,
    pub venous_compliance_ml_mmhg: f64,

    // Provenance
    pub is_sam: bool,
    pub final_starting_blood_volume_l: f64,
    pub albumin_uncertainty_g_dl: Option<f64>,
    pub weight_kg: f64,

    /// Direct shock-physiology marker, consumed by the minute-stepper's
    /// stress-gluconeogenesis term. Added per spec.md §9's open question on
    /// this term: the source gated it on `afterload_sensitivity > 1.0`, a
    /// coefficient that is never actually set above 0.5 anywhere in the
    /// model, making that gate dead code. Set for septic, dengue, and
    /// undifferentiated shock; not set for severe dehydration or isolated
    /// SAM dehydration, which stress the heart and vasculature but are not
    /// distributive/vasoplegic shock physiology.
    pub is_shock_physiology: bool,

    /// Set for septic shock specifically. The minute-stepper's lactate
    /// clearance term distinguishes septic hepatic dysfunction (a fixed,
    /// low clearance constant) from the general perfusion-dependent
    /// clearance every other diagnosis uses; dengue and SAM patients clear
    /// lactate via perfusion alone.
    pub hepatic_dysfunction: bool,

    /// The bedside hematocrit read at calibration time, carried forward so
    /// the Safety Supervisor's dengue-leak check (§4.6) has a true baseline
    /// to compare the running state against, rather than comparing the
    /// current state to itself.
    pub baseline_hematocrit_pct: f64,

    /// The bedside glucose read at calibration time (or the state's T=0
    /// glucose when the bedside reading was absent), for the Safety
    /// Supervisor's "already hyperglycemic/DKA-risk on arrival" check,
    /// which must key on the patient's presenting glucose, not whatever the
    /// simulation has walked it to by the time of evaluation.
    pub baseline_glucose_mg_dl: f64,
}
