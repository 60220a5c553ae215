//! Provenance and estimation warnings emitted alongside a calibrated
//! [`crate::PhysiologicalParams`].
//!
//! Every value the calibrator had to estimate rather than measure carries a
//! flag here, per the "explicit optionality" design note: a caller (or the
//! Safety Supervisor) can tell an estimated albumin-derived oncotic
//! pressure from a measured one.

use serde::{Deserialize, Serialize};

/// Notices describing which inputs the calibrator had to estimate, and any
/// clinically relevant conditions it noticed while building
/// [`crate::PhysiologicalParams`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Warnings {
    /// Albumin was not measured; oncotic pressure was estimated from MUAC.
    pub albumin_estimated: bool,
    /// Uncertainty band on the estimated albumin, in g/dL, when
    /// `albumin_estimated` is set.
    pub albumin_uncertainty_g_dl: Option<f64>,
    /// Lactate was not measured; the initializer inferred a value from
    /// capillary refill time.
    pub lactate_estimated: bool,
    /// Hypoxia (or, for non-septic diagnoses, extreme tachypnea) pushed the
    /// solver into its high-congestion CVP assumption; modeling is running
    /// in ARDS-risk mode.
    pub hypoxic_ards_mode: bool,
    /// Respiratory distress alone (without hypoxia) pushed the solver
    /// toward modeling pulmonary congestion.
    pub respiratory_distress_congestion_mode: bool,
    /// Baseline hepatomegaly reduced the patient's modeled volume tolerance.
    pub hepatomegaly_reduced_tolerance: bool,
    /// The patient is flagged both SAM and a shock diagnosis that does not
    /// itself imply malnutrition; cardiac compensation may be blunted.
    pub sam_shock_conflict: bool,
    /// The measured hematocrit and hemoglobin are inconsistent with the
    /// canonical `Hct = 3*Hb` relationship by more than 15 percentage
    /// points, suggesting a transcription or measurement error.
    pub hct_hb_mismatch: bool,
    /// Platelets were not provided.
    pub platelets_unmeasured: bool,
    /// Patient is a neonate (age < 1 month): colloid (albumin, PRBC aside)
    /// administration carries elevated risk and should be reviewed by the
    /// prescribing clinician before use.
    pub neonatal_colloid_caution: bool,
}
