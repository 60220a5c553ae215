//! Closed tag sets and the validated bedside snapshot (`PatientInput`).

use serde::{Deserialize, Serialize};
use strum_macros::{EnumCount, EnumIter, EnumString};

/// Biological sex as recorded at the bedside. Not consumed by any formula
/// in this crate today; carried through as part of the demographic
/// snapshot because downstream protocol tables (out of scope here) key
/// bolus-volume tables on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

/// Working clinical diagnosis driving the shape of the physiological model.
///
/// Closed set: an unrecognized diagnosis cannot reach this type, since the
/// surrounding service layer is responsible for mapping bedside input onto
/// one of these five tags before calling into the core.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumCount, EnumIter, Serialize, Deserialize,
)]
pub enum DiagnosisTag {
    /// Hypovolemic shock from diarrheal or other fluid losses, no sepsis or
    /// malnutrition complicating the picture.
    SevereDehydration,
    /// Distributive shock from presumed or confirmed infection.
    SepticShock,
    /// Plasma leak syndrome from dengue virus infection.
    DengueShock,
    /// Dehydration in a child with severe acute malnutrition (MUAC < 11.5 cm).
    SevereAcuteMalnutrition,
    /// Shock without one of the above working diagnoses yet assigned.
    UndifferentiatedShock,
}

/// Severity of fluid losses still ongoing at the time of the snapshot
/// (e.g. continuing diarrhea or vomiting), expressed as a per-kg-per-hour
/// multiplier used by the simulator's loss term.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumCount, EnumIter, Serialize, Deserialize,
)]
pub enum OngoingLossSeverity {
    None,
    Mild,
    Moderate,
    Severe,
}

impl OngoingLossSeverity {
    /// Ongoing loss rate, in ml/kg/hour, assigned to this severity band.
    pub fn ml_per_kg_hr(&self) -> f64 {
        match self {
            OngoingLossSeverity::None => 0.0,
            OngoingLossSeverity::Mild => 5.0,
            OngoingLossSeverity::Moderate => 7.0,
            OngoingLossSeverity::Severe => 10.0,
        }
    }
}

/// IV administration set drop factor, in gtt/mL. Used only for drop-rate
/// display by a consumer outside this crate; the simulator itself drives
/// infusion purely by ml/hr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IvSet(pub u32);

/// Validated bedside snapshot of a single patient at a single point in time.
///
/// Constructed only through [`crate::build_params`], which performs the
/// range and cross-field checks described in its documentation. Immutable
/// once built.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PatientInput {
    // Demographics
    pub age_months: f64,
    pub weight_kg: f64,
    pub sex: Sex,
    pub height_cm: Option<f64>,

    // Vulnerability markers
    pub muac_cm: f64,
    pub temperature_c: f64,
    pub hemoglobin_g_dl: f64,

    // Vitals
    pub systolic_bp_mmhg: f64,
    pub diastolic_bp_mmhg: Option<f64>,
    pub heart_rate_bpm: f64,
    pub capillary_refill_s: f64,
    pub spo2_pct: f64,
    pub respiratory_rate_bpm: f64,

    // Labs
    pub sodium_meq_l: Option<f64>,
    pub glucose_mg_dl: Option<f64>,
    pub hematocrit_pct: f64,
    pub albumin_g_dl: Option<f64>,
    pub lactate_mmol_l: Option<f64>,
    pub platelets_per_ul: Option<f64>,

    // Context
    pub diagnosis: DiagnosisTag,
    /// Day of illness for dengue patients (1-indexed); `None` for non-dengue.
    pub illness_day: Option<u32>,
    pub ongoing_losses: OngoingLossSeverity,
    pub baseline_hepatomegaly: bool,
    pub hours_since_last_urine: f64,
    pub iv_set: IvSet,
}

impl PatientInput {
    /// True when MUAC indicates severe acute malnutrition, independent of
    /// the working diagnosis tag. Hemodynamic formulas that key on "is this
    /// a SAM patient" use this rather than `diagnosis ==
    /// SevereAcuteMalnutrition`, since a child can be malnourished under any
    /// working diagnosis.
    pub fn is_sam(&self) -> bool {
        self.muac_cm < 11.5
    }

    pub fn is_septic(&self) -> bool {
        self.diagnosis == DiagnosisTag::SepticShock
    }

    pub fn is_dengue(&self) -> bool {
        self.diagnosis == DiagnosisTag::DengueShock
    }
}
