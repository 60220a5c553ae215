use std::f64::consts::E;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Copy)]
pub enum BoundFn {
    Linear,
    Sigmoid,
}

impl BoundFn {
    pub fn call(&self, t: f64, d: f64, a: f64) -> f64 {
        match self {
            BoundFn::Linear => bound_linear(t, d, a),
            BoundFn::Sigmoid => bound_sigmoid(t, d, a),
        }
    }
}

/// A mathematical sigmoid / logistic function with additional bounds
/// to define function shape
///
/// ### Arguments
/// * `t` - time
/// * `d` - duration
/// * `a` - amplitude
pub fn bound_sigmoid(t: f64, d: f64, a: f64) -> f64 {
    return a / (1.0 + f64::exp(-((4.0 * E / d) * t - 2.0 * E)));
}

/// A linear function with additional bounds to define function shape
///
/// ### Arguments
/// * `t` - time
/// * `d` - duration
/// * `a` - amplitude
pub fn bound_linear(t: f64, d: f64, a: f64) -> f64 {
    if t < d {
        return a * t / d;
    }
    return a;
}

/// Standard logistic function, centered at 0 with unit scale.
///
/// Used to gate the renal autoregulation ramp: callers rescale the
/// argument to place the inflection and width where the clinical curve
/// needs them (e.g. `logistic((perfusion_pressure_mmhg - 45.0) / 5.0)`
/// centers the ramp at 45 mmHg with a 5 mmHg rolloff).
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}


