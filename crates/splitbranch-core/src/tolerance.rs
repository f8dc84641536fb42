//! Numerical tolerance policy shared by snapshot capture, split generation
//! and the search driver.

/// Absolute and relative tolerances for comparing simplex data.
///
/// `epsilon` guards exact-looking comparisons (zero, integrality),
/// `feastol` guards primal feasibility (row activities, fractionality),
/// and any magnitude at or above `infinity` counts as infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerances {
    pub epsilon: f64,
    pub feastol: f64,
    pub infinity: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            epsilon: 1e-9,
            feastol: 1e-6,
            infinity: 1e20,
        }
    }
}

impl Tolerances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feastol(mut self, feastol: f64) -> Self {
        self.feastol = feastol;
        self
    }

    pub fn is_zero(&self, value: f64) -> bool {
        value.abs() <= self.epsilon
    }

    pub fn is_feas_zero(&self, value: f64) -> bool {
        value.abs() <= self.feastol
    }

    pub fn is_infinity(&self, value: f64) -> bool {
        value >= self.infinity
    }

    pub fn is_le(&self, a: f64, b: f64) -> bool {
        a - b <= self.epsilon
    }

    pub fn floor(&self, value: f64) -> f64 {
        (value + self.epsilon).floor()
    }

    pub fn feas_floor(&self, value: f64) -> f64 {
        (value + self.feastol).floor()
    }

    pub fn feas_ceil(&self, value: f64) -> f64 {
        (value - self.feastol).ceil()
    }

    /// Fractional part; values within epsilon below an integer give a fraction of about zero.
    pub fn frac(&self, value: f64) -> f64 {
        value - self.floor(value)
    }

    pub fn feas_frac(&self, value: f64) -> f64 {
        value - self.feas_floor(value)
    }

    pub fn is_integral(&self, value: f64) -> bool {
        self.frac(value) <= self.epsilon
    }

    pub fn is_feas_integral(&self, value: f64) -> bool {
        self.feas_frac(value) <= self.feastol
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_frac_snaps_near_integers() {
        let tol = Tolerances::default();
        assert!((tol.frac(2.5) - 0.5).abs() < 1e-12);
        assert!((tol.frac(-0.25) - 0.75).abs() < 1e-12);
        assert!(tol.frac(3.0 - 1e-12).abs() < 1e-9);
        assert!(tol.is_integral(3.0 - 1e-12));
        assert!(!tol.is_integral(3.4));
    }

    #[test]
    fn test_infinity_and_feasibility() {
        let tol = Tolerances::default();
        assert!(tol.is_infinity(f64::INFINITY));
        assert!(tol.is_infinity(1e21));
        assert!(!tol.is_infinity(-f64::INFINITY));
        assert!(tol.is_feas_zero(5e-7));
        assert!(!tol.is_zero(5e-7));
        assert!(!tol.is_le(1.0 + 1e-6, 1.0));
        assert!(tol.is_le(1.0 + 1e-10, 1.0));
        assert_eq!(tol.feas_floor(2.9999999), 3.0);
        assert_eq!(tol.feas_ceil(3.0000001), 3.0);
    }

    proptest! {
        #[test]
        fn frac_stays_in_unit_interval(v in -1.0e6f64..1.0e6) {
            let tol = Tolerances::default();
            let f = tol.frac(v);
            prop_assert!(f > -tol.epsilon - 1e-9);
            prop_assert!(f < 1.0);
            prop_assert!(tol.is_integral(v - f));
        }

        #[test]
        fn integers_are_integral(k in -100_000i64..100_000) {
            let tol = Tolerances::default();
            prop_assert!(tol.is_integral(k as f64));
            prop_assert!(tol.is_feas_integral(k as f64));
            prop_assert_eq!(tol.feas_floor(k as f64), k as f64);
        }
    }
}
