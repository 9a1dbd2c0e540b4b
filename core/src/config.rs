use crate::error::{Bm25Error, Result};
use serde::{Deserialize, Serialize};

/// Default term frequency saturation.
pub const DEFAULT_K1: f32 = 1.5;

/// Default length normalization.
pub const DEFAULT_B: f32 = 0.75;

/// `k1` and `b`, stored as float32 exactly as the index file stores them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: DEFAULT_K1, b: DEFAULT_B }
    }
}

impl Bm25Params {
    pub fn new(k1: f32, b: f32) -> Result<Self> {
        let params = Self { k1, b };
        params.validate()?;
        Ok(params)
    }

    /// `k1` must be finite and positive, `b` must lie in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 <= 0.0 {
            return Err(Bm25Error::Config(format!("k1 must be a finite value > 0, got {}", self.k1)));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(Bm25Error::Config(format!("b must be within [0, 1], got {}", self.b)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let p = Bm25Params::default();
        assert_eq!(p.k1, 1.5);
        assert_eq!(p.b, 0.75);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(matches!(Bm25Params::new(0.0, 0.5), Err(Bm25Error::Config(_))));
        assert!(matches!(Bm25Params::new(-1.0, 0.5), Err(Bm25Error::Config(_))));
        assert!(matches!(Bm25Params::new(f32::NAN, 0.5), Err(Bm25Error::Config(_))));
        assert!(matches!(Bm25Params::new(f32::INFINITY, 0.5), Err(Bm25Error::Config(_))));
        assert!(matches!(Bm25Params::new(1.2, 1.01), Err(Bm25Error::Config(_))));
        assert!(matches!(Bm25Params::new(1.2, -0.1), Err(Bm25Error::Config(_))));
        assert!(matches!(Bm25Params::new(1.2, f32::NAN), Err(Bm25Error::Config(_))));
    }

    #[test]
    fn accepts_boundaries() {
        assert!(Bm25Params::new(0.001, 0.0).is_ok());
        assert!(Bm25Params::new(3.0, 1.0).is_ok());
    }
}
