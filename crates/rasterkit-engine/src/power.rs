//! Raw sample to device power mapping.

use rasterkit_settings::BeamRange;

/// Linear map from a raw sample in `[0, 255]` onto the effective beam range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerMapper {
    min: f64,
    max: f64,
}

impl PowerMapper {
    pub fn new(range: BeamRange) -> Self {
        Self {
            min: range.min,
            max: range.max,
        }
    }

    pub fn map(&self, raw: f64) -> f64 {
        raw * (self.max - self.min) / 255.0 + self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_endpoints() {
        let mapper = PowerMapper::new(BeamRange {
            min: 100.0,
            max: 800.0,
        });
        assert_eq!(mapper.map(0.0), 100.0);
        assert_eq!(mapper.map(255.0), 800.0);
    }

    #[test]
    fn test_unit_range() {
        let mapper = PowerMapper::new(BeamRange { min: 0.0, max: 1.0 });
        assert_eq!(mapper.map(255.0), 1.0);
        assert_eq!(mapper.map(0.0), 0.0);
        assert!((mapper.map(127.5) - 0.5).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_monotonic(
            min in 0.0f64..1000.0,
            span in 0.0f64..1000.0,
            a in 0.0f64..=255.0,
            b in 0.0f64..=255.0,
        ) {
            let mapper = PowerMapper::new(BeamRange { min, max: min + span });
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(mapper.map(lo) <= mapper.map(hi));
        }
    }
}
