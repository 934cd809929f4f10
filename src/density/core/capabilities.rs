//! Capability descriptor for conditional density models.
//!
//! A model declares which primitive operations it implements through a
//! [`Capabilities`] value. The dispatcher resolves the descriptor once per
//! statistic call and chooses a strategy from it, so strategy selection is a
//! plain match over four flags rather than probing the model at runtime.

/// Capabilities — which primitives a fitted model exposes.
///
/// Fields
/// ------
/// - `pdf`: the model evaluates `p(y | x)` (and `ln p(y | x)`).
/// - `cdf`: the model evaluates `P(Y ≤ y | x)` itself.
/// - `sample`: the model draws one `y` per conditioning row.
/// - `mixture`: the model exposes `(weights, locs, scales)` of a diagonal
///   Gaussian mixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub pdf: bool,
    pub cdf: bool,
    pub sample: bool,
    pub mixture: bool,
}

impl Capabilities {
    /// Descriptor with every flag cleared.
    pub const fn none() -> Capabilities {
        Capabilities { pdf: false, cdf: false, sample: false, mixture: false }
    }

    /// Descriptor with every flag set.
    pub const fn all() -> Capabilities {
        Capabilities { pdf: true, cdf: true, sample: true, mixture: true }
    }

    pub const fn with_pdf(mut self) -> Capabilities {
        self.pdf = true;
        self
    }

    pub const fn with_cdf(mut self) -> Capabilities {
        self.cdf = true;
        self
    }

    pub const fn with_sample(mut self) -> Capabilities {
        self.sample = true;
        self
    }

    pub const fn with_mixture(mut self) -> Capabilities {
        self.mixture = true;
        self
    }

    /// Flags present in both descriptors.
    pub const fn intersect(self, other: Capabilities) -> Capabilities {
        Capabilities {
            pdf: self.pdf && other.pdf,
            cdf: self.cdf && other.cdf,
            sample: self.sample && other.sample,
            mixture: self.mixture && other.mixture,
        }
    }

    /// A conditional CDF is available, either directly or from mixture
    /// components.
    pub const fn has_any_cdf(&self) -> bool {
        self.cdf || self.mixture
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Builders set only their own flag and `intersect` keeps common flags.
    //
    // Given
    // -----
    // - `a = pdf + sample`, `b = sample + mixture`.
    //
    // Expect
    // ------
    // - `a ∩ b` has only `sample`; neither has a CDF path except via mixture.
    fn builders_and_intersection() {
        let a = Capabilities::none().with_pdf().with_sample();
        let b = Capabilities::none().with_sample().with_mixture();

        let both = a.intersect(b);

        assert_eq!(both, Capabilities::none().with_sample());
        assert!(!a.has_any_cdf());
        assert!(b.has_any_cdf());
        assert_eq!(Capabilities::all().intersect(a), a);
    }
}
