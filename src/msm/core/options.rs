//! MSM options — configuration for the estimation pipeline.
//!
//! Purpose
//! -------
//! Collect every knob of an MSM run in validated, plain data carriers so the
//! numerical modules receive explicit arguments instead of ad-hoc flags.
//!
//! Key behaviors
//! -------------
//! - [`LagTime`] is a positive step count.
//! - [`Symmetrization`] names the reversible-estimation strategy and parses
//!   case-insensitively from `"None"`, `"Transpose"`, `"MLE"`, `"MLE-TNC"`.
//! - [`DetailedBalanceOptions`] configures the iterative MLE fixed point.
//! - [`EigenOptions`] configures the stationary-eigenvector solver.
//! - [`MSMOptions`] bundles the above with the prior, the minimum-count
//!   threshold, the sliding-window flag, and the optimizer options used by
//!   the MLE-TNC strategy.
//!
//! Invariants & assumptions
//! ------------------------
//! - Constructors reject non-finite or non-positive tolerances, zero iteration
//!   caps, zero lag, and negative priors, so downstream code never re-checks
//!   them.
//! - `Default` values are valid by construction.
//!
//! Conventions
//! -----------
//! - Tolerances are relative unless stated otherwise.
//! - The detailed-balance tolerance bounds the largest relative change of the
//!   per-state weights between two sweeps.
//!
//! Testing notes
//! -------------
//! - Unit tests cover each constructor's rejection rules, strategy parsing,
//!   and the documented defaults.
use crate::{
    msm::errors::{MSMError, MSMResult},
    optimization::loglik_optimizer::MLEOptions,
};
use std::{fmt, str::FromStr};

/// Number of steps between the two frames of a counted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LagTime(usize);

impl LagTime {
    /// # Errors
    /// - [`MSMError::InvalidLagTime`] if `lag == 0`.
    pub fn new(lag: usize) -> MSMResult<Self> {
        if lag == 0 {
            return Err(MSMError::InvalidLagTime { lag });
        }
        Ok(Self(lag))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for LagTime {
    fn default() -> Self {
        Self(1)
    }
}

/// Reversible-estimation strategy of a pipeline run.
///
/// - `None`: no symmetrization; populations from the stationary eigenvector.
/// - `Transpose`: `0.5 * (C + Cᵀ)` before trimming.
/// - `Mle`: iterative detailed-balance maximum likelihood.
/// - `MleTnc`: maximum likelihood by numerical optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Symmetrization {
    None,
    Transpose,
    #[default]
    Mle,
    MleTnc,
}

impl Symmetrization {
    /// Canonical name as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Symmetrization::None => "None",
            Symmetrization::Transpose => "Transpose",
            Symmetrization::Mle => "MLE",
            Symmetrization::MleTnc => "MLE-TNC",
        }
    }

    /// `true` if the strategy produces a detailed-balance count matrix.
    pub fn is_reversible(self) -> bool {
        !matches!(self, Symmetrization::None)
    }
}

impl fmt::Display for Symmetrization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Symmetrization {
    type Err = MSMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Symmetrization::None),
            "transpose" => Ok(Symmetrization::Transpose),
            "mle" => Ok(Symmetrization::Mle),
            "mle-tnc" | "mle_tnc" | "mletnc" => Ok(Symmetrization::MleTnc),
            _ => Err(MSMError::UnknownSymmetrization { name: s.to_string() }),
        }
    }
}

/// Stopping rules for iterative detailed balance.
///
/// - `tol`: stop once the largest relative change of any state weight
///   between two sweeps is below this value.
/// - `max_iter`: sweep cap. Reaching it is reported in the outcome.
/// - `require_convergence`: turn a capped run into
///   [`MSMError::DetailedBalanceNotConverged`] instead of a flagged estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailedBalanceOptions {
    pub tol: f64,
    pub max_iter: usize,
    pub require_convergence: bool,
}

impl DetailedBalanceOptions {
    /// # Errors
    /// - [`MSMError::InvalidTolerance`] for a non-finite or non-positive `tol`.
    /// - [`MSMError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(tol: f64, max_iter: usize, require_convergence: bool) -> MSMResult<Self> {
        verify_tolerance("detailed_balance.tol", tol)?;
        verify_max_iter("detailed_balance.max_iter", max_iter)?;
        Ok(Self { tol, max_iter, require_convergence })
    }
}

impl Default for DetailedBalanceOptions {
    fn default() -> Self {
        Self { tol: 1e-10, max_iter: 1_000_000, require_convergence: false }
    }
}

/// Stationary-eigenvector solver settings.
///
/// - `num_eigs`: size of the iterated subspace (dominant eigenpairs
///   requested); clipped to the number of states.
/// - `tol`: residual tolerance `‖Av - μv‖₂ / ‖v‖₂` of the Ritz pair closest
///   to 1 under the lazy operator `A = ½ (Tᵀ + I)`.
/// - `max_iter`: iteration cap.
/// - `eigenvalue_tol`: maximum allowed `|λ - 1|` for the eigenvalue selected
///   as stationary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EigenOptions {
    pub num_eigs: usize,
    pub tol: f64,
    pub max_iter: usize,
    pub eigenvalue_tol: f64,
}

impl EigenOptions {
    /// # Errors
    /// - [`MSMError::InvalidNumEigs`] if `num_eigs == 0`.
    /// - [`MSMError::InvalidTolerance`] / [`MSMError::InvalidMaxIter`] as for
    ///   [`DetailedBalanceOptions::new`].
    pub fn new(num_eigs: usize, tol: f64, max_iter: usize, eigenvalue_tol: f64) -> MSMResult<Self> {
        if num_eigs == 0 {
            return Err(MSMError::InvalidNumEigs { value: num_eigs });
        }
        verify_tolerance("eigen.tol", tol)?;
        verify_max_iter("eigen.max_iter", max_iter)?;
        verify_tolerance("eigen.eigenvalue_tol", eigenvalue_tol)?;
        Ok(Self { num_eigs, tol, max_iter, eigenvalue_tol })
    }
}

impl Default for EigenOptions {
    fn default() -> Self {
        Self { num_eigs: 5, tol: 1e-10, max_iter: 100_000, eigenvalue_tol: 1e-6 }
    }
}

/// Full configuration of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct MSMOptions {
    pub lag_time: LagTime,
    pub symmetrization: Symmetrization,
    /// States with fewer outgoing transitions are unassigned before counting.
    pub min_counts: usize,
    /// Pseudo-count added to every entry by the MLE strategies.
    pub prior: f64,
    pub sliding: bool,
    pub detailed_balance: DetailedBalanceOptions,
    pub mle_opts: MLEOptions,
    pub eigen: EigenOptions,
}

impl MSMOptions {
    /// Options with the given strategy knobs and default solver settings.
    ///
    /// # Errors
    /// - [`MSMError::InvalidPrior`] if `prior` is negative or non-finite.
    pub fn new(
        lag_time: LagTime, symmetrization: Symmetrization, min_counts: usize, prior: f64,
        sliding: bool,
    ) -> MSMResult<Self> {
        verify_prior(prior)?;
        Ok(Self {
            lag_time,
            symmetrization,
            min_counts,
            prior,
            sliding,
            detailed_balance: DetailedBalanceOptions::default(),
            mle_opts: MLEOptions::default(),
            eigen: EigenOptions::default(),
        })
    }

    pub fn with_detailed_balance(mut self, opts: DetailedBalanceOptions) -> Self {
        self.detailed_balance = opts;
        self
    }

    pub fn with_mle_opts(mut self, opts: MLEOptions) -> Self {
        self.mle_opts = opts;
        self
    }

    pub fn with_eigen(mut self, opts: EigenOptions) -> Self {
        self.eigen = opts;
        self
    }

    /// Re-run the field checks; used on options built by struct literal.
    ///
    /// # Errors
    /// - [`MSMError::InvalidPrior`], [`MSMError::InvalidTolerance`],
    ///   [`MSMError::InvalidMaxIter`], [`MSMError::InvalidNumEigs`].
    pub fn validate(&self) -> MSMResult<()> {
        verify_prior(self.prior)?;
        DetailedBalanceOptions::new(
            self.detailed_balance.tol,
            self.detailed_balance.max_iter,
            self.detailed_balance.require_convergence,
        )?;
        EigenOptions::new(
            self.eigen.num_eigs,
            self.eigen.tol,
            self.eigen.max_iter,
            self.eigen.eigenvalue_tol,
        )?;
        Ok(())
    }
}

impl Default for MSMOptions {
    fn default() -> Self {
        Self {
            lag_time: LagTime::default(),
            symmetrization: Symmetrization::default(),
            min_counts: 0,
            prior: 0.0,
            sliding: true,
            detailed_balance: DetailedBalanceOptions::default(),
            mle_opts: MLEOptions::default(),
            eigen: EigenOptions::default(),
        }
    }
}

pub(crate) fn verify_prior(prior: f64) -> MSMResult<()> {
    if !prior.is_finite() || prior < 0.0 {
        return Err(MSMError::InvalidPrior { value: prior });
    }
    Ok(())
}

fn verify_tolerance(name: &'static str, value: f64) -> MSMResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(MSMError::InvalidTolerance { name, value });
    }
    Ok(())
}

fn verify_max_iter(name: &'static str, value: usize) -> MSMResult<()> {
    if value == 0 {
        return Err(MSMError::InvalidMaxIter { name, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Lag time and prior validation.
    // - Strategy-name parsing, including the rejection path.
    // - Solver option constructors and defaults.
    // -------------------------------------------------------------------------

    #[test]
    fn lag_time_rejects_zero() {
        assert_eq!(LagTime::new(0), Err(MSMError::InvalidLagTime { lag: 0 }));
        assert_eq!(LagTime::new(3).map(LagTime::get), Ok(3));
    }

    #[test]
    // Purpose
    // -------
    // Strategy names parse case-insensitively and unknown names are a
    // configuration error that carries the rejected name.
    //
    // Given
    // -----
    // - Canonical names, mixed-case variants, and "Bogus".
    //
    // Expect
    // ------
    // - The matching variant, or `UnknownSymmetrization { name: "Bogus" }`.
    fn symmetrization_parses_known_names() {
        assert_eq!("None".parse::<Symmetrization>(), Ok(Symmetrization::None));
        assert_eq!("none".parse::<Symmetrization>(), Ok(Symmetrization::None));
        assert_eq!("TRANSPOSE".parse::<Symmetrization>(), Ok(Symmetrization::Transpose));
        assert_eq!("mle".parse::<Symmetrization>(), Ok(Symmetrization::Mle));
        assert_eq!("MLE-TNC".parse::<Symmetrization>(), Ok(Symmetrization::MleTnc));
        assert_eq!("mle_tnc".parse::<Symmetrization>(), Ok(Symmetrization::MleTnc));

        let err = "Bogus".parse::<Symmetrization>().unwrap_err();
        assert_eq!(err, MSMError::UnknownSymmetrization { name: "Bogus".to_string() });
        assert!(err.is_configuration());
    }

    #[test]
    fn symmetrization_names_round_trip() {
        for s in [
            Symmetrization::None,
            Symmetrization::Transpose,
            Symmetrization::Mle,
            Symmetrization::MleTnc,
        ] {
            assert_eq!(s.to_string().parse::<Symmetrization>(), Ok(s));
        }
        assert!(!Symmetrization::None.is_reversible());
        assert!(Symmetrization::MleTnc.is_reversible());
    }

    #[test]
    fn solver_options_reject_invalid_values() {
        assert!(matches!(
            DetailedBalanceOptions::new(0.0, 10, false),
            Err(MSMError::InvalidTolerance { .. })
        ));
        assert!(matches!(
            DetailedBalanceOptions::new(1e-8, 0, false),
            Err(MSMError::InvalidMaxIter { .. })
        ));
        assert_eq!(EigenOptions::new(0, 1e-8, 10, 1e-6), Err(MSMError::InvalidNumEigs { value: 0 }));
        assert!(matches!(
            EigenOptions::new(3, 1e-8, 10, f64::NAN),
            Err(MSMError::InvalidTolerance { name: "eigen.eigenvalue_tol", .. })
        ));
    }

    #[test]
    fn msm_options_validate_prior_and_defaults() {
        let lag = LagTime::new(1).expect("positive lag");
        assert!(matches!(
            MSMOptions::new(lag, Symmetrization::Mle, 0, -0.5, true),
            Err(MSMError::InvalidPrior { .. })
        ));

        let opts = MSMOptions::default();
        assert_eq!(opts.symmetrization, Symmetrization::Mle);
        assert_eq!(opts.lag_time.get(), 1);
        assert_eq!(opts.detailed_balance.tol, 1e-10);
        assert_eq!(opts.detailed_balance.max_iter, 1_000_000);
        assert_eq!(opts.eigen.num_eigs, 5);
        assert!(opts.sliding);
        assert!(opts.validate().is_ok());

        let bad = MSMOptions { prior: f64::INFINITY, ..MSMOptions::default() };
        assert!(bad.validate().is_err());
    }
}
