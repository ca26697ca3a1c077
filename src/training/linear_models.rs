//! Logistic regression fitted by maximum likelihood, with the inference
//! statistics of a classical `Logit` results summary

use crate::error::{ComplaintError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use std::fmt;
use tracing::{debug, warn};

/// Solve symmetric positive-definite system Ax = b using Cholesky decomposition.
/// Returns None when a pivot falls below 1e-9 of its diagonal entry, i.e. the
/// matrix is singular up to rounding.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // Cholesky decomposition: A = L * L^T
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 1e-9 * a[[i, i]].abs() || diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L * y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
/// Returns the eigenvalues and a matrix whose columns are the eigenvectors.
fn symmetric_eigen(a: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut m = a.clone();
    let mut v = Array2::eye(n);
    let norm2: f64 = a.iter().map(|x| x * x).sum();

    for _ in 0..100 {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += 2.0 * m[[p, q]] * m[[p, q]];
            }
        }
        if off <= f64::EPSILON * f64::EPSILON * norm2 {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = m[[p, q]];
                if apq == 0.0 {
                    continue;
                }
                let theta = (m[[q, q]] - m[[p, p]]) / (2.0 * apq);
                let t = if theta.abs() > 1e150 {
                    0.5 / theta
                } else {
                    theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let (mkp, mkq) = (m[[k, p]], m[[k, q]]);
                    m[[k, p]] = c * mkp - s * mkq;
                    m[[k, q]] = s * mkp + c * mkq;
                }
                for k in 0..n {
                    let (mpk, mqk) = (m[[p, k]], m[[q, k]]);
                    m[[p, k]] = c * mpk - s * mqk;
                    m[[q, k]] = s * mpk + c * mqk;
                }
                for k in 0..n {
                    let (vkp, vkq) = (v[[k, p]], v[[k, q]]);
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    (m.diag().to_owned(), v)
}

/// Moore-Penrose inverse of a symmetric positive semi-definite matrix,
/// with its numerical rank. Eigenvalues below 1e-12 of the largest are
/// treated as zero.
fn pseudo_inverse(a: &Array2<f64>) -> (Array2<f64>, usize) {
    let n = a.nrows();
    let (values, vectors) = symmetric_eigen(a);
    let largest = values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    let cutoff = 1e-12 * largest;

    let mut inv = Array2::zeros((n, n));
    let mut rank = 0;
    for (i, &lambda) in values.iter().enumerate() {
        if lambda <= cutoff {
            continue;
        }
        rank += 1;
        let col = vectors.column(i);
        for r in 0..n {
            for c in 0..n {
                inv[[r, c]] += col[r] * col[c] / lambda;
            }
        }
    }
    (inv, rank)
}

fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
    z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}

/// ln(1 + e^z) without overflow
fn log1p_exp(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Bernoulli log-likelihood of `y` under linear predictor `x · beta`
fn log_likelihood(x: &Array2<f64>, y: &Array1<f64>, beta: &Array1<f64>) -> f64 {
    x.dot(beta)
        .iter()
        .zip(y.iter())
        .map(|(&z, &yi)| yi * z - log1p_exp(z))
        .sum()
}

/// Log-likelihood of the intercept-only model
fn null_log_likelihood(y: &Array1<f64>) -> f64 {
    let n = y.len() as f64;
    let p = y.sum() / n;
    if p <= 0.0 || p >= 1.0 {
        return 0.0;
    }
    n * (p * p.ln() + (1.0 - p) * (1.0 - p).ln())
}

/// Binary logit model without an implicit intercept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logit {
    /// Maximum Newton iterations
    pub max_iter: usize,
    /// Convergence tolerance on the largest parameter change
    pub tol: f64,
}

impl Default for Logit {
    fn default() -> Self {
        Self::new()
    }
}

impl Logit {
    /// Create a new logit model
    pub fn new() -> Self {
        Self {
            max_iter: 35,
            tol: 1e-8,
        }
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    /// Set convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Fit by Newton-Raphson, halving a step whenever it lowers the
    /// likelihood
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<LogitResults> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(ComplaintError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_features == 0 || n_samples <= n_features {
            return Err(ComplaintError::ValidationError(format!(
                "logit needs more observations than parameters, got {} x {}",
                n_samples, n_features
            )));
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(ComplaintError::ValidationError(
                "logit endog must be 0/1".to_string(),
            ));
        }

        let mut beta = Array1::zeros(n_features);
        let mut llf = log_likelihood(x, y, &beta);
        let mut n_iterations = 0;
        let mut converged = false;

        for iter in 1..=self.max_iter {
            let hessian = Self::information(x, &beta);
            let p = sigmoid(&x.dot(&beta));
            let gradient = x.t().dot(&(y - &p));

            // Collinear regressors leave the information matrix singular;
            // the minimum-norm step then moves only within its range
            let step = cholesky_solve(&hessian, &gradient)
                .unwrap_or_else(|| pseudo_inverse(&hessian).0.dot(&gradient));

            let mut scale = 1.0;
            let mut candidate = &beta + &step;
            let mut candidate_llf = log_likelihood(x, y, &candidate);
            while candidate_llf < llf && scale > 1e-4 {
                scale /= 2.0;
                candidate = &beta + &(&step * scale);
                candidate_llf = log_likelihood(x, y, &candidate);
            }

            let change = (&candidate - &beta)
                .iter()
                .fold(0.0f64, |acc, v| acc.max(v.abs()));
            beta = candidate;
            llf = candidate_llf;
            n_iterations = iter;

            debug!(iter, llf, change, "Logit Newton step");

            if !llf.is_finite() {
                break;
            }
            if change < self.tol {
                converged = true;
                break;
            }
        }

        if !converged {
            return Err(ComplaintError::ConvergenceError {
                iterations: n_iterations,
            });
        }

        let (cov, rank) = pseudo_inverse(&Self::information(x, &beta));
        if rank < n_features {
            warn!(
                rank,
                n_features, "Logit regressors are collinear; covariance uses the pseudo-inverse"
            );
        }

        LogitResults::new(beta, &cov, rank, llf, y, n_iterations)
    }

    /// Observed information X^T diag(p(1-p)) X
    fn information(x: &Array2<f64>, beta: &Array1<f64>) -> Array2<f64> {
        let p = sigmoid(&x.dot(beta));
        let mut xw = x.clone();
        for (mut row, &pi) in xw.rows_mut().into_iter().zip(p.iter()) {
            row *= pi * (1.0 - pi);
        }
        x.t().dot(&xw)
    }
}

/// Fitted logit with inference statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogitResults {
    pub params: Array1<f64>,
    /// Standard errors from the inverse information matrix
    pub bse: Array1<f64>,
    pub zvalues: Array1<f64>,
    /// Two-sided normal p-values
    pub pvalues: Array1<f64>,
    /// 95% confidence intervals as (lower, upper)
    pub conf_int: Vec<(f64, f64)>,
    pub llf: f64,
    pub llnull: f64,
    /// Likelihood-ratio statistic against the intercept-only model
    pub llr: f64,
    pub llr_pvalue: f64,
    /// McFadden pseudo R-squared
    pub prsquared: f64,
    pub aic: f64,
    pub bic: f64,
    pub nobs: usize,
    pub df_model: usize,
    pub df_resid: usize,
    /// Numerical rank of the regressor matrix
    pub rank: usize,
    pub n_iterations: usize,
    /// Always true; a fit that fails to converge is an error
    pub converged: bool,
}

impl LogitResults {
    fn new(
        params: Array1<f64>,
        cov: &Array2<f64>,
        rank: usize,
        llf: f64,
        y: &Array1<f64>,
        n_iterations: usize,
    ) -> Result<Self> {
        let nobs = y.len();
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ComplaintError::ComputationError(e.to_string()))?;
        let z_crit = normal.inverse_cdf(0.975);

        let bse = cov.diag().mapv(|v| v.sqrt());
        let zvalues = &params / &bse;
        let pvalues = zvalues.mapv(|z| 2.0 * (1.0 - normal.cdf(z.abs())));
        let conf_int = params
            .iter()
            .zip(bse.iter())
            .map(|(&b, &se)| (b - z_crit * se, b + z_crit * se))
            .collect();

        let llnull = null_log_likelihood(y);
        let llr = 2.0 * (llf - llnull);
        let df_model = rank.saturating_sub(1);
        let llr_pvalue = if df_model > 0 {
            let chi2 = ChiSquared::new(df_model as f64)
                .map_err(|e| ComplaintError::ComputationError(e.to_string()))?;
            1.0 - chi2.cdf(llr.max(0.0))
        } else {
            f64::NAN
        };
        let prsquared = if llnull != 0.0 { 1.0 - llf / llnull } else { f64::NAN };

        Ok(Self {
            params,
            bse,
            zvalues,
            pvalues,
            conf_int,
            llf,
            llnull,
            llr,
            llr_pvalue,
            prsquared,
            aic: -2.0 * llf + 2.0 * rank as f64,
            bic: -2.0 * llf + (nobs as f64).ln() * rank as f64,
            nobs,
            df_model,
            df_resid: nobs - rank,
            rank,
            n_iterations,
            converged: true,
        })
    }

    /// Predicted probability of the positive class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.params.len() {
            return Err(ComplaintError::ShapeError {
                expected: format!("{} features", self.params.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(sigmoid(&x.dot(&self.params)))
    }

    /// Tabular summary with one row per regressor
    pub fn summary(&self, dependent_variable: &str, feature_names: &[String]) -> Result<LogitSummary> {
        if feature_names.len() != self.params.len() {
            return Err(ComplaintError::ShapeError {
                expected: format!("{} feature names", self.params.len()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }

        let coefficients = feature_names
            .iter()
            .enumerate()
            .map(|(i, name)| CoefficientRow {
                name: name.clone(),
                coef: self.params[i],
                std_err: self.bse[i],
                z: self.zvalues[i],
                p_value: self.pvalues[i],
                ci_lower: self.conf_int[i].0,
                ci_upper: self.conf_int[i].1,
            })
            .collect();

        Ok(LogitSummary {
            dependent_variable: dependent_variable.to_string(),
            nobs: self.nobs,
            df_model: self.df_model,
            df_resid: self.df_resid,
            n_iterations: self.n_iterations,
            pseudo_r_squared: self.prsquared,
            aic: self.aic,
            bic: self.bic,
            log_likelihood: self.llf,
            ll_null: self.llnull,
            llr_p_value: self.llr_pvalue,
            coefficients,
        })
    }
}

/// One regressor's row in [`LogitSummary`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRow {
    pub name: String,
    pub coef: f64,
    pub std_err: f64,
    pub z: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// Printable logit results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogitSummary {
    pub dependent_variable: String,
    pub nobs: usize,
    pub df_model: usize,
    pub df_resid: usize,
    pub n_iterations: usize,
    pub pseudo_r_squared: f64,
    pub aic: f64,
    pub bic: f64,
    pub log_likelihood: f64,
    pub ll_null: f64,
    pub llr_p_value: f64,
    pub coefficients: Vec<CoefficientRow>,
}

impl fmt::Display for LogitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .coefficients
            .iter()
            .map(|row| row.name.len())
            .max()
            .unwrap_or(0)
            .max(4);
        let width = name_width + 6 * 10;
        let heavy = "=".repeat(width);
        let light = "-".repeat(width);

        writeln!(f, "{:^width$}", "Results: Logit", width = width)?;
        writeln!(f, "{}", heavy)?;

        let left = [
            ("Model:", "Logit".to_string()),
            ("Dependent Variable:", self.dependent_variable.clone()),
            ("No. Observations:", self.nobs.to_string()),
            ("Df Model:", self.df_model.to_string()),
            ("Df Residuals:", self.df_resid.to_string()),
            ("No. Iterations:", self.n_iterations.to_string()),
        ];
        let right = [
            ("Pseudo R-squared:", format!("{:.3}", self.pseudo_r_squared)),
            ("AIC:", format!("{:.4}", self.aic)),
            ("BIC:", format!("{:.4}", self.bic)),
            ("Log-Likelihood:", format!("{:.4}", self.log_likelihood)),
            ("LL-Null:", format!("{:.4}", self.ll_null)),
            ("LLR p-value:", format!("{:.4}", self.llr_p_value)),
        ];
        for ((lk, lv), (rk, rv)) in left.iter().zip(right.iter()) {
            writeln!(f, "{:<20}{:<18}{:<18}{}", lk, lv, rk, rv)?;
        }

        writeln!(f, "{}", light)?;
        writeln!(
            f,
            "{:<nw$}{:>10}{:>10}{:>10}{:>10}{:>10}{:>10}",
            "",
            "Coef.",
            "Std.Err.",
            "z",
            "P>|z|",
            "[0.025",
            "0.975]",
            nw = name_width
        )?;
        writeln!(f, "{}", light)?;
        for row in &self.coefficients {
            writeln!(
                f,
                "{:<nw$}{:>10.4}{:>10.4}{:>10.4}{:>10.4}{:>10.4}{:>10.4}",
                row.name,
                row.coef,
                row.std_err,
                row.z,
                row.p_value,
                row.ci_lower,
                row.ci_upper,
                nw = name_width
            )?;
        }
        write!(f, "{}", heavy)
    }
}
