use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Solver variants understood by LIBLINEAR, with their C enum values.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverType {
    /// L2-regularized logistic regression (primal).
    #[serde(rename = "l2r_lr")]
    L2rLr = 0,
    /// L2-regularized L2-loss support vector classification (dual).
    #[serde(rename = "l2r_l2loss_svc_dual")]
    L2rL2LossSvcDual = 1,
    /// L2-regularized L2-loss support vector classification (primal).
    #[serde(rename = "l2r_l2loss_svc")]
    L2rL2LossSvc = 2,
    /// L2-regularized L1-loss support vector classification (dual).
    #[serde(rename = "l2r_l1loss_svc_dual")]
    L2rL1LossSvcDual = 3,
    /// Multi-class support vector classification by Crammer and Singer.
    #[serde(rename = "mcsvm_cs")]
    McsvmCs = 4,
    /// L1-regularized L2-loss support vector classification.
    #[serde(rename = "l1r_l2loss_svc")]
    L1rL2LossSvc = 5,
    /// L1-regularized logistic regression.
    #[serde(rename = "l1r_lr")]
    L1rLr = 6,
    /// L2-regularized logistic regression (dual).
    #[serde(rename = "l2r_lr_dual")]
    L2rLrDual = 7,
    /// L2-regularized L2-loss support vector regression (primal).
    #[serde(rename = "l2r_l2loss_svr")]
    L2rL2LossSvr = 11,
    /// L2-regularized L2-loss support vector regression (dual).
    #[serde(rename = "l2r_l2loss_svr_dual")]
    L2rL2LossSvrDual = 12,
    /// L2-regularized L1-loss support vector regression (dual).
    #[serde(rename = "l2r_l1loss_svr_dual")]
    L2rL1LossSvrDual = 13,
}

impl Default for SolverType {
    fn default() -> Self {
        SolverType::L2rL2LossSvcDual
    }
}

impl SolverType {
    pub const ALL: [SolverType; 11] = [
        SolverType::L2rLr,
        SolverType::L2rL2LossSvcDual,
        SolverType::L2rL2LossSvc,
        SolverType::L2rL1LossSvcDual,
        SolverType::McsvmCs,
        SolverType::L1rL2LossSvc,
        SolverType::L1rLr,
        SolverType::L2rLrDual,
        SolverType::L2rL2LossSvr,
        SolverType::L2rL2LossSvrDual,
        SolverType::L2rL1LossSvrDual,
    ];

    /// Value of the `solver_type` field in the C parameter block.
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            SolverType::L2rLr => "l2r_lr",
            SolverType::L2rL2LossSvcDual => "l2r_l2loss_svc_dual",
            SolverType::L2rL2LossSvc => "l2r_l2loss_svc",
            SolverType::L2rL1LossSvcDual => "l2r_l1loss_svc_dual",
            SolverType::McsvmCs => "mcsvm_cs",
            SolverType::L1rL2LossSvc => "l1r_l2loss_svc",
            SolverType::L1rLr => "l1r_lr",
            SolverType::L2rLrDual => "l2r_lr_dual",
            SolverType::L2rL2LossSvr => "l2r_l2loss_svr",
            SolverType::L2rL2LossSvrDual => "l2r_l2loss_svr_dual",
            SolverType::L2rL1LossSvrDual => "l2r_l1loss_svr_dual",
        }
    }

    /// Stopping tolerance used when none is given.
    pub fn default_eps(self) -> f64 {
        match self {
            SolverType::L2rLr
            | SolverType::L2rL2LossSvc
            | SolverType::L1rL2LossSvc
            | SolverType::L1rLr => 0.01,
            SolverType::L2rL2LossSvr => 0.001,
            SolverType::L2rL2LossSvcDual
            | SolverType::L2rL1LossSvcDual
            | SolverType::McsvmCs
            | SolverType::L2rLrDual
            | SolverType::L2rL2LossSvrDual
            | SolverType::L2rL1LossSvrDual => 0.1,
        }
    }

    /// Only the primal L2-regularized LR and L2-loss SVC solvers read an
    /// initial solution.
    pub fn supports_warm_start(self) -> bool {
        matches!(self, SolverType::L2rLr | SolverType::L2rL2LossSvc)
    }

    /// Logistic regression solvers are the only ones with probability
    /// outputs.
    pub fn supports_probability(self) -> bool {
        matches!(
            self,
            SolverType::L2rLr | SolverType::L2rLrDual | SolverType::L1rLr
        )
    }
}

/// Default stopping tolerance for a raw solver code. Unknown codes get 0.001.
pub fn default_eps(code: i32) -> f64 {
    SolverType::try_from(code).map_or(0.001, SolverType::default_eps)
}

impl TryFrom<i32> for SolverType {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        SolverType::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or_else(|| Error::Configuration(format!("unknown solver code {}", code)))
    }
}

impl FromStr for SolverType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        if let Ok(code) = key.parse::<i32>() {
            return SolverType::try_from(code).map_err(|e| e.to_string());
        }
        SolverType::ALL
            .into_iter()
            .find(|solver| solver.name() == key)
            .ok_or_else(|| {
                format!(
                    "Unknown solver type: {}. Valid options are: {}",
                    s,
                    SolverType::ALL.map(SolverType::name).join(", ")
                )
            })
    }
}

impl fmt::Display for SolverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options recognized by [`crate::train`].
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(
    default,
    bound(
        deserialize = "L: Deserialize<'de> + Ord",
        serialize = "L: Serialize"
    )
)]
pub struct TrainOptions<L> {
    /// Per-class multipliers of `C`. Labels absent from the training data
    /// still receive a code.
    pub weights: BTreeMap<L, f64>,
    pub solver_type: SolverType,
    /// Stopping tolerance; `None` picks [`SolverType::default_eps`].
    pub eps: Option<f64>,
    /// Cost of constraint violation.
    #[serde(rename = "C", alias = "c")]
    pub c: f64,
    /// Epsilon of the SVR loss; ignored by classifiers.
    pub p: f64,
    /// Warm start for [`SolverType::supports_warm_start`] solvers, one value
    /// per feature (bias column included).
    pub init_sol: Option<Vec<f64>>,
    /// `>= 0` appends a constant feature with this value to every instance.
    pub bias: f64,
    /// Forward the solver's progress output to the log.
    pub verbose: bool,
}

impl<L> Default for TrainOptions<L> {
    fn default() -> Self {
        Self {
            weights: BTreeMap::new(),
            solver_type: SolverType::default(),
            eps: None,
            c: 1.0,
            p: 0.1,
            init_sol: None,
            bias: -1.0,
            verbose: false,
        }
    }
}

impl<L> TrainOptions<L> {
    pub fn new(solver_type: SolverType) -> Self {
        Self {
            solver_type,
            ..Self::default()
        }
    }

    /// `eps` if set, otherwise the solver's default.
    pub fn effective_eps(&self) -> f64 {
        self.eps.unwrap_or_else(|| self.solver_type.default_eps())
    }
}

/// Options recognized by [`crate::predict`].
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PredictOptions {
    /// Score with `predict_probability` and return the probabilities. Only
    /// valid for [`SolverType::supports_probability`] models.
    pub probability_estimates: bool,
    /// Return the raw decision values alongside each label.
    pub decision_values: bool,
    pub verbose: bool,
}

impl PredictOptions {
    pub(crate) fn wants_scores(&self) -> bool {
        self.probability_estimates || self.decision_values
    }
}

/// Load [`TrainOptions`] from a JSON file.
pub fn load_train_options<L, P>(path: P) -> anyhow::Result<TrainOptions<L>>
where
    L: for<'de> Deserialize<'de> + Ord,
    P: AsRef<Path>,
{
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let options: TrainOptions<L> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn eps_defaults_follow_solver_family() {
        let expected = [
            (SolverType::L2rLr, 0.01),
            (SolverType::L2rL2LossSvc, 0.01),
            (SolverType::L1rL2LossSvc, 0.01),
            (SolverType::L1rLr, 0.01),
            (SolverType::L2rL2LossSvr, 0.001),
            (SolverType::L2rL2LossSvcDual, 0.1),
            (SolverType::L2rL1LossSvcDual, 0.1),
            (SolverType::McsvmCs, 0.1),
            (SolverType::L2rLrDual, 0.1),
            (SolverType::L2rL2LossSvrDual, 0.1),
            (SolverType::L2rL1LossSvrDual, 0.1),
        ];
        for (solver, eps) in expected {
            assert_relative_eq!(solver.default_eps(), eps);
            assert_relative_eq!(default_eps(solver.code()), eps);
            assert_relative_eq!(TrainOptions::<i32>::new(solver).effective_eps(), eps);
        }
        assert_relative_eq!(default_eps(21), 0.001);
        assert_relative_eq!(default_eps(-7), 0.001);
    }

    #[test]
    fn explicit_eps_wins() {
        let opts = TrainOptions::<i32> {
            eps: Some(0.5),
            ..TrainOptions::new(SolverType::L2rLr)
        };
        assert_relative_eq!(opts.effective_eps(), 0.5);
    }

    #[test]
    fn solver_names_and_codes_parse() {
        assert_eq!("l2r_lr".parse::<SolverType>().unwrap(), SolverType::L2rLr);
        assert_eq!("MCSVM_CS".parse::<SolverType>().unwrap(), SolverType::McsvmCs);
        assert_eq!("12".parse::<SolverType>().unwrap(), SolverType::L2rL2LossSvrDual);
        assert!("8".parse::<SolverType>().is_err());
        assert!("svm".parse::<SolverType>().unwrap_err().contains("Valid options"));
        for solver in SolverType::ALL {
            assert_eq!(solver.to_string().parse::<SolverType>().unwrap(), solver);
        }
    }

    #[test]
    fn warm_start_support() {
        let supported: Vec<_> = SolverType::ALL
            .into_iter()
            .filter(|s| s.supports_warm_start())
            .collect();
        assert_eq!(supported, vec![SolverType::L2rLr, SolverType::L2rL2LossSvc]);
    }

    #[test]
    fn probability_support() {
        let supported: Vec<_> = SolverType::ALL
            .into_iter()
            .filter(|s| s.supports_probability())
            .collect();
        assert_eq!(
            supported,
            vec![SolverType::L2rLr, SolverType::L1rLr, SolverType::L2rLrDual]
        );
    }

    #[test]
    fn defaults_match_documented_values() {
        let opts = TrainOptions::<String>::default();
        assert_eq!(opts.solver_type, SolverType::L2rL2LossSvcDual);
        assert_eq!(opts.eps, None);
        assert_relative_eq!(opts.c, 1.0);
        assert_relative_eq!(opts.p, 0.1);
        assert_relative_eq!(opts.bias, -1.0);
        assert!(opts.weights.is_empty());
        assert!(opts.init_sol.is_none());
        assert!(!opts.verbose);

        let p = PredictOptions::default();
        assert!(!p.probability_estimates && !p.decision_values && !p.verbose);
    }

    #[test]
    fn train_options_from_json() {
        let json = r#"{"solver_type": "l2r_lr", "C": 4.0, "weights": {"2": 3.5}, "bias": 1.0}"#;
        let opts: TrainOptions<i32> = serde_json::from_str(json).unwrap();
        assert_eq!(opts.solver_type, SolverType::L2rLr);
        assert_relative_eq!(opts.c, 4.0);
        assert_relative_eq!(opts.bias, 1.0);
        assert_eq!(opts.weights.get(&2), Some(&3.5));
        assert_relative_eq!(opts.p, 0.1);
    }
}
