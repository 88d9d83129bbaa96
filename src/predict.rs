//! Per-instance prediction through a trained [`Model`].
use log::{debug, info};
use serde::Serialize;

use crate::config::PredictOptions;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::nodes::{encode_rows, FeatureMatrix};

/// Outcome for one query instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction<L> {
    pub label: L,
    /// One slot per known label, ordered by class code. Holds probabilities
    /// with `probability_estimates`, decision values otherwise. Present only
    /// when requested through [`PredictOptions`].
    pub scores: Option<Vec<f64>>,
}

/// Predict a label for every row of `matrix`, in row order.
///
/// The feature count must equal the one the model was trained on, and
/// probability estimates need a logistic regression model. Both are checked
/// before the solver is called.
///
/// # Panics
///
/// If the solver answers with a class code the model never issued.
pub fn predict<L, M>(
    model: &Model<L>,
    matrix: &M,
    options: &PredictOptions,
) -> Result<Vec<Prediction<L>>>
where
    L: Clone,
    M: FeatureMatrix,
{
    if matrix.n_features() != model.n_features() {
        return Err(Error::DimensionMismatch {
            what: "number of features vs. trained model",
            expected: model.n_features(),
            found: matrix.n_features(),
        });
    }

    if options.probability_estimates && !model.solver_type().supports_probability() {
        return Err(Error::Configuration(format!(
            "probability estimates need a logistic regression model, not {}",
            model.solver_type()
        )));
    }

    let rows = encode_rows(matrix, model.bias())?;
    let n_classes = model.labels().len();
    info!(
        "Predicting {} instances with {} ({} classes)",
        rows.len(),
        model.solver_type(),
        n_classes
    );

    let raw = model.raw();
    let mut predictions = Vec::with_capacity(rows.len());
    for i in 0..rows.len() {
        let mut scores = vec![0.0; n_classes.max(1)];
        let row = rows.row_ptr(i);
        let out = scores.as_mut_ptr();
        // SAFETY: `raw` is alive for the borrow of `model`, `row` is a
        // sentinel-terminated row in `rows`, and `scores` has a slot for
        // every class the solver can know about.
        let code = model.binding().call(options.verbose, |calls| unsafe {
            if options.probability_estimates {
                (calls.predict_probability())(raw, row, out)
            } else {
                (calls.predict_values())(raw, row, out)
            }
        });

        let label = decode_code(model, code);
        predictions.push(Prediction {
            label,
            scores: options.wants_scores().then_some(scores),
        });
    }
    debug!("predicted {} instances", predictions.len());
    Ok(predictions)
}

fn decode_code<L: Clone>(model: &Model<L>, code: f64) -> L {
    let rounded = code.round();
    let in_i32 = rounded >= f64::from(i32::MIN) && rounded <= f64::from(i32::MAX);
    let code_i32 = if in_i32 { rounded as i32 } else { 0 };
    match model.labels().decode(code_i32) {
        Ok(label) => label.clone(),
        Err(e) => panic!("solver '{}' returned class {}: {}", model.binding().name(), code, e),
    }
}
