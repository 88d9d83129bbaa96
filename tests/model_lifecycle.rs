//! Integration tests for model ownership and cross-thread use.

use std::sync::Arc;
use std::thread;

use redeem_linear::math::Array2;
use redeem_linear::testing::{self, reference_binding};
use redeem_linear::{predict, train_with, Model, PredictOptions, SolverType, TrainOptions};

fn toy_model() -> Model<i32> {
    let x = Array2::from_shape_vec((4, 1), vec![0.0, 0.0, 10.0, 10.0]).unwrap();
    train_with(reference_binding(), &[1, 1, 2, 2], &x, &TrainOptions::default()).unwrap()
}

fn labels_for(model: &Model<i32>, values: &[f64]) -> Vec<i32> {
    let q = Array2::from_shape_vec((values.len(), 1), values.to_vec()).unwrap();
    predict(model, &q, &PredictOptions::default())
        .unwrap()
        .into_iter()
        .map(|p| p.label)
        .collect()
}

// ---------------------------------------------------------------------------
// Release
// ---------------------------------------------------------------------------

#[test]
fn each_model_is_released_exactly_once() {
    let before = testing::released_models();
    {
        let a = toy_model();
        let b = toy_model();
        assert_eq!(labels_for(&a, &[0.0]), vec![1]);
        assert_eq!(labels_for(&b, &[10.0]), vec![2]);
        assert_eq!(testing::released_models(), before);
    }
    assert_eq!(testing::released_models(), before + 2);
}

#[test]
fn moving_a_model_does_not_release_it() {
    let before = testing::released_models();
    let model = toy_model();
    let boxed = Box::new(model);
    let mut holder = vec![boxed];
    assert_eq!(testing::released_models(), before);
    assert_eq!(labels_for(&holder[0], &[10.0, 0.0]), vec![2, 1]);
    holder.clear();
    assert_eq!(testing::released_models(), before + 1);
}

#[test]
fn model_dropped_on_another_thread_is_released_there() {
    let model = toy_model();
    let released_elsewhere = thread::spawn(move || {
        let before = testing::released_models();
        assert_eq!(labels_for(&model, &[0.0]), vec![1]);
        drop(model);
        testing::released_models() - before
    })
    .join()
    .unwrap();
    assert_eq!(released_elsewhere, 1);
}

#[test]
fn buffers_outlive_training_inputs() {
    let model = {
        let x = Array2::from_shape_vec((2, 2), vec![0.0, 1.0, 5.0, 6.0]).unwrap();
        let labels = vec!["a".to_string(), "b".to_string()];
        train_with(reference_binding(), &labels, &x, &TrainOptions::default()).unwrap()
    };
    // inputs are gone; the model's own copies are still readable
    assert_eq!(model.problem().targets(), &[1.0, 2.0]);
    assert_eq!(model.problem().rows().row(1)[1].value, 6.0);
    assert_eq!(model.labels().labels(), &["a", "b"]);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn independent_models_on_separate_threads() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            thread::spawn(move || {
                let model = toy_model();
                let verbose = i % 2 == 0;
                let opts = PredictOptions {
                    verbose,
                    ..PredictOptions::default()
                };
                let q = Array2::from_shape_vec((2, 1), vec![0.0, 10.0]).unwrap();
                predict(&model, &q, &opts)
                    .unwrap()
                    .into_iter()
                    .map(|p| p.label)
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), vec![1, 2]);
    }
}

#[test]
fn shared_model_serves_many_threads() {
    let model = Arc::new(toy_model());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let model = Arc::clone(&model);
            thread::spawn(move || {
                let value = if i % 2 == 0 { 0.5 } else { 9.5 };
                labels_for(&model, &[value; 8])
            })
        })
        .collect();
    for (i, h) in handles.into_iter().enumerate() {
        let expected = if i % 2 == 0 { 1 } else { 2 };
        assert_eq!(h.join().unwrap(), vec![expected; 8]);
    }
}

// ---------------------------------------------------------------------------
// Files in, files out
// ---------------------------------------------------------------------------

#[test]
fn svmlight_file_to_prediction_file() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use redeem_linear::io::{read_svmlight, read_svmlight_with_features, write_predictions};
    use std::fmt::Write as _;

    let mut rng = StdRng::seed_from_u64(7);
    let mut train_text = String::new();
    let mut query_text = String::new();
    let mut expected = Vec::new();
    for i in 0..40 {
        let (label, center) = if i % 2 == 0 { ("near", 0.0) } else { ("far", 10.0) };
        let a: f64 = center + rng.gen_range(-1.0..1.0);
        let b: f64 = center + rng.gen_range(-1.0..1.0);
        let line = format!("{} 1:{} 3:{}\n", label, a, b);
        if i < 30 {
            train_text.push_str(&line);
        } else {
            query_text.push_str(&line);
            expected.push(label.to_string());
        }
    }
    // a row with no stored values at all
    writeln!(train_text, "near").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let train_path = dir.path().join("train.svm");
    let query_path = dir.path().join("query.svm");
    let out_path = dir.path().join("predictions.tsv");
    std::fs::write(&train_path, train_text).unwrap();
    std::fs::write(&query_path, query_text).unwrap();

    let data = read_svmlight::<String, _>(&train_path).unwrap();
    assert_eq!(data.labels.len(), 31);
    assert_eq!(data.x.ncols(), 3);
    let opts = TrainOptions::new(SolverType::L2rLr);
    let model = train_with(reference_binding(), &data.labels, &data.x, &opts).unwrap();

    let query = read_svmlight_with_features::<String, _>(&query_path, Some(model.n_features()))
        .unwrap();
    let opts = PredictOptions {
        probability_estimates: true,
        ..PredictOptions::default()
    };
    let predictions = predict(&model, &query.x, &opts).unwrap();
    let labels: Vec<_> = predictions.iter().map(|p| p.label.clone()).collect();
    assert_eq!(labels, expected);

    write_predictions(&out_path, &predictions).unwrap();
    let written = std::fs::read_to_string(&out_path).unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some("label\tscore_1\tscore_2"));
    assert_eq!(lines.count(), expected.len());
}
