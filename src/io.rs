//! Reading LIBSVM/SVMlight sparse text files and writing predictions.
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use log::debug;

use crate::math::CsrMatrix;
use crate::predict::Prediction;

/// Labels and instances read from a sparse text file.
#[derive(Debug)]
pub struct SvmLightData<L> {
    pub labels: Vec<L>,
    pub x: CsrMatrix,
}

/// Read `label index:value ...` lines. Indices are 1-based; the feature
/// count is the largest index seen.
pub fn read_svmlight<L, P>(path: P) -> Result<SvmLightData<L>>
where
    L: FromStr,
    L::Err: Display,
    P: AsRef<Path>,
{
    read_svmlight_with_features(path, None)
}

/// Like [`read_svmlight`], but with a fixed feature count, so that a query
/// file lines up with the model it is scored against. Indices beyond
/// `n_features` are an error.
pub fn read_svmlight_with_features<L, P>(
    path: P,
    n_features: Option<usize>,
) -> Result<SvmLightData<L>>
where
    L: FromStr,
    L::Err: Display,
    P: AsRef<Path>,
{
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .comment(Some(b'#'))
        .from_path(&path)
        .with_context(|| format!("Failed to open data file: {}", path.as_ref().display()))?;

    let mut labels = Vec::new();
    let mut indptr = vec![0usize];
    let mut indices = Vec::new();
    let mut values = Vec::new();
    let mut max_index = 0usize;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read record {}", row_idx + 1))?;
        let line = record
            .position()
            .map_or(row_idx as u64 + 1, |pos| pos.line());
        let mut fields = record
            .iter()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .take_while(|f| !f.starts_with('#'));

        let Some(label) = fields.next() else {
            continue;
        };
        let label = label
            .parse::<L>()
            .map_err(|e| anyhow!("Invalid label '{}' at line {}: {}", label, line, e))?;
        labels.push(label);

        let mut previous = 0usize;
        for field in fields {
            let (index, value) = field
                .split_once(':')
                .ok_or_else(|| anyhow!("Expected index:value at line {}, got '{}'", line, field))?;
            let index: usize = index
                .parse()
                .with_context(|| format!("Invalid feature index '{}' at line {}", index, line))?;
            let value: f64 = value
                .parse()
                .with_context(|| format!("Invalid feature value '{}' at line {}", value, line))?;
            if index == 0 {
                bail!("Feature indices are 1-based, found 0 at line {}", line);
            }
            if index <= previous {
                bail!(
                    "Feature indices must be strictly increasing, found {} after {} at line {}",
                    index,
                    previous,
                    line
                );
            }
            previous = index;
            if let Some(limit) = n_features {
                if index > limit {
                    bail!(
                        "Feature index {} at line {} exceeds the expected {} features",
                        index,
                        line,
                        limit
                    );
                }
            }
            max_index = max_index.max(index);
            indices.push(index - 1);
            values.push(value);
        }
        indptr.push(indices.len());
    }

    let ncols = n_features.unwrap_or(max_index);
    debug!(
        "read {} instances, {} features, {} stored values from {}",
        labels.len(),
        ncols,
        values.len(),
        path.as_ref().display()
    );
    let x = CsrMatrix::new(ncols, indptr, indices, values)
        .context("Inconsistent sparse matrix")?;
    Ok(SvmLightData { labels, x })
}

/// Write predictions as TSV: a `label` column, plus `score_<k>` columns
/// (k = class code) when scores were requested.
pub fn write_predictions<L, P>(path: P, predictions: &[Prediction<L>]) -> Result<()>
where
    L: Display,
    P: AsRef<Path>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(&path)
        .with_context(|| format!("Failed to create output file: {}", path.as_ref().display()))?;

    let n_scores = predictions
        .iter()
        .filter_map(|p| p.scores.as_ref().map(Vec::len))
        .max()
        .unwrap_or(0);
    let mut header = vec!["label".to_string()];
    header.extend((1..=n_scores).map(|k| format!("score_{}", k)));
    writer.write_record(&header)?;

    for p in predictions {
        let mut record = vec![p.label.to_string()];
        let scores = p.scores.as_deref().unwrap_or(&[]);
        record.extend((0..n_scores).map(|k| scores.get(k).map_or(String::new(), f64::to_string)));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file_with(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn reads_sparse_lines() {
        let f = file_with("# header comment\n+1 1:0.5 3:2\n-1  2:1.5\n\n2 # trailing comment\n");
        let data: SvmLightData<i32> = read_svmlight(f.path()).unwrap();
        assert_eq!(data.labels, vec![1, -1, 2]);
        assert_eq!(data.x.shape(), (3, 3));
        assert_eq!(data.x.row(0), (&[0usize, 2][..], &[0.5, 2.0][..]));
        assert_eq!(data.x.row(1), (&[1usize][..], &[1.5][..]));
        assert!(data.x.row(2).0.is_empty());
    }

    #[test]
    fn fixed_width_pads_and_checks() {
        let f = file_with("a 1:1\nb 2:1\n");
        let data: SvmLightData<String> = read_svmlight_with_features(f.path(), Some(5)).unwrap();
        assert_eq!(data.x.ncols(), 5);

        let err = read_svmlight_with_features::<String, _>(f.path(), Some(1)).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn reports_bad_tokens_with_line() {
        let f = file_with("1 1:1\n1 0:2\n");
        let err = read_svmlight::<i32, _>(f.path()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);

        let f = file_with("x 1:1\n");
        assert!(read_svmlight::<i32, _>(f.path()).is_err());

        let f = file_with("1 1=1\n");
        assert!(read_svmlight::<i32, _>(f.path()).is_err());
    }

    #[test]
    fn rejects_unsorted_and_repeated_indices() {
        let f = file_with("1 1:1 2:1\n1 3:1 1:2 1:5\n");
        let err = read_svmlight::<i32, _>(f.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("strictly increasing"), "{}", msg);
        assert!(msg.contains("line 2"), "{}", msg);

        let f = file_with("1 2:1 2:3\n");
        let err = read_svmlight::<i32, _>(f.path()).unwrap_err();
        assert!(err.to_string().contains("found 2 after 2"), "{}", err);
    }

    #[test]
    fn writes_label_and_score_columns() {
        let out = tempfile::NamedTempFile::new().unwrap();
        let preds = vec![
            Prediction { label: "a", scores: Some(vec![0.75, 0.25]) },
            Prediction { label: "b", scores: Some(vec![0.1, 0.9]) },
        ];
        write_predictions(out.path(), &preds).unwrap();
        let text = std::fs::read_to_string(out.path()).unwrap();
        assert_eq!(text, "label\tscore_1\tscore_2\na\t0.75\t0.25\nb\t0.1\t0.9\n");

        let plain = vec![Prediction { label: 3, scores: None }];
        write_predictions(out.path(), &plain).unwrap();
        assert_eq!(std::fs::read_to_string(out.path()).unwrap(), "label\n3\n");
    }
}
