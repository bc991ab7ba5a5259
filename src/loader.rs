use crate::error::LoadError;
use crate::types::{ModelPosition, Observation, RawRow, REQUIRED_COLUMNS};
use crate::util::{is_coercion_loss, median, non_blank, parse_f64_lenient};
use csv::ReaderBuilder;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Lower bound applied to every token count after imputation.
pub const MIN_TOKENS: f64 = 1.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Data rows in the wide CSV.
    pub source_rows: usize,
    /// Observations kept after reshaping and dropping incomplete ones.
    pub observations: usize,
    /// Observations dropped for a missing model or model category.
    pub dropped_incomplete: usize,
    /// Non-empty cells that did not parse as numbers, by canonical column.
    pub coercion_warnings: BTreeMap<&'static str, usize>,
    pub imputed_tokens_model_median: usize,
    pub imputed_tokens_global_median: usize,
    /// Token counts raised to `MIN_TOKENS` (including the no-data fallback).
    pub clamped_tokens: usize,
}

impl LoadReport {
    pub fn total_coercion_warnings(&self) -> usize {
        self.coercion_warnings.values().sum()
    }
}

/// An observation before token imputation.
#[derive(Debug)]
struct Draft {
    question_id: String,
    question_category: Option<String>,
    model_category: Option<String>,
    model: Option<String>,
    tokens: Option<f64>,
    time_sec: Option<f64>,
    score: Option<f64>,
    cost: Option<String>,
    electricity_wh: Option<f64>,
    co2_g: Option<f64>,
    position: ModelPosition,
}

/// Load the wide comparison CSV at `path` and reshape it into the long table.
pub fn load(path: impl AsRef<Path>) -> Result<(Vec<Observation>, LoadReport), LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::io(path, source))?;
    let (data, report) = load_from_reader(file)?;
    info!(
        path = %path.display(),
        source_rows = report.source_rows,
        observations = report.observations,
        "loaded comparison data"
    );
    Ok((data, report))
}

/// Same as [`load`] over any byte source. Pure: equal bytes give equal output.
pub fn load_from_reader<R: Read>(reader: R) -> Result<(Vec<Observation>, LoadReport), LoadError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == col.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let mut rows: Vec<RawRow> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.len() > headers.len() {
            return Err(LoadError::MalformedRow {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                expected: headers.len(),
                found: record.len(),
            });
        }
        rows.push(record.deserialize(Some(&headers))?);
    }

    let mut report = LoadReport {
        source_rows: rows.len(),
        ..Default::default()
    };
    let drafts = reshape(&rows, &mut report);
    let before = drafts.len();
    let drafts: Vec<Draft> = drafts
        .into_iter()
        .filter(|d| d.model.is_some() && d.model_category.is_some())
        .collect();
    report.dropped_incomplete = before - drafts.len();

    let data = impute_tokens(drafts, &mut report);
    report.observations = data.len();
    Ok((data, report))
}

/// Unpivot every wide row into an A and a B draft: all A drafts first, then
/// all B drafts, each half in file order.
fn reshape(rows: &[RawRow], report: &mut LoadReport) -> Vec<Draft> {
    let mut drafts = Vec::with_capacity(rows.len() * 2);
    for pos in ModelPosition::ALL {
        for row in rows {
            let cells = row.side(pos);
            let mut numeric = |column: &'static str, raw: Option<&str>| {
                let parsed = parse_f64_lenient(raw);
                if is_coercion_loss(raw, parsed) {
                    debug!(column, value = raw.unwrap_or_default(), "unparsable number treated as missing");
                    *report.coercion_warnings.entry(column).or_insert(0) += 1;
                }
                parsed
            };
            drafts.push(Draft {
                question_id: row.question_id.clone().unwrap_or_default().trim().to_string(),
                question_category: non_blank(row.question_category.as_deref()),
                model_category: non_blank(row.model_category.as_deref()),
                model: non_blank(cells.model),
                tokens: numeric("tokens", cells.tokens),
                time_sec: numeric("time_sec", cells.time_sec),
                score: numeric("score", cells.score),
                cost: non_blank(cells.cost),
                electricity_wh: numeric("electricity_wh", cells.electricity_wh),
                co2_g: numeric("co2_g", cells.co2_g),
                position: pos,
            });
        }
    }
    drafts
}

/// Fill missing token counts with the model's median, then with the median of
/// the whole column, then clamp everything to `MIN_TOKENS`.
fn impute_tokens(drafts: Vec<Draft>, report: &mut LoadReport) -> Vec<Observation> {
    let mut by_model: HashMap<&str, Vec<f64>> = HashMap::new();
    for d in &drafts {
        if let (Some(model), Some(t)) = (d.model.as_deref(), d.tokens) {
            by_model.entry(model).or_default().push(t);
        }
    }
    let model_medians: HashMap<String, f64> = by_model
        .into_iter()
        .filter_map(|(m, v)| median(v).map(|med| (m.to_string(), med)))
        .collect();

    let mut filled: Vec<Option<f64>> = Vec::with_capacity(drafts.len());
    for d in &drafts {
        let t = match d.tokens {
            Some(t) => Some(t),
            None => {
                let m = d.model.as_deref().and_then(|m| model_medians.get(m)).copied();
                if m.is_some() {
                    report.imputed_tokens_model_median += 1;
                }
                m
            }
        };
        filled.push(t);
    }

    // The global median sees the per-model fills, like a column-wide fill
    // applied after the grouped one.
    let global = median(filled.iter().flatten().copied().collect());

    drafts
        .into_iter()
        .zip(filled)
        .map(|(d, t)| {
            let t = match t {
                Some(t) => Some(t),
                None => {
                    if global.is_some() {
                        report.imputed_tokens_global_median += 1;
                    }
                    global
                }
            };
            let tokens = match t {
                Some(t) if t >= MIN_TOKENS => t,
                _ => {
                    report.clamped_tokens += 1;
                    MIN_TOKENS
                }
            };
            Observation {
                question_id: d.question_id,
                question_category: d.question_category,
                model_category: d.model_category.unwrap_or_default(),
                model: d.model.unwrap_or_default(),
                tokens,
                time_sec: d.time_sec,
                score: d.score,
                cost: d.cost,
                electricity_wh: d.electricity_wh,
                co2_g: d.co2_g,
                model_position: d.position,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const HEADER: &str = "question_id,question_categorie,categorie_model,model A,token A,time A (sec),score A,cost A (€),electricity A (wh),co2 A (g),model B,token B,time B (sec),score B,cost B (€),electricity B (wh),co2 B (g)";

    fn load_str(body: &str) -> Result<(Vec<Observation>, LoadReport), LoadError> {
        load_from_reader(format!("{HEADER}\n{body}").as_bytes())
    }

    #[test]
    fn every_row_becomes_two_observations() {
        let (data, report) = load_str(
            "q1,chat,small,gpt-x,100,2,4,0.01,1.5,10,gpt-y,80,1,3,0.02,0.5,5\n\
             q2,code,small,gpt-x,120,3,5,0.01,2,12,gpt-y,90,1.5,2,0.02,0.6,6\n\
             q3,chat,large,gpt-z,300,4,4,0.1,3,20,gpt-x,110,2,4,0.01,1.4,9\n",
        )
        .unwrap();
        assert_eq!(data.len(), 6);
        assert_eq!(report.source_rows, 3);
        assert_eq!(report.observations, 6);

        let mut counts: HashMap<&str, Vec<ModelPosition>> = HashMap::new();
        for o in &data {
            counts.entry(&o.question_id).or_default().push(o.model_position);
        }
        for positions in counts.values() {
            assert_eq!(positions.len(), 2);
            assert!(positions.contains(&ModelPosition::A));
            assert!(positions.contains(&ModelPosition::B));
        }
        // A half first, in file order.
        assert_eq!(data[0].model, "gpt-x");
        assert_eq!(data[0].model_position, ModelPosition::A);
        assert_eq!(data[3].model, "gpt-y");
        assert_eq!(data[3].model_position, ModelPosition::B);
        assert_eq!(data[3].model_category, "small");
    }

    #[test]
    fn numeric_cells_are_coerced_leniently() {
        let (data, report) = load_str(
            "q1,chat,small,gpt-x,100,\"1,5\",4,0.01,,abc,gpt-y,80,1,3,0.02,0.5,5\n",
        )
        .unwrap();
        let a = &data[0];
        assert_eq!(a.time_sec, Some(1.5));
        assert_eq!(a.electricity_wh, None);
        assert_eq!(a.co2_g, None);
        assert_eq!(report.coercion_warnings.get("co2_g"), Some(&1));
        assert_eq!(report.coercion_warnings.get("electricity_wh"), None);
        assert_eq!(report.total_coercion_warnings(), 1);
    }

    #[test]
    fn rows_without_model_or_category_are_dropped() {
        let (data, report) = load_str(
            "q1,chat,small,gpt-x,100,2,4,0.01,1,10,,80,1,3,0.02,0.5,5\n\
             q2,chat,,gpt-x,100,2,4,0.01,1,10,gpt-y,80,1,3,0.02,0.5,5\n",
        )
        .unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].question_id, "q1");
        assert_eq!(data[0].model, "gpt-x");
        assert_eq!(report.dropped_incomplete, 3);
    }

    #[test]
    fn missing_tokens_use_model_median_then_global_median() {
        let (data, report) = load_str(
            "q1,chat,small,gpt-x,100,2,4,0.01,1,10,gpt-y,,1,3,0.02,0.5,5\n\
             q2,chat,small,gpt-x,,2,4,0.01,1,10,gpt-y,abc,1,3,0.02,0.5,5\n\
             q3,chat,small,gpt-x,300,2,4,0.01,1,10,gpt-z,50,1,3,0.02,0.5,5\n",
        )
        .unwrap();
        let tokens = |q: &str, m: &str| {
            data.iter()
                .find(|o| o.question_id == q && o.model == m)
                .map(|o| o.tokens)
                .unwrap()
        };
        // gpt-x median of [100, 300]
        assert_eq!(tokens("q2", "gpt-x"), 200.0);
        // gpt-y has no usable counts: global median of [100, 200, 300, 50]
        assert_eq!(tokens("q1", "gpt-y"), 150.0);
        assert_eq!(tokens("q2", "gpt-y"), 150.0);
        assert_eq!(report.imputed_tokens_model_median, 1);
        assert_eq!(report.imputed_tokens_global_median, 2);
    }

    #[test]
    fn tokens_are_never_below_one_or_missing() {
        let (data, report) = load_str(
            "q1,chat,small,gpt-x,0,2,4,0.01,1,10,gpt-y,-5,1,3,0.02,0.5,5\n\
             q2,chat,small,gpt-x,\"0,5\",2,4,0.01,1,10,gpt-y,,1,3,0.02,0.5,5\n",
        )
        .unwrap();
        assert!(data.iter().all(|o| o.tokens >= 1.0 && o.tokens.is_finite()));
        assert_eq!(report.clamped_tokens, 4);
    }

    #[test]
    fn no_token_values_at_all_falls_back_to_floor() {
        let (data, _) = load_str(
            "q1,chat,small,gpt-x,,2,4,0.01,1,10,gpt-y,,1,3,0.02,0.5,5\n",
        )
        .unwrap();
        assert!(data.iter().all(|o| o.tokens == MIN_TOKENS));
    }

    #[test]
    fn missing_columns_are_a_parse_error() {
        let err = load_from_reader("question_id,model A\nq1,gpt-x\n".as_bytes()).unwrap_err();
        match err {
            LoadError::MissingColumns(cols) => {
                assert!(cols.contains(&"model B".to_string()));
                assert!(!cols.contains(&"model A".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn overlong_row_is_rejected() {
        let err = load_str("q1,chat,small,gpt-x,1,2,4,0.01,1,10,gpt-y,1,1,3,0.02,0.5,5,extra\n")
            .unwrap_err();
        assert!(matches!(err, LoadError::MalformedRow { found: 18, expected: 17, .. }));
    }

    #[test]
    fn short_row_is_padded_with_missing_values() {
        let (data, _) = load_str("q1,chat,small,gpt-x,10,2,4,0.01,1,10,gpt-y,20,1\n").unwrap();
        let b = data.iter().find(|o| o.model == "gpt-y").unwrap();
        assert_eq!(b.time_sec, Some(1.0));
        assert_eq!(b.score, None);
        assert_eq!(b.co2_g, None);
    }

    #[test]
    fn absent_file_is_reported_not_panicking() {
        let err = load("definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, LoadError::FileNotFound { .. }));
    }

    #[test]
    fn same_bytes_give_same_table() {
        let body = "q1,chat,small,gpt-x,,2,4,0.01,1,10,gpt-y,80,1,3,0.02,0.5,5\n";
        assert_eq!(load_str(body).unwrap(), load_str(body).unwrap());
    }
}
