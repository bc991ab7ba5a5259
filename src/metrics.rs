//! Grouped aggregation and efficiency ratios over the long table.

use crate::types::Observation;
use crate::util::{mean, round_to, sample_std};
use std::collections::BTreeMap;
use std::fmt;

/// Added to the environmental cost before dividing, so a zero cost still
/// yields a finite ratio.
pub const EFFICIENCY_GUARD: f64 = 0.01;

/// Decimal places kept in aggregate tables.
pub const DISPLAY_DECIMALS: i32 = 2;

/// Categorical columns a table can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Model,
    ModelCategory,
    QuestionCategory,
}

impl Dimension {
    pub fn value<'a>(&self, o: &'a Observation) -> Option<&'a str> {
        match self {
            Dimension::Model => Some(o.model.as_str()),
            Dimension::ModelCategory => Some(o.model_category.as_str()),
            Dimension::QuestionCategory => o.question_category.as_deref(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Model => "model",
            Dimension::ModelCategory => "model_category",
            Dimension::QuestionCategory => "question_category",
        }
    }
}

/// Numeric columns, including the derived efficiency ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Tokens,
    TimeSec,
    Score,
    ElectricityWh,
    Co2G,
    EfficiencyCo2,
    EfficiencyElectricity,
}

impl Column {
    pub fn value(&self, o: &Observation) -> Option<f64> {
        match self {
            Column::Tokens => Some(o.tokens),
            Column::TimeSec => o.time_sec,
            Column::Score => o.score,
            Column::ElectricityWh => o.electricity_wh,
            Column::Co2G => o.co2_g,
            Column::EfficiencyCo2 => efficiency_co2(o),
            Column::EfficiencyElectricity => efficiency_electricity(o),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Column::Tokens => "tokens",
            Column::TimeSec => "time_sec",
            Column::Score => "score",
            Column::ElectricityWh => "electricity_wh",
            Column::Co2G => "co2_g",
            Column::EfficiencyCo2 => "efficiency_co2",
            Column::EfficiencyElectricity => "efficiency_electricity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Mean,
    Std,
    Sum,
    Count,
}

impl Stat {
    /// Apply to the present values of one group.
    ///
    /// `Sum` of nothing is 0 and `Count` counts present values only. `Mean`
    /// of nothing and `Std` of fewer than two values are undefined.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        match self {
            Stat::Mean => mean(values),
            Stat::Std => sample_std(values),
            Stat::Sum => Some(values.iter().sum()),
            Stat::Count => Some(values.len() as f64),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stat::Mean => "mean",
            Stat::Std => "std",
            Stat::Sum => "sum",
            Stat::Count => "count",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregation {
    pub column: Column,
    pub stat: Stat,
}

impl Aggregation {
    pub const fn new(column: Column, stat: Stat) -> Self {
        Aggregation { column, stat }
    }

    pub fn label(&self) -> String {
        format!("{}_{}", self.column.label(), self.stat)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub key: Vec<String>,
    /// One entry per requested aggregation, rounded for display.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    pub dimensions: Vec<Dimension>,
    pub aggregations: Vec<Aggregation>,
    /// Ordered by ascending key.
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    pub fn headers(&self) -> Vec<String> {
        self.dimensions
            .iter()
            .map(|d| d.label().to_string())
            .chain(self.aggregations.iter().map(Aggregation::label))
            .collect()
    }

    /// Rows as text, missing values left empty.
    pub fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut rec = row.key.clone();
                for (agg, v) in self.aggregations.iter().zip(&row.values) {
                    rec.push(match (agg.stat, v) {
                        (_, None) => String::new(),
                        (Stat::Count, Some(n)) => format!("{}", *n as u64),
                        (_, Some(x)) => format!("{x}"),
                    });
                }
                rec
            })
            .collect()
    }

    /// Value of `agg` for the group whose key equals `key`.
    pub fn get(&self, key: &[&str], agg: Aggregation) -> Option<f64> {
        let idx = self.aggregations.iter().position(|a| *a == agg)?;
        self.rows
            .iter()
            .find(|r| r.key.iter().map(String::as_str).eq(key.iter().copied()))
            .and_then(|r| r.values[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Group `data` by `by` and compute `aggregations` per group.
///
/// Observations with a missing key are left out. Missing values are skipped
/// by every statistic. An empty input gives an empty table.
pub fn aggregate(
    data: &[Observation],
    by: &[Dimension],
    aggregations: &[Aggregation],
) -> AggregateTable {
    let groups = group(data, by);
    let rows = groups
        .into_iter()
        .map(|(key, members)| {
            let values = aggregations
                .iter()
                .map(|agg| {
                    let present: Vec<f64> =
                        members.iter().filter_map(|o| agg.column.value(o)).collect();
                    agg.stat
                        .apply(&present)
                        .map(|v| round_to(v, DISPLAY_DECIMALS))
                })
                .collect();
            AggregateRow { key, values }
        })
        .collect();
    AggregateTable {
        dimensions: by.to_vec(),
        aggregations: aggregations.to_vec(),
        rows,
    }
}

/// Unrounded mean of `column` per distinct value of `dim`, ascending by key.
pub fn group_means(data: &[Observation], dim: Dimension, column: Column) -> Vec<(String, Option<f64>)> {
    group(data, &[dim])
        .into_iter()
        .map(|(mut key, members)| {
            let present: Vec<f64> = members.iter().filter_map(|o| column.value(o)).collect();
            (key.remove(0), mean(&present))
        })
        .collect()
}

pub(crate) fn group<'a>(
    data: &'a [Observation],
    by: &[Dimension],
) -> BTreeMap<Vec<String>, Vec<&'a Observation>> {
    let mut map: BTreeMap<Vec<String>, Vec<&Observation>> = BTreeMap::new();
    for o in data {
        let key: Option<Vec<String>> = by.iter().map(|d| d.value(o).map(str::to_string)).collect();
        if let Some(key) = key {
            map.entry(key).or_default().push(o);
        }
    }
    map
}

/// `score / (cost + EFFICIENCY_GUARD)`, missing when either side is missing.
pub fn efficiency(score: Option<f64>, cost: Option<f64>) -> Option<f64> {
    let ratio = score? / (cost? + EFFICIENCY_GUARD);
    ratio.is_finite().then_some(ratio)
}

pub fn efficiency_co2(o: &Observation) -> Option<f64> {
    efficiency(o.score, o.co2_g)
}

pub fn efficiency_electricity(o: &Observation) -> Option<f64> {
    efficiency(o.score, o.electricity_wh)
}
