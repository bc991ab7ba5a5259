use crate::metrics::{
    aggregate, efficiency_co2, group_means, AggregateTable, Aggregation, Column, Dimension, Stat,
};
use crate::ranking::ModelRanking;
use crate::types::{display_value, Observation};
use crate::util::{mean, round_to};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tabled::Tabled;

/// Length of the top-N lists.
pub const TOP_N: usize = 10;

/// Statistic set of the per-category summaries.
pub const CATEGORY_SUMMARY: [Aggregation; 9] = [
    Aggregation::new(Column::Score, Stat::Mean),
    Aggregation::new(Column::Score, Stat::Std),
    Aggregation::new(Column::Co2G, Stat::Mean),
    Aggregation::new(Column::Co2G, Stat::Sum),
    Aggregation::new(Column::ElectricityWh, Stat::Mean),
    Aggregation::new(Column::ElectricityWh, Stat::Sum),
    Aggregation::new(Column::TimeSec, Stat::Mean),
    Aggregation::new(Column::TimeSec, Stat::Std),
    Aggregation::new(Column::Tokens, Stat::Mean),
];

pub const QUESTION_SUMMARY: [Aggregation; 5] = [
    Aggregation::new(Column::Score, Stat::Mean),
    Aggregation::new(Column::Co2G, Stat::Mean),
    Aggregation::new(Column::ElectricityWh, Stat::Mean),
    Aggregation::new(Column::TimeSec, Stat::Mean),
    Aggregation::new(Column::Tokens, Stat::Mean),
];

pub const QUESTION_DETAIL: [Aggregation; 5] = [
    Aggregation::new(Column::Score, Stat::Mean),
    Aggregation::new(Column::Score, Stat::Count),
    Aggregation::new(Column::Co2G, Stat::Mean),
    Aggregation::new(Column::ElectricityWh, Stat::Mean),
    Aggregation::new(Column::TimeSec, Stat::Mean),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub observations: usize,
    pub models: usize,
    pub mean_score: Option<f64>,
    pub total_electricity_wh: f64,
    pub total_co2_g: f64,
}

pub fn overview(data: &[Observation]) -> Overview {
    let models: BTreeSet<&str> = data.iter().map(|o| o.model.as_str()).collect();
    let scores: Vec<f64> = data.iter().filter_map(|o| o.score).collect();
    Overview {
        observations: data.len(),
        models: models.len(),
        mean_score: mean(&scores),
        total_electricity_wh: data.iter().filter_map(|o| o.electricity_wh).sum(),
        total_co2_g: data.iter().filter_map(|o| o.co2_g).sum(),
    }
}

/// Models inside each model category.
pub fn model_category_detail(data: &[Observation]) -> AggregateTable {
    aggregate(data, &[Dimension::ModelCategory, Dimension::Model], &CATEGORY_SUMMARY)
}

/// Model categories side by side.
pub fn category_comparison(data: &[Observation]) -> AggregateTable {
    aggregate(data, &[Dimension::ModelCategory], &CATEGORY_SUMMARY)
}

/// Question types side by side.
pub fn question_comparison(data: &[Observation]) -> AggregateTable {
    aggregate(data, &[Dimension::QuestionCategory], &QUESTION_SUMMARY)
}

/// Models within each question type.
pub fn question_detail(data: &[Observation]) -> AggregateTable {
    aggregate(
        data,
        &[Dimension::QuestionCategory, Dimension::Model, Dimension::ModelCategory],
        &QUESTION_DETAIL,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Highest,
    Lowest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct TopEntry {
    pub model: String,
    #[tabled(display_with = "display_value")]
    pub value: Option<f64>,
}

/// The `n` models with the highest (or lowest) mean `column`.
///
/// Models with no value for `column` are left out; ties keep model order.
pub fn top_models(data: &[Observation], column: Column, direction: Direction, n: usize) -> Vec<TopEntry> {
    let mut means: Vec<(String, f64)> = group_means(data, Dimension::Model, column)
        .into_iter()
        .filter_map(|(m, v)| v.map(|v| (m, v)))
        .collect();
    means.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
        match direction {
            Direction::Highest => ord.reverse(),
            Direction::Lowest => ord,
        }
    });
    means
        .into_iter()
        .take(n)
        .map(|(model, v)| TopEntry {
            model,
            value: Some(round_to(v, 2)),
        })
        .collect()
}

/// One observation singled out for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    pub model: String,
    pub question_id: String,
    pub score: Option<f64>,
    pub co2_g: Option<f64>,
    pub efficiency_co2: Option<f64>,
}

impl Highlight {
    fn of(o: &Observation) -> Self {
        Highlight {
            model: o.model.clone(),
            question_id: o.question_id.clone(),
            score: o.score,
            co2_g: o.co2_g,
            efficiency_co2: efficiency_co2(o),
        }
    }
}

/// First observation holding the maximum of `key`.
fn first_max_by<F>(data: &[Observation], key: F) -> Option<&Observation>
where
    F: Fn(&Observation) -> Option<f64>,
{
    let mut best: Option<(&Observation, f64)> = None;
    for o in data {
        if let Some(v) = key(o) {
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((o, v)),
            }
        }
    }
    best.map(|(o, _)| o)
}

/// Observation with the best score per gram of CO2.
pub fn efficiency_champion(data: &[Observation]) -> Option<Highlight> {
    first_max_by(data, efficiency_co2).map(Highlight::of)
}

/// Observation with the largest CO2 footprint.
pub fn highest_impact(data: &[Observation]) -> Option<Highlight> {
    first_max_by(data, |o| o.co2_g).map(Highlight::of)
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub generated_at: DateTime<Utc>,
    pub overview: Overview,
    pub leader: Option<ModelRanking>,
    pub efficiency_champion: Option<Highlight>,
    pub highest_impact: Option<Highlight>,
}

pub fn generate_summary(data: &[Observation], ranking: &[ModelRanking]) -> SummaryStats {
    SummaryStats {
        generated_at: Utc::now(),
        overview: overview(data),
        leader: ranking.first().cloned(),
        efficiency_champion: efficiency_champion(data),
        highest_impact: highest_impact(data),
    }
}
