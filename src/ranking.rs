//! Composite model ranking and per-category multi-criteria profiles.
//!
//! Both normalize a metric by its maximum over the current view. When that
//! maximum is zero the metric carries no signal and every row gets the
//! normalized value 0.0, inverted axes included.

use crate::metrics::{group, group_means, Column, Dimension, DISPLAY_DECIMALS};
use crate::types::{display_value, Observation};
use crate::util::{max_present, mean, round_to};
use serde::Serialize;
use std::cmp::Ordering;
use tabled::Tabled;
use tracing::warn;

/// Normalized value used when a metric's maximum is zero.
pub const DEGENERATE_SENTINEL: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub performance: f64,
    pub co2_efficiency: f64,
    pub speed: f64,
}

/// The fixed weighting of the global score.
pub const GLOBAL_SCORE_WEIGHTS: ScoreWeights = ScoreWeights {
    performance: 0.4,
    co2_efficiency: 0.4,
    speed: 0.2,
};

/// Decimal places kept on the global score.
pub const GLOBAL_SCORE_DECIMALS: i32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ModelRanking {
    pub rank: usize,
    pub model: String,
    #[tabled(display_with = "display_value")]
    pub score: Option<f64>,
    #[tabled(display_with = "display_value")]
    pub co2_g: Option<f64>,
    #[tabled(display_with = "display_value")]
    pub electricity_wh: Option<f64>,
    #[tabled(display_with = "display_value")]
    pub time_sec: Option<f64>,
    #[tabled(display_with = "display_value")]
    pub efficiency_co2: Option<f64>,
    #[tabled(display_with = "display_value")]
    pub tokens: Option<f64>,
    #[tabled(display_with = "display_score")]
    pub global_score: Option<f64>,
}

fn display_score(v: &Option<f64>) -> String {
    crate::util::format_optional(*v, GLOBAL_SCORE_DECIMALS as usize)
}

/// `value / max`, with the zero-max sentinel. Missing when either is missing.
pub fn normalize_max(value: Option<f64>, max: Option<f64>) -> Option<f64> {
    let (value, max) = (value?, max?);
    if max == 0.0 {
        return Some(DEGENERATE_SENTINEL);
    }
    Some(value / max)
}

/// `1 - value / max`, with the zero-max sentinel.
pub fn normalize_max_inverted(value: Option<f64>, max: Option<f64>) -> Option<f64> {
    let (value, max) = (value?, max?);
    if max == 0.0 {
        return Some(DEGENERATE_SENTINEL);
    }
    Some(1.0 - value / max)
}

fn warn_if_degenerate(metric: &str, max: Option<f64>) {
    if max == Some(0.0) {
        warn!(metric, "maximum is zero, normalized values set to {DEGENERATE_SENTINEL}");
    }
}

/// Rank models by global score, best first.
///
/// Per-model means are rounded to two decimals before scoring. Equal scores
/// keep ascending model-name order; models without a score go last.
pub fn rank_models(data: &[Observation]) -> Vec<ModelRanking> {
    rank_models_with(data, GLOBAL_SCORE_WEIGHTS)
}

fn rank_models_with(data: &[Observation], weights: ScoreWeights) -> Vec<ModelRanking> {
    let rounded_mean = |members: &[&Observation], column: Column| {
        let present: Vec<f64> = members.iter().filter_map(|o| column.value(o)).collect();
        mean(&present).map(|v| round_to(v, DISPLAY_DECIMALS))
    };

    let mut rows: Vec<ModelRanking> = group(data, &[Dimension::Model])
        .into_iter()
        .map(|(mut key, members)| ModelRanking {
            rank: 0,
            model: key.remove(0),
            score: rounded_mean(&members, Column::Score),
            co2_g: rounded_mean(&members, Column::Co2G),
            electricity_wh: rounded_mean(&members, Column::ElectricityWh),
            time_sec: rounded_mean(&members, Column::TimeSec),
            efficiency_co2: rounded_mean(&members, Column::EfficiencyCo2),
            tokens: rounded_mean(&members, Column::Tokens),
            global_score: None,
        })
        .collect();

    let max_score = max_present(rows.iter().map(|r| r.score));
    let max_eff = max_present(rows.iter().map(|r| r.efficiency_co2));
    let max_time = max_present(rows.iter().map(|r| r.time_sec));
    warn_if_degenerate("score", max_score);
    warn_if_degenerate("efficiency_co2", max_eff);
    warn_if_degenerate("time_sec", max_time);

    for row in &mut rows {
        let perf = normalize_max(row.score, max_score);
        let eff = normalize_max(row.efficiency_co2, max_eff);
        let speed = normalize_max_inverted(row.time_sec, max_time);
        row.global_score = match (perf, eff, speed) {
            (Some(p), Some(e), Some(s)) => Some(round_to(
                weights.performance * p + weights.co2_efficiency * e + weights.speed * s,
                GLOBAL_SCORE_DECIMALS,
            )),
            _ => None,
        };
    }

    // Stable: ties keep the ascending model order from grouping.
    rows.sort_by(|a, b| match (a.global_score, b.global_score) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    for (idx, row) in rows.iter_mut().enumerate() {
        row.rank = idx + 1;
    }
    rows
}

/// Per model category, four criteria scaled so that higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct RadarProfile {
    pub model_category: String,
    #[tabled(display_with = "display_value")]
    pub performance: Option<f64>,
    #[tabled(display_with = "display_value")]
    pub co2_efficiency: Option<f64>,
    #[tabled(display_with = "display_value")]
    pub electricity_efficiency: Option<f64>,
    #[tabled(display_with = "display_value")]
    pub speed: Option<f64>,
}

/// Score is scaled by its maximum; CO2, electricity and time by
/// `1 - x / max` since lower is better for them.
pub fn radar_profiles(data: &[Observation]) -> Vec<RadarProfile> {
    let score = group_means(data, Dimension::ModelCategory, Column::Score);
    let co2 = group_means(data, Dimension::ModelCategory, Column::Co2G);
    let elec = group_means(data, Dimension::ModelCategory, Column::ElectricityWh);
    let time = group_means(data, Dimension::ModelCategory, Column::TimeSec);

    let max_of = |series: &[(String, Option<f64>)]| max_present(series.iter().map(|(_, v)| *v));
    let (max_score, max_co2, max_elec, max_time) =
        (max_of(&score), max_of(&co2), max_of(&elec), max_of(&time));
    warn_if_degenerate("score", max_score);
    warn_if_degenerate("co2_g", max_co2);
    warn_if_degenerate("electricity_wh", max_elec);
    warn_if_degenerate("time_sec", max_time);

    // All four series come from the same grouping, so they share key order.
    score
        .into_iter()
        .zip(co2)
        .zip(elec)
        .zip(time)
        .map(|((((category, s), (_, c)), (_, e)), (_, t))| RadarProfile {
            model_category: category,
            performance: normalize_max(s, max_score),
            co2_efficiency: normalize_max_inverted(c, max_co2),
            electricity_efficiency: normalize_max_inverted(e, max_elec),
            speed: normalize_max_inverted(t, max_time),
        })
        .collect()
}
