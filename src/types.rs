use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

/// Columns shared by both sides of a comparison row.
pub const SHARED_COLUMNS: [&str; 3] = ["question_id", "question_categorie", "categorie_model"];

/// Per-side columns; `{side}` is replaced by `A` or `B`.
pub const SIDE_COLUMNS: [&str; 7] = [
    "model {side}",
    "token {side}",
    "time {side} (sec)",
    "score {side}",
    "cost {side} (€)",
    "electricity {side} (wh)",
    "co2 {side} (g)",
];

/// Every header the wide comparison CSV must carry.
pub static REQUIRED_COLUMNS: Lazy<Vec<String>> = Lazy::new(|| {
    let mut cols: Vec<String> = SHARED_COLUMNS.iter().map(|c| c.to_string()).collect();
    for pos in ModelPosition::ALL {
        cols.extend(SIDE_COLUMNS.iter().map(|t| t.replace("{side}", pos.suffix())));
    }
    cols
});

/// One row of the wide comparison CSV, every cell kept as raw text.
#[derive(Debug, Default, Deserialize)]
pub struct RawRow {
    #[serde(rename = "question_id")]
    pub question_id: Option<String>,
    #[serde(rename = "question_categorie")]
    pub question_category: Option<String>,
    #[serde(rename = "categorie_model")]
    pub model_category: Option<String>,
    #[serde(rename = "model A")]
    pub model_a: Option<String>,
    #[serde(rename = "token A")]
    pub tokens_a: Option<String>,
    #[serde(rename = "time A (sec)")]
    pub time_a: Option<String>,
    #[serde(rename = "score A")]
    pub score_a: Option<String>,
    #[serde(rename = "cost A (€)")]
    pub cost_a: Option<String>,
    #[serde(rename = "electricity A (wh)")]
    pub electricity_a: Option<String>,
    #[serde(rename = "co2 A (g)")]
    pub co2_a: Option<String>,
    #[serde(rename = "model B")]
    pub model_b: Option<String>,
    #[serde(rename = "token B")]
    pub tokens_b: Option<String>,
    #[serde(rename = "time B (sec)")]
    pub time_b: Option<String>,
    #[serde(rename = "score B")]
    pub score_b: Option<String>,
    #[serde(rename = "cost B (€)")]
    pub cost_b: Option<String>,
    #[serde(rename = "electricity B (wh)")]
    pub electricity_b: Option<String>,
    #[serde(rename = "co2 B (g)")]
    pub co2_b: Option<String>,
}

/// The per-model half of a `RawRow`, with the suffix stripped.
#[derive(Debug, Clone, Copy)]
pub struct SideCells<'a> {
    pub model: Option<&'a str>,
    pub tokens: Option<&'a str>,
    pub time_sec: Option<&'a str>,
    pub score: Option<&'a str>,
    pub cost: Option<&'a str>,
    pub electricity_wh: Option<&'a str>,
    pub co2_g: Option<&'a str>,
}

impl RawRow {
    pub fn side(&self, pos: ModelPosition) -> SideCells<'_> {
        match pos {
            ModelPosition::A => SideCells {
                model: self.model_a.as_deref(),
                tokens: self.tokens_a.as_deref(),
                time_sec: self.time_a.as_deref(),
                score: self.score_a.as_deref(),
                cost: self.cost_a.as_deref(),
                electricity_wh: self.electricity_a.as_deref(),
                co2_g: self.co2_a.as_deref(),
            },
            ModelPosition::B => SideCells {
                model: self.model_b.as_deref(),
                tokens: self.tokens_b.as_deref(),
                time_sec: self.time_b.as_deref(),
                score: self.score_b.as_deref(),
                cost: self.cost_b.as_deref(),
                electricity_wh: self.electricity_b.as_deref(),
                co2_g: self.co2_b.as_deref(),
            },
        }
    }
}

/// Which side of the original comparison an observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ModelPosition {
    A,
    B,
}

impl ModelPosition {
    pub const ALL: [ModelPosition; 2] = [ModelPosition::A, ModelPosition::B];

    pub fn suffix(self) -> &'static str {
        match self {
            ModelPosition::A => "A",
            ModelPosition::B => "B",
        }
    }
}

impl fmt::Display for ModelPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// One model's measured outcome for one question.
///
/// Field order is the export column order.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct Observation {
    pub question_id: String,
    #[tabled(display_with = "display_text")]
    pub question_category: Option<String>,
    pub model_category: String,
    pub model: String,
    pub tokens: f64,
    #[tabled(display_with = "display_value")]
    pub time_sec: Option<f64>,
    #[tabled(display_with = "display_value")]
    pub score: Option<f64>,
    #[tabled(display_with = "display_text")]
    pub cost: Option<String>,
    #[tabled(display_with = "display_value")]
    pub electricity_wh: Option<f64>,
    #[tabled(display_with = "display_value")]
    pub co2_g: Option<f64>,
    pub model_position: ModelPosition,
}

fn display_text(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

pub(crate) fn display_value(v: &Option<f64>) -> String {
    match v {
        Some(x) => crate::util::format_number(*x, 2),
        None => "NaN".to_string(),
    }
}
