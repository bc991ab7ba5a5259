use crate::metrics::Dimension;
use crate::types::Observation;
use std::collections::BTreeSet;

/// The selection an outer UI hands to the engine.
///
/// An empty set selects nothing. Defaulting to "everything" is the caller's
/// policy; [`FilterSpec::select_all`] builds that default explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub question_categories: BTreeSet<String>,
    /// Keep observations whose question category is missing.
    pub include_missing_question_category: bool,
    pub model_categories: BTreeSet<String>,
    pub models: BTreeSet<String>,
    pub min_score: f64,
}

impl FilterSpec {
    /// Select every value present in `data` on all three dimensions.
    pub fn select_all(data: &[Observation], min_score: f64) -> Self {
        FilterSpec {
            question_categories: distinct(data, Dimension::QuestionCategory).into_iter().collect(),
            include_missing_question_category: true,
            model_categories: distinct(data, Dimension::ModelCategory).into_iter().collect(),
            models: distinct(data, Dimension::Model).into_iter().collect(),
            min_score,
        }
    }

    /// A missing score never passes the threshold, whatever its value.
    pub fn matches(&self, o: &Observation) -> bool {
        o.question_category
            .as_ref()
            .map_or(self.include_missing_question_category, |q| {
                self.question_categories.contains(q)
            })
            && self.model_categories.contains(&o.model_category)
            && self.models.contains(&o.model)
            && o.score.is_some_and(|s| s >= self.min_score)
    }
}

/// Rows of `data` that satisfy `spec`, in input order. `data` is untouched.
pub fn filter(data: &[Observation], spec: &FilterSpec) -> Vec<Observation> {
    data.iter().filter(|o| spec.matches(o)).cloned().collect()
}

/// Distinct values of `dim` in order of first appearance.
pub fn distinct(data: &[Observation], dim: Dimension) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for o in data {
        if let Some(v) = dim.value(o) {
            if seen.insert(v) {
                out.push(v.to_string());
            }
        }
    }
    out
}
