//! Proportional time scaling.
//!
//! One factor maps the document's nominal total onto the operator-chosen
//! total. The factor depends only on (document, operator total) and never on
//! playback position; the live rebalancing lives in [`super::budget`].

use serde::{Deserialize, Serialize};

use crate::config::StudyConfig;
use crate::document::model::Document;
use crate::document::time_model::nominal_total_duration;

pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 2.0;

/// Ratio of operator total to nominal total, clamped to [0.5, 2.0].
/// A zero nominal total yields 1.0 rather than a division by zero.
pub fn scale_factor(nominal_total_seconds: i64, operator_total_seconds: i64) -> f64 {
    if nominal_total_seconds == 0 {
        return 1.0;
    }
    let ratio = operator_total_seconds as f64 / nominal_total_seconds as f64;
    ratio.clamp(MIN_SCALE, MAX_SCALE)
}

/// Applies the factor to a nominal duration, rounding to whole seconds.
pub fn scale_seconds(nominal_seconds: u32, factor: f64) -> i64 {
    (nominal_seconds as f64 * factor).round() as i64
}

/// The fixed scaling decisions for one (document, config) pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScalePlan {
    pub factor: f64,
    pub nominal_total_seconds: i64,
    pub operator_total_seconds: i64,
    pub introduction_seconds: i64,
    pub conclusion_seconds: i64,
}

impl ScalePlan {
    pub fn new(doc: &Document, config: &StudyConfig) -> Self {
        let nominal =
            nominal_total_duration(doc, config.introduction_seconds, config.conclusion_seconds);
        let operator = config.total_seconds();
        let factor = scale_factor(nominal, operator);
        Self {
            factor,
            nominal_total_seconds: nominal,
            operator_total_seconds: operator,
            introduction_seconds: scale_seconds(config.introduction_seconds, factor),
            conclusion_seconds: scale_seconds(config.conclusion_seconds, factor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::Paragraph;

    fn doc_with_totals(paragraph_totals: &[u32]) -> Document {
        Document {
            paragraphs: paragraph_totals
                .iter()
                .enumerate()
                .map(|(i, total)| Paragraph {
                    number: i as u32 + 1,
                    text: String::new(),
                    word_count: 0,
                    reading_time_seconds: *total,
                    total_time_seconds: *total,
                    questions: vec![],
                })
                .collect(),
            final_questions: vec![],
            total_paragraphs: paragraph_totals.len() as u32,
            total_words: 0,
            total_questions: 0,
            total_reading_time_seconds: 0,
            total_question_time_seconds: 0,
            total_time_seconds: 0,
            final_questions_start_time: 0,
        }
    }

    #[test]
    fn factor_is_plain_ratio_inside_bounds() {
        assert_eq!(scale_factor(300, 180), 0.6);
        assert_eq!(scale_factor(1800, 2700), 1.5);
    }

    #[test]
    fn factor_clamps_to_bounds() {
        assert_eq!(scale_factor(1000, 100), MIN_SCALE);
        assert_eq!(scale_factor(100, 1000), MAX_SCALE);
    }

    #[test]
    fn zero_nominal_guards_division() {
        assert_eq!(scale_factor(0, 999), 1.0);
        assert_eq!(scale_factor(0, 0), 1.0);
    }

    #[test]
    fn plan_scales_three_minute_document_to_point_six() {
        // Nominal: 3x60 + 60 intro + 60 conclusion = 300s, operator asks 180s.
        let doc = doc_with_totals(&[60, 60, 60]);
        let config = StudyConfig {
            total_duration_minutes: 3,
            ..StudyConfig::default()
        };
        // Bypasses sanitized() on purpose: the clamp range is an input
        // concern, the math has to hold for any validated value.
        let plan = ScalePlan::new(&doc, &config);
        assert_eq!(plan.nominal_total_seconds, 300);
        assert_eq!(plan.factor, 0.6);
        assert_eq!(scale_seconds(60, plan.factor), 36);
        assert_eq!(plan.introduction_seconds, 36);
        assert_eq!(plan.conclusion_seconds, 36);
    }
}
