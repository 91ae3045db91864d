//! Live re-budgeting of the remaining study time.
//!
//! Given the first undelivered paragraph and the clock's remaining time, the
//! calculator splits whatever is left after scaled reading time equally
//! across every undelivered question, then lays out projected wall-clock
//! windows for each segment. Nothing is accumulated between calls; each
//! recomputation starts from position and remaining time alone.
//!
//! Two projections coexist on purpose. Paragraphs already delivered keep the
//! scale-only schedule anchored at the original study start; the active and
//! future segments are re-projected from `now`. History is not renegotiated.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::document::model::Document;
use crate::schedule::scale::scale_seconds;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SegmentProgress {
    Completed,
    Current,
    Upcoming,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphWindow {
    pub number: u32,
    pub progress: SegmentProgress,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub duration_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWindow {
    pub starts_at: DateTime<Utc>,
    pub per_question_seconds: i64,
    /// Projected start of each review question, in delivery order.
    pub question_starts: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBudget {
    pub scale_factor: f64,
    pub scaled_reading_seconds: i64,
    pub remaining_question_count: usize,
    pub time_for_all_questions: i64,
    pub per_question_seconds: i64,
    pub paragraphs: Vec<ParagraphWindow>,
    pub review: ReviewWindow,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct BudgetInputs<'a> {
    pub document: &'a Document,
    /// Index of the first paragraph not yet delivered; pass
    /// `document.paragraph_count()` once past the paragraphs.
    pub current_paragraph: usize,
    /// Signed remaining study time; negative means overtime.
    pub remaining_seconds: i64,
    pub scale_factor: f64,
    /// Fallback per-question nominal time when no questions remain.
    pub nominal_answer_seconds: u32,
    pub study_started_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

pub fn compute(inputs: &BudgetInputs) -> ScheduleBudget {
    let doc = inputs.document;
    let factor = inputs.scale_factor;
    let current = inputs.current_paragraph.min(doc.paragraph_count());

    let scaled_reading_seconds: i64 = doc.paragraphs[current..]
        .iter()
        .map(|p| scale_seconds(p.reading_time_seconds, factor))
        .sum();

    let embedded_remaining = doc.paragraph_questions_from(current);
    let remaining_question_count = embedded_remaining + doc.final_question_count();

    let time_for_all_questions = (inputs.remaining_seconds - scaled_reading_seconds).max(0);
    let per_question_seconds = if remaining_question_count > 0 {
        (time_for_all_questions as f64 / remaining_question_count as f64).round() as i64
    } else {
        scale_seconds(inputs.nominal_answer_seconds, factor)
    };

    let mut paragraphs = Vec::with_capacity(doc.paragraph_count());

    // Delivered prefix: scale-only projection from the original start.
    let mut static_offset: i64 = 0;
    for p in &doc.paragraphs[..current] {
        let duration = scale_seconds(p.total_time_seconds, factor);
        let starts_at = inputs.study_started_at + Duration::seconds(static_offset);
        paragraphs.push(ParagraphWindow {
            number: p.number,
            progress: SegmentProgress::Completed,
            starts_at,
            ends_at: starts_at + Duration::seconds(duration),
            duration_seconds: duration,
        });
        static_offset += duration;
    }

    // Active and future paragraphs: re-projected from now with the adjusted
    // per-question split.
    let mut live_offset: i64 = 0;
    for (i, p) in doc.paragraphs.iter().enumerate().skip(current) {
        let duration = scale_seconds(p.reading_time_seconds, factor)
            + p.question_count() as i64 * per_question_seconds;
        let starts_at = inputs.now + Duration::seconds(live_offset);
        paragraphs.push(ParagraphWindow {
            number: p.number,
            progress: if i == current {
                SegmentProgress::Current
            } else {
                SegmentProgress::Upcoming
            },
            starts_at,
            ends_at: starts_at + Duration::seconds(duration),
            duration_seconds: duration,
        });
        live_offset += duration;
    }

    let review_offset = scaled_reading_seconds + embedded_remaining as i64 * per_question_seconds;
    let review_starts = inputs.now + Duration::seconds(review_offset);
    let question_starts = (0..doc.final_question_count())
        .map(|j| review_starts + Duration::seconds(j as i64 * per_question_seconds))
        .collect();

    ScheduleBudget {
        scale_factor: factor,
        scaled_reading_seconds,
        remaining_question_count,
        time_for_all_questions,
        per_question_seconds,
        paragraphs,
        review: ReviewWindow {
            starts_at: review_starts,
            per_question_seconds,
            question_starts,
        },
        computed_at: inputs.now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::{Paragraph, Question};
    use chrono::TimeZone;

    fn question() -> Question {
        Question {
            text: "?".into(),
            answer_time: 35,
            is_final_question: false,
            parenthesis_content: None,
            content_type: None,
        }
    }

    fn paragraph(number: u32, reading: u32, question_count: usize) -> Paragraph {
        Paragraph {
            number,
            text: String::new(),
            word_count: 0,
            reading_time_seconds: reading,
            total_time_seconds: reading + 35 * question_count as u32,
            questions: (0..question_count).map(|_| question()).collect(),
        }
    }

    fn doc(paragraphs: Vec<Paragraph>, final_count: usize) -> Document {
        Document {
            paragraphs,
            final_questions: (0..final_count)
                .map(|_| Question {
                    is_final_question: true,
                    ..question()
                })
                .collect(),
            total_paragraphs: 0,
            total_words: 0,
            total_questions: 0,
            total_reading_time_seconds: 0,
            total_question_time_seconds: 0,
            total_time_seconds: 0,
            final_questions_start_time: 0,
        }
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    fn inputs<'a>(
        document: &'a Document,
        current_paragraph: usize,
        remaining_seconds: i64,
    ) -> BudgetInputs<'a> {
        BudgetInputs {
            document,
            current_paragraph,
            remaining_seconds,
            scale_factor: 1.0,
            nominal_answer_seconds: 35,
            study_started_at: at(0),
            now: at(600),
        }
    }

    #[test]
    fn equal_split_of_time_left_after_reading() {
        // Two paragraphs (40s + 50s reading, one question each), two review
        // questions, 200s on the clock.
        let d = doc(vec![paragraph(1, 40, 1), paragraph(2, 50, 1)], 2);
        let budget = compute(&inputs(&d, 0, 200));

        assert_eq!(budget.scaled_reading_seconds, 90);
        assert_eq!(budget.remaining_question_count, 4);
        assert_eq!(budget.time_for_all_questions, 110);
        assert_eq!(budget.per_question_seconds, 28);
    }

    #[test]
    fn overtime_drives_question_time_to_zero() {
        let d = doc(vec![paragraph(1, 40, 1), paragraph(2, 50, 1)], 2);
        let budget = compute(&inputs(&d, 0, 50));

        assert_eq!(budget.time_for_all_questions, 0);
        assert_eq!(budget.per_question_seconds, 0);
        // Windows collapse to reading time only, never below zero.
        for window in &budget.paragraphs {
            assert!(window.duration_seconds >= 0);
        }
    }

    #[test]
    fn negative_remaining_is_floored_not_propagated() {
        let d = doc(vec![paragraph(1, 40, 2)], 1);
        let budget = compute(&inputs(&d, 0, -120));

        assert_eq!(budget.time_for_all_questions, 0);
        assert_eq!(budget.per_question_seconds, 0);
        assert!(budget.scaled_reading_seconds >= 0);
    }

    #[test]
    fn no_remaining_questions_falls_back_to_scaled_nominal() {
        let d = doc(vec![paragraph(1, 40, 0), paragraph(2, 50, 0)], 0);
        let mut i = inputs(&d, 0, 300);
        i.scale_factor = 0.6;
        let budget = compute(&i);

        assert_eq!(budget.remaining_question_count, 0);
        assert_eq!(budget.per_question_seconds, 21); // round(35 * 0.6)
    }

    #[test]
    fn live_windows_chain_from_now() {
        let d = doc(vec![paragraph(1, 40, 1), paragraph(2, 50, 1)], 2);
        let budget = compute(&inputs(&d, 0, 200));

        let first = &budget.paragraphs[0];
        let second = &budget.paragraphs[1];
        assert_eq!(first.progress, SegmentProgress::Current);
        assert_eq!(second.progress, SegmentProgress::Upcoming);
        assert_eq!(first.starts_at, at(600));
        assert_eq!(first.duration_seconds, 40 + 28);
        assert_eq!(second.starts_at, first.ends_at);
        assert_eq!(second.duration_seconds, 50 + 28);
        // Review block picks up where the last paragraph window ends.
        assert_eq!(budget.review.starts_at, second.ends_at);
        assert_eq!(budget.review.question_starts.len(), 2);
        assert_eq!(
            budget.review.question_starts[1] - budget.review.question_starts[0],
            Duration::seconds(28)
        );
    }

    #[test]
    fn completed_paragraphs_use_static_scaled_projection() {
        let d = doc(vec![paragraph(1, 40, 1), paragraph(2, 50, 1)], 0);
        let mut i = inputs(&d, 1, 20); // heavily behind schedule
        i.scale_factor = 1.0;
        let budget = compute(&i);

        let done = &budget.paragraphs[0];
        assert_eq!(done.progress, SegmentProgress::Completed);
        // Anchored at the original start with the scale-only duration,
        // untouched by the collapsed live budget.
        assert_eq!(done.starts_at, at(0));
        assert_eq!(done.duration_seconds, 75);
        assert_eq!(done.ends_at, at(75));

        let live = &budget.paragraphs[1];
        assert_eq!(live.progress, SegmentProgress::Current);
        assert_eq!(live.starts_at, at(600));
    }

    #[test]
    fn past_the_paragraphs_only_review_questions_share_time() {
        let d = doc(vec![paragraph(1, 40, 1), paragraph(2, 50, 1)], 3);
        let budget = compute(&inputs(&d, d.paragraph_count(), 90));

        assert_eq!(budget.scaled_reading_seconds, 0);
        assert_eq!(budget.remaining_question_count, 3);
        assert_eq!(budget.per_question_seconds, 30);
        assert!(budget
            .paragraphs
            .iter()
            .all(|w| w.progress == SegmentProgress::Completed));
        assert_eq!(budget.review.starts_at, at(600));
    }

    #[test]
    fn every_undelivered_question_gets_the_same_slice() {
        let d = doc(
            vec![paragraph(1, 30, 2), paragraph(2, 30, 1), paragraph(3, 30, 0)],
            2,
        );
        let budget = compute(&inputs(&d, 1, 400));

        // Undelivered: 1 embedded question + 2 review questions.
        assert_eq!(budget.remaining_question_count, 3);
        let per = budget.per_question_seconds;
        // Paragraph windows price their questions at exactly `per`.
        assert_eq!(budget.paragraphs[1].duration_seconds, 30 + per);
        assert_eq!(budget.paragraphs[2].duration_seconds, 30);
        assert_eq!(
            budget.review.question_starts[1] - budget.review.question_starts[0],
            Duration::seconds(per)
        );
    }
}
