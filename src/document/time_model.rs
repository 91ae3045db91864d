//! Nominal (unscaled) timing derived from a document.
//!
//! Everything here is recomputed on demand from the read-only document; no
//! cached mutable state.

use super::model::Document;

/// Total nominal duration of a study: paragraph time (reading + embedded
/// questions), the review block, and the operator's introduction and
/// conclusion base values.
pub fn nominal_total_duration(doc: &Document, intro_seconds: u32, conclusion_seconds: u32) -> i64 {
    let paragraph_time: i64 = doc
        .paragraphs
        .iter()
        .map(|p| p.total_time_seconds as i64)
        .sum();
    let review_time: i64 = doc
        .final_questions
        .iter()
        .map(|q| q.answer_time as i64)
        .sum();
    paragraph_time + review_time + intro_seconds as i64 + conclusion_seconds as i64
}

/// Cumulative reading time (reading only, no question time) through the last
/// paragraph that carries at least one question. Falls back to the full
/// reading time when no paragraph has questions.
pub fn time_until_last_question(doc: &Document) -> i64 {
    let last_with_questions = doc
        .paragraphs
        .iter()
        .rposition(|p| !p.questions.is_empty());

    let upto = match last_with_questions {
        Some(index) => index + 1,
        None => doc.paragraphs.len(),
    };

    doc.paragraphs[..upto]
        .iter()
        .map(|p| p.reading_time_seconds as i64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::{Paragraph, Question};

    fn question(text: &str) -> Question {
        Question {
            text: text.into(),
            answer_time: 35,
            is_final_question: false,
            parenthesis_content: None,
            content_type: None,
        }
    }

    fn paragraph(number: u32, reading: u32, questions: Vec<Question>) -> Paragraph {
        let total = reading + 35 * questions.len() as u32;
        Paragraph {
            number,
            text: String::new(),
            word_count: 0,
            reading_time_seconds: reading,
            total_time_seconds: total,
            questions,
        }
    }

    fn doc(paragraphs: Vec<Paragraph>, final_questions: Vec<Question>) -> Document {
        Document {
            paragraphs,
            final_questions,
            total_paragraphs: 0,
            total_words: 0,
            total_questions: 0,
            total_reading_time_seconds: 0,
            total_question_time_seconds: 0,
            total_time_seconds: 0,
            final_questions_start_time: 0,
        }
    }

    #[test]
    fn nominal_total_sums_paragraphs_review_and_bookends() {
        // Three paragraphs of 60s total each, no questions anywhere.
        let d = doc(
            (1..=3).map(|n| paragraph(n, 60, vec![])).collect(),
            vec![],
        );
        assert_eq!(nominal_total_duration(&d, 60, 60), 300);
    }

    #[test]
    fn nominal_total_counts_each_final_question() {
        let d = doc(
            vec![paragraph(1, 40, vec![question("a")])],
            vec![question("r1"), question("r2")],
        );
        // 40 + 35 embedded + 70 review + 120 bookends
        assert_eq!(nominal_total_duration(&d, 60, 60), 265);
    }

    #[test]
    fn time_until_last_question_stops_at_last_questioned_paragraph() {
        let d = doc(
            vec![
                paragraph(1, 30, vec![question("a")]),
                paragraph(2, 40, vec![]),
                paragraph(3, 50, vec![question("b")]),
                paragraph(4, 60, vec![]),
            ],
            vec![],
        );
        assert_eq!(time_until_last_question(&d), 30 + 40 + 50);
    }

    #[test]
    fn time_until_last_question_falls_back_to_total_reading_time() {
        let d = doc(
            vec![paragraph(1, 30, vec![]), paragraph(2, 40, vec![])],
            vec![],
        );
        assert_eq!(time_until_last_question(&d), 70);
    }
}
