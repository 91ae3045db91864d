use serde::{Deserialize, Serialize};

/// The segment currently being delivered.
///
/// A closed set so transitions stay exhaustively checkable; indices are
/// 0-based positions into the document's paragraphs / review questions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "index", rename_all = "camelCase")]
pub enum StudyPhase {
    Introduction,
    Paragraph(usize),
    Review(usize),
    Conclusion,
    Finished,
}

impl StudyPhase {
    /// Next segment in delivery order. Saturates at `Finished`; the review
    /// block is skipped entirely when the document has no final questions.
    pub fn advance(self, paragraph_count: usize, final_question_count: usize) -> StudyPhase {
        use StudyPhase::*;
        match self {
            Introduction => {
                if paragraph_count > 0 {
                    Paragraph(0)
                } else if final_question_count > 0 {
                    Review(0)
                } else {
                    Conclusion
                }
            }
            Paragraph(i) => {
                if i + 1 < paragraph_count {
                    Paragraph(i + 1)
                } else if final_question_count > 0 {
                    Review(0)
                } else {
                    Conclusion
                }
            }
            Review(j) => {
                if j + 1 < final_question_count {
                    Review(j + 1)
                } else {
                    Conclusion
                }
            }
            Conclusion => Finished,
            Finished => Finished,
        }
    }

    /// Exact inverse of [`StudyPhase::advance`]; saturates at `Introduction`.
    pub fn retreat(self, paragraph_count: usize, final_question_count: usize) -> StudyPhase {
        use StudyPhase::*;
        match self {
            Introduction => Introduction,
            Paragraph(0) => Introduction,
            Paragraph(i) => Paragraph(i - 1),
            Review(0) => {
                if paragraph_count > 0 {
                    Paragraph(paragraph_count - 1)
                } else {
                    Introduction
                }
            }
            Review(j) => Review(j - 1),
            Conclusion => {
                if final_question_count > 0 {
                    Review(final_question_count - 1)
                } else if paragraph_count > 0 {
                    Paragraph(paragraph_count - 1)
                } else {
                    Introduction
                }
            }
            Finished => Conclusion,
        }
    }

    /// First undelivered paragraph index, the budget calculator's position
    /// parameter. Past the paragraphs this is the paragraph count.
    pub fn current_paragraph_index(self, paragraph_count: usize) -> usize {
        match self {
            StudyPhase::Introduction => 0,
            StudyPhase::Paragraph(i) => i.min(paragraph_count),
            StudyPhase::Review(_) | StudyPhase::Conclusion | StudyPhase::Finished => {
                paragraph_count
            }
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, StudyPhase::Finished)
    }

    pub fn label(self) -> &'static str {
        match self {
            StudyPhase::Introduction => "introduction",
            StudyPhase::Paragraph(_) => "paragraph",
            StudyPhase::Review(_) => "review",
            StudyPhase::Conclusion => "conclusion",
            StudyPhase::Finished => "finished",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StudyPhase::*;

    #[test]
    fn full_forward_walk() {
        let mut phase = Introduction;
        let walk = [
            Paragraph(0),
            Paragraph(1),
            Review(0),
            Review(1),
            Conclusion,
            Finished,
            Finished, // saturates
        ];
        for expected in walk {
            phase = phase.advance(2, 2);
            assert_eq!(phase, expected);
        }
    }

    #[test]
    fn review_is_skipped_without_final_questions() {
        assert_eq!(Paragraph(1).advance(2, 0), Conclusion);
        assert_eq!(Conclusion.retreat(2, 0), Paragraph(1));
    }

    #[test]
    fn retreat_mirrors_advance() {
        // Any number of advances followed by the same number of retreats
        // returns to the start, as long as the walk stays off the
        // Introduction boundary.
        for steps in 1..=6 {
            let mut phase = Introduction;
            for _ in 0..steps {
                phase = phase.advance(3, 2);
            }
            for _ in 0..steps {
                phase = phase.retreat(3, 2);
            }
            assert_eq!(phase, Introduction);
        }
    }

    #[test]
    fn retreat_saturates_at_introduction() {
        assert_eq!(Introduction.retreat(3, 2), Introduction);
    }

    #[test]
    fn empty_document_goes_straight_to_conclusion() {
        assert_eq!(Introduction.advance(0, 0), Conclusion);
        assert_eq!(Conclusion.retreat(0, 0), Introduction);
    }

    #[test]
    fn budget_position_tracks_the_phase() {
        assert_eq!(Introduction.current_paragraph_index(3), 0);
        assert_eq!(Paragraph(2).current_paragraph_index(3), 2);
        assert_eq!(Review(0).current_paragraph_index(3), 3);
        assert_eq!(Finished.current_paragraph_index(3), 3);
    }
}
