//! Questions, answers and grading for assessments and surveys.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::rating::MAX_SCORE;

/// Lowest star answer. Zero is not a star: rating lists use it for "not
/// rated yet", so a star answer is always `MIN_STARS..=MAX_SCORE`.
pub const MIN_STARS: i32 = 1;

/// Default pass mark for assessments, in percent.
pub const DEFAULT_PASS_MARK: i32 = 70;

/// Question type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    StarRating,
    MultipleChoice,
    Text,
}

/// One entry of an assessment's or survey's `questions` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
    /// Index into `options` of the correct choice. Only meaningful for
    /// graded multiple-choice questions.
    #[serde(default)]
    pub correct_option: Option<usize>,
}

/// One submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub value: serde_json::Value,
}

/// Outcome of grading an attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grade {
    pub correct: i32,
    pub gradable: i32,
    /// Percentage of gradable questions answered correctly; `None` when
    /// nothing is gradable (surveys).
    pub score: Option<f64>,
    pub passed: Option<bool>,
}

/// Validate a question list.
pub fn validate_questions(questions: &[Question]) -> Result<(), CoreError> {
    let mut ids = HashSet::new();
    for q in questions {
        if q.id.trim().is_empty() {
            return Err(CoreError::Validation("Question id must not be empty".into()));
        }
        if !ids.insert(q.id.as_str()) {
            return Err(CoreError::Validation(format!(
                "Duplicate question id '{}'",
                q.id
            )));
        }
        if q.text.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "Question '{}' has no text",
                q.id
            )));
        }
        if q.kind == QuestionKind::MultipleChoice {
            if q.options.len() < 2 {
                return Err(CoreError::Validation(format!(
                    "Multiple-choice question '{}' needs at least two options",
                    q.id
                )));
            }
            if q.correct_option.is_some_and(|i| i >= q.options.len()) {
                return Err(CoreError::Validation(format!(
                    "Question '{}' marks a correct option that does not exist",
                    q.id
                )));
            }
        }
    }
    Ok(())
}

/// Validate a pass mark percentage.
pub fn validate_pass_mark(pass_mark: i32) -> Result<(), CoreError> {
    if !(0..=100).contains(&pass_mark) {
        return Err(CoreError::Validation(format!(
            "Pass mark must be between 0 and 100, got {pass_mark}"
        )));
    }
    Ok(())
}

/// Star value of an answer, if it is a number from 1 to 5.
pub fn star_value(answer: &Answer) -> Option<f64> {
    answer
        .value
        .as_f64()
        .filter(|v| (f64::from(MIN_STARS)..=f64::from(MAX_SCORE)).contains(v))
}

/// Validate answers against the questions they reference.
pub fn validate_answers(questions: &[Question], answers: &[Answer]) -> Result<(), CoreError> {
    let mut answered = HashSet::new();
    for answer in answers {
        let question = questions
            .iter()
            .find(|q| q.id == answer.question_id)
            .ok_or_else(|| {
                CoreError::Validation(format!("Unknown question '{}'", answer.question_id))
            })?;

        if !answered.insert(answer.question_id.as_str()) {
            return Err(CoreError::Validation(format!(
                "Question '{}' answered twice",
                answer.question_id
            )));
        }

        let valid = match question.kind {
            QuestionKind::StarRating => star_value(answer).is_some(),
            QuestionKind::MultipleChoice => answer
                .value
                .as_u64()
                .is_some_and(|i| (i as usize) < question.options.len()),
            QuestionKind::Text => answer.value.is_string(),
        };
        if !valid {
            return Err(CoreError::Validation(format!(
                "Invalid answer for question '{}'",
                question.id
            )));
        }
    }
    Ok(())
}

/// Grade an attempt: multiple-choice questions with a `correct_option` count.
pub fn grade(questions: &[Question], answers: &[Answer], pass_mark: i32) -> Grade {
    let mut correct = 0;
    let mut gradable = 0;

    for q in questions {
        let (QuestionKind::MultipleChoice, Some(expected)) = (q.kind, q.correct_option) else {
            continue;
        };
        gradable += 1;
        let chosen = answers
            .iter()
            .find(|a| a.question_id == q.id)
            .and_then(|a| a.value.as_u64());
        if chosen == Some(expected as u64) {
            correct += 1;
        }
    }

    let score = (gradable > 0).then(|| f64::from(correct) * 100.0 / f64::from(gradable));
    Grade {
        correct,
        gradable,
        score,
        passed: score.map(|s| s >= f64::from(pass_mark)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mc(id: &str, correct: Option<usize>) -> Question {
        Question {
            id: id.to_string(),
            text: format!("Question {id}"),
            kind: QuestionKind::MultipleChoice,
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_option: correct,
        }
    }

    fn star(id: &str) -> Question {
        Question {
            id: id.to_string(),
            text: "How was it?".to_string(),
            kind: QuestionKind::StarRating,
            options: vec![],
            correct_option: None,
        }
    }

    fn answer(question_id: &str, value: serde_json::Value) -> Answer {
        Answer {
            question_id: question_id.to_string(),
            value,
        }
    }

    #[test]
    fn question_kind_uses_screaming_case() {
        assert_eq!(
            serde_json::to_value(QuestionKind::StarRating).unwrap(),
            json!("STAR_RATING")
        );
    }

    #[test]
    fn duplicate_ids_rejected() {
        assert!(validate_questions(&[mc("q1", Some(0)), star("q1")]).is_err());
        assert!(validate_questions(&[mc("q1", Some(0)), star("q2")]).is_ok());
    }

    #[test]
    fn correct_option_must_exist() {
        assert!(validate_questions(&[mc("q1", Some(3))]).is_err());
    }

    #[test]
    fn answers_checked_by_kind() {
        let questions = vec![mc("q1", Some(1)), star("q2")];
        assert!(validate_answers(&questions, &[answer("q1", json!(2)), answer("q2", json!(4))]).is_ok());
        assert!(validate_answers(&questions, &[answer("q1", json!(3))]).is_err());
        assert!(validate_answers(&questions, &[answer("q2", json!(6))]).is_err());
        assert!(validate_answers(&questions, &[answer("q2", json!(0))]).is_err());
        assert!(validate_answers(&questions, &[answer("q2", json!(1))]).is_ok());
        assert!(validate_answers(&questions, &[answer("zz", json!(1))]).is_err());
        assert!(validate_answers(
            &questions,
            &[answer("q2", json!(4)), answer("q2", json!(5))]
        )
        .is_err());
    }

    #[test]
    fn grading_counts_correct_choices() {
        let questions = vec![mc("q1", Some(1)), mc("q2", Some(0)), star("q3")];
        let grade = grade(
            &questions,
            &[answer("q1", json!(1)), answer("q2", json!(2)), answer("q3", json!(5))],
            50,
        );
        assert_eq!(grade.correct, 1);
        assert_eq!(grade.gradable, 2);
        assert_eq!(grade.score, Some(50.0));
        assert_eq!(grade.passed, Some(true));
    }

    #[test]
    fn survey_has_no_grade() {
        let grade = grade(&[star("q1")], &[answer("q1", json!(3))], DEFAULT_PASS_MARK);
        assert_eq!(grade.score, None);
        assert_eq!(grade.passed, None);
    }

    #[test]
    fn pass_mark_bounds() {
        assert!(validate_pass_mark(0).is_ok());
        assert!(validate_pass_mark(100).is_ok());
        assert!(validate_pass_mark(101).is_err());
    }
}
