//! Course results: star-rating averages across submitted attempts.
//!
//! Every `STAR_RATING` answer of 1 to 5 stars contributes to its question's
//! average, to the submitting user's average and, when the attempt names a
//! trainer, to that trainer's average. Groups with no answers report a `null` average.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::assessment::{star_value, Answer, Question, QuestionKind};
use crate::rating::average;
use crate::types::DbId;

/// The questions of one survey or assessment.
#[derive(Debug, Clone)]
pub struct ResourceQuestions {
    pub resource_kind: String,
    pub resource_id: DbId,
    pub questions: Vec<Question>,
}

/// One submitted attempt.
#[derive(Debug, Clone)]
pub struct AttemptAnswers {
    pub resource_kind: String,
    pub resource_id: DbId,
    pub user_id: DbId,
    pub trainer_id: Option<DbId>,
    pub answers: Vec<Answer>,
}

/// Running sum/count pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Accumulator {
    pub sum: f64,
    pub count: i64,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn average(&self) -> Option<f64> {
        average(self.sum, self.count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionAverage {
    pub resource_kind: String,
    pub resource_id: DbId,
    pub question_id: String,
    pub text: String,
    pub sum: f64,
    pub count: i64,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantAverage {
    pub user_id: DbId,
    pub sum: f64,
    pub count: i64,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseResults {
    pub questions: Vec<QuestionAverage>,
    pub users: Vec<ParticipantAverage>,
    pub trainers: Vec<ParticipantAverage>,
}

fn participant_rows(map: BTreeMap<DbId, Accumulator>) -> Vec<ParticipantAverage> {
    map.into_iter()
        .map(|(user_id, acc)| ParticipantAverage {
            user_id,
            sum: acc.sum,
            count: acc.count,
            average: acc.average(),
        })
        .collect()
}

/// Aggregate star ratings over all attempts of a course.
///
/// `attendees` and `trainers` are listed even when they have no answers, so
/// the caller always gets one row per participant.
pub fn compute_course_results(
    resources: &[ResourceQuestions],
    attempts: &[AttemptAnswers],
    attendees: &[DbId],
    trainers: &[DbId],
) -> CourseResults {
    let star_questions: HashSet<(&str, DbId, &str)> = resources
        .iter()
        .flat_map(|r| {
            r.questions
                .iter()
                .filter(|q| q.kind == QuestionKind::StarRating)
                .map(move |q| (r.resource_kind.as_str(), r.resource_id, q.id.as_str()))
        })
        .collect();

    let mut per_question: HashMap<(String, DbId, String), Accumulator> = HashMap::new();
    let mut per_user: BTreeMap<DbId, Accumulator> =
        attendees.iter().map(|&id| (id, Accumulator::default())).collect();
    let mut per_trainer: BTreeMap<DbId, Accumulator> =
        trainers.iter().map(|&id| (id, Accumulator::default())).collect();

    for attempt in attempts {
        for answer in &attempt.answers {
            let key = (
                attempt.resource_kind.as_str(),
                attempt.resource_id,
                answer.question_id.as_str(),
            );
            if !star_questions.contains(&key) {
                continue;
            }
            let Some(value) = star_value(answer) else {
                continue;
            };
            per_question
                .entry((
                    attempt.resource_kind.clone(),
                    attempt.resource_id,
                    answer.question_id.clone(),
                ))
                .or_default()
                .push(value);
            per_user.entry(attempt.user_id).or_default().push(value);
            if let Some(trainer_id) = attempt.trainer_id {
                per_trainer.entry(trainer_id).or_default().push(value);
            }
        }
    }

    let questions = resources
        .iter()
        .flat_map(|r| {
            r.questions
                .iter()
                .filter(|q| q.kind == QuestionKind::StarRating)
                .map(|q| {
                    let acc = per_question
                        .get(&(r.resource_kind.clone(), r.resource_id, q.id.clone()))
                        .copied()
                        .unwrap_or_default();
                    QuestionAverage {
                        resource_kind: r.resource_kind.clone(),
                        resource_id: r.resource_id,
                        question_id: q.id.clone(),
                        text: q.text.clone(),
                        sum: acc.sum,
                        count: acc.count,
                        average: acc.average(),
                    }
                })
        })
        .collect();

    CourseResults {
        questions,
        users: participant_rows(per_user),
        trainers: participant_rows(per_trainer),
    }
}
