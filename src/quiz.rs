//! Multiple-choice quiz items: recovery from model text, validation and grading.
//!
//! Model output is free-form. [`extract_quiz_item`] is a best-effort heuristic: it
//! prefers a fenced JSON block, then the widest brace span, and tolerates
//! single-quoted JSON with one repair pass.

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::QuizError;
use crate::json_utils::{find_fenced_object, greedy_brace_span, parse_with_quote_repair};
use crate::prompt::ReplyLanguage;

/// Choices a question needs before it can be shown.
pub const MIN_CHOICES: usize = 4;

/// One generated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Quiz Item", description = "A single multiple-choice question")]
pub struct QuizItem {
    /// Question text
    pub question: String,
    /// Four labeled choices such as "A) ...", "B) ..."
    pub choices: Vec<String>,
    /// Letter of the correct choice, A to D
    pub answer: String,
    /// Short explanation of the correct answer
    pub explanation: String,
}

impl QuizItem {
    /// Check the item can be shown and graded.
    pub fn validate(&self) -> Result<(), QuizError> {
        let letter_answer = self.answer.chars().count() == 1
            && self.answer.chars().all(|c| c.is_ascii_alphabetic());
        if self.choices.len() < MIN_CHOICES || !letter_answer {
            return Err(QuizError::Malformed {
                choices: self.choices.len(),
                answer: self.answer.clone(),
            });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Match user input to one of the choices: a full label (case-insensitive) or a
    /// bare letter.
    pub fn resolve_choice(&self, input: &str) -> Option<&str> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if let Some(label) = self.choices.iter().find(|c| c.trim().eq_ignore_ascii_case(input)) {
            return Some(label.as_str());
        }
        let mut chars = input.chars();
        let letter = chars.next().filter(|c| c.is_ascii_alphabetic() && chars.next().is_none())?;
        self.choices
            .iter()
            .find(|c| selected_letter(c) == Some(letter.to_ascii_uppercase()))
            .map(String::as_str)
    }
}

/// Recover a [`QuizItem`] from raw model text. Returns `None` when no candidate parses
/// into an object with usable fields.
#[instrument(target = "tutorbot::quiz", skip(text), fields(text_len = text.len()))]
pub fn extract_quiz_item(text: &str) -> Option<QuizItem> {
    let candidate = find_fenced_object(text).unwrap_or(text);
    let candidate = greedy_brace_span(candidate).unwrap_or(candidate);

    let item = parse_with_quote_repair(candidate, |value| match value {
        Value::Object(map) => item_from_map(&map),
        _ => None,
    });
    match &item {
        Some(item) => debug!(target: "tutorbot::quiz", choices = item.choices.len(), answer = %item.answer, "quiz item extracted"),
        None => warn!(target: "tutorbot::quiz", "no quiz item in model output"),
    }
    item
}

fn item_from_map(map: &Map<String, Value>) -> Option<QuizItem> {
    let question = text_field(map, "question")?;
    let explanation = text_field(map, "explanation")?;
    let choices = match map.get("choices") {
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    };
    let answer = match map.get("answer") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_uppercase(),
        Some(other) => other.to_string().trim().to_uppercase(),
    };
    Some(QuizItem { question, choices, answer, explanation })
}

/// Missing text fields default to empty; a present non-string value rejects the candidate.
fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        None => Some(String::new()),
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => None,
    }
}

/// Letter picked by a choice label such as `"B) photosynthesis"`.
pub fn selected_letter(label: &str) -> Option<char> {
    let head = label.split(')').next().unwrap_or_default();
    head.trim().chars().next().map(|c| c.to_ascii_uppercase())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastResult {
    pub correct: bool,
    pub answer: String,
}

/// Outcome of one graded answer.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    pub correct: bool,
    pub answer: String,
    pub explanation: String,
    pub score: u32,
    pub total: u32,
}

/// Quiz progress for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuizState {
    pub current: Option<QuizItem>,
    score: u32,
    total: u32,
    pub last_result: Option<LastResult>,
}

impl QuizState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Fraction answered correctly, 0.0 before any answer.
    pub fn accuracy(&self) -> f32 {
        self.score as f32 / self.total.max(1) as f32
    }

    /// Grade `selected` against the current item. Total always increases; score only
    /// on a match. A malformed item is rejected and leaves the counts untouched.
    #[instrument(target = "tutorbot::quiz", skip(self))]
    pub fn grade(&mut self, selected: &str) -> Result<GradeOutcome, QuizError> {
        let item = self.current.as_ref().ok_or(QuizError::NoActiveItem)?;
        item.validate()?;
        let answer = item.answer.to_uppercase();
        let correct = match selected_letter(selected) {
            Some(letter) => answer == letter.to_string(),
            None => false,
        };

        self.total += 1;
        if correct {
            self.score += 1;
        }
        self.last_result = Some(LastResult { correct, answer: answer.clone() });
        info!(target: "tutorbot::quiz", correct, score = self.score, total = self.total, "answer graded");

        Ok(GradeOutcome {
            correct,
            answer,
            explanation: item.explanation.clone(),
            score: self.score,
            total: self.total,
        })
    }

    /// Drop the current item so the next request generates a fresh one.
    pub fn discard_current(&mut self) {
        self.current = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// User instruction asking the model for one quiz item in JSON.
pub fn quiz_request_instruction(language: ReplyLanguage) -> String {
    let body = match language {
        ReplyLanguage::Korean => concat!(
            "다음 형식의 JSON으로 객관식 퀴즈를 1문제 생성해 주세요.\n\n",
            "요구사항:\n",
            "- 난이도는 학습자 레벨에 맞추세요.\n",
            "- 선택지는 4개(A,B,C,D)로 만들고, 정답은 answer에 A/B/C/D 중 하나로 표기.\n",
            "- explanation에는 간단하고 핵심적인 해설을 제공.\n\n",
            "출력 형식(반드시 아래 JSON 스키마만 출력하세요):\n",
        ),
        ReplyLanguage::English => concat!(
            "Create one multiple-choice quiz question as JSON in the format below.\n\n",
            "Requirements:\n",
            "- Match the difficulty to the learner level.\n",
            "- Provide 4 choices (A, B, C, D); put the correct letter in answer.\n",
            "- Give a short, focused explanation.\n\n",
            "Output format (output only this JSON):\n",
        ),
    };
    let example = concat!(
        "{\n",
        "  \"question\": \"...\",\n",
        "  \"choices\": [\"A) ...\",\"B) ...\",\"C) ...\",\"D) ...\"],\n",
        "  \"answer\": \"B\",\n",
        "  \"explanation\": \"...\"\n",
        "}"
    );
    let schema = serde_json::to_string_pretty(&schema_for!(QuizItem))
        .unwrap_or_else(|_| "Schema serialization failed".to_string());
    format!("{body}{example}\n\n## Response Format\n```json\n{schema}\n```")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_letter_takes_text_before_paren() {
        assert_eq!(selected_letter("b) photosynthesis"), Some('B'));
        assert_eq!(selected_letter("  C ) x"), Some('C'));
        assert_eq!(selected_letter(""), None);
    }

    #[test]
    fn validate_rejects_short_choice_lists() {
        let item = QuizItem {
            question: "Q".into(),
            choices: vec!["A) x".into(), "B) y".into()],
            answer: "A".into(),
            explanation: String::new(),
        };
        assert_eq!(
            item.validate(),
            Err(QuizError::Malformed { choices: 2, answer: "A".into() })
        );
    }

    fn four_choice_item() -> QuizItem {
        QuizItem {
            question: "Q".into(),
            choices: vec!["A) x".into(), "B) y".into(), "C) z".into(), "D) w".into()],
            answer: "B".into(),
            explanation: "e".into(),
        }
    }

    #[test]
    fn resolve_choice_accepts_letters_and_labels() {
        let item = four_choice_item();
        assert_eq!(item.resolve_choice("b"), Some("B) y"));
        assert_eq!(item.resolve_choice(" c) Z "), Some("C) z"));
        assert_eq!(item.resolve_choice("E"), None);
        assert_eq!(item.resolve_choice("hello there"), None);
        assert_eq!(item.resolve_choice(""), None);
    }

    #[test]
    fn grading_malformed_item_leaves_counts() {
        let mut state = QuizState::new();
        state.current = Some(QuizItem { choices: vec!["A) x".into(), "B) y".into()], ..four_choice_item() });
        assert!(matches!(state.grade("A) x"), Err(QuizError::Malformed { choices: 2, .. })));
        assert_eq!((state.score(), state.total()), (0, 0));
        assert!(state.last_result.is_none());
    }

    #[test]
    fn null_answer_is_treated_as_absent() {
        let item = extract_quiz_item(r#"{"question":"Q","choices":["A) 1","B) 2","C) 3","D) 4"],"answer":null}"#)
            .expect("quiz item");
        assert_eq!(item.answer, "");
    }

    #[test]
    fn grading_without_item_fails() {
        let mut state = QuizState::new();
        assert_eq!(state.grade("A) x"), Err(QuizError::NoActiveItem));
        assert_eq!(state.total(), 0);
    }
}
