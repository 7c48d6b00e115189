use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Validate, JsonSchema)]
pub struct Quiz {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(nested)]
    pub questions: Vec<Question>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Validate, JsonSchema)]
pub struct Question {
    #[validate(length(min = 1))]
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub boolean_answer: Option<bool>,
    #[serde(default)]
    pub options: Vec<QuizOption>,
    #[serde(default, alias = "answer")]
    pub answers: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct QuizOption {
    pub text: String,
    pub is_correct: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice, // exactly four options, one correct
    TrueFalse,      // boolean_answer only
    TextAnswer,     // free text, accepted answers listed
}

pub const MULTIPLE_CHOICE_OPTIONS: usize = 4;

impl Question {
    /// Cross-field rules the prompt asks the model to honour. The schema
    /// cannot express them, so they are checked after parsing.
    pub fn quality_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        match self.question_type {
            QuestionType::MultipleChoice => {
                if self.options.len() != MULTIPLE_CHOICE_OPTIONS {
                    issues.push(format!(
                        "multiple-choice question has {} options, expected {}",
                        self.options.len(),
                        MULTIPLE_CHOICE_OPTIONS
                    ));
                }
                let correct = self.options.iter().filter(|o| o.is_correct).count();
                if correct != 1 {
                    issues.push(format!(
                        "multiple-choice question has {} correct options, expected 1",
                        correct
                    ));
                }
            }
            QuestionType::TrueFalse => {
                if self.boolean_answer.is_none() {
                    issues.push("true-false question is missing boolean_answer".to_string());
                }
                if !self.options.is_empty() || !self.answers.is_empty() {
                    issues.push("true-false question must not carry options or answers".to_string());
                }
            }
            QuestionType::TextAnswer => {
                if self.answers.is_empty() {
                    issues.push("text-answer question has no answers".to_string());
                }
                if !self.options.is_empty() || self.boolean_answer.is_some() {
                    issues.push(
                        "text-answer question must not carry options or boolean_answer".to_string(),
                    );
                }
            }
        }

        issues
    }
}

impl Quiz {
    /// Quality issues of every question, prefixed with the question's position.
    pub fn quality_issues(&self) -> Vec<String> {
        self.questions
            .iter()
            .enumerate()
            .flat_map(|(i, q)| {
                q.quality_issues()
                    .into_iter()
                    .map(move |issue| format!("question {}: {}", i + 1, issue))
            })
            .collect()
    }
}
