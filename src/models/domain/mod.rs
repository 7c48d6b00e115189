pub mod deck;
pub mod generation_request;
pub mod note;
pub mod quiz;
pub use deck::{Card, Deck};
pub use generation_request::{BackendPreference, GenerationRequest};
pub use note::MarkdownNote;
pub use quiz::{Question, QuestionType, Quiz, QuizOption};
