pub mod clients;
pub mod config;
pub mod core;
pub mod error;
pub mod json_utils;
pub mod prompt;
pub mod quiz;
pub mod session;
pub mod streaming;

// Convenient re-exports
pub use prompt::{build_system_prompt, TutorProfile};
pub use quiz::{extract_quiz_item, QuizItem, QuizState};
pub use session::TutorSession;
