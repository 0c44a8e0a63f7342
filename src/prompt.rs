//! System prompt composition for the tutor.
//!
//! A [`TutorProfile`] holds the learner-facing choices (subject, level, mode, reply
//! language, tone) and renders them into the system-role instruction sent ahead of
//! every transcript. Labels parse from their English names as well as the Korean
//! labels used by the original tutor UI.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

const FORMAT_GUIDANCE: &str = "Use markdown. Use short paragraphs and numbered steps when helpful.";
const CLARIFY_GUIDANCE: &str = "If the learner's request is ambiguous, briefly ask a single clarifying question.";

/// Learner proficiency. Unknown labels fall back to [`Level::Intermediate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Beginner, Level::Intermediate, Level::Advanced];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "beginner" | "초급" => Self::Beginner,
            "advanced" | "고급" => Self::Advanced,
            _ => Self::Intermediate,
        }
    }
}

impl FromStr for Level {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_label(s))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Interaction style. `Custom` carries a mode the tutor has no directive for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TutorMode {
    #[default]
    Explain,
    Correct,
    Socratic,
    Quiz,
    Custom(String),
}

impl TutorMode {
    pub fn label(&self) -> &str {
        match self {
            Self::Explain => "Explain",
            Self::Correct => "Correct",
            Self::Socratic => "Socratic",
            Self::Quiz => "Quiz",
            Self::Custom(s) => s.as_str(),
        }
    }

    /// Known labels map to their variant; anything else becomes `Custom`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "explain" | "설명 모드" => Self::Explain,
            "correct" | "교정 모드" => Self::Correct,
            "socratic" | "소크라테스 모드" => Self::Socratic,
            "quiz" | "퀴즈 모드" => Self::Quiz,
            _ => Self::Custom(label.trim().to_string()),
        }
    }

    /// Behavioral directive for the mode; empty for custom modes.
    pub fn directive(&self) -> &'static str {
        match self {
            Self::Explain => "Explain concepts step-by-step with clear examples and checks for understanding.",
            Self::Correct => "Detect mistakes, correct them, and explain why. Provide improved versions and tips.",
            Self::Socratic => "Ask guiding questions before giving answers. Encourage learner to think.",
            Self::Quiz => "Generate short multiple-choice quizzes with one correct answer and concise explanation.",
            Self::Custom(_) => "",
        }
    }
}

impl FromStr for TutorMode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_label(s))
    }
}

impl fmt::Display for TutorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyLanguage {
    #[default]
    Korean,
    English,
}

impl ReplyLanguage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Korean => "한국어",
            Self::English => "English",
        }
    }

    pub fn directive(&self) -> &'static str {
        match self {
            Self::Korean => "항상 한국어로 답변하세요.",
            Self::English => "Always reply in English.",
        }
    }
}

impl FromStr for ReplyLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "korean" | "ko" | "한국어" => Ok(Self::Korean),
            "english" | "en" => Ok(Self::English),
            _ => Err(format!("Unknown reply language: '{}'. Supported: korean, english", s)),
        }
    }
}

impl fmt::Display for ReplyLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Warm,
    Concise,
    Thorough,
}

impl Tone {
    pub const ALL: [Tone; 3] = [Tone::Warm, Tone::Concise, Tone::Thorough];

    pub fn directive(&self) -> &'static str {
        match self {
            Self::Warm => "Warm, empathetic, and encouraging tone.",
            Self::Concise => "Concise and direct tone.",
            Self::Thorough => "Thorough and detailed tone.",
        }
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "warm" | "따뜻하고 친절하게" => Ok(Self::Warm),
            "concise" | "간결하고 직설적으로" => Ok(Self::Concise),
            "thorough" | "꼼꼼하고 자세하게" => Ok(Self::Thorough),
            _ => Err(format!("Unknown tone: '{}'. Supported: warm, concise, thorough", s)),
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warm => write!(f, "Warm"),
            Self::Concise => write!(f, "Concise"),
            Self::Thorough => write!(f, "Thorough"),
        }
    }
}

/// The learner-facing tutor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TutorProfile {
    pub subject: String,
    pub level: Level,
    pub mode: TutorMode,
    pub language: ReplyLanguage,
    pub tone: Tone,
}

impl Default for TutorProfile {
    fn default() -> Self {
        Self {
            subject: "English".to_string(),
            level: Level::default(),
            mode: TutorMode::default(),
            language: ReplyLanguage::default(),
            tone: Tone::default(),
        }
    }
}

impl TutorProfile {
    pub fn system_prompt(&self) -> String {
        build_system_prompt(&self.subject, self.level, &self.mode, self.language, self.tone)
    }

    /// Same profile, switched to quiz mode.
    pub fn for_quiz(&self) -> Self {
        Self { mode: TutorMode::Quiz, ..self.clone() }
    }
}

/// Compose the system-role instruction for a tutor turn.
pub fn build_system_prompt(
    subject: &str,
    level: Level,
    mode: &TutorMode,
    language: ReplyLanguage,
    tone: Tone,
) -> String {
    format!(
        "You are an expert {subject} tutor. Your learner level: {level}.\n\
         Primary mode: {mode}. {directive}\n\
         {tone}\n\
         {lang}\n\
         {FORMAT_GUIDANCE}\n\
         {CLARIFY_GUIDANCE}",
        subject = subject,
        level = level.name(),
        mode = mode.label(),
        directive = mode.directive(),
        tone = tone.directive(),
        lang = language.directive(),
    )
    .trim()
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_level_falls_back_to_intermediate() {
        assert_eq!(Level::from_label("expert"), Level::Intermediate);
        assert_eq!(Level::from_label("초급"), Level::Beginner);
    }

    #[test]
    fn custom_mode_has_no_directive() {
        let mode: TutorMode = "debate".parse().unwrap();
        assert_eq!(mode, TutorMode::Custom("debate".to_string()));
        let prompt = build_system_prompt("History", Level::Advanced, &mode, ReplyLanguage::English, Tone::Concise);
        assert!(prompt.contains("Primary mode: debate. \n"));
    }

    #[test]
    fn mode_labels_are_case_insensitive() {
        assert_eq!(TutorMode::from_label(" Quiz "), TutorMode::Quiz);
        assert_eq!(TutorMode::from_label("소크라테스 모드"), TutorMode::Socratic);
    }
}
