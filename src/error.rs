use thiserror::Error;

#[derive(Error, Debug)]
pub enum TutorError {
    #[error("AI error: {0}")]
    Ai(#[from] AIError),
    #[error("Quiz error: {0}")]
    Quiz(#[from] QuizError),
    #[error("No API key configured. Set {0} or enter it at startup")]
    MissingCredential(&'static str),
}

#[derive(Error, Debug)]
pub enum AIError {
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Stream error: {0}")]
    Stream(String),
    #[error("Mock error: {0}")]
    Mock(String),
}

#[derive(Error, Debug)]
pub enum OpenAIError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug, PartialEq)]
pub enum QuizError {
    #[error("Could not find a quiz in the model output")]
    Extraction { raw: String },
    #[error("Quiz is malformed: {choices} choices, answer {answer:?}")]
    Malformed { choices: usize, answer: String },
    #[error("{0:?} is not one of the choices")]
    UnknownChoice(String),
    #[error("No quiz question is active")]
    NoActiveItem,
}
