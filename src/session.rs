//! Per-user session state and the request handlers that drive it.
//!
//! A [`TutorSession`] owns the transcript and quiz progress. Every handler takes the
//! completion client as `Option<&dyn ChatClient>`; `None` means no credential was
//! configured and no call is attempted.

use std::fmt;

use futures_util::StreamExt;
use tracing::{error, info, instrument, warn};

use crate::clients::OpenAIClient;
use crate::config::{ChatSettings, KeyFromEnv};
use crate::core::{ChatClient, ChatRequest, ChatTurn};
use crate::error::{QuizError, TutorError};
use crate::prompt::{TutorMode, TutorProfile};
use crate::quiz::{extract_quiz_item, quiz_request_instruction, GradeOutcome, QuizItem, QuizState};

const QUIZ_TEMPERATURE: f32 = 0.7;
const QUIZ_MAX_TOKENS: u32 = 512;

#[derive(Debug, Clone, Default)]
pub struct TutorSession {
    pub profile: TutorProfile,
    pub settings: ChatSettings,
    transcript: Vec<ChatTurn>,
    quiz: QuizState,
}

impl TutorSession {
    pub fn new(profile: TutorProfile, settings: ChatSettings) -> Self {
        Self { profile, settings, transcript: Vec::new(), quiz: QuizState::new() }
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    pub fn quiz(&self) -> &QuizState {
        &self.quiz
    }

    pub fn in_quiz_mode(&self) -> bool {
        self.profile.mode == TutorMode::Quiz
    }

    /// Clear the transcript and quiz progress.
    pub fn new_chat(&mut self) {
        info!(turns = self.transcript.len(), "starting new chat");
        self.transcript.clear();
        self.quiz.reset();
    }

    /// Messages for the next chat call: system prompt, then the whole transcript.
    pub fn chat_payload(&self) -> Vec<ChatTurn> {
        let mut payload = Vec::with_capacity(self.transcript.len() + 1);
        payload.push(ChatTurn::system(self.profile.system_prompt()));
        payload.extend(self.transcript.iter().cloned());
        payload
    }

    /// Run one chat turn, passing each streamed chunk to `on_chunk`.
    ///
    /// The user turn is always recorded. On success the full reply is recorded as the
    /// assistant turn; on any failure an empty assistant turn is recorded instead.
    #[instrument(target = "tutorbot::session", skip_all, fields(turns = self.transcript.len()))]
    pub async fn send_message<F>(
        &mut self,
        client: Option<&dyn ChatClient>,
        text: &str,
        mut on_chunk: F,
    ) -> Result<String, TutorError>
    where
        F: FnMut(&str),
    {
        self.transcript.push(ChatTurn::user(text));

        let result = match client {
            None => {
                warn!(target: "tutorbot::session", "no API key; skipping completion call");
                Err(TutorError::MissingCredential(OpenAIClient::KEY_NAME))
            }
            Some(client) => {
                let request = ChatRequest {
                    model: self.settings.model.id().to_string(),
                    messages: self.chat_payload(),
                    temperature: self.settings.temperature(),
                    max_tokens: self.settings.max_tokens(),
                    stream: true,
                };
                stream_reply(client, request, &mut on_chunk).await
            }
        };

        match result {
            Ok(reply) => {
                info!(target: "tutorbot::session", reply_len = reply.len(), "chat turn complete");
                self.transcript.push(ChatTurn::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                error!(target: "tutorbot::session", error = %e, "chat turn failed");
                self.transcript.push(ChatTurn::assistant(""));
                Err(e)
            }
        }
    }

    /// Current quiz item, generating one when none is active.
    ///
    /// Extraction failures leave no item set. A malformed item stays set, so the caller
    /// can show it and offer [`TutorSession::retry_quiz`].
    #[instrument(target = "tutorbot::session", skip_all)]
    pub async fn ensure_quiz_item(&mut self, client: Option<&dyn ChatClient>) -> Result<&QuizItem, TutorError> {
        let client = client.ok_or(TutorError::MissingCredential(OpenAIClient::KEY_NAME))?;

        if self.quiz.current.is_none() {
            let item = self.request_quiz_item(client).await?;
            self.quiz.current = Some(item);
        }

        let item = self.quiz.current.as_ref().ok_or(QuizError::NoActiveItem)?;
        if let Err(e) = item.validate() {
            warn!(target: "tutorbot::session", error = %e, "generated quiz is malformed");
            return Err(e.into());
        }
        Ok(item)
    }

    async fn request_quiz_item(&self, client: &dyn ChatClient) -> Result<QuizItem, TutorError> {
        let profile = self.profile.for_quiz();
        let request = ChatRequest {
            model: self.settings.model.id().to_string(),
            messages: vec![
                ChatTurn::system(profile.system_prompt()),
                ChatTurn::user(quiz_request_instruction(profile.language)),
            ],
            temperature: QUIZ_TEMPERATURE,
            max_tokens: QUIZ_MAX_TOKENS,
            stream: false,
        };
        let raw = client.complete(request).await?;
        extract_quiz_item(&raw).ok_or_else(|| QuizError::Extraction { raw }.into())
    }

    /// Grade a selected choice label (or bare letter) against the current item.
    ///
    /// Input that names none of the choices is rejected without counting.
    pub fn submit_answer(&mut self, selected: &str) -> Result<GradeOutcome, TutorError> {
        let item = self.quiz.current.as_ref().ok_or(QuizError::NoActiveItem)?;
        item.validate()?;
        let label = item
            .resolve_choice(selected)
            .ok_or_else(|| QuizError::UnknownChoice(selected.trim().to_string()))?
            .to_string();
        Ok(self.quiz.grade(&label)?)
    }

    /// Move on to a new question.
    pub fn skip_quiz(&mut self) {
        self.quiz.discard_current();
    }

    /// Throw away a malformed question so the next request regenerates it.
    pub fn retry_quiz(&mut self) {
        self.quiz.discard_current();
    }

    pub fn meta(&self) -> SessionMeta<'_> {
        SessionMeta(self)
    }
}

async fn stream_reply<F>(client: &dyn ChatClient, request: ChatRequest, on_chunk: &mut F) -> Result<String, TutorError>
where
    F: FnMut(&str),
{
    let mut stream = client.stream(request).await?;
    let mut reply = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        on_chunk(&chunk);
        reply.push_str(&chunk);
    }
    Ok(reply)
}

/// Settings and progress summary of a session.
pub struct SessionMeta<'a>(&'a TutorSession);

impl fmt::Display for SessionMeta<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        writeln!(f, "- Model: {}", s.settings.model.id())?;
        writeln!(f, "- Subject: {} · Level: {} · Mode: {}", s.profile.subject, s.profile.level, s.profile.mode)?;
        writeln!(f, "- Language: {} · Tone: {}", s.profile.language, s.profile.tone)?;
        writeln!(f, "- Temperature: {} · Max tokens: {}", s.settings.temperature(), s.settings.max_tokens())?;
        writeln!(f, "- Messages: {}", s.transcript.len())?;
        write!(f, "- Quiz Score: {} / {}", s.quiz.score(), s.quiz.total())?;
        if let Some(last) = &s.quiz.last_result {
            let verdict = if last.correct { "correct" } else { "wrong" };
            write!(f, "\n- Last answer: {} (answer {})", verdict, last.answer)?;
        }
        Ok(())
    }
}
