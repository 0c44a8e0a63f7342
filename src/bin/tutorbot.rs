use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use tutorbot::clients::{OpenAIClient, OpenAIModel};
use tutorbot::config::{ChatSettings, KeyFromEnv};
use tutorbot::core::ChatClient;
use tutorbot::error::{QuizError, TutorError};
use tutorbot::prompt::{Level, ReplyLanguage, Tone, TutorMode, TutorProfile};
use tutorbot::session::TutorSession;

#[derive(Parser)]
#[command(author, version, about = "🎓 AI tutor chatbot: explain, correct, Socratic questioning and quizzes", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    OPENAI_API_KEY     API key (also read from .env)
    OPENAI_BASE_URL    Override the API host for compatible providers
    RUST_LOG           Log filter, e.g. tutorbot=debug

COMMANDS (inside the session):
    /new               Clear the conversation and quiz score
    /quiz              Switch to quiz mode and show a question
    /answer <choice>   Answer the current question (letter or full label)
    /skip              Next question
    /retry             Regenerate a malformed question
    /mode <mode>       explain | correct | socratic | quiz
    /level <level>     beginner | intermediate | advanced
    /tone <tone>       warm | concise | thorough
    /lang <language>   korean | english
    /subject <text>    Change the subject
    /meta              Show settings and progress
    /quit              Exit")]
struct Args {
    /// Model id: gpt-4o-mini, gpt-4o, gpt-4.1-mini, gpt-4.1 or any other id
    #[arg(short, long, default_value = "gpt-4o-mini")]
    model: OpenAIModel,

    /// Subject to tutor
    #[arg(short, long, default_value = "English")]
    subject: String,

    /// Learner level (unknown values mean intermediate)
    #[arg(short, long, default_value = "intermediate")]
    level: Level,

    /// Tutor mode: explain, correct, socratic, quiz
    #[arg(long, default_value = "explain")]
    mode: TutorMode,

    /// Reply language: korean, english
    #[arg(long, default_value = "korean")]
    language: ReplyLanguage,

    /// Tone: warm, concise, thorough
    #[arg(long, default_value = "warm")]
    tone: Tone,

    /// Sampling temperature, 0.0 to 2.0
    #[arg(short, long, default_value_t = 0.7)]
    temperature: f32,

    /// Maximum reply tokens, 64 to 4096
    #[arg(long, default_value_t = 700)]
    max_tokens: u32,

    /// Print settings and progress after every turn
    #[arg(long)]
    show_meta: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let profile = TutorProfile {
        subject: args.subject,
        level: args.level,
        mode: args.mode,
        language: args.language,
        tone: args.tone,
    };
    let settings = ChatSettings::new(args.model, args.temperature, args.max_tokens);
    let mut session = TutorSession::new(profile, settings);

    let client = OpenAIClient::from_key(OpenAIClient::find_key_with_user());
    if client.is_none() {
        println!("🔑 No OpenAI API key. Set {} to start chatting.", OpenAIClient::KEY_NAME);
    }
    let client: Option<&dyn ChatClient> = client.as_ref().map(|c| c as &dyn ChatClient);

    println!("🎓 AI Tutor · {} · {} · {}", session.profile.subject, session.profile.level, session.profile.mode);
    println!("Type a question, or /quit to exit. /help lists commands.");

    if session.in_quiz_mode() {
        show_question(&mut session, client).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };

        match command {
            "/quit" | "/exit" => break,
            "/help" => print_help(),
            "/new" => {
                session.new_chat();
                println!("🧹 New conversation.");
                if session.in_quiz_mode() {
                    show_question(&mut session, client).await;
                }
            }
            "/meta" => println!("{}", session.meta()),
            "/quiz" => {
                session.profile.mode = TutorMode::Quiz;
                show_question(&mut session, client).await;
            }
            "/answer" => answer(&mut session, rest),
            "/skip" | "/retry" => {
                if command == "/skip" { session.skip_quiz() } else { session.retry_quiz() }
                show_question(&mut session, client).await;
            }
            "/mode" | "/level" | "/tone" | "/lang" | "/subject" if rest.is_empty() => {
                eprintln!("❗ Usage: {} <value>. Try /help.", command);
            }
            "/mode" => {
                session.profile.mode = TutorMode::from_label(rest);
                println!("Mode: {}", session.profile.mode);
                if session.in_quiz_mode() {
                    show_question(&mut session, client).await;
                }
            }
            "/level" => {
                session.profile.level = Level::from_label(rest);
                println!("Level: {}", session.profile.level);
            }
            "/tone" => match rest.parse::<Tone>() {
                Ok(tone) => session.profile.tone = tone,
                Err(e) => eprintln!("❗ {}", e),
            },
            "/lang" => match rest.parse::<ReplyLanguage>() {
                Ok(language) => session.profile.language = language,
                Err(e) => eprintln!("❗ {}", e),
            },
            "/subject" => session.profile.subject = rest.to_string(),
            _ if command.starts_with('/') => eprintln!("❗ Unknown command {}. Try /help.", command),
            _ if session.in_quiz_mode() => answer(&mut session, line),
            _ => chat(&mut session, client, line).await,
        }

        if args.show_meta {
            println!("\n{}", session.meta());
        }
    }

    Ok(())
}

async fn chat(session: &mut TutorSession, client: Option<&dyn ChatClient>, text: &str) {
    print!("🤖 ");
    let _ = io::stdout().flush();
    let result = session
        .send_message(client, text, |chunk| {
            print!("{}", chunk);
            let _ = io::stdout().flush();
        })
        .await;
    println!();
    match result {
        Ok(_) => {}
        Err(TutorError::MissingCredential(key)) => println!("🔑 Set {} first.", key),
        Err(e) => eprintln!("❗ Request failed: {}", e),
    }
}

async fn show_question(session: &mut TutorSession, client: Option<&dyn ChatClient>) {
    println!("⏳ Creating a quiz...");
    match session.ensure_quiz_item(client).await {
        Ok(item) => {
            println!("\nQuestion: {}", item.question);
            for choice in &item.choices {
                println!("  {}", choice);
            }
            println!("Answer with a letter, /skip for another question.");
        }
        Err(TutorError::MissingCredential(key)) => println!("🔑 A quiz needs an API key. Set {}.", key),
        Err(TutorError::Quiz(QuizError::Malformed { .. })) => {
            eprintln!("❗ The quiz came back malformed. Use /retry for a new question.");
        }
        Err(e) => eprintln!("❗ Could not create a quiz ({}). Use /quiz to try again.", e),
    }
}

fn answer(session: &mut TutorSession, selected: &str) {
    match session.submit_answer(selected) {
        Ok(outcome) => {
            if outcome.correct {
                println!("✅ Correct! ({})", outcome.answer);
            } else {
                println!("❌ Not quite. The answer is {}.", outcome.answer);
            }
            if !outcome.explanation.is_empty() {
                println!("💡 {}", outcome.explanation);
            }
            println!(
                "Score: {} / {} ({:.0}%)",
                outcome.score,
                outcome.total,
                session.quiz().accuracy() * 100.0
            );
        }
        Err(TutorError::Quiz(QuizError::UnknownChoice(input))) => {
            eprintln!("❗ {:?} is not a choice. Pick one of:", input);
            if let Some(item) = session.quiz().current.as_ref() {
                for choice in &item.choices {
                    eprintln!("  {}", choice);
                }
            }
        }
        Err(TutorError::Quiz(QuizError::Malformed { .. })) => {
            eprintln!("❗ This question is malformed. Use /retry for a new one.");
        }
        Err(e) => eprintln!("❗ {}", e),
    }
}

fn print_help() {
    println!("/new /quiz /answer <choice> /skip /retry /mode /level /tone /lang /subject /meta /quit");
}
