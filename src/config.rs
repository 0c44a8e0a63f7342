use std::env;
use std::io::{self, BufRead, Write};
use std::fs::OpenOptions;
use std::time::Duration;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent},
    terminal,
};
use tracing::{info, warn};

use crate::clients::openai::models::OpenAIModel;

pub const MIN_TEMPERATURE: f32 = 0.0;
pub const MAX_TEMPERATURE: f32 = 2.0;
pub const MIN_MAX_TOKENS: u32 = 64;
pub const MAX_MAX_TOKENS: u32 = 4096;

/// One typed key from `reader`; blank input or EOF means no key.
pub fn read_key_line<R: BufRead>(mut reader: R) -> Option<String> {
    let mut input = String::new();
    match reader.read_line(&mut input) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(input.trim().to_string()).filter(|k| !k.is_empty()),
    }
}

/// Trait for types that can retrieve their configuration key from environment variables
pub trait KeyFromEnv {
    /// The environment variable name for this client's API key
    const KEY_NAME: &'static str;

    /// Find the API key by checking environment variables first, then .env file
    fn find_key() -> Option<String> {
        // Silently ignore a missing .env file
        let _ = dotenvy::dotenv();

        env::var(Self::KEY_NAME).ok().filter(|k| !k.trim().is_empty())
    }

    /// Find the API key, falling back to asking the user on the terminal.
    /// Returns `None` when an empty line is entered or stdin is closed.
    fn find_key_with_user() -> Option<String> {
        if let Some(key) = Self::find_key() {
            return Some(key);
        }

        print!("{} not found. Enter the API key (or press Enter to continue without one): ", Self::KEY_NAME);
        let _ = io::stdout().flush();

        let Some(api_key) = read_key_line(io::stdin().lock()) else {
            warn!(key = Self::KEY_NAME, "no API key entered");
            return None;
        };

        if Self::prompt_save_to_env() {
            match Self::save_to_env_file(&api_key) {
                Ok(()) => println!("API key saved to .env file"),
                Err(e) => eprintln!("Warning: Failed to save to .env file: {}", e),
            }
        }

        Some(api_key)
    }

    /// Ask whether to persist the key, single keystroke with a line-read fallback
    fn prompt_save_to_env() -> bool {
        print!("Add {} to .env file? (y/N): ", Self::KEY_NAME);
        let _ = io::stdout().flush();

        if let Ok(response) = Self::read_single_key() {
            println!("{}", response);
            return response == "y";
        }

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_ok() {
            input.trim().eq_ignore_ascii_case("y")
        } else {
            false
        }
    }

    fn read_single_key() -> Result<String, Box<dyn std::error::Error>> {
        terminal::enable_raw_mode()?;

        let result = if event::poll(Duration::from_secs(30))? {
            match event::read()? {
                Event::Key(KeyEvent { code: KeyCode::Char('y' | 'Y'), .. }) => "y",
                _ => "n",
            }
        } else {
            "n"
        };

        terminal::disable_raw_mode()?;
        Ok(result.to_string())
    }

    fn save_to_env_file(api_key: &str) -> Result<(), Box<dyn std::error::Error>> {
        let env_line = format!("{}={}\n", Self::KEY_NAME, api_key);

        // Don't duplicate an existing entry
        if let Ok(content) = std::fs::read_to_string(".env") {
            if content.contains(&format!("{}=", Self::KEY_NAME)) {
                return Ok(());
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(".env")?;
        file.write_all(env_line.as_bytes())?;

        Ok(())
    }
}

/// Per-request generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub model: OpenAIModel,
    temperature: f32,
    max_tokens: u32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: OpenAIModel::default(),
            temperature: 0.7,
            max_tokens: 700,
        }
    }
}

impl ChatSettings {
    pub fn new(model: OpenAIModel, temperature: f32, max_tokens: u32) -> Self {
        Self::default()
            .with_model(model)
            .with_temperature(temperature)
            .with_max_tokens(max_tokens)
    }

    pub fn with_model(mut self, model: OpenAIModel) -> Self {
        self.model = model;
        self
    }

    /// Clamped to `[0, 2]`.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        let clamped = if temperature.is_nan() {
            Self::default().temperature
        } else {
            temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
        };
        if clamped != temperature {
            info!(requested = temperature, used = clamped, "temperature clamped");
        }
        self.temperature = clamped;
        self
    }

    /// Clamped to `[64, 4096]`.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens.clamp(MIN_MAX_TOKENS, MAX_MAX_TOKENS);
        self
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
