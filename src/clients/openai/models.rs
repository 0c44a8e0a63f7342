use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OpenAIModel {
    Gpt4o,
    #[default]
    Gpt4oMini,
    Gpt41,
    Gpt41Mini,
    Override(String),
}

impl OpenAIModel {
    /// Models offered in the model picker.
    pub const CHOICES: [OpenAIModel; 4] = [Self::Gpt4oMini, Self::Gpt4o, Self::Gpt41Mini, Self::Gpt41];

    pub fn id(&self) -> &str {
        match self {
            Self::Gpt4o => "gpt-4o",
            Self::Gpt4oMini => "gpt-4o-mini",
            Self::Gpt41 => "gpt-4.1",
            Self::Gpt41Mini => "gpt-4.1-mini",
            Self::Override(s) => s.as_str(),
        }
    }

}

impl FromStr for OpenAIModel {
    type Err = Infallible;

    /// Known ids map to their variant; anything else is passed through as an override.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(Self::CHOICES
            .into_iter()
            .find(|m| m.id() == s)
            .unwrap_or_else(|| Self::Override(s.to_string())))
    }
}

impl fmt::Display for OpenAIModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
