//! User-facing strings of the chat panel.

use std::error::Error;
use std::fmt::{self, Display};
use std::str::FromStr;

/// A supported display language.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Locale {
    /// English.
    English,
    /// Italian.
    #[default]
    Italian,
}

/// The localized strings a chat panel needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LocaleStrings {
    /// First assistant message of every session.
    pub greeting: &'static str,
    /// Assistant message shown when a reply could not be generated.
    pub failure: &'static str,
    /// Hint shown in the empty input box.
    pub placeholder: &'static str,
    /// Disclaimer shown under the input box.
    pub warning: &'static str,
}

const ENGLISH: LocaleStrings = LocaleStrings {
    greeting: "Hi! I'm DeltaAI, your Roblox Lua scripting assistant. \
               How can I help you today?",
    failure: "Sorry, I'm having trouble connecting.",
    placeholder: "Ask DeltaAI about scripts, bugs or optimizations...",
    warning: "AI can make mistakes. Review scripts before running them.",
};

const ITALIAN: LocaleStrings = LocaleStrings {
    greeting: "Ciao! Sono DeltaAI, il tuo assistente per lo scripting Lua \
               su Roblox. Come posso aiutarti oggi?",
    failure: "Scusa, ho problemi di connessione.",
    placeholder: "Chiedi a DeltaAI di script, bug o ottimizzazioni...",
    warning: "L'IA può sbagliare. Controlla gli script prima di eseguirli.",
};

impl Locale {
    /// All supported locales.
    pub const ALL: [Locale; 2] = [Locale::Italian, Locale::English];

    /// Returns the strings of this locale.
    #[inline]
    pub fn strings(self) -> &'static LocaleStrings {
        match self {
            Locale::English => &ENGLISH,
            Locale::Italian => &ITALIAN,
        }
    }

    /// Returns the two-letter language code.
    #[inline]
    pub fn code(self) -> &'static str {
        match self {
            Locale::English => "en",
            Locale::Italian => "it",
        }
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when parsing an unsupported language.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownLocale(String);

impl Display for UnknownLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported language: {:?}", self.0)
    }
}

impl Error for UnknownLocale {}

impl FromStr for Locale {
    type Err = UnknownLocale;

    /// Accepts language codes and names, ignoring case and any region
    /// suffix (`it`, `it_IT.UTF-8`, `English`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lang = s
            .trim()
            .split(['-', '_', '.'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match lang.as_str() {
            "en" | "english" => Ok(Locale::English),
            "it" | "italian" | "italiano" => Ok(Locale::Italian),
            _ => Err(UnknownLocale(s.to_owned())),
        }
    }
}
