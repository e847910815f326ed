use serde::{Deserialize, Serialize};

/// ISO 639-1 code as understood by the providers.
pub type LangCode = &'static str;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    German,
    English,
    Spanish,
    Polish,
    French,
    Italian,
    Portuguese,
    Dutch,
    Russian,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Language::German,
        Language::English,
        Language::Spanish,
        Language::Polish,
        Language::French,
        Language::Italian,
        Language::Portuguese,
        Language::Dutch,
        Language::Russian,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Language::German => "german",
            Language::English => "english",
            Language::Spanish => "spanish",
            Language::Polish => "polish",
            Language::French => "french",
            Language::Italian => "italian",
            Language::Portuguese => "portuguese",
            Language::Dutch => "dutch",
            Language::Russian => "russian",
        }
    }

    pub fn code(self) -> LangCode {
        match self {
            Language::German => "de",
            Language::English => "en",
            Language::Spanish => "es",
            Language::Polish => "pl",
            Language::French => "fr",
            Language::Italian => "it",
            Language::Portuguese => "pt",
            Language::Dutch => "nl",
            Language::Russian => "ru",
        }
    }

    /// Name of the language in the language itself.
    pub fn native_name(self) -> &'static str {
        match self {
            Language::German => "Deutsch",
            Language::English => "English",
            Language::Spanish => "Español",
            Language::Polish => "Polski",
            Language::French => "Français",
            Language::Italian => "Italiano",
            Language::Portuguese => "Português",
            Language::Dutch => "Nederlands",
            Language::Russian => "Русский",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|lang| lang.name().eq_ignore_ascii_case(wanted))
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let wanted = code.trim();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(wanted))
    }
}

/// Lowercased, trimmed form used as a matrix key.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn code_for(name: &str) -> Option<LangCode> {
    Language::from_name(name).map(Language::code)
}

/// Unknown names fall back to `default` instead of failing the request.
pub fn code_or(name: &str, default: LangCode) -> LangCode {
    code_for(name).unwrap_or(default)
}

/// Interns a configured code so it can travel as a [`LangCode`].
pub fn known_code(code: &str) -> Option<LangCode> {
    Language::from_code(code).map(Language::code)
}
