//! Supported display locales and `Accept-Language` negotiation.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Number symbols and date pattern for one display locale.
#[derive(Debug, Clone, Copy)]
pub struct Locale {
    tag: &'static str,
    decimal_separator: char,
    grouping_separator: char,
    percent_suffix: &'static str,
    full_date_pattern: &'static str,
    chrono: chrono::Locale,
}

impl Locale {
    pub const EN_US: Locale = Locale {
        tag: "en-US",
        decimal_separator: '.',
        grouping_separator: ',',
        percent_suffix: "%",
        full_date_pattern: "%A, %B %-d, %Y",
        chrono: chrono::Locale::en_US,
    };

    pub const EN_GB: Locale = Locale {
        tag: "en-GB",
        decimal_separator: '.',
        grouping_separator: ',',
        percent_suffix: "%",
        full_date_pattern: "%A, %-d %B %Y",
        chrono: chrono::Locale::en_GB,
    };

    pub const DE_DE: Locale = Locale {
        tag: "de-DE",
        decimal_separator: ',',
        grouping_separator: '.',
        percent_suffix: "\u{a0}%",
        full_date_pattern: "%A, %-d. %B %Y",
        chrono: chrono::Locale::de_DE,
    };

    pub const FR_FR: Locale = Locale {
        tag: "fr-FR",
        decimal_separator: ',',
        grouping_separator: '\u{a0}',
        percent_suffix: "\u{a0}%",
        full_date_pattern: "%A %-d %B %Y",
        chrono: chrono::Locale::fr_FR,
    };

    pub const ES_ES: Locale = Locale {
        tag: "es-ES",
        decimal_separator: ',',
        grouping_separator: '.',
        percent_suffix: "\u{a0}%",
        full_date_pattern: "%A, %-d de %B de %Y",
        chrono: chrono::Locale::es_ES,
    };

    pub const IT_IT: Locale = Locale {
        tag: "it-IT",
        decimal_separator: ',',
        grouping_separator: '.',
        percent_suffix: "%",
        full_date_pattern: "%A %-d %B %Y",
        chrono: chrono::Locale::it_IT,
    };

    pub const PT_BR: Locale = Locale {
        tag: "pt-BR",
        decimal_separator: ',',
        grouping_separator: '.',
        percent_suffix: "%",
        full_date_pattern: "%A, %-d de %B de %Y",
        chrono: chrono::Locale::pt_BR,
    };

    pub const JA_JP: Locale = Locale {
        tag: "ja-JP",
        decimal_separator: '.',
        grouping_separator: ',',
        percent_suffix: "%",
        full_date_pattern: "%Y年%-m月%-d日%A",
        chrono: chrono::Locale::ja_JP,
    };

    /// Locales in lookup order. A bare language tag picks the first entry for it.
    pub const SUPPORTED: [Locale; 8] = [
        Self::EN_US,
        Self::EN_GB,
        Self::DE_DE,
        Self::FR_FR,
        Self::ES_ES,
        Self::IT_IT,
        Self::PT_BR,
        Self::JA_JP,
    ];

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn language(&self) -> &'static str {
        self.tag.split('-').next().unwrap_or(self.tag)
    }

    pub fn decimal_separator(&self) -> char {
        self.decimal_separator
    }

    pub fn grouping_separator(&self) -> char {
        self.grouping_separator
    }

    pub fn percent_suffix(&self) -> &'static str {
        self.percent_suffix
    }

    pub fn full_date_pattern(&self) -> &'static str {
        self.full_date_pattern
    }

    pub fn chrono_locale(&self) -> chrono::Locale {
        self.chrono
    }

    /// Match a BCP 47 style tag (`de-AT`, `en_us`, `fr`).
    ///
    /// An exact match wins; otherwise the first supported locale sharing the language.
    pub fn lookup(tag: &str) -> Option<Locale> {
        let normalized = tag.trim().replace('_', "-");
        if normalized.is_empty() || normalized == "*" {
            return None;
        }

        if let Some(exact) = Self::SUPPORTED
            .iter()
            .find(|locale| locale.tag.eq_ignore_ascii_case(&normalized))
        {
            return Some(*exact);
        }

        let language = normalized.split('-').next().unwrap_or_default();
        Self::SUPPORTED
            .iter()
            .find(|locale| locale.language().eq_ignore_ascii_case(language))
            .copied()
    }

    /// Pick the best supported locale from an `Accept-Language` header value.
    ///
    /// Entries are ranked by quality; ties keep header order. Entries with `q=0` are
    /// ignored.
    pub fn from_accept_language(header: &str) -> Option<Locale> {
        let mut ranked: Vec<(f32, &str)> = header
            .split(',')
            .filter_map(|entry| {
                let mut parts = entry.split(';');
                let tag = parts.next()?.trim();
                let quality = parts
                    .filter_map(|param| {
                        let (key, value) = param.split_once('=')?;
                        key.trim().eq_ignore_ascii_case("q").then_some(value)
                    })
                    .find_map(|value| value.trim().parse::<f32>().ok())
                    .unwrap_or(1.0);
                (quality > 0.0 && !tag.is_empty()).then_some((quality, tag))
            })
            .collect();

        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        ranked.into_iter().find_map(|(_, tag)| Self::lookup(tag))
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::EN_US
    }
}

impl PartialEq for Locale {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
    }
}

impl Eq for Locale {}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag)
    }
}

#[derive(Debug, Error)]
#[error("unsupported locale `{0}`")]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::lookup(value).ok_or_else(|| UnknownLocale(value.to_string()))
    }
}
