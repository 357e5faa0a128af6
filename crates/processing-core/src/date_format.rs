//! File-name timestamp rendering.
//!
//! Custom templates use human tokens (`YYYY`, `MM`, `DD`, `HH`, `hh`, `mm`,
//! `ss`, ...). Tokens are matched left to right, longest first, so `YYYY`
//! is never read as two `YY` tokens and the digits produced for one token
//! are never re-interpreted as another.
//!
//! `MM` is ambiguous. It means minutes when the nearest token before it is
//! an hour or the nearest token after it is seconds (`HHMMSS`,
//! `HH:MM:SS`), and month everywhere else.

use chrono::{DateTime, Utc};

/// Default layout: `27-Oct-2023 10-00-00`.
pub const DEFAULT_LAYOUT: &str = "%d-%b-%Y %H-%M-%S";

/// Recognized template tokens, longest first.
const TOKENS: &[(&str, Token)] = &[
    ("YYYY", Token::Year),
    ("YY", Token::ShortYear),
    ("MM", Token::Month),
    ("DD", Token::Day),
    ("HH", Token::Hour24),
    ("hh", Token::Hour12),
    ("mm", Token::Minute),
    ("ss", Token::Second),
    ("SS", Token::Second),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Year,
    ShortYear,
    Month,
    Day,
    Hour24,
    Hour12,
    Minute,
    Second,
}

impl Token {
    fn layout(self) -> &'static str {
        match self {
            Self::Year => "%Y",
            Self::ShortYear => "%y",
            Self::Month => "%m",
            Self::Day => "%d",
            Self::Hour24 => "%H",
            Self::Hour12 => "%I",
            Self::Minute => "%M",
            Self::Second => "%S",
        }
    }
}

/// A compiled timestamp template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTemplate {
    /// strftime layout with literal text escaped.
    layout: String,
}

impl Default for DateTemplate {
    fn default() -> Self {
        Self {
            layout: DEFAULT_LAYOUT.to_string(),
        }
    }
}

impl DateTemplate {
    /// Compile a custom template. Text that is not a token is kept verbatim.
    pub fn parse(template: &str) -> Self {
        let mut pieces = scan(template);
        resolve_month_or_minute(&mut pieces);

        let mut layout = String::with_capacity(template.len() * 2);
        for piece in &pieces {
            match piece {
                Piece::Token(token) => layout.push_str(token.layout()),
                Piece::Literal('%') => layout.push_str("%%"),
                Piece::Literal(c) => layout.push(*c),
            }
        }
        Self { layout }
    }

    /// Template from an optional user setting; `None` or empty means default.
    pub fn from_setting(setting: Option<&str>) -> Self {
        match setting {
            Some(template) if !template.is_empty() => Self::parse(template),
            _ => Self::default(),
        }
    }

    /// Render a capture time.
    pub fn render(&self, time: &DateTime<Utc>) -> String {
        time.format(&self.layout).to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Token(Token),
    Literal(char),
}

fn scan(template: &str) -> Vec<Piece> {
    let mut pieces = Vec::with_capacity(template.len());
    let mut rest = template;

    'scan: while !rest.is_empty() {
        for (pattern, token) in TOKENS {
            if let Some(tail) = rest.strip_prefix(pattern) {
                pieces.push(Piece::Token(*token));
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            pieces.push(Piece::Literal(c));
        }
        rest = chars.as_str();
    }
    pieces
}

/// Rewrite `MM` tokens that sit in a time-of-day run to minutes.
fn resolve_month_or_minute(pieces: &mut [Piece]) {
    let tokens: Vec<(usize, Token)> = pieces
        .iter()
        .enumerate()
        .filter_map(|(i, piece)| match piece {
            Piece::Token(token) => Some((i, *token)),
            Piece::Literal(_) => None,
        })
        .collect();

    for (n, &(index, token)) in tokens.iter().enumerate() {
        if token != Token::Month {
            continue;
        }
        let after_hour = n
            .checked_sub(1)
            .map(|prev| matches!(tokens[prev].1, Token::Hour24 | Token::Hour12))
            .unwrap_or(false);
        let before_second = tokens
            .get(n + 1)
            .map(|&(_, next)| next == Token::Second)
            .unwrap_or(false);
        if after_hour || before_second {
            pieces[index] = Piece::Token(Token::Minute);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn sample() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 10, 27, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_default_layout() {
        assert_eq!(DateTemplate::default().render(&sample()), "27-Oct-2023 10-00-00");
    }

    #[test]
    fn test_compact_template() {
        let template = DateTemplate::parse("YYYYMMDD_HHMMSS");
        assert_eq!(template.render(&sample()), "20231027_100000");
    }

    #[test]
    fn test_separated_date_and_time() {
        let time = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(
            DateTemplate::parse("YYYY-MM-DD HH:MM:SS").render(&time),
            "2024-03-05 14:07:09"
        );
    }

    #[test]
    fn test_mm_reads_as_minutes_next_to_time_tokens() {
        let time = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        // After an hour token.
        assert_eq!(DateTemplate::parse("hh.MM").render(&time), "02.07");
        // Before a seconds token.
        assert_eq!(DateTemplate::parse("MM'ss").render(&time), "07'09");
        // Anywhere else it stays the month.
        assert_eq!(DateTemplate::parse("MM").render(&time), "03");
        assert_eq!(DateTemplate::parse("DD.MM HH").render(&time), "05.03 14");
        assert_eq!(DateTemplate::parse("YYMMDD").render(&time), "240305");
    }

    #[test]
    fn test_mixed_tokens_and_literals() {
        let time = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(
            DateTemplate::parse("YY-MM-DD hh.mm.ss").render(&time),
            "24-03-05 02.07.09"
        );
        assert_eq!(
            DateTemplate::parse("Day DD of YYYY").render(&time),
            "Day 05 of 2024"
        );
    }

    #[test]
    fn test_percent_is_literal() {
        assert_eq!(DateTemplate::parse("100% YYYY").render(&sample()), "100% 2023");
    }

    #[test]
    fn test_empty_setting_uses_default() {
        assert_eq!(DateTemplate::from_setting(Some("")), DateTemplate::default());
        assert_eq!(DateTemplate::from_setting(None), DateTemplate::default());
    }

    proptest! {
        #[test]
        fn prop_token_free_text_renders_verbatim(text in "[a-z _.\\-]{0,24}") {
            // Lowercase-only text can still contain "hh", "mm" or "ss".
            prop_assume!(!text.contains("hh") && !text.contains("mm") && !text.contains("ss"));
            prop_assert_eq!(DateTemplate::parse(&text).render(&sample()), text);
        }
    }
}
