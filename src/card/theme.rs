//! Closed vocabularies used on a card: visual themes, difficulty levels,
//! topic categories and known exam names.

use crate::card::canvas::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Themes ───────────────────────────────────────────────────────────────────

/// Colours for one card theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub key: ThemeKey,
    pub name: &'static str,
    /// Header gradient start (top-left).
    pub gradient_start: Color,
    /// Header gradient end (bottom-right).
    pub gradient_end: Color,
    pub tag_background: Color,
    pub tag_foreground: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKey {
    #[default]
    Blue,
    Dark,
    Warm,
    Mint,
    Grape,
    Forest,
}

impl ThemeKey {
    pub const ALL: [ThemeKey; 6] = [
        ThemeKey::Blue,
        ThemeKey::Dark,
        ThemeKey::Warm,
        ThemeKey::Mint,
        ThemeKey::Grape,
        ThemeKey::Forest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeKey::Blue => "blue",
            ThemeKey::Dark => "dark",
            ThemeKey::Warm => "warm",
            ThemeKey::Mint => "mint",
            ThemeKey::Grape => "grape",
            ThemeKey::Forest => "forest",
        }
    }

    pub fn theme(self) -> Theme {
        let (name, g0, g1, bg, fg) = match self {
            ThemeKey::Blue => ("클래식 블루", 0x4A90D9, 0x2E6DB4, 0xEBF5FF, 0x3B7DD8),
            ThemeKey::Dark => ("미드나이트", 0x1E293B, 0x0F172A, 0x334155, 0xCBD5E1),
            ThemeKey::Warm => ("선셋 오렌지", 0xF59E0B, 0xEA580C, 0xFFF7ED, 0xC2410C),
            ThemeKey::Mint => ("민트 오션", 0x06B6D4, 0x0891B2, 0xECFEFF, 0x0E7490),
            ThemeKey::Grape => ("그레이프", 0x8B5CF6, 0x6D28D9, 0xF5F3FF, 0x7C3AED),
            ThemeKey::Forest => ("포레스트", 0x059669, 0x047857, 0xECFDF5, 0x047857),
        };
        Theme {
            key: self,
            name,
            gradient_start: Color::hex(g0),
            gradient_end: Color::hex(g1),
            tag_background: Color::hex(bg),
            tag_foreground: Color::hex(fg),
        }
    }
}

impl fmt::Display for ThemeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ThemeKey::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s) || k.theme().name == s)
            .ok_or_else(|| format!("unknown theme '{s}' (expected one of: blue, dark, warm, mint, grape, forest)"))
    }
}

// ── Difficulty ───────────────────────────────────────────────────────────────

/// Point value of a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "2점")]
    Two,
    #[default]
    #[serde(rename = "3점")]
    Three,
    #[serde(rename = "4점")]
    Four,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Two, Difficulty::Three, Difficulty::Four];

    pub fn points(self) -> u8 {
        match self {
            Difficulty::Two => 2,
            Difficulty::Three => 3,
            Difficulty::Four => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Two => "2점",
            Difficulty::Three => "3점",
            Difficulty::Four => "4점",
        }
    }

    /// Badge background.
    pub fn color(self) -> Color {
        match self {
            Difficulty::Two => Color::hex(0x16A34A),
            Difficulty::Three => Color::hex(0xF59E0B),
            Difficulty::Four => Color::hex(0xDC2626),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    /// Accepts `3`, `3점` or `3pt`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_end_matches("점").trim_end_matches("pt");
        match digits.trim() {
            "2" => Ok(Difficulty::Two),
            "3" => Ok(Difficulty::Three),
            "4" => Ok(Difficulty::Four),
            _ => Err(format!("unknown difficulty '{s}' (expected 2, 3 or 4)")),
        }
    }
}

// ── Categories ───────────────────────────────────────────────────────────────

/// Topic tag of a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "이차함수")]
    Quadratic,
    #[serde(rename = "삼각함수")]
    Trigonometry,
    #[serde(rename = "수열")]
    Sequence,
    #[default]
    #[serde(rename = "미분")]
    Differentiation,
    #[serde(rename = "적분")]
    Integration,
    #[serde(rename = "확률")]
    Probability,
    #[serde(rename = "통계")]
    Statistics,
    #[serde(rename = "기하")]
    Geometry,
    #[serde(rename = "지수로그")]
    ExpLog,
    #[serde(rename = "집합")]
    Sets,
    #[serde(rename = "함수")]
    Functions,
    #[serde(rename = "기타")]
    Other,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Quadratic,
        Category::Trigonometry,
        Category::Sequence,
        Category::Differentiation,
        Category::Integration,
        Category::Probability,
        Category::Statistics,
        Category::Geometry,
        Category::ExpLog,
        Category::Sets,
        Category::Functions,
        Category::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Quadratic => "이차함수",
            Category::Trigonometry => "삼각함수",
            Category::Sequence => "수열",
            Category::Differentiation => "미분",
            Category::Integration => "적분",
            Category::Probability => "확률",
            Category::Statistics => "통계",
            Category::Geometry => "기하",
            Category::ExpLog => "지수로그",
            Category::Sets => "집합",
            Category::Functions => "함수",
            Category::Other => "기타",
        }
    }

    /// Emoji shown in front of the card title.
    pub fn emoji(self) -> &'static str {
        match self {
            Category::Quadratic => "📈",
            Category::Trigonometry => "📐",
            Category::Sequence => "🔢",
            Category::Differentiation => "📉",
            Category::Integration => "∫",
            Category::Probability => "🎲",
            Category::Statistics => "📊",
            Category::Geometry => "📏",
            Category::ExpLog => "🔬",
            Category::Sets => "🔗",
            Category::Functions => "ƒ",
            Category::Other => "📚",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

// ── Exams ────────────────────────────────────────────────────────────────────

/// Exam names offered by the metadata form. Free text is also accepted.
pub const KNOWN_EXAMS: [&str; 7] = [
    "수능",
    "6월 모의평가",
    "9월 모의평가",
    "3월 학력평가",
    "4월 학력평가",
    "7월 학력평가",
    "10월 학력평가",
];
