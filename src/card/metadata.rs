//! The metadata record printed on a card, and the texts derived from it.

use crate::card::theme::{Category, Difficulty, ThemeKey};
use serde::{Deserialize, Serialize};

/// Placeholder shown in the hint row.
pub const HINT_TEXT: &str = "💡 힌트가 필요하면 \"힌트\"를 입력하세요";

/// Attribution appended to the source row.
pub const SOURCE_ATTRIBUTION: &str = "한국교육과정평가원";

/// Everything printed on a card besides the problem image.
///
/// A plain value: callers replace it wholesale, the pipeline never edits it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMetadata {
    pub problem_number: u32,
    pub year: u32,
    pub exam_name: String,
    pub difficulty: Difficulty,
    pub category: Category,
    #[serde(default)]
    pub theme_key: ThemeKey,
}

impl Default for CardMetadata {
    fn default() -> Self {
        Self {
            problem_number: 1,
            year: 2025,
            exam_name: "수능".to_string(),
            difficulty: Difficulty::Three,
            category: Category::Differentiation,
            theme_key: ThemeKey::Blue,
        }
    }
}

impl CardMetadata {
    pub fn title_text(&self) -> String {
        format!("{}  오늘의 수학 문제", self.category.emoji())
    }

    pub fn subtitle_text(&self) -> String {
        format!(
            "{}학년도 {}  ·  {}번",
            self.year, self.exam_name, self.problem_number
        )
    }

    /// `#category`, `#difficulty`, `#{year}{exam}`, in drawing order.
    pub fn tag_texts(&self) -> [String; 3] {
        [
            format!("#{}", self.category),
            format!("#{}", self.difficulty),
            format!("#{}{}", self.year, self.exam_name),
        ]
    }

    pub fn source_text(&self) -> String {
        format!(
            "{}학년도 {} 수학 {}번  ·  {}",
            self.year, self.exam_name, self.problem_number, SOURCE_ATTRIBUTION
        )
    }
}

/// Download name for a card, e.g. `수능_2025_22번_카드.png`.
pub fn card_file_name(meta: &CardMetadata) -> String {
    format!("수능_{}_{}번_카드.png", meta.year, meta.problem_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> CardMetadata {
        CardMetadata {
            problem_number: 22,
            year: 2024,
            exam_name: "9월 모의평가".into(),
            difficulty: Difficulty::Four,
            category: Category::Integration,
            theme_key: ThemeKey::Dark,
        }
    }

    #[test]
    fn texts_interpolate_fields() {
        let m = meta();
        assert_eq!(m.title_text(), "∫  오늘의 수학 문제");
        assert_eq!(m.subtitle_text(), "2024학년도 9월 모의평가  ·  22번");
        assert_eq!(
            m.tag_texts(),
            ["#적분".to_string(), "#4점".to_string(), "#20249월 모의평가".to_string()]
        );
        assert_eq!(
            m.source_text(),
            "2024학년도 9월 모의평가 수학 22번  ·  한국교육과정평가원"
        );
    }

    #[test]
    fn file_name() {
        assert_eq!(card_file_name(&meta()), "수능_2024_22번_카드.png");
    }

    #[test]
    fn json_shape() {
        let json = serde_json::to_value(meta()).unwrap();
        assert_eq!(json["problemNumber"], 22);
        assert_eq!(json["difficulty"], "4점");
        let back: CardMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta());
    }

    #[test]
    fn theme_defaults_when_absent() {
        let m: CardMetadata = serde_json::from_str(
            r#"{"problemNumber":1,"year":2025,"examName":"수능","difficulty":"2점","category":"기타"}"#,
        )
        .unwrap();
        assert_eq!(m.theme_key, ThemeKey::Blue);
    }
}
