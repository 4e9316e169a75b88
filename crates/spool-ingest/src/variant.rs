//! 規格欄位拆分
//!
//! 平台匯出的規格欄位會把欄位名稱與選項值混在一起，例如
//! `"Tray Color, Stand Color, Sage Green, Brown"`。
//! 這裡把欄位名稱丟掉，取出第一個像顏色的值，其餘值併入附加規格。

use serde::{Deserialize, Serialize};

/// 永遠不會是選項值的欄位名稱
const SKIP_LABELS: &[&str] = &[
    "color",
    "colour",
    "colors",
    "primary color",
    "secondary color",
    "accent color",
    "base color",
    "shade color",
    "tray color",
    "stand color",
    "outer shell color",
    "inner shell color",
    "size",
    "amount",
    "personalization",
    "personalisation",
    "style",
    "type",
    "quantity",
    "power type",
    "finish",
    "n/a",
    "none",
];

/// 常見顏色字彙
const COLOR_WORDS: &[&str] = &[
    "sage",
    "charcoal",
    "navy",
    "black",
    "white",
    "gray",
    "grey",
    "silver",
    "gold",
    "red",
    "blue",
    "green",
    "yellow",
    "orange",
    "purple",
    "pink",
    "brown",
    "beige",
    "tan",
    "cream",
    "ivory",
    "teal",
    "turquoise",
    "mint",
    "olive",
    "maroon",
    "burgundy",
    "coral",
    "peach",
    "lavender",
    "lilac",
    "magenta",
    "cyan",
    "bronze",
    "copper",
    "terracotta",
    "mustard",
    "marble",
    "natural",
    "clear",
    "transparent",
    "rainbow",
];

/// 拆分結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSplit {
    /// 取出的顏色（保留原始大小寫），可能為空
    pub color: String,
    /// 其餘選項值，以 ", " 串接
    pub extra: String,
}

/// 是否為欄位名稱
pub fn is_skip_label(token: &str) -> bool {
    let lower = token.trim().to_lowercase();
    lower.starts_with("not requested")
        || lower == "not applicable"
        || SKIP_LABELS.contains(&lower.as_str())
}

/// 是否像顏色（與字彙相等、包含或被包含）
pub fn looks_like_color(token: &str) -> bool {
    let lower = token.trim().to_lowercase();
    if lower.is_empty() {
        return false;
    }
    COLOR_WORDS
        .iter()
        .any(|word| lower == *word || lower.contains(word) || word.contains(lower.as_str()))
}

/// 拆分規格欄位為顏色與附加規格
///
/// 最多只取一個顏色；同一個輸入中第二個像顏色的值會進入附加規格。
pub fn parse_color_field(raw: &str) -> VariantSplit {
    let mut color: Option<String> = None;
    let mut extra: Vec<&str> = Vec::new();

    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if is_skip_label(token) {
            continue;
        }
        if color.is_none() && looks_like_color(token) {
            color = Some(token.to_string());
            continue;
        }
        extra.push(token);
    }

    VariantSplit {
        color: color.unwrap_or_default(),
        extra: extra.join(", "),
    }
}
