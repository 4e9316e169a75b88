//! 輸入格式偵測

use serde::{Deserialize, Serialize};

/// 貼上文字的格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputFormat {
    /// 無表頭的 Tab 分隔列，第一欄為 10 位數交易編號
    Headerless,
    /// 有表頭的 CSV / TSV
    Headered { delimiter: u8 },
    /// 無法辨識，整段視為一筆
    Unknown,
}

/// 第一個非空白行
pub fn first_non_empty_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}

/// 依第一個非空白行判斷格式
pub fn detect_format(text: &str) -> Option<InputFormat> {
    let line = first_non_empty_line(text)?;

    if starts_with_transaction_id(line) && line.contains('\t') {
        return Some(InputFormat::Headerless);
    }

    if line.contains('\t') {
        Some(InputFormat::Headered { delimiter: b'\t' })
    } else if line.contains(',') {
        Some(InputFormat::Headered { delimiter: b',' })
    } else {
        Some(InputFormat::Unknown)
    }
}

fn starts_with_transaction_id(line: &str) -> bool {
    line.len() >= 10 && line.as_bytes()[..10].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("4790820615\tLamp\t1", Some(InputFormat::Headerless))]
    #[case("\n\n  4790820615\tLamp\t1\n", Some(InputFormat::Headerless))]
    #[case("Order ID\tItem\tQty", Some(InputFormat::Headered { delimiter: b'\t' }))]
    #[case("Sale ID,Item,Qty", Some(InputFormat::Headered { delimiter: b',' }))]
    #[case("479082061\tLamp", Some(InputFormat::Headered { delimiter: b'\t' }))]
    #[case("4790820615,Lamp,1", Some(InputFormat::Headered { delimiter: b',' }))]
    #[case("just some words", Some(InputFormat::Unknown))]
    #[case("   \n  ", None)]
    fn test_detect_format(#[case] text: &str, #[case] expected: Option<InputFormat>) {
        assert_eq!(detect_format(text), expected);
    }
}
