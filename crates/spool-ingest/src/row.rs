//! 單列欄位擷取
//!
//! 匯入與預覽共用同一套欄位定位與數值解析，確保預覽結果與實際匯入一致。

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use spool_core::{Clock, ShopConfig};

use crate::variant::parse_color_field;

/// 解析後的單列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    pub transaction_id: String,
    pub product: String,
    pub quantity: u32,
    /// 原始規格文字
    pub variation: String,
    pub color: String,
    pub extra: String,
    pub price: Decimal,
    pub tax: Decimal,
    pub buyer: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// 欄位位置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    pub transaction_id: Option<usize>,
    pub product: Option<usize>,
    pub quantity: Option<usize>,
    pub variation: Option<usize>,
    pub price: Option<usize>,
    pub tax: Option<usize>,
    pub buyer: Option<usize>,
    pub message: Option<usize>,
    pub timestamp: Option<usize>,
}

/// 各欄位的表頭關鍵字，依優先順序排列
const ID_KEYS: &[&str] = &["transaction", "order id", "sale id"];
const PRODUCT_KEYS: &[&str] = &["product", "item", "title"];
const QUANTITY_KEYS: &[&str] = &["quantity", "qty"];
const VARIATION_KEYS: &[&str] = &["color", "variation"];
const PRICE_KEYS: &[&str] = &["price", "total", "amount"];
const TAX_KEYS: &[&str] = &["tax"];
const BUYER_KEYS: &[&str] = &["buyer", "customer", "name"];
const MESSAGE_KEYS: &[&str] = &["message", "note"];
const TIMESTAMP_KEYS: &[&str] = &["timestamp", "date", "time"];

impl ColumnLayout {
    /// 無表頭格式的固定欄位順序
    pub fn headerless() -> Self {
        Self {
            transaction_id: Some(0),
            product: Some(1),
            quantity: Some(2),
            variation: Some(3),
            price: Some(4),
            tax: Some(5),
            buyer: Some(6),
            message: Some(7),
            timestamp: Some(8),
        }
    }

    /// 依表頭定位欄位（表頭轉小寫後做子字串比對）
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let lowered: Vec<String> = headers
            .iter()
            .map(|h| h.as_ref().trim().to_lowercase())
            .collect();

        let find = |keys: &[&str]| -> Option<usize> {
            keys.iter()
                .find_map(|key| lowered.iter().position(|h| h.contains(key)))
        };

        Self {
            transaction_id: find(ID_KEYS),
            product: find(PRODUCT_KEYS),
            quantity: find(QUANTITY_KEYS),
            variation: find(VARIATION_KEYS),
            price: find(PRICE_KEYS),
            tax: find(TAX_KEYS),
            buyer: find(BUYER_KEYS),
            message: find(MESSAGE_KEYS),
            timestamp: find(TIMESTAMP_KEYS),
        }
    }
}

/// 取欄位值，缺欄時為空字串
pub fn field<S: AsRef<str>>(fields: &[S], index: Option<usize>) -> &str {
    index
        .and_then(|i| fields.get(i))
        .map(|s| s.as_ref().trim())
        .unwrap_or("")
}

/// 依欄位位置擷取一列
pub fn extract_row<S: AsRef<str>>(
    fields: &[S],
    layout: &ColumnLayout,
    config: &ShopConfig,
    clock: &dyn Clock,
) -> RowRecord {
    let variation = field(fields, layout.variation).to_string();
    let split = parse_color_field(&variation);
    let buyer = match field(fields, layout.buyer) {
        "" => config.default_buyer_name.clone(),
        name => name.to_string(),
    };

    RowRecord {
        transaction_id: field(fields, layout.transaction_id).to_string(),
        product: field(fields, layout.product).to_string(),
        quantity: parse_quantity(field(fields, layout.quantity), config.default_quantity),
        variation,
        color: split.color,
        extra: split.extra,
        price: parse_money(field(fields, layout.price)),
        tax: parse_money(field(fields, layout.tax)),
        buyer,
        message: field(fields, layout.message).to_string(),
        created_at: parse_timestamp(field(fields, layout.timestamp), clock),
    }
}

/// 交易編號是否為純數字
pub fn is_valid_transaction_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// 解析數量：取開頭的數字，無法解析或為 0 時使用預設值
pub fn parse_quantity(raw: &str, default: u32) -> u32 {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    match digits.parse::<u32>() {
        Ok(0) | Err(_) => default,
        Ok(n) => n,
    }
}

/// 解析金額：只保留數字與小數點，無法解析時為 0
pub fn parse_money(raw: &str) -> Decimal {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    // 只取到第二個小數點之前
    let mut parts = cleaned.splitn(3, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next().unwrap_or("");

    let normalized = match (whole.is_empty(), fraction.is_empty()) {
        (true, true) => return Decimal::ZERO,
        (true, false) => format!("0.{fraction}"),
        (false, true) => whole.to_string(),
        (false, false) => format!("{whole}.{fraction}"),
    };

    Decimal::from_str(&normalized).unwrap_or(Decimal::ZERO)
}

/// 解析時間，缺少或無法解析時使用目前時間
pub fn parse_timestamp(raw: &str, clock: &dyn Clock) -> DateTime<Utc> {
    let raw = raw.trim();
    if raw.is_empty() {
        return clock.now();
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%m/%d/%Y %I:%M %p",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return parsed.and_utc();
        }
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%b %d, %Y"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return midnight.and_utc();
            }
        }
    }

    tracing::debug!("無法解析時間 {:?}，使用目前時間", raw);
    clock.now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use spool_core::FixedClock;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap())
    }

    #[rstest]
    #[case("3", 3)]
    #[case(" 2 pcs", 2)]
    #[case("0", 1)]
    #[case("", 1)]
    #[case("abc", 1)]
    #[case("-4", 1)]
    fn test_parse_quantity(#[case] raw: &str, #[case] expected: u32) {
        assert_eq!(parse_quantity(raw, 1), expected);
    }

    #[rstest]
    #[case("62.75", Decimal::new(6275, 2))]
    #[case("$1,234.50", Decimal::new(123450, 2))]
    #[case("USD 4.72", Decimal::new(472, 2))]
    #[case(".5", Decimal::new(5, 1))]
    #[case("7.", Decimal::from(7))]
    #[case("1.2.3", Decimal::new(12, 1))]
    #[case("", Decimal::ZERO)]
    #[case("free", Decimal::ZERO)]
    fn test_parse_money(#[case] raw: &str, #[case] expected: Decimal) {
        assert_eq!(parse_money(raw), expected);
    }

    #[test]
    fn test_parse_timestamp() {
        let clock = clock();
        assert_eq!(
            parse_timestamp("2025-03-04 10:11:12", &clock),
            Utc.with_ymd_and_hms(2025, 3, 4, 10, 11, 12).unwrap()
        );
        assert_eq!(
            parse_timestamp("2025-03-04T10:11:12Z", &clock),
            Utc.with_ymd_and_hms(2025, 3, 4, 10, 11, 12).unwrap()
        );
        assert_eq!(
            parse_timestamp("03/04/2025", &clock),
            Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap()
        );
        assert_eq!(parse_timestamp("", &clock), clock.now());
        assert_eq!(parse_timestamp("yesterday-ish", &clock), clock.now());
    }

    #[test]
    fn test_layout_from_headers() {
        let headers = [
            "Sale Date",
            "Item Name",
            "Buyer",
            "Quantity",
            "Price",
            "Order ID",
            "Variations",
            "Order Sales Tax",
        ];
        let layout = ColumnLayout::from_headers(&headers);

        assert_eq!(layout.transaction_id, Some(5));
        assert_eq!(layout.product, Some(1));
        assert_eq!(layout.quantity, Some(3));
        assert_eq!(layout.variation, Some(6));
        assert_eq!(layout.price, Some(4));
        assert_eq!(layout.tax, Some(7));
        assert_eq!(layout.buyer, Some(2));
        assert_eq!(layout.message, None);
        assert_eq!(layout.timestamp, Some(0));
    }

    #[test]
    fn test_extract_headerless_row() {
        let fields: Vec<&str> = "4790820615\tModern Hourglass Wall Sconce\t1\tOuter Shell Color, Power Type, Blue, Hard-Wired\t62.75\t4.72"
            .split('\t')
            .collect();
        let row = extract_row(&fields, &ColumnLayout::headerless(), &ShopConfig::default(), &clock());

        assert_eq!(row.transaction_id, "4790820615");
        assert_eq!(row.product, "Modern Hourglass Wall Sconce");
        assert_eq!(row.quantity, 1);
        assert_eq!(row.color, "Blue");
        assert_eq!(row.extra, "Hard-Wired");
        assert_eq!(row.price, Decimal::new(6275, 2));
        assert_eq!(row.tax, Decimal::new(472, 2));
        assert_eq!(row.buyer, "Unknown");
        assert_eq!(row.created_at, clock().now());
    }

    #[test]
    fn test_transaction_id_validation() {
        assert!(is_valid_transaction_id("4790820615"));
        assert!(!is_valid_transaction_id(""));
        assert!(!is_valid_transaction_id("47908-0615"));
    }
}
