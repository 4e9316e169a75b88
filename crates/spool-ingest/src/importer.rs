//! 訂單匯入

use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

use spool_core::{
    Clock, ExistingOrderIds, IdGenerator, LineItem, Order, RandomIds, ShopConfig, SystemClock,
};

use crate::format::{detect_format, InputFormat};
use crate::preview::ImportPreview;
use crate::row::{extract_row, is_valid_transaction_id, ColumnLayout, RowRecord};

/// 匯入結果
#[derive(Debug, Clone)]
pub struct ImportBatch {
    /// 偵測到的格式
    pub format: InputFormat,

    /// 新訂單（依買家首次出現的順序）
    pub orders: Vec<Order>,

    pub new_count: usize,

    /// 與既有訂單或本次貼上重複的列數
    pub duplicate_count: usize,

    /// 兩筆以上明細的訂單數
    pub combined_count: usize,

    /// 格式錯誤被略過的列數
    pub skipped_count: usize,
}

/// 過濾後的資料列
#[derive(Debug, Default)]
pub(crate) struct ScannedRows {
    pub rows: Vec<RowRecord>,
    pub duplicate_count: usize,
    pub skipped_count: usize,
}

/// 訂單文字解析器
pub struct OrderParser<C: Clock = SystemClock, G: IdGenerator = RandomIds> {
    config: ShopConfig,
    clock: C,
    ids: G,
}

impl OrderParser {
    /// 使用系統時鐘與隨機 ID
    pub fn with_defaults(config: ShopConfig) -> Self {
        Self::new(config, SystemClock, RandomIds)
    }
}

impl<C: Clock, G: IdGenerator> OrderParser<C, G> {
    /// 創建新的解析器
    pub fn new(config: ShopConfig, clock: C, ids: G) -> Self {
        Self { config, clock, ids }
    }

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    /// 解析貼上的文字為訂單
    ///
    /// 輸入為空，或有表頭但沒有任何資料列時回傳 `None`。
    pub fn import(
        &self,
        text: &str,
        existing: &ExistingOrderIds,
        store_id: Option<&str>,
    ) -> Option<ImportBatch> {
        let format = detect_format(text)?;
        tracing::debug!("偵測到輸入格式: {:?}", format);

        let (mut orders, duplicate_count, skipped_count) = match format {
            InputFormat::Unknown => (vec![self.unknown_order(text)], 0, 0),
            InputFormat::Headerless | InputFormat::Headered { .. } => {
                let scanned = self.scan(text, format, existing)?;
                let orders = self.group_by_buyer(scanned.rows);
                (orders, scanned.duplicate_count, scanned.skipped_count)
            }
        };

        if let Some(store) = store_id {
            for order in &mut orders {
                order.store_id = Some(store.to_string());
            }
        }

        let combined_count = orders.iter().filter(|o| o.is_combined()).count();

        tracing::info!(
            "匯入完成：新訂單 {} 筆，重複 {} 列，組合訂單 {} 筆，略過 {} 列",
            orders.len(),
            duplicate_count,
            combined_count,
            skipped_count
        );

        Some(ImportBatch {
            format,
            new_count: orders.len(),
            orders,
            duplicate_count,
            combined_count,
            skipped_count,
        })
    }

    /// 預覽：只解析第一筆資料列並統計重複數
    pub fn preview(&self, text: &str, existing: &ExistingOrderIds) -> Option<ImportPreview> {
        let format = detect_format(text)?;

        match format {
            InputFormat::Unknown => {
                let order = self.unknown_order(text);
                Some(ImportPreview::unknown(order.item))
            }
            InputFormat::Headerless | InputFormat::Headered { .. } => {
                let (layout, records) = split_records(text, format)?;
                let mut seen = HashSet::new();
                let mut preview = ImportPreview::new(format);

                for fields in &records {
                    let id = crate::row::field(fields, layout.transaction_id);
                    if format == InputFormat::Headerless && !is_valid_transaction_id(id) {
                        preview.skipped_rows += 1;
                        continue;
                    }
                    preview.total_rows += 1;
                    if preview.sample.is_none() {
                        preview.sample =
                            Some(extract_row(fields, &layout, &self.config, &self.clock));
                    }
                    if is_duplicate(id, existing, &mut seen) {
                        preview.duplicate_rows += 1;
                    }
                }

                Some(preview)
            }
        }
    }

    /// 擷取所有資料列並去除重複
    pub(crate) fn scan(
        &self,
        text: &str,
        format: InputFormat,
        existing: &ExistingOrderIds,
    ) -> Option<ScannedRows> {
        let (layout, records) = split_records(text, format)?;
        let mut seen = HashSet::new();
        let mut scanned = ScannedRows::default();

        for fields in &records {
            let id = crate::row::field(fields, layout.transaction_id);

            if format == InputFormat::Headerless && !is_valid_transaction_id(id) {
                tracing::debug!("略過格式錯誤的列: {:?}", fields.first());
                scanned.skipped_count += 1;
                continue;
            }

            if is_duplicate(id, existing, &mut seen) {
                tracing::debug!("略過重複訂單: {}", id);
                scanned.duplicate_count += 1;
                continue;
            }

            scanned
                .rows
                .push(extract_row(fields, &layout, &self.config, &self.clock));
        }

        Some(scanned)
    }

    /// 依買家名稱合併為訂單
    ///
    /// 第一列提供訂單編號、建立時間、稅額與價格；平台會在每一列重複
    /// 訂單層級的價格與稅額，所以後續列的這兩個欄位直接捨棄。
    pub(crate) fn group_by_buyer(&self, rows: Vec<RowRecord>) -> Vec<Order> {
        let mut groups: Vec<Vec<RowRecord>> = Vec::new();
        let mut index_by_buyer: HashMap<String, usize> = HashMap::new();

        for row in rows {
            match index_by_buyer.get(&row.buyer) {
                Some(&idx) => groups[idx].push(row),
                None => {
                    index_by_buyer.insert(row.buyer.clone(), groups.len());
                    groups.push(vec![row]);
                }
            }
        }

        groups
            .into_iter()
            .filter_map(|group| self.build_order(group))
            .collect()
    }

    fn build_order(&self, group: Vec<RowRecord>) -> Option<Order> {
        let first = group.first()?;

        let order_id = if first.transaction_id.is_empty() {
            self.ids.next_id().simple().to_string()
        } else {
            first.transaction_id.clone()
        };

        let mut order = Order::new(
            self.ids.next_id(),
            order_id,
            first.product.clone(),
            first.quantity,
            first.created_at,
        );
        order.buyer_name = first.buyer.clone();
        order.buyer_message = group
            .iter()
            .map(|r| r.message.as_str())
            .find(|m| !m.is_empty())
            .unwrap_or_default()
            .to_string();
        order.price = first.price;
        order.sales_tax = first.tax;
        order.color = first.color.clone();
        order.extra = first.extra.clone();

        if group.len() > 1 {
            order.item = group
                .iter()
                .map(|r| r.product.as_str())
                .collect::<Vec<_>>()
                .join(" + ");
            order.quantity = group
                .iter()
                .fold(0u32, |total, r| total.saturating_add(r.quantity));
            order.line_items = Some(
                group
                    .into_iter()
                    .map(|r| {
                        LineItem::new(r.product, r.quantity)
                            .with_color(r.color)
                            .with_extra(r.extra)
                            .with_price(r.price)
                    })
                    .collect(),
            );
            tracing::debug!("合併組合訂單 {}: {}", order.order_id, order.item);
        }

        Some(order)
    }

    /// 無法辨識格式時的單筆訂單
    fn unknown_order(&self, text: &str) -> Order {
        let title: String = text
            .trim()
            .chars()
            .take(self.config.unknown_title_max_chars)
            .collect();
        tracing::warn!("無法辨識的輸入格式，視為單筆訂單");

        let mut order = Order::new(
            self.ids.next_id(),
            self.ids.next_id().simple().to_string(),
            title,
            self.config.default_quantity,
            self.clock.now(),
        );
        order.buyer_name = self.config.default_buyer_name.clone();
        order.price = Decimal::ZERO;
        order
    }
}

/// 依格式切出欄位與欄位位置
///
/// 有表頭但沒有資料列時回傳 `None`。
fn split_records(text: &str, format: InputFormat) -> Option<(ColumnLayout, Vec<Vec<String>>)> {
    match format {
        InputFormat::Headerless => {
            let records = text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| line.split('\t').map(|f| f.trim().to_string()).collect())
                .collect();
            Some((ColumnLayout::headerless(), records))
        }
        InputFormat::Headered { delimiter } => {
            let mut records = read_delimited(text, delimiter);
            if records.len() < 2 {
                tracing::debug!("表頭之後沒有資料列");
                return None;
            }
            let header = records.remove(0);
            Some((ColumnLayout::from_headers(&header), records))
        }
        InputFormat::Unknown => None,
    }
}

fn read_delimited(text: &str, delimiter: u8) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    reader
        .records()
        .filter_map(|record| match record {
            Ok(record) => Some(record.iter().map(str::to_string).collect::<Vec<_>>()),
            Err(e) => {
                tracing::warn!("略過無法讀取的列: {}", e);
                None
            }
        })
        .filter(|fields| fields.iter().any(|f| !f.is_empty()))
        .collect()
}

/// 是否已存在於既有訂單或本次貼上；空編號不參與去重
fn is_duplicate(id: &str, existing: &ExistingOrderIds, seen: &mut HashSet<String>) -> bool {
    if id.is_empty() {
        return false;
    }
    existing.contains(id) || !seen.insert(id.to_string())
}
