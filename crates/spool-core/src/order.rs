//! 訂單模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::progress::FulfillmentState;

/// 訂單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// 已匯入
    Received,
    /// 列印中
    Printing,
    /// 已完成
    Fulfilled,
    /// 已出貨
    Shipped,
}

/// 訂單明細（組合訂單中的單一商品）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub item: String,
    pub quantity: u32,
    pub color: String,
    pub extra: String,
    pub price: Decimal,

    /// 明細自身的列印進度
    #[serde(default)]
    pub progress: FulfillmentState,
}

impl LineItem {
    pub fn new(item: impl Into<String>, quantity: u32) -> Self {
        Self {
            item: item.into(),
            quantity,
            color: String::new(),
            extra: String::new(),
            price: Decimal::ZERO,
            progress: FulfillmentState::Pending,
        }
    }

    /// 建構器模式：設置顏色
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// 建構器模式：設置附加規格
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }

    /// 建構器模式：設置價格
    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = price;
        self
    }
}

/// 訂單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// 內部 ID
    pub id: Uuid,

    /// 平台交易編號（在進行中與已封存訂單間唯一）
    pub order_id: String,

    pub buyer_name: String,
    pub buyer_message: String,

    /// 商品名稱；組合訂單為各明細以 " + " 串接
    pub item: String,
    pub quantity: u32,
    pub color: String,
    pub extra: String,

    pub price: Decimal,
    pub sales_tax: Decimal,

    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,

    /// 匯入時指定的商店
    pub store_id: Option<String>,

    /// 兩筆以上明細時為組合訂單
    pub line_items: Option<Vec<LineItem>>,

    pub assigned_to: Option<String>,
    pub printer_id: Option<String>,

    /// 單一商品訂單的列印進度
    #[serde(default)]
    pub progress: FulfillmentState,
}

impl Order {
    /// 創建新的訂單
    pub fn new(
        id: Uuid,
        order_id: impl Into<String>,
        item: impl Into<String>,
        quantity: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_id: order_id.into(),
            buyer_name: String::new(),
            buyer_message: String::new(),
            item: item.into(),
            quantity,
            color: String::new(),
            extra: String::new(),
            price: Decimal::ZERO,
            sales_tax: Decimal::ZERO,
            created_at,
            status: OrderStatus::Received,
            store_id: None,
            line_items: None,
            assigned_to: None,
            printer_id: None,
            progress: FulfillmentState::Pending,
        }
    }

    /// 建構器模式：設置顏色
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// 建構器模式：設置附加規格
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }

    /// 建構器模式：設置指派成員
    pub fn with_assigned_to(mut self, member_id: impl Into<String>) -> Self {
        self.assigned_to = Some(member_id.into());
        self
    }

    /// 建構器模式：設置印表機
    pub fn with_printer_id(mut self, printer_id: impl Into<String>) -> Self {
        self.printer_id = Some(printer_id.into());
        self
    }

    /// 建構器模式：設置訂單明細
    pub fn with_line_items(mut self, line_items: Vec<LineItem>) -> Self {
        self.line_items = Some(line_items);
        self
    }

    /// 是否為組合訂單（兩筆以上明細）
    pub fn is_combined(&self) -> bool {
        self.line_items.as_ref().is_some_and(|items| items.len() > 1)
    }

    /// 貨幣格式的價格，例如 `$62.75`
    pub fn price_label(&self) -> String {
        format!("${:.2}", self.price)
    }

    /// 所有明細皆已完成
    pub fn all_items_fulfilled(&self) -> bool {
        match &self.line_items {
            Some(items) if !items.is_empty() => items.iter().all(|li| li.progress.is_fulfilled()),
            _ => self.progress.is_fulfilled(),
        }
    }

    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }
}

/// 已存在的訂單編號（進行中 + 已封存），用於匯入去重
#[derive(Debug, Clone, Default)]
pub struct ExistingOrderIds {
    pub active: HashSet<String>,
    pub archived: HashSet<String>,
}

impl ExistingOrderIds {
    pub fn new(active: HashSet<String>, archived: HashSet<String>) -> Self {
        Self { active, archived }
    }

    /// 從訂單清單收集編號
    pub fn from_orders<'a>(
        active: impl IntoIterator<Item = &'a Order>,
        archived: impl IntoIterator<Item = &'a Order>,
    ) -> Self {
        Self {
            active: active.into_iter().map(|o| o.order_id.clone()).collect(),
            archived: archived.into_iter().map(|o| o.order_id.clone()).collect(),
        }
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.active.contains(order_id) || self.archived.contains(order_id)
    }
}
