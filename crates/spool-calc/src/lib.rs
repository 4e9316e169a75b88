//! # Spool Calculation Engine
//!
//! 模型比對與耗材庫存對帳

pub mod cost;
pub mod matcher;
pub mod reconcile;
pub mod stock;
pub mod usage;

// Re-export 主要類型
pub use cost::{CostEstimate, Shortfall, ZeroCostReason};
pub use matcher::ModelMatcher;
pub use reconcile::{OrderFulfillment, PartColors, Reconciler, WithheldPlate, WorkItem};
pub use stock::{FilamentDeduction, RollSwap};
pub use usage::{plan_usage, PlateUsage, UsagePlan};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use spool_core::{FulfillmentState, InventorySnapshot};

/// 耗材使用紀錄（供後續消耗率分析）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub color: String,
    /// 扣除克數
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub order_id: String,
    pub member_id: String,
    /// 組合訂單的明細索引
    #[serde(default)]
    pub line_item: Option<usize>,
    pub model_name: String,
}

/// 對帳結果
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// 新的庫存快照
    pub inventory: InventorySnapshot,

    /// 本次扣除的材料成本（耗材 + 外購零件）
    pub cost: Decimal,

    /// 每種實際扣除的顏色一筆
    pub usage_events: Vec<UsageEvent>,

    /// 更新後的項目進度
    pub progress: FulfillmentState,

    /// 缺少多色零件顏色而未處理的盤位
    pub withheld_plates: Vec<usize>,

    /// 庫存中找不到的顏色
    pub unmatched_colors: Vec<String>,

    /// 自動換捲
    pub roll_swaps: Vec<RollSwap>,

    /// 提示訊息
    pub notices: Vec<Notice>,
}

impl ReconcileOutcome {
    /// 不做任何變更的結果
    pub fn unchanged(inventory: &InventorySnapshot, progress: &FulfillmentState) -> Self {
        Self {
            inventory: inventory.clone(),
            cost: Decimal::ZERO,
            usage_events: Vec::new(),
            progress: progress.clone(),
            withheld_plates: Vec::new(),
            unmatched_colors: Vec::new(),
            roll_swaps: Vec::new(),
            notices: Vec::new(),
        }
    }

    /// 提示文字
    pub fn messages(&self) -> Vec<String> {
        self.notices.iter().map(|n| n.message.clone()).collect()
    }

    /// 盤位是否仍在等待顏色
    pub fn is_withheld(&self) -> bool {
        !self.withheld_plates.is_empty()
    }
}

/// 提示訊息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// 相關的顏色、零件或商品
    pub subject: String,
    pub message: String,
    pub severity: NoticeSeverity,
}

impl Notice {
    pub fn new(subject: String, message: String, severity: NoticeSeverity) -> Self {
        Self {
            subject,
            message,
            severity,
        }
    }

    pub fn info(subject: String, message: String) -> Self {
        Self::new(subject, message, NoticeSeverity::Info)
    }

    pub fn warning(subject: String, message: String) -> Self {
        Self::new(subject, message, NoticeSeverity::Warning)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeSeverity {
    Info,
    Warning,
}
