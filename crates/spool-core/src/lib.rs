//! # Spool Core
//!
//! 訂單、產品模型與耗材庫存的核心資料模型

pub mod clock;
pub mod config;
pub mod inventory;
pub mod model;
pub mod order;
pub mod progress;

// Re-export 主要類型
pub use clock::{Clock, FixedClock, IdGenerator, RandomIds, SequentialIds, SystemClock};
pub use config::ShopConfig;
pub use inventory::{
    BackupRoll, ExternalPart, Filament, FilamentMap, InventorySnapshot, PartsMap, ReorderAlert,
};
pub use model::{Model, PartRequirement, Plate, PlatePart, PrinterSetting};
pub use order::{ExistingOrderIds, LineItem, Order, OrderStatus};
pub use progress::{FulfillmentState, PlateTransition};

/// 核心錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum SpoolError {
    #[error("配置解析失敗: {0}")]
    InvalidConfig(String),

    #[error("盤位索引超出範圍: {index}（共 {total} 個盤位）")]
    PlateOutOfRange { index: usize, total: usize },

    #[error("仍有未完成的盤位: {pending:?}")]
    PlatesIncomplete { pending: Vec<usize> },

    #[error("項目已完成，無法再變更盤位")]
    AlreadyFulfilled,

    #[error("找不到訂單明細: {0}")]
    LineItemNotFound(usize),

    #[error("找不到商品對應的模型: {0}")]
    ModelNotFound(String),
}

pub type Result<T> = std::result::Result<T, SpoolError>;

/// 不分大小寫的雙向包含比對（相等、包含或被包含）
///
/// 兩側皆已去除前後空白；任一側為空字串時視為不匹配。
pub fn fuzzy_contains(left: &str, right: &str) -> bool {
    let left = left.trim().to_lowercase();
    let right = right.trim().to_lowercase();
    if left.is_empty() || right.is_empty() {
        return false;
    }
    left == right || left.contains(&right) || right.contains(&left)
}
