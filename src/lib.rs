//! # Spool
//!
//! 3D 列印工作室的訂單匯入、模型比對與耗材庫存對帳
//!
//! - [`spool_ingest`]：解析貼上的訂單文字
//! - [`spool_calc`]：比對產品模型、估算成本、扣除與回補庫存
//! - [`spool_core`]：共用資料模型

pub use spool_calc;
pub use spool_core;
pub use spool_ingest;

/// 常用類型
pub mod prelude {
    pub use rust_decimal::Decimal;
    pub use spool_calc::{
        CostEstimate, ModelMatcher, OrderFulfillment, PartColors, ReconcileOutcome, Reconciler,
        Shortfall, UsageEvent, WorkItem, ZeroCostReason,
    };
    pub use spool_core::{
        Clock, ExistingOrderIds, ExternalPart, Filament, FulfillmentState, IdGenerator,
        InventorySnapshot, LineItem, Model, Order, OrderStatus, Plate, PlatePart,
        PrinterSetting, ShopConfig, SpoolError,
    };
    pub use spool_ingest::{ImportBatch, ImportPreview, InputFormat, OrderParser};
}
