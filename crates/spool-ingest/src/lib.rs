//! # Spool Ingest
//!
//! 訂單文字解析：把貼上的試算表列或平台匯出文字轉為訂單

pub mod format;
pub mod importer;
pub mod preview;
pub mod row;
pub mod variant;

// Re-export 主要類型
pub use format::{detect_format, InputFormat};
pub use importer::{ImportBatch, OrderParser};
pub use preview::ImportPreview;
pub use row::{ColumnLayout, RowRecord};
pub use variant::{parse_color_field, VariantSplit};
