//! 匯入預覽

use serde::{Deserialize, Serialize};

use crate::format::InputFormat;
use crate::row::RowRecord;

/// 匯入前的預覽資訊
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportPreview {
    pub format: InputFormat,

    /// 第一筆資料列
    pub sample: Option<RowRecord>,

    /// 無法辨識格式時，將被當作商品名稱的文字
    pub fallback_title: Option<String>,

    /// 資料列總數（不含格式錯誤的列）
    pub total_rows: usize,

    /// 重複的列數
    pub duplicate_rows: usize,

    /// 格式錯誤的列數
    pub skipped_rows: usize,
}

impl ImportPreview {
    pub(crate) fn new(format: InputFormat) -> Self {
        Self {
            format,
            sample: None,
            fallback_title: None,
            total_rows: 0,
            duplicate_rows: 0,
            skipped_rows: 0,
        }
    }

    pub(crate) fn unknown(title: String) -> Self {
        Self {
            fallback_title: Some(title),
            total_rows: 1,
            ..Self::new(InputFormat::Unknown)
        }
    }

    /// 預計新增的列數
    pub fn new_rows(&self) -> usize {
        self.total_rows.saturating_sub(self.duplicate_rows)
    }
}
