//! 工作室配置

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::inventory::Filament;
use crate::{Result, SpoolError};

/// 工作室參數配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// 一捲耗材的標稱重量（克）
    pub nominal_roll_grams: Decimal,

    /// 預設補貨門檻（克）
    pub default_reorder_at: Decimal,

    /// 缺少買家欄位時使用的名稱
    pub default_buyer_name: String,

    /// 無法辨識格式時，商品名稱截斷長度（字元）
    pub unknown_title_max_chars: usize,

    /// 數量無法解析時的預設值
    pub default_quantity: u32,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            nominal_roll_grams: Decimal::from(1000),
            default_reorder_at: Decimal::from(250),
            default_buyer_name: "Unknown".to_string(),
            unknown_title_max_chars: 50,
            default_quantity: 1,
        }
    }
}

impl ShopConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 從 JSON 載入配置，缺少的欄位使用預設值
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SpoolError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置標稱捲重
    pub fn with_nominal_roll_grams(mut self, grams: Decimal) -> Self {
        self.nominal_roll_grams = grams;
        self
    }

    /// 建構器模式：設置預設補貨門檻
    pub fn with_default_reorder_at(mut self, grams: Decimal) -> Self {
        self.default_reorder_at = grams;
        self
    }

    /// 建構器模式：設置預設買家名稱
    pub fn with_default_buyer_name(mut self, name: impl Into<String>) -> Self {
        self.default_buyer_name = name.into();
        self
    }

    /// 建構器模式：設置未知格式的名稱截斷長度
    pub fn with_unknown_title_max_chars(mut self, chars: usize) -> Self {
        self.unknown_title_max_chars = chars;
        self
    }

    /// 新增一捲耗材，補貨門檻使用工作室預設值
    pub fn new_filament(
        &self,
        color: impl Into<String>,
        amount: Decimal,
        current_roll_cost: Decimal,
    ) -> Filament {
        Filament::new(color, amount, current_roll_cost).with_reorder_at(self.default_reorder_at)
    }

    /// 檢查配置是否合理
    pub fn validate(&self) -> Result<()> {
        if self.nominal_roll_grams <= Decimal::ZERO {
            return Err(SpoolError::InvalidConfig(format!(
                "標稱捲重必須大於 0: {}",
                self.nominal_roll_grams
            )));
        }
        if self.default_reorder_at < Decimal::ZERO {
            return Err(SpoolError::InvalidConfig(format!(
                "補貨門檻不可為負: {}",
                self.default_reorder_at
            )));
        }
        if self.default_quantity == 0 {
            return Err(SpoolError::InvalidConfig("預設數量必須大於 0".to_string()));
        }
        Ok(())
    }
}
