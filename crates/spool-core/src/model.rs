//! 產品模型（可列印的商品定義）

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 每件商品所需的外購零件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartRequirement {
    /// 零件名稱
    pub name: String,

    /// 每件商品用量
    pub quantity: u32,
}

impl PartRequirement {
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

/// 盤位上的列印零件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatePart {
    pub name: String,

    /// 每件耗材用量（克）
    pub filament_usage: Decimal,

    pub print_hours: u32,
    pub print_minutes: u32,

    /// 每件商品需要的零件數；0 視為 1
    pub quantity: u32,

    /// 多色零件：顏色需在完成時由操作員指定
    pub is_multi_color: bool,
}

impl PlatePart {
    /// 創建單色零件
    pub fn new(name: impl Into<String>, filament_usage: Decimal) -> Self {
        Self {
            name: name.into(),
            filament_usage,
            print_hours: 0,
            print_minutes: 0,
            quantity: 1,
            is_multi_color: false,
        }
    }

    /// 建構器模式：設置列印時間
    pub fn with_print_time(mut self, hours: u32, minutes: u32) -> Self {
        self.print_hours = hours;
        self.print_minutes = minutes;
        self
    }

    /// 建構器模式：設置零件數量
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// 建構器模式：標記為多色零件
    pub fn multi_color(mut self) -> Self {
        self.is_multi_color = true;
        self
    }

    /// 每件商品實際的零件數
    pub fn effective_quantity(&self) -> u32 {
        self.quantity.max(1)
    }

    /// 每件商品耗材克數（用量 × 零件數）
    pub fn grams_per_unit(&self) -> Decimal {
        self.filament_usage * Decimal::from(self.effective_quantity())
    }

    /// 每件商品列印分鐘數
    pub fn minutes_per_unit(&self) -> u32 {
        self.print_hours
            .saturating_mul(60)
            .saturating_add(self.print_minutes)
            .saturating_mul(self.effective_quantity())
    }
}

/// 列印盤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plate {
    pub name: String,
    pub is_multi_color: bool,
    pub parts: Vec<PlatePart>,
}

impl Plate {
    pub fn new(name: impl Into<String>, parts: Vec<PlatePart>) -> Self {
        let is_multi_color = parts.iter().any(|p| p.is_multi_color);
        Self {
            name: name.into(),
            is_multi_color,
            parts,
        }
    }
}

/// 印表機專屬設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterSetting {
    pub printer_id: String,
    pub plates: Vec<Plate>,
}

impl PrinterSetting {
    pub fn new(printer_id: impl Into<String>, plates: Vec<Plate>) -> Self {
        Self {
            printer_id: printer_id.into(),
            plates,
        }
    }
}

/// 產品模型
///
/// 同名的多筆模型以 `variant_name` 或 `external_parts` 區分，
/// 構成一個變體家族，由模型比對器選出最合適的一筆。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,

    /// 變體名稱，空字串代表基本款
    #[serde(default)]
    pub variant_name: String,

    #[serde(default)]
    pub aliases: Vec<String>,

    /// 訂單未指定顏色時使用
    #[serde(default)]
    pub default_color: String,

    #[serde(default)]
    pub external_parts: Vec<PartRequirement>,

    #[serde(default)]
    pub printer_settings: Vec<PrinterSetting>,

    /// 沒有盤位結構時的單一耗材用量（克／件）
    #[serde(default)]
    pub filament_usage: Option<Decimal>,
}

impl Model {
    /// 創建新的產品模型
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variant_name: String::new(),
            aliases: Vec::new(),
            default_color: String::new(),
            external_parts: Vec::new(),
            printer_settings: Vec::new(),
            filament_usage: None,
        }
    }

    /// 建構器模式：設置變體名稱
    pub fn with_variant_name(mut self, variant_name: impl Into<String>) -> Self {
        self.variant_name = variant_name.into();
        self
    }

    /// 建構器模式：添加別名
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// 建構器模式：設置預設顏色
    pub fn with_default_color(mut self, color: impl Into<String>) -> Self {
        self.default_color = color.into();
        self
    }

    /// 建構器模式：添加外購零件
    pub fn with_external_part(mut self, name: impl Into<String>, quantity: u32) -> Self {
        self.external_parts.push(PartRequirement::new(name, quantity));
        self
    }

    /// 建構器模式：添加印表機設定
    pub fn with_printer_setting(mut self, setting: PrinterSetting) -> Self {
        self.printer_settings.push(setting);
        self
    }

    /// 建構器模式：設置單一耗材用量
    pub fn with_filament_usage(mut self, grams: Decimal) -> Self {
        self.filament_usage = Some(grams);
        self
    }

    /// 是否為基本款（無變體名稱且無外購零件）
    pub fn is_base(&self) -> bool {
        self.variant_name.trim().is_empty() && self.external_parts.is_empty()
    }

    /// 取得指定印表機的盤位；找不到時使用第一組設定
    pub fn plates_for(&self, printer_id: Option<&str>) -> &[Plate] {
        let matched = printer_id.and_then(|id| {
            self.printer_settings
                .iter()
                .find(|s| s.printer_id == id)
        });

        match matched.or_else(|| self.printer_settings.first()) {
            Some(setting) => &setting.plates,
            None => &[],
        }
    }
}
