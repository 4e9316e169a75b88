//! 耗材用量計算

use rust_decimal::Decimal;
use spool_core::Model;

/// 多色零件用量
#[derive(Debug, Clone, PartialEq)]
pub struct MultiColorUsage {
    /// 零件在盤上的索引
    pub part_index: usize,
    pub part_name: String,
    pub grams: Decimal,
}

/// 單一盤位用量（已乘上訂單數量）
#[derive(Debug, Clone, PartialEq)]
pub struct PlateUsage {
    pub plate_index: usize,
    pub plate_name: String,

    /// 單色零件合計克數（使用訂單或模型預設顏色）
    pub single_color_grams: Decimal,

    /// 多色零件，各自需要指定顏色
    pub multi_color: Vec<MultiColorUsage>,

    pub print_minutes: u32,
}

impl PlateUsage {
    pub fn needs_part_colors(&self) -> bool {
        !self.multi_color.is_empty()
    }

    pub fn total_grams(&self) -> Decimal {
        self.single_color_grams + self.multi_color.iter().map(|m| m.grams).sum::<Decimal>()
    }
}

/// 一個項目的用量計畫
#[derive(Debug, Clone, PartialEq)]
pub enum UsagePlan {
    /// 依印表機設定的盤位
    Plates(Vec<PlateUsage>),
    /// 模型只有單一耗材用量
    Scalar(Decimal),
    /// 沒有可用的用量資料
    NoData,
}

impl UsagePlan {
    /// 盤位數；沒有盤位結構時為 0
    pub fn plate_count(&self) -> usize {
        match self {
            Self::Plates(plates) => plates.len(),
            _ => 0,
        }
    }

    /// 單色用量合計（不含多色零件）
    pub fn single_color_grams(&self) -> Decimal {
        match self {
            Self::Plates(plates) => plates.iter().map(|p| p.single_color_grams).sum(),
            Self::Scalar(grams) => *grams,
            Self::NoData => Decimal::ZERO,
        }
    }

    pub fn print_minutes(&self) -> u32 {
        match self {
            Self::Plates(plates) => plates
                .iter()
                .fold(0u32, |total, p| total.saturating_add(p.print_minutes)),
            _ => 0,
        }
    }

    pub fn plate(&self, index: usize) -> Option<&PlateUsage> {
        match self {
            Self::Plates(plates) => plates.get(index),
            _ => None,
        }
    }
}

/// 依模型、印表機與數量計算用量
///
/// 有盤位結構時逐盤計算，否則退回模型的單一耗材用量。
pub fn plan_usage(model: &Model, printer_id: Option<&str>, quantity: u32) -> UsagePlan {
    let units = quantity;
    let quantity = Decimal::from(quantity);
    let plates = model.plates_for(printer_id);

    if !plates.is_empty() {
        let usages = plates
            .iter()
            .enumerate()
            .map(|(plate_index, plate)| {
                let mut single_color_grams = Decimal::ZERO;
                let mut multi_color = Vec::new();
                let mut print_minutes = 0u32;

                for (part_index, part) in plate.parts.iter().enumerate() {
                    let grams = part.grams_per_unit() * quantity;
                    print_minutes =
                        print_minutes.saturating_add(part.minutes_per_unit().saturating_mul(units));
                    if part.is_multi_color {
                        multi_color.push(MultiColorUsage {
                            part_index,
                            part_name: part.name.clone(),
                            grams,
                        });
                    } else {
                        single_color_grams += grams;
                    }
                }

                PlateUsage {
                    plate_index,
                    plate_name: plate.name.clone(),
                    single_color_grams,
                    multi_color,
                    print_minutes,
                }
            })
            .collect();
        return UsagePlan::Plates(usages);
    }

    match model.filament_usage {
        Some(grams) if grams > Decimal::ZERO => UsagePlan::Scalar(grams * quantity),
        _ => UsagePlan::NoData,
    }
}
