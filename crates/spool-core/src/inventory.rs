//! 耗材與外購零件庫存模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::fuzzy_contains;

/// 未拆封的備用捲
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRoll {
    /// 購入價格
    pub cost: Decimal,

    /// 加入庫存的時間
    pub added_at: DateTime<Utc>,
}

/// 耗材（單一顏色）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filament {
    /// 顏色名稱（自由文字）
    pub color: String,

    /// 目前掛載捲的剩餘克數
    pub amount: Decimal,

    /// 目前掛載捲的價格
    pub current_roll_cost: Decimal,

    /// 備用捲，先進先出
    pub backup_rolls: Vec<BackupRoll>,

    /// 補貨門檻（克）
    pub reorder_at: Decimal,
}

impl Filament {
    /// 創建新的耗材記錄，補貨門檻預設 250 克
    pub fn new(color: impl Into<String>, amount: Decimal, current_roll_cost: Decimal) -> Self {
        Self {
            color: color.into(),
            amount,
            current_roll_cost,
            backup_rolls: Vec::new(),
            reorder_at: Decimal::from(250),
        }
    }

    /// 建構器模式：設置補貨門檻
    pub fn with_reorder_at(mut self, reorder_at: Decimal) -> Self {
        self.reorder_at = reorder_at;
        self
    }

    /// 建構器模式：添加備用捲
    pub fn with_backup_roll(mut self, cost: Decimal, added_at: DateTime<Utc>) -> Self {
        self.add_backup_roll(cost, added_at);
        self
    }

    /// 添加備用捲（排在隊尾）
    pub fn add_backup_roll(&mut self, cost: Decimal, added_at: DateTime<Utc>) {
        self.backup_rolls.push(BackupRoll { cost, added_at });
    }

    /// 顏色模糊比對
    pub fn matches_color(&self, requested: &str) -> bool {
        fuzzy_contains(&self.color, requested)
    }

    /// 每克成本
    pub fn cost_per_gram(&self, nominal_roll_grams: Decimal) -> Decimal {
        if nominal_roll_grams <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.current_roll_cost / nominal_roll_grams
    }

    /// 是否需要補貨（低於門檻且無備用捲）
    pub fn needs_reorder(&self) -> bool {
        self.amount <= self.reorder_at && self.backup_rolls.is_empty()
    }
}

/// 外購零件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalPart {
    pub name: String,
    pub quantity: u32,
    pub cost_per_unit: Decimal,
    pub reorder_at: u32,
}

impl ExternalPart {
    pub fn new(name: impl Into<String>, quantity: u32, cost_per_unit: Decimal) -> Self {
        Self {
            name: name.into(),
            quantity,
            cost_per_unit,
            reorder_at: 0,
        }
    }

    /// 建構器模式：設置補貨門檻
    pub fn with_reorder_at(mut self, reorder_at: u32) -> Self {
        self.reorder_at = reorder_at;
        self
    }

    /// 名稱比對（不分大小寫、完全相同）
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }

    pub fn needs_reorder(&self) -> bool {
        self.quantity <= self.reorder_at
    }
}

/// 團隊成員 ID → 耗材清單
pub type FilamentMap = HashMap<String, Vec<Filament>>;

/// 團隊成員 ID → 外購零件清單
pub type PartsMap = HashMap<String, Vec<ExternalPart>>;

/// 庫存快照
///
/// 對帳引擎每次呼叫都接收完整快照並回傳新的快照，不保留任何引用。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub filaments: FilamentMap,
    pub parts: PartsMap,
}

impl InventorySnapshot {
    pub fn new(filaments: FilamentMap, parts: PartsMap) -> Self {
        Self { filaments, parts }
    }

    /// 成員的耗材清單
    pub fn filaments_for(&self, member_id: &str) -> &[Filament] {
        self.filaments
            .get(member_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 成員的外購零件清單
    pub fn parts_for(&self, member_id: &str) -> &[ExternalPart] {
        self.parts.get(member_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 成員的補貨提醒
    pub fn reorder_alerts(&self, member_id: &str) -> Vec<ReorderAlert> {
        let filament_alerts = self
            .filaments_for(member_id)
            .iter()
            .filter(|f| f.needs_reorder())
            .map(|f| ReorderAlert::Filament {
                color: f.color.clone(),
                amount: f.amount,
                reorder_at: f.reorder_at,
            });

        let part_alerts = self
            .parts_for(member_id)
            .iter()
            .filter(|p| p.needs_reorder())
            .map(|p| ReorderAlert::Part {
                name: p.name.clone(),
                quantity: p.quantity,
                reorder_at: p.reorder_at,
            });

        filament_alerts.chain(part_alerts).collect()
    }
}

/// 補貨提醒
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReorderAlert {
    Filament {
        color: String,
        amount: Decimal,
        reorder_at: Decimal,
    },
    Part {
        name: String,
        quantity: u32,
        reorder_at: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_create_filament() {
        let filament = Filament::new("Sage Green", Decimal::from(800), Decimal::new(1850, 2));

        assert_eq!(filament.color, "Sage Green");
        assert_eq!(filament.reorder_at, Decimal::from(250));
        assert!(filament.backup_rolls.is_empty());
        assert!(!filament.needs_reorder());
        assert_eq!(
            filament.cost_per_gram(Decimal::from(1000)),
            Decimal::new(185, 4)
        );
    }

    #[test]
    fn test_filament_reorder() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let mut filament = Filament::new("Black", Decimal::from(200), Decimal::from(20));
        assert!(filament.needs_reorder());

        // 有備用捲就不需要補貨
        filament.add_backup_roll(Decimal::from(18), at);
        assert!(!filament.needs_reorder());
        assert_eq!(filament.backup_rolls[0].added_at, at);
    }

    #[test]
    fn test_part_name_match() {
        let part = ExternalPart::new("E26 Socket", 10, Decimal::new(125, 2));
        assert!(part.matches_name("e26 socket"));
        assert!(!part.matches_name("E26"));
    }

    #[test]
    fn test_reorder_alerts() {
        let mut snapshot = InventorySnapshot::default();
        snapshot.filaments.insert(
            "alex".to_string(),
            vec![
                Filament::new("White", Decimal::from(100), Decimal::from(20)),
                Filament::new("Navy", Decimal::from(900), Decimal::from(20)),
            ],
        );
        snapshot.parts.insert(
            "alex".to_string(),
            vec![ExternalPart::new("Cord", 2, Decimal::from(3)).with_reorder_at(5)],
        );

        let alerts = snapshot.reorder_alerts("alex");
        assert_eq!(alerts.len(), 2);
        assert!(matches!(&alerts[0], ReorderAlert::Filament { color, .. } if color == "White"));
        assert!(matches!(&alerts[1], ReorderAlert::Part { name, .. } if name == "Cord"));

        assert!(snapshot.reorder_alerts("nobody").is_empty());
    }
}
