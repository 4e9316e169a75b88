//! 庫存扣除與回補
//!
//! 顏色比對一律使用不分大小寫的雙向包含，清單中第一筆符合者勝出。
//! 庫存中若同時有 "Red" 與 "Dark Red"，要求 "Red" 會命中排在前面的那一筆。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use spool_core::{ExternalPart, Filament, Model, PartRequirement};

/// 自動換捲
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollSwap {
    pub color: String,
    /// 新掛載捲的價格
    pub new_roll_cost: Decimal,
    pub backups_remaining: usize,
}

impl RollSwap {
    pub fn message(&self) -> String {
        let plural = if self.backups_remaining == 1 { "" } else { "s" };
        format!(
            "Auto-switched to new roll of {} (${:.2})! {} backup roll{} remaining.",
            self.color, self.new_roll_cost, self.backups_remaining, plural
        )
    }
}

/// 單次耗材扣除結果
#[derive(Debug, Clone, PartialEq)]
pub struct FilamentDeduction {
    /// 被扣除的耗材在清單中的索引
    pub index: usize,
    /// 實際命中的庫存顏色
    pub color: String,
    pub grams: Decimal,
    /// 以扣除前的捲價計算的成本
    pub cost: Decimal,
    pub roll_swaps: Vec<RollSwap>,
    /// 需求超過庫存且無備用捲，餘量被歸零
    pub clamped: bool,
}

/// 決定查詢庫存用的顏色：訂單顏色 → 模型預設顏色 → 空字串
pub fn resolve_color<'a>(item_color: &'a str, model: &'a Model) -> &'a str {
    let item_color = item_color.trim();
    if !item_color.is_empty() {
        return item_color;
    }
    model.default_color.trim()
}

/// 第一筆顏色符合的耗材
pub fn find_filament(filaments: &[Filament], color: &str) -> Option<usize> {
    filaments.iter().position(|f| f.matches_color(color))
}

/// 扣除耗材
///
/// 扣到 0 以下且有備用捲時自動換上第一捲備用捲，餘量 = 標稱捲重 + 負數差額；
/// 沒有備用捲則歸零。找不到顏色時回傳 `None`，不做任何變更。
pub fn deduct_filament(
    filaments: &mut [Filament],
    color: &str,
    grams: Decimal,
    nominal_roll_grams: Decimal,
) -> Option<FilamentDeduction> {
    let index = find_filament(filaments, color)?;
    let filament = &mut filaments[index];

    let cost = grams * filament.cost_per_gram(nominal_roll_grams);
    let mut remaining = filament.amount - grams;
    let mut roll_swaps = Vec::new();

    if remaining <= Decimal::ZERO && !filament.backup_rolls.is_empty() {
        loop {
            let roll = filament.backup_rolls.remove(0);
            filament.current_roll_cost = roll.cost;
            remaining += nominal_roll_grams;
            roll_swaps.push(RollSwap {
                color: filament.color.clone(),
                new_roll_cost: roll.cost,
                backups_remaining: filament.backup_rolls.len(),
            });
            if remaining >= Decimal::ZERO || filament.backup_rolls.is_empty() {
                break;
            }
        }
    }

    let clamped = remaining < Decimal::ZERO;
    filament.amount = remaining.max(Decimal::ZERO);

    if clamped {
        tracing::warn!("{} 庫存不足，餘量歸零", filament.color);
    }
    for swap in &roll_swaps {
        tracing::info!("{}", swap.message());
    }

    Some(FilamentDeduction {
        index,
        color: filament.color.clone(),
        grams,
        cost,
        roll_swaps,
        clamped,
    })
}

/// 回補耗材到目前該顏色的庫存（不追溯原本扣除的是哪一捲）
///
/// 回傳命中的庫存顏色；找不到時回傳 `None`。
pub fn restore_filament(filaments: &mut [Filament], color: &str, grams: Decimal) -> Option<String> {
    let index = find_filament(filaments, color)?;
    let filament = &mut filaments[index];
    filament.amount += grams;
    Some(filament.color.clone())
}

/// 第一筆名稱相同（不分大小寫）的外購零件
pub fn find_part(parts: &[ExternalPart], name: &str) -> Option<usize> {
    parts.iter().position(|p| p.matches_name(name))
}

/// 扣除外購零件，不足時歸零；回傳庫存中找不到的零件名稱
pub fn deduct_parts(
    parts: &mut [ExternalPart],
    requirements: &[PartRequirement],
    order_quantity: u32,
) -> Vec<String> {
    let mut missing = Vec::new();
    for requirement in requirements {
        let needed = requirement.quantity.saturating_mul(order_quantity);
        match find_part(parts, &requirement.name) {
            Some(index) => {
                let part = &mut parts[index];
                part.quantity = part.quantity.saturating_sub(needed);
            }
            None => missing.push(requirement.name.clone()),
        }
    }
    missing
}

/// 回補外購零件；回傳庫存中找不到的零件名稱
pub fn restore_parts(
    parts: &mut [ExternalPart],
    requirements: &[PartRequirement],
    order_quantity: u32,
) -> Vec<String> {
    let mut missing = Vec::new();
    for requirement in requirements {
        let returned = requirement.quantity.saturating_mul(order_quantity);
        match find_part(parts, &requirement.name) {
            Some(index) => {
                let part = &mut parts[index];
                part.quantity = part.quantity.saturating_add(returned);
            }
            None => missing.push(requirement.name.clone()),
        }
    }
    missing
}

/// 外購零件成本
pub fn parts_cost(parts: &[ExternalPart], requirements: &[PartRequirement], order_quantity: u32) -> Decimal {
    requirements
        .iter()
        .filter_map(|req| {
            find_part(parts, &req.name).map(|i| {
                parts[i].cost_per_unit * Decimal::from(req.quantity) * Decimal::from(order_quantity)
            })
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn roll_grams() -> Decimal {
        Decimal::from(1000)
    }

    fn added_at() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_roll_swap() {
        let mut filaments = vec![Filament::new("Sage Green", Decimal::from(30), Decimal::from(15))
            .with_backup_roll(Decimal::from(18), added_at())];

        let result = deduct_filament(&mut filaments, "sage", Decimal::from(50), roll_grams()).unwrap();

        assert_eq!(filaments[0].amount, Decimal::from(980));
        assert!(filaments[0].backup_rolls.is_empty());
        assert_eq!(filaments[0].current_roll_cost, Decimal::from(18));
        assert_eq!(result.roll_swaps.len(), 1);
        assert_eq!(result.roll_swaps[0].backups_remaining, 0);
        assert!(!result.clamped);
        // 成本以扣除前的捲價計算
        assert_eq!(result.cost, Decimal::new(75, 2));
    }

    #[test]
    fn test_exact_zero_swaps_roll() {
        let mut filaments = vec![Filament::new("Black", Decimal::from(50), Decimal::from(20))
            .with_backup_roll(Decimal::from(22), added_at())
            .with_backup_roll(Decimal::from(19), added_at())];

        let result = deduct_filament(&mut filaments, "Black", Decimal::from(50), roll_grams()).unwrap();

        assert_eq!(filaments[0].amount, Decimal::from(1000));
        assert_eq!(filaments[0].backup_rolls.len(), 1);
        assert_eq!(
            result.roll_swaps[0].message(),
            "Auto-switched to new roll of Black ($22.00)! 1 backup roll remaining."
        );
    }

    #[test]
    fn test_clamp_without_backup() {
        let mut filaments = vec![Filament::new("White", Decimal::from(30), Decimal::from(20))];
        let result = deduct_filament(&mut filaments, "white", Decimal::from(50), roll_grams()).unwrap();

        assert_eq!(filaments[0].amount, Decimal::ZERO);
        assert!(result.clamped);
        assert!(result.roll_swaps.is_empty());
    }

    #[test]
    fn test_first_fuzzy_match_wins() {
        let mut filaments = vec![
            Filament::new("Dark Red", Decimal::from(500), Decimal::from(20)),
            Filament::new("Red", Decimal::from(500), Decimal::from(20)),
        ];
        let result = deduct_filament(&mut filaments, "Red", Decimal::from(100), roll_grams()).unwrap();

        assert_eq!(result.index, 0);
        assert_eq!(filaments[0].amount, Decimal::from(400));
        assert_eq!(filaments[1].amount, Decimal::from(500));
    }

    #[test]
    fn test_no_material_match() {
        let mut filaments = vec![Filament::new("Blue", Decimal::from(500), Decimal::from(20))];
        assert!(deduct_filament(&mut filaments, "Orange", Decimal::from(10), roll_grams()).is_none());
        assert!(deduct_filament(&mut filaments, "", Decimal::from(10), roll_grams()).is_none());
        assert_eq!(filaments[0].amount, Decimal::from(500));
    }

    #[test]
    fn test_parts_deduct_and_restore() {
        let mut parts = vec![
            ExternalPart::new("E26 Socket", 3, Decimal::new(150, 2)),
            ExternalPart::new("Cord", 10, Decimal::from(2)),
        ];
        let requirements = vec![
            PartRequirement::new("e26 socket", 1),
            PartRequirement::new("Cord", 2),
            PartRequirement::new("Shade Ring", 1),
        ];

        assert_eq!(
            parts_cost(&parts, &requirements, 2),
            Decimal::from(11)
        );

        let missing = deduct_parts(&mut parts, &requirements, 4);
        assert_eq!(missing, vec!["Shade Ring".to_string()]);
        assert_eq!(parts[0].quantity, 0);
        assert_eq!(parts[1].quantity, 2);

        restore_parts(&mut parts, &requirements, 1);
        assert_eq!(parts[0].quantity, 1);
        assert_eq!(parts[1].quantity, 4);
    }

    #[test]
    fn test_resolve_color() {
        let model = Model::new("Lamp").with_default_color("Charcoal");
        assert_eq!(resolve_color("Blue", &model), "Blue");
        assert_eq!(resolve_color("  ", &model), "Charcoal");
        assert_eq!(resolve_color("", &Model::new("Bare")), "");
    }

    proptest! {
        /// 沒有換捲時，扣除後立即回補會回到原本的餘量
        #[test]
        fn prop_deduct_restore_round_trip(amount in 1u32..5000, used in 0u32..5000) {
            prop_assume!(used < amount);
            let mut filaments = vec![Filament::new("Teal", Decimal::from(amount), Decimal::from(20))];

            let deduction = deduct_filament(&mut filaments, "teal", Decimal::from(used), roll_grams());
            prop_assert!(deduction.is_some());
            restore_filament(&mut filaments, "teal", Decimal::from(used));

            prop_assert_eq!(filaments[0].amount, Decimal::from(amount));
        }

        /// 換捲守恆：餘量 = 標稱捲重 + (原餘量 - 用量)
        #[test]
        fn prop_roll_swap_conservation(amount in 0u32..1000, extra in 0u32..999, cost in 1u32..60) {
            let used = amount + extra;
            let mut filaments = vec![Filament::new("Navy", Decimal::from(amount), Decimal::from(10))
                .with_backup_roll(Decimal::from(cost), added_at())
                .with_backup_roll(Decimal::from(cost + 1), added_at())];

            deduct_filament(&mut filaments, "Navy", Decimal::from(used), roll_grams());

            let expected = Decimal::from(1000) + Decimal::from(amount) - Decimal::from(used);
            prop_assert_eq!(filaments[0].amount, expected);
            prop_assert_eq!(filaments[0].backup_rolls.len(), 1);
            prop_assert_eq!(filaments[0].current_roll_cost, Decimal::from(cost));
        }
    }
}
