//! 成本估算與缺料檢查（不修改庫存）

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use spool_core::{Clock, InventorySnapshot, Model};

use crate::reconcile::{Reconciler, WorkItem};
use crate::stock;
use crate::usage::plan_usage;

/// 成本為零的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZeroCostReason {
    /// 庫存中沒有符合的顏色
    NoMaterialMatch,
    /// 符合的耗材捲價為 0
    ZeroRollCost,
    /// 模型沒有盤位或耗材用量資料
    NoUsageData,
}

impl ZeroCostReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoMaterialMatch => "no matching filament",
            Self::ZeroRollCost => "roll cost not set",
            Self::NoUsageData => "no usage data",
        }
    }
}

/// 成本估算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    /// 單色耗材用量（克）
    pub grams: Decimal,
    pub filament_cost: Decimal,
    pub parts_cost: Decimal,
    pub print_minutes: u32,
    /// 耗材成本為零時的原因
    pub zero_reason: Option<ZeroCostReason>,
}

impl CostEstimate {
    pub fn total(&self) -> Decimal {
        self.filament_cost + self.parts_cost
    }
}

/// 庫存不足
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shortfall {
    /// 耗材不足（可用量含備用捲）
    Filament {
        color: String,
        required: Decimal,
        available: Decimal,
    },
    /// 外購零件不足
    Part {
        name: String,
        required: u32,
        available: u32,
    },
    /// 庫存中沒有這個顏色
    NoMaterialMatch { color: String },
}

impl<C: Clock> Reconciler<C> {
    /// 估算材料成本
    ///
    /// 只計算單色零件；多色零件的顏色在完成時才決定，不列入估算。
    pub fn estimate_cost(
        &self,
        work: WorkItem<'_>,
        model: &Model,
        snapshot: &InventorySnapshot,
    ) -> CostEstimate {
        let plan = plan_usage(model, work.printer_id, work.quantity);
        let grams = plan.single_color_grams();
        let color = stock::resolve_color(work.color, model);
        let filaments = snapshot.filaments_for(work.member_id);

        let (filament_cost, zero_reason) = if grams <= Decimal::ZERO {
            (Decimal::ZERO, Some(ZeroCostReason::NoUsageData))
        } else {
            match stock::find_filament(filaments, color) {
                None => (Decimal::ZERO, Some(ZeroCostReason::NoMaterialMatch)),
                Some(index) => {
                    let per_gram = filaments[index].cost_per_gram(self.config().nominal_roll_grams);
                    if per_gram <= Decimal::ZERO {
                        (Decimal::ZERO, Some(ZeroCostReason::ZeroRollCost))
                    } else {
                        (grams * per_gram, None)
                    }
                }
            }
        };

        CostEstimate {
            grams,
            filament_cost,
            parts_cost: stock::parts_cost(
                snapshot.parts_for(work.member_id),
                &model.external_parts,
                work.quantity,
            ),
            print_minutes: plan.print_minutes(),
            zero_reason,
        }
    }

    /// 列出完成此項目前不足的耗材與外購零件
    pub fn shortfalls(
        &self,
        work: WorkItem<'_>,
        model: &Model,
        snapshot: &InventorySnapshot,
    ) -> Vec<Shortfall> {
        let mut shortfalls = Vec::new();
        let plan = plan_usage(model, work.printer_id, work.quantity);
        let required = plan.single_color_grams();

        if required > Decimal::ZERO {
            let color = stock::resolve_color(work.color, model);
            let filaments = snapshot.filaments_for(work.member_id);
            match stock::find_filament(filaments, color) {
                Some(index) => {
                    let filament = &filaments[index];
                    let available = filament.amount
                        + Decimal::from(filament.backup_rolls.len())
                            * self.config().nominal_roll_grams;
                    if available < required {
                        shortfalls.push(Shortfall::Filament {
                            color: filament.color.clone(),
                            required,
                            available,
                        });
                    }
                }
                None => shortfalls.push(Shortfall::NoMaterialMatch {
                    color: color.to_string(),
                }),
            }
        }

        let parts = snapshot.parts_for(work.member_id);
        for requirement in &model.external_parts {
            let required = requirement.quantity.saturating_mul(work.quantity);
            let available = stock::find_part(parts, &requirement.name)
                .map(|i| parts[i].quantity)
                .unwrap_or(0);
            if available < required {
                shortfalls.push(Shortfall::Part {
                    name: requirement.name.clone(),
                    required,
                    available,
                });
            }
        }

        if !shortfalls.is_empty() {
            tracing::debug!("{} 庫存不足: {:?}", work.item, shortfalls);
        }
        shortfalls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use spool_core::{ExternalPart, Filament, FixedClock, Order, ShopConfig};
    use uuid::Uuid;

    const MEMBER: &str = "alex";

    fn reconciler() -> Reconciler<FixedClock> {
        Reconciler::new(
            ShopConfig::default(),
            FixedClock(Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap()),
        )
    }

    fn snapshot() -> InventorySnapshot {
        let mut snapshot = InventorySnapshot::default();
        snapshot.filaments.insert(
            MEMBER.to_string(),
            vec![
                Filament::new("Matte Black", Decimal::from(120), Decimal::from(20))
                    .with_backup_roll(Decimal::from(18), Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
                Filament::new("Promo White", Decimal::from(900), Decimal::ZERO),
            ],
        );
        snapshot.parts.insert(
            MEMBER.to_string(),
            vec![ExternalPart::new("Plug-in Cord", 1, Decimal::new(350, 2))],
        );
        snapshot
    }

    fn sconce() -> Model {
        Model::new("Sconce")
            .with_filament_usage(Decimal::from(250))
            .with_external_part("Plug-in Cord", 1)
    }

    fn order(color: &str, quantity: u32) -> Order {
        Order::new(
            Uuid::nil(),
            "5100000001",
            "Sconce",
            quantity,
            Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap(),
        )
        .with_color(color)
    }

    #[test]
    fn test_estimate_cost() {
        let order = order("black", 2);
        let estimate =
            reconciler().estimate_cost(WorkItem::from_order(&order, MEMBER), &sconce(), &snapshot());

        assert_eq!(estimate.grams, Decimal::from(500));
        assert_eq!(estimate.filament_cost, Decimal::from(10));
        assert_eq!(estimate.parts_cost, Decimal::from(7));
        assert_eq!(estimate.total(), Decimal::from(17));
        assert_eq!(estimate.zero_reason, None);
    }

    #[rstest]
    #[case("Orange", sconce(), ZeroCostReason::NoMaterialMatch)]
    #[case("White", sconce(), ZeroCostReason::ZeroRollCost)]
    #[case("Black", Model::new("Sconce"), ZeroCostReason::NoUsageData)]
    fn test_zero_cost_reason(#[case] color: &str, #[case] model: Model, #[case] reason: ZeroCostReason) {
        let order = order(color, 1);
        let estimate =
            reconciler().estimate_cost(WorkItem::from_order(&order, MEMBER), &model, &snapshot());

        assert_eq!(estimate.filament_cost, Decimal::ZERO);
        assert_eq!(estimate.zero_reason, Some(reason));
    }

    #[test]
    fn test_estimate_does_not_mutate() {
        let before = snapshot();
        let order = order("black", 1);
        reconciler().estimate_cost(WorkItem::from_order(&order, MEMBER), &sconce(), &before);
        assert_eq!(before, snapshot());
    }

    #[test]
    fn test_shortfalls() {
        let reconciler = reconciler();

        // 120g + 1 捲備用 = 1120g 可用
        let order_ok = order("Black", 1);
        assert!(reconciler
            .shortfalls(WorkItem::from_order(&order_ok, MEMBER), &sconce(), &snapshot())
            .is_empty());

        let order_big = order("Black", 5);
        let shortfalls =
            reconciler.shortfalls(WorkItem::from_order(&order_big, MEMBER), &sconce(), &snapshot());
        assert_eq!(
            shortfalls,
            vec![
                Shortfall::Filament {
                    color: "Matte Black".to_string(),
                    required: Decimal::from(1250),
                    available: Decimal::from(1120),
                },
                Shortfall::Part {
                    name: "Plug-in Cord".to_string(),
                    required: 5,
                    available: 1,
                },
            ]
        );

        let order_orange = order("Orange", 1);
        let shortfalls =
            reconciler.shortfalls(WorkItem::from_order(&order_orange, MEMBER), &sconce(), &snapshot());
        assert_eq!(
            shortfalls,
            vec![Shortfall::NoMaterialMatch {
                color: "Orange".to_string()
            }]
        );
    }
}
