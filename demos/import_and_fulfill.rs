//! 訂單匯入與完成範例
//!
//! 貼上兩筆同買家的訂單列，合併後比對模型、估算成本並扣除庫存。

use chrono::Utc;
use spool::prelude::*;
use std::collections::HashMap;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("===== Spool Import & Fulfill Example =====\n");

    // 步驟 1: 匯入
    println!("[1] Import pasted rows");
    let pasted = "\
4790820615\tModern Hourglass Wall Sconce\t1\tOuter Shell Color, Power Type, Blue, Hard-Wired\t62.75\t4.72\tJane Doe
4790820616\tMoon Lamp\t1\tColor, Sage\t38.00\t2.85\tJane Doe";

    let config = ShopConfig::default();
    let parser = OrderParser::with_defaults(config.clone());
    let batch = parser
        .import(pasted, &ExistingOrderIds::default(), Some("etsy"))
        .ok_or_else(|| anyhow::anyhow!("nothing to import"))?;

    println!(
        "    {} new, {} duplicate, {} combined, {} skipped\n",
        batch.new_count, batch.duplicate_count, batch.combined_count, batch.skipped_count
    );
    let order = batch
        .orders
        .first()
        .ok_or_else(|| anyhow::anyhow!("no orders parsed"))?;
    println!("    {} | {} | {}", order.order_id, order.item, order.price_label());

    // 步驟 2: 產品目錄與庫存
    println!("\n[2] Catalog and inventory");
    let catalog = vec![
        Model::new("Hourglass Wall Sconce").with_filament_usage(Decimal::from(120)),
        Model::new("Hourglass Wall Sconce")
            .with_filament_usage(Decimal::from(120))
            .with_external_part("Hard-Wired Kit", 1),
        Model::new("Moon Lamp")
            .with_default_color("White")
            .with_printer_setting(PrinterSetting::new(
                "A1",
                vec![
                    Plate::new(
                        "Shade",
                        vec![PlatePart::new("Shade", Decimal::from(140)).with_print_time(3, 20)],
                    ),
                    Plate::new(
                        "Base",
                        vec![
                            PlatePart::new("Base", Decimal::from(45)).with_print_time(1, 10),
                            PlatePart::new("Moon Face", Decimal::from(6)).multi_color(),
                        ],
                    ),
                ],
            )),
    ];

    let member = "sam";
    let mut inventory = InventorySnapshot::default();
    inventory.filaments.insert(
        member.to_string(),
        vec![
            Filament::new("Blue", Decimal::from(400), Decimal::new(2199, 2)),
            Filament::new("Sage Green", Decimal::from(90), Decimal::new(1850, 2))
                .with_backup_roll(Decimal::new(1850, 2), Utc::now())
                .with_backup_roll(Decimal::new(1999, 2), Utc::now()),
            Filament::new("Gold Silk", Decimal::from(600), Decimal::from(28)),
        ],
    );
    inventory.parts.insert(
        member.to_string(),
        vec![ExternalPart::new("Hard-Wired Kit", 4, Decimal::new(650, 2))],
    );

    // 步驟 3: 成本估算
    println!("\n[3] Estimate");
    let reconciler = Reconciler::with_defaults(config);
    let matcher = ModelMatcher::new(&catalog);
    if let Some(items) = &order.line_items {
        for (index, item) in items.iter().enumerate() {
            let work = WorkItem::from_line_item(order, index, item, member);
            let variant = Some(item.extra.as_str()).filter(|v| !v.is_empty());
            match matcher.find_model(&item.item, variant) {
                Some(model) => {
                    let estimate = reconciler.estimate_cost(work, model, &inventory);
                    println!(
                        "    {}: {}g, ${:.2}, {} min{}",
                        item.item,
                        estimate.grams,
                        estimate.total(),
                        estimate.print_minutes,
                        estimate
                            .zero_reason
                            .map(|r| format!(" ({})", r.label()))
                            .unwrap_or_default()
                    );
                    for shortfall in reconciler.shortfalls(work, model, &inventory) {
                        println!("      short: {:?}", shortfall);
                    }
                }
                None => println!("    {}: no model", item.item),
            }
        }
    }

    // 步驟 4: 完成訂單（月亮臉指定金色）
    println!("\n[4] Fulfill");
    let part_colors: HashMap<usize, PartColors> =
        [(1, PartColors::new().with(1, 1, "Gold"))].into_iter().collect();
    let result = reconciler.fulfill_order(order, &catalog, member, &part_colors, &inventory);
    inventory = result.inventory.clone();

    println!("    status: {:?}, cost: ${:.2}", result.order.status, result.cost);
    for message in result.messages() {
        println!("    ! {}", message);
    }
    for event in &result.usage_events {
        println!("    used {}g of {}", event.amount, event.color);
    }

    // 步驟 5: 補貨提醒
    println!("\n[5] Reorder alerts");
    for alert in inventory.reorder_alerts(member) {
        println!("    {:?}", alert);
    }

    Ok(())
}
