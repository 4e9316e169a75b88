//! 庫存對帳引擎
//!
//! 每次呼叫接收完整的庫存快照，回傳新的快照與使用紀錄，不修改輸入。
//! 同一成員的庫存寫入需由呼叫端依序提交，引擎本身不做任何鎖定。

use rust_decimal::Decimal;
use std::collections::HashMap;

use spool_core::{
    Clock, FulfillmentState, InventorySnapshot, LineItem, Model, Order, OrderStatus,
    PlateTransition, ShopConfig, SpoolError, SystemClock,
};

use crate::matcher::ModelMatcher;
use crate::stock::{self, RollSwap};
use crate::usage::{plan_usage, PlateUsage, UsagePlan};
use crate::{Notice, ReconcileOutcome, UsageEvent};

/// 待對帳的項目（單一商品訂單或組合訂單中的一筆明細）
#[derive(Debug, Clone, Copy)]
pub struct WorkItem<'a> {
    pub order_id: &'a str,
    /// 庫存所屬的團隊成員
    pub member_id: &'a str,
    pub item: &'a str,
    /// 規格文字，用於比對模型變體
    pub variant: &'a str,
    pub quantity: u32,
    pub color: &'a str,
    pub printer_id: Option<&'a str>,
    /// 組合訂單的明細索引；單一商品訂單為 `None`
    pub line_item: Option<usize>,
}

impl<'a> WorkItem<'a> {
    pub fn from_order(order: &'a Order, member_id: &'a str) -> Self {
        Self {
            order_id: &order.order_id,
            member_id,
            item: &order.item,
            variant: &order.extra,
            quantity: order.quantity,
            color: &order.color,
            printer_id: order.printer_id.as_deref(),
            line_item: None,
        }
    }

    /// 組合訂單中第 `index` 筆明細
    pub fn from_line_item(
        order: &'a Order,
        index: usize,
        line_item: &'a LineItem,
        member_id: &'a str,
    ) -> Self {
        Self {
            order_id: &order.order_id,
            member_id,
            item: &line_item.item,
            variant: &line_item.extra,
            quantity: line_item.quantity,
            color: &line_item.color,
            printer_id: order.printer_id.as_deref(),
            line_item: Some(index),
        }
    }

    /// 非空白的規格文字
    fn variant_hint(&self) -> Option<&'a str> {
        Some(self.variant).filter(|v| !v.trim().is_empty())
    }
}

/// 多色零件的顏色：(盤位索引, 零件索引) → 顏色
#[derive(Debug, Clone, Default)]
pub struct PartColors {
    colors: HashMap<(usize, usize), String>,
}

impl PartColors {
    pub fn new() -> Self {
        Self::default()
    }

    /// 單一盤位的零件顏色
    pub fn for_plate(plate_index: usize, colors: HashMap<usize, String>) -> Self {
        Self {
            colors: colors
                .into_iter()
                .map(|(part, color)| ((plate_index, part), color))
                .collect(),
        }
    }

    /// 建構器模式：設置零件顏色
    pub fn with(mut self, plate_index: usize, part_index: usize, color: impl Into<String>) -> Self {
        self.set(plate_index, part_index, color);
        self
    }

    pub fn set(&mut self, plate_index: usize, part_index: usize, color: impl Into<String>) {
        self.colors.insert((plate_index, part_index), color.into());
    }

    /// 已指定且非空白的顏色
    pub fn get(&self, plate_index: usize, part_index: usize) -> Option<&str> {
        self.colors
            .get(&(plate_index, part_index))
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }
}

/// 等待顏色的盤位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithheldPlate {
    /// 組合訂單的明細索引；單一商品訂單為 `None`
    pub line_item: Option<usize>,
    pub plate_index: usize,
}

/// 整張訂單的完成結果
#[derive(Debug, Clone)]
pub struct OrderFulfillment {
    /// 更新進度與狀態後的訂單
    pub order: Order,
    pub inventory: InventorySnapshot,
    pub cost: Decimal,
    pub usage_events: Vec<UsageEvent>,
    pub roll_swaps: Vec<RollSwap>,
    pub withheld: Vec<WithheldPlate>,
    /// 找不到模型的商品，未計算用量
    pub unresolved_items: Vec<String>,
    pub notices: Vec<Notice>,
}

impl OrderFulfillment {
    fn new(order: Order, inventory: InventorySnapshot) -> Self {
        Self {
            order,
            inventory,
            cost: Decimal::ZERO,
            usage_events: Vec::new(),
            roll_swaps: Vec::new(),
            withheld: Vec::new(),
            unresolved_items: Vec::new(),
            notices: Vec::new(),
        }
    }

    fn absorb(&mut self, outcome: ReconcileOutcome, line_item: Option<usize>) {
        self.inventory = outcome.inventory;
        self.cost += outcome.cost;
        self.usage_events.extend(outcome.usage_events);
        self.roll_swaps.extend(outcome.roll_swaps);
        self.withheld
            .extend(outcome.withheld_plates.into_iter().map(|plate_index| WithheldPlate {
                line_item,
                plate_index,
            }));
        self.notices.extend(outcome.notices);
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices.iter().map(|n| n.message.clone()).collect()
    }
}

/// 庫存對帳器
pub struct Reconciler<C: Clock = SystemClock> {
    config: ShopConfig,
    clock: C,
}

impl Reconciler {
    /// 使用系統時鐘
    pub fn with_defaults(config: ShopConfig) -> Self {
        Self::new(config, SystemClock)
    }
}

impl<C: Clock> Reconciler<C> {
    pub fn new(config: ShopConfig, clock: C) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    /// 完成一個項目：扣除所有尚未完成盤位的耗材，全部完成後再扣除外購零件
    ///
    /// 先前已個別完成的盤位不會重複扣除；缺少多色零件顏色的盤位會保留不處理。
    pub fn fulfill(
        &self,
        work: WorkItem<'_>,
        model: &Model,
        progress: &FulfillmentState,
        part_colors: &PartColors,
        snapshot: &InventorySnapshot,
    ) -> ReconcileOutcome {
        if progress.is_fulfilled() {
            tracing::debug!("{} 已完成，略過", work.item);
            return ReconcileOutcome::unchanged(snapshot, progress);
        }

        let plan = plan_usage(model, work.printer_id, work.quantity);
        let color = stock::resolve_color(work.color, model);
        let mut pass = Pass::new(work, model, snapshot, self.config.nominal_roll_grams);
        let mut progress = progress.clone();

        match &plan {
            UsagePlan::Plates(plates) => {
                let total = plates.len();
                for (index, plate) in plates.iter().enumerate() {
                    if progress.is_plate_completed(index) {
                        continue;
                    }
                    // 先推進進度，成功後才扣除，兩者不會分歧
                    let mut next = progress.clone();
                    if let Err(e) = next.complete_plate(index, total) {
                        tracing::warn!("無法標記盤位 {} 完成: {}", index, e);
                        continue;
                    }
                    if pass.deduct_plate(plate, color, part_colors) {
                        progress = next;
                    }
                }
            }
            UsagePlan::Scalar(grams) => {
                pass.deduct(color, *grams);
                progress = FulfillmentState::Fulfilled;
            }
            UsagePlan::NoData => {
                tracing::debug!("模型 {} 沒有用量資料", model.name);
                progress = FulfillmentState::Fulfilled;
            }
        }

        if progress.is_fulfilled() {
            pass.deduct_parts(model);
        }

        pass.finish(progress, &self.clock)
    }

    /// 完成單一盤位
    ///
    /// 盤位含多色零件但未指定顏色時不扣除，回傳結果的 `withheld_plates` 會列出該盤位。
    pub fn complete_plate(
        &self,
        work: WorkItem<'_>,
        model: &Model,
        progress: &FulfillmentState,
        plate_index: usize,
        part_colors: &PartColors,
        snapshot: &InventorySnapshot,
    ) -> spool_core::Result<ReconcileOutcome> {
        let plan = plan_usage(model, work.printer_id, work.quantity);
        let total = plan.plate_count();
        let plate = plan.plate(plate_index).ok_or(SpoolError::PlateOutOfRange {
            index: plate_index,
            total,
        })?;

        if progress.is_fulfilled() {
            return Err(SpoolError::AlreadyFulfilled);
        }
        if progress.is_plate_completed(plate_index) {
            tracing::debug!("盤位 {} 已完成，不重複扣除", plate_index);
            return Ok(ReconcileOutcome::unchanged(snapshot, progress));
        }

        let color = stock::resolve_color(work.color, model);
        let mut pass = Pass::new(work, model, snapshot, self.config.nominal_roll_grams);
        let mut progress = progress.clone();

        if pass.deduct_plate(plate, color, part_colors)
            && progress.complete_plate(plate_index, total)? == PlateTransition::ItemFulfilled
        {
            pass.deduct_parts(model);
        }

        Ok(pass.finish(progress, &self.clock))
    }

    /// 取消完成：依先前的使用紀錄回補耗材，已完成的項目一併回補外購零件
    ///
    /// 只回補同一訂單、同一明細的紀錄。回補到目前該顏色的庫存；若期間已換捲，不會還原換捲。
    pub fn unfulfill(
        &self,
        work: WorkItem<'_>,
        model: &Model,
        progress: &FulfillmentState,
        deducted: &[UsageEvent],
        snapshot: &InventorySnapshot,
    ) -> ReconcileOutcome {
        let mut pass = Pass::new(work, model, snapshot, self.config.nominal_roll_grams);

        for event in deducted.iter().filter(|e| {
            e.order_id == work.order_id
                && e.line_item == work.line_item
                && e.member_id == work.member_id
                && e.model_name == model.name
        }) {
            pass.restore(&event.color, event.amount);
        }

        if progress.is_fulfilled() {
            pass.restore_parts(model);
        }

        pass.finish(FulfillmentState::Pending, &self.clock)
    }

    /// 完成整張訂單；組合訂單逐筆明細比對模型並對帳
    pub fn fulfill_order(
        &self,
        order: &Order,
        catalog: &[Model],
        member_id: &str,
        part_colors: &HashMap<usize, PartColors>,
        snapshot: &InventorySnapshot,
    ) -> OrderFulfillment {
        let matcher = ModelMatcher::new(catalog);
        let no_colors = PartColors::default();
        let mut result = OrderFulfillment::new(order.clone(), snapshot.clone());

        match order.line_items.as_ref().filter(|items| !items.is_empty()) {
            Some(items) => {
                let mut states = Vec::with_capacity(items.len());
                for (index, line_item) in items.iter().enumerate() {
                    let work = WorkItem::from_line_item(order, index, line_item, member_id);
                    let colors = part_colors.get(&index).unwrap_or(&no_colors);
                    states.push(self.fulfill_resolved(
                        work,
                        &matcher,
                        &line_item.progress,
                        colors,
                        &mut result,
                        Some(index),
                    ));
                }
                if let Some(updated) = result.order.line_items.as_mut() {
                    for (line_item, state) in updated.iter_mut().zip(states) {
                        line_item.progress = state;
                    }
                }
            }
            None => {
                let work = WorkItem::from_order(order, member_id);
                let colors = part_colors.get(&0).unwrap_or(&no_colors);
                let state =
                    self.fulfill_resolved(work, &matcher, &order.progress, colors, &mut result, None);
                result.order.progress = state;
            }
        }

        if result.order.all_items_fulfilled() {
            result.order.set_status(OrderStatus::Fulfilled);
        }

        tracing::info!(
            "訂單 {} 對帳完成：成本 {}，使用紀錄 {} 筆，待指定顏色盤位 {} 個",
            order.order_id,
            result.cost,
            result.usage_events.len(),
            result.withheld.len()
        );

        result
    }

    /// 完成訂單中某一項目的單一盤位
    ///
    /// `line_item` 為 `None` 時操作單一商品訂單本身。
    #[allow(clippy::too_many_arguments)]
    pub fn complete_order_plate(
        &self,
        order: &Order,
        line_item: Option<usize>,
        plate_index: usize,
        catalog: &[Model],
        member_id: &str,
        part_colors: &PartColors,
        snapshot: &InventorySnapshot,
    ) -> spool_core::Result<OrderFulfillment> {
        let (work, progress) = match line_item {
            Some(index) => {
                let item = order
                    .line_items
                    .as_ref()
                    .and_then(|items| items.get(index))
                    .ok_or(SpoolError::LineItemNotFound(index))?;
                (WorkItem::from_line_item(order, index, item, member_id), &item.progress)
            }
            None => (WorkItem::from_order(order, member_id), &order.progress),
        };

        let model = ModelMatcher::new(catalog)
            .find_model(work.item, work.variant_hint())
            .ok_or_else(|| SpoolError::ModelNotFound(work.item.to_string()))?;
        let outcome = self.complete_plate(work, model, progress, plate_index, part_colors, snapshot)?;

        let mut result = OrderFulfillment::new(order.clone(), snapshot.clone());
        let state = outcome.progress.clone();
        result.absorb(outcome, line_item);
        match line_item {
            Some(index) => {
                if let Some(item) = result
                    .order
                    .line_items
                    .as_mut()
                    .and_then(|items| items.get_mut(index))
                {
                    item.progress = state;
                }
            }
            None => result.order.progress = state,
        }

        if result.order.all_items_fulfilled() {
            result.order.set_status(OrderStatus::Fulfilled);
        }
        Ok(result)
    }

    fn fulfill_resolved(
        &self,
        work: WorkItem<'_>,
        matcher: &ModelMatcher<'_>,
        progress: &FulfillmentState,
        part_colors: &PartColors,
        result: &mut OrderFulfillment,
        line_item: Option<usize>,
    ) -> FulfillmentState {
        if progress.is_fulfilled() {
            return progress.clone();
        }

        match matcher.find_model(work.item, work.variant_hint()) {
            Some(model) => {
                let outcome = self.fulfill(work, model, progress, part_colors, &result.inventory);
                let state = outcome.progress.clone();
                result.absorb(outcome, line_item);
                state
            }
            None => {
                tracing::warn!("找不到 {} 的模型，略過用量計算", work.item);
                result.unresolved_items.push(work.item.to_string());
                result.notices.push(Notice::warning(
                    work.item.to_string(),
                    format!("No model found for {}; material usage skipped.", work.item),
                ));
                FulfillmentState::Fulfilled
            }
        }
    }
}

/// 單次對帳的工作區
struct Pass<'a> {
    work: WorkItem<'a>,
    model_name: String,
    nominal_roll_grams: Decimal,
    inventory: InventorySnapshot,
    cost: Decimal,
    /// 依首次扣除順序累計的 (庫存顏色, 克數)
    deducted: Vec<(String, Decimal)>,
    roll_swaps: Vec<RollSwap>,
    unmatched_colors: Vec<String>,
    withheld_plates: Vec<usize>,
    notices: Vec<Notice>,
}

impl<'a> Pass<'a> {
    fn new(
        work: WorkItem<'a>,
        model: &Model,
        snapshot: &InventorySnapshot,
        nominal_roll_grams: Decimal,
    ) -> Self {
        Self {
            work,
            model_name: model.name.clone(),
            nominal_roll_grams,
            inventory: snapshot.clone(),
            cost: Decimal::ZERO,
            deducted: Vec::new(),
            roll_swaps: Vec::new(),
            unmatched_colors: Vec::new(),
            withheld_plates: Vec::new(),
            notices: Vec::new(),
        }
    }

    fn deduct(&mut self, color: &str, grams: Decimal) {
        if grams <= Decimal::ZERO {
            return;
        }

        let nominal = self.nominal_roll_grams;
        let deduction = self
            .inventory
            .filaments
            .get_mut(self.work.member_id)
            .and_then(|filaments| stock::deduct_filament(filaments, color, grams, nominal));

        let Some(deduction) = deduction else {
            self.no_material_match(color);
            return;
        };

        self.cost += deduction.cost;
        match self
            .deducted
            .iter_mut()
            .find(|(matched, _)| *matched == deduction.color)
        {
            Some((_, total)) => *total += deduction.grams,
            None => self
                .deducted
                .push((deduction.color.clone(), deduction.grams)),
        }

        if deduction.clamped {
            self.notices.push(Notice::warning(
                deduction.color.clone(),
                format!("{} ran out while printing {}.", deduction.color, self.work.item),
            ));
        }
        for swap in deduction.roll_swaps {
            self.notices
                .push(Notice::info(swap.color.clone(), swap.message()));
            self.roll_swaps.push(swap);
        }
    }

    fn restore(&mut self, color: &str, grams: Decimal) {
        let restored = self
            .inventory
            .filaments
            .get_mut(self.work.member_id)
            .and_then(|filaments| stock::restore_filament(filaments, color, grams));

        match restored {
            Some(matched) => tracing::debug!("回補 {} {} 克", matched, grams),
            None => self.no_material_match(color),
        }
    }

    fn no_material_match(&mut self, color: &str) {
        let label = if color.is_empty() { "(no color)" } else { color };
        tracing::warn!("成員 {} 的庫存中找不到顏色 {}", self.work.member_id, label);

        if !self
            .unmatched_colors
            .iter()
            .any(|c| c.eq_ignore_ascii_case(color))
        {
            self.unmatched_colors.push(color.to_string());
        }
        self.notices.push(Notice::warning(
            label.to_string(),
            format!("No matching filament for {} ({}).", label, self.work.item),
        ));
    }

    /// 扣除一個盤位；多色零件缺少顏色時整盤保留，回傳 false
    fn deduct_plate(&mut self, plate: &PlateUsage, color: &str, part_colors: &PartColors) -> bool {
        let missing: Vec<&str> = plate
            .multi_color
            .iter()
            .filter(|part| part_colors.get(plate.plate_index, part.part_index).is_none())
            .map(|part| part.part_name.as_str())
            .collect();

        if !missing.is_empty() {
            tracing::debug!("盤位 {} 缺少多色零件顏色: {:?}", plate.plate_name, missing);
            self.withheld_plates.push(plate.plate_index);
            self.notices.push(Notice::warning(
                plate.plate_name.clone(),
                format!(
                    "Plate {} needs a color for: {}.",
                    plate.plate_name,
                    missing.join(", ")
                ),
            ));
            return false;
        }

        self.deduct(color, plate.single_color_grams);
        for part in &plate.multi_color {
            if let Some(part_color) = part_colors.get(plate.plate_index, part.part_index) {
                self.deduct(part_color, part.grams);
            }
        }
        true
    }

    fn deduct_parts(&mut self, model: &Model) {
        if model.external_parts.is_empty() {
            return;
        }

        let mut empty = Vec::new();
        let parts = self
            .inventory
            .parts
            .get_mut(self.work.member_id)
            .unwrap_or(&mut empty);

        let cost = stock::parts_cost(parts, &model.external_parts, self.work.quantity);
        let missing = stock::deduct_parts(parts, &model.external_parts, self.work.quantity);
        self.cost += cost;

        for name in missing {
            tracing::warn!("庫存中找不到外購零件 {}", name);
            self.notices.push(Notice::warning(
                name.clone(),
                format!("External part {} is not in inventory.", name),
            ));
        }
    }

    fn restore_parts(&mut self, model: &Model) {
        if let Some(parts) = self.inventory.parts.get_mut(self.work.member_id) {
            for name in stock::restore_parts(parts, &model.external_parts, self.work.quantity) {
                tracing::warn!("無法回補外購零件 {}", name);
            }
        }
    }

    fn finish(self, progress: FulfillmentState, clock: &dyn Clock) -> ReconcileOutcome {
        let date = clock.now();
        let usage_events = self
            .deducted
            .into_iter()
            .map(|(color, amount)| UsageEvent {
                color,
                amount,
                date,
                order_id: self.work.order_id.to_string(),
                member_id: self.work.member_id.to_string(),
                line_item: self.work.line_item,
                model_name: self.model_name.clone(),
            })
            .collect();

        ReconcileOutcome {
            inventory: self.inventory,
            cost: self.cost,
            usage_events,
            progress,
            withheld_plates: self.withheld_plates,
            unmatched_colors: self.unmatched_colors,
            roll_swaps: self.roll_swaps,
            notices: self.notices,
        }
    }
}
