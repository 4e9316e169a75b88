//! 訂單項目的列印進度
//!
//! 狀態流轉：`Pending` → `PartiallyPlated` → `Fulfilled`。
//! 所有盤位完成後項目才能標記為已完成。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{Result, SpoolError};

/// 單一項目（訂單或訂單明細）的完成狀態
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentState {
    #[default]
    Pending,
    /// 已完成的盤位索引
    PartiallyPlated(BTreeSet<usize>),
    Fulfilled,
}

/// 完成一個盤位後的結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateTransition {
    /// 盤位已完成，項目仍有其他盤位
    PlateCompleted,
    /// 此盤位先前已完成，不做任何變更
    AlreadyCompleted,
    /// 最後一個盤位完成，項目轉為已完成
    ItemFulfilled,
}

impl FulfillmentState {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled)
    }

    /// 盤位是否已完成
    pub fn is_plate_completed(&self, plate_index: usize) -> bool {
        match self {
            Self::Pending => false,
            Self::PartiallyPlated(done) => done.contains(&plate_index),
            Self::Fulfilled => true,
        }
    }

    /// 尚未完成的盤位
    pub fn pending_plates(&self, total_plates: usize) -> Vec<usize> {
        (0..total_plates)
            .filter(|&i| !self.is_plate_completed(i))
            .collect()
    }

    /// 標記盤位完成
    pub fn complete_plate(
        &mut self,
        plate_index: usize,
        total_plates: usize,
    ) -> Result<PlateTransition> {
        if plate_index >= total_plates {
            return Err(SpoolError::PlateOutOfRange {
                index: plate_index,
                total: total_plates,
            });
        }

        let mut done = match std::mem::take(self) {
            Self::Pending => BTreeSet::new(),
            Self::PartiallyPlated(done) => done,
            Self::Fulfilled => {
                *self = Self::Fulfilled;
                return Err(SpoolError::AlreadyFulfilled);
            }
        };

        let newly_completed = done.insert(plate_index);

        if done.len() == total_plates {
            *self = Self::Fulfilled;
            return Ok(PlateTransition::ItemFulfilled);
        }

        *self = Self::PartiallyPlated(done);
        if newly_completed {
            Ok(PlateTransition::PlateCompleted)
        } else {
            Ok(PlateTransition::AlreadyCompleted)
        }
    }

    /// 標記項目完成；仍有未完成盤位時回傳錯誤
    pub fn finish(&mut self, total_plates: usize) -> Result<()> {
        let pending = self.pending_plates(total_plates);
        if !pending.is_empty() {
            return Err(SpoolError::PlatesIncomplete { pending });
        }
        *self = Self::Fulfilled;
        Ok(())
    }

    /// 重置為待處理
    pub fn reset(&mut self) {
        *self = Self::Pending;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plate_progression() {
        let mut state = FulfillmentState::Pending;

        assert_eq!(
            state.complete_plate(1, 3).unwrap(),
            PlateTransition::PlateCompleted
        );
        assert_eq!(state.pending_plates(3), vec![0, 2]);
        assert_eq!(
            state.complete_plate(1, 3).unwrap(),
            PlateTransition::AlreadyCompleted
        );
        assert_eq!(
            state.complete_plate(0, 3).unwrap(),
            PlateTransition::PlateCompleted
        );
        assert_eq!(
            state.complete_plate(2, 3).unwrap(),
            PlateTransition::ItemFulfilled
        );
        assert!(state.is_fulfilled());
    }

    #[test]
    fn test_plate_out_of_range() {
        let mut state = FulfillmentState::Pending;
        let err = state.complete_plate(5, 2).unwrap_err();
        assert!(matches!(err, SpoolError::PlateOutOfRange { index: 5, total: 2 }));
        assert_eq!(state, FulfillmentState::Pending);
    }

    #[test]
    fn test_fulfilled_rejects_plates() {
        let mut state = FulfillmentState::Fulfilled;
        assert!(matches!(
            state.complete_plate(0, 2),
            Err(SpoolError::AlreadyFulfilled)
        ));
        assert!(state.is_fulfilled());
    }

    #[test]
    fn test_finish_requires_all_plates() {
        let mut state = FulfillmentState::Pending;
        state.complete_plate(0, 2).unwrap();

        let err = state.finish(2).unwrap_err();
        assert!(matches!(err, SpoolError::PlatesIncomplete { ref pending } if pending == &vec![1]));

        state.complete_plate(1, 2).unwrap();
        assert!(state.finish(2).is_ok());

        // 沒有盤位的項目可直接完成
        let mut bare = FulfillmentState::Pending;
        assert!(bare.finish(0).is_ok());
        assert!(bare.is_fulfilled());

        bare.reset();
        assert_eq!(bare, FulfillmentState::Pending);
    }
}
