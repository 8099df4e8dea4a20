use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Physical condition of stocked units.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StockCondition {
    New,
    Used,
}

/// Per-condition quantities of a stock record.
///
/// Entries are never negative; [`ConditionBreakdown::total`] is what the
/// record's `quantity` column must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionBreakdown(BTreeMap<StockCondition, i32>);

impl ConditionBreakdown {
    /// Builds a breakdown, rejecting negative entries and totals that do
    /// not fit the stock quantity column.
    pub fn new(entries: BTreeMap<StockCondition, i32>) -> Result<Self, ServiceError> {
        if let Some((condition, qty)) = entries.iter().find(|(_, qty)| **qty < 0) {
            return Err(ServiceError::ValidationError(format!(
                "'{}' durumundaki miktar negatif olamaz: {}",
                condition, qty
            )));
        }
        if checked_total(&entries).is_none() {
            return Err(ServiceError::ValidationError(
                "Toplam stok miktarı sınırı aşıyor".to_string(),
            ));
        }
        Ok(Self(entries))
    }

    /// Reads the breakdown stored in a JSON column.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ServiceError> {
        let entries: BTreeMap<StockCondition, i32> = serde_json::from_value(value.clone())?;
        Self::new(entries)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.0).unwrap_or_default()
    }

    pub fn get(&self, condition: StockCondition) -> i32 {
        self.0.get(&condition).copied().unwrap_or(0)
    }

    /// Sum over all conditions. Construction and `apply` keep it within
    /// `i32`, so saturation never kicks in.
    pub fn total(&self) -> i32 {
        self.0.values().fold(0, |acc, qty| acc.saturating_add(*qty))
    }

    /// Applies a signed delta to one condition. Fails without changing
    /// anything when the entry would drop below zero or the total would
    /// overflow.
    pub fn apply(&mut self, condition: StockCondition, delta: i32) -> Result<i32, ServiceError> {
        let current = self.get(condition);
        let overflow = || {
            ServiceError::ValidationError(format!("Miktar sınırı aşıldı: {} {:+}", current, delta))
        };
        let next = current.checked_add(delta).ok_or_else(overflow)?;
        if next < 0 {
            return Err(ServiceError::InsufficientStock(format!(
                "'{}' durumunda yalnızca {} birim var, {} birim düşülemez",
                condition,
                current,
                delta.unsigned_abs()
            )));
        }
        self.total()
            .checked_sub(current)
            .and_then(|rest| rest.checked_add(next))
            .ok_or_else(overflow)?;
        self.0.insert(condition, next);
        Ok(next)
    }

    pub fn entries(&self) -> &BTreeMap<StockCondition, i32> {
        &self.0
    }
}

fn checked_total(entries: &BTreeMap<StockCondition, i32>) -> Option<i32> {
    entries
        .values()
        .try_fold(0i32, |acc, qty| acc.checked_add(*qty))
}
