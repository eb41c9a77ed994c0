use super::fee::FeeLineItem;
use super::money::Money;
use serde::{Deserialize, Serialize};

/// Working record for one fee category while a payment is being split.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationItem {
    pub category_id: String,
    pub category_name: String,
    #[serde(rename = "type")]
    pub fee_type: String,
    pub is_mandatory: bool,
    /// Outstanding balance of the source line item when the working set was built.
    pub max_amount: Money,
    pub allocated_amount: Money,
}

impl AllocationItem {
    pub fn from_line_item(item: &FeeLineItem) -> Self {
        Self {
            category_id: item.category_id.clone(),
            category_name: item.category_name.clone(),
            fee_type: item.fee_type.clone(),
            is_mandatory: item.is_mandatory,
            max_amount: item.balance,
            allocated_amount: Money::ZERO,
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.allocated_amount.is_positive()
    }
}

/// The portion of a payment attributed to one fee category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAllocation {
    pub category_id: String,
    pub category_name: String,
    #[serde(rename = "type")]
    pub fee_type: String,
    pub amount: Money,
}

impl From<&AllocationItem> for PaymentAllocation {
    fn from(item: &AllocationItem) -> Self {
        Self {
            category_id: item.category_id.clone(),
            category_name: item.category_name.clone(),
            fee_type: item.fee_type.clone(),
            amount: item.allocated_amount,
        }
    }
}

/// What the last set of fee assignments had to offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObligationState {
    /// No line items at all.
    #[default]
    NoAssignment,
    /// Line items exist but every balance is zero.
    FullySettled,
    Outstanding,
}
