use super::allocation::PaymentAllocation;
use super::money::Money;
use crate::error::{AllocationError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_ALLOCATIONS: usize = 20;

pub const FEE_TYPES: [&str; 14] = [
    "tuition",
    "uniform",
    "feeding",
    "transport",
    "books",
    "sports",
    "development",
    "examination",
    "pta",
    "computer",
    "library",
    "laboratory",
    "lesson",
    "other",
];

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Pos,
    Online,
    Cheque,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Statuses a freshly recorded payment may carry.
    pub fn is_initial(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Confirmed)
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Confirmed)
                | (PaymentStatus::Pending, PaymentStatus::Cancelled)
                | (PaymentStatus::Confirmed, PaymentStatus::Refunded)
        )
    }

    fn requires_notes(&self) -> bool {
        matches!(self, PaymentStatus::Cancelled | PaymentStatus::Refunded)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment as handed to the backing store, with its per-category split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub class_id: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub fee_assignment_id: String,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub payment_date: String,
    pub fee_allocations: Vec<PaymentAllocation>,
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_by: Option<String>,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub recorded_by: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl PaymentRecord {
    pub fn total_allocated(&self) -> Money {
        self.fee_allocations.iter().map(|a| a.amount).sum()
    }

    /// Field-level rules that hold for every stored record, new or updated.
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(AllocationError::validation(
                "Payment amount must be greater than zero",
            ));
        }

        if NaiveDate::parse_from_str(&self.payment_date, "%Y-%m-%d").is_err()
            || self.payment_date.len() != 10
        {
            return Err(AllocationError::validation(
                "Invalid payment date format. Must be YYYY-MM-DD",
            ));
        }

        if self.status.requires_notes()
            && self.notes.as_deref().is_none_or(|n| n.trim().is_empty())
        {
            return Err(AllocationError::validation(format!(
                "{} payments must include a reason in notes",
                self.status
            )));
        }

        self.validate_allocations()?;

        if !is_valid_payment_reference(&self.reference) {
            return Err(AllocationError::validation(
                "Payment reference must follow format: PAY-YYYY-XXXXXXXX",
            ));
        }

        Ok(())
    }

    fn validate_allocations(&self) -> Result<()> {
        if self.fee_allocations.is_empty() {
            return Err(AllocationError::validation(
                "Payment must have at least one fee allocation",
            ));
        }
        if self.fee_allocations.len() > MAX_ALLOCATIONS {
            return Err(AllocationError::validation(format!(
                "Payment cannot have more than {} fee allocations",
                MAX_ALLOCATIONS
            )));
        }

        let total = self.total_allocated();
        if total != self.amount {
            return Err(AllocationError::validation(format!(
                "Payment amount ({}) must match sum of fee allocations ({})",
                self.amount, total
            )));
        }

        for (i, allocation) in self.fee_allocations.iter().enumerate() {
            let n = i + 1;
            if allocation.category_id.trim().is_empty() {
                return Err(AllocationError::validation(format!(
                    "Fee allocation {} must have a category ID",
                    n
                )));
            }
            if allocation.category_name.trim().is_empty() {
                return Err(AllocationError::validation(format!(
                    "Fee allocation {} must have a category name",
                    n
                )));
            }
            if !FEE_TYPES.contains(&allocation.fee_type.as_str()) {
                return Err(AllocationError::validation(format!(
                    "Invalid fee type '{}' in allocation {}. Must be one of: {}",
                    allocation.fee_type,
                    n,
                    FEE_TYPES.join(", ")
                )));
            }
            if !allocation.amount.is_positive() {
                return Err(AllocationError::validation(format!(
                    "Fee allocation {} must have a positive amount",
                    n
                )));
            }
        }

        Ok(())
    }
}

/// `PAY-YYYY-XXXXXXXX`: a four digit year and eight alphanumerics.
pub fn is_valid_payment_reference(reference: &str) -> bool {
    let parts: Vec<&str> = reference.split('-').collect();
    reference.len() == 17
        && parts.len() == 3
        && parts[0] == "PAY"
        && parts[1].len() == 4
        && parts[1].chars().all(|c| c.is_ascii_digit())
        && parts[2].len() == 8
        && parts[2].chars().all(|c| c.is_ascii_alphanumeric())
}
