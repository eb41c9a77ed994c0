use super::money::Money;
use crate::error::{AllocationError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const TERMS: [&str; 3] = ["first", "second", "third"];
pub const SCHOLARSHIP_TYPES: [&str; 3] = ["percentage", "fixed_amount", "waiver"];

/// One obligation within a student's fee assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeLineItem {
    pub category_id: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(rename = "type", default)]
    pub fee_type: String,
    /// Original charge for the category, before payments.
    #[serde(default)]
    pub amount: Money,
    #[serde(default)]
    pub amount_paid: Money,
    /// Remaining amount owed.
    pub balance: Money,
    #[serde(default)]
    pub is_mandatory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_optional: Option<bool>,
}

impl FeeLineItem {
    pub fn new(
        category_id: impl Into<String>,
        category_name: impl Into<String>,
        fee_type: impl Into<String>,
        balance: Money,
        is_mandatory: bool,
    ) -> Self {
        Self {
            category_id: category_id.into(),
            category_name: category_name.into(),
            fee_type: fee_type.into(),
            amount: balance,
            amount_paid: Money::ZERO,
            balance,
            is_mandatory,
            is_optional: None,
        }
    }

    pub fn is_outstanding(&self) -> bool {
        self.balance.is_positive()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
    Overpaid,
}

/// The set of fee obligations linked to one student for a billing period.
///
/// Only `feeItems` is required to parse; the remaining document fields
/// default when absent and are checked by [`FeeAssignment::validate`].
/// When a scholarship applies, `totalAmount` is the `originalAmount` less
/// `discountAmount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FeeAssignment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub student_id: String,
    pub student_name: String,
    pub class_id: String,
    pub fee_structure_id: String,
    pub academic_year: String,
    pub term: String,
    pub fee_items: Vec<FeeLineItem>,
    pub total_amount: Money,
    pub amount_paid: Money,
    pub balance: Money,
    pub status: AssignmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scholarship_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scholarship_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scholarship_type: Option<String>,
    /// Percentage off for `percentage` scholarships.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scholarship_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<Money>,
}

impl FeeAssignment {
    /// Builds an assignment whose totals are derived from its line items.
    pub fn from_items(fee_items: Vec<FeeLineItem>) -> Self {
        let total_amount = fee_items.iter().map(|i| i.amount).sum();
        let amount_paid = fee_items.iter().map(|i| i.amount_paid).sum();
        let balance = fee_items.iter().map(|i| i.balance).sum();
        let mut assignment = Self {
            fee_items,
            total_amount,
            amount_paid,
            balance,
            ..Self::default()
        };
        assignment.status = assignment.expected_status();
        assignment
    }

    /// The status implied by `amountPaid` and `balance`.
    pub fn expected_status(&self) -> AssignmentStatus {
        if self.balance.is_negative() {
            AssignmentStatus::Overpaid
        } else if self.balance == Money::ZERO {
            AssignmentStatus::Paid
        } else if self.amount_paid.is_positive() {
            AssignmentStatus::Partial
        } else {
            AssignmentStatus::Unpaid
        }
    }

    /// Checks the assignment document rules, returning the first violation.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("studentId", &self.student_id),
            ("studentName", &self.student_name),
            ("classId", &self.class_id),
            ("feeStructureId", &self.fee_structure_id),
            ("academicYear", &self.academic_year),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AllocationError::validation(format!("{} is required", field)));
            }
        }

        if self.fee_items.is_empty() {
            return Err(AllocationError::validation("feeItems cannot be empty"));
        }

        for item in &self.fee_items {
            if item.category_id.trim().is_empty() {
                return Err(AllocationError::validation("feeItem must have categoryId"));
            }
            if item.amount.is_negative() {
                return Err(AllocationError::validation(format!(
                    "Fee item {} has negative amount",
                    item.category_id
                )));
            }
            if item.balance.is_negative() {
                return Err(AllocationError::validation(format!(
                    "Fee item {} has negative balance",
                    item.category_id
                )));
            }
            if item.is_mandatory && item.is_optional.unwrap_or(false) {
                return Err(AllocationError::validation(format!(
                    "Fee item {} cannot be both mandatory and optional",
                    item.category_id
                )));
            }
        }

        if !self.term.is_empty() && !TERMS.contains(&self.term.as_str()) {
            return Err(AllocationError::validation(
                "term must be 'first', 'second', or 'third'",
            ));
        }

        if self.total_amount.is_negative() {
            return Err(AllocationError::validation("totalAmount cannot be negative"));
        }
        if self.amount_paid.is_negative() {
            return Err(AllocationError::validation("amountPaid cannot be negative"));
        }

        self.validate_scholarship()?;

        if self.balance != self.total_amount - self.amount_paid {
            return Err(AllocationError::validation(format!(
                "balance ({}) must equal totalAmount ({}) minus amountPaid ({})",
                self.balance, self.total_amount, self.amount_paid
            )));
        }

        let expected = self.expected_status();
        if self.status != expected {
            return Err(AllocationError::validation(format!(
                "status must be '{:?}' for the recorded amounts",
                expected
            )
            .to_lowercase()));
        }

        if let Some(due_date) = &self.due_date {
            NaiveDate::parse_from_str(due_date, "%Y-%m-%d").map_err(|_| {
                AllocationError::validation(format!(
                    "Invalid date format: {}. Expected YYYY-MM-DD",
                    due_date
                ))
            })?;
        }

        Ok(())
    }

    fn validate_scholarship(&self) -> Result<()> {
        let Some(scholarship_id) = &self.scholarship_id else {
            return Ok(());
        };
        if scholarship_id.trim().is_empty() {
            return Err(AllocationError::validation("scholarshipId cannot be empty string"));
        }

        let scholarship_type = self.scholarship_type.as_deref().ok_or_else(|| {
            AllocationError::validation("scholarshipType is required when scholarshipId is present")
        })?;
        if !SCHOLARSHIP_TYPES.contains(&scholarship_type) {
            return Err(AllocationError::validation(
                "scholarshipType must be 'percentage', 'fixed_amount', or 'waiver'",
            ));
        }

        let discount = self.discount_amount.ok_or_else(|| {
            AllocationError::validation("discountAmount is required when scholarship is applied")
        })?;
        if discount.is_negative() {
            return Err(AllocationError::validation("discountAmount cannot be negative"));
        }
        let original = self.original_amount.ok_or_else(|| {
            AllocationError::validation("originalAmount is required when scholarship is applied")
        })?;
        if discount > original {
            return Err(AllocationError::validation(
                "discountAmount cannot exceed originalAmount",
            ));
        }

        if scholarship_type == "percentage" {
            let value = self.scholarship_value.ok_or_else(|| {
                AllocationError::validation("scholarshipValue is required for percentage type")
            })?;
            if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                return Err(AllocationError::validation(
                    "scholarshipValue for percentage must be between 0 and 100",
                ));
            }
        }

        if self.total_amount != original - discount {
            return Err(AllocationError::validation(format!(
                "totalAmount ({}) should equal originalAmount ({}) minus discountAmount ({})",
                self.total_amount, original, discount
            )));
        }
        Ok(())
    }
}
