use crate::domain::allocation::{AllocationItem, ObligationState, PaymentAllocation};
use crate::domain::fee::FeeAssignment;
use crate::domain::money::Money;
use crate::domain::ports::AllocationSinkBox;
use std::cmp::Reverse;
use std::collections::HashMap;
use tracing::debug;

/// Splits one payment across a student's outstanding fee categories.
///
/// The engine holds a working set of [`AllocationItem`]s built from the
/// caller's fee assignments. Allocation is either automatic (mandatory fees
/// first, then larger balances first) or manual, and a manual edit always
/// switches automatic mode off so later input changes never overwrite it.
///
/// Every operation runs to completion before returning and, when it changes
/// the working set, hands the derived [`PaymentAllocation`]s to the sink.
pub struct AllocationEngine {
    items: Vec<AllocationItem>,
    index: HashMap<String, usize>,
    auto_allocate_enabled: bool,
    payment_amount: Money,
    state: ObligationState,
    sink: Option<AllocationSinkBox>,
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationEngine {
    /// Creates an engine in automatic mode with no sink attached.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
            auto_allocate_enabled: true,
            payment_amount: Money::ZERO,
            state: ObligationState::NoAssignment,
            sink: None,
        }
    }

    /// Creates an engine that publishes every new breakdown to `sink`.
    pub fn with_sink(sink: AllocationSinkBox) -> Self {
        Self {
            sink: Some(sink),
            ..Self::new()
        }
    }

    /// Replaces the working set with one item per outstanding category.
    ///
    /// Settled line items are dropped. A category seen in more than one
    /// assignment is folded into its first occurrence. Previous allocations
    /// are discarded; in automatic mode the current payment amount is
    /// distributed again straight away.
    pub fn rebuild(&mut self, assignments: &[FeeAssignment]) {
        self.items.clear();
        self.index.clear();

        let mut line_items = 0usize;
        for line in assignments.iter().flat_map(|a| a.fee_items.iter()) {
            line_items += 1;
            if !line.is_outstanding() {
                continue;
            }
            match self.index.get(&line.category_id) {
                Some(&i) => {
                    let existing = &mut self.items[i];
                    existing.max_amount += line.balance;
                    existing.is_mandatory |= line.is_mandatory;
                    debug!(category = %line.category_id, "merged repeated fee category");
                }
                None => {
                    self.index.insert(line.category_id.clone(), self.items.len());
                    self.items.push(AllocationItem::from_line_item(line));
                }
            }
        }

        self.state = if line_items == 0 {
            ObligationState::NoAssignment
        } else if self.items.is_empty() {
            ObligationState::FullySettled
        } else {
            ObligationState::Outstanding
        };
        debug!(
            assignments = assignments.len(),
            line_items,
            categories = self.items.len(),
            state = ?self.state,
            "rebuilt allocation working set"
        );

        if self.auto_allocate_enabled {
            self.distribute(self.payment_amount);
        }
        self.publish();
    }

    /// Distributes `payment_amount` by priority. Does not change the mode.
    pub fn auto_allocate(&mut self, payment_amount: Money) {
        self.payment_amount = payment_amount;
        self.distribute(payment_amount);
        self.publish();
    }

    /// Records a new payment amount, redistributing only in automatic mode.
    pub fn update_payment_amount(&mut self, payment_amount: Money) {
        self.payment_amount = payment_amount;
        if self.auto_allocate_enabled {
            self.distribute(payment_amount);
            self.publish();
        }
    }

    /// Sets one category's allocation, clamped into `[0, maxAmount]`.
    ///
    /// Unknown categories are ignored entirely, mode included.
    pub fn set_allocation(&mut self, category_id: &str, amount: Money) {
        let Some(&i) = self.index.get(category_id) else {
            debug!(category = category_id, "ignoring allocation for unknown category");
            return;
        };
        let item = &mut self.items[i];
        item.allocated_amount = amount.clamp_to(item.max_amount);
        self.auto_allocate_enabled = false;
        self.publish();
    }

    /// Allocates a category's full outstanding balance.
    pub fn set_max(&mut self, category_id: &str) {
        if let Some(&i) = self.index.get(category_id) {
            let max = self.items[i].max_amount;
            self.set_allocation(category_id, max);
        } else {
            debug!(category = category_id, "ignoring max for unknown category");
        }
    }

    /// Zeroes every allocation and switches automatic mode off.
    pub fn clear_all(&mut self) {
        for item in &mut self.items {
            item.allocated_amount = Money::ZERO;
        }
        self.auto_allocate_enabled = false;
        self.publish();
    }

    /// Switches automatic mode back on and redistributes `payment_amount`.
    pub fn enable_auto_allocate(&mut self, payment_amount: Money) {
        self.auto_allocate_enabled = true;
        self.auto_allocate(payment_amount);
    }

    /// The working set, in first-encounter order.
    pub fn items(&self) -> &[AllocationItem] {
        &self.items
    }

    /// Looks up one category in the working set.
    pub fn item(&self, category_id: &str) -> Option<&AllocationItem> {
        self.index.get(category_id).map(|&i| &self.items[i])
    }

    /// What the last rebuild found: no line items, all settled, or outstanding.
    pub fn obligation_state(&self) -> ObligationState {
        self.state
    }

    /// Whether input changes still redistribute the payment.
    pub fn is_auto_allocate_enabled(&self) -> bool {
        self.auto_allocate_enabled
    }

    /// The last payment amount seen by the engine.
    pub fn payment_amount(&self) -> Money {
        self.payment_amount
    }

    /// Sum of all allocations, saturating at [`Money::MAX`].
    pub fn total_allocated(&self) -> Money {
        self.items.iter().map(|i| i.allocated_amount).sum()
    }

    /// May be negative when the payment amount shrank after manual edits.
    pub fn remaining_unallocated(&self, payment_amount: Money) -> Money {
        payment_amount - self.total_allocated()
    }

    /// True when the allocations add up to exactly `payment_amount`.
    pub fn is_valid(&self, payment_amount: Money) -> bool {
        self.total_allocated() == payment_amount
    }

    /// Non-zero allocations in working-set order.
    pub fn to_payment_allocations(&self) -> Vec<PaymentAllocation> {
        collect_allocations(&self.items)
    }

    fn distribute(&mut self, payment_amount: Money) {
        for item in &mut self.items {
            item.allocated_amount = Money::ZERO;
        }

        // Stable, so equal keys keep working-set order.
        let mut order: Vec<usize> = (0..self.items.len()).collect();
        order.sort_by_key(|&i| {
            let item = &self.items[i];
            (Reverse(item.is_mandatory), Reverse(item.max_amount))
        });

        let mut remaining = payment_amount.max(Money::ZERO);
        for i in order {
            if remaining <= Money::ZERO {
                break;
            }
            let item = &mut self.items[i];
            let allocated = remaining.min(item.max_amount);
            item.allocated_amount = allocated;
            remaining -= allocated;
        }

        debug!(
            payment = %payment_amount,
            allocated = %self.total_allocated(),
            unallocated = %remaining,
            "auto-allocated payment"
        );
    }

    fn publish(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            let allocations = collect_allocations(&self.items);
            sink.publish(&allocations);
        }
    }
}

fn collect_allocations(items: &[AllocationItem]) -> Vec<PaymentAllocation> {
    items
        .iter()
        .filter(|item| item.is_allocated())
        .map(PaymentAllocation::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fee::FeeLineItem;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    fn money(value: rust_decimal::Decimal) -> Money {
        Money::new(value)
    }

    fn line(id: &str, balance: rust_decimal::Decimal, mandatory: bool) -> FeeLineItem {
        FeeLineItem::new(id, id.to_uppercase(), id, money(balance), mandatory)
    }

    fn tuition_and_uniform() -> Vec<FeeAssignment> {
        vec![FeeAssignment::from_items(vec![
            line("tuition", dec!(20000), true),
            line("uniform", dec!(5000), false),
        ])]
    }

    fn allocated(engine: &AllocationEngine, id: &str) -> Money {
        engine.item(id).unwrap().allocated_amount
    }

    #[test]
    fn test_rebuild_drops_settled_items() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&[FeeAssignment::from_items(vec![
            line("tuition", dec!(100), true),
            line("uniform", dec!(0), false),
            line("books", dec!(40), false),
        ])]);

        let ids: Vec<&str> = engine.items().iter().map(|i| i.category_id.as_str()).collect();
        assert_eq!(ids, vec!["tuition", "books"]);
        assert!(engine.item("uniform").is_none());
        assert_eq!(engine.obligation_state(), ObligationState::Outstanding);
    }

    #[test]
    fn test_obligation_states() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&[]);
        assert_eq!(engine.obligation_state(), ObligationState::NoAssignment);

        engine.rebuild(&[FeeAssignment::from_items(vec![])]);
        assert_eq!(engine.obligation_state(), ObligationState::NoAssignment);

        engine.rebuild(&[FeeAssignment::from_items(vec![line("pta", dec!(0), false)])]);
        assert_eq!(engine.obligation_state(), ObligationState::FullySettled);
        assert!(engine.items().is_empty());
    }

    #[test]
    fn test_rebuild_discards_previous_allocations() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&tuition_and_uniform());
        engine.set_allocation("uniform", money(dec!(3000)));

        engine.rebuild(&tuition_and_uniform());
        assert_eq!(engine.total_allocated(), Money::ZERO);
        assert!(!engine.is_auto_allocate_enabled());
    }

    #[test]
    fn test_rebuild_reallocates_in_auto_mode() {
        let mut engine = AllocationEngine::new();
        engine.auto_allocate(money(dec!(7000)));
        assert_eq!(engine.total_allocated(), Money::ZERO);

        engine.rebuild(&tuition_and_uniform());
        assert_eq!(allocated(&engine, "tuition"), money(dec!(7000)));
    }

    #[test]
    fn test_repeated_category_is_merged() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&[
            FeeAssignment::from_items(vec![line("tuition", dec!(100), false)]),
            FeeAssignment::from_items(vec![
                line("books", dec!(30), false),
                line("tuition", dec!(50), true),
            ]),
        ]);

        assert_eq!(engine.items().len(), 2);
        let tuition = engine.item("tuition").unwrap();
        assert_eq!(tuition.max_amount, money(dec!(150)));
        assert!(tuition.is_mandatory);
        assert_eq!(engine.items()[0].category_id, "tuition");
    }

    #[test]
    fn test_huge_balances_saturate_instead_of_panicking() {
        let huge: Money = "60000000000000000000000000000".parse().unwrap();
        let tuition = FeeLineItem::new("tuition", "Tuition", "tuition", huge, true);
        let books = FeeLineItem::new("books", "Books", "books", huge, false);

        let mut engine = AllocationEngine::new();
        engine.rebuild(&[
            FeeAssignment::from_items(vec![tuition.clone()]),
            FeeAssignment::from_items(vec![tuition.clone()]),
        ]);
        assert_eq!(engine.item("tuition").unwrap().max_amount, Money::MAX);

        engine.rebuild(&[FeeAssignment::from_items(vec![tuition, books])]);
        engine.set_max("tuition");
        engine.set_max("books");
        assert_eq!(engine.total_allocated(), Money::MAX);
        assert!(!engine.is_valid(money(dec!(100))));
        assert!(engine.remaining_unallocated(money(dec!(100))).is_negative());
    }

    #[test]
    fn test_priority_mandatory_before_larger_balance() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&[FeeAssignment::from_items(vec![
            line("b", dec!(10000), false),
            line("a", dec!(5000), true),
        ])]);
        engine.auto_allocate(money(dec!(6000)));

        assert_eq!(allocated(&engine, "a"), money(dec!(5000)));
        assert_eq!(allocated(&engine, "b"), money(dec!(1000)));
    }

    #[test]
    fn test_priority_larger_balance_then_stable_order() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&[FeeAssignment::from_items(vec![
            line("small", dec!(100), false),
            line("first", dec!(500), false),
            line("second", dec!(500), false),
        ])]);
        engine.auto_allocate(money(dec!(700)));

        assert_eq!(allocated(&engine, "first"), money(dec!(500)));
        assert_eq!(allocated(&engine, "second"), money(dec!(200)));
        assert_eq!(allocated(&engine, "small"), Money::ZERO);
    }

    #[test]
    fn test_partial_payment_is_fully_allocated() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&tuition_and_uniform());
        engine.auto_allocate(money(dec!(18000)));

        assert_eq!(allocated(&engine, "tuition"), money(dec!(18000)));
        assert_eq!(allocated(&engine, "uniform"), Money::ZERO);
        assert_eq!(engine.remaining_unallocated(money(dec!(18000))), Money::ZERO);
        assert!(engine.is_valid(money(dec!(18000))));
    }

    #[test]
    fn test_overpayment_leaves_excess_unallocated() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&tuition_and_uniform());
        engine.auto_allocate(money(dec!(30000)));

        assert_eq!(allocated(&engine, "tuition"), money(dec!(20000)));
        assert_eq!(allocated(&engine, "uniform"), money(dec!(5000)));
        assert_eq!(engine.total_allocated(), money(dec!(25000)));
        assert_eq!(engine.remaining_unallocated(money(dec!(30000))), money(dec!(5000)));
        assert!(!engine.is_valid(money(dec!(30000))));
    }

    #[test]
    fn test_negative_payment_allocates_nothing() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&tuition_and_uniform());
        engine.auto_allocate(money(dec!(-50)));
        assert_eq!(engine.total_allocated(), Money::ZERO);
    }

    #[test]
    fn test_auto_allocate_is_idempotent() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&tuition_and_uniform());
        engine.auto_allocate(money(dec!(1000)));
        let first = engine.items().to_vec();
        engine.auto_allocate(money(dec!(1000)));
        assert_eq!(engine.items(), first.as_slice());
    }

    #[test]
    fn test_set_allocation_clamps() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&tuition_and_uniform());

        engine.set_allocation("uniform", money(dec!(999999)));
        assert_eq!(allocated(&engine, "uniform"), money(dec!(5000)));

        engine.set_allocation("uniform", money(dec!(-10)));
        assert_eq!(allocated(&engine, "uniform"), Money::ZERO);

        engine.set_allocation("uniform", money(dec!(1234.56)));
        assert_eq!(allocated(&engine, "uniform"), money(dec!(1234.56)));
    }

    #[test]
    fn test_manual_edit_disables_auto_mode() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&tuition_and_uniform());
        engine.enable_auto_allocate(money(dec!(10000)));
        assert!(engine.is_auto_allocate_enabled());

        engine.set_allocation("uniform", money(dec!(2000)));
        assert!(!engine.is_auto_allocate_enabled());

        engine.update_payment_amount(money(dec!(25000)));
        assert_eq!(allocated(&engine, "tuition"), money(dec!(10000)));
        assert_eq!(allocated(&engine, "uniform"), money(dec!(2000)));
        assert_eq!(engine.payment_amount(), money(dec!(25000)));
        assert_eq!(engine.remaining_unallocated(money(dec!(25000))), money(dec!(13000)));
    }

    #[test]
    fn test_payment_change_reallocates_in_auto_mode() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&tuition_and_uniform());
        engine.update_payment_amount(money(dec!(21000)));
        assert_eq!(allocated(&engine, "tuition"), money(dec!(20000)));
        assert_eq!(allocated(&engine, "uniform"), money(dec!(1000)));
    }

    #[test]
    fn test_unknown_category_is_a_no_op() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&tuition_and_uniform());
        engine.auto_allocate(money(dec!(500)));

        engine.set_allocation("library", money(dec!(100)));
        engine.set_max("library");
        assert!(engine.is_auto_allocate_enabled());
        assert_eq!(engine.total_allocated(), money(dec!(500)));
    }

    #[test]
    fn test_set_max_and_clear_all() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&tuition_and_uniform());
        engine.auto_allocate(money(dec!(20000)));

        engine.set_max("uniform");
        assert_eq!(allocated(&engine, "uniform"), money(dec!(5000)));
        assert!(!engine.is_auto_allocate_enabled());

        engine.enable_auto_allocate(money(dec!(20000)));
        engine.clear_all();
        assert!(engine.items().iter().all(|i| i.allocated_amount == Money::ZERO));
        assert!(!engine.is_auto_allocate_enabled());
    }

    #[test]
    fn test_payment_allocations_skip_zero_and_keep_order() {
        let mut engine = AllocationEngine::new();
        engine.rebuild(&[FeeAssignment::from_items(vec![
            line("uniform", dec!(5000), false),
            line("books", dec!(100), false),
            line("tuition", dec!(20000), true),
        ])]);
        engine.auto_allocate(money(dec!(21000)));

        let allocations = engine.to_payment_allocations();
        let ids: Vec<&str> = allocations.iter().map(|a| a.category_id.as_str()).collect();
        assert_eq!(ids, vec!["uniform", "tuition"]);
        assert_eq!(allocations[0].amount, money(dec!(1000)));
        assert_eq!(allocations[0].category_name, "UNIFORM");
    }

    #[test]
    fn test_sink_receives_every_change() {
        let published: Arc<Mutex<Vec<Vec<PaymentAllocation>>>> = Arc::default();
        let log = Arc::clone(&published);
        let mut engine = AllocationEngine::with_sink(Box::new(
            move |allocations: &[PaymentAllocation]| {
                log.lock().unwrap().push(allocations.to_vec());
            },
        ));

        engine.rebuild(&tuition_and_uniform());
        engine.auto_allocate(money(dec!(21000)));
        engine.set_allocation("unknown", money(dec!(1)));
        engine.set_allocation("uniform", money(dec!(0)));
        engine.update_payment_amount(money(dec!(1)));
        engine.clear_all();

        let published = published.lock().unwrap();
        assert_eq!(published.len(), 4);
        assert!(published[0].is_empty());
        assert_eq!(published[1].len(), 2);
        assert_eq!(published[2].len(), 1);
        assert_eq!(published[2][0].category_id, "tuition");
        assert!(published[3].is_empty());
    }
}
