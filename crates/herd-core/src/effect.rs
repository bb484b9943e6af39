//! Stock effect table
//!
//! Maps every action type to its signed contribution to a category's head
//! count. Matches are exhaustive: a new action type does not compile until
//! its effect is decided here.

use serde::{Deserialize, Serialize};

use crate::types::{ActionType, LivestockTransaction};

/// Which head count a transaction is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// The herd-wide count for a category (all of the user's fields)
    Global,
    /// The count held on a single field
    Field(i64),
}

impl ActionType {
    /// Sign of the herd-wide effect.
    ///
    /// MOVE is an internal transfer between the user's own fields, so the
    /// global count is unchanged.
    pub const fn global_sign(self) -> i64 {
        match self {
            ActionType::Birth | ActionType::Purchase => 1,
            ActionType::Death | ActionType::Sale => -1,
            ActionType::Move => 0,
        }
    }

    /// Whether the action removes animals from its source field
    pub const fn debits_source(self) -> bool {
        match self {
            ActionType::Death | ActionType::Sale | ActionType::Move => true,
            ActionType::Birth | ActionType::Purchase => false,
        }
    }

    /// Whether the action adds animals to its target field
    pub const fn credits_target(self) -> bool {
        match self {
            ActionType::Birth | ActionType::Purchase | ActionType::Move => true,
            ActionType::Death | ActionType::Sale => false,
        }
    }
}

/// Signed change to one field's counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDelta {
    pub field_id: i64,
    pub delta: i64,
}

impl FieldDelta {
    pub fn inverted(self) -> Self {
        Self {
            field_id: self.field_id,
            delta: -self.delta,
        }
    }
}

/// Per-field changes an action applies, source first.
///
/// Absent field references are skipped.
pub fn field_deltas(
    action_type: ActionType,
    quantity: u32,
    source_field_id: Option<i64>,
    target_field_id: Option<i64>,
) -> Vec<FieldDelta> {
    let quantity = i64::from(quantity);
    let mut deltas = Vec::with_capacity(2);

    if action_type.debits_source() {
        if let Some(field_id) = source_field_id {
            deltas.push(FieldDelta {
                field_id,
                delta: -quantity,
            });
        }
    }
    if action_type.credits_target() {
        if let Some(field_id) = target_field_id {
            deltas.push(FieldDelta {
                field_id,
                delta: quantity,
            });
        }
    }

    deltas
}

/// Signed effect of a transaction on the count measured by `scope`
pub fn stock_effect(tx: &LivestockTransaction, scope: Scope) -> i64 {
    match scope {
        Scope::Global => tx.action_type.global_sign() * i64::from(tx.quantity),
        Scope::Field(field_id) => {
            field_deltas(
                tx.action_type,
                tx.quantity,
                tx.source_field_id,
                tx.target_field_id,
            )
            .into_iter()
            .filter(|d| d.field_id == field_id)
            .map(|d| d.delta)
            .sum()
        }
    }
}
