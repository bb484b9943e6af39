use crate::error::{LivestockError, LivestockResult};
use crate::types::{parse_date, ActionType, TransactionDraft};

/// Check a draft against the field-reference and quantity rules.
///
/// BIRTH and PURCHASE need a target, DEATH and SALE a source, MOVE both
/// (and they must differ). A missing date is allowed; a present one must
/// parse.
pub fn validate(draft: &TransactionDraft) -> LivestockResult<()> {
    if draft.quantity == 0 {
        return Err(LivestockError::InvalidQuantity(0));
    }

    let action = draft.action_type.to_string();
    match draft.action_type {
        ActionType::Birth | ActionType::Purchase => {
            if draft.target_field_id.is_none() {
                return Err(LivestockError::MissingTargetField(action));
            }
        }
        ActionType::Death | ActionType::Sale => {
            if draft.source_field_id.is_none() {
                return Err(LivestockError::MissingSourceField(action));
            }
        }
        ActionType::Move => match (draft.source_field_id, draft.target_field_id) {
            (None, _) => return Err(LivestockError::MissingSourceField(action)),
            (_, None) => return Err(LivestockError::MissingTargetField(action)),
            (Some(source), Some(target)) if source == target => {
                return Err(LivestockError::SameSourceAndTarget(source));
            }
            _ => {}
        },
    }

    if let Some(raw) = draft.date.as_deref() {
        if !raw.trim().is_empty() && parse_date(raw).is_none() {
            return Err(LivestockError::InvalidDate(raw.to_string()));
        }
    }

    Ok(())
}
