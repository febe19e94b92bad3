//! Distribution of accepted entries into ordered insertion slots.

use worldbook_model::{ActivatedEntry, InsertionSlot, Position, Role};

/// Rank for slots without a role: after `system` and `user`.
const OTHER_ROLE_RANK: u8 = 2;

/// Bucket entries by resolved position (and depth/role for `at_depth`).
///
/// Inside a slot entries are ordered by `order`, then by id. Slots are
/// ordered by position rank, then depth, then role, then the order in which
/// they were first created.
pub fn distribute(entries: &[ActivatedEntry]) -> Vec<InsertionSlot> {
    let mut slots: Vec<InsertionSlot> = Vec::new();

    for activated in entries {
        let position = activated.entry.position.resolved();
        let (depth, role) = if position == Position::AtDepth {
            (Some(activated.entry.depth.unwrap_or(0)), activated.entry.role)
        } else {
            (None, None)
        };

        match slots
            .iter_mut()
            .find(|s| s.position == position && s.depth == depth && s.role == role)
        {
            Some(slot) => slot.entries.push(activated.clone()),
            None => {
                let mut slot = InsertionSlot::new(position, depth, role);
                slot.entries.push(activated.clone());
                slots.push(slot);
            }
        }
    }

    for slot in &mut slots {
        slot.entries.sort_by(|a, b| {
            a.entry
                .order
                .cmp(&b.entry.order)
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });
    }

    // Stable sort keeps creation order as the last tie-break.
    slots.sort_by_key(|slot| {
        (
            slot.position.rank(),
            slot.depth.unwrap_or(0),
            slot.role.as_ref().map_or(OTHER_ROLE_RANK, Role::rank),
        )
    });

    slots
}
