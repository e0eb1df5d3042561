//! Negative item counts for servers at or below 1.10.
//!
//! Those servers may send stacks with a count of zero or less, which the host
//! clamps away when it decodes an item. On the way to the client the true
//! count is stashed in the stack's compound tag under [`ITEM_COUNT_KEY`]; on
//! the way back to the server it is restored and the key removed.
//!
//! Content that already uses [`ITEM_COUNT_KEY`] will be misread. The key is
//! reserved for this purpose.

use crate::item::{CompoundTag, Item, Tag};

/// Compound key reserved for the stashed item count.
pub const ITEM_COUNT_KEY: &str = "1_10_shimframe_ItemCount";

/// Stash a non-positive count in the item's tag before the host sees it.
///
/// Positive counts and absent items are left untouched. Calling this twice on
/// the same stack stores the same value again.
pub fn to_client(item: Option<&mut Item>) {
    let Some(item) = item else { return };
    if item.amount > 0 {
        return;
    }
    item.tag
        .get_or_insert_with(CompoundTag::new)
        .insert(ITEM_COUNT_KEY, Tag::Byte(item.amount));
}

/// Restore a stashed count before the stack is sent back to the server.
///
/// When the key is present the amount is overwritten and the key removed. A
/// tag left empty by the removal is dropped, since an empty tag and no tag
/// encode differently. A value under the key that is not a byte is removed
/// without touching the amount.
pub fn to_server(item: Option<&mut Item>) {
    let Some(item) = item else { return };
    let Some(tag) = item.tag.as_mut() else { return };
    let Some(stashed) = tag.remove(ITEM_COUNT_KEY) else { return };
    if let Some(amount) = stashed.as_byte() {
        item.amount = amount;
    }
    if tag.is_empty() {
        item.tag = None;
    }
}
