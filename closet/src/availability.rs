use crate::model::{ClothingItem, DEFAULT_REFRESH_CYCLE_DAYS};
use chrono::{DateTime, Utc};

/// Whether a garment can be worn at `now`.
///
/// Never-worn items are always available. Otherwise the item becomes
/// available once the elapsed whole days since `last_worn` reach the
/// refresh cycle; the boundary day counts as available. A zero cycle on
/// the wire is treated as the one-day default.
///
/// Pure and clock-free: availability changes with wall-clock time, so
/// callers re-evaluate per query instead of caching.
pub fn is_available(item: &ClothingItem, now: DateTime<Utc>) -> bool {
    let Some(last_worn) = item.last_worn else {
        return true;
    };

    let refresh_cycle = item.refresh_cycle.max(DEFAULT_REFRESH_CYCLE_DAYS);
    let elapsed_days = now.signed_duration_since(last_worn).num_days();

    elapsed_days >= i64::from(refresh_cycle)
}
