use assert_call::call;

use crate::{create_store, patch, state, Store, StoreBuilder, Subscription};

/// `{count: 0, label: "a"}` with `increment(n = 1)` and `rename(label)`.
pub fn counter() -> StoreBuilder {
    create_store(state! { "count" => 0, "label" => "a" }, None)
        .try_action("increment", |s, args| {
            let n = args.get::<i64>(0)?.unwrap_or(1);
            Ok(patch! { "count" => s.value::<i64>("count").unwrap_or(0) + n })
        })
        .try_action("rename", |_, args| {
            Ok(patch! { "label" => args.require::<String>(0)? })
        })
}

/// Records every notification as `"<prev count> -> <next count>"`.
pub fn record_count(store: &Store) -> Subscription {
    store.subscribe(|next, prev| call!("{} -> {}", prev["count"], next["count"]))
}
