//! Result aggregator: combines the per-backend shards produced by the
//! demultiplexer into the single reply shape a client expects, rewriting
//! local IDs back into virtual IDs along the way.
//!
//! Two shapes:
//!
//! - **Multiplexed** — at least one shard's reply is a list. The aggregate
//!   is the concatenation, in [`VidManager::list_contexts`] order, of every
//!   list-shaped shard's elements. Non-list shards are ignored in this shape.
//! - **Single** — no shard is a list. The aggregate is the first non-null
//!   shard, in context order; if every shard is absent or null, the result
//!   is `null`.
//!
//! ID rewriting is shallow: only a top-level `id` key on a mapping (whether
//! that mapping is a list element or, in Single shape, the whole reply) is
//! rewritten from local to virtual. Everything else passes through
//! unchanged.

use std::collections::BTreeMap;

use crate::{value::RpcValue, vid::VidManager};

pub fn aggregate(vid: &VidManager, shards: &BTreeMap<String, RpcValue>) -> RpcValue {
    let contexts = vid.list_contexts();

    let mut multiplexed: Option<Vec<RpcValue>> = None;
    for fqdn in &contexts {
        if let Some(RpcValue::List(items)) = shards.get(fqdn) {
            let rewritten = items.iter().cloned().map(|item| rewrite_id(vid, fqdn, item));
            multiplexed.get_or_insert_with(Vec::new).extend(rewritten);
        }
    }
    if let Some(list) = multiplexed {
        return RpcValue::List(list);
    }

    for fqdn in &contexts {
        match shards.get(fqdn) {
            Some(RpcValue::Null) | None => continue,
            Some(v) => return rewrite_id(vid, fqdn, v.clone()),
        }
    }
    RpcValue::Null
}

fn rewrite_id(vid: &VidManager, fqdn: &str, value: RpcValue) -> RpcValue {
    match value {
        RpcValue::Map(mut map) => {
            if let Some(RpcValue::Int(local)) = map.get("id").cloned() {
                if let Some(virt) = vid.to_virtual(fqdn, local) {
                    map.insert("id".to_string(), RpcValue::Int(virt));
                }
            }
            RpcValue::Map(map)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(fqdns: &[&str]) -> VidManager {
        let mut vid = VidManager::new();
        for f in fqdns {
            vid.add_context(f).unwrap();
        }
        vid
    }

    fn map_with_id(id: i64) -> RpcValue {
        let mut m = BTreeMap::new();
        m.insert("id".to_string(), RpcValue::Int(id));
        RpcValue::Map(m)
    }

    #[test]
    fn single_backend_list_is_rewritten_in_place() {
        let vid = manager_with(&["host-a.example.org"]);
        let mut shards = BTreeMap::new();
        shards.insert(
            "host-a.example.org".to_string(),
            RpcValue::List(vec![map_with_id(1000), map_with_id(1001)]),
        );

        let result = aggregate(&vid, &shards);
        let RpcValue::List(items) = result else { panic!("expected list") };
        assert_eq!(items[0].as_map().unwrap()["id"], RpcValue::Int(11000));
        assert_eq!(items[1].as_map().unwrap()["id"], RpcValue::Int(11001));
    }

    #[test]
    fn multiple_backend_lists_concatenate_in_context_order() {
        let vid = manager_with(&["host-a.example.org", "host-b.example.org"]);
        let mut shards = BTreeMap::new();
        shards.insert("host-a.example.org".to_string(), RpcValue::List(vec![map_with_id(5)]));
        shards.insert(
            "host-b.example.org".to_string(),
            RpcValue::List(vec![map_with_id(7), map_with_id(8)]),
        );

        let result = aggregate(&vid, &shards);
        let RpcValue::List(items) = result else { panic!("expected list") };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_map().unwrap()["id"], RpcValue::Int(115));
        assert_eq!(items[1].as_map().unwrap()["id"], RpcValue::Int(127));
        assert_eq!(items[2].as_map().unwrap()["id"], RpcValue::Int(128));
    }

    #[test]
    fn single_shape_passes_scalar_through_unchanged() {
        let vid = manager_with(&["host-a.example.org", "host-b.example.org"]);
        let mut shards = BTreeMap::new();
        shards.insert("host-a.example.org".to_string(), RpcValue::String("ok".into()));
        let result = aggregate(&vid, &shards);
        assert_eq!(result, RpcValue::String("ok".into()));
    }

    #[test]
    fn single_shape_skips_absent_backends_in_context_order() {
        let vid = manager_with(&["host-a.example.org", "host-b.example.org"]);
        let mut shards = BTreeMap::new();
        shards.insert("host-b.example.org".to_string(), RpcValue::String("from-b".into()));
        let result = aggregate(&vid, &shards);
        assert_eq!(result, RpcValue::String("from-b".into()));
    }

    #[test]
    fn no_shards_yields_null() {
        let vid = manager_with(&["host-a.example.org"]);
        let shards = BTreeMap::new();
        assert_eq!(aggregate(&vid, &shards), RpcValue::Null);
    }
}
