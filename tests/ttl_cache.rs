use std::time::Duration;

use post_enhancer::cache::{Clock, ManualClock, TtlCache};

#[test]
fn least_recently_used_entry_is_evicted_at_capacity() {
    let clock = ManualClock::new();
    let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60), 2);

    cache.insert("a".to_string(), 1, clock.now());
    cache.insert("b".to_string(), 2, clock.now());
    assert_eq!(cache.get("a", clock.now()), Some(1));
    cache.insert("c".to_string(), 3, clock.now());

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("b", clock.now()), None);
    assert_eq!(cache.get("a", clock.now()), Some(1));
    assert_eq!(cache.get("c", clock.now()), Some(3));
}

#[test]
fn entries_expire_after_ttl() {
    let clock = ManualClock::new();
    let cache: TtlCache<&str> = TtlCache::new(Duration::from_secs(60), 8);

    cache.insert("usage".to_string(), "fresh", clock.now());
    clock.advance(Duration::from_secs(59));
    assert_eq!(cache.get("usage", clock.now()), Some("fresh"));

    clock.advance(Duration::from_secs(1));
    assert_eq!(cache.get("usage", clock.now()), None);
    assert!(cache.is_empty());
}

#[test]
fn expired_entries_do_not_crowd_out_new_ones() {
    let clock = ManualClock::new();
    let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(10), 2);

    cache.insert("old-1".to_string(), 1, clock.now());
    cache.insert("old-2".to_string(), 2, clock.now());
    clock.advance(Duration::from_secs(11));
    cache.insert("new".to_string(), 3, clock.now());

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("new", clock.now()), Some(3));
}

#[test]
fn update_mutates_a_cached_value_in_place() {
    let clock = ManualClock::new();
    let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60), 4);

    cache.insert("count".to_string(), 1, clock.now());
    cache.update("count", |value| *value += 1);
    cache.update("missing", |value| *value += 100);

    assert_eq!(cache.get("count", clock.now()), Some(2));
    assert_eq!(cache.get("missing", clock.now()), None);
}

#[test]
fn zero_capacity_still_holds_one_entry() {
    let clock = ManualClock::new();
    let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60), 0);

    cache.insert("only".to_string(), 9, clock.now());
    assert_eq!(cache.get("only", clock.now()), Some(9));
}
