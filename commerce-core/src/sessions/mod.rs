//! Session store - recently viewed products and guest carts
//!
//! 使用 DashMap 实现无锁并发的会话存储。会话在首次交互时创建，
//! 超过 TTL 未访问或显式清除时移除。
//!
//! Nothing here is persisted; a restart starts with no sessions.

use dashmap::DashMap;
use shared::models::CartLine;
use shared::util::now_millis;
use std::collections::VecDeque;

/// Recently viewed products kept per session
pub const RECENTLY_VIEWED_LIMIT: usize = 10;

#[derive(Debug, Clone, Default)]
struct SessionData {
    /// Most recent first, distinct
    recently_viewed: VecDeque<u64>,
    cart: Option<Vec<CartLine>>,
    last_seen: i64,
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, SessionData>,
    ttl_ms: i64,
}

impl SessionStore {
    pub fn new(ttl_minutes: u32) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl_ms: i64::from(ttl_minutes) * 60_000,
        }
    }

    fn is_expired(&self, data: &SessionData, now: i64) -> bool {
        now - data.last_seen > self.ttl_ms
    }

    /// Run `f` on a live session, creating it (or replacing an expired one) first
    fn touch<R>(&self, session_id: &str, now: i64, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let mut entry = self.sessions.entry(session_id.to_string()).or_default();
        if self.is_expired(&entry, now) {
            *entry = SessionData::default();
        }
        entry.last_seen = now;
        f(&mut entry)
    }

    /// Read a live session without creating one
    fn read<R>(&self, session_id: &str, now: i64, f: impl FnOnce(&SessionData) -> R) -> Option<R> {
        let expired = match self.sessions.get(session_id) {
            Some(data) if !self.is_expired(&data, now) => return Some(f(&data)),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.sessions
                .remove_if(session_id, |_, data| self.is_expired(data, now));
        }
        None
    }

    // ========== Recently viewed ==========

    pub fn record_view(&self, session_id: &str, product_id: u64) {
        self.record_view_at(session_id, product_id, now_millis());
    }

    pub fn record_view_at(&self, session_id: &str, product_id: u64, now: i64) {
        self.touch(session_id, now, |data| {
            data.recently_viewed.retain(|id| *id != product_id);
            data.recently_viewed.push_front(product_id);
            data.recently_viewed.truncate(RECENTLY_VIEWED_LIMIT);
        });
    }

    /// Most recent first
    pub fn recently_viewed(&self, session_id: &str) -> Vec<u64> {
        self.recently_viewed_at(session_id, now_millis())
    }

    pub fn recently_viewed_at(&self, session_id: &str, now: i64) -> Vec<u64> {
        self.read(session_id, now, |data| data.recently_viewed.iter().copied().collect())
            .unwrap_or_default()
    }

    // ========== Guest cart ==========

    pub fn save_cart(&self, session_id: &str, lines: Vec<CartLine>) {
        self.save_cart_at(session_id, lines, now_millis());
    }

    pub fn save_cart_at(&self, session_id: &str, lines: Vec<CartLine>, now: i64) {
        self.touch(session_id, now, |data| data.cart = Some(lines));
    }

    pub fn cart(&self, session_id: &str) -> Option<Vec<CartLine>> {
        self.cart_at(session_id, now_millis())
    }

    pub fn cart_at(&self, session_id: &str, now: i64) -> Option<Vec<CartLine>> {
        self.read(session_id, now, |data| data.cart.clone()).flatten()
    }

    // ========== Lifecycle ==========

    pub fn clear(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// Drop every expired session; returns how many were removed
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(now_millis())
    }

    pub fn evict_expired_at(&self, now: i64) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, data| !self.is_expired(data, now));
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::debug!(evicted, "Expired sessions evicted");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    const MINUTE: i64 = 60_000;

    fn line() -> CartLine {
        CartLine {
            product_id: 3,
            product_name: "Brass Diya".to_string(),
            quantity: 2,
            unit_price: Decimal::new(350, 0),
        }
    }

    #[test]
    fn test_recently_viewed_order_and_dedup() {
        let store = SessionStore::new(30);
        let t0 = 1_000 * MINUTE;
        for id in [1, 2, 3, 2] {
            store.record_view_at("s1", id, t0);
        }
        assert_eq!(store.recently_viewed_at("s1", t0), vec![2, 3, 1]);
        assert!(store.recently_viewed_at("other", t0).is_empty());
    }

    #[test]
    fn test_recently_viewed_is_capped() {
        let store = SessionStore::new(30);
        for id in 0..15 {
            store.record_view_at("s1", id, 0);
        }
        let viewed = store.recently_viewed_at("s1", 0);
        assert_eq!(viewed.len(), RECENTLY_VIEWED_LIMIT);
        assert_eq!(viewed[0], 14);
        assert_eq!(viewed[9], 5);
    }

    #[test]
    fn test_guest_cart_roundtrip_and_clear() {
        let store = SessionStore::new(30);
        store.save_cart_at("s1", vec![line()], 0);
        assert_eq!(store.cart_at("s1", MINUTE), Some(vec![line()]));
        store.clear("s1");
        assert!(store.cart_at("s1", MINUTE).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_ttl_expiry() {
        let store = SessionStore::new(30);
        store.record_view_at("s1", 9, 0);
        store.save_cart_at("s1", vec![line()], 0);

        // exactly at the TTL the session is still live
        assert_eq!(store.recently_viewed_at("s1", 30 * MINUTE), vec![9]);
        assert!(store.cart_at("s1", 30 * MINUTE + 1).is_none());
        // expired reads drop the session
        assert_eq!(store.len(), 0);

        // a new interaction starts from scratch
        store.record_view_at("s1", 4, 40 * MINUTE);
        assert_eq!(store.recently_viewed_at("s1", 40 * MINUTE), vec![4]);
        assert!(store.cart_at("s1", 40 * MINUTE).is_none());
    }

    #[test]
    fn test_evict_expired() {
        let store = SessionStore::new(10);
        store.record_view_at("old", 1, 0);
        store.record_view_at("new", 1, 8 * MINUTE);
        assert_eq!(store.evict_expired_at(15 * MINUTE), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.recently_viewed_at("new", 15 * MINUTE), vec![1]);
    }
}
