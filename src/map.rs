use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::MapConfig;
use crate::entry::{Entry, EntryId, EntryTable};
use crate::error::MapError;
use crate::value::Value;

/// Maximum TTL in seconds (about 100 years).
///
/// Larger values are capped here so deadline arithmetic on `Instant`
/// cannot overflow.
pub const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

type ExpireCallback = Box<dyn FnMut(&str, &Value) + Send>;

/// Write-order list threaded through the entry table.
///
/// Head is the oldest-written entry, tail the newest. The links live on
/// the entries themselves, so membership costs no extra allocation.
#[derive(Debug, Default)]
struct RecencyList {
    head: Option<EntryId>,
    tail: Option<EntryId>,
}

impl RecencyList {
    fn push_back(&mut self, table: &mut EntryTable, id: EntryId) {
        let old_tail = self.tail;
        {
            let entry = table.get_mut(id);
            entry.prev = old_tail;
            entry.next = None;
        }
        match old_tail {
            Some(tail) => table.get_mut(tail).next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }

    fn unlink(&mut self, table: &mut EntryTable, id: EntryId) {
        let (prev, next) = {
            let entry = table.get_mut(id);
            let links = (entry.prev, entry.next);
            entry.prev = None;
            entry.next = None;
            links
        };
        match prev {
            Some(prev) => table.get_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => table.get_mut(next).prev = prev,
            None => self.tail = prev,
        }
    }

    fn move_to_back(&mut self, table: &mut EntryTable, id: EntryId) {
        if self.tail == Some(id) {
            return;
        }
        self.unlink(table, id);
        self.push_back(table, id);
    }

    fn oldest(&self) -> Option<EntryId> {
        self.head
    }
}

/// Bounded in-memory map whose entries expire after a per-entry TTL.
///
/// The map holds at most `capacity` entries. Two orderings decide which
/// entry goes when time or room runs out: entries past their deadline are
/// reclaimed earliest-deadline-first, and when a write pushes the map over
/// capacity the oldest-written entry is evicted. Writes refresh an entry's
/// recency; reads do not.
///
/// Expiration is pull-based. Reads lazily drop an expired entry they
/// touch, every write sweeps out a bounded number of already-expired
/// entries, and `remove_expired` runs the same sweep on demand. There is
/// no background task.
///
/// All operations take `&mut self`, so exclusive access is enforced by the
/// borrow checker in-process. The map is `Send`; callers sharing one
/// across threads wrap it in a `Mutex` and hold the lock for the duration
/// of each call.
///
/// # Example
///
/// ```rust
/// use lapse::TtlMap;
///
/// let mut visits = TtlMap::new(1024);
///
/// visits.set("user:123", 1, 60).unwrap();
/// let count = visits.increment("user:123", 1, 60).unwrap();
/// assert_eq!(count, 2);
/// ```
pub struct TtlMap<C: Clock = SystemClock> {
    capacity: usize,
    sweep_limit: usize,
    clock: C,
    table: EntryTable,
    index: HashMap<Arc<str>, EntryId>,
    expiry: BTreeSet<(Instant, EntryId)>,
    recency: RecencyList,
    on_expire: Option<ExpireCallback>,
}

impl TtlMap {
    /// Creates a map holding up to `capacity` entries, on the system clock.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0. A map that can hold nothing would turn
    /// every write into a silent no-op.
    pub fn new(capacity: usize) -> Self {
        Self::with_config(MapConfig::new(capacity))
    }

    /// Creates a map with explicit configuration, on the system clock.
    ///
    /// # Panics
    ///
    /// Panics if `config.capacity` is 0.
    pub fn with_config(config: MapConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> TtlMap<C> {
    /// Creates a map that reads time from the given clock.
    ///
    /// Useful for tests that need expiry to be deterministic.
    ///
    /// # Panics
    ///
    /// Panics if `config.capacity` is 0.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lapse::{MapConfig, MockClock, TtlMap};
    /// use std::time::Duration;
    ///
    /// let clock = MockClock::new();
    /// let mut map = TtlMap::with_clock(MapConfig::new(16), clock.clone());
    ///
    /// map.set("ephemeral", 1, 5).unwrap();
    /// clock.advance(Duration::from_secs(5));
    /// assert_eq!(map.get("ephemeral"), None);
    /// ```
    pub fn with_clock(config: MapConfig, clock: C) -> Self {
        assert!(config.capacity >= 1, "TtlMap capacity must be at least 1");
        Self {
            capacity: config.capacity,
            sweep_limit: config.sweep_limit,
            clock,
            table: EntryTable::default(),
            index: HashMap::new(),
            expiry: BTreeSet::new(),
            recency: RecencyList::default(),
            on_expire: None,
        }
    }

    /// Stores `value` under `key` with the given TTL in seconds.
    ///
    /// An existing entry is overwritten in place: its value and deadline
    /// are replaced and its write recency moves to most-recent. Before the
    /// write, up to the configured sweep limit of already-expired entries
    /// are reclaimed, each firing the expiration callback. If the write
    /// leaves the map over capacity, the oldest-written entry is evicted
    /// silently.
    ///
    /// TTLs above `MAX_TTL_SECONDS` are capped.
    ///
    /// # Errors
    ///
    /// Returns `MapError::InvalidTtl` if `ttl_seconds` is 0; the map is
    /// left untouched.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lapse::{TtlMap, Value};
    ///
    /// let mut sessions = TtlMap::new(64);
    /// sessions.set("token:abc", "alice", 900).unwrap();
    ///
    /// assert_eq!(sessions.get("token:abc"), Some(Value::Str("alice".into())));
    /// ```
    pub fn set(
        &mut self,
        key: &str,
        value: impl Into<Value>,
        ttl_seconds: u64,
    ) -> Result<(), MapError> {
        let ttl = validate_ttl(ttl_seconds)?;
        let now = self.clock.now();
        self.sweep(now, self.sweep_limit);
        self.upsert(key, value.into(), now + ttl);
        self.evict_over_capacity();
        Ok(())
    }

    /// Retrieves the value stored under `key`.
    ///
    /// Returns `None` if the key is absent or its TTL has elapsed. An
    /// expired entry found here is removed on the spot, firing the
    /// expiration callback with its key and last value.
    ///
    /// Reads do not refresh write recency; eviction order depends only on
    /// writes.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let id = self.index.get(key).copied()?;
        if self.table.get(id).is_expired_at(now) {
            self.expire_entry(id);
            return None;
        }
        Some(self.table.get(id).value.clone())
    }

    /// Retrieves the integer stored under `key`.
    ///
    /// Follows the same lookup and lazy-expiry rules as `get`; an absent
    /// or expired key is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `MapError::TypeMismatch` if the key holds a live value of
    /// another type. The entry is left untouched.
    pub fn get_int(&mut self, key: &str) -> Result<Option<i64>, MapError> {
        let now = self.clock.now();
        let id = match self.index.get(key).copied() {
            Some(id) => id,
            None => return Ok(None),
        };
        if self.table.get(id).is_expired_at(now) {
            self.expire_entry(id);
            return Ok(None);
        }
        match &self.table.get(id).value {
            Value::Int(value) => Ok(Some(*value)),
            other => Err(MapError::TypeMismatch {
                actual: other.type_name(),
            }),
        }
    }

    /// Adds `amount` to the integer stored under `key`, creating the entry
    /// if the key is absent or its previous entry expired.
    ///
    /// A fresh entry starts at `amount`. A live integer accumulates with
    /// saturating arithmetic. In both cases the deadline becomes
    /// `now + ttl_seconds`: the new TTL replaces whatever remained of the
    /// old one, and the entry's write recency moves to most-recent. The
    /// same pre-write sweep and capacity eviction as `set` apply. If the
    /// key's previous entry had already expired, the expiration callback
    /// fires for it before the new value is written.
    ///
    /// # Errors
    ///
    /// Returns `MapError::InvalidTtl` if `ttl_seconds` is 0, or
    /// `MapError::TypeMismatch` if the key holds a live value of a
    /// non-integer type. The addressed entry is left untouched on error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lapse::TtlMap;
    ///
    /// let mut counters = TtlMap::new(512);
    ///
    /// counters.increment("signups", 1, 300).unwrap();
    /// let total = counters.increment("signups", 4, 300).unwrap();
    /// assert_eq!(total, 5);
    /// ```
    pub fn increment(
        &mut self,
        key: &str,
        amount: i64,
        ttl_seconds: u64,
    ) -> Result<i64, MapError> {
        let ttl = validate_ttl(ttl_seconds)?;
        let now = self.clock.now();
        self.sweep(now, self.sweep_limit);

        // The sweep is bounded and may not have reached this key.
        if let Some(id) = self.index.get(key).copied() {
            if self.table.get(id).is_expired_at(now) {
                self.expire_entry(id);
            }
        }

        let expires_at = now + ttl;
        let new_value = match self.index.get(key).copied() {
            Some(id) => {
                let current = match self.table.get(id).value.as_int() {
                    Some(current) => current,
                    None => {
                        return Err(MapError::TypeMismatch {
                            actual: self.table.get(id).value.type_name(),
                        });
                    }
                };
                let summed = current.saturating_add(amount);
                self.upsert(key, Value::Int(summed), expires_at);
                summed
            }
            None => {
                self.upsert(key, Value::Int(amount), expires_at);
                amount
            }
        };
        self.evict_over_capacity();
        Ok(new_value)
    }

    /// Removes up to `max_count` entries whose TTL has elapsed, earliest
    /// deadline first, firing the expiration callback for each.
    ///
    /// Intended for periodic maintenance so expired entries are reclaimed
    /// even if never read again. A no-op on an empty map. Returns the
    /// number of entries removed.
    pub fn remove_expired(&mut self, max_count: usize) -> usize {
        let now = self.clock.now();
        let removed = self.sweep(now, max_count);
        if removed > 0 {
            debug!(removed, "maintenance sweep removed expired entries");
        }
        removed
    }

    /// Removes up to `max_count` entries in oldest-written-first order,
    /// whether or not they have expired.
    ///
    /// This is the capacity-eviction path run on demand, for relieving
    /// memory pressure, so the expiration callback never fires. A no-op on
    /// an empty map. Returns the number of entries removed.
    pub fn remove_last_used(&mut self, max_count: usize) -> usize {
        let mut removed = 0;
        while removed < max_count {
            match self.recency.oldest() {
                Some(id) => {
                    self.remove_entry(id);
                    removed += 1;
                }
                None => break,
            }
        }
        if removed > 0 {
            debug!(removed, "removed oldest-written entries");
        }
        removed
    }

    /// Number of entries currently indexed.
    ///
    /// Entries whose TTL elapsed but which no read or sweep has touched
    /// yet are still counted until reclaimed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Maximum number of live entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Installs the expiration callback, replacing any previous one.
    ///
    /// The callback fires once per entry removed because its TTL elapsed,
    /// whether through lazy removal on read, a pre-write sweep, or
    /// `remove_expired`, and receives the entry's key and last value.
    /// Capacity evictions and `remove_last_used` never fire it.
    ///
    /// It runs synchronously on the calling thread, inside whichever
    /// operation discovers the expiry, and must not call back into the
    /// map.
    pub fn set_on_expire(&mut self, callback: impl FnMut(&str, &Value) + Send + 'static) {
        self.on_expire = Some(Box::new(callback));
    }

    /// Removes up to `limit` entries past their deadline, earliest first.
    fn sweep(&mut self, now: Instant, limit: usize) -> usize {
        let mut removed = 0;
        while removed < limit {
            match self.expiry.first().copied() {
                Some((deadline, id)) if deadline <= now => {
                    self.expire_entry(id);
                    removed += 1;
                }
                _ => break,
            }
        }
        removed
    }

    /// Removes an entry past its deadline and fires the expiration
    /// callback.
    fn expire_entry(&mut self, id: EntryId) {
        let entry = self.remove_entry(id);
        trace!(key = %entry.key, "removed expired entry");
        if let Some(callback) = self.on_expire.as_mut() {
            callback(&entry.key, &entry.value);
        }
    }

    /// Writes `value` under `key`, inserting or overwriting in place.
    ///
    /// Either way the entry ends up newest in the recency order and at
    /// `expires_at` in the deadline order.
    fn upsert(&mut self, key: &str, value: Value, expires_at: Instant) {
        match self.index.get(key).copied() {
            Some(id) => {
                let old_deadline = self.table.get(id).expires_at;
                self.expiry.remove(&(old_deadline, id));
                let entry = self.table.get_mut(id);
                entry.value = value;
                entry.expires_at = expires_at;
                self.expiry.insert((expires_at, id));
                self.recency.move_to_back(&mut self.table, id);
            }
            None => {
                let key: Arc<str> = Arc::from(key);
                let id = self
                    .table
                    .insert(Entry::new(Arc::clone(&key), value, expires_at));
                self.index.insert(key, id);
                self.expiry.insert((expires_at, id));
                self.recency.push_back(&mut self.table, id);
            }
        }
        debug_assert_eq!(self.index.len(), self.table.len());
        debug_assert_eq!(self.index.len(), self.expiry.len());
    }

    /// Evicts oldest-written entries until the map is within capacity.
    ///
    /// Eviction is silent: the expiration callback is for elapsed TTLs
    /// only.
    fn evict_over_capacity(&mut self) {
        while self.index.len() > self.capacity {
            match self.recency.oldest() {
                Some(id) => {
                    let entry = self.remove_entry(id);
                    debug!(key = %entry.key, "evicted oldest-written entry over capacity");
                }
                None => break,
            }
        }
    }

    /// Detaches an entry from all three orderings and returns it.
    fn remove_entry(&mut self, id: EntryId) -> Entry {
        self.recency.unlink(&mut self.table, id);
        let entry = self.table.remove(id);
        self.expiry.remove(&(entry.expires_at, id));
        self.index.remove(entry.key.as_ref());
        debug_assert_eq!(self.index.len(), self.table.len());
        debug_assert_eq!(self.index.len(), self.expiry.len());
        entry
    }
}

fn validate_ttl(ttl_seconds: u64) -> Result<Duration, MapError> {
    if ttl_seconds == 0 {
        return Err(MapError::InvalidTtl { ttl_seconds });
    }
    // Cap so the deadline addition onto Instant cannot overflow.
    Ok(Duration::from_secs(ttl_seconds.min(MAX_TTL_SECONDS)))
}
