use std::sync::Arc;
use std::time::Instant;

use crate::value::Value;

/// Stable handle to an entry's slot in the table.
pub(crate) type EntryId = usize;

/// One stored record: the owning key, its payload, and the absolute
/// deadline after which readers no longer see it.
///
/// `prev`/`next` thread the entry into the write-recency list. Both
/// orderings address entries through their table slot, so a record never
/// moves while live.
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) key: Arc<str>,
    pub(crate) value: Value,
    pub(crate) expires_at: Instant,
    pub(crate) prev: Option<EntryId>,
    pub(crate) next: Option<EntryId>,
}

impl Entry {
    /// Creates an unlinked entry with the given deadline.
    pub(crate) fn new(key: Arc<str>, value: Value, expires_at: Instant) -> Self {
        Self {
            key,
            value,
            expires_at,
            prev: None,
            next: None,
        }
    }

    /// Checks whether this entry is past its deadline at the given time.
    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Slot arena giving every entry a stable `EntryId`.
///
/// Freed slots are recycled through a free list, so ids stay dense and
/// live entries never shift.
#[derive(Debug, Default)]
pub(crate) struct EntryTable {
    slots: Vec<Option<Entry>>,
    free: Vec<EntryId>,
}

impl EntryTable {
    /// Stores an entry and returns the id of the slot it landed in.
    pub(crate) fn insert(&mut self, entry: Entry) -> EntryId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(entry);
                id
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        }
    }

    /// Takes the entry out of its slot and recycles the slot.
    pub(crate) fn remove(&mut self, id: EntryId) -> Entry {
        let entry = self.slots[id].take().expect("removed entry id is not live");
        self.free.push(id);
        entry
    }

    pub(crate) fn get(&self, id: EntryId) -> &Entry {
        self.slots[id].as_ref().expect("entry id is not live")
    }

    pub(crate) fn get_mut(&mut self, id: EntryId) -> &mut Entry {
        self.slots[id].as_mut().expect("entry id is not live")
    }

    /// Number of live entries in the table.
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn make_entry(key: &str, value: i64, expires_at: Instant) -> Entry {
        Entry::new(Arc::from(key), Value::Int(value), expires_at)
    }

    #[test]
    fn test_expiry_includes_the_deadline_itself() {
        let deadline = Instant::now() + Duration::from_secs(1);
        let entry = make_entry("a", 1, deadline);

        assert!(!entry.is_expired_at(deadline - Duration::from_nanos(1)));
        assert!(entry.is_expired_at(deadline));
        assert!(entry.is_expired_at(deadline + Duration::from_secs(1)));
    }

    #[test]
    fn test_insert_assigns_distinct_ids() {
        let mut table = EntryTable::default();
        let now = Instant::now();

        let a = table.insert(make_entry("a", 1, now));
        let b = table.insert(make_entry("b", 2, now));

        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert_eq!(&*table.get(a).key, "a");
        assert_eq!(&*table.get(b).key, "b");
    }

    #[test]
    fn test_remove_recycles_the_slot() {
        let mut table = EntryTable::default();
        let now = Instant::now();

        let a = table.insert(make_entry("a", 1, now));
        let removed = table.remove(a);
        assert_eq!(&*removed.key, "a");
        assert_eq!(table.len(), 0);

        let b = table.insert(make_entry("b", 2, now));
        assert_eq!(b, a, "freed slot should be reused");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut table = EntryTable::default();
        let now = Instant::now();

        let id = table.insert(make_entry("a", 1, now));
        table.get_mut(id).value = Value::Int(5);

        assert_eq!(table.get(id).value, Value::Int(5));
    }
}
