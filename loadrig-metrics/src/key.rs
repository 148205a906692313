use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Interned metric name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NameId(u32);

#[derive(Default, Debug)]
pub(crate) struct Interner {
    map: RwLock<AHashMap<Arc<str>, u32>>,
    names: RwLock<Vec<Arc<str>>>,
}

impl Interner {
    pub(crate) fn lookup(&self, s: &str) -> Option<NameId> {
        self.map.read().get(s).copied().map(NameId)
    }

    pub(crate) fn get_or_intern(&self, s: &str) -> NameId {
        if let Some(id) = self.lookup(s) {
            return id;
        }

        let mut map = self.map.write();
        let mut names = self.names.write();

        // Another writer may have won the race between the read and write locks.
        if let Some(&id) = map.get(s) {
            return NameId(id);
        }

        let id = names.len() as u32;
        let s: Arc<str> = Arc::from(s);
        names.push(s.clone());
        map.insert(s, id);

        NameId(id)
    }

    pub(crate) fn resolve(&self, id: NameId) -> Option<Arc<str>> {
        self.names.read().get(id.0 as usize).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let interner = Interner::default();
        let a = interner.get_or_intern("login_latency");
        let b = interner.get_or_intern("login_success");
        assert_ne!(a, b);
        assert_eq!(interner.get_or_intern("login_latency"), a);
        assert_eq!(interner.lookup("login_success"), Some(b));
        assert_eq!(interner.lookup("missing"), None);
        assert_eq!(interner.resolve(b).as_deref(), Some("login_success"));
    }
}
