use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ahash::AHashMap;
use loadrig_value::Value;

pub type ValueMap = AHashMap<Arc<str>, Value>;

/// Where an extracted value lives inside a [`VuContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Scope {
    /// Cleared when the next iteration begins.
    Iteration,
    /// Kept for the lifetime of the virtual user.
    Vu,
}

/// Values produced once by Setup and shared read-only by every virtual user.
#[derive(Debug, Clone, Default)]
pub struct SharedFixture(Arc<ValueMap>);

impl SharedFixture {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Value)> {
        self.0.iter()
    }
}

impl From<ValueMap> for SharedFixture {
    fn from(map: ValueMap) -> Self {
        Self(Arc::new(map))
    }
}

/// Mutable state owned by one virtual user.
///
/// Lookups fall through iteration scope, then VU scope, then the shared fixture.
#[derive(Debug)]
pub struct VuContext {
    vu_id: u64,
    iteration: u64,
    identity: Arc<str>,
    iteration_values: ValueMap,
    vu_values: ValueMap,
    fixture: SharedFixture,
}

impl VuContext {
    #[must_use]
    pub fn new(vu_id: u64, fixture: SharedFixture) -> Self {
        Self {
            vu_id,
            iteration: 0,
            identity: iteration_identity(vu_id, 0),
            iteration_values: ValueMap::default(),
            vu_values: ValueMap::default(),
            fixture,
        }
    }

    /// Clears iteration scope and derives a fresh identity.
    pub fn begin_iteration(&mut self, iteration: u64) {
        self.iteration = iteration;
        self.identity = iteration_identity(self.vu_id, iteration);
        self.iteration_values.clear();
    }

    #[must_use]
    pub fn vu_id(&self) -> u64 {
        self.vu_id
    }

    #[must_use]
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Unique per (virtual user, iteration) across the whole run, e.g. `3_17_1718000000123456789`.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn fixture(&self) -> &SharedFixture {
        &self.fixture
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.iteration_values
            .get(key)
            .or_else(|| self.vu_values.get(key))
            .or_else(|| self.fixture.get(key))
    }

    pub fn require(&self, key: &str) -> Result<&Value, String> {
        self.get(key)
            .ok_or_else(|| format!("context value `{key}` is not set"))
    }

    pub fn require_str(&self, key: &str) -> Result<&str, String> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| format!("context value `{key}` is not a string"))
    }

    pub fn set(&mut self, scope: Scope, key: impl Into<Arc<str>>, value: Value) {
        let map = match scope {
            Scope::Iteration => &mut self.iteration_values,
            Scope::Vu => &mut self.vu_values,
        };
        map.insert(key.into(), value);
    }

    /// Everything this context produced, iteration values taking precedence.
    pub(crate) fn into_fixture(self) -> SharedFixture {
        let mut values = self.vu_values;
        values.extend(self.iteration_values);
        SharedFixture::from(values)
    }
}

fn iteration_identity(vu_id: u64, iteration: u64) -> Arc<str> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    Arc::from(format!("{vu_id}_{iteration}_{nanos}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn lookups_fall_through_scopes() {
        let mut fixture = ValueMap::default();
        fixture.insert(Arc::from("receiver"), Value::from("fixture"));
        fixture.insert(Arc::from("shadowed"), Value::from("fixture"));

        let mut ctx = VuContext::new(1, SharedFixture::from(fixture));
        ctx.set(Scope::Vu, "shadowed", Value::from("vu"));
        ctx.set(Scope::Iteration, "token", Value::from("t-1"));

        assert_eq!(ctx.require_str("receiver"), Ok("fixture"));
        assert_eq!(ctx.require_str("shadowed"), Ok("vu"));
        assert_eq!(ctx.require_str("token"), Ok("t-1"));
        assert!(ctx.require("missing").is_err());
    }

    #[test]
    fn begin_iteration_clears_only_iteration_scope() {
        let mut ctx = VuContext::new(2, SharedFixture::default());
        ctx.set(Scope::Vu, "session", Value::from("s"));
        ctx.set(Scope::Iteration, "token", Value::from("t"));

        ctx.begin_iteration(1);
        assert!(ctx.get("token").is_none());
        assert_eq!(ctx.get("session"), Some(&Value::from("s")));
        assert_eq!(ctx.iteration(), 1);
    }

    #[test]
    fn identities_are_unique_per_vu_and_iteration() {
        let mut seen = HashSet::new();
        for vu in 1..=4 {
            let mut ctx = VuContext::new(vu, SharedFixture::default());
            for iter in 0..25 {
                ctx.begin_iteration(iter);
                assert!(ctx.identity().starts_with(&format!("{vu}_{iter}_")));
                assert!(seen.insert(ctx.identity().to_string()));
            }
        }
        assert_eq!(seen.len(), 100);
    }

    #[test]
    fn into_fixture_merges_scopes() {
        let mut ctx = VuContext::new(0, SharedFixture::default());
        ctx.set(Scope::Vu, "a", Value::from(1u64));
        ctx.set(Scope::Iteration, "b", Value::from(2u64));

        let fixture = ctx.into_fixture();
        assert_eq!(fixture.len(), 2);
        assert_eq!(fixture.get("b"), Some(&Value::U64(2)));
    }
}
