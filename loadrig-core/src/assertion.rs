use std::fmt;
use std::sync::Arc;

use loadrig_value::Value;

use crate::context::VuContext;
use crate::remote::RemoteResponse;

type Predicate = dyn Fn(&RemoteResponse, &VuContext) -> bool + Send + Sync;

/// A named predicate over a response. Every evaluation is tallied under its name.
#[derive(Clone)]
pub struct Assertion {
    name: Arc<str>,
    predicate: Arc<Predicate>,
}

impl fmt::Debug for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assertion")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Assertion {
    pub fn new<F>(name: impl Into<Arc<str>>, predicate: F) -> Self
    where
        F: Fn(&RemoteResponse, &VuContext) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn evaluate(&self, response: &RemoteResponse, ctx: &VuContext) -> bool {
        (self.predicate)(response, ctx)
    }

    pub fn status_ok(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, |res, _| res.is_ok())
    }

    /// Field at `path` is set and non-empty.
    pub fn present(name: impl Into<Arc<str>>, path: &str) -> Self {
        let path = path.to_string();
        Self::new(name, move |res, _| {
            res.body.get_path(&path).is_some_and(Value::is_present)
        })
    }

    /// Field at `path` exists and is not null (empty strings and zeros count).
    pub fn exists(name: impl Into<Arc<str>>, path: &str) -> Self {
        let path = path.to_string();
        Self::new(name, move |res, _| {
            res.body.get_path(&path).is_some_and(|v| !v.is_null())
        })
    }

    /// Field at `path` equals the context value stored under `key`.
    pub fn equals_context(name: impl Into<Arc<str>>, path: &str, key: &str) -> Self {
        let path = path.to_string();
        let key = key.to_string();
        Self::new(name, move |res, ctx| {
            match (res.body.get_path(&path), ctx.get(&key)) {
                (Some(actual), Some(expected)) => actual == expected,
                _ => false,
            }
        })
    }

    pub fn is_array(name: impl Into<Arc<str>>, path: &str) -> Self {
        let path = path.to_string();
        Self::new(name, move |res, _| {
            res.body.get_path(&path).and_then(Value::as_array).is_some()
        })
    }

    /// Some element of the array at `array_path` has `field` equal to the context value `key`.
    pub fn array_contains(
        name: impl Into<Arc<str>>,
        array_path: &str,
        field: &str,
        key: &str,
    ) -> Self {
        let array_path = array_path.to_string();
        let field = field.to_string();
        let key = key.to_string();
        Self::new(name, move |res, ctx| {
            let Some(expected) = ctx.get(&key) else {
                return false;
            };
            res.body
                .get_path(&array_path)
                .and_then(Value::as_array)
                .is_some_and(|items| {
                    items
                        .iter()
                        .any(|item| item.get_path(&field) == Some(expected))
                })
        })
    }
}
