use std::fmt;
use std::sync::Arc;

pub type ObjectMap = ahash::AHashMap<Arc<str>, Value>;

/// Structured payload exchanged with the service under test.
///
/// Request payloads, response bodies, per-VU context entries and setup fixtures all use this
/// type so values can move between them without re-encoding.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(Arc<str>),
    Array(Vec<Value>),
    Object(ObjectMap),
}

impl Value {
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<Arc<str>>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            Self::U64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::U64(v) => Some(*v),
            Self::I64(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64(v) => Some(*v),
            Self::I64(v) => Some(*v as f64),
            Self::U64(v) => Some(*v as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|m| m.get(key))
    }

    /// Looks up a dot-separated path (`message.user_id`, `messages.0.message_id`).
    ///
    /// Numeric segments index into arrays. An empty path returns `self`.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(self);
        }

        path.split('.').try_fold(self, |cur, segment| match cur {
            Self::Object(map) => map.get(segment),
            Self::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// True for anything except null and empty strings/arrays/objects.
    #[must_use]
    pub fn is_present(&self) -> bool {
        match self {
            Self::Null => false,
            Self::String(s) => !s.is_empty(),
            Self::Array(items) => !items.is_empty(),
            Self::Object(map) => !map.is_empty(),
            _ => true,
        }
    }

    /// Scalar rendering used when interpolating values into text. Containers yield `None`.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.to_string()),
            Self::Bool(v) => Some(v.to_string()),
            Self::I64(v) => Some(v.to_string()),
            Self::U64(v) => Some(v.to_string()),
            Self::F64(v) => Some(v.to_string()),
            Self::Null | Self::Array(_) | Self::Object(_) => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(v) => serde_json::Value::Bool(*v),
            Self::I64(v) => serde_json::Value::from(*v),
            Self::U64(v) => serde_json::Value::from(*v),
            Self::F64(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => serde_json::Value::String(s.to_string()),
            Self::Array(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Self::U64(u)
                } else if let Some(i) = n.as_i64() {
                    Self::I64(i)
                } else {
                    Self::F64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::String(Arc::from(s)),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (Arc::<str>::from(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(Arc::from(v))
    }
}

impl From<Arc<str>> for Value {
    fn from(v: Arc<str>) -> Self {
        Self::String(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::U64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        Value::from(serde_json::json!({
            "user_id": "u-1",
            "messages": [
                { "message_id": "m-1" },
                { "message_id": "m-2" }
            ],
            "empty": ""
        }))
    }

    #[test]
    fn get_path_walks_objects_and_arrays() {
        let v = sample();
        assert_eq!(v.get_path("user_id").and_then(Value::as_str), Some("u-1"));
        assert_eq!(
            v.get_path("messages.1.message_id").and_then(Value::as_str),
            Some("m-2")
        );
        assert!(v.get_path("messages.9.message_id").is_none());
        assert!(v.get_path("user_id.nested").is_none());
        assert_eq!(v.get_path(""), Some(&v));
    }

    #[test]
    fn is_present_rejects_empty_values() {
        let v = sample();
        assert!(v.get_path("user_id").is_some_and(Value::is_present));
        assert!(!v.get_path("empty").is_some_and(Value::is_present));
        assert!(!Value::Null.is_present());
        assert!(Value::U64(0).is_present());
    }

    #[test]
    fn json_numbers_prefer_unsigned() {
        assert_eq!(Value::from(serde_json::json!(7)), Value::U64(7));
        assert_eq!(Value::from(serde_json::json!(-7)), Value::I64(-7));
        assert_eq!(Value::from(serde_json::json!(1.5)), Value::F64(1.5));
        assert_eq!(Value::U64(7).as_i64(), Some(7));
    }

    #[test]
    fn to_text_renders_scalars_only() {
        assert_eq!(Value::from("x").to_text().as_deref(), Some("x"));
        assert_eq!(Value::U64(3).to_text().as_deref(), Some("3"));
        assert!(Value::Array(vec![]).to_text().is_none());
    }
}
