//! Request id value and its slot on [`Context`].

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::context::Context;

/// Reserved context key. Private: only this module can read or write the slot.
struct RequestIdKey;

/// An opaque request id. Cheap to clone (Arc).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(Arc<str>);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for RequestId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RequestId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl PartialEq<str> for RequestId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for RequestId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// Derive a context carrying `id`. `cx` itself is not modified.
pub fn store(cx: &Context, id: impl Into<RequestId>) -> Context {
    cx.with_value::<RequestIdKey, RequestId>(id.into())
}

/// The request id carried by `cx`, if any.
pub fn load(cx: &Context) -> Option<&RequestId> {
    cx.value::<RequestIdKey, RequestId>()
}

/// The request id carried by `cx`, or an empty string when there is none.
pub fn from_context(cx: &Context) -> &str {
    load(cx).map_or("", RequestId::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_on_empty_context() {
        let cx = Context::background();
        assert!(load(&cx).is_none());
        assert_eq!(from_context(&cx), "");
    }

    #[test]
    fn test_store_then_load() {
        let cx = Context::background();
        let derived = store(&cx, "foo");

        assert_eq!(load(&derived).map(RequestId::as_str), Some("foo"));
        assert_eq!(from_context(&derived), "foo");
        assert!(load(&cx).is_none());
    }

    #[test]
    fn test_second_store_wins() {
        let cx = store(&store(&Context::background(), "foo"), "bar");
        assert_eq!(from_context(&cx), "bar");
    }

    #[test]
    fn test_string_valued_foreign_keys_cannot_overwrite() {
        struct RequestIdKey;
        let cx = store(&Context::background(), "real");
        let cx = cx
            .with_value::<RequestIdKey, _>(RequestId::from("forged"))
            .with_value::<&'static str, _>(RequestId::from("forged"))
            .with_value::<String, _>("request_id".to_string());

        assert_eq!(from_context(&cx), "real");
    }

    #[test]
    fn test_request_id_conversions() {
        let id = RequestId::from("abc".to_string());
        assert_eq!(id, "abc");
        assert_eq!(id.to_string(), "abc");
        assert_eq!(id.len(), 3);
    }
}
