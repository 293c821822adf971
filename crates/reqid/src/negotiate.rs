//! Header negotiation: which inbound header carries the request id.

use std::sync::Arc;

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::Error;

/// Header names checked for an inbound request id, highest priority first.
pub const DEFAULT_HEADERS: [&str; 6] = [
    "X-Request-ID",
    "X-Correlation-ID",
    "X-Trace-ID",
    "Request-ID",
    "Correlation-ID",
    "Trace-ID",
];

// Parsed form of DEFAULT_HEADERS; HeaderName::from_static wants lowercase.
const DEFAULT_HEADER_NAMES: [HeaderName; 6] = [
    HeaderName::from_static("x-request-id"),
    HeaderName::from_static("x-correlation-id"),
    HeaderName::from_static("x-trace-id"),
    HeaderName::from_static("request-id"),
    HeaderName::from_static("correlation-id"),
    HeaderName::from_static("trace-id"),
];

/// Ordered, non-empty list of candidate header names. Cheap to clone (Arc).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderList {
    names: Arc<[HeaderName]>,
}

impl HeaderList {
    /// Build a list from caller-supplied names, replacing the defaults entirely.
    ///
    /// An empty input yields the default list.
    pub fn new<I, N>(names: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                HeaderName::from_bytes(name.as_bytes()).map_err(|source| {
                    Error::InvalidHeaderName {
                        name: name.to_string(),
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if names.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            names: names.into(),
        })
    }

    /// The name used when no inbound header matched.
    pub fn primary(&self) -> &HeaderName {
        &self.names[0]
    }

    pub fn as_slice(&self) -> &[HeaderName] {
        &self.names
    }
}

impl Default for HeaderList {
    fn default() -> Self {
        Self {
            names: DEFAULT_HEADER_NAMES.to_vec().into(),
        }
    }
}

/// Find the first name in `names` whose first value in `headers` is non-empty.
pub fn negotiate<'a>(
    names: &'a [HeaderName],
    headers: &'a HeaderMap,
) -> Option<(&'a HeaderName, &'a HeaderValue)> {
    names.iter().find_map(|name| {
        headers
            .get(name)
            .filter(|value| !value.is_empty())
            .map(|value| (name, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_default_list_order() {
        let list = HeaderList::default();
        let names: Vec<&str> = list.as_slice().iter().map(HeaderName::as_str).collect();
        assert_eq!(
            names,
            vec![
                "x-request-id",
                "x-correlation-id",
                "x-trace-id",
                "request-id",
                "correlation-id",
                "trace-id",
            ]
        );
        assert_eq!(list.primary().as_str(), "x-request-id");
    }

    #[test]
    fn test_default_list_matches_exported_names() {
        let list = HeaderList::default();
        for (name, parsed) in DEFAULT_HEADERS.iter().zip(list.as_slice()) {
            assert!(name.eq_ignore_ascii_case(parsed.as_str()));
        }
    }

    #[test]
    fn test_custom_list_replaces_defaults() {
        let list = HeaderList::new(["X-Amzn-Trace-Id"]).unwrap();
        assert_eq!(list.as_slice().len(), 1);
        assert_eq!(list.primary().as_str(), "x-amzn-trace-id");
    }

    #[test]
    fn test_empty_list_means_defaults() {
        let list = HeaderList::new(Vec::<String>::new()).unwrap();
        assert_eq!(list, HeaderList::default());
    }

    #[test]
    fn test_invalid_name_rejected() {
        let err = HeaderList::new(["X-Request-ID", "bad header"]).unwrap_err();
        assert!(matches!(err, Error::InvalidHeaderName { ref name, .. } if name == "bad header"));
    }

    #[test]
    fn test_picks_present_candidate() {
        let list = HeaderList::new(["A", "B", "C"]).unwrap();
        let map = headers(&[("B", "x")]);

        let (name, value) = negotiate(list.as_slice(), &map).unwrap();
        assert_eq!(name.as_str(), "b");
        assert_eq!(value, "x");
    }

    #[test]
    fn test_priority_beats_header_order() {
        let list = HeaderList::default();
        let map = headers(&[("Trace-ID", "low"), ("X-Correlation-ID", "high")]);

        let (name, value) = negotiate(list.as_slice(), &map).unwrap();
        assert_eq!(name.as_str(), "x-correlation-id");
        assert_eq!(value, "high");
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let list = HeaderList::default();
        let map = headers(&[("X-Request-ID", ""), ("X-Trace-ID", "t")]);

        let (name, value) = negotiate(list.as_slice(), &map).unwrap();
        assert_eq!(name.as_str(), "x-trace-id");
        assert_eq!(value, "t");
    }

    #[test]
    fn test_only_first_value_counts() {
        let list = HeaderList::new(["A", "B"]).unwrap();
        let map = headers(&[("A", ""), ("A", "second"), ("B", "b")]);

        let (name, _) = negotiate(list.as_slice(), &map).unwrap();
        assert_eq!(name.as_str(), "b");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let list = HeaderList::default();
        let map = headers(&[("x-REQUEST-id", "abc")]);

        let (_, value) = negotiate(list.as_slice(), &map).unwrap();
        assert_eq!(value, "abc");
    }

    #[test]
    fn test_not_found() {
        let list = HeaderList::new(["A", "B", "C"]).unwrap();
        assert!(negotiate(list.as_slice(), &HeaderMap::new()).is_none());

        let map = headers(&[("D", "x")]);
        assert!(negotiate(list.as_slice(), &map).is_none());

        let reversed = HeaderList::new(["C", "B", "A"]).unwrap();
        assert!(negotiate(reversed.as_slice(), &map).is_none());
    }
}
