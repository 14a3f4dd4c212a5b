//! Query-string decoding.
//!
//! Decodes `application/x-www-form-urlencoded` pairs into an ordered
//! tree. Repeated keys are promoted to sequences, bracketed keys nest
//! into maps (`a[b][c]=v`), and `a[]=v` appends to a sequence. Insertion
//! order is preserved throughout, so iterating a parsed query replays
//! the wire order.

use serde_json::Value;
use std::borrow::Cow;

/// A decoded query value: scalar text, a sequence, or a nested map.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryValue {
    Text(String),
    Seq(Vec<QueryValue>),
    Map(QueryMap),
}

impl QueryValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[QueryValue]> {
        match self {
            QueryValue::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&QueryMap> {
        match self {
            QueryValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Convert into a `serde_json::Value` tree.
    pub fn to_json(&self) -> Value {
        match self {
            QueryValue::Text(s) => Value::String(s.clone()),
            QueryValue::Seq(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            QueryValue::Map(map) => map.to_json(),
        }
    }
}

/// An ordered key→value mapping of decoded query pairs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryMap {
    entries: Vec<(String, QueryValue)>,
}

impl QueryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Shorthand for a scalar lookup.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(QueryValue::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        for (key, value) in &self.entries {
            obj.insert(key.clone(), value.to_json());
        }
        Value::Object(obj)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut QueryValue> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Insert a decoded scalar at a bracket path rooted at `path[0]`.
    fn insert_path(&mut self, path: &[String], value: String) {
        debug_assert!(!path.is_empty());
        let key = &path[0];

        // `a[]=v` appends to a sequence under `a`.
        if path.len() == 2 && path[1].is_empty() {
            match self.get_mut(key) {
                Some(slot) => push_scalar(slot, value),
                None => {
                    self.entries
                        .push((key.clone(), QueryValue::Seq(vec![QueryValue::Text(value)])));
                }
            }
            return;
        }

        if path.len() == 1 {
            // Scalar leaf: a repeated key promotes the entry to a sequence.
            match self.get_mut(key) {
                Some(slot) => push_scalar(slot, value),
                None => self.entries.push((key.clone(), QueryValue::Text(value))),
            }
            return;
        }

        // Descend into (or create) a nested map. A scalar already stored at
        // this key is displaced by the map, matching qs behavior.
        let needs_map = !matches!(self.get(key), Some(QueryValue::Map(_)));
        if needs_map {
            match self.get_mut(key) {
                Some(existing) => *existing = QueryValue::Map(QueryMap::new()),
                None => self
                    .entries
                    .push((key.clone(), QueryValue::Map(QueryMap::new()))),
            }
        }
        if let Some(QueryValue::Map(map)) = self.get_mut(key) {
            map.insert_path(&path[1..], value);
        }
    }
}

/// Push a scalar into an occupied slot: sequences grow, scalars are
/// promoted to a two-element sequence, and a nested map swallows the
/// conflicting scalar.
fn push_scalar(slot: &mut QueryValue, value: String) {
    match slot {
        QueryValue::Seq(items) => items.push(QueryValue::Text(value)),
        QueryValue::Text(_) => {
            let prev = std::mem::replace(slot, QueryValue::Seq(Vec::new()));
            if let QueryValue::Seq(items) = slot {
                items.push(prev);
                items.push(QueryValue::Text(value));
            }
        }
        QueryValue::Map(_) => {}
    }
}

/// Parse a raw query string (without the leading `?`) into a [`QueryMap`].
pub fn parse_query(query: &str) -> QueryMap {
    let mut map = QueryMap::new();
    for part in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = match part.split_once('=') {
            Some((k, v)) => (k, v),
            None => (part, ""),
        };
        let key = decode_component(raw_key);
        let value = decode_component(raw_value);
        let path = split_bracket_path(&key);
        map.insert_path(&path, value);
    }
    map
}

/// Percent-decode a component, treating `+` as a space.
fn decode_component(raw: &str) -> String {
    let plus_decoded: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    urlencoding::decode(&plus_decoded)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| plus_decoded.into_owned())
}

/// Split `a[b][c]` into `["a", "b", "c"]`. Keys that do not follow the
/// bracket syntax are returned whole.
fn split_bracket_path(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    if !key.ends_with(']') {
        return vec![key.to_string()];
    }

    let root = &key[..open];
    let mut path = vec![root.to_string()];
    let mut rest = &key[open..];
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return vec![key.to_string()];
        }
        let Some(close) = rest.find(']') else {
            return vec![key.to_string()];
        };
        path.push(rest[1..close].to_string());
        rest = &rest[close + 1..];
    }
    path
}
