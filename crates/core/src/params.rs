//! Params, param sets and trace identity
//!
//! A trace is identified by its full key/value parameter map. The canonical
//! [`TraceId`] is the sorted map rendered as `,k1=v1,k2=v2,`. Literal `,`,
//! `=` and `\` inside keys or values are backslash-escaped so that the
//! encoding stays unambiguous and can be parsed back.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key/value parameters of a single trace (sorted by key)
pub type Params = BTreeMap<String, String>;

/// Union of observed values per key
///
/// Values are kept sorted and unique once [`ParamSet::normalize`] has run;
/// the `add_*` methods keep that invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, Vec<String>>);

impl ParamSet {
    /// Create an empty param set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every key/value of `params`
    pub fn add_params(&mut self, params: &Params) {
        for (k, v) in params {
            self.add_value(k, v);
        }
    }

    /// Add a single key/value pair
    pub fn add_value(&mut self, key: &str, value: &str) {
        let values = self.0.entry(key.to_string()).or_default();
        if let Err(pos) = values.binary_search_by(|v| v.as_str().cmp(value)) {
            values.insert(pos, value.to_string());
        }
    }

    /// Merge another param set into this one
    pub fn add_param_set(&mut self, other: &ParamSet) {
        for (k, values) in &other.0 {
            for v in values {
                self.add_value(k, v);
            }
        }
    }

    /// Sort and deduplicate values of every key
    pub fn normalize(&mut self) {
        for values in self.0.values_mut() {
            values.sort();
            values.dedup();
        }
    }

    /// Values observed for `key`
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(|v| v.as_slice())
    }

    /// True if `key` has `value`
    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.0
            .get(key)
            .map(|values| values.iter().any(|v| v == value))
            .unwrap_or(false)
    }

    /// Insert a key with an explicit value list (normalized on insert)
    pub fn insert(&mut self, key: impl Into<String>, values: Vec<String>) {
        let mut values = values;
        values.sort();
        values.dedup();
        self.0.insert(key.into(), values);
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Iterate over keys and their values
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no keys are present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if `params` matches this param set used as a query
    ///
    /// Every key of the set must be present in `params` with one of the
    /// listed values. An empty set matches nothing.
    pub fn matches(&self, params: &Params) -> bool {
        !self.0.is_empty()
            && self.0.iter().all(|(k, values)| {
                params
                    .get(k)
                    .map(|v| values.iter().any(|candidate| candidate == v))
                    .unwrap_or(false)
            })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, Vec<V>)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (K, Vec<V>)>>(iter: I) -> Self {
        let mut ps = ParamSet::new();
        for (k, values) in iter {
            ps.insert(k, values.into_iter().map(Into::into).collect());
        }
        ps
    }
}

/// Canonical identity of a trace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    /// Build the canonical id of a param map
    pub fn from_params(params: &Params) -> Self {
        let mut out = String::with_capacity(params.len() * 16 + 1);
        out.push(',');
        for (k, v) in params {
            escape_into(&mut out, k);
            out.push('=');
            escape_into(&mut out, v);
            out.push(',');
        }
        TraceId(out)
    }

    /// Wrap an already encoded id without validation
    pub fn from_raw(raw: impl Into<String>) -> Self {
        TraceId(raw.into())
    }

    /// Parse the id back into its params
    pub fn to_params(&self) -> Result<Params> {
        parse_key(&self.0)
    }

    /// Raw string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        if matches!(c, ',' | '=' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
}

fn parse_key(key: &str) -> Result<Params> {
    let malformed = || Error::MalformedTraceId(key.to_string());
    let rest = key.strip_prefix(',').ok_or_else(malformed)?;

    let mut params = Params::new();
    let mut chars = rest.chars();
    let mut current = String::new();
    let mut pending_key: Option<String> = None;

    while let Some(c) = chars.next() {
        match c {
            '\\' => current.push(chars.next().ok_or_else(malformed)?),
            '=' if pending_key.is_none() => pending_key = Some(std::mem::take(&mut current)),
            ',' => {
                let k = pending_key.take().ok_or_else(malformed)?;
                if k.is_empty() {
                    return Err(malformed());
                }
                params.insert(k, std::mem::take(&mut current));
            }
            '=' => return Err(malformed()),
            c => current.push(c),
        }
    }

    if pending_key.is_some() || !current.is_empty() {
        return Err(malformed());
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_trace_id_is_sorted_and_delimited() {
        let id = TraceId::from_params(&params(&[("name", "T"), ("device", "X")]));
        assert_eq!(id.as_str(), ",device=X,name=T,");
    }

    #[test]
    fn test_trace_id_escapes_separators() {
        let p = params(&[("a=b", "c,d"), ("e", "f\\g")]);
        let id = TraceId::from_params(&p);
        assert_eq!(id.as_str(), ",a\\=b=c\\,d,e=f\\\\g,");
        assert_eq!(id.to_params().unwrap(), p);
    }

    #[test]
    fn test_empty_params() {
        let id = TraceId::from_params(&Params::new());
        assert_eq!(id.as_str(), ",");
        assert!(id.to_params().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_trace_ids() {
        for bad in ["", "a=b,", ",a=b", ",ab,", ",a=b=c,", ",=b,", ",a=b\\"] {
            assert!(TraceId::from_raw(bad).to_params().is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn test_param_set_add_keeps_sorted_unique() {
        let mut ps = ParamSet::new();
        ps.add_params(&params(&[("os", "linux"), ("gpu", "nv")]));
        ps.add_params(&params(&[("os", "android"), ("gpu", "nv")]));
        assert_eq!(ps.get("os").unwrap(), &["android".to_string(), "linux".to_string()]);
        assert_eq!(ps.get("gpu").unwrap(), &["nv".to_string()]);
        assert!(ps.contains("os", "linux"));
        assert!(!ps.contains("os", "mac"));
    }

    #[test]
    fn test_param_set_matches() {
        let query: ParamSet = [("os", vec!["linux", "mac"]), ("gpu", vec!["nv"])]
            .into_iter()
            .collect();
        assert!(query.matches(&params(&[("os", "mac"), ("gpu", "nv"), ("name", "t")])));
        assert!(!query.matches(&params(&[("os", "win"), ("gpu", "nv")])));
        assert!(!query.matches(&params(&[("os", "mac")])));
        assert!(!ParamSet::new().matches(&params(&[("os", "mac")])));
    }

    proptest! {
        #[test]
        fn prop_trace_id_round_trips(
            p in prop::collection::btree_map("[a-z,=\\\\]{1,6}", "[a-z,=\\\\]{0,6}", 0..6)
        ) {
            let id = TraceId::from_params(&p);
            prop_assert_eq!(id.to_params().unwrap(), p);
        }
    }
}
