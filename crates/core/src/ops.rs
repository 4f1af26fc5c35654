//! OrderedParamSet: per-tile dictionary of param keys and values
//!
//! Every key and every value seen in a tile gets a small integer code, in
//! order of first appearance. A trace's params can then be written as
//! `,0=3,1=0,4=12,` instead of the verbose canonical trace id, which keeps
//! row names short.
//!
//! The set only ever grows: codes handed out once stay valid for the
//! lifetime of the tile, so rows written against an older version of the
//! set still decode against any newer version.

use crate::error::{Error, Result};
use crate::params::{ParamSet, Params};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Ordered dictionary of param keys and their values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedParamSet {
    /// Keys in code order
    key_order: Vec<String>,
    /// Values per key, in code order
    values: BTreeMap<String, Vec<String>>,
}

impl OrderedParamSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in code order
    pub fn key_order(&self) -> &[String] {
        &self.key_order
    }

    /// Values of `key` in code order
    pub fn values(&self, key: &str) -> Option<&[String]> {
        self.values.get(key).map(|v| v.as_slice())
    }

    /// True if no keys have been registered
    pub fn is_empty(&self) -> bool {
        self.key_order.is_empty()
    }

    /// The keys/values of `ps` that are not yet part of this set
    pub fn delta(&self, ps: &ParamSet) -> ParamSet {
        let mut delta = ParamSet::new();
        for (key, values) in ps.iter() {
            match self.values.get(key) {
                None => {
                    for v in values {
                        delta.add_value(key, v);
                    }
                }
                Some(known) => {
                    for v in values.iter().filter(|v| !known.contains(v)) {
                        delta.add_value(key, v);
                    }
                }
            }
        }
        delta
    }

    /// True if every key/value of `ps` already has a code
    pub fn contains_all(&self, ps: &ParamSet) -> bool {
        self.delta(ps).is_empty()
    }

    /// Register all keys and values of `ps`
    ///
    /// New keys are appended in sorted order, new values are appended to
    /// their key in sorted order. Existing codes never change.
    pub fn update(&mut self, ps: &ParamSet) {
        for (key, new_values) in self.delta(ps).iter() {
            let values = self.values.entry(key.clone()).or_insert_with(|| {
                self.key_order.push(key.clone());
                Vec::new()
            });
            values.extend(new_values.iter().cloned());
        }
    }

    /// Union of all keys and values as a normalized [`ParamSet`]
    pub fn param_set(&self) -> ParamSet {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Build an encoder with hash lookups for bulk encoding
    pub fn encoder(&self) -> OpsEncoder<'_> {
        OpsEncoder::new(self)
    }

    /// Encode params as `,{key code}={value code},...,`
    pub fn encode_params_as_string(&self, params: &Params) -> Result<String> {
        self.encoder().encode(params)
    }

    /// Decode a string produced by [`encode_params_as_string`](Self::encode_params_as_string)
    pub fn decode_params_from_string(&self, encoded: &str) -> Result<Params> {
        let malformed = || Error::MalformedEncoding(encoded.to_string());
        if encoded == "," {
            return Ok(Params::new());
        }
        let body = encoded
            .strip_prefix(',')
            .and_then(|s| s.strip_suffix(','))
            .ok_or_else(malformed)?;

        let mut params = Params::new();
        for pair in body.split(',') {
            let (k, v) = pair.split_once('=').ok_or_else(malformed)?;
            let k: usize = k.parse().map_err(|_| malformed())?;
            let v: usize = v.parse().map_err(|_| malformed())?;
            let key = self.key_order.get(k).ok_or_else(malformed)?;
            let value = self
                .values
                .get(key)
                .and_then(|values| values.get(v))
                .ok_or_else(malformed)?;
            params.insert(key.clone(), value.clone());
        }
        Ok(params)
    }

    /// Serialize for storage
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from storage
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        rmp_serde::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Hash-indexed view of an [`OrderedParamSet`] for encoding many traces
pub struct OpsEncoder<'a> {
    keys: HashMap<&'a str, (usize, HashMap<&'a str, usize>)>,
}

impl<'a> OpsEncoder<'a> {
    fn new(ops: &'a OrderedParamSet) -> Self {
        let keys = ops
            .key_order
            .iter()
            .enumerate()
            .map(|(key_idx, key)| {
                let values = ops
                    .values
                    .get(key)
                    .map(|values| {
                        values
                            .iter()
                            .enumerate()
                            .map(|(i, v)| (v.as_str(), i))
                            .collect()
                    })
                    .unwrap_or_default();
                (key.as_str(), (key_idx, values))
            })
            .collect();
        Self { keys }
    }

    /// Encode params as `,{key code}={value code},...,` ordered by key code
    pub fn encode(&self, params: &Params) -> Result<String> {
        let mut codes = Vec::with_capacity(params.len());
        for (k, v) in params {
            let (key_idx, values) = self
                .keys
                .get(k.as_str())
                .ok_or_else(|| Error::UnknownKey(k.clone()))?;
            let value_idx = values.get(v.as_str()).ok_or_else(|| Error::UnknownValue {
                key: k.clone(),
                value: v.clone(),
            })?;
            codes.push((*key_idx, *value_idx));
        }
        codes.sort_unstable();

        let mut out = String::with_capacity(codes.len() * 6 + 1);
        out.push(',');
        for (k, v) in codes {
            out.push_str(&k.to_string());
            out.push('=');
            out.push_str(&v.to_string());
            out.push(',');
        }
        Ok(out)
    }
}
