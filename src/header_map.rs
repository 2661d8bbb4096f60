// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use hashbrown::HashMap;

use crate::{
    Result,
    ValidationError,
};

/// One or more values supplied for a single header field.
///
/// A scalar is stored as a one-element list. The empty list is rejected at
/// the call that supplies it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderValue {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::One(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::One(value)
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        HeaderValue::Many(values)
    }
}

impl From<Vec<&str>> for HeaderValue {
    fn from(values: Vec<&str>) -> Self {
        HeaderValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

impl HeaderValue {
    /// Trim optional whitespace (SP / HTAB) off every value and reject the
    /// empty list.
    fn normalize(self) -> Result<Vec<String>> {
        let trim = |value: String| value.trim_matches([' ', '\t']).to_string();

        match self {
            HeaderValue::One(value) => Ok(vec![trim(value)]),
            HeaderValue::Many(values) => {
                if values.is_empty() {
                    return Err(ValidationError::EmptyHeaderValue.into());
                }

                Ok(values.into_iter().map(trim).collect())
            }
        }
    }
}

#[derive(Clone, Debug)]
struct HeaderEntry {
    /// The name in the casing it was supplied with.
    name: String,
    values: Vec<String>,
}

/// A case-insensitive, order-preserving header collection.
///
/// Entries live in insertion order in a list, keyed for O(1) lookup through
/// an index of ASCII-lowercased names. Names are unique modulo case; the
/// casing of the most recent `set` is the one reported back. Values within
/// one name keep their insertion order.
#[derive(Clone, Debug, Default)]
pub struct HeaderMap {
    entries: Vec<HeaderEntry>,
    index: HashMap<String, usize>,
}

impl HeaderMap {
    #[must_use]
    pub fn new() -> HeaderMap {
        HeaderMap::default()
    }

    /// Bulk constructor with the same merge behavior as repeated
    /// [`HeaderMap::append`]: same-name pairs concatenate their values onto
    /// the first-seen casing.
    pub fn from_pairs<N, V, I>(pairs: I) -> Result<HeaderMap>
    where
        N: Into<String>,
        V: Into<HeaderValue>,
        I: IntoIterator<Item = (N, V)>,
    {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(name, value)?;
        }

        Ok(headers)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_ascii_lowercase())
    }

    /// The ordered values for `name`, or the empty slice when absent.
    #[must_use]
    pub fn get(&self, name: &str) -> &[String] {
        match self.index.get(&name.to_ascii_lowercase()) {
            Some(&position) => &self.entries[position].values,
            None => &[],
        }
    }

    /// The values for `name` joined with `", "`, or the empty string when
    /// absent.
    #[must_use]
    pub fn get_line(&self, name: &str) -> String {
        self.get(name).join(", ")
    }

    /// Replaces any header whose name matches case-insensitively, keeping
    /// its position but remembering the newly supplied casing; appends a
    /// new entry otherwise.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Result<()> {
        let name = name.into();
        let values = value.into().normalize()?;
        let lower = name.to_ascii_lowercase();

        match self.index.get(&lower) {
            Some(&position) => {
                self.entries[position] = HeaderEntry { name, values };
            }
            None => {
                self.index.insert(lower, self.entries.len());
                self.entries.push(HeaderEntry { name, values });
            }
        }

        Ok(())
    }

    /// Concatenates values onto an existing same-name header, preserving the
    /// stored casing and value order; behaves like [`HeaderMap::set`] when
    /// the name is absent.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Result<()> {
        let name = name.into();
        let values = value.into().normalize()?;
        let lower = name.to_ascii_lowercase();

        match self.index.get(&lower) {
            Some(&position) => {
                self.entries[position].values.extend(values);
            }
            None => {
                self.index.insert(lower, self.entries.len());
                self.entries.push(HeaderEntry { name, values });
            }
        }

        Ok(())
    }

    /// Deletes by case-insensitive match; absence is not an error.
    pub fn remove(&mut self, name: &str) {
        if let Some(position) = self.index.remove(&name.to_ascii_lowercase()) {
            self.entries.remove(position);
            for slot in self.index.values_mut() {
                if *slot > position {
                    *slot -= 1;
                }
            }
        }
    }

    /// Replaces any case-insensitive match and puts the entry at the front
    /// of the iteration order. Used to keep a synthesized `Host` header
    /// first.
    pub(crate) fn insert_first(&mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Result<()> {
        let name = name.into();
        let values = value.into().normalize()?;

        self.remove(&name);
        self.entries.insert(0, HeaderEntry { name, values });

        self.index.clear();
        for (position, entry) in self.entries.iter().enumerate() {
            self.index.insert(entry.name.to_ascii_lowercase(), position);
        }

        Ok(())
    }

    /// Iterate entries in insertion order, names in their stored casing.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|entry| (entry.name.as_str(), entry.values.as_slice()))
    }
}
