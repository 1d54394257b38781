/// Host-supplied, ordered multimap of lower-cased header name to value (§6).
///
/// The core treats this purely as a read contract: it never retains a
/// borrow of a `&dyn HeaderMap` past the call that handed it one, since the
/// host's own contract says the same of the concrete type backing it.
pub trait HeaderMap {
    /// Returns the first value associated with `name`, if any. `name` is
    /// expected to already be lower-cased by the caller (the core never
    /// performs its own case-folding, matching the host's contract that
    /// keys are already lower-cased).
    fn get(&self, name: &str) -> Option<&str>;

    /// Iterates every `(name, value)` pair in the map's insertion order.
    fn iter(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_>;
}

/// A simple, allocation-backed `HeaderMap` used to carry decoded header data
/// out of the `EntryReader` to a `DownstreamCallback`, and as the reference
/// implementation exercised by this crate's own tests and `demos/`.
///
/// This is *not* the host's header map type (that type is out of scope per
/// §1) — it is what the core hands back across the `DownstreamCallback`
/// boundary once it has decoded bytes out of a `StreamingEntry`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedHeaderMap {
    entries: Vec<(String, String)>,
}

impl OwnedHeaderMap {
    /// Creates an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a `(name, value)` pair, preserving insertion order.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Number of entries in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HeaderMap for OwnedHeaderMap {
    fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        Box::new(self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}
