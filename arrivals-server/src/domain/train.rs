//! Train identity type.

use std::fmt;

/// A train identifier as reported by the upstream feeds.
///
/// Most lines report a numeric train number (e.g. "132"), but the feeds
/// disagree about zero padding: the same physical train appears as "044"
/// in one feed and "44" in another. `lookup_variants` produces the padded
/// and stripped spellings so indexes can match across feeds.
///
/// The driverless line family has no usable train numbering at all; its
/// records simply carry no `TrainId`.
///
/// # Examples
///
/// ```
/// use arrivals_server::domain::TrainId;
///
/// let id = TrainId::parse(" 044 ").unwrap();
/// assert_eq!(id.as_str(), "044");
/// assert!(id.lookup_variants().contains(&"44".to_string()));
///
/// // Empty or non-alphanumeric ids are not usable identities
/// assert!(TrainId::parse("  ").is_none());
/// assert!(TrainId::parse("1-2").is_none());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TrainId(String);

impl TrainId {
    /// Parse a train id from a raw feed value.
    ///
    /// The input is trimmed; it must be non-empty ASCII alphanumeric.
    /// Returns `None` for values that cannot serve as a train identity,
    /// matching how feeds omit the field for unnumbered trains.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        if s.is_empty() || s.len() > 8 {
            return None;
        }
        if !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }

        Some(TrainId(s.to_string()))
    }

    /// Returns the id as reported (trimmed).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// All spellings under which this id may appear in another feed.
    ///
    /// Always includes the id itself. For numeric ids it adds the 3-digit
    /// zero-padded form and the leading-zeros-stripped form, since
    /// upstreams are inconsistent about padding.
    pub fn lookup_variants(&self) -> Vec<String> {
        let mut variants = vec![self.0.clone()];

        if self.0.bytes().all(|b| b.is_ascii_digit()) {
            let padded = format!("{:0>3}", self.0);
            let stripped = {
                let s = self.0.trim_start_matches('0');
                if s.is_empty() { "0" } else { s }.to_string()
            };
            for v in [padded, stripped] {
                if !variants.contains(&v) {
                    variants.push(v);
                }
            }
        }

        variants
    }
}

impl fmt::Debug for TrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrainId({})", self.0)
    }
}

impl fmt::Display for TrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for TrainId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Numeric ids that differ only in leading zeros share a variant
        #[test]
        fn padding_styles_intersect(n in 1u32..1000) {
            let short = TrainId::parse(&n.to_string()).unwrap();
            let padded = TrainId::parse(&format!("{:03}", n)).unwrap();

            let a = short.lookup_variants();
            let b = padded.lookup_variants();
            prop_assert!(a.iter().any(|v| b.contains(v)));
        }

        /// The reported spelling is always the first variant
        #[test]
        fn own_spelling_first(s in "[0-9]{1,5}") {
            let id = TrainId::parse(&s).unwrap();
            prop_assert_eq!(&id.lookup_variants()[0], id.as_str());
        }

        /// Whitespace around an id never changes identity
        #[test]
        fn trim_invariant(s in "[0-9A-Za-z]{1,6}") {
            let bare = TrainId::parse(&s).unwrap();
            let spaced = TrainId::parse(&format!("  {}  ", s)).unwrap();
            prop_assert_eq!(bare, spaced);
        }
    }
}
