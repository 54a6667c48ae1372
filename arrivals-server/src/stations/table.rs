//! Canonical station reference table.

use std::collections::HashMap;

use crate::domain::StationCode;

use super::data::NETWORK;
use super::names::normalize_name;

/// One station on one line. Never mutated after table construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalStation {
    pub code: StationCode,
    /// Display name as published, suffix and all.
    pub name: String,
    /// Line identifier, the code's prefix (e.g. "BL").
    pub line: String,
}

/// Immutable lookup table over the network's stations.
///
/// Indexes by code and by normalized name. Transfer stations share a
/// normalized name across lines, so name lookup takes an optional line
/// hint to pick the right platform's entry.
#[derive(Debug)]
pub struct StationTable {
    stations: Vec<CanonicalStation>,
    by_code: HashMap<StationCode, usize>,
    by_name: HashMap<String, Vec<usize>>,
}

impl StationTable {
    /// Build a table from (code, name) pairs.
    ///
    /// Entries whose code fails validation are skipped; the embedded
    /// network data is covered by tests, so this only drops records when
    /// callers supply their own entries.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut stations = Vec::new();
        let mut by_code = HashMap::new();
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();

        for (code_raw, name) in entries {
            let Ok(code) = StationCode::parse(code_raw) else {
                continue;
            };

            let idx = stations.len();
            stations.push(CanonicalStation {
                code,
                name: name.to_string(),
                line: code.line_prefix().to_string(),
            });
            by_code.insert(code, idx);
            by_name.entry(normalize_name(name)).or_default().push(idx);
        }

        Self {
            stations,
            by_code,
            by_name,
        }
    }

    /// The embedded production network.
    pub fn network() -> Self {
        Self::from_entries(NETWORK.iter().copied())
    }

    /// Look up by exact station code.
    pub fn by_code(&self, code: StationCode) -> Option<&CanonicalStation> {
        self.by_code.get(&code).map(|&i| &self.stations[i])
    }

    /// Look up by raw station name.
    ///
    /// The name is normalized first. When the name is served by several
    /// lines, a line hint (line id, case-insensitive) selects among them;
    /// without a hint the first registered entry wins.
    pub fn by_name(&self, raw_name: &str, line_hint: Option<&str>) -> Option<&CanonicalStation> {
        let candidates = self.by_name.get(&normalize_name(raw_name))?;

        if let Some(hint) = line_hint {
            for &i in candidates {
                if self.stations[i].line.eq_ignore_ascii_case(hint.trim()) {
                    return Some(&self.stations[i]);
                }
            }
        }

        candidates.first().map(|&i| &self.stations[i])
    }

    /// Resolve a raw identifier that may be either a code or a name.
    ///
    /// Feeds disagree here: some send "R05", some send "大安站". A value
    /// that parses as a code and is present in the table wins; everything
    /// else goes through name lookup.
    pub fn resolve(&self, raw: &str, line_hint: Option<&str>) -> Option<&CanonicalStation> {
        if let Ok(code) = StationCode::parse(raw) {
            if let Some(station) = self.by_code(code) {
                return Some(station);
            }
        }
        self.by_name(raw, line_hint)
    }

    /// Number of (station, line) entries.
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// True when the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Iterate all entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CanonicalStation> {
        self.stations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> StationTable {
        StationTable::network()
    }

    #[test]
    fn lookup_by_code() {
        let t = table();
        let station = t.by_code(StationCode::parse("BL12").unwrap()).unwrap();
        assert_eq!(station.name, "台北車站");
        assert_eq!(station.line, "BL");
    }

    #[test]
    fn lookup_by_exact_name() {
        let t = table();
        let station = t.by_name("大安", Some("BR")).unwrap();
        assert_eq!(station.code, StationCode::parse("BR09").unwrap());
    }

    #[test]
    fn lookup_by_variant_name() {
        let t = table();
        // Script variant plus suffix plus whitespace all resolve
        assert!(t.by_name("臺北車站", None).is_some());
        assert!(t.by_name(" 大安站 ", Some("R")).is_some());
    }

    #[test]
    fn line_hint_selects_transfer_platform() {
        let t = table();
        let red = t.by_name("台北車站", Some("R")).unwrap();
        let blue = t.by_name("台北車站", Some("BL")).unwrap();
        assert_eq!(red.code, StationCode::parse("R10").unwrap());
        assert_eq!(blue.code, StationCode::parse("BL12").unwrap());
    }

    #[test]
    fn missing_hint_still_resolves() {
        let t = table();
        assert!(t.by_name("台北車站", None).is_some());
        // Hint for a line that doesn't serve the station falls back
        assert!(t.by_name("象山", Some("BL")).is_some());
    }

    #[test]
    fn resolve_accepts_code_or_name() {
        let t = table();
        assert_eq!(
            t.resolve("br09", None).unwrap().code,
            StationCode::parse("BR09").unwrap()
        );
        assert_eq!(
            t.resolve("大安", Some("BR")).unwrap().code,
            StationCode::parse("BR09").unwrap()
        );
    }

    #[test]
    fn unknown_inputs_resolve_to_none() {
        let t = table();
        assert!(t.by_name("不存在的站", None).is_none());
        assert!(t.by_code(StationCode::parse("ZZ99").unwrap()).is_none());
        assert!(t.resolve("ZZ99", None).is_none());
    }

    #[test]
    fn from_entries_skips_invalid_codes() {
        let t = StationTable::from_entries([("BL12", "台北車站"), ("bogus!", "壞站")]);
        assert_eq!(t.len(), 1);
    }
}
