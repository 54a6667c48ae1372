//! Station name normalization.
//!
//! The feeds spell the same station several ways: the variant character
//! 臺 and 台 are interchangeable, some variants append the 站 suffix, and
//! whitespace (ASCII or full-width) appears unpredictably. Two raw names
//! refer to the same station iff their normalized forms are identical.

/// Normalize a raw station (or destination) name to its lookup key.
///
/// Folds 臺 to 台, removes all whitespace, and strips one trailing 站
/// glyph. Applied to both the reference table and incoming feed values,
/// so equality on the output is the identity test.
pub fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());

    for c in raw.chars() {
        if c.is_whitespace() {
            continue;
        }
        out.push(if c == '臺' { '台' } else { c });
    }

    if let Some(stripped) = out.strip_suffix('站') {
        out.truncate(stripped.len());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_character_folds() {
        assert_eq!(normalize_name("臺北車站"), normalize_name("台北車站"));
        assert_eq!(normalize_name("臺大醫院"), "台大醫院");
    }

    #[test]
    fn trailing_suffix_stripped() {
        assert_eq!(normalize_name("大安站"), "大安");
        assert_eq!(normalize_name("大安"), "大安");
    }

    #[test]
    fn suffix_stripped_once_only() {
        // 台北車站's own name ends in 站; one strip keeps both spellings equal
        assert_eq!(normalize_name("台北車站"), "台北車");
        assert_eq!(normalize_name("臺北車站"), "台北車");
    }

    #[test]
    fn whitespace_removed() {
        assert_eq!(normalize_name(" 大安 "), "大安");
        assert_eq!(normalize_name("大　安"), "大安");
        assert_eq!(normalize_name("大\t安"), "大安");
    }

    #[test]
    fn combined_variants_collapse() {
        assert_eq!(normalize_name(" 臺北車站 "), normalize_name("台北車站"));
        assert_eq!(normalize_name("動物園站"), normalize_name("動物園"));
    }

    #[test]
    fn empty_input() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("   "), "");
    }
}
