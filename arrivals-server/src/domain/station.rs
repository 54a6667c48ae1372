//! Station code types.

use std::fmt;

/// Error returned when parsing an invalid station code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station code: {reason}")]
pub struct InvalidStationCode {
    reason: &'static str,
}

/// A valid metro station code: a line prefix of 1-2 uppercase letters
/// followed by a 1-2 digit ordinal (e.g. `R10`, `BL12`, `BR09`).
///
/// Codes arriving from upstream feeds are uppercased before validation,
/// since some feeds send them lowercase. This type guarantees that any
/// `StationCode` value is valid by construction.
///
/// # Examples
///
/// ```
/// use arrivals_server::domain::StationCode;
///
/// let main_station = StationCode::parse("BL12").unwrap();
/// assert_eq!(main_station.as_str(), "BL12");
/// assert_eq!(main_station.line_prefix(), "BL");
///
/// // Lowercase input is normalized
/// assert_eq!(StationCode::parse("bl12").unwrap(), main_station);
///
/// // Missing ordinal is rejected
/// assert!(StationCode::parse("BL").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationCode {
    bytes: [u8; 4],
    len: u8,
}

impl StationCode {
    /// Parse a station code from a string.
    ///
    /// The input is trimmed and uppercased, then must match: 1-2 ASCII
    /// letters followed by 1-2 ASCII digits.
    pub fn parse(s: &str) -> Result<Self, InvalidStationCode> {
        let s = s.trim();

        if s.is_empty() {
            return Err(InvalidStationCode {
                reason: "empty string",
            });
        }
        if s.len() > 4 || !s.is_ascii() {
            return Err(InvalidStationCode {
                reason: "must be 2-4 ASCII characters",
            });
        }

        let mut bytes = [0u8; 4];
        let mut letters = 0;
        let mut digits = 0;

        for (i, &b) in s.as_bytes().iter().enumerate() {
            let b = b.to_ascii_uppercase();
            if b.is_ascii_uppercase() {
                // Letters must all come before the first digit
                if digits > 0 {
                    return Err(InvalidStationCode {
                        reason: "letters after digits",
                    });
                }
                letters += 1;
            } else if b.is_ascii_digit() {
                digits += 1;
            } else {
                return Err(InvalidStationCode {
                    reason: "must contain only letters and digits",
                });
            }
            bytes[i] = b;
        }

        if !(1..=2).contains(&letters) {
            return Err(InvalidStationCode {
                reason: "line prefix must be 1-2 letters",
            });
        }
        if !(1..=2).contains(&digits) {
            return Err(InvalidStationCode {
                reason: "ordinal must be 1-2 digits",
            });
        }

        Ok(StationCode {
            bytes,
            len: s.len() as u8,
        })
    }

    /// Returns the station code as a string slice.
    pub fn as_str(&self) -> &str {
        // SAFETY: We only store valid ASCII
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap()
    }

    /// Returns the line prefix (the leading letters), e.g. `"BL"` for `BL12`.
    pub fn line_prefix(&self) -> &str {
        let s = self.as_str();
        let end = s
            .bytes()
            .position(|b| b.is_ascii_digit())
            .unwrap_or(s.len());
        &s[..end]
    }
}

impl fmt::Debug for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationCode({})", self.as_str())
    }
}

impl fmt::Display for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for StationCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
