//! Cursor encoding: a cursor is the base64 of the decimal string of a
//! zero-based item index.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

#[derive(Clone, Debug, thiserror::Error)]
#[error("InvalidCursor: {0}")]
pub struct InvalidCursor(pub String);

pub fn encode(offset: i64) -> String {
    BASE64.encode(offset.to_string())
}

/// `decode("")` and `decode(None)` both yield `Ok(None)`; any other
/// malformed input is `InvalidCursor`.
pub fn decode(cursor: Option<&str>) -> Result<Option<i64>, InvalidCursor> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };
    if cursor.is_empty() {
        return Ok(None);
    }
    let decoded = BASE64
        .decode(cursor)
        .map_err(|_| InvalidCursor(format!("'{cursor}' is not valid base64")))?;
    let text = String::from_utf8(decoded).map_err(|_| InvalidCursor(format!("'{cursor}' is not valid utf-8")))?;
    let offset: i64 = text
        .parse()
        .map_err(|_| InvalidCursor(format!("'{cursor}' does not decode to an integer offset")))?;
    Ok(Some(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        assert_eq!(decode(Some(&encode(0))).unwrap(), Some(0));
        assert_eq!(decode(Some(&encode(41))).unwrap(), Some(41));
    }

    #[test]
    fn empty_and_absent_are_null() {
        assert_eq!(decode(Some("")).unwrap(), None);
        assert_eq!(decode(None).unwrap(), None);
    }

    #[test]
    fn malformed_is_rejected() {
        assert!(decode(Some("not-base64!!")).is_err());
    }
}
