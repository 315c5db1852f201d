use super::SanitizeError;

/// Upper bound on decode passes for multiply-encoded payloads.
const MAX_UNESCAPE_PASSES: usize = 4;

/// Decode HTML character references until the text stops changing.
///
/// The API double-encodes some bodies (`&amp;lt;b&amp;gt;`), so a single
/// pass would leave escaped markup behind instead of real tags. Named
/// references that `html-escape` does not know are left as literal text.
///
/// # Errors
///
/// [`SanitizeError::InvalidEntity`] when a terminated numeric reference
/// names NUL, a surrogate, or a value beyond U+10FFFF.
pub(crate) fn unescape(raw: &str) -> Result<String, SanitizeError> {
    let mut current = raw.to_string();

    for _ in 0..MAX_UNESCAPE_PASSES {
        check_numeric_references(&current)?;
        let decoded = html_escape::decode_html_entities(&current).into_owned();
        if decoded == current {
            break;
        }
        current = decoded;
    }

    Ok(current)
}

/// Reject numeric references that cannot name a character.
///
/// Unterminated or digit-less references (`&#;`, `&#12 `) are plain text
/// and pass through untouched.
fn check_numeric_references(text: &str) -> Result<(), SanitizeError> {
    let mut rest = text;

    while let Some(start) = rest.find("&#") {
        let after = &rest[start + 2..];
        let (digits, radix) = match after.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16),
            None => (after, 10),
        };

        let len = digits
            .bytes()
            .take_while(|b| if radix == 16 { b.is_ascii_hexdigit() } else { b.is_ascii_digit() })
            .count();

        if len > 0 && digits.as_bytes().get(len) == Some(&b';') {
            let valid = u32::from_str_radix(&digits[..len], radix)
                .ok()
                .filter(|&cp| cp != 0)
                .and_then(char::from_u32)
                .is_some();
            if !valid {
                return Err(SanitizeError::InvalidEntity(format!(
                    "&#{}{};",
                    if radix == 16 { "x" } else { "" },
                    &digits[..len]
                )));
            }
        }

        rest = after;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_and_numeric() {
        assert_eq!(
            unescape("a &amp; b &#x2F; c &#39;d&#39; &quot;e&quot;").unwrap(),
            "a & b / c 'd' \"e\""
        );
    }

    #[test]
    fn test_double_encoded_reaches_markup() {
        assert_eq!(
            unescape("&amp;lt;b&amp;gt;hi&amp;lt;/b&amp;gt;").unwrap(),
            "<b>hi</b>"
        );
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(unescape("nothing to see").unwrap(), "nothing to see");
    }

    #[test]
    fn test_unknown_named_reference_is_literal() {
        assert_eq!(unescape("&zzqq; ok").unwrap(), "&zzqq; ok");
    }

    #[test]
    fn test_surrogate_reference_rejected() {
        assert!(matches!(
            unescape("bad &#xD800; ref"),
            Err(SanitizeError::InvalidEntity(_))
        ));
    }

    #[test]
    fn test_out_of_range_reference_rejected() {
        assert!(unescape("&#1114112;").is_err());
        assert!(unescape("&#99999999999999999999;").is_err());
    }

    #[test]
    fn test_nul_reference_rejected() {
        assert!(unescape("&#0;").is_err());
    }

    #[test]
    fn test_unterminated_numeric_reference_is_text() {
        assert!(unescape("ticket &#12 is open").is_ok());
        assert!(unescape("&#; &#x;").is_ok());
    }

    #[test]
    fn test_bounded_passes() {
        // Five levels of encoding; only four are peeled off
        let raw = "&amp;amp;amp;amp;amp;";
        assert_eq!(unescape(raw).unwrap(), "&amp;");
    }
}
