use crate::util::parse_cstring;
use crate::{Error, Result};

/// Decodes a Shift-JIS byte string the way the original viewer does: invalid
/// sequences are replaced rather than rejected, the decoded full-width space
/// (`U+3000`) is folded down to an ordinary ASCII space, and the result is
/// truncated at the first embedded NUL.
pub fn decode_sjis(input: &[u8]) -> String {
    let (decoded, _, _) = encoding_rs::SHIFT_JIS.decode(input);
    let folded = decoded.replace('\u{3000}', " ");
    parse_cstring(folded.as_bytes())
}

/// Strict counterpart of [`decode_sjis`]: fails with [`Error::Decode`] instead
/// of substituting `U+FFFD` when the input contains a malformed sequence.
pub fn decode_sjis_strict(input: &[u8]) -> Result<String> {
    let (decoded, _, had_errors) = encoding_rs::SHIFT_JIS.decode(input);
    if had_errors {
        return Err(Error::Decode(
            "invalid Shift-JIS sequence in icon.sys field".to_string(),
        ));
    }
    let folded = decoded.replace('\u{3000}', " ");
    Ok(parse_cstring(folded.as_bytes()))
}
