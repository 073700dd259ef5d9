//! Signing string construction.
//!
//! One line per signed header, in the order the authorization lists them,
//! joined by `\n` with no trailing newline:
//!
//! ```text
//! (request-target): get /content/dam?x=1
//! date: Sun, 06 Nov 1994 08:49:37 GMT
//! ```
//!
//! Byte-exact agreement with the signer is required, so values are never
//! trimmed, re-folded or re-encoded; the string is built as raw bytes.

use crate::error::AuthError;
use crate::request::RequestContent;

/// Pseudo-header covering the lower-cased method and the request target.
pub const REQUEST_TARGET: &str = "(request-target)";
/// Legacy pseudo-header covering the full request line.
pub const REQUEST_LINE: &str = "request-line";

/// Build the signing string for `headers` over `content`.
///
/// # Errors
/// Returns [`AuthError::MissingHeader`] for the first listed header absent
/// from the request.
pub fn build_signing_string<S: AsRef<str>>(content: &RequestContent, headers: &[S]) -> Result<Vec<u8>, AuthError> {
    let mut out = Vec::new();
    for (i, name) in headers.iter().enumerate() {
        if i > 0 {
            out.push(b'\n');
        }
        let name = name.as_ref().to_ascii_lowercase();
        match name.as_str() {
            REQUEST_TARGET => out.extend_from_slice(
                format!(
                    "{REQUEST_TARGET}: {} {}",
                    content.method().to_ascii_lowercase(),
                    content.path()
                )
                .as_bytes(),
            ),
            REQUEST_LINE => out.extend_from_slice(
                format!(
                    "{REQUEST_LINE}: {} {} {}",
                    content.method().to_ascii_uppercase(),
                    content.path(),
                    content.protocol()
                )
                .as_bytes(),
            ),
            _ => {
                let value = content
                    .header(&name)
                    .ok_or_else(|| AuthError::MissingHeader(name.clone()))?;
                out.extend_from_slice(name.as_bytes());
                out.extend_from_slice(b": ");
                out.extend_from_slice(&value);
            }
        }
    }
    Ok(out)
}
