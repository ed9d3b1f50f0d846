use v_htmlescape::escape;

/// Escape HTML following [OWASP](https://www.owasp.org/index.php/XSS_(Cross_Site_Scripting)_Prevention_Cheat_Sheet)
///
/// Escape the characters significant in XML (&, <, >, ", ') plus the forward
/// slash with HTML entity encoding, to prevent untrusted values from
/// switching into any execution context such as script, style, or event
/// handlers.
#[inline]
pub fn escape_html(input: &str) -> String {
    escape(input).to_string()
}
