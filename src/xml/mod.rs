//! XML utilities: offset-annotated parsing and OOXML attribute helpers

mod namespace;
pub mod span;

pub use namespace::*;
pub use span::Element;

/// Helper to get w:val attribute (common in OOXML)
pub fn get_w_val(element: &Element) -> Option<&str> {
    element.attr("w:val").or_else(|| element.attr_local("val"))
}

/// Parse a boolean toggle from OOXML (handles "1", "true", "on", or missing val)
pub fn parse_bool(element: &Element) -> bool {
    match get_w_val(element) {
        None => true, // No val attribute means true (e.g., <w:b/>)
        Some(v) => matches!(v, "1" | "true" | "on"),
    }
}

/// Check whether `c` may appear in an XML 1.0 document
pub fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\u{9}'
            | '\u{A}'
            | '\u{D}'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}
