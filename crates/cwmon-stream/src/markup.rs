//! The server renders log lines as HTML (ANSI colors become `<span>`s).
//! Both the display and the event parser need the plain text back.

/// Remove HTML tags and decode the handful of entities the server emits.
pub fn strip_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    if in_tag {
        // unterminated '<' was a literal
        return decode_entities(line);
    }
    decode_entities(&out)
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("<b>bold</b> &amp; <i>it</i>"), "bold & it");
        assert_eq!(strip_markup("a < b"), "a < b");
        assert_eq!(strip_markup("x &lt;tag&gt;"), "x <tag>");
    }

    #[test]
    fn test_colored_json_line() {
        let line = r#"<span class="ansi-green">{&quot;event&quot;:&quot;run:done&quot;}</span>"#;
        assert_eq!(strip_markup(line), r#"{"event":"run:done"}"#);
    }
}
