//! Prompt text sanitization
//!
//! The chat API transport has historically choked on multi-byte characters
//! pasted in from rich-text editors, so everything headed for the wire is
//! reduced to ASCII at this boundary.

/// Replace typographic punctuation with its ASCII equivalent and drop any
/// remaining non-ASCII character.
///
/// Total over all inputs: never fails, empty in means empty out, and the
/// result is stable under re-application.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{2014}' => out.push_str("--"),
            '\u{2013}' => out.push('-'),
            c if c.is_ascii() => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smart_quotes_and_dashes() {
        assert_eq!(sanitize("\u{201C}a\u{201D} \u{2014} b\u{2019}s"), "\"a\" -- b's");
        assert_eq!(sanitize("range \u{2013} end"), "range - end");
    }

    #[test]
    fn test_drops_remaining_non_ascii() {
        let out = sanitize("caf\u{E9} \u{2601} bucket");
        assert!(out.is_ascii());
        assert_eq!(out, "caf  bucket");
    }

    #[test]
    fn test_ascii_passthrough() {
        let input = "resource \"aws_s3_bucket\" \"logs\" {}";
        assert_eq!(sanitize(input), input);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "\u{201C}quoted\u{201D}",
            "em\u{2014}dash",
            "plain ascii",
            "mixed \u{2018}x\u{2019} \u{30C6}\u{30B9}\u{30C8}",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {:?}", input);
        }
    }
}
