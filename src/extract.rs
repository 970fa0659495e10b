//! Code extraction from model output
//!
//! Models are asked to reply with a single fenced HCL block, but real replies
//! range from perfectly fenced to fence-less raw code to fences mangled by
//! non-breaking spaces. Extraction is best-effort and never fails: the worst
//! case is an empty result the caller must treat as "no usable output".

use regex::Regex;
use std::sync::OnceLock;

/// Outcome of pulling source code out of a free-form model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Body of the first fenced block in the reply.
    Fenced(String),
    /// No fence markers at all; the trimmed reply taken as-is.
    Raw(String),
    /// No complete fence, but dangling fence markers were stripped off.
    /// Callers should surface a "non-fenced output" warning.
    Stripped(String),
    /// The reply was empty; there is nothing to use.
    Empty,
}

impl Extraction {
    /// The extracted payload, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Extraction::Fenced(c) | Extraction::Raw(c) | Extraction::Stripped(c) => Some(c),
            Extraction::Empty => None,
        }
    }

    /// True when the payload was recovered without a well-formed fence and
    /// the user should be told the raw output is being used.
    pub fn wants_warning(&self) -> bool {
        matches!(self, Extraction::Stripped(_))
    }
}

/// Compile a literal pattern, falling back to a never-matching regex so
/// extraction stays total.
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|_| Regex::new("$^").unwrap())
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // First fenced block wins; the lazy body match stops at the first
    // closing fence, which is correct for well-formed single-block output.
    // The optional single spaces absorb what normalize_whitespace leaves
    // behind for NBSP-mangled fence lines.
    RE.get_or_init(|| compile(r"(?s)``` ?[a-zA-Z]* ?\n(.*?)\n```"))
}

fn leading_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"^``` ?[a-zA-Z]*\s*"))
}

fn trailing_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"```\s*$"))
}

/// Collapse runs of non-newline/tab whitespace (including NBSP variants some
/// models emit around fence markers) into a single ASCII space.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c != '\n' && c != '\t' && c.is_whitespace() {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Extract the source-code payload from a model reply.
///
/// Honors only the first fenced block. Without a complete fence the whole
/// trimmed reply is used, minus any dangling fence-like prefix/suffix lines.
pub fn extract_code(raw: &str) -> Extraction {
    if raw.trim().is_empty() {
        return Extraction::Empty;
    }

    let normalized = normalize_whitespace(raw);
    if let Some(caps) = fence_re().captures(&normalized) {
        return Extraction::Fenced(caps[1].trim().to_string());
    }

    let trimmed = normalized.trim();
    let stripped = leading_fence_re().replace(trimmed, "");
    let stripped = trailing_fence_re().replace(&stripped, "");
    let stripped = stripped.trim();

    if stripped == trimmed {
        Extraction::Raw(trimmed.to_string())
    } else {
        Extraction::Stripped(stripped.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block_with_language_tag() {
        let raw = "Here you go:\n```hcl\nresource \"aws_s3_bucket\" \"b\" {}\n```\nEnjoy!";
        assert_eq!(
            extract_code(raw),
            Extraction::Fenced("resource \"aws_s3_bucket\" \"b\" {}".to_string())
        );
    }

    #[test]
    fn test_fenced_block_without_language_tag() {
        let raw = "```\nprovider \"aws\" {}\n```";
        assert_eq!(
            extract_code(raw),
            Extraction::Fenced("provider \"aws\" {}".to_string())
        );
    }

    #[test]
    fn test_body_is_trimmed() {
        let raw = "```terraform\n  variable \"name\" {}  \n```";
        assert_eq!(
            extract_code(raw),
            Extraction::Fenced("variable \"name\" {}".to_string())
        );
    }

    #[test]
    fn test_first_of_multiple_blocks_wins() {
        let raw = "```hcl\nfirst {}\n```\ntext\n```hcl\nsecond {}\n```";
        assert_eq!(extract_code(raw), Extraction::Fenced("first {}".to_string()));
    }

    #[test]
    fn test_non_breaking_space_in_fence_line() {
        // U+00A0 between the backticks and the language tag, as some models emit
        let raw = "```\u{A0}hcl\n resource \"x\" {}\n```";
        assert_eq!(
            extract_code(raw),
            Extraction::Fenced("resource \"x\" {}".to_string())
        );
    }

    #[test]
    fn test_narrow_nbsp_variants_normalized() {
        let raw = "```hcl\u{202F}\nresource \"y\" {}\n```";
        assert_eq!(
            extract_code(raw),
            Extraction::Fenced("resource \"y\" {}".to_string())
        );
    }

    #[test]
    fn test_no_fence_returns_raw_unchanged() {
        let raw = "  resource \"aws_instance\" \"web\" {}  ";
        let got = extract_code(raw);
        assert_eq!(
            got,
            Extraction::Raw("resource \"aws_instance\" \"web\" {}".to_string())
        );
        assert!(!got.wants_warning());
    }

    #[test]
    fn test_dangling_leading_fence_stripped_with_warning() {
        let raw = "```hcl\nresource \"a\" \"b\" {}";
        let got = extract_code(raw);
        assert_eq!(got, Extraction::Stripped("resource \"a\" \"b\" {}".to_string()));
        assert!(got.wants_warning());
    }

    #[test]
    fn test_dangling_trailing_fence_stripped() {
        let raw = "resource \"a\" \"b\" {}\n```";
        assert_eq!(
            extract_code(raw),
            Extraction::Stripped("resource \"a\" \"b\" {}".to_string())
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(extract_code(""), Extraction::Empty);
        assert_eq!(extract_code("   \n "), Extraction::Empty);
        assert_eq!(extract_code("").code(), None);
    }

    #[test]
    fn test_multiline_body_preserved() {
        let raw = "```hcl\nresource \"a\" \"b\" {\n\tname = \"x\"\n}\n```";
        assert_eq!(
            extract_code(raw),
            Extraction::Fenced("resource \"a\" \"b\" {\n\tname = \"x\"\n}".to_string())
        );
    }

    #[test]
    fn test_indentation_runs_collapse_to_one_space() {
        // whitespace normalization runs before matching, so space runs in
        // the body come out single-width (tabs survive untouched)
        let raw = "```hcl\na {\n    b = 1\n}\n```";
        assert_eq!(
            extract_code(raw),
            Extraction::Fenced("a {\n b = 1\n}".to_string())
        );
    }
}
