//! Lightweight HTML head scanner.
//!
//! Collects `<meta>` tags and the first `<title>` from a document without
//! building a DOM. Comments and the bodies of `<script>` and `<style>` are
//! skipped so markup inside them is never mistaken for real tags.

/// A `<meta>` tag with lowercased attribute names and decoded values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTag {
    attrs: Vec<(String, String)>,
}

impl MetaTag {
    /// Returns the value of the first attribute with the given (lowercase) name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// The metadata-bearing parts of an HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlHead {
    metas: Vec<MetaTag>,
    title: Option<String>,
}

impl HtmlHead {
    /// Scans `html` for meta tags and the document title.
    pub fn parse(html: &str) -> Self {
        // ASCII lowercasing keeps byte offsets identical to `html`.
        let lower = html.to_ascii_lowercase();
        let mut head = HtmlHead::default();
        let mut pos = 0;

        while let Some(rel) = lower[pos..].find('<') {
            let start = pos + rel;
            let rest = &lower[start..];

            if rest.starts_with("<!--") {
                match lower[start + 4..].find("-->") {
                    Some(end) => pos = start + 4 + end + 3,
                    None => break,
                }
            } else if opens_tag(rest, "meta") {
                let (attrs, end) = parse_attributes(html, start + "<meta".len());
                head.metas.push(MetaTag { attrs });
                pos = end;
            } else if opens_tag(rest, "title") {
                let (_, open_end) = parse_attributes(html, start + "<title".len());
                match lower[open_end..].find("</title") {
                    Some(close) => {
                        if head.title.is_none() {
                            let raw = &html[open_end..open_end + close];
                            head.title = Some(decode_entities(raw));
                        }
                        pos = open_end + close + "</title".len();
                    }
                    None => break,
                }
            } else if let Some(tag) = ["script", "style"].iter().find(|t| opens_tag(rest, t)) {
                let (_, open_end) = parse_attributes(html, start + 1 + tag.len());
                let close = format!("</{}", tag);
                match lower[open_end..].find(&close) {
                    Some(end) => pos = open_end + end + close.len(),
                    None => break,
                }
            } else {
                pos = start + 1;
            }

            if pos >= html.len() {
                break;
            }
        }

        head
    }

    /// First `<meta>` whose `attr` equals `value` (case-insensitive).
    pub fn find_meta(&self, attr: &str, value: &str) -> Option<&MetaTag> {
        self.metas.iter().find(|meta| {
            meta.attr(attr)
                .is_some_and(|v| v.trim().eq_ignore_ascii_case(value))
        })
    }

    /// Non-blank `content` of the first `meta[property=...]` tag.
    pub fn meta_property(&self, property: &str) -> Option<&str> {
        non_blank(self.find_meta("property", property)?.attr("content")?)
    }

    /// Non-blank `content` of the first `meta[name=...]` tag.
    pub fn meta_name(&self, name: &str) -> Option<&str> {
        non_blank(self.find_meta("name", name)?.attr("content")?)
    }

    /// Non-blank text of the first `<title>` element.
    pub fn title(&self) -> Option<&str> {
        non_blank(self.title.as_deref()?)
    }

    pub fn metas(&self) -> &[MetaTag] {
        &self.metas
    }
}

fn non_blank(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// True when `rest` (lowercased, starting at `<`) opens the element `name`.
fn opens_tag(rest: &str, name: &str) -> bool {
    let Some(after) = rest.strip_prefix('<').and_then(|r| r.strip_prefix(name)) else {
        return false;
    };
    matches!(
        after.bytes().next(),
        None | Some(b'>') | Some(b'/') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')
    )
}

/// Parses attributes from `from` up to the closing `>` of the tag.
///
/// Returns the attributes and the byte offset just past the `>` (or the end
/// of input for an unterminated tag).
fn parse_attributes(html: &str, from: usize) -> (Vec<(String, String)>, usize) {
    let bytes = html.as_bytes();
    let mut attrs = Vec::new();
    let mut i = from;

    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= bytes.len() {
            return (attrs, bytes.len());
        }
        if bytes[i] == b'>' {
            return (attrs, i + 1);
        }

        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let name = html[name_start..i].to_ascii_lowercase();
        if name.is_empty() {
            // Stray '=' with no name.
            i += 1;
            continue;
        }

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = String::new();
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                let value_start = i + 1;
                let value_end = bytes[value_start..]
                    .iter()
                    .position(|&b| b == quote)
                    .map(|p| value_start + p)
                    .unwrap_or(bytes.len());
                value = decode_entities(&html[value_start..value_end]);
                i = (value_end + 1).min(bytes.len());
            } else {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                value = decode_entities(&html[value_start..i]);
            }
        }

        attrs.push((name, value));
    }
}

/// Decodes the HTML character references that commonly appear in metadata.
///
/// Unknown or malformed references are left as written.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_reference(&tail[1..semi]).map(|ch| (ch, semi)));

        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(reference: &str) -> Option<char> {
    if let Some(num) = reference.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    match reference {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        "ndash" => Some('\u{2013}'),
        "mdash" => Some('\u{2014}'),
        "hellip" => Some('\u{2026}'),
        "rsquo" => Some('\u{2019}'),
        "lsquo" => Some('\u{2018}'),
        "rdquo" => Some('\u{201d}'),
        "ldquo" => Some('\u{201c}'),
        _ => None,
    }
}
