//! Dump parser: accessibility markup to [`Hierarchy`].
//!
//! The accepted grammar is the subset of XML that UI dump tools emit:
//!
//! ```text
//! <?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
//! <hierarchy rotation="0">
//!   <node index="0" text="" class="android.widget.FrameLayout" bounds="[0,0][1080,2400]" ...>
//!     <node ... />
//!   </node>
//! </hierarchy>
//! ```
//!
//! The `<hierarchy>` wrapper becomes the depth-0 root node. Comments and
//! whitespace are skipped; everything else outside that grammar is an error.

use std::borrow::Cow;

use smallvec::SmallVec;
use tracing::{debug, debug_span, trace};

use crate::error::{ParseError, fragment_at};
use crate::hierarchy::{Hierarchy, HierarchyBuilder, SlotId};
use crate::node::{Bounds, NodeData};

const ROOT_ELEMENT: &str = "hierarchy";
const NODE_ELEMENT: &str = "node";

/// Parses a UI dump into an immutable hierarchy.
///
/// Missing attributes default to empty strings, `false` and the zero
/// rectangle. Structural damage, unparsable booleans or bounds, and empty
/// input fail the whole parse.
pub fn parse(text: &str) -> Result<Hierarchy, ParseError> {
    let _span = debug_span!("parse_dump", bytes = text.len()).entered();
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut scanner = Scanner::new(text);
    scanner.skip_misc()?;
    if scanner.at_end() {
        return Err(ParseError::MissingRoot { fragment: None });
    }
    if scanner.peek() != Some(b'<') || scanner.peek_at(1) == Some(b'/') {
        return Err(ParseError::MissingRoot {
            fragment: Some(fragment_at(text, scanner.pos)),
        });
    }

    let root_offset = scanner.pos;
    let root_tag = scanner.read_start_tag()?;
    if root_tag.name != ROOT_ELEMENT {
        return Err(ParseError::MissingRoot {
            fragment: Some(fragment_at(text, root_offset)),
        });
    }

    // Rough estimate: one node per ~150 bytes of dump.
    let mut builder = HierarchyBuilder::with_capacity(NodeData::default(), text.len() / 150);
    if !root_tag.self_closing {
        parse_children(&mut scanner, &mut builder, root_offset)?;
    }

    scanner.skip_misc()?;
    if !scanner.at_end() {
        return Err(scanner.malformed("trailing content after the root element"));
    }

    let hierarchy = builder.build();
    debug!(nodes = hierarchy.len(), "dump parsed");
    Ok(hierarchy)
}

/// Reads everything between `<hierarchy>` and `</hierarchy>`.
fn parse_children(
    scanner: &mut Scanner<'_>,
    builder: &mut HierarchyBuilder,
    root_offset: usize,
) -> Result<(), ParseError> {
    // Open elements as (slot, element name, start offset).
    let mut open: Vec<(SlotId, &str, usize)> = vec![(builder.root(), ROOT_ELEMENT, root_offset)];

    while let Some(&(parent, parent_name, parent_offset)) = open.last() {
        scanner.skip_whitespace_and_comments()?;
        if scanner.at_end() {
            return Err(ParseError::Unterminated {
                name: parent_name.to_string(),
                offset: parent_offset,
            });
        }
        if scanner.peek() != Some(b'<') {
            return Err(scanner.malformed("unexpected text content"));
        }

        let offset = scanner.pos;
        if scanner.peek_at(1) == Some(b'/') {
            let name = scanner.read_end_tag()?;
            if name != parent_name {
                return Err(ParseError::MismatchedClose {
                    expected: parent_name.to_string(),
                    found: name.to_string(),
                    offset,
                });
            }
            open.pop();
            continue;
        }

        let tag = scanner.read_start_tag()?;
        if tag.name != NODE_ELEMENT {
            return Err(ParseError::UnexpectedElement {
                name: tag.name.to_string(),
                offset,
            });
        }
        let data = node_data(&tag)?;
        let slot = builder.attach(parent, data);
        if !tag.self_closing {
            open.push((slot, NODE_ELEMENT, offset));
        }
    }
    Ok(())
}

/// Maps the attributes of one `<node>` onto a typed record.
fn node_data(tag: &Tag<'_>) -> Result<NodeData, ParseError> {
    let mut data = NodeData::default();
    for attr in &tag.attrs {
        let value = attr.value.as_ref();
        match attr.name {
            "text" => data.attrs.text = attr.value.clone().into_owned(),
            "content-desc" => data.attrs.content_desc = attr.value.clone().into_owned(),
            "class" => data.attrs.class_name = attr.value.clone().into_owned(),
            "package" => data.attrs.package_name = attr.value.clone().into_owned(),
            "resource-id" => data.attrs.resource_id = attr.value.clone().into_owned(),
            "checkable" => data.flags.checkable = parse_bool(attr)?,
            "checked" => data.flags.checked = parse_bool(attr)?,
            "clickable" => data.flags.clickable = parse_bool(attr)?,
            "enabled" => data.flags.enabled = parse_bool(attr)?,
            "focusable" => data.flags.focusable = parse_bool(attr)?,
            "focused" => data.flags.focused = parse_bool(attr)?,
            "scrollable" => data.flags.scrollable = parse_bool(attr)?,
            "long-clickable" => data.flags.long_clickable = parse_bool(attr)?,
            "password" => data.flags.password = parse_bool(attr)?,
            "selected" => data.flags.selected = parse_bool(attr)?,
            "NAF" => data.naf = parse_bool(attr)?,
            "bounds" => {
                data.bounds = parse_bounds(value).ok_or_else(|| invalid_attribute(attr))?;
            }
            other => trace!(attribute = other, "ignoring attribute"),
        }
    }
    Ok(data)
}

fn parse_bool(attr: &Attr<'_>) -> Result<bool, ParseError> {
    match attr.value.as_ref() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid_attribute(attr)),
    }
}

/// Parses the fixed `[L,T][R,B]` grammar.
pub(crate) fn parse_bounds(value: &str) -> Option<Bounds> {
    let rest = value.strip_prefix('[')?;
    let (left, rest) = rest.split_once(',')?;
    let (top, rest) = rest.split_once("][")?;
    let (right, rest) = rest.split_once(',')?;
    let bottom = rest.strip_suffix(']')?;
    Bounds::new(
        parse_coord(left)?,
        parse_coord(top)?,
        parse_coord(right)?,
        parse_coord(bottom)?,
    )
}

fn parse_coord(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn invalid_attribute(attr: &Attr<'_>) -> ParseError {
    ParseError::InvalidAttribute {
        name: attr.name.to_string(),
        value: attr.raw.to_string(),
        offset: attr.offset,
    }
}

/// Resolves the predefined XML entities and numeric character references.
fn decode_entities(raw: &str) -> Option<Cow<'_, str>> {
    if !raw.contains('&') {
        return Some(Cow::Borrowed(raw));
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after.find(';')?;
        let entity = &after[..semi];
        let ch = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                {
                    u32::from_str_radix(hex, 16).ok()?
                } else {
                    entity.strip_prefix('#')?.parse().ok()?
                };
                char::from_u32(code)?
            }
        };
        out.push(ch);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Some(Cow::Owned(out))
}

struct Attr<'a> {
    name: &'a str,
    raw: &'a str,
    value: Cow<'a, str>,
    offset: usize,
}

struct Tag<'a> {
    name: &'a str,
    attrs: SmallVec<[Attr<'a>; 16]>,
    self_closing: bool,
}

struct Scanner<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    const fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.bytes[self.pos..].starts_with(prefix.as_bytes())
    }

    fn malformed(&self, reason: &'static str) -> ParseError {
        self.malformed_at(self.pos, reason)
    }

    fn malformed_at(&self, offset: usize, reason: &'static str) -> ParseError {
        ParseError::Malformed {
            offset,
            reason,
            fragment: fragment_at(self.input, offset),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Skips to just past `terminator`, failing with `reason` at `start` if it never appears.
    fn skip_past(
        &mut self,
        start: usize,
        terminator: &str,
        reason: &'static str,
    ) -> Result<(), ParseError> {
        match self.input[self.pos..].find(terminator) {
            Some(idx) => {
                self.pos += idx + terminator.len();
                Ok(())
            }
            None => Err(self.malformed_at(start, reason)),
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ParseError> {
        loop {
            self.skip_whitespace();
            if self.starts_with("<!--") {
                let start = self.pos;
                self.pos += 4;
                self.skip_past(start, "-->", "unterminated comment")?;
            } else {
                return Ok(());
            }
        }
    }

    /// Skips whitespace, comments, the XML declaration and a doctype.
    fn skip_misc(&mut self) -> Result<(), ParseError> {
        loop {
            self.skip_whitespace_and_comments()?;
            let start = self.pos;
            if self.starts_with("<?") {
                self.pos += 2;
                self.skip_past(start, "?>", "unterminated declaration")?;
            } else if self.starts_with("<!") {
                self.pos += 2;
                self.skip_past(start, ">", "unterminated markup declaration")?;
            } else {
                return Ok(());
            }
        }
    }

    fn read_name(&mut self) -> Result<&'a str, ParseError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.'))
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.malformed("expected a name"));
        }
        Ok(&self.input[start..self.pos])
    }

    /// Reads `<name attr="value" ...>` or `<name ... />`; the cursor sits on `<`.
    fn read_start_tag(&mut self) -> Result<Tag<'a>, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let name = self.read_name()?;
        let mut tag = Tag {
            name,
            attrs: SmallVec::new(),
            self_closing: false,
        };

        loop {
            let had_space = self.peek().is_some_and(|b| b.is_ascii_whitespace());
            self.skip_whitespace();
            match self.peek() {
                None => {
                    return Err(ParseError::Unterminated {
                        name: name.to_string(),
                        offset: start,
                    });
                }
                Some(b'>') => {
                    self.pos += 1;
                    return Ok(tag);
                }
                Some(b'/') => {
                    if self.peek_at(1) != Some(b'>') {
                        return Err(self.malformed("expected `/>`"));
                    }
                    self.pos += 2;
                    tag.self_closing = true;
                    return Ok(tag);
                }
                Some(_) if !had_space => {
                    return Err(self.malformed("attributes must be separated by whitespace"));
                }
                Some(_) => {
                    let attr = self.read_attr()?;
                    if tag.attrs.iter().any(|seen| seen.name == attr.name) {
                        return Err(ParseError::DuplicateAttribute {
                            name: attr.name.to_string(),
                            offset: attr.offset,
                        });
                    }
                    tag.attrs.push(attr);
                }
            }
        }
    }

    fn read_attr(&mut self) -> Result<Attr<'a>, ParseError> {
        let offset = self.pos;
        let name = self.read_name()?;
        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            return Err(self.malformed("attribute without a value"));
        }
        self.pos += 1;
        self.skip_whitespace();
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.malformed("attribute value must be quoted")),
        };
        self.pos += 1;
        let value_start = self.pos;
        let Some(len) = self.bytes[value_start..].iter().position(|&b| b == quote) else {
            return Err(self.malformed_at(offset, "unterminated attribute value"));
        };
        let raw = &self.input[value_start..value_start + len];
        if raw.contains('<') {
            return Err(self.malformed_at(offset, "`<` inside attribute value"));
        }
        self.pos = value_start + len + 1;
        let value = decode_entities(raw).ok_or_else(|| ParseError::InvalidAttribute {
            name: name.to_string(),
            value: raw.to_string(),
            offset,
        })?;
        Ok(Attr {
            name,
            raw,
            value,
            offset,
        })
    }

    /// Reads `</name>`; the cursor sits on `<`.
    fn read_end_tag(&mut self) -> Result<&'a str, ParseError> {
        let start = self.pos;
        self.pos += 2;
        let name = self.read_name()?;
        self.skip_whitespace();
        if self.peek() != Some(b'>') {
            return Err(self.malformed_at(start, "malformed closing tag"));
        }
        self.pos += 1;
        Ok(name)
    }
}
