use thiserror::Error;

/// Longest raw input excerpt attached to a [`ParseError`].
pub(crate) const FRAGMENT_LIMIT: usize = 64;

/// Why a dump could not be turned into a hierarchy.
///
/// Parsing never recovers partially: any of these aborts the whole attempt.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("dump is empty")]
    Empty,

    #[error("dump has no <hierarchy> root element")]
    MissingRoot { fragment: Option<String> },

    #[error("malformed markup at byte {offset}: {reason}")]
    Malformed {
        offset: usize,
        reason: &'static str,
        fragment: String,
    },

    #[error("unexpected element <{name}> at byte {offset}, expected <node>")]
    UnexpectedElement { name: String, offset: usize },

    #[error("element <{name}> opened at byte {offset} is never closed")]
    Unterminated { name: String, offset: usize },

    #[error("closing tag </{found}> at byte {offset} does not match <{expected}>")]
    MismatchedClose {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("attribute `{name}` at byte {offset} has malformed value {value:?}")]
    InvalidAttribute {
        name: String,
        value: String,
        offset: usize,
    },

    #[error("attribute `{name}` repeated at byte {offset}")]
    DuplicateAttribute { name: String, offset: usize },
}

impl ParseError {
    /// Raw excerpt of the offending input, when one is known.
    pub fn fragment(&self) -> Option<&str> {
        match self {
            Self::MissingRoot { fragment } => fragment.as_deref(),
            Self::Malformed { fragment, .. } => Some(fragment),
            Self::InvalidAttribute { value, .. } => Some(value),
            Self::Empty
            | Self::UnexpectedElement { .. }
            | Self::Unterminated { .. }
            | Self::MismatchedClose { .. }
            | Self::DuplicateAttribute { .. } => None,
        }
    }

    /// Byte offset of the failure in the input, when one is known.
    pub const fn offset(&self) -> Option<usize> {
        match self {
            Self::Empty | Self::MissingRoot { .. } => None,
            Self::Malformed { offset, .. }
            | Self::UnexpectedElement { offset, .. }
            | Self::Unterminated { offset, .. }
            | Self::MismatchedClose { offset, .. }
            | Self::InvalidAttribute { offset, .. }
            | Self::DuplicateAttribute { offset, .. } => Some(*offset),
        }
    }
}

/// Cuts `input[offset..]` down to a short excerpt on a char boundary.
pub(crate) fn fragment_at(input: &str, offset: usize) -> String {
    let rest = input.get(offset..).unwrap_or_default();
    let mut end = rest.len().min(FRAGMENT_LIMIT);
    while !rest.is_char_boundary(end) {
        end -= 1;
    }
    rest[..end].to_string()
}

/// Rejected [`crate::FilterCriteria`] configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum FilterValidationError {
    #[error("depth bound {0} is negative")]
    NegativeDepth(i64),

    #[error("depth range minimum {min} exceeds maximum {max}")]
    InvertedDepthRange { min: i64, max: i64 },
}

/// Rectangle corners out of order, as in `[10,0][5,10]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("bounds [{left},{top}][{right},{bottom}] have inverted corners")]
pub struct InvertedBounds {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_respects_char_boundaries() {
        let input = format!("{}é tail", "x".repeat(FRAGMENT_LIMIT - 1));
        let fragment = fragment_at(&input, 0);
        assert_eq!(fragment.len(), FRAGMENT_LIMIT - 1);
        assert_eq!(fragment_at("abc", 10), "");
    }

    #[test]
    fn messages_are_human_readable() {
        let err = ParseError::InvalidAttribute {
            name: "bounds".to_string(),
            value: "[0,0][a,b]".to_string(),
            offset: 12,
        };
        assert_eq!(
            err.to_string(),
            "attribute `bounds` at byte 12 has malformed value \"[0,0][a,b]\""
        );
        assert_eq!(err.fragment(), Some("[0,0][a,b]"));
        assert_eq!(err.offset(), Some(12));
        assert_eq!(ParseError::Empty.fragment(), None);
    }
}
