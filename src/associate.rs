//! Comment-to-declaration association.
//!
//! Declarations and documentation comments are both in source order, so a
//! single cursor into the comment list is carried from one declaration to
//! the next.

use crate::ast::{Declaration, DocKind, FunJsDoc};

/// Result of resolving one declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Association {
    /// Cursor to carry into the next declaration.
    pub cursor: Option<usize>,
    /// Index of the comment documenting this declaration.
    pub doc: Option<usize>,
}

/// Moves `cursor` past every comment ending before `decl_end`.
pub fn advance_cursor(docs: &[FunJsDoc], decl_end: usize, cursor: Option<usize>) -> Option<usize> {
    let mut cursor = cursor;
    loop {
        let next = cursor.map_or(0, |c| c + 1);
        match docs.get(next) {
            Some(doc) if doc.end < decl_end => cursor = Some(next),
            _ => return cursor,
        }
    }
}

/// Finds the comment documenting `decl`, starting from the previous cursor.
///
/// A candidate starting before the end of the preceding statement belongs
/// to that statement and is rejected; typedef comments never document a
/// declaration. The cursor advances either way.
pub fn find_preceding_comment(
    docs: &[FunJsDoc],
    decl: &Declaration,
    cursor: Option<usize>,
) -> Association {
    let cursor = advance_cursor(docs, decl.end, cursor);
    let Some(index) = cursor else {
        return Association { cursor, doc: None };
    };
    let candidate = &docs[index];

    if decl.prev_end.is_some_and(|prev| prev > candidate.start) {
        tracing::debug!(
            "comment at {} belongs to an earlier statement, '{}' is undocumented",
            candidate.start,
            decl.name
        );
        return Association { cursor, doc: None };
    }
    if candidate.kind == DocKind::Typedef {
        return Association { cursor, doc: None };
    }

    tracing::debug!("comment at {} documents '{}'", candidate.start, decl.name);
    Association {
        cursor,
        doc: Some(index),
    }
}
