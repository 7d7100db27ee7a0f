//! One frame of the streaming serial's level stack (spec §4.5).
//!
//! Grounded on `original_source/cosc.h`'s `struct cosc_level`. A message
//! level doesn't keep its own copy of the type tag text: `tt_start`/`tt_end`
//! index directly into the shared buffer, the same way the original does,
//! so opening a message costs no allocation beyond the caller-supplied
//! level slot itself.

/// Which of the three packet kinds a [`Level`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelKind {
    Bundle,
    Message,
    Blob,
}

/// A single writer or reader frame. Callers allocate a `&mut [Level]`
/// stack up front; the serial never grows it.
#[derive(Debug, Clone, Copy)]
pub struct Level {
    pub(crate) kind: LevelKind,
    /// Buffer offset where this level's own content begins, i.e. just
    /// after its length prefix (if any).
    pub(crate) start: usize,
    /// Buffer offset of this level's 4-byte length prefix, if one was
    /// written/declared.
    pub(crate) prefix_at: Option<usize>,
    /// Bytes written (writer) or read (reader) within this level so far,
    /// not counting the prefix.
    pub(crate) size: usize,
    /// For a reader: the declared extent of this level (`start + size_max`
    /// is one-past-the-end), when a length prefix bounds it.
    pub(crate) size_max: Option<usize>,
    /// Message levels only: buffer offset of the type tag's first
    /// character after the leading comma.
    pub(crate) tt_start: usize,
    /// Message levels only: buffer offset one past the type tag's last
    /// character (before its NUL terminator).
    pub(crate) tt_end: usize,
    /// Message levels only: the cursor's current offset from `tt_start`.
    pub(crate) tt_index: usize,
    /// Message levels only: cursor offset (from `tt_start`) of the
    /// character just after the innermost active `[`, if any.
    pub(crate) array_start: Option<usize>,
}

impl Level {
    pub(crate) fn bundle(start: usize, prefix_at: Option<usize>) -> Level {
        Level {
            kind: LevelKind::Bundle,
            start,
            prefix_at,
            size: 0,
            size_max: None,
            tt_start: 0,
            tt_end: 0,
            tt_index: 0,
            array_start: None,
        }
    }

    pub(crate) fn message(start: usize, prefix_at: Option<usize>, tt_start: usize, tt_end: usize) -> Level {
        Level {
            kind: LevelKind::Message,
            start,
            prefix_at,
            size: 0,
            size_max: None,
            tt_start,
            tt_end,
            tt_index: 0,
            array_start: None,
        }
    }

    pub(crate) fn blob(start: usize, prefix_at: Option<usize>) -> Level {
        Level {
            kind: LevelKind::Blob,
            start,
            prefix_at,
            size: 0,
            size_max: None,
            tt_start: 0,
            tt_end: 0,
            tt_index: 0,
            array_start: None,
        }
    }
}

impl Default for Level {
    /// An inert placeholder. Callers never observe this; it only fills
    /// unused slots in a caller-supplied level stack.
    fn default() -> Level {
        Level::bundle(0, None)
    }
}
