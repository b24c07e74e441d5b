//! Open control-keyword frames.
//!
//! The stack is shared by the validator (frames carry the keyword's source
//! range) and the formatter (frames carry the indentation in effect when the
//! block opened), so the frame payload is generic.

use crate::keyword::Keyword;
use tracing::trace;

/// An opening keyword waiting for its terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<T> {
    pub keyword: Keyword,
    pub data: T,
}

/// Outcome of closing a block with a terminator.
#[derive(Debug, Clone, PartialEq)]
pub enum Close<T> {
    /// The top frame matched and was popped.
    Matched(Frame<T>),
    /// A matching frame below the top was removed; `top` was left open.
    OutOfOrder { removed: Frame<T>, top: Keyword },
    /// No open frame matches the terminator.
    Unmatched,
}

/// Outcome of checking an `else`/`elseif` against the open frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// The innermost frame is an `if`.
    Ok,
    /// An `if` is open, but `top` was opened after it and is still open.
    Interrupted { top: Keyword },
    /// No `if` is open.
    NoIf,
}

/// LIFO stack of open control frames.
#[derive(Debug, Clone)]
pub struct BlockStack<T> {
    frames: Vec<Frame<T>>,
}

impl<T> Default for BlockStack<T> {
    fn default() -> Self {
        Self { frames: Vec::new() }
    }
}

impl<T> BlockStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, keyword: Keyword, data: T) {
        trace!(%keyword, depth = self.frames.len(), "open block");
        self.frames.push(Frame { keyword, data });
    }

    pub fn top(&self) -> Option<&Frame<T>> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame<T>> {
        self.frames.last_mut()
    }

    pub fn top_keyword(&self) -> Option<Keyword> {
        self.frames.last().map(|f| f.keyword)
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if any open frame is `keyword`.
    pub fn contains(&self, keyword: Keyword) -> bool {
        self.frames.iter().any(|f| f.keyword == keyword)
    }

    /// Close the block that `terminator` ends.
    ///
    /// The top frame is preferred. Failing that, the innermost matching frame
    /// anywhere on the stack is spliced out so later traversal never sees a
    /// gap.
    pub fn close(&mut self, terminator: Keyword) -> Close<T> {
        let Some(opening) = terminator.opening() else {
            return Close::Unmatched;
        };
        let Some(top) = self.top_keyword() else {
            return Close::Unmatched;
        };
        if top == opening {
            trace!(%terminator, "close block");
            return match self.frames.pop() {
                Some(frame) => Close::Matched(frame),
                None => Close::Unmatched,
            };
        }
        match self.frames.iter().rposition(|f| f.keyword == opening) {
            Some(index) => {
                trace!(%terminator, index, "close block out of order");
                let removed = self.frames.remove(index);
                Close::OutOfOrder { removed, top }
            }
            None => Close::Unmatched,
        }
    }

    /// Check an `else`/`elseif` against the open frames without changing them.
    pub fn branch(&self) -> Branch {
        match self.top_keyword() {
            Some(Keyword::If) => Branch::Ok,
            Some(top) if self.contains(Keyword::If) => Branch::Interrupted { top },
            _ => Branch::NoIf,
        }
    }

    /// Remove and return every open frame, outermost first.
    pub fn drain(&mut self) -> Vec<Frame<T>> {
        std::mem::take(&mut self.frames)
    }
}
