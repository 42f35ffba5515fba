//! The stack of elements currently being defined.
//!
//! Construction calls on a [`Session`](crate::Session) act on the innermost
//! frame: a port or parameter declared while a block's `init` runs belongs to
//! that block, a parameter declared while a port is being defined belongs to
//! that port. The stack is owned by the session, one per elaboration.

use crate::ids::{BlockId, PortId};
use trellis_common::{InternalError, TrellisResult};

/// One element under definition.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Frame {
    /// A block, link, bridge or mixin.
    Block(BlockId),
    /// A port or bundle.
    Port(PortId),
}

/// The context stack.
#[derive(Debug, Default, Clone)]
pub struct ContextStack {
    frames: Vec<Frame>,
}

impl ContextStack {
    /// Creates an empty stack, the top-level context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a frame and returns the previous top.
    ///
    /// Pushing the frame that is already on top is a no-op; the returned
    /// previous top is then the frame itself, which makes the matching
    /// [`pop_to`](Self::pop_to) a no-op as well.
    pub fn push_element(&mut self, frame: Frame) -> Option<Frame> {
        let prev = self.top();
        if prev != Some(frame) {
            self.frames.push(frame);
        }
        prev
    }

    /// Pops at most one frame, returning to `prev`.
    pub fn pop_to(&mut self, prev: Option<Frame>) -> TrellisResult<()> {
        if self.top() == prev {
            return Ok(());
        }
        self.frames.pop();
        if self.top() == prev {
            Ok(())
        } else {
            Err(InternalError::new(format!(
                "context stack out of balance: expected {prev:?} on top, found {:?}",
                self.top()
            )))
        }
    }

    /// Returns the top frame, `None` at top level.
    pub fn top(&self) -> Option<Frame> {
        self.frames.last().copied()
    }

    /// Returns the innermost block under definition, `None` at top level.
    pub fn get_enclosing_block(&self) -> Option<BlockId> {
        self.frames.iter().rev().find_map(|frame| match frame {
            Frame::Block(id) => Some(*id),
            Frame::Port(_) => None,
        })
    }

    /// Number of frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
