//! Opaque handles for session nodes.
//!
//! Each ID is a thin `u32` wrapper that is `Copy` and `Hash`. IDs are created
//! by [`Arena::alloc`](crate::arena::Arena::alloc).

use crate::arena::ArenaId;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        pub struct $name(u32);

        impl $name {
            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Handle of a parameter owned by a block, link or port.
    ParamId
);

define_id!(
    /// Handle of a port, bundle field, vector, vector element or request.
    PortId
);

define_id!(
    /// Handle of a block, link, bridge or mixin instance.
    BlockId
);

define_id!(
    /// Handle of a pending connection (a net of ports).
    ConnectId
);

define_id!(
    /// Handle of a constraint or assignment.
    ConstraintId
);

define_id!(
    /// Handle of a chain record.
    ChainId
);

/// The container of a parameter, port or block: a block (also a link or
/// mixin) or a port (a bundle or vector).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Owner {
    /// Owned by a block, link or mixin.
    Block(BlockId),
    /// Owned by a port.
    Port(PortId),
}
