//! Links: named references to a [`crate::node::Node`] carrying a
//! non-owning back-reference to their parent link, so `..` resolves through
//! the link that was actually traversed to reach a node rather than some
//! arbitrary other hard link.

use crate::arena::Id;
use crate::node::NodeId;

pub type LinkId = Id<Link>;

pub struct Link {
    pub parent: Option<LinkId>,
    pub node: NodeId,
}

impl Link {
    pub fn new(parent: Option<LinkId>, node: NodeId) -> Self {
        Self { parent, node }
    }
}
