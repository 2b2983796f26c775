//! The contract consumed from the filter graph.
//!
//! The graph owns nodes, their options and the color transforms. The
//! conversion core only needs to find the sink connected to the output node,
//! ask it to run, and recover when a run fails.

use std::fmt;

use tinct_core::ImageHandle;

use crate::error::GraphError;
use crate::ticket::PixelAccessTicket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A connector of a node, addressed by node and input index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlugId {
    pub node: NodeId,
    pub index: usize,
}

/// What a filter run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    Complete,
    /// Nothing needed to be done.
    Skipped,
}

pub trait FilterGraph: fmt::Debug + Send + Sync {
    /// Input connector `index` of `node`, if something is connected to it.
    fn plug(&self, node: NodeId, index: usize) -> Option<PlugId>;

    /// Pull pixels through the stage behind `plug` into the ticket's array.
    ///
    /// A run that fails because node options changed underneath it sets
    /// `ticket.dirty`.
    fn run_filter_plug(
        &self,
        plug: PlugId,
        ticket: &mut PixelAccessTicket,
    ) -> Result<FilterOutcome, GraphError>;

    /// Locate the image feeding `socket` upstream of `plug`.
    fn resolve_upstream_image(
        &self,
        plug: PlugId,
        socket: usize,
        ticket: &mut PixelAccessTicket,
    ) -> Option<ImageHandle>;

    /// Rebuild the graph's node list starting at `node`.
    fn refresh_from_node(&self, node: NodeId);

    /// The image attached to `node`.
    fn node_image(&self, node: NodeId) -> Option<ImageHandle>;
}
