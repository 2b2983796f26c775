use tinct_core::{ImageError, Severity};

use crate::graph::NodeId;

/// Failures reported by a filter graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("filter failed: {0}")]
    Failed(String),
    #[error("node {0} has no input image")]
    MissingInput(NodeId),
    #[error(transparent)]
    Image(#[from] ImageError),
}

impl GraphError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Image(e) => e.severity(),
            _ => Severity::Hard,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("output node {0} has no connected sink")]
    NoSink(NodeId),
    #[error("output node {0} carries no image")]
    NoOutputImage(NodeId),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl ConversionError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Image(e) => e.severity(),
            Self::Graph(e) => e.severity(),
            _ => Severity::Hard,
        }
    }

    /// Integer status: positive for hard failures, negative for soft ones.
    pub fn code(&self) -> i32 {
        self.severity().code()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid pipeline config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown allocate method {0:?}")]
    AllocateMethod(String),
}
