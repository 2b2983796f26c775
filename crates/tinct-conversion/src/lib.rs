//! Tinct Conversion: pixel runs through an external filter graph.
//!
//! A [`Conversion`] pulls a region of its output image through the graph
//! using a [`PixelAccessTicket`] and writes the result back into the image.

pub mod config;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod ticket;

pub use config::PipelineConfig;
pub use error::{ConfigError, ConversionError, GraphError};
pub use graph::{FilterGraph, FilterOutcome, NodeId, PlugId};
pub use pipeline::{Conversion, RunStatus};
pub use ticket::PixelAccessTicket;
