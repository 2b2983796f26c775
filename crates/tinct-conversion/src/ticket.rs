//! Per-run cursor, region and target array.

use std::sync::Arc;

use glam::DVec2;

use tinct_core::{ArrayHandle, ImageHandle, Rectangle};

use crate::graph::FilterGraph;

/// Carries the target array, region and cursor through one pipeline run.
///
/// The graph and output image are fixed at construction.
#[derive(Debug)]
pub struct PixelAccessTicket {
    /// Target array; filled on demand by the pipeline.
    pub array: Option<ArrayHandle>,
    /// Size of the requested region in output samples.
    pub output_array_roi: Rectangle,
    /// Region origin in ROI units of the output image.
    pub start_xy: DVec2,
    /// Cursor at the start of the current run.
    pub start_xy_old: DVec2,
    /// Set by the graph when node options changed during a run.
    pub dirty: bool,
    graph: Arc<dyn FilterGraph>,
    output_image: ImageHandle,
}

impl PixelAccessTicket {
    /// A ticket covering the whole output image.
    pub fn new(graph: Arc<dyn FilterGraph>, output_image: ImageHandle) -> Self {
        let output_array_roi = output_image.read().sample_bounds();
        Self {
            array: None,
            output_array_roi,
            start_xy: DVec2::ZERO,
            start_xy_old: DVec2::ZERO,
            dirty: false,
            graph,
            output_image,
        }
    }

    /// A ticket for `roi`, given in ROI units of the output image.
    pub fn with_roi(
        graph: Arc<dyn FilterGraph>,
        output_image: ImageHandle,
        roi: &Rectangle,
    ) -> Self {
        let size = Rectangle::new(0.0, 0.0, roi.width, roi.height);
        let output_array_roi = output_image.read().roi_to_samples(&size);
        let start = roi.origin();
        Self {
            array: None,
            output_array_roi,
            start_xy: start,
            start_xy_old: start,
            dirty: false,
            graph,
            output_image,
        }
    }

    pub fn graph(&self) -> &Arc<dyn FilterGraph> {
        &self.graph
    }

    pub fn output_image(&self) -> &ImageHandle {
        &self.output_image
    }

    /// Working region in ROI units: the cursor plus the array region size.
    pub fn roi(&self) -> Rectangle {
        let size = self
            .output_image
            .read()
            .samples_to_roi(&self.output_array_roi);
        Rectangle::new(self.start_xy.x, self.start_xy.y, size.width, size.height)
    }
}
