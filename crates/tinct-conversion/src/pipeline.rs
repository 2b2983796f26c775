//! Demand-driven pixel runs over a filter graph.
//!
//! [`Conversion::run_pixels`] pulls one region through the graph: it finds the
//! sink behind the output node, makes sure the ticket has an array, lets the
//! graph fill it and copies the result into the output image. A failed run
//! gets one recovery attempt when the graph reports it as dirty.

use std::sync::Arc;

use tinct_core::{ArrayHandle, ImageHandle, Rectangle};

use crate::config::PipelineConfig;
use crate::error::{ConversionError, GraphError};
use crate::graph::{FilterGraph, FilterOutcome, NodeId, PlugId};
use crate::ticket::PixelAccessTicket;

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Complete,
    /// The graph had nothing to do; the output image was not touched.
    Skipped,
}

impl RunStatus {
    pub const fn code(self) -> i32 {
        match self {
            Self::Complete => 0,
            Self::Skipped => -1,
        }
    }
}

#[derive(Debug)]
enum RunState {
    Resolve,
    Populate(PlugId),
    Run(PlugId),
    RecoverAndRetry(PlugId, GraphError),
    Writeback,
}

/// A conversion between an input and an output node of a filter graph.
#[derive(Debug, Clone)]
pub struct Conversion {
    graph: Arc<dyn FilterGraph>,
    input: NodeId,
    output: NodeId,
    config: PipelineConfig,
}

impl Conversion {
    pub fn new(
        graph: Arc<dyn FilterGraph>,
        input: NodeId,
        output: NodeId,
        config: PipelineConfig,
    ) -> Self {
        Self {
            graph,
            input,
            output,
            config,
        }
    }

    pub fn graph(&self) -> &Arc<dyn FilterGraph> {
        &self.graph
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn output_image(&self) -> Result<ImageHandle, ConversionError> {
        self.graph
            .node_image(self.output)
            .ok_or(ConversionError::NoOutputImage(self.output))
    }

    /// A ticket covering the whole output image.
    pub fn create_ticket(&self) -> Result<PixelAccessTicket, ConversionError> {
        Ok(PixelAccessTicket::new(
            self.graph.clone(),
            self.output_image()?,
        ))
    }

    /// Pull pixels for `ticket`, or for the whole output image.
    ///
    /// On failure the ticket's cursor is back where it was when the call
    /// started.
    pub fn run_pixels(
        &self,
        ticket: Option<&mut PixelAccessTicket>,
    ) -> Result<RunStatus, ConversionError> {
        let mut local;
        let ticket = match ticket {
            Some(ticket) => ticket,
            None => {
                local = self.create_ticket()?;
                &mut local
            }
        };

        ticket.start_xy_old = ticket.start_xy;
        let result = self.drive(ticket);
        if let Err(e) = &result {
            tracing::debug!("run failed ({e}), restoring cursor {}", ticket.start_xy_old);
            ticket.start_xy = ticket.start_xy_old;
        }
        result
    }

    fn drive(&self, ticket: &mut PixelAccessTicket) -> Result<RunStatus, ConversionError> {
        let mut retried = false;
        let mut state = RunState::Resolve;
        loop {
            tracing::trace!("run_pixels state {state:?}");
            state = match state {
                RunState::Resolve => {
                    let plug = self
                        .graph
                        .plug(self.output, 0)
                        .ok_or(ConversionError::NoSink(self.output))?;
                    RunState::Populate(plug)
                }
                RunState::Populate(plug) => {
                    self.populate(ticket)?;
                    RunState::Run(plug)
                }
                RunState::Run(plug) => match self.graph.run_filter_plug(plug, ticket) {
                    Ok(FilterOutcome::Complete) => RunState::Writeback,
                    Ok(FilterOutcome::Skipped) => {
                        tracing::debug!("graph skipped the run");
                        return Ok(RunStatus::Skipped);
                    }
                    Err(e) => RunState::RecoverAndRetry(plug, e),
                },
                RunState::RecoverAndRetry(plug, error) => {
                    self.graph.refresh_from_node(self.input);
                    if self.graph.resolve_upstream_image(plug, 0, ticket).is_none() {
                        tracing::debug!("no upstream image behind plug {:?}", plug);
                    }
                    if !(ticket.dirty && self.config.retry_on_dirty && !retried) {
                        return Err(error.into());
                    }
                    tracing::warn!("run marked dirty ({error}), retrying once");
                    retried = true;
                    ticket.dirty = false;
                    ticket.start_xy = ticket.start_xy_old;
                    RunState::Run(plug)
                }
                RunState::Writeback => {
                    self.write_back(ticket)?;
                    return Ok(RunStatus::Complete);
                }
            };
        }
    }

    /// Give the ticket an array sized to its region.
    fn populate(&self, ticket: &mut PixelAccessTicket) -> Result<(), ConversionError> {
        if ticket.array.is_some() {
            return Ok(());
        }
        let roi = ticket.roi();
        let region = Rectangle::new(0.0, 0.0, roi.width, roi.height);
        let array = ticket.output_image().read().fill_array(
            &region,
            self.config.allocate_method,
            None,
            None,
        )?;
        {
            let a = array.read();
            tracing::debug!(
                "ticket array {}x{} ({:?})",
                a.width(),
                a.height(),
                self.config.allocate_method
            );
        }
        ticket.array = Some(array);
        Ok(())
    }

    /// Copy the ticket's array into its output image unless they share rows.
    fn write_back(&self, ticket: &PixelAccessTicket) -> Result<(), ConversionError> {
        if !self.config.writeback {
            return Ok(());
        }
        let Some(array) = &ticket.array else {
            return Ok(());
        };
        let image = ticket.output_image().read();
        let aliased = image.array().is_some_and(|own| {
            ArrayHandle::ptr_eq(own, array)
                || array.read().shares_storage_with(&own.read())
        });
        if aliased {
            tracing::debug!("ticket array aliases the output image, skipping writeback");
            return Ok(());
        }
        tracing::debug!("writing ticket array back into the output image");
        image.read_array(None, array, None)?;
        Ok(())
    }
}
