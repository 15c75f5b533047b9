//! Runner for the `inspect` command
//!
//! Executes the fixed pipeline: parse the reference, open an image source,
//! read the image, inspect it, report the `version` label. The source opened
//! in the second step is released on every path after it opens, and a release
//! failure is combined with, never substituted for, an earlier failure.

use crate::common::Context;
use crate::config::SystemContext;
use crate::error::InspectError;
use crate::image::{from_unparsed_image, UnparsedImage};
use crate::logging::Logger;
use crate::registry::{ImageSource, Transport};
use std::io::Write;
use std::time::Instant;

/// Label reported by `inspect`
pub const VERSION_LABEL: &str = "version";

/// Validated input of one `inspect` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectRequest {
    image_reference: String,
}

impl InspectRequest {
    /// Bind the single positional argument; any other count is a usage error
    pub fn from_args(args: &[String]) -> Result<Self, InspectError> {
        match args {
            [reference] if reference.is_empty() => Err(InspectError::EmptyReference),
            [reference] => Ok(Self {
                image_reference: reference.clone(),
            }),
            _ => Err(InspectError::InvalidUsage(args.len())),
        }
    }

    pub fn image_reference(&self) -> &str {
        &self.image_reference
    }
}

pub struct Runner<'a> {
    transport: &'a dyn Transport,
    sys: SystemContext,
    output: Logger,
}

impl<'a> Runner<'a> {
    pub fn new(transport: &'a dyn Transport, output: Logger) -> Self {
        Self {
            transport,
            sys: SystemContext::default(),
            output,
        }
    }

    pub fn with_system_context(mut self, sys: SystemContext) -> Self {
        self.sys = sys;
        self
    }

    /// Run the pipeline and write `Version: <value>` to `out`. Returns the
    /// label value.
    pub async fn inspect<W: Write>(
        &self,
        ctx: &Context,
        request: &InspectRequest,
        out: &mut W,
    ) -> Result<String, InspectError> {
        let start_time = Instant::now();

        self.output.debug(&format!(
            "Parsing image reference with {} transport",
            self.transport.name()
        ));
        let reference = self
            .transport
            .parse_reference(&format!("//{}", request.image_reference()))
            .map_err(InspectError::ReferenceParse)?;
        self.output.detail(&format!(
            "Resolved {}:{}",
            reference.transport_name(),
            reference.string_within_transport()
        ));

        self.output.debug("Creating new ImageSource");
        let source = reference
            .new_image_source(ctx, &self.sys)
            .await
            .map_err(InspectError::SourceOpen)?;

        let outcome = self.read_version(ctx, source.as_ref(), out).await;

        self.output.debug("Closing ImageSource");
        let closed = source.close();

        let result = InspectError::with_close_result(outcome, closed);
        if result.is_ok() {
            self.output.verbose(&format!(
                "Inspection completed in {}",
                self.output.format_duration(start_time.elapsed())
            ));
        }
        result
    }

    async fn read_version<W: Write>(
        &self,
        ctx: &Context,
        source: &dyn ImageSource,
        out: &mut W,
    ) -> Result<String, InspectError> {
        self.output.debug("Getting image from unparsed");
        let image = from_unparsed_image(ctx, &self.sys, UnparsedImage::new(source, None))
            .await
            .map_err(InspectError::ImageParse)?;

        self.output.debug("Inspecting image");
        let info = image.inspect(ctx).await.map_err(InspectError::Inspect)?;
        self.output.debug("Image inspected");

        let version = info
            .labels
            .get(VERSION_LABEL)
            .ok_or_else(|| InspectError::MissingLabel(VERSION_LABEL.to_string()))?;

        writeln!(out, "Version: {}", version)?;
        out.flush()?;

        Ok(version.clone())
    }
}
