//! Plot digitized from a PDF (`pdf`), through the context's [`PdfDigitizer`].
//!
//! [`PdfDigitizer`]: crate::data_handler::PdfDigitizer
use crate::{
    data_handler::{
        context::IngestionContext,
        formats::{RawRows, SourceReader},
        SourceSpec,
    },
    massplane_errors::MassPlaneError,
};

pub(crate) struct PdfReader;

impl SourceReader for PdfReader {
    fn read(&self, spec: &SourceSpec, ctx: &mut IngestionContext) -> Result<RawRows, MassPlaneError> {
        let path = spec.path()?;
        let rows = ctx
            .pdf_digitizer()?
            .digitize(path, spec.object_name.as_deref())?;
        log::debug!("{path}: digitized {} points", rows.len());
        Ok(RawRows::Columns(rows))
    }
}
