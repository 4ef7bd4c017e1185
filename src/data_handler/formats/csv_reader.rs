//! CSV grids (`csv`) and products of several CSV grids (`mcsv`).
use ahash::AHashMap;
use camino::Utf8Path;
use ordered_float::OrderedFloat;

use crate::{
    constants::RawRow,
    data_handler::{
        context::IngestionContext,
        formats::{RawRows, SourceReader},
        trimming::trim_rows,
        SourceSpec,
    },
    massplane_errors::MassPlaneError,
};

/// Numeric records of a CSV file. Headers, comments (`#`) and records with a non-numeric field
/// are skipped.
pub(crate) fn read_csv_rows(path: &Utf8Path) -> Result<Vec<RawRow>, MassPlaneError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Option<RawRow> = record
            .iter()
            .filter(|f| !f.is_empty())
            .map(|f| f.parse::<f64>().ok())
            .collect();
        match row {
            Some(row) if !row.is_empty() => rows.push(row),
            _ => log::debug!("{path}: skipping record {record:?}"),
        }
    }
    Ok(rows)
}

pub(crate) struct CsvReader;

impl SourceReader for CsvReader {
    fn read(&self, spec: &SourceSpec, ctx: &mut IngestionContext) -> Result<RawRows, MassPlaneError> {
        let path = spec.path()?;
        let rows = read_csv_rows(path)?;
        Ok(RawRows::Columns(trim_rows(rows, path.as_str(), ctx)))
    }
}

type CoordinateKey = Vec<OrderedFloat<f64>>;

/// Several CSV files (`a.csv;b.csv`) joined on their coordinate columns; the value is the
/// product of the files' last columns.
///
/// Only coordinate tuples present in every file survive, in the order of the first file.
pub(crate) struct MultiCsvReader;

impl SourceReader for MultiCsvReader {
    fn read(&self, spec: &SourceSpec, ctx: &mut IngestionContext) -> Result<RawRows, MassPlaneError> {
        let path = spec.path()?;
        let files: Vec<&Utf8Path> = path
            .as_str()
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Utf8Path::new)
            .collect();
        let Some((first, others)) = files.split_first() else {
            return Err(MassPlaneError::MissingPath(spec.format.to_string()));
        };

        let split = |row: RawRow| -> Option<(CoordinateKey, f64)> {
            let (value, coords) = row.split_last()?;
            Some((coords.iter().copied().map(OrderedFloat).collect(), *value))
        };

        let mut products: Vec<(CoordinateKey, f64)> =
            read_csv_rows(first)?.into_iter().filter_map(split).collect();

        for file in others {
            let values: AHashMap<CoordinateKey, f64> =
                read_csv_rows(file)?.into_iter().filter_map(split).collect();
            let before = products.len();
            products.retain_mut(|(key, value)| match values.get(key) {
                Some(v) => {
                    *value *= v;
                    true
                }
                None => false,
            });
            if products.len() < before {
                ctx.warn_once(format!(
                    "{file}: {} points of {first} have no counterpart",
                    before - products.len()
                ));
            }
        }

        let rows = products
            .into_iter()
            .map(|(key, value)| {
                let mut row: RawRow = key.into_iter().map(|c| c.into_inner()).collect();
                row.push(value);
                row
            })
            .collect();
        Ok(RawRows::Columns(trim_rows(rows, path.as_str(), ctx)))
    }
}
