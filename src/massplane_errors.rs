use thiserror::Error;

#[derive(Error, Debug)]
pub enum MassPlaneError {
    #[error("Invalid expression: {0}")]
    ExpressionParse(String),

    #[error("Unknown symbol in expression: {0}")]
    UnknownSymbol(String),

    #[error("Invalid Python literal: {0}")]
    LiteralParse(String),

    #[error("Invalid mass plane descriptor: {0}")]
    DescriptorParse(String),

    #[error("Branch {branch} is underconstrained: {nvars} coordinate variables for {neqs} equations")]
    Underconstrained {
        branch: usize,
        nvars: usize,
        neqs: usize,
    },

    #[error("Dimension mismatch: expected {expected} entries, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Unknown data label: {0}")]
    UnknownDataLabel(String),

    #[error("Unknown source format: {0}")]
    UnknownFormat(String),

    #[error("Inconsistent source lists: {0}")]
    InconsistentSources(String),

    #[error("Invalid coordinate map: {0}")]
    InvalidCoordinateMap(String),

    #[error("Source {0} needs a file path")]
    MissingPath(String),

    #[error("Source {0} needs an object name")]
    MissingObject(String),

    #[error("Mass-keyed rows need a mass plane to be projected")]
    MissingProjection,

    #[error("No ROOT reader registered in the ingestion context")]
    NoRootReader,

    #[error("ROOT read error: {0}")]
    RootRead(String),

    #[error("Unexpected ROOT object: {0}")]
    UnexpectedRootObject(String),

    #[error("No PDF digitizer registered in the ingestion context")]
    NoPdfDigitizer,

    #[error("PDF digitizer error: {0}")]
    PdfRead(String),

    #[error("SVG parsing error: {0}")]
    SvgParse(String),

    #[error("Invalid ingestion parameter: {0}")]
    InvalidIngestionParameter(String),

    #[error("Invalid covariance parameter: {0}")]
    InvalidCovarianceParameter(String),

    #[error("Covariance matrix check failed: {0}")]
    CovarianceCheck(String),

    #[error("Aggregation index {index} out of range for {size} signal regions")]
    AggregationIndex { index: usize, size: usize },

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl PartialEq for MassPlaneError {
    fn eq(&self, other: &Self) -> bool {
        use MassPlaneError::*;
        match (self, other) {
            (ExpressionParse(a), ExpressionParse(b)) => a == b,
            (UnknownSymbol(a), UnknownSymbol(b)) => a == b,
            (LiteralParse(a), LiteralParse(b)) => a == b,
            (DescriptorParse(a), DescriptorParse(b)) => a == b,
            (
                Underconstrained {
                    branch: b1,
                    nvars: v1,
                    neqs: e1,
                },
                Underconstrained {
                    branch: b2,
                    nvars: v2,
                    neqs: e2,
                },
            ) => b1 == b2 && v1 == v2 && e1 == e2,
            (
                DimensionMismatch {
                    expected: e1,
                    found: f1,
                },
                DimensionMismatch {
                    expected: e2,
                    found: f2,
                },
            ) => e1 == e2 && f1 == f2,
            (UnknownUnit(a), UnknownUnit(b)) => a == b,
            (UnknownDataLabel(a), UnknownDataLabel(b)) => a == b,
            (UnknownFormat(a), UnknownFormat(b)) => a == b,
            (InconsistentSources(a), InconsistentSources(b)) => a == b,
            (InvalidCoordinateMap(a), InvalidCoordinateMap(b)) => a == b,
            (MissingPath(a), MissingPath(b)) => a == b,
            (MissingObject(a), MissingObject(b)) => a == b,
            (RootRead(a), RootRead(b)) => a == b,
            (UnexpectedRootObject(a), UnexpectedRootObject(b)) => a == b,
            (PdfRead(a), PdfRead(b)) => a == b,
            (SvgParse(a), SvgParse(b)) => a == b,
            (InvalidIngestionParameter(a), InvalidIngestionParameter(b)) => a == b,
            (InvalidCovarianceParameter(a), InvalidCovarianceParameter(b)) => a == b,
            (CovarianceCheck(a), CovarianceCheck(b)) => a == b,
            (
                AggregationIndex {
                    index: i1,
                    size: s1,
                },
                AggregationIndex {
                    index: i2,
                    size: s2,
                },
            ) => i1 == i2 && s1 == s2,

            // payloads are not comparable: same variant means equal
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,

            (MissingProjection, MissingProjection) => true,
            (NoRootReader, NoRootReader) => true,
            (NoPdfDigitizer, NoPdfDigitizer) => true,

            _ => false,
        }
    }
}
