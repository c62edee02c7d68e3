use camino::Utf8PathBuf;
use thiserror::Error;

/// Error taxonomy of the astrometric differencing pipeline.
///
/// A missing footprint file is reported by the binary and mapped to exit
/// code 1. Unsupported or malformed survey catalogues are fatal. Missing
/// optional quality-filter columns are not errors: the corresponding filter
/// stage is skipped with a warning inside the differencer.
#[derive(Error, Debug)]
pub enum AstrodiffError {
    #[error("Footprint file not found at: {0}")]
    FootprintNotFound(Utf8PathBuf),

    #[error("Invalid footprint row: {0}")]
    InvalidFootprintRow(String),

    #[error("Tile '{0}' not found in the footprint")]
    TileNotInFootprint(String),

    #[error("Tile '{0}' matches {1} footprint rows, expected exactly one")]
    AmbiguousTile(String, usize),

    #[error("Unsupported survey catalogue file type: '{0}' (use .fits or .csv)")]
    UnsupportedFileType(String),

    #[error("Survey catalogue is not in {expected} format: {reason}")]
    WrongCatalogueFormat { expected: String, reason: String },

    #[error("Column '{0}' not found in the survey catalogue")]
    MissingColumn(String),

    #[error("FITS parsing error: {0}")]
    FitsParsingError(String),

    #[error("HDU index {0} out of range: file contains {1} HDUs")]
    HduOutOfRange(usize, usize),

    #[error("HTTP ureq error: {0}")]
    UreqHttpError(#[from] Box<ureq::Error>),

    #[error("Remote catalogue query returned no parsable rows for tile '{0}'")]
    EmptyRemoteCatalogue(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("No per-tile result files found to stack in {0}")]
    EmptyStackInput(Utf8PathBuf),

    #[error("Stacked differences table is empty after the plot restriction")]
    EmptyPlotInput,

    #[error("Worker pool build error: {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),
}

impl From<ureq::Error> for AstrodiffError {
    fn from(err: ureq::Error) -> Self {
        AstrodiffError::UreqHttpError(Box::new(err))
    }
}
