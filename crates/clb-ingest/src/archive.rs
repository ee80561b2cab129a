//! Delimited core-file reader
//!
//! Reads a text file whose header row names Darwin Core terms and yields one
//! [`TaxonRecord`] per data row. Only the columns the tree builder needs are
//! mapped to typed fields; every other column is kept as a passthrough term.
//!
//! # Format
//! ```text
//! taxonID  parentNameUsageID  acceptedNameUsageID  scientificName  taxonRank
//! 1        \N                 \N                   Animalia        kingdom
//! 2        1                  \N                   Chordata        phylum
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use clb_common::{ClbError, Result};
use tracing::{debug, warn};

use crate::models::TaxonRecord;

const TAXON_ID: &str = "taxonID";
const CORE_ID: &str = "id";
const SCIENTIFIC_NAME: &str = "scientificName";
const TAXON_RANK: &str = "taxonRank";
const PARENT: &str = "parentNameUsageID";
const ACCEPTED: &str = "acceptedNameUsageID";
const ORIGINAL_NAME: &str = "originalNameUsageID";

/// Reduce a qualified term URI such as `http://rs.tdwg.org/dwc/terms/taxonID`
/// to its simple name
pub fn term_name(header: &str) -> &str {
    let header = header.trim().trim_start_matches('\u{feff}');
    match header.rfind(['/', '#']) {
        Some(idx) => &header[idx + 1..],
        None => header,
    }
}

/// Column positions resolved from the header row
#[derive(Debug, Clone, Default)]
struct Columns {
    id: usize,
    name: Option<usize>,
    rank: Option<usize>,
    parent: Option<usize>,
    accepted: Option<usize>,
    basionym: Option<usize>,
    passthrough: Vec<(usize, String)>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let terms: Vec<&str> = headers.iter().map(term_name).collect();
        let position = |term: &str| terms.iter().position(|t| *t == term);

        let id = match (position(TAXON_ID), position(CORE_ID)) {
            (Some(idx), _) => idx,
            (None, Some(idx)) => {
                warn!("No {} column, using the core {} column instead", TAXON_ID, CORE_ID);
                idx
            },
            (None, None) => {
                return Err(ClbError::parse(format!(
                    "header has neither a {} nor an {} column",
                    TAXON_ID, CORE_ID
                )))
            },
        };

        let mut columns = Self {
            id,
            name: position(SCIENTIFIC_NAME),
            rank: position(TAXON_RANK),
            parent: position(PARENT),
            accepted: position(ACCEPTED),
            basionym: position(ORIGINAL_NAME),
            passthrough: Vec::new(),
        };

        let mapped = [
            Some(columns.id),
            columns.name,
            columns.rank,
            columns.parent,
            columns.accepted,
            columns.basionym,
        ];
        columns.passthrough = terms
            .iter()
            .enumerate()
            .filter(|(idx, term)| !mapped.contains(&Some(*idx)) && **term != CORE_ID && !term.is_empty())
            .map(|(idx, term)| (idx, term.to_string()))
            .collect();

        Ok(columns)
    }

    fn record(&self, row: &csv::StringRecord) -> TaxonRecord {
        let field = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(str::to_string);

        let mut record = TaxonRecord::new(row.get(self.id).unwrap_or_default());
        record.scientific_name = field(self.name);
        record.taxon_rank = field(self.rank);
        record.parent_id = field(self.parent);
        record.accepted_id = field(self.accepted);
        record.basionym_id = field(self.basionym);
        for (idx, term) in &self.passthrough {
            if let Some(value) = row.get(*idx) {
                record.properties.insert(term.clone(), value.to_string());
            }
        }
        record
    }
}

fn csv_error(e: csv::Error) -> ClbError {
    let message = e.to_string();
    match e.into_kind() {
        csv::ErrorKind::Io(io) => ClbError::Io(io),
        _ => ClbError::parse(message),
    }
}

/// Streaming reader over a delimited core file
pub struct CoreFileReader<R: Read> {
    rows: csv::StringRecordsIntoIter<R>,
    columns: Columns,
    line: u64,
}

impl CoreFileReader<File> {
    /// Open a core file on disk
    pub fn open(path: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening core file {}", path.display());
        Self::from_reader(File::open(path)?, delimiter)
    }
}

impl<R: Read> CoreFileReader<R> {
    pub fn from_reader(reader: R, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            // tab files carry literal quotes in names
            .quoting(delimiter != b'\t')
            .from_reader(reader);

        let columns = Columns::from_headers(reader.headers().map_err(csv_error)?)?;
        debug!(
            passthrough = columns.passthrough.len(),
            "Resolved core file columns"
        );

        Ok(Self {
            rows: reader.into_records(),
            columns,
            line: 1,
        })
    }

    /// Passthrough term names, in column order
    pub fn passthrough_terms(&self) -> impl Iterator<Item = &str> {
        self.columns.passthrough.iter().map(|(_, term)| term.as_str())
    }
}

impl<R: Read> Iterator for CoreFileReader<R> {
    type Item = Result<TaxonRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(e) => return Some(Err(csv_error(e))),
        };
        self.line += 1;

        let record = self.columns.record(&row).normalized().ok_or_else(|| {
            ClbError::parse(format!("line {}: missing taxon identifier", self.line))
        });
        Some(record)
    }
}
