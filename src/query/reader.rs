//! Page reader - turns the frames of one response into records.

use crate::error::{EpiError, Result};
use crate::model::{FieldList, MetadataKind, Record};
use crate::protocol::{fields, parse_flag, words, Command};

/// Records of one response plus the end-of-data flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    records: Vec<Record>,
    success: bool,
    end_of_data: bool,
    estimated_count: Option<u32>,
    fields: FieldList,
}

impl Page {
    /// Records in server order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Take the records.
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// The server reported success.
    pub fn success(&self) -> bool {
        self.success
    }

    /// No further page follows.
    pub fn is_end_of_data(&self) -> bool {
        self.end_of_data
    }

    /// Total number of hits announced by the server, if any.
    pub fn estimated_count(&self) -> Option<u32> {
        self.estimated_count
    }

    /// Field list as it was after reading the page.
    pub fn fields(&self) -> &FieldList {
        &self.fields
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the page has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl IntoIterator for Page {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Record a continuation frame extends.
#[derive(Debug, Clone, Copy)]
struct OpenRecord {
    index: usize,
    field: Option<usize>,
}

/// Reader state that spans the pages of one query execution.
#[derive(Debug, Clone, Default)]
pub(crate) struct PageReader {
    /// The field list is built from `NAME` metadata.
    discover: bool,
    /// A data frame of this execution has been read.
    data_seen: bool,
}

impl PageReader {
    pub(crate) fn new(discover: bool) -> Self {
        Self {
            discover,
            data_seen: false,
        }
    }

    pub(crate) fn is_discovering(&self) -> bool {
        self.discover
    }

    /// Read the drained frames of one response.
    ///
    /// # Errors
    ///
    /// - [`EpiError::Protocol`] for metadata after data, a continuation
    ///   without an open record, a malformed flag or an unsupported word
    /// - [`EpiError::MissingTerminal`] if no `EOD` frame is present
    pub(crate) fn read(&mut self, frames: Vec<Command>, list: &mut FieldList) -> Result<Page> {
        let mut page = Page::default();
        let mut open: Option<OpenRecord> = None;

        for frame in frames {
            match frame.word() {
                words::BEGIN_OF_DATA => {
                    page.estimated_count = frame
                        .field(fields::BOD_NUM_RECORDS_TOTAL)
                        .trim()
                        .parse()
                        .ok();
                }
                words::META_DATA => self.read_metadata(&frame, list)?,
                words::DATA => {
                    self.data_seen = true;
                    let mut record = Record::new();
                    let field = fill(&mut record, list, 0, frame.fields());
                    page.records.push(record);
                    open = (!frame.is_completed()).then_some(OpenRecord {
                        index: page.records.len() - 1,
                        field,
                    });
                }
                words::DATA_CONTINUATION => {
                    self.data_seen = true;
                    let Some(current) = open else {
                        return Err(EpiError::Protocol(format!(
                            "continuation without an open record, CMD: {frame}"
                        )));
                    };
                    let record = &mut page.records[current.index];
                    let field = continue_record(record, list, current.field, frame.fields());
                    open = (!frame.is_completed()).then_some(OpenRecord {
                        index: current.index,
                        field,
                    });
                }
                words::END_OF_DATA => {
                    page.success = parse_flag(frame.field(fields::EOD_OK_FLAG))?;
                    page.end_of_data = parse_flag(frame.field(fields::EOD_EOF_FLAG))?;
                    tracing::trace!(
                        records = frame.field(fields::EOD_NUM_RECORDS),
                        end_of_data = page.end_of_data,
                        "End of page"
                    );
                    page.fields = list.clone();
                    return Ok(page);
                }
                _ => {
                    return Err(EpiError::Protocol(format!(
                        "command word {} is not supported by the query reader, CMD: {frame}",
                        frame.word()
                    )));
                }
            }
        }

        Err(EpiError::MissingTerminal)
    }

    fn read_metadata(&mut self, frame: &Command, list: &mut FieldList) -> Result<()> {
        if self.data_seen {
            return Err(EpiError::Protocol(format!(
                "metadata after data is not supported, CMD: {frame}"
            )));
        }

        let keyword = frame.field(fields::DM_META_DATA_TYPE);
        let Some(kind) = MetadataKind::parse(keyword) else {
            tracing::debug!("Ignoring unknown metadata kind {}", keyword);
            return Ok(());
        };
        let values = frame.fields().get(1..).unwrap_or_default();

        if self.discover && kind == MetadataKind::Name {
            list.extend_discovered(values)
        } else {
            list.apply_metadata(kind, values)
        }
    }
}

/// Store `values` from position `start` on; returns the last position filled.
fn fill(record: &mut Record, list: &FieldList, start: usize, values: &[String]) -> Option<usize> {
    let mut last = None;
    for (pos, value) in (start..).zip(values) {
        match list.get(pos) {
            Some(field) => {
                record.insert(field.clone(), value.as_str());
                last = Some(pos);
            }
            None => {
                tracing::trace!("Dropping value at position {} without a field", pos);
            }
        }
    }
    last
}

fn continue_record(
    record: &mut Record,
    list: &FieldList,
    open_field: Option<usize>,
    values: &[String],
) -> Option<usize> {
    match (open_field, values.split_first()) {
        (Some(pos), Some((fragment, rest))) => {
            record.append(pos, fragment);
            fill(record, list, pos + 1, rest).or(Some(pos))
        }
        (Some(pos), None) => Some(pos),
        (None, _) => fill(record, list, 0, values),
    }
}
