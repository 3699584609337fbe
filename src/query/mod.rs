//! Query module - executes one selection and pages through its result.
//!
//! A [`Query`] is created by [`Session::create_query`] and owns one action
//! id. Each [`execute`](Query::execute) fetches one [`Page`]: the first call
//! sends the query, later calls ask for the next page until the server
//! reports the end of data.
//!
//! ```text
//! Idle ──execute──► Executing ──execute──► Continuing ─┐
//!                       │                      ▲   │    │ execute
//!                       │                      └───┘◄───┘
//!                       └──────── end of data ─────────► EndOfData
//! Executing/Continuing ──break_execution──► Broken
//! any state ──reset──► Idle
//! ```

mod cursor;
mod reader;

pub use cursor::RecordCursor;
pub use reader::Page;

use reader::PageReader;

use crate::error::{EpiError, Result};
use crate::model::{FieldList, Record};
use crate::selection::Selection;
use crate::session::{QueryRequest, Session};
use crate::transport::Connector;

/// Execution state of a [`Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryState {
    /// Not sent yet.
    Idle,
    /// First page fetched.
    Executing,
    /// Later pages fetched.
    Continuing,
    /// The server delivered the last page.
    EndOfData,
    /// Cancelled before the end of data.
    Broken,
}

/// One query and its paging state.
#[derive(Debug, Clone)]
pub struct Query {
    selection: Selection,
    action_id: u32,
    state: QueryState,
    fields: FieldList,
    with_metadata: bool,
    reader: PageReader,
}

impl Query {
    /// Create a query for a selection on an allocated action id.
    ///
    /// Prefer [`Session::create_query`], which allocates the id.
    pub fn new(selection: Selection, action_id: u32) -> Self {
        let fields = selection.fields().clone();
        Self {
            selection,
            action_id,
            state: QueryState::Idle,
            fields,
            with_metadata: false,
            reader: PageReader::default(),
        }
    }

    /// The selection this query runs.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Action id of the query's frames.
    pub fn action_id(&self) -> u32 {
        self.action_id
    }

    /// Current state.
    pub fn state(&self) -> QueryState {
        self.state
    }

    /// Whether the last page has been fetched.
    pub fn is_end_of_data(&self) -> bool {
        self.state == QueryState::EndOfData
    }

    /// Fields of the result; filled by the server if none were selected.
    pub fn fields(&self) -> &FieldList {
        &self.fields
    }

    /// Edit the field list before the query is sent.
    ///
    /// # Errors
    ///
    /// Returns a usage error unless the query is idle.
    pub fn fields_mut(&mut self) -> Result<&mut FieldList> {
        if self.state != QueryState::Idle {
            return Err(EpiError::Usage(
                "the field list can only be changed before the query is executed".to_string(),
            ));
        }
        Ok(&mut self.fields)
    }

    /// Request metadata frames even with an explicit field list.
    pub fn set_with_metadata(&mut self, with_metadata: bool) {
        self.with_metadata = with_metadata;
    }

    /// Fetch the next page.
    ///
    /// # Errors
    ///
    /// - [`EpiError::Usage`] after the end of data or once broken
    /// - [`EpiError::Rejected`] if the server refuses the request
    /// - any protocol error of the page reader
    pub async fn execute<C: Connector>(&mut self, session: &mut Session<C>) -> Result<Page> {
        session.ensure_open().await?;

        let frames = match self.state {
            QueryState::Idle => {
                self.reader = PageReader::new(self.fields.is_empty());
                let selection = self.selection.to_string();
                let fields = self.fields.to_string();
                let limit = if self.selection.paging() {
                    self.selection.page_size()
                } else {
                    0
                };
                let request = QueryRequest {
                    selection: &selection,
                    fields: &fields,
                    with_metadata: self.with_metadata,
                    limit,
                    offset: self.selection.offset(),
                    language: self.selection.language(),
                };
                let frames = session.execute_query(self.action_id, &request).await?;
                self.state = QueryState::Executing;
                frames
            }
            QueryState::Executing | QueryState::Continuing => {
                let frames = session.get_next_record(self.action_id).await?;
                self.state = QueryState::Continuing;
                frames
            }
            QueryState::EndOfData => {
                return Err(EpiError::Usage(
                    "query has already reached the end of data".to_string(),
                ));
            }
            QueryState::Broken => {
                return Err(EpiError::Usage(
                    "query was broken, reset it before executing again".to_string(),
                ));
            }
        };

        let page = self.reader.read(frames, &mut self.fields)?;
        if page.is_end_of_data() {
            self.state = QueryState::EndOfData;
            session.remove_channel(self.action_id);
        }
        tracing::debug!(
            action_id = self.action_id,
            records = page.len(),
            end_of_data = page.is_end_of_data(),
            "Page read"
        );
        Ok(page)
    }

    /// Fetch pages until the first record arrives.
    ///
    /// A query that has not reached the end of data is broken afterwards.
    pub async fn get_first_record<C: Connector>(
        &mut self,
        session: &mut Session<C>,
    ) -> Result<Option<Record>> {
        loop {
            let page = self.execute(session).await?;
            if let Some(record) = page.into_records().into_iter().next() {
                if !self.is_end_of_data() {
                    self.break_execution(session).await?;
                }
                return Ok(Some(record));
            }
            if self.is_end_of_data() {
                return Ok(None);
            }
        }
    }

    /// Cancel a running query.
    ///
    /// The channel stays registered, so frames the server still sends for
    /// this id are queued until [`close`](Self::close).
    pub async fn break_execution<C: Connector>(&mut self, session: &mut Session<C>) -> Result<()> {
        if matches!(self.state, QueryState::Executing | QueryState::Continuing) {
            session.break_query_execution(self.action_id).await?;
            self.state = QueryState::Broken;
        }
        Ok(())
    }

    /// Return to [`QueryState::Idle`]; the next execute sends the query again.
    ///
    /// Field names discovered from the server are forgotten.
    pub fn reset(&mut self) {
        if self.reader.is_discovering() {
            self.fields.clear();
        }
        self.reader = PageReader::default();
        self.state = QueryState::Idle;
    }

    /// Break the query if it is running and release its channel.
    pub async fn close<C: Connector>(&mut self, session: &mut Session<C>) -> Result<()> {
        self.break_execution(session).await?;
        session.remove_channel(self.action_id);
        Ok(())
    }

    /// Iterate over all records, fetching pages as needed.
    pub fn records<'a, C: Connector>(
        &'a mut self,
        session: &'a mut Session<C>,
    ) -> RecordCursor<'a, C> {
        RecordCursor::new(self, session)
    }
}
