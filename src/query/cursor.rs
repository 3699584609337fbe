//! Pull cursor over the records of a query.

use std::collections::VecDeque;

use super::Query;
use crate::error::Result;
use crate::model::Record;
use crate::session::Session;
use crate::transport::Connector;

/// Yields records one by one, fetching the next page when the buffered one
/// is used up.
#[derive(Debug)]
pub struct RecordCursor<'a, C: Connector> {
    query: &'a mut Query,
    session: &'a mut Session<C>,
    buffered: VecDeque<Record>,
}

impl<'a, C: Connector> RecordCursor<'a, C> {
    pub(super) fn new(query: &'a mut Query, session: &'a mut Session<C>) -> Self {
        Self {
            query,
            session,
            buffered: VecDeque::new(),
        }
    }

    /// Next record, or `None` after the last page.
    pub async fn next(&mut self) -> Result<Option<Record>> {
        loop {
            if let Some(record) = self.buffered.pop_front() {
                return Ok(Some(record));
            }
            if self.query.is_end_of_data() {
                return Ok(None);
            }
            let page = self.query.execute(self.session).await?;
            self.buffered.extend(page);
        }
    }

    /// Read every remaining record.
    pub async fn collect_all(mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await? {
            records.push(record);
        }
        Ok(records)
    }
}
