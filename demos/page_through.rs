//! Page Through - fetch a result set page by page.
//!
//! This example demonstrates:
//! - Loading a session configuration from JSON
//! - Building a selection with the filter builder
//! - Paging through the result with a record cursor
//! - Exporting records as JSON
//!
//! # Running
//!
//! ```text
//! EPI_CONFIG='{"host": "erp01", "mandant": "58", "password": "secret"}' \
//!     cargo run --example page_through -- VAAG
//! ```

use epi_client::selection::OrderDirection;
use epi_client::{Filter, Session, SessionConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::var("EPI_CONFIG") {
        Ok(json) => SessionConfig::from_json(&json)?,
        Err(_) => SessionConfig::default(),
    };
    let keyword = std::env::args().nth(1).unwrap_or_else(|| "A".to_string());

    let mut session = Session::builder().config(config).build()?;
    session.set_status_sink(|cmd| eprintln!("server: {}", cmd.field(0)));

    // Articles whose keyword is at least the given one, 20 per page
    let selection = Filter::field("swd")
        .ge(keyword.as_str())
        .to_selection(0, [1])
        .with_fields(["idno", "bezeich"])
        .with_order_field("swd")
        .with_direction(OrderDirection::Ascending)
        .with_paging(20);

    let mut query = session.create_query(selection).await?;
    let mut records = query.records(&mut session);
    let mut count = 0;
    while let Some(record) = records.next().await? {
        println!("{}", record.to_json()?);
        count += 1;
    }
    eprintln!("{count} records");

    query.close(&mut session).await?;
    session.close().await?;
    Ok(())
}
