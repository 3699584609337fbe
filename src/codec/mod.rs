//! Codec module - conversion between wire bytes and text.
//!
//! - [`TextEncoding`] - ISO-8859-1 (default), UTF-8 or US-ASCII
//!
//! # Example
//!
//! ```
//! use epi_client::codec::TextEncoding;
//!
//! let encoded = TextEncoding::Utf8.encode("hello").unwrap();
//! let decoded = TextEncoding::Utf8.decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//! ```

mod text;

pub use text::TextEncoding;
