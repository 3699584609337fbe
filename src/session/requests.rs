//! Request frames sent by a session.

use crate::protocol::{words, Command};
use crate::selection::Language;

/// Parameters of a query execution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest<'a> {
    /// Compiled selection text.
    pub selection: &'a str,
    /// Field list text; empty selects all fields.
    pub fields: &'a str,
    /// Request metadata frames even with an explicit field list.
    pub with_metadata: bool,
    /// Records per page (0 = server default).
    pub limit: u32,
    /// Records skipped at the start.
    pub offset: u32,
    /// Field name language.
    pub language: Language,
}

impl QueryRequest<'_> {
    /// Metadata is always requested when the server has to name the fields.
    pub fn metadata_flag(&self) -> bool {
        self.fields.is_empty() || self.with_metadata
    }
}

fn request(word: &str, action_id: u32, fields: Vec<String>) -> Command {
    Command::from_parts(word.to_string(), action_id, fields, true)
}

fn count_or_blank(value: u32) -> String {
    if value > 0 {
        value.to_string()
    } else {
        String::new()
    }
}

pub(crate) fn change_mandant(action_id: u32, mandant: &str) -> Command {
    request(words::CHANGE_MANDANT, action_id, vec![mandant.to_string()])
}

pub(crate) fn logon(action_id: u32, password: &str, mandant: &str, version: &str) -> Command {
    let mut fields = vec![password.to_string(), mandant.to_string(), version.to_string()];
    fields.extend(std::iter::repeat(String::new()).take(5));
    fields.push("0".to_string());
    fields.push("USER".to_string());
    request(words::LOGON, action_id, fields)
}

pub(crate) fn set_option(action_id: u32, name: &str, value: &str) -> Command {
    request(
        words::SET_OPTION,
        action_id,
        vec![name.to_string(), value.to_string()],
    )
}

pub(crate) fn show_option(action_id: u32, name: &str) -> Command {
    request(
        words::SHOW_OPTIONS,
        action_id,
        vec![name.to_string(), "0".to_string()],
    )
}

pub(crate) fn execute_query(action_id: u32, query: &QueryRequest<'_>) -> Command {
    let mut fields = vec![
        query.selection.to_string(),
        query.fields.to_string(),
        count_or_blank(query.limit),
        count_or_blank(query.offset),
    ];
    fields.extend(std::iter::repeat(String::new()).take(4));
    fields.push(if query.metadata_flag() { "1" } else { "0" }.to_string());
    fields.push(query.language.code().to_string());
    request(words::EXECUTE_QUERY, action_id, fields)
}

pub(crate) fn get_next_record(action_id: u32) -> Command {
    request(words::GET_NEXT_RECORD, action_id, Vec::new())
}

pub(crate) fn break_query_execution(action_id: u32) -> Command {
    request(words::BREAK_QUERY_EXECUTION, action_id, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::LineCodec;

    fn line(cmd: &Command) -> String {
        LineCodec::default().encode(cmd)
    }

    #[test]
    fn test_handshake_lines() {
        assert_eq!(line(&change_mandant(1, "58")), "CHM|1|58|");
        assert_eq!(
            line(&logon(1, "pw", "58", "3.51")),
            "LGN|1|pw|58|3.51||||||0|USER|"
        );
    }

    #[test]
    fn test_option_lines() {
        assert_eq!(line(&set_option(1, "FLDSEP", "!")), "SET|1|FLDSEP|!|");
        assert_eq!(line(&show_option(1, "CHARSET")), "SHO|1|CHARSET|0|");
    }

    #[test]
    fn test_execute_query_line() {
        let query = QueryRequest {
            selection: "0:1,@link=(And);@lang=EN",
            fields: "swd,idno",
            with_metadata: false,
            limit: 2,
            offset: 0,
            language: Language::English,
        };
        assert_eq!(
            line(&execute_query(3, &query)),
            "EXQ|3|0:1,@link=(And);@lang=EN|swd,idno|2||||||0|EN|"
        );
    }

    #[test]
    fn test_metadata_flag() {
        let mut query = QueryRequest {
            selection: "",
            fields: "",
            with_metadata: false,
            limit: 0,
            offset: 0,
            language: Language::German,
        };
        assert!(query.metadata_flag());

        query.fields = "swd";
        assert!(!query.metadata_flag());

        query.with_metadata = true;
        assert!(query.metadata_flag());
    }

    #[test]
    fn test_cursor_lines() {
        assert_eq!(line(&get_next_record(4)), "GNR|4|");
        assert_eq!(line(&break_query_execution(4)), "BRQ|4|");
    }
}
