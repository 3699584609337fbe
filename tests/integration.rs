//! Integration tests for epi-client.
//!
//! Each test runs a session against a scripted in-memory server that checks
//! every request line and answers with canned frames.

use std::sync::{Arc, Mutex};

use epi_client::selection::Language;
use epi_client::transport::StreamConnector;
use epi_client::{
    Condition, EpiError, Filter, QueryState, Selection, Session, SessionConfig, TextEncoding,
};
use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

enum Step {
    Reply(String),
    Expect(String),
}

fn reply(text: impl Into<String>) -> Step {
    Step::Reply(text.into())
}

fn expect(line: impl Into<String>) -> Step {
    Step::Expect(line.into())
}

fn spawn_server(stream: DuplexStream, script: Vec<Step>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(stream);
        let mut lines = BufReader::new(read).lines();
        for step in script {
            match step {
                Step::Reply(text) => write.write_all(text.as_bytes()).await.unwrap(),
                Step::Expect(line) => {
                    let got = lines.next_line().await.unwrap();
                    assert_eq!(got.as_deref(), Some(line.as_str()));
                }
            }
        }
    })
}

fn config() -> SessionConfig {
    SessionConfig {
        mandant: "58".to_string(),
        password: "pw".to_string(),
        ..Default::default()
    }
}

fn logon() -> Vec<Step> {
    vec![
        reply("EPI server 3.51 ready\n"),
        expect("CHM|1|58|"),
        reply("ACK|1|\n"),
        expect("LGN|1|pw|58|3.51||||||0|USER|"),
        reply("ACK|1|\n"),
    ]
}

fn end() -> Vec<Step> {
    vec![expect("END|"), reply("END|bye|0|\n")]
}

fn script(parts: impl IntoIterator<Item = Vec<Step>>) -> Vec<Step> {
    parts.into_iter().flatten().collect()
}

fn connect(
    config: SessionConfig,
    script: Vec<Step>,
) -> (Session<StreamConnector<DuplexStream>>, JoinHandle<()>) {
    let (client, server) = duplex(4096);
    let session = Session::with_connector(config, StreamConnector::new(client));
    (session, spawn_server(server, script))
}

fn paged_selection() -> Selection {
    Selection::new(0, [1]).with_fields(["swd"]).with_paging(1)
}

fn paged_exq(action_id: u32) -> String {
    format!(
        "EXQ|{action_id}|0:1,@link=(And);@rows=(No);@filingmode=(Active);@lang=EN|swd|1||||||0|EN|"
    )
}

#[tokio::test]
async fn test_logon_and_close() {
    let (mut session, server) = connect(config(), script([logon(), end()]));

    session.open().await.unwrap();
    assert!(session.is_connected());

    session.close().await.unwrap();
    assert!(!session.is_connected());
    server.await.unwrap();
}

#[tokio::test]
async fn test_close_rejected() {
    let (mut session, server) = connect(
        config(),
        script([logon(), vec![expect("END|"), reply("NAK|1|busy|\n")]]),
    );

    session.open().await.unwrap();
    let err = session.close().await.unwrap_err();
    match err {
        EpiError::Rejected { context, response } => {
            assert_eq!(context, "server doesn't accept end command");
            assert_eq!(response.unwrap().word(), "NAK");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!session.is_connected());
    server.await.unwrap();
}

#[tokio::test]
async fn test_change_mandant_rejected() {
    let (mut session, server) = connect(
        config(),
        vec![
            reply("EPI server 3.51 ready\n"),
            expect("CHM|1|58|"),
            reply("NAK|1|unknown mandant|\n"),
        ],
    );

    let err = session.open().await.unwrap_err();
    assert!(matches!(err, EpiError::Rejected { ref context, .. } if context == "change mandant failed"));
    assert!(!session.is_connected());
    server.await.unwrap();
}

#[tokio::test]
async fn test_options() {
    let (mut session, server) = connect(
        config(),
        script([
            logon(),
            vec![
                expect("SET|1|TIMEOUT|30|"),
                reply("ACK|1|\n"),
                expect("SET|1|READONLY|1|"),
                reply("NAK|1|not allowed|\n"),
                expect("SHO|1|TIMEOUT|0|"),
                reply("D|1|TIMEOUT|30|\nEOD|1|1|1|1|\n"),
                expect("SHO|1|TWICE|0|"),
                reply("D|1|TWICE|a|\nD|1|TWICE|b|\nEOD|1|1|2|1|\n"),
            ],
            end(),
        ]),
    );

    // options open the session lazily
    session.set_option("TIMEOUT", "30").await.unwrap();
    assert!(session.is_connected());
    assert!(!session.try_set_option("READONLY", "1").await.unwrap());
    assert_eq!(session.get_option_value("TIMEOUT").await.unwrap(), "30");

    let err = session.get_option_value("TWICE").await.unwrap_err();
    assert!(matches!(err, EpiError::Protocol(_)));

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_separator_and_encoding_negotiated_after_logon() {
    let config = SessionConfig {
        field_separator: '!',
        encoding: TextEncoding::Utf8,
        ..config()
    };
    let (mut session, server) = connect(
        config,
        script([
            logon(),
            vec![
                expect("SET|1|FLDSEP|!|"),
                reply("ACK|1|\n"),
                expect("SET!1!CHARSET!utf-8!"),
                reply("ACK!1!\n"),
                expect("SHO!1!CHARSET!0!"),
                reply("D!1!CHARSET!utf-8!\nEOD!1!1!1!1!\n"),
                expect("END!"),
                reply("END!bye!0!\n"),
            ],
        ]),
    );

    session.open().await.unwrap();
    assert_eq!(session.get_option_value("CHARSET").await.unwrap(), "utf-8");
    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_paging_until_end_of_data() {
    let (mut session, server) = connect(
        config(),
        script([
            logon(),
            vec![
                expect(paged_exq(2)),
                reply("BOD|2|2|\nD|2|A|\nEOD|2|1|1|0|\n"),
                expect("GNR|2|"),
                reply("D|2|B|\nEOD|2|1|1|0|\n"),
                expect("GNR|2|"),
                reply("EOD|2|1|0|1|\n"),
            ],
            end(),
        ]),
    );

    let mut query = session.create_query(paged_selection()).await.unwrap();
    assert_eq!(query.action_id(), 2);

    let first = query.execute(&mut session).await.unwrap();
    assert_eq!(first.estimated_count(), Some(2));
    assert_eq!(first.records()[0].get("swd").unwrap(), "A");
    assert_eq!(query.state(), QueryState::Executing);
    assert!(session.has_channel(2));

    let second = query.execute(&mut session).await.unwrap();
    assert_eq!(second.records()[0].get("swd").unwrap(), "B");
    assert_eq!(query.state(), QueryState::Continuing);

    let last = query.execute(&mut session).await.unwrap();
    assert!(last.is_empty());
    assert!(last.is_end_of_data());
    assert!(query.is_end_of_data());
    // a finished query releases its channel
    assert!(!session.has_channel(2));

    let err = query.execute(&mut session).await.unwrap_err();
    assert!(matches!(err, EpiError::Usage(_)));

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_record_cursor() {
    let (mut session, server) = connect(
        config(),
        script([
            logon(),
            vec![
                expect(paged_exq(2)),
                reply("D|2|A|\nEOD|2|1|1|0|\n"),
                expect("GNR|2|"),
                reply("D|2|B|\nEOD|2|1|1|1|\n"),
            ],
            end(),
        ]),
    );

    let mut query = session.create_query(paged_selection()).await.unwrap();
    let records = query.records(&mut session).collect_all().await.unwrap();
    let values: Vec<_> = records.iter().map(|r| r.get("swd").unwrap()).collect();
    assert_eq!(values, ["A", "B"]);

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_discovered_fields_and_continuation() {
    let exq = "EXQ|2|0:1,@link=(And);@rows=(No);@filingmode=(Active);@lang=DE||||||||1|DE|";
    let (mut session, server) = connect(
        config(),
        script([
            logon(),
            vec![
                expect(exq),
                reply(
                    "DM|2|NAME|swd|bem|\nDM|2|DESC|Keyword|Remark|\n\
                     D|2|VAAG|first \nDC|2|line, second|\nEOD|2|1|1|1|\n",
                ),
            ],
            end(),
        ]),
    );

    let mut query = session
        .create_query(Selection::new(0, [1]).with_language(Language::German))
        .await
        .unwrap();
    let page = query.execute(&mut session).await.unwrap();

    assert_eq!(query.fields().to_string(), "swd,bem");
    assert_eq!(query.fields()[1].description(), Some("Remark"));
    assert_eq!(page.len(), 1);
    assert_eq!(page.records()[0].get("bem").unwrap(), "first line, second");

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_metadata_after_data_leaves_fields_untouched() {
    let (mut session, server) = connect(
        config(),
        script([
            logon(),
            vec![
                expect(paged_exq(2)),
                reply("D|2|A|\nDM|2|DESC|Keyword|\nEOD|2|1|1|1|\n"),
            ],
        ]),
    );

    let mut query = session.create_query(paged_selection()).await.unwrap();
    let err = query.execute(&mut session).await.unwrap_err();
    assert!(matches!(err, EpiError::Protocol(_)));
    assert_eq!(query.fields()[0].description(), None);
    server.await.unwrap();
}

#[tokio::test]
async fn test_unknown_action_id() {
    let (mut session, server) = connect(
        config(),
        script([logon(), vec![expect(paged_exq(2)), reply("D|9|x|\n")]]),
    );

    let mut query = session.create_query(paged_selection()).await.unwrap();
    let err = query.execute(&mut session).await.unwrap_err();
    match err {
        EpiError::UnknownActionId { action_id, .. } => assert_eq!(action_id, 9),
        other => panic!("unexpected error: {other}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_server_error_frame() {
    let (mut session, server) = connect(
        config(),
        script([
            logon(),
            vec![expect(paged_exq(2)), reply("E|2|selection is invalid|\n")],
        ]),
    );

    let mut query = session.create_query(paged_selection()).await.unwrap();
    let err = query.execute(&mut session).await.unwrap_err();
    match err {
        EpiError::Server { message, command } => {
            assert_eq!(message, "selection is invalid");
            assert_eq!(command.action_id(), 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(query.state(), QueryState::Idle);
    server.await.unwrap();
}

#[tokio::test]
async fn test_query_refused() {
    let (mut session, server) = connect(
        config(),
        script([
            logon(),
            vec![expect(paged_exq(2)), reply("NAK|2|no rights|\n")],
            end(),
        ]),
    );

    let mut query = session.create_query(paged_selection()).await.unwrap();
    let err = query.execute(&mut session).await.unwrap_err();
    match err {
        EpiError::Rejected { context, response } => {
            assert_eq!(context, "query execution failed");
            assert_eq!(response.unwrap().field(0), "no rights");
        }
        other => panic!("unexpected error: {other}"),
    }

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_status_sink() {
    let (mut session, server) = connect(
        config(),
        script([
            logon(),
            vec![
                expect(paged_exq(2)),
                reply("S|2|searching|\nP|2|50|\nEOD|2|1|0|1|\n"),
            ],
            end(),
        ]),
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    session.set_status_sink(move |cmd| {
        sink.lock()
            .unwrap()
            .push(format!("{}:{}", cmd.word(), cmd.field(0)));
    });

    let mut query = session.create_query(paged_selection()).await.unwrap();
    let page = query.execute(&mut session).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(*seen.lock().unwrap(), ["S:searching", "P:50"]);

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_get_first_record_breaks_query() {
    let (mut session, server) = connect(
        config(),
        script([
            logon(),
            vec![
                expect(paged_exq(2)),
                reply("BOD|2|5|\nD|2|A|\nEOD|2|1|1|0|\n"),
                expect("BRQ|2|"),
            ],
            end(),
        ]),
    );

    let mut query = session.create_query(paged_selection()).await.unwrap();
    let record = query.get_first_record(&mut session).await.unwrap().unwrap();
    assert_eq!(record.get("swd").unwrap(), "A");
    assert_eq!(query.state(), QueryState::Broken);

    let err = query.execute(&mut session).await.unwrap_err();
    assert!(matches!(err, EpiError::Usage(_)));

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_late_end_of_data_after_break() {
    let (mut session, server) = connect(
        config(),
        script([
            logon(),
            vec![
                expect(paged_exq(2)),
                reply("BOD|2|5|\nD|2|A|\nEOD|2|1|1|0|\n"),
                expect("BRQ|2|"),
                // the server still finishes the cancelled query
                reply("EOD|2|1|0|1|\n"),
                expect("SHO|1|TIMEOUT|0|"),
                reply("D|1|TIMEOUT|30|\nEOD|1|1|1|1|\n"),
            ],
            end(),
        ]),
    );

    let mut query = session.create_query(paged_selection()).await.unwrap();
    query.get_first_record(&mut session).await.unwrap().unwrap();
    assert_eq!(query.state(), QueryState::Broken);
    assert!(session.has_channel(2));

    assert_eq!(session.get_option_value("TIMEOUT").await.unwrap(), "30");

    query.close(&mut session).await.unwrap();
    assert!(!session.has_channel(2));

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_lazy_open_keeps_action_ids_apart() {
    let (mut session, server) = connect(
        config(),
        script([
            logon(),
            vec![
                expect(paged_exq(2)),
                reply("D|2|A|\nEOD|2|1|1|0|\n"),
                expect(paged_exq(3)),
                reply("D|3|B|\nEOD|3|1|1|0|\n"),
            ],
            end(),
        ]),
    );

    // the first query opens the session
    let mut first = session.create_query(paged_selection()).await.unwrap();
    first.execute(&mut session).await.unwrap();
    assert_eq!(first.state(), QueryState::Executing);

    let mut second = session.create_query(paged_selection()).await.unwrap();
    assert_ne!(first.action_id(), second.action_id());
    assert_eq!(second.action_id(), 3);
    second.execute(&mut session).await.unwrap();

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_interleaved_queries() {
    let (mut session, server) = connect(
        config(),
        script([
            logon(),
            vec![
                expect(paged_exq(2)),
                reply("D|2|A1|\nEOD|2|1|1|0|\n"),
                expect(paged_exq(3)),
                reply("D|3|B1|\nEOD|3|1|1|0|\n"),
                expect("GNR|3|"),
                reply("S|2|still busy|\nD|2|stale|\nD|3|B2|\nEOD|3|1|1|1|\n"),
                expect("GNR|2|"),
                reply("D|2|A2|\nEOD|2|1|1|1|\n"),
            ],
            end(),
        ]),
    );

    let mut a = session.create_query(paged_selection()).await.unwrap();
    let mut b = session.create_query(paged_selection()).await.unwrap();
    assert_eq!((a.action_id(), b.action_id()), (2, 3));

    let page = a.execute(&mut session).await.unwrap();
    assert_eq!(page.records()[0].get("swd").unwrap(), "A1");
    let page = b.execute(&mut session).await.unwrap();
    assert_eq!(page.records()[0].get("swd").unwrap(), "B1");

    // a frame for the other query is routed to its channel
    let page = b.execute(&mut session).await.unwrap();
    let values: Vec<_> = page.records().iter().map(|r| r.get("swd").unwrap()).collect();
    assert_eq!(values, ["B2"]);
    assert!(b.is_end_of_data());
    assert!(!session.has_channel(3));
    assert!(session.has_channel(2));

    // the next request for the first query discards what was queued before
    let page = a.execute(&mut session).await.unwrap();
    let values: Vec<_> = page.records().iter().map(|r| r.get("swd").unwrap()).collect();
    assert_eq!(values, ["A2"]);
    assert!(a.is_end_of_data());

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_filter_lowering_on_the_wire() {
    let exq = "EXQ|2|0:1,swd==VAAG;idno=!100;@link=(Or);@rows=(No);@filingmode=(Filed);\
               @lang=EN|swd,idno|||||||0|EN|";
    let (mut session, server) = connect(
        config(),
        script([
            logon(),
            vec![expect(exq), reply("D|2|VAAG|99|\nEOD|2|1|1|1|\n")],
            end(),
        ]),
    );

    let filter = Filter::field("swd")
        .eq("VAAG")
        .or(Filter::field("idno").gt(100).not())
        .and(Filter::field("recordFiled").is_true());
    let mut query = session.create_query(filter.to_selection(0, [1])).await.unwrap();

    let record = query.get_first_record(&mut session).await.unwrap().unwrap();
    assert_eq!(record.get_as::<u32>("idno").unwrap(), 99);
    assert!(query.is_end_of_data());

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_reopen_closes_previous_connection() {
    let (first_client, first_server) = duplex(4096);
    let (second_client, second_server) = duplex(4096);
    let first = spawn_server(first_server, script([logon(), end()]));
    let second = spawn_server(second_server, script([logon(), end()]));

    let mut session = Session::builder()
        .config(config())
        .build_with(StreamConnector::from_streams([first_client, second_client]))
        .unwrap();

    session.open().await.unwrap();
    assert_eq!(session.register_new_action_id(), 2);

    session.open().await.unwrap();
    first.await.unwrap();
    // action ids start over on the new connection
    assert_eq!(session.register_new_action_id(), 2);

    session.close().await.unwrap();
    second.await.unwrap();
}

#[tokio::test]
async fn test_config_from_json() {
    let config = SessionConfig::from_json(r#"{"mandant": "58", "password": "pw"}"#).unwrap();
    let (mut session, server) = connect(config, script([logon(), end()]));

    session.ensure_open().await.unwrap();
    session.ensure_open().await.unwrap();
    session.close().await.unwrap();
    server.await.unwrap();
}

#[test]
fn test_merge_keeps_inputs() {
    let a = Selection::new(0, [1]).with_condition(Condition::eq("swd", "A"));
    let b = Selection::new(0, [1]).with_condition(Condition::eq("swd", "B"));
    let merged = a.merge(&b);

    assert_eq!(a.conditions().len(), 1);
    assert_eq!(b.conditions().len(), 1);
    assert_eq!(merged.conditions().len(), 2);
}
