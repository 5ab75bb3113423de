use std::sync::Arc;

use bolt_protocol::message::MessageTag;
use bolt_protocol::{Map, Value};

use crate::connection::Connection;
use crate::error::ClientError;
use crate::pool::{ConnectionPool, Connector};
use crate::session::Session;
use crate::test_support::{
    self, header, record, success, tag_of, written_messages, ScriptedStream,
};

fn session(messages: &[Vec<u8>]) -> Session<ScriptedStream> {
    let connector: Connector<ScriptedStream> =
        Box::new(|address| Ok(Connection::new(address.clone(), ScriptedStream::empty())));
    let pool = Arc::new(ConnectionPool::new(connector));
    Session::new(test_support::connection(messages), pool)
}

/// The replies to one statement that produces no records.
fn empty_statement() -> Vec<Vec<u8>> {
    vec![success(Map::new()), success(Map::new())]
}

fn statement_texts(session: &Session<ScriptedStream>) -> Vec<String> {
    let connection = session.connection.as_ref().expect("session is open");
    written_messages(&connection.stream.as_ref().unwrap().outgoing)
        .iter()
        .filter(|payload| tag_of(payload) == u8::from(MessageTag::Run))
        .map(|payload| String::from_utf8_lossy(&payload[2..]).into_owned())
        .collect()
}

#[test]
fn commit_sends_begin_statement_commit() {
    let mut session = session(&[
        empty_statement(),
        vec![
            success(header(&["n"])),
            record(vec![Value::Integer(1)]),
            success(test_support::footer()),
        ],
        empty_statement(),
    ]
    .concat());

    let mut transaction = session
        .begin_transaction()
        .expect("begin should succeed");
    {
        let mut result = transaction
            .run("RETURN 1 AS n", None)
            .expect("run should succeed");
        let row = result.single().expect("record should arrive");
        assert_eq!(row["n"], Value::Integer(1));
    }
    transaction.commit().expect("commit should succeed");
    drop(transaction);

    let statements = statement_texts(&session);
    assert_eq!(statements.len(), 3);
    assert!(statements[0].contains("BEGIN"));
    assert!(statements[1].contains("RETURN 1 AS n"));
    assert!(statements[2].contains("COMMIT"));
}

#[test]
fn rollback_sends_rollback_instead_of_commit() {
    let mut session = session(&[empty_statement(), empty_statement()].concat());

    let mut transaction = session
        .begin_transaction()
        .expect("begin should succeed");
    transaction.rollback().expect("rollback should succeed");
    drop(transaction);

    let statements = statement_texts(&session);
    assert_eq!(statements.len(), 2);
    assert!(statements[0].contains("BEGIN"));
    assert!(statements[1].contains("ROLLBACK"));
}

#[test]
fn dropping_an_uncommitted_transaction_rolls_back() {
    let mut session = session(&[empty_statement(), empty_statement()].concat());

    {
        let _transaction = session
            .begin_transaction()
            .expect("begin should succeed");
        // scope left without commit
    }

    let statements = statement_texts(&session);
    assert_eq!(statements.len(), 2);
    assert!(statements[1].contains("ROLLBACK"));
}

#[test]
fn a_scope_left_early_with_an_error_commits_nothing() {
    fn scoped(session: &mut Session<ScriptedStream>) -> Result<(), ClientError> {
        let mut transaction = session.begin_transaction()?;
        transaction.run("RETURN 1", None)?;
        // a user error before the transaction is marked successful
        Err(ClientError::EndOfStream)
    }

    let mut session = session(&[
        empty_statement(),
        vec![
            success(header(&["n"])),
            success(test_support::footer()),
        ],
        empty_statement(),
    ]
    .concat());

    assert!(scoped(&mut session).is_err());

    let statements = statement_texts(&session);
    assert_eq!(statements.len(), 3);
    assert!(statements[2].contains("ROLLBACK"));
    assert!(!statements[2].contains("COMMIT"));
}

#[test]
fn run_after_close_is_a_transaction_error() {
    let mut session = session(&[empty_statement(), empty_statement()].concat());

    let mut transaction = session
        .begin_transaction()
        .expect("begin should succeed");
    transaction.commit().expect("commit should succeed");
    assert!(matches!(
        transaction.run("RETURN 1", None),
        Err(ClientError::TransactionClosed)
    ));
    assert!(matches!(
        transaction.commit(),
        Err(ClientError::TransactionClosed)
    ));
}

#[test]
fn commit_waits_for_the_server_to_confirm() {
    let mut session = session(&[empty_statement(), empty_statement()].concat());

    let mut transaction = session
        .begin_transaction()
        .expect("begin should succeed");
    transaction.commit().expect("commit should succeed");
    drop(transaction);

    // both the BEGIN and COMMIT replies have been drained
    let connection = session.connection.as_mut().expect("session is open");
    assert_eq!(connection.fetch_all().expect("queue should be empty"), 0);
}

#[test]
fn transaction_failure_surfaces_on_commit() {
    let mut session = session(&[
        empty_statement(),
        vec![
            test_support::failure("Neo.ClientError.Transaction.Invalid", "boom"),
            test_support::ignored(),
            success(Map::new()),
        ],
    ]
    .concat());

    let mut transaction = session
        .begin_transaction()
        .expect("begin should succeed");
    let err = transaction.commit().expect_err("commit should fail");
    assert!(matches!(err, ClientError::Cypher { .. }));
}
