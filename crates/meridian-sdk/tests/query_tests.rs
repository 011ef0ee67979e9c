//! Query tests for meridian-sdk
//!
//! Cost lookup and payment, receipt polling, pings and client configuration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use meridian_sdk::query::encode_records;
use meridian_sdk::wire::{QueryRequest, Response, ResponseType};
use meridian_sdk::{
    AccountBalance, AccountBalanceQuery, AccountId, AccountRecordsQuery, Amount, Channel,
    ChannelFactory, Client, ClientConfig, Error, MockChannel, MockRequest, PrivateKey, PublicKey,
    Status, TransactionId, TransactionKind, TransactionReceipt, TransactionReceiptQuery,
    TransactionRecord, TransactionRecordQuery, TransferTransaction, TransportError,
};

const OPERATOR: u64 = 1001;

fn factory_for<F>(handler: F) -> ChannelFactory
where
    F: Fn(&MockRequest) -> Result<Bytes, TransportError> + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    let channels: parking_lot::Mutex<HashMap<String, Arc<MockChannel>>> = Default::default();
    Arc::new(move |address: &str| {
        let handler = handler.clone();
        let channel = channels
            .lock()
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(MockChannel::new(address, move |req| handler(req))))
            .clone();
        channel as Arc<dyn Channel>
    })
}

fn single_node_client<F>(handler: F) -> (Client, Arc<MockChannel>)
where
    F: Fn(&MockRequest) -> Result<Bytes, TransportError> + Send + Sync + 'static,
{
    let channel = Arc::new(MockChannel::new("10.0.0.3:50211", handler));
    let shared = channel.clone();
    let factory: ChannelFactory = Arc::new(move |_: &str| shared.clone() as Arc<dyn Channel>);
    let book = HashMap::from([("10.0.0.3:50211".to_string(), AccountId::from_num(3))]);
    let client = Client::with_channels(&book, factory).unwrap();
    (client, channel)
}

fn with_operator(client: &Client) -> PublicKey {
    let key = PrivateKey::generate();
    let public_key = key.public_key();
    client
        .set_operator(AccountId::from_num(OPERATOR), key)
        .unwrap();
    public_key
}

fn query_request(req: &MockRequest) -> QueryRequest {
    QueryRequest::from_bytes(&req.body).unwrap()
}

fn receipt(status: Status) -> Bytes {
    Response::with_payload(Status::Ok, TransactionReceipt::new(status).to_bytes()).to_bytes()
}

fn record(transaction_id: TransactionId) -> TransactionRecord {
    TransactionRecord {
        receipt: TransactionReceipt::new(Status::Success),
        transaction_hash: vec![0xab; 48],
        consensus_timestamp: transaction_id.valid_start.plus_nanos(5),
        transaction_id,
        memo: String::new(),
        transaction_fee: Amount::from_tiny(84_000),
        transfers: vec![
            (AccountId::from_num(OPERATOR), Amount::from_tiny(-84_000)),
            (AccountId::from_num(98), Amount::from_tiny(84_000)),
        ],
    }
}

/// Cost answers carry `cost`; full answers carry `payload`
fn priced(
    cost: Amount,
    payload: Vec<u8>,
) -> impl Fn(&MockRequest) -> Result<Bytes, TransportError> + Send + Sync + 'static {
    move |req| {
        let request = QueryRequest::from_bytes(&req.body).unwrap();
        Ok(match request.response_type {
            ResponseType::CostOnly => Response::with_cost(Status::Ok, cost).to_bytes(),
            ResponseType::Answer => Response::with_payload(Status::Ok, payload.clone()).to_bytes(),
        })
    }
}

// ==================== Free Query Tests ====================

#[tokio::test(start_paused = true)]
async fn test_balance_query_is_free() {
    let answer = AccountBalance {
        account_id: AccountId::from_num(1002),
        balance: Amount::from_coins(12),
    };
    let payload = answer.to_bytes();
    let (client, channel) =
        single_node_client(move |_| Ok(Response::with_payload(Status::Ok, payload.clone()).to_bytes()));

    let mut query = AccountBalanceQuery::new();
    query.set_account_id(AccountId::from_num(1002));
    assert_eq!(query.get_cost(&client).await.unwrap(), Amount::ZERO);

    let balance = query.execute(&client).await.unwrap();
    assert_eq!(balance, answer);

    let sent = channel.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, "cryptoGetBalance");
    let request = query_request(&sent[0]);
    assert_eq!(request.response_type, ResponseType::Answer);
    assert!(request.payment.is_none());
}

// ==================== Paid Query Tests ====================

#[tokio::test(start_paused = true)]
async fn test_paid_query_needs_operator() {
    let (client, channel) = single_node_client(|_| Ok(Response::new(Status::Ok).to_bytes()));
    let mut query = TransactionRecordQuery::new();
    query.set_transaction_id(TransactionId::generate(AccountId::from_num(OPERATOR)));

    assert!(matches!(query.execute(&client).await, Err(Error::MissingOperator)));
    assert_eq!(channel.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cost_above_max_is_refused() {
    let transaction_id = TransactionId::generate(AccountId::from_num(OPERATOR));
    let (client, channel) =
        single_node_client(priced(Amount::from_coins(2), record(transaction_id).to_bytes()));
    with_operator(&client);
    let mut query = TransactionRecordQuery::new();
    query.set_transaction_id(transaction_id);

    match query.execute(&client).await {
        Err(Error::MaxQueryPaymentExceeded { cost, max }) => {
            assert_eq!(cost, Amount::from_coins(2));
            assert_eq!(max, Amount::from_coins(1));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    let sent = channel.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(query_request(&sent[0]).response_type, ResponseType::CostOnly);

    // a higher per-query ceiling lets it through
    query.set_max_query_payment(Amount::from_coins(3));
    assert!(query.execute(&client).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_paid_query_attaches_payment() {
    let transaction_id = TransactionId::generate(AccountId::from_num(OPERATOR));
    let expected = record(transaction_id);
    let cost = Amount::from_tiny(50_000);
    let (client, channel) = single_node_client(priced(cost, expected.to_bytes()));
    let operator_key = with_operator(&client);

    let mut query = TransactionRecordQuery::new();
    query.set_transaction_id(transaction_id);
    assert_eq!(query.get_cost(&client).await.unwrap(), cost);
    assert_eq!(query.execute(&client).await.unwrap(), expected);

    let sent = channel.requests();
    let answer = query_request(sent.last().unwrap());
    assert_eq!(answer.response_type, ResponseType::Answer);
    let payment = answer.payment.expect("payment attached");
    payment.verify().unwrap();
    assert_eq!(payment.signatures[0].public_key, operator_key);

    let body = payment.body().unwrap();
    assert_eq!(body.kind, TransactionKind::Transfer);
    assert_eq!(body.node_account_id, AccountId::from_num(3));
    assert_eq!(body.transaction_id.account_id, AccountId::from_num(OPERATOR));
    assert_eq!(Some(body.transaction_id), query.payment_transaction_id());
}

#[tokio::test(start_paused = true)]
async fn test_explicit_payment_skips_cost_lookup() {
    let transaction_id = TransactionId::generate(AccountId::from_num(OPERATOR));
    let (client, channel) =
        single_node_client(priced(Amount::from_coins(50), record(transaction_id).to_bytes()));
    with_operator(&client);

    let mut query = TransactionRecordQuery::new();
    query
        .set_transaction_id(transaction_id)
        .set_payment_amount(Amount::from_tiny(10));
    query.execute(&client).await.unwrap();

    let sent = channel.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(query_request(&sent[0]).response_type, ResponseType::Answer);
}

#[tokio::test(start_paused = true)]
async fn test_account_records_respect_max_payment() {
    let records = vec![
        record(TransactionId::generate(AccountId::from_num(OPERATOR))),
        record(TransactionId::generate(AccountId::from_num(OPERATOR))),
    ];
    let (client, channel) =
        single_node_client(priced(Amount::from_tiny(30_000_000), encode_records(&records)));
    with_operator(&client);

    let mut query = AccountRecordsQuery::new();
    query
        .set_account_id(AccountId::from_num(OPERATOR))
        .set_max_query_payment(Amount::from_tiny(10_000_000));
    assert!(matches!(
        query.execute(&client).await,
        Err(Error::MaxQueryPaymentExceeded { .. })
    ));

    query.set_max_query_payment(Amount::from_coins(1));
    assert_eq!(query.execute(&client).await.unwrap(), records);

    let sent = channel.requests();
    assert!(sent.iter().all(|r| r.method == "getAccountRecords"));
    let answer = query_request(sent.last().unwrap());
    assert_eq!(answer.response_type, ResponseType::Answer);
    let payment = answer.payment.expect("payment attached");
    payment.verify().unwrap();
}

// ==================== Receipt Tests ====================

#[tokio::test(start_paused = true)]
async fn test_receipt_polls_until_consensus() {
    let calls = AtomicUsize::new(0);
    let (client, channel) = single_node_client(move |req| match req.method.as_str() {
        "getTransactionReceipts" => match calls.fetch_add(1, Ordering::SeqCst) {
            0 => Ok(Response::new(Status::ReceiptNotFound).to_bytes()),
            1 => Ok(receipt(Status::Unknown)),
            _ => Ok(receipt(Status::Success)),
        },
        _ => Ok(Response::new(Status::Ok).to_bytes()),
    });
    with_operator(&client);

    let mut tx = TransferTransaction::new();
    tx.add_transfer(AccountId::from_num(OPERATOR), Amount::from_tiny(-1))
        .unwrap()
        .add_transfer(AccountId::from_num(1002), Amount::from_tiny(1))
        .unwrap();
    let response = tx.execute(&client).await.unwrap();
    assert_eq!(response.node_id, AccountId::from_num(3));

    let receipt = response.get_receipt(&client).await.unwrap();
    assert_eq!(receipt.status, Status::Success);
    let polls = channel
        .requests()
        .iter()
        .filter(|r| r.method == "getTransactionReceipts")
        .count();
    assert_eq!(polls, 3);
}

#[tokio::test(start_paused = true)]
async fn test_failed_receipt_is_an_error() {
    let (client, _) = single_node_client(|_| Ok(receipt(Status::InvalidSignature)));
    let transaction_id = TransactionId::generate(AccountId::from_num(OPERATOR));

    let mut query = TransactionReceiptQuery::new();
    query
        .set_transaction_id(transaction_id)
        .set_node_account_ids(vec![AccountId::from_num(3)]);
    let receipt = query.execute(&client).await.unwrap();
    assert_eq!(receipt.status, Status::InvalidSignature);

    match receipt.validate_status(transaction_id) {
        Err(Error::ReceiptStatus { status, transaction_id: id }) => {
            assert_eq!(status, Status::InvalidSignature);
            assert_eq!(id, transaction_id);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_receipt_stays_pending() {
    let (client, channel) = single_node_client(|_| Ok(receipt(Status::Unknown)));
    let transaction_id = TransactionId::generate(AccountId::from_num(OPERATOR));

    let mut query = TransactionReceiptQuery::new();
    query.set_transaction_id(transaction_id).set_max_attempts(4);
    let err = query.execute(&client).await.unwrap_err();
    assert!(matches!(err, Error::MaxAttemptsExceeded { attempts: 4, .. }));
    assert_eq!(err.status(), Some(Status::Unknown));
    assert_eq!(channel.request_count(), 4);
}

// ==================== Client Tests ====================

#[tokio::test(start_paused = true)]
async fn test_ping_feeds_node_health_only() {
    let factory: ChannelFactory =
        Arc::new(|a: &str| Arc::new(MockChannel::unreachable(a)) as Arc<dyn Channel>);
    let book = HashMap::from([("10.0.0.3:50211".to_string(), AccountId::from_num(3))]);
    let client = Client::with_channels(&book, factory).unwrap();
    client.set_max_attempts(1).unwrap();

    client.ping(AccountId::from_num(3)).await;
    let node = client.network().node(&AccountId::from_num(3)).unwrap();
    assert_eq!(node.consecutive_failures(), 1);
    assert!(node.backoff() > Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn test_client_from_config() {
    let key = PrivateKey::generate();
    let text = format!(
        r#"
        network = {{ "10.0.0.3:50211" = "0.0.3", "10.0.0.4:50211" = "0.0.4" }}
        max_attempts = 4
        min_backoff_ms = 100
        max_backoff_ms = 1000
        max_query_payment_tiny = 500
        request_timeout_ms = 2000

        [operator]
        account_id = "0.0.1001"
        private_key = "{key}"
        "#
    );
    let config = ClientConfig::from_toml(&text).unwrap();
    let client = Client::from_config_with_channels(
        &config,
        factory_for(|_| Ok(Response::new(Status::Ok).to_bytes())),
    )
    .unwrap();

    assert_eq!(client.max_attempts(), 4);
    assert_eq!(client.min_backoff(), Duration::from_millis(100));
    assert_eq!(client.max_backoff(), Duration::from_secs(1));
    assert_eq!(client.max_query_payment(), Amount::from_tiny(500));
    assert_eq!(client.request_timeout(), Some(Duration::from_secs(2)));
    assert_eq!(client.operator_account_id(), Some(AccountId::from_num(OPERATOR)));
    assert_eq!(client.operator_public_key(), Some(key.public_key()));
    assert_eq!(client.network().account_ids().len(), 2);
}
