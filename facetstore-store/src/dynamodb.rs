//! DynamoDB-backed `StoreBackend`.
//!
//! Table schema (see `SPEC_FULL.md` §6): partition key attribute `_id`,
//! sort key attribute `_rng`. One `TransactWriteItem::Put` per record,
//! each carrying its own condition expression, so the whole commit
//! lives in a single `transact_write_items` call.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, Put, TransactWriteItem};
use aws_sdk_dynamodb::Client;
use facetstore_record::{partition_key, Record, STATE_SORT_KEY};
use tracing::{debug, warn};

use crate::backend::StoreBackend;
use crate::error::{Result, StoreError};
use crate::validate::validate_transaction;

/// Wraps an `aws_sdk_dynamodb::Client` pointed at a single table holding
/// state, inbound, and outbound rows for every facet.
pub struct DynamoDbBackend {
    client: Client,
    table: String,
}

impl DynamoDbBackend {
    /// Build a backend against `table` using an already-configured client.
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self { client, table: table.into() }
    }

    async fn query_partition(&self, partition: &str) -> Result<Vec<Record>> {
        let output = self
            .client
            .query()
            .table_name(&self.table)
            .consistent_read(true)
            .key_condition_expression("#id = :id")
            .expression_attribute_names("#id", "_id")
            .expression_attribute_values(":id", AttributeValue::S(partition.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        output.items.unwrap_or_default().into_iter().map(|item| record_from_item(&item)).collect()
    }
}

#[async_trait]
impl StoreBackend for DynamoDbBackend {
    async fn get_state(&self, facet: &str, id: &str) -> Result<Option<Record>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("_id", AttributeValue::S(partition_key(facet, id)))
            .key("_rng", AttributeValue::S(STATE_SORT_KEY.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        output.item.map(|item| record_from_item(&item)).transpose()
    }

    async fn get_records(&self, facet: &str, id: &str) -> Result<Vec<Record>> {
        self.query_partition(&partition_key(facet, id)).await
    }

    async fn put_transaction(
        &self,
        facet: &str,
        state: Record,
        previous_seq: i64,
        inbound: Vec<Record>,
        outbound: Vec<Record>,
    ) -> Result<()> {
        validate_transaction(facet, &state, &inbound, &outbound)?;

        let mut items = Vec::with_capacity(1 + inbound.len() + outbound.len());
        items.push(
            TransactWriteItem::builder()
                .put(
                    Put::builder()
                        .table_name(&self.table)
                        .set_item(Some(item_from_record(&state)))
                        .condition_expression("attribute_not_exists(#id) OR #seq = :previous_seq")
                        .expression_attribute_names("#id", "_id")
                        .expression_attribute_names("#seq", "_seq")
                        .expression_attribute_values(":previous_seq", AttributeValue::N(previous_seq.to_string()))
                        .build()
                        .map_err(|e| StoreError::Backend(e.to_string()))?,
                )
                .build(),
        );

        for r in inbound.iter().chain(outbound.iter()) {
            items.push(
                TransactWriteItem::builder()
                    .put(
                        Put::builder()
                            .table_name(&self.table)
                            .set_item(Some(item_from_record(r)))
                            .condition_expression("attribute_not_exists(#id)")
                            .expression_attribute_names("#id", "_id")
                            .build()
                            .map_err(|e| StoreError::Backend(e.to_string()))?,
                    )
                    .build(),
            );
        }

        debug!(%facet, partition = %state.partition_key, seq = state.sequence, items = items.len(), "submitting transact_write_items");

        self.client.transact_write_items().set_transact_items(Some(items)).send().await.map_err(|e| {
            let message = e.to_string();
            if message.contains("ConditionalCheckFailed") || message.contains("TransactionCanceled") {
                warn!(%facet, partition = %state.partition_key, "transactional write cancelled by a condition check");
                StoreError::Concurrency { expected: previous_seq, actual: None }
            } else {
                StoreError::Backend(message)
            }
        })?;

        Ok(())
    }
}

fn item_from_record(r: &Record) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert("_id".to_string(), AttributeValue::S(r.partition_key.clone()));
    item.insert("_rng".to_string(), AttributeValue::S(r.sort_key.clone()));
    item.insert("_facet".to_string(), AttributeValue::S(r.facet.clone()));
    item.insert("_typ".to_string(), AttributeValue::S(r.typ.clone()));
    item.insert("_seq".to_string(), AttributeValue::N(r.sequence.to_string()));
    item.insert("_ts".to_string(), AttributeValue::N(r.timestamp_millis.to_string()));
    item.insert("_date".to_string(), AttributeValue::S(r.timestamp_date.clone()));
    item.insert("_itm".to_string(), AttributeValue::S(r.payload.clone()));
    item
}

fn record_from_item(item: &HashMap<String, AttributeValue>) -> Result<Record> {
    Ok(Record {
        partition_key: att_s(item, "_id")?,
        sort_key: att_s(item, "_rng")?,
        facet: att_s(item, "_facet")?,
        typ: att_s(item, "_typ")?,
        sequence: att_n(item, "_seq")?,
        timestamp_millis: att_n(item, "_ts")?,
        timestamp_date: att_s(item, "_date")?,
        payload: att_s(item, "_itm")?,
    })
}

fn att_s(item: &HashMap<String, AttributeValue>, key: &str) -> Result<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| StoreError::Backend(format!("missing or non-string attribute {key}")))
}

fn att_n(item: &HashMap<String, AttributeValue>, key: &str) -> Result<i64> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .ok_or_else(|| StoreError::Backend(format!("missing or non-numeric attribute {key}")))?
        .parse()
        .map_err(|_| StoreError::Backend(format!("attribute {key} is not a valid integer")))
}
