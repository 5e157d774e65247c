//! facetstore demo
//!
//! Exercises `get`/`append`/`append_to`/`recalculate` against the
//! in-memory backend for a tiny "account" facet, then polls the same
//! backend for outbound rows the way a real change-stream forwarder
//! would: filter by the `OUTBOUND` sort-key prefix, forward `typ` and
//! `payload` to whatever bus is downstream (here, stdout).
//!
//! # Usage
//!
//! ```bash
//! facetstore-demo              # runs the scripted walkthrough below
//! facetstore-demo get <id>     # point-read an account by id
//! ```

use std::sync::Arc;
use std::time::Duration;

use facetstore_facet::{Facet, Item};
use facetstore_processor::{Event, Processor, ReducerInput, RuleTable};
use facetstore_record::RecordKind;
use facetstore_store::{MemoryBackend, StoreBackend};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct Account {
    balance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AmountPayload {
    amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LowBalancePayload {
    balance: i64,
}

fn rules() -> RuleTable<Account, AmountPayload, LowBalancePayload> {
    RuleTable::new()
        .on("deposited", |input: ReducerInput<'_, Account, AmountPayload, LowBalancePayload>| Account {
            balance: input.state.balance + input.current.amount,
        })
        .on("withdrawn", |input: ReducerInput<'_, Account, AmountPayload, LowBalancePayload>| {
            let balance = input.state.balance - input.current.amount;
            if balance < 10 {
                input.publish.push(Event::new("low_balance", LowBalancePayload { balance }));
            }
            Account { balance }
        })
}

async fn forward_outbound(backend: Arc<MemoryBackend>, id: String) {
    let mut forwarded = 0usize;
    loop {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let Ok(records) = backend.get_records("account", &id).await else { continue };
        let mut outbound: Vec<_> =
            records.into_iter().filter(|r| r.kind() == RecordKind::Outbound).collect();
        outbound.sort_by_key(|r| r.sort_key.clone());

        for record in outbound.into_iter().skip(forwarded) {
            info!(typ = %record.typ, payload = %record.payload, "forwarding outbound event");
            forwarded += 1;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("facetstore_demo=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let backend = Arc::new(MemoryBackend::new());
    let facet = Facet::new("account", backend.clone(), Processor::new(rules(), Account::default));

    if args.len() > 2 && args[1] == "get" {
        let id = &args[2];
        match facet.get(id).await? {
            Some(Item { state, seq }) => info!(%id, balance = state.balance, seq, "account"),
            None => info!(%id, "no such account"),
        }
        return Ok(());
    }

    let forwarder = tokio::spawn(forward_outbound(backend.clone(), "acct-1".to_string()));

    let deposit = facet
        .append("acct-1", vec![Event::new("deposited", AmountPayload { amount: 100 })])
        .await?;
    info!(seq = deposit.seq, balance = deposit.item.balance, "deposited");

    let withdraw = facet
        .append("acct-1", vec![Event::new("withdrawn", AmountPayload { amount: 95 })])
        .await?;
    info!(seq = withdraw.seq, balance = withdraw.item.balance, "withdrew");

    let fast_path = facet
        .append_to(
            "acct-1",
            withdraw.item.clone(),
            withdraw.seq,
            vec![Event::new("deposited", AmountPayload { amount: 2 })],
        )
        .await?;
    info!(seq = fast_path.seq, balance = fast_path.item.balance, "topped up via append_to");

    let recalculated = facet.recalculate("acct-1", vec![]).await?;
    info!(seq = recalculated.seq, balance = recalculated.item.balance, "recalculated from full replay");

    tokio::time::sleep(Duration::from_millis(500)).await;
    forwarder.abort();

    Ok(())
}
