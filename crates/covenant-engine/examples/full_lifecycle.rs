//! Drives a full agreement lifecycle end to end
//!
//! This example shows:
//! 1. party1 deposits native value and requests pricing
//! 2. The oracle callback prices the agreement
//! 3. party2 enters, paying the premium to party1
//! 4. party2 executes, escrowing the stable settlement leg
//! 5. The delayed settlement callback distributes both legs
//!
//! Run with: cargo run --example full_lifecycle

use std::sync::Arc;

use covenant_engine::{AgreementEngine, EngineConfig};
use covenant_ledger::{InMemoryLedger, ValueLedger};
use covenant_oracle::RecordingOracle;
use covenant_types::{Asset, PartyId, Result, ONE_UNIT};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let ledger = InMemoryLedger::new();
    let oracle_svc = RecordingOracle::new();
    let admin = PartyId::new();
    let oracle = PartyId::new();
    let party1 = PartyId::new();
    let party2 = PartyId::new();

    let engine = AgreementEngine::new(
        EngineConfig::default(),
        admin,
        oracle.clone(),
        Arc::new(ledger.clone()),
        Arc::new(oracle_svc),
    );

    // Seed the fee float and both parties.
    ledger
        .credit(engine.engine_account(), Asset::OracleFee, ONE_UNIT)
        .await?;
    ledger.credit(&party1, Asset::Native, 2 * ONE_UNIT).await?;
    ledger.credit(&party2, Asset::Native, ONE_UNIT).await?;
    ledger
        .credit(&party2, Asset::Stable, 5_000 * ONE_UNIT)
        .await?;

    let deposit = ONE_UNIT;
    let premium = ONE_UNIT / 20;

    println!("== 1. party1 deposits {} native raw units ==", deposit);
    let pricing_request = engine.create_agreement(&party1, deposit, premium).await?;

    println!("== 2. oracle reports a 2000.00000000 quote ==");
    let raw_price = 2_000u128 * 100_000_000;
    engine
        .initialize_agreement(&oracle, &pricing_request, raw_price)
        .await?;
    let agreement = engine
        .agreement(&party1, deposit, premium)
        .await
        .expect("agreement was just priced");
    println!(
        "   priced: transfer_amount = {} stable raw units",
        agreement.transfer_amount
    );

    println!("== 3. party2 enters, paying the premium ==");
    let settle_request = engine
        .enter_agreement(&party2, &party1, deposit, premium, premium)
        .await?;
    println!(
        "   party1 native balance: {}",
        ledger.balance(&party1, Asset::Native).await
    );

    println!("== 4. party2 approves and executes the escrow ==");
    ledger
        .approve(
            &party2,
            engine.engine_account(),
            Asset::Stable,
            agreement.transfer_amount,
        )
        .await?;
    engine
        .execute_agreement(&party2, &party1, deposit, premium)
        .await?;

    println!("== 5. the settlement callback distributes both legs ==");
    let outcome = engine.settle_agreement(&oracle, &settle_request).await?;
    println!("   outcome: {:?}", outcome);

    println!();
    println!(
        "party1: {} native, {} stable",
        ledger.balance(&party1, Asset::Native).await,
        ledger.balance(&party1, Asset::Stable).await
    );
    println!(
        "party2: {} native, {} stable",
        ledger.balance(&party2, Asset::Native).await,
        ledger.balance(&party2, Asset::Stable).await
    );
    println!(
        "custody: {} native, {} stable",
        ledger.balance(engine.engine_account(), Asset::Native).await,
        ledger.balance(engine.engine_account(), Asset::Stable).await
    );

    Ok(())
}
