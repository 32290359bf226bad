use std::env;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rust_decimal::Decimal;
use tracing::{info, warn};

use bank_workload::domain::{AccountId, ExecutorError};
use bank_workload::executor::{self, RetryConfig};
use bank_workload::pool::Pool;
use bank_workload::store::Bank;
use bank_workload::workload::{self, WorkloadStats};

fn parse_or<T>(arg: Option<String>, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + 'static,
{
    match arg {
        Some(s) => Ok(s.parse()?),
        None => Ok(default),
    }
}

fn pick_pair(accounts: u64) -> (AccountId, AccountId) {
    let mut rng = rand::thread_rng();
    let from = rng.gen_range(0..accounts);
    let mut to = rng.gen_range(0..accounts);
    while to == from {
        to = rng.gen_range(0..accounts);
    }
    (AccountId(from), AccountId(to))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    // Positional args with defaults: [workers] [transfers-per-worker] [accounts]
    let mut args = env::args().skip(1);
    let workers: usize = parse_or(args.next(), 4)?;
    let transfers: u64 = parse_or(args.next(), 250)?;
    let accounts: u64 = parse_or(args.next(), 64)?;
    if accounts < 2 {
        return Err("need at least two accounts to transfer between".into());
    }

    let bank = Bank::new();
    bank.seed(accounts, Decimal::from(1_000))?;
    let opening_total = bank.total_balance()?;

    info!(workers, transfers, accounts, "starting bank workload");

    let pool = Pool::new((0..workers).map(|_| bank.connect()).collect());
    let stats = Arc::new(WorkloadStats::new());

    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let pool = Arc::clone(&pool);
        let stats = Arc::clone(&stats);
        handles.push(tokio::spawn(async move {
            let config = RetryConfig {
                max_attempts: 5,
                base_delay: Duration::from_millis(10),
                deadline: Some(Duration::from_secs(5)),
            };
            for _ in 0..transfers {
                let (from, to) = pick_pair(accounts);
                let amount = Decimal::from(rand::thread_rng().gen_range(1..=100));

                // One connection borrowed per work unit, returned on drop.
                let mut conn = match pool.acquire().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(worker, error = %e, "failed to borrow a connection");
                        break;
                    }
                };
                let result =
                    executor::run(&mut *conn, workload::transfer(from, to, amount), &config).await;
                match &result {
                    // Insufficient funds is an expected business outcome
                    // under random load, not an operational failure.
                    Ok(()) | Err(ExecutorError::ValidationFailed(_)) => {}
                    Err(e) => warn!(worker, %from, %to, error = %e, "transfer failed"),
                }
                stats.record(&result);
            }
        }));
    }
    for handle in futures::future::join_all(handles).await {
        handle?;
    }

    let closing_total = bank.total_balance()?;
    println!("{}", stats.report());
    println!("ledger entries: {}", bank.ledger_len()?);
    println!("balance total: opening={opening_total} closing={closing_total}");
    if opening_total != closing_total {
        return Err("balance conservation violated".into());
    }
    Ok(())
}
