//! Fires many concurrent requests at one endpoint and prints aggregate
//! timings. Test tooling only, not part of the service runtime.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Concurrent load driver for the Cityworks API")]
struct Args {
    /// Endpoint to hammer, e.g. http://localhost:4000/v1/health
    url: String,

    /// Total number of requests
    #[arg(long, default_value_t = 1000)]
    requests: usize,

    /// Number of concurrent workers
    #[arg(long, default_value_t = 32)]
    concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

#[derive(Default)]
struct Stats {
    successes: usize,
    failures: usize,
    samples: Vec<Duration>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout))
        .build()?;

    let stats = Arc::new(Mutex::new(Stats::default()));
    let per_worker = args.requests.div_ceil(args.concurrency.max(1));

    let started = Instant::now();

    let mut workers = Vec::with_capacity(args.concurrency);
    for _ in 0..args.concurrency {
        let client = client.clone();
        let stats = stats.clone();
        let url = args.url.clone();

        workers.push(tokio::spawn(async move {
            for _ in 0..per_worker {
                let begin = Instant::now();
                let outcome = client.get(&url).send().await;
                let elapsed = begin.elapsed();

                let mut stats = stats.lock().expect("stats lock poisoned");
                match outcome {
                    Ok(res) if res.status().is_success() => {
                        stats.successes += 1;
                        stats.samples.push(elapsed);
                    }
                    _ => stats.failures += 1,
                }
            }
        }));
    }

    for worker in workers {
        worker.await?;
    }

    let wall = started.elapsed();
    let mut stats = stats.lock().expect("stats lock poisoned");
    stats.samples.sort();

    let total = stats.successes + stats.failures;
    println!("requests:  {total} in {wall:.2?}");
    println!("successes: {}", stats.successes);
    println!("failures:  {}", stats.failures);

    if !stats.samples.is_empty() {
        let sum: Duration = stats.samples.iter().sum();
        let percentile = |p: usize| stats.samples[(stats.samples.len() - 1) * p / 100];
        println!("mean:      {:.2?}", sum / stats.samples.len() as u32);
        println!("p50:       {:.2?}", percentile(50));
        println!("p95:       {:.2?}", percentile(95));
        println!("p99:       {:.2?}", percentile(99));
    }

    Ok(())
}
