//! Load testing for the query proxy.

use std::time::{Duration, Instant};

use serde_json::json;

mod common;

#[tokio::test]
async fn test_load_performance() {
    // 1. Setup Mock Backend
    let backend = common::start_mock_backend(200, r#"{"data":{"me":{"id":"1"}}}"#).await;

    // 2. Start Proxy
    let proxy = common::start_proxy(common::config_for(&backend.url()), Vec::new()).await;

    // 3. Run Load Test
    let concurrency = 20;
    let requests_per_task = 50;
    let total_requests = concurrency * requests_per_task;

    let client = common::client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = proxy.url("/graphql");
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                let res = client
                    .post(&url)
                    .header("user", "load")
                    .json(&json!({"query": "{ me { id } }"}))
                    .send()
                    .await;
                if let Ok(res) = res {
                    if res.status().is_success() && res.bytes().await.is_ok() {
                        latencies.push(req_start.elapsed());
                    }
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    if all_latencies.is_empty() {
        panic!("No successful requests recorded");
    }

    all_latencies.sort();
    println!(
        "\nload: {} requests, concurrency {}, {:?} total, {:.0} req/s, p50 {:?} p95 {:?} p99 {:?}, {} ok\n",
        total_requests,
        concurrency,
        duration,
        rps,
        percentile(&all_latencies, 0.50),
        percentile(&all_latencies, 0.95),
        percentile(&all_latencies, 0.99),
        all_latencies.len(),
    );

    assert_eq!(all_latencies.len(), total_requests);
    assert_eq!(proxy.wait_idle().await, 0);

    // Pools recycle instead of growing with the request count.
    let buffers = proxy.proxy.pools().buffers.stats();
    assert!(buffers.created <= concurrency as u64);
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    let idx = ((sorted.len() as f64 * p) as usize).min(sorted.len() - 1);
    sorted[idx]
}
