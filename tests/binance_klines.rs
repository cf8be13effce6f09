use axum::extract::{Json, Query, State};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crash_radar::market::binance::PAGE_LIMIT;
use crash_radar::market::BinanceClient;

const FIRST_OPEN_MS: i64 = 1_699_999_200_000;
const STEP_MS: i64 = 15 * 60 * 1000;

fn open_ms(index: usize) -> i64 {
    FIRST_OPEN_MS + index as i64 * STEP_MS
}

/// `len` consecutive 15m bars; answers from the bar containing `startTime`
/// the way the exchange buckets timestamps.
struct Exchange {
    len: usize,
    requests: Mutex<Vec<HashMap<String, String>>>,
}

impl Exchange {
    fn new(len: usize) -> Arc<Self> {
        Arc::new(Self {
            len,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<HashMap<String, String>> {
        self.requests.lock().unwrap().clone()
    }

    fn page(&self, start: Option<i64>, end: Option<i64>, limit: usize) -> Vec<Value> {
        let n = self.len as i64;
        let lo = start.map(|s| (s - FIRST_OPEN_MS).div_euclid(STEP_MS)).unwrap_or(0).max(0);
        let hi = end.map(|e| (e - FIRST_OPEN_MS).div_euclid(STEP_MS) + 1).unwrap_or(n).min(n);
        if lo >= hi {
            return Vec::new();
        }
        let limit = limit as i64;
        let (lo, hi) = if start.is_some() {
            (lo, hi.min(lo + limit))
        } else {
            (lo.max(hi - limit), hi)
        };
        (lo..hi)
            .map(|i| {
                let open = FIRST_OPEN_MS + i * STEP_MS;
                let close = 60_000.0 + i as f64;
                json!([
                    open,
                    format!("{:.1}", close - 1.0),
                    format!("{:.1}", close + 5.0),
                    format!("{:.1}", close - 5.0),
                    format!("{:.1}", close),
                    "1.5",
                    open + STEP_MS - 1,
                    "0",
                    10,
                    "0",
                    "0",
                    "0"
                ])
            })
            .collect()
    }
}

async fn klines(State(exchange): State<Arc<Exchange>>, Query(q): Query<HashMap<String, String>>) -> Json<Vec<Value>> {
    exchange.requests.lock().unwrap().push(q.clone());
    let num = |key: &str| q.get(key).and_then(|v| v.parse::<i64>().ok());
    let limit = num("limit").unwrap_or(500) as usize;
    Json(exchange.page(num("startTime"), num("endTime"), limit))
}

async fn serve(exchange: Arc<Exchange>) -> BinanceClient {
    let app = Router::new().route("/api/v3/klines", get(klines)).with_state(exchange);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    BinanceClient::with_base_url(&format!("http://{}/", addr))
}

#[tokio::test]
async fn test_backfill_pages_backwards_until_short_page() {
    let exchange = Exchange::new(2500);
    let client = serve(exchange.clone()).await;

    let bars = client.backfill_history("btcusdt", "15m", None).await.unwrap();

    assert_eq!(bars.len(), 2500);
    assert_eq!(bars[0].open_time_ms(), open_ms(0));
    assert_eq!(bars[2499].open_time_ms(), open_ms(2499));
    assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

    let requests = exchange.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0]["symbol"], "BTCUSDT");
    assert_eq!(requests[0]["interval"], "15m");
    assert_eq!(requests[0]["limit"], PAGE_LIMIT.to_string());
    assert!(!requests[0].contains_key("endTime"));
    assert_eq!(requests[1]["endTime"], (open_ms(1500) - 1).to_string());
    assert_eq!(requests[2]["endTime"], (open_ms(500) - 1).to_string());
}

#[tokio::test]
async fn test_backfill_stops_at_max_batches() {
    let exchange = Exchange::new(2500);
    let client = serve(exchange.clone()).await;

    let bars = client.backfill_history("BTCUSDT", "15m", Some(2)).await.unwrap();

    assert_eq!(exchange.requests().len(), 2);
    assert_eq!(bars.len(), 2 * PAGE_LIMIT);
    assert_eq!(bars[0].open_time_ms(), open_ms(500));
}

#[tokio::test]
async fn test_update_latest_appends_without_duplicates() {
    let exchange = Exchange::new(2300);
    let client = serve(exchange.clone()).await;
    let stored = client.backfill_history("BTCUSDT", "15m", None).await.unwrap();
    assert_eq!(stored.len(), 2300);

    let exchange = Exchange::new(2500);
    let client = serve(exchange.clone()).await;
    let merged = client.update_latest(stored, "BTCUSDT", "15m").await.unwrap();

    assert_eq!(merged.len(), 2500);
    assert!(merged.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    assert_eq!(merged[2499].close, 60_000.0 + 2499.0);

    let requests = exchange.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["startTime"], (open_ms(2299) + 1).to_string());
    assert!(!requests[0].contains_key("endTime"));
}
