use std::sync::Arc;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ensure_positive_price, MarketStore, ProbeFuture, StockFilter, StoreFuture, TickWindow};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::statistics::MarketStatistics;
use crate::{Price, Stock, StockSymbol, StoreError, Tick, UtcDateTime, ValidationError};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// [`MarketStore`] backed by the remote market API.
///
/// The API exposes no tick history, so [`MarketStore::recent_ticks`] and
/// [`MarketStore::symbol_ticks`] return [`StoreError::Unsupported`]. Use
/// [`HttpMarketStore::market_statistics`] for server-side statistics instead.
#[derive(Clone)]
pub struct HttpMarketStore {
    base_url: String,
    http_client: Arc<dyn HttpClient>,
    timeout_ms: u64,
}

impl HttpMarketStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(base_url, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(base_url: impl Into<String>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            http_client,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Statistics computed by the server over its own tick sample.
    pub async fn market_statistics(&self) -> Result<MarketStatistics, StoreError> {
        let response = self
            .send(HttpRequest::get(self.url("/api/market/statistics")))
            .await?;
        let dto: StatisticsDto = decode(&ensure_success(response, None)?)?;
        dto.into_statistics()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn symbol_url(&self, prefix: &str, symbol: &StockSymbol, suffix: &str) -> String {
        self.url(&format!(
            "{prefix}/{}{suffix}",
            urlencoding::encode(symbol.as_str())
        ))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, StoreError> {
        let request = request
            .with_header("accept", "application/json")
            .with_timeout_ms(self.timeout_ms);
        let url = request.url.clone();
        tracing::trace!(%url, method = ?request.method, "market api request");
        self.http_client
            .execute(request)
            .await
            .map_err(|error| StoreError::transport(format!("{url}: {error}")))
    }

    async fn send_json<B: Serialize>(
        &self,
        request: HttpRequest,
        body: &B,
    ) -> Result<HttpResponse, StoreError> {
        let body = serde_json::to_string(body)
            .map_err(|error| StoreError::transport(format!("failed to encode request: {error}")))?;
        self.send(request.with_json_body(body)).await
    }
}

impl MarketStore for HttpMarketStore {
    fn get_stock<'a>(&'a self, symbol: &'a StockSymbol) -> StoreFuture<'a, Option<Stock>> {
        Box::pin(async move {
            let response = self
                .send(HttpRequest::get(self.symbol_url("/api/stocks", symbol, "")))
                .await?;
            if response.status == 404 {
                return Ok(None);
            }
            let dto: StockDto = decode(&ensure_success(response, Some(symbol))?)?;
            dto.into_stock().map(Some)
        })
    }

    fn create_stock<'a>(&'a self, stock: Stock) -> StoreFuture<'a, Uuid> {
        Box::pin(async move {
            let request = CreateStockRequest {
                symbol: stock.symbol.as_str(),
                name: &stock.name,
                exchange: &stock.exchange,
                sector: &stock.sector,
                industry: &stock.industry,
                initial_price: stock.current_price.value(),
            };
            let response = self
                .send_json(HttpRequest::post(self.url("/api/stocks")), &request)
                .await?;
            decode(&ensure_success(response, Some(&stock.symbol))?)
        })
    }

    fn update_stock_price<'a>(
        &'a self,
        symbol: &'a StockSymbol,
        price: Price,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            ensure_positive_price(&price)?;
            // Bare JSON number; decimal text is already valid JSON.
            let request = HttpRequest::put(self.symbol_url("/api/stocks", symbol, "/price"))
                .with_json_body(price.value().normalize().to_string());
            let response = self.send(request).await?;
            ensure_success(response, Some(symbol)).map(|_| ())
        })
    }

    fn list_stocks<'a>(&'a self, filter: StockFilter) -> StoreFuture<'a, Vec<Stock>> {
        Box::pin(async move {
            let response = self.send(HttpRequest::get(self.url("/api/stocks"))).await?;
            let dtos: Vec<StockDto> = decode(&ensure_success(response, None)?)?;
            let mut stocks = Vec::with_capacity(dtos.len());
            for dto in dtos {
                let stock = dto.into_stock()?;
                if filter.matches(&stock) {
                    stocks.push(stock);
                }
            }
            Ok(stocks)
        })
    }

    fn append_tick<'a>(&'a self, tick: Tick) -> StoreFuture<'a, Uuid> {
        Box::pin(async move {
            let request = TickRequest::from(&tick);
            let response = self
                .send_json(HttpRequest::post(self.url("/api/market/ticks")), &request)
                .await?;
            decode(&ensure_success(response, Some(&tick.symbol))?)
        })
    }

    fn append_ticks<'a>(&'a self, ticks: Vec<Tick>) -> StoreFuture<'a, usize> {
        Box::pin(async move {
            let batch = BatchRequest {
                ticks: ticks.iter().map(TickRequest::from).collect(),
            };
            let response = self
                .send_json(HttpRequest::post(self.url("/api/market/ticks/batch")), &batch)
                .await?;
            let body = ensure_success(response, None)?;
            let count = serde_json::from_str::<BatchResponse>(&body)
                .ok()
                .and_then(|reply| reply.count)
                .unwrap_or(ticks.len());
            Ok(count)
        })
    }

    fn recent_ticks<'a>(&'a self, _limit: usize) -> StoreFuture<'a, Vec<Tick>> {
        Box::pin(async {
            Err::<Vec<Tick>, _>(StoreError::Unsupported {
                operation: "recent_ticks",
            })
        })
    }

    fn latest_tick<'a>(&'a self, symbol: &'a StockSymbol) -> StoreFuture<'a, Option<Tick>> {
        Box::pin(async move {
            let response = self
                .send(HttpRequest::get(self.symbol_url(
                    "/api/market/realtime",
                    symbol,
                    "",
                )))
                .await?;
            if response.status == 404 {
                return Ok(None);
            }
            let dto: TickDto = decode(&ensure_success(response, Some(symbol))?)?;
            dto.into_tick().map(Some)
        })
    }

    fn symbol_ticks<'a>(
        &'a self,
        _symbol: &'a StockSymbol,
        _window: TickWindow,
    ) -> StoreFuture<'a, Vec<Tick>> {
        Box::pin(async {
            Err::<Vec<Tick>, _>(StoreError::Unsupported {
                operation: "symbol_ticks",
            })
        })
    }

    fn health<'a>(&'a self) -> ProbeFuture<'a> {
        Box::pin(async move {
            match self.send(HttpRequest::get(self.url("/health"))).await {
                Ok(response) => response.is_success(),
                Err(error) => {
                    tracing::debug!(%error, "market api health probe failed");
                    false
                }
            }
        })
    }
}

/// Map non-2xx statuses onto store errors and hand back the body otherwise.
fn ensure_success(response: HttpResponse, symbol: Option<&StockSymbol>) -> Result<String, StoreError> {
    if response.is_success() {
        return Ok(response.body);
    }
    let symbol = symbol.map(ToString::to_string).unwrap_or_default();
    match response.status {
        404 => Err(StoreError::NotFound { symbol }),
        409 => Err(StoreError::Conflict { symbol }),
        400 | 422 => Err(StoreError::Rejected {
            reason: truncate(&response.body),
        }),
        status => Err(StoreError::transport(format!(
            "market api returned {status}: {}",
            truncate(&response.body)
        ))),
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, StoreError> {
    serde_json::from_str(body)
        .map_err(|error| StoreError::transport(format!("malformed market api response: {error}")))
}

/// Server timestamps may omit the offset; those are UTC.
fn parse_server_timestamp(raw: &str) -> Result<UtcDateTime, ValidationError> {
    UtcDateTime::parse(raw).or_else(|error| UtcDateTime::parse(&format!("{raw}Z")).map_err(|_| error))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateStockRequest<'a> {
    symbol: &'a str,
    name: &'a str,
    exchange: &'a str,
    sector: &'a str,
    industry: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    initial_price: Decimal,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TickRequest {
    symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
    volume: u64,
    #[serde(with = "rust_decimal::serde::float")]
    high: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    low: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    open: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    previous_close: Decimal,
    timestamp: String,
}

impl From<&Tick> for TickRequest {
    fn from(tick: &Tick) -> Self {
        Self {
            symbol: tick.symbol.to_string(),
            price: tick.price.value(),
            volume: tick.volume.value(),
            high: tick.high.value(),
            low: tick.low.value(),
            open: tick.open.value(),
            previous_close: tick.previous_close.value(),
            timestamp: tick.timestamp.format_rfc3339(),
        }
    }
}

#[derive(Serialize)]
struct BatchRequest {
    ticks: Vec<TickRequest>,
}

#[derive(Deserialize)]
struct BatchResponse {
    count: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StockDto {
    id: Uuid,
    symbol: String,
    name: String,
    exchange: String,
    sector: String,
    industry: String,
    #[serde(with = "rust_decimal::serde::float")]
    current_price: Decimal,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    market_cap: Option<Decimal>,
    is_active: bool,
    created_at: String,
    #[serde(default)]
    updated_at: Option<String>,
}

impl StockDto {
    fn into_stock(self) -> Result<Stock, StoreError> {
        let currency = self
            .currency
            .unwrap_or_else(|| crate::DEFAULT_CURRENCY.to_owned());
        Ok(Stock {
            id: self.id,
            symbol: StockSymbol::parse(&self.symbol)?,
            name: self.name,
            exchange: self.exchange,
            sector: self.sector,
            industry: self.industry,
            current_price: Price::new(self.current_price, &currency)?,
            market_cap: self.market_cap.unwrap_or_default(),
            is_active: self.is_active,
            created_at: parse_server_timestamp(&self.created_at)?,
            updated_at: self
                .updated_at
                .as_deref()
                .map(parse_server_timestamp)
                .transpose()?,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickDto {
    id: Uuid,
    symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
    volume: i64,
    #[serde(with = "rust_decimal::serde::float")]
    high: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    low: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    open: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    previous_close: Decimal,
    timestamp: String,
}

impl TickDto {
    fn into_tick(self) -> Result<Tick, StoreError> {
        let timestamp = parse_server_timestamp(&self.timestamp)?;
        Ok(Tick::restore(
            self.id,
            crate::DEFAULT_CURRENCY,
            &self.symbol,
            crate::domain::TickValues {
                price: self.price,
                volume: self.volume,
                high: self.high,
                low: self.low,
                open: self.open,
                previous_close: self.previous_close,
            },
            timestamp,
        )?)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatisticsDto {
    total_stocks: usize,
    active_stocks: usize,
    #[serde(with = "rust_decimal::serde::float")]
    total_market_cap: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    average_price: Decimal,
    total_volume: u64,
    advancing_stocks: usize,
    declining_stocks: usize,
    unchanged_stocks: usize,
    generated_at: String,
}

impl StatisticsDto {
    fn into_statistics(self) -> Result<MarketStatistics, StoreError> {
        Ok(MarketStatistics {
            total_stocks: self.total_stocks,
            active_stocks: self.active_stocks,
            total_market_cap: self.total_market_cap,
            average_price: self.average_price,
            total_volume: self.total_volume,
            advancing_stocks: self.advancing_stocks,
            declining_stocks: self.declining_stocks,
            unchanged_stocks: self.unchanged_stocks,
            generated_at: parse_server_timestamp(&self.generated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::http_client::{HttpError, HttpMethod};

    /// Replays canned responses and records every request.
    struct ScriptedHttpClient {
        responses: Mutex<Vec<Result<HttpResponse, HttpError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().expect("lock").clone()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests.lock().expect("lock").push(request);
            let next = {
                let mut responses = self.responses.lock().expect("lock");
                if responses.is_empty() {
                    Err(HttpError::new("no scripted response"))
                } else {
                    responses.remove(0)
                }
            };
            Box::pin(async move { next })
        }
    }

    fn store(client: &Arc<ScriptedHttpClient>) -> HttpMarketStore {
        HttpMarketStore::with_http_client("http://market.test/", client.clone())
    }

    fn symbol(raw: &str) -> StockSymbol {
        StockSymbol::parse(raw).expect("symbol")
    }

    #[tokio::test]
    async fn missing_stock_maps_to_none() {
        let client = ScriptedHttpClient::new(vec![Ok(HttpResponse::new(404, ""))]);

        let found = store(&client).get_stock(&symbol("ZZZ")).await.expect("get");

        assert!(found.is_none());
        assert_eq!(client.requests()[0].url, "http://market.test/api/stocks/ZZZ");
    }

    #[tokio::test]
    async fn stock_dto_without_offset_is_read_as_utc() {
        let body = r#"[{
            "id": "6f1c1f0e-8a7d-4c1e-9a43-0d2b1f9d7a10",
            "symbol": "AAPL",
            "name": "Apple Inc.",
            "exchange": "NASDAQ",
            "sector": "Technology",
            "industry": "Consumer Electronics",
            "currentPrice": 175.5,
            "currency": "USD",
            "marketCap": 0,
            "isActive": true,
            "createdAt": "2025-01-02T03:04:05.123456",
            "updatedAt": null
        }]"#;
        let client = ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(body))]);

        let stocks = store(&client)
            .list_stocks(StockFilter::active())
            .await
            .expect("list");

        assert_eq!(stocks.len(), 1);
        assert_eq!(stocks[0].current_price.value(), dec!(175.5));
        assert_eq!(
            stocks[0].created_at,
            UtcDateTime::parse("2025-01-02T03:04:05.123456Z").expect("timestamp")
        );
    }

    #[tokio::test]
    async fn price_update_sends_bare_number() {
        let client = ScriptedHttpClient::new(vec![Ok(HttpResponse::new(204, ""))]);

        store(&client)
            .update_stock_price(&symbol("AAPL"), Price::usd(dec!(177.26)).expect("price"))
            .await
            .expect("update");

        let request = &client.requests()[0];
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.url, "http://market.test/api/stocks/AAPL/price");
        assert_eq!(request.body.as_deref(), Some("177.26"));
    }

    #[tokio::test]
    async fn batch_posts_camel_case_ticks() {
        let client = ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(
            r#"{"count":1,"message":"ok"}"#,
        ))]);
        let tick = Tick::create(
            "AAPL",
            dec!(177.26),
            500_000,
            dec!(178.15),
            dec!(176.37),
            dec!(175.50),
            dec!(175.50),
            None,
        )
        .expect("tick");

        let written = store(&client).append_ticks(vec![tick]).await.expect("batch");

        assert_eq!(written, 1);
        let body: serde_json::Value =
            serde_json::from_str(client.requests()[0].body.as_deref().expect("body"))
                .expect("json");
        assert_eq!(body["ticks"][0]["previousClose"], serde_json::json!(175.5));
        assert_eq!(body["ticks"][0]["volume"], serde_json::json!(500_000));
    }

    #[tokio::test]
    async fn status_codes_map_to_store_errors() {
        let client = ScriptedHttpClient::new(vec![
            Ok(HttpResponse::new(404, "")),
            Ok(HttpResponse::new(503, "down")),
        ]);
        let store = store(&client);
        let price = Price::usd(dec!(1)).expect("price");

        let missing = store
            .update_stock_price(&symbol("NOPE"), price.clone())
            .await
            .expect_err("404");
        let down = store
            .update_stock_price(&symbol("AAPL"), price)
            .await
            .expect_err("503");

        assert!(matches!(missing, StoreError::NotFound { .. }));
        assert!(matches!(down, StoreError::Transport(_)));
    }

    #[tokio::test]
    async fn health_is_false_on_transport_failure() {
        let client = ScriptedHttpClient::new(vec![Err(HttpError::new("connection refused"))]);
        assert!(!store(&client).health().await);
    }

    #[tokio::test]
    async fn history_reads_are_unsupported() {
        let client = ScriptedHttpClient::new(Vec::new());
        let err = store(&client).recent_ticks(10).await.expect_err("unsupported");
        assert!(matches!(err, StoreError::Unsupported { .. }));
    }
}
