use anyhow::{Result, bail};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::config::TRADING_DAYS_PER_YEAR;

#[derive(Deserialize, Serialize, Debug)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Deserialize, Serialize, Debug)]
struct YahooChart {
    result: Vec<YahooResult>,
}

#[derive(Deserialize, Serialize, Debug)]
struct YahooResult {
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Deserialize, Serialize, Debug)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Deserialize, Serialize, Debug)]
struct YahooQuote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Represents a single candlestick data point (OHLCV).
#[derive(Clone, Debug)]
#[allow(dead_code)]
pub struct Candle {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Holds historical stock data for a specific symbol.
#[derive(Clone, Debug)]
pub struct StockData {
    pub symbol: String,
    pub history: Vec<Candle>,
}

/// Fetches historical stock data from Yahoo Finance, backed by a local
/// JSON cache under `.cache/` with a 24-hour freshness window.
///
/// # Arguments
/// * `symbol` - The stock ticker symbol (e.g., "VNQ").
/// * `range` - The time range to fetch (e.g., "1y", "5y").
pub async fn fetch_range(symbol: &str, range: &str) -> Result<StockData> {
    let cache_dir = std::path::Path::new(".cache");
    if !cache_dir.exists() {
        std::fs::create_dir(cache_dir)?;
    }

    let cache_file = cache_dir.join(format!("{}_{}.json", symbol, range));

    let response: YahooChartResponse = if cache_file.exists() {
        let metadata = std::fs::metadata(&cache_file)?;
        let modified = metadata.modified()?;
        let age = std::time::SystemTime::now().duration_since(modified)?;

        if age.as_secs() < 86400 {
            info!("Loading {} from cache...", symbol);
            let file = std::fs::File::open(&cache_file)?;
            let reader = std::io::BufReader::new(file);
            serde_json::from_reader(reader)?
        } else {
            info!("Cache expired for {}, fetching...", symbol);
            match fetch_from_api(symbol, range, &cache_file).await {
                Ok(fresh) => fresh,
                Err(fetch_err) => {
                    warn!(
                        "Refresh failed for {} ({}), using stale cache",
                        symbol, fetch_err
                    );
                    let file = std::fs::File::open(&cache_file)?;
                    let reader = std::io::BufReader::new(file);
                    serde_json::from_reader(reader)?
                }
            }
        }
    } else {
        info!("Cache miss for {}, fetching...", symbol);
        fetch_from_api(symbol, range, &cache_file).await?
    };

    let result = response
        .chart
        .result
        .first()
        .ok_or(anyhow::anyhow!("No data found for {}", symbol))?;

    let mut history = Vec::new();
    let quotes = &result.indicators.quote[0];

    for (i, &timestamp) in result.timestamp.iter().enumerate() {
        if let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
            quotes.open[i],
            quotes.high[i],
            quotes.low[i],
            quotes.close[i],
            quotes.volume[i],
        ) {
            history.push(Candle {
                date: Utc.timestamp_opt(timestamp, 0).unwrap(),
                open,
                high,
                low,
                close,
                volume,
            });
        }
    }

    Ok(StockData {
        symbol: symbol.to_uppercase(),
        history,
    })
}

async fn fetch_from_api(
    symbol: &str,
    range: &str,
    cache_path: &std::path::Path,
) -> Result<YahooChartResponse> {
    let url = format!(
        "https://query1.finance.yahoo.com/v8/finance/chart/{}?range={}&interval=1d",
        symbol, range
    );

    let mut attempts = 0;
    let max_attempts = 3;

    loop {
        attempts += 1;
        match reqwest::Client::new()
            .get(&url)
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await
        {
            Ok(resp) => match resp.json::<YahooChartResponse>().await {
                Ok(resp_json) => {
                    // Save to cache
                    let file = std::fs::File::create(cache_path)?;
                    let writer = std::io::BufWriter::new(file);
                    serde_json::to_writer(writer, &resp_json)?;

                    return Ok(resp_json);
                }
                Err(e) => {
                    if attempts >= max_attempts {
                        return Err(e.into());
                    }
                    warn!(
                        "Failed to parse JSON for {} (attempt {}/{}): {}",
                        symbol, attempts, max_attempts, e
                    );
                }
            },
            Err(e) => {
                if attempts >= max_attempts {
                    return Err(e.into());
                }
                warn!(
                    "Failed to fetch data for {} (attempt {}/{}): {}",
                    symbol, attempts, max_attempts, e
                );
            }
        }

        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    }
}

impl StockData {
    #[allow(dead_code)]
    pub fn new_mock(symbol: &str, days: usize) -> Self {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        let mut history = Vec::with_capacity(days);
        let mut current_price: f64 = 100.0;
        let mut current_date = Utc::now() - Duration::days(days as i64);

        for _ in 0..days {
            let volatility = 0.02; // 2% daily volatility
            let change_pct: f64 = rng.gen_range(-volatility..volatility);
            let open = current_price;
            let close = open * (1.0 + change_pct);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(1000.0..10000.0);

            history.push(Candle {
                date: current_date,
                open,
                high,
                low,
                close,
                volume,
            });

            current_price = close;
            current_date += Duration::days(1);
        }

        Self {
            symbol: symbol.to_string(),
            history,
        }
    }
}

/// Daily and cumulative returns for a fixed asset universe over a shared
/// window of trading dates.
///
/// Ticker order is preserved from the input and defines column order in the
/// daily-return matrix and the covariance matrix. All fields are derived once
/// at construction and read-only afterwards.
#[derive(Clone, Debug)]
pub struct AssetReturns {
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    daily_returns: Vec<Vec<f64>>,
    cumulative_returns: Vec<f64>,
    covariance: Vec<Vec<f64>>,
}

impl AssetReturns {
    /// Fetches price history for every ticker and derives the return data
    /// the simulation consumes.
    pub async fn load(tickers: &[String], range: &str) -> Result<Self> {
        if tickers.is_empty() {
            bail!("empty asset universe: at least one ticker is required");
        }

        let mut histories = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let data = fetch_range(ticker, range).await?;
            if data.history.is_empty() {
                bail!("no price history returned for {}", ticker);
            }
            histories.push(data.history);
        }

        Self::from_candles(tickers.to_vec(), histories)
    }

    /// Builds the return data from raw candle histories, aligning all assets
    /// on the intersection of their trading dates.
    pub fn from_candles(tickers: Vec<String>, histories: Vec<Vec<Candle>>) -> Result<Self> {
        if tickers.is_empty() {
            bail!("empty asset universe: at least one ticker is required");
        }
        if histories.len() != tickers.len() {
            bail!(
                "got {} price histories for {} tickers",
                histories.len(),
                tickers.len()
            );
        }

        let closes_by_date: Vec<HashMap<NaiveDate, f64>> = histories
            .iter()
            .map(|history| {
                history
                    .iter()
                    .map(|candle| (candle.date.date_naive(), candle.close))
                    .collect()
            })
            .collect();

        // Intersection of trading dates across the universe, ascending.
        let mut dates: Vec<NaiveDate> = closes_by_date[0]
            .keys()
            .filter(|date| closes_by_date.iter().all(|map| map.contains_key(*date)))
            .copied()
            .collect();
        dates.sort();

        if dates.len() < 3 {
            bail!(
                "insufficient overlapping history: only {} shared trading days across {}",
                dates.len(),
                tickers.join(", ")
            );
        }

        let k = tickers.len();
        let mut daily_returns = Vec::with_capacity(dates.len() - 1);
        for window in dates.windows(2) {
            let row: Vec<f64> = closes_by_date
                .iter()
                .map(|map| map[&window[1]] / map[&window[0]] - 1.0)
                .collect();
            daily_returns.push(row);
        }

        let cumulative_returns: Vec<f64> = (0..k)
            .map(|col| {
                daily_returns
                    .iter()
                    .map(|row| 1.0 + row[col])
                    .product::<f64>()
                    - 1.0
            })
            .collect();

        let covariance = annualized_covariance(&daily_returns, k);

        info!(
            "Aligned {} trading days across {} assets ({})",
            dates.len(),
            k,
            tickers.join(", ")
        );

        Ok(Self {
            tickers,
            dates,
            daily_returns,
            cumulative_returns,
            covariance,
        })
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    #[allow(dead_code)]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    #[allow(dead_code)]
    pub fn daily_returns(&self) -> &[Vec<f64>] {
        &self.daily_returns
    }

    /// Total compounded return per asset over the whole window, fractional.
    pub fn cumulative_returns(&self) -> &[f64] {
        &self.cumulative_returns
    }

    /// Annualized k x k covariance matrix of daily returns.
    pub fn covariance(&self) -> &[Vec<f64>] {
        &self.covariance
    }
}

/// Sample covariance (n-1 denominator) of the daily-return columns,
/// annualized by the number of trading days per year.
fn annualized_covariance(daily_returns: &[Vec<f64>], k: usize) -> Vec<Vec<f64>> {
    let n = daily_returns.len();
    let means: Vec<f64> = (0..k)
        .map(|col| daily_returns.iter().map(|row| row[col]).sum::<f64>() / n as f64)
        .collect();

    let mut cov = vec![vec![0.0; k]; k];
    for i in 0..k {
        for j in i..k {
            let mut sum = 0.0;
            for row in daily_returns {
                sum += (row[i] - means[i]) * (row[j] - means[j]);
            }
            let covariance = sum / (n as f64 - 1.0) * TRADING_DAYS_PER_YEAR as f64;
            cov[i][j] = covariance;
            cov[j][i] = covariance;
        }
    }

    cov
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(date: NaiveDate, close: f64) -> Candle {
        Candle {
            date: Utc.from_utc_datetime(&date.and_hms_opt(14, 30, 0).unwrap()),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 3, d).unwrap()
    }

    #[test]
    fn test_daily_and_cumulative_returns() {
        let closes = [100.0, 110.0, 99.0];
        let history: Vec<Candle> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| candle(day(1 + i as u32), close))
            .collect();

        let returns = AssetReturns::from_candles(vec!["VNQ".into()], vec![history]).unwrap();

        let daily = returns.daily_returns();
        assert_eq!(daily.len(), 2);
        assert!((daily[0][0] - 0.10).abs() < 1e-12);
        assert!((daily[1][0] + 0.10).abs() < 1e-12);

        // (1.1 * 0.9) - 1 = -0.01
        assert!((returns.cumulative_returns()[0] + 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_covariance_symmetric_and_annualized() {
        // Asset A returns: 0.1, -0.1, 0.1 => sample variance 0.01333...,
        // annualized 3.36. Asset B moves opposite A.
        let a: Vec<Candle> = [100.0, 110.0, 99.0, 108.9]
            .iter()
            .enumerate()
            .map(|(i, &close)| candle(day(1 + i as u32), close))
            .collect();
        let b: Vec<Candle> = [100.0, 90.0, 99.0, 89.1]
            .iter()
            .enumerate()
            .map(|(i, &close)| candle(day(1 + i as u32), close))
            .collect();

        let returns =
            AssetReturns::from_candles(vec!["A".into(), "B".into()], vec![a, b]).unwrap();

        let cov = returns.covariance();
        assert_eq!(cov.len(), 2);
        assert!((cov[0][0] - 3.36).abs() < 1e-6, "var(A) = {}", cov[0][0]);
        assert!((cov[0][1] - cov[1][0]).abs() < 1e-12, "must be symmetric");
        assert!(cov[0][1] < 0.0, "opposite movers should have negative covariance");
        assert!(cov[1][1] > 0.0);
    }

    #[test]
    fn test_alignment_uses_date_intersection() {
        let a: Vec<Candle> = (1..=4).map(|d| candle(day(d), 100.0 + d as f64)).collect();
        // B is missing day 3; only days 1, 2, 4 are shared.
        let b: Vec<Candle> = [1, 2, 4]
            .iter()
            .map(|&d| candle(day(d), 50.0 + d as f64))
            .collect();

        let returns =
            AssetReturns::from_candles(vec!["A".into(), "B".into()], vec![a, b]).unwrap();

        assert_eq!(returns.dates().len(), 3);
        assert_eq!(returns.daily_returns().len(), 2);
        assert_eq!(returns.daily_returns()[0].len(), 2);
        // Second aligned return for A spans day 2 -> day 4.
        assert!((returns.daily_returns()[1][0] - (104.0 / 102.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_insufficient_overlap_rejected() {
        let a = vec![candle(day(1), 100.0), candle(day(2), 101.0)];
        let b = vec![candle(day(1), 50.0), candle(day(3), 51.0)];

        let result = AssetReturns::from_candles(vec!["A".into(), "B".into()], vec![a, b]);
        assert!(result.is_err(), "one shared day cannot produce returns");
    }

    #[test]
    fn test_empty_universe_rejected() {
        let result = AssetReturns::from_candles(vec![], vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_mock_history_produces_full_matrices() {
        let mock = StockData::new_mock("TEST", 30);
        let other = StockData::new_mock("OTHER", 30);
        let returns = AssetReturns::from_candles(
            vec![mock.symbol.clone(), other.symbol.clone()],
            vec![mock.history, other.history],
        )
        .unwrap();

        assert_eq!(returns.tickers().len(), 2);
        assert_eq!(returns.covariance().len(), 2);
        assert_eq!(returns.cumulative_returns().len(), 2);
        for i in 0..2 {
            assert!(returns.covariance()[i][i] >= 0.0, "variance is non-negative");
        }
    }
}
