use coinwatch::core::history::PriceHistoryStore;
use coinwatch::core::schedule::{Event, ScriptedScheduler, Trigger};
use coinwatch::core::{Asset, Renderer, Tracker};
use coinwatch::store::{KeyValueStore, PRICES_COLLECTION};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn mount_price(server: &MockServer, asset: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .and(query_param("ids", asset))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    pub async fn create_mock_server() -> MockServer {
        let server = MockServer::start().await;
        mount_price(&server, "bitcoin", 200, r#"{"bitcoin":{"usd":43210.5}}"#).await;
        mount_price(&server, "ethereum", 200, r#"{"ethereum":{"usd":2500.25}}"#).await;
        server
    }
}

/// Writes a config pointing at `base_url` with its data under `data_dir`.
fn write_config(dir: &Path, base_url: &str, data_dir: &Path) -> String {
    let config_path = dir.join("config.yaml");
    let config_content = format!(
        r#"
assets:
  - id: "bitcoin"
    symbol: "BTC"
  - id: "ethereum"
    symbol: "ETH"
providers:
  coingecko:
    base_url: "{}"
data_path: "{}"
"#,
        base_url,
        data_dir.display()
    );
    fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path.to_string_lossy().into_owned()
}

async fn stored_history(data_dir: &Path, asset: &Asset) -> Vec<f64> {
    let store = KeyValueStore::open(data_dir);
    PriceHistoryStore::new(store.collection(PRICES_COLLECTION))
        .get_history(asset)
        .await
}

#[test_log::test(tokio::test)]
async fn test_once_persists_prices() {
    let server = test_utils::create_mock_server().await;
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path().join("data");
    let config_path = write_config(temp.path(), &server.uri(), &data_dir);

    for _ in 0..2 {
        let result = coinwatch::run_command(coinwatch::AppCommand::Once, Some(&config_path)).await;
        assert!(result.is_ok(), "Once failed with: {:?}", result.err());
    }

    let bitcoin = Asset::new("bitcoin", "BTC");
    let ethereum = Asset::new("ethereum", "ETH");
    assert_eq!(stored_history(&data_dir, &bitcoin).await, vec![43210.5, 43210.5]);
    assert_eq!(stored_history(&data_dir, &ethereum).await, vec![2500.25, 2500.25]);
}

#[test_log::test(tokio::test)]
async fn test_invalid_response_skips_only_that_asset() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_price(&server, "bitcoin", 200, r#"{"bitcoin":{"usd":43210.5}}"#).await;
    test_utils::mount_price(&server, "ethereum", 200, r#"{"ethereum":{}}"#).await;
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path().join("data");
    let config_path = write_config(temp.path(), &server.uri(), &data_dir);

    let result = coinwatch::run_command(coinwatch::AppCommand::Once, Some(&config_path)).await;
    assert!(result.is_ok(), "Once failed with: {:?}", result.err());

    let ethereum = Asset::new("ethereum", "ETH");
    assert!(stored_history(&data_dir, &ethereum).await.is_empty());
    let bitcoin = Asset::new("bitcoin", "BTC");
    assert_eq!(stored_history(&data_dir, &bitcoin).await, vec![43210.5]);
}

#[test_log::test(tokio::test)]
async fn test_once_fails_when_no_price_is_fetched() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_price(&server, "bitcoin", 503, "").await;
    test_utils::mount_price(&server, "ethereum", 503, "").await;
    let temp = TempDir::new().unwrap();
    let config_path = write_config(temp.path(), &server.uri(), &temp.path().join("data"));

    let result = coinwatch::run_command(coinwatch::AppCommand::Once, Some(&config_path)).await;
    assert_eq!(result.unwrap_err().to_string(), "Could not fetch any price");
}

#[test_log::test(tokio::test)]
async fn test_history_and_compare_commands() {
    let server = test_utils::create_mock_server().await;
    let temp = TempDir::new().unwrap();
    let config_path = write_config(temp.path(), &server.uri(), &temp.path().join("data"));

    coinwatch::run_command(coinwatch::AppCommand::Once, Some(&config_path))
        .await
        .unwrap();

    for command in [
        coinwatch::AppCommand::History(None),
        coinwatch::AppCommand::History(Some("btc".to_string())),
        coinwatch::AppCommand::Compare,
    ] {
        let result = coinwatch::run_command(command.clone(), Some(&config_path)).await;
        assert!(result.is_ok(), "{command:?} failed with: {:?}", result.err());
    }

    let result = coinwatch::run_command(
        coinwatch::AppCommand::History(Some("solana".to_string())),
        Some(&config_path),
    )
    .await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
async fn test_missing_config_file_is_error() {
    let result = coinwatch::run_command(
        coinwatch::AppCommand::Once,
        Some("/nonexistent/coinwatch/config.yaml"),
    )
    .await;
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("Failed to read config file")
    );
}

struct TextLog(Arc<Mutex<Vec<(String, String)>>>);

impl Renderer for TextLog {
    fn set_text(&mut self, element_id: &str, text: &str) {
        self.0
            .lock()
            .unwrap()
            .push((element_id.to_string(), text.to_string()));
    }
    fn extend_chart(&mut self, _chart_id: &str, _point: f64) {}
    fn show(&mut self, _element_id: &str) {}
    fn hide(&mut self, _element_id: &str) {}
    fn notify(&mut self, _message: &str) {}
    fn log_price(&mut self, _time: &str, asset: &str, price: &str) {
        self.0
            .lock()
            .unwrap()
            .push(("price-log".to_string(), format!("{asset} {price}")));
    }
}

#[test_log::test(tokio::test)]
async fn test_scripted_cycles_against_mock_api() {
    let server = test_utils::create_mock_server().await;
    let provider = coinwatch::providers::coingecko::CoinGeckoProvider::new(
        &coinwatch::core::config::CoinGeckoConfig {
            base_url: server.uri(),
            ..Default::default()
        },
    )
    .unwrap();
    let texts = Arc::new(Mutex::new(Vec::new()));
    let assets = vec![Asset::new("bitcoin", "BTC"), Asset::new("ethereum", "ETH")];
    let tracker = Tracker::new(
        assets.clone(),
        Arc::new(provider),
        PriceHistoryStore::new(KeyValueStore::in_memory().collection(PRICES_COLLECTION)),
        Box::new(TextLog(Arc::clone(&texts))),
    );

    let mut scheduler = ScriptedScheduler::new([
        Event::Refresh(Trigger::Initial),
        Event::Refresh(Trigger::Timer),
        Event::Refresh(Trigger::Manual),
    ]);
    assert_eq!(tracker.run(&mut scheduler).await, 3);

    let history = tracker.history().get_history(&assets[0]).await;
    assert_eq!(history, vec![43210.5; 3]);

    let texts = texts.lock().unwrap();
    assert!(
        texts
            .iter()
            .any(|(id, text)| id == "bitcoin-price" && text == "Current Price: $43,210.50")
    );
    assert!(
        texts
            .iter()
            .any(|(id, text)| id == "ethereum-change" && text == "+0.00%")
    );
    assert!(
        texts
            .iter()
            .any(|(id, text)| id == "ethereum-volatility" && text == "Volatility: 0.00")
    );
    let logged = texts
        .iter()
        .filter(|(id, text)| id == "price-log" && text == "Bitcoin $43,210.50")
        .count();
    assert_eq!(logged, 3);
}
