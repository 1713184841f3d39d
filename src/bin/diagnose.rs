use movielog::config::{AppConfig, ServiceAccountKey};
use movielog::sheets::SheetsClient;
use movielog::store::SheetBackend;

/// Connection diagnostics.
///
/// Walks the whole pipeline the server depends on - configuration, key
/// file, token exchange, spreadsheet metadata, row read - and stops at the
/// first failing step so the real error is the last line printed.
#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    println!("====== movielog connection diagnostics ======");

    println!("Reading configuration from the environment...");
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => fail("configuration", &e.to_string()),
    };
    println!("✓ Configuration loaded (spreadsheet {})", config.spreadsheet_id);

    println!("Reading the service-account key file...");
    let key = match ServiceAccountKey::from_file(&config.credentials_path) {
        Ok(key) => key,
        Err(e) => fail("key file", &e.to_string()),
    };
    println!("✓ Key file parsed (account {})", key.client_email);

    let client = match SheetsClient::new(key, &config) {
        Ok(client) => client,
        Err(e) => fail("HTTP client", &e.to_string()),
    };

    println!("Requesting an access token from Google...");
    if let Err(e) = client.access_token().await {
        fail("authentication", &e.to_string());
    }
    println!("✓ Authenticated");

    println!("Opening the spreadsheet...");
    let props = match client.sheet_props().await {
        Ok(props) => props,
        Err(e) => fail("spreadsheet", &e.to_string()),
    };
    println!("✓ Connected to tab '{}' (sheet id {})", props.title, props.sheet_id);

    println!("Reading rows...");
    let rows = match client.all_rows().await {
        Ok(rows) => rows,
        Err(e) => fail("row read", &e.to_string()),
    };
    println!("✓ Read {} row(s)", rows.len());

    for row in rows.iter().take(5) {
        println!("    {:?}", row);
    }
    if rows.len() > 5 {
        println!("    ... and {} more", rows.len() - 5);
    }

    println!("\nEverything looks good.");
}

fn fail(stage: &str, detail: &str) -> ! {
    eprintln!("✗ {} failed: {}", stage, detail);
    std::process::exit(1);
}
