use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "forum-admin")]
#[command(about = "Operator CLI for a running forum server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8092")]
    url: String,

    /// Value of `[admin] api_key` in conf/app.ini.
    #[arg(short, long, env = "FORUM_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version, uptime and active settings generation
    Status,
    /// Show the non-secret view of the active settings
    Settings,
    /// List loaded languages and their message counts
    Locales,
    /// Force a reload of one domain (settings or assets)
    Reload { domain: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match &cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")),
        Commands::Settings => client.get(format!("{base}/admin/settings")),
        Commands::Locales => client.get(format!("{base}/admin/locales")),
        Commands::Reload { domain } => client.post(format!("{base}/admin/reload/{domain}")),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            if !text.is_empty() {
                eprintln!("Response: {}", text);
            }
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
