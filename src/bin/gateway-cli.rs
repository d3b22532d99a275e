use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use authz_gateway::admin::RATE_LIMITS_PATH;
use authz_gateway::config::SECRET_ENV_VAR;
use authz_gateway::identity::CredentialIssuer;
use authz_gateway::rbac::Role;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the authorization gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin credential sent as a bearer token.
    #[arg(short, long, env = "GATEWAY_ADMIN_TOKEN", default_value = "")]
    token: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rate-limit violation stats for a time window
    Stats {
        /// Window in seconds
        #[arg(short, long, default_value_t = 3600)]
        window: i64,
    },
    /// Most recent rate-limit violations
    Violations {
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
    /// Clear the violation log and every rate-limit counter
    Reset,
    /// Mint a credential signed with the gateway secret
    Token {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "user")]
        role: Role,
        /// Mark the email address as not verified
        #[arg(long)]
        unverified: bool,
        /// Lifetime in seconds
        #[arg(long, default_value_t = 3600)]
        ttl: u64,
        #[arg(long, env = SECRET_ENV_VAR, hide_env_values = true)]
        secret: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Token {
        subject,
        email,
        role,
        unverified,
        ttl,
        secret,
    } = &cli.command
    {
        let token = CredentialIssuer::new(secret, *ttl).issue(subject, email, *role, !unverified)?;
        println!("{token}");
        return Ok(());
    }

    let client = reqwest::Client::new();
    let mut headers = HeaderMap::new();
    if !cli.token.is_empty() {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", cli.token))?,
        );
    }
    let endpoint = format!("{}{}", cli.url.trim_end_matches('/'), RATE_LIMITS_PATH);

    match cli.command {
        Commands::Stats { window } => {
            let res = client
                .get(&endpoint)
                .query(&[("window", window.to_string()), ("limit", "0".to_string())])
                .headers(headers)
                .send()
                .await?;
            print_field(res, "stats").await?;
        }
        Commands::Violations { limit } => {
            let res = client
                .get(&endpoint)
                .query(&[("limit", limit)])
                .headers(headers)
                .send()
                .await?;
            print_field(res, "recent").await?;
        }
        Commands::Reset => {
            let res = client.delete(&endpoint).headers(headers).send().await?;
            print_field(res, "").await?;
        }
        Commands::Token { .. } => {}
    }

    Ok(())
}

/// Print one top-level field of the JSON body, or the whole body for `""`.
async fn print_field(res: reqwest::Response, field: &str) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    let out = if field.is_empty() {
        &json
    } else {
        json.get(field).unwrap_or(&json)
    };
    println!("{}", serde_json::to_string_pretty(out)?);
    Ok(())
}
