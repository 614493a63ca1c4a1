use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "credchain-cli")]
#[command(about = "Management CLI for the CredChain registry gateway", long_about = None)]
struct Cli {
    #[arg(short, long, env = "CREDCHAIN_GATEWAY_URL", default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway, chain and contract status
    Health,
    /// List projects stored under a freelancer address
    Projects { builder: String },
    /// List projects commissioned by a client across known builders
    ClientProjects { client: String },
    /// Submit a review for a freelancer's project
    SubmitReview {
        freelancer: String,
        project_index: u64,
        rating: u8,
        #[arg(long)]
        comment: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
        Commands::Projects { builder } => {
            client.get(format!("{}/get_all_projects/{}", base, builder)).send().await?
        }
        Commands::ClientProjects { client: address } => {
            let res = client
                .get(format!("{}/get_projects_for_client/{}", base, address))
                .send()
                .await?;
            if let Some(skipped) = res.headers().get("x-skipped-builders") {
                eprintln!("Skipped builders: {}", skipped.to_str().unwrap_or("<unprintable>"));
            }
            res
        }
        Commands::SubmitReview {
            freelancer,
            project_index,
            rating,
            comment,
        } => {
            let mut body = json!({
                "freelancer": freelancer,
                "project_index": project_index,
                "rating": rating,
            });
            if let Some(comment) = comment {
                body["comment_hash"] = Value::String(comment);
            }
            client.post(format!("{}/submit_review", base)).json(&body).send().await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", rendered);
    } else {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("{}", rendered);
        std::process::exit(1);
    }
    Ok(())
}
