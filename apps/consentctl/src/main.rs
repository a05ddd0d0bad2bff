use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use consent_core::{
    context::ExecutionContext, prompt::ConsentPrompt, scripts::TracingScriptLoader, Collaborators,
    ConsentController,
};
use serde_json::{json, Value};
use shared::{
    config::{resolve_toml, Configuration},
    domain::ServiceName,
    record::SeedData,
};
use storage::FileCookieJar;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "consentctl", about = "Inspect and change the analytics consent decision")]
struct Cli {
    #[arg(long, default_value = "consent-cookies.json")]
    cookie_file: PathBuf,
    /// TOML consent options; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Status,
    Accept {
        /// Seed data as `<service>=<json>`, repeatable, replayed in order.
        #[arg(long = "seed", value_parser = parse_seed)]
        seeds: Vec<(ServiceName, Value)>,
    },
    Deny,
    Register {
        service: ServiceName,
        event: String,
    },
    RunCommand {
        service: ServiceName,
        command: String,
    },
    Data {
        service: ServiceName,
    },
    PageView {
        path: String,
    },
}

struct PrintPrompt;

impl ConsentPrompt for PrintPrompt {
    fn show(&self) {
        eprintln!("no consent decision recorded; run `consentctl accept` or `consentctl deny`");
    }
}

fn parse_seed(raw: &str) -> Result<(ServiceName, Value), String> {
    let (service, payload) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <service>=<json>, got '{raw}'"))?;
    let service = service.parse::<ServiceName>().map_err(|e| e.to_string())?;
    let payload = serde_json::from_str(payload).map_err(|e| format!("invalid seed json: {e}"))?;
    Ok((service, payload))
}

fn load_config(path: Option<&PathBuf>) -> Result<Configuration> {
    let Some(path) = path else {
        return Ok(Configuration::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read consent options '{}'", path.display()))?;
    Ok(resolve_toml(&raw))
}

fn parse_json(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("invalid json payload '{raw}'"))
}

fn execute(cli: Cli) -> Result<String> {
    let config = load_config(cli.config.as_ref())?;
    let ctx = ExecutionContext::browser();
    let collaborators = Collaborators::new(Arc::new(FileCookieJar::new(&cli.cookie_file)))
        .with_script_loader(Arc::new(TracingScriptLoader))
        .with_prompt(Arc::new(PrintPrompt));
    let controller = ConsentController::install_resolved(&ctx, config, collaborators)
        .ok_or_else(|| anyhow!("consent controller could not be installed"))?;

    let output = match cli.command {
        Command::Status => serde_json::to_value(controller.status())?,
        Command::Accept { seeds } => {
            let mut seed_data = SeedData::new();
            for (service, payload) in seeds {
                seed_data.entry(service).or_default().push(payload);
            }
            let ok = controller.set_tracking_accepted(true, seed_data)?;
            info!(cookie_file = %cli.cookie_file.display(), "consentctl: tracking accepted");
            json!({ "ok": ok, "status": controller.status() })
        }
        Command::Deny => {
            let ok = controller.set_tracking_accepted(false, SeedData::new())?;
            info!(cookie_file = %cli.cookie_file.display(), "consentctl: tracking denied");
            json!({ "ok": ok, "status": controller.status() })
        }
        Command::Register { service, event } => {
            let event = parse_json(&event)?;
            json!({ "ok": controller.register_data(service, &event) })
        }
        Command::RunCommand { service, command } => {
            let command = parse_json(&command)?;
            json!({ "ok": controller.run_command(service, &command) })
        }
        Command::Data { service } => Value::Array(controller.registered_data(service)),
        Command::PageView { path } => json!({ "ok": controller.track_page_view(&path) }),
    };

    Ok(serde_json::to_string_pretty(&output)?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();
    println!("{}", execute(cli)?);
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
