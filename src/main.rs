mod api;
mod server;

use clap::{Args, Parser, Subcommand};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use post_enhancer::config::EnhancerConfig;
use post_enhancer::{
    Category, DiagnosticsScorer, EnhancementOrchestrator, EnhancementRequest, EnhancementResult,
    Identity, PlatformSlot, Tone,
};

#[derive(Parser)]
#[command(name = "post-enhancer", about = "Rewrite a post for several social platforms")]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Enhance(EnhanceArgs),
    Score(ScoreArgs),
    History(HistoryArgs),
    Serve(ServeArgs),
    InitConfig(InitConfigArgs),
}

#[derive(Args, Debug, Clone)]
struct EnhanceArgs {
    #[arg(long)]
    text: Option<String>,
    #[arg(long, default_value = "general")]
    category: String,
    #[arg(long, default_value = "professional")]
    tone: String,
    /// Repeatable; omit for every platform.
    #[arg(long = "platform")]
    platforms: Vec<String>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    offline: bool,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct ScoreArgs {
    #[arg(long)]
    text: Option<String>,
    #[arg(long, default_value = "general")]
    category: String,
    #[arg(long, default_value = "professional")]
    tone: String,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct HistoryArgs {
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    clear: bool,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 8787)]
    port: u16,
    #[arg(long)]
    offline: bool,
}

#[derive(Args, Debug, Clone)]
struct InitConfigArgs {
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();

    if let Command::InitConfig(args) = &cli.command {
        return run_init_config(cli.config.clone(), args.force);
    }

    let (config, _) = EnhancerConfig::load(cli.config)?;
    match cli.command {
        Command::Enhance(args) => run_enhance(args, config).await,
        Command::Score(args) => run_score(args),
        Command::History(args) => run_history(args, config).await,
        Command::Serve(args) => server::serve(args, config).await,
        Command::InitConfig(_) => Ok(()),
    }
}

async fn run_enhance(args: EnhanceArgs, config: EnhancerConfig) -> Result<(), String> {
    let text = read_text(args.text)?;
    let category = args
        .category
        .parse::<Category>()
        .map_err(|err| err.to_string())?;
    let tone = args.tone.parse::<Tone>().map_err(|err| err.to_string())?;
    let platforms = args
        .platforms
        .iter()
        .map(|value| value.parse::<PlatformSlot>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| err.to_string())?;
    let request =
        EnhancementRequest::new(text, category, tone, platforms).map_err(|err| err.to_string())?;

    let identity = identity_for(&config, args.user);
    let orchestrator = EnhancementOrchestrator::from_config(&config, args.offline)?;
    let result = orchestrator
        .enhance(&identity, &request)
        .await
        .map_err(|err| err.to_string())?;

    if args.json {
        let payload = serde_json::to_string_pretty(&result)
            .map_err(|err| format!("failed to serialize result: {}", err))?;
        println!("{}", payload);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn run_score(args: ScoreArgs) -> Result<(), String> {
    let text = read_text(args.text)?;
    let category = args
        .category
        .parse::<Category>()
        .map_err(|err| err.to_string())?;
    let tone = args.tone.parse::<Tone>().map_err(|err| err.to_string())?;
    let diagnostics = DiagnosticsScorer::score(&text, category, tone, None);

    if args.json {
        let payload = serde_json::to_string_pretty(&diagnostics)
            .map_err(|err| format!("failed to serialize diagnostics: {}", err))?;
        println!("{}", payload);
        return Ok(());
    }

    println!("Virality score: {}", diagnostics.virality_score);
    print_list("Insights", &diagnostics.insights);
    print_list("Why it may not get views", &diagnostics.view_reasons);
    print_list("Quick wins", &diagnostics.quick_wins);
    Ok(())
}

async fn run_history(args: HistoryArgs, config: EnhancerConfig) -> Result<(), String> {
    let identity = identity_for(&config, args.user);
    let orchestrator = EnhancementOrchestrator::from_config(&config, true)?;

    if args.clear {
        orchestrator
            .clear_history(&identity)
            .await
            .map_err(|err| err.to_string())?;
        println!("History cleared for {}", identity.key());
        return Ok(());
    }

    let records = orchestrator.history(&identity).await;
    if args.json {
        let payload = serde_json::to_string_pretty(&records)
            .map_err(|err| format!("failed to serialize history: {}", err))?;
        println!("{}", payload);
        return Ok(());
    }

    if records.is_empty() {
        println!("No history for {}", identity.key());
        return Ok(());
    }
    for record in records {
        let score = record
            .virality_score
            .map(|score| score.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} | {} | {}/{} | score {} | {}",
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.id,
            record.category,
            record.tone,
            score,
            preview(&record.original_text, 60)
        );
    }
    Ok(())
}

fn run_init_config(path: Option<PathBuf>, force: bool) -> Result<(), String> {
    let path = path.unwrap_or_else(|| PathBuf::from("config/enhancer.toml"));
    if path.exists() && !force {
        return Err(format!(
            "config already exists at {} (pass --force to overwrite)",
            path.display()
        ));
    }
    EnhancerConfig::default().write(&path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn print_result(result: &EnhancementResult) {
    println!(
        "Source: {} | Virality score: {}",
        result.source.label(),
        result.diagnostics.virality_score
    );
    for (slot, text) in result.platform_content.iter() {
        println!("\n[{}]\n{}", slot, text);
    }
    println!();
    print_list("Insights", &result.diagnostics.insights);
    print_list("Why it may not get views", &result.diagnostics.view_reasons);
    print_list("Quick wins", &result.diagnostics.quick_wins);
    print_list("Highlights", &result.diagnostics.highlights);

    let metrics = &result.diagnostics.engagement_metrics;
    println!(
        "Engagement: comments {} | likes {} | shares {} | views {} | time {} | ctr {} | saves {} | viral {}",
        metrics.comments,
        metrics.likes,
        metrics.shares,
        metrics.views,
        metrics.time_spent,
        metrics.click_through,
        metrics.save_rate,
        metrics.viral_coefficient
    );
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{}:", title);
    for item in items {
        println!("- {}", item);
    }
}

fn preview(text: &str, limit: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= limit {
        return flat;
    }
    let cut: String = flat.chars().take(limit).collect();
    format!("{}…", cut.trim_end())
}

fn identity_for(config: &EnhancerConfig, user: Option<String>) -> Identity {
    match user.filter(|id| !id.trim().is_empty()) {
        Some(id) if config.usage.is_admin(&id) => Identity::admin(id),
        Some(id) => Identity::user(id),
        None => Identity::guest(),
    }
}

fn read_text(arg: Option<String>) -> Result<String, String> {
    if let Some(text) = arg {
        if !text.trim().is_empty() {
            return Ok(text);
        }
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|err| format!("failed reading stdin: {}", err))?;
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Err("missing post text: pass --text or pipe stdin".to_string());
    }
    Ok(trimmed.to_string())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
