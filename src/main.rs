mod steps;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::{Context, Result};
use bus::Bus;
use clap::Parser;
use mimalloc::MiMalloc;
use net::HttpRequest;
use router::{PageState, Router, RouterConfig, RouterState, run_until_settled};
use runtime_net::start_net_runtime;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use url::Url;

use crate::steps::Step;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "pageshift", about = "Drive in-place page navigation against a live site")]
struct Args {
    /// Page to start on
    url: String,

    /// TOML config with [prefetch] and [net] sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// click:<href>, hover:<href>, submit:<n>, goto:<href>, back or forward (repeatable)
    #[arg(short, long = "step")]
    steps: Vec<Step>,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Seconds to wait for each step to settle
    #[arg(long, default_value_t = 15)]
    timeout: u64,

    /// Print the final document
    #[arg(long)]
    dump: bool,
}

fn describe(state: &RouterState) -> String {
    match state {
        RouterState::Idle => "idle".to_string(),
        RouterState::Navigating { navigation, .. } => {
            format!("navigating to {}", navigation.location.url)
        }
        RouterState::Submitting { submission, .. } => {
            format!("submitting {} {}", submission.method, submission.action)
        }
    }
}

fn load_start_page(config: &RouterConfig, url: &str) -> Result<PageState> {
    let agent = net::build_agent(&config.net)?;
    let response = net::fetch(&agent, &config.net, &HttpRequest::get(url), &AtomicBool::new(false))
        .with_context(|| format!("fetching start page {url}"))?;
    let final_url = Url::parse(&response.url).context("start page url")?;
    log::info!("loaded {final_url} ({} bytes, status {})", response.body.len(), response.status);
    Ok(PageState::parse(final_url, &response.text()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    TermLogger::init(args.log_level, log_config, TerminalMode::Stderr, ColorChoice::Auto)
        .context("installing logger")?;

    let config = match &args.config {
        Some(path) => RouterConfig::load(path)?,
        None => RouterConfig::default(),
    };

    let page = load_start_page(&config, &args.url)?;
    let (bus, cmd_rx) = Bus::new();
    start_net_runtime(cmd_rx, bus.evt_tx.clone(), config.net.clone())?;

    let mut router = Router::new(page, bus.cmd_tx.clone(), config);
    router.init();
    let _sub = router.subscribe(|state| log::info!("state: {}", describe(state)));

    let timeout = Duration::from_secs(args.timeout);
    for step in &args.steps {
        log::info!("step {step}");
        steps::apply(&mut router, step)?;
        if !run_until_settled(&mut router, &bus.evt_rx, timeout) {
            log::warn!("step {step} did not settle within {timeout:?}");
        }
    }

    let page = router.page();
    println!("url: {}", page.url);
    println!("title: {}", page.title().unwrap_or_default());
    if args.dump {
        println!("{}", page.to_html());
    }

    router.dispose();
    Ok(())
}
