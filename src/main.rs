use std::sync::Arc;

use chrono::NaiveDate;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photo_search::config;
use photo_search::search::{
    DateRange, HttpSearchApi, MediaTypeFilter, SearchOrchestrator, SearchStrategy, SessionEvent, SortKey,
    StrategySource,
};

/// Console command / 控制台命令
#[derive(Debug, PartialEq)]
enum Command {
    Search(String),
    More,
    Retry,
    Strategy(SearchStrategy),
    Auto,
    Sort(SortKey),
    Type(MediaTypeFilter),
    Favorites(bool),
    Tag(Option<String>),
    Source(Option<String>),
    Dates(DateRange),
    Status,
    Quit,
}

/// `-` clears an optional value / `-` 表示清除
fn optional(arg: &str) -> Option<String> {
    match arg.trim() {
        "" | "-" => None,
        s => Some(s.to_string()),
    }
}

fn parse_date(arg: &str) -> Result<Option<NaiveDate>, String> {
    match optional(arg) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| format!("Invalid date '{}': {}", s, e)),
    }
}

fn parse_command(line: &str) -> Result<Command, String> {
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(Command::Search(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "more" => Ok(Command::More),
        "retry" => Ok(Command::Retry),
        "auto" => Ok(Command::Auto),
        "status" => Ok(Command::Status),
        "quit" | "q" => Ok(Command::Quit),
        "strategy" => SearchStrategy::parse(arg)
            .map(Command::Strategy)
            .ok_or_else(|| format!("Unknown strategy: {}", arg)),
        "sort" => SortKey::parse(arg)
            .map(Command::Sort)
            .ok_or_else(|| format!("Unknown sort key: {}", arg)),
        "type" => MediaTypeFilter::parse(arg)
            .map(Command::Type)
            .ok_or_else(|| format!("Unknown media type: {}", arg)),
        "fav" => match arg {
            "on" => Ok(Command::Favorites(true)),
            "off" => Ok(Command::Favorites(false)),
            _ => Err("Usage: :fav <on|off>".to_string()),
        },
        "tag" => Ok(Command::Tag(optional(arg))),
        "source" => Ok(Command::Source(optional(arg))),
        "dates" => {
            let mut parts = arg.split_whitespace();
            let from = parse_date(parts.next().unwrap_or("-"))?;
            let to = parse_date(parts.next().unwrap_or("-"))?;
            Ok(Command::Dates(DateRange::new(from, to)))
        }
        _ => Err(format!("Unknown command: :{}", name)),
    }
}

/// Print session events as they arrive, as JSON lines with `--json` / 输出会话事件
async fn print_events(orchestrator: SearchOrchestrator, mut events: broadcast::Receiver<SessionEvent>, json: bool) {
    loop {
        let event = events.recv().await;
        if json {
            if let Ok(ref event) = event {
                match serde_json::to_string(event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Failed to serialize event: {}", e),
                }
                continue;
            }
        }
        match event {
            Ok(SessionEvent::ResultsReplaced { count, has_more, from_cache }) => {
                let origin = if from_cache { " (cached)" } else { "" };
                println!("{} results{}{}", count, origin, if has_more { ", more available" } else { "" });
                for photo in orchestrator.results().iter().take(10) {
                    println!("  {}", photo.label());
                }
            }
            Ok(SessionEvent::ResultsAppended { added, count, has_more }) => {
                println!("+{} results, {} total{}", added, count, if has_more { ", more available" } else { "" });
            }
            Ok(SessionEvent::Failed { mode, message }) => {
                println!("Search failed ({:?}): {} - type :retry", mode, message);
            }
            Ok(SessionEvent::StrategyChanged { strategy, source }) => {
                println!("Strategy: {} ({:?})", strategy.as_str(), source);
            }
            Ok(SessionEvent::PhaseChanged { phase }) => {
                tracing::debug!("Phase: {:?}", phase);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Event printer lagged, {} events skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photo_search=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("photo-search built at {}", env!("BUILD_TIME"));

    // Load configuration / 加载配置
    let app_config = config::load_config().map_err(anyhow::Error::msg)?;
    tracing::info!(
        "Search endpoint: {}{}",
        app_config.api.base_url,
        app_config.api.search_path
    );

    let api = HttpSearchApi::new(
        &app_config.api.base_url,
        &app_config.api.search_path,
        app_config.api.timeout(),
    )?;
    let orchestrator = SearchOrchestrator::new(Arc::new(api), &app_config.search);

    let json_events = std::env::args().skip(1).any(|arg| arg == "--json");
    tokio::spawn(print_events(orchestrator.clone(), orchestrator.subscribe(), json_events));

    println!("Type a query to search, :more, :retry, :quit / 输入查询开始搜索");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(line.trim_end()) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        // Dispatching commands run in the background so typing is never blocked
        // 后台执行，不阻塞输入
        let session = orchestrator.clone();
        match command {
            Command::Search(query) => session.search(query),
            Command::More => {
                tokio::spawn(async move { session.load_more().await });
            }
            Command::Retry => {
                tokio::spawn(async move { session.retry().await });
            }
            Command::Strategy(strategy) => {
                tokio::spawn(async move { session.set_strategy(strategy, StrategySource::Manual).await });
            }
            Command::Auto => {
                tokio::spawn(async move { session.clear_manual_strategy().await });
            }
            Command::Sort(sort) => {
                tokio::spawn(async move { session.set_sort(sort).await });
            }
            Command::Type(type_filter) => {
                tokio::spawn(async move { session.set_type_filter(type_filter).await });
            }
            Command::Favorites(on) => {
                tokio::spawn(async move { session.set_favorites_only(on).await });
            }
            Command::Tag(tag) => {
                tokio::spawn(async move { session.set_tag(tag).await });
            }
            Command::Source(source) => {
                tokio::spawn(async move { session.set_source(source).await });
            }
            Command::Dates(range) => {
                tokio::spawn(async move { session.set_date_range(range).await });
            }
            Command::Status => {
                let snapshot = session.snapshot();
                let stats = session.cache_stats();
                println!(
                    "{:?} q='{}' strategy={} results={} more={} cache={}/{} hits",
                    snapshot.phase,
                    snapshot.params.query,
                    snapshot.params.strategy.as_str(),
                    snapshot.results.len(),
                    snapshot.has_more,
                    stats.entries,
                    stats.hits
                );
                if let Some(e) = snapshot.error {
                    println!("Last error: {}", e);
                }
            }
            Command::Quit => break,
        }
    }

    orchestrator.shutdown();
    tracing::info!("Session closed");
    Ok(())
}
