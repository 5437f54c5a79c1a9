use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
    http::{Response, StatusCode},
    routing::{get, post},
    Router,
};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};

use cards::catalog::CatalogError;
use draft::{
    game::Drafter,
    handlers,
    pool::CardPool,
    rules::RoundRules,
    server::{DraftServer, SessionView},
    DraftConfig,
};

mod cards;
mod draft;

pub type Res<T> = Result<T, String>;

pub fn err<T, S: ToString>(message: S) -> Res<T> {
    Err(message.to_string())
}

#[derive(serde::Serialize)]
struct Resp {
    message: String,
    success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<SessionView>,
}

impl Resp {
    fn axum<S: ToString>(
        message: S,
        status: StatusCode,
        session: Option<SessionView>,
    ) -> Response<String> {
        match serde_json::ser::to_string(&Self {
            message: message.to_string(),
            success: status == StatusCode::OK,
            session,
        }) {
            Ok(body) => {
                let mut resp = Response::new(body);
                *resp.status_mut() = status;
                resp
            }
            Err(e) => {
                let mut resp = Response::new(format!("Failed to JSON encode response: {e}"));
                *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                resp
            }
        }
    }

    fn ok<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::OK, None)
    }

    fn session<S: ToString>(message: S, view: SessionView) -> Response<String> {
        Self::axum(message, StatusCode::OK, Some(view))
    }

    fn e404<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::NOT_FOUND, None)
    }

    fn e422<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::UNPROCESSABLE_ENTITY, None)
    }

    fn e500<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::INTERNAL_SERVER_ERROR, None)
    }
}

/// 2-Pick draft simulator server.
#[derive(Parser, Debug)]
#[command(name = "twopick", version)]
struct Args {
    /// Directory of static front-end files to serve.
    #[arg(long, default_value = "static")]
    static_dir: PathBuf,

    /// Card list JSON, as a local path or an http(s) URL.
    #[arg(long)]
    catalog: String,

    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// JSON file replacing the built-in round weight tables.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Chance (0 to 1) that a draft draw attempts a neutral card.
    #[arg(long, default_value_t = 0.05, value_parser = parse_rate)]
    neutral_rate: f64,

    /// Copies of one card allowed through normal draws.
    #[arg(long, default_value_t = 3)]
    duplicate_cap: u32,

    /// Rerolls available per draft.
    #[arg(long, default_value_t = 3)]
    rerolls: u32,

    /// Minutes a session may sit idle before it is dropped.
    #[arg(long, default_value_t = 120)]
    session_ttl: u64,

    #[arg(long, default_value_t = tracing::Level::DEBUG)]
    log_level: tracing::Level,
}

fn parse_rate(s: &str) -> Res<f64> {
    match s.parse::<f64>() {
        Ok(v) if (0.0..=1.0).contains(&v) => Ok(v),
        _ => err(format!("Invalid rate: {s}")),
    }
}

async fn load_config(args: &Args) -> Res<DraftConfig> {
    let rules = match &args.rules {
        Some(path) => {
            tracing::debug!("Loading round rules from {}.", path.display());
            let raw = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
            RoundRules::from_json(&raw)?
        }
        None => RoundRules::default(),
    };

    Ok(DraftConfig {
        neutral_rate: args.neutral_rate,
        duplicate_cap: args.duplicate_cap,
        rerolls: args.rerolls,
        rules,
    })
}

async fn load_card_pool(source: &str) -> Result<CardPool, CatalogError> {
    let cards = cards::catalog::load_cards(source).await?;
    tracing::debug!("Inserting {} cards into card pool.", cards.len());
    let pool: CardPool = cards.into_iter().collect();
    tracing::debug!("Successfully populated card pool: {pool:?}");
    Ok(pool)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let config = match load_config(&args).await {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let pool = match load_card_pool(&args.catalog).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to load card list: {e}");
            std::process::exit(1);
        }
    };
    if pool.size() == 0 {
        tracing::warn!("Card list is empty, every draw will be a placeholder.");
    }

    let server = DraftServer::new(
        Drafter::new(pool, config),
        Duration::from_secs(args.session_ttl.saturating_mul(60)),
    );
    let app = Router::new()
        .fallback_service(ServeDir::new(&args.static_dir).append_index_html_on_directories(true))
        .route("/api/session", post(handlers::handle_create))
        .route(
            "/api/session/:id",
            get(handlers::handle_view).delete(handlers::handle_delete),
        )
        .route("/api/session/:id/class", post(handlers::handle_class))
        .route("/api/session/:id/pick", post(handlers::handle_pick))
        .route("/api/session/:id/reroll", post(handlers::handle_reroll))
        .route("/api/session/:id/restart", post(handlers::handle_restart))
        .with_state(Arc::new(server))
        .layer(TraceLayer::new_for_http());

    let listener = match TcpListener::bind(format!("0.0.0.0:{}", args.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to open port {}: {e}", args.port);
            std::process::exit(1);
        }
    };
    tracing::info!("Serving drafts on port {}.", args.port);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Closed due to error: {e}");
    }
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::{load_config, parse_rate, Args};

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("0.05"), Ok(0.05));
        assert_eq!(parse_rate("1"), Ok(1.0));
        assert!(parse_rate("1.5").is_err());
        assert!(parse_rate("-0.1").is_err());
        assert!(parse_rate("often").is_err());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["twopick", "--catalog", "data/cards.json"]).unwrap();
        assert_eq!(args.port, 3000);
        assert_eq!(args.neutral_rate, 0.05);
        assert_eq!(args.duplicate_cap, 3);
        assert_eq!(args.rerolls, 3);
        assert_eq!(args.session_ttl, 120);
        assert!(args.rules.is_none());

        // The catalog is required.
        assert!(Args::try_parse_from(["twopick"]).is_err());
        assert!(
            Args::try_parse_from(["twopick", "--catalog", "c.json", "--neutral-rate", "2"])
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_load_config() {
        let args = Args::try_parse_from([
            "twopick",
            "--catalog",
            "c.json",
            "--neutral-rate",
            "0.5",
            "--duplicate-cap",
            "2",
        ])
        .unwrap();
        let config = load_config(&args).await.unwrap();
        assert_eq!(config.neutral_rate, 0.5);
        assert_eq!(config.duplicate_cap, 2);
        assert_eq!(config.rules.rounds(), 19);
        assert_eq!(config.deck_target(), 40);

        let path = std::env::temp_dir().join(format!("rules-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"{"preview": [["金", 100]], "rounds": [[["銅", 100]]], "reroll": [["金", 100]]}"#,
        )
        .unwrap();
        let args = Args::try_parse_from([
            "twopick",
            "--catalog",
            "c.json",
            "--rules",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let config = load_config(&args).await.unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.rules.rounds(), 1);
        assert_eq!(config.deck_target(), 4);

        let args = Args::try_parse_from([
            "twopick",
            "--catalog",
            "c.json",
            "--rules",
            "/definitely/not/rules.json",
        ])
        .unwrap();
        assert!(load_config(&args).await.is_err());
    }
}
