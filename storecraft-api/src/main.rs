mod app;

use app::{app_router, AppState, RateLimiter};
use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use storecraft_core::account::{generate_token, DEFAULT_TOKEN_TTL_SECS};
use storecraft_core::{
    AccountService, HttpMailer, JsonCredentialStore, Mailer, NullMailer, TokenIssuer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
struct ApiConfig {
    bind: SocketAddr,
    data_dir: PathBuf,
    /// JWT 签名密钥
    jwt_secret: String,
    /// bearer token 有效期（秒）
    token_ttl_secs: i64,
    /// 对外链接基础地址（验证/重置链接前缀）
    public_url: String,
    /// 邮件中继端点（未配置时不投递邮件）
    mail_endpoint: Option<url::Url>,
    mail_from: String,
    /// CORS 允许的来源列表（空则允许所有）
    cors_origins: Vec<String>,
}

impl ApiConfig {
    fn from_env() -> Self {
        let bind = env::var("SC_BIND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| "0.0.0.0:8080".parse().expect("valid default bind"));

        let data_dir = env::var("SC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        // JWT 密钥；未配置时每次启动生成新的（重启会使已签发的 token 失效）
        let jwt_secret = env::var("SC_JWT_SECRET").unwrap_or_else(|_| {
            info!("SC_JWT_SECRET not set; generating a random secret for this run");
            generate_token()
        });

        let token_ttl_secs = env::var("SC_TOKEN_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);

        let public_url = env::var("SC_PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:8080".into())
            .trim_end_matches('/')
            .to_string();

        let mail_endpoint = env::var("SC_MAIL_ENDPOINT").ok().and_then(|s| {
            match s.parse::<url::Url>() {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!(error = %e, "SC_MAIL_ENDPOINT is not a valid URL, mail disabled");
                    None
                }
            }
        });
        let mail_from =
            env::var("SC_MAIL_FROM").unwrap_or_else(|_| "no-reply@storecraft".into());

        // CORS 允许的来源，逗号分隔；空或 "*" 表示允许所有
        let cors_origins = env::var("SC_CORS_ORIGINS")
            .ok()
            .map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() || trimmed == "*" {
                    vec![]
                } else {
                    trimmed
                        .split(',')
                        .filter(|t| !t.trim().is_empty())
                        .map(|t| t.trim().to_string())
                        .collect()
                }
            })
            .unwrap_or_default();

        Self {
            bind,
            data_dir,
            jwt_secret,
            token_ttl_secs,
            public_url,
            mail_endpoint,
            mail_from,
            cors_origins,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 优先读取 .env（若存在）
    let _ = dotenv();
    init_tracing();

    let config = ApiConfig::from_env();
    info!("starting API on {}", config.bind);

    let store = Arc::new(JsonCredentialStore::new(config.data_dir.clone()));
    store.ensure_dirs()?;

    let mailer: Arc<dyn Mailer> = match &config.mail_endpoint {
        Some(endpoint) => Arc::new(HttpMailer::new(endpoint.clone(), config.mail_from.clone())),
        None => {
            info!("SC_MAIL_ENDPOINT not set; mail delivery disabled");
            Arc::new(NullMailer)
        }
    };

    let issuer = TokenIssuer::new(config.jwt_secret.clone(), config.token_ttl_secs);
    let accounts = Arc::new(AccountService::new(
        store,
        mailer,
        issuer,
        config.public_url.clone(),
    ));

    let state = AppState {
        accounts,
        login_limiter: Arc::new(RateLimiter::new(10, Duration::from_secs(60))),
        reset_limiter: Arc::new(RateLimiter::new(5, Duration::from_secs(300))),
        auth_limiter: Arc::new(RateLimiter::new(30, Duration::from_secs(60))),
    };

    let app = app_router(state, config.cors_origins.clone());
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
