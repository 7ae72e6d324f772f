use std::sync::Arc;

use env::Env;
use eyre::Context;
use log::info;
use notify::mailer::{Mailer, SmtpConfig};
use notify::realtime::Realtime;
use server::{jwt::Jwt, AppState};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;

    let env = Env::load().context("Failed to load environment")?;

    info!("connecting to mongo");
    let storage = storage::Storage::new(env.mongo_url())
        .await
        .context("Failed to create storage")?;

    info!("creating ledger");
    let ledger = ledger::Ledger::new(storage);

    info!("connecting to redis");
    let realtime = Realtime::connect(env.redis_url())
        .await
        .context("Failed to connect to redis")?;

    let mailer = Mailer::new(&SmtpConfig {
        host: env.smtp_host().to_string(),
        port: env.smtp_port(),
        username: env.smtp_username().to_string(),
        password: env.smtp_password().to_string(),
        from: env.smtp_from().to_string(),
    })
    .context("Failed to build mailer")?;

    bg_process::start(ledger.clone(), mailer);

    let state = AppState {
        ledger,
        jwt: Arc::new(Jwt::new(env.jwt_secret())),
        realtime,
    };
    info!("starting server");
    server::serve(state, env.bind_addr()).await?;

    Ok(())
}
