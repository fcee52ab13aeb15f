use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdnscmd::database::{self, PgStore};
use pdnscmd::dns::{notify, Session};
use pdnscmd::shell::Shell;
use pdnscmd::Settings;

#[derive(Parser, Debug)]
#[command(name = "pdnscmd")]
#[command(about = "Interactive zone editor for the PowerDNS PostgreSQL backend", long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG_FILE", default_value = "/etc/pdnscmd.toml")]
    config: String,

    /// Overrides the database settings of the config file
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr, the shell owns stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdnscmd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut settings = Settings::load(&args.config)?;
    if let Some(url) = args.database_url {
        settings.database.url = Some(url);
    }
    settings.validate()?;

    let pool = database::init_pool(&settings.database).await?;
    let notifier = notify::from_config(&settings.notify);
    let session = Session::new(PgStore::new(pool), notifier, settings.zones.clone());

    let mut shell = Shell::new(session);
    let stdout = std::io::stdout();
    shell
        .run(BufReader::new(tokio::io::stdin()), &mut stdout.lock())
        .await?;

    info!("Session closed");
    Ok(())
}
