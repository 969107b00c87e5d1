use clap::{Parser, Subcommand};
use factbot::config;
use factbot::facts::{Utterance, engine};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "factbot")]
#[command(about = "A chat fact memory: remembers \"X is Y\" and answers \"X?\"")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Gateway {
        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Auth token (required for non-loopback)
        #[arg(long, env = "FACTBOT_TOKEN")]
        token: Option<String>,
    },

    /// Run a single chat line through the fact engine and print the reply
    Say {
        /// Who is speaking
        #[arg(short, long, default_value = "console")]
        nick: String,

        /// Channel the line was said in
        #[arg(short, long, default_value = "console")]
        channel: String,

        /// The line itself
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show effective configuration
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = config::load()?;

    match cli.command {
        Commands::Gateway { port, bind, token } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(bind) = bind {
                config.gateway.bind = bind;
            }
            factbot::gateway::run(config, token).await
        }
        Commands::Say {
            nick,
            channel,
            text,
        } => {
            let engine = engine::from_config(&config).await?;
            let utterance = Utterance::new(nick, channel, text.join(" "));
            if let Some(reply) = engine.handle(&utterance).await? {
                println!("{reply}");
            }
            Ok(())
        }
        Commands::Status => {
            println!("factbot v{}", env!("CARGO_PKG_VERSION"));
            println!("nickname: {}", config.gateway.nickname);
            println!("store: {}", config.store.backend.as_str());
            if config.store.backend == config::StoreBackend::Json {
                println!("store path: {}", config.store.resolved_path().display());
            }
            println!("timezone: {}", config.facts.timezone);
            println!("require nickname: {}", config.facts.require_nickname);
            Ok(())
        }
    }
}
