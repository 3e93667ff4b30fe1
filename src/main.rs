use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use periapi::api::TokenStore;
use periapi::config::{PUBID_KEY, USERNAME_KEY};
use periapi::{ApiError, Config, HttpSession, PeriApi};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "periapi")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the session token and the account username
    SetToken {
        /// Account username
        #[arg(short, long)]
        username: String,
        /// Session token
        token: String,
    },
    /// Forget the stored session token and account
    Logout,
    /// Show the account's public id
    Whoami,
    /// Follow a user
    Follow {
        /// User id
        user_id: String,
    },
    /// Unfollow a user
    Unfollow {
        /// User id
        user_id: String,
    },
    /// List a user's broadcasts
    Broadcasts {
        /// User id
        user_id: String,
    },
    /// List who a user follows (defaults to your own account)
    Following {
        /// User id
        user_id: Option<String>,
    },
    /// Show a user's profile
    User {
        /// User id
        user_id: String,
    },
    /// Show the broadcast feed of followed users
    Notifications,
    /// Get access details for a broadcast
    Access {
        /// Broadcast id
        broadcast_id: String,
    },
    /// Show public broadcast information
    Broadcast {
        /// Broadcast id
        broadcast_id: String,
    },
    /// Look up a user id by username
    FindUser {
        /// Username
        username: String,
    },
    /// Send a watch heartbeat for a broadcast
    Ping {
        /// Broadcast id
        broadcast_id: String,
        /// Viewer session from `access`
        #[arg(short, long)]
        session: String,
        /// Hearts sent since the last ping
        #[arg(long, default_value_t = 0)]
        hearts: u32,
        /// Stop watching instead
        #[arg(long)]
        stop: bool,
    },
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to format response")?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "periapi=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Commands::SetToken { username, token } => {
            TokenStore::set_token(&token)?;
            if config.get(USERNAME_KEY) != Some(username.as_str()) {
                // A different account invalidates the cached public id
                config.remove(PUBID_KEY);
            }
            config.set(USERNAME_KEY, username.as_str());
            config.write()?;
            println!("Stored token {} for {}", TokenStore::mask_token(&token), username);
            Ok(())
        }
        Commands::Logout => {
            if let Err(e) = TokenStore::delete_token() {
                tracing::warn!("Could not remove session token: {}", e);
            }
            config.remove(USERNAME_KEY);
            config.remove(PUBID_KEY);
            config.write()?;
            println!("Logged out");
            Ok(())
        }
        command => {
            let result = match HttpSession::from_config(config) {
                Ok(session) => run(PeriApi::new(session), command).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = &result {
                if e.downcast_ref::<ApiError>().is_some_and(ApiError::requires_reauth) {
                    tracing::warn!("Store a fresh session token with `periapi set-token`");
                }
            }
            result
        }
    }
}

async fn run(mut api: PeriApi<HttpSession>, command: Commands) -> Result<()> {
    match command {
        Commands::SetToken { .. } | Commands::Logout => {
            anyhow::bail!("this command does not use the API")
        }
        Commands::Whoami => println!("{}", api.pubid().await?),
        Commands::Follow { user_id } => println!("{}", api.follow(&user_id).await?),
        Commands::Unfollow { user_id } => println!("{}", api.unfollow(&user_id).await?),
        Commands::Broadcasts { user_id } => {
            print_json(&api.get_user_broadcast_history(&user_id).await?)?
        }
        Commands::Following { user_id: Some(user_id) } => {
            print_json(&api.get_following(&user_id).await?)?
        }
        Commands::Following { user_id: None } => print_json(&api.following().await?)?,
        Commands::User { user_id } => print_json(&api.get_user(&user_id).await?)?,
        Commands::Notifications => print_json(&api.notifications().await?)?,
        Commands::Access { broadcast_id } => print_json(&api.get_access(&broadcast_id).await?)?,
        Commands::Broadcast { broadcast_id } => {
            match api.get_broadcast_info(&broadcast_id).await? {
                Some(info) => print_json(&info)?,
                None => anyhow::bail!("No public information for broadcast {}", broadcast_id),
            }
        }
        Commands::FindUser { username } => println!("{}", api.find_user_id(&username).await?),
        Commands::Ping { broadcast_id, session, hearts, stop } => {
            print_json(&api.ping_watching(&broadcast_id, &session, hearts, stop).await?)?
        }
    }

    Ok(())
}
