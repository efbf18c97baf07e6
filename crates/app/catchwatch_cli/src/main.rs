pub use self::error::{Error, Result};
mod error;

use catchwatch_core::auth::accounts::{PgAccountStore, ProviderSignIn, sign_in_with_provider};
use catchwatch_core::auth::jwt::{SessionCodec, SessionConfig};
use catchwatch_core::auth::password::hash_password;
use clap::Parser;
use cli::{Cli, Commands};
use sqlx::postgres::PgPoolOptions;

mod cli;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    logging::init()?;

    let args = Cli::parse();

    match &args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            println!("catchwatch_core {}", catchwatch_core::version());
        }
        Commands::HashPassword { password } => {
            if password.is_empty() {
                return Err(Error::Custom("password must not be empty".into()));
            }
            println!("{}", hash_password(password)?);
        }
        Commands::DecodeToken { token, secret } => {
            let codec = SessionCodec::new(&SessionConfig::new(secret.as_str()))?;
            let claims = codec.decode(token)?;
            log::info!("token verified for {}", claims.email);
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
        Commands::LinkAccount {
            email,
            provider,
            provider_account_id,
            name,
            database_url,
        } => {
            let profile = ProviderSignIn {
                provider: provider.clone(),
                provider_account_id: provider_account_id.clone(),
                email: Some(email.clone()),
                name: name.clone(),
                ..ProviderSignIn::default()
            };
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let session = runtime.block_on(async {
                let pool = PgPoolOptions::new()
                    .max_connections(1)
                    .acquire_timeout(std::time::Duration::from_secs(5))
                    .connect(database_url)
                    .await?;
                let store = PgAccountStore::new(pool);
                Ok::<_, Error>(sign_in_with_provider(&store, profile).await?)
            })?;
            log::info!("{provider} identity resolved: {:?}", session.link);
            println!("{}", session.user.id);
        }
    }

    Ok(())
}
