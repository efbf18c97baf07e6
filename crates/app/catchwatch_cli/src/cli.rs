use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "catchwatch", version, about = "Catchwatch operator tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the CLI and core library versions.
    Version,

    /// Hash a password for a user record.
    HashPassword {
        /// Plain-text password.
        password: String,
    },

    /// Verify a session token and print its claims as JSON.
    DecodeToken {
        /// Session token (the session cookie value).
        token: String,

        /// Signing secret the token was issued with.
        #[arg(long, env = "AUTH_SECRET", hide_env_values = true)]
        secret: String,
    },

    /// Link an external provider identity to the user with its email,
    /// creating a password-less user when none exists.
    LinkAccount {
        /// Email the provider reports for the identity.
        #[arg(long)]
        email: String,

        /// Provider name.
        #[arg(long, default_value = "google")]
        provider: String,

        /// The provider's stable id for the identity.
        #[arg(long)]
        provider_account_id: String,

        /// Display name for a newly created user.
        #[arg(long)]
        name: Option<String>,

        /// PostgreSQL connection URL.
        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: String,
    },
}
