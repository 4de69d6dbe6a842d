//! conduit - command-line client for the Conduit social blogging API
//!
//! Each command builds the matching feature Store, feeds it the user's
//! input as messages and prints the model it settles on.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc;

use libconduit::features::session::Session;
use libconduit::features::{fetch_feed_fn, home, login, profile, AuthEnv, FormError};
use libconduit::logging;
use libconduit::{Article, ConduitApi, ConduitError, Config, HttpClient, User};

#[derive(Parser)]
#[command(name = "conduit")]
#[command(version, about = "Read and sign in to a Conduit server", long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Latest articles
    conduit feed
    conduit feed --limit 5 --format json | jq '.[].title'

    # Sign in (prompts for the password)
    conduit login --email jake@jake.jake

    # Who is signed in?
    conduit whoami

EXIT CODES:
    0 - Success
    1 - Error (network, configuration, ...)
    2 - Authentication or credential store failure
    3 - Invalid input
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json"])]
    format: String,

    /// Override the API base URL from the config file
    #[arg(long, global = true, env = "CONDUIT_BASE_URL", value_name = "URL")]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the global article feed
    Feed {
        /// Maximum number of articles to print
        #[arg(short, long, default_value = "20", value_name = "N")]
        limit: usize,
    },

    /// Sign in and store the session
    Login {
        /// Account email
        #[arg(long, env = "CONDUIT_EMAIL")]
        email: String,

        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Print the signed-in user
    Whoami,
}

#[derive(Serialize)]
struct UserOutput<'a> {
    username: &'a str,
    image: Option<&'a str>,
}

impl<'a> From<&'a User> for UserOutput<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            username: &user.username,
            image: user.image.as_deref(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::from_env(cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<ConduitError>()
            .map(ConduitError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load_or_default()?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }

    let api = ConduitApi::from_config(HttpClient::reqwest().map_err(ConduitError::from)?, &config.api)
        .map_err(ConduitError::from)?;
    tracing::debug!("Using API at {}", api.base_url());

    let json = cli.format == "json";
    match cli.command {
        Commands::Feed { limit } => feed(api, limit, json).await,
        Commands::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => rpassword::prompt_password("Password: ")
                    .context("Failed to read password")?,
            };
            sign_in(&api, &config, email, password, json).await
        }
        Commands::Logout => logout(&config).await,
        Commands::Whoami => whoami(&config, json).await,
    }
}

async fn feed(api: ConduitApi, limit: usize, json: bool) -> Result<()> {
    let store = home::store(home::Env {
        fetch_feed: fetch_feed_fn(api),
    })?;

    let mut models = store.watch();
    let model = models
        .wait_for(|model| !model.loading)
        .await
        .map_err(|e| anyhow!("feed store closed: {}", e))?
        .clone();

    let articles: Vec<&Article> = model.articles.iter().take(limit).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&articles)?);
        return Ok(());
    }

    if articles.is_empty() {
        println!("No articles.");
    }
    for article in articles {
        println!("{}", article.title);
        if !article.description.is_empty() {
            println!("  {}", article.description);
        }
        println!(
            "  by {} on {} | {} favorites",
            article.author.username,
            article.created_at.format("%Y-%m-%d"),
            article.favorites_count
        );
        println!();
    }
    Ok(())
}

async fn sign_in(
    api: &ConduitApi,
    config: &Config,
    email: String,
    password: String,
    json: bool,
) -> Result<()> {
    if email.trim().is_empty() {
        return Err(ConduitError::InvalidInput("email must not be empty".to_string()).into());
    }

    let session = restored_session(config).await?;
    let (dismiss, mut dismissed) = mpsc::unbounded_channel();
    let env = AuthEnv::live(
        api,
        &session,
        Arc::new(move || {
            let _ = dismiss.send(());
        }),
    );

    let store = login::store(env)?;
    store.send(login::Msg::EnteredUsername(email));
    store.send(login::Msg::EnteredPassword(password));
    store.send(login::Msg::SubmittedForm);

    store.settled().await;
    if dismissed.try_recv().is_ok() {
        let user = store
            .model()
            .user
            .ok_or_else(|| anyhow!("login finished without a user"))?;
        return print_user(&user, json);
    }

    let error = match store.model().error {
        Some(FormError::Http(e)) => ConduitError::Http(e),
        Some(FormError::Credential(e)) => ConduitError::Credential(e),
        None => return Err(anyhow!("login finished without a result")),
    };
    Err(error.into())
}

async fn logout(config: &Config) -> Result<()> {
    let session = restored_session(config).await?;
    let (dismiss, mut dismissed) = mpsc::unbounded_channel();
    let store = profile::store(profile::Env {
        dismiss_view: Arc::new(move || {
            let _ = dismiss.send(());
        }),
        remove_user: session.remove_user_fn(),
    })?;

    store.send(profile::Msg::LoggedOut);
    store.settled().await;

    // The profile view is dismissed only once the credential is gone
    if dismissed.try_recv().is_err() {
        return Err(anyhow!("could not remove stored credentials"));
    }
    println!("Logged out.");
    Ok(())
}

async fn whoami(config: &Config, json: bool) -> Result<()> {
    let session = restored_session(config).await?;
    let model = session.store().model();

    if let Some(error) = model.error {
        return Err(ConduitError::Credential(error).into());
    }
    match model.user {
        Some(user) => print_user(&user, json),
        None if json => {
            println!("null");
            Ok(())
        }
        None => {
            println!("Not logged in.");
            Ok(())
        }
    }
}

/// Start the session and wait for the stored user to be loaded
async fn restored_session(config: &Config) -> Result<Session> {
    let credentials = config.credentials.open_store().map_err(ConduitError::from)?;
    let session = Session::start(credentials)?;

    session
        .store()
        .watch()
        .wait_for(|model| model.restored)
        .await
        .map_err(|e| anyhow!("session store closed: {}", e))?;
    Ok(session)
}

fn print_user(user: &User, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(&UserOutput::from(user))?);
    } else {
        println!("{}", user.username);
    }
    Ok(())
}
