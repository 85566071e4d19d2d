use std::{path::PathBuf, process::ExitCode, sync::Arc};

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use photofeed::{
    ClientConfig, DetailOverlay, FeedStore, FeedView, HttpApi, LikeOutcome, ViewMode,
    config::MAX_PAGE_SIZE,
    dto::{LoginForm, PhotoQuery, RegisterForm},
    models::PhotoId,
    upload::{self, PhotoFile, UploadForm},
};

#[derive(Parser)]
#[command(name = "photofeed", about = "Browse, like, comment on and upload photos")]
struct Cli {
    /// API base URL (overrides PHOTOFEED_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token (overrides PHOTOFEED_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct PageArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Photos per page, 1 to 100 (defaults to PHOTOFEED_PAGE_SIZE)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_PAGE_SIZE)))]
    limit: Option<u32>,

    #[arg(long, default_value = "")]
    search: String,

    #[arg(long, default_value = "createdAt")]
    sort_by: String,
}

impl PageArgs {
    fn query(&self, config: &ClientConfig) -> PhotoQuery {
        PhotoQuery {
            page: self.page,
            limit: self.limit.unwrap_or(config.page_size),
            search: self.search.clone(),
            sort_by: self.sort_by.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Show a page of the feed
    Feed {
        #[command(flatten)]
        page: PageArgs,

        /// List layout instead of grid
        #[arg(long)]
        list: bool,
    },
    /// Like or unlike a photo
    Like {
        photo_id: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Comment on a photo
    Comment {
        photo_id: String,
        text: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Bookmark a photo for this session
    Save {
        photo_id: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Upload a JPEG, PNG or GIF
    Upload {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        caption: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Log in and print the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long, default_value = "creator")]
        role: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    dotenvy::dotenv().ok();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ClientConfig::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(token) = cli.token {
        config.token = Some(token);
    }

    let api = Arc::new(HttpApi::from_config(&config)?);
    info!("Using API at {}", config.api_url);

    match cli.command {
        Command::Feed { page, list } => {
            let store = FeedStore::new(api.clone(), config.request_timeout);
            store.load_page(&page.query(&config)).await?;

            let mut view = FeedView::new(store);
            if list {
                view.set_mode(ViewMode::List);
            }
            print!("{}", view.render(Utc::now()));
        }
        Command::Like { photo_id, page } => {
            let store = FeedStore::new(api.clone(), config.request_timeout);
            store.load_page(&page.query(&config)).await?;

            let overlay = DetailOverlay::open(&store, &PhotoId::from(photo_id))?;
            match overlay.tap_like()?.outcome().await {
                LikeOutcome::Confirmed(state) => {
                    info!("Like recorded (liked: {}, {} likes)", state.liked, state.like_count)
                }
                LikeOutcome::RolledBack { error, .. } => return Err(error.into()),
                LikeOutcome::Discarded => {}
            }
            print!("{}", overlay.render(Utc::now()));
        }
        Command::Comment {
            photo_id,
            text,
            page,
        } => {
            let store = FeedStore::new(api.clone(), config.request_timeout);
            store.load_page(&page.query(&config)).await?;

            let overlay = DetailOverlay::open(&store, &PhotoId::from(photo_id))?;
            overlay.set_draft(&text)?;
            overlay.submit()?.outcome().await?;
            print!("{}", overlay.render(Utc::now()));
        }
        Command::Save { photo_id, page } => {
            let store = FeedStore::new(api.clone(), config.request_timeout);
            store.load_page(&page.query(&config)).await?;

            let overlay = DetailOverlay::open(&store, &PhotoId::from(photo_id))?;
            overlay.tap_save()?;
            print!("{}", overlay.render(Utc::now()));
        }
        Command::Upload {
            file,
            title,
            caption,
            location,
            tags,
        } => {
            let form = UploadForm {
                title,
                caption,
                location,
                tags,
                photo: Some(PhotoFile::open(&file).await?),
            };
            let created = upload::submit(api.as_ref(), &form).await?;
            println!("{}", serde_json::to_string_pretty(&created.0)?);
        }
        Command::Login { email, password } => {
            let session = api.login(&LoginForm { email, password }).await?;
            println!("{}", session.token);
        }
        Command::Register {
            name,
            email,
            password,
            confirm_password,
            role,
        } => {
            let mut form = RegisterForm::new(name, email, password, confirm_password);
            form.role = role;
            let response = api.register(&form).await?;
            match response.token {
                Some(token) => println!("{token}"),
                None => println!("Registration successful"),
            }
        }
    }

    Ok(())
}
