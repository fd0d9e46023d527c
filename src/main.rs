//! # Photo Gallery CLI (`gallery`)
//!
//! Browse, like, and vote on media in a hosted photo gallery.
//!
//! ## Usage
//!
//! ```bash
//! gallery --config ./config/gallery.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `gallery browse` | List media matching a filter, page by page |
//! | `gallery keywords` | Show the grouped keyword catalog |
//! | `gallery vote` | Interactive pairwise voting on stdin |
//! | `gallery likes list\|add\|remove` | Manage the user's likes |
//! | `gallery favorites` | Records the user liked |
//! | `gallery top` | Community ranking by votes won |
//! | `gallery assets <id>` | Asset URLs of one record |
//! | `gallery completions <shell>` | Shell completion script |
//!
//! ## Examples
//!
//! ```bash
//! # Photos tagged both "alps" and "lake", oldest first, two pages
//! gallery browse --keywords alps,lake --mode and --sort oldest --pages 2
//!
//! # Open a shared deep link
//! gallery browse --query 'keywords=sunset&KeywordFilterMode=OR'
//!
//! # Vote as a given user
//! gallery --user 6f1c… vote
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use photo_gallery::browse::BrowseArgs;
use photo_gallery::config;
use photo_gallery::likes::LikeAction;
use photo_gallery::{assets, browse, keywords, likes, logging, top, vote};
use photo_gallery_core::filter::{KeywordMode, SortOrder};

/// Photo Gallery CLI.
///
/// All commands except `completions` read a TOML configuration file given
/// by `--config`.
#[derive(Parser)]
#[command(
    name = "gallery",
    about = "Photo Gallery: browse, like, and vote on media from the command line",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/gallery.toml")]
    config: PathBuf,

    /// Act as this user id (overrides GALLERY_USER_ID and [identity].user_id).
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List media matching a filter.
    ///
    /// Fetches the first page and then one more page per `--pages`, exactly
    /// as an infinite-scroll grid would.
    Browse {
        /// Comma-separated keywords.
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,

        /// Keyword matching: `and` (all keywords) or `or` (any keyword).
        #[arg(long)]
        mode: Option<KeywordMode>,

        /// Comma-separated media ids. Takes precedence over keywords.
        #[arg(long, value_delimiter = ',')]
        ids: Vec<i64>,

        /// Sort order: `newest`, `oldest`, or `random`.
        #[arg(long)]
        sort: Option<SortOrder>,

        /// Only media flagged for the background slideshow.
        #[arg(long)]
        background: bool,

        /// Deep-link query string to start from
        /// (e.g. `keywords=alps;lake&KeywordFilterMode=AND`).
        #[arg(long)]
        query: Option<String>,

        /// Number of pages to load.
        #[arg(long, default_value_t = 1)]
        pages: u32,

        /// Print JSON instead of one line per record.
        #[arg(long)]
        json: bool,
    },

    /// Show the keyword catalog, grouped.
    Keywords {
        /// Only keywords containing this text (case-insensitive).
        #[arg(long)]
        search: Option<String>,
    },

    /// Vote on pairs of media: type `l` or `r`, `q` to stop.
    Vote,

    /// Manage likes.
    Likes {
        #[command(subcommand)]
        action: LikesCommand,
    },

    /// List the records you liked.
    Favorites,

    /// Community ranking by votes won.
    Top {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Print the asset URLs of one record.
    Assets {
        /// Media id.
        id: i64,
    },

    /// Generate a shell completion script.
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum LikesCommand {
    /// List liked media ids.
    List,
    /// Like a media item.
    Add { id: i64 },
    /// Remove a like.
    Remove { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "gallery", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging.level)?;
    let user = cfg.user_id(cli.user.as_deref());

    match cli.command {
        Commands::Browse {
            keywords,
            mode,
            ids,
            sort,
            background,
            query,
            pages,
            json,
        } => {
            let args = BrowseArgs {
                keywords,
                mode,
                ids,
                sort,
                background,
                query,
                pages,
                json,
            };
            browse::run_browse(&cfg, &args).await?;
        }
        Commands::Keywords { search } => {
            keywords::run_keywords(&cfg, search.as_deref()).await?;
        }
        Commands::Vote => {
            vote::run_vote(&cfg, user).await?;
        }
        Commands::Likes { action } => {
            let action = match action {
                LikesCommand::List => LikeAction::List,
                LikesCommand::Add { id } => LikeAction::Add(id),
                LikesCommand::Remove { id } => LikeAction::Remove(id),
            };
            likes::run_likes(&cfg, user, action).await?;
        }
        Commands::Favorites => {
            likes::run_favorites(&cfg, user).await?;
        }
        Commands::Top { limit } => {
            top::run_top(&cfg, limit).await?;
        }
        Commands::Assets { id } => {
            assets::run_assets(&cfg, id).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
        }
    }

    Ok(())
}
