//! # wikiweb CLI
//!
//! Command-line interface for the wikiweb content engine.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wikiweb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "wikiweb.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file if missing and set up the wiki
    Init {
        /// System password
        #[arg(long)]
        password: String,

        /// Name of the first web
        #[arg(long, default_value = "Wiki")]
        web_name: String,

        /// Address of the first web
        #[arg(long, default_value = "wiki")]
        address: String,
    },

    /// Create a new web
    CreateWeb {
        /// Display name
        name: String,

        /// Address used to reach the web
        address: String,

        /// System password
        #[arg(long, env = "WIKIWEB_SYSTEM_PASSWORD")]
        system_password: String,
    },

    /// List webs by name
    Webs,

    /// Write a new revision of a page (content from --content or stdin)
    Write {
        web: String,
        page: String,

        /// Page content; read from stdin when absent
        #[arg(long)]
        content: Option<String>,

        /// Author name
        #[arg(long)]
        author: Option<String>,

        /// Where the edit comes from
        #[arg(long, default_value = "127.0.0.1")]
        origin: String,

        /// Write even if someone else holds the lock
        #[arg(long)]
        break_lock: bool,
    },

    /// Show a page
    Show {
        web: String,
        page: String,

        /// Revision index (defaults to the current revision)
        #[arg(long)]
        rev: Option<usize>,

        /// Print rendered HTML
        #[arg(long, conflicts_with = "json")]
        html: bool,

        /// Emit JSON
        #[arg(long)]
        json: bool,

        /// Refuse webs that are not published
        #[arg(long)]
        published: bool,
    },

    /// List pages, optionally restricted to a category
    List {
        web: String,

        #[arg(long)]
        category: Option<String>,
    },

    /// List the categories used in a web
    Categories { web: String },

    /// Pages by most recent revision
    Recent {
        web: String,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Everyone who edited a web
    Authors { web: String },

    /// Search page names and content (regular expression)
    Search {
        web: String,
        query: String,

        /// Return JSON for machine consumption
        #[arg(long)]
        json: bool,
    },

    /// List orphaned pages, or remove them
    Orphans {
        web: String,

        /// Remove the listed pages
        #[arg(long, requires = "system_password")]
        remove: bool,

        /// Keep removing until no orphans are left
        #[arg(long, requires = "remove")]
        all: bool,

        /// System password
        #[arg(long, env = "WIKIWEB_SYSTEM_PASSWORD")]
        system_password: Option<String>,
    },

    /// Lock a page for editing
    Lock {
        web: String,
        page: String,

        #[arg(long)]
        holder: String,

        /// Take the lock from its current holder
        #[arg(long)]
        break_lock: bool,
    },

    /// Release a page lock
    Unlock { web: String, page: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init {
            password,
            web_name,
            address,
        } => commands::init_wiki(&cli.config, &password, &web_name, &address),
        Commands::CreateWeb {
            name,
            address,
            system_password,
        } => commands::create_web(&cli.config, &name, &address, &system_password),
        Commands::Webs => commands::list_webs(&cli.config),
        Commands::Write {
            web,
            page,
            content,
            author,
            origin,
            break_lock,
        } => {
            let opts = commands::WriteOptions {
                content,
                author,
                origin,
                break_lock,
            };
            commands::write_page(&cli.config, &web, &page, opts)
        }
        Commands::Show {
            web,
            page,
            rev,
            html,
            json,
            published,
        } => {
            let format = if json {
                commands::ShowFormat::Json
            } else if html {
                commands::ShowFormat::Html
            } else {
                commands::ShowFormat::Raw
            };
            commands::show_page(&cli.config, &web, &page, rev, format, published)
        }
        Commands::List { web, category } => {
            commands::list_pages(&cli.config, &web, category.as_deref())
        }
        Commands::Categories { web } => commands::list_categories(&cli.config, &web),
        Commands::Recent { web, limit } => commands::recent_pages(&cli.config, &web, limit),
        Commands::Authors { web } => commands::list_authors(&cli.config, &web),
        Commands::Search { web, query, json } => {
            commands::search_web(&cli.config, &web, &query, json)
        }
        Commands::Orphans {
            web,
            remove,
            all,
            system_password,
        } => commands::orphans(&cli.config, &web, remove, all, system_password.as_deref()),
        Commands::Lock {
            web,
            page,
            holder,
            break_lock,
        } => commands::lock_page(&cli.config, &web, &page, &holder, break_lock),
        Commands::Unlock { web, page } => commands::unlock_page(&cli.config, &web, &page),
    }
}
