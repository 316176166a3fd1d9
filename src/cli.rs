use crate::output::OutputFormat;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "amazon-feed",
    version,
    about = "Turn Amazon searches and product lookups into JSON feeds"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Two-letter country code of the storefront (e.g., us, uk, de)
    #[arg(long, global = true)]
    pub country: Option<String>,

    /// Lowest price to include (e.g., 10 or 9.99)
    #[arg(long, global = true)]
    pub min_price: Option<String>,

    /// Highest price to include (e.g., 50 or 49.99)
    #[arg(long, global = true)]
    pub max_price: Option<String>,

    /// Bypass the response cache and always fetch fresh data
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Verbose logging, including raw response bodies
    #[arg(long, global = true)]
    pub debug: bool,

    /// How to print the feed
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Print an HTML page of schema.org product data instead of a feed
    #[arg(long, global = true)]
    pub jsonld: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for products by keyword
    Search {
        /// Search terms (e.g., "wireless mouse")
        query: String,

        /// Only keep results whose title contains every search term
        #[arg(long)]
        strict: bool,
    },

    /// Look up a single product by its ASIN
    Item {
        /// Product id (e.g., B07PGL2ZSL)
        id: String,
    },

    /// Serve feeds over HTTP
    Serve {
        /// Address to listen on (default: 0.0.0.0:8000)
        #[arg(long)]
        bind: Option<String>,
    },
}
