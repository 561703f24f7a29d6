use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tstack", about = concat!("tstack v", env!("CARGO_PKG_VERSION"), " - a todo stack that forgets for you"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different workspace directory
    #[arg(short = 'C', long = "dir", global = true)]
    pub dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a .tstack/ workspace in the current directory
    Init(InitArgs),
    /// Show the stack, top first (default command)
    List,
    /// Show one item in full
    Show(ItemArg),
    /// Push a new item on top of the stack
    Push(PushArgs),
    /// Remove the top item
    Pop,
    /// Move an item one place toward the top
    Up(ItemArg),
    /// Move an item one place toward the bottom
    Down(ItemArg),
    /// Delete an item
    Delete(ItemArg),
    /// Edit an item's title, description or links
    Edit(EditArgs),
    /// Select an item, or deselect it if already selected
    Select(SelectArgs),
    /// Show or change stack settings
    Settings(SettingsArgs),
    /// Remove expired items now
    Sweep,
    /// Keep running, sweeping expired items on a timer
    Watch(WatchArgs),
    /// Print the recovery log
    Recovery,
}

#[derive(Args)]
pub struct InitArgs {
    /// Rewrite config.toml even if the workspace exists (records are kept)
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ItemArg {
    /// Item ID or unique prefix (default: the selected item)
    pub id: Option<String>,
}

#[derive(Args)]
pub struct SelectArgs {
    /// Item ID or unique prefix
    pub id: String,
}

#[derive(Args)]
pub struct PushArgs {
    /// Item title
    pub title: String,
    /// Longer description
    #[arg(short, long, default_value = "")]
    pub description: String,
    /// Link to attach (repeatable)
    #[arg(short, long = "link")]
    pub links: Vec<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Item ID or unique prefix (default: the selected item)
    pub id: Option<String>,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New description
    #[arg(short, long)]
    pub description: Option<String>,
    /// Add a link (repeatable)
    #[arg(short, long = "link")]
    pub links: Vec<String>,
    /// Remove a link (repeatable)
    #[arg(long = "rm-link")]
    pub rm_links: Vec<String>,
    /// Remove all links before adding any given with --link
    #[arg(long)]
    pub clear_links: bool,
}

#[derive(Args)]
pub struct SettingsArgs {
    /// Maximum number of items on the stack
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=10))]
    pub max_items: Option<u64>,
    /// Hours an item may stay on the stack
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=168))]
    pub max_hours: Option<u64>,
}

#[derive(Args)]
pub struct WatchArgs {
    /// Seconds between sweeps (default: [sweep] interval_secs from config)
    #[arg(long)]
    pub interval: Option<u64>,
    /// Exit after this many sweep ticks
    #[arg(long)]
    pub ticks: Option<usize>,
}
