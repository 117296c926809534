//! CLI argument definitions using clap derive

use crate::model::Gender;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// linkpost - a client for the linked-posts feed
///
/// Reads go through a local cache that stays in sync with the server across
/// optimistic edits.
#[derive(Parser, Debug)]
#[command(name = "linkpost")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "LINKPOST_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store the session token
    Login(LoginArgs),

    /// Create an account
    Signup(SignupArgs),

    /// Forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Show the feed
    Feed(FeedArgs),

    /// Show your posts and posts you commented on
    Mine(FeedArgs),

    /// Show, create, edit or delete a post
    Post(PostArgs),

    /// List, add, edit or delete comments
    Comment(CommentArgs),

    /// Change your password
    Password(PasswordArgs),

    /// Upload a new profile photo
    Photo(PhotoArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the login command
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Account email (prompted if omitted)
    #[arg(short, long)]
    pub email: Option<String>,

    /// Account password (prompted if omitted)
    #[arg(long, env = "LINKPOST_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Arguments for the signup command
#[derive(Parser, Debug)]
pub struct SignupArgs {
    /// Display name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Account email
    #[arg(short, long)]
    pub email: Option<String>,

    /// Account password, also used as the confirmation
    #[arg(long, env = "LINKPOST_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Date of birth (e.g. 1990-04-21)
    #[arg(long)]
    pub date_of_birth: Option<String>,

    /// Gender
    #[arg(long)]
    pub gender: Option<GenderArg>,
}

/// Arguments for the feed and mine commands
#[derive(Parser, Debug)]
pub struct FeedArgs {
    /// Number of recent comments to show per post
    #[arg(long, default_value = "1")]
    pub comments: usize,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the post command
#[derive(Parser, Debug)]
pub struct PostArgs {
    #[command(subcommand)]
    pub action: PostAction,
}

/// Post subcommands
#[derive(Subcommand, Debug)]
pub enum PostAction {
    /// Show one post with all its comments
    Show {
        /// Post id
        id: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Publish a new post
    Create {
        /// Post text
        body: Option<String>,

        /// Image to attach
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Edit one of your posts
    Edit {
        /// Post id
        id: String,

        /// New text (keeps the current text if omitted)
        #[arg(short, long)]
        body: Option<String>,

        /// Replace the image
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Remove the image
        #[arg(long, conflicts_with = "image")]
        remove_image: bool,
    },

    /// Delete one of your posts
    Delete {
        /// Post id
        id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the comment command
#[derive(Parser, Debug)]
pub struct CommentArgs {
    #[command(subcommand)]
    pub action: CommentAction,
}

/// Comment subcommands
#[derive(Subcommand, Debug)]
pub enum CommentAction {
    /// List the comments of a post
    List {
        /// Post id
        post: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Comment on a post
    Add {
        /// Post id
        post: String,

        /// Comment text
        content: String,
    },

    /// Edit one of your comments
    Edit {
        /// Post id
        post: String,

        /// Comment id
        comment: String,

        /// New text
        content: String,
    },

    /// Delete one of your comments
    Delete {
        /// Post id
        post: String,

        /// Comment id
        comment: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the password command
#[derive(Parser, Debug)]
pub struct PasswordArgs {
    /// Current password (prompted if omitted)
    #[arg(long, env = "LINKPOST_PASSWORD", hide_env_values = true)]
    pub current: Option<String>,

    /// New password, also used as the confirmation (prompted if omitted)
    #[arg(long = "new", env = "LINKPOST_NEW_PASSWORD", hide_env_values = true)]
    pub new_password: Option<String>,
}

/// Arguments for the photo command
#[derive(Parser, Debug)]
pub struct PhotoArgs {
    /// Image file to upload
    pub path: PathBuf,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., api.base_url)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable cards
    Table,
    /// JSON output
    Json,
    /// Post ids, one per line
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GenderArg {
    Male,
    Female,
}

impl From<GenderArg> for Gender {
    fn from(value: GenderArg) -> Self {
        match value {
            GenderArg::Male => Gender::Male,
            GenderArg::Female => Gender::Female,
        }
    }
}
