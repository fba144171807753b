use super::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Friendship and subscription service")]
pub struct Cli {
    /// Path to a TOML settings file
    #[arg(long)]
    pub settings: Option<String>,
}
