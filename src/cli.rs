use clap::Parser;
use std::path::PathBuf;

/// Scripted player session against simulated renderer and ad backends
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Stream URL to load
    #[arg(value_name = "URL")]
    pub url: String,

    /// Ad tag to request a pre-roll for
    #[arg(short = 'a', long = "ad-tag", value_name = "TAG")]
    pub ad_tag: Option<String>,

    /// Simulate an ad server failure (content plays without ads)
    #[arg(long = "fail-ads")]
    pub fail_ads: bool,

    /// Simulate a renderer decode failure mid-stream
    #[arg(long = "fail-stream")]
    pub fail_stream: bool,

    /// Simulated content duration
    #[arg(short = 'd', long = "duration", value_name = "SECS", default_value_t = 10)]
    pub duration: u32,

    /// Override the autoplay setting and wait for an explicit play
    #[arg(long = "no-autoplay")]
    pub no_autoplay: bool,

    /// Write the effective settings to the config directory and continue
    #[arg(long = "save-config")]
    pub save_config: bool,

    /// Enable debug logging to file (default: mediaframe.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}
