//! Command-line interface definitions.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{ColorChoice, Parser};
use hotreload::config::{ConfigFile, DEFAULT_CONFIG_FILE};

/// Live-reload development server
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (optional)
    #[arg(short = 'C', long, default_value = DEFAULT_CONFIG_FILE, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Static asset directory
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub static_root: Option<String>,

    /// Template glob, e.g. "./templates/*.html"
    #[arg(short, long)]
    pub templates: Option<String>,

    /// URL prefix for static files
    #[arg(long)]
    pub static_route: Option<String>,

    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<IpAddr>,

    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Serve the live reload script
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub hot_reload: Option<bool>,

    /// Reload the page on every change
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub auto_reload: Option<bool>,

    /// Print debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded file.
    pub fn apply(&self, config: &mut ConfigFile) {
        let reload = &mut config.reload;
        if let Some(root) = &self.static_root {
            reload.static_root = root.clone();
        }
        if let Some(glob) = &self.templates {
            reload.template_glob = Some(glob.clone());
        }
        if let Some(route) = &self.static_route {
            reload.static_route = route.clone();
        }
        if let Some(v) = self.hot_reload {
            reload.hot_reload = v;
        }
        if let Some(v) = self.auto_reload {
            reload.auto_reload = v;
        }

        if let Some(interface) = self.interface {
            config.serve.interface = interface;
        }
        if let Some(port) = self.port {
            config.serve.port = port;
        }
    }
}
