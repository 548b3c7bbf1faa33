use clap::{Parser, Subcommand};
use simple_press::config::{self, CONFIG_FILE};
use simple_press::gate::{ReadyGate, ReadyState};
use simple_press::mode::{BuildContext, RunMode};
use simple_press::serve::{self, ServeRoot};
use simple_press::site::{self, BuildOptions};
use simple_press::{output, readme, watch};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("PRESS_ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("PRESS_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "simple-press")]
#[command(about = "Static site generator for blogs and documentation sites")]
#[command(long_about = "\
Static site generator for blogs and documentation sites

Markdown, HTML, and JSON files under the input directory become pages.
Front matter sets titles, layouts, tags, and permalinks; directory data
files (posts/posts.json) cascade into everything below them.

Project structure:

  config.toml                      # Optional, see 'simple-press gen-config'
  src/
  ├── _includes/                   # Layouts (base and post are built in)
  ├── _data/                       # Global data: author.json → {{ author.name }}
  ├── assets/                      # Copied to dist/assets, stylesheets compiled
  ├── index.html                   # → /
  ├── about.md                     # → /about/
  └── posts/
      ├── posts.json               # Directory data for every post
      └── 2024-01-15-hello.md      # → /posts/hello/

Drafts (draft: true) are left out of 'build' and included by 'watch' and
'serve'. Set BUILD_DRAFTS=1 or pass --drafts to include them in a build.")]
#[command(version = version_string())]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (default: <root>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by commands that write the output directory.
#[derive(clap::Args, Clone)]
struct OutputArgs {
    /// Remove the output directory first
    #[arg(long)]
    clean: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site once
    Build {
        #[command(flatten)]
        output: OutputArgs,
        /// Include drafts
        #[arg(long)]
        drafts: bool,
    },
    /// Build, then rebuild on changes (drafts included)
    Watch(OutputArgs),
    /// Watch and serve the output over HTTP (drafts included)
    Serve {
        #[command(flatten)]
        output: OutputArgs,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// Interface to bind
        #[arg(long)]
        interface: Option<IpAddr>,
    },
    /// Validate the site without writing anything
    Check {
        /// Include drafts
        #[arg(long)]
        drafts: bool,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
    /// Copy README.md into the input directory as a page
    Readme,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "simple_press=debug" } else { "simple_press=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Absolute project root and config path, so watcher events compare equal.
fn resolve_paths(cli: &Cli) -> std::io::Result<(PathBuf, PathBuf)> {
    let root = std::fs::canonicalize(&cli.root)?;
    let config = match &cli.config {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => std::env::current_dir()?.join(path),
        None => root.join(CONFIG_FILE),
    };
    Ok((root, config))
}

fn run_continuous(
    root: &Path,
    config_path: &Path,
    ctx: &BuildContext,
    options: BuildOptions,
    server: Option<(Arc<ReadyGate>, ServeRoot)>,
) -> Result<(), Box<dyn std::error::Error>> {
    watch::run(root, config_path, ctx, options, |result| {
        match result {
            Ok(report) => output::print_build_output(report),
            Err(err) => eprintln!("Build failed: {err}"),
        }
        let Some((gate, serve_root)) = &server else {
            return;
        };
        if let Ok(report) = result {
            if serve_root.set(&report.output_dir) {
                println!("Now serving {}", report.output_dir.display());
            }
        }
        // The first build opens the gate even when it failed, so waiting
        // requests get the previous output or a 404 instead of hanging.
        gate.advance(ReadyState::Complete);
    })?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut ctx = BuildContext::from_env();

    match &cli.command {
        Command::Build { output, drafts } => {
            ctx.apply_run_mode(RunMode::Build);
            if *drafts {
                ctx.enable_drafts();
            }
            let (root, config_path) = resolve_paths(&cli)?;
            let config = config::load_config(&config_path)?;
            let report = site::build(&root, &config, &ctx, BuildOptions { clean: output.clean })?;
            output::print_build_output(&report);
        }
        Command::Watch(output) => {
            ctx.apply_run_mode(RunMode::Watch);
            let (root, config_path) = resolve_paths(&cli)?;
            run_continuous(&root, &config_path, &ctx, BuildOptions { clean: output.clean }, None)?;
        }
        Command::Serve {
            output,
            port,
            interface,
        } => {
            ctx.apply_run_mode(RunMode::Serve);
            let (root, config_path) = resolve_paths(&cli)?;
            let config = config::load_config(&config_path)?;
            let mut server_config = config.server.clone();
            if let Some(port) = port {
                server_config.port = *port;
            }
            if let Some(interface) = interface {
                server_config.interface = *interface;
            }

            let gate = Arc::new(ReadyGate::new());
            let server = serve::bind(&server_config)?;
            println!("Serving http://{}/", server.addr());
            let serve_root = ServeRoot::new(config.dir.output_dir(&root));
            let _accept = server.spawn(serve_root.clone(), Arc::clone(&gate));
            run_continuous(
                &root,
                &config_path,
                &ctx,
                BuildOptions { clean: output.clean },
                Some((gate, serve_root)),
            )?;
        }
        Command::Check { drafts } => {
            ctx.apply_run_mode(RunMode::Build);
            if *drafts {
                ctx.enable_drafts();
            }
            let (root, config_path) = resolve_paths(&cli)?;
            let config = config::load_config(&config_path)?;
            println!("==> Checking {}", root.display());
            let report = site::check(&root, &config, &ctx)?;
            output::print_check_output(&report);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Readme => {
            let (root, config_path) = resolve_paths(&cli)?;
            let config = config::load_config(&config_path)?;
            let written = readme::import(&root, &config)?;
            println!("README.md copied to {} with front matter", written.display());
        }
    }

    Ok(())
}
