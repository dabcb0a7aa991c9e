use anyhow::Result;
use ccupdater::commands;
use ccupdater::context::{ContextOptions, Stats};
use ccupdater::remote::DEFAULT_CATALOG_URL;
use ccupdater::runtime::{RealRuntime, Runtime};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// ccupdater - CrossCode mod updater
///
/// Installs, updates and removes CrossCode mods, tools and CCLoader using the
/// CCModDB catalog.
///
/// Examples:
///   ccupdater install CrossCode-Tweaks   # Install a mod and its dependencies
///   ccupdater outdated                   # Show mods with newer versions
#[derive(Parser, Debug)]
#[command(author, about, version = env!("CCUPDATER_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Game directory (defaults to the current directory; also via CCUPDATER_GAME)
    #[arg(long, env = "CCUPDATER_GAME", value_name = "PATH", global = true)]
    game: Option<PathBuf>,

    /// Skip dependency checks and perform exactly the requested operations
    #[arg(long, global = true)]
    force: bool,

    /// Print more about what is happening
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Mod catalog URL
    #[arg(
        long = "catalog-url",
        env = "CCUPDATER_CATALOG_URL",
        value_name = "URL",
        default_value = DEFAULT_CATALOG_URL,
        global = true
    )]
    catalog_url: String,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install packages from the catalog
    Install(NamesArgs),

    /// Install packed .ccmod files
    InstallFrom(InstallFromArgs),

    /// Remove installed packages
    #[command(visible_aliases = ["delete", "uninstall"])]
    Remove(NamesArgs),

    /// Update the named packages, or every outdated package
    Update(UpdateArgs),

    /// List installed and available packages
    List(ListArgs),

    /// Show installed packages with newer versions available
    Outdated,

    /// Print the version
    Version,
}

#[derive(clap::Args, Debug)]
struct NamesArgs {
    #[arg(value_name = "NAME", required = true)]
    names: Vec<String>,
}

#[derive(clap::Args, Debug)]
struct UpdateArgs {
    #[arg(value_name = "NAME")]
    names: Vec<String>,
}

#[derive(clap::Args, Debug)]
struct InstallFromArgs {
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Also use the catalog, for dependencies
    #[arg(long)]
    online: bool,
}

#[derive(clap::Args, Debug)]
struct ListArgs {
    /// Include base packages
    #[arg(long)]
    all: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let runtime: Arc<dyn Runtime> = Arc::new(RealRuntime);
    let options = ContextOptions {
        game: cli.game,
        catalog_url: cli.catalog_url,
        force: cli.force,
    };
    let mut stats = Stats::default();

    let result = match cli.command {
        Commands::Install(args) => {
            commands::install(runtime, &options, &args.names, &mut stats).await
        }
        Commands::InstallFrom(args) => {
            commands::install_from(runtime, &options, &args.files, args.online, &mut stats).await
        }
        Commands::Remove(args) => commands::remove(runtime, &options, &args.names, &mut stats).await,
        Commands::Update(args) => commands::update(runtime, &options, &args.names, &mut stats).await,
        Commands::List(args) => {
            commands::list(runtime, &options, args.all, &mut stats).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Outdated => {
            commands::outdated(runtime, &options).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Version => {
            println!("ccupdater {}", env!("CCUPDATER_VERSION"));
            return Ok(ExitCode::SUCCESS);
        }
    };

    if commands::print_stats_and_error(&stats, &result) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_install_parsing() {
        let cli = Cli::try_parse_from(["ccupdater", "install", "a", "b"]).unwrap();
        match cli.command {
            Commands::Install(args) => assert_eq!(args.names, vec!["a", "b"]),
            _ => panic!("Expected Install command"),
        }
        assert_eq!(cli.game, None);
        assert!(!cli.force);
    }

    #[test]
    fn test_cli_remove_aliases() {
        for alias in ["remove", "delete", "uninstall"] {
            let cli = Cli::try_parse_from(["ccupdater", alias, "a"]).unwrap();
            assert!(matches!(cli.command, Commands::Remove(_)));
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from([
            "ccupdater",
            "update",
            "--game",
            "/games/CrossCode",
            "--force",
            "-v",
            "--catalog-url",
            "http://localhost/db.json",
        ])
        .unwrap();
        assert_eq!(cli.game, Some(PathBuf::from("/games/CrossCode")));
        assert!(cli.force);
        assert!(cli.verbose);
        assert_eq!(cli.catalog_url, "http://localhost/db.json");
        match cli.command {
            Commands::Update(args) => assert!(args.names.is_empty()),
            _ => panic!("Expected Update command"),
        }
    }

    #[test]
    fn test_cli_install_from_parsing() {
        let cli = Cli::try_parse_from(["ccupdater", "install-from", "--online", "a.ccmod"]).unwrap();
        match cli.command {
            Commands::InstallFrom(args) => {
                assert!(args.online);
                assert_eq!(args.files, vec![PathBuf::from("a.ccmod")]);
            }
            _ => panic!("Expected InstallFrom command"),
        }
    }

    #[test]
    fn test_cli_requires_names() {
        assert!(Cli::try_parse_from(["ccupdater", "install"]).is_err());
        assert!(Cli::try_parse_from(["ccupdater", "remove"]).is_err());
        assert!(Cli::try_parse_from(["ccupdater"]).is_err());
    }
}
