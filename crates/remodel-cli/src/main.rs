use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use remodel_store::{HttpChartStore, HttpStoreConfig, Renamer, RunReport, StoreError};

mod config;
mod logging;
mod render;

use config::{ConfigError, PartialSettings};

fn cli() -> Command {
    Command::new("remodel")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Rename a model in every saved chart of a project")
        .long_about(
            "Rewrites dimensions, metrics, filters, sorts, table calculations, table \
             columns and chart axes that reference the old model. Conditional formatting, \
             reference lines, dashboards and dashboard filters are left untouched.",
        )
        .arg(
            Arg::new("old")
                .long("old")
                .value_name("MODEL")
                .help("Model name to replace"),
        )
        .arg(
            Arg::new("new")
                .long("new")
                .value_name("MODEL")
                .help("Replacement model name"),
        )
        .arg(
            Arg::new("project")
                .long("project")
                .env("REMODEL_PROJECT")
                .value_name("UUID")
                .help("Project whose charts are rewritten"),
        )
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .env("REMODEL_API_URL")
                .value_name("URL")
                .help("API root, e.g. http://localhost:3000/api/v1"),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .env("REMODEL_API_KEY")
                .hide_env_values(true)
                .value_name("KEY")
                .help("Personal access token"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("TOML file with default settings"),
        )
        .arg(
            Arg::new("apply")
                .long("apply")
                .action(ArgAction::SetTrue)
                .help("Save changed charts (default is a dry run)"),
        )
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .value_parser(value_parser!(usize))
                .help("Maximum concurrent requests [default: 8]"),
        )
        .arg(
            Arg::new("timeout-secs")
                .long("timeout-secs")
                .value_parser(value_parser!(u64))
                .help("Per-request timeout in seconds [default: 30]"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Print before/after JSON of changed charts"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Debug logging"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .action(ArgAction::SetTrue)
                .help("Log as JSON lines"),
        )
}

fn flag_overrides(args: &ArgMatches) -> PartialSettings {
    let string = |id: &str| args.get_one::<String>(id).cloned();
    PartialSettings {
        api_url: string("api-url"),
        project_uuid: string("project"),
        api_key: string("api-key"),
        old_model: string("old"),
        new_model: string("new"),
        apply: args.get_flag("apply").then_some(true),
        concurrency: args.get_one::<usize>("concurrency").copied(),
        timeout_secs: args.get_one::<u64>("timeout-secs").copied(),
        verbose: args.get_flag("verbose").then_some(true),
    }
}

/// Build the HTTP store; an unusable API key is a configuration error
fn connect(config: &HttpStoreConfig) -> anyhow::Result<HttpChartStore> {
    match HttpChartStore::new(config) {
        Ok(store) => Ok(store),
        Err(StoreError::InvalidApiKey) => Err(ConfigError::InvalidApiKey.into()),
        Err(e) => Err(anyhow::Error::new(e).context("could not create chart store client")),
    }
}

fn is_config_error(e: &anyhow::Error) -> bool {
    e.downcast_ref::<ConfigError>().is_some()
}

async fn run(args: &ArgMatches) -> anyhow::Result<(RunReport, bool)> {
    let file = match args.get_one::<PathBuf>("config") {
        Some(path) => PartialSettings::from_file(path)?,
        None => PartialSettings::default(),
    };
    let settings = file.merge(flag_overrides(args)).resolve()?;

    let store = connect(&settings.store)?;
    let report = Renamer::new(Arc::new(store), settings.run)
        .run()
        .await
        .context("could not list spaces")?;

    Ok((report, settings.verbose))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli().get_matches();
    logging::init(args.get_flag("debug"), args.get_flag("log-json"));

    match run(&args).await {
        Ok((report, verbose)) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = render::render(&report, verbose, &mut stdout) {
                tracing::error!("could not write report: {e}");
                return ExitCode::FAILURE;
            }
            if report.has_failures() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) if is_config_error(&e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn flags_become_overrides() {
        let args = cli()
            .try_get_matches_from([
                "remodel",
                "--old",
                "customers",
                "--new",
                "users",
                "--project",
                "p1",
                "--api-key",
                "k",
                "--apply",
                "--concurrency",
                "3",
            ])
            .unwrap();

        let overrides = flag_overrides(&args);
        assert_eq!(overrides.old_model.as_deref(), Some("customers"));
        assert_eq!(overrides.apply, Some(true));
        assert_eq!(overrides.concurrency, Some(3));
        assert_eq!(overrides.verbose, None);
    }

    #[test]
    fn unusable_api_key_is_a_config_error() {
        let bad = HttpStoreConfig::new("http://localhost:3000/api/v1", "p1", "key\nwith newline");
        let err = connect(&bad).unwrap_err();
        assert!(is_config_error(&err));
        assert!(err.to_string().contains("api_key"));

        let good = HttpStoreConfig::new("http://localhost:3000/api/v1", "p1", "key");
        assert!(connect(&good).is_ok());
    }

    #[test]
    fn runtime_failures_are_not_config_errors() {
        let err = anyhow::Error::new(StoreError::NotFound("chart c1".to_string()))
            .context("could not list spaces");
        assert!(!is_config_error(&err));
    }

    #[test]
    fn absent_apply_flag_does_not_override_file() {
        let args = cli()
            .try_get_matches_from(["remodel", "--old", "a", "--new", "b"])
            .unwrap();
        let file = PartialSettings {
            apply: Some(true),
            ..PartialSettings::default()
        };

        assert_eq!(file.merge(flag_overrides(&args)).apply, Some(true));
    }
}
