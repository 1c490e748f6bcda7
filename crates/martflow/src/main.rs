#![allow(clippy::print_stdout, clippy::print_stderr)]

use martflow::cli::{
    self, ClvCommands, Cli, CliError, Commands, DagCommands, exit_code_for, render_error,
};
use martflow::command_span;
use martflow::commands::{self, CommandOutput};
use martflow::config::{DagConfig, MartflowConfig};
use martflow::tracing::{TracingConfig, TracingFormat, init_tracing};
use tracing::Instrument;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();
    let json_mode = cli.json;

    let tracing_config = TracingConfig {
        format: if json_mode {
            TracingFormat::Json
        } else {
            cli.log_format
        },
        level: cli.level.into(),
        ..TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        let err = CliError::other(format!("Failed to initialize tracing: {e}"));
        render_error(&err, json_mode);
        std::process::exit(exit_code_for(&err));
    }

    let code = match run(cli).await {
        Ok(output) => {
            print_output(&output, json_mode);
            output.exit_code
        }
        Err(err) => {
            render_error(&err, json_mode);
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<CommandOutput, CliError> {
    // version never reads configuration
    let config = match cli.command {
        Commands::Version { .. } => MartflowConfig::default(),
        _ => MartflowConfig::load(cli.config.as_deref())?,
    };

    match cli.command {
        Commands::Version { output_format } => {
            let _span = command_span!("version").entered();
            Ok(commands::version::get_version_info(output_format))
        }
        Commands::Clv { subcommand } => match subcommand {
            ClvCommands::Run {
                input,
                output,
                input_format,
                output_format,
            } => {
                let _span = command_span!("clv run").entered();
                commands::clv::execute_run(
                    &input,
                    output.as_deref(),
                    input_format,
                    output_format,
                    &config.clv,
                )
            }
            ClvCommands::Sql { table, dialect } => {
                let _span = command_span!("clv sql").entered();
                commands::clv::execute_sql(&table, dialect, &config.clv)
            }
        },
        Commands::Dag { subcommand } => match subcommand {
            DagCommands::Show => {
                let _span = command_span!("dag show").entered();
                commands::dag::execute_show(config.dag.settings())
            }
            DagCommands::Validate => {
                let _span = command_span!("dag validate").entered();
                commands::dag::execute_validate(config.dag.settings())
            }
            DagCommands::Run {
                dry_run,
                dbt_bin,
                project_dir,
                profiles_dir,
                retries,
                retry_delay_secs,
            } => {
                let mut settings = config.dag.settings();
                DagConfig {
                    project_dir,
                    profiles_dir,
                    retries,
                    retry_delay_secs,
                }
                .apply(&mut settings);

                commands::dag::execute_run(settings, dry_run, &dbt_bin)
                    .instrument(command_span!("dag run"))
                    .await
            }
        },
    }
}

fn print_output(output: &CommandOutput, json_mode: bool) {
    if json_mode {
        println!("{}", output.envelope());
        return;
    }

    let text = output.text.trim_end_matches('\n');
    if !text.is_empty() {
        println!("{text}");
    }
}
