use std::path::PathBuf;

use chrono::NaiveTime;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::{
    app::LogLevel,
    display::{render, RenderRequest},
    pipeline::{all_succeeded, StageStatus},
    Error, Result,
};

#[derive(Debug, Parser)]
#[command(name = "pipeline-deck")]
#[command(about = "Stream Deck plugin showing AWS CodePipeline stage status on a key")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunOptions,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Talk to the host over stdin/stdout (the default).
    Run(RunOptions),
    /// Print the SVG a key would show, for checking layouts.
    Render(RenderOptions),
    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Flags that override the config file for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct RunOptions {
    /// Config file to read instead of ~/.pipeline_deck/config.toml.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
    /// AWS CLI executable.
    #[arg(long, value_name = "PATH")]
    pub aws_cli: Option<String>,
    /// Action identifier whose events this plugin handles.
    #[arg(long, value_name = "ID")]
    pub action_uuid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct RenderOptions {
    #[arg(long, default_value = "")]
    pub name: String,
    /// Comma separated stage results: s(ucceeded), f(ailed), p(rogress).
    #[arg(long, value_delimiter = ',', value_parser = parse_stage)]
    pub stages: Vec<StageStatus>,
    /// Show the placeholder for incomplete settings.
    #[arg(long)]
    pub unconfigured: bool,
    /// Caption time as HH:MM; defaults to now.
    #[arg(long, value_parser = parse_time)]
    pub time: Option<NaiveTime>,
}

impl Cli {
    /// The subcommand to run, with `run` standing in when none was given.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Run(self.run))
    }
}

impl RenderOptions {
    pub fn to_svg(&self) -> String {
        let icon = if self.unconfigured {
            render(&RenderRequest::Unconfigured)
        } else {
            let refreshed_at = self.time.unwrap_or_else(|| chrono::Local::now().time());
            render(&RenderRequest::Pipeline {
                display_name: &self.name,
                statuses: &self.stages,
                refreshing: !all_succeeded(&self.stages),
                refreshed_at,
            })
        };
        icon.to_svg()
    }
}

fn parse_stage(raw: &str) -> Result<StageStatus> {
    StageStatus::parse_loose(raw)
        .ok_or_else(|| Error::InvalidArgs(format!("unknown stage status '{raw}'")))
}

fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|e| Error::InvalidArgs(format!("expected HH:MM, got '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Command {
        let mut argv = vec!["pipeline-deck"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().into_command()
    }

    #[test]
    fn no_subcommand_means_run() {
        match parse(&["--log-level", "debug", "--aws-cli", "/opt/aws"]) {
            Command::Run(opts) => {
                assert_eq!(opts.log_level, Some(LogLevel::Debug));
                assert_eq!(opts.aws_cli.as_deref(), Some("/opt/aws"));
                assert_eq!(opts.config, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn explicit_run_takes_overrides() {
        match parse(&["run", "--config", "/tmp/deck.toml", "--action-uuid", "x.y"]) {
            Command::Run(opts) => {
                assert_eq!(opts.config, Some(PathBuf::from("/tmp/deck.toml")));
                assert_eq!(opts.action_uuid.as_deref(), Some("x.y"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn render_parses_stages_and_time() {
        match parse(&["render", "--name", "Demo", "--stages", "s,f,p", "--time", "09:05"]) {
            Command::Render(opts) => {
                assert_eq!(
                    opts.stages,
                    vec![
                        StageStatus::Succeeded,
                        StageStatus::Failed,
                        StageStatus::InProgress
                    ]
                );
                let svg = opts.to_svg();
                assert!(svg.contains("09:05"));
                assert!(svg.contains("Demo"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Cli::try_parse_from(["pipeline-deck", "render", "--stages", "s,x"]).is_err());
        assert!(Cli::try_parse_from(["pipeline-deck", "render", "--time", "9am"]).is_err());
        assert!(Cli::try_parse_from(["pipeline-deck", "--log-level", "loud"]).is_err());
    }

    #[test]
    fn unconfigured_render_shows_placeholder() {
        let opts = RenderOptions {
            unconfigured: true,
            ..RenderOptions::default()
        };
        assert!(opts.to_svg().contains("Not Configured"));
    }
}
