use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::Token;
use crate::config::Config;
use crate::monitor::scheduler::Scheduler;
use crate::monitor::{Monitor, Scope};
use crate::output::{print_dashboard, DashboardView, RefreshProgress};
use crate::providers::GitLabProvider;
use crate::watch::{self, WatchOptions};

const AUDIT_TAIL_LINES: usize = 10;

#[derive(Parser)]
#[command(name = "mrwatch")]
#[command(author, version, about = "GitLab Merge Request Monitor", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct ConnectionArgs {
    /// GitLab personal access token
    #[arg(short, long, env = "GITLAB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// GitLab instance base URL [default: https://gitlab.com]
    #[arg(short, long)]
    url: Option<String>,

    /// Project path (e.g., 'group/project') or numeric id
    #[arg(short = 'P', long)]
    project: Option<String>,

    /// List every open merge request instead of only those assigned to you
    #[arg(short, long)]
    all: bool,

    /// Include draft merge requests
    #[arg(short, long)]
    drafts: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch once and print the merge request table
    List {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Only show merge requests whose title fuzzy-matches this text
        #[arg(short, long)]
        search: Option<String>,

        /// Print the visible rows as JSON
        #[arg(long)]
        json: bool,

        #[arg(short, long, default_value_t = false)]
        pretty: bool,
    },
    /// Keep refreshing and accept commands on stdin
    Watch {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Seconds between refreshes
        #[arg(short, long)]
        interval: Option<u64>,

        /// Initial title search
        #[arg(short, long)]
        search: Option<String>,
    },
}

/// Config file values with command line overrides applied.
#[derive(Debug)]
struct Settings {
    token: Option<Token>,
    base_url: String,
    project: String,
    scope: Scope,
    show_drafts: bool,
    max_merge_requests: usize,
    refresh_interval: Duration,
    audit_capacity: usize,
}

impl Settings {
    fn resolve(config: Config, connection: &ConnectionArgs, interval: Option<u64>) -> Result<Self> {
        let project = connection
            .project
            .clone()
            .or(config.gitlab.project_path)
            .filter(|project| !project.trim().is_empty())
            .context("No GitLab project given; pass --project or set project-path in the config file")?;

        let scope = if connection.all {
            Scope::All
        } else {
            config.monitor.scope
        };

        Ok(Self {
            token: connection
                .token
                .clone()
                .or(config.gitlab.token)
                .map(Token::from),
            base_url: connection.url.clone().unwrap_or(config.gitlab.base_url),
            project,
            scope,
            show_drafts: connection.drafts || config.monitor.show_drafts,
            max_merge_requests: config.monitor.max_merge_requests,
            refresh_interval: Duration::from_secs(
                interval.unwrap_or(config.monitor.refresh_interval_secs),
            ),
            audit_capacity: config.monitor.audit_capacity,
        })
    }

    fn provider(&self) -> Result<GitLabProvider> {
        GitLabProvider::new(
            &self.base_url,
            self.project.clone(),
            self.token.clone(),
            self.max_merge_requests,
        )
        .context("Failed to set up the GitLab client")
    }
}

impl Cli {
    async fn execute_list(
        &self,
        settings: Settings,
        search: Option<&str>,
        json: bool,
        pretty: bool,
    ) -> Result<()> {
        let provider = Arc::new(settings.provider()?);
        let progress = RefreshProgress::start(provider.project_path());

        let mut monitor = Monitor::new(provider, settings.scope, settings.audit_capacity);
        let report = monitor.refresh().await;

        if !report.listed {
            progress.fail();
            let reason = monitor
                .audit()
                .events()
                .last()
                .map(ToString::to_string)
                .unwrap_or_default();
            anyhow::bail!("{reason}");
        }
        progress.finish(report.enrichment.merge_requests);

        let snapshot = monitor.snapshot();
        let query = search.unwrap_or_default();
        let visible = snapshot.visible(settings.show_drafts, query);

        if json {
            let json_output = if pretty {
                serde_json::to_string_pretty(&visible)?
            } else {
                serde_json::to_string(&visible)?
            };
            println!("{json_output}");
        } else {
            print_dashboard(
                &snapshot,
                &DashboardView {
                    show_drafts: settings.show_drafts,
                    query,
                    status: None,
                    audit_lines: monitor.audit().len(),
                },
            );
        }

        Ok(())
    }

    async fn execute_watch(&self, settings: Settings, search: Option<&str>) -> Result<()> {
        info!(
            "Watching {} every {}s",
            settings.project,
            settings.refresh_interval.as_secs()
        );

        let provider = Arc::new(settings.provider()?);
        let monitor = Monitor::new(provider, settings.scope, settings.audit_capacity);
        let (scheduler, handle) = Scheduler::new(monitor, settings.refresh_interval);
        let scheduler_task = tokio::spawn(scheduler.run());

        watch::run(
            handle,
            WatchOptions {
                show_drafts: settings.show_drafts,
                query: search.unwrap_or_default().to_string(),
                audit_lines: AUDIT_TAIL_LINES,
            },
        )
        .await?;

        scheduler_task
            .await
            .context("Refresh scheduler terminated abnormally")?;
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::List {
                connection,
                search,
                json,
                pretty,
            } => {
                let settings = Settings::resolve(config, connection, None)?;
                self.execute_list(settings, search.as_deref(), *json, *pretty)
                    .await
            }
            Commands::Watch {
                connection,
                interval,
                search,
            } => {
                let settings = Settings::resolve(config, connection, *interval)?;
                self.execute_watch(settings, search.as_deref()).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_project() -> Config {
        let mut config = Config::default();
        config.gitlab.project_path = Some("group/project".to_string());
        config.gitlab.token = Some("from-config".to_string());
        config
    }

    #[test]
    fn test_resolve_uses_config_values() {
        let settings =
            Settings::resolve(config_with_project(), &ConnectionArgs::default(), None).unwrap();

        assert_eq!(settings.project, "group/project");
        assert_eq!(settings.base_url, "https://gitlab.com");
        assert_eq!(settings.scope, Scope::Mine);
        assert!(!settings.show_drafts);
        assert_eq!(settings.refresh_interval, Duration::from_secs(30));
        assert_eq!(settings.token.unwrap().as_str(), "from-config");
    }

    #[test]
    fn test_resolve_flags_override_config() {
        let connection = ConnectionArgs {
            token: Some("from-flag".to_string()),
            url: Some("https://gitlab.example.com".to_string()),
            project: Some("other/project".to_string()),
            all: true,
            drafts: true,
        };

        let settings = Settings::resolve(config_with_project(), &connection, Some(5)).unwrap();

        assert_eq!(settings.project, "other/project");
        assert_eq!(settings.base_url, "https://gitlab.example.com");
        assert_eq!(settings.scope, Scope::All);
        assert!(settings.show_drafts);
        assert_eq!(settings.refresh_interval, Duration::from_secs(5));
        assert_eq!(settings.token.unwrap().as_str(), "from-flag");
    }

    #[test]
    fn test_resolve_requires_project() {
        let err = Settings::resolve(Config::default(), &ConnectionArgs::default(), None)
            .unwrap_err();
        assert!(err.to_string().contains("--project"));
    }

    #[test]
    fn test_cli_parses_watch_command() {
        let cli = Cli::try_parse_from([
            "mrwatch", "watch", "-P", "group/project", "--interval", "10", "--all",
        ])
        .unwrap();

        match cli.command {
            Commands::Watch {
                connection,
                interval,
                ..
            } => {
                assert_eq!(connection.project.as_deref(), Some("group/project"));
                assert!(connection.all);
                assert_eq!(interval, Some(10));
            }
            Commands::List { .. } => panic!("expected the watch command"),
        }
    }
}
