//! Parameters playground CLI
//!
//! The `playground` command evaluates templates and inspects their declared
//! parameters outside the browser.
//!
//! ## Commands
//!
//! - `preview`: evaluate a template through the recompute loop and print the form
//! - `check`: validate a saved evaluator response offline
//! - `owners`: list the built-in mock workspace owners
//! - `share`: store or fetch a template, locally or on a share server

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use playground_core::{
    spawn_playground, BuildParameter, Diagnostic, Edit, FieldError,
    PlaygroundConfig, PlaygroundOptions, PlaygroundSession, ProcessEvaluator, ReconciledParameter,
    WorkspaceOwner, MOCK_OWNER_NAMES,
};
use playground_share::{FsShareStore, ShareClient, ShareId, ShareService};

#[derive(Parser)]
#[command(name = "playground")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dynamic parameters playground", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Config file (TOML)
    #[arg(long, global = true, env = "PLAYGROUND_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a template and print its parameters
    Preview {
        /// Template file (use - for stdin)
        template: PathBuf,

        /// Evaluator program and arguments, space separated
        #[arg(long)]
        evaluator: Option<String>,

        /// Mock owner to evaluate as
        #[arg(long, default_value = "admin")]
        owner: String,

        /// Field value, as name=value (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        values: Vec<String>,

        /// Evaluator timeout in milliseconds (0 disables)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Write the last evaluator response here, as received
        #[arg(long)]
        export: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate a saved evaluator response without running an evaluator
    Check {
        /// Evaluator response file (use - for stdin)
        response: PathBuf,

        /// Field value, as name=value (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        values: Vec<String>,

        /// Value from the last committed build, as name=value (repeatable)
        #[arg(long = "last-build", value_name = "NAME=VALUE")]
        last_build: Vec<String>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List mock workspace owners
    Owners {
        /// Print one owner in full
        name: Option<String>,
    },

    /// Store or fetch shared templates
    Share {
        #[command(subcommand)]
        action: ShareAction,
    },
}

#[derive(Subcommand)]
enum ShareAction {
    /// Store a template and print its id
    Put {
        /// Template file (use - for stdin)
        template: PathBuf,

        /// Share server base URL; without it the local store is used
        #[arg(long, env = "PLAYGROUND_SHARE_URL")]
        remote: Option<String>,

        /// Local store directory
        #[arg(long)]
        share_dir: Option<PathBuf>,
    },

    /// Print a shared template
    Get {
        id: String,

        /// Share server base URL; without it the local store is used
        #[arg(long, env = "PLAYGROUND_SHARE_URL")]
        remote: Option<String>,

        /// Local store directory
        #[arg(long)]
        share_dir: Option<PathBuf>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    playground_core::telemetry::init_tracing(cli.json, level);

    let mut config =
        PlaygroundConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let out = match cli.command {
        Commands::Preview {
            template,
            evaluator,
            owner,
            values,
            timeout_ms,
            export,
            format,
        } => {
            if let Some(cmd) = evaluator {
                config.evaluator_command = cmd.split_whitespace().map(str::to_string).collect();
            }
            if let Some(ms) = timeout_ms {
                config.evaluator_timeout_ms = ms;
            }
            cmd_preview(
                &config,
                &template,
                &owner,
                &values,
                export.as_deref(),
                format,
            )
            .await?
        }
        Commands::Check {
            response,
            values,
            last_build,
            format,
        } => cmd_check(&response, &values, &last_build, format)?,
        Commands::Owners { name } => cmd_owners(name.as_deref())?,
        Commands::Share { action } => match action {
            ShareAction::Put {
                template,
                remote,
                share_dir,
            } => {
                if let Some(dir) = share_dir {
                    config.share_dir = dir;
                }
                cmd_share_put(&config, &template, remote.as_deref()).await?
            }
            ShareAction::Get {
                id,
                remote,
                share_dir,
                output,
            } => {
                if let Some(dir) = share_dir {
                    config.share_dir = dir;
                }
                cmd_share_get(&config, &id, remote.as_deref(), output.as_deref()).await?
            }
        },
    };

    if !out.is_empty() {
        println!("{}", out.trim_end());
    }
    Ok(())
}

/// Read a file, or stdin for `-`.
fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
}

/// Parse `name=value`. The value may itself contain `=`.
fn parse_assignment(raw: &str) -> Result<BuildParameter> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok(BuildParameter::new(name, value)),
        _ => bail!("Expected NAME=VALUE, got {:?}", raw),
    }
}

fn parse_assignments(raw: &[String]) -> Result<Vec<BuildParameter>> {
    raw.iter().map(|r| parse_assignment(r)).collect()
}

#[derive(Serialize)]
struct FormReport<'a> {
    parameters: Vec<&'a ReconciledParameter>,
    values: Vec<BuildParameter>,
    diagnostics: Vec<Diagnostic>,
    first_invalid: Option<FieldError>,
}

fn render_form(session: &PlaygroundSession, format: OutputFormat) -> Result<String> {
    let report = FormReport {
        parameters: session.sorted_parameters(),
        values: session.committed_values(),
        diagnostics: session.diagnostics(),
        first_invalid: session.first_invalid(),
    };

    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(&report)?);
    }

    let mut out = String::new();
    if report.parameters.is_empty() {
        writeln!(out, "No parameters.")?;
    }
    for p in &report.parameters {
        let def = &p.definition;
        let required = if def.required { " (required)" } else { "" };
        writeln!(
            out,
            "{}{} [{:?}/{:?}] = {:?}",
            def.label(),
            required,
            def.param_type,
            def.form_type,
            p.current_value
        )?;
        if !def.description.is_empty() {
            writeln!(out, "    {}", def.description)?;
        }
    }

    if !report.diagnostics.is_empty() {
        writeln!(out)?;
        writeln!(out, "Diagnostics:")?;
        for d in &report.diagnostics {
            for line in d.to_string().lines() {
                writeln!(out, "  {}", line)?;
            }
        }
    }
    Ok(out)
}

async fn cmd_preview(
    config: &PlaygroundConfig,
    template_path: &Path,
    owner: &str,
    values: &[String],
    export: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    if config.evaluator_command.is_empty() {
        bail!("No evaluator configured. Pass --evaluator or set evaluator_command in the config file.");
    }

    let template = read_input(template_path)?;
    let owner = WorkspaceOwner::mock(owner)?;
    let assignments = parse_assignments(values)?;

    let evaluator = Arc::new(ProcessEvaluator::new(config.evaluator_command.clone()));
    let mut handle = spawn_playground(
        PlaygroundSession::new(template, owner),
        evaluator,
        PlaygroundOptions::from(config),
    );

    let first = handle
        .wait_for(|v| v.evaluations >= 1 && !v.is_recomputing)
        .await?;
    info!(parameters = first.parameters.len(), "initial evaluation finished");

    if !assignments.is_empty() {
        for a in assignments {
            if !first.parameters.iter().any(|p| p.name() == a.name) {
                bail!("Template has no parameter named {:?}", a.name);
            }
            handle
                .send(Edit::Value {
                    name: a.name,
                    value: a.value,
                })
                .await?;
        }
        handle
            .wait_for(|v| v.evaluations >= 2 && !v.is_recomputing)
            .await?;
    }

    let session = handle.shutdown().await?;

    if let Some(path) = export {
        if let Some(json) = session.export_output()? {
            std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
            info!("Wrote evaluator output to {:?}", path);
        }
    }

    render_form(&session, format)
}

fn cmd_check(
    response_path: &Path,
    values: &[String],
    last_build: &[String],
    format: OutputFormat,
) -> Result<String> {
    let raw = read_input(response_path)?;

    let mut session = PlaygroundSession::default();
    session
        .apply_response(Some(&raw))
        .context("Failed to decode evaluator response")?;
    session.set_last_build(parse_assignments(last_build)?);
    for a in parse_assignments(values)? {
        session.set_value(&a.name, a.value)?;
    }

    // On failure the rendered form leads the error message.
    let rendered = render_form(&session, format)?;
    if let Err(e) = session.submit() {
        return Err(e).context(format!(
            "{}\n\nForm cannot be submitted",
            rendered.trim_end()
        ));
    }
    let errors = session.diagnostics().iter().filter(|d| d.is_error()).count();
    if errors > 0 {
        bail!("{}\n\n{} error(s) found", rendered.trim_end(), errors);
    }
    Ok(rendered)
}

fn cmd_owners(name: Option<&str>) -> Result<String> {
    match name {
        Some(name) => Ok(serde_json::to_string_pretty(&WorkspaceOwner::mock(name)?)?),
        None => {
            let mut out = String::new();
            for name in MOCK_OWNER_NAMES {
                let owner = WorkspaceOwner::mock(name)?;
                writeln!(
                    out,
                    "{:<14} {:<24} groups: {}",
                    owner.name,
                    owner.email,
                    owner.groups.join(", ")
                )?;
            }
            Ok(out)
        }
    }
}

fn local_share_service(config: &PlaygroundConfig) -> Result<ShareService> {
    let store = FsShareStore::new(&config.share_dir)
        .with_context(|| format!("Failed to open share store at {:?}", config.share_dir))?;
    Ok(ShareService::new(Arc::new(store), config.max_share_bytes))
}

async fn cmd_share_put(
    config: &PlaygroundConfig,
    template_path: &Path,
    remote: Option<&str>,
) -> Result<String> {
    let code = read_input(template_path)?;
    let id = match remote {
        Some(url) => ShareClient::new(url).put(&code).await?,
        None => local_share_service(config)?.put_code(code).await?,
    };
    Ok(id.to_string())
}

async fn cmd_share_get(
    config: &PlaygroundConfig,
    id: &str,
    remote: Option<&str>,
    output: Option<&Path>,
) -> Result<String> {
    let id: ShareId = id.parse()?;
    let record = match remote {
        Some(url) => ShareClient::new(url).get(&id).await?,
        None => local_share_service(config)?.get(&id).await?,
    };

    match output {
        Some(path) => {
            std::fs::write(path, &record.code)
                .with_context(|| format!("Failed to write {:?}", path))?;
            Ok(String::new())
        }
        None => Ok(record.code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "output": { "parameters": [
            {
                "name": "cpu", "display_name": "CPU", "type": "number", "form_type": "input",
                "default_value": { "value": "4", "valid": true },
                "validations": [ { "validation_min": 1, "validation_max": 8 } ],
                "order": 1
            }
        ] },
        "diags": [],
        "parser_logs": null
    }"#;

    #[test]
    fn test_parse_assignment() {
        let a = parse_assignment("cpu=4").unwrap();
        assert_eq!(a, BuildParameter::new("cpu", "4"));
        let b = parse_assignment("query=a=b").unwrap();
        assert_eq!(b.value, "a=b");
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_check_valid_response() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response.json");
        std::fs::write(&path, RESPONSE).unwrap();

        let out = cmd_check(&path, &[], &[], OutputFormat::Text).unwrap();
        assert!(out.contains("CPU"));
        assert!(out.contains("\"4\""));
    }

    #[test]
    fn test_check_reports_out_of_range_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response.json");
        std::fs::write(&path, RESPONSE).unwrap();

        let err = cmd_check(&path, &["cpu=9".to_string()], &[], OutputFormat::Json).unwrap_err();
        let message = err.to_string();
        assert!(message.ends_with("Form cannot be submitted"));
        let (form, _) = message.split_once("\n\n").unwrap();
        let json: serde_json::Value = serde_json::from_str(form).unwrap();
        assert_eq!(json["first_invalid"]["name"], "cpu");
        assert!(format!("{:#}", err).contains("parameter cpu is invalid"));
    }

    #[test]
    fn test_check_evaluator_error_returns_rendered_form() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response.json");
        let response = RESPONSE.replace(
            r#""diags": [],"#,
            r#""diags": [ { "severity": "error", "summary": "unused variable", "detail": "var.x" } ],"#,
        );
        std::fs::write(&path, response).unwrap();

        let err = cmd_check(&path, &[], &[], OutputFormat::Text).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("CPU"));
        assert!(message.contains("unused variable"));
        assert!(message.ends_with("1 error(s) found"));
    }

    #[test]
    fn test_check_json_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response.json");
        std::fs::write(&path, RESPONSE).unwrap();

        let out = cmd_check(&path, &[], &[], OutputFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["values"][0]["name"], "cpu");
        assert_eq!(json["values"][0]["value"], "4");
    }

    #[test]
    fn test_owners_listing() {
        let out = cmd_owners(None).unwrap();
        for name in MOCK_OWNER_NAMES {
            assert!(out.contains(name));
        }
        assert!(cmd_owners(Some("nobody")).is_err());
        assert!(cmd_owners(Some("sales")).unwrap().contains("\"sales\""));
    }

    #[tokio::test]
    async fn test_share_put_get_local() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("main.tf");
        std::fs::write(&template, "variable \"x\" {}\n").unwrap();

        let config = PlaygroundConfig {
            share_dir: dir.path().join("share"),
            ..Default::default()
        };
        let id = cmd_share_put(&config, &template, None).await.unwrap();
        assert_eq!(id.len(), 10);

        let code = cmd_share_get(&config, &id, None, None).await.unwrap();
        assert_eq!(code, "variable \"x\" {}\n");
    }

    #[tokio::test]
    async fn test_share_put_over_limit() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("main.tf");
        std::fs::write(&template, "x".repeat(200)).unwrap();

        let config = PlaygroundConfig {
            share_dir: dir.path().join("share"),
            max_share_bytes: 100,
            ..Default::default()
        };
        let err = cmd_share_put(&config, &template, None).await.unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn test_preview_requires_evaluator() {
        let config = PlaygroundConfig::default();
        let err = cmd_preview(
            &config,
            Path::new("main.tf"),
            "admin",
            &[],
            None,
            OutputFormat::Text,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("No evaluator"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_preview_with_shell_evaluator() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("main.tf");
        std::fs::write(&template, "variable \"cpu\" {}\n").unwrap();
        let response = dir.path().join("response.json");
        std::fs::write(&response, RESPONSE.replace('\n', " ")).unwrap();
        let export = dir.path().join("output.json");

        let config = PlaygroundConfig {
            evaluator_command: vec![
                "sh".to_string(),
                "-c".to_string(),
                format!("cat >/dev/null; cat {}", response.display()),
            ],
            ..Default::default()
        };
        let out = cmd_preview(
            &config,
            &template,
            "developer",
            &[],
            Some(&export),
            OutputFormat::Text,
        )
        .await
        .unwrap();
        assert!(out.contains("CPU"));
        assert!(std::fs::read_to_string(&export).unwrap().contains("\"cpu\""));
    }
}
