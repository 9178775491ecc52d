use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio::process::Command;
use tracing::info;

use crate::config::{ENV_FILE_VAR, OUTPUT_DIR_VAR, VARIABLES_VAR, env_file};

const TESTS_MANIFEST: &str = "tests/Cargo.toml";
const DEFAULT_OUTPUT_DIR: &str = "test_output";

#[derive(Parser)]
#[command(name = "tedge-it")]
#[command(version, about = "Project tasks for the thin-edge.io integration tests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the linter over the workspace
    Lint,

    /// Format the workspace
    Format,

    /// Build the docker image used for test devices
    Build {
        /// Image name
        #[arg(long, default_value = "debian-systemd")]
        name: String,
    },

    /// Point `.env` at another environment, e.g. `usecontext dev`
    Usecontext {
        /// Copies `.<context>.env` to `.env`
        context: String,
    },

    /// Run the end-to-end tests
    Test {
        /// Run tests in the test environment
        #[arg(long, conflicts_with = "devenv")]
        testenv: bool,

        /// Run tests in the dev environment
        #[arg(long)]
        devenv: bool,

        /// Variables file used to control the test
        #[arg(long)]
        variables: Option<PathBuf>,

        /// Marker expression, e.g. "not measurements and not events"
        #[arg(long, short = 'm')]
        modules: Option<String>,

        /// Only include tests whose names match this pattern
        #[arg(long, short = 'k')]
        pattern: Option<String>,
    },
}

/// Target environment of a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Default,
    Dev,
    Tst,
}

/// Test name filters derived from a marker expression.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ModuleFilter {
    pub include: Vec<String>,
    pub skip: Vec<String>,
}

impl ModuleFilter {
    /// Parse `a`, `a or b`, `not a`, `a and not b` style expressions.
    ///
    /// Positive terms become test filters, any of which selects a test, so
    /// they can only be joined with `or`. `not` terms become `--skip` flags,
    /// which always apply, so they can only be joined with `and`.
    pub fn parse(expr: &str) -> anyhow::Result<Self> {
        if expr.contains(['(', ')']) {
            bail!("grouping is not supported in module expressions: {expr}");
        }
        let mut filter = Self::default();
        let mut negate = false;
        let mut connector: Option<&str> = None;
        let mut previous_negated: Option<bool> = None;
        for word in expr.split_whitespace() {
            match word {
                "and" | "or" => {
                    if negate || previous_negated.is_none() || connector.is_some() {
                        bail!("misplaced '{word}' in module expression: {expr}");
                    }
                    connector = Some(word);
                }
                "not" => negate = !negate,
                term => {
                    match (previous_negated, connector) {
                        (None, _) => {}
                        (Some(_), None) => bail!("missing 'and'/'or' before {term} in: {expr}"),
                        (Some(false), Some("and")) if !negate => bail!(
                            "'{term}' cannot be required together with another module, use 'or': {expr}"
                        ),
                        (Some(prev), Some("or")) if prev || negate => {
                            bail!("'not' terms can only be combined with 'and': {expr}")
                        }
                        _ => {}
                    }
                    if negate {
                        filter.skip.push(term.to_string());
                    } else {
                        filter.include.push(term.to_string());
                    }
                    previous_negated = Some(negate);
                    negate = false;
                    connector = None;
                }
            }
        }
        if negate || connector.is_some() {
            bail!("dangling operator in module expression: {expr}");
        }
        Ok(filter)
    }
}

/// Everything needed to launch `cargo test` on the e2e crate.
#[derive(Debug, PartialEq, Eq)]
pub struct TestPlan {
    pub env_file: PathBuf,
    pub variables: Option<PathBuf>,
    pub filter: ModuleFilter,
    pub pattern: Option<String>,
}

impl TestPlan {
    /// An explicit variables file wins over the environment's defaults.
    pub fn new(
        environment: Environment,
        variables: Option<PathBuf>,
        modules: Option<&str>,
        pattern: Option<String>,
    ) -> anyhow::Result<Self> {
        let (env_file, variables) = match (variables, environment) {
            (Some(variables), _) => (".env", Some(variables)),
            (None, Environment::Dev) => (".dev.env", Some("variables.dev.json".into())),
            (None, Environment::Tst) => (".tst.env", Some("variables.tst.json".into())),
            (None, Environment::Default) => (".env", None),
        };
        let filter = match modules.filter(|m| !m.trim().is_empty()) {
            Some(expr) => ModuleFilter::parse(expr)?,
            None => ModuleFilter::default(),
        };
        let pattern = pattern.filter(|p| !p.is_empty());
        if pattern.is_some() && !filter.include.is_empty() {
            bail!("--pattern cannot be combined with module selections, only with 'not' terms");
        }
        Ok(Self {
            env_file: PathBuf::from(env_file),
            variables,
            filter,
            pattern,
        })
    }

    pub fn cargo_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "test",
            "--manifest-path",
            TESTS_MANIFEST,
            "--features",
            "e2e",
            "--",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        args.extend(self.filter.include.iter().cloned());
        args.extend(self.pattern.iter().cloned());
        for skip in &self.filter.skip {
            args.push("--skip".to_string());
            args.push(skip.clone());
        }
        args.push("--color=always".to_string());
        args
    }

    /// Environment for the test binary, which cargo runs from `tests/`.
    ///
    /// Paths are made absolute against `cwd`; `lookup` reads the current
    /// process environment, whose values win over the env file.
    pub fn child_env<F>(&self, cwd: &Path, lookup: F) -> anyhow::Result<Vec<(String, String)>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let absolute = |path: &Path| cwd.join(path).display().to_string();

        let mut envs = Vec::new();
        let env_file = cwd.join(&self.env_file);
        let mut output_dir = None;
        if env_file.exists() {
            for (key, value) in env_file::load(&env_file)? {
                if key == OUTPUT_DIR_VAR {
                    output_dir = Some(value);
                } else {
                    envs.push((key, value));
                }
            }
            envs.push((ENV_FILE_VAR.to_string(), env_file.display().to_string()));
        }
        if let Some(variables) = &self.variables {
            envs.push((VARIABLES_VAR.to_string(), absolute(variables.as_path())));
        }
        let output_dir = lookup(OUTPUT_DIR_VAR)
            .or(output_dir)
            .filter(|dir| !dir.is_empty())
            .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());
        envs.push((OUTPUT_DIR_VAR.to_string(), absolute(Path::new(&output_dir))));
        Ok(envs)
    }
}

async fn run(program: &str, args: &[String], envs: Vec<(String, String)>) -> anyhow::Result<()> {
    info!("Running: {} {}", program, args.join(" "));
    let status = Command::new(program)
        .args(args)
        .envs(envs)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .with_context(|| format!("failed to run {program}"))?;
    if !status.success() {
        bail!("{program} exited with {status}");
    }
    Ok(())
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn use_context(context: &str, dir: &Path) -> anyhow::Result<PathBuf> {
    let source = dir.join(format!(".{context}.env"));
    if !source.exists() {
        bail!(
            "Context does not exist. context={}, file={}",
            context,
            source.display()
        );
    }
    let target = dir.join(".env");
    std::fs::copy(&source, &target)?;
    println!(
        "The .env file was changed to use the {} context (source={})",
        context,
        source.display()
    );
    Ok(target)
}

async fn run_tests(plan: TestPlan) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("failed to read the working directory")?;
    let envs = plan.child_env(&cwd, |key| std::env::var(key).ok())?;
    run("cargo", &plan.cargo_args(), envs).await
}

pub async fn cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Lint => {
            run(
                "cargo",
                &args(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"]),
                vec![],
            )
            .await
        }
        Commands::Format => run("cargo", &args(&["fmt", "--all"]), vec![]).await,
        Commands::Build { name } => {
            run(
                "docker",
                &args(&[
                    "build",
                    "-t",
                    &name,
                    "-f",
                    "images/debian-systemd.dockerfile",
                    "images",
                ]),
                vec![],
            )
            .await
        }
        Commands::Usecontext { context } => use_context(&context, Path::new(".")).map(|_| ()),
        Commands::Test {
            testenv,
            devenv,
            variables,
            modules,
            pattern,
        } => {
            let environment = if devenv {
                Environment::Dev
            } else if testenv {
                Environment::Tst
            } else {
                Environment::Default
            };
            let plan = TestPlan::new(environment, variables, modules.as_deref(), pattern)?;
            run_tests(plan).await
        }
    }
}
