use anyhow::Result;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use serde_json::Value;
use tokio::process::Command;

use crate::common::*;

const PLAN: &str = r#"{
  "Type": "Serial",
  "Data": [
    { "Type": "Stack", "Data": { "Input": { "Action": "Create", "StackName": "ingestion" } } },
    { "Type": "Parallel", "MaxConcurrency": 2, "Data": [
      { "Type": "Stack", "Data": { "Input": { "Action": "Create", "StackName": "etl" } } },
      { "Type": "Stack", "Data": { "Input": { "Action": "Create", "StackName": "metrics" } } },
      { "Type": "Pass" }
    ] },
    { "Type": "Stack", "Data": { "Input": { "Action": "Create", "StackName": "report" } } }
  ]
}"#;

/// Temp workspace with a plan file and an isolated config directory
struct CliEnvironment {
    dir: TempDir,
}

impl CliEnvironment {
    fn new(plan: &str) -> Result<Self> {
        let dir = TempDir::new()?;
        dir.child("plan.json").write_str(plan)?;
        dir.child("config").create_dir_all()?;
        Ok(Self { dir })
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        let output = Command::new(orchestrator_binary())
            .args(args)
            .current_dir(self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.child("config").path())
            .env("RUST_LOG", "off")
            .output()
            .await?;
        Ok(output)
    }
}

#[tokio::test]
async fn test_validate_reports_shape() -> Result<()> {
    let env = CliEnvironment::new(PLAN)?;

    let output = env.run(&["validate", "plan.json"]).await?;

    assert!(output.status.success(), "{}", stderr_to_string(&output));
    let stdout = output_to_string(&output);
    assert!(predicate::str::contains("actions: 4").eval(&stdout));
    assert!(predicate::str::contains("depth:   3").eval(&stdout));
    Ok(())
}

#[tokio::test]
async fn test_validate_rejects_unknown_type() -> Result<()> {
    let env = CliEnvironment::new(r#"{ "Type": "Serial", "Data": [{ "Type": "Lambda" }] }"#)?;

    let output = env.run(&["validate", "plan.json"]).await?;

    assert!(!output.status.success());
    assert!(predicate::str::contains("$.Data[0]").eval(&stderr_to_string(&output)));
    Ok(())
}

#[tokio::test]
async fn test_run_dry_run_succeeds() -> Result<()> {
    let env = CliEnvironment::new(PLAN)?;

    let output = env.run(&["run", "plan.json", "--delay-ms", "5", "--json"]).await?;

    assert!(output.status.success(), "{}", stderr_to_string(&output));
    let result: Value = serde_json::from_str(&output_to_string(&output))?;
    assert_eq!(result["status"], "succeeded");
    assert_eq!(result["children"].as_array().map(Vec::len), Some(3));
    Ok(())
}

#[tokio::test]
async fn test_run_with_failure_exits_nonzero() -> Result<()> {
    let env = CliEnvironment::new(PLAN)?;

    let output = env
        .run(&["run", "plan.json", "--delay-ms", "5", "--fail", "etl"])
        .await?;

    assert_eq!(output.status.code(), Some(1));
    let stdout = output_to_string(&output);
    assert!(predicate::str::contains("etl: simulated failure for stack etl").eval(&stdout));
    assert!(predicate::str::contains("report").not().eval(&stdout));
    Ok(())
}

#[tokio::test]
async fn test_config_update_is_persisted() -> Result<()> {
    let env = CliEnvironment::new(PLAN)?;

    let output = env.run(&["config", "--max-concurrency", "7"]).await?;
    assert!(output.status.success(), "{}", stderr_to_string(&output));

    env.dir
        .child("config/stack-orchestrator/config.toml")
        .assert(predicate::str::contains("default_max_concurrency = 7"));

    let output = env.run(&["config", "--show"]).await?;
    assert!(predicate::str::contains("execution_timeout_secs = 3600").eval(&output_to_string(&output)));
    Ok(())
}
