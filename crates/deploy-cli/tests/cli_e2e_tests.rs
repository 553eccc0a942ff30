//! End-to-end tests that invoke the compiled `ecs-deploy` binary.
//!
//! The child environment is cleared so stage selection only comes from the
//! arguments and variables each test sets.

use assert_cmd::Command;
use deploy_test_utils::TestProject;
use predicates::prelude::*;
use tempfile::TempDir;

fn ecs_deploy(project: &std::path::Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ecs-deploy"));
    cmd.env_clear().current_dir(project);
    cmd
}

// ============================================================================
// Help and completions
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    ecs_deploy(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build-env"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_completions_bash() {
    let temp = TempDir::new().unwrap();
    ecs_deploy(temp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ecs-deploy"));
}

// ============================================================================
// build-env
// ============================================================================

#[test]
fn test_build_env_container() {
    let project = TestProject::sample();
    ecs_deploy(project.root())
        .args(["build-env", "--stage", "prod", "--release", "abc123", "--container", "web"])
        .arg("--pwd")
        .arg(project.root())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("DOCKER_BUILDKIT=1\nIMAGE_TAG=abc123\n"))
        .stdout(predicate::str::contains(
            "IMAGE_URL=111111111111.dkr.ecr.us-east-1.amazonaws.com/svc:abc123\n",
        ))
        .stdout(predicate::str::contains("ECS_DEPLOY_DOCKER_ARGS_REGION=us-east-1\n"))
        .stdout(predicate::str::contains("ECS_TASK_DEFINITION").not());
}

#[test]
fn test_build_env_from_environment_variables() {
    let project = TestProject::sample();
    ecs_deploy(project.root())
        .env("PWD", project.root())
        .env("STAGE", "prod")
        .env("RELEASE", "r42")
        .env("CONTAINER", "web")
        .env("TARGET", "web")
        .env("VERSION", "3.1.0")
        .arg("build-env")
        .assert()
        .success()
        .stdout(predicate::str::contains("IMAGE_TAG=r42\n"))
        .stdout(predicate::str::contains("ECS_TASK_FAMILY=web-family\n"))
        .stdout(predicate::str::contains("ECS_SERVICE_NAME=web-service\n"))
        .stdout(predicate::str::contains("ECS_CLUSTER_NAME=main-cluster\n"))
        .stdout(predicate::str::contains(
            r#"{\"name\":\"VERSION\",\"value\":\"3.1.0\"}"#,
        ));
}

#[test]
fn test_build_env_unknown_stage() {
    let project = TestProject::sample();
    ecs_deploy(project.root())
        .args(["build-env", "--stage", "dev", "--release", "abc123", "--container", "web"])
        .arg("--pwd")
        .arg(project.root())
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("error"))
        .stderr(predicate::str::contains("Stage \"dev\" not found"));
}

#[test]
fn test_build_env_unknown_target() {
    let project = TestProject::sample();
    ecs_deploy(project.root())
        .args(["build-env", "-s", "prod", "-r", "abc123", "-c", "web", "-t", "api"])
        .arg("--pwd")
        .arg(project.root())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task definition not found for target api"));
}

#[test]
fn test_build_env_requires_release() {
    let project = TestProject::sample();
    ecs_deploy(project.root())
        .args(["build-env", "--stage", "prod"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--release"));
}

#[test]
fn test_build_env_missing_config() {
    let temp = TempDir::new().unwrap();
    ecs_deploy(temp.path())
        .args(["build-env", "--stage", "prod", "--release", "abc123"])
        .arg("--pwd")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Couldn't find configuration file"));
}

#[test]
fn test_verbose_logs_stay_off_stdout() {
    let project = TestProject::sample();
    ecs_deploy(project.root())
        .args(["build-env", "--stage", "prod", "--release", "abc123", "--container", "web", "--verbose"])
        .arg("--pwd")
        .arg(project.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("DEBUG").not())
        .stderr(predicate::str::contains("DEBUG"));
}

#[test]
fn test_verbose_from_environment() {
    let project = TestProject::sample();
    ecs_deploy(project.root())
        .env("VERBOSE", "1")
        .args(["build-env", "--stage", "prod", "--release", "abc123", "--container", "web"])
        .arg("--pwd")
        .arg(project.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("DEBUG").not())
        .stderr(predicate::str::contains("DEBUG"));
}

// ============================================================================
// config
// ============================================================================

#[test]
fn test_config_json() {
    let project = TestProject::sample();
    let output = ecs_deploy(project.root())
        .args(["config", "--stage", "prod", "--json"])
        .arg("--pwd")
        .arg(project.root())
        .output()
        .unwrap();
    assert!(output.status.success());

    let tree: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tree["ecs-deploy"]["serviceName"], "web-service");
    assert_eq!(tree["ecs-deploy"]["accountId"], "111111111111");
}

#[test]
fn test_config_env_override() {
    let project = TestProject::sample();
    ecs_deploy(project.root())
        .env("app__ecs-deploy__serviceName", "override")
        .args(["config", "--stage", "prod"])
        .arg("--pwd")
        .arg(project.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("serviceName: override"));
}

#[test]
fn test_config_file_option() {
    let project = TestProject::new();
    project.write_file("deploy.yaml", "stages:\n  dev:\n    region: eu-west-1\n");
    ecs_deploy(project.root())
        .args(["config", "--stage", "dev", "--config-file", "deploy.yaml"])
        .arg("--pwd")
        .arg(project.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("region: eu-west-1"));
}
