//! Shared test utilities for the ecs-deploy workspace.
//!
//! Dev-dependency only. [`TestProject`] lays out a throwaway project
//! directory with a config document, dotenv files and task-definition
//! templates.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A config document with one `prod` stage exercising every feature of the
/// deploy section: build items, a task definition target and an env file.
pub const SAMPLE_CONFIG: &str = r#"
defaults: &defaults
  accountId: "111111111111"
  region: us-east-1
  clusterName: main-cluster

stages:
  prod:
    environment:
      LOG_LEVEL: info
    env_files:
      - .env.prod
    ecs-deploy:
      <<: *defaults
      serviceName: web-service
      build:
        - name: web
          repoName: svc
          dockerfile: Dockerfile
          platform: linux/amd64
          buildArgs:
            NODE_ENV: production
            REGION: ${AWS_REGION}
      taskDefinition:
        name: web
        taskFamily: web-family
        template: templates/web.json
        containerDefinitions:
          - name: app
            image: web
            environment:
              API_URL: https://api.example.com/${STAGE}
            secrets:
              DB_PASS: other/path
          - name: proxy
            image: nginx:1.25
"#;

/// Template matching [`SAMPLE_CONFIG`]
pub const SAMPLE_TEMPLATE: &str = r#"{
  "family": "template-family",
  "cpu": "256",
  "memory": "512",
  "networkMode": "awsvpc",
  "containerDefinitions": [
    {
      "name": "app",
      "image": "placeholder",
      "essential": true,
      "portMappings": [{ "containerPort": 8080, "protocol": "tcp" }],
      "environment": [
        { "name": "REGION_HINT", "value": "${AWS_REGION}" },
        { "name": "LOG_FORMAT", "value": "json" }
      ],
      "secrets": [
        { "name": "DB_PASS", "valueFrom": "arn:aws:ssm:::parameter/db" },
        { "name": "API_KEY", "valueFrom": "/shared/api-key" }
      ]
    },
    {
      "name": "proxy",
      "image": "nginx:latest",
      "essential": false
    }
  ]
}"#;

/// A temporary project directory
pub struct TestProject {
    temp_dir: TempDir,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    /// Create an empty temporary project.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// A project populated with [`SAMPLE_CONFIG`], its env file and
    /// [`SAMPLE_TEMPLATE`].
    pub fn sample() -> Self {
        let project = Self::new();
        project.write_config(SAMPLE_CONFIG);
        project.write_file(".env.prod", "LOG_LEVEL=debug\nDOCKER_BUILDKIT=1\n");
        project.write_file("templates/web.json", SAMPLE_TEMPLATE);
        project
    }

    /// Root path of the project.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `relative` inside the project.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write `config.yaml`.
    pub fn write_config(&self, yaml: &str) {
        self.write_file("config.yaml", yaml);
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("could not write {}: {e}", path.display()));
    }
}
