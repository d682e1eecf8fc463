//! Packer HCL2 template handed to the external build tool.
//!
//! The block layout here is the contract with `packer`: the `version`
//! variable is overridden on the command line by the build invoker, and the
//! post-processor chain tags and pushes `<registry>/<service>`.

use crate::error::Result;
use crate::version::write_atomic;
use std::fmt::Write as _;
use std::path::Path;

pub const PLATFORM: &str = "linux/amd64";
pub const DOCKER_PLUGIN_VERSION: &str = ">= 1.0.8";
pub const DOCKER_PLUGIN_SOURCE: &str = "github.com/hashicorp/docker";
pub const LABELS: &[(&str, &str)] = &[("managed-by", "svc-publish"), ("os", "linux")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVars<'a> {
    pub service: &'a str,
    pub version: &'a str,
    pub base_image: &'a str,
    /// `<registry>/<service>`.
    pub repository: &'a str,
}

/// Quote `value` as an HCL string literal.
fn hcl_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn labels_map(indent: &str) -> String {
    let mut out = String::from("{\n");
    for (key, value) in LABELS {
        let _ = writeln!(out, "{indent}  {} = {}", hcl_str(key), hcl_str(value));
    }
    out.push_str(indent);
    out.push('}');
    out
}

pub fn render(vars: &TemplateVars<'_>) -> String {
    let service = hcl_str(vars.service);
    let description = hcl_str(&format!("Container image for {}", vars.service));
    let label_changes = LABELS
        .iter()
        .map(|(k, v)| hcl_str(&format!("LABEL {k}={v}")))
        .collect::<Vec<_>>()
        .join(",\n      ");

    format!(
        r#"packer {{
  required_plugins {{
    docker = {{
      version = {plugin_version}
      source  = {plugin_source}
    }}
  }}
}}

variable "version" {{
  type    = string
  default = {version}
}}

source "docker" {service} {{
  image    = {image}
  commit   = true
  platform = {platform}
  changes = [
      {label_changes}
  ]
}}

build {{
  name    = {service}
  sources = ["source.docker.{source_name}"]

  hcp_packer_registry {{
    bucket_name   = {service}
    description   = {description}
    bucket_labels = {labels}
  }}

  provisioner "file" {{
    source      = "./"
    destination = "/app"
  }}

  post-processors {{
    post-processor "docker-tag" {{
      repository = {repository}
      tags       = [var.version, "latest"]
    }}
    post-processor "docker-push" {{}}
  }}
}}
"#,
        plugin_version = hcl_str(DOCKER_PLUGIN_VERSION),
        plugin_source = hcl_str(DOCKER_PLUGIN_SOURCE),
        version = hcl_str(vars.version),
        service = service,
        source_name = vars.service,
        image = hcl_str(vars.base_image),
        platform = hcl_str(PLATFORM),
        label_changes = label_changes,
        description = description,
        labels = labels_map("    "),
        repository = hcl_str(vars.repository),
    )
}

/// Render and write the template, replacing whatever was there. The file is
/// either fully written or left as it was.
pub fn write(path: &Path, vars: &TemplateVars<'_>) -> Result<()> {
    write_atomic(path, render(vars).as_bytes())?;
    tracing::info!(path = %path.display(), "wrote build template");
    Ok(())
}
