use crate::manifest::Manifest;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::source::load_models;
use crate::spec_builder::{build_swagger, Config};
use crate::swagger::{Info, Swagger, Tag};
use crate::route::WebService;
use crate::type_resolver::TypeResolver;
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_API_VERSION: &str = "1.0.0";

/// Generate a Swagger 2.0 document from a service manifest and Rust model types
#[derive(Parser, Debug)]
#[command(name = "swagger-from-routes")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Service manifest (YAML, or JSON when the extension is .json)
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Directory of Rust sources declaring the model structs
    #[arg(short = 'm', long = "models", value_name = "MODELS_DIR")]
    pub models_dir: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Title written to the info object
    #[arg(short = 't', long = "title", default_value = "API")]
    pub title: String,

    /// Version written to the info object [default: first service version, else 1.0.0]
    #[arg(long = "api-version")]
    pub api_version: Option<String>,

    /// Content types used by operations that declare none
    #[arg(long = "default-content-type", value_name = "MIME")]
    pub default_content_types: Vec<String>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Validate and log already-parsed arguments
pub fn validate_args(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.manifest.is_file() {
        bail!("Manifest does not exist: {}", args.manifest.display());
    }
    if let Some(dir) = &args.models_dir {
        if !dir.is_dir() {
            bail!("Models path is not a directory: {}", dir.display());
        }
    }

    info!("Manifest: {}", args.manifest.display());
    match &args.models_dir {
        Some(dir) => info!("Models: {}", dir.display()),
        None => info!("Models: none"),
    }
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }
    Ok(args)
}

/// Tag describing a documented service, named after its root path
fn service_tag(service: &WebService) -> Option<Tag> {
    let name = service.root_path().trim_matches('/');
    let doc = service.documentation();
    if name.is_empty() || doc.is_empty() {
        return None;
    }
    Some(Tag {
        name: name.to_string(),
        description: Some(doc.to_string()),
    })
}

/// Build the document described by the arguments and render it
pub fn generate(args: &CliArgs) -> Result<String> {
    let types = match &args.models_dir {
        Some(dir) => load_models(dir)?,
        None => TypeResolver::default(),
    };

    let services = Manifest::from_path(&args.manifest)?.into_services(&types)?;
    info!("Declared {} services", services.len());

    let title = args.title.clone();
    let version = args
        .api_version
        .clone()
        .or_else(|| {
            services
                .iter()
                .map(|service| service.version())
                .find(|version| !version.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
    let tags: Vec<Tag> = services.iter().filter_map(service_tag).collect();
    let mime_types: Vec<&str> = args.default_content_types.iter().map(String::as_str).collect();
    let mut config = Config::new(types.into_registry())
        .with_default_content_types(&mime_types)
        .with_post_build_handler(Arc::new(move |swagger: &mut Swagger| {
            let info = swagger.info.get_or_insert_with(Info::default);
            info.title = title.clone();
            info.version = version.clone();
            for tag in &tags {
                if !swagger.tags.iter().any(|existing| existing.name == tag.name) {
                    swagger.tags.push(tag.clone());
                }
            }
        }));
    for service in services {
        config = config.service(service);
    }

    let document = build_swagger(&config).context("Failed to build Swagger document")?;

    match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document),
        OutputFormat::Json => serialize_json(&document),
    }
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    let content = generate(&args)?;

    if let Some(output_path) = &args.output_path {
        write_to_file(&content, output_path)?;
        info!("Wrote Swagger document to {}", output_path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_arguments() {
        let args = CliArgs::try_parse_from([
            "swagger-from-routes",
            "api.yaml",
            "-m",
            "src/models",
            "-f",
            "json",
            "-t",
            "Pets",
            "--api-version",
            "2.1",
            "--default-content-type",
            "application/json",
        ])
        .unwrap();
        assert_eq!(args.manifest, PathBuf::from("api.yaml"));
        assert_eq!(args.models_dir, Some(PathBuf::from("src/models")));
        assert_eq!(args.output_format, OutputFormat::Json);
        assert_eq!(args.title, "Pets");
        assert_eq!(args.api_version.as_deref(), Some("2.1"));
        assert_eq!(args.default_content_types, vec!["application/json".to_string()]);
        assert!(!args.verbose);
    }

    #[test]
    fn test_validate_rejects_missing_manifest() {
        let args = CliArgs::try_parse_from(["swagger-from-routes", "/nonexistent/api.yaml"]).unwrap();
        let err = validate_args(args).unwrap_err();
        assert!(err.to_string().contains("Manifest does not exist"));
    }

    #[test]
    fn test_generate_applies_title_and_version() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = temp_dir.path().join("api.yaml");
        fs::write(
            &manifest,
            "services:\n  - root: /ping\n    routes:\n      - method: GET\n",
        )
        .unwrap();

        let args = CliArgs::try_parse_from([
            "swagger-from-routes",
            manifest.to_str().unwrap(),
            "-f",
            "json",
            "-t",
            "Ping",
        ])
        .unwrap();
        let json = generate(&args).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["info"]["title"], "Ping");
        assert_eq!(value["info"]["version"], "1.0.0");
        assert_eq!(value["paths"]["/ping"]["get"]["responses"]["200"]["description"], "OK");
    }

    #[test]
    fn test_service_doc_and_version_reach_the_document() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = temp_dir.path().join("api.yaml");
        fs::write(
            &manifest,
            "services:\n  - root: /pets\n    doc: Pets in the store\n    version: \"2.4\"\n    routes:\n      - method: GET\n",
        )
        .unwrap();

        let args = CliArgs::try_parse_from([
            "swagger-from-routes",
            manifest.to_str().unwrap(),
            "-f",
            "json",
        ])
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&generate(&args).unwrap()).unwrap();
        assert_eq!(value["info"]["version"], "2.4");
        assert_eq!(
            value["tags"],
            serde_json::json!([{"name": "pets", "description": "Pets in the store"}])
        );

        let args = CliArgs::try_parse_from([
            "swagger-from-routes",
            manifest.to_str().unwrap(),
            "-f",
            "json",
            "--api-version",
            "9.0",
        ])
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&generate(&args).unwrap()).unwrap();
        assert_eq!(value["info"]["version"], "9.0");
    }
}
