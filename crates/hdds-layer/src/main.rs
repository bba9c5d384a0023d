// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS Stream Layering CLI
//!
//! Tooling for layering configuration files and descriptors.
//!
//! # Usage
//!
//! ```bash
//! # Write an example configuration
//! hdds-layer gen-config --output layer.toml
//!
//! # Check a configuration file
//! hdds-layer validate --config layer.toml
//!
//! # Show how a descriptor splits into layers
//! hdds-layer inspect "echo(mode=x),xlt,tcp,localhost,7400" --filter echo,xlt --config layer.toml
//! ```

use clap::{Parser, Subcommand};
use hdds_layer::{split_layers, LayerConfig, LayerError, Registry, SystemHost};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// HDDS Stream Layering
#[derive(Parser, Debug)]
#[command(name = "hdds-layer")]
#[command(about = "HDDS Stream Layering - filter stacks over streams and accepters")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "layer.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Split a descriptor into its layers
    Inspect {
        /// Descriptor, outermost layer first
        descriptor: String,

        /// Filter type names (comma-separated); the first other type is terminal
        #[arg(short, long, value_delimiter = ',')]
        filter: Vec<String>,

        /// Configuration file supplying default arguments and depth limit
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

impl Commands {
    fn config_path(&self) -> Option<&Path> {
        match self {
            Commands::GenConfig { .. } => None,
            Commands::Validate { config } => Some(config.as_path()),
            Commands::Inspect { config, .. } => config.as_deref(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let file_config = args
        .command
        .config_path()
        .and_then(|path| LayerConfig::from_file(path).ok());
    let level = log_level(args.log_level.as_deref(), file_config.as_ref());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match args.command {
        Commands::GenConfig { output } => cmd_gen_config(output),
        Commands::Validate { config } => cmd_validate(config),
        Commands::Inspect {
            descriptor,
            filter,
            config,
        } => cmd_inspect(&descriptor, &filter, config),
    }
}

/// Command line first, then the config file, then `info`.
fn log_level(cli: Option<&str>, config: Option<&LayerConfig>) -> String {
    cli.map(str::to_string)
        .or_else(|| config.map(|c| c.log_level.clone()))
        .unwrap_or_else(|| "info".to_string())
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = LayerConfig::example();
    let toml_str = toml::to_string_pretty(&config)?;

    let content = format!(
        r#"# HDDS Layer Configuration
# Generated by hdds-layer gen-config

{}
"#,
        toml_str
    );

    std::fs::write(&output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match LayerConfig::from_file(&config_path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("Name:      {}", config.name);
            println!("Max depth: {}", config.max_depth);
            println!("Log level: {}", config.log_level);
            println!("Defaults:  {}", config.defaults.len());
            for defaults in &config.defaults {
                println!("  {}({})", defaults.type_name, defaults.args.join(","));
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_inspect(
    descriptor: &str,
    filters: &[String],
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => LayerConfig::from_file(path)?,
        None => LayerConfig::default(),
    };

    match describe_layers(descriptor, filters, &config) {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Descriptor invalid: {}", e);
            std::process::exit(1);
        }
    }
}

/// One line per layer, with configured defaults merged into its arguments.
fn describe_layers(
    descriptor: &str,
    filters: &[String],
    config: &LayerConfig,
) -> Result<Vec<String>, LayerError> {
    let registry = Registry::with_config(Arc::new(SystemHost), config);
    let layers = split_layers(
        descriptor,
        |name| filters.iter().any(|f| f == name),
        registry.max_depth(),
    )?;

    let lines = layers
        .iter()
        .enumerate()
        .map(|(depth, head)| {
            let args = match registry.defaults_for(head.type_name) {
                Some(defaults) => head.args.with_defaults(defaults),
                None => head.args.clone(),
            };
            let is_terminal = depth + 1 == layers.len();
            match head.rest {
                Some(rest) if is_terminal => {
                    format!("  {:>2}: {}({}) {}", depth, head.type_name, args, rest)
                }
                _ => format!("  {:>2}: {}({})", depth, head.type_name, args),
            }
        })
        .collect();
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdds_layer::TypeDefaults;

    fn filters() -> Vec<String> {
        vec!["echo".to_string(), "xlt".to_string()]
    }

    #[test]
    fn test_describe_stops_at_terminal() {
        let mut config = LayerConfig::default();
        config.add_defaults(TypeDefaults::new("xlt", ["in=cr", "out=lf"]));

        let lines = describe_layers(
            "echo(mode=x),xlt(out=crlf),tcp,localhost,7400",
            &filters(),
            &config,
        )
        .expect("describe");

        assert_eq!(
            lines,
            vec![
                "   0: echo(mode=x)",
                "   1: xlt(in=cr,out=crlf)",
                "   2: tcp() localhost,7400",
            ]
        );
    }

    #[test]
    fn test_describe_depth_matches_registry() {
        let config = LayerConfig {
            max_depth: 2,
            ..Default::default()
        };

        let lines = describe_layers("echo(mode=x),tcp,localhost,7400", &filters(), &config)
            .expect("describe");
        assert_eq!(lines.len(), 2);

        let err = describe_layers("echo,xlt,tcp,localhost,7400", &filters(), &config).unwrap_err();
        assert!(matches!(err, LayerError::InvalidArgument(_)));
    }

    #[test]
    fn test_describe_without_filters() {
        let lines = describe_layers("tcp,localhost,7400", &[], &LayerConfig::default())
            .expect("describe");
        assert_eq!(lines, vec!["   0: tcp() localhost,7400"]);
    }

    #[test]
    fn test_log_level_precedence() {
        let config = LayerConfig {
            log_level: "debug".to_string(),
            ..Default::default()
        };

        assert_eq!(log_level(Some("trace"), Some(&config)), "trace");
        assert_eq!(log_level(None, Some(&config)), "debug");
        assert_eq!(log_level(None, None), "info");
    }
}
