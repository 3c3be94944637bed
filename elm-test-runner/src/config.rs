// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for elm-test-explorer.
//!
//! The default config is embedded in the binary. A repository can layer its own settings on top
//! of it through `.config/elm-test-explorer.toml` at the workspace root, or through an explicitly
//! specified file.

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind},
    runner::PromotionPolicy,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Configuration for elm-test-explorer, resolved for a single workspace.
#[derive(Clone, Debug)]
pub struct ExplorerConfig {
    workspace_root: Utf8PathBuf,
    paths: PathsConfig,
    binaries: BinariesConfig,
    run: RunConfig,
}

impl ExplorerConfig {
    /// The path, relative to the workspace root, that repository config is read from.
    pub const CONFIG_PATH: &'static str = ".config/elm-test-explorer.toml";

    /// The default config, as a TOML file.
    ///
    /// Repository config is layered on top of it.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config for the workspace at `workspace_root`.
    ///
    /// If `config_file` is specified, it must exist. Otherwise, [`Self::CONFIG_PATH`] is read if
    /// it exists, and the default config is used if it doesn't.
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();
        let repo_file = match config_file {
            Some(file) => Some(file.to_owned()),
            None => {
                let default_file = workspace_root.join(Self::CONFIG_PATH);
                default_file.is_file().then_some(default_file)
            }
        };

        let mut builder = Self::make_default_config();
        let error_file = match &repo_file {
            Some(file) => {
                debug!("config: reading repository config from {file}");
                let contents = std::fs::read_to_string(file).map_err(|error| {
                    ConfigParseError::new(file.clone(), ConfigParseErrorKind::Read(error))
                })?;
                builder = builder.add_source(File::from_str(&contents, FileFormat::Toml));
                file.clone()
            }
            None => {
                debug!("config: no repository config found, using defaults");
                Utf8PathBuf::from("<default config>")
            }
        };

        let (deserialized, unknown) = Self::build_and_deserialize_config(builder)
            .map_err(|kind| ConfigParseError::new(error_file.clone(), kind))?;
        if !unknown.is_empty() {
            warn_unknown_keys(&error_file, &unknown);
        }

        Ok(Self::from_deserialized(workspace_root, deserialized))
    }

    /// Returns the default config for the workspace at `workspace_root`, ignoring any config
    /// files.
    pub fn default_config(workspace_root: impl Into<Utf8PathBuf>) -> Self {
        let (deserialized, _) = Self::build_and_deserialize_config(Self::make_default_config())
            .expect("embedded default config is valid");
        Self::from_deserialized(workspace_root.into(), deserialized)
    }

    /// Returns the workspace root.
    pub fn workspace_root(&self) -> &Utf8Path {
        &self.workspace_root
    }

    /// Returns the absolute directory test modules are read from.
    pub fn tests_dir(&self) -> Utf8PathBuf {
        self.workspace_root.join(&self.paths.tests_dir)
    }

    /// Maps a dotted module name to the source file that defines it.
    ///
    /// For example, with the default config, `Parser.Expr` maps to
    /// `<workspace-root>/tests/Parser/Expr.elm`.
    pub fn source_path_for_module(&self, module: &str) -> Utf8PathBuf {
        let mut path = self.tests_dir();
        for component in module.split('.') {
            path.push(component);
        }
        path.set_extension(&self.paths.extension);
        path
    }

    /// Returns the configured binaries.
    pub fn binaries(&self) -> &BinariesConfig {
        &self.binaries
    }

    /// Returns the policy used to promote a finished tree to the loaded tree.
    pub fn promotion(&self) -> PromotionPolicy {
        self.run.promotion
    }

    /// Overrides the promotion policy.
    pub fn set_promotion(&mut self, promotion: PromotionPolicy) {
        self.run.promotion = promotion;
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<(DeserializedConfig, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build()
            .map_err(|error| ConfigParseErrorKind::Build(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let deserialized: DeserializedConfig =
            serde_ignored::deserialize(config, |path: serde_ignored::Path| {
                ignored.insert(path.to_string());
            })
            .map_err(|error| ConfigParseErrorKind::Build(Box::new(error)))?;

        Ok((deserialized, ignored))
    }

    fn from_deserialized(workspace_root: Utf8PathBuf, deserialized: DeserializedConfig) -> Self {
        Self {
            workspace_root,
            paths: deserialized.paths,
            binaries: deserialized.binaries,
            run: deserialized.run,
        }
    }
}

fn warn_unknown_keys(config_file: &Utf8Path, unknown: &BTreeSet<String>) {
    let mut unknown_str = String::new();
    if unknown.len() == 1 {
        // Print this on the same line.
        unknown_str.push_str("key: ");
        unknown_str.extend(unknown.iter().map(String::as_str));
    } else {
        unknown_str.push_str("keys:\n");
        for ignored_key in unknown {
            unknown_str.push_str("\n  - ");
            unknown_str.push_str(ignored_key);
        }
    }

    warn!("in config file {config_file}, ignoring unknown configuration {unknown_str}");
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedConfig {
    paths: PathsConfig,
    binaries: BinariesConfig,
    run: RunConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PathsConfig {
    tests_dir: Utf8PathBuf,
    extension: String,
}

/// The binaries used to run tests, as configured.
///
/// Names are resolved to paths by [`ElmBinaries::locate`](crate::test_command::ElmBinaries::locate).
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BinariesConfig {
    /// The elm-test binary.
    pub elm_test: String,

    /// The Elm compiler.
    pub elm: String,

    /// The constraint solver, if any.
    #[serde(default)]
    pub elm_json: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RunConfig {
    promotion: PromotionPolicy,
}
