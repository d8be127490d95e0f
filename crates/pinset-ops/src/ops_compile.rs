//! Operation: compile requirements into a pinned list and a dependency map.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pinset_core::config::GlobalConfig;
use pinset_core::constraint::Constraint;
use pinset_core::marker::MarkerEnvironment;
use pinset_core::reqfile::RequirementsFile;
use pinset_core::requirement::Requirement;
use pinset_index::{HttpCache, LocalIndex, PypiProvider};
use pinset_resolver::provider::CachedProvider;
use pinset_resolver::{
    resolve_with_report, ConstraintTable, MetadataProvider, Resolution, ResolveError, ResolveOptions,
};
use pinset_util::errors::{PinsetError, PinsetResult};
use pinset_util::progress::{spinner, status, status_warn};

use crate::output;

/// Options for `pinset compile`.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Inline requirement specifiers.
    pub requirements: Vec<String>,
    /// Requirements files (`-r`).
    pub requirement_files: Vec<PathBuf>,
    /// Constraints files (`-c`); supplying any enables strict coverage.
    pub constraint_files: Vec<PathBuf>,
    /// Do not follow dependencies of the requirements.
    pub flat: bool,
    /// Allow the same package to be requested more than once.
    pub allow_double: bool,
    /// Where to write the pinned list (`-` for stdout).
    pub output: Option<PathBuf>,
    /// Where to write the JSON dependency map (`-` for stdout).
    pub json_output: Option<PathBuf>,
    /// Resolve against a local TOML index instead of PyPI.
    pub index: Option<PathBuf>,
    /// PyPI JSON API base URL; overrides the configured one.
    pub index_url: Option<String>,
    /// Allow pre-releases.
    pub pre: bool,
    /// Bypass the on-disk response cache.
    pub no_cache: bool,
    /// Python version (`X.Y`) used when evaluating markers.
    pub python_version: Option<String>,
}

/// Everything read from the command line and the input files.
#[derive(Debug, Default)]
pub struct CompileInputs {
    pub requirements: Vec<Requirement>,
    pub constraints: Vec<Requirement>,
}

/// Resolve the requirements described by `opts` and write the outputs.
pub fn compile(opts: &CompileOptions, config: &GlobalConfig) -> PinsetResult<Resolution> {
    validate(opts)?;

    let inputs = load_inputs(opts)?;
    let environment = marker_environment(opts, config);
    let constraints = build_constraint_table(&inputs.constraints, &environment, opts.allow_double)?;

    let resolve_opts = ResolveOptions {
        flat: opts.flat,
        allow_double: opts.allow_double,
        strict_coverage: !opts.constraint_files.is_empty() || !inputs.constraints.is_empty(),
        environment,
    };

    let pre = opts.pre || config.resolve.pre;
    let (provider, source) = build_provider(opts, config, pre)?;
    let provider = CachedProvider::new(provider);

    status(
        "Resolving",
        &format!("{} requirement(s) against {source}", inputs.requirements.len()),
    );
    let sp = opts.index.is_none().then(|| spinner("Fetching package metadata..."));
    let result = resolve_with_report(&inputs.requirements, &constraints, &provider, &resolve_opts);
    if let Some(sp) = sp {
        sp.finish_and_clear();
    }
    let resolution = result.map_err(resolution_error)?;

    for conflict in resolution.conflicts.iter() {
        tracing::info!("{conflict}");
    }
    if !resolution.conflicts.is_empty() {
        status_warn(
            "Ignored",
            &format!(
                "{} requirement specifier(s) set aside (run with -v for details)",
                resolution.conflicts.len()
            ),
        );
    }
    status(
        "Resolved",
        &format!("{} package(s)", resolution.graph.len()),
    );

    write_outputs(opts, &resolution)?;
    Ok(resolution)
}

/// Reject option combinations that cannot be honoured.
pub fn validate(opts: &CompileOptions) -> PinsetResult<()> {
    if opts.allow_double && opts.constraint_files.is_empty() {
        return Err(PinsetError::Config {
            message: "--allow-double requires at least one constraints file (-c)".to_string(),
        }
        .into());
    }
    Ok(())
}

/// Parse inline requirements and read every requirements and constraints file.
pub fn load_inputs(opts: &CompileOptions) -> PinsetResult<CompileInputs> {
    let mut inputs = CompileInputs::default();

    for spec in &opts.requirements {
        inputs.requirements.push(Requirement::parse(spec).map_err(parse_error)?);
    }
    for path in &opts.requirement_files {
        let file = RequirementsFile::from_path(path).map_err(parse_error)?;
        inputs.requirements.extend(file.requirements);
        inputs.constraints.extend(file.constraints);
    }
    for path in &opts.constraint_files {
        let file = RequirementsFile::constraints_from_path(path).map_err(parse_error)?;
        inputs.constraints.extend(file.constraints);
    }

    if inputs.requirements.is_empty() {
        return Err(PinsetError::Config {
            message: "no requirements given; pass requirement specifiers or -r FILE".to_string(),
        }
        .into());
    }
    tracing::debug!(
        "{} requirement(s), {} constraint(s)",
        inputs.requirements.len(),
        inputs.constraints.len()
    );
    Ok(inputs)
}

/// The marker environment from config, with the command-line python version on top.
pub fn marker_environment(opts: &CompileOptions, config: &GlobalConfig) -> MarkerEnvironment {
    let env = config.environment.to_marker_environment();
    match &opts.python_version {
        Some(version) => env.with_python_version(version),
        None => env,
    }
}

/// Turn constraints-file entries into the constraint table. Entries whose
/// marker does not match `environment` are dropped.
pub fn build_constraint_table(
    entries: &[Requirement],
    environment: &MarkerEnvironment,
    allow_double: bool,
) -> PinsetResult<ConstraintTable> {
    let no_extras = BTreeSet::new();
    let mut constraints = Vec::with_capacity(entries.len());
    for entry in entries {
        if !entry.applies_to(environment, &no_extras) {
            tracing::warn!("Ignoring constraint {entry}: markers don't match your environment");
            continue;
        }
        constraints.push(Constraint::from_requirement(entry).map_err(parse_error)?);
    }
    ConstraintTable::load(constraints, allow_double).map_err(|e| resolution_error(e).into())
}

fn build_provider(
    opts: &CompileOptions,
    config: &GlobalConfig,
    pre: bool,
) -> PinsetResult<(Box<dyn MetadataProvider>, String)> {
    if let Some(path) = &opts.index {
        let index = LocalIndex::load(path).map_err(parse_error)?.allow_prereleases(pre);
        return Ok((Box::new(index), path.display().to_string()));
    }

    let url = opts.index_url.as_deref().unwrap_or(&config.index.url);
    let cache = if opts.no_cache || !config.cache.enabled {
        HttpCache::disabled()
    } else {
        HttpCache::new(config.cache.resolved_dir().join("http"))
    };
    let timeout = Duration::from_secs(config.index.timeout_secs);
    let pypi = PypiProvider::new(url, cache, timeout)
        .map_err(|e| PinsetError::Network {
            message: e.to_string(),
        })?
        .with_listing_ttl(Duration::from_secs(config.cache.listing_ttl_secs))
        .allow_prereleases(pre);
    Ok((Box::new(pypi), url.to_string()))
}

/// Failures that come from talking to the index are network errors; every
/// other resolution failure is reported as such.
fn resolution_error(err: ResolveError) -> PinsetError {
    match err {
        ResolveError::Provider { .. } => PinsetError::Network {
            message: err.to_string(),
        },
        other => PinsetError::Resolution {
            message: other.to_string(),
        },
    }
}

fn parse_error(err: impl std::fmt::Display) -> PinsetError {
    PinsetError::Parse {
        message: err.to_string(),
    }
}

fn write_outputs(opts: &CompileOptions, resolution: &Resolution) -> PinsetResult<()> {
    if opts.output.is_none() && opts.json_output.is_none() {
        return output::write_output(Path::new("-"), &output::render_flat(&resolution.graph));
    }
    if let Some(path) = &opts.output {
        announce(path);
        output::write_output(path, &output::render_flat(&resolution.graph))?;
    }
    if let Some(path) = &opts.json_output {
        announce(path);
        output::write_output(path, &output::render_json(&resolution.graph)?)?;
    }
    Ok(())
}

fn announce(path: &Path) {
    if !output::is_stdout(path) {
        status("Writing", &path.display().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_double_needs_constraints() {
        let opts = CompileOptions {
            requirements: vec!["Flask".to_string()],
            allow_double: true,
            ..Default::default()
        };
        let err = validate(&opts).unwrap_err();
        assert!(err.to_string().contains("--allow-double"));

        let opts = CompileOptions {
            constraint_files: vec![PathBuf::from("constraints.txt")],
            ..opts
        };
        assert!(validate(&opts).is_ok());
    }

    #[test]
    fn empty_requirements_are_rejected() {
        let err = load_inputs(&CompileOptions::default()).unwrap_err();
        assert!(err.to_string().contains("no requirements given"));
    }

    #[test]
    fn python_version_flag_beats_config() {
        let mut config = GlobalConfig::default();
        config.environment.python_version = Some("3.8".to_string());
        let opts = CompileOptions {
            python_version: Some("3.11".to_string()),
            ..Default::default()
        };
        assert_eq!(marker_environment(&opts, &config).python_version, "3.11");
        assert_eq!(
            marker_environment(&CompileOptions::default(), &config).python_version,
            "3.8"
        );
    }

    #[test]
    fn constraint_markers_are_evaluated() {
        let entries: Vec<Requirement> = ["pywin32==306; sys_platform == 'win32'", "six==1.10.0"]
            .iter()
            .map(|l| Requirement::parse(l).unwrap())
            .collect();
        let mut env = MarkerEnvironment::default();
        env.sys_platform = "linux".to_string();
        let table = build_constraint_table(&entries, &env, false).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.contains("six"));
    }

    #[test]
    fn provider_failures_are_network_errors() {
        let err = resolution_error(ResolveError::Provider {
            name: "Flask".to_string(),
            message: "connection refused".to_string(),
        });
        assert!(matches!(err, PinsetError::Network { .. }));
        assert!(err.to_string().contains("connection refused"));

        let err = resolution_error(ResolveError::UncoveredRequirement {
            names: vec!["click".to_string()],
        });
        assert!(matches!(err, PinsetError::Resolution { .. }));
        assert!(err.to_string().contains("click"));
    }

    #[test]
    fn range_constraints_are_rejected() {
        let entries = vec![Requirement::parse("Flask>=0.11").unwrap()];
        let err = build_constraint_table(&entries, &MarkerEnvironment::default(), false).unwrap_err();
        assert!(err.to_string().contains("exact version"));
    }
}
