//! Core resolution algorithm: breadth-first discovery with constraint
//! precedence, strict coverage and permissive requirement conflicts.

use std::collections::{BTreeSet, HashMap, VecDeque};

use indexmap::IndexMap;
use petgraph::graph::NodeIndex;
use pinset_core::marker::MarkerEnvironment;
use pinset_core::requirement::Requirement;

use crate::conflict::{ConflictReason, ConflictReport, SpecifierConflict};
use crate::constraints::{ConstraintTable, Lookup};
use crate::error::ResolveError;
use crate::graph::{DependencyGraph, ResolvedPackage};
use crate::provider::{MetadataProvider, PackageMetadata, ProviderError, VersionRequest};

/// Knobs for one resolution run.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Resolve only the root requirements; do not follow dependencies.
    pub flat: bool,
    /// Re-query repeated requirements and fail if they select another version.
    pub allow_double: bool,
    /// Every discovered package must appear in the constraint table.
    pub strict_coverage: bool,
    /// Environment that requirement markers are evaluated against.
    pub environment: MarkerEnvironment,
}

/// The output of dependency resolution.
#[derive(Debug)]
pub struct Resolution {
    pub graph: DependencyGraph,
    pub conflicts: ConflictReport,
}

/// Entry in the BFS queue.
struct QueueEntry {
    requirement: Requirement,
    parent: Option<NodeIndex>,
}

/// A package that has been resolved during this run.
struct Visited {
    node: NodeIndex,
    /// Extras the package's dependencies have been expanded with.
    extras: BTreeSet<String>,
    dependencies: Vec<Requirement>,
}

/// Resolve `roots` into a dependency graph.
pub fn resolve<P: MetadataProvider + ?Sized>(
    roots: &[Requirement],
    constraints: &ConstraintTable,
    provider: &P,
    options: &ResolveOptions,
) -> Result<DependencyGraph, ResolveError> {
    resolve_with_report(roots, constraints, provider, options).map(|r| r.graph)
}

/// Resolve `roots`, also reporting the requirement specifiers that were
/// overridden by constraints or ignored because the package was already
/// resolved.
///
/// Discovery is breadth-first over a FIFO worklist, so a deterministic
/// provider yields a deterministic graph. The first failure aborts the run.
pub fn resolve_with_report<P: MetadataProvider + ?Sized>(
    roots: &[Requirement],
    constraints: &ConstraintTable,
    provider: &P,
    options: &ResolveOptions,
) -> Result<Resolution, ResolveError> {
    let env = &options.environment;
    let mut graph = DependencyGraph::new();
    let mut conflicts = ConflictReport::new();
    let mut visited: HashMap<String, Visited> = HashMap::new();
    // Normalized name -> first spelling seen.
    let mut uncovered: IndexMap<String, String> = IndexMap::new();
    let mut queue: VecDeque<QueueEntry> = VecDeque::new();

    let no_extras = BTreeSet::new();
    for req in roots {
        if !req.applies_to(env, &no_extras) {
            tracing::warn!("Ignoring {req}: markers don't match your environment");
            continue;
        }
        queue.push_back(QueueEntry {
            requirement: req.clone(),
            parent: None,
        });
    }

    while let Some(entry) = queue.pop_front() {
        let req = &entry.requirement;
        let key = req.key();

        let request = match constraints.lookup(key) {
            Lookup::Pinned(version) => {
                if !req.specifier.is_empty() && !req.specifier.contains(version) {
                    tracing::warn!("{req} overridden by constraint {}=={version}", req.name);
                    conflicts.add(SpecifierConflict {
                        name: req.name.to_string(),
                        requested: req.specifier.to_string(),
                        resolved: version.to_string(),
                        required_by: req.source.clone(),
                        reason: ConflictReason::ConstraintOverride,
                    });
                }
                VersionRequest::Pinned(version.clone())
            }
            Lookup::Absent if options.strict_coverage => {
                tracing::debug!("{} is not covered by the constraints", req.name);
                uncovered
                    .entry(key.to_string())
                    .or_insert_with(|| req.name.to_string());
                VersionRequest::Matching(req.specifier.clone())
            }
            Lookup::Unconstrained | Lookup::Absent => VersionRequest::Matching(req.specifier.clone()),
        };

        if let Some(seen) = visited.get_mut(key) {
            let node = seen.node;
            let existing = &graph.node(node).version;
            if options.allow_double {
                let metadata = fetch(provider, req, &request)?;
                if metadata.version != *existing {
                    return Err(ResolveError::VersionConflict {
                        name: graph.node(node).name.to_string(),
                        existing: existing.to_string(),
                        requested: metadata.version.to_string(),
                    });
                }
            } else if let VersionRequest::Matching(spec) = &request {
                if !spec.contains(existing) {
                    tracing::debug!("{req} ignored: {} already resolved", graph.node(node));
                    conflicts.add(SpecifierConflict {
                        name: req.name.to_string(),
                        requested: spec.to_string(),
                        resolved: existing.to_string(),
                        required_by: req.source.clone(),
                        reason: ConflictReason::AlreadyResolved,
                    });
                }
            }

            match entry.parent {
                Some(parent) => graph.add_edge(parent, node),
                None => graph.add_root(node),
            }

            if !options.flat && !req.extras.is_subset(&seen.extras) {
                let before = seen.extras.clone();
                seen.extras.extend(req.extras.iter().cloned());
                let source = graph.node(node).name.to_string();
                for dep in &seen.dependencies {
                    if dep.applies_to(env, &seen.extras) && !dep.applies_to(env, &before) {
                        queue.push_back(QueueEntry {
                            requirement: dep.clone().with_source(&source),
                            parent: Some(node),
                        });
                    }
                }
            }
            continue;
        }

        // Uncovered packages are still resolved so that their own dependencies
        // are checked in the same run; a failure there is reported as uncovered.
        let metadata = match fetch(provider, req, &request) {
            Ok(metadata) => metadata,
            Err(err) if uncovered.contains_key(key) => {
                tracing::debug!("{err}");
                continue;
            }
            Err(err) => return Err(err),
        };
        tracing::debug!("resolved {req} to {}", metadata.version);

        let node = graph.add_node(ResolvedPackage {
            name: req.name.clone(),
            version: metadata.version,
        });
        match entry.parent {
            Some(parent) => graph.add_edge(parent, node),
            None => graph.add_root(node),
        }

        if !options.flat {
            for dep in &metadata.dependencies {
                if dep.applies_to(env, &req.extras) {
                    queue.push_back(QueueEntry {
                        requirement: dep.clone().with_source(req.name.as_str()),
                        parent: Some(node),
                    });
                } else {
                    tracing::trace!("skipping {dep} of {}: markers don't match", req.name);
                }
            }
        }

        visited.insert(
            key.to_string(),
            Visited {
                node,
                extras: req.extras.clone(),
                dependencies: metadata.dependencies,
            },
        );
    }

    if !uncovered.is_empty() {
        return Err(ResolveError::UncoveredRequirement {
            names: uncovered.into_values().collect(),
        });
    }

    Ok(Resolution { graph, conflicts })
}

fn fetch<P: MetadataProvider + ?Sized>(
    provider: &P,
    req: &Requirement,
    request: &VersionRequest,
) -> Result<PackageMetadata, ResolveError> {
    provider.fetch(&req.name, request).map_err(|err| match err {
        ProviderError::NotFound { .. } => ResolveError::PackageNotFound {
            name: req.name.to_string(),
            request: request.to_string(),
            required_by: req.source.clone(),
        },
        other => ResolveError::Provider {
            name: req.name.to_string(),
            message: other.to_string(),
        },
    })
}
