//! Resolve command

use anyhow::{bail, Result};
use kiln::catalog::Catalogs;
use kiln::project::Project;
use kiln::resolver::{
    ConstraintInput, DependencyRequest, ResolveOptions, ResolveOutcome, SolverOptions,
};
use kiln::types::PackageName;

/// Parse a package spec like `jq` or `jq@^1.7`
fn parse_spec(spec: &str) -> Result<DependencyRequest> {
    if let Some((name, requirement)) = spec.split_once('@') {
        if name.is_empty() {
            bail!("Invalid package spec: missing package name");
        }
        if requirement.is_empty() {
            bail!("Invalid package spec: missing requirement after @");
        }
        Ok(DependencyRequest {
            name: PackageName::new(name),
            constraint: Some(requirement.to_string()),
            weak: false,
        })
    } else {
        Ok(DependencyRequest {
            name: PackageName::new(spec),
            constraint: None,
            weak: false,
        })
    }
}

/// Resolve package constraints to a consistent version set
pub fn resolve(
    catalogs: &Catalogs,
    specs: &[String],
    ignore_project: bool,
    pin: bool,
) -> Result<()> {
    let entries = specs
        .iter()
        .map(|s| parse_spec(s))
        .collect::<Result<Vec<_>>>()?;
    let input = ConstraintInput::List(entries);

    let outcome = catalogs.complete.resolve_constraints(
        &input,
        SolverOptions::default(),
        &ResolveOptions {
            ignore_project_deps: ignore_project,
        },
    )?;

    let solution = match outcome {
        ResolveOutcome::SolverUnavailable => {
            bail!("Constraint solver not available; run 'kiln refresh' first")
        }
        ResolveOutcome::Solution(solution) => solution,
    };

    for (name, version) in &solution {
        println!("  {name} {version}");
    }

    if pin {
        let cwd = std::env::current_dir()?;
        let Some(project) = Project::discover(&cwd) else {
            bail!("No kiln.lock found in this directory or any parent");
        };
        project.store_versions(&solution)?;
        println!("✓ Pinned {} packages in kiln.lock", solution.len());
    }

    Ok(())
}
