//! Info command

use anyhow::{bail, Result};
use kiln::catalog::Catalogs;
use kiln::types::PackageName;

/// Show info about a specific package
pub fn info(catalogs: &Catalogs, package_str: &str) -> Result<()> {
    let package = PackageName::new(package_str);
    let data = catalogs.complete.data()?;

    let Some(record) = data.get_package(&package) else {
        bail!("Package '{package}' not found");
    };

    println!("{package}");
    if catalogs.complete.is_local_package(&package) {
        if let Some(dir) = catalogs.complete.effective_local_packages().get(&package) {
            println!("  local source: {}", dir.display());
        }
    }
    if !record.maintainers.is_empty() {
        println!("  maintainers: {}", record.maintainers.join(", "));
    }

    for version in data.versions_of(&package) {
        let builds = data.get_all_builds(&version.id);
        let mut line = format!("  {}", version.version);
        if version.is_test {
            line.push_str(" [test]");
        }
        if !builds.is_empty() {
            let arches: Vec<&str> = builds.iter().map(|b| b.architecture.as_str()).collect();
            line.push_str(&format!(" ({})", arches.join(", ")));
        }
        println!("{line}");
        if let Some(description) = &version.description {
            println!("    {description}");
        }
        for (dep, edge) in &version.dependencies {
            let constraint = edge.constraint.as_deref().unwrap_or("*");
            let weak = if edge.weak { " (weak)" } else { "" };
            println!("    requires {dep} {constraint}{weak}");
        }
    }

    Ok(())
}
