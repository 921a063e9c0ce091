//! Search command

use anyhow::Result;
use kiln::catalog::Catalogs;

/// Search packages by name or description
pub fn search(catalogs: &Catalogs, query: &str) -> Result<()> {
    let data = catalogs.complete.data()?;
    let query_lower = query.to_lowercase();

    let mut hits = 0;
    for name in data.package_names() {
        let latest = data
            .get_latest_version(name)
            .and_then(|id| data.get_version_by_id(id));
        let description = latest.and_then(|v| v.description.as_deref()).unwrap_or("");

        if !name.as_str().contains(&query_lower)
            && !description.to_lowercase().contains(&query_lower)
        {
            continue;
        }

        hits += 1;
        let version = latest.map(|v| v.version.as_str()).unwrap_or("?");
        println!("  {name} {version} — {description}");
    }

    if hits == 0 {
        println!("No packages found matching '{query}'");
    }
    Ok(())
}
