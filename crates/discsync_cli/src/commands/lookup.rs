//! On-demand catalog lookups: release detail, search, prices, membership.

use console::style;
use discsync::{CatalogClient, CatalogLookups, ListType};

use crate::commands::shared::{CliResult, ListArg, build_client};
use crate::config::Config;

fn lookups(config: &Config) -> CliResult<CatalogLookups<CatalogClient>> {
    Ok(CatalogLookups::new(build_client(config)?, config.cache_ttls()))
}

pub(crate) async fn handle_release(release_id: u64, config: &Config) -> CliResult {
    let release = lookups(config)?.release(release_id, false).await?;

    let year = release.year.map(|y| format!(" ({y})")).unwrap_or_default();
    println!(
        "{} - {}{}",
        style(release.artists.join(", ")).bold(),
        release.title,
        year
    );
    if !release.formats.is_empty() {
        println!("  Format: {}", release.formats.join(", "));
    }
    if !release.genres.is_empty() {
        println!("  Genre:  {}", release.genres.join(", "));
    }
    if !release.styles.is_empty() {
        println!("  Style:  {}", release.styles.join(", "));
    }
    if let Some(count) = release.num_for_sale {
        println!("  For sale: {count}");
    }
    Ok(())
}

pub(crate) async fn handle_search(query: &str, config: &Config) -> CliResult {
    let results = lookups(config)?.search(query, false).await?;
    if results.is_empty() {
        println!("No releases found for {:?}", query);
        return Ok(());
    }
    for result in results {
        let year = result.year.map(|y| y.to_string()).unwrap_or_default();
        println!(
            "{:>10}  {:4}  {}",
            style(result.release_id).cyan(),
            year,
            result.title
        );
    }
    Ok(())
}

pub(crate) async fn handle_prices(release_id: u64, config: &Config) -> CliResult {
    let stats = lookups(config)?.market_stats(release_id, false).await?;
    if stats.blocked_from_sale {
        println!("Release {release_id} is blocked from sale");
        return Ok(());
    }
    match stats.lowest_price {
        Some(price) => println!(
            "{} for sale, lowest {:.2} {}",
            stats.num_for_sale,
            price,
            stats.currency.as_deref().unwrap_or("")
        ),
        None => println!("{} for sale", stats.num_for_sale),
    }
    Ok(())
}

pub(crate) async fn handle_owns(release_id: u64, list: ListArg, config: &Config) -> CliResult {
    let lookups = lookups(config)?;
    for list_type in list.list_types() {
        let membership = lookups.membership(list_type, release_id, false).await?;
        let answer = match (membership.present, list_type) {
            (false, _) => style("no".to_string()).dim(),
            (true, ListType::Collection) => {
                style(format!("yes, {} copies", membership.copies())).green()
            }
            (true, ListType::Wantlist) => style("yes".to_string()).green(),
        };
        println!("{:<12} {}", style(list_type).cyan(), answer);
    }
    Ok(())
}

pub(crate) async fn handle_add(release_id: u64, list_type: ListType, config: &Config) -> CliResult {
    let item = lookups(config)?.add_to_list(list_type, release_id).await?;
    match item.instance_id {
        Some(instance_id) => println!(
            "{} added release {release_id} to {list_type} (instance {instance_id})",
            style("✓").green().bold()
        ),
        None => println!(
            "{} added release {release_id} to {list_type}",
            style("✓").green().bold()
        ),
    }
    Ok(())
}

/// Parse a collection copy given as `FOLDER:INSTANCE`.
pub(crate) fn parse_instance(value: &str) -> Result<(u64, u64), String> {
    let (folder, instance) = value
        .split_once(':')
        .ok_or_else(|| format!("expected FOLDER:INSTANCE, got {value:?}"))?;
    let folder = folder
        .trim()
        .parse()
        .map_err(|_| format!("invalid folder id {folder:?}"))?;
    let instance = instance
        .trim()
        .parse()
        .map_err(|_| format!("invalid instance id {instance:?}"))?;
    Ok((folder, instance))
}

pub(crate) async fn handle_remove(
    release_id: u64,
    list_type: ListType,
    instance: Option<(u64, u64)>,
    config: &Config,
) -> CliResult {
    if list_type == ListType::Collection && instance.is_none() {
        return Err("removing from the collection needs --instance FOLDER:INSTANCE".into());
    }
    lookups(config)?
        .remove_from_list(list_type, release_id, instance)
        .await?;
    println!(
        "{} removed release {release_id} from {list_type}",
        style("✓").green().bold()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instance() {
        assert_eq!(parse_instance("1:456"), Ok((1, 456)));
        assert_eq!(parse_instance(" 0 : 7 "), Ok((0, 7)));
        assert!(parse_instance("456").is_err());
        assert!(parse_instance("a:1").is_err());
    }
}
