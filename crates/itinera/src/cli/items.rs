use std::collections::HashMap;

use anyhow::Result;
use console::style;
use itinera_core::localtime::format_local_time;
use itinera_core::{Item, Storage};
use uuid::Uuid;

pub async fn run(storage: &Storage, trip_id: Uuid) -> Result<()> {
    let trip = storage.get_trip(trip_id).await?;
    let items = storage.list_items(trip.id).await?;

    if items.is_empty() {
        eprintln!("No items in {}", trip.name);
        return Ok(());
    }

    let names: HashMap<Uuid, String> = storage
        .list_places(None)
        .await?
        .into_iter()
        .map(|p| (p.id, p.short_code.unwrap_or(p.name)))
        .collect();

    for item in &items {
        let when = item
            .start_time
            .map_or_else(|| "----------------".to_string(), |t| format_local_time(&t));
        println!(
            "  {} {:<10} {}{}",
            style(when).dim(),
            item.item_type().as_str(),
            style(&item.title).bold(),
            route(item, &names)
        );
    }

    Ok(())
}

fn route(item: &Item, names: &HashMap<Uuid, String>) -> String {
    let name = |id: Option<Uuid>| id.and_then(|id| names.get(&id)).map(String::as_str);

    match (name(item.origin_place_id), name(item.destination_place_id)) {
        (Some(from), Some(to)) => format!("  {from} -> {to}"),
        (Some(at), None) => format!("  @ {at}"),
        (None, Some(to)) => format!("  -> {to}"),
        (None, None) => String::new(),
    }
}
