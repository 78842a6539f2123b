use anyhow::Result;
use console::style;
use itinera_core::{Storage, Trip};

pub async fn run_create(storage: &Storage, name: String) -> Result<()> {
    let trip = Trip::new(name);
    storage.insert_trip(&trip).await?;

    eprintln!("Created trip: {}", trip.name);
    println!("{}", trip.id);
    Ok(())
}

pub async fn run_list(storage: &Storage) -> Result<()> {
    let trips = storage.list_trips().await?;

    if trips.is_empty() {
        eprintln!("No trips");
        return Ok(());
    }

    for trip in &trips {
        println!(
            "  {} {} {}",
            style(trip.id).dim(),
            style(&trip.name).bold(),
            trip.created_at.format("%Y-%m-%d")
        );
    }

    Ok(())
}
