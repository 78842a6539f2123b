use anyhow::Result;
use console::style;
use itinera_core::{PlaceKind, Storage};

pub async fn run(storage: &Storage, kind: Option<&str>) -> Result<()> {
    let kind: Option<PlaceKind> = kind.map(str::parse::<PlaceKind>).transpose()?;
    let places = storage.list_places(kind).await?;

    if places.is_empty() {
        eprintln!("No places");
        return Ok(());
    }

    for place in &places {
        let code = place
            .short_code
            .as_deref()
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        let city = place.details.address.city.as_deref().unwrap_or("");
        println!(
            "  {:<10} {}{} {}",
            place.kind.as_str(),
            style(&place.name).bold(),
            code,
            style(city).dim()
        );
    }

    Ok(())
}
