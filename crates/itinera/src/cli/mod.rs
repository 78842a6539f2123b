pub mod document;
pub mod items;
pub mod places;
pub mod process;
pub mod trip;

use anyhow::Result;
use clap::{Parser, Subcommand};
use itinera_core::Storage;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "itinera",
    about = "Turn itinerary documents into structured trip items",
    version
)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, env = "ITINERA_DB", global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage trips
    Trip {
        #[command(subcommand)]
        command: TripCommands,
    },
    /// Manage a trip's documents
    Document {
        #[command(subcommand)]
        command: DocumentCommands,
    },
    /// Extract items from every uploaded or failed document of a trip
    Process {
        /// Trip id
        trip: Uuid,
    },
    /// List a trip's items in time order
    Items {
        /// Trip id
        trip: Uuid,
    },
    /// List resolved places
    Places {
        /// Only places of this kind (airport, hotel, restaurant, venue, attraction)
        #[arg(long)]
        kind: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TripCommands {
    /// Create a trip and print its id
    Create {
        /// Trip name
        name: String,
    },
    /// List trips
    List,
}

#[derive(Subcommand)]
pub enum DocumentCommands {
    /// Attach a PDF to a trip
    Add {
        /// Trip id
        trip: Uuid,
        /// Path to the document
        path: String,
    },
    /// List a trip's documents and their status
    List {
        /// Trip id
        trip: Uuid,
    },
}

pub async fn open_storage(path: &str) -> Result<Storage> {
    Ok(Storage::open(path).await?)
}
