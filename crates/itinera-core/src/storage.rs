use chrono::{DateTime, Utc};
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqlitePoolOptions},
    Pool, Sqlite,
};
use uuid::Uuid;

use crate::{
    item::{Item, ItemType},
    place::{Place, PlaceKind},
    trip::{Document, DocumentStatus, Trip},
    Error, Result,
};

const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS trips (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    knowledge_index_id TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    trip_id TEXT NOT NULL REFERENCES trips(id) ON DELETE CASCADE,
    file_name TEXT NOT NULL,
    file_path TEXT NOT NULL,
    status TEXT NOT NULL,
    raw_result TEXT,
    error_message TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_trip ON documents(trip_id, status);

CREATE TABLE IF NOT EXISTS places (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    short_code TEXT,
    kind TEXT NOT NULL,
    external_id TEXT,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_places_external ON places(external_id) WHERE external_id IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_places_code ON places(kind, short_code);

CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY,
    trip_id TEXT NOT NULL REFERENCES trips(id) ON DELETE CASCADE,
    document_id TEXT REFERENCES documents(id) ON DELETE SET NULL,
    item_type TEXT NOT NULL,
    title TEXT NOT NULL,
    start_time TEXT,
    end_time TEXT,
    origin_place_id TEXT REFERENCES places(id),
    destination_place_id TEXT REFERENCES places(id),
    data TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_trip ON items(trip_id, item_type);
"#;

type DocumentRow = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
);

type PlaceRow = (
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    String,
    String,
);

/// Columns of an item that are not kept in their own SQL column.
#[derive(serde::Serialize, serde::Deserialize)]
struct ItemBody {
    description: Option<String>,
    info: Option<String>,
    origin_location_detail: Option<String>,
    destination_location_detail: Option<String>,
    confirmation_number: Option<String>,
    client_arranged: bool,
    details: crate::item::ItemDetails,
}

type ItemRow = (
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
);

const ITEM_COLUMNS: &str = "id, trip_id, document_id, title, start_time, end_time, \
     origin_place_id, destination_place_id, data, created_at";

const PLACE_COLUMNS: &str = "id, name, short_code, kind, external_id, data, created_at";

const DOCUMENT_COLUMNS: &str = "id, trip_id, file_name, file_path, status, raw_result, \
     error_message, created_at, updated_at";

pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn open(path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{path}?mode=rwc"))
            .await?;

        sqlx::raw_sql(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::raw_sql(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    // Trip operations

    pub async fn insert_trip(&self, trip: &Trip) -> Result<()> {
        sqlx::query(
            "INSERT INTO trips (id, name, knowledge_index_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(trip.id.to_string())
        .bind(&trip.name)
        .bind(&trip.knowledge_index_id)
        .bind(trip.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_trip(&self, id: Uuid) -> Result<Trip> {
        let row: (String, String, Option<String>, String) = sqlx::query_as(
            "SELECT id, name, knowledge_index_id, created_at FROM trips WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::TripNotFound(id))?;

        let (id, name, knowledge_index_id, created_at) = row;
        Ok(Trip {
            id: parse_uuid("trips", &id)?,
            name,
            knowledge_index_id,
            created_at: parse_timestamp("trips", &created_at)?,
        })
    }

    pub async fn list_trips(&self) -> Result<Vec<Trip>> {
        let rows: Vec<(String, String, Option<String>, String)> = sqlx::query_as(
            "SELECT id, name, knowledge_index_id, created_at FROM trips ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, name, knowledge_index_id, created_at)| {
                Ok(Trip {
                    id: parse_uuid("trips", &id)?,
                    name,
                    knowledge_index_id,
                    created_at: parse_timestamp("trips", &created_at)?,
                })
            })
            .collect()
    }

    pub async fn set_trip_index(&self, trip_id: Uuid, index_id: &str) -> Result<()> {
        let result = sqlx::query("UPDATE trips SET knowledge_index_id = ? WHERE id = ?")
            .bind(index_id)
            .bind(trip_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::TripNotFound(trip_id));
        }

        Ok(())
    }

    // Document operations

    pub async fn insert_document(&self, document: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, trip_id, file_name, file_path, status, raw_result, error_message, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document.id.to_string())
        .bind(document.trip_id.to_string())
        .bind(&document.file_name)
        .bind(&document.file_path)
        .bind(document.status.as_str())
        .bind(&document.raw_result)
        .bind(&document.error_message)
        .bind(document.created_at.to_rfc3339())
        .bind(document.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_document(&self, id: Uuid) -> Result<Document> {
        let row: DocumentRow = sqlx::query_as(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::DocumentNotFound(id))?;

        parse_document_row(row)
    }

    /// Documents of a trip in `uploaded` or `failed`, oldest first.
    pub async fn list_eligible_documents(&self, trip_id: Uuid) -> Result<Vec<Document>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents
             WHERE trip_id = ? AND status IN ('uploaded', 'failed')
             ORDER BY created_at, id"
        ))
        .bind(trip_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_document_row).collect()
    }

    pub async fn list_documents(&self, trip_id: Uuid) -> Result<Vec<Document>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE trip_id = ? ORDER BY created_at, id"
        ))
        .bind(trip_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_document_row).collect()
    }

    /// Moves a document to `status`, rejecting transitions the lifecycle forbids.
    ///
    /// Entering `processing` clears the previous run's result and error.
    pub async fn set_document_status(&self, id: Uuid, status: DocumentStatus) -> Result<()> {
        let current = self.get_document(id).await?.status;
        if !current.can_transition_to(status) {
            return Err(Error::InvalidStatusTransition {
                from: current.to_string(),
                to: status.to_string(),
            });
        }

        let clear = status == DocumentStatus::Processing;
        sqlx::query(
            r#"
            UPDATE documents
            SET status = ?,
                raw_result = CASE WHEN ? THEN NULL ELSE raw_result END,
                error_message = CASE WHEN ? THEN NULL ELSE error_message END,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(clear)
        .bind(clear)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a document's items and marks it `processed` in one transaction.
    ///
    /// On any error nothing is written and the document keeps its status.
    pub async fn commit_document(&self, id: Uuid, items: &[Item], raw_result: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let (status,): (String,) = sqlx::query_as("SELECT status FROM documents WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(Error::DocumentNotFound(id))?;
        let current: DocumentStatus = status.parse()?;
        if !current.can_transition_to(DocumentStatus::Processed) {
            return Err(Error::InvalidStatusTransition {
                from: current.to_string(),
                to: DocumentStatus::Processed.to_string(),
            });
        }

        for item in items {
            insert_item_query(item)?.execute(&mut *tx).await?;
        }

        sqlx::query(
            "UPDATE documents SET status = ?, raw_result = ?, error_message = NULL, updated_at = ?
             WHERE id = ?",
        )
        .bind(DocumentStatus::Processed.as_str())
        .bind(raw_result)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn record_document_error(&self, id: Uuid, message: &str) -> Result<()> {
        self.set_document_status(id, DocumentStatus::Failed).await?;

        sqlx::query("UPDATE documents SET error_message = ? WHERE id = ?")
            .bind(message)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // Place operations

    /// Inserts a place. A second place with an already-stored external id is
    /// rejected with [`Error::DuplicatePlace`].
    pub async fn insert_place(&self, place: &Place) -> Result<()> {
        let data_json = serde_json::to_string(&place.details)?;

        sqlx::query(
            r#"
            INSERT INTO places (id, name, short_code, kind, external_id, data, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(place.id.to_string())
        .bind(&place.name)
        .bind(&place.short_code)
        .bind(place.kind.as_str())
        .bind(&place.external_id)
        .bind(data_json)
        .bind(place.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return Error::DuplicatePlace(place.external_id.clone().unwrap_or_default());
                }
            }
            Error::Database(e)
        })?;

        Ok(())
    }

    pub async fn get_place(&self, id: Uuid) -> Result<Place> {
        let row: PlaceRow = sqlx::query_as(&format!(
            "SELECT {PLACE_COLUMNS} FROM places WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::PlaceNotFound(id))?;

        parse_place_row(row)
    }

    pub async fn find_place_by_external_id(&self, external_id: &str) -> Result<Option<Place>> {
        let row: Option<PlaceRow> = sqlx::query_as(&format!(
            "SELECT {PLACE_COLUMNS} FROM places WHERE external_id = ?"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(parse_place_row).transpose()
    }

    /// A place of `kind` whose short code or external id equals `key`.
    pub async fn find_place_by_key(&self, kind: PlaceKind, key: &str) -> Result<Option<Place>> {
        let row: Option<PlaceRow> = sqlx::query_as(&format!(
            "SELECT {PLACE_COLUMNS} FROM places
             WHERE kind = ? AND (short_code = ? OR external_id = ?)
             ORDER BY created_at
             LIMIT 1"
        ))
        .bind(kind.as_str())
        .bind(key)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(parse_place_row).transpose()
    }

    pub async fn list_places(&self, kind: Option<PlaceKind>) -> Result<Vec<Place>> {
        let rows: Vec<PlaceRow> = match kind {
            Some(k) => {
                sqlx::query_as(&format!(
                    "SELECT {PLACE_COLUMNS} FROM places WHERE kind = ? ORDER BY name"
                ))
                .bind(k.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!("SELECT {PLACE_COLUMNS} FROM places ORDER BY name"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(parse_place_row).collect()
    }

    // Item operations

    pub async fn list_items(&self, trip_id: Uuid) -> Result<Vec<Item>> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE trip_id = ?
             ORDER BY start_time IS NULL, start_time, created_at"
        ))
        .bind(trip_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_item_row).collect()
    }

    /// Items of a trip and type whose title contains `fragment` (case-sensitive).
    pub async fn find_items_by_title(
        &self,
        trip_id: Uuid,
        item_type: ItemType,
        fragment: &str,
    ) -> Result<Vec<Item>> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE trip_id = ? AND item_type = ? AND instr(title, ?) > 0
             ORDER BY created_at"
        ))
        .bind(trip_id.to_string())
        .bind(item_type.as_str())
        .bind(fragment)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_item_row).collect()
    }
}

fn parse_uuid(table: &'static str, value: &str) -> Result<Uuid> {
    value.parse().map_err(|_| Error::CorruptRow {
        table,
        reason: format!("invalid id {value}"),
    })
}

fn parse_optional_uuid(table: &'static str, value: Option<String>) -> Result<Option<Uuid>> {
    value.map(|v| parse_uuid(table, &v)).transpose()
}

fn parse_timestamp(table: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| Error::CorruptRow {
            table,
            reason: format!("invalid timestamp {value}"),
        })
}

fn parse_optional_timestamp(
    table: &'static str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_timestamp(table, &v)).transpose()
}

fn insert_item_query(item: &Item) -> Result<Query<'_, Sqlite, SqliteArguments<'_>>> {
    let body = ItemBody {
        description: item.description.clone(),
        info: item.info.clone(),
        origin_location_detail: item.origin_location_detail.clone(),
        destination_location_detail: item.destination_location_detail.clone(),
        confirmation_number: item.confirmation_number.clone(),
        client_arranged: item.client_arranged,
        details: item.details.clone(),
    };
    let data_json = serde_json::to_string(&body)?;

    Ok(sqlx::query(
        r#"
        INSERT INTO items (id, trip_id, document_id, item_type, title, start_time, end_time,
                           origin_place_id, destination_place_id, data, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item.id.to_string())
    .bind(item.trip_id.to_string())
    .bind(item.document_id.map(|id| id.to_string()))
    .bind(item.item_type().as_str())
    .bind(&item.title)
    .bind(item.start_time.map(|t| t.to_rfc3339()))
    .bind(item.end_time.map(|t| t.to_rfc3339()))
    .bind(item.origin_place_id.map(|id| id.to_string()))
    .bind(item.destination_place_id.map(|id| id.to_string()))
    .bind(data_json)
    .bind(item.created_at.to_rfc3339()))
}

fn parse_document_row(row: DocumentRow) -> Result<Document> {
    let (id, trip_id, file_name, file_path, status, raw_result, error_message, created_at, updated_at) =
        row;

    Ok(Document {
        id: parse_uuid("documents", &id)?,
        trip_id: parse_uuid("documents", &trip_id)?,
        file_name,
        file_path,
        status: status.parse()?,
        raw_result,
        error_message,
        created_at: parse_timestamp("documents", &created_at)?,
        updated_at: parse_timestamp("documents", &updated_at)?,
    })
}

fn parse_place_row(row: PlaceRow) -> Result<Place> {
    let (id, name, short_code, kind, external_id, data_json, created_at) = row;

    Ok(Place {
        id: parse_uuid("places", &id)?,
        name,
        short_code,
        kind: kind.parse()?,
        external_id,
        details: serde_json::from_str(&data_json)?,
        created_at: parse_timestamp("places", &created_at)?,
    })
}

fn parse_item_row(row: ItemRow) -> Result<Item> {
    let (
        id,
        trip_id,
        document_id,
        title,
        start_time,
        end_time,
        origin_place_id,
        destination_place_id,
        data_json,
        created_at,
    ) = row;

    let body: ItemBody = serde_json::from_str(&data_json)?;

    Ok(Item {
        id: parse_uuid("items", &id)?,
        trip_id: parse_uuid("items", &trip_id)?,
        document_id: parse_optional_uuid("items", document_id)?,
        title,
        description: body.description,
        info: body.info,
        start_time: parse_optional_timestamp("items", start_time)?,
        end_time: parse_optional_timestamp("items", end_time)?,
        origin_place_id: parse_optional_uuid("items", origin_place_id)?,
        destination_place_id: parse_optional_uuid("items", destination_place_id)?,
        origin_location_detail: body.origin_location_detail,
        destination_location_detail: body.destination_location_detail,
        confirmation_number: body.confirmation_number,
        client_arranged: body.client_arranged,
        details: body.details,
        created_at: parse_timestamp("items", &created_at)?,
    })
}
