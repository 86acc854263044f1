use anyhow::{Context, Result};
use itertools::Itertools;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use uuid::Uuid;

use crate::model::{
    Association, Picture, PictureAlbum, PictureAlbumPicture, PictureTag, PokemonTrainer, Record,
    RecordId,
};
use crate::store::traits::{AssociationStore, PictureStore, RecordStore};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Table mapping for a record persisted in PostgreSQL.
pub trait PgRecord: Record {
    const TABLE: &'static str;
    const ID_COLUMN: &'static str;
    /// Every column except the id, in bind order
    const COLUMNS: &'static [&'static str];
    /// Idempotent table definition
    const DDL: &'static str;

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error>;

    /// Bind `COLUMNS` in order
    fn bind_columns<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q>;
}

/// An association table and the column holding its owner.
pub trait PgAssociation: PgRecord + Association {
    const OWNER_COLUMN: &'static str;
}

fn select_list<R: PgRecord>() -> String {
    std::iter::once(R::ID_COLUMN)
        .chain(R::COLUMNS.iter().copied())
        .join(", ")
}

fn insert_sql<R: PgRecord>() -> String {
    let placeholders = (1..=R::COLUMNS.len()).map(|n| format!("${}", n)).join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        R::TABLE,
        R::COLUMNS.join(", "),
        placeholders,
        select_list::<R>()
    )
}

fn by_owner_sql<A: PgAssociation>() -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = $1 ORDER BY {}",
        select_list::<A>(),
        A::TABLE,
        A::OWNER_COLUMN,
        A::ID_COLUMN
    )
}

fn update_sql<R: PgRecord>() -> String {
    let assignments = R::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = ${}", column, i + 1))
        .join(", ");
    format!(
        "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
        R::TABLE,
        assignments,
        R::ID_COLUMN,
        R::COLUMNS.len() + 1,
        select_list::<R>()
    )
}

const PICTURE_UPGRADES: &[&str] = &[
    "ALTER TABLE pictures ADD COLUMN IF NOT EXISTS blob_id UUID",
    "ALTER TABLE pictures ADD COLUMN IF NOT EXISTS has_low_resolution BOOLEAN NOT NULL DEFAULT FALSE",
    "CREATE INDEX IF NOT EXISTS pictures_blob_id_idx ON pictures (blob_id)",
];

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create any missing tables
    pub async fn migrate(&self) -> Result<()> {
        for ddl in [
            Picture::DDL,
            PictureAlbum::DDL,
            PictureTag::DDL,
            PictureAlbumPicture::DDL,
            PokemonTrainer::DDL,
        ] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .context("Failed to run schema migration")?;
        }
        // Tables created before pictures carried blob ids
        for alter in PICTURE_UPGRADES {
            sqlx::query(alter)
                .execute(&self.pool)
                .await
                .context("Failed to upgrade pictures table")?;
        }
        log::info!("Database schema is up to date");
        Ok(())
    }
}

#[async_trait::async_trait]
impl<R: PgRecord> RecordStore<R> for PostgresStore {
    async fn find_all(&self) -> Result<Vec<R>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            select_list::<R>(),
            R::TABLE,
            R::ID_COLUMN
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {} records", R::RESOURCE))?;

        rows.iter()
            .map(|row| R::from_row(row).context("Failed to decode row"))
            .collect()
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<R>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1",
            select_list::<R>(),
            R::TABLE,
            R::ID_COLUMN
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch {} {}", R::RESOURCE, id))?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(R::from_row(&row).context("Failed to decode row")?))
    }

    async fn find_many(&self, ids: &[RecordId]) -> Result<Vec<R>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ANY($1) ORDER BY {}",
            select_list::<R>(),
            R::TABLE,
            R::ID_COLUMN,
            R::ID_COLUMN
        );
        let rows = sqlx::query(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch {} batch", R::RESOURCE))?;

        rows.iter()
            .map(|row| R::from_row(row).context("Failed to decode row"))
            .collect()
    }

    async fn insert(&self, record: R) -> Result<R> {
        let sql = insert_sql::<R>();
        let row = record
            .bind_columns(sqlx::query(&sql))
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to insert {}", R::RESOURCE))?;

        R::from_row(&row).context("Failed to decode row")
    }

    async fn insert_many(&self, records: Vec<R>) -> Result<Vec<R>> {
        let sql = insert_sql::<R>();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let mut created = Vec::with_capacity(records.len());
        for record in &records {
            // Dropping `tx` on error rolls the whole batch back
            let row = record
                .bind_columns(sqlx::query(&sql))
                .fetch_one(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert {} batch", R::RESOURCE))?;
            created.push(R::from_row(&row).context("Failed to decode row")?);
        }

        tx.commit()
            .await
            .with_context(|| format!("Failed to commit {} batch", R::RESOURCE))?;

        Ok(created)
    }

    async fn update(&self, record: R) -> Result<Option<R>> {
        let sql = update_sql::<R>();
        let row = record
            .bind_columns(sqlx::query(&sql))
            .bind(record.id())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to update {} {}", R::RESOURCE, record.id()))?;

        row.map(|row| R::from_row(&row).context("Failed to decode row"))
            .transpose()
    }

    async fn delete(&self, id: RecordId) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE {} = $1", R::TABLE, R::ID_COLUMN);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete {} {}", R::RESOURCE, id))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, ids: &[RecordId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!("DELETE FROM {} WHERE {} = ANY($1)", R::TABLE, R::ID_COLUMN);
        let result = sqlx::query(&sql)
            .bind(ids.to_vec())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete {} batch", R::RESOURCE))?;

        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl<A: PgAssociation> AssociationStore<A> for PostgresStore {
    async fn find_by_owner(&self, owner_id: RecordId) -> Result<Vec<A>> {
        let sql = by_owner_sql::<A>();
        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {} rows of {}", A::RESOURCE, owner_id))?;

        rows.iter()
            .map(|row| A::from_row(row).context("Failed to decode row"))
            .collect()
    }
}

#[async_trait::async_trait]
impl PictureStore for PostgresStore {
    async fn find_by_blob_id(&self, blob_id: Uuid) -> Result<Option<Picture>> {
        let sql = format!(
            "SELECT {} FROM pictures WHERE blob_id = $1 ORDER BY picture_id LIMIT 1",
            select_list::<Picture>()
        );
        let row = sqlx::query(&sql)
            .bind(blob_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch picture for blob {}", blob_id))?;

        row.map(|row| Picture::from_row(&row).context("Failed to decode row"))
            .transpose()
    }

    async fn set_low_resolution(
        &self,
        picture_id: RecordId,
        has_low_resolution: bool,
    ) -> Result<Option<Picture>> {
        let sql = format!(
            "UPDATE pictures SET has_low_resolution = $1 WHERE picture_id = $2 RETURNING {}",
            select_list::<Picture>()
        );
        let row = sqlx::query(&sql)
            .bind(has_low_resolution)
            .bind(picture_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to flag picture {}", picture_id))?;

        row.map(|row| Picture::from_row(&row).context("Failed to decode row"))
            .transpose()
    }
}

impl PgRecord for Picture {
    const TABLE: &'static str = "pictures";
    const ID_COLUMN: &'static str = "picture_id";
    const COLUMNS: &'static [&'static str] =
        &["name", "description", "blob_id", "has_low_resolution"];
    const DDL: &'static str = r#"
        CREATE TABLE IF NOT EXISTS pictures (
            picture_id SERIAL PRIMARY KEY,
            name VARCHAR(250) NOT NULL,
            description VARCHAR(250),
            blob_id UUID,
            has_low_resolution BOOLEAN NOT NULL DEFAULT FALSE
        )"#;

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            picture_id: row.try_get("picture_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            blob_id: row.try_get("blob_id")?,
            has_low_resolution: row.try_get("has_low_resolution")?,
        })
    }

    fn bind_columns<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.name.clone())
            .bind(self.description.clone())
            .bind(self.blob_id)
            .bind(self.has_low_resolution)
    }
}

impl PgRecord for PictureAlbum {
    const TABLE: &'static str = "picture_albums";
    const ID_COLUMN: &'static str = "picture_album_id";
    const COLUMNS: &'static [&'static str] = &["name"];
    const DDL: &'static str = r#"
        CREATE TABLE IF NOT EXISTS picture_albums (
            picture_album_id SERIAL PRIMARY KEY,
            name VARCHAR(250) NOT NULL
        )"#;

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            picture_album_id: row.try_get("picture_album_id")?,
            name: row.try_get("name")?,
        })
    }

    fn bind_columns<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.name.clone())
    }
}

impl PgRecord for PictureTag {
    const TABLE: &'static str = "picture_tags";
    const ID_COLUMN: &'static str = "picture_tag_id";
    const COLUMNS: &'static [&'static str] = &["picture_id", "name"];
    const DDL: &'static str = r#"
        CREATE TABLE IF NOT EXISTS picture_tags (
            picture_tag_id SERIAL PRIMARY KEY,
            picture_id INTEGER NOT NULL REFERENCES pictures (picture_id) ON DELETE CASCADE,
            name VARCHAR(250) NOT NULL
        )"#;

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            picture_tag_id: row.try_get("picture_tag_id")?,
            picture_id: row.try_get("picture_id")?,
            name: row.try_get("name")?,
        })
    }

    fn bind_columns<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.picture_id).bind(self.name.clone())
    }
}

impl PgAssociation for PictureTag {
    const OWNER_COLUMN: &'static str = "picture_id";
}

impl PgRecord for PictureAlbumPicture {
    const TABLE: &'static str = "picture_album_pictures";
    const ID_COLUMN: &'static str = "picture_album_picture_id";
    const COLUMNS: &'static [&'static str] = &["picture_album_id", "picture_id"];
    const DDL: &'static str = r#"
        CREATE TABLE IF NOT EXISTS picture_album_pictures (
            picture_album_picture_id SERIAL PRIMARY KEY,
            picture_album_id INTEGER NOT NULL REFERENCES picture_albums (picture_album_id) ON DELETE CASCADE,
            picture_id INTEGER NOT NULL REFERENCES pictures (picture_id) ON DELETE CASCADE
        )"#;

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            picture_album_picture_id: row.try_get("picture_album_picture_id")?,
            picture_album_id: row.try_get("picture_album_id")?,
            picture_id: row.try_get("picture_id")?,
        })
    }

    fn bind_columns<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.picture_album_id).bind(self.picture_id)
    }
}

impl PgAssociation for PictureAlbumPicture {
    const OWNER_COLUMN: &'static str = "picture_album_id";
}

impl PgRecord for PokemonTrainer {
    const TABLE: &'static str = "pokemon_trainers";
    const ID_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["name", "number_of_badges"];
    const DDL: &'static str = r#"
        CREATE TABLE IF NOT EXISTS pokemon_trainers (
            id SERIAL PRIMARY KEY,
            name VARCHAR(250) NOT NULL,
            number_of_badges INTEGER NOT NULL DEFAULT 0
        )"#;

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            number_of_badges: row.try_get("number_of_badges")?,
        })
    }

    fn bind_columns<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.name.clone()).bind(self.number_of_badges)
    }
}
