use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::record::{
    clamp_rating, format_rating, join_tags, parse_rating, MovieRecord, MovieUpdate, NewMovie,
};

/// Column ordinals in the backing sheet, 1-based. Edits address
/// rating/tags/review by these fixed ordinals; the key column sits last so
/// tools that read columns 1-6 keep working.
pub const COL_TITLE: u32 = 1;
pub const COL_POSTER: u32 = 2;
pub const COL_RATING: u32 = 3;
pub const COL_TAGS: u32 = 4;
pub const COL_REVIEW: u32 = 5;
pub const COL_CREATED: u32 = 6;
pub const COL_ID: u32 = 7;

/// Header row written to a blank sheet.
pub const HEADER: [&str; 7] = [
    "title",
    "poster_url",
    "rating",
    "tags",
    "review",
    "created_at",
    "id",
];

/// Row 1 is the header, so data row `i` (0-based) lives at sheet row `i + 2`.
pub const HEADER_OFFSET: u32 = 2;

/// The wire operations the store needs from a tabular backend. Rows and
/// columns are 1-based, matching the sheet's own numbering.
#[async_trait]
pub trait SheetBackend: Send + Sync {
    /// Every row in the sheet, header included. An empty sheet is an empty
    /// vector, not an error.
    async fn all_rows(&self) -> Result<Vec<Vec<String>>>;

    /// Append one row after the last non-empty row.
    async fn append_row(&self, row: Vec<String>) -> Result<()>;

    /// Overwrite a single cell.
    async fn update_cell(&self, row: u32, col: u32, value: &str) -> Result<()>;

    /// Remove a row; rows below it shift up by one.
    async fn delete_row(&self, row: u32) -> Result<()>;
}

/// A record together with its stable key.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    #[serde(flatten)]
    pub movie: MovieRecord,
}

/// CRUD over movie records in one sheet.
///
/// Records are addressed by their generated key, resolved against a fresh
/// read on every mutation; a record deleted meanwhile surfaces as
/// `RecordNotFound` instead of silently hitting a shifted row.
pub struct MovieStore<B: SheetBackend> {
    backend: B,
}

impl<B: SheetBackend> MovieStore<B> {
    pub fn new(backend: B) -> Self {
        MovieStore { backend }
    }

    /// All records in sheet order. A header-only or blank sheet yields an
    /// empty list; read failures propagate.
    ///
    /// Rows created by other tools may lack a key; those get one generated
    /// and written back here, so every listed record is editable.
    pub async fn list(&self) -> Result<Vec<StoredRecord>> {
        let rows = self.backend.all_rows().await?;
        if rows.len() <= 1 {
            return Ok(Vec::new());
        }

        let mut records = Vec::with_capacity(rows.len() - 1);
        for (index, cells) in rows[1..].iter().enumerate() {
            let mut id = cell(cells, COL_ID);
            if id.is_empty() {
                id = Uuid::new_v4().to_string();
                let sheet_row = index as u32 + HEADER_OFFSET;
                self.backend.update_cell(sheet_row, COL_ID, &id).await?;
            }

            records.push(StoredRecord {
                id,
                movie: parse_row(cells),
            });
        }

        Ok(records)
    }

    /// Append a new record. The header is written first if the sheet is
    /// completely blank, so a fresh spreadsheet works without hand setup.
    pub async fn append(&self, new: NewMovie) -> Result<StoredRecord> {
        if self.backend.all_rows().await?.is_empty() {
            let header = HEADER.iter().map(|h| h.to_string()).collect();
            self.backend.append_row(header).await?;
        }

        let record = StoredRecord {
            id: Uuid::new_v4().to_string(),
            movie: new.into_record(),
        };
        self.backend.append_row(to_row(&record)).await?;

        Ok(record)
    }

    /// Overwrite the mutable fields (rating, tags, review) of the record
    /// with this key. Everything else in the row stays untouched.
    pub async fn update(&self, id: &str, update: MovieUpdate) -> Result<()> {
        let row = self.locate(id).await?;

        let rating = format_rating(clamp_rating(update.rating));
        self.backend.update_cell(row, COL_RATING, &rating).await?;
        self.backend
            .update_cell(row, COL_TAGS, &join_tags(&update.tags))
            .await?;
        self.backend
            .update_cell(row, COL_REVIEW, &update.review)
            .await?;

        Ok(())
    }

    /// Delete the record with this key. Records below it shift up one
    /// display index.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let row = self.locate(id).await?;
        self.backend.delete_row(row).await
    }

    /// Resolve a key to its current sheet row against a fresh read.
    async fn locate(&self, id: &str) -> Result<u32> {
        let rows = self.backend.all_rows().await?;

        for (index, cells) in rows.iter().skip(1).enumerate() {
            if cell(cells, COL_ID) == id {
                return Ok(index as u32 + HEADER_OFFSET);
            }
        }

        Err(Error::RecordNotFound(id.to_string()))
    }
}

/// Read a cell by 1-based column, treating short rows as blank-padded:
/// the API drops trailing empty cells.
fn cell(cells: &[String], col: u32) -> String {
    cells
        .get(col as usize - 1)
        .map(|c| c.trim().to_string())
        .unwrap_or_default()
}

fn parse_row(cells: &[String]) -> MovieRecord {
    MovieRecord {
        title: cell(cells, COL_TITLE),
        poster_url: cell(cells, COL_POSTER),
        rating: parse_rating(&cell(cells, COL_RATING)),
        tags: cell(cells, COL_TAGS),
        review: cell(cells, COL_REVIEW),
        created_at: cell(cells, COL_CREATED),
    }
}

fn to_row(record: &StoredRecord) -> Vec<String> {
    vec![
        record.movie.title.clone(),
        record.movie.poster_url.clone(),
        format_rating(record.movie.rating),
        record.movie.tags.clone(),
        record.movie.review.clone(),
        record.movie.created_at.clone(),
        record.id.clone(),
    ]
}


#[cfg(test)]
mod tests {
    use super::testutil::MemorySheet;
    use super::*;
    use crate::record::{today, PLACEHOLDER_POSTER};

    fn blade_runner() -> NewMovie {
        NewMovie {
            title: "Blade Runner".to_string(),
            poster_url: String::new(),
            rating: 9.0,
            tags: vec!["scifi".to_string(), "drama".to_string()],
            review: "great".to_string(),
        }
    }

    fn heat() -> NewMovie {
        NewMovie {
            title: "Heat".to_string(),
            poster_url: "https://example.com/heat.jpg".to_string(),
            rating: 8.5,
            tags: vec!["action".to_string()],
            review: "the diner scene".to_string(),
        }
    }

    #[tokio::test]
    async fn test_append_then_list() {
        let store = MovieStore::new(MemorySheet::with_header());

        let appended = store.append(blade_runner()).await.unwrap();
        let listed = store.list().await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], appended);
        assert_eq!(listed[0].movie.title, "Blade Runner");
        assert_eq!(listed[0].movie.poster_url, PLACEHOLDER_POSTER);
        assert_eq!(listed[0].movie.rating, 9.0);
        assert_eq!(listed[0].movie.tags, "scifi,drama");
        assert_eq!(listed[0].movie.created_at, today());
    }

    #[tokio::test]
    async fn test_append_row_layout() {
        let sheet = MemorySheet::with_header();
        let store = MovieStore::new(sheet);

        let appended = store.append(blade_runner()).await.unwrap();

        let rows = store.backend.snapshot();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            vec![
                "Blade Runner".to_string(),
                PLACEHOLDER_POSTER.to_string(),
                "9".to_string(),
                "scifi,drama".to_string(),
                "great".to_string(),
                today(),
                appended.id.clone(),
            ]
        );
        assert!(!appended.id.is_empty());
    }

    #[tokio::test]
    async fn test_append_writes_header_on_blank_sheet() {
        let store = MovieStore::new(MemorySheet::empty());

        store.append(heat()).await.unwrap();

        let rows = store.backend.snapshot();
        assert_eq!(rows[0], HEADER.map(|h| h.to_string()).to_vec());
        assert_eq!(rows[1][0], "Heat");
    }

    #[tokio::test]
    async fn test_list_header_only_is_empty_not_error() {
        let store = MovieStore::new(MemorySheet::with_header());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_blank_sheet_is_empty() {
        let store = MovieStore::new(MemorySheet::empty());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_changes_only_named_fields() {
        let store = MovieStore::new(MemorySheet::with_header());
        store.append(blade_runner()).await.unwrap();
        let target = store.append(heat()).await.unwrap();

        store
            .update(
                &target.id,
                MovieUpdate {
                    rating: 9.5,
                    tags: vec!["action".to_string(), "noir".to_string()],
                    review: "rewatched, still great".to_string(),
                },
            )
            .await
            .unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);

        // Untouched record is bit-for-bit the same.
        assert_eq!(listed[0].movie.title, "Blade Runner");
        assert_eq!(listed[0].movie.review, "great");

        // Target changed exactly in the three mutable fields.
        let updated = &listed[1];
        assert_eq!(updated.id, target.id);
        assert_eq!(updated.movie.rating, 9.5);
        assert_eq!(updated.movie.tags, "action,noir");
        assert_eq!(updated.movie.review, "rewatched, still great");
        assert_eq!(updated.movie.title, target.movie.title);
        assert_eq!(updated.movie.poster_url, target.movie.poster_url);
        assert_eq!(updated.movie.created_at, target.movie.created_at);
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let store = MovieStore::new(MemorySheet::with_header());
        let err = store
            .update(
                "no-such-id",
                MovieUpdate {
                    rating: 5.0,
                    tags: vec![],
                    review: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_shifts_following_records() {
        let store = MovieStore::new(MemorySheet::with_header());
        let first = store.append(blade_runner()).await.unwrap();
        let second = store.append(heat()).await.unwrap();

        store.delete(&first.id).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], second);
    }

    #[tokio::test]
    async fn test_delete_unknown_id() {
        let store = MovieStore::new(MemorySheet::with_header());
        store.append(blade_runner()).await.unwrap();

        let err = store.delete("gone").await.unwrap_err();
        assert!(matches!(err, Error::RecordNotFound(_)));

        // Nothing was deleted.
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_backfills_missing_id() {
        let sheet = MemorySheet::with_header();
        sheet.rows.lock().unwrap().push(vec![
            "Alien".to_string(),
            "https://example.com/alien.jpg".to_string(),
            "9".to_string(),
            "scifi,horror".to_string(),
            "in space".to_string(),
            "2026-07-01".to_string(),
        ]);
        let store = MovieStore::new(sheet);

        let first_pass = store.list().await.unwrap();
        assert_eq!(first_pass.len(), 1);
        assert!(!first_pass[0].id.is_empty());

        // The generated key was written back and is stable across reads.
        let rows = store.backend.snapshot();
        assert_eq!(rows[1][COL_ID as usize - 1], first_pass[0].id);
        let second_pass = store.list().await.unwrap();
        assert_eq!(second_pass[0].id, first_pass[0].id);
    }

    #[tokio::test]
    async fn test_list_pads_short_rows() {
        let sheet = MemorySheet::with_header();
        // The API drops trailing empty cells; a row with no review, date or
        // id comes back three cells long.
        sheet.rows.lock().unwrap().push(vec![
            "Stalker".to_string(),
            String::new(),
            "10".to_string(),
            "drama".to_string(),
        ]);
        let store = MovieStore::new(sheet);

        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].movie.review, "");
        assert_eq!(listed[0].movie.created_at, "");
        assert_eq!(listed[0].movie.rating, 10.0);
    }
}
