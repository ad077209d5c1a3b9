//! Patient reviews. Rows are only ever appended; `is_active` hides them.

use chrono::Utc;
use serde::Serialize;
use sqlx::AnyPool;

use super::format_timestamp;
use super::models::{ImportOutcome, NewReview, Review, ReviewRow};
use crate::error::AppError;

const REVIEW_COLUMNS: &str =
    "id, source, external_id, author_name, rating, comment, date_created, imported_at, is_active";

/// Aggregate over the active reviews.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub total: i64,
    pub average_rating: f64,
    pub by_source: Vec<SourceCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub count: i64,
}

/// Active reviews, newest first.
pub async fn list_active(pool: &AnyPool) -> Result<Vec<Review>, AppError> {
    let rows = sqlx::query_as::<_, ReviewRow>(&format!(
        "SELECT {} FROM reviews WHERE is_active = 1 \
         ORDER BY COALESCE(date_created, imported_at) DESC, id DESC",
        REVIEW_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Review::try_from).collect()
}

pub async fn summary(pool: &AnyPool) -> Result<ReviewSummary, AppError> {
    let counts = sqlx::query_as::<_, (String, i64, i64)>(
        r#"
        SELECT source, COUNT(*), CAST(COALESCE(SUM(rating), 0) AS BIGINT)
        FROM reviews
        WHERE is_active = 1
        GROUP BY source
        ORDER BY source
        "#,
    )
    .fetch_all(pool)
    .await?;

    let total: i64 = counts.iter().map(|(_, count, _)| count).sum();
    let rating_sum: i64 = counts.iter().map(|(_, _, sum)| sum).sum();
    let average_rating = if total == 0 {
        0.0
    } else {
        (rating_sum as f64 / total as f64 * 10.0).round() / 10.0
    };

    Ok(ReviewSummary {
        total,
        average_rating,
        by_source: counts
            .into_iter()
            .map(|(source, count, _)| SourceCount { source, count })
            .collect(),
    })
}

async fn insert<'e, E>(executor: E, review: &NewReview, imported_at: &str) -> Result<ReviewRow, AppError>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let row = sqlx::query_as::<_, ReviewRow>(&format!(
        r#"
        INSERT INTO reviews
            (source, external_id, author_name, rating, comment, date_created, imported_at, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 1)
        RETURNING {}
        "#,
        REVIEW_COLUMNS
    ))
    .bind(&review.source)
    .bind(&review.external_id)
    .bind(&review.author_name)
    .bind(review.rating)
    .bind(&review.comment)
    .bind(review.date_created.map(format_timestamp))
    .bind(imported_at)
    .fetch_one(executor)
    .await?;

    Ok(row)
}

pub async fn create(pool: &AnyPool, review: &NewReview) -> Result<Review, AppError> {
    let row = insert(pool, review, &format_timestamp(Utc::now())).await?;
    tracing::info!(id = row.id, source = %row.source, "Review created");
    row.try_into()
}

/// Insert every candidate not already stored. A candidate is a duplicate
/// when a row with the same author, comment and source exists, including
/// rows written earlier in the same batch. All or nothing.
pub async fn import_batch(pool: &AnyPool, candidates: &[NewReview]) -> Result<ImportOutcome, AppError> {
    let imported_at = format_timestamp(Utc::now());
    let mut outcome = ImportOutcome {
        imported: 0,
        skipped: 0,
    };

    let mut tx = pool.begin().await?;

    for candidate in candidates {
        let exists = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM reviews
            WHERE author_name = $1
              AND source = $2
              AND COALESCE(comment, '') = COALESCE($3, '')
            "#,
        )
        .bind(&candidate.author_name)
        .bind(&candidate.source)
        .bind(&candidate.comment)
        .fetch_one(&mut *tx)
        .await?;

        if exists > 0 {
            outcome.skipped += 1;
            continue;
        }

        insert(&mut *tx, candidate, &imported_at).await?;
        outcome.imported += 1;
    }

    tx.commit().await?;

    tracing::info!(
        imported = outcome.imported,
        skipped = outcome.skipped,
        "Review import finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::db::test_support::empty_pool;

    fn review(author: &str, rating: i64, comment: Option<&str>) -> NewReview {
        NewReview {
            source: "google".to_string(),
            external_id: None,
            author_name: author.to_string(),
            rating,
            comment: comment.map(str::to_string),
            date_created: None,
        }
    }

    #[tokio::test]
    async fn test_import_twice_imports_then_skips() {
        let pool = empty_pool().await;
        let batch = vec![
            review("Maria", 5, Some("Excelente médico")),
            review("João", 4, None),
            review("Ana", 5, Some("Muito atencioso")),
        ];

        let first = import_batch(&pool, &batch).await.unwrap();
        assert_eq!(first, ImportOutcome { imported: 3, skipped: 0 });

        let second = import_batch(&pool, &batch).await.unwrap();
        assert_eq!(second, ImportOutcome { imported: 0, skipped: 3 });

        assert_eq!(list_active(&pool).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_import_dedups_within_batch() {
        let pool = empty_pool().await;
        let batch = vec![review("Maria", 5, Some("Ótimo")), review("Maria", 5, Some("Ótimo"))];
        let outcome = import_batch(&pool, &batch).await.unwrap();
        assert_eq!(outcome, ImportOutcome { imported: 1, skipped: 1 });
    }

    #[tokio::test]
    async fn test_same_author_different_source_is_not_duplicate() {
        let pool = empty_pool().await;
        create(&pool, &review("Maria", 5, Some("Ótimo"))).await.unwrap();
        let mut other = review("Maria", 5, Some("Ótimo"));
        other.source = "doctoralia".to_string();
        let outcome = import_batch(&pool, &[other]).await.unwrap();
        assert_eq!(outcome.imported, 1);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_summarised() {
        let pool = empty_pool().await;
        let mut old = review("Antigo", 3, None);
        old.date_created = Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
        let mut new = review("Novo", 5, None);
        new.date_created = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let mut manual = review("Manual", 4, Some("Consulta ótima"));
        manual.source = "manual".to_string();
        manual.date_created = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        create(&pool, &old).await.unwrap();
        create(&pool, &new).await.unwrap();
        create(&pool, &manual).await.unwrap();

        let listed: Vec<_> = list_active(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.author_name)
            .collect();
        assert_eq!(listed, vec!["Novo", "Manual", "Antigo"]);

        let stats = summary(&pool).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.average_rating, 4.0);
        assert_eq!(
            stats.by_source,
            vec![
                SourceCount { source: "google".to_string(), count: 2 },
                SourceCount { source: "manual".to_string(), count: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_summary() {
        let pool = empty_pool().await;
        let stats = summary(&pool).await.unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_rating, 0.0);
    }
}
