use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

pub struct HappyMemoryRepository;

impl HappyMemoryRepository {
    pub async fn count_for_user(pool: &SqlitePool, user_id: &str) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM happy_memories WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Insert with a caller-chosen id (the id also names the stored file).
    pub async fn create(
        pool: &SqlitePool,
        memory_id: &str,
        user_id: &str,
        image_url: &str,
        caption: Option<&str>,
        memory_date: Option<NaiveDate>,
    ) -> AppResult<HappyMemory> {
        let now = Utc::now().naive_utc();
        sqlx::query_as::<_, HappyMemory>(
            r#"
            INSERT INTO happy_memories (memory_id, user_id, image_url, caption, memory_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING memory_id, user_id, image_url, caption, memory_date, created_at
            "#,
        )
        .bind(memory_id)
        .bind(user_id)
        .bind(image_url)
        .bind(caption)
        .bind(memory_date)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<HappyMemory>> {
        sqlx::query_as::<_, HappyMemory>(
            r#"
            SELECT memory_id, user_id, image_url, caption, memory_date, created_at
            FROM happy_memories
            WHERE user_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_for_user(
        pool: &SqlitePool,
        memory_id: &str,
        user_id: &str,
    ) -> AppResult<Option<HappyMemory>> {
        sqlx::query_as::<_, HappyMemory>(
            r#"
            SELECT memory_id, user_id, image_url, caption, memory_date, created_at
            FROM happy_memories
            WHERE memory_id = ? AND user_id = ?
            "#,
        )
        .bind(memory_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn update(
        pool: &SqlitePool,
        memory_id: &str,
        user_id: &str,
        caption: Option<&str>,
        memory_date: Option<NaiveDate>,
    ) -> AppResult<Option<HappyMemory>> {
        sqlx::query_as::<_, HappyMemory>(
            r#"
            UPDATE happy_memories
            SET caption = ?, memory_date = ?
            WHERE memory_id = ? AND user_id = ?
            RETURNING memory_id, user_id, image_url, caption, memory_date, created_at
            "#,
        )
        .bind(caption)
        .bind(memory_date)
        .bind(memory_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn delete(pool: &SqlitePool, memory_id: &str, user_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM happy_memories WHERE memory_id = ? AND user_id = ?")
            .bind(memory_id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// The user's most recently stored memory, if any.
    pub async fn latest(pool: &SqlitePool, user_id: &str) -> AppResult<Option<HappyMemory>> {
        sqlx::query_as::<_, HappyMemory>(
            r#"
            SELECT memory_id, user_id, image_url, caption, memory_date, created_at
            FROM happy_memories
            WHERE user_id = ?
            ORDER BY created_at DESC, memory_id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::user::tests::seed_user;
    use crate::db::testing::test_pool;

    #[tokio::test]
    async fn memories_are_scoped_to_owner() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice", UserRole::Regular).await;
        let bob = seed_user(&pool, "bob", UserRole::Regular).await;

        HappyMemoryRepository::create(&pool, "m1", &alice.id, "/media/user_a/m1.jpg", Some("beach"), None)
            .await
            .unwrap();
        assert_eq!(HappyMemoryRepository::count_for_user(&pool, &alice.id).await.unwrap(), 1);

        assert!(HappyMemoryRepository::update(&pool, "m1", &bob.id, Some("x"), None)
            .await
            .unwrap()
            .is_none());
        assert!(!HappyMemoryRepository::delete(&pool, "m1", &bob.id).await.unwrap());

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        HappyMemoryRepository::create(&pool, "m2", &alice.id, "/media/user_a/m2.jpg", Some("hike"), None)
            .await
            .unwrap();
        let pick = HappyMemoryRepository::latest(&pool, &alice.id)
            .await
            .unwrap()
            .expect("memory");
        assert_eq!(pick.caption.as_deref(), Some("hike"));
        assert!(HappyMemoryRepository::latest(&pool, &bob.id).await.unwrap().is_none());

        assert!(HappyMemoryRepository::delete(&pool, "m1", &alice.id).await.unwrap());
    }
}
