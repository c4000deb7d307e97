//! Garage repository
//!
//! Read access to the service book: car listings and owner lookups for cars,
//! service groups and service records.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::db::models::{Car, OwnedResource, UserId};

/// Garage repository error types
#[derive(Debug, thiserror::Error)]
pub enum GarageRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

#[async_trait]
pub trait GarageStore: Send + Sync {
    /// Owner of a resource, `None` if it does not exist
    async fn owner_of(
        &self,
        resource: OwnedResource,
    ) -> Result<Option<UserId>, GarageRepositoryError>;

    async fn list_cars(&self, user_id: UserId) -> Result<Vec<Car>, GarageRepositoryError>;

    async fn find_car(&self, car_id: i64) -> Result<Option<Car>, GarageRepositoryError>;
}

/// PostgreSQL-backed garage store
#[derive(Clone)]
pub struct GarageRepository {
    pool: PgPool,
}

impl GarageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GarageStore for GarageRepository {
    async fn owner_of(
        &self,
        resource: OwnedResource,
    ) -> Result<Option<UserId>, GarageRepositoryError> {
        let (sql, id) = match resource {
            OwnedResource::Car(id) => ("SELECT user_id FROM service_book.car WHERE car_id = $1", id),
            OwnedResource::Group(id) => (
                "SELECT user_id FROM service_book.service_groups WHERE group_id = $1",
                id,
            ),
            OwnedResource::Service(id) => (
                r#"
                SELECT c.user_id
                FROM service_book.services s
                INNER JOIN service_book.car c ON c.car_id = s.car_id
                WHERE s.service_id = $1
                "#,
                id,
            ),
        };

        let owner = sqlx::query_scalar::<_, UserId>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(owner)
    }

    async fn list_cars(&self, user_id: UserId) -> Result<Vec<Car>, GarageRepositoryError> {
        let cars = sqlx::query_as::<_, Car>(
            r#"
            SELECT car_id, user_id, name, odo, avatar
            FROM service_book.car
            WHERE user_id = $1
            ORDER BY car_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(cars)
    }

    async fn find_car(&self, car_id: i64) -> Result<Option<Car>, GarageRepositoryError> {
        let car = sqlx::query_as::<_, Car>(
            r#"
            SELECT car_id, user_id, name, odo, avatar
            FROM service_book.car
            WHERE car_id = $1
            "#,
        )
        .bind(car_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(car)
    }
}
