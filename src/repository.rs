use crate::{
    error::AppResult,
    models::{Bootcamp, CreateBootcampRequest, Location, UpdateBootcampRequest, User},
    query::{Direction, FilterValue, ListOptions},
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. Handlers only
/// see this trait, so tests swap in an in-memory implementation.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across
/// Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- User/Auth ---
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;

    // --- Bootcamp Retrieval ---
    /// Returns one page of bootcamps matching the filters, plus the total match count.
    async fn get_bootcamps(&self, options: &ListOptions) -> AppResult<(Vec<Bootcamp>, i64)>;
    async fn get_bootcamp(&self, id: Uuid) -> AppResult<Option<Bootcamp>>;
    /// Any bootcamp owned by `user_id`; used to enforce one bootcamp per publisher.
    async fn get_bootcamp_by_owner(&self, user_id: Uuid) -> AppResult<Option<Bootcamp>>;
    /// Bootcamps whose great-circle angle from (`latitude`, `longitude`) is at most `radius` radians.
    async fn get_bootcamps_in_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius: f64,
    ) -> AppResult<Vec<Bootcamp>>;

    // --- Bootcamp Actions ---
    async fn create_bootcamp(
        &self,
        req: CreateBootcampRequest,
        user_id: Uuid,
        slug: String,
        location: Location,
    ) -> AppResult<Bootcamp>;
    /// Applies the supplied fields; `None` means the record vanished.
    async fn update_bootcamp(
        &self,
        id: Uuid,
        req: UpdateBootcampRequest,
        slug: Option<String>,
        location: Option<Location>,
    ) -> AppResult<Option<Bootcamp>>;
    async fn delete_bootcamp(&self, id: Uuid) -> AppResult<bool>;
    async fn set_bootcamp_photo(&self, id: Uuid, photo: &str) -> AppResult<Option<Bootcamp>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const BOOTCAMP_COLUMNS: &str = r#"
    id, user_id, name, slug, description, website, phone, email, address,
    latitude, longitude, formatted_address, street, city, state, zipcode, country,
    careers, average_rating, average_cost, photo,
    housing, job_assistance, job_guarantee, accept_gi, created_at
"#;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// push_filters
///
/// Appends the WHERE clause for the list filters. Column names come from the
/// fixed whitelist in `query`; every value is bound.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, options: &ListOptions) {
    for (i, filter) in options.filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        let column = filter.field.column;

        match (&filter.value, filter.op) {
            (FilterValue::Number(n), op) => {
                builder.push(format!("{} {} ", column, op.sql()));
                builder.push_bind(*n);
            }
            (FilterValue::Bool(b), _) => {
                builder.push(format!("{} = ", column));
                builder.push_bind(*b);
            }
            (FilterValue::Text(t), _) if column == "careers" => {
                builder.push_bind(t.clone());
                builder.push(" = ANY(careers)");
            }
            (FilterValue::Text(t), _) => {
                builder.push(format!("{} = ", column));
                builder.push_bind(t.clone());
            }
            // Only built for `in`: matches when any listed value is present.
            (FilterValue::TextList(values), _) => {
                builder.push(format!("{} && ", column));
                builder.push_bind(values.clone());
            }
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// get_user
    ///
    /// Retrieves the identity (id, email, role) needed for authentication.
    /// A database failure is an error, not a missing user.
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// get_bootcamps
    ///
    /// Runs the filtered page query and a matching COUNT(*) for pagination.
    async fn get_bootcamps(&self, options: &ListOptions) -> AppResult<(Vec<Bootcamp>, i64)> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM bootcamps");
        push_filters(&mut count, options);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM bootcamps", BOOTCAMP_COLUMNS));
        push_filters(&mut builder, options);

        builder.push(" ORDER BY ");
        for (i, key) in options.sort.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            let direction = match key.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            builder.push(format!("{} {} NULLS LAST", key.field.column, direction));
        }

        builder.push(" LIMIT ");
        builder.push_bind(options.limit);
        builder.push(" OFFSET ");
        builder.push_bind(options.offset());

        let bootcamps = builder
            .build_query_as::<Bootcamp>()
            .fetch_all(&self.pool)
            .await?;

        Ok((bootcamps, total))
    }

    async fn get_bootcamp(&self, id: Uuid) -> AppResult<Option<Bootcamp>> {
        let bootcamp = sqlx::query_as::<_, Bootcamp>(&format!(
            "SELECT {} FROM bootcamps WHERE id = $1",
            BOOTCAMP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(bootcamp)
    }

    async fn get_bootcamp_by_owner(&self, user_id: Uuid) -> AppResult<Option<Bootcamp>> {
        let bootcamp = sqlx::query_as::<_, Bootcamp>(&format!(
            "SELECT {} FROM bootcamps WHERE user_id = $1 LIMIT 1",
            BOOTCAMP_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(bootcamp)
    }

    /// get_bootcamps_in_radius
    ///
    /// Spherical law of cosines; the cosine is clamped to [-1, 1] so rounding
    /// at the exact centre cannot push `acos` out of its domain.
    async fn get_bootcamps_in_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius: f64,
    ) -> AppResult<Vec<Bootcamp>> {
        let sql = format!(
            r#"SELECT {} FROM bootcamps
               WHERE acos(LEAST(1.0, GREATEST(-1.0,
                   sin(radians($1)) * sin(radians(latitude))
                   + cos(radians($1)) * cos(radians(latitude)) * cos(radians(longitude) - radians($2))
               ))) <= $3
               ORDER BY created_at DESC"#,
            BOOTCAMP_COLUMNS
        );

        let bootcamps = sqlx::query_as::<_, Bootcamp>(&sql)
            .bind(latitude)
            .bind(longitude)
            .bind(radius)
            .fetch_all(&self.pool)
            .await?;
        Ok(bootcamps)
    }

    async fn create_bootcamp(
        &self,
        req: CreateBootcampRequest,
        user_id: Uuid,
        slug: String,
        location: Location,
    ) -> AppResult<Bootcamp> {
        let sql = format!(
            r#"INSERT INTO bootcamps (
                   id, user_id, name, slug, description, website, phone, email, address,
                   latitude, longitude, formatted_address, street, city, state, zipcode, country,
                   careers, housing, job_assistance, job_guarantee, accept_gi
               ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
               RETURNING {}"#,
            BOOTCAMP_COLUMNS
        );

        let bootcamp = sqlx::query_as::<_, Bootcamp>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(req.name.trim().to_string())
            .bind(slug)
            .bind(req.description)
            .bind(req.website)
            .bind(req.phone)
            .bind(req.email)
            .bind(req.address)
            .bind(location.latitude)
            .bind(location.longitude)
            .bind(location.formatted_address)
            .bind(location.street)
            .bind(location.city)
            .bind(location.state)
            .bind(location.zipcode)
            .bind(location.country)
            .bind(req.careers)
            .bind(req.housing)
            .bind(req.job_assistance)
            .bind(req.job_guarantee)
            .bind(req.accept_gi)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(bootcamp_id = %bootcamp.id, %user_id, "bootcamp created");
        Ok(bootcamp)
    }

    /// update_bootcamp
    ///
    /// COALESCE keeps the stored value for every field the caller left out.
    /// Location columns move together: they change only when a new location is given.
    async fn update_bootcamp(
        &self,
        id: Uuid,
        req: UpdateBootcampRequest,
        slug: Option<String>,
        location: Option<Location>,
    ) -> AppResult<Option<Bootcamp>> {
        let has_location = location.is_some();
        let location = location.unwrap_or_default();

        let sql = format!(
            r#"UPDATE bootcamps SET
                   name = COALESCE($2, name),
                   slug = COALESCE($3, slug),
                   description = COALESCE($4, description),
                   website = COALESCE($5, website),
                   phone = COALESCE($6, phone),
                   email = COALESCE($7, email),
                   address = COALESCE($8, address),
                   careers = COALESCE($9, careers),
                   housing = COALESCE($10, housing),
                   job_assistance = COALESCE($11, job_assistance),
                   job_guarantee = COALESCE($12, job_guarantee),
                   accept_gi = COALESCE($13, accept_gi),
                   latitude = CASE WHEN $14 THEN $15 ELSE latitude END,
                   longitude = CASE WHEN $14 THEN $16 ELSE longitude END,
                   formatted_address = CASE WHEN $14 THEN $17 ELSE formatted_address END,
                   street = CASE WHEN $14 THEN $18 ELSE street END,
                   city = CASE WHEN $14 THEN $19 ELSE city END,
                   state = CASE WHEN $14 THEN $20 ELSE state END,
                   zipcode = CASE WHEN $14 THEN $21 ELSE zipcode END,
                   country = CASE WHEN $14 THEN $22 ELSE country END
               WHERE id = $1
               RETURNING {}"#,
            BOOTCAMP_COLUMNS
        );

        let bootcamp = sqlx::query_as::<_, Bootcamp>(&sql)
            .bind(id)
            .bind(req.name.map(|n| n.trim().to_string()))
            .bind(slug)
            .bind(req.description)
            .bind(req.website)
            .bind(req.phone)
            .bind(req.email)
            .bind(req.address)
            .bind(req.careers)
            .bind(req.housing)
            .bind(req.job_assistance)
            .bind(req.job_guarantee)
            .bind(req.accept_gi)
            .bind(has_location)
            .bind(location.latitude)
            .bind(location.longitude)
            .bind(location.formatted_address)
            .bind(location.street)
            .bind(location.city)
            .bind(location.state)
            .bind(location.zipcode)
            .bind(location.country)
            .fetch_optional(&self.pool)
            .await?;
        Ok(bootcamp)
    }

    async fn delete_bootcamp(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM bootcamps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_bootcamp_photo(&self, id: Uuid, photo: &str) -> AppResult<Option<Bootcamp>> {
        let bootcamp = sqlx::query_as::<_, Bootcamp>(&format!(
            "UPDATE bootcamps SET photo = $2 WHERE id = $1 RETURNING {}",
            BOOTCAMP_COLUMNS
        ))
        .bind(id)
        .bind(photo)
        .fetch_optional(&self.pool)
        .await?;
        Ok(bootcamp)
    }
}
