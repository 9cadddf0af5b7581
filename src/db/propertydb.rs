use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    db::{DBClient, DbError},
    models::propertymodel::{
        NewProperty, Property, PropertyChanges, PropertyImages, PropertyView,
    },
    service::filters::{ChoiceFilter, ListFilter, SearchCriteria},
};

const PROPERTY_COLUMNS: &str = r#"
    id, owner_id, title, slug, ref_code, description,
    country, city, postal_code, street_address, property_number,
    price, tax, plot_area, total_floors, bedrooms, bathrooms,
    advert_type, property_type,
    cover_photo, photo1, photo2, photo3, photo4,
    published_status, views, created_at, updated_at
"#;

#[async_trait]
pub trait PropertyExt: Send + Sync {
    async fn get_properties(
        &self,
        owner_id: Option<Uuid>,
        filter: &ListFilter,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Property>, DbError>;

    async fn count_properties(
        &self,
        owner_id: Option<Uuid>,
        filter: &ListFilter,
    ) -> Result<i64, DbError>;

    async fn get_property_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Property>, DbError>;

    async fn get_property_by_id(
        &self,
        property_id: Uuid,
    ) -> Result<Option<Property>, DbError>;

    async fn create_property(
        &self,
        property: NewProperty,
    ) -> Result<Property, DbError>;

    async fn update_property(
        &self,
        property_id: Uuid,
        changes: PropertyChanges,
    ) -> Result<Option<Property>, DbError>;

    /// Returns whether a row was removed.
    async fn delete_property(
        &self,
        property_id: Uuid,
    ) -> Result<bool, DbError>;

    async fn update_property_images(
        &self,
        property_id: Uuid,
        images: PropertyImages,
    ) -> Result<Option<Property>, DbError>;

    /// Inserts the (property, ip) pair if it is new and bumps the view
    /// counter in the same step. Returns whether this was a new viewer.
    async fn record_view(
        &self,
        property_id: Uuid,
        ip: &str,
    ) -> Result<bool, DbError>;

    async fn get_property_views(&self) -> Result<Vec<PropertyView>, DbError>;

    async fn search_properties(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<Property>, DbError>;
}

/// Escapes LIKE metacharacters so user text only matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains_pattern(raw: &str) -> String {
    format!("%{}%", escape_like(raw))
}

fn push_choice<'args, T>(
    builder: &mut QueryBuilder<'args, Postgres>,
    column: &str,
    choice: &ChoiceFilter<T>,
) where
    T: Copy + PartialEq + Send + 'args + sqlx::Encode<'args, Postgres> + sqlx::Type<Postgres>,
{
    match choice {
        ChoiceFilter::Unset => {}
        ChoiceFilter::Exact(value) => {
            builder.push(format!(" AND {} = ", column)).push_bind(*value);
        }
        ChoiceFilter::NoMatch => {
            builder.push(" AND FALSE");
        }
    }
}

fn push_list_conditions(
    builder: &mut QueryBuilder<'_, Postgres>,
    owner_id: Option<Uuid>,
    filter: &ListFilter,
) {
    builder.push(" WHERE TRUE");

    if let Some(owner_id) = owner_id {
        builder.push(" AND owner_id = ").push_bind(owner_id);
    }

    push_choice(builder, "advert_type", &filter.advert_type);
    push_choice(builder, "property_type", &filter.property_type);

    if let Some(price) = &filter.price {
        builder.push(" AND price = ").push_bind(price.clone());
    }
    if let Some(price_gt) = &filter.price_gt {
        builder.push(" AND price > ").push_bind(price_gt.clone());
    }
    if let Some(price_lt) = &filter.price_lt {
        builder.push(" AND price < ").push_bind(price_lt.clone());
    }

    for term in &filter.search_terms {
        let pattern = contains_pattern(term);
        builder
            .push(" AND (country ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR city ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_search_conditions(builder: &mut QueryBuilder<'_, Postgres>, criteria: &SearchCriteria) {
    builder.push(" WHERE published_status = TRUE");

    push_choice(builder, "advert_type", &criteria.advert_type);
    push_choice(builder, "property_type", &criteria.property_type);

    if let Some(floor) = criteria.price.floor() {
        builder.push(" AND price >= ").push_bind(floor);
    }
    builder
        .push(" AND bedrooms >= ")
        .push_bind(criteria.bedrooms.floor())
        .push(" AND bathrooms >= ")
        .push_bind(criteria.bathrooms.floor());

    if !criteria.catch_phrase.is_empty() {
        builder
            .push(" AND description ILIKE ")
            .push_bind(contains_pattern(&criteria.catch_phrase));
    }
}

fn map_insert_error(e: sqlx::Error) -> DbError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            return DbError::UniqueViolation(constraint);
        }
    }
    DbError::Sqlx(e)
}

#[async_trait]
impl PropertyExt for DBClient {
    async fn get_properties(
        &self,
        owner_id: Option<Uuid>,
        filter: &ListFilter,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Property>, DbError> {
        let offset = (page.saturating_sub(1) as i64) * limit as i64;

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM properties",
            PROPERTY_COLUMNS
        ));
        push_list_conditions(&mut builder, owner_id, filter);
        builder.push(format!(" ORDER BY {}", filter.ordering.sql()));
        builder
            .push(" LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset);

        let properties = builder
            .build_query_as::<Property>()
            .fetch_all(&self.pool)
            .await?;

        Ok(properties)
    }

    async fn count_properties(
        &self,
        owner_id: Option<Uuid>,
        filter: &ListFilter,
    ) -> Result<i64, DbError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM properties");
        push_list_conditions(&mut builder, owner_id, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn get_property_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Property>, DbError> {
        let sql = format!("SELECT {} FROM properties WHERE slug = $1", PROPERTY_COLUMNS);
        let property = sqlx::query_as::<_, Property>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(property)
    }

    async fn get_property_by_id(
        &self,
        property_id: Uuid,
    ) -> Result<Option<Property>, DbError> {
        let sql = format!("SELECT {} FROM properties WHERE id = $1", PROPERTY_COLUMNS);
        let property = sqlx::query_as::<_, Property>(&sql)
            .bind(property_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(property)
    }

    async fn create_property(
        &self,
        property: NewProperty,
    ) -> Result<Property, DbError> {
        let sql = format!(
            r#"
            INSERT INTO properties (
                owner_id, title, slug, ref_code, description,
                country, city, postal_code, street_address, property_number,
                price, tax, plot_area, total_floors, bedrooms, bathrooms,
                advert_type, property_type, published_status
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19
            )
            RETURNING {}
            "#,
            PROPERTY_COLUMNS
        );

        sqlx::query_as::<_, Property>(&sql)
            .bind(property.owner_id)
            .bind(property.title)
            .bind(property.slug)
            .bind(property.ref_code)
            .bind(property.description)
            .bind(property.country)
            .bind(property.city)
            .bind(property.postal_code)
            .bind(property.street_address)
            .bind(property.property_number)
            .bind(property.price)
            .bind(property.tax)
            .bind(property.plot_area)
            .bind(property.total_floors)
            .bind(property.bedrooms)
            .bind(property.bathrooms)
            .bind(property.advert_type)
            .bind(property.property_type)
            .bind(property.published_status)
            .fetch_one(&self.pool)
            .await
            .map_err(map_insert_error)
    }

    async fn update_property(
        &self,
        property_id: Uuid,
        changes: PropertyChanges,
    ) -> Result<Option<Property>, DbError> {
        let sql = format!(
            r#"
            UPDATE properties
            SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                country = COALESCE($3, country),
                city = COALESCE($4, city),
                postal_code = COALESCE($5, postal_code),
                street_address = COALESCE($6, street_address),
                property_number = COALESCE($7, property_number),
                price = COALESCE($8, price),
                tax = COALESCE($9, tax),
                plot_area = COALESCE($10, plot_area),
                total_floors = COALESCE($11, total_floors),
                bedrooms = COALESCE($12, bedrooms),
                bathrooms = COALESCE($13, bathrooms),
                advert_type = COALESCE($14, advert_type),
                property_type = COALESCE($15, property_type),
                published_status = COALESCE($16, published_status),
                updated_at = NOW()
            WHERE id = $17
            RETURNING {}
            "#,
            PROPERTY_COLUMNS
        );

        let property = sqlx::query_as::<_, Property>(&sql)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.country)
            .bind(changes.city)
            .bind(changes.postal_code)
            .bind(changes.street_address)
            .bind(changes.property_number)
            .bind(changes.price)
            .bind(changes.tax)
            .bind(changes.plot_area)
            .bind(changes.total_floors)
            .bind(changes.bedrooms)
            .bind(changes.bathrooms)
            .bind(changes.advert_type)
            .bind(changes.property_type)
            .bind(changes.published_status)
            .bind(property_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(property)
    }

    async fn delete_property(
        &self,
        property_id: Uuid,
    ) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(property_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_property_images(
        &self,
        property_id: Uuid,
        images: PropertyImages,
    ) -> Result<Option<Property>, DbError> {
        let sql = format!(
            r#"
            UPDATE properties
            SET
                cover_photo = COALESCE($1, cover_photo),
                photo1 = COALESCE($2, photo1),
                photo2 = COALESCE($3, photo2),
                photo3 = COALESCE($4, photo3),
                photo4 = COALESCE($5, photo4),
                updated_at = NOW()
            WHERE id = $6
            RETURNING {}
            "#,
            PROPERTY_COLUMNS
        );

        let property = sqlx::query_as::<_, Property>(&sql)
            .bind(images.cover_photo)
            .bind(images.photo1)
            .bind(images.photo2)
            .bind(images.photo3)
            .bind(images.photo4)
            .bind(property_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(property)
    }

    async fn record_view(
        &self,
        property_id: Uuid,
        ip: &str,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            WITH inserted AS (
                INSERT INTO property_views (property_id, ip)
                VALUES ($1, $2)
                ON CONFLICT (property_id, ip) DO NOTHING
                RETURNING property_id
            )
            UPDATE properties
            SET views = views + 1
            WHERE id IN (SELECT property_id FROM inserted)
            "#,
        )
        .bind(property_id)
        .bind(ip)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_property_views(&self) -> Result<Vec<PropertyView>, DbError> {
        let views = sqlx::query_as::<_, PropertyView>(
            r#"
            SELECT id, property_id, ip, created_at
            FROM property_views
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(views)
    }

    async fn search_properties(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<Property>, DbError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM properties",
            PROPERTY_COLUMNS
        ));
        push_search_conditions(&mut builder, criteria);
        builder.push(" ORDER BY created_at DESC");

        let properties = builder
            .build_query_as::<Property>()
            .fetch_all(&self.pool)
            .await?;

        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dtos::propertydtos::SearchPropertyDto, models::propertymodel::AdvertType};

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("100%_off\\"), "100\\%\\_off\\\\");
        assert_eq!(contains_pattern("pool"), "%pool%");
    }

    #[test]
    fn list_conditions_render_only_applied_filters() {
        let filter = ListFilter {
            advert_type: ChoiceFilter::Exact(AdvertType::ForSale),
            search_terms: vec!["nairobi".to_string()],
            ..ListFilter::default()
        };

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM properties");
        push_list_conditions(&mut builder, Some(Uuid::new_v4()), &filter);
        let sql = builder.sql().to_string();

        assert!(sql.contains("owner_id = $1"));
        assert!(sql.contains("advert_type = $2"));
        assert!(sql.contains("(country ILIKE $3 OR city ILIKE $4)"));
        assert!(!sql.contains("price"));
    }

    fn criteria(price: &str, catch_phrase: &str) -> SearchCriteria {
        SearchCriteria::from_dto(SearchPropertyDto {
            advert_type: Some("For Rent".to_string()),
            property_type: Some("Apartment".to_string()),
            price: Some(price.to_string()),
            bedrooms: Some("2+".to_string()),
            bathrooms: Some("1+".to_string()),
            catch_phrase: Some(catch_phrase.to_string()),
        })
        .unwrap()
    }

    #[test]
    fn search_conditions_render_bucket_floors() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM properties");
        push_search_conditions(&mut builder, &criteria("$100,000+", "balcony"));

        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM properties WHERE published_status = TRUE \
             AND advert_type = $1 AND property_type = $2 AND price >= $3 \
             AND bedrooms >= $4 AND bathrooms >= $5 AND description ILIKE $6"
        );
    }

    #[test]
    fn search_conditions_skip_any_price_and_empty_phrase() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM properties");
        push_search_conditions(&mut builder, &criteria("Any", ""));
        let sql = builder.sql();

        assert!(!sql.contains("price"));
        assert!(!sql.contains("ILIKE"));
        assert!(sql.ends_with("AND bedrooms >= $3 AND bathrooms >= $4"));
    }

    #[test]
    fn unmatched_choice_renders_false() {
        let filter = ListFilter {
            property_type: ChoiceFilter::NoMatch,
            ..ListFilter::default()
        };

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM properties");
        push_list_conditions(&mut builder, None, &filter);
        assert!(builder.sql().ends_with(" WHERE TRUE AND FALSE"));
    }
}
