// In-process catalog used when no DATABASE_URL is configured and in tests.
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::{propertydb::PropertyExt, DbError},
    models::propertymodel::{
        NewProperty, Property, PropertyChanges, PropertyImages, PropertyView,
    },
    service::filters::{ListFilter, Ordering, SearchCriteria},
};

#[derive(Debug, Default)]
struct Tables {
    /// Insertion order; doubles as the tie-breaker for equal timestamps.
    properties: Vec<Property>,
    views: Vec<PropertyView>,
    viewers: HashSet<(Uuid, String)>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted(mut properties: Vec<Property>, ordering: Ordering) -> Vec<Property> {
    match ordering {
        Ordering::NewestFirst => {
            properties.reverse();
            properties.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        Ordering::OldestFirst => properties.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
    }
    properties
}

fn filtered(tables: &Tables, owner_id: Option<Uuid>, filter: &ListFilter) -> Vec<Property> {
    tables
        .properties
        .iter()
        .filter(|p| owner_id.map_or(true, |owner| p.owner_id == owner))
        .filter(|p| filter.matches(p))
        .cloned()
        .collect()
}

#[async_trait]
impl PropertyExt for MemoryStore {
    async fn get_properties(
        &self,
        owner_id: Option<Uuid>,
        filter: &ListFilter,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Property>, DbError> {
        let tables = self.tables.read().await;
        let offset = (page.saturating_sub(1) as usize).saturating_mul(limit);

        Ok(sorted(filtered(&tables, owner_id, filter), filter.ordering)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn count_properties(
        &self,
        owner_id: Option<Uuid>,
        filter: &ListFilter,
    ) -> Result<i64, DbError> {
        let tables = self.tables.read().await;
        Ok(filtered(&tables, owner_id, filter).len() as i64)
    }

    async fn get_property_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Property>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.properties.iter().find(|p| p.slug == slug).cloned())
    }

    async fn get_property_by_id(
        &self,
        property_id: Uuid,
    ) -> Result<Option<Property>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.properties.iter().find(|p| p.id == property_id).cloned())
    }

    async fn create_property(
        &self,
        property: NewProperty,
    ) -> Result<Property, DbError> {
        let mut tables = self.tables.write().await;

        if tables.properties.iter().any(|p| p.slug == property.slug) {
            return Err(DbError::UniqueViolation("properties_slug_key".to_string()));
        }
        if tables.properties.iter().any(|p| p.ref_code == property.ref_code) {
            return Err(DbError::UniqueViolation("properties_ref_code_key".to_string()));
        }

        let now = Utc::now();
        let created = Property {
            id: Uuid::new_v4(),
            owner_id: property.owner_id,
            title: property.title,
            slug: property.slug,
            ref_code: property.ref_code,
            description: property.description,
            country: property.country,
            city: property.city,
            postal_code: property.postal_code,
            street_address: property.street_address,
            property_number: property.property_number,
            price: property.price,
            tax: property.tax,
            plot_area: property.plot_area,
            total_floors: property.total_floors,
            bedrooms: property.bedrooms,
            bathrooms: property.bathrooms,
            advert_type: property.advert_type,
            property_type: property.property_type,
            cover_photo: None,
            photo1: None,
            photo2: None,
            photo3: None,
            photo4: None,
            published_status: property.published_status,
            views: 0,
            created_at: now,
            updated_at: now,
        };

        tables.properties.push(created.clone());
        Ok(created)
    }

    async fn update_property(
        &self,
        property_id: Uuid,
        changes: PropertyChanges,
    ) -> Result<Option<Property>, DbError> {
        let mut tables = self.tables.write().await;
        let Some(property) = tables.properties.iter_mut().find(|p| p.id == property_id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            property.title = title;
        }
        if let Some(description) = changes.description {
            property.description = description;
        }
        if let Some(country) = changes.country {
            property.country = country;
        }
        if let Some(city) = changes.city {
            property.city = city;
        }
        if let Some(postal_code) = changes.postal_code {
            property.postal_code = postal_code;
        }
        if let Some(street_address) = changes.street_address {
            property.street_address = street_address;
        }
        if let Some(property_number) = changes.property_number {
            property.property_number = property_number;
        }
        if let Some(price) = changes.price {
            property.price = price;
        }
        if let Some(tax) = changes.tax {
            property.tax = tax;
        }
        if let Some(plot_area) = changes.plot_area {
            property.plot_area = plot_area;
        }
        if let Some(total_floors) = changes.total_floors {
            property.total_floors = total_floors;
        }
        if let Some(bedrooms) = changes.bedrooms {
            property.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = changes.bathrooms {
            property.bathrooms = bathrooms;
        }
        if let Some(advert_type) = changes.advert_type {
            property.advert_type = advert_type;
        }
        if let Some(property_type) = changes.property_type {
            property.property_type = property_type;
        }
        if let Some(published_status) = changes.published_status {
            property.published_status = published_status;
        }
        property.updated_at = Utc::now();

        Ok(Some(property.clone()))
    }

    async fn delete_property(
        &self,
        property_id: Uuid,
    ) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;
        let before = tables.properties.len();
        tables.properties.retain(|p| p.id != property_id);
        let removed = tables.properties.len() < before;

        if removed {
            tables.views.retain(|v| v.property_id != property_id);
            tables.viewers.retain(|(id, _)| *id != property_id);
        }
        Ok(removed)
    }

    async fn update_property_images(
        &self,
        property_id: Uuid,
        images: PropertyImages,
    ) -> Result<Option<Property>, DbError> {
        let mut tables = self.tables.write().await;
        let Some(property) = tables.properties.iter_mut().find(|p| p.id == property_id) else {
            return Ok(None);
        };

        let PropertyImages { cover_photo, photo1, photo2, photo3, photo4 } = images;
        if cover_photo.is_some() {
            property.cover_photo = cover_photo;
        }
        if photo1.is_some() {
            property.photo1 = photo1;
        }
        if photo2.is_some() {
            property.photo2 = photo2;
        }
        if photo3.is_some() {
            property.photo3 = photo3;
        }
        if photo4.is_some() {
            property.photo4 = photo4;
        }
        property.updated_at = Utc::now();

        Ok(Some(property.clone()))
    }

    async fn record_view(
        &self,
        property_id: Uuid,
        ip: &str,
    ) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;
        let Tables { properties, views, viewers } = &mut *tables;

        let Some(property) = properties.iter_mut().find(|p| p.id == property_id) else {
            return Ok(false);
        };
        if !viewers.insert((property_id, ip.to_string())) {
            return Ok(false);
        }

        property.views += 1;
        views.push(PropertyView {
            id: Uuid::new_v4(),
            property_id,
            ip: ip.to_string(),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn get_property_views(&self) -> Result<Vec<PropertyView>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.views.iter().rev().cloned().collect())
    }

    async fn search_properties(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<Property>, DbError> {
        let tables = self.tables.read().await;
        let matching = tables
            .properties
            .iter()
            .filter(|p| criteria.matches(p))
            .cloned()
            .collect();

        Ok(sorted(matching, Ordering::NewestFirst))
    }
}
