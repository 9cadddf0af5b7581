// service/property_service.rs
use std::sync::Arc;

use bigdecimal::BigDecimal;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{propertydb::PropertyExt, DbError},
    dtos::propertydtos::{CreatePropertyDto, ListQueryDto, SearchPropertyDto, UpdatePropertyDto},
    error::ErrorMessage,
    models::propertymodel::{
        ImageSlot, NewProperty, Property, PropertyChanges, PropertyImages, PropertyView,
    },
    service::{
        error::{OwnedAction, ServiceError},
        filters::{ListFilter, SearchCriteria},
    },
    utils::{
        image_utils::MediaStorage,
        slug::{generate_ref_code, unique_slug},
    },
};

/// Attempts at finding a free slug/reference code before giving up.
const CREATE_ATTEMPTS: u32 = 3;

const DEFAULT_POSTAL_CODE: &str = "140";
const DEFAULT_STREET_ADDRESS: &str = "KG8 Avenue";
const DEFAULT_PROPERTY_NUMBER: i32 = 112;

fn default_tax() -> BigDecimal {
    BigDecimal::new(15.into(), 2)
}

#[derive(Debug)]
pub struct ListPage {
    pub properties: Vec<Property>,
    pub page: u32,
    pub limit: usize,
    pub total: i64,
}

pub struct PropertyService {
    db_client: Arc<dyn PropertyExt>,
    media: MediaStorage,
    page_size: usize,
}

impl std::fmt::Debug for PropertyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyService")
            .field("media", &self.media)
            .field("page_size", &self.page_size)
            .finish()
    }
}

/// Only the owner may mutate a listing.
pub fn ensure_owner(property: &Property, user_id: Uuid, action: OwnedAction) -> Result<(), ServiceError> {
    if property.owner_id == user_id {
        return Ok(());
    }

    tracing::warn!(
        "user {} attempted {:?} on property {} owned by {}",
        user_id,
        action,
        property.slug,
        property.owner_id
    );
    Err(ServiceError::NotOwner(action))
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ServiceError> {
    value.ok_or_else(|| ServiceError::field(field, "This field is required."))
}

fn sanitize_description(raw: &str) -> Result<String, ServiceError> {
    let cleaned = ammonia::clean(raw).trim().to_string();
    if cleaned.is_empty() {
        return Err(ServiceError::field("description", "This field may not be blank."));
    }
    Ok(cleaned)
}

impl PropertyService {
    pub fn new(db_client: Arc<dyn PropertyExt>, media: MediaStorage, page_size: usize) -> Self {
        PropertyService {
            db_client,
            media,
            page_size,
        }
    }

    pub fn media(&self) -> &MediaStorage {
        &self.media
    }

    /// Lists every listing, or only `owner`'s when given.
    pub async fn list_properties(
        &self,
        owner: Option<Uuid>,
        query: &ListQueryDto,
    ) -> Result<ListPage, ServiceError> {
        query.validate()?;
        let filter = ListFilter::from_query(query).map_err(ServiceError::Validation)?;

        let page = query.page.unwrap_or(1);
        let limit = query.limit.unwrap_or(self.page_size);

        let properties = self
            .db_client
            .get_properties(owner, &filter, page, limit)
            .await?;
        let total = self.db_client.count_properties(owner, &filter).await?;

        Ok(ListPage {
            properties,
            page,
            limit,
            total,
        })
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Property, ServiceError> {
        self.db_client
            .get_property_by_slug(slug)
            .await?
            .ok_or(ServiceError::PropertyNotFound)
    }

    /// Fetches a listing and counts the view once per client address.
    pub async fn property_detail(&self, slug: &str, client_ip: &str) -> Result<Property, ServiceError> {
        let property = self.find_by_slug(slug).await?;

        if !self.db_client.record_view(property.id, client_ip).await? {
            return Ok(property);
        }

        tracing::debug!("new view on {} from {}", property.slug, client_ip);
        self.db_client
            .get_property_by_id(property.id)
            .await?
            .ok_or(ServiceError::PropertyNotFound)
    }

    pub async fn create_property(
        &self,
        owner: Uuid,
        dto: CreatePropertyDto,
    ) -> Result<Property, ServiceError> {
        dto.validate()?;

        let title = required(dto.title, "title")?;
        let description = sanitize_description(&required(dto.description, "description")?)?;

        let template = NewProperty {
            owner_id: owner,
            title: title.trim().to_string(),
            slug: String::new(),
            ref_code: String::new(),
            description,
            country: required(dto.country, "country")?,
            city: required(dto.city, "city")?,
            postal_code: dto.postal_code.unwrap_or_else(|| DEFAULT_POSTAL_CODE.to_string()),
            street_address: dto
                .street_address
                .unwrap_or_else(|| DEFAULT_STREET_ADDRESS.to_string()),
            property_number: dto.property_number.unwrap_or(DEFAULT_PROPERTY_NUMBER),
            price: required(dto.price, "price")?,
            tax: dto.tax.unwrap_or_else(default_tax),
            plot_area: dto.plot_area.unwrap_or_else(|| BigDecimal::from(0)),
            total_floors: dto.total_floors.unwrap_or(0),
            bedrooms: required(dto.bedrooms, "bedrooms")?,
            bathrooms: required(dto.bathrooms, "bathrooms")?,
            advert_type: required(dto.advert_type, "advert_type")?,
            property_type: required(dto.property_type, "property_type")?,
            published_status: dto.published_status.unwrap_or(false),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let new_property = NewProperty {
                slug: unique_slug(&template.title),
                ref_code: generate_ref_code(),
                ..template.clone()
            };

            match self.db_client.create_property(new_property).await {
                Ok(property) => {
                    tracing::info!("property {} created by {}", property.title, owner);
                    return Ok(property);
                }
                Err(DbError::UniqueViolation(constraint)) if attempt < CREATE_ATTEMPTS => {
                    tracing::debug!("{} collided on attempt {}, retrying", constraint, attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn update_property(
        &self,
        user_id: Uuid,
        slug: &str,
        dto: UpdatePropertyDto,
    ) -> Result<Property, ServiceError> {
        dto.validate()?;

        let property = self.find_by_slug(slug).await?;
        ensure_owner(&property, user_id, OwnedAction::Update)?;

        let mut changes = PropertyChanges::from(dto);
        changes.description = changes
            .description
            .map(|raw| sanitize_description(&raw))
            .transpose()?;
        changes.title = changes.title.map(|title| title.trim().to_string());

        self.db_client
            .update_property(property.id, changes)
            .await?
            .ok_or(ServiceError::PropertyNotFound)
    }

    /// Returns whether a row was actually removed.
    pub async fn delete_property(&self, user_id: Uuid, slug: &str) -> Result<bool, ServiceError> {
        let property = self.find_by_slug(slug).await?;
        ensure_owner(&property, user_id, OwnedAction::Delete)?;

        let deleted = self.db_client.delete_property(property.id).await?;
        if deleted {
            tracing::info!("property {} deleted by {}", property.slug, user_id);
        }
        Ok(deleted)
    }

    /// Stores the uploaded files and points the matching slots at them.
    /// Every file is checked before any is written.
    pub async fn upload_images(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        uploads: Vec<(ImageSlot, Vec<u8>)>,
    ) -> Result<Property, ServiceError> {
        if uploads.is_empty() {
            return Err(ServiceError::field(
                "images",
                ErrorMessage::NoImagesProvided.to_string(),
            ));
        }

        let property = self
            .db_client
            .get_property_by_id(property_id)
            .await?
            .ok_or(ServiceError::PropertyNotFound)?;
        ensure_owner(&property, user_id, OwnedAction::UploadImages)?;

        for (slot, data) in &uploads {
            self.media.validate_image(slot.field_name(), data)?;
        }

        let mut images = PropertyImages::default();
        for (slot, data) in &uploads {
            let url = self.media.save_image(slot.field_name(), data).await?;
            images.set(*slot, url);
        }

        let updated = self
            .db_client
            .update_property_images(property.id, images)
            .await?
            .ok_or(ServiceError::PropertyNotFound)?;

        tracing::info!(
            "{} image(s) uploaded for property {} by {}",
            uploads.len(),
            updated.slug,
            user_id
        );
        Ok(updated)
    }

    pub async fn search(&self, dto: SearchPropertyDto) -> Result<Vec<Property>, ServiceError> {
        dto.validate()?;
        let criteria = SearchCriteria::from_dto(dto)?;

        Ok(self.db_client.search_properties(&criteria).await?)
    }

    pub async fn list_views(&self) -> Result<Vec<PropertyView>, ServiceError> {
        Ok(self.db_client.get_property_views().await?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        db::memorydb::MemoryStore,
        models::propertymodel::AdvertType,
        utils::image_utils::PNG_BYTES,
    };
    use serde_json::json;
    use std::str::FromStr;

    pub(crate) fn create_dto(title: &str, price: &str, bedrooms: i32) -> CreatePropertyDto {
        serde_json::from_value(json!({
            "title": title,
            "description": "Bright corner unit with a balcony",
            "country": "Kenya",
            "city": "Nairobi",
            "price": price,
            "bedrooms": bedrooms,
            "bathrooms": "1",
            "advert_type": "For Sale",
            "property_type": "House",
            "published_status": true
        }))
        .unwrap()
    }

    fn service(media_root: &std::path::Path) -> PropertyService {
        PropertyService::new(
            Arc::new(MemoryStore::new()),
            MediaStorage::new(media_root, "/media", 1),
            10,
        )
    }

    fn search_dto(price: &str, bedrooms: &str) -> SearchPropertyDto {
        SearchPropertyDto {
            advert_type: Some("For Sale".to_string()),
            property_type: Some("House".to_string()),
            price: Some(price.to_string()),
            bedrooms: Some(bedrooms.to_string()),
            bathrooms: Some("0+".to_string()),
            catch_phrase: Some(String::new()),
        }
    }

    #[tokio::test]
    async fn create_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let owner = Uuid::new_v4();

        let property = service
            .create_property(owner, create_dto("Garden Apartment", "100000", 2))
            .await
            .unwrap();

        assert_eq!(property.owner_id, owner);
        assert!(property.slug.starts_with("garden-apartment-"));
        assert_eq!(property.ref_code.len(), 10);
        assert_eq!(property.postal_code, "140");
        assert_eq!(property.street_address, "KG8 Avenue");
        assert_eq!(property.property_number, 112);
        assert_eq!(property.tax, BigDecimal::from_str("0.15").unwrap());
        assert_eq!(property.views, 0);
        assert_eq!(property.final_property_price(), BigDecimal::from(115000));
    }

    #[tokio::test]
    async fn create_with_missing_field_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let mut dto = create_dto("Loft", "50000", 1);
        dto.city = None;
        let err = service.create_property(Uuid::new_v4(), dto).await.unwrap_err();

        match err {
            ServiceError::Validation(errors) => assert!(errors.contains_key("city")),
            other => panic!("unexpected error: {other:?}"),
        }
        let page = service.list_properties(None, &ListQueryDto::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn create_rejects_values_the_columns_cannot_hold() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let mut dto = create_dto("Mansion", "100000000000000000000", 5);
        dto.bathrooms = Some(BigDecimal::from_str("1234.567").unwrap());
        let err = service.create_property(Uuid::new_v4(), dto).await.unwrap_err();

        match err {
            ServiceError::Validation(errors) => {
                assert!(errors.contains_key("price"));
                assert!(errors.contains_key("bathrooms"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let page = service.list_properties(None, &ListQueryDto::default()).await.unwrap();
        assert_eq!(page.total, 0);

        let mut dto = create_dto("Mansion", "999999999999.99", 5);
        dto.bathrooms = Some(BigDecimal::from_str("2.50").unwrap());
        let property = service.create_property(Uuid::new_v4(), dto).await.unwrap();
        assert_eq!(property.bathrooms, BigDecimal::from_str("2.5").unwrap());
    }

    #[tokio::test]
    async fn create_sanitizes_description() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let mut dto = create_dto("Loft", "50000", 1);
        dto.description = Some("Open plan <script>alert(1)</script><b>loft</b>".to_string());
        let property = service.create_property(Uuid::new_v4(), dto).await.unwrap();
        assert_eq!(property.description, "Open plan <b>loft</b>");

        let mut dto = create_dto("Loft", "50000", 1);
        dto.description = Some("<script>alert(1)</script>".to_string());
        assert!(matches!(
            service.create_property(Uuid::new_v4(), dto).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn missing_slug_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let user = Uuid::new_v4();

        assert!(matches!(
            service.property_detail("nope", "127.0.0.1").await,
            Err(ServiceError::PropertyNotFound)
        ));
        assert!(matches!(
            service.update_property(user, "nope", UpdatePropertyDto::default()).await,
            Err(ServiceError::PropertyNotFound)
        ));
        assert!(matches!(
            service.delete_property(user, "nope").await,
            Err(ServiceError::PropertyNotFound)
        ));
    }

    #[tokio::test]
    async fn non_owner_cannot_mutate() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();

        let property = service
            .create_property(owner, create_dto("Cottage", "80000", 2))
            .await
            .unwrap();

        let update = UpdatePropertyDto {
            title: Some("Mine now".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update_property(intruder, &property.slug, update).await,
            Err(ServiceError::NotOwner(OwnedAction::Update))
        ));
        assert!(matches!(
            service.delete_property(intruder, &property.slug).await,
            Err(ServiceError::NotOwner(OwnedAction::Delete))
        ));
        assert!(matches!(
            service
                .upload_images(intruder, property.id, vec![(ImageSlot::CoverPhoto, PNG_BYTES.to_vec())])
                .await,
            Err(ServiceError::NotOwner(OwnedAction::UploadImages))
        ));

        let unchanged = service.property_detail(&property.slug, "10.0.0.1").await.unwrap();
        assert_eq!(unchanged.title, "Cottage");
        assert!(unchanged.cover_photo.is_none());
    }

    #[tokio::test]
    async fn owner_updates_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let owner = Uuid::new_v4();

        let property = service
            .create_property(owner, create_dto("Cottage", "80000", 2))
            .await
            .unwrap();

        let update = UpdatePropertyDto {
            price: Some(BigDecimal::from(95000)),
            advert_type: Some(AdvertType::ForRent),
            ..Default::default()
        };
        let updated = service.update_property(owner, &property.slug, update).await.unwrap();
        assert_eq!(updated.price, BigDecimal::from(95000));
        assert_eq!(updated.advert_type, AdvertType::ForRent);
        assert_eq!(updated.slug, property.slug);
        assert_eq!(updated.title, "Cottage");

        assert!(service.delete_property(owner, &property.slug).await.unwrap());
        assert!(matches!(
            service.delete_property(owner, &property.slug).await,
            Err(ServiceError::PropertyNotFound)
        ));
    }

    #[tokio::test]
    async fn views_are_counted_once_per_ip() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let property = service
            .create_property(Uuid::new_v4(), create_dto("Bungalow", "70000", 3))
            .await
            .unwrap();

        assert_eq!(service.property_detail(&property.slug, "203.0.113.7").await.unwrap().views, 1);
        assert_eq!(service.property_detail(&property.slug, "203.0.113.7").await.unwrap().views, 1);
        assert_eq!(service.property_detail(&property.slug, "198.51.100.9").await.unwrap().views, 2);

        let views = service.list_views().await.unwrap();
        assert_eq!(views.len(), 2);
        assert!(views.iter().all(|v| v.property_id == property.id));
    }

    #[tokio::test]
    async fn search_applies_price_floor() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let owner = Uuid::new_v4();

        service.create_property(owner, create_dto("Starter", "90000", 1)).await.unwrap();
        let family = service.create_property(owner, create_dto("Family", "150000", 3)).await.unwrap();

        let results = service.search(search_dto("$100,000+", "0+")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, family.id);

        let everything = service.search(search_dto("Any", "0+")).await.unwrap();
        assert_eq!(everything.len(), 2);
        assert_eq!(everything[0].id, family.id);

        let roomy = service.search(search_dto("Any", "2+")).await.unwrap();
        assert!(roomy.iter().all(|p| p.bedrooms >= 2));
        assert_eq!(roomy.len(), 1);
    }

    #[tokio::test]
    async fn search_rejects_unknown_bucket_and_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        assert!(matches!(
            service.search(search_dto("$5", "0+")).await,
            Err(ServiceError::UnknownBucket(_))
        ));

        let mut dto = search_dto("Any", "0+");
        dto.catch_phrase = None;
        assert!(matches!(service.search(dto).await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn list_scopes_to_owner_and_paginates() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let agent = Uuid::new_v4();

        for i in 0..3 {
            service
                .create_property(agent, create_dto(&format!("Unit {i}"), "1000", 1))
                .await
                .unwrap();
        }
        service
            .create_property(Uuid::new_v4(), create_dto("Elsewhere", "1000", 1))
            .await
            .unwrap();

        let query = ListQueryDto {
            limit: Some(2),
            ..Default::default()
        };
        let all = service.list_properties(None, &query).await.unwrap();
        assert_eq!(all.total, 4);
        assert_eq!(all.properties.len(), 2);
        assert_eq!(all.page, 1);

        let mine = service.list_properties(Some(agent), &ListQueryDto::default()).await.unwrap();
        assert_eq!(mine.total, 3);
        assert_eq!(mine.limit, 10);
        assert!(mine.properties.iter().all(|p| p.owner_id == agent));

        let bad = ListQueryDto {
            price: Some("lots".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.list_properties(None, &bad).await,
            Err(ServiceError::Validation(_))
        ));

        let last = ListQueryDto {
            page: Some(2),
            limit: Some(3),
            ..Default::default()
        };
        let second = service.list_properties(None, &last).await.unwrap();
        assert_eq!(second.page, 2);
        assert_eq!(second.properties.len(), 1);

        let beyond = ListQueryDto {
            page: Some(u32::MAX),
            ..Default::default()
        };
        let empty = service.list_properties(None, &beyond).await.unwrap();
        assert_eq!(empty.page, u32::MAX);
        assert!(empty.properties.is_empty());
    }

    #[tokio::test]
    async fn upload_replaces_only_given_slots() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let owner = Uuid::new_v4();
        let property = service
            .create_property(owner, create_dto("Villa", "300000", 4))
            .await
            .unwrap();

        let first = service
            .upload_images(owner, property.id, vec![(ImageSlot::CoverPhoto, PNG_BYTES.to_vec())])
            .await
            .unwrap();
        let cover = first.cover_photo.clone().unwrap();
        assert!(cover.starts_with("/media/properties/"));

        let second = service
            .upload_images(owner, property.id, vec![(ImageSlot::Photo2, PNG_BYTES.to_vec())])
            .await
            .unwrap();
        assert_eq!(second.cover_photo, Some(cover));
        assert!(second.photo2.is_some());
        assert!(second.photo1.is_none());
    }

    #[tokio::test]
    async fn upload_rejects_empty_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let owner = Uuid::new_v4();
        let property = service
            .create_property(owner, create_dto("Villa", "300000", 4))
            .await
            .unwrap();

        assert!(matches!(
            service.upload_images(owner, property.id, Vec::new()).await,
            Err(ServiceError::Validation(_))
        ));

        let uploads = vec![
            (ImageSlot::CoverPhoto, PNG_BYTES.to_vec()),
            (ImageSlot::Photo1, b"plain text".to_vec()),
        ];
        assert!(matches!(
            service.upload_images(owner, property.id, uploads).await,
            Err(ServiceError::Image(_))
        ));
        assert!(!dir.path().join("properties").exists());

        assert!(matches!(
            service
                .upload_images(owner, Uuid::new_v4(), vec![(ImageSlot::Photo1, PNG_BYTES.to_vec())])
                .await,
            Err(ServiceError::PropertyNotFound)
        ));
    }
}
