use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::propertymodel::{
    AdvertType, Property, PropertyChanges, PropertyType, PropertyView,
};

fn decimal_error(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Non-negative and fits `NUMERIC(max_digits, places)`.
pub fn validate_decimal(value: &BigDecimal, max_digits: i64, places: i64) -> Result<(), ValidationError> {
    if *value < BigDecimal::from(0) {
        return Err(decimal_error(
            "non_negative",
            "Ensure this value is greater than or equal to 0.".to_string(),
        ));
    }

    let normalized = value.normalized();
    let (_, scale) = normalized.as_bigint_and_exponent();
    let decimal_places = scale.max(0);
    let whole_digits = normalized.digits() as i64 - scale;

    if decimal_places > places {
        return Err(decimal_error(
            "max_decimal_places",
            format!("Ensure that there are no more than {} decimal places.", places),
        ));
    }
    if whole_digits > max_digits - places {
        return Err(decimal_error(
            "max_whole_digits",
            format!(
                "Ensure that there are no more than {} digits before the decimal point.",
                max_digits - places
            ),
        ));
    }
    Ok(())
}

pub fn validate_price(value: &BigDecimal) -> Result<(), ValidationError> {
    validate_decimal(value, 14, 2)
}

pub fn validate_tax(value: &BigDecimal) -> Result<(), ValidationError> {
    validate_decimal(value, 6, 2)
}

pub fn validate_plot_area(value: &BigDecimal) -> Result<(), ValidationError> {
    validate_decimal(value, 10, 2)
}

pub fn validate_bathrooms(value: &BigDecimal) -> Result<(), ValidationError> {
    validate_decimal(value, 4, 1)
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePropertyDto {
    #[validate(required, length(min = 1, max = 250, message = "Title must be between 1 and 250 characters"))]
    pub title: Option<String>,

    #[validate(required)]
    pub description: Option<String>,

    // Location
    #[validate(required, length(min = 2, max = 100, message = "Country must be between 2 and 100 characters"))]
    pub country: Option<String>,

    #[validate(required, length(min = 1, max = 180, message = "City must be between 1 and 180 characters"))]
    pub city: Option<String>,

    #[validate(length(max = 100, message = "Postal code must be at most 100 characters"))]
    pub postal_code: Option<String>,

    #[validate(length(max = 150, message = "Street address must be at most 150 characters"))]
    pub street_address: Option<String>,

    #[validate(range(min = 1, message = "Property number must be at least 1"))]
    pub property_number: Option<i32>,

    // Pricing
    #[validate(required, custom = "validate_price")]
    pub price: Option<BigDecimal>,

    #[validate(custom = "validate_tax")]
    pub tax: Option<BigDecimal>,

    // Layout
    #[validate(custom = "validate_plot_area")]
    pub plot_area: Option<BigDecimal>,

    #[validate(range(min = 0, message = "Total floors cannot be negative"))]
    pub total_floors: Option<i32>,

    #[validate(required, range(min = 0, message = "Bedrooms cannot be negative"))]
    pub bedrooms: Option<i32>,

    #[validate(required, custom = "validate_bathrooms")]
    pub bathrooms: Option<BigDecimal>,

    #[validate(required)]
    pub advert_type: Option<AdvertType>,

    #[validate(required)]
    pub property_type: Option<PropertyType>,

    pub published_status: Option<bool>,
}

/// Partial update. Same rules as create, nothing required.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct UpdatePropertyDto {
    #[validate(length(min = 1, max = 250, message = "Title must be between 1 and 250 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    #[validate(length(min = 2, max = 100, message = "Country must be between 2 and 100 characters"))]
    pub country: Option<String>,

    #[validate(length(min = 1, max = 180, message = "City must be between 1 and 180 characters"))]
    pub city: Option<String>,

    #[validate(length(max = 100, message = "Postal code must be at most 100 characters"))]
    pub postal_code: Option<String>,

    #[validate(length(max = 150, message = "Street address must be at most 150 characters"))]
    pub street_address: Option<String>,

    #[validate(range(min = 1, message = "Property number must be at least 1"))]
    pub property_number: Option<i32>,

    #[validate(custom = "validate_price")]
    pub price: Option<BigDecimal>,

    #[validate(custom = "validate_tax")]
    pub tax: Option<BigDecimal>,

    #[validate(custom = "validate_plot_area")]
    pub plot_area: Option<BigDecimal>,

    #[validate(range(min = 0, message = "Total floors cannot be negative"))]
    pub total_floors: Option<i32>,

    #[validate(range(min = 0, message = "Bedrooms cannot be negative"))]
    pub bedrooms: Option<i32>,

    #[validate(custom = "validate_bathrooms")]
    pub bathrooms: Option<BigDecimal>,

    pub advert_type: Option<AdvertType>,
    pub property_type: Option<PropertyType>,
    pub published_status: Option<bool>,
}

impl From<UpdatePropertyDto> for PropertyChanges {
    fn from(dto: UpdatePropertyDto) -> Self {
        PropertyChanges {
            title: dto.title,
            description: dto.description,
            country: dto.country,
            city: dto.city,
            postal_code: dto.postal_code,
            street_address: dto.street_address,
            property_number: dto.property_number,
            price: dto.price,
            tax: dto.tax,
            plot_area: dto.plot_area,
            total_floors: dto.total_floors,
            bedrooms: dto.bedrooms,
            bathrooms: dto.bathrooms,
            advert_type: dto.advert_type,
            property_type: dto.property_type,
            published_status: dto.published_status,
        }
    }
}

/// Query string of the list endpoints. Numbers stay strings until the
/// filter layer parses them so a bad value becomes a field error.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct ListQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,

    pub advert_type: Option<String>,
    pub property_type: Option<String>,
    pub price: Option<String>,
    pub price_gt: Option<String>,
    pub price_lt: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct SearchPropertyDto {
    #[validate(required)]
    pub advert_type: Option<String>,
    #[validate(required)]
    pub property_type: Option<String>,
    #[validate(required)]
    pub price: Option<String>,
    #[validate(required)]
    pub bedrooms: Option<String>,
    #[validate(required)]
    pub bathrooms: Option<String>,
    #[validate(required)]
    pub catch_phrase: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PropertyDto {
    pub id: Uuid,
    pub owner: Uuid,
    pub title: String,
    pub slug: String,
    pub ref_code: String,
    pub description: String,
    pub country: String,
    pub city: String,
    pub postal_code: String,
    pub street_address: String,
    pub property_number: i32,
    pub price: BigDecimal,
    pub tax: BigDecimal,
    pub final_property_price: BigDecimal,
    pub plot_area: BigDecimal,
    pub total_floors: i32,
    pub bedrooms: i32,
    pub bathrooms: BigDecimal,
    pub advert_type: AdvertType,
    pub property_type: PropertyType,
    pub cover_photo: Option<String>,
    pub photo1: Option<String>,
    pub photo2: Option<String>,
    pub photo3: Option<String>,
    pub photo4: Option<String>,
    pub published_status: bool,
    pub views: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PropertyDto {
    pub fn from_property(property: &Property) -> Self {
        Self {
            id: property.id,
            owner: property.owner_id,
            title: property.title.clone(),
            slug: property.slug.clone(),
            ref_code: property.ref_code.clone(),
            description: property.description.clone(),
            country: property.country.clone(),
            city: property.city.clone(),
            postal_code: property.postal_code.clone(),
            street_address: property.street_address.clone(),
            property_number: property.property_number,
            price: property.price.clone(),
            tax: property.tax.clone(),
            final_property_price: property.final_property_price(),
            plot_area: property.plot_area.clone(),
            total_floors: property.total_floors,
            bedrooms: property.bedrooms,
            bathrooms: property.bathrooms.clone(),
            advert_type: property.advert_type,
            property_type: property.property_type,
            cover_photo: property.cover_photo.clone(),
            photo1: property.photo1.clone(),
            photo2: property.photo2.clone(),
            photo3: property.photo3.clone(),
            photo4: property.photo4.clone(),
            published_status: property.published_status,
            views: property.views,
            created_at: property.created_at,
            updated_at: property.updated_at,
        }
    }

    pub fn from_properties(properties: &[Property]) -> Vec<Self> {
        properties.iter().map(Self::from_property).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PropertyData {
    pub property: PropertyDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PropertyResponseDto {
    pub status: String,
    pub data: PropertyData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: usize,
    pub total: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PropertyListData {
    pub properties: Vec<PropertyDto>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PropertyListResponseDto {
    pub status: String,
    pub data: PropertyListData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchData {
    pub properties: Vec<PropertyDto>,
    pub results: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponseDto {
    pub status: String,
    pub data: SearchData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ViewData {
    pub views: Vec<PropertyView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ViewListResponseDto {
    pub status: String,
    pub data: ViewData,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}
