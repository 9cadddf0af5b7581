use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "advert_type", rename_all = "snake_case")]
pub enum AdvertType {
    #[serde(rename = "For Sale")]
    ForSale,
    #[serde(rename = "For Rent")]
    ForRent,
    #[serde(rename = "Auction")]
    Auction,
}

impl AdvertType {
    pub const ALL: [AdvertType; 3] = [AdvertType::ForSale, AdvertType::ForRent, AdvertType::Auction];

    pub fn label(&self) -> &'static str {
        match self {
            AdvertType::ForSale => "For Sale",
            AdvertType::ForRent => "For Rent",
            AdvertType::Auction => "Auction",
        }
    }

    /// Case-insensitive lookup by display label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(label.trim()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "property_type", rename_all = "snake_case")]
pub enum PropertyType {
    House,
    Apartment,
    Office,
    Warehouse,
    Commercial,
    Other,
}

impl PropertyType {
    pub const ALL: [PropertyType; 6] = [
        PropertyType::House,
        PropertyType::Apartment,
        PropertyType::Office,
        PropertyType::Warehouse,
        PropertyType::Commercial,
        PropertyType::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PropertyType::House => "House",
            PropertyType::Apartment => "Apartment",
            PropertyType::Office => "Office",
            PropertyType::Warehouse => "Warehouse",
            PropertyType::Commercial => "Commercial",
            PropertyType::Other => "Other",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(label.trim()))
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Property {
    pub id: Uuid,
    pub owner_id: Uuid,

    pub title: String,
    pub slug: String,
    pub ref_code: String,
    pub description: String,

    // Location
    pub country: String,
    pub city: String,
    pub postal_code: String,
    pub street_address: String,
    pub property_number: i32,

    // Pricing
    pub price: BigDecimal,
    pub tax: BigDecimal,

    // Layout
    pub plot_area: BigDecimal,
    pub total_floors: i32,
    pub bedrooms: i32,
    pub bathrooms: BigDecimal,
    pub advert_type: AdvertType,
    pub property_type: PropertyType,

    // Attachments (public URLs)
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

impl Property {
    /// Price including tax, rounded to cents.
    pub fn final_property_price(&self) -> BigDecimal {
        let tax_amount = &self.price * &self.tax;
        (&self.price + tax_amount).round(2)
    }
}

/// A fully resolved row ready to be inserted. Defaults are applied before
/// this point.
#[derive(Debug, Clone)]
pub struct NewProperty {
    pub owner_id: Uuid,
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
    pub plot_area: BigDecimal,
    pub total_floors: i32,
    pub bedrooms: i32,
    pub bathrooms: BigDecimal,
    pub advert_type: AdvertType,
    pub property_type: PropertyType,
    pub published_status: bool,
}

/// Field-by-field changes; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct PropertyChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub street_address: Option<String>,
    pub property_number: Option<i32>,
    pub price: Option<BigDecimal>,
    pub tax: Option<BigDecimal>,
    pub plot_area: Option<BigDecimal>,
    pub total_floors: Option<i32>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<BigDecimal>,
    pub advert_type: Option<AdvertType>,
    pub property_type: Option<PropertyType>,
    pub published_status: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ImageSlot {
    CoverPhoto,
    Photo1,
    Photo2,
    Photo3,
    Photo4,
}

impl ImageSlot {
    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "cover_photo" => Some(ImageSlot::CoverPhoto),
            "photo1" => Some(ImageSlot::Photo1),
            "photo2" => Some(ImageSlot::Photo2),
            "photo3" => Some(ImageSlot::Photo3),
            "photo4" => Some(ImageSlot::Photo4),
            _ => None,
        }
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            ImageSlot::CoverPhoto => "cover_photo",
            ImageSlot::Photo1 => "photo1",
            ImageSlot::Photo2 => "photo2",
            ImageSlot::Photo3 => "photo3",
            ImageSlot::Photo4 => "photo4",
        }
    }
}

/// New attachment URLs. Slots left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyImages {
    pub cover_photo: Option<String>,
    pub photo1: Option<String>,
    pub photo2: Option<String>,
    pub photo3: Option<String>,
    pub photo4: Option<String>,
}

impl PropertyImages {
    pub fn set(&mut self, slot: ImageSlot, url: String) {
        match slot {
            ImageSlot::CoverPhoto => self.cover_photo = Some(url),
            ImageSlot::Photo1 => self.photo1 = Some(url),
            ImageSlot::Photo2 => self.photo2 = Some(url),
            ImageSlot::Photo3 => self.photo3 = Some(url),
            ImageSlot::Photo4 => self.photo4 = Some(url),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PropertyView {
    pub id: Uuid,
    pub property_id: Uuid,
    pub ip: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn advert_type_labels_match_case_insensitively() {
        assert_eq!(AdvertType::from_label("for sale"), Some(AdvertType::ForSale));
        assert_eq!(AdvertType::from_label("FOR RENT"), Some(AdvertType::ForRent));
        assert_eq!(AdvertType::from_label("auction "), Some(AdvertType::Auction));
        assert_eq!(AdvertType::from_label("for_sale"), None);
    }

    #[test]
    fn property_type_serializes_as_label() {
        let json = serde_json::to_string(&PropertyType::Apartment).unwrap();
        assert_eq!(json, "\"Apartment\"");
        let parsed: AdvertType = serde_json::from_str("\"For Rent\"").unwrap();
        assert_eq!(parsed, AdvertType::ForRent);
    }

    #[test]
    fn image_slot_field_names() {
        assert_eq!(ImageSlot::from_field_name("cover_photo"), Some(ImageSlot::CoverPhoto));
        assert_eq!(ImageSlot::from_field_name("photo4"), Some(ImageSlot::Photo4));
        assert_eq!(ImageSlot::from_field_name("photo5"), None);
    }

    #[test]
    fn final_price_includes_tax() {
        let now = Utc::now();
        let property = Property {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Two bedroom flat".to_string(),
            slug: "two-bedroom-flat-abc123".to_string(),
            ref_code: "ABCDEFGHIJ".to_string(),
            description: String::new(),
            country: "KE".to_string(),
            city: "Nairobi".to_string(),
            postal_code: "140".to_string(),
            street_address: "KG8 Avenue".to_string(),
            property_number: 112,
            price: BigDecimal::from(100000),
            tax: BigDecimal::from_str("0.15").unwrap(),
            plot_area: BigDecimal::from(0),
            total_floors: 0,
            bedrooms: 2,
            bathrooms: BigDecimal::from(1),
            advert_type: AdvertType::ForSale,
            property_type: PropertyType::Apartment,
            cover_photo: None,
            photo1: None,
            photo2: None,
            photo3: None,
            photo4: None,
            published_status: true,
            views: 0,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(property.final_property_price(), BigDecimal::from(115000));
    }
}
