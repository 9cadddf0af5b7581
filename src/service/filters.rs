// service/filters.rs
use std::str::FromStr;

use bigdecimal::BigDecimal;
use thiserror::Error;

use crate::{
    dtos::propertydtos::{ListQueryDto, SearchPropertyDto},
    error::FieldErrors,
    models::propertymodel::{AdvertType, Property, PropertyType},
};

#[derive(Debug, Error, PartialEq)]
#[error("\"{label}\" is not a valid choice for {field}")]
pub struct UnknownBucket {
    pub field: &'static str,
    pub label: String,
}

/// Case-insensitive exact match against an enumerated column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChoiceFilter<T> {
    Unset,
    Exact(T),
    /// The caller named a value outside the enumeration; nothing matches.
    NoMatch,
}

impl<T: Copy + PartialEq> ChoiceFilter<T> {
    fn resolve(raw: &str, lookup: impl Fn(&str) -> Option<T>) -> Self {
        match lookup(raw) {
            Some(value) => ChoiceFilter::Exact(value),
            None => ChoiceFilter::NoMatch,
        }
    }

    fn optional(raw: Option<&str>, lookup: impl Fn(&str) -> Option<T>) -> Self {
        match non_empty(raw) {
            Some(raw) => Self::resolve(raw, lookup),
            None => ChoiceFilter::Unset,
        }
    }

    pub fn matches(&self, value: T) -> bool {
        match self {
            ChoiceFilter::Unset => true,
            ChoiceFilter::Exact(expected) => *expected == value,
            ChoiceFilter::NoMatch => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ordering {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl Ordering {
    /// Unknown orderings fall back to the default instead of failing.
    pub fn from_param(raw: Option<&str>) -> Self {
        match non_empty(raw) {
            Some("created_at") => Ordering::OldestFirst,
            _ => Ordering::NewestFirst,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Ordering::NewestFirst => "created_at DESC",
            Ordering::OldestFirst => "created_at ASC",
        }
    }
}

/// Optional, conjunctive filters of the list endpoints.
#[derive(Debug, Clone)]
pub struct ListFilter {
    pub advert_type: ChoiceFilter<AdvertType>,
    pub property_type: ChoiceFilter<PropertyType>,
    pub price: Option<BigDecimal>,
    pub price_gt: Option<BigDecimal>,
    pub price_lt: Option<BigDecimal>,
    /// Each term must appear in the country or the city.
    pub search_terms: Vec<String>,
    pub ordering: Ordering,
}

impl Default for ListFilter {
    fn default() -> Self {
        ListFilter {
            advert_type: ChoiceFilter::Unset,
            property_type: ChoiceFilter::Unset,
            price: None,
            price_gt: None,
            price_lt: None,
            search_terms: Vec::new(),
            ordering: Ordering::default(),
        }
    }
}

impl ListFilter {
    pub fn from_query(query: &ListQueryDto) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let price = parse_number("price", query.price.as_deref(), &mut errors);
        let price_gt = parse_number("price_gt", query.price_gt.as_deref(), &mut errors);
        let price_lt = parse_number("price_lt", query.price_lt.as_deref(), &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ListFilter {
            advert_type: ChoiceFilter::optional(query.advert_type.as_deref(), AdvertType::from_label),
            property_type: ChoiceFilter::optional(query.property_type.as_deref(), PropertyType::from_label),
            price,
            price_gt,
            price_lt,
            search_terms: split_search_terms(query.search.as_deref().unwrap_or_default()),
            ordering: Ordering::from_param(query.ordering.as_deref()),
        })
    }

    pub fn matches(&self, property: &Property) -> bool {
        self.advert_type.matches(property.advert_type)
            && self.property_type.matches(property.property_type)
            && self.price.as_ref().map_or(true, |p| property.price == *p)
            && self.price_gt.as_ref().map_or(true, |p| property.price > *p)
            && self.price_lt.as_ref().map_or(true, |p| property.price < *p)
            && self.search_terms.iter().all(|term| {
                contains_ci(&property.country, term) || contains_ci(&property.city, term)
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceBucket {
    From0,
    From50k,
    From100k,
    From200k,
    From400k,
    From600k,
    Any,
}

impl PriceBucket {
    const TABLE: [(&'static str, PriceBucket); 7] = [
        ("$0+", PriceBucket::From0),
        ("$50,000+", PriceBucket::From50k),
        ("$100,000+", PriceBucket::From100k),
        ("$200,000+", PriceBucket::From200k),
        ("$400,000+", PriceBucket::From400k),
        ("$600,000+", PriceBucket::From600k),
        ("Any", PriceBucket::Any),
    ];

    /// `None` disables the price filter.
    pub fn floor(&self) -> Option<BigDecimal> {
        let floor: i64 = match self {
            PriceBucket::From0 => 0,
            PriceBucket::From50k => 50_000,
            PriceBucket::From100k => 100_000,
            PriceBucket::From200k => 200_000,
            PriceBucket::From400k => 400_000,
            PriceBucket::From600k => 600_000,
            PriceBucket::Any => return None,
        };
        Some(BigDecimal::from(floor))
    }
}

impl FromStr for PriceBucket {
    type Err = UnknownBucket;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        lookup(&Self::TABLE, "price", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BedroomBucket {
    From0,
    From1,
    From2,
    From3,
    From4,
    From5,
}

impl BedroomBucket {
    const TABLE: [(&'static str, BedroomBucket); 6] = [
        ("0+", BedroomBucket::From0),
        ("1+", BedroomBucket::From1),
        ("2+", BedroomBucket::From2),
        ("3+", BedroomBucket::From3),
        ("4+", BedroomBucket::From4),
        ("5+", BedroomBucket::From5),
    ];

    pub fn floor(&self) -> i32 {
        match self {
            BedroomBucket::From0 => 0,
            BedroomBucket::From1 => 1,
            BedroomBucket::From2 => 2,
            BedroomBucket::From3 => 3,
            BedroomBucket::From4 => 4,
            BedroomBucket::From5 => 5,
        }
    }
}

impl FromStr for BedroomBucket {
    type Err = UnknownBucket;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        lookup(&Self::TABLE, "bedrooms", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BathroomBucket {
    From0,
    From1,
    From2,
    From3,
    From4,
}

impl BathroomBucket {
    const TABLE: [(&'static str, BathroomBucket); 5] = [
        ("0+", BathroomBucket::From0),
        ("1+", BathroomBucket::From1),
        ("2+", BathroomBucket::From2),
        ("3+", BathroomBucket::From3),
        ("4+", BathroomBucket::From4),
    ];

    pub fn floor(&self) -> BigDecimal {
        let floor: i64 = match self {
            BathroomBucket::From0 => 0,
            BathroomBucket::From1 => 1,
            BathroomBucket::From2 => 2,
            BathroomBucket::From3 => 3,
            BathroomBucket::From4 => 4,
        };
        BigDecimal::from(floor)
    }
}

impl FromStr for BathroomBucket {
    type Err = UnknownBucket;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        lookup(&Self::TABLE, "bathrooms", label)
    }
}

/// Structured search over published listings.
#[derive(Debug, Clone)]
pub struct SearchCriteria {
    pub advert_type: ChoiceFilter<AdvertType>,
    pub property_type: ChoiceFilter<PropertyType>,
    pub price: PriceBucket,
    pub bedrooms: BedroomBucket,
    pub bathrooms: BathroomBucket,
    pub catch_phrase: String,
}

impl SearchCriteria {
    /// Expects a payload whose required fields were already checked.
    pub fn from_dto(dto: SearchPropertyDto) -> Result<Self, UnknownBucket> {
        let price = dto.price.unwrap_or_default().parse::<PriceBucket>()?;
        let bedrooms = dto.bedrooms.unwrap_or_default().parse::<BedroomBucket>()?;
        let bathrooms = dto.bathrooms.unwrap_or_default().parse::<BathroomBucket>()?;

        Ok(SearchCriteria {
            advert_type: ChoiceFilter::resolve(&dto.advert_type.unwrap_or_default(), AdvertType::from_label),
            property_type: ChoiceFilter::resolve(&dto.property_type.unwrap_or_default(), PropertyType::from_label),
            price,
            bedrooms,
            bathrooms,
            catch_phrase: dto.catch_phrase.unwrap_or_default(),
        })
    }

    pub fn matches(&self, property: &Property) -> bool {
        property.published_status
            && self.advert_type.matches(property.advert_type)
            && self.property_type.matches(property.property_type)
            && self.price.floor().map_or(true, |floor| property.price >= floor)
            && property.bedrooms >= self.bedrooms.floor()
            && property.bathrooms >= self.bathrooms.floor()
            && contains_ci(&property.description, &self.catch_phrase)
    }
}

fn lookup<T: Copy>(table: &[(&'static str, T)], field: &'static str, label: &str) -> Result<T, UnknownBucket> {
    table
        .iter()
        .find(|(key, _)| *key == label)
        .map(|(_, bucket)| *bucket)
        .ok_or_else(|| UnknownBucket {
            field,
            label: label.to_string(),
        })
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_number(field: &str, raw: Option<&str>, errors: &mut FieldErrors) -> Option<BigDecimal> {
    let raw = non_empty(raw)?;
    match BigDecimal::from_str(raw) {
        Ok(value) => Some(value),
        Err(_) => {
            errors.insert(field.to_string(), vec!["Enter a number.".to_string()]);
            None
        }
    }
}

fn split_search_terms(raw: &str) -> Vec<String> {
    raw.replace('\0', "")
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
