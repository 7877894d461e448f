use crate::domain::model::{FeedbackRecord, ItemRecord, ParsedEvent, UserRecord};
use crate::utils::error::{EtlError, Result};
use serde_json::{Map, Value};
use std::collections::HashSet;

pub const CATEGORY_RENTAL: &str = "rental";
pub const CATEGORY_SALE: &str = "sale";

/// Weight attached to an event type. Unknown types count as a plain view.
pub fn feedback_weight(event_name: &str) -> f64 {
    match event_name {
        "view_listing" => 1.0,
        "contact_agent" => 3.0,
        _ => 1.0,
    }
}

fn positive(price: Option<f64>) -> Option<f64> {
    price.filter(|p| *p > 0.0)
}

/// One feedback row per event with a house_id, in input order.
pub fn build_feedback(events: &[ParsedEvent]) -> Result<Vec<FeedbackRecord>> {
    let feedback: Vec<FeedbackRecord> = events
        .iter()
        .filter_map(|event| {
            let item_id = event.house_id.as_ref()?;
            let feedback_type = event.raw.event_name.clone().unwrap_or_default();
            let weight = feedback_weight(&feedback_type);
            Some(FeedbackRecord {
                comment: format!("weight:{:.1}", weight),
                feedback_type,
                user_id: event.raw.user_id.clone().unwrap_or_default(),
                item_id: item_id.clone(),
                timestamp: event.timestamp,
            })
        })
        .collect();

    if feedback.is_empty() {
        return Err(EtlError::NoItemData);
    }
    Ok(feedback)
}

/// Numeric features of a listing as a compact JSON object.
pub fn numeric_features(event: &ParsedEvent) -> String {
    let mut features = Map::new();
    if let Some(rent) = positive(event.rent_price) {
        features.insert("rent_price".to_string(), Value::from(rent));
    }
    if let Some(sale) = positive(event.sale_price) {
        features.insert("sale_price".to_string(), Value::from(sale));
    }
    Value::Object(features).to_string()
}

fn item_from_event(item_id: &str, event: &ParsedEvent) -> ItemRecord {
    let mut categories = Vec::new();
    if positive(event.rent_price).is_some() {
        categories.push(CATEGORY_RENTAL);
    }
    if positive(event.sale_price).is_some() {
        categories.push(CATEGORY_SALE);
    }

    let mut labels = Vec::new();
    if let Some(estate) = &event.estate_name {
        labels.push(format!("estate:{}", estate));
    }
    if let Some(region) = &event.region_name {
        labels.push(format!("region:{}", region));
    }

    ItemRecord {
        item_id: item_id.to_string(),
        timestamp: event.timestamp,
        labels: labels.join("|"),
        categories: categories.join("|"),
        comment: numeric_features(event),
    }
}

/// One item per house_id, taken from its first occurrence.
pub fn build_items(events: &[ParsedEvent]) -> Result<Vec<ItemRecord>> {
    let mut seen = HashSet::new();
    let items: Vec<ItemRecord> = events
        .iter()
        .filter_map(|event| {
            let item_id = event.house_id.as_deref()?;
            seen.insert(item_id)
                .then(|| item_from_event(item_id, event))
        })
        .collect();

    if items.is_empty() {
        return Err(EtlError::NoItemData);
    }
    Ok(items)
}

/// One user per distinct user_id over every row, parsed or not.
pub fn build_users(events: &[ParsedEvent]) -> Vec<UserRecord> {
    let mut seen = HashSet::new();
    events
        .iter()
        .filter_map(|event| event.raw.user_id.as_deref())
        .filter(|user_id| seen.insert(*user_id))
        .map(|user_id| UserRecord {
            user_id: user_id.to_string(),
            labels: String::new(),
            comment: String::new(),
        })
        .collect()
}
