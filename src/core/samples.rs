//! Records uploaded by `upload_complete` when the CSV exports are missing,
//! so a fresh Gorse instance can still be trained and queried.

use crate::domain::model::{GorseFeedback, GorseItem};

fn item(id: &str, timestamp: &str, labels: &[&str], categories: &[&str], comment: &str) -> GorseItem {
    GorseItem {
        item_id: id.to_string(),
        timestamp: timestamp.to_string(),
        labels: labels.iter().map(|s| s.to_string()).collect(),
        categories: categories.iter().map(|s| s.to_string()).collect(),
        comment: comment.to_string(),
    }
}

fn feedback(feedback_type: &str, user_id: &str, item_id: &str, timestamp: &str, comment: &str) -> GorseFeedback {
    GorseFeedback {
        feedback_type: feedback_type.to_string(),
        user_id: user_id.to_string(),
        item_id: item_id.to_string(),
        timestamp: timestamp.to_string(),
        comment: comment.to_string(),
    }
}

pub fn sample_items() -> Vec<GorseItem> {
    vec![
        item(
            "HD37654191",
            "1758007507",
            &["estate:黃埔花園", "region:黃埔"],
            &["rental"],
            r#"{"rent_price": 25000.0}"#,
        ),
        item(
            "HD37654247",
            "1758016208",
            &["estate:黃埔花園", "region:黃埔"],
            &["sale"],
            r#"{"sale_price": 8100000.0}"#,
        ),
        item(
            "HD37654143",
            "1758033196",
            &["estate:斌善軒", "region:錦田"],
            &["rental"],
            r#"{"rent_price": 13500.0}"#,
        ),
        item(
            "HD37654213",
            "1758075661",
            &["estate:黃埔花園", "region:黃埔"],
            &["sale"],
            r#"{"sale_price": 6080000.0}"#,
        ),
        item(
            "HD37654250",
            "1758075751",
            &["estate:錦豐花園", "region:錦田"],
            &["rental", "sale"],
            r#"{"rent_price": 15000.0, "sale_price": 5600000.0}"#,
        ),
    ]
}

pub fn sample_feedback() -> Vec<GorseFeedback> {
    vec![
        feedback(
            "view_listing",
            "9b6d5856-b182-4c98-97ee-982ebc116943",
            "HD37654191",
            "1758007507",
            "weight:1.0",
        ),
        feedback(
            "view_listing",
            "9b6d5856-b182-4c98-97ee-982ebc116943",
            "HD37654191",
            "1758007530",
            "weight:1.0",
        ),
        feedback(
            "view_listing",
            "9b6d5856-b182-4c98-97ee-982ebc116943",
            "HD37654247",
            "1758016208",
            "weight:1.0",
        ),
        feedback(
            "view_listing",
            "cb987911-b3a0-47fd-a25c-fdf8f3c18bba",
            "HD37654143",
            "1758033196",
            "weight:1.0",
        ),
        feedback(
            "contact_agent",
            "2db80906-9b4b-4649-b648-b58b46c3c048",
            "HD37655491",
            "1759818321",
            "weight:3.0",
        ),
    ]
}
