use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const CATALOG_ID: &str = "fantastic4.problem_statements";
pub const CATALOG_VERSION: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProblemDef {
    pub id: u32,
    pub category: &'static str,
    pub title: &'static str,
    pub body: &'static str,
    pub tags: &'static [&'static str],
}

pub const PROBLEM_DEFS_V1: [ProblemDef; 20] = [
    ProblemDef {
        id: 1,
        category: "Healthcare",
        title: "Patient Appointment Mismanagement in Clinics",
        body: "Clinics and small hospitals often struggle with managing patient appointments, leading to long waiting times and overcrowded lobbies. Patients arrive without knowing expected delays, while staff handle registrations manually, causing miscommunication and frustration.",
        tags: &["Healthcare", "Appointment Management", "Patient Experience"],
    },
    ProblemDef {
        id: 2,
        category: "Logistics & Delivery",
        title: "Delivery Personnel Route Inefficiency",
        body: "Local delivery companies face challenges optimizing routes for their delivery agents. Many agents manually plan routes, leading to longer travel times, uneven workload distribution, and delayed deliveries.",
        tags: &["Logistics", "Route Optimization", "Delivery"],
    },
    ProblemDef {
        id: 3,
        category: "Food & Restaurant",
        title: "Inconsistent Daily Demand for Menu Items",
        body: "Restaurants often prepare food based on guesswork, resulting in either shortages or wastage. Without proper forecasting, chefs cannot predict customer demand for specific dishes.",
        tags: &["Food", "Demand Forecasting", "Inventory"],
    },
    ProblemDef {
        id: 4,
        category: "Retail & Supermarkets",
        title: "Lack of Real-Time Product Availability Information",
        body: "Customers frequently visit supermarkets only to find essential products out of stock. Staff update shelves manually, and product availability is not displayed digitally.",
        tags: &["Retail", "Inventory Management", "Customer Experience"],
    },
    ProblemDef {
        id: 5,
        category: "NGO & Social Sector",
        title: "Volunteer Task Assignment and Tracking Challenges",
        body: "NGOs manage multiple activities such as drives, distributions, and events. Volunteers often receive task instructions through informal messaging groups, creating misalignment and low accountability.",
        tags: &["NGO", "Volunteer Management", "Task Tracking"],
    },
    ProblemDef {
        id: 6,
        category: "Corporate & HR",
        title: "Employee Feedback Isn't Timely or Actionable",
        body: "Companies require continuous feedback to improve culture and productivity, but employees hesitate to share concerns openly. Annual feedback forms are too late to catch real-time problems.",
        tags: &["HR", "Employee Engagement", "Feedback"],
    },
    ProblemDef {
        id: 7,
        category: "Finance & Banking",
        title: "Customers Struggle to Track Small Daily Expenses",
        body: "Many customers do not realize where their money goes due to untracked minor expenses. Banks provide statements but not easy tools for categorizing and understanding spending behavior.",
        tags: &["Finance", "Expense Tracking", "Budgeting"],
    },
    ProblemDef {
        id: 8,
        category: "Education",
        title: "Parents Lack Visibility into Homework and Class Activities",
        body: "Schools often communicate homework, circulars, and test schedules inconsistently through diaries or WhatsApp groups. Parents miss important updates, and students fail to complete assignments.",
        tags: &["Education", "Parent Communication", "School Management"],
    },
    ProblemDef {
        id: 9,
        category: "Manufacturing",
        title: "Manual Tracking of Machine Downtime",
        body: "Factories often document machine failures on paper or verbally. As a result, managers cannot identify patterns in downtime, maintenance delays, or recurring issues.",
        tags: &["Manufacturing", "Machine Maintenance", "Downtime Tracking"],
    },
    ProblemDef {
        id: 10,
        category: "Travel & Tourism",
        title: "Tourists Lack Local Recommendations Based on Preferences",
        body: "Tourists rely on generic reviews instead of personalized recommendations. They often miss local gems, cultural events, or food spots relevant to their interests.",
        tags: &["Travel", "Recommendations", "Tourism"],
    },
    ProblemDef {
        id: 11,
        category: "Fitness & Wellness",
        title: "Users Struggle to Maintain Workout Consistency",
        body: "People start workout routines enthusiastically but gradually lose track due to lack of motivation and progress visibility. Without measurable habit tracking, users fail to maintain consistency.",
        tags: &["Fitness", "Wellness", "Habit Tracking"],
    },
    ProblemDef {
        id: 12,
        category: "Agriculture",
        title: "Farmers Lack Simple Tools to Track Crop Expenses",
        body: "Farmers manually track expenses for seeds, fertilizers, labor, and irrigation. This disorganized approach makes it difficult to calculate profit margins or identify overspending.",
        tags: &["Agriculture", "Expense Tracking", "Farm Management"],
    },
    ProblemDef {
        id: 13,
        category: "Hospitality",
        title: "Guest Service Requests Are Delayed or Missed",
        body: "Hotels receive guest requests through phone calls or front-desk visits. Staff often forget to relay requests, causing delays in housekeeping, room service, or maintenance.",
        tags: &["Hospitality", "Guest Services", "Hotel Management"],
    },
    ProblemDef {
        id: 14,
        category: "Real Estate",
        title: "Property Visitors Management Is Unorganized",
        body: "Housing societies and commercial buildings manually record visitors in logbooks. Security personnel cannot verify details or track frequent visitors.",
        tags: &["Real Estate", "Visitor Management", "Security"],
    },
    ProblemDef {
        id: 15,
        category: "Entertainment & Events",
        title: "Event Organizers Struggle With Ticket Verification",
        body: "Small to mid-scale events manually check attendees through printed lists or verbal confirmation. This causes long queues, entry delays, and inaccurate attendee counts.",
        tags: &["Events", "Ticket Management", "Event Planning"],
    },
    ProblemDef {
        id: 16,
        category: "E-Commerce",
        title: "Customers Cannot Easily Track Return Status",
        body: "When customers return products, they often don't receive clear updates on the status. Email-based updates get lost, and support teams struggle with repeated inquiries.",
        tags: &["E-Commerce", "Returns", "Customer Service"],
    },
    ProblemDef {
        id: 17,
        category: "Cybersecurity",
        title: "Users Reuse Weak Passwords Across Platforms",
        body: "Individuals often reuse the same passwords for multiple websites. This increases vulnerability to breaches and phishing attacks. Many users lack an organized method to track their credentials securely.",
        tags: &["Cybersecurity", "Password Management", "Security"],
    },
    ProblemDef {
        id: 18,
        category: "Transportation",
        title: "Commuters Lack Real-Time Bus or Shuttle Status",
        body: "Students and employees using shuttle/bus services do not know real-time arrival, delays, or seat availability. This leads to waiting, crowding, and missed rides\u{2014}especially during peak hours.",
        tags: &["Transportation", "Public Transit", "Real-Time Tracking"],
    },
    ProblemDef {
        id: 19,
        category: "Freelancing & Creator Economy",
        title: "Freelancers Cannot Showcase Their Work Professionally",
        body: "Many freelancers rely on scattered links, Google Drive folders, or Instagram posts to showcase work. This lacks professionalism and makes it difficult to impress clients.",
        tags: &["Freelancing", "Portfolio", "Creator Economy"],
    },
    ProblemDef {
        id: 20,
        category: "Food Delivery & Cloud Kitchens",
        title: "Customers Cannot Track Order Preparation Stages",
        body: "Cloud kitchens receive high order volume but do not provide real-time visibility into food preparation status. Customers are left guessing whether food is being cooked, packed, or delayed.",
        tags: &["Food Delivery", "Cloud Kitchens", "Order Tracking"],
    },
];

/// One problem statement as consumed by the renderer and the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: u32,
    pub category: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ContentRecord {
    pub fn new(
        id: u32,
        category: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            id,
            category: category.into(),
            title: title.into(),
            body: body.into(),
            tags,
        }
    }

    /// Tags joined the way cards and the site render them.
    pub fn tag_line(&self) -> String {
        self.tags.join(" \u{2022} ")
    }
}

impl From<&ProblemDef> for ContentRecord {
    fn from(def: &ProblemDef) -> Self {
        Self {
            id: def.id,
            category: def.category.to_string(),
            title: def.title.to_string(),
            body: def.body.to_string(),
            tags: def.tags.iter().map(|tag| tag.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate record id {0}")]
    DuplicateId(u32),
    #[error("record {0} has an empty title")]
    EmptyTitle(u32),
}

static PROBLEM_STATEMENTS: OnceLock<Vec<ContentRecord>> = OnceLock::new();
static CATALOG_JSON_VALUE: OnceLock<Value> = OnceLock::new();
static CATALOG_FINGERPRINT: OnceLock<String> = OnceLock::new();

/// The embedded catalog, built once on first use.
pub fn problem_statements() -> &'static [ContentRecord] {
    PROBLEM_STATEMENTS.get_or_init(|| PROBLEM_DEFS_V1.iter().map(ContentRecord::from).collect())
}

pub fn problem_by_id(id: u32) -> Option<&'static ContentRecord> {
    problem_statements().iter().find(|record| record.id == id)
}

/// Distinct categories in first-appearance order.
pub fn categories() -> Vec<&'static str> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for def in PROBLEM_DEFS_V1.iter() {
        if seen.insert(def.category) {
            out.push(def.category);
        }
    }
    out
}

pub fn validate_records(records: &[ContentRecord]) -> Result<(), CatalogError> {
    let mut ids = BTreeSet::new();
    for record in records {
        if !ids.insert(record.id) {
            return Err(CatalogError::DuplicateId(record.id));
        }
        if record.title.trim().is_empty() {
            return Err(CatalogError::EmptyTitle(record.id));
        }
    }
    Ok(())
}

pub fn records_json(records: &[ContentRecord]) -> Value {
    json!({
        "schema": CATALOG_ID,
        "version": CATALOG_VERSION,
        "count": records.len(),
        "records": records,
    })
}

pub fn catalog_json() -> &'static Value {
    CATALOG_JSON_VALUE.get_or_init(|| records_json(problem_statements()))
}

fn hex_digest(hasher: Sha256) -> String {
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Order-sensitive fingerprint of a record list.
pub fn records_fingerprint_sha256(records: &[ContentRecord]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(CATALOG_ID.as_bytes());
    hasher.update(b"\n");
    hasher.update(CATALOG_VERSION.as_bytes());
    for record in records {
        hasher.update(b"\n");
        hasher.update(record.id.to_string().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(record.category.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(record.title.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(record.body.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(record.tags.join("\x1e").as_bytes());
    }
    hex_digest(hasher)
}

pub fn catalog_fingerprint_sha256() -> String {
    CATALOG_FINGERPRINT
        .get_or_init(|| records_fingerprint_sha256(problem_statements()))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalog_has_twenty_unique_records() {
        let records = problem_statements();
        assert_eq!(records.len(), 20);
        validate_records(records).expect("embedded catalog must validate");
        let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn catalog_is_built_once() {
        let a = problem_statements().as_ptr();
        let b = problem_statements().as_ptr();
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_is_stable_and_order_sensitive() {
        let a = catalog_fingerprint_sha256();
        assert_eq!(a, catalog_fingerprint_sha256());
        assert_eq!(a.len(), 64);

        let mut reversed = problem_statements().to_vec();
        reversed.reverse();
        assert_ne!(records_fingerprint_sha256(&reversed), a);
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let mut records = problem_statements()[..3].to_vec();
        records[2].id = records[0].id;
        assert_eq!(
            validate_records(&records),
            Err(CatalogError::DuplicateId(records[0].id))
        );
    }

    #[test]
    fn validate_rejects_blank_titles() {
        let records = vec![ContentRecord::new(7, "X", "   ", "body", Vec::new())];
        assert_eq!(validate_records(&records), Err(CatalogError::EmptyTitle(7)));
    }

    #[test]
    fn catalog_json_reports_schema_and_count() {
        let value = catalog_json();
        assert_eq!(value["schema"], CATALOG_ID);
        assert_eq!(value["count"], 20);
        assert_eq!(value["records"][0]["id"], 1);
        assert_eq!(value["records"][0]["category"], "Healthcare");
    }

    #[test]
    fn tag_line_joins_with_bullets() {
        let record = problem_by_id(2).expect("record 2");
        assert_eq!(
            record.tag_line(),
            "Logistics \u{2022} Route Optimization \u{2022} Delivery"
        );
    }

    #[test]
    fn categories_keep_first_appearance_order() {
        let cats = categories();
        assert_eq!(cats[0], "Healthcare");
        assert_eq!(cats.len(), 20);
    }

    #[test]
    fn records_deserialize_without_tags() {
        let record: ContentRecord =
            serde_json::from_str(r#"{"id":3,"category":"C","title":"T","body":"B"}"#)
                .expect("parse");
        assert!(record.tags.is_empty());
    }
}
