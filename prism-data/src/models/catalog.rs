use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single clinic service offered to patients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub duration_minutes: i32,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTreatment {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Default)]
pub struct TreatmentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub duration_minutes: Option<i32>,
}

impl TreatmentUpdate {
    pub fn apply_to(&self, treatment: &mut Treatment) {
        if let Some(v) = &self.name {
            treatment.name = v.clone();
        }
        if let Some(v) = &self.description {
            treatment.description = Some(v.clone());
        }
        if let Some(v) = self.price {
            treatment.price = v;
        }
        if let Some(v) = self.duration_minutes {
            treatment.duration_minutes = v;
        }
    }
}

/// A bundle of sessions over one or more treatments, sold at one price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub sessions: i32,
    pub treatment_ids: Vec<Uuid>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPackage {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub sessions: i32,
    pub treatment_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct PackageUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub sessions: Option<i32>,
    pub treatment_ids: Option<Vec<Uuid>>,
}

impl PackageUpdate {
    pub fn apply_to(&self, package: &mut Package) {
        if let Some(v) = &self.name {
            package.name = v.clone();
        }
        if let Some(v) = &self.description {
            package.description = Some(v.clone());
        }
        if let Some(v) = self.price {
            package.price = v;
        }
        if let Some(v) = self.sessions {
            package.sessions = v;
        }
        if let Some(v) = &self.treatment_ids {
            package.treatment_ids = v.clone();
        }
    }
}
