//! Reference (lookup) data

use serde::{Deserialize, Serialize};

use super::{document, Audit};
use crate::store::ObjectId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub id: ObjectId,
    pub name: String,
    /// ISO 4217 code, e.g. `USD`
    pub code: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

document!(Currency, "currencies");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub id: ObjectId,
    pub name: String,
    pub code: String,
    #[serde(flatten)]
    pub audit: Audit,
}

document!(Country, "countries");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct District {
    pub id: ObjectId,
    pub name: String,
    #[serde(flatten)]
    pub audit: Audit,
}

document!(District, "districts");

/// A bank branch, belonging to a district
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    pub district_id: ObjectId,
    #[serde(flatten)]
    pub audit: Audit,
}

document!(Branch, "branches");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub id: ObjectId,
    pub name: String,
    #[serde(flatten)]
    pub audit: Audit,
}

document!(Process, "processes");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subprocess {
    pub id: ObjectId,
    pub name: String,
    pub process_id: ObjectId,
    #[serde(flatten)]
    pub audit: Audit,
}

document!(Subprocess, "subprocesses");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: ObjectId,
    pub name: String,
    pub subprocess_id: ObjectId,
    #[serde(flatten)]
    pub audit: Audit,
}

document!(Department, "departments");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelPurpose {
    pub id: ObjectId,
    pub name: String,
    #[serde(flatten)]
    pub audit: Audit,
}

document!(TravelPurpose, "travel_purposes");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerType {
    pub id: ObjectId,
    pub name: String,
    #[serde(flatten)]
    pub audit: Audit,
}

document!(CustomerType, "customer_types");
