use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::finance::{NewSale, Sale};
use super::patient::{NewPatientRecord, PatientRecord};

/// Lifecycle of a publicly submitted appointment request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagedStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl StagedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StagedStatus::Pending => "pending",
            StagedStatus::Confirmed => "confirmed",
            StagedStatus::Rejected => "rejected",
        }
    }

    /// Only pending requests may move, and only forward
    pub fn can_transition_to(&self, next: StagedStatus) -> bool {
        matches!(
            (self, next),
            (StagedStatus::Pending, StagedStatus::Confirmed) | (StagedStatus::Pending, StagedStatus::Rejected)
        )
    }
}

impl fmt::Display for StagedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StagedStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(StagedStatus::Pending),
            "confirmed" => Ok(StagedStatus::Confirmed),
            "rejected" => Ok(StagedStatus::Rejected),
            other => Err(format!("invalid staged appointment status: {}", other)),
        }
    }
}

/// Appointment request submitted from the public booking page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedAppointment {
    pub id: Uuid,
    pub full_name: String,
    pub contact_number: String,
    pub email: Option<String>,
    pub preferred_date: NaiveDate,
    pub preferred_time: NaiveTime,
    pub treatment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub notes: Option<String>,
    pub status: StagedStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStagedAppointment {
    pub full_name: String,
    pub contact_number: String,
    pub email: Option<String>,
    pub preferred_date: NaiveDate,
    pub preferred_time: NaiveTime,
    pub treatment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Confirmed appointment on the clinic calendar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_record_id: Option<Uuid>,
    pub staged_appointment_id: Option<Uuid>,
    pub full_name: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub treatment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub person_in_charge: Option<String>,
    pub notes: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub patient_record_id: Option<Uuid>,
    pub staged_appointment_id: Option<Uuid>,
    pub full_name: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub treatment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub person_in_charge: Option<String>,
    pub notes: Option<String>,
}

/// Filter for listing confirmed appointments (inclusive date bounds)
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub include_archived: bool,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        if !self.include_archived && appointment.archived {
            return false;
        }
        if let Some(from) = self.from {
            if appointment.appointment_date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if appointment.appointment_date > to {
                return false;
            }
        }
        true
    }
}

/// Everything written when staff confirm a staged appointment.
///
/// The sale's `patient_record_id` and `appointment_id` are filled in by the
/// repository once those rows exist.
#[derive(Debug, Clone)]
pub struct StagedConfirmation {
    pub patient: NewPatientRecord,
    pub sale: Option<NewSale>,
}

/// Result of a confirmation, all rows written in one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmedBooking {
    pub staged: StagedAppointment,
    pub patient_record: PatientRecord,
    pub appointment: Appointment,
    pub sale: Option<Sale>,
}

/// An occupied calendar slot (confirmed appointment or pending request)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookedSlot {
    pub date: NaiveDate,
    pub time: NaiveTime,
}
