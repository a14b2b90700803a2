use crate::error::{CareError, Result};
use crate::schedule;
use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// Weekly recurring slots a counsellor nominally offers, e.g. `["09:00", "10:00"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    #[serde(default)]
    pub monday: Vec<String>,
    #[serde(default)]
    pub tuesday: Vec<String>,
    #[serde(default)]
    pub wednesday: Vec<String>,
    #[serde(default)]
    pub thursday: Vec<String>,
    #[serde(default)]
    pub friday: Vec<String>,
    #[serde(default)]
    pub saturday: Vec<String>,
    #[serde(default)]
    pub sunday: Vec<String>,
}

impl Availability {
    pub fn slots(&self, day: Weekday) -> &[String] {
        match day {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    pub fn slots_mut(&mut self, day: Weekday) -> &mut Vec<String> {
        match day {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }

    pub fn offers(&self, day: Weekday, slot: &str) -> bool {
        self.slots(day).iter().any(|s| s == slot)
    }

    /// Replace one day's slots, sorted and de-duplicated.
    pub fn set_day(&mut self, day: Weekday, slots: Vec<String>) -> Result<()> {
        let mut slots: Vec<String> = slots.into_iter().map(|s| s.trim().to_string()).collect();
        for s in &slots {
            schedule::parse_slot(s)?;
        }
        slots.sort();
        slots.dedup();
        *self.slots_mut(day) = slots;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for day in WEEK {
            for slot in self.slots(day) {
                schedule::parse_slot(slot)?;
            }
        }
        Ok(())
    }
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn parse_weekday(s: &str) -> Result<Weekday> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| CareError::Validation(format!("invalid weekday '{s}'")))
}

// ---------------------------------------------------------------------------
// Counsellor
// ---------------------------------------------------------------------------

/// A counsellor profile. Its `id` is distinct from the owning user's id;
/// appointments reference the profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counsellor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub institution_id: Uuid,
    #[serde(default)]
    pub specialization: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifications: Option<String>,
    #[serde(default)]
    pub availability: Availability,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Counsellor {
    pub fn new(user_id: Uuid, institution_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            institution_id,
            specialization: Vec::new(),
            bio: None,
            qualifications: None,
            availability: Availability::default(),
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
