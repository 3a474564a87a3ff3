//! Core domain model for the getaway pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "getaway-core";

/// Merge key of the durable store: one logical row per (city, airport).
pub type SpotKey = (String, String);

/// One destination's joined metrics, produced fresh each refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDestination {
    pub city: String,
    pub airport: String,
    pub co2_emissions_kg_per_person: f64,
    pub punctual_pct: f64,
    pub avg_temperature_air_f: f64,
    pub avg_relative_humidity_pct: f64,
    pub avg_cloud_cover_pct: f64,
    pub precipitation_probability_pct: f64,
    pub aquarium_cnt: i64,
    pub zoo_cnt: i64,
    pub korean_restaurant_cnt: i64,
}

impl CandidateDestination {
    pub fn key(&self) -> SpotKey {
        (self.city.clone(), self.airport.clone())
    }
}

/// Durable stored representation of a destination. Superseded, never
/// appended, on each refresh; eligible for purge once `refreshed_at` falls
/// outside the retention window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VacationSpot {
    pub city: String,
    pub airport: String,
    pub co2_emissions_kg_per_person: f64,
    pub punctual_pct: f64,
    pub avg_temperature_air_f: f64,
    pub avg_relative_humidity_pct: f64,
    pub avg_cloud_cover_pct: f64,
    pub precipitation_probability_pct: f64,
    pub aquarium_cnt: i64,
    pub zoo_cnt: i64,
    pub korean_restaurant_cnt: i64,
    pub refreshed_at: DateTime<Utc>,
}

impl VacationSpot {
    pub fn from_candidate(candidate: CandidateDestination, refreshed_at: DateTime<Utc>) -> Self {
        Self {
            city: candidate.city,
            airport: candidate.airport,
            co2_emissions_kg_per_person: candidate.co2_emissions_kg_per_person,
            punctual_pct: candidate.punctual_pct,
            avg_temperature_air_f: candidate.avg_temperature_air_f,
            avg_relative_humidity_pct: candidate.avg_relative_humidity_pct,
            avg_cloud_cover_pct: candidate.avg_cloud_cover_pct,
            precipitation_probability_pct: candidate.precipitation_probability_pct,
            aquarium_cnt: candidate.aquarium_cnt,
            zoo_cnt: candidate.zoo_cnt,
            korean_restaurant_cnt: candidate.korean_restaurant_cnt,
            refreshed_at,
        }
    }

    pub fn key(&self) -> SpotKey {
        (self.city.clone(), self.airport.clone())
    }
}

/// Threshold policy a stored destination must clear to be recommended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationPolicy {
    pub min_punctual_pct: f64,
    pub min_temperature_f: f64,
    pub require_attractions: bool,
    pub max_payload: usize,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            min_punctual_pct: 50.0,
            min_temperature_f: 70.0,
            require_attractions: true,
            max_payload: 10,
        }
    }
}

impl RecommendationPolicy {
    pub fn accepts(&self, spot: &VacationSpot) -> bool {
        if spot.punctual_pct < self.min_punctual_pct {
            return false;
        }
        if spot.avg_temperature_air_f < self.min_temperature_f {
            return false;
        }
        if self.require_attractions
            && (spot.aquarium_cnt <= 0 || spot.zoo_cnt <= 0 || spot.korean_restaurant_cnt <= 0)
        {
            return false;
        }
        true
    }

    pub fn filter(&self, spots: &[VacationSpot]) -> Vec<VacationSpot> {
        spots
            .iter()
            .filter(|spot| self.accepts(spot))
            .cloned()
            .collect()
    }
}

/// Ephemeral serialization of up to `max_payload` qualifying destinations,
/// consumed once by the recommendation job and discarded.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub generated_at: DateTime<Utc>,
    pub spots: Vec<VacationSpot>,
}

impl NotificationPayload {
    pub fn from_spots(
        matched: &[VacationSpot],
        max_payload: usize,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            generated_at,
            spots: matched.iter().take(max_payload).cloned().collect(),
        }
    }

    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }
}
