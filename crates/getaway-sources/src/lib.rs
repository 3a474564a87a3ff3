//! Marketplace dataset extractors and the destination harmonizer.
//!
//! Each extractor condenses one raw dataset into the aggregate rows the
//! harmonizer joins. Join misses (unmapped airport, missing weather,
//! no attractions) drop the row silently; that is accepted data-quality
//! behavior, not an error.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use getaway_core::CandidateDestination;
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::debug;

pub const CRATE_NAME: &str = "getaway-sources";

pub const EMISSIONS_FILE: &str = "flight_emissions.json";
pub const FLIGHT_STATUS_FILE: &str = "flight_status.json";
pub const WEATHER_FILE: &str = "weather_forecast.json";
pub const CITY_POPULATIONS_FILE: &str = "city_populations.json";
pub const ZIP_CODES_FILE: &str = "zip_codes.json";
pub const POINTS_OF_INTEREST_FILE: &str = "points_of_interest.json";
pub const AIRPORTS_FILE: &str = "airports.json";
pub const HOME_FILE: &str = "home.json";

/// All six dataset files, in load order. Used for provenance digests.
pub const DATASET_FILES: [&str; 6] = [
    EMISSIONS_FILE,
    FLIGHT_STATUS_FILE,
    WEATHER_FILE,
    CITY_POPULATIONS_FILE,
    ZIP_CODES_FILE,
    POINTS_OF_INTEREST_FILE,
];

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Raw dataset records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EmissionRecord {
    pub departure_airport: String,
    pub arrival_airport: String,
    pub estimated_co2_total_tonnes: Option<f64>,
    pub seats: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlightStatusRecord {
    pub departure_iata_airport_code: String,
    pub arrival_iata_airport_code: String,
    pub arrival_actual_ingate_timeliness: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherRecord {
    pub postal_code: String,
    pub country: String,
    pub avg_temperature_air_2m_f: f64,
    pub avg_humidity_relative_2m_pct: f64,
    pub avg_cloud_cover_tot_pct: f64,
    pub probability_of_precipitation_pct: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CityPopulationRecord {
    pub geo_id: String,
    pub geo_name: String,
    pub level: String,
    pub country_geo_id: String,
    pub population: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZipCodeRecord {
    pub city_geo_id: String,
    pub city_geo_name: String,
    pub zip_geo_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoiRecord {
    pub category_main: String,
    pub city_geo_id: String,
    pub country_geo_id: String,
}

/// The raw datasets of one refresh cycle, loaded together.
#[derive(Debug, Clone)]
pub struct RawDatasets {
    pub emissions: Vec<EmissionRecord>,
    pub flight_status: Vec<FlightStatusRecord>,
    pub weather: Vec<WeatherRecord>,
    pub city_populations: Vec<CityPopulationRecord>,
    pub zip_codes: Vec<ZipCodeRecord>,
    pub points_of_interest: Vec<PoiRecord>,
}

#[derive(Debug, Clone)]
pub struct DatasetDir {
    root: PathBuf,
}

impl DatasetDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn load(&self) -> Result<RawDatasets, SourceError> {
        Ok(RawDatasets {
            emissions: self.read_json(EMISSIONS_FILE)?,
            flight_status: self.read_json(FLIGHT_STATUS_FILE)?,
            weather: self.read_json(WEATHER_FILE)?,
            city_populations: self.read_json(CITY_POPULATIONS_FILE)?,
            zip_codes: self.read_json(ZIP_CODES_FILE)?,
            points_of_interest: self.read_json(POINTS_OF_INTEREST_FILE)?,
        })
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, SourceError> {
        let path = self.file_path(name);
        read_json_file(&path)
    }
}

fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, SourceError> {
    let text = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SourceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// File collaborators: airport lookup + origin configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AirportRecord {
    pub iata: String,
    pub city: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// In-memory IATA-code → city lookup, built once per run from the static
/// airport list file.
#[derive(Debug, Clone, Default)]
pub struct AirportIndex {
    by_iata: BTreeMap<String, String>,
}

impl AirportIndex {
    pub fn from_records(records: Vec<AirportRecord>) -> Self {
        let mut by_iata = BTreeMap::new();
        for record in records {
            by_iata.insert(record.iata.to_ascii_uppercase(), record.city);
        }
        Self { by_iata }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let records: Vec<AirportRecord> = read_json_file(path.as_ref())?;
        Ok(Self::from_records(records))
    }

    pub fn city_for(&self, iata: &str) -> Option<&str> {
        self.by_iata
            .get(&iata.to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_iata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_iata.is_empty()
    }
}

/// Origin-airport configuration: `{ "airport": "<IATA>" }`.
#[derive(Debug, Clone, Deserialize)]
pub struct HomeConfig {
    pub airport: String,
}

impl HomeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        read_json_file(path.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Extractor outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FlightEmission {
    pub departure_airport: String,
    pub arrival_airport: String,
    pub co2_emissions_kg_per_person: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlightPunctuality {
    pub departure_airport: String,
    pub arrival_airport: String,
    pub punctual_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostalWeather {
    pub postal_code: String,
    pub avg_temperature_air_f: f64,
    pub avg_relative_humidity_pct: f64,
    pub avg_cloud_cover_pct: f64,
    pub precipitation_probability_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MajorCity {
    pub geo_id: String,
    pub geo_name: String,
    pub total_population: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityWeather {
    pub geo_id: String,
    pub geo_name: String,
    pub avg_temperature_air_f: f64,
    pub avg_relative_humidity_pct: f64,
    pub avg_cloud_cover_pct: f64,
    pub precipitation_probability_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityAttractions {
    pub geo_id: String,
    pub geo_name: String,
    pub aquarium_cnt: i64,
    pub zoo_cnt: i64,
    pub korean_restaurant_cnt: i64,
}

const MIN_CITY_POPULATION: f64 = 100_000.0;

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Per-seat carbon emissions, averaged per (departure, arrival) leg.
/// Zero-seat rows and rows without emission data never reach the division.
pub fn extract_flight_emissions(records: &[EmissionRecord]) -> Vec<FlightEmission> {
    let mut grouped: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
    for record in records {
        let Some(tonnes) = record.estimated_co2_total_tonnes else {
            continue;
        };
        if record.seats == 0.0 {
            continue;
        }
        grouped
            .entry((
                record.departure_airport.clone(),
                record.arrival_airport.clone(),
            ))
            .or_default()
            .push(tonnes / record.seats * 1000.0);
    }
    grouped
        .into_iter()
        .map(|((departure, arrival), values)| FlightEmission {
            departure_airport: departure,
            arrival_airport: arrival,
            co2_emissions_kg_per_person: mean(&values),
        })
        .collect()
}

/// Fraction of flights arriving early or on time, per (departure, arrival)
/// leg. Rows with no recorded timeliness are excluded.
pub fn extract_flight_punctuality(records: &[FlightStatusRecord]) -> Vec<FlightPunctuality> {
    let mut grouped: BTreeMap<(String, String), (usize, usize)> = BTreeMap::new();
    for record in records {
        let Some(timeliness) = record.arrival_actual_ingate_timeliness.as_deref() else {
            continue;
        };
        let entry = grouped
            .entry((
                record.departure_iata_airport_code.clone(),
                record.arrival_iata_airport_code.clone(),
            ))
            .or_default();
        entry.1 += 1;
        if matches!(timeliness, "OnTime" | "Early") {
            entry.0 += 1;
        }
    }
    grouped
        .into_iter()
        .map(
            |((departure, arrival), (punctual, total))| FlightPunctuality {
                departure_airport: departure,
                arrival_airport: arrival,
                punctual_pct: punctual as f64 / total as f64 * 100.0,
            },
        )
        .collect()
}

/// Two-week forecast averages per US postal code. Non-US rows are outside
/// the covered dataset tier and skipped.
pub fn extract_weather(records: &[WeatherRecord]) -> Vec<PostalWeather> {
    let mut grouped: BTreeMap<String, (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for record in records {
        if record.country != "US" {
            continue;
        }
        let entry = grouped.entry(record.postal_code.clone()).or_default();
        entry.0.push(record.avg_temperature_air_2m_f);
        entry.1.push(record.avg_humidity_relative_2m_pct);
        entry.2.push(record.avg_cloud_cover_tot_pct);
        entry.3.push(record.probability_of_precipitation_pct);
    }
    grouped
        .into_iter()
        .map(
            |(postal_code, (temp, humidity, cloud, precip))| PostalWeather {
                postal_code,
                avg_temperature_air_f: mean(&temp),
                avg_relative_humidity_pct: mean(&humidity),
                avg_cloud_cover_pct: mean(&cloud),
                precipitation_probability_pct: mean(&precip),
            },
        )
        .collect()
}

/// US cities above the population floor, using the latest (max) population
/// reading per geography.
pub fn extract_major_cities(records: &[CityPopulationRecord]) -> Vec<MajorCity> {
    let mut max_population: BTreeMap<(String, String), f64> = BTreeMap::new();
    for record in records {
        if record.level != "City" || record.country_geo_id != "country/USA" {
            continue;
        }
        let key = (record.geo_id.clone(), record.geo_name.clone());
        let entry = max_population.entry(key).or_insert(f64::MIN);
        if record.population > *entry {
            *entry = record.population;
        }
    }
    max_population
        .into_iter()
        .filter(|(_, population)| *population > MIN_CITY_POPULATION)
        .map(|((geo_id, geo_name), total_population)| MajorCity {
            geo_id,
            geo_name,
            total_population,
        })
        .collect()
}

/// Weather averaged per major city over the zip codes belonging to it.
/// Cities with no forecast coverage are dropped.
pub fn extract_city_weather(
    cities: &[MajorCity],
    zip_codes: &[ZipCodeRecord],
    weather: &[PostalWeather],
) -> Vec<CityWeather> {
    let weather_by_postal: BTreeMap<&str, &PostalWeather> = weather
        .iter()
        .map(|w| (w.postal_code.as_str(), w))
        .collect();
    let mut zips_by_city: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for zip in zip_codes {
        zips_by_city
            .entry(zip.city_geo_id.as_str())
            .or_default()
            .push(zip.zip_geo_name.as_str());
    }

    let mut out = Vec::new();
    for city in cities {
        let Some(zips) = zips_by_city.get(city.geo_id.as_str()) else {
            continue;
        };
        let mut temp = Vec::new();
        let mut humidity = Vec::new();
        let mut cloud = Vec::new();
        let mut precip = Vec::new();
        for zip in zips {
            if let Some(w) = weather_by_postal.get(zip) {
                temp.push(w.avg_temperature_air_f);
                humidity.push(w.avg_relative_humidity_pct);
                cloud.push(w.avg_cloud_cover_pct);
                precip.push(w.precipitation_probability_pct);
            }
        }
        if temp.is_empty() {
            continue;
        }
        out.push(CityWeather {
            geo_id: city.geo_id.clone(),
            geo_name: city.geo_name.clone(),
            avg_temperature_air_f: mean(&temp),
            avg_relative_humidity_pct: mean(&humidity),
            avg_cloud_cover_pct: mean(&cloud),
            precipitation_probability_pct: mean(&precip),
        });
    }
    out
}

/// Attraction counts per major city, restricted to the categories the
/// recommendation policy cares about. Cities with no matching point of
/// interest do not appear.
pub fn extract_attractions(cities: &[MajorCity], pois: &[PoiRecord]) -> Vec<CityAttractions> {
    let city_names: BTreeMap<&str, &str> = cities
        .iter()
        .map(|c| (c.geo_id.as_str(), c.geo_name.as_str()))
        .collect();
    let mut counts: BTreeMap<&str, (i64, i64, i64)> = BTreeMap::new();
    for poi in pois {
        if poi.country_geo_id != "country/USA" {
            continue;
        }
        if !city_names.contains_key(poi.city_geo_id.as_str()) {
            continue;
        }
        let entry = counts.entry(poi.city_geo_id.as_str()).or_default();
        match poi.category_main.as_str() {
            "Aquarium" => entry.0 += 1,
            "Zoo" => entry.1 += 1,
            "Korean Restaurant" => entry.2 += 1,
            _ => {}
        }
    }
    counts
        .into_iter()
        .map(|(geo_id, (aquarium, zoo, korean))| CityAttractions {
            geo_id: geo_id.to_string(),
            geo_name: city_names[geo_id].to_string(),
            aquarium_cnt: aquarium,
            zoo_cnt: zoo,
            korean_restaurant_cnt: korean,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Harmonizer
// ---------------------------------------------------------------------------

/// Joins the extractor outputs into one candidate row per destination
/// city/airport reachable from the configured origin airport.
pub fn harmonize(
    datasets: &RawDatasets,
    airports: &AirportIndex,
    home: &HomeConfig,
) -> Vec<CandidateDestination> {
    let emissions = extract_flight_emissions(&datasets.emissions);
    let punctuality = extract_flight_punctuality(&datasets.flight_status);
    let weather = extract_weather(&datasets.weather);
    let cities = extract_major_cities(&datasets.city_populations);
    let city_weather = extract_city_weather(&cities, &datasets.zip_codes, &weather);
    let attractions = extract_attractions(&cities, &datasets.points_of_interest);

    let punctuality_by_leg: BTreeMap<(&str, &str), f64> = punctuality
        .iter()
        .map(|p| {
            (
                (p.departure_airport.as_str(), p.arrival_airport.as_str()),
                p.punctual_pct,
            )
        })
        .collect();
    let weather_by_city: BTreeMap<&str, &CityWeather> = city_weather
        .iter()
        .map(|w| (w.geo_name.as_str(), w))
        .collect();
    let attractions_by_city: BTreeMap<&str, &CityAttractions> = attractions
        .iter()
        .map(|a| (a.geo_name.as_str(), a))
        .collect();

    let origin = home.airport.to_ascii_uppercase();
    let mut out = Vec::new();
    for emission in &emissions {
        if emission.departure_airport.to_ascii_uppercase() != origin {
            continue;
        }
        let leg = (
            emission.departure_airport.as_str(),
            emission.arrival_airport.as_str(),
        );
        let Some(punctual_pct) = punctuality_by_leg.get(&leg) else {
            continue;
        };
        let Some(city) = airports.city_for(&emission.arrival_airport) else {
            debug!(airport = %emission.arrival_airport, "no city mapping for arrival airport; dropping row");
            continue;
        };
        let Some(weather) = weather_by_city.get(city) else {
            continue;
        };
        let Some(attraction) = attractions_by_city.get(city) else {
            continue;
        };
        out.push(CandidateDestination {
            city: city.to_string(),
            airport: emission.arrival_airport.clone(),
            co2_emissions_kg_per_person: emission.co2_emissions_kg_per_person,
            punctual_pct: *punctual_pct,
            avg_temperature_air_f: weather.avg_temperature_air_f,
            avg_relative_humidity_pct: weather.avg_relative_humidity_pct,
            avg_cloud_cover_pct: weather.avg_cloud_cover_pct,
            precipitation_probability_pct: weather.precipitation_probability_pct,
            aquarium_cnt: attraction.aquarium_cnt,
            zoo_cnt: attraction.zoo_cnt,
            korean_restaurant_cnt: attraction.korean_restaurant_cnt,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emission(dep: &str, arr: &str, tonnes: Option<f64>, seats: f64) -> EmissionRecord {
        EmissionRecord {
            departure_airport: dep.to_string(),
            arrival_airport: arr.to_string(),
            estimated_co2_total_tonnes: tonnes,
            seats,
        }
    }

    fn status(dep: &str, arr: &str, timeliness: Option<&str>) -> FlightStatusRecord {
        FlightStatusRecord {
            departure_iata_airport_code: dep.to_string(),
            arrival_iata_airport_code: arr.to_string(),
            arrival_actual_ingate_timeliness: timeliness.map(ToString::to_string),
        }
    }

    fn weather(postal: &str, country: &str, temp: f64) -> WeatherRecord {
        WeatherRecord {
            postal_code: postal.to_string(),
            country: country.to_string(),
            avg_temperature_air_2m_f: temp,
            avg_humidity_relative_2m_pct: 50.0,
            avg_cloud_cover_tot_pct: 20.0,
            probability_of_precipitation_pct: 10.0,
        }
    }

    fn population(geo_id: &str, geo_name: &str, population: f64) -> CityPopulationRecord {
        CityPopulationRecord {
            geo_id: geo_id.to_string(),
            geo_name: geo_name.to_string(),
            level: "City".to_string(),
            country_geo_id: "country/USA".to_string(),
            population,
        }
    }

    fn zip(city_geo_id: &str, city_geo_name: &str, zip_geo_name: &str) -> ZipCodeRecord {
        ZipCodeRecord {
            city_geo_id: city_geo_id.to_string(),
            city_geo_name: city_geo_name.to_string(),
            zip_geo_name: zip_geo_name.to_string(),
        }
    }

    fn poi(category: &str, city_geo_id: &str) -> PoiRecord {
        PoiRecord {
            category_main: category.to_string(),
            city_geo_id: city_geo_id.to_string(),
            country_geo_id: "country/USA".to_string(),
        }
    }

    fn la_datasets() -> RawDatasets {
        RawDatasets {
            emissions: vec![
                emission("SEA", "LAX", Some(0.12), 200.0),
                emission("SEA", "LAX", Some(0.10), 100.0),
            ],
            flight_status: vec![
                status("SEA", "LAX", Some("OnTime")),
                status("SEA", "LAX", Some("Early")),
                status("SEA", "LAX", Some("Late")),
                status("SEA", "LAX", Some("Delayed")),
            ],
            weather: vec![
                weather("90001", "US", 74.0),
                weather("90002", "US", 76.0),
            ],
            city_populations: vec![population("geo/LA", "Los Angeles", 3_800_000.0)],
            zip_codes: vec![
                zip("geo/LA", "Los Angeles", "90001"),
                zip("geo/LA", "Los Angeles", "90002"),
            ],
            points_of_interest: vec![
                poi("Aquarium", "geo/LA"),
                poi("Zoo", "geo/LA"),
                poi("Korean Restaurant", "geo/LA"),
                poi("Korean Restaurant", "geo/LA"),
                poi("Museum", "geo/LA"),
            ],
        }
    }

    fn la_airports() -> AirportIndex {
        AirportIndex::from_records(vec![AirportRecord {
            iata: "lax".to_string(),
            city: "Los Angeles".to_string(),
            name: None,
            country: None,
        }])
    }

    fn home_sea() -> HomeConfig {
        HomeConfig {
            airport: "SEA".to_string(),
        }
    }

    #[test]
    fn zero_seat_and_missing_emission_rows_never_reach_the_division() {
        let rows = vec![
            emission("SEA", "LAX", Some(0.12), 200.0),
            emission("SEA", "LAX", Some(0.50), 0.0),
            emission("SEA", "LAX", None, 180.0),
        ];
        let out = extract_flight_emissions(&rows);
        assert_eq!(out.len(), 1);
        assert!((out[0].co2_emissions_kg_per_person - 0.6).abs() < 1e-9);
        assert!(out[0].co2_emissions_kg_per_person.is_finite());
    }

    #[test]
    fn punctuality_counts_on_time_and_early_only() {
        let rows = vec![
            status("SEA", "LAX", Some("OnTime")),
            status("SEA", "LAX", Some("Early")),
            status("SEA", "LAX", Some("Late")),
            status("SEA", "LAX", Some("Delayed")),
            status("SEA", "LAX", None),
        ];
        let out = extract_flight_punctuality(&rows);
        assert_eq!(out.len(), 1);
        assert!((out[0].punctual_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn weather_is_restricted_to_us_postal_codes() {
        let rows = vec![
            weather("90001", "US", 70.0),
            weather("90001", "US", 80.0),
            weather("V6B", "CA", 60.0),
        ];
        let out = extract_weather(&rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].postal_code, "90001");
        assert!((out[0].avg_temperature_air_f - 75.0).abs() < 1e-9);
    }

    #[test]
    fn major_cities_use_latest_population_reading_above_floor() {
        let mut rows = vec![
            population("geo/LA", "Los Angeles", 3_700_000.0),
            population("geo/LA", "Los Angeles", 3_800_000.0),
            population("geo/Small", "Smallville", 42_000.0),
        ];
        rows.push(CityPopulationRecord {
            level: "County".to_string(),
            ..population("geo/County", "Los Angeles County", 9_000_000.0)
        });
        let out = extract_major_cities(&rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].geo_name, "Los Angeles");
        assert_eq!(out[0].total_population, 3_800_000.0);
    }

    #[test]
    fn city_weather_drops_cities_without_forecast_coverage() {
        let cities = vec![
            MajorCity {
                geo_id: "geo/LA".to_string(),
                geo_name: "Los Angeles".to_string(),
                total_population: 3_800_000.0,
            },
            MajorCity {
                geo_id: "geo/NY".to_string(),
                geo_name: "New York".to_string(),
                total_population: 8_400_000.0,
            },
        ];
        let zips = vec![zip("geo/LA", "Los Angeles", "90001")];
        let weather = vec![PostalWeather {
            postal_code: "90001".to_string(),
            avg_temperature_air_f: 74.0,
            avg_relative_humidity_pct: 50.0,
            avg_cloud_cover_pct: 20.0,
            precipitation_probability_pct: 10.0,
        }];
        let out = extract_city_weather(&cities, &zips, &weather);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].geo_name, "Los Angeles");
    }

    #[test]
    fn attractions_count_only_policy_categories() {
        let cities = vec![MajorCity {
            geo_id: "geo/LA".to_string(),
            geo_name: "Los Angeles".to_string(),
            total_population: 3_800_000.0,
        }];
        let pois = vec![
            poi("Aquarium", "geo/LA"),
            poi("Zoo", "geo/LA"),
            poi("Zoo", "geo/LA"),
            poi("Korean Restaurant", "geo/LA"),
            poi("Museum", "geo/LA"),
            poi("Zoo", "geo/Unknown"),
        ];
        let out = extract_attractions(&cities, &pois);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].aquarium_cnt, 1);
        assert_eq!(out[0].zoo_cnt, 2);
        assert_eq!(out[0].korean_restaurant_cnt, 1);
    }

    #[test]
    fn harmonize_produces_one_row_per_reachable_destination() {
        let out = harmonize(&la_datasets(), &la_airports(), &home_sea());
        assert_eq!(out.len(), 1);
        let row = &out[0];
        assert_eq!(row.city, "Los Angeles");
        assert_eq!(row.airport, "LAX");
        // avg(0.12/200, 0.10/100) * 1000
        assert!((row.co2_emissions_kg_per_person - 0.8).abs() < 1e-9);
        assert!((row.punctual_pct - 50.0).abs() < 1e-9);
        assert!((row.avg_temperature_air_f - 75.0).abs() < 1e-9);
        assert_eq!(row.zoo_cnt, 1);
        assert_eq!(row.korean_restaurant_cnt, 2);
    }

    #[test]
    fn harmonize_drops_rows_for_unmapped_arrival_airports() {
        let out = harmonize(&la_datasets(), &AirportIndex::default(), &home_sea());
        assert!(out.is_empty());
    }

    #[test]
    fn harmonize_restricts_to_the_origin_airport() {
        let mut datasets = la_datasets();
        datasets.emissions.push(emission("PDX", "LAX", Some(0.11), 150.0));
        datasets.flight_status.push(status("PDX", "LAX", Some("OnTime")));
        let home = HomeConfig {
            airport: "PDX".to_string(),
        };
        let out = harmonize(&datasets, &la_airports(), &home);
        assert_eq!(out.len(), 1);
        assert!((out[0].punctual_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn harmonize_drops_destinations_without_weather() {
        let mut datasets = la_datasets();
        datasets.weather.clear();
        let out = harmonize(&datasets, &la_airports(), &home_sea());
        assert!(out.is_empty());
    }

    #[test]
    fn airport_index_lookup_is_case_insensitive() {
        let index = la_airports();
        assert_eq!(index.city_for("LAX"), Some("Los Angeles"));
        assert_eq!(index.city_for("lax"), Some("Los Angeles"));
        assert_eq!(index.city_for("JFK"), None);
    }

    #[test]
    fn airport_index_and_home_config_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let airports_path = dir.path().join(AIRPORTS_FILE);
        std::fs::write(
            &airports_path,
            r#"[{"iata": "SAN", "city": "San Diego", "name": "San Diego Intl", "country": "US"}]"#,
        )
        .unwrap();
        let home_path = dir.path().join(HOME_FILE);
        std::fs::write(&home_path, r#"{"airport": "SEA"}"#).unwrap();

        let index = AirportIndex::load(&airports_path).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.city_for("san"), Some("San Diego"));

        let home = HomeConfig::load(&home_path).unwrap();
        assert_eq!(home.airport, "SEA");
    }

    #[test]
    fn dataset_dir_surfaces_parse_failures_with_the_path() {
        let dir = tempfile::tempdir().unwrap();
        for name in DATASET_FILES {
            std::fs::write(dir.path().join(name), "[]").unwrap();
        }
        std::fs::write(dir.path().join(EMISSIONS_FILE), "not json").unwrap();
        let err = DatasetDir::new(dir.path()).load().unwrap_err();
        match err {
            SourceError::Parse { path, .. } => {
                assert!(path.ends_with(EMISSIONS_FILE));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
