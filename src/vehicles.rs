//! # Vehicle Data Model
//!
//! The inventory record exchanged through commands and kept by the store.
//!
//! Field constraints follow the collection rules: positive id, non-empty
//! name, x strictly greater than -731, y strictly less than 803, positive
//! engine power and distance, fuel type required, vehicle type optional.
//! Validation returns the full list of violations rather than stopping at
//! the first one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Category of a vehicle. Optional on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    #[serde(rename = "CAR")]
    Car,
    #[serde(rename = "PLANE")]
    Plane,
    #[serde(rename = "HELICOPTER")]
    Helicopter,
    #[serde(rename = "HOVERBOARD")]
    Hoverboard,
    #[serde(rename = "SPACESHIP")]
    Spaceship,
}

impl VehicleType {
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleType::Car => "CAR",
            VehicleType::Plane => "PLANE",
            VehicleType::Helicopter => "HELICOPTER",
            VehicleType::Hoverboard => "HOVERBOARD",
            VehicleType::Spaceship => "SPACESHIP",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CAR" => Ok(VehicleType::Car),
            "PLANE" => Ok(VehicleType::Plane),
            "HELICOPTER" => Ok(VehicleType::Helicopter),
            "HOVERBOARD" => Ok(VehicleType::Hoverboard),
            "SPACESHIP" => Ok(VehicleType::Spaceship),
            other => Err(format!("unrecognized vehicle type: {other}")),
        }
    }
}

/// Fuel powering a vehicle. Required on every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelType {
    #[serde(rename = "ALCOHOL")]
    Alcohol,
    #[serde(rename = "MANPOWER")]
    Manpower,
    #[serde(rename = "NUCLEAR")]
    Nuclear,
}

impl FuelType {
    pub fn as_str(self) -> &'static str {
        match self {
            FuelType::Alcohol => "ALCOHOL",
            FuelType::Manpower => "MANPOWER",
            FuelType::Nuclear => "NUCLEAR",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FuelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ALCOHOL" => Ok(FuelType::Alcohol),
            "MANPOWER" => Ok(FuelType::Manpower),
            "NUCLEAR" => Ok(FuelType::Nuclear),
            other => Err(format!("unrecognized fuel type: {other}")),
        }
    }
}

/// Location of a vehicle. Hashable so records can be grouped by position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

impl PartialEq for Coordinates {
    fn eq(&self, other: &Self) -> bool {
        self.x.to_bits() == other.x.to_bits() && self.y.to_bits() == other.y.to_bits()
    }
}

impl Eq for Coordinates {}

impl Hash for Coordinates {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.to_bits().hash(state);
        self.y.to_bits().hash(state);
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coordinates{{x={}, y={}}}", self.x, self.y)
    }
}

/// One inventory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i32,
    pub name: String,
    pub coordinates: Coordinates,
    pub creation_date: DateTime<Utc>,
    pub engine_power: f32,
    pub distance_travelled: f32,
    pub vehicle_type: Option<VehicleType>,
    pub fuel_type: FuelType,
    pub user_id: i32,
}

impl Vehicle {
    /// Validate field constraints, returning every violation.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.id <= 0 {
            errors.push(format!("id must be positive, got {}", self.id));
        }
        if self.name.is_empty() {
            errors.push("name cannot be empty".to_string());
        }
        if !self.coordinates.x.is_finite() || self.coordinates.x <= -731.0 {
            errors.push(format!(
                "x coordinate must be greater than -731, got {}",
                self.coordinates.x
            ));
        }
        if !self.coordinates.y.is_finite() || self.coordinates.y >= 803.0 {
            errors.push(format!(
                "y coordinate must be less than 803, got {}",
                self.coordinates.y
            ));
        }
        if !self.engine_power.is_finite() || self.engine_power <= 0.0 {
            errors.push(format!(
                "engine power must be positive, got {}",
                self.engine_power
            ));
        }
        if !self.distance_travelled.is_finite() || self.distance_travelled <= 0.0 {
            errors.push(format!(
                "distance travelled must be positive, got {}",
                self.distance_travelled
            ));
        }

        errors
    }

    /// Order vehicles by engine power.
    pub fn cmp_by_power(&self, other: &Vehicle) -> Ordering {
        self.engine_power
            .partial_cmp(&other.engine_power)
            .unwrap_or(Ordering::Equal)
    }

    /// Parse a vehicle from the positional argument form used by commands:
    /// `name x y engine_power distance_travelled type fuel_type`.
    ///
    /// The name may be quoted to carry spaces. The type slot accepts `-` or
    /// an empty string for "no type". Returns the violation list on any
    /// parse or constraint failure.
    pub fn from_args(
        args: &[String],
        id: i32,
        user_id: i32,
    ) -> Result<Vehicle, Vec<String>> {
        if args.len() < 7 {
            return Err(vec![format!(
                "expected 7 vehicle fields (name x y engine_power distance_travelled type fuel_type), got {}",
                args.len()
            )]);
        }

        let mut errors = Vec::new();

        let name = args[0].trim_matches('"').to_string();
        let x = parse_field::<f64>(&args[1], "x coordinate", &mut errors);
        let y = parse_field::<f64>(&args[2], "y coordinate", &mut errors);
        let engine_power = parse_field::<f32>(&args[3], "engine power", &mut errors);
        let distance_travelled = parse_field::<f32>(&args[4], "distance travelled", &mut errors);

        let vehicle_type = match args[5].as_str() {
            "" | "-" => None,
            raw => match raw.parse::<VehicleType>() {
                Ok(vt) => Some(vt),
                Err(e) => {
                    errors.push(e);
                    None
                }
            },
        };

        let fuel_type = match args[6].parse::<FuelType>() {
            Ok(ft) => Some(ft),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        let vehicle = Vehicle {
            id,
            name,
            coordinates: Coordinates {
                x: x.unwrap_or_default(),
                y: y.unwrap_or_default(),
            },
            creation_date: Utc::now(),
            engine_power: engine_power.unwrap_or_default(),
            distance_travelled: distance_travelled.unwrap_or_default(),
            vehicle_type,
            // Checked above; the slot is only None when errors were pushed.
            fuel_type: fuel_type.unwrap_or(FuelType::Alcohol),
            user_id,
        };

        let violations = vehicle.validate();
        if violations.is_empty() {
            Ok(vehicle)
        } else {
            Err(violations)
        }
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Vehicle{{id={}, name={}, {}, created={}, enginePower={}, distanceTravelled={}, type={}, fuelType={}, owner={}}}",
            self.id,
            self.name,
            self.coordinates,
            self.creation_date.to_rfc3339(),
            self.engine_power,
            self.distance_travelled,
            self.vehicle_type
                .map(VehicleType::as_str)
                .unwrap_or("none"),
            self.fuel_type,
            self.user_id,
        )
    }
}

fn parse_field<T: FromStr>(raw: &str, field: &str, errors: &mut Vec<String>) -> Option<T> {
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(format!("{field} is not a number: {raw}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn sample_args() -> Vec<String> {
        ["\"car1\"", "3.0", "4.0", "0.7", "20.0", "CAR", "ALCOHOL"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn parses_the_positional_argument_form() {
        let v = Vehicle::from_args(&sample_args(), 1, 42).unwrap();
        assert_eq!(v.name, "car1");
        assert_eq!(v.coordinates, Coordinates { x: 3.0, y: 4.0 });
        assert_eq!(v.vehicle_type, Some(VehicleType::Car));
        assert_eq!(v.fuel_type, FuelType::Alcohol);
        assert_eq!(v.user_id, 42);
    }

    #[test]
    fn dash_means_no_vehicle_type() {
        let mut args = sample_args();
        args[5] = "-".to_string();
        let v = Vehicle::from_args(&args, 1, 1).unwrap();
        assert_eq!(v.vehicle_type, None);
    }

    #[test]
    fn constraint_violations_are_collected() {
        let mut args = sample_args();
        args[1] = "-900.0".to_string(); // x below the floor
        args[3] = "-1".to_string(); // non-positive power
        let errors = Vehicle::from_args(&args, 1, 1).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn enum_conversions_reject_unknown_values() {
        assert!("TRAIN".parse::<VehicleType>().is_err());
        assert!("COAL".parse::<FuelType>().is_err());
        assert_eq!("hoverboard".parse::<VehicleType>().unwrap(), VehicleType::Hoverboard);
        assert_eq!("nuclear".parse::<FuelType>().unwrap(), FuelType::Nuclear);
    }

    #[test]
    fn ordering_follows_engine_power() {
        let a = Vehicle::from_args(&sample_args(), 1, 1).unwrap();
        let mut args = sample_args();
        args[3] = "9000.0".to_string();
        let b = Vehicle::from_args(&args, 2, 1).unwrap();
        assert_eq!(a.cmp_by_power(&b), Ordering::Less);
    }
}
