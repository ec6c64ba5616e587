//! Simulator options.
//!
//! To add an option, append an entry to the `OPTION_DEFS` array; parsing,
//! range checking, duplicate warnings and default handling come for free.
//! Options are read once while building the compartment, the integrator
//! config and the export precision, never inside the stepping loop, so the
//! `HashMap` lookup cost is irrelevant.

use std::collections::HashMap;

use log::warn;

/// Typed value for a simulator option.
#[derive(Debug, Clone)]
pub enum OptionValue {
    Int(i64),
    Float(f64),
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Range constraint for validating option values.
#[derive(Debug, Clone)]
pub enum OptionRange {
    None,
    /// Inclusive range for integers.
    IntRange(i64, i64),
    /// Exclusive range for floats.
    FloatRange(f64, f64),
}

/// Static definition of one simulator option.
#[derive(Debug, Clone)]
pub struct OptionDef {
    pub name: &'static str,
    pub description: &'static str,
    pub default: OptionValue,
    pub range: OptionRange,
}

/// All known simulator options.
const OPTION_DEFS: &[OptionDef] = &[
    OptionDef {
        name: "celsius",
        description: "Temperature in Celsius",
        default: OptionValue::Float(34.0),
        range: OptionRange::FloatRange(-273.15, 100.0),
    },
    OptionDef {
        name: "membrane_resist",
        description: "Specific membrane resistance in ohm*cm^2",
        default: OptionValue::Float(120_000.0),
        range: OptionRange::FloatRange(0.0, 1e9),
    },
    OptionDef {
        name: "axial_resist",
        description: "Axial resistance in ohm*cm",
        default: OptionValue::Float(140.0),
        range: OptionRange::FloatRange(0.0, 1e6),
    },
    OptionDef {
        name: "membrane_cap",
        description: "Specific membrane capacitance in uF/cm^2",
        default: OptionValue::Float(0.8),
        range: OptionRange::FloatRange(0.0, 100.0),
    },
    OptionDef {
        name: "diam",
        description: "Section diameter in um",
        default: OptionValue::Float(262.6117),
        range: OptionRange::FloatRange(0.0, 1e5),
    },
    OptionDef {
        name: "length",
        description: "Section length in um",
        default: OptionValue::Float(262.6117),
        range: OptionRange::FloatRange(0.0, 1e5),
    },
    OptionDef {
        name: "abstol",
        description: "Absolute voltage tolerance in mV",
        default: OptionValue::Float(1e-4),
        range: OptionRange::FloatRange(0.0, 1.0),
    },
    OptionDef {
        name: "reltol",
        description: "Relative tolerance",
        default: OptionValue::Float(1e-4),
        range: OptionRange::FloatRange(0.0, 1.0),
    },
    OptionDef {
        name: "dtmin",
        description: "Minimum time step in ms",
        default: OptionValue::Float(1e-3),
        range: OptionRange::FloatRange(0.0, 10.0),
    },
    OptionDef {
        name: "dtmax",
        description: "Maximum time step in ms",
        default: OptionValue::Float(25.0),
        range: OptionRange::FloatRange(0.0, 1000.0),
    },
    OptionDef {
        name: "settle",
        description: "Settle margin after the step epoch in ms",
        default: OptionValue::Float(1000.0),
        range: OptionRange::FloatRange(0.0, 1e6),
    },
    OptionDef {
        name: "precision",
        description: "Significant digits in exported values",
        default: OptionValue::Int(6),
        range: OptionRange::IntRange(1, 15),
    },
];

#[derive(Debug, Clone)]
struct OptionEntry {
    value: OptionValue,
    is_set: bool,
}

/// Container for all simulator options, populated with defaults from
/// `OPTION_DEFS`. Call `set()` to apply user-specified values.
#[derive(Debug, Clone)]
pub struct SimOptions {
    entries: HashMap<String, OptionEntry>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SimOptions {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        for def in OPTION_DEFS {
            entries.insert(
                def.name.to_string(),
                OptionEntry {
                    value: def.default.clone(),
                    is_set: false,
                },
            );
        }
        Self { entries }
    }

    /// Set an option by name from a raw string value.
    ///
    /// Parses the value according to the option's type, validates against
    /// its range, and stores it. Warns on unknown options, parse errors,
    /// out-of-range values and redefinitions; an invalid value leaves the
    /// previous one in place.
    pub fn set(&mut self, key: &str, raw_value: &str) {
        let key_lower = key.to_ascii_lowercase();

        let def = match OPTION_DEFS.iter().find(|d| d.name == key_lower) {
            Some(d) => d,
            None => {
                warn!("unknown option '{}' ignored", key);
                return;
            }
        };

        let parsed = match &def.default {
            OptionValue::Float(_) => match raw_value.parse::<f64>() {
                Ok(v) => OptionValue::Float(v),
                Err(_) => {
                    warn!(
                        "option '{}' value '{}' is not a valid number, ignored",
                        key_lower, raw_value
                    );
                    return;
                }
            },
            OptionValue::Int(_) => match raw_value.parse::<i64>() {
                Ok(v) => OptionValue::Int(v),
                Err(_) => {
                    warn!(
                        "option '{}' value '{}' is not a valid integer, ignored",
                        key_lower, raw_value
                    );
                    return;
                }
            },
        };

        if !validate_range(&parsed, &def.range) {
            warn!(
                "option '{}' value {} out of range ({}), keeping {}",
                key_lower,
                parsed,
                format_range(&def.range),
                self.entries[&key_lower].value
            );
            return;
        }

        if let Some(entry) = self.entries.get(&key_lower) {
            if entry.is_set {
                warn!(
                    "option '{}' redefined (was {}), using new value {}",
                    key_lower, entry.value, parsed
                );
            }
        }

        self.entries.insert(
            key_lower,
            OptionEntry {
                value: parsed,
                is_set: true,
            },
        );
    }

    /// Get a float option value (returns 0.0 if not found).
    pub fn get_float(&self, key: &str) -> f64 {
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                OptionValue::Float(v) => *v,
                _ => 0.0,
            },
            None => 0.0,
        }
    }

    /// Get an integer option value (returns 0 if not found).
    pub fn get_int(&self, key: &str) -> i64 {
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                OptionValue::Int(v) => *v,
                _ => 0,
            },
            None => 0,
        }
    }

    /// Check whether the user explicitly set this option.
    pub fn is_set(&self, key: &str) -> bool {
        self.entries.get(key).map_or(false, |e| e.is_set)
    }

    /// Print all user-set options to stdout. Prints nothing if none were set.
    pub fn print_user_options(&self) {
        let mut user_set: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_set)
            .collect();
        if user_set.is_empty() {
            return;
        }
        user_set.sort_by_key(|(name, _)| (*name).clone());
        println!("options:");
        for (name, entry) in &user_set {
            println!("  {} = {}", name, entry.value);
        }
    }
}

fn validate_range(value: &OptionValue, range: &OptionRange) -> bool {
    match (value, range) {
        (_, OptionRange::None) => true,
        (OptionValue::Float(v), OptionRange::FloatRange(min, max)) => *v > *min && *v < *max,
        (OptionValue::Int(v), OptionRange::IntRange(min, max)) => *v >= *min && *v <= *max,
        _ => true,
    }
}

fn format_range(range: &OptionRange) -> String {
    match range {
        OptionRange::None => "no range".to_string(),
        OptionRange::IntRange(min, max) => format!("{} to {}", min, max),
        OptionRange::FloatRange(min, max) => format!("{} to {}", min, max),
    }
}
