//! Simulation configuration record.
//!
//! The same JSON shape is used to create, edit, import and export a
//! simulation. Optional sections (`rotation`, `reactions`, parameter lists)
//! default explicitly here instead of being absence-checked at call sites.
//! Wire names follow the engine, including its `gridLenght` spelling.

use crate::apportion::calculate_fractions;
use crate::error::ConfigError;
use crate::labels::{resolve_rotating, ComponentLabel, MAX_COMPONENTS, NO_ROTATION};
use crate::pair_matrix::{generate_pair_matrix, InteractionEntry, InteractionMatrix, PairKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance used when checking that molar fractions sum to 100.
const FRACTION_SUM_EPSILON: f64 = 1e-9;

/// Minimum length of a simulation name.
const MIN_NAME_LEN: usize = 3;

/// One species of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub name: String,

    /// Palette colour name, only used for rendering
    #[serde(default = "default_color")]
    pub color: String,

    /// Percentage of the grid initially occupied (0-100)
    #[serde(default)]
    pub molar_fraction: f64,
}

fn default_color() -> String {
    "gray".to_string()
}

impl Ingredient {
    pub fn new(name: impl Into<String>, color: impl Into<String>, molar_fraction: f64) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            molar_fraction,
        }
    }
}

/// Rotating component selector and its rotation probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Component letter or `"None"`
    #[serde(default = "default_rotation_component")]
    pub component: String,

    #[serde(rename = "Prot", default)]
    pub p_rot: f64,
}

fn default_rotation_component() -> String {
    NO_ROTATION.to_string()
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            component: default_rotation_component(),
            p_rot: 0.0,
        }
    }
}

/// Movement probabilities and pairwise interaction parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Per-component movement probability
    #[serde(rename = "Pm", default)]
    pub pm: Vec<f64>,

    /// Pairwise interaction parameters, one per generated pair
    #[serde(rename = "J", default)]
    pub j: Vec<InteractionEntry>,
}

/// Optional chemical reaction rule. Interpreted by the engine only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    #[serde(default)]
    pub reactants: Vec<String>,

    #[serde(default)]
    pub products: Vec<String>,

    #[serde(default)]
    pub has_intermediate: bool,

    /// Forward probabilities, indexed by the engine per reaction step
    #[serde(rename = "Pr", default)]
    pub pr: Vec<f64>,

    #[serde(default)]
    pub reverse_pr: Vec<f64>,
}

/// The full simulation configuration as exchanged with the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub ingredients: Vec<Ingredient>,

    pub grid_height: u32,

    #[serde(rename = "gridLenght", alias = "gridLength")]
    pub grid_length: u32,

    pub iterations_number: u64,

    #[serde(default)]
    pub rotation: Rotation,

    #[serde(default)]
    pub parameters: Parameters,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<Reaction>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            ingredients: Vec::new(),
            grid_height: 1,
            grid_length: 1,
            iterations_number: 1,
            rotation: Rotation::default(),
            parameters: Parameters::default(),
            reactions: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serializes to pretty JSON, as used for downloads.
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Number of cells in one grid snapshot.
    pub fn total_cells(&self) -> u64 {
        self.grid_height as u64 * self.grid_length as u64
    }

    /// The rotating component, if the selector names a current component.
    pub fn rotating_component(&self) -> Option<ComponentLabel> {
        resolve_rotating(&self.rotation.component, self.ingredients.len())
    }

    pub fn molar_fractions(&self) -> Vec<f64> {
        self.ingredients.iter().map(|i| i.molar_fraction).collect()
    }

    /// Cell counts per component for a full grid.
    pub fn cell_counts(&self) -> Vec<u64> {
        calculate_fractions(self.total_cells(), &self.molar_fractions())
    }

    /// Interaction pairs for the current inventory and rotation.
    pub fn pair_keys(&self) -> Vec<PairKey> {
        generate_pair_matrix(self.ingredients.len(), self.rotating_component())
    }

    pub fn interactions(&self) -> InteractionMatrix {
        InteractionMatrix::from_entries(&self.parameters.j)
    }

    /// Regenerates `parameters.J` after a count or rotation change.
    ///
    /// Also resizes `Pm` to one value per component, padding with `default`.
    pub fn sync_interactions(&mut self, default: f64) {
        let mut matrix = self.interactions();
        matrix.regenerate(self.ingredients.len(), self.rotating_component(), default);
        self.parameters.j = matrix.to_entries();
        self.parameters.pm.resize(self.ingredients.len(), default);
    }

    /// Appends a component and regenerates dependent parameters.
    pub fn add_ingredient(&mut self, ingredient: Ingredient, default: f64) -> Result<(), ConfigError> {
        if self.ingredients.len() >= MAX_COMPONENTS {
            return Err(ConfigError::TooManyComponents(MAX_COMPONENTS));
        }
        self.ingredients.push(ingredient);
        self.sync_interactions(default);
        Ok(())
    }

    /// Removes the component at `index`, cascade-deleting every interaction
    /// entry that references it. Later components shift down one letter, and
    /// the rotation selector follows its component (or resets to `"None"`
    /// when the rotating component itself is removed).
    pub fn remove_ingredient(&mut self, index: usize) -> Result<Ingredient, ConfigError> {
        let label = ComponentLabel::from_index(index)
            .filter(|_| index < self.ingredients.len())
            .ok_or(ConfigError::NoSuchComponent(index))?;

        let rotating = self.rotating_component();
        let mut matrix = self.interactions();
        matrix.remove_component(label);

        let removed = self.ingredients.remove(index);
        if index < self.parameters.pm.len() {
            self.parameters.pm.remove(index);
        }
        self.parameters.j = matrix.to_entries();

        self.rotation.component = match rotating {
            Some(r) if r == label => NO_ROTATION.to_string(),
            Some(r) if r > label => ComponentLabel::from_index(r.index() - 1)
                .map(|l| l.to_string())
                .unwrap_or_else(|| NO_ROTATION.to_string()),
            Some(r) => r.to_string(),
            None => NO_ROTATION.to_string(),
        };

        Ok(removed)
    }

    /// Changes the rotating component and regenerates dependent parameters.
    pub fn set_rotating_component(&mut self, rotating: Option<ComponentLabel>, default: f64) {
        self.rotation.component = rotating
            .filter(|r| r.index() < self.ingredients.len())
            .map(|r| r.to_string())
            .unwrap_or_else(|| NO_ROTATION.to_string());
        self.sync_interactions(default);
    }

    /// Runs the form-layer checks and reports every violation.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.name.trim().chars().count() < MIN_NAME_LEN {
            issues.push(ConfigIssue::NameTooShort);
        }
        if self.grid_height == 0 || self.grid_length == 0 {
            issues.push(ConfigIssue::EmptyGrid);
        }
        if self.iterations_number == 0 {
            issues.push(ConfigIssue::NoIterations);
        }
        if self.ingredients.is_empty() {
            issues.push(ConfigIssue::NoComponents);
        }
        if self.ingredients.len() > MAX_COMPONENTS {
            issues.push(ConfigIssue::TooManyComponents(self.ingredients.len()));
        }

        for (index, ingredient) in self.ingredients.iter().enumerate() {
            if ingredient.name.trim().is_empty() {
                issues.push(ConfigIssue::UnnamedComponent(index));
            }
            if !(0.0..=100.0).contains(&ingredient.molar_fraction) {
                issues.push(ConfigIssue::FractionOutOfRange(index));
            }
        }
        let sum: f64 = self.molar_fractions().iter().sum();
        if !self.ingredients.is_empty() && (sum - 100.0).abs() > FRACTION_SUM_EPSILON {
            issues.push(ConfigIssue::FractionSum(sum));
        }

        let rotation = self.rotation.component.trim();
        if !rotation.is_empty() && rotation != NO_ROTATION && self.rotating_component().is_none() {
            issues.push(ConfigIssue::UnknownRotatingComponent(rotation.to_string()));
        }
        if !(0.0..=1.0).contains(&self.rotation.p_rot) {
            issues.push(ConfigIssue::ProbabilityOutOfRange("Prot".to_string()));
        }

        for (index, pm) in self.parameters.pm.iter().enumerate() {
            if !(0.0..=1.0).contains(pm) {
                issues.push(ConfigIssue::ProbabilityOutOfRange(format!("Pm[{}]", index)));
            }
        }
        for entry in &self.parameters.j {
            if !(0.0..=1.0).contains(&entry.value) {
                issues.push(ConfigIssue::ProbabilityOutOfRange(format!("J[{}]", entry.relation)));
            }
        }
        let expected = self.pair_keys();
        let actual: Vec<PairKey> = self.interactions().keys().copied().collect();
        if actual != expected || actual.len() != self.parameters.j.len() {
            issues.push(ConfigIssue::InteractionsOutOfSync {
                expected: expected.len(),
                found: self.parameters.j.len(),
            });
        }

        for (index, reaction) in self.reactions.iter().enumerate() {
            let fields = [("Pr", &reaction.pr), ("reversePr", &reaction.reverse_pr)];
            for (field, values) in fields {
                for (slot, p) in values.iter().enumerate() {
                    if !(0.0..=1.0).contains(p) {
                        issues.push(ConfigIssue::ProbabilityOutOfRange(format!(
                            "reactions[{}].{}[{}]",
                            index, field, slot
                        )));
                    }
                }
            }
        }

        issues
    }
}

/// A form-layer validation failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigIssue {
    NameTooShort,
    EmptyGrid,
    NoIterations,
    NoComponents,
    TooManyComponents(usize),
    UnnamedComponent(usize),
    FractionOutOfRange(usize),
    FractionSum(f64),
    UnknownRotatingComponent(String),
    ProbabilityOutOfRange(String),
    InteractionsOutOfSync { expected: usize, found: usize },
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::NameTooShort => write!(f, "name must be at least {} characters", MIN_NAME_LEN),
            ConfigIssue::EmptyGrid => write!(f, "grid dimensions must be positive"),
            ConfigIssue::NoIterations => write!(f, "iteration count must be positive"),
            ConfigIssue::NoComponents => write!(f, "at least one component is required"),
            ConfigIssue::TooManyComponents(n) => write!(f, "{} components exceed the limit of {}", n, MAX_COMPONENTS),
            ConfigIssue::UnnamedComponent(i) => write!(f, "component {} has no name", i),
            ConfigIssue::FractionOutOfRange(i) => write!(f, "molar fraction of component {} must be within 0-100", i),
            ConfigIssue::FractionSum(sum) => write!(f, "molar fractions sum to {} instead of 100", sum),
            ConfigIssue::UnknownRotatingComponent(c) => write!(f, "rotating component {} does not exist", c),
            ConfigIssue::ProbabilityOutOfRange(field) => write!(f, "{} must be within 0-1", field),
            ConfigIssue::InteractionsOutOfSync { expected, found } => {
                write!(f, "expected {} interaction parameters, found {}", expected, found)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "ingredients": [
            { "name": "water", "color": "blue", "molarFraction": 60 },
            { "name": "oil", "color": "orange", "molarFraction": 40 }
        ],
        "gridHeight": 4,
        "gridLenght": 5,
        "iterationsNumber": 10
    }"#;

    fn sample() -> SimulationConfig {
        let mut config = SimulationConfig::from_json(MINIMAL).unwrap();
        config.name = "emulsion".to_string();
        config.sync_interactions(0.5);
        config
    }

    #[test]
    fn test_optional_sections_default() {
        let config = SimulationConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.rotation.component, "None");
        assert_eq!(config.rotation.p_rot, 0.0);
        assert!(config.parameters.j.is_empty());
        assert!(config.reactions.is_empty());
        assert_eq!(config.rotating_component(), None);
        assert_eq!(config.total_cells(), 20);
        assert_eq!(config.cell_counts(), vec![12, 8]);
    }

    #[test]
    fn test_wire_names_round_trip() {
        let mut config = sample();
        config.rotation = Rotation { component: "B".to_string(), p_rot: 0.3 };
        config.reactions.push(Reaction {
            reactants: vec!["A".into(), "B".into()],
            products: vec!["C".into()],
            has_intermediate: true,
            pr: vec![0.2, 0.05],
            reverse_pr: vec![0.1],
        });

        let json = config.to_json_pretty().unwrap();
        assert!(json.contains("\"gridLenght\": 5"));
        assert!(json.contains("\"Prot\": 0.3"));
        assert!(json.contains("\"hasIntermediate\": true"));
        assert!(json.contains("\"relation\": \"A|A\""));
        assert_eq!(SimulationConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_engine_shaped_config() {
        let json = r#"{
            "name": "engine",
            "ingredients": [
                { "name": "A", "color": "red", "molarFraction": 50 },
                { "name": "B", "color": "blue", "molarFraction": 50 }
            ],
            "gridHeight": 2,
            "gridLenght": 2,
            "iterationsNumber": 5,
            "parameters": {
                "Pm": [0.5, 0.5],
                "J": [
                    { "relation": "A|A", "value": 0.9 },
                    { "relation": "A|B", "value": 0.8 },
                    { "relation": "B|B", "value": 0.7 }
                ]
            },
            "reactions": [
                { "reactants": ["A", "B"], "products": ["B"], "hasIntermediate": false,
                  "Pr": [0.5, 0.2], "reversePr": [0.1] }
            ]
        }"#;

        let mut config = SimulationConfig::from_json(json).unwrap();
        assert_eq!(config.reactions[0].pr, vec![0.5, 0.2]);
        assert_eq!(config.reactions[0].reverse_pr, vec![0.1]);
        assert!(config.validate().is_empty());

        let before = config.parameters.j.clone();
        config.sync_interactions(0.0);
        assert_eq!(config.parameters.j, before);

        let reparsed = SimulationConfig::from_json(&config.to_json_pretty().unwrap()).unwrap();
        assert_eq!(reparsed, config);

        config.reactions[0].reverse_pr.push(1.5);
        assert_eq!(
            config.validate(),
            vec![ConfigIssue::ProbabilityOutOfRange("reactions[0].reversePr[1]".to_string())]
        );
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = SimulationConfig::from_json("{\"ingredients\": 3}").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_valid_config_has_no_issues() {
        assert!(sample().validate().is_empty());
    }

    #[test]
    fn test_validation_reports_every_issue() {
        let mut config = sample();
        config.name = "ab".to_string();
        config.ingredients[0].molar_fraction = 70.0;
        config.rotation.component = "Q".to_string();
        config.parameters.j[0].value = 1.5;

        let issues = config.validate();
        assert!(issues.contains(&ConfigIssue::NameTooShort));
        assert!(issues.contains(&ConfigIssue::FractionSum(110.0)));
        assert!(issues.contains(&ConfigIssue::UnknownRotatingComponent("Q".to_string())));
        assert!(issues.contains(&ConfigIssue::ProbabilityOutOfRange("J[A|A]".to_string())));
    }

    #[test]
    fn test_rotation_change_regenerates_interactions() {
        let mut config = sample();
        config.set_rotating_component(ComponentLabel::from_index(0), 0.1);
        assert_eq!(config.rotation.component, "A");
        assert_eq!(config.parameters.j.len(), 6);
        assert_eq!(config.parameters.j[0].relation, "A1|A1");
        assert!(config.validate().is_empty());

        // Unknown components reset the selector
        config.set_rotating_component(ComponentLabel::from_index(7), 0.1);
        assert_eq!(config.rotation.component, "None");
        assert_eq!(config.parameters.j.len(), 3);
    }

    #[test]
    fn test_remove_ingredient_cascades() {
        let mut config = sample();
        config
            .add_ingredient(Ingredient::new("soap", "green", 0.0), 0.2)
            .unwrap();
        config.set_rotating_component(ComponentLabel::from_index(2), 0.2);
        assert_eq!(config.parameters.j.len(), 10);

        let removed = config.remove_ingredient(0).unwrap();
        assert_eq!(removed.name, "water");
        assert_eq!(config.rotation.component, "B");
        assert_eq!(config.parameters.pm.len(), 2);
        let relations: Vec<_> = config.parameters.j.iter().map(|e| e.relation.as_str()).collect();
        assert_eq!(relations, vec!["A|A", "A|B1", "A|B2", "B1|B1", "B1|B2", "B2|B2"]);

        config.remove_ingredient(1).unwrap();
        assert_eq!(config.rotation.component, "None");
        assert!(matches!(config.remove_ingredient(5), Err(ConfigError::NoSuchComponent(5))));
    }
}
