//! Workout catalog: where session definitions come from.
//!
//! The built-in catalog ships with the binary. Users can add or override
//! workouts with a `workouts.json` file in the data directory; the layered
//! catalog consults the file first.

use crate::{Error, ExerciseDefinition, Result, WorkoutDefinition};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::path::Path;

/// Cached built-in catalog instance
static BUILTIN_CATALOG: Lazy<BuiltinCatalog> = Lazy::new(build_builtin_catalog);

/// Source of workout definitions
pub trait WorkoutCatalog {
    /// Look up a workout by id.
    ///
    /// Fails with [`Error::WorkoutNotFound`] when the id is unknown.
    fn fetch(&self, id: &str) -> Result<WorkoutDefinition>;

    /// All workouts, ordered by id
    fn list(&self) -> Vec<WorkoutDefinition>;

    /// Workouts whose category matches (case-insensitive)
    fn list_category(&self, category: &str) -> Vec<WorkoutDefinition> {
        self.list()
            .into_iter()
            .filter(|w| {
                w.category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(category))
            })
            .collect()
    }
}

/// Workouts compiled into the binary
#[derive(Clone, Debug)]
pub struct BuiltinCatalog {
    workouts: BTreeMap<String, WorkoutDefinition>,
}

/// Get a reference to the cached built-in catalog
pub fn builtin_catalog() -> &'static BuiltinCatalog {
    &BUILTIN_CATALOG
}

impl WorkoutCatalog for BuiltinCatalog {
    fn fetch(&self, id: &str) -> Result<WorkoutDefinition> {
        self.workouts
            .get(id)
            .cloned()
            .ok_or_else(|| Error::WorkoutNotFound(id.to_string()))
    }

    fn list(&self) -> Vec<WorkoutDefinition> {
        self.workouts.values().cloned().collect()
    }
}

impl BuiltinCatalog {
    /// Validate every workout. Returns a list of problems (empty if valid).
    pub fn validate(&self) -> Vec<String> {
        validate_all(self.workouts.values())
    }
}

fn validate_all<'a>(workouts: impl Iterator<Item = &'a WorkoutDefinition>) -> Vec<String> {
    workouts
        .filter_map(|w| w.validate().err())
        .map(|e| e.to_string())
        .collect()
}

fn exercise(name: &str, seconds: u32, met: Option<f64>) -> ExerciseDefinition {
    ExerciseDefinition {
        met,
        ..ExerciseDefinition::timed(name, seconds)
    }
}

fn build_builtin_catalog() -> BuiltinCatalog {
    let mut workouts = BTreeMap::new();

    let mut add = |workout: WorkoutDefinition| {
        workouts.insert(workout.id.clone(), workout);
    };

    add(WorkoutDefinition {
        id: "cardio_hiit_blast".into(),
        name: "HIIT Blast".into(),
        intensity: Some("high".into()),
        category: Some("cardio".into()),
        exercises: vec![
            exercise("Jumping Jacks", 45, Some(8.0)),
            exercise("Burpees", 40, Some(8.0)),
            exercise("Mountain Climbers", 45, Some(8.0)),
            exercise("High Knees", 40, Some(8.0)),
        ],
    });

    add(WorkoutDefinition {
        id: "cardio_steady_burn".into(),
        name: "Steady Burn".into(),
        intensity: Some("medium".into()),
        category: Some("cardio".into()),
        exercises: vec![
            exercise("March in Place", 120, Some(3.5)),
            exercise("Step Touch", 120, None),
            ExerciseDefinition {
                calories_per_minute: Some(7.0),
                ..exercise("Shadow Boxing", 90, None)
            },
        ],
    });

    add(WorkoutDefinition {
        id: "stretch_full_body".into(),
        name: "Full Body Stretch".into(),
        intensity: Some("low".into()),
        category: Some("stretch".into()),
        exercises: vec![
            exercise("Neck Rolls", 30, Some(2.3)),
            exercise("Standing Quad Stretch", 60, Some(2.3)),
            exercise("Hamstring Fold", 60, Some(2.3)),
            exercise("Cat-Cow", 45, Some(2.3)),
        ],
    });

    add(WorkoutDefinition {
        id: "relax_breathing".into(),
        name: "Box Breathing Reset".into(),
        intensity: Some("low".into()),
        category: Some("relax".into()),
        exercises: vec![
            exercise("Box Breathing", 120, Some(1.3)),
            exercise("Body Scan", 180, Some(1.0)),
        ],
    });

    BuiltinCatalog { workouts }
}

/// Workouts loaded from a JSON array file
#[derive(Clone, Debug, Default)]
pub struct JsonCatalog {
    workouts: BTreeMap<String, WorkoutDefinition>,
}

impl JsonCatalog {
    /// Load a catalog file.
    ///
    /// A missing file gives an empty catalog; a malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No workout catalog file at {:?}", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let list: Vec<WorkoutDefinition> = serde_json::from_str(&contents)?;

        let mut workouts = BTreeMap::new();
        for workout in list {
            if workouts.contains_key(&workout.id) {
                tracing::warn!("Duplicate workout id '{}' in {:?}, keeping last", workout.id, path);
            }
            workouts.insert(workout.id.clone(), workout);
        }

        tracing::info!("Loaded {} workouts from {:?}", workouts.len(), path);
        Ok(Self { workouts })
    }

    pub fn len(&self) -> usize {
        self.workouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }

    pub fn validate(&self) -> Vec<String> {
        validate_all(self.workouts.values())
    }
}

impl WorkoutCatalog for JsonCatalog {
    fn fetch(&self, id: &str) -> Result<WorkoutDefinition> {
        self.workouts
            .get(id)
            .cloned()
            .ok_or_else(|| Error::WorkoutNotFound(id.to_string()))
    }

    fn list(&self) -> Vec<WorkoutDefinition> {
        self.workouts.values().cloned().collect()
    }
}

/// User catalog over the built-in one
#[derive(Clone, Debug)]
pub struct LayeredCatalog {
    user: JsonCatalog,
    builtin: &'static BuiltinCatalog,
}

impl LayeredCatalog {
    pub fn new(user: JsonCatalog) -> Self {
        Self {
            user,
            builtin: builtin_catalog(),
        }
    }

    /// Built-in workouts plus `<data_dir>/workouts.json`
    pub fn load(data_dir: &Path) -> Result<Self> {
        Ok(Self::new(JsonCatalog::load(&data_dir.join("workouts.json"))?))
    }

    /// Problems with user workouts. Built-ins are checked by tests.
    pub fn validate(&self) -> Vec<String> {
        self.user.validate()
    }
}

impl WorkoutCatalog for LayeredCatalog {
    fn fetch(&self, id: &str) -> Result<WorkoutDefinition> {
        match self.user.fetch(id) {
            Err(Error::WorkoutNotFound(_)) => self.builtin.fetch(id),
            other => other,
        }
    }

    fn list(&self) -> Vec<WorkoutDefinition> {
        let mut merged: BTreeMap<String, WorkoutDefinition> = self
            .builtin
            .workouts
            .iter()
            .map(|(id, w)| (id.clone(), w.clone()))
            .collect();
        merged.extend(self.user.workouts.iter().map(|(id, w)| (id.clone(), w.clone())));
        merged.into_values().collect()
    }
}
