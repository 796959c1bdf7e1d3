//! The eight fixed quality categories and a total mapping over them.

use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A quality category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Syntax,
    Structure,
    Output,
    Integration,
    Performance,
    Usability,
    Maintainability,
    Documentation,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Syntax,
        Category::Structure,
        Category::Output,
        Category::Integration,
        Category::Performance,
        Category::Usability,
        Category::Maintainability,
        Category::Documentation,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Syntax => "Syntax",
            Self::Structure => "Structure",
            Self::Output => "Output Quality",
            Self::Integration => "Integration",
            Self::Performance => "Performance",
            Self::Usability => "Usability",
            Self::Maintainability => "Maintainability",
            Self::Documentation => "Documentation",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Structure => write!(f, "structure"),
            Self::Output => write!(f, "output"),
            Self::Integration => write!(f, "integration"),
            Self::Performance => write!(f, "performance"),
            Self::Usability => write!(f, "usability"),
            Self::Maintainability => write!(f, "maintainability"),
            Self::Documentation => write!(f, "documentation"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "syntax" => Ok(Self::Syntax),
            "structure" => Ok(Self::Structure),
            "output" | "output_quality" => Ok(Self::Output),
            "integration" => Ok(Self::Integration),
            "performance" => Ok(Self::Performance),
            "usability" => Ok(Self::Usability),
            "maintainability" => Ok(Self::Maintainability),
            "documentation" | "docs" => Ok(Self::Documentation),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// One value per category, guaranteed total.
///
/// Serializes as a map keyed by category; deserializing requires every
/// category to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryMap<T> {
    values: [T; 8],
}

impl<T> CategoryMap<T> {
    pub fn from_fn(mut f: impl FnMut(Category) -> T) -> Self {
        Self {
            values: Category::ALL.map(&mut f),
        }
    }

    pub fn get(&self, category: Category) -> &T {
        &self.values[category.index()]
    }

    pub fn set(&mut self, category: Category, value: T) {
        self.values[category.index()] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> + '_ {
        Category::ALL.iter().map(move |c| (*c, &self.values[c.index()]))
    }

    pub fn map<U>(&self, mut f: impl FnMut(Category, &T) -> U) -> CategoryMap<U> {
        CategoryMap::from_fn(|c| f(c, &self.values[c.index()]))
    }
}

impl<T> Index<Category> for CategoryMap<T> {
    type Output = T;

    fn index(&self, category: Category) -> &T {
        &self.values[category.index()]
    }
}

impl<T> IndexMut<Category> for CategoryMap<T> {
    fn index_mut(&mut self, category: Category) -> &mut T {
        &mut self.values[category.index()]
    }
}

impl<T: Serialize> Serialize for CategoryMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Category::ALL.len()))?;
        for (category, value) in self.iter() {
            map.serialize_entry(&category, value)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for CategoryMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut raw: BTreeMap<Category, T> = BTreeMap::deserialize(deserializer)?;

        let missing: Vec<String> = Category::ALL
            .iter()
            .filter(|c| !raw.contains_key(c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(D::Error::custom(format!(
                "missing categories: {}",
                missing.join(", ")
            )));
        }

        let ordered: Vec<T> = Category::ALL
            .iter()
            .filter_map(|c| raw.remove(c))
            .collect();
        let values: [T; 8] = ordered
            .try_into()
            .map_err(|_| D::Error::custom("category map must have exactly 8 entries"))?;
        Ok(Self { values })
    }
}

/// The eight category scores of one assessment, each in 0-100.
pub type CategoryScores = CategoryMap<f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_display_and_parse() {
        for category in Category::ALL {
            let parsed: Category = category.to_string().parse().unwrap();
            assert_eq!(parsed, category);
        }
        assert_eq!("docs".parse::<Category>().unwrap(), Category::Documentation);
        assert!("speed".parse::<Category>().is_err());
    }

    #[test]
    fn map_index_and_set() {
        let mut map = CategoryMap::from_fn(|_| 0u32);
        map.set(Category::Output, 7);
        map[Category::Syntax] += 3;

        assert_eq!(map[Category::Output], 7);
        assert_eq!(*map.get(Category::Syntax), 3);
        assert_eq!(map.iter().map(|(_, v)| *v).sum::<u32>(), 10);
    }

    #[test]
    fn iter_follows_declaration_order() {
        let map = CategoryMap::from_fn(|c| c);
        let order: Vec<Category> = map.iter().map(|(c, _)| c).collect();
        assert_eq!(order, Category::ALL.to_vec());
    }

    #[test]
    fn serializes_as_named_map() {
        let map = CategoryMap::from_fn(|c| if c == Category::Output { 55.0 } else { 90.0 });
        let json = serde_json::to_value(map).unwrap();
        assert_eq!(json["output"], 55.0);
        assert_eq!(json["documentation"], 90.0);

        let restored: CategoryScores = serde_json::from_value(json).unwrap();
        assert_eq!(restored, map);
    }

    #[test]
    fn deserialize_rejects_partial_map() {
        let result: Result<CategoryMap<f64>, _> =
            serde_json::from_str(r#"{"syntax": 1.0, "output": 2.0}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("missing categories"));
        assert!(err.contains("structure"));
    }
}
