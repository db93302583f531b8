use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, ServiceError};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ContextId);

pub const DEFAULT_AGE: &str = "18";

/// One row of the People collection. `user_name` is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Person {
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub age: String,
}

impl Default for Person {
    fn default() -> Self {
        Self {
            user_name: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            age: DEFAULT_AGE.to_string(),
        }
    }
}

impl Person {
    pub fn new(
        user_name: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        age: impl Into<String>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            age: age.into(),
        }
    }

    pub fn get(&self, field: PersonField) -> &str {
        match field {
            PersonField::UserName => &self.user_name,
            PersonField::FirstName => &self.first_name,
            PersonField::LastName => &self.last_name,
            PersonField::Age => &self.age,
        }
    }

    pub fn set(&mut self, field: PersonField, value: impl Into<String>) {
        let slot = match field {
            PersonField::UserName => &mut self.user_name,
            PersonField::FirstName => &mut self.first_name,
            PersonField::LastName => &mut self.last_name,
            PersonField::Age => &mut self.age,
        };
        *slot = value.into();
    }

    pub fn is_named(&self) -> bool {
        !self.user_name.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonField {
    UserName,
    FirstName,
    LastName,
    Age,
}

impl PersonField {
    pub const ALL: [PersonField; 4] = [
        PersonField::UserName,
        PersonField::FirstName,
        PersonField::LastName,
        PersonField::Age,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PersonField::UserName => "UserName",
            PersonField::FirstName => "FirstName",
            PersonField::LastName => "LastName",
            PersonField::Age => "Age",
        }
    }
}

impl fmt::Display for PersonField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonField {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PersonField::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ServiceError::new(ErrorCode::Validation, format!("unknown field '{s}'")))
    }
}

/// Three-state ordering on LastName. The numeric index is what the view model persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    None,
    Ascending,
    Descending,
}

impl SortOrder {
    const CYCLE: [SortOrder; 3] = [SortOrder::None, SortOrder::Ascending, SortOrder::Descending];

    pub fn index(self) -> usize {
        match self {
            SortOrder::None => 0,
            SortOrder::Ascending => 1,
            SortOrder::Descending => 2,
        }
    }

    pub fn from_index(index: usize) -> Self {
        Self::CYCLE[index % Self::CYCLE.len()]
    }

    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Text id naming this state in the text bundle.
    pub fn text_id(self) -> &'static str {
        match self {
            SortOrder::None => "sortNone",
            SortOrder::Ascending => "sortAscending",
            SortOrder::Descending => "sortDescending",
        }
    }
}
