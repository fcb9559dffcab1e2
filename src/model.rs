use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Department {
    Computer,
    It,
    Electrical,
    Civil,
    Mechanical,
    Cddm,
    Automobile,
}

impl Department {
    pub const ALL: [Department; 7] = [
        Department::Computer,
        Department::It,
        Department::Electrical,
        Department::Civil,
        Department::Mechanical,
        Department::Cddm,
        Department::Automobile,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Department::Computer => "COMPUTER",
            Department::It => "IT",
            Department::Electrical => "ELECTRICAL",
            Department::Civil => "CIVIL",
            Department::Mechanical => "MECHANICAL",
            Department::Cddm => "CDDM",
            Department::Automobile => "AUTOMOBILE",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = ValidationError;

    /// Exact, case-sensitive match on the canonical name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Older portal builds spelled the civil department "CIVL".
        if s == "CIVL" {
            return Ok(Department::Civil);
        }
        Department::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownDepartment(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Semester(u8);

impl Semester {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 8;

    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Semester(value as u8))
        } else {
            Err(ValidationError::SemesterOutOfRange(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Semester> {
        (Self::MIN..=Self::MAX).map(Semester)
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One long-format row: a single student's mark in a single subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub enrollment: String,
    pub name: String,
    pub department: Department,
    pub semester: Semester,
    pub subject: String,
    pub marks: i64,
    pub exam_name: String,
    pub academic_year: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
    pub name: String,
    pub enrollment: String,
    pub department: Department,
    pub semester: Semester,
    pub exam_name: String,
    pub academic_year: String,
}

/// A student's slice reshaped into a subject table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentResult {
    pub student: StudentInfo,
    pub marks: IndexMap<String, i64>,
}
