//! Answer codec.
//!
//! A survey answer is five fields, each graded 1..=4. The five fields are
//! read as base-4 digits (first field most significant) and shifted into the
//! 1-based range 1..=1024, so the whole answer travels as one encrypted
//! scalar.

use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::crypto::EncryptedFieldType;
use crate::error::{Result, SurveyError};

pub const FIELD_COUNT: usize = 5;
pub const OPTIONS_PER_FIELD: u8 = 4;
pub const INDEX_MIN: u16 = 1;
pub const INDEX_MAX: u16 = 1024;

/// Positional weights, most significant field first.
const WEIGHTS: [u16; FIELD_COUNT] = [256, 64, 16, 4, 1];

/// Ciphertext type the survey payload is encrypted as.
pub const ANSWER_FIELD_TYPE: EncryptedFieldType =
    EncryptedFieldType::for_max_value(INDEX_MAX as u64);

/// A question shown to the participant.
#[derive(Debug, Clone, Copy)]
pub struct Question {
    pub title: &'static str,
    /// Measured range for each of the four options
    pub ranges: [&'static str; 4],
    /// Outcome label for each of the four options
    pub labels: [&'static str; 4],
}

pub const QUESTIONS: [Question; FIELD_COUNT] = [
    Question {
        title: "Heart Rate (bpm)",
        ranges: ["<60", "60-80", "81-100", ">100"],
        labels: ["Normal heart", "Slightly high heart", "High heart", "Very high heart"],
    },
    Question {
        title: "Blood Pressure (mmHg)",
        ranges: ["90-120", "121-130", "131-140", ">140"],
        labels: ["Normal BP", "Elevated BP", "High BP", "Very high BP"],
    },
    Question {
        title: "Blood Sugar (mg/dL)",
        ranges: ["<90", "90-120", "121-140", ">140"],
        labels: ["Normal sugar", "Slightly high sugar", "High sugar", "Very high sugar"],
    },
    Question {
        title: "Cholesterol (mg/dL)",
        ranges: ["<180", "180-200", "201-240", ">240"],
        labels: [
            "Normal cholesterol",
            "Slightly high cholesterol",
            "High cholesterol",
            "Very high cholesterol",
        ],
    },
    Question {
        title: "Body Temperature (C)",
        ranges: ["36-36.5", "36.6-37.0", "37.1-38.0", ">38"],
        labels: ["Normal temperature", "Low grade fever", "Fever", "High fever"],
    },
];

/// Every outcome text, in index order. Built on first use, read-only after.
static OUTCOMES: Lazy<Vec<String>> = Lazy::new(|| {
    let [heart, bp, sugar, chol, temp] = QUESTIONS.map(|q| q.labels);
    let mut outcomes = Vec::with_capacity(INDEX_MAX as usize);
    for h in heart {
        for b in bp {
            for s in sugar {
                for c in chol {
                    for t in temp {
                        outcomes.push(format!("{h}, {b}, {s}, {c}, {t}"));
                    }
                }
            }
        }
    }
    outcomes
});

/// Five validated answer fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnswerVector([u8; FIELD_COUNT]);

impl AnswerVector {
    pub fn new(fields: [u8; FIELD_COUNT]) -> Result<Self> {
        for (position, &value) in fields.iter().enumerate() {
            if !(1..=OPTIONS_PER_FIELD).contains(&value) {
                return Err(SurveyError::InvalidField {
                    position,
                    value: value as i64,
                });
            }
        }
        Ok(Self(fields))
    }

    pub fn fields(&self) -> [u8; FIELD_COUNT] {
        self.0
    }
}

/// Encoded answer in 1..=1024.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnswerIndex(u16);

impl AnswerIndex {
    pub fn new(value: u64) -> Option<Self> {
        if (INDEX_MIN as u64..=INDEX_MAX as u64).contains(&value) {
            Some(Self(value as u16))
        } else {
            None
        }
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

pub fn encode(answer: &AnswerVector) -> AnswerIndex {
    let offset: u16 = answer
        .0
        .iter()
        .zip(WEIGHTS)
        .map(|(&field, weight)| (field as u16 - 1) * weight)
        .sum();
    AnswerIndex(offset + INDEX_MIN)
}

pub fn decode(index: AnswerIndex) -> AnswerVector {
    let mut rest = index.0 - INDEX_MIN;
    let mut fields = [0u8; FIELD_COUNT];
    for (field, weight) in fields.iter_mut().zip(WEIGHTS) {
        *field = (rest / weight) as u8 + 1;
        rest %= weight;
    }
    AnswerVector(fields)
}

/// Rendered outcome for an index, or an explicit marker for indices out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Description {
    Outcome(&'static str),
    InvalidIndex,
}

impl Description {
    pub fn is_valid(&self) -> bool {
        matches!(self, Description::Outcome(_))
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Description::Outcome(text) => f.write_str(text),
            Description::InvalidIndex => f.write_str("Invalid index"),
        }
    }
}

pub fn describe(index: i64) -> Description {
    if index < INDEX_MIN as i64 || index > INDEX_MAX as i64 {
        return Description::InvalidIndex;
    }
    Description::Outcome(OUTCOMES[(index - 1) as usize].as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn all_vectors() -> impl Iterator<Item = AnswerVector> {
        (0..INDEX_MAX).map(|i| {
            let fields = [i / 256, (i / 64) % 4, (i / 16) % 4, (i / 4) % 4, i % 4]
                .map(|d| d as u8 + 1);
            AnswerVector::new(fields).unwrap()
        })
    }

    #[test]
    fn decode_inverts_encode_for_every_vector() {
        for v in all_vectors() {
            assert_eq!(decode(encode(&v)), v);
        }
    }

    #[test]
    fn encode_inverts_decode_for_every_index() {
        for i in INDEX_MIN..=INDEX_MAX {
            let index = AnswerIndex::new(i as u64).unwrap();
            assert_eq!(encode(&decode(index)), index);
        }
    }

    #[test]
    fn encode_is_injective() {
        let seen: HashSet<_> = all_vectors().map(|v| encode(&v)).collect();
        assert_eq!(seen.len(), INDEX_MAX as usize);
    }

    #[test]
    fn extremes() {
        let low = AnswerVector::new([1, 1, 1, 1, 1]).unwrap();
        let high = AnswerVector::new([4, 4, 4, 4, 4]).unwrap();
        assert_eq!(encode(&low).value(), 1);
        assert_eq!(encode(&high).value(), 1024);
        assert_eq!(encode(&AnswerVector::new([2, 1, 1, 1, 1]).unwrap()).value(), 257);
    }

    #[test]
    fn field_out_of_range_is_rejected() {
        assert_eq!(
            AnswerVector::new([1, 0, 1, 1, 1]),
            Err(SurveyError::InvalidField { position: 1, value: 0 })
        );
        assert!(AnswerVector::new([1, 1, 1, 1, 5]).is_err());
    }

    #[test]
    fn describe_agrees_with_decode() {
        for i in INDEX_MIN..=INDEX_MAX {
            let fields = decode(AnswerIndex::new(i as u64).unwrap()).fields();
            let expected: Vec<&str> = fields
                .iter()
                .zip(QUESTIONS.iter())
                .map(|(&f, q)| q.labels[f as usize - 1])
                .collect();
            assert_eq!(describe(i as i64).to_string(), expected.join(", "));
        }
    }

    #[test]
    fn describe_out_of_range() {
        for i in [i64::MIN, -1, 0, 1025, 4096, i64::MAX] {
            assert_eq!(describe(i), Description::InvalidIndex);
        }
        assert_eq!(describe(0).to_string(), "Invalid index");
    }

    #[test]
    fn index_bounds() {
        assert!(AnswerIndex::new(0).is_none());
        assert!(AnswerIndex::new(1025).is_none());
        assert!(AnswerIndex::new(1024).is_some());
    }

    #[test]
    fn payload_fits_sixteen_bits() {
        assert_eq!(ANSWER_FIELD_TYPE, EncryptedFieldType::U16);
    }
}
