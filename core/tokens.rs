//! Token-count estimation.
//!
//! The default estimator is a crude character heuristic (four characters per
//! token, rounded up). It is not a tokenizer. A BPE-backed estimator using the
//! `cl100k_base` vocabulary is available when a closer figure is wanted.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tiktoken_rs::CoreBPE;

pub const CHARS_PER_TOKEN: usize = 4;

/// `ceil(chars / 4)` over Unicode scalar values.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

pub trait TokenEstimator: Send + Sync {
    fn name(&self) -> &'static str;
    fn estimate(&self, text: &str) -> usize;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CharRatio;

impl TokenEstimator for CharRatio {
    fn name(&self) -> &'static str {
        "chars/4"
    }

    fn estimate(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

pub struct Cl100k {
    bpe: CoreBPE,
}

impl Cl100k {
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| AppError::TikToken(e.to_string()))?;
        Ok(Self { bpe })
    }
}

impl TokenEstimator for Cl100k {
    fn name(&self) -> &'static str {
        "cl100k_base"
    }

    fn estimate(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tokenizer {
    #[default]
    Chars,
    Cl100k,
}

impl Tokenizer {
    pub fn estimator(self) -> Result<Box<dyn TokenEstimator>> {
        match self {
            Tokenizer::Chars => Ok(Box::new(CharRatio)),
            Tokenizer::Cl100k => {
                log::debug!("Loading cl100k_base vocabulary...");
                Ok(Box::new(Cl100k::new()?))
            }
        }
    }
}

impl FromStr for Tokenizer {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "chars" | "char" => Ok(Tokenizer::Chars),
            "cl100k" | "cl100k_base" => Ok(Tokenizer::Cl100k),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown tokenizer '{}'. Use 'chars' or 'cl100k'.",
                other
            ))),
        }
    }
}

impl fmt::Display for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tokenizer::Chars => f.write_str("chars"),
            Tokenizer::Cl100k => f.write_str("cl100k"),
        }
    }
}
