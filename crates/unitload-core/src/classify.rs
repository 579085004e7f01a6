//! Unit classification.
//!
//! Module flavors are decided from content so a mis-named file cannot behave
//! like plain code. Mock and test units are recognised by identifier only;
//! that split exists for the test-harness ordering.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, LoaderResult};

lazy_static! {
    /// `goog.module('name');` at a line start, tolerant of leading comments.
    static ref LEGACY_MODULE: Regex = Regex::new(r"(?m)^goog\.module\('([^']+)'\);").unwrap();
    /// Legacy namespace declaration inside a legacy module.
    static ref LEGACY_NAMESPACE: Regex =
        Regex::new(r"(?m)^\s*goog\.module\.declareLegacyNamespace\(\);").unwrap();
    /// Native module export at a line start.
    static ref NATIVE_EXPORT: Regex = Regex::new(r"(?m)^export ").unwrap();
    /// Module id declared by a native module.
    static ref DECLARE_MODULE_ID: Regex =
        Regex::new(r"(?m)^goog\.declareModuleId\('([^']+)'\);\r?$").unwrap();
    static ref MOCK_SUFFIX: Regex = Regex::new(r"\.mock\.js$").unwrap();
    static ref TEST_SUFFIX: Regex = Regex::new(r"\.test\.js$").unwrap();
}

/// Unit flavor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    /// Module body loaded under a dotted name.
    LegacyModule {
        name: String,
        declares_legacy_namespace: bool,
    },
    /// Host-native module; its import settles asynchronously.
    NativeModule { module_id: Option<String> },
    Mock,
    Test,
    Plain,
}

impl Variant {
    pub fn kind(&self) -> VariantKind {
        match self {
            Self::LegacyModule { .. } => VariantKind::LegacyModule,
            Self::NativeModule { .. } => VariantKind::NativeModule,
            Self::Mock => VariantKind::Mock,
            Self::Test => VariantKind::Test,
            Self::Plain => VariantKind::Plain,
        }
    }
}

/// Field-less variant tag, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    LegacyModule,
    NativeModule,
    Mock,
    Test,
    Plain,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LegacyModule => "legacy",
            Self::NativeModule => "native",
            Self::Mock => "mock",
            Self::Test => "test",
            Self::Plain => "plain",
        };
        f.write_str(name)
    }
}

/// Patterns driving [`Classifier`].
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    legacy_module: Regex,
    legacy_namespace: Regex,
    native_export: Regex,
    declare_module_id: Regex,
    mock_identifier: Regex,
    test_identifier: Regex,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            legacy_module: LEGACY_MODULE.clone(),
            legacy_namespace: LEGACY_NAMESPACE.clone(),
            native_export: NATIVE_EXPORT.clone(),
            declare_module_id: DECLARE_MODULE_ID.clone(),
            mock_identifier: MOCK_SUFFIX.clone(),
            test_identifier: TEST_SUFFIX.clone(),
        }
    }
}

impl ClassifierRules {
    /// Replace the identifier pattern that marks mock units.
    pub fn with_mock_pattern(mut self, pattern: &str) -> LoaderResult<Self> {
        self.mock_identifier = compile(pattern)?;
        Ok(self)
    }

    /// Replace the identifier pattern that marks test units.
    pub fn with_test_pattern(mut self, pattern: &str) -> LoaderResult<Self> {
        self.test_identifier = compile(pattern)?;
        Ok(self)
    }
}

fn compile(pattern: &str) -> LoaderResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| LoaderError::config(format!("invalid pattern {}: {}", pattern, e)))
}

/// Pure, total classifier. Same input, same variant.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    rules: ClassifierRules,
}

impl Classifier {
    pub fn new(rules: ClassifierRules) -> Self {
        Self { rules }
    }

    pub fn classify(&self, identifier: &str, content: &str) -> Variant {
        if let Some(caps) = self.rules.legacy_module.captures(content) {
            return Variant::LegacyModule {
                name: caps[1].to_string(),
                declares_legacy_namespace: self.rules.legacy_namespace.is_match(content),
            };
        }

        if self.rules.native_export.is_match(content) {
            let module_id = self
                .rules
                .declare_module_id
                .captures(content)
                .map(|caps| caps[1].to_string());
            return Variant::NativeModule { module_id };
        }

        self.classify_identifier(identifier)
    }

    /// Identifier-only rules, used when the loader never sees the content.
    pub fn classify_identifier(&self, identifier: &str) -> Variant {
        if self.rules.mock_identifier.is_match(identifier) {
            Variant::Mock
        } else if self.rules.test_identifier.is_match(identifier) {
            Variant::Test
        } else {
            Variant::Plain
        }
    }
}
