//! Rewrites fetched content into insertable units.

use serde_json::Value;
use tracing::debug;

use crate::classify::Variant;
use crate::environment::ExecutionEnvironment;
use crate::error::{LoaderError, LoaderResult};
use crate::namespace::{LoadedModule, ModuleKind};

/// Append the debug source-location annotation for `identifier`.
pub fn with_source_marker(content: &str, identifier: &str) -> String {
    format!("{}\n//# sourceURL={}\n", content, identifier)
}

/// Inert script text, executed as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub identifier: String,
    pub text: String,
}

/// Legacy module body, loaded under `name` in an isolated scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyModuleSource {
    pub identifier: String,
    pub name: String,
    pub declares_legacy_namespace: bool,
    /// Module body including the source marker.
    pub body: String,
}

impl LegacyModuleSource {
    /// Script form: the body as a string literal passed to the module loader.
    pub fn script(&self) -> String {
        format!("goog.loadModule({});", Value::String(self.body.clone()))
    }
}

/// Progress of a native module import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeModuleState {
    NotStarted,
    Importing,
    Settled,
}

/// Deferred insertion of a native module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeModuleImport {
    pub identifier: String,
    pub module_id: Option<String>,
    state: NativeModuleState,
}

impl NativeModuleImport {
    pub fn new(identifier: impl Into<String>, module_id: Option<String>) -> Self {
        Self {
            identifier: identifier.into(),
            module_id,
            state: NativeModuleState::NotStarted,
        }
    }

    pub fn state(&self) -> NativeModuleState {
        self.state
    }

    /// Run the import choreography. Only returns `Ok` once `Settled`.
    ///
    /// Pre-load marker: switch the loader state to native, keeping the old
    /// one. Then import. Post-load: restore the old state and register the
    /// exports under the declared module id.
    pub async fn settle<E>(&mut self, env: &mut E) -> LoaderResult<()>
    where
        E: ExecutionEnvironment + ?Sized,
    {
        if self.state != NativeModuleState::NotStarted {
            return Err(LoaderError::insertion(
                &self.identifier,
                "native module import already started",
            ));
        }

        let previous = env.swap_loader_state(Some(ModuleKind::Native));
        self.state = NativeModuleState::Importing;
        debug!(identifier = %self.identifier, "importing native module");

        let imported = env.import_native_module(&self.identifier).await;
        env.swap_loader_state(previous);
        let exports = imported?;

        if let Some(id) = &self.module_id {
            env.loaded_modules().register(
                id.clone(),
                LoadedModule {
                    exports,
                    kind: ModuleKind::Native,
                },
            );
        }
        self.state = NativeModuleState::Settled;
        Ok(())
    }
}

/// A unit ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformedUnit {
    Script(Script),
    LegacyModule(LegacyModuleSource),
    NativeModule(NativeModuleImport),
}

impl TransformedUnit {
    pub fn identifier(&self) -> &str {
        match self {
            Self::Script(script) => &script.identifier,
            Self::LegacyModule(module) => &module.identifier,
            Self::NativeModule(module) => &module.identifier,
        }
    }

    /// Whether insertion finishes synchronously.
    pub fn is_inert(&self) -> bool {
        !matches!(self, Self::NativeModule(_))
    }
}

/// Rewrite `content` for its variant.
pub fn transform(identifier: &str, content: &str, variant: &Variant) -> TransformedUnit {
    match variant {
        Variant::LegacyModule {
            name,
            declares_legacy_namespace,
        } => TransformedUnit::LegacyModule(LegacyModuleSource {
            identifier: identifier.to_string(),
            name: name.clone(),
            declares_legacy_namespace: *declares_legacy_namespace,
            body: with_source_marker(content, identifier),
        }),
        Variant::NativeModule { module_id } => {
            TransformedUnit::NativeModule(NativeModuleImport::new(identifier, module_id.clone()))
        }
        Variant::Mock | Variant::Test | Variant::Plain => TransformedUnit::Script(Script {
            identifier: identifier.to_string(),
            text: with_source_marker(content, identifier),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_is_content_plus_one_comment() {
        let unit = transform("src/a.js", "var a = 1;", &Variant::Plain);
        let TransformedUnit::Script(script) = unit else {
            panic!("expected script");
        };
        assert_eq!(script.text, "var a = 1;\n//# sourceURL=src/a.js\n");
        assert!(script.text.starts_with("var a = 1;"));
    }

    #[test]
    fn test_mock_and_test_are_inert_scripts() {
        for variant in [Variant::Mock, Variant::Test] {
            let unit = transform("a.mock.js", "x();", &variant);
            assert!(unit.is_inert());
            assert!(matches!(unit, TransformedUnit::Script(_)));
        }
    }

    #[test]
    fn test_legacy_module_script_is_escaped_literal() {
        let variant = Variant::LegacyModule {
            name: "os.a".into(),
            declares_legacy_namespace: false,
        };
        let unit = transform("os/a.js", "goog.module('os.a');\nexports.s = \"q\";", &variant);
        let TransformedUnit::LegacyModule(module) = unit else {
            panic!("expected legacy module");
        };
        assert_eq!(module.name, "os.a");
        assert_eq!(
            module.script(),
            r#"goog.loadModule("goog.module('os.a');\nexports.s = \"q\";\n//# sourceURL=os/a.js\n");"#
        );
    }

    #[test]
    fn test_native_module_starts_not_started() {
        let variant = Variant::NativeModule {
            module_id: Some("os.w".into()),
        };
        let unit = transform("w.js", "export const w = 1;", &variant);
        assert!(!unit.is_inert());
        let TransformedUnit::NativeModule(import) = unit else {
            panic!("expected native module");
        };
        assert_eq!(import.state(), NativeModuleState::NotStarted);
        assert_eq!(import.module_id.as_deref(), Some("os.w"));
    }
}
