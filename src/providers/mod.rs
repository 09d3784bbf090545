//! Speech backends and the registry that holds them.

mod espeak;
mod translate;

pub use espeak::ESpeak;
pub use translate::GoogleTranslate;

use crate::errors::TtsError;
use crate::service::Service;

/// Ordered collection of registered services.
///
/// Registration order is preserved so configuration UIs list backends
/// the way the host added them.
#[derive(Default)]
pub struct Registry {
    services: Vec<Box<dyn Service>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service, verifying its declaration first: it must carry a
    /// non-empty name, at least one capability trait, and a name no
    /// earlier registration claimed.
    pub fn register(&mut self, service: Box<dyn Service>) -> Result<(), TtsError> {
        if service.name().trim().is_empty() {
            return Err(TtsError::MissingDeclaration {
                reason: "service has no name".to_string(),
            });
        }
        if service.traits().is_empty() {
            return Err(TtsError::MissingDeclaration {
                reason: format!("{} declares no capability traits", service.name()),
            });
        }
        if self.get(service.name()).is_some() {
            return Err(TtsError::MissingDeclaration {
                reason: format!("{} is already registered", service.name()),
            });
        }

        self.services.push(service);
        Ok(())
    }

    /// Look up a service by name.
    pub fn get(&self, name: &str) -> Option<&(dyn Service)> {
        self.services
            .iter()
            .find(|s| s.name() == name)
            .map(Box::as_ref)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(dyn Service)> {
        self.services.iter().map(Box::as_ref)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ServiceOption;
    use crate::service::ServiceTrait;
    use std::collections::HashMap;
    use std::path::Path;

    struct Fake {
        name: &'static str,
        traits: Vec<ServiceTrait>,
    }

    impl Service for Fake {
        fn name(&self) -> &str {
            self.name
        }
        fn traits(&self) -> &[ServiceTrait] {
            &self.traits
        }
        fn describe(&self) -> String {
            "fake backend".to_string()
        }
        fn options(&self) -> Vec<ServiceOption> {
            Vec::new()
        }
        fn run(
            &self,
            _text: &str,
            _options: &HashMap<String, String>,
            _path: &Path,
        ) -> Result<(), TtsError> {
            Ok(())
        }
    }

    fn fake(name: &'static str) -> Box<Fake> {
        Box::new(Fake {
            name,
            traits: vec![ServiceTrait::Internet],
        })
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let mut registry = Registry::new();
        registry.register(fake("beta")).unwrap();
        registry.register(fake("alpha")).unwrap();
        assert_eq!(registry.names(), ["beta", "alpha"]);
        assert!(registry.get("alpha").is_some());
        assert!(registry.get("gamma").is_none());
    }

    #[test]
    fn test_incomplete_declarations_are_rejected() {
        let mut registry = Registry::new();

        let err = registry.register(fake("")).unwrap_err();
        assert!(matches!(err, TtsError::MissingDeclaration { .. }));

        let err = registry
            .register(Box::new(Fake {
                name: "traitless",
                traits: Vec::new(),
            }))
            .unwrap_err();
        assert!(matches!(err, TtsError::MissingDeclaration { .. }));

        registry.register(fake("dup")).unwrap();
        let err = registry.register(fake("dup")).unwrap_err();
        assert!(matches!(err, TtsError::MissingDeclaration { .. }));
        assert_eq!(registry.len(), 1);
    }
}
