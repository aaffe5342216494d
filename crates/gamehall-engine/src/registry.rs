//! The engine registry: game-type key → engine.
//!
//! Built once at startup and shared by `Arc`. There is no global: every
//! component that needs engine lookup is handed the registry explicitly.

use std::collections::HashMap;
use std::sync::Arc;

use gamehall_protocol::GameType;
use tracing::info;

use crate::{Bingo, EngineError, GameEngine, NumberGuess};

#[derive(Clone, Default)]
pub struct EngineRegistry {
    engines: HashMap<GameType, Arc<dyn GameEngine>>,
}

impl EngineRegistry {
    pub fn builder() -> EngineRegistryBuilder {
        EngineRegistryBuilder::default()
    }

    /// A registry with the bundled Bingo and NumberGuess engines.
    pub fn with_defaults() -> Self {
        let mut engines: HashMap<GameType, Arc<dyn GameEngine>> = HashMap::new();
        for engine in [
            Arc::new(Bingo::new()) as Arc<dyn GameEngine>,
            Arc::new(NumberGuess::new()),
        ] {
            engines.insert(engine.game_type().clone(), engine);
        }
        Self { engines }
    }

    /// # Errors
    /// `UnknownGameType` if nothing is registered under `game_type`.
    pub fn get(&self, game_type: &str) -> Result<Arc<dyn GameEngine>, EngineError> {
        self.engines
            .get(game_type)
            .cloned()
            .ok_or_else(|| EngineError::UnknownGameType(game_type.to_string()))
    }

    pub fn contains(&self, game_type: &str) -> bool {
        self.engines.contains_key(game_type)
    }

    pub fn game_types(&self) -> impl Iterator<Item = &GameType> {
        self.engines.keys()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("game_types", &self.engines.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Collects engines and rejects duplicate keys.
#[derive(Default)]
pub struct EngineRegistryBuilder {
    engines: HashMap<GameType, Arc<dyn GameEngine>>,
}

impl EngineRegistryBuilder {
    /// # Errors
    /// `DuplicateGameType` if an engine with the same key is already
    /// registered.
    pub fn register<E: GameEngine>(self, engine: E) -> Result<Self, EngineError> {
        self.register_shared(Arc::new(engine))
    }

    pub fn register_shared(
        mut self,
        engine: Arc<dyn GameEngine>,
    ) -> Result<Self, EngineError> {
        let key = engine.game_type().clone();
        if self.engines.contains_key(&key) {
            return Err(EngineError::DuplicateGameType(key));
        }
        info!(game_type = %key, "engine registered");
        self.engines.insert(key, engine);
        Ok(self)
    }

    pub fn build(self) -> EngineRegistry {
        EngineRegistry {
            engines: self.engines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bingo, number_guess};

    #[test]
    fn test_defaults_register_both_variants() {
        let registry = EngineRegistry::with_defaults();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(bingo::GAME_TYPE));
        assert!(registry.contains(number_guess::GAME_TYPE));
        assert_eq!(
            registry.get("BINGO").unwrap().game_type().as_str(),
            "BINGO"
        );
    }

    #[test]
    fn test_unknown_game_type_is_config_error() {
        let registry = EngineRegistry::with_defaults();
        assert_eq!(
            registry.get("CHESS").err(),
            Some(EngineError::UnknownGameType("CHESS".into()))
        );
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let result = EngineRegistry::builder()
            .register(Bingo::new())
            .and_then(|b| b.register(Bingo::new()));
        assert!(matches!(result, Err(EngineError::DuplicateGameType(_))));
    }

    #[test]
    fn test_builder_custom_set() {
        let registry = EngineRegistry::builder()
            .register(NumberGuess::with_fixed_secret(42))
            .unwrap()
            .build();
        assert!(registry.contains("NUMBER_GUESS"));
        assert!(!registry.contains("BINGO"));
    }
}
