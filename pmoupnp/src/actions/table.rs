//! Table statique action → handler

use super::{ActionArgs, ActionError, ActionResult, CallerIdentity};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::{debug, trace};

/// Identifiant d'action d'un service
///
/// Implémenté par [`upnp_actions!`](crate::upnp_actions).
pub trait UpnpAction: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Toutes les actions déclarées par le service
    const ALL: &'static [Self];

    /// Nom protocolaire de l'action
    fn name(&self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|action| action.name() == name)
    }
}

/// Handler d'une action pour un service `S`
pub type ActionHandler<S> = fn(&S, &ActionArgs, &CallerIdentity) -> ActionResult;

/// Association statique entre les actions d'un service et leurs handlers
pub struct ActionTable<S, A: UpnpAction> {
    handlers: HashMap<A, ActionHandler<S>>,
}

impl<S, A: UpnpAction> Default for ActionTable<S, A> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<S, A: UpnpAction> ActionTable<S, A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associe `handler` à `action` (remplace un handler existant)
    pub fn with(mut self, action: A, handler: ActionHandler<S>) -> Self {
        self.handlers.insert(action, handler);
        self
    }

    /// Nombre d'actions pourvues d'un handler
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Vérifie que chaque action déclarée a un handler
    pub fn validate(&self) -> Result<(), ActionError> {
        let missing: Vec<&'static str> = A::ALL
            .iter()
            .filter(|action| !self.handlers.contains_key(action))
            .map(|action| action.name())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ActionError::MissingHandlers(missing))
        }
    }

    /// Exécute l'action nommée `action_name`
    ///
    /// Retourne `None` si l'action n'est pas gérée par la table : l'appelant
    /// décide alors du comportement par défaut.
    pub fn dispatch(
        &self,
        service: &S,
        action_name: &str,
        args: &ActionArgs,
        caller: &CallerIdentity,
    ) -> Option<ActionResult> {
        let Some(action) = A::from_name(action_name) else {
            debug!(action = action_name, "Unhandled action");
            return None;
        };
        let handler = self.handlers.get(&action)?;

        trace!(action = action_name, caller = %caller.key(), "Dispatching action");
        Some(handler(service, args, caller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionFault, ActionResponse};

    crate::upnp_actions! {
        enum CounterAction {
            Get,
            Add,
            Broken,
        }
    }

    struct Counter {
        value: u32,
    }

    impl Counter {
        fn get(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
            Ok(ActionResponse::new().with("Value", self.value))
        }

        fn add(&self, args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
            let delta = args.required_u32("Delta")?;
            Ok(ActionResponse::new().with("Value", self.value + delta))
        }
    }

    fn table() -> ActionTable<Counter, CounterAction> {
        ActionTable::new()
            .with(CounterAction::Get, Counter::get)
            .with(CounterAction::Add, Counter::add)
    }

    #[test]
    fn test_validate_reports_missing_handlers() {
        assert_eq!(
            table().validate(),
            Err(ActionError::MissingHandlers(vec!["Broken"]))
        );

        let complete = table().with(CounterAction::Broken, |_, _, _| {
            Err(ActionFault::action_failed("broken"))
        });
        assert!(complete.validate().is_ok());
        assert_eq!(complete.len(), 3);
    }

    #[test]
    fn test_dispatch() {
        let counter = Counter { value: 3 };
        let caller = CallerIdentity::default();
        let table = table();

        let response = table
            .dispatch(&counter, "Add", &ActionArgs::new().with("Delta", "4"), &caller)
            .unwrap()
            .unwrap();
        assert_eq!(response.get("Value"), Some("7"));

        let fault = table
            .dispatch(&counter, "Add", &ActionArgs::new(), &caller)
            .unwrap()
            .unwrap_err();
        assert_eq!(fault.code, 402);

        // Action déclarée sans handler ou inconnue : non gérée
        assert!(table.dispatch(&counter, "Broken", &ActionArgs::new(), &caller).is_none());
        assert!(table.dispatch(&counter, "Nope", &ActionArgs::new(), &caller).is_none());
    }
}
