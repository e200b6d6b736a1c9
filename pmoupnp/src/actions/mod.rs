//! # Module Actions - Dispatch statique des actions UPnP
//!
//! Chaque service déclare ses actions dans une énumération (voir
//! [`upnp_actions!`](crate::upnp_actions)) et associe à chacune un handler
//! dans une [`ActionTable`]. La table est validée au démarrage : une action
//! déclarée sans handler est une erreur de construction, pas une surprise à
//! l'exécution.
//!
//! ```text
//! SoapAction (nom + arguments texte)
//!       ↓ UpnpAction::from_name
//! ActionTable → handler(service, ActionArgs, CallerIdentity)
//!       ↓
//! ActionResponse | ActionFault
//! ```
//!
//! # Examples
//!
//! ```
//! use pmoupnp::actions::{ActionArgs, ActionResponse, ActionResult, ActionTable, CallerIdentity};
//! use pmoupnp::upnp_actions;
//!
//! upnp_actions! {
//!     pub enum ClockAction { Time, Reset }
//! }
//!
//! struct Clock;
//!
//! impl Clock {
//!     fn time(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
//!         Ok(ActionResponse::new().with("Seconds", 42))
//!     }
//!
//!     fn reset(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
//!         Ok(ActionResponse::new())
//!     }
//! }
//!
//! let table = ActionTable::new()
//!     .with(ClockAction::Time, Clock::time)
//!     .with(ClockAction::Reset, Clock::reset);
//! table.validate().unwrap();
//!
//! let caller = CallerIdentity::default();
//! let result = table.dispatch(&Clock, "Time", &ActionArgs::new(), &caller).unwrap();
//! assert_eq!(result.unwrap().get("Seconds"), Some("42"));
//! assert!(table.dispatch(&Clock, "Unknown", &ActionArgs::new(), &caller).is_none());
//! ```

mod args;
mod errors;
mod fault;
mod macros;
mod table;

pub use args::{ActionArgs, ActionResponse};
pub use errors::ActionError;
pub use fault::{ActionFault, ActionResult};
pub use table::{ActionHandler, ActionTable, UpnpAction};

/// Identité de l'appelant d'une action ou d'un abonnement
///
/// L'adresse et la signature du client (`User-Agent`) identifient un
/// control point ; elles servent de clé aux exposers de la playlist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CallerIdentity {
    pub address: String,
    pub user_agent: String,
}

impl CallerIdentity {
    pub fn new(address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Clé stable `"<adresse>:<user-agent>"`
    pub fn key(&self) -> String {
        format!("{}:{}", self.address, self.user_agent)
    }
}
